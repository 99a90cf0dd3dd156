use std::fmt;

/// Error category reported through `tensil_last_error_kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument = 1,
    Unsupported = 2,
    ResourceClosed = 3,
    Native = 4,
}

#[derive(Debug, Clone)]
pub struct NativeError {
    pub kind: ErrorKind,
    pub message: String,
}

pub type NativeResult<T> = Result<T, NativeError>;

impl NativeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unsupported, message)
    }

    pub fn closed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceClosed, message)
    }

    pub fn native(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Native, message)
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for NativeError {}

#[cfg(feature = "torch")]
impl From<tch::TchError> for NativeError {
    fn from(err: tch::TchError) -> Self {
        NativeError::native(err.to_string())
    }
}
