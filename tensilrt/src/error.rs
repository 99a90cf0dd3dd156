use thiserror::Error;

/// Error kinds surfaced by every managed operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TensilError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("resource closed: {0}")]
    ResourceClosed(String),
    #[error("native call failed: {0}")]
    NativeCallFailure(String),
    #[error("native library: {0}")]
    Library(String),
}

pub type Result<T> = std::result::Result<T, TensilError>;

impl TensilError {
    pub fn invalid(message: impl Into<String>) -> Self {
        TensilError::InvalidArgument(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        TensilError::UnsupportedOperation(message.into())
    }

    pub fn closed(message: impl Into<String>) -> Self {
        TensilError::ResourceClosed(message.into())
    }

    /// Maps a `tensil_last_error_kind` code and message to a typed error.
    pub(crate) fn from_native(kind: i32, message: String) -> Self {
        match kind {
            1 => TensilError::InvalidArgument(message),
            2 => TensilError::UnsupportedOperation(message),
            3 => TensilError::ResourceClosed(message),
            _ => TensilError::NativeCallFailure(message),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, TensilError::ResourceClosed(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, TensilError::UnsupportedOperation(_))
    }
}
