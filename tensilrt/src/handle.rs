use std::fmt;
use std::num::NonZeroI64;

/// Opaque identifier of one native allocation.
///
/// Handles are minted only by wrapping a value the native side just returned
/// and are never exposed as raw integers outside debugging accessors.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(NonZeroI64);

impl Handle {
    pub(crate) fn from_raw(raw: i64) -> Option<Self> {
        NonZeroI64::new(raw).map(Handle)
    }

    pub(crate) fn raw(self) -> i64 {
        self.0.get()
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle(#{})", self.0)
    }
}
