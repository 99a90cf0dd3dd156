//! Single-owner wrappers around native handles.

use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::error::{Result, TensilError};
use crate::handle::Handle;
use crate::manager::ManagerInner;

/// Process-unique identity of a managed resource, stable across close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

static NEXT_RESOURCE: AtomicU64 = AtomicU64::new(1);

impl ResourceId {
    pub(crate) fn next() -> Self {
        ResourceId(NEXT_RESOURCE.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Holds a live handle until it is taken exactly once.
pub(crate) struct ResourceCell(AtomicI64);

impl ResourceCell {
    pub(crate) fn new(handle: Handle) -> Self {
        ResourceCell(AtomicI64::new(handle.raw()))
    }

    pub(crate) fn get(&self, what: &str) -> Result<Handle> {
        Handle::from_raw(self.0.load(Ordering::Acquire))
            .ok_or_else(|| TensilError::closed(format!("{what} has been released")))
    }

    pub(crate) fn take(&self) -> Option<Handle> {
        Handle::from_raw(self.0.swap(0, Ordering::AcqRel))
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.0.load(Ordering::Acquire) == 0
    }
}

/// Back-reference from a resource to the manager whose registry lists it.
///
/// Lock order is owner slot first, then a registry; two registry locks are
/// never held at once.
pub struct Owner(Mutex<Weak<ManagerInner>>);

impl Owner {
    pub(crate) fn new(manager: Option<&Arc<ManagerInner>>) -> Self {
        Owner(Mutex::new(manager.map(Arc::downgrade).unwrap_or_default()))
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Weak<ManagerInner>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn manager(&self) -> Option<Arc<ManagerInner>> {
        self.lock().upgrade()
    }
}

pub(crate) mod sealed {
    use super::*;

    /// Registry-facing side of a resource.
    pub trait Tracked: Send + Sync {
        fn uid(&self) -> ResourceId;
        fn owner(&self) -> &Owner;
        /// Frees the native allocation without touching any registry.
        fn release_native(&self) -> Result<()>;
    }

    pub trait Sealed {
        fn tracked(&self) -> Arc<dyn Tracked>;
    }
}

/// A managed object owning exactly one native handle.
///
/// `close` is idempotent: the first call frees the native allocation and
/// removes the resource from its manager, later calls do nothing.
pub trait NativeResource: sealed::Sealed + Send + Sync {
    fn uid(&self) -> ResourceId;

    fn is_closed(&self) -> bool;

    fn close(&self) -> Result<()>;
}

/// Frees `tracked` and drops it from its owner's registry.
pub(crate) fn close_tracked(tracked: &dyn sealed::Tracked) -> Result<()> {
    let released = tracked.release_native();
    let owner = tracked.owner().lock();
    if let Some(manager) = owner.upgrade() {
        manager.forget(tracked.uid());
    }
    released
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_releases_once() {
        let cell = ResourceCell::new(Handle::from_raw(7).unwrap());
        assert_eq!(cell.get("tensor").unwrap().raw(), 7);
        assert_eq!(cell.take().map(Handle::raw), Some(7));
        assert!(cell.take().is_none());
        assert!(cell.is_closed());
        assert!(cell.get("tensor").unwrap_err().is_closed());
    }

    #[test]
    fn ids_are_unique() {
        let a = ResourceId::next();
        let b = ResourceId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }
}
