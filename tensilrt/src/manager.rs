use std::collections::HashMap;
use std::ffi::CString;
use std::fmt;
use std::os::raw::c_int;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::{debug, warn};

use crate::engine::Engine;
use crate::error::{Result, TensilError};
use crate::module::Module;
use crate::resource::sealed::Tracked;
use crate::resource::{NativeResource, ResourceId};
use crate::tensor::Tensor;
use crate::types::{DataType, Device, Element, Shape, SparseFormat};

static NEXT_MANAGER: AtomicU64 = AtomicU64::new(1);

/// Registry of the native resources created through it.
///
/// Closing a manager releases every member and closes its children. Dropping
/// the last clone closes it as well.
#[derive(Clone)]
pub struct TensorManager {
    inner: Arc<ManagerInner>,
}

pub(crate) struct ManagerInner {
    id: u64,
    name: Option<String>,
    engine: Engine,
    registry: Mutex<Registry>,
    children: Mutex<Vec<Weak<ManagerInner>>>,
}

#[derive(Default)]
struct Registry {
    closed: bool,
    members: HashMap<ResourceId, Weak<dyn Tracked>>,
}

enum Fill {
    Empty,
    Zeros,
    Ones,
    Value(f64),
}

impl ManagerInner {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn engine(&self) -> &Engine {
        &self.engine
    }

    pub(crate) fn register(&self, uid: ResourceId, resource: Weak<dyn Tracked>) -> Result<()> {
        let mut registry = self.registry();
        if registry.closed {
            return Err(self.closed_error());
        }
        registry.members.insert(uid, resource);
        Ok(())
    }

    pub(crate) fn forget(&self, uid: ResourceId) -> bool {
        self.registry().members.remove(&uid).is_some()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.registry().closed {
            return Err(self.closed_error());
        }
        Ok(())
    }

    fn closed_error(&self) -> TensilError {
        TensilError::closed(format!("manager {} is closed", self.id))
    }

    fn close(&self) {
        let members = {
            let mut registry = self.registry();
            if registry.closed {
                return;
            }
            registry.closed = true;
            std::mem::take(&mut registry.members)
        };
        let count = members.len();
        for (uid, member) in members {
            // A failed upgrade means the resource is mid-drop and frees itself.
            let Some(resource) = member.upgrade() else {
                continue;
            };
            let released = {
                let owner = resource.owner().lock();
                // An attach that won the owner lock has moved it elsewhere.
                if !std::ptr::eq(owner.as_ptr(), self) {
                    continue;
                }
                resource.release_native()
            };
            if let Err(err) = released {
                warn!(manager = self.id, %uid, error = %err, "release failed during close");
            }
        }
        let children = std::mem::take(
            &mut *self
                .children
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        for child in children.iter().filter_map(Weak::upgrade) {
            child.close();
        }
        debug!(manager = self.id, released = count, "manager closed");
    }
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        let live = {
            let registry = self.registry();
            if registry.closed {
                0
            } else {
                registry
                    .members
                    .values()
                    .filter(|m| m.strong_count() > 0)
                    .count()
            }
        };
        if live > 0 && self.engine.config().warn_on_leak {
            warn!(manager = self.id, live, "manager dropped with live resources");
        }
        self.close();
    }
}

impl TensorManager {
    pub fn new(engine: &Engine) -> Self {
        Self::build(engine, None)
    }

    pub fn named(engine: &Engine, name: impl Into<String>) -> Self {
        Self::build(engine, Some(name.into()))
    }

    fn build(engine: &Engine, name: Option<String>) -> Self {
        TensorManager {
            inner: Arc::new(ManagerInner {
                id: NEXT_MANAGER.fetch_add(1, Ordering::Relaxed),
                name,
                engine: engine.clone(),
                registry: Mutex::new(Registry::default()),
                children: Mutex::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<ManagerInner>) -> Self {
        TensorManager { inner }
    }

    pub(crate) fn inner(&self) -> &Arc<ManagerInner> {
        &self.inner
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub fn engine(&self) -> &Engine {
        &self.inner.engine
    }

    pub fn default_device(&self) -> Device {
        self.inner.engine.default_device()
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.inner.registry().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, uid: ResourceId) -> bool {
        self.inner.registry().members.contains_key(&uid)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.registry().closed
    }

    /// Releases every member, then closes the child managers. A second call
    /// does nothing.
    pub fn close(&self) {
        self.inner.close();
    }

    /// A scoped manager closed together with this one.
    pub fn new_child(&self) -> TensorManager {
        let child = TensorManager::build(&self.inner.engine, None);
        {
            let mut children = self
                .inner
                .children
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            children.retain(|c| c.strong_count() > 0);
            children.push(Arc::downgrade(&child.inner));
        }
        if self.is_closed() {
            child.close();
        }
        child
    }

    /// Moves `resource` into this manager's registry. Closing the previous
    /// owner no longer releases it.
    pub fn attach<R: NativeResource>(&self, resource: &R) -> Result<()> {
        let tracked = resource.tracked();
        let uid = tracked.uid();
        let mut owner = tracked.owner().lock();
        if resource.is_closed() {
            return Err(TensilError::closed(format!("resource {uid} has been released")));
        }
        let previous = owner.upgrade();
        if let Some(prev) = &previous {
            if Arc::ptr_eq(prev, &self.inner) {
                return Ok(());
            }
        }
        self.inner.register(uid, Arc::downgrade(&tracked))?;
        if let Some(prev) = previous {
            prev.forget(uid);
        }
        *owner = Arc::downgrade(&self.inner);
        Ok(())
    }

    /// Removes `uid` from the registry without releasing it. Returns whether
    /// it was a member.
    pub fn detach(&self, uid: ResourceId) -> bool {
        let entry = self.inner.registry().members.get(&uid).cloned();
        let Some(entry) = entry else {
            return false;
        };
        // A dead entry belongs to a resource mid-drop; drop the stale slot.
        let Some(tracked) = entry.upgrade() else {
            return self.inner.forget(uid);
        };
        let mut owner = tracked.owner().lock();
        let present = self.inner.forget(uid);
        if present && Weak::ptr_eq(&owner, &Arc::downgrade(&self.inner)) {
            *owner = Weak::new();
        }
        present
    }

    pub fn empty(&self, shape: impl Into<Shape>, dtype: DataType, device: Device) -> Result<Tensor> {
        self.allocate(Fill::Empty, &shape.into(), dtype, SparseFormat::Dense, device, false)
    }

    pub fn zeros(&self, shape: impl Into<Shape>, dtype: DataType, device: Device) -> Result<Tensor> {
        self.allocate(Fill::Zeros, &shape.into(), dtype, SparseFormat::Dense, device, false)
    }

    pub fn ones(&self, shape: impl Into<Shape>, dtype: DataType, device: Device) -> Result<Tensor> {
        self.allocate(Fill::Ones, &shape.into(), dtype, SparseFormat::Dense, device, false)
    }

    pub fn full(
        &self,
        shape: impl Into<Shape>,
        value: f64,
        dtype: DataType,
        device: Device,
    ) -> Result<Tensor> {
        self.allocate(Fill::Value(value), &shape.into(), dtype, SparseFormat::Dense, device, false)
    }

    /// Uninitialised tensor with an explicit layout and grad flag.
    pub fn create(
        &self,
        shape: impl Into<Shape>,
        dtype: DataType,
        format: SparseFormat,
        device: Device,
        requires_grad: bool,
    ) -> Result<Tensor> {
        self.allocate(Fill::Empty, &shape.into(), dtype, format, device, requires_grad)
    }

    fn allocate(
        &self,
        fill: Fill,
        shape: &Shape,
        dtype: DataType,
        format: SparseFormat,
        device: Device,
        requires_grad: bool,
    ) -> Result<Tensor> {
        self.inner.ensure_open()?;
        let dtype = dtype.alloc_code()?;
        let layout = format.layout_code()?;
        let dims = shape.dims();
        let pair = device.to_pair();
        let grad = requires_grad as c_int;
        let sym = self.engine().sym();
        let raw = unsafe {
            match fill {
                Fill::Empty => {
                    (sym.empty)(dims.as_ptr(), dims.len(), dtype, layout, grad, pair.as_ptr())
                }
                Fill::Zeros => {
                    (sym.zeros)(dims.as_ptr(), dims.len(), dtype, layout, grad, pair.as_ptr())
                }
                Fill::Ones => {
                    (sym.ones)(dims.as_ptr(), dims.len(), dtype, layout, grad, pair.as_ptr())
                }
                Fill::Value(value) => (sym.full)(
                    dims.as_ptr(),
                    dims.len(),
                    value,
                    dtype,
                    layout,
                    grad,
                    pair.as_ptr(),
                ),
            }
        };
        Tensor::adopt(self.engine(), Some(&self.inner), raw)
    }

    /// `[start, stop)` in steps of `step`.
    pub fn arange(
        &self,
        start: i64,
        stop: i64,
        step: i64,
        dtype: DataType,
        device: Device,
    ) -> Result<Tensor> {
        self.inner.ensure_open()?;
        let dtype = dtype.alloc_code()?;
        let pair = device.to_pair();
        let raw = unsafe { (self.engine().sym().arange)(start, stop, step, dtype, pair.as_ptr()) };
        Tensor::adopt(self.engine(), Some(&self.inner), raw)
    }

    pub fn arange_f64(
        &self,
        start: f64,
        stop: f64,
        step: f64,
        dtype: DataType,
        device: Device,
    ) -> Result<Tensor> {
        self.inner.ensure_open()?;
        let dtype = dtype.alloc_code()?;
        let pair = device.to_pair();
        let raw =
            unsafe { (self.engine().sym().arange_f64)(start, stop, step, dtype, pair.as_ptr()) };
        Tensor::adopt(self.engine(), Some(&self.inner), raw)
    }

    /// Copies `bytes`, laid out in native byte order, into a new tensor.
    pub fn from_bytes(
        &self,
        bytes: &[u8],
        shape: impl Into<Shape>,
        dtype: DataType,
        device: Device,
    ) -> Result<Tensor> {
        self.inner.ensure_open()?;
        let shape = shape.into();
        let dims = shape.dims();
        let dtype = dtype.alloc_code()?;
        let pair = device.to_pair();
        let raw = unsafe {
            (self.engine().sym().from_blob)(
                bytes.as_ptr(),
                bytes.len(),
                dims.as_ptr(),
                dims.len(),
                dtype,
                0,
                0,
                pair.as_ptr(),
            )
        };
        Tensor::adopt(self.engine(), Some(&self.inner), raw)
    }

    pub fn from_slice<T: Element>(
        &self,
        data: &[T],
        shape: impl Into<Shape>,
        device: Device,
    ) -> Result<Tensor> {
        self.from_bytes(bytemuck::cast_slice(data), shape, T::DTYPE, device)
    }

    /// Joins `tensors` along a new `axis`.
    pub fn stack(&self, tensors: &[Tensor], axis: i64) -> Result<Tensor> {
        self.inner.ensure_open()?;
        let handles = tensors
            .iter()
            .map(|t| t.raw_handle())
            .collect::<Result<Vec<_>>>()?;
        let raw = unsafe { (self.engine().sym().stack)(handles.as_ptr(), handles.len(), axis) };
        Tensor::adopt(self.engine(), Some(&self.inner), raw)
    }

    pub fn load_module(&self, path: impl AsRef<Path>) -> Result<Module> {
        self.inner.ensure_open()?;
        let path = path.as_ref();
        let cpath = CString::new(path.to_string_lossy().into_owned())
            .map_err(|_| TensilError::invalid("module path contains a NUL byte"))?;
        let raw = unsafe { (self.engine().sym().module_load)(cpath.as_ptr()) };
        Module::adopt(self.engine(), &self.inner, raw, path)
    }
}

impl fmt::Debug for TensorManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.registry();
        f.debug_struct("TensorManager")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("members", &registry.members.len())
            .field("closed", &registry.closed)
            .finish()
    }
}

#[cfg(all(test, feature = "linked"))]
mod tests {
    use super::*;

    fn child_slots(manager: &TensorManager) -> usize {
        manager.inner.children.lock().map(|c| c.len()).unwrap_or(0)
    }

    #[test]
    fn dropped_children_are_pruned() {
        let parent = Engine::linked().unwrap().new_manager();
        for _ in 0..100 {
            let child = parent.new_child();
            child.close();
        }
        assert!(child_slots(&parent) <= 1);
        let kept = parent.new_child();
        let _also = parent.new_child();
        assert_eq!(child_slots(&parent), 2);
        parent.close();
        assert!(kept.is_closed());
    }
}
