use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::engine::Engine;
use crate::error::{Result, TensilError};
use crate::handle::Handle;
use crate::manager::{ManagerInner, TensorManager};
use crate::resource::sealed::{Sealed, Tracked};
use crate::resource::{close_tracked, NativeResource, Owner, ResourceCell, ResourceId};
use crate::tensor::Tensor;

/// A loaded native model.
#[derive(Clone)]
pub struct Module {
    inner: Arc<ModuleInner>,
}

struct ModuleInner {
    uid: ResourceId,
    cell: ResourceCell,
    engine: Engine,
    owner: Owner,
    path: PathBuf,
}

impl Tracked for ModuleInner {
    fn uid(&self) -> ResourceId {
        self.uid
    }

    fn owner(&self) -> &Owner {
        &self.owner
    }

    fn release_native(&self) -> Result<()> {
        match self.cell.take() {
            Some(handle) => {
                trace!(uid = %self.uid, ?handle, "module released");
                self.engine.delete_module(handle)
            }
            None => Ok(()),
        }
    }
}

impl Drop for ModuleInner {
    fn drop(&mut self) {
        if let Err(err) = close_tracked(&*self) {
            warn!(uid = %self.uid, error = %err, "module release failed on drop");
        }
    }
}

impl Sealed for Module {
    fn tracked(&self) -> Arc<dyn Tracked> {
        self.inner.clone()
    }
}

impl NativeResource for Module {
    fn uid(&self) -> ResourceId {
        self.inner.uid
    }

    fn is_closed(&self) -> bool {
        self.inner.cell.is_closed()
    }

    fn close(&self) -> Result<()> {
        close_tracked(&*self.inner)
    }
}

impl Module {
    pub(crate) fn adopt(
        engine: &Engine,
        manager: &Arc<ManagerInner>,
        raw: i64,
        path: &Path,
    ) -> Result<Module> {
        let handle: Handle = engine.check_handle(raw)?;
        let uid = ResourceId::next();
        let module = Module {
            inner: Arc::new(ModuleInner {
                uid,
                cell: ResourceCell::new(handle),
                engine: engine.clone(),
                owner: Owner::new(Some(manager)),
                path: path.to_path_buf(),
            }),
        };
        manager.register(uid, Arc::downgrade(&module.tracked()))?;
        debug!(%uid, path = %path.display(), "module loaded");
        Ok(module)
    }

    pub fn uid(&self) -> ResourceId {
        self.inner.uid
    }

    pub fn is_closed(&self) -> bool {
        self.inner.cell.is_closed()
    }

    pub fn close(&self) -> Result<()> {
        close_tracked(&*self.inner)
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn manager(&self) -> Option<TensorManager> {
        self.inner.owner.manager().map(TensorManager::from_inner)
    }

    fn raw_handle(&self) -> Result<i64> {
        self.inner.cell.get("module").map(Handle::raw)
    }

    /// Switches the model to inference mode.
    pub fn eval(&self) -> Result<()> {
        let raw = self.raw_handle()?;
        let rc = unsafe { (self.inner.engine.sym().module_eval)(raw) };
        self.inner.engine.check_status(rc)
    }

    /// Runs the model once. Outputs are registered with the first input's manager.
    pub fn forward(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        let first = inputs
            .first()
            .ok_or_else(|| TensilError::invalid("forward needs at least one input"))?;
        let raw = self.raw_handle()?;
        let handles = inputs
            .iter()
            .map(Tensor::handle)
            .map(|h| h.map(Handle::raw))
            .collect::<Result<Vec<_>>>()?;
        let engine = &self.inner.engine;
        let slice = unsafe { (engine.sym().module_forward)(raw, handles.as_ptr(), handles.len()) };
        let out = engine.take_i64s(slice)?;
        trace!(uid = %self.inner.uid, outputs = out.len(), "module forward");
        let manager = first.manager();
        Tensor::adopt_all(engine, manager.as_ref().map(TensorManager::inner), out)
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("uid", &self.inner.uid)
            .field("path", &self.inner.path)
            .field("closed", &self.is_closed())
            .finish()
    }
}
