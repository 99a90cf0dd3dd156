use std::ffi::{CStr, CString};
use std::fmt;
use std::os::raw::c_int;
use std::sync::Arc;

use libloading::Library;
use tracing::debug;

use crate::config::TensilConfig;
use crate::error::{Result, TensilError};
use crate::handle::Handle;
use crate::manager::TensorManager;
use crate::sys::{self, RawSlice, Symbols};
use crate::types::Device;

/// A bound native call surface plus the settings it was opened with.
///
/// Cloning is cheap; every tensor keeps its engine alive so a dynamically
/// loaded library is never unloaded under a live handle.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    symbols: Symbols,
    library: Option<Arc<Library>>,
    config: TensilConfig,
    default_device: Device,
}

impl Engine {
    pub fn new(config: TensilConfig) -> Result<Self> {
        let default_device = config.default_device()?;
        let (symbols, library) = match &config.library_path {
            Some(path) => {
                let lib = sys::load_library(path)?;
                let symbols = unsafe { Symbols::load(&lib)? };
                debug!(path = %path.display(), "loaded tensil_native library");
                (symbols, Some(Arc::new(lib)))
            }
            None => (linked_symbols()?, None),
        };
        sys::check_abi(unsafe { (symbols.abi_version)() })?;
        let engine = Engine {
            inner: Arc::new(EngineInner {
                symbols,
                library,
                config,
                default_device,
            }),
        };
        if let Some(backend) = engine.inner.config.backend.clone() {
            engine.set_backend(&backend)?;
        }
        Ok(engine)
    }

    /// Engine over the statically linked native crate with default settings.
    pub fn linked() -> Result<Self> {
        Self::new(TensilConfig::default())
    }

    pub fn from_env() -> Result<Self> {
        Self::new(TensilConfig::from_env())
    }

    pub fn config(&self) -> &TensilConfig {
        &self.inner.config
    }

    pub fn default_device(&self) -> Device {
        self.inner.default_device
    }

    pub fn is_dynamic(&self) -> bool {
        self.inner.library.is_some()
    }

    pub fn new_manager(&self) -> TensorManager {
        TensorManager::new(self)
    }

    pub fn abi_version(&self) -> u32 {
        unsafe { (self.inner.symbols.abi_version)() }
    }

    /// Selects the native kernel set. The selection is process wide.
    pub fn set_backend(&self, name: &str) -> Result<()> {
        let cname = CString::new(name)
            .map_err(|_| TensilError::invalid("backend name contains a NUL byte"))?;
        let rc = unsafe { (self.inner.symbols.backend_set)(cname.as_ptr()) };
        self.check_status(rc)?;
        debug!(backend = name, "selected native backend");
        Ok(())
    }

    pub fn backend(&self) -> Result<&'static str> {
        match unsafe { (self.inner.symbols.backend_current)() } {
            0 => Ok("reference"),
            1 => Ok("torch"),
            other => Err(TensilError::NativeCallFailure(format!(
                "unknown backend code {other}"
            ))),
        }
    }

    pub fn live_tensors(&self) -> Result<i64> {
        self.count(unsafe { (self.inner.symbols.live_tensors)() })
    }

    pub fn live_modules(&self) -> Result<i64> {
        self.count(unsafe { (self.inner.symbols.live_modules)() })
    }

    pub fn live_views(&self) -> Result<i64> {
        self.count(unsafe { (self.inner.symbols.live_views)() })
    }

    fn count(&self, n: i64) -> Result<i64> {
        if n < 0 {
            Err(self.last_error())
        } else {
            Ok(n)
        }
    }

    pub(crate) fn sym(&self) -> &Symbols {
        &self.inner.symbols
    }

    /// Reads the calling thread's native error slot.
    pub(crate) fn last_error(&self) -> TensilError {
        let kind = unsafe { (self.inner.symbols.last_error_kind)() };
        let ptr = unsafe { (self.inner.symbols.last_error)() };
        let msg = if ptr.is_null() {
            String::new()
        } else {
            unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
        };
        let msg = if msg.is_empty() {
            "native backend error".to_string()
        } else {
            msg
        };
        TensilError::from_native(kind, msg)
    }

    pub(crate) fn check_handle(&self, raw: i64) -> Result<Handle> {
        Handle::from_raw(raw).ok_or_else(|| self.last_error())
    }

    pub(crate) fn check_status(&self, rc: c_int) -> Result<()> {
        if rc == 0 {
            Ok(())
        } else {
            Err(self.last_error())
        }
    }

    /// Decodes and frees a native `i64` array.
    pub(crate) fn take_i64s(&self, slice: RawSlice) -> Result<Vec<i64>> {
        if slice.ptr.is_null() {
            return Err(self.last_error());
        }
        let values = unsafe { std::slice::from_raw_parts(slice.ptr, slice.len) }
            .chunks_exact(8)
            .map(|c| {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(c);
                i64::from_ne_bytes(buf)
            })
            .collect();
        unsafe { (self.inner.symbols.free)(slice.ptr, slice.len) };
        Ok(values)
    }

    pub(crate) fn delete_tensor(&self, handle: Handle) -> Result<()> {
        let rc = unsafe { (self.inner.symbols.delete)(handle.raw()) };
        self.check_status(rc)
    }

    pub(crate) fn delete_module(&self, handle: Handle) -> Result<()> {
        let rc = unsafe { (self.inner.symbols.module_delete)(handle.raw()) };
        self.check_status(rc)
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("dynamic", &self.is_dynamic())
            .field("default_device", &self.inner.default_device)
            .finish()
    }
}

#[cfg(feature = "linked")]
fn linked_symbols() -> Result<Symbols> {
    Ok(Symbols::linked())
}

#[cfg(not(feature = "linked"))]
fn linked_symbols() -> Result<Symbols> {
    Err(TensilError::Library(
        "built without the `linked` feature; set library_path".to_string(),
    ))
}
