use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;

use crate::error::{NativeError, NativeResult};
use crate::module::NativeModule;
use crate::value::NativeTensor;

#[derive(Debug)]
struct TensorEntry {
    tensor: NativeTensor,
    refcount: u32,
}

/// Handles are minted from one counter for tensors, modules and views and are
/// never reissued, so an id below the counter that no table holds was freed.
static NEXT_HANDLE: AtomicI64 = AtomicI64::new(1);

static TENSORS: Lazy<Mutex<HashMap<i64, TensorEntry>>> = Lazy::new(|| Mutex::new(HashMap::new()));
static MODULES: Lazy<Mutex<HashMap<i64, Arc<Mutex<NativeModule>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));
static VIEWS: Lazy<Mutex<HashMap<i64, NativeTensor>>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn next_handle() -> i64 {
    NEXT_HANDLE.fetch_add(1, Ordering::SeqCst)
}

fn poisoned(what: &str) -> NativeError {
    NativeError::native(format!("{what} registry poisoned"))
}

/// Callers must not hold any table lock; each table is locked on its own.
fn is_freed(handle: i64) -> bool {
    if handle <= 0 || handle >= NEXT_HANDLE.load(Ordering::SeqCst) {
        return false;
    }
    let live = TENSORS.lock().map(|t| t.contains_key(&handle)).unwrap_or(true)
        || MODULES.lock().map(|m| m.contains_key(&handle)).unwrap_or(true)
        || VIEWS.lock().map(|v| v.contains_key(&handle)).unwrap_or(true);
    !live
}

fn lookup_error(kind: &str, handle: i64) -> NativeError {
    if is_freed(handle) {
        NativeError::closed(format!("Stale {kind} handle {handle} (freed)"))
    } else {
        NativeError::invalid(format!("Invalid {kind} handle {handle}"))
    }
}

pub fn register_tensor(tensor: impl Into<NativeTensor>) -> NativeResult<i64> {
    let mut guard = TENSORS.lock().map_err(|_| poisoned("tensor"))?;
    let id = next_handle();
    guard.insert(
        id,
        TensorEntry {
            tensor: tensor.into(),
            refcount: 1,
        },
    );
    Ok(id)
}

pub fn get_tensor(handle: i64) -> NativeResult<NativeTensor> {
    let guard = TENSORS.lock().map_err(|_| poisoned("tensor"))?;
    match guard.get(&handle) {
        Some(entry) => Ok(entry.tensor.clone()),
        None => {
            drop(guard);
            Err(lookup_error("tensor", handle))
        }
    }
}

/// Swaps the storage behind an existing handle (in-place kernels).
pub fn replace_tensor(handle: i64, tensor: NativeTensor) -> NativeResult<()> {
    let mut guard = TENSORS.lock().map_err(|_| poisoned("tensor"))?;
    match guard.get_mut(&handle) {
        Some(entry) => {
            entry.tensor = tensor;
            Ok(())
        }
        None => {
            drop(guard);
            Err(lookup_error("tensor", handle))
        }
    }
}

pub fn retain_tensor(handle: i64) -> NativeResult<()> {
    let mut guard = TENSORS.lock().map_err(|_| poisoned("tensor"))?;
    match guard.get_mut(&handle) {
        Some(entry) => {
            entry.refcount = entry.refcount.saturating_add(1);
            Ok(())
        }
        None => {
            drop(guard);
            Err(lookup_error("tensor", handle))
        }
    }
}

pub fn release_tensor(handle: i64) -> NativeResult<()> {
    let mut guard = TENSORS.lock().map_err(|_| poisoned("tensor"))?;
    match guard.get_mut(&handle) {
        Some(entry) => {
            entry.refcount -= 1;
            if entry.refcount == 0 {
                guard.remove(&handle);
            }
            Ok(())
        }
        None => {
            drop(guard);
            if is_freed(handle) {
                Err(NativeError::closed("tensor handle already freed"))
            } else {
                Err(NativeError::invalid(format!("Invalid tensor handle {handle}")))
            }
        }
    }
}

pub fn register_module(module: NativeModule) -> NativeResult<i64> {
    let mut guard = MODULES.lock().map_err(|_| poisoned("module"))?;
    let id = next_handle();
    guard.insert(id, Arc::new(Mutex::new(module)));
    Ok(id)
}

pub fn get_module(handle: i64) -> NativeResult<Arc<Mutex<NativeModule>>> {
    let guard = MODULES.lock().map_err(|_| poisoned("module"))?;
    match guard.get(&handle) {
        Some(module) => Ok(Arc::clone(module)),
        None => {
            drop(guard);
            Err(lookup_error("module", handle))
        }
    }
}

pub fn release_module(handle: i64) -> NativeResult<()> {
    let removed = MODULES
        .lock()
        .map_err(|_| poisoned("module"))?
        .remove(&handle);
    match removed {
        Some(_) => Ok(()),
        None if is_freed(handle) => Err(NativeError::closed("module handle already freed")),
        None => Err(NativeError::invalid(format!("Invalid module handle {handle}"))),
    }
}

/// Pins a tensor's storage until `release_view` is called with the returned id.
pub fn pin_view(tensor: NativeTensor) -> NativeResult<i64> {
    let mut guard = VIEWS.lock().map_err(|_| poisoned("view"))?;
    let id = next_handle();
    guard.insert(id, tensor);
    Ok(id)
}

pub fn release_view(id: i64) -> NativeResult<()> {
    let removed = VIEWS.lock().map_err(|_| poisoned("view"))?.remove(&id);
    match removed {
        Some(_) => Ok(()),
        None if is_freed(id) => Err(NativeError::closed("view already freed")),
        None => Err(NativeError::invalid(format!("Invalid view id {id}"))),
    }
}

pub fn live_tensors() -> NativeResult<usize> {
    Ok(TENSORS.lock().map_err(|_| poisoned("tensor"))?.len())
}

pub fn live_modules() -> NativeResult<usize> {
    Ok(MODULES.lock().map_err(|_| poisoned("module"))?.len())
}

pub fn live_views() -> NativeResult<usize> {
    Ok(VIEWS.lock().map_err(|_| poisoned("view"))?.len())
}
