//! Native tensor engine exported through a flat C ABI.
//!
//! Every allocation lives in a handle table owned by this crate. Entry points
//! return a handle (`0` on failure), a status (`0` on success) or a primitive,
//! and report failures through a thread-local last-error slot.

use libc::{c_char, c_int};
use std::cell::{Cell, RefCell};
use std::ffi::{CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::ptr;

pub mod backend;
pub mod codes;
pub mod error;
pub mod module;
pub mod ops;
pub mod reference;
pub mod registry;
#[cfg(feature = "torch")]
pub mod torch;
pub mod value;

use backend::{current_backend, set_backend, BackendKind};
pub use codes::{DType, DeviceKind, DeviceSpec, Layout, TENSIL_ABI_VERSION};
pub use error::{ErrorKind, NativeError, NativeResult};
use ops::{CompareOp, Fill, UnaryOp};
use value::NativeTensor;

#[repr(C)]
pub struct FfiSlice {
    pub ptr: *mut u8,
    pub len: usize,
}

fn make_slice(mut bytes: Vec<u8>) -> FfiSlice {
    bytes.shrink_to_fit();
    let len = bytes.len();
    let ptr = bytes.as_mut_ptr();
    std::mem::forget(bytes);
    FfiSlice { ptr, len }
}

fn null_slice() -> FfiSlice {
    FfiSlice {
        ptr: ptr::null_mut(),
        len: 0,
    }
}

fn i64_slice(values: &[i64]) -> FfiSlice {
    let mut bytes = Vec::with_capacity(values.len() * 8);
    for v in values {
        bytes.extend_from_slice(&v.to_ne_bytes());
    }
    make_slice(bytes)
}

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
    static LAST_KIND: Cell<c_int> = const { Cell::new(0) };
}

fn set_error(err: NativeError) {
    let cstr = CString::new(err.message.replace('\0', " "))
        .unwrap_or_else(|_| CString::from(c"Unknown error"));
    LAST_ERROR.with(|cell| {
        *cell.borrow_mut() = Some(cstr);
    });
    LAST_KIND.with(|kind| kind.set(err.kind as c_int));
}

fn clear_error() {
    LAST_ERROR.with(|cell| {
        *cell.borrow_mut() = None;
    });
    LAST_KIND.with(|kind| kind.set(0));
}

fn ffi_guard<T, F>(default: T, f: F) -> T
where
    F: FnOnce() -> T,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(v) => v,
        Err(payload) => {
            let msg = if let Some(s) = payload.downcast_ref::<&str>() {
                *s
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.as_str()
            } else {
                "panic across FFI boundary"
            };
            set_error(NativeError::native(format!("panic: {msg}")));
            default
        }
    }
}

fn report<T>(default: T, result: NativeResult<T>) -> T {
    match result {
        Ok(v) => v,
        Err(err) => {
            set_error(err);
            default
        }
    }
}

fn export_handle<F: FnOnce() -> NativeResult<i64>>(f: F) -> i64 {
    ffi_guard(0, || {
        clear_error();
        report(0, f())
    })
}

fn export_status<F: FnOnce() -> NativeResult<()>>(f: F) -> c_int {
    ffi_guard(1, || {
        clear_error();
        report(1, f().map(|_| 0))
    })
}

fn export_slice<F: FnOnce() -> NativeResult<FfiSlice>>(f: F) -> FfiSlice {
    ffi_guard(null_slice(), || {
        clear_error();
        report(null_slice(), f())
    })
}

fn publish(tensor: NativeTensor) -> NativeResult<i64> {
    registry::register_tensor(tensor)
}

fn publish_all(tensors: Vec<NativeTensor>) -> NativeResult<Vec<i64>> {
    let mut handles = Vec::with_capacity(tensors.len());
    for t in tensors {
        match publish(t) {
            Ok(h) => handles.push(h),
            Err(err) => {
                for h in handles {
                    let _ = registry::release_tensor(h);
                }
                return Err(err);
            }
        }
    }
    Ok(handles)
}

fn tensor(handle: i64) -> NativeResult<NativeTensor> {
    registry::get_tensor(handle)
}

unsafe fn slice_arg<'a, T>(ptr: *const T, len: usize, what: &str) -> NativeResult<&'a [T]> {
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(NativeError::invalid(format!("Null {what} pointer")));
    }
    Ok(std::slice::from_raw_parts(ptr, len))
}

/// Reads the `(kind, index)` device pair; a null pointer means `Cpu:0`.
unsafe fn device_arg(ptr: *const c_int) -> NativeResult<DeviceSpec> {
    if ptr.is_null() {
        return Ok(DeviceSpec::CPU);
    }
    DeviceSpec::from_pair(*ptr, *ptr.add(1))
}

fn cstr_to_string(ptr: *const c_char) -> NativeResult<String> {
    if ptr.is_null() {
        return Err(NativeError::invalid("Null string pointer"));
    }
    let cstr = unsafe { CStr::from_ptr(ptr) };
    cstr.to_str()
        .map(|s| s.to_string())
        .map_err(|_| NativeError::invalid("Invalid UTF-8 string"))
}

#[no_mangle]
pub extern "C" fn tensil_abi_version() -> u32 {
    TENSIL_ABI_VERSION
}

#[no_mangle]
pub extern "C" fn tensil_last_error() -> *const c_char {
    ffi_guard(ptr::null(), || {
        LAST_ERROR.with(|cell| match &*cell.borrow() {
            Some(msg) => msg.as_ptr(),
            None => ptr::null(),
        })
    })
}

/// `0` when the last call on this thread succeeded, otherwise an `ErrorKind` code.
#[no_mangle]
pub extern "C" fn tensil_last_error_kind() -> c_int {
    ffi_guard(0, || LAST_KIND.with(|kind| kind.get()))
}

#[no_mangle]
/// # Safety
/// The caller must pass a pointer and length returned in an `FfiSlice` by this
/// library and must not free the buffer more than once.
pub unsafe extern "C" fn tensil_free(ptr: *mut u8, len: usize) {
    ffi_guard((), || {
        if ptr.is_null() {
            return;
        }
        let _ = Vec::from_raw_parts(ptr, len, len);
    })
}

#[no_mangle]
pub extern "C" fn tensil_backend_set(name: *const c_char) -> c_int {
    export_status(|| {
        let name = cstr_to_string(name)?;
        set_backend(BackendKind::parse(&name)?);
        Ok(())
    })
}

#[no_mangle]
pub extern "C" fn tensil_backend_current() -> c_int {
    ffi_guard(-1, || current_backend() as c_int)
}

#[no_mangle]
pub extern "C" fn tensil_live_tensors() -> i64 {
    ffi_guard(-1, || report(-1, registry::live_tensors().map(|n| n as i64)))
}

#[no_mangle]
pub extern "C" fn tensil_live_modules() -> i64 {
    ffi_guard(-1, || report(-1, registry::live_modules().map(|n| n as i64)))
}

#[no_mangle]
pub extern "C" fn tensil_live_views() -> i64 {
    ffi_guard(-1, || report(-1, registry::live_views().map(|n| n as i64)))
}

unsafe fn create_export(
    fill: Fill,
    shape: *const i64,
    ndim: usize,
    dtype: c_int,
    layout: c_int,
    requires_grad: c_int,
    device: *const c_int,
) -> i64 {
    export_handle(|| {
        let shape = slice_arg(shape, ndim, "shape")?;
        let dtype = DType::from_code(dtype)?;
        let layout = Layout::from_code(layout)?;
        let device = device_arg(device)?;
        publish(ops::create(fill, shape, dtype, layout, device, requires_grad != 0)?)
    })
}

#[no_mangle]
/// # Safety
/// `shape` must point to `ndim` values; `device` is null or points to two ints.
pub unsafe extern "C" fn tensil_tensor_empty(
    shape: *const i64,
    ndim: usize,
    dtype: c_int,
    layout: c_int,
    requires_grad: c_int,
    device: *const c_int,
) -> i64 {
    create_export(Fill::Empty, shape, ndim, dtype, layout, requires_grad, device)
}

#[no_mangle]
/// # Safety
/// `shape` must point to `ndim` values; `device` is null or points to two ints.
pub unsafe extern "C" fn tensil_tensor_zeros(
    shape: *const i64,
    ndim: usize,
    dtype: c_int,
    layout: c_int,
    requires_grad: c_int,
    device: *const c_int,
) -> i64 {
    create_export(Fill::Zeros, shape, ndim, dtype, layout, requires_grad, device)
}

#[no_mangle]
/// # Safety
/// `shape` must point to `ndim` values; `device` is null or points to two ints.
pub unsafe extern "C" fn tensil_tensor_ones(
    shape: *const i64,
    ndim: usize,
    dtype: c_int,
    layout: c_int,
    requires_grad: c_int,
    device: *const c_int,
) -> i64 {
    create_export(Fill::Ones, shape, ndim, dtype, layout, requires_grad, device)
}

#[no_mangle]
/// # Safety
/// `shape` must point to `ndim` values; `device` is null or points to two ints.
pub unsafe extern "C" fn tensil_tensor_full(
    shape: *const i64,
    ndim: usize,
    value: f64,
    dtype: c_int,
    layout: c_int,
    requires_grad: c_int,
    device: *const c_int,
) -> i64 {
    create_export(Fill::Value(value), shape, ndim, dtype, layout, requires_grad, device)
}

#[no_mangle]
/// # Safety
/// `device` is null or points to two ints.
pub unsafe extern "C" fn tensil_tensor_arange(
    start: i64,
    stop: i64,
    step: i64,
    dtype: c_int,
    device: *const c_int,
) -> i64 {
    export_handle(|| {
        let dtype = DType::from_code(dtype)?;
        let device = device_arg(device)?;
        publish(ops::arange_int(start, stop, step, dtype, device)?)
    })
}

#[no_mangle]
/// # Safety
/// `device` is null or points to two ints.
pub unsafe extern "C" fn tensil_tensor_arange_f64(
    start: f64,
    stop: f64,
    step: f64,
    dtype: c_int,
    device: *const c_int,
) -> i64 {
    export_handle(|| {
        let dtype = DType::from_code(dtype)?;
        let device = device_arg(device)?;
        publish(ops::arange(start, stop, step, dtype, device)?)
    })
}

#[no_mangle]
/// # Safety
/// `data` must point to `len` readable bytes and `shape` to `ndim` values;
/// `device` is null or points to two ints. The bytes are copied.
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn tensil_tensor_from_blob(
    data: *const u8,
    len: usize,
    shape: *const i64,
    ndim: usize,
    dtype: c_int,
    layout: c_int,
    requires_grad: c_int,
    device: *const c_int,
) -> i64 {
    export_handle(|| {
        let bytes = slice_arg(data, len, "data")?;
        let shape = slice_arg(shape, ndim, "shape")?;
        let dtype = DType::from_code(dtype)?;
        let layout = Layout::from_code(layout)?;
        let device = device_arg(device)?;
        publish(ops::from_blob(bytes, shape, dtype, layout, device, requires_grad != 0)?)
    })
}

#[no_mangle]
/// # Safety
/// `handles` must point to `count` tensor handles.
pub unsafe extern "C" fn tensil_tensor_stack(handles: *const i64, count: usize, dim: i64) -> i64 {
    export_handle(|| {
        let handles = slice_arg(handles, count, "handle list")?;
        let tensors = handles
            .iter()
            .map(|h| tensor(*h))
            .collect::<NativeResult<Vec<_>>>()?;
        publish(ops::stack(&tensors, dim)?)
    })
}

#[no_mangle]
/// # Safety
/// `device` is null or points to two ints.
pub unsafe extern "C" fn tensil_tensor_to(
    handle: i64,
    dtype: c_int,
    copy: c_int,
    device: *const c_int,
) -> i64 {
    export_handle(|| {
        let t = tensor(handle)?;
        let dtype = DType::from_code(dtype)?;
        let device = device_arg(device)?;
        publish(ops::to(&t, dtype, device, copy != 0)?)
    })
}

#[no_mangle]
pub extern "C" fn tensil_tensor_get(handle: i64, index: i64) -> i64 {
    export_handle(|| publish(ops::select(&tensor(handle)?, 0, index)?))
}

#[no_mangle]
/// # Safety
/// `shape` must point to `ndim` values.
pub unsafe extern "C" fn tensil_tensor_reshape(handle: i64, shape: *const i64, ndim: usize) -> i64 {
    export_handle(|| {
        let shape = slice_arg(shape, ndim, "shape")?;
        publish(ops::reshape(&tensor(handle)?, shape)?)
    })
}

#[no_mangle]
pub extern "C" fn tensil_tensor_softmax(handle: i64, dim: i64) -> i64 {
    export_handle(|| publish(ops::softmax(&tensor(handle)?, dim)?))
}

#[no_mangle]
pub extern "C" fn tensil_tensor_argmax(handle: i64) -> i64 {
    export_handle(|| publish(ops::argmax(&tensor(handle)?, None)?))
}

#[no_mangle]
pub extern "C" fn tensil_tensor_argmax_dim(handle: i64, dim: i64) -> i64 {
    export_handle(|| publish(ops::argmax(&tensor(handle)?, Some(dim))?))
}

#[no_mangle]
pub extern "C" fn tensil_tensor_argmin(handle: i64) -> i64 {
    export_handle(|| publish(ops::argmin(&tensor(handle)?, None)?))
}

#[no_mangle]
pub extern "C" fn tensil_tensor_argmin_dim(handle: i64, dim: i64) -> i64 {
    export_handle(|| publish(ops::argmin(&tensor(handle)?, Some(dim))?))
}

#[no_mangle]
pub extern "C" fn tensil_tensor_argsort(handle: i64, dim: i64) -> i64 {
    export_handle(|| publish(ops::argsort(&tensor(handle)?, dim)?))
}

#[no_mangle]
pub extern "C" fn tensil_tensor_sort(handle: i64, dim: i64) -> i64 {
    export_handle(|| publish(ops::sort(&tensor(handle)?, dim)?))
}

#[no_mangle]
/// # Safety
/// `dims` must point to `ndim` values.
pub unsafe extern "C" fn tensil_tensor_permute(handle: i64, dims: *const i64, ndim: usize) -> i64 {
    export_handle(|| {
        let dims = slice_arg(dims, ndim, "dims")?;
        publish(ops::permute(&tensor(handle)?, dims)?)
    })
}

#[no_mangle]
pub extern "C" fn tensil_tensor_transpose(handle: i64, dim0: i64, dim1: i64) -> i64 {
    export_handle(|| publish(ops::transpose(&tensor(handle)?, dim0, dim1)?))
}

/// `1` when equal, `0` when not, `-1` on error.
#[no_mangle]
pub extern "C" fn tensil_tensor_content_equal(a: i64, b: i64) -> c_int {
    ffi_guard(-1, || {
        clear_error();
        let result = tensor(a)
            .and_then(|a| tensor(b).and_then(|b| ops::content_equal(&a, &b)))
            .map(c_int::from);
        report(-1, result)
    })
}

#[no_mangle]
pub extern "C" fn tensil_tensor_sub_scalar(handle: i64, scalar: f64) -> i64 {
    export_handle(|| publish(ops::sub_scalar(&tensor(handle)?, scalar)?))
}

#[no_mangle]
pub extern "C" fn tensil_tensor_div_scalar(handle: i64, scalar: f64) -> i64 {
    export_handle(|| publish(ops::div_scalar(&tensor(handle)?, scalar)?))
}

/// Returns the part handles as native-endian `i64`s; free with `tensil_free`.
#[no_mangle]
pub extern "C" fn tensil_tensor_split_sections(handle: i64, sections: i64, dim: i64) -> FfiSlice {
    export_slice(|| {
        let parts = ops::split_sections(&tensor(handle)?, sections, dim)?;
        Ok(i64_slice(&publish_all(parts)?))
    })
}

#[no_mangle]
/// # Safety
/// `indices` must point to `count` values. Free the result with `tensil_free`.
pub unsafe extern "C" fn tensil_tensor_split_indices(
    handle: i64,
    indices: *const i64,
    count: usize,
    dim: i64,
) -> FfiSlice {
    export_slice(|| {
        let indices = slice_arg(indices, count, "indices")?;
        let parts = ops::split_indices(&tensor(handle)?, indices, dim)?;
        Ok(i64_slice(&publish_all(parts)?))
    })
}

#[no_mangle]
pub extern "C" fn tensil_tensor_squeeze(handle: i64) -> i64 {
    export_handle(|| publish(ops::squeeze(&tensor(handle)?)?))
}

#[no_mangle]
pub extern "C" fn tensil_tensor_squeeze_dim(handle: i64, dim: i64) -> i64 {
    export_handle(|| publish(ops::squeeze_dim(&tensor(handle)?, dim)?))
}

#[no_mangle]
pub extern "C" fn tensil_tensor_unsqueeze(handle: i64, dim: i64) -> i64 {
    export_handle(|| publish(ops::unsqueeze(&tensor(handle)?, dim)?))
}

/// Negates `handle`. With `inplace != 0` the storage behind `handle` is
/// replaced and the same handle is returned.
#[no_mangle]
pub extern "C" fn tensil_tensor_neg(handle: i64, inplace: c_int) -> i64 {
    export_handle(|| {
        let t = tensor(handle)?;
        let inplace = inplace != 0;
        match (ops::neg(&t, inplace)?, inplace) {
            (Some(out), true) => {
                registry::replace_tensor(handle, out)?;
                Ok(handle)
            }
            (None, true) => Ok(handle),
            (Some(out), false) => publish(out),
            (None, false) => Err(NativeError::native("negation produced no result")),
        }
    })
}

macro_rules! unary_exports {
    ($($name:ident => $op:ident),* $(,)?) => {
        $(
            #[no_mangle]
            pub extern "C" fn $name(handle: i64) -> i64 {
                export_handle(|| publish(ops::unary(UnaryOp::$op, &tensor(handle)?)?))
            }
        )*
    };
}

unary_exports! {
    tensil_tensor_abs => Abs,
    tensil_tensor_sqrt => Sqrt,
    tensil_tensor_floor => Floor,
    tensil_tensor_ceil => Ceil,
    tensil_tensor_round => Round,
    tensil_tensor_trunc => Trunc,
    tensil_tensor_exp => Exp,
    tensil_tensor_log => Log,
    tensil_tensor_log10 => Log10,
    tensil_tensor_log2 => Log2,
    tensil_tensor_sin => Sin,
    tensil_tensor_cos => Cos,
    tensil_tensor_tan => Tan,
    tensil_tensor_asin => Asin,
    tensil_tensor_acos => Acos,
    tensil_tensor_atan => Atan,
    tensil_tensor_sinh => Sinh,
    tensil_tensor_cosh => Cosh,
    tensil_tensor_tanh => Tanh,
    tensil_tensor_all => All,
    tensil_tensor_any => Any,
    tensil_tensor_none => NoneOf,
}

macro_rules! compare_exports {
    ($($name:ident => $op:ident),* $(,)?) => {
        $(
            #[no_mangle]
            pub extern "C" fn $name(a: i64, b: i64) -> i64 {
                export_handle(|| publish(ops::compare(CompareOp::$op, &tensor(a)?, &tensor(b)?)?))
            }
        )*
    };
}

compare_exports! {
    tensil_tensor_eq => Eq,
    tensil_tensor_neq => Neq,
    tensil_tensor_gt => Gt,
    tensil_tensor_gte => Gte,
    tensil_tensor_lt => Lt,
    tensil_tensor_lte => Lte,
}

#[no_mangle]
/// # Safety
/// `mean` and `std` must each point to `count` values.
pub unsafe extern "C" fn tensil_tensor_normalize(
    handle: i64,
    mean: *const f64,
    std: *const f64,
    count: usize,
) -> i64 {
    export_handle(|| {
        let mean = slice_arg(mean, count, "mean")?;
        let std = slice_arg(std, count, "std")?;
        publish(ops::normalize(&tensor(handle)?, mean, std)?)
    })
}

#[no_mangle]
pub extern "C" fn tensil_tensor_resize(
    handle: i64,
    height: i64,
    width: i64,
    align_corners: c_int,
) -> i64 {
    export_handle(|| {
        publish(ops::resize(&tensor(handle)?, height, width, align_corners != 0)?)
    })
}

#[no_mangle]
pub extern "C" fn tensil_tensor_to_tensor(handle: i64) -> i64 {
    export_handle(|| publish(ops::to_tensor(&tensor(handle)?)?))
}

/// Dtype code, `8` for a dtype outside the code table, `-1` on error.
#[no_mangle]
pub extern "C" fn tensil_tensor_dtype(handle: i64) -> c_int {
    ffi_guard(-1, || {
        clear_error();
        let result = tensor(handle)
            .and_then(|t| ops::meta(&t))
            .map(|meta| meta.dtype.map(DType::code).unwrap_or(8));
        report(-1, result)
    })
}

#[no_mangle]
/// # Safety
/// `out` must point to two writable ints.
pub unsafe extern "C" fn tensil_tensor_device(handle: i64, out: *mut c_int) -> c_int {
    export_status(|| {
        if out.is_null() {
            return Err(NativeError::invalid("Null device output pointer"));
        }
        let pair = ops::meta(&tensor(handle)?)?.device.to_pair();
        *out = pair[0];
        *out.add(1) = pair[1];
        Ok(())
    })
}

/// Layout code or `-1` on error.
#[no_mangle]
pub extern "C" fn tensil_tensor_layout(handle: i64) -> c_int {
    ffi_guard(-1, || {
        clear_error();
        let result = tensor(handle).and_then(|t| ops::meta(&t)).and_then(|meta| {
            meta.layout
                .map(Layout::code)
                .ok_or_else(|| NativeError::unsupported("unsupported data format"))
        });
        report(-1, result)
    })
}

#[no_mangle]
pub extern "C" fn tensil_tensor_ndim(handle: i64) -> i64 {
    ffi_guard(-1, || {
        clear_error();
        let result = tensor(handle)
            .and_then(|t| ops::meta(&t))
            .map(|meta| meta.shape.len() as i64);
        report(-1, result)
    })
}

/// Sizes as native-endian `i64`s; free with `tensil_free`.
#[no_mangle]
pub extern "C" fn tensil_tensor_sizes(handle: i64) -> FfiSlice {
    export_slice(|| Ok(i64_slice(&ops::meta(&tensor(handle)?)?.shape)))
}

#[no_mangle]
/// # Safety
/// `out_ptr` and `out_len` must be valid writable pointers. The bytes stay
/// valid until `tensil_view_free` is called with the returned view id.
pub unsafe extern "C" fn tensil_tensor_data_view(
    handle: i64,
    out_ptr: *mut *const u8,
    out_len: *mut usize,
) -> i64 {
    export_handle(|| {
        if out_ptr.is_null() || out_len.is_null() {
            return Err(NativeError::invalid("Null view output pointer"));
        }
        let (pinned, data, len) = ops::host_bytes(&tensor(handle)?)?;
        let id = registry::pin_view(pinned)?;
        *out_ptr = data;
        *out_len = len;
        Ok(id)
    })
}

#[no_mangle]
pub extern "C" fn tensil_view_free(view: i64) -> c_int {
    export_status(|| registry::release_view(view))
}

#[no_mangle]
pub extern "C" fn tensil_tensor_retain(handle: i64) -> c_int {
    export_status(|| registry::retain_tensor(handle))
}

#[no_mangle]
pub extern "C" fn tensil_tensor_delete(handle: i64) -> c_int {
    export_status(|| registry::release_tensor(handle))
}

#[no_mangle]
pub extern "C" fn tensil_module_load(path: *const c_char) -> i64 {
    export_handle(|| {
        let path = cstr_to_string(path)?;
        registry::register_module(ops::load_module(Path::new(&path))?)
    })
}

#[no_mangle]
pub extern "C" fn tensil_module_eval(handle: i64) -> c_int {
    export_status(|| {
        let module = registry::get_module(handle)?;
        let mut guard = module
            .lock()
            .map_err(|_| NativeError::native("module poisoned"))?;
        guard.eval();
        Ok(())
    })
}

#[no_mangle]
/// # Safety
/// `inputs` must point to `count` handles. The returned slice holds one
/// native-endian `i64` handle per output and is released with `tensil_free`.
pub unsafe extern "C" fn tensil_module_forward(
    handle: i64,
    inputs: *const i64,
    count: usize,
) -> FfiSlice {
    export_slice(|| {
        let module = registry::get_module(handle)?;
        let inputs = slice_arg(inputs, count, "input list")?
            .iter()
            .map(|h| tensor(*h))
            .collect::<NativeResult<Vec<_>>>()?;
        let outputs = {
            let guard = module
                .lock()
                .map_err(|_| NativeError::native("module poisoned"))?;
            guard.forward(&inputs)?
        };
        Ok(i64_slice(&publish_all(outputs)?))
    })
}

#[no_mangle]
pub extern "C" fn tensil_module_delete(handle: i64) -> c_int {
    export_status(|| registry::release_module(handle))
}
