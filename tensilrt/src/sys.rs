//! Binding of the flat `tensil_` C ABI.
//!
//! The same symbol list is bound either to the statically linked
//! `tensil_native` crate or to a dynamic library opened with `libloading`.

use std::os::raw::{c_char, c_int};
use std::path::{Path, PathBuf};

use libloading::Library;

use crate::error::{Result, TensilError};

/// ABI revision this crate was written against.
pub const TENSIL_ABI_VERSION: u32 = 2;

#[cfg(feature = "linked")]
pub(crate) use tensil_native::FfiSlice as RawSlice;

/// Owned byte buffer returned across the boundary; freed with `tensil_free`.
#[cfg(not(feature = "linked"))]
#[repr(C)]
pub(crate) struct RawSlice {
    pub ptr: *mut u8,
    pub len: usize,
}

macro_rules! symbols {
    ($($field:ident = $name:ident: fn($($arg:ty),*) $(-> $ret:ty)?;)*) => {
        #[derive(Debug, Clone, Copy)]
        pub(crate) struct Symbols {
            $(pub(crate) $field: unsafe extern "C" fn($($arg),*) $(-> $ret)?,)*
        }

        impl Symbols {
            /// Every bound symbol name, in binding order.
            pub(crate) const NAMES: &'static [&'static str] = &[$(stringify!($name)),*];

            #[cfg(feature = "linked")]
            pub(crate) fn linked() -> Self {
                Symbols {
                    $($field: tensil_native::$name as unsafe extern "C" fn($($arg),*) $(-> $ret)?,)*
                }
            }

            /// # Safety
            /// `lib` must export the `tensil_` ABI with the listed signatures and
            /// must outlive every pointer copied out of the returned table.
            pub(crate) unsafe fn load(lib: &Library) -> Result<Self> {
                Ok(Symbols {
                    $($field: {
                        let s: libloading::Symbol<unsafe extern "C" fn($($arg),*) $(-> $ret)?> = lib
                            .get(concat!(stringify!($name), "\0").as_bytes())
                            .map_err(|e| {
                                TensilError::Library(format!(
                                    "load symbol {}: {e}",
                                    stringify!($name)
                                ))
                            })?;
                        *s
                    },)*
                })
            }
        }
    };
}

symbols! {
    abi_version = tensil_abi_version: fn() -> u32;
    last_error = tensil_last_error: fn() -> *const c_char;
    last_error_kind = tensil_last_error_kind: fn() -> c_int;
    free = tensil_free: fn(*mut u8, usize);
    backend_set = tensil_backend_set: fn(*const c_char) -> c_int;
    backend_current = tensil_backend_current: fn() -> c_int;
    live_tensors = tensil_live_tensors: fn() -> i64;
    live_modules = tensil_live_modules: fn() -> i64;
    live_views = tensil_live_views: fn() -> i64;

    empty = tensil_tensor_empty: fn(*const i64, usize, c_int, c_int, c_int, *const c_int) -> i64;
    zeros = tensil_tensor_zeros: fn(*const i64, usize, c_int, c_int, c_int, *const c_int) -> i64;
    ones = tensil_tensor_ones: fn(*const i64, usize, c_int, c_int, c_int, *const c_int) -> i64;
    full = tensil_tensor_full: fn(*const i64, usize, f64, c_int, c_int, c_int, *const c_int) -> i64;
    arange = tensil_tensor_arange: fn(i64, i64, i64, c_int, *const c_int) -> i64;
    arange_f64 = tensil_tensor_arange_f64: fn(f64, f64, f64, c_int, *const c_int) -> i64;
    from_blob = tensil_tensor_from_blob:
        fn(*const u8, usize, *const i64, usize, c_int, c_int, c_int, *const c_int) -> i64;
    stack = tensil_tensor_stack: fn(*const i64, usize, i64) -> i64;

    to = tensil_tensor_to: fn(i64, c_int, c_int, *const c_int) -> i64;
    get = tensil_tensor_get: fn(i64, i64) -> i64;
    reshape = tensil_tensor_reshape: fn(i64, *const i64, usize) -> i64;
    softmax = tensil_tensor_softmax: fn(i64, i64) -> i64;
    argmax = tensil_tensor_argmax: fn(i64) -> i64;
    argmax_dim = tensil_tensor_argmax_dim: fn(i64, i64) -> i64;
    argmin = tensil_tensor_argmin: fn(i64) -> i64;
    argmin_dim = tensil_tensor_argmin_dim: fn(i64, i64) -> i64;
    argsort = tensil_tensor_argsort: fn(i64, i64) -> i64;
    sort = tensil_tensor_sort: fn(i64, i64) -> i64;
    permute = tensil_tensor_permute: fn(i64, *const i64, usize) -> i64;
    transpose = tensil_tensor_transpose: fn(i64, i64, i64) -> i64;
    content_equal = tensil_tensor_content_equal: fn(i64, i64) -> c_int;
    sub_scalar = tensil_tensor_sub_scalar: fn(i64, f64) -> i64;
    div_scalar = tensil_tensor_div_scalar: fn(i64, f64) -> i64;
    split_sections = tensil_tensor_split_sections: fn(i64, i64, i64) -> RawSlice;
    split_indices = tensil_tensor_split_indices: fn(i64, *const i64, usize, i64) -> RawSlice;
    squeeze = tensil_tensor_squeeze: fn(i64) -> i64;
    squeeze_dim = tensil_tensor_squeeze_dim: fn(i64, i64) -> i64;
    unsqueeze = tensil_tensor_unsqueeze: fn(i64, i64) -> i64;
    neg = tensil_tensor_neg: fn(i64, c_int) -> i64;

    abs = tensil_tensor_abs: fn(i64) -> i64;
    sqrt = tensil_tensor_sqrt: fn(i64) -> i64;
    floor = tensil_tensor_floor: fn(i64) -> i64;
    ceil = tensil_tensor_ceil: fn(i64) -> i64;
    round = tensil_tensor_round: fn(i64) -> i64;
    trunc = tensil_tensor_trunc: fn(i64) -> i64;
    exp = tensil_tensor_exp: fn(i64) -> i64;
    log = tensil_tensor_log: fn(i64) -> i64;
    log10 = tensil_tensor_log10: fn(i64) -> i64;
    log2 = tensil_tensor_log2: fn(i64) -> i64;
    sin = tensil_tensor_sin: fn(i64) -> i64;
    cos = tensil_tensor_cos: fn(i64) -> i64;
    tan = tensil_tensor_tan: fn(i64) -> i64;
    asin = tensil_tensor_asin: fn(i64) -> i64;
    acos = tensil_tensor_acos: fn(i64) -> i64;
    atan = tensil_tensor_atan: fn(i64) -> i64;
    sinh = tensil_tensor_sinh: fn(i64) -> i64;
    cosh = tensil_tensor_cosh: fn(i64) -> i64;
    tanh = tensil_tensor_tanh: fn(i64) -> i64;
    all = tensil_tensor_all: fn(i64) -> i64;
    any = tensil_tensor_any: fn(i64) -> i64;
    none = tensil_tensor_none: fn(i64) -> i64;

    eq = tensil_tensor_eq: fn(i64, i64) -> i64;
    neq = tensil_tensor_neq: fn(i64, i64) -> i64;
    gt = tensil_tensor_gt: fn(i64, i64) -> i64;
    gte = tensil_tensor_gte: fn(i64, i64) -> i64;
    lt = tensil_tensor_lt: fn(i64, i64) -> i64;
    lte = tensil_tensor_lte: fn(i64, i64) -> i64;

    normalize = tensil_tensor_normalize: fn(i64, *const f64, *const f64, usize) -> i64;
    resize = tensil_tensor_resize: fn(i64, i64, i64, c_int) -> i64;
    to_tensor = tensil_tensor_to_tensor: fn(i64) -> i64;

    dtype = tensil_tensor_dtype: fn(i64) -> c_int;
    device = tensil_tensor_device: fn(i64, *mut c_int) -> c_int;
    layout = tensil_tensor_layout: fn(i64) -> c_int;
    ndim = tensil_tensor_ndim: fn(i64) -> i64;
    sizes = tensil_tensor_sizes: fn(i64) -> RawSlice;
    data_view = tensil_tensor_data_view: fn(i64, *mut *const u8, *mut usize) -> i64;
    view_free = tensil_view_free: fn(i64) -> c_int;
    retain = tensil_tensor_retain: fn(i64) -> c_int;
    delete = tensil_tensor_delete: fn(i64) -> c_int;

    module_load = tensil_module_load: fn(*const c_char) -> i64;
    module_eval = tensil_module_eval: fn(i64) -> c_int;
    module_forward = tensil_module_forward: fn(i64, *const i64, usize) -> RawSlice;
    module_delete = tensil_module_delete: fn(i64) -> c_int;
}

impl Symbols {
    pub(crate) fn contains(name: &str) -> bool {
        Self::NAMES.contains(&name)
    }
}

pub(crate) fn check_abi(found: u32) -> Result<()> {
    if found != TENSIL_ABI_VERSION {
        return Err(TensilError::Library(format!(
            "native library speaks ABI {found}, expected {TENSIL_ABI_VERSION}"
        )));
    }
    Ok(())
}

/// Opens the native library at `path`; a directory is searched for the
/// platform file name of `tensil_native`.
pub(crate) fn load_library(path: &Path) -> Result<Library> {
    let mut last_err: Option<String> = None;
    for candidate in library_candidates(path) {
        match unsafe { Library::new(&candidate) } {
            Ok(lib) => return Ok(lib),
            Err(err) => last_err = Some(format!("{}: {err}", candidate.display())),
        }
    }
    let reason = last_err.unwrap_or_else(|| "not found".to_string());
    Err(TensilError::Library(format!(
        "Failed to load tensil_native: {reason}"
    )))
}

fn library_candidates(path: &Path) -> Vec<PathBuf> {
    if path.is_dir() {
        vec![path.join(lib_name("tensil_native"))]
    } else {
        vec![path.to_path_buf()]
    }
}

pub(crate) fn lib_name(base: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{base}.dll")
    } else if cfg!(target_os = "macos") {
        format!("lib{base}.dylib")
    } else {
        format!("lib{base}.so")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abi_mismatch_is_a_library_error() {
        assert!(check_abi(TENSIL_ABI_VERSION).is_ok());
        assert!(matches!(check_abi(TENSIL_ABI_VERSION + 1), Err(TensilError::Library(_))));
    }

    #[cfg(feature = "linked")]
    #[test]
    fn linked_library_matches_this_abi() {
        assert_eq!(tensil_native::TENSIL_ABI_VERSION, TENSIL_ABI_VERSION);
        let symbols = Symbols::linked();
        check_abi(unsafe { (symbols.abi_version)() }).unwrap();
    }

    #[test]
    fn directories_resolve_to_platform_file() {
        let dir = tempfile::tempdir().unwrap();
        let candidates = library_candidates(dir.path());
        assert_eq!(candidates, vec![dir.path().join(lib_name("tensil_native"))]);
    }

    #[test]
    fn missing_library_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_library(&dir.path().join("nope.so")).unwrap_err();
        assert!(matches!(err, TensilError::Library(_)));
    }
}
