use std::ffi::{CStr, CString};
use std::ptr;

use tensil_native::*;

fn tensor(values: &[f64], shape: &[i64], dtype: DType) -> i64 {
    let bytes: Vec<u8> = match dtype {
        DType::Float64 => values.iter().flat_map(|v| v.to_ne_bytes()).collect(),
        DType::Int64 => values.iter().flat_map(|v| (*v as i64).to_ne_bytes()).collect(),
        _ => values.iter().flat_map(|v| (*v as f32).to_ne_bytes()).collect(),
    };
    let dtype = if matches!(dtype, DType::Float64 | DType::Int64) {
        dtype
    } else {
        DType::Float32
    };
    let h = unsafe {
        tensil_tensor_from_blob(
            bytes.as_ptr(),
            bytes.len(),
            shape.as_ptr(),
            shape.len(),
            dtype.code(),
            0,
            0,
            ptr::null(),
        )
    };
    assert!(h > 0, "{}", last_error());
    h
}

fn last_error() -> String {
    let ptr = tensil_last_error();
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

fn bytes_of(h: i64) -> Vec<u8> {
    let mut data = ptr::null();
    let mut len = 0usize;
    let view = unsafe { tensil_tensor_data_view(h, &mut data, &mut len) };
    assert!(view > 0, "{}", last_error());
    let out = unsafe { std::slice::from_raw_parts(data, len) }.to_vec();
    assert_eq!(tensil_view_free(view), 0);
    out
}

fn sizes(h: i64) -> Vec<i64> {
    let slice = tensil_tensor_sizes(h);
    let out = unsafe { std::slice::from_raw_parts(slice.ptr, slice.len) }
        .chunks_exact(8)
        .map(|c| i64::from_ne_bytes(c.try_into().unwrap()))
        .collect();
    unsafe { tensil_free(slice.ptr, slice.len) };
    out
}

fn i64s(h: i64) -> Vec<i64> {
    assert_eq!(tensil_tensor_dtype(h), DType::Int64.code());
    bytes_of(h)
        .chunks_exact(8)
        .map(|c| i64::from_ne_bytes(c.try_into().unwrap()))
        .collect()
}

fn bools(h: i64) -> Vec<bool> {
    assert_eq!(tensil_tensor_dtype(h), DType::Boolean.code());
    bytes_of(h).into_iter().map(|b| b != 0).collect()
}

fn f32s(h: i64) -> Vec<f32> {
    assert_eq!(tensil_tensor_dtype(h), DType::Float32.code());
    bytes_of(h)
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes(c.try_into().unwrap()))
        .collect()
}

fn int64_tensor(values: &[i64]) -> i64 {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
    let shape = [values.len() as i64];
    let h = unsafe {
        tensil_tensor_from_blob(
            bytes.as_ptr(),
            bytes.len(),
            shape.as_ptr(),
            1,
            DType::Int64.code(),
            0,
            0,
            ptr::null(),
        )
    };
    assert!(h > 0, "{}", last_error());
    h
}

fn take_handles(slice: FfiSlice) -> Vec<i64> {
    assert!(!slice.ptr.is_null(), "{}", last_error());
    let out = unsafe { std::slice::from_raw_parts(slice.ptr, slice.len) }
        .chunks_exact(8)
        .map(|c| i64::from_ne_bytes(c.try_into().unwrap()))
        .collect();
    unsafe { tensil_free(slice.ptr, slice.len) };
    out
}

fn write_module(dir: &tempfile::TempDir, name: &str, body: &str) -> CString {
    let path = dir.path().join(name);
    std::fs::write(&path, body).unwrap();
    CString::new(path.to_string_lossy().into_owned()).unwrap()
}

#[test]
fn comparisons_broadcast_to_bool() {
    let a = tensor(&[1.0, 2.0, 3.0, 4.0], &[2, 2], DType::Float32);
    let b = tensor(&[2.0], &[1], DType::Float32);
    let ge = tensil_tensor_gte(a, b);
    assert_eq!(sizes(ge), vec![2, 2]);
    assert_eq!(bools(ge), vec![false, true, true, true]);
    let ne = tensil_tensor_neq(a, b);
    assert_eq!(bools(ne), vec![true, false, true, true]);
    for h in [a, b, ge, ne] {
        tensil_tensor_delete(h);
    }
}

#[test]
fn content_equal_checks_dtype_and_shape() {
    let a = tensor(&[1.0, 2.0], &[2], DType::Float32);
    let b = tensor(&[1.0, 2.0], &[2], DType::Float32);
    let c = tensor(&[1.0, 2.0], &[1, 2], DType::Float32);
    let d = tensor(&[1.0, 2.0], &[2], DType::Float64);
    assert_eq!(tensil_tensor_content_equal(a, b), 1);
    assert_eq!(tensil_tensor_content_equal(a, c), 0);
    assert_eq!(tensil_tensor_content_equal(a, d), 0);
    for h in [a, b, c, d] {
        tensil_tensor_delete(h);
    }
}

#[test]
fn to_converts_dtype_and_device() {
    let a = tensor(&[1.5, -2.5], &[2], DType::Float32);
    let gpu = [1, 0];
    let b = unsafe { tensil_tensor_to(a, DType::Int64.code(), 0, gpu.as_ptr()) };
    assert!(b > 0);
    assert_eq!(i64s(b), vec![1, -2]);
    let mut device = [0i32; 2];
    unsafe { tensil_tensor_device(b, device.as_mut_ptr()) };
    assert_eq!(device, gpu);
    tensil_tensor_delete(a);
    tensil_tensor_delete(b);
}

#[test]
fn shape_transforms() {
    let a = unsafe { tensil_tensor_arange(0, 6, 1, DType::Float32.code(), ptr::null()) };
    let shape = [2i64, -1];
    let r = unsafe { tensil_tensor_reshape(a, shape.as_ptr(), 2) };
    assert_eq!(sizes(r), vec![2, 3]);
    let t = tensil_tensor_transpose(r, 0, 1);
    assert_eq!(f32s(t), vec![0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);
    let dims = [1i64, 0];
    let p = unsafe { tensil_tensor_permute(r, dims.as_ptr(), 2) };
    assert_eq!(tensil_tensor_content_equal(p, t), 1);
    let u = tensil_tensor_unsqueeze(r, 0);
    assert_eq!(sizes(u), vec![1, 2, 3]);
    let s = tensil_tensor_squeeze(u);
    assert_eq!(sizes(s), vec![2, 3]);
    let sd = tensil_tensor_squeeze_dim(u, 1);
    assert_eq!(sizes(sd), vec![1, 2, 3]);
    let row = tensil_tensor_get(r, 1);
    assert_eq!(f32s(row), vec![3.0, 4.0, 5.0]);
    let handles = [r, r];
    let st = unsafe { tensil_tensor_stack(handles.as_ptr(), 2, 0) };
    assert_eq!(sizes(st), vec![2, 2, 3]);
    for h in [a, r, t, p, u, s, sd, row, st] {
        tensil_tensor_delete(h);
    }
}

#[test]
fn get_out_of_range_fails() {
    let a = tensor(&[1.0, 2.0], &[2], DType::Float32);
    assert_eq!(tensil_tensor_get(a, 2), 0);
    assert_eq!(tensil_last_error_kind(), ErrorKind::InvalidArgument as i32);
    tensil_tensor_delete(a);
}

#[test]
fn reductions_and_sorting() {
    let a = tensor(&[3.0, 1.0, 2.0, 9.0, 0.0, 4.0], &[2, 3], DType::Float32);
    let am = tensil_tensor_argmax(a);
    assert_eq!(i64s(am), vec![3]);
    assert!(sizes(am).is_empty());
    let amd = tensil_tensor_argmin_dim(a, 1);
    assert_eq!(i64s(amd), vec![1, 1]);
    let order = tensil_tensor_argsort(a, -1);
    assert_eq!(i64s(order), vec![1, 2, 0, 1, 2, 0]);
    let sorted = tensil_tensor_sort(a, 0);
    assert_eq!(f32s(sorted), vec![3.0, 0.0, 2.0, 9.0, 1.0, 4.0]);
    let any = tensil_tensor_any(a);
    assert_eq!(bools(any), vec![true]);
    let none = tensil_tensor_none(a);
    assert_eq!(bools(none), vec![false]);
    let all = tensil_tensor_all(a);
    assert_eq!(bools(all), vec![false]);
    for h in [a, am, amd, order, sorted, any, none, all] {
        tensil_tensor_delete(h);
    }
}

#[test]
fn scalar_arithmetic_and_softmax() {
    let a = tensor(&[2.0, 4.0], &[2], DType::Float32);
    let s = tensil_tensor_sub_scalar(a, 1.0);
    assert_eq!(f32s(s), vec![1.0, 3.0]);
    let d = tensil_tensor_div_scalar(a, 2.0);
    assert_eq!(f32s(d), vec![1.0, 2.0]);
    let sm = tensil_tensor_softmax(a, 0);
    let probs = f32s(sm);
    assert!((probs[0] + probs[1] - 1.0).abs() < 1e-6);
    assert!(probs[1] > probs[0]);
    for h in [a, s, d, sm] {
        tensil_tensor_delete(h);
    }
}

#[test]
fn image_helpers() {
    let img = tensor(&[0.0, 51.0, 102.0, 255.0], &[2, 2, 1], DType::Float32);
    let chw = tensil_tensor_to_tensor(img);
    assert_eq!(sizes(chw), vec![1, 2, 2]);
    let mean = [0.5];
    let std = [0.5];
    let norm = unsafe { tensil_tensor_normalize(chw, mean.as_ptr(), std.as_ptr(), 1) };
    let values = f32s(norm);
    assert!((values[0] + 1.0).abs() < 1e-6);
    assert!((values[3] - 1.0).abs() < 1e-6);
    let big = tensil_tensor_resize(img, 4, 4, 1);
    assert_eq!(sizes(big), vec![4, 4, 1]);
    for h in [img, chw, norm, big] {
        tensil_tensor_delete(h);
    }
}

#[test]
fn module_forward_applies_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_module(
        &dir,
        "pipeline.json",
        r#"{"format":"tensil-reference","steps":[{"op":"neg"},{"op":"unary","name":"abs"},{"op":"div_scalar","value":2.0}]}"#,
    );
    let module = tensil_module_load(path.as_ptr());
    assert!(module > 0, "{}", last_error());
    assert_eq!(tensil_module_eval(module), 0);
    let x = tensor(&[-2.0, 4.0], &[2], DType::Float32);
    let out = take_handles(unsafe { tensil_module_forward(module, &x, 1) });
    assert_eq!(out.len(), 1);
    assert_eq!(f32s(out[0]), vec![1.0, 2.0]);
    tensil_tensor_delete(out[0]);
    tensil_tensor_delete(x);
    assert_eq!(tensil_module_delete(module), 0);
    assert_eq!(tensil_module_delete(module), 1);
    assert_eq!(tensil_last_error_kind(), ErrorKind::ResourceClosed as i32);
}

#[test]
fn module_load_rejects_missing_file() {
    let path = CString::new("/definitely/not/here.json").unwrap();
    assert_eq!(tensil_module_load(path.as_ptr()), 0);
    assert_eq!(tensil_last_error_kind(), ErrorKind::InvalidArgument as i32);
}

#[test]
fn unknown_backend_is_rejected() {
    let name = CString::new("quantum").unwrap();
    assert_eq!(tensil_backend_set(name.as_ptr()), 1);
    assert_eq!(tensil_backend_current(), 0);
}
#[test]
fn forward_returns_every_output_in_one_call() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_module(
        &dir,
        "fan_out.json",
        r#"{"format":"tensil-reference","steps":[{"op":"split","sections":6,"dim":0},{"op":"neg"}]}"#,
    );
    let module = tensil_module_load(path.as_ptr());
    assert!(module > 0, "{}", last_error());
    let x = tensor(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0], &[6], DType::Float32);
    let out = take_handles(unsafe { tensil_module_forward(module, &x, 1) });
    assert_eq!(out.len(), 6);
    assert_eq!(f32s(out[5]), vec![-5.0]);
    for h in out {
        assert_eq!(tensil_tensor_delete(h), 0);
    }
    assert_eq!(tensil_tensor_delete(x), 0);
    assert_eq!(tensil_module_delete(module), 0);
}

#[test]
fn failed_forward_returns_null_and_publishes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_module(&dir, "neg.json", r#"{"format":"tensil-reference","steps":[{"op":"neg"}]}"#);
    let module = tensil_module_load(path.as_ptr());
    let shape = [2i64];
    let flags = unsafe {
        tensil_tensor_full(shape.as_ptr(), 1, 1.0, DType::Boolean.code(), 0, 0, ptr::null())
    };
    let slice = unsafe { tensil_module_forward(module, &flags, 1) };
    assert!(slice.ptr.is_null());
    assert_eq!(tensil_last_error_kind(), ErrorKind::InvalidArgument as i32);
    let empty = unsafe { tensil_module_forward(module, ptr::null(), 0) };
    assert!(empty.ptr.is_null());
    assert_eq!(tensil_tensor_delete(flags), 0);
    assert_eq!(tensil_module_delete(module), 0);
}

#[test]
fn int64_values_stay_exact_above_2_pow_53() {
    let big = (1i64 << 53) + 1;
    let a = int64_tensor(&[big]);
    let b = int64_tensor(&[big - 1]);
    assert_eq!(tensil_tensor_content_equal(a, b), 0);
    let n = tensil_tensor_neg(a, 0);
    assert_eq!(i64s(n), vec![-big]);
    let gt = tensil_tensor_gt(a, b);
    assert_eq!(bools(gt), vec![true]);
    let shifted = tensil_tensor_sub_scalar(a, 1.0);
    assert_eq!(tensil_tensor_content_equal(shifted, b), 1);
    let lane = int64_tensor(&[big + 2, big, big - 1]);
    let sorted = tensil_tensor_sort(lane, 0);
    assert_eq!(i64s(sorted), vec![big - 1, big, big + 2]);
    for h in [a, b, n, gt, shifted, lane, sorted] {
        assert_eq!(tensil_tensor_delete(h), 0);
    }
}

#[test]
fn integer_arange_keeps_large_bounds() {
    let start = (1i64 << 60) + 1;
    let h = unsafe { tensil_tensor_arange(start, start + 3, 1, DType::Int64.code(), ptr::null()) };
    assert!(h > 0, "{}", last_error());
    assert_eq!(i64s(h), vec![start, start + 1, start + 2]);
    assert_eq!(tensil_tensor_delete(h), 0);
}

#[test]
fn oversized_shapes_fail_without_aborting() {
    let huge = [1i64 << 60];
    let h = unsafe { tensil_tensor_zeros(huge.as_ptr(), 1, DType::Float32.code(), 0, 0, ptr::null()) };
    assert_eq!(h, 0);
    assert_eq!(tensil_last_error_kind(), ErrorKind::Native as i32);
    assert!(last_error().contains("allocation of"), "{}", last_error());

    let overflow = [1i64 << 40, 1 << 40];
    let h = unsafe {
        tensil_tensor_full(overflow.as_ptr(), 2, 1.0, DType::Int8.code(), 0, 0, ptr::null())
    };
    assert_eq!(h, 0);
    assert_eq!(tensil_last_error_kind(), ErrorKind::InvalidArgument as i32);
}
