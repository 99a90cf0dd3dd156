use tensilrt::{DataType, Device, Engine, Shape, TensilError, Tensor, TensorManager};

fn manager() -> TensorManager {
    Engine::linked().unwrap().new_manager()
}

fn f32s(manager: &TensorManager, values: &[f32], shape: &[i64]) -> Tensor {
    manager.from_slice(values, shape, Device::cpu()).unwrap()
}

fn bools(t: &Tensor) -> Vec<bool> {
    assert_eq!(t.dtype().unwrap(), DataType::Boolean);
    t.to_bytes().unwrap().as_bytes().iter().map(|b| *b != 0).collect()
}

#[test]
fn comparisons_broadcast() {
    let m = manager();
    let a = f32s(&m, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
    let b = f32s(&m, &[2.0, 5.0, 3.0], &[3]);
    assert_eq!(bools(&a.gt(&b).unwrap()), [false, false, false, true, false, true]);
    assert_eq!(bools(&a.eq(&b).unwrap()), [false, false, true, false, true, false]);
    assert_eq!(bools(&a.lte_scalar(3.0).unwrap()), [true, true, true, false, false, false]);
    assert_eq!(bools(&a.neq_scalar(1.0).unwrap())[0], false);
    assert_eq!(a.gte(&b).unwrap().shape().unwrap(), Shape::from([2, 3]));
}

#[test]
fn mixed_devices_are_rejected() {
    let m = manager();
    let cpu = m.ones([2], DataType::Float32, Device::cpu()).unwrap();
    let gpu = m.ones([2], DataType::Float32, Device::gpu(0)).unwrap();
    let before = m.len();
    let err = cpu.eq(&gpu).unwrap_err();
    assert!(matches!(err, TensilError::InvalidArgument(_)));
    assert_eq!(m.len(), before);
}

#[test]
fn content_equality() {
    let m = manager();
    let a = f32s(&m, &[1.0, 2.0], &[2]);
    let b = f32s(&m, &[1.0, 2.0], &[2]);
    let c = f32s(&m, &[1.0, 3.0], &[2]);
    assert!(a.content_equals(&b).unwrap());
    assert!(!a.content_equals(&c).unwrap());
    let ints = a.to_dtype(DataType::Int32, true).unwrap();
    assert!(!a.content_equals(&ints).unwrap());
    assert!(!a.content_equals(&a.reshape([1, 2]).unwrap()).unwrap());
}

#[test]
fn conversions() {
    let m = manager();
    let a = f32s(&m, &[1.7, -2.2], &[2]);
    let ints = a.to_dtype(DataType::Int32, true).unwrap();
    assert_eq!(ints.to_vec::<i32>().unwrap(), vec![1, -2]);

    let moved = a.to_device(Device::gpu(1), false).unwrap();
    assert_eq!(moved.device().unwrap(), Device::gpu(1));
    assert_eq!(moved.dtype().unwrap(), DataType::Float32);
    assert!(matches!(
        a.to_dtype(DataType::Unknown, true),
        Err(TensilError::InvalidArgument(_))
    ));
    assert!(a.to_vec::<f64>().is_err());
}

#[test]
fn shape_transforms() {
    let m = manager();
    let a = m.arange(0, 6, 1, DataType::Float32, Device::cpu()).unwrap();
    let grid = a.reshape([2, -1]).unwrap();
    assert_eq!(grid.shape().unwrap().dims(), &[2, 3]);

    let t = grid.transpose().unwrap();
    assert_eq!(t.shape().unwrap().dims(), &[3, 2]);
    assert_eq!(t.to_vec::<f32>().unwrap(), vec![0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);
    assert!(t.content_equals(&grid.swap_axes(0, 1).unwrap()).unwrap());
    assert!(t.content_equals(&grid.permute(&[1, 0]).unwrap()).unwrap());

    let e = grid.expand_dims(0).unwrap();
    assert_eq!(e.shape().unwrap().dims(), &[1, 2, 3]);
    assert_eq!(e.squeeze().unwrap().shape().unwrap().dims(), &[2, 3]);
    assert_eq!(e.squeeze_axis(0).unwrap().shape().unwrap().dims(), &[2, 3]);

    assert!(matches!(a.reshape([4, -1]), Err(TensilError::InvalidArgument(_))));
}

#[test]
fn splitting() {
    let m = manager();
    let a = m.arange(0, 6, 1, DataType::Int64, Device::cpu()).unwrap();
    let parts = a.split_sections(3, 0).unwrap();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[1].to_vec::<i64>().unwrap(), vec![2, 3]);

    let parts = a.split_indices(&[1, 4], 0).unwrap();
    let sizes: Vec<i64> = parts.iter().map(|p| p.shape().unwrap().size()).collect();
    assert_eq!(sizes, vec![1, 3, 2]);

    assert!(matches!(a.split_sections(4, 0), Err(TensilError::InvalidArgument(_))));
}

#[test]
fn sorting_and_arg_reductions() {
    let m = manager();
    let a = f32s(&m, &[3.0, 1.0, 2.0, 0.0, 5.0, 4.0], &[2, 3]);
    assert_eq!(a.sort().unwrap().to_vec::<f32>().unwrap(), vec![1.0, 2.0, 3.0, 0.0, 4.0, 5.0]);
    assert_eq!(
        a.sort_axis(0).unwrap().to_vec::<f32>().unwrap(),
        vec![0.0, 1.0, 2.0, 3.0, 5.0, 4.0]
    );
    let order = a.arg_sort(-1, true).unwrap();
    assert_eq!(order.to_vec::<i64>().unwrap(), vec![1, 2, 0, 0, 2, 1]);
    assert!(matches!(a.arg_sort(-1, false), Err(TensilError::UnsupportedOperation(_))));

    let flat = a.arg_max().unwrap();
    assert!(flat.shape().unwrap().is_scalar());
    assert_eq!(flat.to_vec::<i64>().unwrap(), vec![4]);
    assert_eq!(a.arg_min().unwrap().to_vec::<i64>().unwrap(), vec![3]);
    assert_eq!(a.arg_max_axis(1).unwrap().to_vec::<i64>().unwrap(), vec![0, 1]);
    assert_eq!(a.arg_min_axis(0).unwrap().to_vec::<i64>().unwrap(), vec![1, 0, 0]);
}

#[test]
fn softmax_and_scalar_arithmetic() {
    let m = manager();
    let a = f32s(&m, &[1.0, 2.0, 3.0], &[3]);
    let s = a.softmax(-1).unwrap().to_vec::<f32>().unwrap();
    assert!((s.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    assert!(s[2] > s[1] && s[1] > s[0]);
    assert!(a.softmax_with_temperature(0, 1.0).is_ok());
    assert!(a.softmax_with_temperature(0, 2.0).unwrap_err().is_unsupported());

    assert_eq!(a.sub_scalar(1.0).unwrap().to_vec::<f32>().unwrap(), vec![0.0, 1.0, 2.0]);
    assert_eq!(a.div_scalar(2.0).unwrap().to_vec::<f32>().unwrap(), vec![0.5, 1.0, 1.5]);

    let ints = m.from_slice(&[1i64, 2], [2], Device::cpu()).unwrap();
    assert_eq!(ints.div_scalar(2.0).unwrap().dtype().unwrap(), DataType::Float32);
    assert_eq!(ints.sub_scalar(1.0).unwrap().dtype().unwrap(), DataType::Int64);
}

#[test]
fn element_wise_math() {
    let m = manager();
    let a = f32s(&m, &[-2.5, 0.5, 1.5, 4.0], &[4]);
    assert_eq!(a.abs().unwrap().to_vec::<f32>().unwrap(), vec![2.5, 0.5, 1.5, 4.0]);
    assert_eq!(a.round().unwrap().to_vec::<f32>().unwrap(), vec![-2.0, 0.0, 2.0, 4.0]);
    assert_eq!(a.floor().unwrap().to_vec::<f32>().unwrap(), vec![-3.0, 0.0, 1.0, 4.0]);
    assert_eq!(a.ceil().unwrap().to_vec::<f32>().unwrap(), vec![-2.0, 1.0, 2.0, 4.0]);
    assert_eq!(a.trunc().unwrap().to_vec::<f32>().unwrap(), vec![-2.0, 0.0, 1.0, 4.0]);
    assert_eq!(a.sqrt().unwrap().to_vec::<f32>().unwrap()[3], 2.0);
    assert_eq!(a.exp().unwrap().dtype().unwrap(), DataType::Float32);
    let ones = m.ones([2], DataType::Float64, Device::cpu()).unwrap();
    assert_eq!(ones.log().unwrap().to_vec::<f64>().unwrap(), vec![0.0, 0.0]);
    assert_eq!(ones.tanh().unwrap().dtype().unwrap(), DataType::Float64);
    for op in [Tensor::sin, Tensor::cos, Tensor::tan, Tensor::atan, Tensor::sinh, Tensor::cosh] {
        assert_eq!(op(&ones).unwrap().shape().unwrap().dims(), &[2]);
    }
}

#[test]
fn boolean_reductions() {
    let m = manager();
    let a = f32s(&m, &[0.0, 1.0], &[2]);
    assert_eq!(bools(&a.all().unwrap()), [false]);
    assert_eq!(bools(&a.any().unwrap()), [true]);
    assert_eq!(bools(&a.none().unwrap()), [false]);
    let zeros = m.zeros([3], DataType::Int32, Device::cpu()).unwrap();
    assert_eq!(bools(&zeros.none().unwrap()), [true]);
    assert!(zeros.all().unwrap().shape().unwrap().is_scalar());
}

#[test]
fn image_helpers() {
    let m = manager();
    let pixels: Vec<u8> = (0..12).map(|v| v * 20).collect();
    let hwc = m.from_slice(&pixels, [2, 2, 3], Device::cpu()).unwrap();

    let chw = hwc.to_chw_tensor().unwrap();
    assert_eq!(chw.shape().unwrap().dims(), &[3, 2, 2]);
    assert_eq!(chw.dtype().unwrap(), DataType::Float32);
    let values = chw.to_vec::<f32>().unwrap();
    assert!((values[1] - 60.0 / 255.0).abs() < 1e-6);

    let normalized = chw.normalize(&[0.5, 0.5, 0.5], &[0.5, 0.5, 0.5]).unwrap();
    assert_eq!(normalized.to_vec::<f32>().unwrap()[0], -1.0);
    assert!(chw.normalize(&[0.5], &[0.5, 0.5]).is_err());

    let big = hwc.resize(4, 4, true).unwrap();
    assert_eq!(big.shape().unwrap().dims(), &[4, 4, 3]);
    let corners = big.to_vec::<f32>().unwrap();
    assert_eq!(corners[0], 0.0);
    assert_eq!(corners[corners.len() - 1], 220.0);
}

#[test]
fn placeholders_fail_fast() {
    let m = manager();
    let a = f32s(&m, &[1.0, 2.0], &[2]);
    let b = f32s(&m, &[3.0, 4.0], &[2]);
    let before = m.len();
    assert!(a.add(&b).unwrap_err().is_unsupported());
    assert!(a.square().unwrap_err().is_unsupported());
    assert!(a.sum_axes(&[0], true).unwrap_err().is_unsupported());
    assert!(a.to_sparse(tensilrt::SparseFormat::Coo).unwrap_err().is_unsupported());
    assert!(a.set(&b, 1.0).unwrap_err().is_unsupported());
    assert!(a.gradient().unwrap_err().is_unsupported());
    assert_eq!(m.len(), before);
}

#[test]
fn int64_results_are_exact_above_2_pow_53() {
    let m = manager();
    let big = (1i64 << 53) + 1;
    let a = m.from_slice(&[big], [1], Device::cpu()).unwrap();
    let b = m.from_slice(&[big - 1], [1], Device::cpu()).unwrap();
    assert!(!a.content_equals(&b).unwrap());
    assert_eq!(a.neg().unwrap().to_vec::<i64>().unwrap(), vec![-big]);
    assert_eq!(bools(&a.gt(&b).unwrap()), vec![true]);
    assert!(a.sub_scalar(1.0).unwrap().content_equals(&b).unwrap());

    let lane = m.from_slice(&[big + 2, big, big - 1], [3], Device::cpu()).unwrap();
    assert_eq!(lane.sort().unwrap().to_vec::<i64>().unwrap(), vec![big - 1, big, big + 2]);
    assert_eq!(lane.arg_max().unwrap().to_vec::<i64>().unwrap(), vec![0]);
}

#[test]
fn integer_arange_keeps_large_bounds() {
    let m = manager();
    let start = (1i64 << 60) + 1;
    let t = m.arange(start, start + 6, 2, DataType::Int64, Device::cpu()).unwrap();
    assert_eq!(t.to_vec::<i64>().unwrap(), vec![start, start + 2, start + 4]);
}

