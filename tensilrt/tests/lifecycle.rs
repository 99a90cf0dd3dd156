use tensilrt::{DataType, Device, Engine, NativeResource, Shape, SparseFormat, TensilError};

fn engine() -> Engine {
    Engine::linked().unwrap()
}

#[test]
fn create_round_trips_metadata() {
    let manager = engine().new_manager();
    let t = manager.zeros([2, 3], DataType::Float32, Device::cpu()).unwrap();
    assert_eq!(t.shape().unwrap(), Shape::from([2, 3]));
    assert_eq!(t.dtype().unwrap(), DataType::Float32);
    assert_eq!(t.device().unwrap(), Device::cpu());
    assert_eq!(t.sparse_format().unwrap(), SparseFormat::Dense);
    assert_eq!(t.to_vec::<f32>().unwrap(), vec![0.0; 6]);
    assert!(manager.contains(t.uid()));
}

#[test]
fn neg_leaves_input_untouched() {
    let manager = engine().new_manager();
    let a = manager.from_slice(&[1.0f32, 2.0, 3.0], [3], Device::cpu()).unwrap();
    let b = a.neg().unwrap();
    assert_ne!(a.handle().unwrap(), b.handle().unwrap());
    assert_eq!(a.to_vec::<f32>().unwrap(), vec![1.0, 2.0, 3.0]);
    assert_eq!(b.to_vec::<f32>().unwrap(), vec![-1.0, -2.0, -3.0]);

    a.close().unwrap();
    b.close().unwrap();
    assert!(matches!(a.shape(), Err(TensilError::ResourceClosed(_))));
    assert!(b.neg().unwrap_err().is_closed());
}

#[test]
fn in_place_neg_keeps_identity() {
    let manager = engine().new_manager();
    let a = manager.from_slice(&[1i32, -2, 3], [3], Device::cpu()).unwrap();
    let before = a.handle().unwrap();
    let same = a.negi().unwrap();
    assert_eq!(same.uid(), a.uid());
    assert_eq!(same.handle().unwrap(), before);
    assert_eq!(a.to_vec::<i32>().unwrap(), vec![-1, 2, -3]);
    assert_eq!(manager.len(), 1);
}

#[test]
fn double_close_is_a_no_op() {
    let manager = engine().new_manager();
    let t = manager.ones([4], DataType::Int64, Device::cpu()).unwrap();
    t.close().unwrap();
    t.close().unwrap();
    NativeResource::close(&t).unwrap();
    assert!(t.is_closed());
    assert!(!manager.contains(t.uid()));
    assert!(manager.is_empty());
}

#[test]
fn clones_share_one_handle() {
    let manager = engine().new_manager();
    let t = manager.ones([2], DataType::Float32, Device::cpu()).unwrap();
    let u = t.clone();
    assert_eq!(t.uid(), u.uid());
    u.close().unwrap();
    assert!(t.is_closed());
    assert!(t.handle_id().unwrap_err().is_closed());
}

#[test]
fn dropping_the_last_clone_unregisters() {
    let manager = engine().new_manager();
    let t = manager.ones([2], DataType::Float32, Device::cpu()).unwrap();
    let uid = t.uid();
    assert!(manager.contains(uid));
    drop(t);
    assert!(!manager.contains(uid));
}

#[test]
fn alias_survives_the_original() {
    let manager = engine().new_manager();
    let t = manager.from_slice(&[5u8, 6], [2], Device::cpu()).unwrap();
    let alias = t.alias().unwrap();
    assert_ne!(alias.uid(), t.uid());
    assert_eq!(alias.handle().unwrap(), t.handle().unwrap());
    t.close().unwrap();
    assert_eq!(alias.to_vec::<u8>().unwrap(), vec![5, 6]);
    assert_eq!(manager.len(), 1);
}

#[test]
fn scalar_get_returns_itself() {
    let manager = engine().new_manager();
    let s = manager.full(Vec::<i64>::new(), 4.0, DataType::Float64, Device::cpu()).unwrap();
    let same = s.get(0).unwrap();
    assert_eq!(same.uid(), s.uid());

    let v = manager.arange(0, 6, 1, DataType::Int64, Device::cpu()).unwrap();
    let row = v.reshape([2, 3]).unwrap().get(1).unwrap();
    assert_eq!(row.to_vec::<i64>().unwrap(), vec![3, 4, 5]);
    assert!(matches!(v.get(6), Err(TensilError::InvalidArgument(_))));
}

#[test]
fn byte_view_outlives_close_and_in_place_writes() {
    let manager = engine().new_manager();
    let t = manager.from_slice(&[1.5f32, -2.0], [2], Device::cpu()).unwrap();
    let view = t.to_bytes().unwrap();
    t.negi().unwrap();
    t.close().unwrap();
    assert_eq!(view.len(), 8);
    assert_eq!(view.dtype(), DataType::Float32);
    assert_eq!(view.cast::<f32>().unwrap(), vec![1.5, -2.0]);
    assert!(view.cast::<f64>().is_ok());
}

#[test]
fn metadata_cache_is_not_refreshed_in_place() {
    let manager = engine().new_manager();
    let t = manager.ones([2, 2], DataType::Float32, Device::cpu()).unwrap();
    assert_eq!(t.shape().unwrap().size(), 4);
    t.negi().unwrap();
    assert_eq!(t.shape().unwrap(), Shape::from([2, 2]));
    assert_eq!(t.dtype().unwrap(), DataType::Float32);
}

#[test]
fn invalid_creation_arguments() {
    let manager = engine().new_manager();
    let cpu = Device::cpu();
    assert!(matches!(
        manager.zeros([2], DataType::Unknown, cpu),
        Err(TensilError::InvalidArgument(_))
    ));
    assert!(matches!(
        manager.create([2], DataType::Float32, SparseFormat::Undefined, cpu, false),
        Err(TensilError::InvalidArgument(_))
    ));
    assert!(matches!(
        manager.zeros([2, -1], DataType::Float32, cpu),
        Err(TensilError::InvalidArgument(_))
    ));
    assert!(matches!(
        manager.from_bytes(&[0u8; 3], [1], DataType::Float32, cpu),
        Err(TensilError::InvalidArgument(_))
    ));
    assert!(manager.is_empty());
}

#[test]
fn oversized_allocations_fail_without_killing_the_process() {
    let manager = engine().new_manager();
    let cpu = Device::cpu();
    let err = manager.zeros([1i64 << 60], DataType::Float32, cpu).unwrap_err();
    assert!(matches!(err, TensilError::NativeCallFailure(_)), "{err}");
    assert!(matches!(
        manager.ones([1i64 << 40, 1 << 40], DataType::Int8, cpu),
        Err(TensilError::InvalidArgument(_))
    ));
    assert!(manager.is_empty());
    let after = manager.zeros([2], DataType::Float32, cpu).unwrap();
    assert_eq!(after.to_vec::<f32>().unwrap(), vec![0.0, 0.0]);
}

#[test]
fn coo_layout_is_reported() {
    let manager = engine().new_manager();
    let t = manager
        .create([3], DataType::Float32, SparseFormat::Coo, Device::cpu(), true)
        .unwrap();
    assert_eq!(t.sparse_format().unwrap(), SparseFormat::Coo);
}

#[test]
fn names_are_optional() {
    let manager = engine().new_manager();
    let t = manager.zeros([1], DataType::Int8, Device::cpu()).unwrap();
    assert!(t.name().is_none());
    t.set_name("weights");
    assert_eq!(t.name().as_deref(), Some("weights"));
}
