//! Live-count checks. Counts are process wide, so this binary holds a single test.

use std::io::Write;

use tensilrt::{DataType, Device, Engine};

#[test]
fn managed_resources_return_counts_to_baseline() {
    let engine = Engine::linked().unwrap();
    let tensors = engine.live_tensors().unwrap();
    let modules = engine.live_modules().unwrap();
    let views = engine.live_views().unwrap();

    let manager = engine.new_manager();
    let child = manager.new_child();
    let a = manager.arange(0, 8, 1, DataType::Float32, Device::cpu()).unwrap();
    let b = child.ones([8], DataType::Float32, Device::cpu()).unwrap();
    let parts = a.split_sections(4, 0).unwrap();
    let _cmp = a.gte_scalar(3.0).unwrap();
    // An alias shares the native entry.
    let _alias = b.alias().unwrap();
    assert_eq!(engine.live_tensors().unwrap(), tensors + 7);

    // Mixed devices and placeholders fail before touching the native side.
    let gpu = manager.zeros([8], DataType::Float32, Device::gpu(0)).unwrap();
    assert!(a.lt(&gpu).is_err());
    assert!(a.add(&b).is_err());
    assert!(a.arg_sort(0, false).is_err());
    assert_eq!(engine.live_tensors().unwrap(), tensors + 8);

    let view = parts[0].to_bytes().unwrap();
    assert_eq!(engine.live_views().unwrap(), views + 1);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"format":"tensil-reference","steps":[{{"op":"neg"}}]}}"#).unwrap();
    let module = child.load_module(file.path()).unwrap();
    let outputs = module.forward(&[a.clone(), b.clone()]).unwrap();
    assert_eq!(outputs.len(), 2);
    assert_eq!(engine.live_modules().unwrap(), modules + 1);
    assert_eq!(engine.live_tensors().unwrap(), tensors + 10);

    manager.close();
    assert_eq!(engine.live_tensors().unwrap(), tensors);
    assert_eq!(engine.live_modules().unwrap(), modules);
    assert_eq!(engine.live_views().unwrap(), views + 1);
    assert_eq!(view.cast::<f32>().unwrap(), vec![0.0, 1.0]);
    drop(view);
    assert_eq!(engine.live_views().unwrap(), views);
}
