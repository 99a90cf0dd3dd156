use std::io::Write;

use serde_json::json;
use tempfile::NamedTempFile;
use tensilrt::{DataType, Device, Engine, NativeResource, TensilError, TensorManager};

fn module_file(steps: serde_json::Value) -> NamedTempFile {
    let doc = json!({ "format": "tensil-reference", "steps": steps });
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{doc}").unwrap();
    file
}

fn manager() -> TensorManager {
    Engine::linked().unwrap().new_manager()
}

#[test]
fn forward_runs_every_input() {
    let m = manager();
    let file = module_file(json!([
        { "op": "neg" },
        { "op": "unary", "name": "abs" },
        { "op": "sub_scalar", "value": 1.0 }
    ]));
    let module = m.load_module(file.path()).unwrap();
    assert_eq!(module.path(), file.path());
    module.eval().unwrap();

    let a = m.from_slice(&[-3.0f32, 2.0], [2], Device::cpu()).unwrap();
    let b = m.from_slice(&[5.0f32], [1], Device::cpu()).unwrap();
    let outputs = module.forward(&[a.clone(), b]).unwrap();
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[0].to_vec::<f32>().unwrap(), vec![2.0, 1.0]);
    assert_eq!(outputs[1].to_vec::<f32>().unwrap(), vec![4.0]);
    assert_eq!(a.to_vec::<f32>().unwrap(), vec![-3.0, 2.0]);
}

#[test]
fn outputs_join_the_first_input_manager() {
    let engine = Engine::linked().unwrap();
    let models = engine.new_manager();
    let batch = engine.new_manager();
    let file = module_file(json!([{ "op": "softmax", "dim": -1 }]));
    let module = models.load_module(file.path()).unwrap();
    assert!(models.contains(module.uid()));

    let inputs: Vec<_> = (0..6)
        .map(|i| batch.full([3], i as f64, DataType::Float64, Device::cpu()).unwrap())
        .collect();
    let outputs = module.forward(&inputs).unwrap();
    assert_eq!(outputs.len(), 6);
    assert!(outputs.iter().all(|o| batch.contains(o.uid())));
    assert_eq!(models.len(), 1);

    batch.close();
    assert!(outputs.iter().all(|o| o.is_closed()));
    assert!(!module.is_closed());
}

#[test]
fn many_outputs_come_back_from_one_run() {
    let m = manager();
    let file = module_file(json!([
        { "op": "split", "sections": 6, "dim": 0 },
        { "op": "sub_scalar", "value": 1.0 }
    ]));
    let module = m.load_module(file.path()).unwrap();
    let x = m.arange(0, 6, 1, DataType::Int64, Device::cpu()).unwrap();
    let before = m.len();
    let outputs = module.forward(&[x]).unwrap();
    assert_eq!(outputs.len(), 6);
    assert_eq!(m.len(), before + 6);
    let values: Vec<i64> = outputs
        .iter()
        .flat_map(|o| o.to_vec::<i64>().unwrap())
        .collect();
    assert_eq!(values, vec![-1, 0, 1, 2, 3, 4]);
    assert!(outputs.iter().all(|o| m.contains(o.uid())));
}

#[test]
fn forward_rejects_empty_input() {
    let m = manager();
    let file = module_file(json!([{ "op": "neg" }]));
    let module = m.load_module(file.path()).unwrap();
    assert!(matches!(module.forward(&[]), Err(TensilError::InvalidArgument(_))));
}

#[test]
fn failed_step_reports_the_native_error() {
    let m = manager();
    let file = module_file(json!([{ "op": "neg" }]));
    let module = m.load_module(file.path()).unwrap();
    let flags = m.ones([2], DataType::Boolean, Device::cpu()).unwrap();
    let before = m.len();
    let err = module.forward(&[flags]).unwrap_err();
    assert!(matches!(err, TensilError::InvalidArgument(_)));
    assert_eq!(m.len(), before);
}

#[test]
fn load_errors() {
    let m = manager();
    assert!(matches!(
        m.load_module("/definitely/not/here.json"),
        Err(TensilError::InvalidArgument(_))
    ));

    let mut bad = NamedTempFile::new().unwrap();
    write!(bad, r#"{{"format":"other","steps":[]}}"#).unwrap();
    assert!(m.load_module(bad.path()).is_err());
    assert!(m.is_empty());
}

#[test]
fn closing_the_module_releases_it() {
    let m = manager();
    let file = module_file(json!([]));
    let module = m.load_module(file.path()).unwrap();
    NativeResource::close(&module).unwrap();
    assert!(module.is_closed());
    assert!(!m.contains(module.uid()));
    assert!(module.eval().unwrap_err().is_closed());

    let x = m.zeros([1], DataType::Float32, Device::cpu()).unwrap();
    assert!(module.forward(&[x]).unwrap_err().is_closed());
    module.close().unwrap();
}

#[test]
fn manager_close_releases_modules() {
    let m = manager();
    let file = module_file(json!([{ "op": "neg" }]));
    let module = m.load_module(file.path()).unwrap();
    m.close();
    assert!(module.is_closed());
    assert!(module.manager().is_none() || module.manager().unwrap().is_closed());
}
