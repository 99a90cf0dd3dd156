//! Modules for the reference backend.
//!
//! A reference module is a JSON document listing steps applied in order to
//! every input. A `split` step fans one tensor out into several, and later
//! steps run on each part:
//!
//! ```json
//! { "format": "tensil-reference", "steps": [ { "op": "neg" }, { "op": "softmax", "dim": -1 } ] }
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{NativeError, NativeResult};
use crate::ops::UnaryOp;

use super::{kernels, DenseTensor};

pub const REFERENCE_MODULE_FORMAT: &str = "tensil-reference";

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum StepSpec {
    Neg,
    Unary { name: String },
    SubScalar { value: f64 },
    DivScalar { value: f64 },
    Softmax { dim: i64 },
    Split { sections: i64, dim: i64 },
}

#[derive(Debug, Deserialize)]
struct ModuleSpec {
    format: String,
    steps: Vec<StepSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Step {
    Neg,
    Unary(UnaryOp),
    SubScalar(f64),
    DivScalar(f64),
    Softmax(i64),
    Split { sections: i64, dim: i64 },
}

#[derive(Debug)]
pub struct ReferenceModule {
    steps: Vec<Step>,
    training: bool,
}

impl ReferenceModule {
    pub fn load(path: &Path) -> NativeResult<Self> {
        let text = fs::read_to_string(path).map_err(|err| {
            NativeError::invalid(format!("failed to read module {}: {err}", path.display()))
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> NativeResult<Self> {
        let spec: ModuleSpec = serde_json::from_str(text)
            .map_err(|err| NativeError::invalid(format!("invalid module document: {err}")))?;
        if spec.format != REFERENCE_MODULE_FORMAT {
            return Err(NativeError::invalid(format!(
                "unknown module format '{}'",
                spec.format
            )));
        }
        let mut steps = Vec::with_capacity(spec.steps.len());
        for step in spec.steps {
            steps.push(match step {
                StepSpec::Neg => Step::Neg,
                StepSpec::Unary { name } => Step::Unary(UnaryOp::from_name(&name).ok_or_else(
                    || NativeError::invalid(format!("unknown unary op '{name}' in module")),
                )?),
                StepSpec::SubScalar { value } => Step::SubScalar(value),
                StepSpec::DivScalar { value } => Step::DivScalar(value),
                StepSpec::Softmax { dim } => Step::Softmax(dim),
                StepSpec::Split { sections, dim } => Step::Split { sections, dim },
            });
        }
        Ok(Self {
            steps,
            training: true,
        })
    }

    pub fn eval(&mut self) {
        self.training = false;
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    pub fn forward(&self, inputs: &[&DenseTensor]) -> NativeResult<Vec<DenseTensor>> {
        if inputs.is_empty() {
            return Err(NativeError::invalid("forward expects at least one input"));
        }
        let mut outputs = Vec::with_capacity(inputs.len());
        for input in inputs {
            outputs.extend(self.run(input)?);
        }
        Ok(outputs)
    }

    fn run(&self, input: &DenseTensor) -> NativeResult<Vec<DenseTensor>> {
        let mut current = vec![input.clone()];
        for step in &self.steps {
            let mut next = Vec::with_capacity(current.len());
            for t in &current {
                match *step {
                    Step::Neg => next.push(kernels::neg(t)?),
                    Step::Unary(op) => next.push(kernels::unary(op, t)?),
                    Step::SubScalar(v) => next.push(kernels::sub_scalar(t, v)?),
                    Step::DivScalar(v) => next.push(kernels::div_scalar(t, v)?),
                    Step::Softmax(dim) => next.push(kernels::softmax(t, dim)?),
                    Step::Split { sections, dim } => {
                        next.extend(kernels::split_sections(t, sections, dim)?)
                    }
                }
            }
            current = next;
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{DType, DeviceSpec, Layout};

    #[test]
    fn pipeline_runs_in_order() {
        let module = ReferenceModule::parse(
            r#"{"format":"tensil-reference","steps":[{"op":"sub_scalar","value":1.0},{"op":"neg"}]}"#,
        )
        .unwrap();
        let input =
            DenseTensor::from_values(&[1.0, 2.0], &[2], DType::Float32, DeviceSpec::CPU, Layout::Dense)
                .unwrap();
        let out = module.forward(&[&input]).unwrap();
        assert_eq!(out[0].values(), vec![0.0, -1.0]);
    }

    #[test]
    fn rejects_unknown_format_and_ops() {
        assert!(ReferenceModule::parse(r#"{"format":"other","steps":[]}"#).is_err());
        assert!(ReferenceModule::parse(
            r#"{"format":"tensil-reference","steps":[{"op":"unary","name":"square"}]}"#
        )
        .is_err());
    }

    #[test]
    fn split_fans_out_and_later_steps_see_every_part() {
        let module = ReferenceModule::parse(
            r#"{"format":"tensil-reference","steps":[{"op":"split","sections":3,"dim":0},{"op":"neg"}]}"#,
        )
        .unwrap();
        let input = DenseTensor::from_values(
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            &[6],
            DType::Int32,
            DeviceSpec::CPU,
            Layout::Dense,
        )
        .unwrap();
        let out = module.forward(&[&input, &input]).unwrap();
        assert_eq!(out.len(), 6);
        assert_eq!(out[1].values(), vec![-3.0, -4.0]);
        assert_eq!(out[5].values(), vec![-5.0, -6.0]);
    }
}
