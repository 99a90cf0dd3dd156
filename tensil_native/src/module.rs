use std::path::Path;
use std::sync::Arc;

use crate::backend::{current_backend, BackendKind};
use crate::error::{NativeError, NativeResult};
use crate::reference::module::ReferenceModule;
use crate::value::NativeTensor;

/// A loaded model stored in the module table.
pub enum NativeModule {
    Reference(ReferenceModule),
    #[cfg(feature = "torch")]
    Torch(tch::CModule),
}

impl std::fmt::Debug for NativeModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NativeModule::Reference(m) => f.debug_tuple("Reference").field(m).finish(),
            #[cfg(feature = "torch")]
            NativeModule::Torch(_) => f.write_str("Torch"),
        }
    }
}

impl NativeModule {
    pub fn load(path: &Path) -> NativeResult<Self> {
        if !path.exists() {
            return Err(NativeError::invalid(format!(
                "module file not found: {}",
                path.display()
            )));
        }
        match current_backend() {
            BackendKind::Reference => Ok(NativeModule::Reference(ReferenceModule::load(path)?)),
            #[cfg(feature = "torch")]
            BackendKind::Torch => Ok(NativeModule::Torch(tch::CModule::load(path)?)),
            #[cfg(not(feature = "torch"))]
            BackendKind::Torch => Err(NativeError::unsupported("torch backend not enabled")),
        }
    }

    pub fn eval(&mut self) {
        match self {
            NativeModule::Reference(m) => m.eval(),
            #[cfg(feature = "torch")]
            NativeModule::Torch(m) => m.set_eval(),
        }
    }

    pub fn forward(&self, inputs: &[NativeTensor]) -> NativeResult<Vec<NativeTensor>> {
        match self {
            NativeModule::Reference(m) => {
                let mut dense = Vec::with_capacity(inputs.len());
                for input in inputs {
                    match input {
                        NativeTensor::Dense(t) => dense.push(Arc::clone(t)),
                        #[cfg(feature = "torch")]
                        NativeTensor::Torch(_) => {
                            return Err(NativeError::invalid(
                                "reference module received a torch tensor",
                            ))
                        }
                    }
                }
                let refs: Vec<&_> = dense.iter().map(|t| t.as_ref()).collect();
                Ok(m.forward(&refs)?.into_iter().map(NativeTensor::from).collect())
            }
            #[cfg(feature = "torch")]
            NativeModule::Torch(m) => crate::torch::forward(m, inputs),
        }
    }
}
