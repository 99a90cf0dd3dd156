use std::sync::Arc;

use crate::codes::{DType, DeviceSpec, Layout};
use crate::reference::DenseTensor;

/// A tensor stored in a handle table slot.
///
/// Reference tensors are immutable behind an `Arc`; an in-place kernel swaps in
/// a fresh `Arc` for the same handle, so pinned byte views never observe a write.
pub enum NativeTensor {
    Dense(Arc<DenseTensor>),
    #[cfg(feature = "torch")]
    Torch(tch::Tensor),
}

impl Clone for NativeTensor {
    fn clone(&self) -> Self {
        match self {
            NativeTensor::Dense(t) => NativeTensor::Dense(Arc::clone(t)),
            #[cfg(feature = "torch")]
            NativeTensor::Torch(t) => NativeTensor::Torch(t.shallow_clone()),
        }
    }
}

impl std::fmt::Debug for NativeTensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NativeTensor::Dense(t) => f
                .debug_struct("Dense")
                .field("dtype", &t.dtype)
                .field("shape", &t.shape)
                .field("device", &t.device)
                .finish(),
            #[cfg(feature = "torch")]
            NativeTensor::Torch(t) => f.debug_struct("Torch").field("size", &t.size()).finish(),
        }
    }
}

impl From<DenseTensor> for NativeTensor {
    fn from(t: DenseTensor) -> Self {
        NativeTensor::Dense(Arc::new(t))
    }
}

#[cfg(feature = "torch")]
impl From<tch::Tensor> for NativeTensor {
    fn from(t: tch::Tensor) -> Self {
        NativeTensor::Torch(t)
    }
}

/// Shape/dtype/device/layout snapshot used by the query entry points.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorMeta {
    pub dtype: Option<DType>,
    pub shape: Vec<i64>,
    pub device: DeviceSpec,
    pub layout: Option<Layout>,
}
