//! Backend dispatch for every tensor entry point.
//!
//! Factories pick the backend from the process-wide selection; everything
//! else follows the backend that owns its operands.

use std::path::Path;

use crate::backend::{current_backend, BackendKind};
use crate::codes::{DType, DeviceSpec, Layout};
use crate::error::{NativeError, NativeResult};
use crate::module::NativeModule;
use crate::reference::{kernels, DenseTensor};
#[cfg(feature = "torch")]
use crate::torch;
use crate::value::{NativeTensor, TensorMeta};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Abs,
    Sqrt,
    Floor,
    Ceil,
    Round,
    Trunc,
    Exp,
    Log,
    Log10,
    Log2,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    All,
    Any,
    NoneOf,
}

impl UnaryOp {
    pub const ALL: [UnaryOp; 22] = [
        UnaryOp::Abs,
        UnaryOp::Sqrt,
        UnaryOp::Floor,
        UnaryOp::Ceil,
        UnaryOp::Round,
        UnaryOp::Trunc,
        UnaryOp::Exp,
        UnaryOp::Log,
        UnaryOp::Log10,
        UnaryOp::Log2,
        UnaryOp::Sin,
        UnaryOp::Cos,
        UnaryOp::Tan,
        UnaryOp::Asin,
        UnaryOp::Acos,
        UnaryOp::Atan,
        UnaryOp::Sinh,
        UnaryOp::Cosh,
        UnaryOp::Tanh,
        UnaryOp::All,
        UnaryOp::Any,
        UnaryOp::NoneOf,
    ];

    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Abs => "abs",
            UnaryOp::Sqrt => "sqrt",
            UnaryOp::Floor => "floor",
            UnaryOp::Ceil => "ceil",
            UnaryOp::Round => "round",
            UnaryOp::Trunc => "trunc",
            UnaryOp::Exp => "exp",
            UnaryOp::Log => "log",
            UnaryOp::Log10 => "log10",
            UnaryOp::Log2 => "log2",
            UnaryOp::Sin => "sin",
            UnaryOp::Cos => "cos",
            UnaryOp::Tan => "tan",
            UnaryOp::Asin => "asin",
            UnaryOp::Acos => "acos",
            UnaryOp::Atan => "atan",
            UnaryOp::Sinh => "sinh",
            UnaryOp::Cosh => "cosh",
            UnaryOp::Tanh => "tanh",
            UnaryOp::All => "all",
            UnaryOp::Any => "any",
            UnaryOp::NoneOf => "none",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Initial contents for the fill factories.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fill {
    Empty,
    Zeros,
    Ones,
    Value(f64),
}

impl Fill {
    fn value(self) -> f64 {
        match self {
            Fill::Empty | Fill::Zeros => 0.0,
            Fill::Ones => 1.0,
            Fill::Value(v) => v,
        }
    }
}

macro_rules! dispatch {
    ($t:expr, $d:ident => $dense:expr, $x:ident => $torch:expr) => {
        match $t {
            NativeTensor::Dense($d) => $dense.map(NativeTensor::from),
            #[cfg(feature = "torch")]
            NativeTensor::Torch($x) => $torch.map(NativeTensor::from),
        }
    };
}

enum Pair<'a> {
    Dense(&'a DenseTensor, &'a DenseTensor),
    #[cfg(feature = "torch")]
    Torch(&'a tch::Tensor, &'a tch::Tensor),
}

fn pair<'a>(a: &'a NativeTensor, b: &'a NativeTensor) -> NativeResult<Pair<'a>> {
    match (a, b) {
        (NativeTensor::Dense(a), NativeTensor::Dense(b)) => Ok(Pair::Dense(a, b)),
        #[cfg(feature = "torch")]
        (NativeTensor::Torch(a), NativeTensor::Torch(b)) => Ok(Pair::Torch(a, b)),
        #[allow(unreachable_patterns)]
        _ => Err(NativeError::invalid("operands belong to different backends")),
    }
}

fn dense_list(tensors: &[NativeTensor]) -> Option<Vec<&DenseTensor>> {
    tensors
        .iter()
        .map(|t| match t {
            NativeTensor::Dense(d) => Some(d.as_ref()),
            #[cfg(feature = "torch")]
            NativeTensor::Torch(_) => None,
        })
        .collect()
}

#[cfg(not(feature = "torch"))]
fn torch_disabled<T>() -> NativeResult<T> {
    Err(NativeError::unsupported("torch backend not enabled"))
}

pub fn create(
    fill: Fill,
    shape: &[i64],
    dtype: DType,
    layout: Layout,
    device: DeviceSpec,
    requires_grad: bool,
) -> NativeResult<NativeTensor> {
    match current_backend() {
        BackendKind::Reference => {
            kernels::fill(shape, dtype, layout, device, requires_grad, fill.value()).map(Into::into)
        }
        #[cfg(feature = "torch")]
        BackendKind::Torch => {
            torch::create(fill, shape, dtype, layout, device, requires_grad).map(Into::into)
        }
        #[cfg(not(feature = "torch"))]
        BackendKind::Torch => torch_disabled(),
    }
}

pub fn arange(
    start: f64,
    stop: f64,
    step: f64,
    dtype: DType,
    device: DeviceSpec,
) -> NativeResult<NativeTensor> {
    match current_backend() {
        BackendKind::Reference => kernels::arange(start, stop, step, dtype, device).map(Into::into),
        #[cfg(feature = "torch")]
        BackendKind::Torch => torch::arange(start, stop, step, dtype, device).map(Into::into),
        #[cfg(not(feature = "torch"))]
        BackendKind::Torch => torch_disabled(),
    }
}

pub fn arange_int(
    start: i64,
    stop: i64,
    step: i64,
    dtype: DType,
    device: DeviceSpec,
) -> NativeResult<NativeTensor> {
    match current_backend() {
        BackendKind::Reference => {
            kernels::arange_int(start, stop, step, dtype, device).map(Into::into)
        }
        #[cfg(feature = "torch")]
        BackendKind::Torch => torch::arange(start, stop, step, dtype, device).map(Into::into),
        #[cfg(not(feature = "torch"))]
        BackendKind::Torch => torch_disabled(),
    }
}

pub fn from_blob(
    bytes: &[u8],
    shape: &[i64],
    dtype: DType,
    layout: Layout,
    device: DeviceSpec,
    requires_grad: bool,
) -> NativeResult<NativeTensor> {
    match current_backend() {
        BackendKind::Reference => {
            let mut t = DenseTensor::from_bytes(bytes, shape, dtype, device, layout)?;
            t.requires_grad = requires_grad;
            Ok(t.into())
        }
        #[cfg(feature = "torch")]
        BackendKind::Torch => {
            torch::from_blob(bytes, shape, dtype, layout, device, requires_grad).map(Into::into)
        }
        #[cfg(not(feature = "torch"))]
        BackendKind::Torch => torch_disabled(),
    }
}

pub fn stack(tensors: &[NativeTensor], dim: i64) -> NativeResult<NativeTensor> {
    if let Some(dense) = dense_list(tensors) {
        return kernels::stack(&dense, dim).map(Into::into);
    }
    #[cfg(feature = "torch")]
    {
        let mut torch_tensors = Vec::with_capacity(tensors.len());
        for t in tensors {
            match t {
                NativeTensor::Torch(x) => torch_tensors.push(x.shallow_clone()),
                NativeTensor::Dense(_) => {
                    return Err(NativeError::invalid("operands belong to different backends"))
                }
            }
        }
        torch::stack(&torch_tensors, dim).map(Into::into)
    }
    #[cfg(not(feature = "torch"))]
    {
        torch_disabled()
    }
}

pub fn to(t: &NativeTensor, dtype: DType, device: DeviceSpec, copy: bool) -> NativeResult<NativeTensor> {
    match t {
        NativeTensor::Dense(d) if !copy && d.dtype == dtype && d.device == device => {
            return Ok(t.clone())
        }
        _ => {}
    }
    dispatch!(t, d => kernels::to(d, dtype, device), x => torch::to(x, dtype, device, copy))
}

pub fn select(t: &NativeTensor, dim: i64, index: i64) -> NativeResult<NativeTensor> {
    dispatch!(t, d => kernels::select(d, dim, index), x => torch::select(x, dim, index))
}

pub fn reshape(t: &NativeTensor, shape: &[i64]) -> NativeResult<NativeTensor> {
    dispatch!(t, d => kernels::reshape(d, shape), x => torch::reshape(x, shape))
}

pub fn softmax(t: &NativeTensor, dim: i64) -> NativeResult<NativeTensor> {
    dispatch!(t, d => kernels::softmax(d, dim), x => torch::softmax(x, dim))
}

pub fn argmax(t: &NativeTensor, dim: Option<i64>) -> NativeResult<NativeTensor> {
    dispatch!(t, d => kernels::argmax(d, dim), x => torch::argmax(x, dim))
}

pub fn argmin(t: &NativeTensor, dim: Option<i64>) -> NativeResult<NativeTensor> {
    dispatch!(t, d => kernels::argmin(d, dim), x => torch::argmin(x, dim))
}

pub fn argsort(t: &NativeTensor, dim: i64) -> NativeResult<NativeTensor> {
    dispatch!(t, d => kernels::argsort(d, dim), x => torch::argsort(x, dim))
}

pub fn sort(t: &NativeTensor, dim: i64) -> NativeResult<NativeTensor> {
    dispatch!(t, d => kernels::sort(d, dim), x => torch::sort(x, dim))
}

pub fn permute(t: &NativeTensor, dims: &[i64]) -> NativeResult<NativeTensor> {
    dispatch!(t, d => kernels::permute(d, dims), x => torch::permute(x, dims))
}

pub fn transpose(t: &NativeTensor, dim0: i64, dim1: i64) -> NativeResult<NativeTensor> {
    dispatch!(t, d => kernels::transpose(d, dim0, dim1), x => torch::transpose(x, dim0, dim1))
}

pub fn sub_scalar(t: &NativeTensor, scalar: f64) -> NativeResult<NativeTensor> {
    dispatch!(t, d => kernels::sub_scalar(d, scalar), x => torch::sub_scalar(x, scalar))
}

pub fn div_scalar(t: &NativeTensor, scalar: f64) -> NativeResult<NativeTensor> {
    dispatch!(t, d => kernels::div_scalar(d, scalar), x => torch::div_scalar(x, scalar))
}

pub fn squeeze(t: &NativeTensor) -> NativeResult<NativeTensor> {
    dispatch!(t, d => Ok::<_, NativeError>(kernels::squeeze(d)), x => torch::squeeze(x))
}

pub fn squeeze_dim(t: &NativeTensor, dim: i64) -> NativeResult<NativeTensor> {
    dispatch!(t, d => kernels::squeeze_dim(d, dim), x => torch::squeeze_dim(x, dim))
}

pub fn unsqueeze(t: &NativeTensor, dim: i64) -> NativeResult<NativeTensor> {
    dispatch!(t, d => kernels::unsqueeze(d, dim), x => torch::unsqueeze(x, dim))
}

pub fn unary(op: UnaryOp, t: &NativeTensor) -> NativeResult<NativeTensor> {
    dispatch!(t, d => kernels::unary(op, d), x => torch::unary(op, x))
}

/// Negation. Returns the storage the caller must publish, or `None` when the
/// backend already mutated the handle's storage in place.
#[cfg_attr(not(feature = "torch"), allow(unused_variables))]
pub fn neg(t: &NativeTensor, inplace: bool) -> NativeResult<Option<NativeTensor>> {
    match t {
        NativeTensor::Dense(d) => Ok(Some(kernels::neg(d)?.into())),
        #[cfg(feature = "torch")]
        NativeTensor::Torch(x) => {
            if inplace {
                torch::neg_(x)?;
                Ok(None)
            } else {
                Ok(Some(torch::neg(x)?.into()))
            }
        }
    }
}

pub fn normalize(t: &NativeTensor, mean: &[f64], std: &[f64]) -> NativeResult<NativeTensor> {
    dispatch!(t, d => kernels::normalize(d, mean, std), x => torch::normalize(x, mean, std))
}

pub fn resize(
    t: &NativeTensor,
    height: i64,
    width: i64,
    align_corners: bool,
) -> NativeResult<NativeTensor> {
    dispatch!(t,
        d => kernels::resize(d, height, width, align_corners),
        x => torch::resize(x, height, width, align_corners))
}

pub fn to_tensor(t: &NativeTensor) -> NativeResult<NativeTensor> {
    dispatch!(t, d => kernels::to_tensor(d), x => torch::to_tensor(x))
}

pub fn split_sections(t: &NativeTensor, sections: i64, dim: i64) -> NativeResult<Vec<NativeTensor>> {
    match t {
        NativeTensor::Dense(d) => Ok(kernels::split_sections(d, sections, dim)?
            .into_iter()
            .map(NativeTensor::from)
            .collect()),
        #[cfg(feature = "torch")]
        NativeTensor::Torch(x) => Ok(torch::split_sections(x, sections, dim)?
            .into_iter()
            .map(NativeTensor::from)
            .collect()),
    }
}

pub fn split_indices(t: &NativeTensor, indices: &[i64], dim: i64) -> NativeResult<Vec<NativeTensor>> {
    match t {
        NativeTensor::Dense(d) => Ok(kernels::split_indices(d, indices, dim)?
            .into_iter()
            .map(NativeTensor::from)
            .collect()),
        #[cfg(feature = "torch")]
        NativeTensor::Torch(x) => Ok(torch::split_indices(x, indices, dim)?
            .into_iter()
            .map(NativeTensor::from)
            .collect()),
    }
}

pub fn compare(op: CompareOp, a: &NativeTensor, b: &NativeTensor) -> NativeResult<NativeTensor> {
    match pair(a, b)? {
        Pair::Dense(a, b) => kernels::compare(op, a, b).map(Into::into),
        #[cfg(feature = "torch")]
        Pair::Torch(a, b) => torch::compare(op, a, b).map(Into::into),
    }
}

pub fn content_equal(a: &NativeTensor, b: &NativeTensor) -> NativeResult<bool> {
    match pair(a, b)? {
        Pair::Dense(a, b) => kernels::content_equal(a, b),
        #[cfg(feature = "torch")]
        Pair::Torch(a, b) => torch::content_equal(a, b),
    }
}

pub fn meta(t: &NativeTensor) -> NativeResult<TensorMeta> {
    match t {
        NativeTensor::Dense(d) => Ok(TensorMeta {
            dtype: Some(d.dtype),
            shape: d.shape.clone(),
            device: d.device,
            layout: Some(d.layout),
        }),
        #[cfg(feature = "torch")]
        NativeTensor::Torch(x) => torch::meta(x),
    }
}

/// Storage to pin for a byte view plus the address and length of its bytes.
pub fn host_bytes(t: &NativeTensor) -> NativeResult<(NativeTensor, *const u8, usize)> {
    match t {
        NativeTensor::Dense(d) => Ok((t.clone(), d.data.as_ptr(), d.data.len())),
        #[cfg(feature = "torch")]
        NativeTensor::Torch(x) => {
            let (pinned, ptr, len) = torch::host_bytes(x)?;
            Ok((pinned.into(), ptr, len))
        }
    }
}

pub fn load_module(path: &Path) -> NativeResult<NativeModule> {
    NativeModule::load(path)
}
