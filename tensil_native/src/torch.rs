//! libtorch kernels behind the `torch` feature.

use tch::{CModule, Device, IValue, Kind, Tensor};

use crate::codes::{DType, DeviceKind, DeviceSpec, Layout};
use crate::error::{NativeError, NativeResult};
use crate::ops::{CompareOp, Fill, UnaryOp};
use crate::value::{NativeTensor, TensorMeta};

pub fn kind_of(dtype: DType) -> Kind {
    match dtype {
        DType::Float32 => Kind::Float,
        DType::Float64 => Kind::Double,
        DType::Float16 => Kind::Half,
        DType::Uint8 => Kind::Uint8,
        DType::Int32 => Kind::Int,
        DType::Int8 => Kind::Int8,
        DType::Int64 => Kind::Int64,
        DType::Boolean => Kind::Bool,
    }
}

pub fn dtype_of(kind: Kind) -> Option<DType> {
    match kind {
        Kind::Float => Some(DType::Float32),
        Kind::Double => Some(DType::Float64),
        Kind::Half => Some(DType::Float16),
        Kind::Uint8 => Some(DType::Uint8),
        Kind::Int => Some(DType::Int32),
        Kind::Int8 => Some(DType::Int8),
        Kind::Int64 => Some(DType::Int64),
        Kind::Bool => Some(DType::Boolean),
        _ => None,
    }
}

pub fn device_of(spec: DeviceSpec) -> Device {
    match spec.kind {
        DeviceKind::Cpu => Device::Cpu,
        DeviceKind::Gpu => Device::Cuda(spec.index as usize),
    }
}

fn spec_of(device: Device) -> DeviceSpec {
    match device {
        Device::Cuda(index) => DeviceSpec {
            kind: DeviceKind::Gpu,
            index: index as i32,
        },
        _ => DeviceSpec::CPU,
    }
}

fn dense_only(layout: Layout) -> NativeResult<()> {
    if layout != Layout::Dense {
        return Err(NativeError::unsupported(
            "torch backend creates dense tensors only",
        ));
    }
    Ok(())
}

pub fn create(
    fill: Fill,
    shape: &[i64],
    dtype: DType,
    layout: Layout,
    device: DeviceSpec,
    requires_grad: bool,
) -> NativeResult<Tensor> {
    crate::codes::check_shape(shape)?;
    dense_only(layout)?;
    let options = (kind_of(dtype), device_of(device));
    let t = match fill {
        Fill::Empty => Tensor::f_empty(shape, options)?,
        Fill::Zeros => Tensor::f_zeros(shape, options)?,
        Fill::Ones => Tensor::f_ones(shape, options)?,
        Fill::Value(v) => Tensor::f_full(shape, v, options)?,
    };
    Ok(if requires_grad { t.set_requires_grad(true) } else { t })
}

pub fn arange<S: Into<tch::Scalar>>(
    start: S,
    stop: S,
    step: S,
    dtype: DType,
    device: DeviceSpec,
) -> NativeResult<Tensor> {
    Ok(Tensor::f_arange_start_step(
        start,
        stop,
        step,
        (kind_of(dtype), device_of(device)),
    )?)
}

pub fn from_blob(
    bytes: &[u8],
    shape: &[i64],
    dtype: DType,
    layout: Layout,
    device: DeviceSpec,
    requires_grad: bool,
) -> NativeResult<Tensor> {
    crate::codes::check_shape(shape)?;
    dense_only(layout)?;
    let t = Tensor::f_from_data_size(bytes, shape, kind_of(dtype))?.f_to_device(device_of(device))?;
    Ok(if requires_grad { t.set_requires_grad(true) } else { t })
}

pub fn stack(tensors: &[Tensor], dim: i64) -> NativeResult<Tensor> {
    Ok(Tensor::f_stack(tensors, dim)?)
}

pub fn to(t: &Tensor, dtype: DType, device: DeviceSpec, copy: bool) -> NativeResult<Tensor> {
    Ok(t.f_to_device_(device_of(device), kind_of(dtype), false, copy)?)
}

pub fn select(t: &Tensor, dim: i64, index: i64) -> NativeResult<Tensor> {
    Ok(t.f_select(dim, index)?)
}

pub fn reshape(t: &Tensor, shape: &[i64]) -> NativeResult<Tensor> {
    Ok(t.f_reshape(shape)?)
}

pub fn softmax(t: &Tensor, dim: i64) -> NativeResult<Tensor> {
    let kind = if t.f_kind()?.is_floating_point() {
        t.f_kind()?
    } else {
        Kind::Float
    };
    Ok(t.f_softmax(dim, kind)?)
}

pub fn argmax(t: &Tensor, dim: Option<i64>) -> NativeResult<Tensor> {
    Ok(t.f_argmax(dim, false)?)
}

pub fn argmin(t: &Tensor, dim: Option<i64>) -> NativeResult<Tensor> {
    Ok(t.f_argmin(dim, false)?)
}

pub fn argsort(t: &Tensor, dim: i64) -> NativeResult<Tensor> {
    Ok(t.f_argsort(dim, false)?)
}

pub fn sort(t: &Tensor, dim: i64) -> NativeResult<Tensor> {
    let (values, _) = t.f_sort(dim, false)?;
    Ok(values)
}

pub fn permute(t: &Tensor, dims: &[i64]) -> NativeResult<Tensor> {
    Ok(t.f_permute(dims)?)
}

pub fn transpose(t: &Tensor, dim0: i64, dim1: i64) -> NativeResult<Tensor> {
    Ok(t.f_transpose(dim0, dim1)?)
}

pub fn sub_scalar(t: &Tensor, scalar: f64) -> NativeResult<Tensor> {
    Ok(t.f_sub_scalar(scalar)?)
}

pub fn div_scalar(t: &Tensor, scalar: f64) -> NativeResult<Tensor> {
    Ok(t.f_div_scalar(scalar)?)
}

pub fn squeeze(t: &Tensor) -> NativeResult<Tensor> {
    Ok(t.f_squeeze()?)
}

pub fn squeeze_dim(t: &Tensor, dim: i64) -> NativeResult<Tensor> {
    Ok(t.f_squeeze_dim(dim)?)
}

pub fn unsqueeze(t: &Tensor, dim: i64) -> NativeResult<Tensor> {
    Ok(t.f_unsqueeze(dim)?)
}

pub fn unary(op: UnaryOp, t: &Tensor) -> NativeResult<Tensor> {
    let out = match op {
        UnaryOp::Abs => t.f_abs()?,
        UnaryOp::Sqrt => t.f_sqrt()?,
        UnaryOp::Floor => t.f_floor()?,
        UnaryOp::Ceil => t.f_ceil()?,
        UnaryOp::Round => t.f_round()?,
        UnaryOp::Trunc => t.f_trunc()?,
        UnaryOp::Exp => t.f_exp()?,
        UnaryOp::Log => t.f_log()?,
        UnaryOp::Log10 => t.f_log10()?,
        UnaryOp::Log2 => t.f_log2()?,
        UnaryOp::Sin => t.f_sin()?,
        UnaryOp::Cos => t.f_cos()?,
        UnaryOp::Tan => t.f_tan()?,
        UnaryOp::Asin => t.f_asin()?,
        UnaryOp::Acos => t.f_acos()?,
        UnaryOp::Atan => t.f_atan()?,
        UnaryOp::Sinh => t.f_sinh()?,
        UnaryOp::Cosh => t.f_cosh()?,
        UnaryOp::Tanh => t.f_tanh()?,
        UnaryOp::All => t.f_all()?,
        UnaryOp::Any => t.f_any()?,
        UnaryOp::NoneOf => t.f_any()?.f_logical_not()?,
    };
    Ok(out)
}

pub fn neg(t: &Tensor) -> NativeResult<Tensor> {
    Ok(t.f_neg()?)
}

pub fn neg_(t: &Tensor) -> NativeResult<()> {
    let mut alias = t.shallow_clone();
    alias.f_neg_()?;
    Ok(())
}

pub fn split_sections(t: &Tensor, sections: i64, dim: i64) -> NativeResult<Vec<Tensor>> {
    if sections <= 0 {
        return Err(NativeError::invalid("number of sections must be larger than 0"));
    }
    let size = t.f_size()?;
    let d = crate::codes::wrap_dim(dim, size.len())?;
    if size.is_empty() || size[d] % sections != 0 {
        return Err(NativeError::invalid(
            "array split does not result in an equal division",
        ));
    }
    let step = size[d] / sections;
    Ok(t.f_split_with_sizes(vec![step; sections as usize], d as i64)?)
}

pub fn split_indices(t: &Tensor, indices: &[i64], dim: i64) -> NativeResult<Vec<Tensor>> {
    let size = t.f_size()?;
    let d = crate::codes::wrap_dim(dim, size.len())?;
    if size.is_empty() {
        return Err(NativeError::invalid("split expects at least a 1-dimensional tensor"));
    }
    let total = size[d];
    let mut sizes = Vec::with_capacity(indices.len() + 1);
    let mut prev = 0i64;
    for idx in indices {
        let at = (*idx).clamp(prev, total);
        sizes.push(at - prev);
        prev = at;
    }
    sizes.push(total - prev);
    Ok(t.f_split_with_sizes(sizes, d as i64)?)
}

pub fn compare(op: CompareOp, a: &Tensor, b: &Tensor) -> NativeResult<Tensor> {
    let out = match op {
        CompareOp::Eq => a.f_eq_tensor(b)?,
        CompareOp::Neq => a.f_ne_tensor(b)?,
        CompareOp::Gt => a.f_gt_tensor(b)?,
        CompareOp::Gte => a.f_ge_tensor(b)?,
        CompareOp::Lt => a.f_lt_tensor(b)?,
        CompareOp::Lte => a.f_le_tensor(b)?,
    };
    Ok(out)
}

pub fn content_equal(a: &Tensor, b: &Tensor) -> NativeResult<bool> {
    if a.f_kind()? != b.f_kind()? {
        return Ok(false);
    }
    Ok(a.f_equal(b)?)
}

pub fn meta(t: &Tensor) -> NativeResult<TensorMeta> {
    Ok(TensorMeta {
        dtype: dtype_of(t.f_kind()?),
        shape: t.f_size()?,
        device: spec_of(t.device()),
        layout: Some(if t.is_sparse() { Layout::Coo } else { Layout::Dense }),
    })
}

pub fn host_bytes(t: &Tensor) -> NativeResult<(Tensor, *const u8, usize)> {
    let pinned = t.f_to_device(Device::Cpu)?.f_contiguous()?;
    let len = pinned.numel() * pinned.f_kind()?.elt_size_in_bytes();
    let ptr = pinned.data_ptr() as *const u8;
    Ok((pinned, ptr, len))
}

pub fn normalize(t: &Tensor, mean: &[f64], std: &[f64]) -> NativeResult<Tensor> {
    let rank = t.dim();
    if rank != 3 && rank != 4 {
        return Err(NativeError::invalid("expected a 3-D (CHW) or 4-D (NCHW) tensor"));
    }
    let mut stat_shape = vec![1i64; rank];
    stat_shape[rank - 3] = mean.len() as i64;
    let device = t.device();
    let m = Tensor::f_from_slice(mean)?.f_to_kind(Kind::Float)?.f_reshape(&stat_shape)?.f_to_device(device)?;
    let s = Tensor::f_from_slice(std)?.f_to_kind(Kind::Float)?.f_reshape(&stat_shape)?.f_to_device(device)?;
    Ok(t.f_to_kind(Kind::Float)?.f_sub(&m)?.f_div(&s)?)
}

pub fn resize(t: &Tensor, height: i64, width: i64, align_corners: bool) -> NativeResult<Tensor> {
    let batched = match t.dim() {
        3 => t.f_unsqueeze(0)?,
        4 => t.shallow_clone(),
        _ => return Err(NativeError::invalid("expected a 3-D (HWC) or 4-D (NHWC) image")),
    };
    let out = batched
        .f_permute([0, 3, 1, 2])?
        .f_to_kind(Kind::Float)?
        .f_upsample_bilinear2d([height, width], align_corners, None, None)?
        .f_permute([0, 2, 3, 1])?;
    if t.dim() == 3 {
        Ok(out.f_squeeze_dim(0)?)
    } else {
        Ok(out)
    }
}

pub fn to_tensor(t: &Tensor) -> NativeResult<Tensor> {
    let permuted = match t.dim() {
        3 => t.f_permute([2, 0, 1])?,
        4 => t.f_permute([0, 3, 1, 2])?,
        _ => return Err(NativeError::invalid("expected a 3-D (HWC) or 4-D (NHWC) image")),
    };
    Ok(permuted.f_to_kind(Kind::Float)?.f_div_scalar(255.0)?)
}

pub fn forward(module: &CModule, inputs: &[NativeTensor]) -> NativeResult<Vec<NativeTensor>> {
    let mut args = Vec::with_capacity(inputs.len());
    for input in inputs {
        match input {
            NativeTensor::Torch(t) => args.push(IValue::Tensor(t.shallow_clone())),
            NativeTensor::Dense(_) => {
                return Err(NativeError::invalid("torch module received a reference tensor"))
            }
        }
    }
    let mut out = Vec::new();
    collect_tensors(module.forward_is(&args)?, &mut out)?;
    Ok(out)
}

fn collect_tensors(value: IValue, out: &mut Vec<NativeTensor>) -> NativeResult<()> {
    match value {
        IValue::Tensor(t) => out.push(t.into()),
        IValue::TensorList(list) => out.extend(list.into_iter().map(NativeTensor::from)),
        IValue::Tuple(items) | IValue::GenericList(items) => {
            for item in items {
                collect_tensors(item, out)?;
            }
        }
        other => {
            return Err(NativeError::unsupported(format!(
                "module returned a non-tensor value: {other:?}"
            )))
        }
    }
    Ok(())
}
