use std::cmp::Ordering;

use crate::codes::{check_shape, numel, wrap_dim, DType, DeviceSpec, Layout};
use crate::error::{NativeError, NativeResult};
use crate::ops::{CompareOp, UnaryOp};

use super::{encode_ints_with, encode_with, strides, try_vec, DenseTensor};

fn float_result(dtype: DType) -> DType {
    if dtype.is_float() {
        dtype
    } else {
        DType::Float32
    }
}

fn same_device(a: &DenseTensor, b: &DenseTensor) -> NativeResult<()> {
    if a.device != b.device {
        return Err(NativeError::invalid(format!(
            "Expected all tensors to be on the same device, but found {:?} and {:?}",
            a.device, b.device
        )));
    }
    Ok(())
}

/// `(outer, len, inner)` for walking the lanes of `dim`.
fn lanes(shape: &[i64], dim: usize) -> (usize, usize, usize) {
    let outer = numel(&shape[..dim]);
    let len = shape[dim] as usize;
    let inner = numel(&shape[dim + 1..]);
    (outer, len, inner)
}

pub fn fill(
    shape: &[i64],
    dtype: DType,
    layout: Layout,
    device: DeviceSpec,
    requires_grad: bool,
    value: f64,
) -> NativeResult<DenseTensor> {
    let count = check_shape(shape)?;
    let data = encode_with(count, dtype, |_| value)?;
    let mut out = DenseTensor::from_data(data, shape, dtype, device, layout);
    out.requires_grad = requires_grad;
    Ok(out)
}

pub fn arange(
    start: f64,
    stop: f64,
    step: f64,
    dtype: DType,
    device: DeviceSpec,
) -> NativeResult<DenseTensor> {
    if step == 0.0 || !step.is_finite() {
        return Err(NativeError::invalid("arange step must be a non-zero finite number"));
    }
    if (stop - start) * step < 0.0 {
        return Err(NativeError::invalid(
            "upper bound and larger bound inconsistent with step sign",
        ));
    }
    let count = ((stop - start) / step).ceil().max(0.0) as usize;
    let data = encode_with(count, dtype, |i| start + step * i as f64)?;
    Ok(DenseTensor::from_data(data, &[count as i64], dtype, device, Layout::Dense))
}

/// Integer bounds stay exact: the count and every element are computed in `i128`.
pub fn arange_int(
    start: i64,
    stop: i64,
    step: i64,
    dtype: DType,
    device: DeviceSpec,
) -> NativeResult<DenseTensor> {
    if step == 0 {
        return Err(NativeError::invalid("arange step must be a non-zero finite number"));
    }
    if (stop > start && step < 0) || (stop < start && step > 0) {
        return Err(NativeError::invalid(
            "upper bound and larger bound inconsistent with step sign",
        ));
    }
    let (start, span, step) = (start as i128, stop as i128 - start as i128, step as i128);
    let count = usize::try_from((span + step - step.signum()) / step)
        .map_err(|_| NativeError::invalid("arange produces too many elements"))?;
    let data = encode_ints_with(count, dtype, |i| (start + step * i as i128) as i64)?;
    Ok(DenseTensor::from_data(data, &[count as i64], dtype, device, Layout::Dense))
}

pub fn stack(tensors: &[&DenseTensor], dim: i64) -> NativeResult<DenseTensor> {
    let first = tensors
        .first()
        .ok_or_else(|| NativeError::invalid("stack expects a non-empty tensor list"))?;
    for t in &tensors[1..] {
        if t.shape != first.shape {
            return Err(NativeError::invalid(format!(
                "stack expects each tensor to be equal size, but got {:?} and {:?}",
                first.shape, t.shape
            )));
        }
        if t.dtype != first.dtype {
            return Err(NativeError::invalid("stack expects tensors of one dtype"));
        }
        same_device(first, t)?;
    }
    let dim = wrap_dim(dim, first.rank() + 1)?;
    let elem = first.dtype.size();
    let chunk = numel(&first.shape[dim..]) * elem;
    let outer = numel(&first.shape[..dim]);
    let mut data = try_vec(first.data.len().saturating_mul(tensors.len()))?;
    for o in 0..outer {
        for t in tensors {
            data.extend_from_slice(&t.data[o * chunk..(o + 1) * chunk]);
        }
    }
    let mut shape = first.shape.clone();
    shape.insert(dim, tensors.len() as i64);
    Ok(first.derive_bytes(data, &shape))
}

pub fn to(t: &DenseTensor, dtype: DType, device: DeviceSpec) -> NativeResult<DenseTensor> {
    let mut out = if dtype == t.dtype {
        t.clone()
    } else if !t.dtype.is_float() && !dtype.is_float() {
        t.derive_ints(&t.ints(), &t.shape, dtype)?
    } else {
        t.derive(&t.values(), &t.shape, dtype)?
    };
    out.device = device;
    Ok(out)
}

pub fn select(t: &DenseTensor, dim: i64, index: i64) -> NativeResult<DenseTensor> {
    if t.rank() == 0 {
        return Err(NativeError::invalid("select() cannot be applied to a 0-dim tensor"));
    }
    let dim = wrap_dim(dim, t.rank())?;
    let size = t.shape[dim];
    let idx = if index < 0 { index + size } else { index };
    if idx < 0 || idx >= size {
        return Err(NativeError::invalid(format!(
            "index {index} is out of bounds for dimension {dim} with size {size}"
        )));
    }
    Ok(narrow(t, dim, idx as usize, 1, false))
}

/// Copies `len` slices starting at `start` along `dim`; `keep` retains the dim.
fn narrow(t: &DenseTensor, dim: usize, start: usize, len: usize, keep: bool) -> DenseTensor {
    let elem = t.dtype.size();
    let (outer, size, inner) = lanes(&t.shape, dim);
    let row = inner * elem;
    let mut data = Vec::with_capacity(outer * len * row);
    for o in 0..outer {
        let base = (o * size + start) * row;
        data.extend_from_slice(&t.data[base..base + len * row]);
    }
    let mut shape = t.shape.clone();
    if keep {
        shape[dim] = len as i64;
    } else {
        shape.remove(dim);
    }
    t.derive_bytes(data, &shape)
}

pub fn reshape(t: &DenseTensor, shape: &[i64]) -> NativeResult<DenseTensor> {
    let mut resolved = shape.to_vec();
    let inferred: Vec<usize> = shape
        .iter()
        .enumerate()
        .filter(|(_, d)| **d == -1)
        .map(|(i, _)| i)
        .collect();
    if inferred.len() > 1 {
        return Err(NativeError::invalid("only one dimension can be inferred"));
    }
    if shape.iter().any(|d| *d < -1) {
        return Err(NativeError::invalid(format!("invalid shape dimension in {shape:?}")));
    }
    if let Some(&pos) = inferred.first() {
        let known: usize = shape
            .iter()
            .filter(|d| **d != -1)
            .map(|d| *d as usize)
            .product();
        if known == 0 || t.numel() % known != 0 {
            return Err(NativeError::invalid(format!(
                "shape '{shape:?}' is invalid for input of size {}",
                t.numel()
            )));
        }
        resolved[pos] = (t.numel() / known) as i64;
    }
    if numel(&resolved) != t.numel() {
        return Err(NativeError::invalid(format!(
            "shape '{shape:?}' is invalid for input of size {}",
            t.numel()
        )));
    }
    Ok(t.derive_bytes(t.data.clone(), &resolved))
}

pub fn softmax(t: &DenseTensor, dim: i64) -> NativeResult<DenseTensor> {
    let values = t.values();
    let mut out = values.clone();
    if t.rank() > 0 {
        let dim = wrap_dim(dim, t.rank())?;
        let (outer, len, inner) = lanes(&t.shape, dim);
        for o in 0..outer {
            for i in 0..inner {
                let at = |k: usize| (o * len + k) * inner + i;
                let max = (0..len)
                    .map(|k| values[at(k)])
                    .fold(f64::NEG_INFINITY, f64::max);
                let mut sum = 0.0;
                for k in 0..len {
                    let e = (values[at(k)] - max).exp();
                    out[at(k)] = e;
                    sum += e;
                }
                for k in 0..len {
                    out[at(k)] /= sum;
                }
            }
        }
    } else {
        wrap_dim(dim, 0)?;
        out = vec![1.0];
    }
    t.derive(&out, &t.shape, float_result(t.dtype))
}

fn arg_extreme(t: &DenseTensor, dim: Option<i64>, want: Ordering) -> NativeResult<DenseTensor> {
    if t.dtype.is_float() {
        let values = t.values();
        arg_extreme_by(t, dim, |c, b| {
            let (c, b) = (values[c], values[b]);
            (c.is_nan() && !b.is_nan()) || (!b.is_nan() && c.partial_cmp(&b) == Some(want))
        })
    } else {
        let ints = t.ints();
        arg_extreme_by(t, dim, |c, b| ints[c].cmp(&ints[b]) == want)
    }
}

/// `better(candidate, best)` compares two flat element positions.
fn arg_extreme_by(
    t: &DenseTensor,
    dim: Option<i64>,
    better: impl Fn(usize, usize) -> bool,
) -> NativeResult<DenseTensor> {
    match dim {
        None => {
            let total = t.numel();
            if total == 0 {
                return Err(NativeError::invalid(
                    "Expected reduction dim to be specified for input.numel() == 0",
                ));
            }
            let mut best = 0usize;
            for i in 1..total {
                if better(i, best) {
                    best = i;
                }
            }
            t.derive_ints(&[best as i64], &[], DType::Int64)
        }
        Some(dim) => {
            let rank = t.rank();
            let d = wrap_dim(dim, rank)?;
            if rank == 0 {
                return t.derive_ints(&[0], &[], DType::Int64);
            }
            let (outer, len, inner) = lanes(&t.shape, d);
            if len == 0 {
                return Err(NativeError::invalid(format!(
                    "cannot reduce over dimension {d} of size 0"
                )));
            }
            let mut out = Vec::with_capacity(outer * inner);
            for o in 0..outer {
                for i in 0..inner {
                    let at = |k: usize| (o * len + k) * inner + i;
                    let mut best = 0usize;
                    for k in 1..len {
                        if better(at(k), at(best)) {
                            best = k;
                        }
                    }
                    out.push(best as i64);
                }
            }
            let mut shape = t.shape.clone();
            shape.remove(d);
            t.derive_ints(&out, &shape, DType::Int64)
        }
    }
}

pub fn argmax(t: &DenseTensor, dim: Option<i64>) -> NativeResult<DenseTensor> {
    arg_extreme(t, dim, Ordering::Greater)
}

pub fn argmin(t: &DenseTensor, dim: Option<i64>) -> NativeResult<DenseTensor> {
    arg_extreme(t, dim, Ordering::Less)
}

/// Stable ascending order of each lane along `dim`, NaNs last.
fn lane_order(t: &DenseTensor, dim: i64) -> NativeResult<Vec<usize>> {
    if t.rank() == 0 {
        wrap_dim(dim, 0)?;
        return Ok(vec![0]);
    }
    let d = wrap_dim(dim, t.rank())?;
    let (outer, len, inner) = lanes(&t.shape, d);
    let floats = t.dtype.is_float().then(|| t.values());
    let ints = if floats.is_none() { t.ints() } else { Vec::new() };
    let cmp = |x: usize, y: usize| match &floats {
        Some(values) => values[x].total_cmp(&values[y]),
        None => ints[x].cmp(&ints[y]),
    };
    let mut order = vec![0usize; t.numel()];
    for o in 0..outer {
        for i in 0..inner {
            let at = |k: usize| (o * len + k) * inner + i;
            let mut ks: Vec<usize> = (0..len).collect();
            ks.sort_by(|x, y| cmp(at(*x), at(*y)));
            for (slot, k) in ks.into_iter().enumerate() {
                order[at(slot)] = k;
            }
        }
    }
    Ok(order)
}

pub fn argsort(t: &DenseTensor, dim: i64) -> NativeResult<DenseTensor> {
    let order = lane_order(t, dim)?;
    let out: Vec<i64> = order.iter().map(|k| *k as i64).collect();
    t.derive_ints(&out, &t.shape, DType::Int64)
}

/// Moves element bytes into sorted order, so no dtype loses precision.
pub fn sort(t: &DenseTensor, dim: i64) -> NativeResult<DenseTensor> {
    let order = lane_order(t, dim)?;
    if t.rank() == 0 {
        return Ok(t.clone());
    }
    let d = wrap_dim(dim, t.rank())?;
    let (outer, len, inner) = lanes(&t.shape, d);
    let elem = t.dtype.size();
    let mut data = vec![0u8; t.data.len()];
    for o in 0..outer {
        for i in 0..inner {
            for slot in 0..len {
                let pos = (o * len + slot) * inner + i;
                let src = (o * len + order[pos]) * inner + i;
                data[pos * elem..(pos + 1) * elem]
                    .copy_from_slice(&t.data[src * elem..(src + 1) * elem]);
            }
        }
    }
    Ok(t.derive_bytes(data, &t.shape))
}

pub fn permute(t: &DenseTensor, dims: &[i64]) -> NativeResult<DenseTensor> {
    let rank = t.rank();
    if dims.len() != rank {
        return Err(NativeError::invalid(format!(
            "permute: number of dims {} does not match tensor rank {rank}",
            dims.len()
        )));
    }
    let mut axes = Vec::with_capacity(rank);
    let mut seen = vec![false; rank];
    for d in dims {
        let a = wrap_dim(*d, rank)?;
        if seen[a] {
            return Err(NativeError::invalid("permute: repeated dim"));
        }
        seen[a] = true;
        axes.push(a);
    }
    let shape: Vec<i64> = axes.iter().map(|a| t.shape[*a]).collect();
    let in_strides = strides(&t.shape);
    let out_strides = strides(&shape);
    let elem = t.dtype.size();
    let mut data = vec![0u8; t.data.len()];
    for flat in 0..t.numel() {
        let mut rem = flat;
        let mut src = 0usize;
        for (axis, stride) in out_strides.iter().enumerate() {
            let coord = rem / stride;
            rem %= stride;
            src += coord * in_strides[axes[axis]];
        }
        data[flat * elem..(flat + 1) * elem].copy_from_slice(&t.data[src * elem..(src + 1) * elem]);
    }
    Ok(t.derive_bytes(data, &shape))
}

pub fn transpose(t: &DenseTensor, dim0: i64, dim1: i64) -> NativeResult<DenseTensor> {
    let rank = t.rank();
    if rank == 0 {
        wrap_dim(dim0, 0)?;
        wrap_dim(dim1, 0)?;
        return Ok(t.clone());
    }
    let a = wrap_dim(dim0, rank)?;
    let b = wrap_dim(dim1, rank)?;
    let mut dims: Vec<i64> = (0..rank as i64).collect();
    dims.swap(a, b);
    permute(t, &dims)
}

pub fn content_equal(a: &DenseTensor, b: &DenseTensor) -> NativeResult<bool> {
    same_device(a, b)?;
    if a.dtype != b.dtype || a.shape != b.shape {
        return Ok(false);
    }
    if !a.dtype.is_float() {
        return Ok(a.data == b.data);
    }
    // Floats compare by value: NaN never matches and -0.0 equals 0.0.
    Ok(a.values() == b.values())
}

pub fn sub_scalar(t: &DenseTensor, scalar: f64) -> NativeResult<DenseTensor> {
    if t.dtype == DType::Boolean {
        return Err(NativeError::invalid(
            "Subtraction, the `-` operator, with a bool tensor is not supported",
        ));
    }
    let integral = scalar.fract() == 0.0 && scalar.abs() < 9.2e18;
    if !t.dtype.is_float() && integral {
        let rhs = scalar as i64;
        let out: Vec<i64> = t.ints().iter().map(|v| v.wrapping_sub(rhs)).collect();
        return t.derive_ints(&out, &t.shape, t.dtype);
    }
    let dtype = if !t.dtype.is_float() && scalar.fract() != 0.0 {
        DType::Float32
    } else {
        t.dtype
    };
    let out: Vec<f64> = t.values().iter().map(|v| v - scalar).collect();
    t.derive(&out, &t.shape, dtype)
}

pub fn div_scalar(t: &DenseTensor, scalar: f64) -> NativeResult<DenseTensor> {
    let out: Vec<f64> = t.values().iter().map(|v| v / scalar).collect();
    t.derive(&out, &t.shape, float_result(t.dtype))
}

pub fn split_sections(t: &DenseTensor, sections: i64, dim: i64) -> NativeResult<Vec<DenseTensor>> {
    if t.rank() == 0 {
        return Err(NativeError::invalid("split expects at least a 1-dimensional tensor"));
    }
    if sections <= 0 {
        return Err(NativeError::invalid("number of sections must be larger than 0"));
    }
    let d = wrap_dim(dim, t.rank())?;
    let size = t.shape[d];
    if size % sections != 0 {
        return Err(NativeError::invalid(format!(
            "array split does not result in an equal division: {size} into {sections}"
        )));
    }
    let step = (size / sections) as usize;
    Ok((0..sections as usize)
        .map(|s| narrow(t, d, s * step, step, true))
        .collect())
}

pub fn split_indices(t: &DenseTensor, indices: &[i64], dim: i64) -> NativeResult<Vec<DenseTensor>> {
    if t.rank() == 0 {
        return Err(NativeError::invalid("split expects at least a 1-dimensional tensor"));
    }
    let d = wrap_dim(dim, t.rank())?;
    let size = t.shape[d];
    let mut bounds = Vec::with_capacity(indices.len() + 2);
    bounds.push(0i64);
    for idx in indices {
        bounds.push((*idx).clamp(0, size));
    }
    bounds.push(size);
    let mut out = Vec::with_capacity(bounds.len() - 1);
    for pair in bounds.windows(2) {
        let start = pair[0];
        let end = pair[1].max(start);
        out.push(narrow(t, d, start as usize, (end - start) as usize, true));
    }
    Ok(out)
}

pub fn squeeze(t: &DenseTensor) -> DenseTensor {
    let shape: Vec<i64> = t.shape.iter().copied().filter(|d| *d != 1).collect();
    t.derive_bytes(t.data.clone(), &shape)
}

pub fn squeeze_dim(t: &DenseTensor, dim: i64) -> NativeResult<DenseTensor> {
    let d = wrap_dim(dim, t.rank())?;
    let mut shape = t.shape.clone();
    if t.rank() > 0 && shape[d] == 1 {
        shape.remove(d);
    }
    Ok(t.derive_bytes(t.data.clone(), &shape))
}

pub fn unsqueeze(t: &DenseTensor, dim: i64) -> NativeResult<DenseTensor> {
    let d = wrap_dim(dim, t.rank() + 1)?;
    let mut shape = t.shape.clone();
    shape.insert(d, 1);
    Ok(t.derive_bytes(t.data.clone(), &shape))
}

pub fn neg(t: &DenseTensor) -> NativeResult<DenseTensor> {
    if t.dtype == DType::Boolean {
        return Err(NativeError::invalid(
            "Negation, the `-` operator, on a bool tensor is not supported",
        ));
    }
    if !t.dtype.is_float() {
        let out: Vec<i64> = t.ints().iter().map(|v| v.wrapping_neg()).collect();
        return t.derive_ints(&out, &t.shape, t.dtype);
    }
    let out: Vec<f64> = t.values().iter().map(|v| -v).collect();
    t.derive(&out, &t.shape, t.dtype)
}

pub fn unary(op: UnaryOp, t: &DenseTensor) -> NativeResult<DenseTensor> {
    let values = t.values();
    match op {
        UnaryOp::All | UnaryOp::Any | UnaryOp::NoneOf => {
            let hit = match op {
                UnaryOp::All => values.iter().all(|v| *v != 0.0),
                UnaryOp::Any => values.iter().any(|v| *v != 0.0),
                _ => !values.iter().any(|v| *v != 0.0),
            };
            return t.derive(&[f64::from(u8::from(hit))], &[], DType::Boolean);
        }
        _ => {}
    }
    let keeps_dtype = matches!(
        op,
        UnaryOp::Abs | UnaryOp::Floor | UnaryOp::Ceil | UnaryOp::Round | UnaryOp::Trunc
    );
    if keeps_dtype && !t.dtype.is_float() {
        // Rounding is the identity on integers.
        let mut ints = t.ints();
        if op == UnaryOp::Abs {
            ints.iter_mut().for_each(|v| *v = v.wrapping_abs());
        }
        return t.derive_ints(&ints, &t.shape, t.dtype);
    }
    let f: fn(f64) -> f64 = match op {
        UnaryOp::Abs => f64::abs,
        UnaryOp::Sqrt => f64::sqrt,
        UnaryOp::Floor => f64::floor,
        UnaryOp::Ceil => f64::ceil,
        UnaryOp::Round => f64::round_ties_even,
        UnaryOp::Trunc => f64::trunc,
        UnaryOp::Exp => f64::exp,
        UnaryOp::Log => f64::ln,
        UnaryOp::Log10 => f64::log10,
        UnaryOp::Log2 => f64::log2,
        UnaryOp::Sin => f64::sin,
        UnaryOp::Cos => f64::cos,
        UnaryOp::Tan => f64::tan,
        UnaryOp::Asin => f64::asin,
        UnaryOp::Acos => f64::acos,
        UnaryOp::Atan => f64::atan,
        UnaryOp::Sinh => f64::sinh,
        UnaryOp::Cosh => f64::cosh,
        UnaryOp::Tanh => f64::tanh,
        UnaryOp::All | UnaryOp::Any | UnaryOp::NoneOf => unreachable!("handled above"),
    };
    let dtype = if keeps_dtype {
        t.dtype
    } else {
        float_result(t.dtype)
    };
    let out: Vec<f64> = values.into_iter().map(f).collect();
    t.derive(&out, &t.shape, dtype)
}

fn broadcast_shape(a: &[i64], b: &[i64]) -> NativeResult<Vec<i64>> {
    let rank = a.len().max(b.len());
    let mut out = vec![0i64; rank];
    for i in 0..rank {
        let da = if i < rank - a.len() { 1 } else { a[i - (rank - a.len())] };
        let db = if i < rank - b.len() { 1 } else { b[i - (rank - b.len())] };
        out[i] = match (da, db) {
            (x, y) if x == y => x,
            (1, y) => y,
            (x, 1) => x,
            _ => {
                return Err(NativeError::invalid(format!(
                    "The size of tensor a ({da}) must match the size of tensor b ({db}) at non-singleton dimension {i}"
                )))
            }
        };
    }
    Ok(out)
}

/// Maps a flat index of the broadcast output back into an operand.
fn broadcast_source(flat: usize, out_shape: &[i64], out_strides: &[usize], shape: &[i64]) -> usize {
    let offset = out_shape.len() - shape.len();
    let in_strides = strides(shape);
    let mut rem = flat;
    let mut src = 0usize;
    for (axis, stride) in out_strides.iter().enumerate() {
        let coord = rem / stride;
        rem %= stride;
        if axis >= offset && shape[axis - offset] != 1 {
            src += coord * in_strides[axis - offset];
        }
    }
    src
}

pub fn compare(op: CompareOp, a: &DenseTensor, b: &DenseTensor) -> NativeResult<DenseTensor> {
    same_device(a, b)?;
    let shape = broadcast_shape(&a.shape, &b.shape)?;
    if !a.dtype.is_float() && !b.dtype.is_float() {
        return compare_by(op, a, b, &shape, a.ints(), b.ints());
    }
    compare_by(op, a, b, &shape, a.values(), b.values())
}

fn compare_by<T: PartialOrd>(
    op: CompareOp,
    a: &DenseTensor,
    b: &DenseTensor,
    shape: &[i64],
    av: Vec<T>,
    bv: Vec<T>,
) -> NativeResult<DenseTensor> {
    let out_strides = strides(shape);
    let out: Vec<i64> = (0..numel(shape))
        .map(|flat| {
            let x = &av[broadcast_source(flat, shape, &out_strides, &a.shape)];
            let y = &bv[broadcast_source(flat, shape, &out_strides, &b.shape)];
            let hit = match op {
                CompareOp::Eq => x == y,
                CompareOp::Neq => x != y,
                CompareOp::Gt => x > y,
                CompareOp::Gte => x >= y,
                CompareOp::Lt => x < y,
                CompareOp::Lte => x <= y,
            };
            i64::from(hit)
        })
        .collect();
    a.derive_ints(&out, shape, DType::Boolean)
}

/// Channel dimension for image helpers: CHW or NCHW.
fn channel_dim(t: &DenseTensor) -> NativeResult<usize> {
    match t.rank() {
        3 | 4 => Ok(t.rank() - 3),
        r => Err(NativeError::invalid(format!(
            "expected a 3-D (CHW) or 4-D (NCHW) tensor, got rank {r}"
        ))),
    }
}

pub fn normalize(t: &DenseTensor, mean: &[f64], std: &[f64]) -> NativeResult<DenseTensor> {
    let c = channel_dim(t)?;
    let (outer, len, inner) = lanes(&t.shape, c);
    if mean.len() != len || std.len() != len {
        return Err(NativeError::invalid(format!(
            "normalize expects {len} mean/std values, got {} and {}",
            mean.len(),
            std.len()
        )));
    }
    if std.iter().any(|s| *s == 0.0) {
        return Err(NativeError::invalid("std evaluated to zero, leading to division by zero"));
    }
    let mut values = t.values();
    for o in 0..outer {
        for k in 0..len {
            for i in 0..inner {
                let at = (o * len + k) * inner + i;
                values[at] = (values[at] - mean[k]) / std[k];
            }
        }
    }
    t.derive(&values, &t.shape, float_result(t.dtype))
}

/// Bilinear resize of an HWC or NHWC image to `height x width`.
pub fn resize(
    t: &DenseTensor,
    height: i64,
    width: i64,
    align_corners: bool,
) -> NativeResult<DenseTensor> {
    if height <= 0 || width <= 0 {
        return Err(NativeError::invalid("resize target must be positive"));
    }
    let (batch, h_in, w_in, c) = match t.shape.as_slice() {
        [h, w, c] => (1usize, *h as usize, *w as usize, *c as usize),
        [n, h, w, c] => (*n as usize, *h as usize, *w as usize, *c as usize),
        other => {
            return Err(NativeError::invalid(format!(
                "expected a 3-D (HWC) or 4-D (NHWC) image, got shape {other:?}"
            )))
        }
    };
    if h_in == 0 || w_in == 0 {
        return Err(NativeError::invalid("cannot resize an empty image"));
    }
    let (h_out, w_out) = (height as usize, width as usize);
    let src = t.values();
    let coord = |out: usize, n_out: usize, n_in: usize| -> f64 {
        if align_corners {
            if n_out > 1 {
                out as f64 * (n_in - 1) as f64 / (n_out - 1) as f64
            } else {
                0.0
            }
        } else {
            ((out as f64 + 0.5) * n_in as f64 / n_out as f64 - 0.5).max(0.0)
        }
    };
    let count = [batch, h_out, w_out, c]
        .iter()
        .try_fold(1usize, |acc, d| acc.checked_mul(*d))
        .ok_or_else(|| NativeError::invalid("resize target is too large"))?;
    let mut out = try_vec::<f64>(count)?;
    for n in 0..batch {
        for y in 0..h_out {
            let fy = coord(y, h_out, h_in);
            let y0 = (fy.floor() as usize).min(h_in - 1);
            let y1 = (y0 + 1).min(h_in - 1);
            let wy = fy - y0 as f64;
            for x in 0..w_out {
                let fx = coord(x, w_out, w_in);
                let x0 = (fx.floor() as usize).min(w_in - 1);
                let x1 = (x0 + 1).min(w_in - 1);
                let wx = fx - x0 as f64;
                for ch in 0..c {
                    let px = |yy: usize, xx: usize| src[((n * h_in + yy) * w_in + xx) * c + ch];
                    let top = px(y0, x0) * (1.0 - wx) + px(y0, x1) * wx;
                    let bottom = px(y1, x0) * (1.0 - wx) + px(y1, x1) * wx;
                    out.push(top * (1.0 - wy) + bottom * wy);
                }
            }
        }
    }
    let shape: Vec<i64> = if t.rank() == 3 {
        vec![height, width, c as i64]
    } else {
        vec![batch as i64, height, width, c as i64]
    };
    t.derive(&out, &shape, float_result(t.dtype))
}

/// HWC (or NHWC) pixels in `0..=255` to CHW (or NCHW) `Float32` in `0..=1`.
pub fn to_tensor(t: &DenseTensor) -> NativeResult<DenseTensor> {
    let dims: Vec<i64> = match t.rank() {
        3 => vec![2, 0, 1],
        4 => vec![0, 3, 1, 2],
        r => {
            return Err(NativeError::invalid(format!(
                "expected a 3-D (HWC) or 4-D (NHWC) image, got rank {r}"
            )))
        }
    };
    let chw = permute(t, &dims)?;
    let scaled: Vec<f64> = chw.values().iter().map(|v| v / 255.0).collect();
    chw.derive(&scaled, &chw.shape, DType::Float32)
}
