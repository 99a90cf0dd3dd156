//! Pure-Rust reference backend.
//!
//! Storage is a contiguous row-major byte buffer in native endianness. Devices
//! are recorded as tags only: a `Gpu` tensor lives in host memory but keeps its
//! placement so device checks behave as they would on a real accelerator.
//! Sparse COO tensors are likewise tagged and stored densely.

pub mod kernels;
pub mod module;

use half::f16;

use crate::codes::{check_shape, numel, DType, DeviceSpec, Layout};
use crate::error::{NativeError, NativeResult};

#[derive(Debug, Clone, PartialEq)]
pub struct DenseTensor {
    pub dtype: DType,
    pub shape: Vec<i64>,
    pub device: DeviceSpec,
    pub layout: Layout,
    pub requires_grad: bool,
    pub data: Vec<u8>,
}

/// Reserves room for `len` items, reporting a failed allocation as an error
/// instead of aborting the process.
pub(crate) fn try_vec<T>(len: usize) -> NativeResult<Vec<T>> {
    let mut out = Vec::new();
    out.try_reserve_exact(len).map_err(|_| {
        let bytes = len.saturating_mul(std::mem::size_of::<T>());
        NativeError::native(format!("allocation of {bytes} bytes failed"))
    })?;
    Ok(out)
}

fn byte_len(count: usize, dtype: DType, shape: &[i64]) -> NativeResult<usize> {
    dtype
        .bytes_for(count)
        .ok_or_else(|| NativeError::invalid(format!("shape {shape:?} of {dtype:?} is too large")))
}

/// Encodes `count` elements produced by `f` into a freshly reserved buffer.
pub(crate) fn encode_with(
    count: usize,
    dtype: DType,
    mut f: impl FnMut(usize) -> f64,
) -> NativeResult<Vec<u8>> {
    let mut data = try_vec(byte_len(count, dtype, &[count as i64])?)?;
    for i in 0..count {
        encode(f(i), dtype, &mut data);
    }
    Ok(data)
}

/// Integer counterpart of `encode_with`.
pub(crate) fn encode_ints_with(
    count: usize,
    dtype: DType,
    mut f: impl FnMut(usize) -> i64,
) -> NativeResult<Vec<u8>> {
    let mut data = try_vec(byte_len(count, dtype, &[count as i64])?)?;
    for i in 0..count {
        encode_int(f(i), dtype, &mut data);
    }
    Ok(data)
}

impl DenseTensor {
    pub fn zeroed(
        shape: &[i64],
        dtype: DType,
        device: DeviceSpec,
        layout: Layout,
    ) -> NativeResult<Self> {
        let len = byte_len(check_shape(shape)?, dtype, shape)?;
        let mut data = try_vec(len)?;
        data.resize(len, 0u8);
        Ok(Self::from_data(data, shape, dtype, device, layout))
    }

    pub fn from_bytes(
        bytes: &[u8],
        shape: &[i64],
        dtype: DType,
        device: DeviceSpec,
        layout: Layout,
    ) -> NativeResult<Self> {
        let expected = byte_len(check_shape(shape)?, dtype, shape)?;
        if bytes.len() != expected {
            return Err(NativeError::invalid(format!(
                "Buffer holds {} bytes but shape {:?} of {:?} needs {}",
                bytes.len(),
                shape,
                dtype,
                expected
            )));
        }
        let mut data = try_vec(expected)?;
        data.extend_from_slice(bytes);
        Ok(Self::from_data(data, shape, dtype, device, layout))
    }

    pub fn from_values(
        values: &[f64],
        shape: &[i64],
        dtype: DType,
        device: DeviceSpec,
        layout: Layout,
    ) -> NativeResult<Self> {
        if values.len() != check_shape(shape)? {
            return Err(NativeError::invalid(format!(
                "{} values do not fill shape {:?}",
                values.len(),
                shape
            )));
        }
        let data = encode_with(values.len(), dtype, |i| values[i])?;
        Ok(Self::from_data(data, shape, dtype, device, layout))
    }

    /// Exact counterpart of `from_values` for integer contents.
    pub fn from_ints(
        values: &[i64],
        shape: &[i64],
        dtype: DType,
        device: DeviceSpec,
        layout: Layout,
    ) -> NativeResult<Self> {
        if values.len() != check_shape(shape)? {
            return Err(NativeError::invalid(format!(
                "{} values do not fill shape {:?}",
                values.len(),
                shape
            )));
        }
        let data = encode_ints_with(values.len(), dtype, |i| values[i])?;
        Ok(Self::from_data(data, shape, dtype, device, layout))
    }

    /// Wraps already encoded bytes; the caller guarantees the length matches.
    pub(crate) fn from_data(
        data: Vec<u8>,
        shape: &[i64],
        dtype: DType,
        device: DeviceSpec,
        layout: Layout,
    ) -> Self {
        Self {
            dtype,
            shape: shape.to_vec(),
            device,
            layout,
            requires_grad: false,
            data,
        }
    }

    /// Builds a tensor with the same placement as `self` but new contents.
    pub fn derive(&self, values: &[f64], shape: &[i64], dtype: DType) -> NativeResult<Self> {
        let mut out = Self::from_values(values, shape, dtype, self.device, self.layout)?;
        out.requires_grad = self.requires_grad;
        Ok(out)
    }

    pub fn derive_ints(&self, values: &[i64], shape: &[i64], dtype: DType) -> NativeResult<Self> {
        let mut out = Self::from_ints(values, shape, dtype, self.device, self.layout)?;
        out.requires_grad = self.requires_grad;
        Ok(out)
    }

    pub fn derive_bytes(&self, data: Vec<u8>, shape: &[i64]) -> Self {
        Self {
            dtype: self.dtype,
            shape: shape.to_vec(),
            device: self.device,
            layout: self.layout,
            requires_grad: self.requires_grad,
            data,
        }
    }

    pub fn numel(&self) -> usize {
        numel(&self.shape)
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn values(&self) -> Vec<f64> {
        self.data
            .chunks_exact(self.dtype.size())
            .map(|chunk| decode(chunk, self.dtype))
            .collect()
    }

    /// Exact integer contents. Float elements are truncated toward zero.
    pub fn ints(&self) -> Vec<i64> {
        self.data
            .chunks_exact(self.dtype.size())
            .map(|chunk| decode_int(chunk, self.dtype))
            .collect()
    }
}

fn encode(v: f64, dtype: DType, out: &mut Vec<u8>) {
    // Integer targets go through i64 so narrowing wraps.
    match dtype {
        DType::Float32 => out.extend_from_slice(&(v as f32).to_ne_bytes()),
        DType::Float64 => out.extend_from_slice(&v.to_ne_bytes()),
        DType::Float16 => out.extend_from_slice(&f16::from_f64(v).to_ne_bytes()),
        DType::Uint8 => out.push(v as i64 as u8),
        DType::Int8 => out.extend_from_slice(&(v as i64 as i8).to_ne_bytes()),
        DType::Int32 => out.extend_from_slice(&(v as i64 as i32).to_ne_bytes()),
        DType::Int64 => out.extend_from_slice(&(v as i64).to_ne_bytes()),
        DType::Boolean => out.push(u8::from(v != 0.0)),
    }
}

fn decode(chunk: &[u8], dtype: DType) -> f64 {
    match dtype {
        DType::Float32 => f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f64,
        DType::Float64 => f64::from_ne_bytes([
            chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
        ]),
        DType::Float16 => f16::from_ne_bytes([chunk[0], chunk[1]]).to_f64(),
        DType::Uint8 => chunk[0] as f64,
        DType::Int8 => chunk[0] as i8 as f64,
        DType::Int32 => i32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f64,
        DType::Int64 => i64::from_ne_bytes([
            chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
        ]) as f64,
        DType::Boolean => {
            if chunk[0] != 0 {
                1.0
            } else {
                0.0
            }
        }
    }
}

fn encode_int(v: i64, dtype: DType, out: &mut Vec<u8>) {
    match dtype {
        DType::Float32 | DType::Float64 | DType::Float16 => encode(v as f64, dtype, out),
        DType::Uint8 => out.push(v as u8),
        DType::Int8 => out.extend_from_slice(&(v as i8).to_ne_bytes()),
        DType::Int32 => out.extend_from_slice(&(v as i32).to_ne_bytes()),
        DType::Int64 => out.extend_from_slice(&v.to_ne_bytes()),
        DType::Boolean => out.push(u8::from(v != 0)),
    }
}

fn decode_int(chunk: &[u8], dtype: DType) -> i64 {
    match dtype {
        DType::Float32 | DType::Float64 | DType::Float16 => decode(chunk, dtype) as i64,
        DType::Uint8 => i64::from(chunk[0]),
        DType::Int8 => i64::from(chunk[0] as i8),
        DType::Int32 => i64::from(i32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])),
        DType::Int64 => i64::from_ne_bytes([
            chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
        ]),
        DType::Boolean => i64::from(chunk[0] != 0),
    }
}

/// Row-major strides in elements.
pub(crate) fn strides(shape: &[i64]) -> Vec<usize> {
    let mut out = vec![1usize; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        out[i] = out[i + 1] * shape[i + 1] as usize;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_roundtrip_through_every_dtype() {
        let values = [0.0, 1.0, 2.0, 3.0];
        for dtype in [
            DType::Float32,
            DType::Float64,
            DType::Float16,
            DType::Uint8,
            DType::Int8,
            DType::Int32,
            DType::Int64,
        ] {
            let t = DenseTensor::from_values(&values, &[2, 2], dtype, DeviceSpec::CPU, Layout::Dense)
                .unwrap();
            assert_eq!(t.data.len(), 4 * dtype.size());
            assert_eq!(t.values(), values.to_vec(), "{dtype:?}");
        }
    }

    #[test]
    fn integer_narrowing_wraps() {
        let t = DenseTensor::from_values(&[-1.0], &[1], DType::Uint8, DeviceSpec::CPU, Layout::Dense)
            .unwrap();
        assert_eq!(t.data, vec![255]);
    }

    #[test]
    fn rejects_negative_shape() {
        let err = DenseTensor::zeroed(&[2, -1], DType::Float32, DeviceSpec::CPU, Layout::Dense)
            .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn strides_are_row_major() {
        assert_eq!(strides(&[2, 3, 4]), vec![12, 4, 1]);
        assert!(strides(&[]).is_empty());
    }

    #[test]
    fn huge_shapes_fail_without_aborting() {
        let err = DenseTensor::zeroed(&[1 << 60], DType::Float32, DeviceSpec::CPU, Layout::Dense)
            .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Native);
        assert!(err.message.contains("allocation of"), "{}", err.message);

        let err = DenseTensor::zeroed(&[1 << 40, 1 << 40], DType::Int8, DeviceSpec::CPU, Layout::Dense)
            .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn ints_are_exact_past_f64_precision() {
        let big = (1i64 << 53) + 1;
        let t = DenseTensor::from_ints(&[big, -big], &[2], DType::Int64, DeviceSpec::CPU, Layout::Dense)
            .unwrap();
        assert_eq!(t.ints(), vec![big, -big]);
        assert_ne!(t.values()[0] as i64, big);
    }
}
