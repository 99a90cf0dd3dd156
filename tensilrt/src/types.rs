//! Managed enumerations and their native code tables.
//!
//! The codes here must match `tensil_native::codes`; both sides are versioned
//! together through `TENSIL_ABI_VERSION`.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TensilError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Float32,
    Float64,
    Float16,
    Uint8,
    Int32,
    Int8,
    Int64,
    Boolean,
    Unknown,
}

impl DataType {
    pub fn code(self) -> i32 {
        match self {
            DataType::Float32 => 0,
            DataType::Float64 => 1,
            DataType::Float16 => 2,
            DataType::Uint8 => 3,
            DataType::Int32 => 4,
            DataType::Int8 => 5,
            DataType::Int64 => 6,
            DataType::Boolean => 7,
            DataType::Unknown => 8,
        }
    }

    pub fn from_code(code: i32) -> Result<Self> {
        Ok(match code {
            0 => DataType::Float32,
            1 => DataType::Float64,
            2 => DataType::Float16,
            3 => DataType::Uint8,
            4 => DataType::Int32,
            5 => DataType::Int8,
            6 => DataType::Int64,
            7 => DataType::Boolean,
            8 => DataType::Unknown,
            other => return Err(TensilError::invalid(format!("unknown dtype code {other}"))),
        })
    }

    /// Code for a dtype the native side can allocate.
    pub(crate) fn alloc_code(self) -> Result<i32> {
        if self == DataType::Unknown {
            return Err(TensilError::invalid("cannot allocate a tensor of unknown dtype"));
        }
        Ok(self.code())
    }

    /// Element size in bytes; `0` for `Unknown`.
    pub fn size(self) -> usize {
        match self {
            DataType::Float64 | DataType::Int64 => 8,
            DataType::Float32 | DataType::Int32 => 4,
            DataType::Float16 => 2,
            DataType::Uint8 | DataType::Int8 | DataType::Boolean => 1,
            DataType::Unknown => 0,
        }
    }

    pub fn is_floating(self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64 | DataType::Float16)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::Float16 => "float16",
            DataType::Uint8 => "uint8",
            DataType::Int32 => "int32",
            DataType::Int8 => "int8",
            DataType::Int64 => "int64",
            DataType::Boolean => "bool",
            DataType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Cpu,
    Gpu,
}

impl DeviceKind {
    pub fn code(self) -> i32 {
        match self {
            DeviceKind::Cpu => 0,
            DeviceKind::Gpu => 1,
        }
    }

    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(DeviceKind::Cpu),
            1 => Ok(DeviceKind::Gpu),
            other => Err(TensilError::invalid(format!("unknown device kind code {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Device {
    kind: DeviceKind,
    index: i32,
}

impl Device {
    pub fn cpu() -> Self {
        Self {
            kind: DeviceKind::Cpu,
            index: 0,
        }
    }

    pub fn gpu(index: i32) -> Self {
        Self {
            kind: DeviceKind::Gpu,
            index,
        }
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn index(&self) -> i32 {
        self.index
    }

    /// `(kind code, index)` as passed across the boundary.
    pub fn to_pair(self) -> [i32; 2] {
        [self.kind.code(), self.index]
    }

    pub fn from_pair(pair: [i32; 2]) -> Result<Self> {
        if pair[1] < 0 {
            return Err(TensilError::invalid("device index must be >= 0"));
        }
        Ok(Self {
            kind: DeviceKind::from_code(pair[0])?,
            index: pair[1],
        })
    }
}

impl Default for Device {
    fn default() -> Self {
        Device::cpu()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DeviceKind::Cpu => write!(f, "cpu:{}", self.index),
            DeviceKind::Gpu => write!(f, "gpu:{}", self.index),
        }
    }
}

impl FromStr for Device {
    type Err = TensilError;

    /// Accepts `cpu`, `gpu`, `cuda` with an optional `:index`.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let (kind, index) = match lower.split_once(':') {
            Some((kind, index)) => {
                let index = index
                    .parse::<i32>()
                    .map_err(|_| TensilError::invalid(format!("invalid device index in '{s}'")))?;
                (kind.to_string(), index)
            }
            None => (lower, 0),
        };
        let kind = match kind.as_str() {
            "cpu" => DeviceKind::Cpu,
            "gpu" | "cuda" => DeviceKind::Gpu,
            _ => return Err(TensilError::invalid(format!("unknown device '{s}'"))),
        };
        Device::from_pair([kind.code(), index])
    }
}

/// Storage layout of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SparseFormat {
    Dense,
    Coo,
    Undefined,
}

impl SparseFormat {
    pub(crate) fn layout_code(self) -> Result<i32> {
        match self {
            SparseFormat::Dense => Ok(0),
            SparseFormat::Coo => Ok(1),
            SparseFormat::Undefined => Err(TensilError::invalid(
                "a tensor cannot be created with an undefined layout",
            )),
        }
    }

    pub(crate) fn from_layout_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(SparseFormat::Dense),
            1 => Ok(SparseFormat::Coo),
            _ => Err(TensilError::unsupported("unsupported data format")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Shape(Vec<i64>);

impl Shape {
    pub fn new(dims: impl Into<Vec<i64>>) -> Self {
        Shape(dims.into())
    }

    pub fn dims(&self) -> &[i64] {
        &self.0
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn is_scalar(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of elements, saturating at `i64::MAX`.
    pub fn size(&self) -> i64 {
        self.0.iter().fold(1i64, |acc, d| acc.saturating_mul(*d))
    }
}

impl From<&[i64]> for Shape {
    fn from(dims: &[i64]) -> Self {
        Shape(dims.to_vec())
    }
}

impl<const N: usize> From<[i64; N]> for Shape {
    fn from(dims: [i64; N]) -> Self {
        Shape(dims.to_vec())
    }
}

impl From<Vec<i64>> for Shape {
    fn from(dims: Vec<i64>) -> Self {
        Shape(dims)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, ")")
    }
}

/// Host element types that can be copied into or out of a tensor.
pub trait Element: bytemuck::Pod {
    const DTYPE: DataType;
}

macro_rules! element {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(impl Element for $ty {
            const DTYPE: DataType = DataType::$dtype;
        })*
    };
}

element! {
    f32 => Float32,
    f64 => Float64,
    half::f16 => Float16,
    u8 => Uint8,
    i32 => Int32,
    i8 => Int8,
    i64 => Int64,
}

/// Byte order tag carried by raw byte views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }
}
