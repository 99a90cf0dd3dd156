use crate::error::{NativeError, NativeResult};

/// Bumped whenever an entry point changes its signature or a code table changes.
pub const TENSIL_ABI_VERSION: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Float32 = 0,
    Float64 = 1,
    Float16 = 2,
    Uint8 = 3,
    Int32 = 4,
    Int8 = 5,
    Int64 = 6,
    Boolean = 7,
}

impl DType {
    pub fn from_code(code: i32) -> NativeResult<Self> {
        match code {
            0 => Ok(DType::Float32),
            1 => Ok(DType::Float64),
            2 => Ok(DType::Float16),
            3 => Ok(DType::Uint8),
            4 => Ok(DType::Int32),
            5 => Ok(DType::Int8),
            6 => Ok(DType::Int64),
            7 => Ok(DType::Boolean),
            other => Err(NativeError::invalid(format!("Unsupported dtype code {other}"))),
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn size(self) -> usize {
        match self {
            DType::Float64 | DType::Int64 => 8,
            DType::Float32 | DType::Int32 => 4,
            DType::Float16 => 2,
            DType::Uint8 | DType::Int8 | DType::Boolean => 1,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, DType::Float32 | DType::Float64 | DType::Float16)
    }

    /// Byte length of `count` elements, `None` on overflow.
    pub fn bytes_for(self, count: usize) -> Option<usize> {
        count.checked_mul(self.size())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    Dense = 0,
    Coo = 1,
}

impl Layout {
    pub fn from_code(code: i32) -> NativeResult<Self> {
        match code {
            0 => Ok(Layout::Dense),
            1 => Ok(Layout::Coo),
            other => Err(NativeError::invalid(format!("Unsupported layout code {other}"))),
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Cpu = 0,
    Gpu = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceSpec {
    pub kind: DeviceKind,
    pub index: i32,
}

impl DeviceSpec {
    pub const CPU: DeviceSpec = DeviceSpec {
        kind: DeviceKind::Cpu,
        index: 0,
    };

    pub fn from_pair(kind: i32, index: i32) -> NativeResult<Self> {
        let kind = match kind {
            0 => DeviceKind::Cpu,
            1 => DeviceKind::Gpu,
            other => {
                return Err(NativeError::invalid(format!(
                    "Unsupported device kind code {other}"
                )))
            }
        };
        if index < 0 {
            return Err(NativeError::invalid("Device index must be >= 0"));
        }
        Ok(Self { kind, index })
    }

    pub fn to_pair(self) -> [i32; 2] {
        [self.kind as i32, self.index]
    }
}

/// Validates `shape` and returns its element count.
pub fn check_shape(shape: &[i64]) -> NativeResult<usize> {
    if shape.iter().any(|d| *d < 0) {
        return Err(NativeError::invalid("The shape must be >= 0"));
    }
    if shape.contains(&0) {
        return Ok(0);
    }
    shape
        .iter()
        .try_fold(1usize, |acc, d| acc.checked_mul(*d as usize))
        .ok_or_else(|| NativeError::invalid(format!("shape {shape:?} has too many elements")))
}

/// Element count of a shape already accepted by `check_shape`.
pub fn numel(shape: &[i64]) -> usize {
    shape
        .iter()
        .fold(1usize, |acc, d| acc.saturating_mul(*d as usize))
}

/// Wraps a possibly negative dimension into `0..rank`.
pub fn wrap_dim(dim: i64, rank: usize) -> NativeResult<usize> {
    let rank_i = rank as i64;
    let wrapped = if dim < 0 { dim + rank_i } else { dim };
    if wrapped < 0 || wrapped >= rank_i.max(1) {
        return Err(NativeError::invalid(format!(
            "Dimension {dim} out of range for tensor of rank {rank}"
        )));
    }
    Ok(wrapped as usize)
}
