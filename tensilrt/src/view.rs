use std::fmt;

use tracing::warn;

use crate::engine::Engine;
use crate::error::{Result, TensilError};
use crate::handle::Handle;
use crate::types::{ByteOrder, DataType, Shape};

/// Read-only view of a tensor's storage.
///
/// The native side pins the storage for as long as the view lives, so the
/// bytes stay valid even if the tensor is closed or rewritten in place.
pub struct ByteView {
    engine: Engine,
    id: Handle,
    ptr: *const u8,
    len: usize,
    dtype: DataType,
    shape: Shape,
}

// The pinned bytes are immutable and owned by the native view table.
unsafe impl Send for ByteView {}
unsafe impl Sync for ByteView {}

impl ByteView {
    pub(crate) fn new(
        engine: Engine,
        id: Handle,
        ptr: *const u8,
        len: usize,
        dtype: DataType,
        shape: Shape,
    ) -> Self {
        ByteView {
            engine,
            id,
            ptr,
            len,
            dtype,
            shape,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        if self.len == 0 || self.ptr.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Always the host order; the native side never byte-swaps.
    pub fn byte_order(&self) -> ByteOrder {
        ByteOrder::native()
    }

    /// Copies the bytes out as elements of `T`.
    pub fn cast<T: bytemuck::Pod>(&self) -> Result<Vec<T>> {
        let size = std::mem::size_of::<T>();
        if size == 0 || self.len % size != 0 {
            return Err(TensilError::invalid(format!(
                "{} bytes do not divide into {size}-byte elements",
                self.len
            )));
        }
        Ok(self
            .as_bytes()
            .chunks_exact(size)
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }
}

impl Drop for ByteView {
    fn drop(&mut self) {
        let rc = unsafe { (self.engine.sym().view_free)(self.id.raw()) };
        if let Err(err) = self.engine.check_status(rc) {
            warn!(view = ?self.id, error = %err, "failed to unpin byte view");
        }
    }
}

impl fmt::Debug for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteView")
            .field("len", &self.len)
            .field("dtype", &self.dtype)
            .field("shape", &self.shape)
            .finish()
    }
}
