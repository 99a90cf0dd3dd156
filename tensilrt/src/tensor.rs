use std::fmt;
use std::os::raw::c_int;
use std::ptr;
use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;
use tracing::{trace, warn};

use crate::catalog::{CompareKind, OpSupport, TensorOp, UnaryKind};
use crate::engine::Engine;
use crate::error::{Result, TensilError};
use crate::handle::Handle;
use crate::manager::{ManagerInner, TensorManager};
use crate::resource::sealed::{Sealed, Tracked};
use crate::resource::{close_tracked, NativeResource, Owner, ResourceCell, ResourceId};
use crate::types::{DataType, Device, Shape, SparseFormat};
use crate::view::ByteView;

/// Proxy for one native tensor.
///
/// Clones share the same handle; the native tensor is released when the
/// last clone drops, when [`Tensor::close`] is called or when the owning
/// manager closes. Results of operations are fresh tensors registered with
/// this tensor's manager.
#[derive(Clone)]
pub struct Tensor {
    inner: Arc<TensorInner>,
}

struct TensorInner {
    uid: ResourceId,
    cell: ResourceCell,
    engine: Engine,
    owner: Owner,
    name: Mutex<Option<String>>,
    shape: OnceCell<Shape>,
    dtype: OnceCell<DataType>,
    device: OnceCell<Device>,
    format: OnceCell<SparseFormat>,
}

impl Tracked for TensorInner {
    fn uid(&self) -> ResourceId {
        self.uid
    }

    fn owner(&self) -> &Owner {
        &self.owner
    }

    fn release_native(&self) -> Result<()> {
        match self.cell.take() {
            Some(handle) => {
                trace!(uid = %self.uid, ?handle, "tensor released");
                self.engine.delete_tensor(handle)
            }
            None => Ok(()),
        }
    }
}

impl Drop for TensorInner {
    fn drop(&mut self) {
        if let Err(err) = close_tracked(&*self) {
            warn!(uid = %self.uid, error = %err, "tensor release failed on drop");
        }
    }
}

impl Sealed for Tensor {
    fn tracked(&self) -> Arc<dyn Tracked> {
        self.inner.clone()
    }
}

impl NativeResource for Tensor {
    fn uid(&self) -> ResourceId {
        self.inner.uid
    }

    fn is_closed(&self) -> bool {
        self.inner.cell.is_closed()
    }

    fn close(&self) -> Result<()> {
        close_tracked(&*self.inner)
    }
}

impl Tensor {
    /// Wraps a handle just returned by the native side. `raw == 0` turns the
    /// thread's native error into the result.
    pub(crate) fn adopt(
        engine: &Engine,
        manager: Option<&Arc<ManagerInner>>,
        raw: i64,
    ) -> Result<Tensor> {
        let handle = engine.check_handle(raw)?;
        let tensor = Tensor::wrap(engine, manager, handle);
        if let Some(manager) = manager {
            // On a closed manager the tensor drops here and frees the handle.
            manager.register(tensor.inner.uid, Arc::downgrade(&tensor.tracked()))?;
        }
        Ok(tensor)
    }

    pub(crate) fn adopt_all(
        engine: &Engine,
        manager: Option<&Arc<ManagerInner>>,
        raws: Vec<i64>,
    ) -> Result<Vec<Tensor>> {
        let mut tensors = Vec::with_capacity(raws.len());
        for raw in raws {
            let handle = Handle::from_raw(raw).ok_or_else(|| {
                TensilError::NativeCallFailure("native list holds a null handle".to_string())
            })?;
            tensors.push(Tensor::wrap(engine, manager, handle));
        }
        if let Some(manager) = manager {
            for t in &tensors {
                manager.register(t.inner.uid, Arc::downgrade(&t.tracked()))?;
            }
        }
        Ok(tensors)
    }

    fn wrap(engine: &Engine, manager: Option<&Arc<ManagerInner>>, handle: Handle) -> Tensor {
        let uid = ResourceId::next();
        trace!(%uid, ?handle, "tensor acquired");
        Tensor {
            inner: Arc::new(TensorInner {
                uid,
                cell: ResourceCell::new(handle),
                engine: engine.clone(),
                owner: Owner::new(manager),
                name: Mutex::new(None),
                shape: OnceCell::new(),
                dtype: OnceCell::new(),
                device: OnceCell::new(),
                format: OnceCell::new(),
            }),
        }
    }

    pub fn uid(&self) -> ResourceId {
        self.inner.uid
    }

    pub fn is_closed(&self) -> bool {
        self.inner.cell.is_closed()
    }

    /// Releases the native tensor now. Later calls do nothing; every other
    /// operation then fails with `ResourceClosed`.
    pub fn close(&self) -> Result<()> {
        close_tracked(&*self.inner)
    }

    pub(crate) fn raw_handle(&self) -> Result<i64> {
        self.handle().map(Handle::raw)
    }

    /// Opaque handle, for identity checks.
    pub fn handle(&self) -> Result<Handle> {
        self.inner.cell.get("tensor")
    }

    /// Raw native handle value. Debugging only.
    pub fn handle_id(&self) -> Result<i64> {
        self.raw_handle()
    }

    pub fn engine(&self) -> &Engine {
        &self.inner.engine
    }

    pub fn manager(&self) -> Option<TensorManager> {
        self.inner.owner.manager().map(TensorManager::from_inner)
    }

    pub fn name(&self) -> Option<String> {
        self.inner
            .name
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        *self
            .inner
            .name
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(name.into());
    }

    /// A second proxy for the same native tensor with its own uid.
    ///
    /// The native reference count is bumped, so each proxy releases
    /// independently. Meant for tests and debugging.
    pub fn alias(&self) -> Result<Tensor> {
        let handle = self.handle()?;
        let rc = unsafe { (self.engine().sym().retain)(handle.raw()) };
        self.engine().check_status(rc)?;
        let manager = self.inner.owner.manager();
        let alias = Tensor::wrap(self.engine(), manager.as_ref(), handle);
        if let Some(manager) = &manager {
            manager.register(alias.inner.uid, Arc::downgrade(&alias.tracked()))?;
        }
        Ok(alias)
    }

    /// Wraps an operation result into this tensor's manager. Must run before
    /// any other native call on this thread.
    fn derive(&self, raw: i64) -> Result<Tensor> {
        Tensor::adopt(self.engine(), self.inner.owner.manager().as_ref(), raw)
    }

    fn derive_all(&self, raws: Vec<i64>) -> Result<Vec<Tensor>> {
        let manager = self.inner.owner.manager();
        Tensor::adopt_all(self.engine(), manager.as_ref(), raws)
    }

    fn call(&self, f: impl FnOnce(i64) -> i64) -> Result<Tensor> {
        let raw = f(self.raw_handle()?);
        self.derive(raw)
    }

    fn unsupported(&self, op: TensorOp) -> TensilError {
        match op.support() {
            OpSupport::Unsupported(reason) => {
                TensilError::unsupported(format!("{}: {reason}", op.name()))
            }
            OpSupport::Implemented(native) => TensilError::unsupported(format!(
                "{} is served by {} and has no placeholder",
                op.name(),
                native.symbol()
            )),
        }
    }

    // Metadata is cached on first read. A released tensor reports closed
    // even when the cache is warm.

    pub fn shape(&self) -> Result<Shape> {
        self.handle()?;
        self.inner
            .shape
            .get_or_try_init(|| {
                let raw = self.raw_handle()?;
                let slice = unsafe { (self.engine().sym().sizes)(raw) };
                self.engine().take_i64s(slice).map(Shape::from)
            })
            .cloned()
    }

    pub fn rank(&self) -> Result<usize> {
        Ok(self.shape()?.rank())
    }

    pub fn dtype(&self) -> Result<DataType> {
        self.handle()?;
        self.inner
            .dtype
            .get_or_try_init(|| {
                let raw = self.raw_handle()?;
                let code = unsafe { (self.engine().sym().dtype)(raw) };
                if code < 0 {
                    return Err(self.engine().last_error());
                }
                DataType::from_code(code)
            })
            .copied()
    }

    pub fn device(&self) -> Result<Device> {
        self.handle()?;
        self.inner
            .device
            .get_or_try_init(|| {
                let raw = self.raw_handle()?;
                let mut pair: [c_int; 2] = [0, 0];
                let rc = unsafe { (self.engine().sym().device)(raw, pair.as_mut_ptr()) };
                self.engine().check_status(rc)?;
                Device::from_pair(pair)
            })
            .copied()
    }

    pub fn sparse_format(&self) -> Result<SparseFormat> {
        self.handle()?;
        self.inner
            .format
            .get_or_try_init(|| {
                let raw = self.raw_handle()?;
                let code = unsafe { (self.engine().sym().layout)(raw) };
                if code < 0 {
                    return Err(self.engine().last_error());
                }
                SparseFormat::from_layout_code(code)
            })
            .copied()
    }

    // Conversion and access

    pub fn to_device(&self, device: Device, copy: bool) -> Result<Tensor> {
        let dtype = self.dtype()?.alloc_code()?;
        self.convert(dtype, device, copy)
    }

    pub fn to_dtype(&self, dtype: DataType, copy: bool) -> Result<Tensor> {
        let dtype = dtype.alloc_code()?;
        let device = self.device()?;
        self.convert(dtype, device, copy)
    }

    fn convert(&self, dtype: c_int, device: Device, copy: bool) -> Result<Tensor> {
        let pair = device.to_pair();
        let to = self.engine().sym().to;
        self.call(|h| unsafe { to(h, dtype, copy as c_int, pair.as_ptr()) })
    }

    /// Zero-copy view of the backing bytes, pinned until the view drops.
    pub fn to_bytes(&self) -> Result<ByteView> {
        let dtype = self.dtype()?;
        let shape = self.shape()?;
        let raw = self.raw_handle()?;
        let mut data = ptr::null();
        let mut len = 0usize;
        let id = unsafe { (self.engine().sym().data_view)(raw, &mut data, &mut len) };
        let id = self.engine().check_handle(id)?;
        Ok(ByteView::new(self.engine().clone(), id, data, len, dtype, shape))
    }

    /// Copies the elements out as `T`, which must match the dtype.
    pub fn to_vec<T: crate::types::Element>(&self) -> Result<Vec<T>> {
        let dtype = self.dtype()?;
        if dtype != T::DTYPE {
            return Err(TensilError::invalid(format!(
                "cannot read {dtype} data as {}",
                T::DTYPE
            )));
        }
        self.to_bytes()?.cast()
    }

    /// Slice `index` along the first axis. A scalar returns itself.
    pub fn get(&self, index: i64) -> Result<Tensor> {
        if self.shape()?.is_scalar() {
            return Ok(self.clone());
        }
        let get = self.engine().sym().get;
        self.call(|h| unsafe { get(h, index) })
    }

    /// Element-wise content equality; differing dtype or shape is `false`.
    pub fn content_equals(&self, other: &Tensor) -> Result<bool> {
        let a = self.raw_handle()?;
        let b = other.raw_handle()?;
        match unsafe { (self.engine().sym().content_equal)(a, b) } {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(self.engine().last_error()),
        }
    }

    // Comparison

    fn compare(&self, kind: CompareKind, other: &Tensor) -> Result<Tensor> {
        let (left, right) = (self.device()?, other.device()?);
        if left != right {
            return Err(TensilError::invalid(format!(
                "{} expects operands on one device, got {left} and {right}",
                kind.name()
            )));
        }
        let b = other.raw_handle()?;
        let entry = kind.entry(self.engine().sym());
        self.call(|a| unsafe { entry(a, b) })
    }

    fn compare_scalar(&self, kind: CompareKind, value: f64) -> Result<Tensor> {
        let scalar = self.scalar_like(value)?;
        let out = self.compare(kind, &scalar);
        scalar.close()?;
        out
    }

    /// Rank-0 tensor holding `value` in this tensor's dtype and device.
    fn scalar_like(&self, value: f64) -> Result<Tensor> {
        let dtype = self.dtype()?.alloc_code()?;
        let pair = self.device()?.to_pair();
        let full = self.engine().sym().full;
        let raw = unsafe { full(ptr::null(), 0, value, dtype, 0, 0, pair.as_ptr()) };
        self.derive(raw)
    }

    pub fn eq(&self, other: &Tensor) -> Result<Tensor> {
        self.compare(CompareKind::Eq, other)
    }

    pub fn neq(&self, other: &Tensor) -> Result<Tensor> {
        self.compare(CompareKind::Neq, other)
    }

    pub fn gt(&self, other: &Tensor) -> Result<Tensor> {
        self.compare(CompareKind::Gt, other)
    }

    pub fn gte(&self, other: &Tensor) -> Result<Tensor> {
        self.compare(CompareKind::Gte, other)
    }

    pub fn lt(&self, other: &Tensor) -> Result<Tensor> {
        self.compare(CompareKind::Lt, other)
    }

    pub fn lte(&self, other: &Tensor) -> Result<Tensor> {
        self.compare(CompareKind::Lte, other)
    }

    pub fn eq_scalar(&self, value: f64) -> Result<Tensor> {
        self.compare_scalar(CompareKind::Eq, value)
    }

    pub fn neq_scalar(&self, value: f64) -> Result<Tensor> {
        self.compare_scalar(CompareKind::Neq, value)
    }

    pub fn gt_scalar(&self, value: f64) -> Result<Tensor> {
        self.compare_scalar(CompareKind::Gt, value)
    }

    pub fn gte_scalar(&self, value: f64) -> Result<Tensor> {
        self.compare_scalar(CompareKind::Gte, value)
    }

    pub fn lt_scalar(&self, value: f64) -> Result<Tensor> {
        self.compare_scalar(CompareKind::Lt, value)
    }

    pub fn lte_scalar(&self, value: f64) -> Result<Tensor> {
        self.compare_scalar(CompareKind::Lte, value)
    }

    // Arithmetic

    pub fn sub_scalar(&self, value: f64) -> Result<Tensor> {
        let sub = self.engine().sym().sub_scalar;
        self.call(|h| unsafe { sub(h, value) })
    }

    pub fn div_scalar(&self, value: f64) -> Result<Tensor> {
        let div = self.engine().sym().div_scalar;
        self.call(|h| unsafe { div(h, value) })
    }

    pub fn neg(&self) -> Result<Tensor> {
        let neg = self.engine().sym().neg;
        self.call(|h| unsafe { neg(h, 0) })
    }

    /// Negates in place and returns this tensor. Cached metadata is kept.
    pub fn negi(&self) -> Result<Tensor> {
        let raw = self.raw_handle()?;
        let out = unsafe { (self.engine().sym().neg)(raw, 1) };
        let handle = self.engine().check_handle(out)?;
        if handle.raw() != raw {
            return Err(TensilError::NativeCallFailure(
                "in-place negation returned a different handle".to_string(),
            ));
        }
        Ok(self.clone())
    }

    fn unary(&self, kind: UnaryKind) -> Result<Tensor> {
        let entry = kind.entry(self.engine().sym());
        self.call(|h| unsafe { entry(h) })
    }

    /// Boolean scalar: every element is non-zero.
    pub fn all(&self) -> Result<Tensor> {
        self.unary(UnaryKind::All)
    }

    pub fn any(&self) -> Result<Tensor> {
        self.unary(UnaryKind::Any)
    }

    /// Boolean scalar: no element is non-zero.
    pub fn none(&self) -> Result<Tensor> {
        self.unary(UnaryKind::NoneOf)
    }

    pub fn abs(&self) -> Result<Tensor> {
        self.unary(UnaryKind::Abs)
    }

    pub fn sqrt(&self) -> Result<Tensor> {
        self.unary(UnaryKind::Sqrt)
    }

    pub fn floor(&self) -> Result<Tensor> {
        self.unary(UnaryKind::Floor)
    }

    pub fn ceil(&self) -> Result<Tensor> {
        self.unary(UnaryKind::Ceil)
    }

    /// Rounds half to even.
    pub fn round(&self) -> Result<Tensor> {
        self.unary(UnaryKind::Round)
    }

    pub fn trunc(&self) -> Result<Tensor> {
        self.unary(UnaryKind::Trunc)
    }

    pub fn exp(&self) -> Result<Tensor> {
        self.unary(UnaryKind::Exp)
    }

    pub fn log(&self) -> Result<Tensor> {
        self.unary(UnaryKind::Log)
    }

    pub fn log10(&self) -> Result<Tensor> {
        self.unary(UnaryKind::Log10)
    }

    pub fn log2(&self) -> Result<Tensor> {
        self.unary(UnaryKind::Log2)
    }

    pub fn sin(&self) -> Result<Tensor> {
        self.unary(UnaryKind::Sin)
    }

    pub fn cos(&self) -> Result<Tensor> {
        self.unary(UnaryKind::Cos)
    }

    pub fn tan(&self) -> Result<Tensor> {
        self.unary(UnaryKind::Tan)
    }

    pub fn asin(&self) -> Result<Tensor> {
        self.unary(UnaryKind::Asin)
    }

    pub fn acos(&self) -> Result<Tensor> {
        self.unary(UnaryKind::Acos)
    }

    pub fn atan(&self) -> Result<Tensor> {
        self.unary(UnaryKind::Atan)
    }

    pub fn sinh(&self) -> Result<Tensor> {
        self.unary(UnaryKind::Sinh)
    }

    pub fn cosh(&self) -> Result<Tensor> {
        self.unary(UnaryKind::Cosh)
    }

    pub fn tanh(&self) -> Result<Tensor> {
        self.unary(UnaryKind::Tanh)
    }

    // Shape

    /// Splits `axis` into `sections` equal parts.
    pub fn split_sections(&self, sections: i64, axis: i64) -> Result<Vec<Tensor>> {
        let raw = self.raw_handle()?;
        let slice = unsafe { (self.engine().sym().split_sections)(raw, sections, axis) };
        let parts = self.engine().take_i64s(slice)?;
        self.derive_all(parts)
    }

    /// Splits `axis` before each of `indices`, giving `indices.len() + 1` parts.
    pub fn split_indices(&self, indices: &[i64], axis: i64) -> Result<Vec<Tensor>> {
        let raw = self.raw_handle()?;
        let slice = unsafe {
            (self.engine().sym().split_indices)(raw, indices.as_ptr(), indices.len(), axis)
        };
        let parts = self.engine().take_i64s(slice)?;
        self.derive_all(parts)
    }

    /// One dimension may be `-1` and is inferred.
    pub fn reshape(&self, shape: impl Into<Shape>) -> Result<Tensor> {
        let shape = shape.into();
        let dims = shape.dims();
        let reshape = self.engine().sym().reshape;
        self.call(|h| unsafe { reshape(h, dims.as_ptr(), dims.len()) })
    }

    pub fn expand_dims(&self, axis: i64) -> Result<Tensor> {
        let unsqueeze = self.engine().sym().unsqueeze;
        self.call(|h| unsafe { unsqueeze(h, axis) })
    }

    /// Drops every size-1 axis.
    pub fn squeeze(&self) -> Result<Tensor> {
        let squeeze = self.engine().sym().squeeze;
        self.call(|h| unsafe { squeeze(h) })
    }

    pub fn squeeze_axis(&self, axis: i64) -> Result<Tensor> {
        let squeeze = self.engine().sym().squeeze_dim;
        self.call(|h| unsafe { squeeze(h, axis) })
    }

    pub fn swap_axes(&self, axis1: i64, axis2: i64) -> Result<Tensor> {
        let transpose = self.engine().sym().transpose;
        self.call(|h| unsafe { transpose(h, axis1, axis2) })
    }

    /// Reverses the axis order.
    pub fn transpose(&self) -> Result<Tensor> {
        let rank = self.rank()? as i64;
        let dims: Vec<i64> = (0..rank).rev().collect();
        self.permute(&dims)
    }

    pub fn permute(&self, dims: &[i64]) -> Result<Tensor> {
        let permute = self.engine().sym().permute;
        self.call(|h| unsafe { permute(h, dims.as_ptr(), dims.len()) })
    }

    // Sorting and reductions

    /// Indices that sort `axis`. Only ascending order is available.
    pub fn arg_sort(&self, axis: i64, ascending: bool) -> Result<Tensor> {
        if !ascending {
            return Err(TensilError::unsupported("Only support ascending!"));
        }
        let argsort = self.engine().sym().argsort;
        self.call(|h| unsafe { argsort(h, axis) })
    }

    /// Sorts the last axis.
    pub fn sort(&self) -> Result<Tensor> {
        self.sort_axis(-1)
    }

    pub fn sort_axis(&self, axis: i64) -> Result<Tensor> {
        let sort = self.engine().sym().sort;
        self.call(|h| unsafe { sort(h, axis) })
    }

    pub fn softmax(&self, axis: i64) -> Result<Tensor> {
        let softmax = self.engine().sym().softmax;
        self.call(|h| unsafe { softmax(h, axis) })
    }

    /// Only a temperature of exactly `1.0` is supported.
    pub fn softmax_with_temperature(&self, axis: i64, temperature: f32) -> Result<Tensor> {
        if temperature != 1.0 {
            return Err(TensilError::unsupported(format!(
                "softmax with temperature {temperature} is not supported"
            )));
        }
        self.softmax(axis)
    }

    /// Flat index of the largest element, as an `Int64` scalar.
    pub fn arg_max(&self) -> Result<Tensor> {
        let argmax = self.engine().sym().argmax;
        self.call(|h| unsafe { argmax(h) })
    }

    pub fn arg_max_axis(&self, axis: i64) -> Result<Tensor> {
        let argmax = self.engine().sym().argmax_dim;
        self.call(|h| unsafe { argmax(h, axis) })
    }

    pub fn arg_min(&self) -> Result<Tensor> {
        let argmin = self.engine().sym().argmin;
        self.call(|h| unsafe { argmin(h) })
    }

    pub fn arg_min_axis(&self, axis: i64) -> Result<Tensor> {
        let argmin = self.engine().sym().argmin_dim;
        self.call(|h| unsafe { argmin(h, axis) })
    }

    // Image helpers

    /// `(x - mean[c]) / std[c]` over the channel axis of a CHW or NCHW tensor.
    pub fn normalize(&self, mean: &[f64], std: &[f64]) -> Result<Tensor> {
        if mean.len() != std.len() {
            return Err(TensilError::invalid(format!(
                "normalize got {} means and {} stds",
                mean.len(),
                std.len()
            )));
        }
        let normalize = self.engine().sym().normalize;
        self.call(|h| unsafe { normalize(h, mean.as_ptr(), std.as_ptr(), mean.len()) })
    }

    /// Bilinear resize of an HWC or NHWC image.
    pub fn resize(&self, height: i64, width: i64, align_corners: bool) -> Result<Tensor> {
        let resize = self.engine().sym().resize;
        self.call(|h| unsafe { resize(h, height, width, align_corners as c_int) })
    }

    /// HWC image in `[0, 255]` to a CHW `Float32` tensor in `[0, 1]`.
    pub fn to_chw_tensor(&self) -> Result<Tensor> {
        let to_tensor = self.engine().sym().to_tensor;
        self.call(|h| unsafe { to_tensor(h) })
    }
}

macro_rules! unsupported_ops {
    ($($method:ident($($arg:ident: $ty:ty),*) -> $ret:ty => $op:ident;)*) => {
        /// Placeholders that fail with `UnsupportedOperation` without
        /// touching the native side.
        impl Tensor {
            $(
                pub fn $method(&self, $($arg: $ty),*) -> Result<$ret> {
                    $(let _ = $arg;)*
                    Err(self.unsupported(TensorOp::$op))
                }
            )*
        }
    };
}

unsupported_ops! {
    add(other: &Tensor) -> Tensor => Add;
    sub(other: &Tensor) -> Tensor => Sub;
    mul(other: &Tensor) -> Tensor => Mul;
    div(other: &Tensor) -> Tensor => Div;
    rem(other: &Tensor) -> Tensor => Rem;
    pow(other: &Tensor) -> Tensor => Pow;
    add_scalar(value: f64) -> Tensor => AddScalar;
    mul_scalar(value: f64) -> Tensor => MulScalar;
    rem_scalar(value: f64) -> Tensor => RemScalar;
    pow_scalar(value: f64) -> Tensor => PowScalar;
    addi(other: &Tensor) -> Tensor => AddInPlace;
    subi(other: &Tensor) -> Tensor => SubInPlace;
    muli(other: &Tensor) -> Tensor => MulInPlace;
    divi(other: &Tensor) -> Tensor => DivInPlace;
    remi(other: &Tensor) -> Tensor => RemInPlace;
    powi(other: &Tensor) -> Tensor => PowInPlace;
    addi_scalar(value: f64) -> Tensor => AddScalarInPlace;
    subi_scalar(value: f64) -> Tensor => SubScalarInPlace;
    muli_scalar(value: f64) -> Tensor => MulScalarInPlace;
    divi_scalar(value: f64) -> Tensor => DivScalarInPlace;
    remi_scalar(value: f64) -> Tensor => RemScalarInPlace;
    powi_scalar(value: f64) -> Tensor => PowScalarInPlace;
    maximum(other: &Tensor) -> Tensor => Maximum;
    minimum(other: &Tensor) -> Tensor => Minimum;
    square() -> Tensor => Square;
    cbrt() -> Tensor => Cbrt;
    asinh() -> Tensor => Asinh;
    acosh() -> Tensor => Acosh;
    atanh() -> Tensor => Atanh;
    to_degrees() -> Tensor => ToDegrees;
    to_radians() -> Tensor => ToRadians;
    max() -> Tensor => Max;
    max_axes(axes: &[i64], keep_dims: bool) -> Tensor => MaxAxes;
    min() -> Tensor => Min;
    min_axes(axes: &[i64], keep_dims: bool) -> Tensor => MinAxes;
    sum() -> Tensor => Sum;
    sum_axes(axes: &[i64], keep_dims: bool) -> Tensor => SumAxes;
    prod() -> Tensor => Prod;
    prod_axes(axes: &[i64], keep_dims: bool) -> Tensor => ProdAxes;
    mean() -> Tensor => Mean;
    mean_axes(axes: &[i64], keep_dims: bool) -> Tensor => MeanAxes;
    trace(offset: i64, axis1: i64, axis2: i64) -> Tensor => Trace;
    flatten() -> Tensor => Flatten;
    squeeze_axes(axes: &[i64]) -> Tensor => SqueezeAxes;
    logical_and(other: &Tensor) -> Tensor => LogicalAnd;
    logical_or(other: &Tensor) -> Tensor => LogicalOr;
    logical_xor(other: &Tensor) -> Tensor => LogicalXor;
    logical_not() -> Tensor => LogicalNot;
    log_softmax(axis: i64) -> Tensor => LogSoftmax;
    cum_sum(axis: i64) -> Tensor => CumSum;
    is_infinite() -> Tensor => IsInfinite;
    is_nan() -> Tensor => IsNan;
    tile(repeats: &[i64]) -> Tensor => Tile;
    repeat(axis: i64, repeats: i64) -> Tensor => Repeat;
    dot(other: &Tensor) -> Tensor => Dot;
    clip(min: f64, max: f64) -> Tensor => Clip;
    broadcast(shape: &Shape) -> Tensor => Broadcast;
    percentile(percentile: f64, axes: &[i64]) -> Tensor => Percentile;
    median(axes: &[i64]) -> Tensor => Median;
    to_dense() -> Tensor => ToDense;
    to_sparse(format: SparseFormat) -> Tensor => ToSparse;
    nonzero() -> Tensor => Nonzero;
    zeros_like() -> Tensor => ZerosLike;
    ones_like() -> Tensor => OnesLike;
    set(index: &Tensor, value: f64) -> () => Set;
    copy_to(target: &Tensor) -> () => CopyTo;
    boolean_mask(mask: &Tensor, axis: i64) -> Tensor => BooleanMask;
    content_equals_scalar(value: f64) -> bool => ContentEqualsScalar;
    to_matrix() -> Tensor => ToMatrix;
    gradient() -> Tensor => Gradient;
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Tensor");
        s.field("uid", &self.inner.uid);
        match self.handle() {
            Ok(handle) => s.field("handle", &handle),
            Err(_) => s.field("handle", &"released"),
        };
        if let Some(shape) = self.inner.shape.get() {
            s.field("shape", shape);
        }
        if let Some(dtype) = self.inner.dtype.get() {
            s.field("dtype", dtype);
        }
        s.finish()
    }
}
