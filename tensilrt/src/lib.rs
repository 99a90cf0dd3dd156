//! Managed side of the Tensil bridge.
//!
//! Native tensors live in `tensil_native`'s handle tables. This crate wraps
//! every returned handle in a [`Tensor`] owned by a [`TensorManager`], routes
//! operations through the flat C ABI and guarantees each handle is released
//! exactly once.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod handle;
pub mod manager;
pub mod module;
pub mod resource;
mod sys;
pub mod tensor;
pub mod types;
pub mod view;

pub use catalog::{CompareKind, NativeOp, OpSupport, TensorOp, UnaryKind};
pub use config::TensilConfig;
pub use engine::Engine;
pub use error::{Result, TensilError};
pub use handle::Handle;
pub use manager::TensorManager;
pub use module::Module;
pub use resource::{NativeResource, ResourceId};
pub use sys::TENSIL_ABI_VERSION;
pub use tensor::Tensor;
pub use types::{ByteOrder, DataType, Device, DeviceKind, Element, Shape, SparseFormat};
pub use view::ByteView;
