//! # gridtensor
//!
//! Strided multi-dimensional tensors over shared, typed storage, built as
//! the numeric substrate for scripting hosts (observation and action
//! buffers of simulated environments).
//!
//! ## Features
//!
//! - **Typed, shared storage**: seven numeric element types behind one
//!   [`Element`] trait; owned buffers are reference-counted, borrowed
//!   buffers are revoked the moment their [`ExternalBuffer`] owner drops
//! - **Zero-copy views**: transpose/select/narrow/reverse/reshape rewrite
//!   shape and strides only; any number of views alias one buffer
//! - **Layout-blind operations**: arithmetic, reductions, matrix product,
//!   and shuffle run identically over contiguous and strided views
//! - **faer fast path**: f32/f64 matrix products route through [faer](https://github.com/sarah-ek/faer-rs)
//! - **Dynamic handle**: [`ElementTensor`] carries the full surface where
//!   the element type is run-time data rather than a type parameter
//!
//! ## Quick Start
//!
//! ```rust
//! use gridtensor::Tensor;
//!
//! // A 2x3 range, mutated through a zero-copy view.
//! let t = Tensor::<f64>::from_range(1.0, 6.0, 1.0)?.reshape(&[2, 3])?;
//! t.select(1, 2)?.fill(0.0)?; // zero the second row
//! assert_eq!(t.to_vec()?, vec![1.0, 2.0, 3.0, 0.0, 0.0, 0.0]);
//!
//! // Reductions and matrix products allocate fresh storage.
//! assert_eq!(t.sum()?, 6.0);
//! let m = t.mmul(&t.transpose(1, 2)?)?;
//! assert_eq!(m.shape(), &[2, 2]);
//! # Ok::<(), gridtensor::TensorError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Tensor<T> / ElementTensor                │
//! │   construction · element access · views · operations       │
//! └─────────────────────────────────────────────────────────────┘
//!                │ descriptor only              │ shared elements
//!                ▼                              ▼
//! ┌───────────────────────────┐  ┌─────────────────────────────┐
//! │          Layout           │  │         Storage<T>          │
//! │   shape, signed strides,  │  │   Owned: Arc<RwLock<Vec>>   │
//! │   offset, Positions iter  │  │   Borrowed: Weak, revocable │
//! └───────────────────────────┘  └─────────────────────────────┘
//! ```

pub mod dynamic;
pub mod element;
pub mod error;
pub mod layout;
pub mod storage;
pub mod tensor;
pub mod value;

// Re-exports
pub use dynamic::{ElementTensor, FileSpec, RangeSpec};
pub use element::{Element, ElementType};
pub use error::{Result, TensorError};
pub use layout::{Layout, Positions};
pub use storage::{ExternalBuffer, Storage};
pub use tensor::Tensor;
pub use value::Nested;
