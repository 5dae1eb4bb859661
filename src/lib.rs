//! Flat, typed arrays that can grow past what an ordinary `Vec` comfortably
//! holds.
//!
//! An array is created with a length and an [`ElementKind`]. Arrays up to
//! [`max_managed_len`] elements keep their data in a `Vec`; longer arrays take
//! their memory straight from the system allocator and give it back when they
//! are dropped. Either way the array is addressed with 64-bit indices through
//! checked accessors, or through `unsafe` unchecked ones.
//!
//! On top of the arrays sit an elementwise arithmetic engine ([`arith`]),
//! conversions and bulk copies ([`convert`]) and summary statistics
//! ([`stats`]). Long operations are split across a worker pool according to
//! the settings of a [`Context`].
//!
//! ```
//! use larray::{arith, ElementKind, LargeArray, Scalar};
//!
//! let a = LargeArray::constant(ElementKind::Int, 1000, &Scalar::Int(4)).unwrap();
//! let b = LargeArray::constant(ElementKind::Int, 1000, &Scalar::Int(7)).unwrap();
//! let sum = arith::add(&a, &b, None).unwrap();
//! assert!(sum.is_constant());
//! assert_eq!(sum.get_i32(0).unwrap(), 11);
//! ```
#![warn(missing_docs, missing_debug_implementations)]

#[macro_use]
mod array;

mod alloc;
pub mod arith;
mod complex;
mod complex_array;
mod context;
pub mod convert;
mod dispatch;
mod element;
mod error;
mod kind;
pub mod stats;
mod typed;
mod varlen;

pub use alloc::{allocated_native_bytes, select_storage, AllocError, NativeMemory, StorageMode};
pub use arith::{BinaryOp, LogicOp, UnaryOp};
pub use array::{ArrayElement, ComplexElement, LargeArray, Scalar};
pub use complex::{Complex, Complex32, Complex64, ComplexMath};
pub use complex_array::ComplexArray;
pub use context::{
    concurrency_threshold, max_managed_len, set_concurrency_threshold, set_max_managed_len,
    set_thread_count, set_thread_pool, shutdown_thread_pool, thread_count, thread_pool, Context,
    DEFAULT_CONCURRENCY_THRESHOLD, DEFAULT_MAX_MANAGED_LEN,
};
pub use dispatch::{TaskError, TaskHandle};
pub use element::{cast, Element, Real};
pub use error::{LargeArrayError, Result};
pub use kind::ElementKind;
pub use typed::{TypedArray, LARGEST_SUBARRAY};
pub use varlen::{ObjectArray, StringArray, VarArray, VarElement, DEFAULT_MAX_BYTES};

#[cfg(test)]
#[global_allocator]
static ALLOCATOR: mockalloc::Mockalloc<std::alloc::System> = mockalloc::Mockalloc(std::alloc::System);
