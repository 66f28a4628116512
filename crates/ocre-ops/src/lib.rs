//! # ocre-ops
//!
//! Color operator data model, op chain optimizer, and CPU pixel kernels.
//!
//! Every operator comes in two forms: an op-data struct holding f64
//! parameters (what a file format or transform authored), and a kernel
//! holding baked f32 render constants (what actually touches pixels).
//! [`OpChain`] glues them together: ops are appended, validated, finalized
//! under a set of [`OptimizationFlags`], and dispatched through
//! [`CpuKernel`].
//!
//! # Modules
//!
//! - [`matrix`], [`range`] - affine remaps and clamps
//! - [`gamma`], [`log`], [`cdl`] - per-channel curve ops
//! - [`lut1d`], [`lut3d`] - sampled lookups, forward and inverse
//! - [`fixed_function`] - ACES and colorimetric special functions
//! - [`grading_primary`] - live primary grading with dynamic values
//! - [`chain`], [`cpu`] - the optimizer and the renderer dispatch
//!
//! # Example
//!
//! ```rust
//! use ocre_ops::matrix::MatrixOpData;
//! use ocre_ops::{Op, OpChain, OpData, OptimizationFlags};
//!
//! let mut chain = OpChain::new();
//! chain.add(Op::new(OpData::Matrix(MatrixOpData::from_scale([2.0, 2.0, 2.0, 1.0]))));
//! chain.add(Op::new(OpData::Matrix(MatrixOpData::from_scale([0.5, 0.5, 0.5, 1.0]))));
//! chain.finalize(OptimizationFlags::DEFAULT)?;
//!
//! // The pair multiplies out to the identity and disappears.
//! assert!(chain.is_empty());
//! # Ok::<(), ocre_ops::OpError>(())
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod dynamic;
mod error;
mod metadata;
mod op;

pub mod chain;
pub mod cpu;

pub mod cdl;
pub mod fixed_function;
pub mod gamma;
pub mod grading_primary;
pub mod index_map;
pub mod log;
pub mod lut1d;
pub mod lut3d;
pub mod matrix;
pub mod range;

pub use chain::{OpChain, OptimizationFlags};
pub use cpu::CpuKernel;
pub use dynamic::DynamicProperty;
pub use error::{OpError, OpResult};
pub use metadata::FormatMetadata;
pub use op::{Direction, Op, OpData};
