//! # ocre-proc
//!
//! Transform trees compiled into CPU processors.
//!
//! The [`TransformBuilder`] lowers a [`Transform`] tree (matrices, curves,
//! file LUTs, looks, groups) into an op chain; a [`Processor`] finalizes
//! that chain and hands out [`CpuProcessor`] instances that apply it to
//! pixel buffers and image descriptors at any supported bit depth.
//!
//! # Usage
//!
//! ```rust
//! use ocre_proc::{Processor, Transform};
//!
//! let mut m = [0.0; 16];
//! for i in 0..4 {
//!     m[i * 4 + i] = 2.0;
//! }
//! let cpu = Processor::from_transform(&Transform::matrix(m))?.cpu()?;
//!
//! let mut pixel = [0.25_f32, 0.25, 0.25, 1.0];
//! cpu.apply_rgba(&mut pixel);
//! assert!((pixel[0] - 0.5).abs() < 1e-6);
//! # Ok::<(), ocre_proc::ProcError>(())
//! ```
//!
//! # Dependencies
//!
//! - [`ocre-ops`] - op data model, optimizer, kernels
//! - [`ocre-lut`] - file format readers behind [`transform::FileTransform`]
//! - [`ocre-core`] - image descriptors and bit depths

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;

pub mod builder;
pub mod look;
pub mod processor;
pub mod transform;

pub use builder::TransformBuilder;
pub use error::{ProcError, ProcResult};
pub use look::{Look, LookRegistry, parse_look_expression};
pub use processor::{CpuProcessor, Processor};
pub use transform::{Interpolation, Transform};
