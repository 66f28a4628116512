//! # ocre-math
//!
//! Numeric utilities for OCRE color processing.
//!
//! - [`Mat4d`] - double-precision row-major 4x4 matrices with offsets,
//!   composition and Gauss-Jordan inversion
//! - [`ulp`] - ULP-aware float comparison and half-float bit helpers
//! - [`simd`] - `wide`-based batch helpers used by the CPU kernels
//!
//! # Design
//!
//! Matrix storage is **row-major** with column vectors:
//!
//! ```text
//! result = matrix * vector + offset
//! ```
//!
//! Double precision is used for op parameters and composition; kernels narrow
//! to f32 at dispatch time.
//!
//! # Dependencies
//!
//! - [`wide`] - SIMD math
//! - [`half`] - half-float conversion

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod mat4;
pub mod simd;
pub mod ulp;

pub use mat4::Mat4d;
pub use ulp::{f32_to_half_bits, half_bits_to_f32, ulp_distance, within_ulps};
