//! # ocre-core
//!
//! Core types shared by the OCRE color-management crates.
//!
//! This crate provides the vocabulary the rest of the workspace is written in:
//!
//! - [`BitDepth`] - sample bit depths with their numerical scale semantics
//! - [`ImageDesc`] - a packed image descriptor over a caller-owned buffer
//! - Rec.709 luma constants used by saturation and hue math
//! - [`CoreError`] - shared error type
//!
//! # Usage
//!
//! ```rust
//! use ocre_core::{BitDepth, ImageDesc};
//!
//! let mut pixels = vec![0.0_f32; 16 * 4];
//! let desc = ImageDesc::packed_f32(&mut pixels, 4, 4).unwrap();
//! assert_eq!(desc.num_pixels(), 16);
//! assert_eq!(desc.bit_depth(), BitDepth::F32);
//! ```
//!
//! # Used By
//!
//! - `ocre-math` - numeric utilities
//! - `ocre-ops` - op data model and CPU kernels
//! - `ocre-proc` - processor surface

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod depth;
mod error;
pub mod image;
pub mod pixel;

pub use depth::BitDepth;
pub use error::{CoreError, CoreResult};
pub use image::{AUTO_STRIDE, ImageData, ImageDesc};
pub use pixel::{REC709_LUMA, REC709_LUMA_B, REC709_LUMA_G, REC709_LUMA_R, luma_rec709};
