//! # ocre-lut
//!
//! LUT and CDL file readers yielding color op-data.
//!
//! Every reader parses one external format into a short chain of
//! `ocre_ops::OpData` values: a prelut or domain remap where the format has
//! one, then the main LUT, matrix, or CDL. The [`registry`] maps file
//! extensions to readers with declared capabilities.
//!
//! # Supported Formats
//!
//! - `.csp` - Cinespace 1D/3D with prelut ([`csp`])
//! - `.cube` - Iridas/Adobe/Resolve 1D/3D ([`cube`])
//! - `.spi1d` / `.spi3d` - Sony Pictures Imageworks ([`spi`])
//! - `.spimtx` - Sony Pictures Imageworks matrix ([`spi_mtx`])
//! - `.cc` / `.ccc` / `.cdl` - ASC CDL XML ([`cdl_xml`])
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! let ops = ocre_lut::registry().read_file(Path::new("grade.cube"))?;
//! # Ok::<(), ocre_lut::LutError>(())
//! ```
//!
//! # Dependencies
//!
//! - [`ocre-ops`] - op-data model the readers produce
//! - [`quick-xml`] - ASC CDL XML parsing

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;

pub mod cdl_xml;
pub mod csp;
pub mod cube;
pub mod registry;
pub mod spi;
pub mod spi_mtx;

pub use cdl_xml::{read_cc, read_cdl_collection};
pub use csp::{parse_csp, read_csp};
pub use cube::{parse_cube, read_cube};
pub use error::{LutError, LutResult};
pub use registry::{registry, FileFormat, FormatCapabilities, FormatRegistry};
pub use spi::{read_spi1d, read_spi3d};
pub use spi_mtx::read_spimtx;
