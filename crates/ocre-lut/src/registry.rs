//! Extension-indexed file format registry.
//!
//! Reference: OCIO FormatRegistry (FileFormat registration)
//!
//! Process-wide, built on first use, read-only afterwards. Each entry maps
//! an extension to a reader and declares its capabilities.

use std::path::Path;
use std::sync::OnceLock;

use ocre_ops::OpData;
use tracing::debug;

use crate::{cdl_xml, csp, cube, spi, spi_mtx, LutError, LutResult};

/// What a format implementation can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatCapabilities(u8);

impl FormatCapabilities {
    /// Files of this format can be read into op-data.
    pub const READ: Self = Self(1);
    /// A finalized chain can be baked back out to this format.
    pub const BAKE: Self = Self(1 << 1);

    /// True when every capability in `other` is present.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for FormatCapabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

type ReadFn = fn(&Path) -> LutResult<Vec<OpData>>;

/// One registered file format.
pub struct FileFormat {
    /// Human-readable format name.
    pub name: &'static str,
    /// Extensions claimed, lowercase without the dot.
    pub extensions: &'static [&'static str],
    /// Declared capabilities.
    pub capabilities: FormatCapabilities,
    read: ReadFn,
}

impl FileFormat {
    /// Reads `path` into an op-data chain.
    pub fn read(&self, path: &Path) -> LutResult<Vec<OpData>> {
        (self.read)(path)
    }
}

impl std::fmt::Debug for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileFormat")
            .field("name", &self.name)
            .field("extensions", &self.extensions)
            .finish()
    }
}

fn read_ccc_first(path: &Path) -> LutResult<Vec<OpData>> {
    cdl_xml::read_cdl_collection(path, None)
}

static FORMATS: &[FileFormat] = &[
    FileFormat {
        name: "cinespace",
        extensions: &["csp"],
        capabilities: FormatCapabilities(FormatCapabilities::READ.0 | FormatCapabilities::BAKE.0),
        read: csp::read_csp,
    },
    FileFormat {
        name: "resolve_cube",
        extensions: &["cube"],
        capabilities: FormatCapabilities(FormatCapabilities::READ.0 | FormatCapabilities::BAKE.0),
        read: cube::read_cube,
    },
    FileFormat {
        name: "spi1d",
        extensions: &["spi1d"],
        capabilities: FormatCapabilities::READ,
        read: spi::read_spi1d,
    },
    FileFormat {
        name: "spi3d",
        extensions: &["spi3d"],
        capabilities: FormatCapabilities::READ,
        read: spi::read_spi3d,
    },
    FileFormat {
        name: "spimtx",
        extensions: &["spimtx"],
        capabilities: FormatCapabilities::READ,
        read: spi_mtx::read_spimtx,
    },
    FileFormat {
        name: "cdl_asc",
        extensions: &["cc", "ccc", "cdl"],
        capabilities: FormatCapabilities::READ,
        read: read_ccc_first,
    },
];

/// The registry: extension -> format, built once.
pub struct FormatRegistry {
    by_extension: Vec<(&'static str, &'static FileFormat)>,
}

impl FormatRegistry {
    fn build() -> Self {
        let mut by_extension = Vec::new();
        for format in FORMATS {
            for &ext in format.extensions {
                by_extension.push((ext, format));
            }
        }
        debug!(formats = FORMATS.len(), "format registry built");
        Self { by_extension }
    }

    /// The format claiming `extension` (lowercase, no dot), if any.
    pub fn by_extension(&self, extension: &str) -> Option<&'static FileFormat> {
        let ext = extension.to_ascii_lowercase();
        self.by_extension
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, f)| *f)
    }

    /// Reads `path` with the format matching its extension.
    pub fn read_file(&self, path: &Path) -> LutResult<Vec<OpData>> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let format = self
            .by_extension(&ext)
            .ok_or_else(|| LutError::UnknownExtension(ext.clone()))?;
        debug!(path = %path.display(), format = format.name, "reading LUT file");
        format.read(path)
    }

    /// All registered formats.
    pub fn formats(&self) -> impl Iterator<Item = &'static FileFormat> + '_ {
        FORMATS.iter()
    }
}

/// The process-wide registry.
pub fn registry() -> &'static FormatRegistry {
    static REGISTRY: OnceLock<FormatRegistry> = OnceLock::new();
    REGISTRY.get_or_init(FormatRegistry::build)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn known_extensions_resolve() {
        let reg = registry();
        for ext in ["csp", "cube", "spi1d", "spi3d", "spimtx", "cc", "ccc", "cdl"] {
            assert!(reg.by_extension(ext).is_some(), "missing reader for {ext}");
        }
        assert!(reg.by_extension("exr").is_none());
    }

    #[test]
    fn extension_lookup_is_case_insensitive() {
        assert!(registry().by_extension("CUBE").is_some());
    }

    #[test]
    fn bake_capability_is_per_format() {
        let reg = registry();
        let csp = reg.by_extension("csp").unwrap();
        assert!(csp.capabilities.contains(FormatCapabilities::BAKE));
        let spi = reg.by_extension("spi1d").unwrap();
        assert!(!spi.capabilities.contains(FormatCapabilities::BAKE));
    }

    #[test]
    fn read_file_dispatches_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.spimtx");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "1.0 0.0 0.0 0.0").unwrap();
        writeln!(f, "0.0 1.0 0.0 0.0").unwrap();
        writeln!(f, "0.0 0.0 1.0 0.0").unwrap();

        let ops = registry().read_file(&path).unwrap();
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], OpData::Matrix(_)));
    }

    #[test]
    fn unknown_extension_is_an_error() {
        let err = registry()
            .read_file(Path::new("image.exr"))
            .unwrap_err();
        assert!(matches!(err, LutError::UnknownExtension(_)));
    }
}
