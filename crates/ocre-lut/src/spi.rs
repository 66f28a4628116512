//! Sony Pictures Imageworks LUT formats (spi1d, spi3d).
//!
//! Reference: OCIO FileFormatSpi1D.cpp, FileFormatSpi3D.cpp
//!
//! spi1d:
//!
//! ```text
//! Version 1
//! From 0.0 1.0
//! Length 1024
//! Components 3
//! {
//!   0.000000 0.000000 0.000000
//!   ...
//! }
//! ```
//!
//! A `From` domain other than [0, 1] reads to a leading no-clamp Range
//! remapping it. spi3d lines carry explicit grid indices:
//!
//! ```text
//! SPILUT 1.0
//! 3 3
//! 32 32 32
//! 0 0 0 0.000000 0.000000 0.000000
//! ...
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ocre_ops::lut1d::Lut1dOpData;
use ocre_ops::lut3d::Lut3dOpData;
use ocre_ops::range::{RangeOpData, RangeStyle};
use ocre_ops::OpData;
use tracing::debug;

use crate::{LutError, LutResult};

/// Reads an spi1d file into an op-data chain.
pub fn read_spi1d(path: &Path) -> LutResult<Vec<OpData>> {
    let file = File::open(path)?;
    parse_spi1d(BufReader::new(file), &path.display().to_string())
}

/// Parses spi1d text. `name` labels the source in error messages.
pub fn parse_spi1d<R: BufRead>(reader: R, name: &str) -> LutResult<Vec<OpData>> {
    let mut from = (0.0_f64, 1.0_f64);
    let mut length = 0usize;
    let mut components = 1usize;
    let mut in_data = false;
    let mut table: Vec<f32> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line == "{" {
            in_data = true;
            continue;
        }
        if line == "}" {
            in_data = false;
            continue;
        }

        if in_data {
            let row: Vec<f32> = line
                .split_whitespace()
                .map(|t| {
                    t.parse()
                        .map_err(|_| LutError::parse(name, format!("invalid LUT value '{t}'")))
                })
                .collect::<LutResult<_>>()?;
            match (components, row.len()) {
                (1, 1) => {
                    table.extend([row[0]; 3]);
                }
                (3, 3) => table.extend(&row),
                (c, got) => {
                    return Err(LutError::parse(
                        name,
                        format!("expected {c} components per entry, got {got}"),
                    ));
                }
            }
            continue;
        }

        let mut parts = line.split_whitespace();
        match parts.next().map(str::to_ascii_lowercase).as_deref() {
            Some("version") => {}
            Some("from") => {
                let lo = parse_float(parts.next(), name, "From")?;
                let hi = parse_float(parts.next(), name, "From")?;
                from = (lo, hi);
            }
            Some("length") => {
                length = parse_float(parts.next(), name, "Length")? as usize;
            }
            Some("components") => {
                components = parse_float(parts.next(), name, "Components")? as usize;
                if components != 1 && components != 3 {
                    return Err(LutError::parse(
                        name,
                        format!("unsupported component count {components}"),
                    ));
                }
            }
            _ => {
                return Err(LutError::parse(name, format!("unrecognized header line '{line}'")));
            }
        }
    }

    let size = table.len() / 3;
    if size == 0 {
        return Err(LutError::parse(name, "no LUT data found"));
    }
    if length != 0 && length != size {
        return Err(LutError::parse(
            name,
            format!("Length {length} does not match {size} data rows"),
        ));
    }

    let mut ops = Vec::new();
    if from != (0.0, 1.0) {
        if !(from.0 < from.1) {
            return Err(LutError::parse(
                name,
                format!("degenerate From range [{}, {}]", from.0, from.1),
            ));
        }
        let mut range = RangeOpData::new(from.0, from.1, 0.0, 1.0);
        range.style = RangeStyle::NoClamp;
        ops.push(OpData::Range(range));
    }
    let data = Lut1dOpData::from_interleaved(table, size);
    data.validate()?;
    ops.push(OpData::Lut1d(data));

    debug!(name, size, components, "parsed spi1d file");
    Ok(ops)
}

/// Reads an spi3d file into an op-data chain.
pub fn read_spi3d(path: &Path) -> LutResult<Vec<OpData>> {
    let file = File::open(path)?;
    parse_spi3d(BufReader::new(file), &path.display().to_string())
}

/// Parses spi3d text. `name` labels the source in error messages.
pub fn parse_spi3d<R: BufRead>(reader: R, name: &str) -> LutResult<Vec<OpData>> {
    let mut lines = reader.lines();

    let magic = next_content(&mut lines, name)?;
    if !magic.to_uppercase().starts_with("SPILUT") {
        return Err(LutError::parse(name, format!("invalid spi3d header '{magic}'")));
    }
    // Component counts line, always "3 3".
    let _ = next_content(&mut lines, name)?;

    let dims_line = next_content(&mut lines, name)?;
    let dims: Vec<usize> = dims_line
        .split_whitespace()
        .filter_map(|t| t.parse().ok())
        .collect();
    if dims.len() != 3 {
        return Err(LutError::parse(name, format!("invalid dimensions '{dims_line}'")));
    }
    if dims[0] != dims[1] || dims[1] != dims[2] {
        return Err(LutError::parse(
            name,
            format!("non-cubic 3D LUT ({}x{}x{}) is not supported", dims[0], dims[1], dims[2]),
        ));
    }
    let size = dims[0];

    let mut table = vec![0.0_f32; size * size * size * 3];
    let mut seen = vec![false; size * size * size];
    for line in lines {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 6 {
            return Err(LutError::parse(
                name,
                format!("expected 'r g b R G B' data line, got '{line}'"),
            ));
        }
        let idx: Vec<usize> = parts[..3]
            .iter()
            .map(|t| {
                t.parse()
                    .map_err(|_| LutError::parse(name, format!("invalid grid index '{t}'")))
            })
            .collect::<LutResult<_>>()?;
        if idx.iter().any(|&i| i >= size) {
            return Err(LutError::parse(
                name,
                format!("grid index out of bounds on line '{line}'"),
            ));
        }
        let cell = (idx[0] * size + idx[1]) * size + idx[2];
        seen[cell] = true;
        for c in 0..3 {
            table[cell * 3 + c] = parts[3 + c]
                .parse()
                .map_err(|_| LutError::parse(name, format!("invalid LUT value '{}'", parts[3 + c])))?;
        }
    }
    if let Some(missing) = seen.iter().position(|&s| !s) {
        return Err(LutError::parse(
            name,
            format!("missing grid entry at linear index {missing}"),
        ));
    }

    let data = Lut3dOpData::from_table(table, size);
    data.validate()?;
    debug!(name, size, "parsed spi3d file");
    Ok(vec![OpData::Lut3d(data)])
}

fn next_content(
    lines: &mut std::io::Lines<impl BufRead>,
    name: &str,
) -> LutResult<String> {
    for line in lines {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() && !line.starts_with('#') {
            return Ok(line.to_string());
        }
    }
    Err(LutError::parse(name, "unexpected end of file"))
}

fn parse_float(tok: Option<&str>, name: &str, what: &str) -> LutResult<f64> {
    tok.and_then(|t| t.parse().ok())
        .ok_or_else(|| LutError::parse(name, format!("invalid {what} value")))
}
