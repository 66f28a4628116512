//! Iridas/Adobe/Resolve `.cube` LUT format reader.
//!
//! Reference: OCIO FileFormatIridasCube.cpp
//!
//! Header keywords: `TITLE`, `LUT_1D_SIZE`, `LUT_3D_SIZE`, `DOMAIN_MIN`,
//! `DOMAIN_MAX`. Data lines are three floats; 3D tables store red fastest.
//! A non-unit domain reads to a leading matrix op remapping the domain to
//! [0, 1] per channel.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ocre_ops::lut1d::Lut1dOpData;
use ocre_ops::lut3d::Lut3dOpData;
use ocre_ops::matrix::MatrixOpData;
use ocre_ops::OpData;
use tracing::debug;

use crate::{LutError, LutResult};

/// Reads a `.cube` file into an op-data chain.
pub fn read_cube(path: &Path) -> LutResult<Vec<OpData>> {
    let file = File::open(path)?;
    parse_cube(BufReader::new(file), &path.display().to_string())
}

/// Parses `.cube` text. `name` labels the source in error messages.
pub fn parse_cube<R: BufRead>(reader: R, name: &str) -> LutResult<Vec<OpData>> {
    let mut size_1d: Option<usize> = None;
    let mut size_3d: Option<usize> = None;
    let mut title: Option<String> = None;
    let mut domain_min = [0.0_f64; 3];
    let mut domain_max = [1.0_f64; 3];
    let mut values: Vec<f32> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let Some(key) = parts.next() else { continue };
        match key {
            "TITLE" => {
                title = Some(line["TITLE".len()..].trim().trim_matches('"').to_string());
            }
            "LUT_1D_SIZE" => size_1d = Some(parse_token(parts.next(), name, "LUT_1D_SIZE")?),
            "LUT_3D_SIZE" => size_3d = Some(parse_token(parts.next(), name, "LUT_3D_SIZE")?),
            "DOMAIN_MIN" => domain_min = parse_triple(line, name, "DOMAIN_MIN")?,
            "DOMAIN_MAX" => domain_max = parse_triple(line, name, "DOMAIN_MAX")?,
            _ => {
                // A data row.
                for tok in line.split_whitespace() {
                    let v: f32 = tok.parse().map_err(|_| {
                        LutError::parse(name, format!("invalid LUT value '{tok}'"))
                    })?;
                    values.push(v);
                }
            }
        }
    }

    let mut ops = Vec::new();
    if let Some(op) = domain_op(&domain_min, &domain_max, name)? {
        ops.push(op);
    }

    let mut lut = match (size_1d, size_3d) {
        (Some(_), Some(_)) => {
            return Err(LutError::parse(name, "both LUT_1D_SIZE and LUT_3D_SIZE present"));
        }
        (None, None) => {
            return Err(LutError::parse(name, "missing LUT_1D_SIZE or LUT_3D_SIZE"));
        }
        (Some(size), None) => {
            if values.len() != size * 3 {
                return Err(LutError::parse(
                    name,
                    format!("expected {} values for 1D size {size}, got {}", size * 3, values.len()),
                ));
            }
            let data = Lut1dOpData::from_interleaved(values, size);
            data.validate()?;
            OpData::Lut1d(data)
        }
        (None, Some(size)) => {
            if values.len() != size * size * size * 3 {
                return Err(LutError::parse(
                    name,
                    format!(
                        "expected {} values for 3D size {size}, got {}",
                        size * size * size * 3,
                        values.len()
                    ),
                ));
            }
            // Red fastest in the file; storage is blue fastest.
            let mut table = vec![0.0_f32; values.len()];
            let mut i = 0;
            for b in 0..size {
                for g in 0..size {
                    for r in 0..size {
                        let at = ((r * size + g) * size + b) * 3;
                        table[at..at + 3].copy_from_slice(&values[i..i + 3]);
                        i += 3;
                    }
                }
            }
            let data = Lut3dOpData::from_table(table, size);
            data.validate()?;
            OpData::Lut3d(data)
        }
    };

    if let Some(title) = title {
        match &mut lut {
            OpData::Lut1d(d) => d.metadata.add_child("Description", title),
            OpData::Lut3d(d) => d.metadata.add_child("Description", title),
            _ => {}
        }
    }
    ops.push(lut);

    debug!(name, ops = ops.len(), "parsed cube file");
    Ok(ops)
}

/// The per-channel affine remap from [min, max] to [0, 1], or None when the
/// domain is already the unit cube.
fn domain_op(min: &[f64; 3], max: &[f64; 3], name: &str) -> LutResult<Option<OpData>> {
    if *min == [0.0; 3] && *max == [1.0; 3] {
        return Ok(None);
    }
    let mut scale = [1.0_f64; 4];
    let mut offset = [0.0_f64; 4];
    for c in 0..3 {
        let span = max[c] - min[c];
        if !(span > 0.0) {
            return Err(LutError::parse(
                name,
                format!("degenerate domain [{}, {}] on channel {c}", min[c], max[c]),
            ));
        }
        scale[c] = 1.0 / span;
        offset[c] = -min[c] / span;
    }
    let mut m = MatrixOpData::from_scale(scale);
    m.offset = offset;
    Ok(Some(OpData::Matrix(m)))
}

fn parse_token<T: std::str::FromStr>(tok: Option<&str>, name: &str, what: &str) -> LutResult<T> {
    tok.and_then(|t| t.parse().ok())
        .ok_or_else(|| LutError::parse(name, format!("invalid {what}")))
}

fn parse_triple(line: &str, name: &str, what: &str) -> LutResult<[f64; 3]> {
    let vals: Vec<f64> = line
        .split_whitespace()
        .skip(1)
        .filter_map(|t| t.parse().ok())
        .collect();
    if vals.len() != 3 {
        return Err(LutError::parse(name, format!("{what} needs 3 values")));
    }
    Ok([vals[0], vals[1], vals[2]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_a_small_3d_cube() {
        let text = "# comment\n\
TITLE \"unit\"\n\
LUT_3D_SIZE 2\n\
0.0 0.0 0.0\n\
1.0 0.0 0.0\n\
0.0 1.0 0.0\n\
1.0 1.0 0.0\n\
0.0 0.0 1.0\n\
1.0 0.0 1.0\n\
0.0 1.0 1.0\n\
1.0 1.0 1.0\n";
        let ops = parse_cube(Cursor::new(text), "unit.cube").unwrap();
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            OpData::Lut3d(l) => {
                assert_eq!(l.size, 2);
                assert_eq!(l.metadata.children[0].id, "unit");
                // Second file row (r=1, g=0, b=0) lands at the red corner.
                let at = ((1 * 2 + 0) * 2 + 0) * 3;
                assert_eq!(&l.table[at..at + 3], &[1.0, 0.0, 0.0]);
            }
            other => panic!("expected 3D LUT, got {}", other.kind()),
        }
    }

    #[test]
    fn non_unit_domain_adds_matrix() {
        let text = "LUT_1D_SIZE 2\n\
DOMAIN_MIN -1.0 -1.0 -1.0\n\
DOMAIN_MAX 1.0 1.0 1.0\n\
0.0 0.0 0.0\n\
1.0 1.0 1.0\n";
        let ops = parse_cube(Cursor::new(text), "dom.cube").unwrap();
        assert_eq!(ops.len(), 2);
        match &ops[0] {
            OpData::Matrix(m) => {
                assert!((m.matrix.at(0, 0) - 0.5).abs() < 1e-12);
                assert!((m.offset[0] - 0.5).abs() < 1e-12);
            }
            other => panic!("expected matrix, got {}", other.kind()),
        }
    }

    #[test]
    fn missing_size_is_an_error() {
        let err = parse_cube(Cursor::new("0.0 0.0 0.0\n"), "nosize.cube").unwrap_err();
        assert!(err.to_string().contains("nosize.cube"));
    }

    #[test]
    fn wrong_value_count_is_an_error() {
        let text = "LUT_1D_SIZE 3\n0.0 0.0 0.0\n1.0 1.0 1.0\n";
        assert!(parse_cube(Cursor::new(text), "short.cube").is_err());
    }
}
