//! Cinespace (CSP) LUT file format reader.
//!
//! CSP is a text-based LUT format used by Rising Sun Research Cinespace.
//! A file carries an optional metadata block, a per-channel prelut (shaper),
//! and a main 1D or 3D LUT:
//!
//! ```text
//! CSPLUTV100
//! 1D or 3D
//!
//! BEGIN METADATA
//! <metadata>
//! END METADATA
//!
//! <prelut_count_r>
//! <input_samples_r>
//! <output_positions_r>
//! (same for G and B)
//!
//! <lut_size> (1D) or <size_r> <size_g> <size_b> (3D)
//! <r g b>
//! ...
//! ```
//!
//! The prelut becomes its own op ahead of the main LUT: a two-entry prelut is
//! an affine remap and reads to a Range; longer preluts are resampled into a
//! shaper 1D LUT.
//!
//! # References
//!
//! - OCIO FileFormatCSP.cpp

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ocre_ops::index_map::IndexMap;
use ocre_ops::lut1d::Lut1dOpData;
use ocre_ops::lut3d::Lut3dOpData;
use ocre_ops::range::RangeOpData;
use ocre_ops::OpData;
use tracing::debug;

use crate::{LutError, LutResult};

/// Sample count used when a piecewise prelut must be baked into a shaper LUT.
const PRELUT_RESAMPLE_SIZE: usize = 65536;

/// Reads a CSP file into an op-data chain.
pub fn read_csp(path: &Path) -> LutResult<Vec<OpData>> {
    let file = File::open(path)?;
    parse_csp(BufReader::new(file), &path.display().to_string())
}

/// Parses CSP text. `name` labels the source in error messages.
pub fn parse_csp<R: BufRead>(reader: R, name: &str) -> LutResult<Vec<OpData>> {
    let mut lines = Lines::new(reader, name)?;

    let header = lines.next_content()?;
    if header != "CSPLUTV100" {
        return Err(LutError::parse(name, format!("invalid CSP header '{header}'")));
    }
    let is_3d = match lines.next_content()?.as_str() {
        "3D" => true,
        "1D" => false,
        other => return Err(LutError::parse(name, format!("invalid LUT type '{other}'"))),
    };

    let metadata = lines.take_metadata();

    let prelut = [
        lines.take_prelut_channel()?,
        lines.take_prelut_channel()?,
        lines.take_prelut_channel()?,
    ];

    let mut ops = prelut_ops(&prelut, name)?;
    let mut lut = if is_3d {
        lines.take_lut3d()?
    } else {
        lines.take_lut1d()?
    };

    if let Some(text) = metadata {
        match &mut lut {
            OpData::Lut1d(d) => d.metadata.add_child("Description", text),
            OpData::Lut3d(d) => d.metadata.add_child("Description", text),
            _ => {}
        }
    }
    ops.push(lut);

    debug!(name, ops = ops.len(), is_3d, "parsed CSP file");
    Ok(ops)
}

/// Converts the three prelut channels into zero or more leading ops.
fn prelut_ops(channels: &[IndexMap; 3], name: &str) -> LutResult<Vec<OpData>> {
    for (label, ch) in ["red", "green", "blue"].iter().zip(channels) {
        ch.validate().map_err(|e| {
            LutError::parse(name, format!("invalid {label} prelut: {e}"))
        })?;
    }

    let uniform = channels[1] == channels[0] && channels[2] == channels[0];
    if uniform {
        let ch = &channels[0];
        if ch.inputs == ch.outputs {
            return Ok(vec![]);
        }
        if ch.len() == 2 {
            return Ok(vec![OpData::Range(ch.as_range()?)]);
        }
    }

    // Piecewise or per-channel prelut: remap the common input span to [0, 1],
    // then bake the curves into a shaper LUT.
    let lo = channels.iter().map(|c| c.inputs[0]).fold(f64::INFINITY, f64::min);
    let hi = channels
        .iter()
        .map(|c| *c.inputs.last().unwrap_or(&1.0))
        .fold(f64::NEG_INFINITY, f64::max);
    if !(lo < hi) {
        return Err(LutError::parse(name, "prelut input span is empty"));
    }

    let size = PRELUT_RESAMPLE_SIZE;
    let mut table = Vec::with_capacity(size * 3);
    for i in 0..size {
        let x = lo + (hi - lo) * i as f64 / (size - 1) as f64;
        for ch in channels {
            table.push(interp(ch, x) as f32);
        }
    }

    Ok(vec![
        OpData::Range(RangeOpData::new(lo, hi, 0.0, 1.0)),
        OpData::Lut1d(Lut1dOpData::from_interleaved(table, size)),
    ])
}

/// Piecewise-linear evaluation of one prelut channel, clamped at the ends.
fn interp(map: &IndexMap, x: f64) -> f64 {
    let xs = &map.inputs;
    let ys = &map.outputs;
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[xs.len() - 1] {
        return ys[ys.len() - 1];
    }
    let i = xs.partition_point(|&v| v <= x) - 1;
    let t = (x - xs[i]) / (xs[i + 1] - xs[i]);
    ys[i] + t * (ys[i + 1] - ys[i])
}

// ============================================================================
// Line-oriented parsing
// ============================================================================

struct Lines {
    lines: std::vec::IntoIter<String>,
    name: String,
}

impl Lines {
    fn new<R: BufRead>(reader: R, name: &str) -> LutResult<Self> {
        let lines = reader.lines().collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            lines: lines.into_iter(),
            name: name.to_string(),
        })
    }

    /// Next non-empty line, trimmed.
    fn next_content(&mut self) -> LutResult<String> {
        for line in self.lines.by_ref() {
            let line = line.trim();
            if !line.is_empty() {
                return Ok(line.to_string());
            }
        }
        Err(LutError::parse(&self.name, "unexpected end of file"))
    }

    /// Consumes an optional `BEGIN METADATA` block.
    fn take_metadata(&mut self) -> Option<String> {
        let rest = self.lines.as_slice();
        let first = rest.iter().position(|l| !l.trim().is_empty())?;
        if rest[first].trim() != "BEGIN METADATA" {
            return None;
        }
        // Skip to the block and collect until END METADATA.
        for _ in 0..=first {
            self.lines.next();
        }
        let mut text = String::new();
        for line in self.lines.by_ref() {
            if line.trim() == "END METADATA" {
                break;
            }
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&line);
        }
        (!text.is_empty()).then_some(text)
    }

    fn take_prelut_channel(&mut self) -> LutResult<IndexMap> {
        let count: usize = self.parse_next("prelut count")?;
        let inputs = self.take_floats("prelut inputs")?;
        let outputs = self.take_floats("prelut outputs")?;
        if inputs.len() != count || outputs.len() != count {
            return Err(LutError::parse(
                &self.name,
                format!(
                    "prelut count mismatch: expected {count}, got {} inputs and {} outputs",
                    inputs.len(),
                    outputs.len()
                ),
            ));
        }
        Ok(IndexMap::new(inputs, outputs))
    }

    fn take_lut1d(&mut self) -> LutResult<OpData> {
        let size: usize = self.parse_next("1D LUT size")?;
        let mut table = Vec::with_capacity(size * 3);
        for _ in 0..size {
            let row = self.take_floats("1D LUT entry")?;
            if row.len() != 3 {
                return Err(LutError::parse(
                    &self.name,
                    format!("expected 3 values per 1D LUT entry, got {}", row.len()),
                ));
            }
            table.extend(row.iter().map(|&v| v as f32));
        }
        let data = Lut1dOpData::from_interleaved(table, size);
        data.validate()?;
        Ok(OpData::Lut1d(data))
    }

    fn take_lut3d(&mut self) -> LutResult<OpData> {
        let dims = self.take_floats("3D LUT dimensions")?;
        if dims.len() != 3 {
            return Err(LutError::parse(
                &self.name,
                format!("expected 3 dimensions, got {}", dims.len()),
            ));
        }
        let (r, g, b) = (dims[0] as usize, dims[1] as usize, dims[2] as usize);
        if r != g || g != b {
            return Err(LutError::parse(
                &self.name,
                format!("non-cubic 3D LUT ({r}x{g}x{b}) is not supported"),
            ));
        }
        let size = r;

        // CSP stores red fastest; storage here is blue fastest.
        let mut table = vec![0.0_f32; size * size * size * 3];
        for bi in 0..size {
            for gi in 0..size {
                for ri in 0..size {
                    let row = self.take_floats("3D LUT entry")?;
                    if row.len() != 3 {
                        return Err(LutError::parse(
                            &self.name,
                            format!("expected 3 values per 3D LUT entry, got {}", row.len()),
                        ));
                    }
                    let at = ((ri * size + gi) * size + bi) * 3;
                    for c in 0..3 {
                        table[at + c] = row[c] as f32;
                    }
                }
            }
        }
        let data = Lut3dOpData::from_table(table, size);
        data.validate()?;
        Ok(OpData::Lut3d(data))
    }

    fn parse_next<T: std::str::FromStr>(&mut self, what: &str) -> LutResult<T> {
        let line = self.next_content()?;
        line.parse().map_err(|_| {
            LutError::parse(&self.name, format!("invalid {what} '{line}'"))
        })
    }

    fn take_floats(&mut self, what: &str) -> LutResult<Vec<f64>> {
        let line = self.next_content()?;
        line.split_whitespace()
            .map(|s| {
                s.parse::<f64>()
                    .map_err(|_| LutError::parse(&self.name, format!("invalid {what} '{s}'")))
            })
            .collect()
    }
}
