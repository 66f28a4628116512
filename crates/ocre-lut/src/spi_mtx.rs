//! Sony Pictures Imageworks matrix format (spimtx).
//!
//! Reference: OCIO FileFormatSpiMtx.cpp
//!
//! Twelve whitespace-separated values forming three rows of
//! `M00 M01 M02 Off0`. Offsets are stored in 16-bit code values and divide
//! by 65535 on read.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ocre_math::Mat4d;
use ocre_ops::matrix::MatrixOpData;
use ocre_ops::OpData;

use crate::{LutError, LutResult};

const OFFSET_SCALE: f64 = 65535.0;

/// Reads an spimtx file into an op-data chain.
pub fn read_spimtx(path: &Path) -> LutResult<Vec<OpData>> {
    let file = File::open(path)?;
    parse_spimtx(BufReader::new(file), &path.display().to_string())
}

/// Parses spimtx text. `name` labels the source in error messages.
pub fn parse_spimtx<R: BufRead>(reader: R, name: &str) -> LutResult<Vec<OpData>> {
    let mut values = Vec::with_capacity(12);
    for line in reader.lines() {
        let line = line?;
        for tok in line.split_whitespace() {
            let v: f64 = tok
                .parse()
                .map_err(|_| LutError::parse(name, format!("invalid matrix value '{tok}'")))?;
            values.push(v);
        }
    }
    if values.len() != 12 {
        return Err(LutError::parse(
            name,
            format!("expected 12 values (3x3 matrix plus offsets), got {}", values.len()),
        ));
    }

    let mut m3 = [0.0_f64; 9];
    let mut offset = [0.0_f64; 4];
    for row in 0..3 {
        for col in 0..3 {
            m3[row * 3 + col] = values[row * 4 + col];
        }
        offset[row] = values[row * 4 + 3] / OFFSET_SCALE;
    }

    let mut data = MatrixOpData::from_matrix(Mat4d::from_3x3(m3));
    data.offset = offset;
    Ok(vec![OpData::Matrix(data)])
}
