//! ASC CDL XML readers (.cc, .ccc, .cdl).
//!
//! Reference: OCIO CDLParser, ASC CDL v1.01
//!
//! `.cc` holds a single `ColorCorrection`; `.ccc` wraps several in a
//! `ColorCorrectionCollection`; `.cdl` nests them inside `ColorDecision`
//! elements of a `ColorDecisionList`. Ids and descriptions land in the
//! op-data metadata bag and round-trip through CLF/CTF writers.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ocre_ops::cdl::CdlOpData;
use ocre_ops::OpData;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use crate::{LutError, LutResult};

/// Reads a `.cc` file (single correction) into an op-data chain.
pub fn read_cc(path: &Path) -> LutResult<Vec<OpData>> {
    let file = File::open(path)?;
    let corrections = parse_corrections(BufReader::new(file), &path.display().to_string())?;
    first_or_err(corrections, &path.display().to_string())
}

/// Reads a `.ccc` or `.cdl` file, selecting one correction by `cccid`.
///
/// A `cccid` of `None` selects the first correction. Integer ids select by
/// position when no correction carries a matching `id` attribute.
pub fn read_cdl_collection(path: &Path, cccid: Option<&str>) -> LutResult<Vec<OpData>> {
    let file = File::open(path)?;
    let name = path.display().to_string();
    let corrections = parse_corrections(BufReader::new(file), &name)?;
    select(corrections, cccid, &name)
}

/// Parses any of the three CDL XML container shapes into the full list of
/// corrections, in document order.
pub fn parse_corrections<R: BufRead>(reader: R, name: &str) -> LutResult<Vec<CdlOpData>> {
    let mut xml = Reader::from_reader(reader);
    xml.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut out: Vec<CdlOpData> = Vec::new();
    let mut current: Option<CdlOpData> = None;
    let mut text = String::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"ColorCorrection" {
                    let mut cdl = CdlOpData::default();
                    if let Some(id) = get_attr(&e, b"id") {
                        cdl.metadata.id = id;
                    }
                    current = Some(cdl);
                }
                text.clear();
            }
            Ok(Event::Text(e)) => {
                text = e
                    .decode()
                    .map_err(|err| LutError::parse(name, format!("bad XML text: {err}")))?
                    .into_owned();
            }
            Ok(Event::End(e)) => {
                let tag = e.name().as_ref().to_vec();
                if tag == b"ColorCorrection" {
                    if let Some(cdl) = current.take() {
                        cdl.validate()?;
                        out.push(cdl);
                    }
                    continue;
                }
                let Some(cdl) = current.as_mut() else { continue };
                match tag.as_slice() {
                    b"Slope" => cdl.slope = parse_rgb(&text, name, "Slope")?,
                    b"Offset" => cdl.offset = parse_rgb(&text, name, "Offset")?,
                    b"Power" => cdl.power = parse_rgb(&text, name, "Power")?,
                    b"Saturation" => {
                        cdl.saturation = text.trim().parse().map_err(|_| {
                            LutError::parse(name, format!("invalid Saturation '{}'", text.trim()))
                        })?;
                    }
                    b"Description" => {
                        cdl.metadata.add_child("Description", text.trim());
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(LutError::parse(name, format!("XML error: {err}"))),
            _ => {}
        }
        buf.clear();
    }

    if out.is_empty() {
        return Err(LutError::parse(name, "no ColorCorrection element found"));
    }
    debug!(name, corrections = out.len(), "parsed CDL XML");
    Ok(out)
}

fn select(
    corrections: Vec<CdlOpData>,
    cccid: Option<&str>,
    name: &str,
) -> LutResult<Vec<OpData>> {
    let Some(cccid) = cccid else {
        return first_or_err(corrections, name);
    };
    if let Some(cdl) = corrections.iter().find(|c| c.metadata.id == cccid) {
        return Ok(vec![OpData::Cdl(cdl.clone())]);
    }
    if let Ok(index) = cccid.parse::<usize>() {
        if let Some(cdl) = corrections.get(index) {
            return Ok(vec![OpData::Cdl(cdl.clone())]);
        }
    }
    Err(LutError::parse(
        name,
        format!("no ColorCorrection with id '{cccid}'"),
    ))
}

fn first_or_err(corrections: Vec<CdlOpData>, name: &str) -> LutResult<Vec<OpData>> {
    corrections
        .into_iter()
        .next()
        .map(|c| vec![OpData::Cdl(c)])
        .ok_or_else(|| LutError::parse(name, "no ColorCorrection element found"))
}

fn parse_rgb(text: &str, name: &str, what: &str) -> LutResult<[f64; 3]> {
    let vals: Vec<f64> = text
        .split_whitespace()
        .filter_map(|t| t.parse().ok())
        .collect();
    if vals.len() != 3 {
        return Err(LutError::parse(
            name,
            format!("{what} needs 3 values, got '{text}'"),
        ));
    }
    Ok([vals[0], vals[1], vals[2]])
}

fn get_attr(e: &quick_xml::events::BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
        .filter(|s| !s.is_empty())
}
