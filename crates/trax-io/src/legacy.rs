//! Legacy ASCII elevation grid loader.
//!
//! The format is a header of `key value` lines (`cellsize`, `xllcorner`,
//! `yllcorner`, optional `UTMzone`, and the usual `ncols`/`nrows`/
//! `NODATA_value` companions), terminated by the first line that begins
//! with numeric data; the body is whitespace-separated elevations in
//! row-major order. Tabs and spaces mix freely and values may be integer
//! or decimal.

use crate::raster::RasterData;
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;
use trax_core::{GridOrigin, Projection, UtmZone};

/// Parse a header line into a `key value` pair: a letters-only word
/// followed by a number. Returns `None` once the body starts.
fn header_pair(line: &str) -> Option<(String, f64)> {
    let mut parts = line.split_whitespace();
    let key = parts.next()?;
    let value = parts.next()?;
    if !key.chars().all(|c| c.is_ascii_alphabetic() || c == '_') {
        return None;
    }
    let value: f64 = value.parse().ok()?;
    Some((key.to_ascii_lowercase(), value))
}

/// Load a legacy ASCII grid file.
pub fn load_legacy_grid(path: &Path) -> Result<RasterData> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading legacy grid {}", path.display()))?;
    parse_legacy_grid(&content)
}

/// Parse legacy ASCII grid content from a string.
pub fn parse_legacy_grid(content: &str) -> Result<RasterData> {
    let mut header: HashMap<String, f64> = HashMap::new();
    let mut body_start = 0;
    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match header_pair(line) {
            Some((key, value)) => {
                header.insert(key, value);
            }
            None => {
                body_start = i;
                break;
            }
        }
    }

    let resolution = *header
        .get("cellsize")
        .context("legacy grid header is missing 'cellsize'")?;
    let nodata = header.get("nodata_value").copied();

    let mut width = 0usize;
    let mut samples: Vec<f64> = Vec::new();
    let mut height = 0usize;
    for line in content.lines().skip(body_start) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut count = 0usize;
        for token in line.split_whitespace() {
            let z: f64 = token
                .parse()
                .with_context(|| format!("bad elevation value '{token}' on row {height}"))?;
            let z = if Some(z) == nodata { f64::NAN } else { z };
            samples.push(z);
            count += 1;
        }
        if width == 0 {
            width = count;
        } else if count != width {
            bail!("row {height} has {count} values, expected {width}");
        }
        height += 1;
    }
    if width == 0 || height == 0 {
        bail!("legacy grid has no elevation rows");
    }
    if let Some(&ncols) = header.get("ncols") {
        if ncols as usize != width {
            bail!("header declares {ncols} columns, body has {width}");
        }
    }
    if let Some(&nrows) = header.get("nrows") {
        if nrows as usize != height {
            bail!("header declares {nrows} rows, body has {height}");
        }
    }

    // xllcorner/yllcorner are the outer corner of the south-west cell; the
    // grid origin is the centre of the north-west cell.
    let origin = match header.get("utmzone") {
        Some(&zone) => {
            let xll = *header
                .get("xllcorner")
                .context("legacy grid with UTMzone is missing 'xllcorner'")?;
            let yll = *header
                .get("yllcorner")
                .context("legacy grid with UTMzone is missing 'yllcorner'")?;
            GridOrigin {
                easting: xll + resolution / 2.0,
                northing: yll + (height as f64 - 0.5) * resolution,
                projection: Projection::Utm(UtmZone::new(zone as u8, true)),
            }
        }
        // No recognisable projection: unit planar frame at (0, 0).
        None => GridOrigin::local_planar(),
    };

    debug!(width, height, resolution, "legacy ASCII grid parsed");
    Ok(RasterData { samples, width, height, resolution, origin })
}
