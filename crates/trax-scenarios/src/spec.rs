//! Scenario file schema.
//!
//! A scenario is everything needed to reproduce a full traverse: a model
//! path, the max-slope constraint, the endpoints with the frame they are
//! expressed in, the initial heading, and optional obstacle annotations as
//! either a dense 0/1 grid or an explicit cell list.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use trax_core::{Cell, GeoPoint, Planet, TerrainGrid, TraxResult, UtmZone};

/// The frame scenario endpoints are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSystem {
    Latlon,
    Utm,
    RowCol,
}

/// A traverse scenario, as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Path to the terrain model, relative to the scenario file.
    pub model: String,
    /// Maximum traversable slope in degrees.
    pub max_slope: f64,
    /// Start point in `coordinate_system` order (lat/lon, easting/northing,
    /// or row/col).
    pub start: [f64; 2],
    /// End point, same frame as `start`.
    pub end: [f64; 2],
    pub coordinate_system: CoordinateSystem,
    /// Initial agent heading in degrees clockwise from north.
    pub start_heading: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planet: Option<Planet>,
    /// Dense 0/1 obstacle grid matching the model's extent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obstacles: Option<Vec<Vec<u8>>>,
    /// Explicit obstacle cells as `[row, col]` pairs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obstacles_list: Option<Vec<[usize; 2]>>,
}

impl Scenario {
    /// Interpret one endpoint pair in the scenario's frame, against `grid`.
    pub fn resolve_point(&self, grid: &TerrainGrid, pair: [f64; 2]) -> TraxResult<Cell> {
        resolve_in_frame(grid, self.coordinate_system, pair)
    }
}

/// Interpret a coordinate pair in the given frame against `grid`.
pub fn resolve_in_frame(
    grid: &TerrainGrid,
    system: CoordinateSystem,
    pair: [f64; 2],
) -> TraxResult<Cell> {
    let point = match system {
        CoordinateSystem::Latlon => GeoPoint::LatLon { lat: pair[0], lon: pair[1] },
        CoordinateSystem::Utm => GeoPoint::Utm {
            easting: pair[0],
            northing: pair[1],
            // The pair inherits the model's zone; a planar grid rejects
            // the query downstream.
            zone: grid
                .origin()
                .projection
                .utm_zone()
                .unwrap_or(UtmZone::new(1, true)),
        },
        CoordinateSystem::RowCol => GeoPoint::RowCol {
            row: pair[0].round().max(0.0) as usize,
            col: pair[1].round().max(0.0) as usize,
        },
    };
    grid.to_cell(point)
}

/// Load a scenario from disk.
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading scenario '{}'", path.display()))?;
    let scenario: Scenario =
        serde_json::from_str(&data).context("parsing scenario json")?;
    validate(&scenario)?;
    Ok(scenario)
}

/// Serialise a scenario; [`load_scenario`] of the output yields a
/// byte-identical document when re-serialised.
pub fn save_scenario(path: &Path, scenario: &Scenario) -> Result<()> {
    validate(scenario)?;
    let payload = serde_json::to_string_pretty(scenario).context("serializing scenario")?;
    fs::write(path, payload + "\n")
        .with_context(|| format!("writing scenario '{}'", path.display()))?;
    Ok(())
}

/// Structural checks that need no terrain model.
pub fn validate(scenario: &Scenario) -> Result<()> {
    if scenario.model.trim().is_empty() {
        bail!("scenario names no model");
    }
    if !(scenario.max_slope > 0.0 && scenario.max_slope <= 90.0) {
        bail!("max_slope must be in (0, 90], got {}", scenario.max_slope);
    }
    if !(0.0..360.0).contains(&scenario.start_heading) {
        bail!(
            "start_heading must be in [0, 360), got {}",
            scenario.start_heading
        );
    }
    if scenario.obstacles.is_some() && scenario.obstacles_list.is_some() {
        bail!("scenario carries both 'obstacles' and 'obstacles_list'");
    }
    if let Some(rows) = &scenario.obstacles {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if width == 0 {
            bail!("'obstacles' grid is empty");
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                bail!("'obstacles' row {i} has {} values, expected {width}", row.len());
            }
            if let Some(bad) = row.iter().find(|v| **v > 1) {
                return Err(anyhow!("'obstacles' must be 0/1, found {bad} in row {i}"));
            }
        }
    }
    Ok(())
}
