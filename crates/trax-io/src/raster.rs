//! The raster-source contract and format dispatch.
//!
//! Every terrain format reduces to a [`RasterData`]: a 2-D `f64` sample
//! array plus resolution, origin, and projection. The core never assumes a
//! specific file format; [`open_raster`] dispatches on the file extension
//! (`.txt` legacy grid, `.tif`/`.tiff` GeoTIFF), and `.png` obstacle mazes
//! get their own loader in [`crate::obstacle_png`] because they carry
//! passability rather than elevation.

use crate::{geotiff, legacy};
use anyhow::{bail, Context, Result};
use std::path::Path;
use trax_core::{GridOrigin, Planet, SubWindow, TerrainGrid};

/// A decoded raster: row-major samples plus geospatial metadata.
#[derive(Debug, Clone)]
pub struct RasterData {
    pub samples: Vec<f64>,
    pub width: usize,
    pub height: usize,
    /// Metres per (square) cell.
    pub resolution: f64,
    /// Projected NW cell centre and projection.
    pub origin: GridOrigin,
}

impl RasterData {
    /// Half-open sub-window covering the intersection of this raster with
    /// a projected bounding box (`nw`/`se` corners in the raster's frame).
    ///
    /// Returns `None` when the box misses the raster entirely.
    pub fn subwindow(
        &self,
        nw_easting: f64,
        nw_northing: f64,
        se_easting: f64,
        se_northing: f64,
    ) -> Option<SubWindow> {
        let col0 = ((nw_easting - self.origin.easting) / self.resolution).round();
        let col1 = ((se_easting - self.origin.easting) / self.resolution).round() + 1.0;
        let row0 = ((self.origin.northing - nw_northing) / self.resolution).round();
        let row1 = ((self.origin.northing - se_northing) / self.resolution).round() + 1.0;
        let rows = (row0.max(0.0) as usize).min(self.height)..(row1.max(0.0) as usize).min(self.height);
        let cols = (col0.max(0.0) as usize).min(self.width)..(col1.max(0.0) as usize).min(self.width);
        if rows.is_empty() || cols.is_empty() {
            return None;
        }
        Some(SubWindow { rows, cols })
    }

    /// Build a terrain grid over this raster.
    pub fn into_grid(
        self,
        planet: Planet,
        max_slope_deg: f64,
        window: Option<SubWindow>,
    ) -> trax_core::TraxResult<TerrainGrid> {
        TerrainGrid::from_elevations(
            &self.samples,
            self.width,
            self.height,
            self.resolution,
            self.origin,
            planet,
            max_slope_deg,
            window,
        )
    }
}

/// Open an elevation raster, dispatching on the file extension.
pub fn open_raster(path: &Path) -> Result<RasterData> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "txt" => legacy::load_legacy_grid(path),
        "tif" | "tiff" => geotiff::load_geotiff(path),
        other => bail!("no raster loader for '.{other}' files (expected .txt, .tif, .tiff)"),
    }
}

/// Load a terrain model of any supported format, including PNG obstacle
/// mazes.
pub fn load_model(path: &Path, planet: Planet, max_slope_deg: f64) -> Result<TerrainGrid> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if ext == "png" {
        return crate::obstacle_png::load_obstacle_map(path);
    }
    let raster =
        open_raster(path).with_context(|| format!("opening raster {}", path.display()))?;
    raster
        .into_grid(planet, max_slope_deg, None)
        .with_context(|| format!("building terrain grid from {}", path.display()))
}
