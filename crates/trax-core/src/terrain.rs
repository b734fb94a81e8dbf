//! The terrain model: a raster-backed, projection-aware elevation grid with
//! derived slope, passability, and neighbour-reachability tables.
//!
//! Storage is dense and row-major (`Vec<f64>` / `Vec<bool>` with an index
//! helper) rather than a grid or graph crate; the 8-connected raster is the
//! hot path and the solver indexes these tables directly. All derived
//! tables (`slope_deg`, `obstacle`, `passable`, `reach`) are rebuilt by the
//! mutation entry points, never lazily, and every mutation that changes the
//! grid bumps a revision counter that downstream cost caches check.

use crate::energetics::Planet;
use crate::error::{TraxError, TraxResult};
use crate::frames::{latlon_to_utm, utm_rezone, GeoPoint, Projection};
use crate::kernel::{KERNEL_SIZE, OFFSETS};
use crate::Cell;
use std::ops::Range;
use tracing::debug;

/// Elevations outside this range are sentinels for missing data. The lower
/// cut keeps common nodata fills (−9999, −32767, −99999) out while leaving
/// room for lunar and martian depressions.
const PLAUSIBLE_ELEVATION_M: Range<f64> = -11_000.0..25_000.0;

/// Projected coordinates of the grid's north-west cell centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridOrigin {
    pub easting: f64,
    pub northing: f64,
    pub projection: Projection,
}

impl GridOrigin {
    /// The unit planar fallback frame used when a raster carries no
    /// recognisable projection.
    pub fn local_planar() -> Self {
        GridOrigin { easting: 0.0, northing: 0.0, projection: Projection::LocalPlanar }
    }
}

/// Half-open sub-window of a raster: rows `rows.start..rows.end`, columns
/// `cols.start..cols.end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubWindow {
    pub rows: Range<usize>,
    pub cols: Range<usize>,
}

/// A raster-backed elevation grid with derived passability tables.
#[derive(Debug, Clone)]
pub struct TerrainGrid {
    width: usize,
    height: usize,
    resolution: f64,
    origin: GridOrigin,
    planet: Planet,
    max_slope_deg: f64,
    elevation: Vec<f64>,
    valid: Vec<bool>,
    slope_deg: Vec<f64>,
    obstacle: Vec<bool>,
    annotated: Vec<bool>,
    reach: Vec<bool>,
    revision: u64,
}

impl TerrainGrid {
    /// Build a grid from row-major elevation samples.
    ///
    /// `window`, when given, selects a half-open sub-window of the samples;
    /// the origin shifts to the window's north-west cell centre. Samples
    /// outside the physically plausible range (or non-finite) become
    /// `valid = false`.
    pub fn from_elevations(
        samples: &[f64],
        width: usize,
        height: usize,
        resolution: f64,
        origin: GridOrigin,
        planet: Planet,
        max_slope_deg: f64,
        window: Option<SubWindow>,
    ) -> TraxResult<Self> {
        if width == 0 || height == 0 {
            return Err(TraxError::Parse("raster has zero extent".into()));
        }
        if samples.len() != width * height {
            return Err(TraxError::Parse(format!(
                "raster body has {} samples, expected {}x{} = {}",
                samples.len(),
                width,
                height,
                width * height
            )));
        }
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(TraxError::Parse(format!("invalid resolution {resolution}")));
        }

        let window = match window {
            Some(w) => {
                if w.rows.end > height || w.cols.end > width || w.rows.is_empty() || w.cols.is_empty()
                {
                    return Err(TraxError::Parse(format!(
                        "sub-window rows {:?} cols {:?} exceeds raster {}x{}",
                        w.rows, w.cols, width, height
                    )));
                }
                w
            }
            None => SubWindow { rows: 0..height, cols: 0..width },
        };

        let out_h = window.rows.len();
        let out_w = window.cols.len();
        let mut elevation = Vec::with_capacity(out_h * out_w);
        for r in window.rows.clone() {
            let row = &samples[r * width..(r + 1) * width];
            elevation.extend_from_slice(&row[window.cols.clone()]);
        }

        let origin = GridOrigin {
            easting: origin.easting + window.cols.start as f64 * resolution,
            northing: origin.northing - window.rows.start as f64 * resolution,
            projection: origin.projection,
        };

        let valid: Vec<bool> = elevation
            .iter()
            .map(|z| z.is_finite() && PLAUSIBLE_ELEVATION_M.contains(z))
            .collect();

        let mut grid = TerrainGrid {
            width: out_w,
            height: out_h,
            resolution,
            origin,
            planet,
            max_slope_deg,
            elevation,
            valid,
            slope_deg: vec![0.0; out_w * out_h],
            obstacle: vec![false; out_w * out_h],
            annotated: vec![false; out_w * out_h],
            reach: vec![false; out_w * out_h * KERNEL_SIZE],
            revision: 0,
        };
        grid.rebuild_slopes();
        grid.apply_max_slope_rule();
        grid.rebuild_reach();
        debug!(
            width = grid.width,
            height = grid.height,
            passable = grid.passable_count(),
            "terrain grid built"
        );
        Ok(grid)
    }

    #[inline]
    fn idx(&self, cell: Cell) -> usize {
        cell.row * self.width + cell.col
    }

    #[inline]
    fn reach_idx(&self, cell: Cell, k: usize) -> usize {
        (cell.row * self.width + cell.col) * KERNEL_SIZE + k
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn origin(&self) -> GridOrigin {
        self.origin
    }

    pub fn planet(&self) -> Planet {
        self.planet
    }

    pub fn gravity(&self) -> f64 {
        self.planet.gravity()
    }

    pub fn max_slope_deg(&self) -> f64 {
        self.max_slope_deg
    }

    /// Monotone counter bumped by every mutation; cost caches record it at
    /// build time and refuse to serve a stale grid.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.row < self.height && cell.col < self.width
    }

    fn ensure_contains(&self, cell: Cell) -> TraxResult<()> {
        if self.contains(cell) {
            Ok(())
        } else {
            Err(TraxError::OutOfBounds { cell })
        }
    }

    pub fn elevation(&self, cell: Cell) -> TraxResult<f64> {
        self.ensure_contains(cell)?;
        Ok(self.elevation[self.idx(cell)])
    }

    pub fn slope_deg(&self, cell: Cell) -> TraxResult<f64> {
        self.ensure_contains(cell)?;
        Ok(self.slope_deg[self.idx(cell)])
    }

    pub fn is_valid(&self, cell: Cell) -> bool {
        self.contains(cell) && self.valid[self.idx(cell)]
    }

    pub fn is_obstacle(&self, cell: Cell) -> bool {
        self.contains(cell) && self.obstacle[self.idx(cell)]
    }

    /// Passable ≡ in bounds, valid elevation, and not an obstacle.
    pub fn is_passable(&self, cell: Cell) -> bool {
        self.contains(cell) && {
            let i = self.idx(cell);
            self.valid[i] && !self.obstacle[i]
        }
    }

    /// Whether kernel move `k` from `cell` lands on a passable cell.
    #[inline]
    pub fn can_reach(&self, cell: Cell, k: usize) -> bool {
        self.reach[self.reach_idx(cell, k)]
    }

    /// Raw row-major elevation samples (invalid cells carry their sentinel).
    pub fn elevations(&self) -> &[f64] {
        &self.elevation
    }

    pub fn passable_count(&self) -> usize {
        self.valid
            .iter()
            .zip(self.obstacle.iter())
            .filter(|(v, o)| **v && !**o)
            .count()
    }

    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|v| **v).count()
    }

    /// Reachable neighbours of `cell` with their kernel indices.
    pub fn neighbors(&self, cell: Cell) -> TraxResult<Vec<(Cell, usize)>> {
        self.ensure_contains(cell)?;
        let mut out = Vec::with_capacity(KERNEL_SIZE);
        for (k, &(dr, dc)) in OFFSETS.iter().enumerate() {
            if self.can_reach(cell, k) {
                let row = (cell.row as i64 + dr as i64) as usize;
                let col = (cell.col as i64 + dc as i64) as usize;
                out.push((Cell::new(row, col), k));
            }
        }
        Ok(out)
    }

    /// The neighbour reached by kernel move `k`, if it stays in bounds.
    pub fn step(&self, cell: Cell, k: usize) -> Option<Cell> {
        let (dr, dc) = OFFSETS[k];
        let row = cell.row as i64 + dr as i64;
        let col = cell.col as i64 + dc as i64;
        if row < 0 || col < 0 {
            return None;
        }
        let cell = Cell::new(row as usize, col as usize);
        self.contains(cell).then_some(cell)
    }

    /* ---------------- coordinate conversion ---------------- */

    /// Project a point in any supported frame to grid indices.
    pub fn to_cell(&self, point: GeoPoint) -> TraxResult<Cell> {
        match point {
            GeoPoint::RowCol { row, col } => {
                let cell = Cell::new(row, col);
                self.ensure_contains(cell)?;
                Ok(cell)
            }
            GeoPoint::GridXY { x, y } => self.planar_to_cell(x, y),
            GeoPoint::Utm { easting, northing, zone } => {
                let grid_zone = self.origin.projection.utm_zone().ok_or(
                    TraxError::UnsupportedProjection { query: "utm" },
                )?;
                let (e, n) = utm_rezone(easting, northing, zone, grid_zone);
                self.planar_to_cell(e - self.origin.easting, self.origin.northing - n)
            }
            GeoPoint::LatLon { lat, lon } => {
                let grid_zone = self.origin.projection.utm_zone().ok_or(
                    TraxError::UnsupportedProjection { query: "latlon" },
                )?;
                let (e, n) = latlon_to_utm(lat, lon, grid_zone);
                self.planar_to_cell(e - self.origin.easting, self.origin.northing - n)
            }
        }
    }

    /// Planar metres east/south of the NW cell centre to the nearest cell.
    fn planar_to_cell(&self, x: f64, y: f64) -> TraxResult<Cell> {
        let col = (x / self.resolution).round();
        let row = (y / self.resolution).round();
        if row < 0.0 || col < 0.0 || row >= self.height as f64 || col >= self.width as f64 {
            return Err(TraxError::OutOfBounds {
                cell: Cell::new(row.max(0.0) as usize, col.max(0.0) as usize),
            });
        }
        Ok(Cell::new(row as usize, col as usize))
    }

    /// Centre of `cell` in the grid's projected frame (UTM when the grid has
    /// one, planar metres otherwise).
    pub fn cell_center(&self, cell: Cell) -> TraxResult<GeoPoint> {
        self.ensure_contains(cell)?;
        let x = cell.col as f64 * self.resolution;
        let y = cell.row as f64 * self.resolution;
        Ok(match self.origin.projection {
            Projection::Utm(zone) => GeoPoint::Utm {
                easting: self.origin.easting + x,
                northing: self.origin.northing - y,
                zone,
            },
            Projection::LocalPlanar => GeoPoint::GridXY { x, y },
        })
    }

    /* ---------------- obstacle mutation ---------------- */

    /// Flip `obstacle` inside a filled disc of `radius_cells` around
    /// `center` (cell units). Returns the cells whose passability actually
    /// changed; reach is refreshed for those cells and their halo.
    pub fn set_obstacle_disc(
        &mut self,
        center: Cell,
        radius_cells: f64,
        value: bool,
    ) -> TraxResult<Vec<Cell>> {
        self.ensure_contains(center)?;
        let r = radius_cells.max(0.0);
        let r_ceil = r.ceil() as i64;
        let mut targets = Vec::new();
        for dr in -r_ceil..=r_ceil {
            for dc in -r_ceil..=r_ceil {
                if (dr * dr + dc * dc) as f64 > r * r {
                    continue;
                }
                let row = center.row as i64 + dr;
                let col = center.col as i64 + dc;
                if row < 0 || col < 0 {
                    continue;
                }
                let cell = Cell::new(row as usize, col as usize);
                if self.contains(cell) {
                    targets.push(cell);
                }
            }
        }
        Ok(self.apply_obstacle_edit(&targets, value))
    }

    /// Flip `obstacle` for an explicit cell set. All cells must be in
    /// bounds. Returns the cells whose passability actually changed.
    pub fn set_obstacle_list(&mut self, cells: &[Cell], value: bool) -> TraxResult<Vec<Cell>> {
        for &cell in cells {
            self.ensure_contains(cell)?;
        }
        Ok(self.apply_obstacle_edit(cells, value))
    }

    /// Reset `obstacle` to the max-slope rule alone, dropping every
    /// explicit annotation.
    pub fn clear_obstacles(&mut self) {
        self.annotated.iter_mut().for_each(|a| *a = false);
        self.apply_max_slope_rule();
        self.rebuild_reach();
        self.revision += 1;
    }

    /// Change the max-slope threshold and rebuild the derived tables.
    pub fn set_max_slope(&mut self, max_slope_deg: f64) {
        self.max_slope_deg = max_slope_deg;
        self.apply_max_slope_rule();
        self.rebuild_reach();
        self.revision += 1;
    }

    fn apply_obstacle_edit(&mut self, cells: &[Cell], value: bool) -> Vec<Cell> {
        let mut changed = Vec::new();
        for &cell in cells {
            let i = self.idx(cell);
            // Erasing (value = false) clears the annotation and overrides
            // the slope rule for the touched cell; `clear_obstacles`
            // restores the rule.
            self.annotated[i] = value;
            if self.obstacle[i] != value {
                self.obstacle[i] = value;
                changed.push(cell);
            }
        }
        if !changed.is_empty() {
            self.refresh_reach_around(&changed);
            self.revision += 1;
        }
        changed
    }

    fn apply_max_slope_rule(&mut self) {
        for i in 0..self.obstacle.len() {
            self.obstacle[i] = self.slope_deg[i] > self.max_slope_deg || self.annotated[i];
        }
    }

    /* ---------------- derived tables ---------------- */

    fn rebuild_slopes(&mut self) {
        let mut slopes = vec![0.0; self.width * self.height];
        for row in 0..self.height {
            for col in 0..self.width {
                let cell = Cell::new(row, col);
                let i = self.idx(cell);
                if !self.valid[i] {
                    continue;
                }
                let gx = self.gradient_axis(cell, 0, 1);
                let gy = self.gradient_axis(cell, 1, 0);
                slopes[i] = (gx * gx + gy * gy).sqrt().atan().to_degrees();
            }
        }
        self.slope_deg = slopes;
    }

    /// Finite-difference gradient along one axis: centred where both
    /// neighbours have data, one-sided at borders and beside invalid cells.
    fn gradient_axis(&self, cell: Cell, d_row: i64, d_col: i64) -> f64 {
        let z = |row: i64, col: i64| -> Option<f64> {
            if row < 0 || col < 0 {
                return None;
            }
            let cell = Cell::new(row as usize, col as usize);
            (self.contains(cell) && self.valid[self.idx(cell)])
                .then(|| self.elevation[self.idx(cell)])
        };
        let (row, col) = (cell.row as i64, cell.col as i64);
        let here = self.elevation[self.idx(cell)];
        let before = z(row - d_row, col - d_col);
        let after = z(row + d_row, col + d_col);
        match (before, after) {
            (Some(b), Some(a)) => (a - b) / (2.0 * self.resolution),
            (None, Some(a)) => (a - here) / self.resolution,
            (Some(b), None) => (here - b) / self.resolution,
            (None, None) => 0.0,
        }
    }

    fn rebuild_reach(&mut self) {
        for row in 0..self.height {
            for col in 0..self.width {
                let cell = Cell::new(row, col);
                for k in 0..KERNEL_SIZE {
                    let reachable = self.step(cell, k).is_some_and(|n| self.is_passable(n));
                    let ri = self.reach_idx(cell, k);
                    self.reach[ri] = reachable;
                }
            }
        }
    }

    /// Refresh reach entries that target the changed cells: for each changed
    /// cell `p`, every in-bounds cell one kernel step away holds an edge
    /// into `p` whose reachability may have flipped.
    fn refresh_reach_around(&mut self, changed: &[Cell]) {
        for &p in changed {
            let passable = self.is_passable(p);
            for (k, &(dr, dc)) in OFFSETS.iter().enumerate() {
                let row = p.row as i64 - dr as i64;
                let col = p.col as i64 - dc as i64;
                if row < 0 || col < 0 {
                    continue;
                }
                let q = Cell::new(row as usize, col as usize);
                if self.contains(q) {
                    let ri = self.reach_idx(q, k);
                    self.reach[ri] = passable;
                }
            }
        }
    }
}
