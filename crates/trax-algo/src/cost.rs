//! Dense per-edge cost tables and the admissible heuristic.
//!
//! For every cell and every kernel move the cache holds the metric cost of
//! the outgoing edge in three parallel layers (3-D path length, traversal
//! time, metabolic energy), `+∞` where the move is not reachable. A 2-D
//! heuristic table is pinned to one goal at a time. Builds are
//! row-parallel; the cache records the grid revision it was built against
//! and refuses to serve a mutated grid.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use trax_core::kernel::{KERNEL_SIZE, STEP_LENGTHS};
use trax_core::{
    admissible_bounds, energy_and_speed, Agent, Cell, EnergeticsBounds, Radians, TerrainGrid,
    TraxError, TraxResult,
};
use tracing::debug;

/// The scalar optimisation vector: non-negative weights combining
/// distance, time, and energy into a single edge cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub distance: f64,
    pub time: f64,
    pub energy: f64,
}

impl Weights {
    /// Minimise metabolic energy alone (the traditional objective).
    pub fn energy_only() -> Self {
        Weights { distance: 0.0, time: 0.0, energy: 1.0 }
    }

    pub fn distance_only() -> Self {
        Weights { distance: 1.0, time: 0.0, energy: 0.0 }
    }

    pub fn time_only() -> Self {
        Weights { distance: 0.0, time: 1.0, energy: 0.0 }
    }

    pub fn validate(&self) -> TraxResult<()> {
        let finite_non_negative =
            [self.distance, self.time, self.energy].iter().all(|w| w.is_finite() && *w >= 0.0);
        if !finite_non_negative {
            return Err(TraxError::Parse(format!(
                "optimisation weights must be finite and non-negative, got {self:?}"
            )));
        }
        if self.distance + self.time + self.energy == 0.0 {
            return Err(TraxError::Parse(
                "optimisation weights must not all be zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for Weights {
    fn default() -> Self {
        Weights::energy_only()
    }
}

/// Metric cost of one outgoing edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeCost {
    /// Three-dimensional path length in metres.
    pub distance_m: f64,
    /// Traversal time in seconds.
    pub time_s: f64,
    /// Metabolic energy in joules.
    pub energy_j: f64,
}

impl EdgeCost {
    pub const UNREACHABLE: EdgeCost = EdgeCost {
        distance_m: f64::INFINITY,
        time_s: f64::INFINITY,
        energy_j: f64::INFINITY,
    };

    pub fn is_reachable(&self) -> bool {
        self.distance_m.is_finite()
    }
}

struct HeuristicTable {
    goal: Cell,
    values: Vec<f64>,
}

/// Dense cost and heuristic tables over one grid, one agent, one
/// optimisation vector.
pub struct CostCache {
    width: usize,
    height: usize,
    distance: Vec<f64>,
    time: Vec<f64>,
    energy: Vec<f64>,
    weights: Weights,
    alpha: f64,
    agent: Agent,
    bounds: EnergeticsBounds,
    grid_revision: u64,
    heuristic: Option<HeuristicTable>,
}

fn edge_layers(
    grid: &TerrainGrid,
    agent: Agent,
    cell: Cell,
    k: usize,
) -> (f64, f64, f64) {
    if !grid.can_reach(cell, k) {
        return (f64::INFINITY, f64::INFINITY, f64::INFINITY);
    }
    // Reachable implies the destination exists and both cells carry data.
    let Some(dest) = grid.step(cell, k) else {
        return (f64::INFINITY, f64::INFINITY, f64::INFINITY);
    };
    let z = grid.elevations();
    let dz = z[dest.row * grid.width() + dest.col] - z[cell.row * grid.width() + cell.col];
    let dr = STEP_LENGTHS[k] * grid.resolution();
    let slope = Radians(dz.atan2(dr));
    let distance = dr / slope.value().cos();
    let (energy, v) = energy_and_speed(agent, grid.gravity(), dr, slope);
    let time = dr / v.value();
    (distance, time, energy.value())
}

impl CostCache {
    /// Build the edge-cost layers for `grid` and `agent` under the scalar
    /// optimisation vector `weights` with heuristic inflation `alpha`.
    ///
    /// No heuristic is pinned yet; call [`CostCache::pin_goal`] before
    /// solving.
    pub fn build(
        grid: &TerrainGrid,
        agent: Agent,
        weights: Weights,
        alpha: f64,
    ) -> TraxResult<Self> {
        weights.validate()?;
        if !(alpha.is_finite() && alpha >= 1.0) {
            return Err(TraxError::Parse(format!(
                "inflation factor must be >= 1, got {alpha}"
            )));
        }
        let width = grid.width();
        let height = grid.height();
        let n = width * height;
        let mut distance = vec![f64::INFINITY; n * KERNEL_SIZE];
        let mut time = vec![f64::INFINITY; n * KERNEL_SIZE];
        let mut energy = vec![f64::INFINITY; n * KERNEL_SIZE];

        let row_len = width * KERNEL_SIZE;
        distance
            .par_chunks_mut(row_len)
            .zip(time.par_chunks_mut(row_len))
            .zip(energy.par_chunks_mut(row_len))
            .enumerate()
            .for_each(|(row, ((d_row, t_row), e_row))| {
                for col in 0..width {
                    let cell = Cell::new(row, col);
                    for k in 0..KERNEL_SIZE {
                        let (d, t, e) = edge_layers(grid, agent, cell, k);
                        d_row[col * KERNEL_SIZE + k] = d;
                        t_row[col * KERNEL_SIZE + k] = t;
                        e_row[col * KERNEL_SIZE + k] = e;
                    }
                }
            });

        let bounds = admissible_bounds(agent, grid.gravity());
        debug!(
            width,
            height,
            revision = grid.revision(),
            "edge-cost layers built"
        );
        Ok(CostCache {
            width,
            height,
            distance,
            time,
            energy,
            weights,
            alpha,
            agent,
            bounds,
            grid_revision: grid.revision(),
            heuristic: None,
        })
    }

    #[inline]
    fn edge_idx(&self, cell: Cell, k: usize) -> usize {
        (cell.row * self.width + cell.col) * KERNEL_SIZE + k
    }

    pub fn weights(&self) -> Weights {
        self.weights
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn agent(&self) -> Agent {
        self.agent
    }

    pub fn bounds(&self) -> EnergeticsBounds {
        self.bounds
    }

    /// The goal the heuristic table is pinned to, if any.
    pub fn goal(&self) -> Option<Cell> {
        self.heuristic.as_ref().map(|h| h.goal)
    }

    /// Whether the cache still matches the grid it was built from.
    pub fn is_current(&self, grid: &TerrainGrid) -> bool {
        grid.revision() == self.grid_revision
            && grid.width() == self.width
            && grid.height() == self.height
    }

    pub fn ensure_current(&self, grid: &TerrainGrid) -> TraxResult<()> {
        if self.is_current(grid) {
            Ok(())
        } else {
            Err(TraxError::CacheInvalid(format!(
                "grid revision {} does not match cached revision {}",
                grid.revision(),
                self.grid_revision
            )))
        }
    }

    /// Metric cost of the edge leaving `cell` by kernel move `k`.
    #[inline]
    pub fn edge(&self, cell: Cell, k: usize) -> EdgeCost {
        let i = self.edge_idx(cell, k);
        EdgeCost {
            distance_m: self.distance[i],
            time_s: self.time[i],
            energy_j: self.energy[i],
        }
    }

    /// Scalar cost `w · (distance, time, energy)` of the edge, `+∞` where
    /// the move is not reachable.
    #[inline]
    pub fn scalar_edge_cost(&self, cell: Cell, k: usize) -> f64 {
        let i = self.edge_idx(cell, k);
        self.weights.distance * self.distance[i]
            + self.weights.time * self.time[i]
            + self.weights.energy * self.energy[i]
    }

    /// Build (or rebuild) the heuristic table for `goal`.
    ///
    /// The heuristic is the octile planar distance to the goal scaled by
    /// the admissible per-metre scalar bound and the inflation factor.
    pub fn pin_goal(&mut self, grid: &TerrainGrid, goal: Cell) -> TraxResult<()> {
        self.ensure_current(grid)?;
        if !grid.contains(goal) {
            return Err(TraxError::OutOfBounds { cell: goal });
        }
        if self.goal() == Some(goal) {
            return Ok(());
        }
        let per_metre = self.weights.distance
            + self.weights.time / self.bounds.max_speed
            + self.weights.energy * self.bounds.min_energy_per_metre;
        let scale = self.alpha * per_metre * grid.resolution();
        let width = self.width;
        let mut values = vec![0.0; self.width * self.height];
        values
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(row, out)| {
                let dr = row.abs_diff(goal.row) as f64;
                for (col, slot) in out.iter_mut().enumerate() {
                    let dc = col.abs_diff(goal.col) as f64;
                    let short = dr.min(dc);
                    let long = dr.max(dc);
                    let oct = std::f64::consts::SQRT_2 * short + (long - short);
                    *slot = scale * oct;
                }
            });
        debug!(goal = %goal, "heuristic table pinned");
        self.heuristic = Some(HeuristicTable { goal, values });
        Ok(())
    }

    /// Drop the pinned heuristic (goal change pending).
    pub fn clear_goal(&mut self) {
        self.heuristic = None;
    }

    /// Heuristic value at `cell` toward the pinned goal.
    ///
    /// Only meaningful after [`CostCache::pin_goal`]; without a pinned goal
    /// this returns zero, which keeps the search correct but uninformed.
    #[inline]
    pub fn heuristic(&self, cell: Cell) -> f64 {
        match &self.heuristic {
            Some(table) => table.values[cell.row * self.width + cell.col],
            None => 0.0,
        }
    }

    /// Re-derive the edge entries whose source or destination lies in
    /// `changed`, after an obstacle edit on `grid`. The heuristic table is
    /// deliberately untouched: obstacles do not change the lower bound.
    pub fn patch_obstacles(&mut self, grid: &TerrainGrid, changed: &[Cell]) -> TraxResult<()> {
        if grid.width() != self.width || grid.height() != self.height {
            return Err(TraxError::CacheInvalid(
                "grid extent changed under the cache".into(),
            ));
        }
        for &p in changed {
            // Edges out of p.
            for k in 0..KERNEL_SIZE {
                let (d, t, e) = edge_layers(grid, self.agent, p, k);
                let i = self.edge_idx(p, k);
                self.distance[i] = d;
                self.time[i] = t;
                self.energy[i] = e;
            }
            // Edges into p: the source sits one inverse kernel step away.
            for (k, &(dr, dc)) in trax_core::kernel::OFFSETS.iter().enumerate() {
                let row = p.row as i64 - dr as i64;
                let col = p.col as i64 - dc as i64;
                if row < 0 || col < 0 {
                    continue;
                }
                let q = Cell::new(row as usize, col as usize);
                if !grid.contains(q) {
                    continue;
                }
                let (d, t, e) = edge_layers(grid, self.agent, q, k);
                let i = self.edge_idx(q, k);
                self.distance[i] = d;
                self.time[i] = t;
                self.energy[i] = e;
            }
        }
        self.grid_revision = grid.revision();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trax_core::{GridOrigin, Planet};

    fn flat(width: usize, height: usize) -> TerrainGrid {
        TerrainGrid::from_elevations(
            &vec![0.0; width * height],
            width,
            height,
            1.0,
            GridOrigin::local_planar(),
            Planet::Earth,
            35.0,
            None,
        )
        .unwrap()
    }

    fn energy_cache(grid: &TerrainGrid) -> CostCache {
        CostCache::build(grid, Agent::default(), Weights::energy_only(), 1.0).unwrap()
    }

    #[test]
    fn test_unreachable_edges_are_infinite() {
        let grid = flat(4, 4);
        let cache = energy_cache(&grid);
        // Kernel index 0 is (-1,-1): off-grid from the corner.
        assert!(!cache.edge(Cell::new(0, 0), 0).is_reachable());
        assert!(cache.scalar_edge_cost(Cell::new(0, 0), 0).is_infinite());
        assert!(cache.edge(Cell::new(1, 1), 0).is_reachable());
    }

    #[test]
    fn test_flat_edge_costs_match_energetics() {
        let grid = flat(4, 4);
        let cache = energy_cache(&grid);
        let straight = cache.edge(Cell::new(1, 1), 4); // (0, 1)
        let diagonal = cache.edge(Cell::new(1, 1), 7); // (1, 1)
        assert!((straight.distance_m - 1.0).abs() < 1e-12);
        assert!((diagonal.distance_m - std::f64::consts::SQRT_2).abs() < 1e-12);
        let (e1, v) = energy_and_speed(Agent::default(), 9.81, 1.0, Radians(0.0));
        assert!((straight.energy_j - e1.value()).abs() < 1e-9);
        assert!((straight.time_s - 1.0 / v.value()).abs() < 1e-12);
        // Diagonal cost is √2 times the straight cost on flat ground.
        assert!((diagonal.energy_j - e1.value() * std::f64::consts::SQRT_2).abs() < 1e-9);
    }

    #[test]
    fn test_sloped_edge_uses_atan2_of_rise() {
        // One metre of rise per cell along the columns.
        let samples: Vec<f64> = (0..2).flat_map(|_| (0..5).map(|c| c as f64)).collect();
        let grid = TerrainGrid::from_elevations(
            &samples,
            5,
            2,
            1.0,
            GridOrigin::local_planar(),
            Planet::Earth,
            50.0,
            None,
        )
        .unwrap();
        let cache = energy_cache(&grid);
        let up = cache.edge(Cell::new(0, 1), 4); // east, +1 m rise
        assert!((up.distance_m - std::f64::consts::SQRT_2).abs() < 1e-12);
        let (e, _) = energy_and_speed(
            Agent::default(),
            9.81,
            1.0,
            Radians(std::f64::consts::FRAC_PI_4),
        );
        assert!((up.energy_j - e.value()).abs() < 1e-9);
        // Descending the same edge is cheaper than climbing it.
        let down = cache.edge(Cell::new(0, 2), 3);
        assert!(down.energy_j < up.energy_j);
    }

    #[test]
    fn test_heuristic_is_octile_and_admissible_scale() {
        let grid = flat(5, 5);
        let mut cache = energy_cache(&grid);
        cache.pin_goal(&grid, Cell::new(4, 4)).unwrap();
        assert_eq!(cache.goal(), Some(Cell::new(4, 4)));
        assert_eq!(cache.heuristic(Cell::new(4, 4)), 0.0);
        let h00 = cache.heuristic(Cell::new(0, 0));
        let expected =
            4.0 * std::f64::consts::SQRT_2 * cache.bounds().min_energy_per_metre;
        assert!((h00 - expected).abs() < 1e-9);
        // Goal on the border: defined and non-negative everywhere.
        cache.pin_goal(&grid, Cell::new(0, 4)).unwrap();
        for row in 0..5 {
            for col in 0..5 {
                assert!(cache.heuristic(Cell::new(row, col)) >= 0.0);
            }
        }
    }

    #[test]
    fn test_alpha_inflates_heuristic() {
        let grid = flat(5, 5);
        let mut base = energy_cache(&grid);
        base.pin_goal(&grid, Cell::new(4, 4)).unwrap();
        let mut inflated =
            CostCache::build(&grid, Agent::default(), Weights::energy_only(), 2.5).unwrap();
        inflated.pin_goal(&grid, Cell::new(4, 4)).unwrap();
        let c = Cell::new(0, 0);
        assert!((inflated.heuristic(c) - 2.5 * base.heuristic(c)).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_alpha_rejected() {
        let grid = flat(3, 3);
        let err = CostCache::build(&grid, Agent::default(), Weights::energy_only(), 0.5);
        assert!(err.is_err());
    }

    #[test]
    fn test_stale_cache_detected() {
        let mut grid = flat(4, 4);
        let cache = energy_cache(&grid);
        assert!(cache.is_current(&grid));
        grid.set_obstacle_list(&[Cell::new(1, 1)], true).unwrap();
        assert!(!cache.is_current(&grid));
        assert_eq!(
            cache.ensure_current(&grid).unwrap_err().kind(),
            "cache_invalid"
        );
    }

    #[test]
    fn test_patch_obstacles_restores_currency() {
        let mut grid = flat(5, 5);
        let mut cache = energy_cache(&grid);
        cache.pin_goal(&grid, Cell::new(4, 4)).unwrap();
        let h_before = cache.heuristic(Cell::new(0, 0));

        let changed = grid.set_obstacle_list(&[Cell::new(2, 2)], true).unwrap();
        cache.patch_obstacles(&grid, &changed).unwrap();
        assert!(cache.is_current(&grid));
        // Every edge into the blocked cell is now infinite.
        assert!(!cache.edge(Cell::new(1, 1), 7).is_reachable());
        assert!(!cache.edge(Cell::new(2, 1), 4).is_reachable());
        // Edges elsewhere survive, and the heuristic is untouched.
        assert!(cache.edge(Cell::new(0, 0), 7).is_reachable());
        assert_eq!(cache.heuristic(Cell::new(0, 0)), h_before);

        // Clearing the obstacle and re-patching restores the edges.
        let changed = grid.set_obstacle_list(&[Cell::new(2, 2)], false).unwrap();
        cache.patch_obstacles(&grid, &changed).unwrap();
        assert!(cache.edge(Cell::new(1, 1), 7).is_reachable());
    }
}
