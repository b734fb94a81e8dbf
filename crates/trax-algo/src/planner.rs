//! Driver-facing orchestration of grid, cost cache, and solver.
//!
//! The planner owns the terrain grid and the cache built over it, and is
//! the single writer: every mutation goes through it, so the invalidation
//! discipline of the cache is enforced in one place. Obstacle edits patch
//! the affected cache entries synchronously (heuristic untouched), which
//! keeps the cache current; structural changes (clearing obstacles,
//! changing the max slope) drop the cache and return the planner to idle.
//!
//! Lifecycle: `idle → caching_edges → cached → caching_heuristic → ready
//! → running → {ready, idle}`. A goal change from `ready` re-enters
//! `caching_heuristic`.

use crate::cost::{CostCache, Weights};
use crate::solver::{self, SequenceError, SolveOptions, Traverse};
use tracing::info;
use trax_core::{Agent, Cell, GeoPoint, TerrainGrid, TraxError, TraxResult};

/// Lifecycle state of a [`Planner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerState {
    Idle,
    CachingEdges,
    Cached,
    CachingHeuristic,
    Ready,
    Running,
}

/// Owns a grid, an agent, and the cache built over them; drives solves.
pub struct Planner {
    grid: TerrainGrid,
    agent: Agent,
    weights: Weights,
    alpha: f64,
    cache: Option<CostCache>,
    start: Option<Cell>,
    goal: Option<Cell>,
    state: PlannerState,
}

impl Planner {
    pub fn new(grid: TerrainGrid, agent: Agent, weights: Weights, alpha: f64) -> Self {
        Planner {
            grid,
            agent,
            weights,
            alpha,
            cache: None,
            start: None,
            goal: None,
            state: PlannerState::Idle,
        }
    }

    pub fn grid(&self) -> &TerrainGrid {
        &self.grid
    }

    pub fn agent(&self) -> Agent {
        self.agent
    }

    pub fn weights(&self) -> Weights {
        self.weights
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn state(&self) -> PlannerState {
        self.state
    }

    pub fn start(&self) -> Option<Cell> {
        self.start
    }

    pub fn goal(&self) -> Option<Cell> {
        self.goal
    }

    /// Borrow the prepared cache (present from `cached` onward).
    pub fn cache(&self) -> Option<&CostCache> {
        self.cache.as_ref()
    }

    /// Resolve and set the solve start point.
    pub fn set_start(&mut self, point: GeoPoint) -> TraxResult<Cell> {
        let cell = self.grid.to_cell(point)?;
        self.start = Some(cell);
        Ok(cell)
    }

    /// Resolve and set the solve goal; a pinned heuristic for a different
    /// goal falls back to `cached`.
    pub fn set_goal(&mut self, point: GeoPoint) -> TraxResult<Cell> {
        let cell = self.grid.to_cell(point)?;
        self.goal = Some(cell);
        if let Some(cache) = self.cache.as_mut() {
            if cache.goal() != Some(cell) {
                cache.clear_goal();
                self.state = PlannerState::Cached;
            }
        }
        Ok(cell)
    }

    /// Build the edge-cost layers if they are missing or stale.
    pub fn cache_edges(&mut self) -> TraxResult<()> {
        let current = self
            .cache
            .as_ref()
            .is_some_and(|c| c.is_current(&self.grid));
        if current {
            return Ok(());
        }
        self.state = PlannerState::CachingEdges;
        let cache = CostCache::build(&self.grid, self.agent, self.weights, self.alpha)?;
        self.cache = Some(cache);
        self.state = PlannerState::Cached;
        Ok(())
    }

    /// Pin the heuristic to the configured goal.
    pub fn cache_heuristic(&mut self) -> TraxResult<()> {
        let goal = self
            .goal
            .ok_or_else(|| TraxError::CacheInvalid("no goal configured".into()))?;
        self.cache_edges()?;
        self.state = PlannerState::CachingHeuristic;
        let cache = self.cache.as_mut().expect("edge cache built above");
        match cache.pin_goal(&self.grid, goal) {
            Ok(()) => {
                self.state = PlannerState::Ready;
                Ok(())
            }
            Err(err) => {
                self.state = PlannerState::Cached;
                Err(err)
            }
        }
    }

    /// Bring the planner to `ready` (edges plus heuristic).
    pub fn prepare(&mut self) -> TraxResult<()> {
        self.cache_heuristic()
    }

    /// Solve the configured start→goal pair.
    pub fn find_path(&mut self, options: &SolveOptions) -> TraxResult<Traverse> {
        let start = self
            .start
            .ok_or_else(|| TraxError::CacheInvalid("no start configured".into()))?;
        let goal = self
            .goal
            .ok_or_else(|| TraxError::CacheInvalid("no goal configured".into()))?;
        self.prepare()?;
        self.state = PlannerState::Running;
        let cache = self.cache.as_ref().expect("prepared above");
        let result = solver::solve(&self.grid, cache, start, goal, options);
        self.state = PlannerState::Ready;
        if let Ok(traverse) = &result {
            info!(
                cells = traverse.cells.len(),
                distance_m = traverse.distance_m,
                energy_j = traverse.energy_j,
                "traverse solved"
            );
        }
        result
    }

    /// Solve an ordered list of waypoints, sharing the edge layers across
    /// segments.
    pub fn solve_waypoints(
        &mut self,
        waypoints: &[Cell],
        options: &SolveOptions,
    ) -> Result<Traverse, SequenceError> {
        if let Err(err) = self.cache_edges() {
            return Err(SequenceError { prefix: Vec::new(), failed_segment: 0, source: err });
        }
        self.state = PlannerState::Running;
        let cache = self.cache.as_mut().expect("edge cache built above");
        let result = solver::solve_sequence(&self.grid, cache, waypoints, options);
        self.goal = cache.goal();
        self.state = if self.goal.is_some() { PlannerState::Ready } else { PlannerState::Cached };
        result
    }

    /// Mark a filled disc as obstacle (or free). The cache is patched in
    /// the same call, so it stays current.
    pub fn set_obstacle_disc(
        &mut self,
        center: GeoPoint,
        radius_cells: f64,
        value: bool,
    ) -> TraxResult<usize> {
        let center = self.grid.to_cell(center)?;
        let changed = self.grid.set_obstacle_disc(center, radius_cells, value)?;
        self.patch_cache(&changed)?;
        Ok(changed.len())
    }

    /// Mark an explicit cell list as obstacle (or free), patching the cache.
    pub fn set_obstacle_cells(&mut self, cells: &[Cell], value: bool) -> TraxResult<usize> {
        let changed = self.grid.set_obstacle_list(cells, value)?;
        self.patch_cache(&changed)?;
        Ok(changed.len())
    }

    /// Reset obstacles to the max-slope rule. Structural: drops the cache.
    pub fn clear_obstacles(&mut self) {
        self.grid.clear_obstacles();
        self.cache = None;
        self.state = PlannerState::Idle;
    }

    /// Change the max-slope threshold. Structural: drops the cache.
    pub fn set_max_slope(&mut self, max_slope_deg: f64) {
        self.grid.set_max_slope(max_slope_deg);
        self.cache = None;
        self.state = PlannerState::Idle;
    }

    fn patch_cache(&mut self, changed: &[Cell]) -> TraxResult<()> {
        if changed.is_empty() {
            return Ok(());
        }
        if let Some(cache) = self.cache.as_mut() {
            cache.patch_obstacles(&self.grid, changed)?;
        }
        Ok(())
    }
}
