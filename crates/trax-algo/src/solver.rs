//! Weighted A* over the 8-connected grid.
//!
//! The open set is a binary heap with lazy deletion: improved cells are
//! pushed again and stale entries are skipped on pop (closed, or carrying
//! a `g` worse than the cell's best). The priority key is `f = g + h` with
//! the heuristic already inflated by `α`; ties break on lower `h`, then on
//! FIFO insertion order, which makes the expansion sequence fully
//! deterministic. Cancellation and deadlines are checked between node
//! expansions and never mutate shared state.

use crate::cost::CostCache;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;
use trax_core::kernel::KERNEL_SIZE;
use trax_core::{Cell, TerrainGrid, TraxError, TraxResult};

/// Cooperative cancellation handle shared between a solve and its driver.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::Relaxed)
    }
}

/// Per-solve options: cancellation and deadline.
#[derive(Debug, Clone, Default)]
pub struct SolveOptions {
    pub cancel: Option<CancelToken>,
    pub deadline: Option<Instant>,
}

impl SolveOptions {
    fn interrupted(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// A solved traverse: the cell sequence plus cumulative metrics.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Traverse {
    pub cells: Vec<Cell>,
    pub distance_m: f64,
    pub duration_s: f64,
    pub energy_j: f64,
    /// Heuristic inflation the solve ran with; 1.0 means cost-optimal.
    pub alpha: f64,
    /// Number of node expansions (deterministic for identical inputs).
    pub expansions: usize,
}

impl Traverse {
    fn single(cell: Cell, alpha: f64) -> Self {
        Traverse {
            cells: vec![cell],
            distance_m: 0.0,
            duration_s: 0.0,
            energy_j: 0.0,
            alpha,
            expansions: 0,
        }
    }
}

/// Multi-waypoint failure: the solved prefix plus the failing segment.
#[derive(Debug, Error)]
#[error("waypoint segment {failed_segment} failed: {source}")]
pub struct SequenceError {
    /// Legs solved before the failure, in input order.
    pub prefix: Vec<Traverse>,
    /// Index of the waypoint pair that failed (0 = first pair).
    pub failed_segment: usize,
    #[source]
    pub source: TraxError,
}

const UNSEEN: u8 = 0;
const OPEN: u8 = 1;
const CLOSED: u8 = 2;

#[derive(Debug)]
struct OpenEntry {
    f: f64,
    h: f64,
    seq: u64,
    g: f64,
    idx: u32,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    // BinaryHeap is a max-heap; invert so the popped entry is the lowest
    // (f, h, seq) triple.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.h.total_cmp(&self.h))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Solve a single source→target pair against a prepared cache.
///
/// The cache must be current for `grid` and its heuristic pinned to
/// `target`; anything else is a `cache_invalid` error rather than a silent
/// recompute.
pub fn solve(
    grid: &TerrainGrid,
    cache: &CostCache,
    source: Cell,
    target: Cell,
    options: &SolveOptions,
) -> TraxResult<Traverse> {
    cache.ensure_current(grid)?;
    if cache.goal() != Some(target) {
        return Err(TraxError::CacheInvalid(format!(
            "heuristic is pinned to {:?}, solve requested toward {target}",
            cache.goal().map(|c| c.to_string()),
        )));
    }
    if !grid.is_passable(source) {
        grid.elevation(source)?; // surface out_of_bounds over endpoint_blocked
        return Err(TraxError::EndpointBlocked { cell: source });
    }
    if !grid.is_passable(target) {
        grid.elevation(target)?;
        return Err(TraxError::EndpointBlocked { cell: target });
    }
    if source == target {
        return Ok(Traverse::single(source, cache.alpha()));
    }
    // A source with no reachable neighbour can never leave its cell; report
    // it as a blocked endpoint rather than exhausting an empty open set.
    // (An enclosed *target* is indistinguishable from any other
    // disconnection and surfaces as no_path.)
    if (0..KERNEL_SIZE).all(|k| !grid.can_reach(source, k)) {
        return Err(TraxError::EndpointBlocked { cell: source });
    }

    let width = grid.width();
    let n = width * grid.height();
    let mut g_best = vec![f64::INFINITY; n];
    let mut status = vec![UNSEEN; n];
    let mut parent: Vec<(u32, u8)> = vec![(u32::MAX, 0); n];

    let cell_of = |idx: u32| Cell::new(idx as usize / width, idx as usize % width);
    let idx_of = |cell: Cell| (cell.row * width + cell.col) as u32;

    let mut heap = BinaryHeap::new();
    let mut seq: u64 = 0;
    let source_idx = idx_of(source);
    let target_idx = idx_of(target);
    g_best[source_idx as usize] = 0.0;
    status[source_idx as usize] = OPEN;
    heap.push(OpenEntry {
        f: cache.heuristic(source),
        h: cache.heuristic(source),
        seq,
        g: 0.0,
        idx: source_idx,
    });

    let mut expansions: usize = 0;
    while let Some(entry) = heap.pop() {
        let u_idx = entry.idx as usize;
        // Lazy deletion: drop entries for closed cells and entries made
        // stale by a later improvement.
        if status[u_idx] == CLOSED || entry.g > g_best[u_idx] {
            continue;
        }
        status[u_idx] = CLOSED;
        if entry.idx == target_idx {
            return Ok(reconstruct(
                grid, cache, source_idx, target_idx, &parent, expansions,
            ));
        }

        if options.interrupted() {
            return Err(TraxError::Cancelled { expansions });
        }
        expansions += 1;

        let u = cell_of(entry.idx);
        let g_u = g_best[u_idx];
        for k in 0..KERNEL_SIZE {
            let step_cost = cache.scalar_edge_cost(u, k);
            if !step_cost.is_finite() {
                continue;
            }
            let Some(v) = grid.step(u, k) else { continue };
            let v_idx = idx_of(v) as usize;
            let g_new = g_u + step_cost;
            if g_new < g_best[v_idx] {
                g_best[v_idx] = g_new;
                parent[v_idx] = (entry.idx, k as u8);
                if status[v_idx] == UNSEEN {
                    status[v_idx] = OPEN;
                }
                seq += 1;
                let h = cache.heuristic(v);
                heap.push(OpenEntry { f: g_new + h, h, seq, g: g_new, idx: v_idx as u32 });
            }
        }
    }

    debug!(%source, %target, expansions, "open set exhausted");
    Err(TraxError::NoPath { origin: source, target })
}

fn reconstruct(
    grid: &TerrainGrid,
    cache: &CostCache,
    source_idx: u32,
    target_idx: u32,
    parent: &[(u32, u8)],
    expansions: usize,
) -> Traverse {
    let width = grid.width();
    let mut cells = Vec::new();
    let mut idx = target_idx;
    while idx != source_idx {
        cells.push(Cell::new(idx as usize / width, idx as usize % width));
        idx = parent[idx as usize].0;
    }
    cells.push(Cell::new(source_idx as usize / width, source_idx as usize % width));
    cells.reverse();

    let mut traverse = Traverse {
        cells,
        distance_m: 0.0,
        duration_s: 0.0,
        energy_j: 0.0,
        alpha: cache.alpha(),
        expansions,
    };
    // Metrics are the sums of the cached per-edge layers along the path.
    let mut idx = target_idx;
    while idx != source_idx {
        let (p_idx, k) = parent[idx as usize];
        let p = Cell::new(p_idx as usize / width, p_idx as usize % width);
        let edge = cache.edge(p, k as usize);
        traverse.distance_m += edge.distance_m;
        traverse.duration_s += edge.time_s;
        traverse.energy_j += edge.energy_j;
        idx = p_idx;
    }
    traverse
}

/// Solve an ordered waypoint list pair-by-pair, sharing the edge layers
/// and re-pinning the heuristic whenever the goal changes.
///
/// The returned traverse is the concatenation of the legs with duplicate
/// join cells removed. On failure the solved prefix travels with the
/// error.
pub fn solve_sequence(
    grid: &TerrainGrid,
    cache: &mut CostCache,
    waypoints: &[Cell],
    options: &SolveOptions,
) -> Result<Traverse, SequenceError> {
    if waypoints.is_empty() {
        return Err(SequenceError {
            prefix: Vec::new(),
            failed_segment: 0,
            source: TraxError::Parse("waypoint list is empty".into()),
        });
    }
    if waypoints.len() == 1 {
        let only = waypoints[0];
        if !grid.is_passable(only) {
            return Err(SequenceError {
                prefix: Vec::new(),
                failed_segment: 0,
                source: TraxError::EndpointBlocked { cell: only },
            });
        }
        return Ok(Traverse::single(only, cache.alpha()));
    }

    let mut legs: Vec<Traverse> = Vec::with_capacity(waypoints.len() - 1);
    for (segment, pair) in waypoints.windows(2).enumerate() {
        let (from, to) = (pair[0], pair[1]);
        let result = cache
            .pin_goal(grid, to)
            .and_then(|()| solve(grid, cache, from, to, options));
        match result {
            Ok(leg) => legs.push(leg),
            Err(err) => {
                return Err(SequenceError {
                    prefix: legs,
                    failed_segment: segment,
                    source: err,
                })
            }
        }
    }

    let mut combined = Traverse {
        cells: Vec::new(),
        distance_m: 0.0,
        duration_s: 0.0,
        energy_j: 0.0,
        alpha: cache.alpha(),
        expansions: 0,
    };
    for leg in &legs {
        let skip_join = usize::from(!combined.cells.is_empty());
        combined.cells.extend_from_slice(&leg.cells[skip_join..]);
        combined.distance_m += leg.distance_m;
        combined.duration_s += leg.duration_s;
        combined.energy_j += leg.energy_j;
        combined.expansions += leg.expansions;
    }
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::Weights;
    use trax_core::{Agent, GridOrigin, Planet};

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

    fn prepared(grid: &TerrainGrid, goal: Cell) -> CostCache {
        let mut cache =
            CostCache::build(grid, Agent::default(), Weights::energy_only(), 1.0).unwrap();
        cache.pin_goal(grid, goal).unwrap();
        cache
    }

    #[test]
    fn test_source_equals_target() {
        let grid = flat(5, 5);
        let cache = prepared(&grid, Cell::new(2, 2));
        let t = solve(&grid, &cache, Cell::new(2, 2), Cell::new(2, 2), &SolveOptions::default())
            .unwrap();
        assert_eq!(t.cells, vec![Cell::new(2, 2)]);
        assert_eq!(t.distance_m, 0.0);
        assert_eq!(t.energy_j, 0.0);
        assert_eq!(t.expansions, 0);
    }

    #[test]
    fn test_kernel_adjacency_along_path() {
        let grid = flat(9, 9);
        let cache = prepared(&grid, Cell::new(8, 3));
        let t = solve(&grid, &cache, Cell::new(0, 6), Cell::new(8, 3), &SolveOptions::default())
            .unwrap();
        for pair in t.cells.windows(2) {
            let dr = pair[1].row as i64 - pair[0].row as i64;
            let dc = pair[1].col as i64 - pair[0].col as i64;
            assert!(trax_core::kernel::offset_index(dr as i32, dc as i32).is_some());
        }
        assert_eq!(*t.cells.first().unwrap(), Cell::new(0, 6));
        assert_eq!(*t.cells.last().unwrap(), Cell::new(8, 3));
    }

    #[test]
    fn test_goal_mismatch_is_cache_invalid() {
        let grid = flat(5, 5);
        let cache = prepared(&grid, Cell::new(4, 4));
        let err = solve(&grid, &cache, Cell::new(0, 0), Cell::new(3, 3), &SolveOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), "cache_invalid");
    }

    #[test]
    fn test_blocked_endpoint() {
        let mut grid = flat(5, 5);
        grid.set_obstacle_list(&[Cell::new(0, 0)], true).unwrap();
        let cache = prepared(&grid, Cell::new(4, 4));
        let err = solve(&grid, &cache, Cell::new(0, 0), Cell::new(4, 4), &SolveOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), "endpoint_blocked");
    }

    #[test]
    fn test_determinism() {
        let mut grid = flat(12, 12);
        grid.set_obstacle_disc(Cell::new(6, 6), 2.0, true).unwrap();
        let cache = prepared(&grid, Cell::new(11, 11));
        let a = solve(&grid, &cache, Cell::new(0, 0), Cell::new(11, 11), &SolveOptions::default())
            .unwrap();
        let b = solve(&grid, &cache, Cell::new(0, 0), Cell::new(11, 11), &SolveOptions::default())
            .unwrap();
        assert_eq!(a.cells, b.cells);
        assert_eq!(a.expansions, b.expansions);
    }

    #[test]
    fn test_cancel_before_start() {
        let grid = flat(30, 30);
        let cache = prepared(&grid, Cell::new(29, 29));
        let token = CancelToken::new();
        token.cancel();
        let options = SolveOptions { cancel: Some(token), deadline: None };
        let err =
            solve(&grid, &cache, Cell::new(0, 0), Cell::new(29, 29), &options).unwrap_err();
        assert_eq!(err.kind(), "cancelled");
    }

    #[test]
    fn test_expired_deadline() {
        let grid = flat(30, 30);
        let cache = prepared(&grid, Cell::new(29, 29));
        let options = SolveOptions { cancel: None, deadline: Some(Instant::now()) };
        let err =
            solve(&grid, &cache, Cell::new(0, 0), Cell::new(29, 29), &options).unwrap_err();
        assert_eq!(err.kind(), "cancelled");
    }

    #[test]
    fn test_sequence_concatenates_without_duplicate_joins() {
        let grid = flat(6, 6);
        let mut cache =
            CostCache::build(&grid, Agent::default(), Weights::energy_only(), 1.0).unwrap();
        let waypoints = [Cell::new(0, 0), Cell::new(0, 5), Cell::new(5, 5)];
        let t = solve_sequence(&grid, &mut cache, &waypoints, &SolveOptions::default()).unwrap();
        assert_eq!(*t.cells.first().unwrap(), Cell::new(0, 0));
        assert_eq!(*t.cells.last().unwrap(), Cell::new(5, 5));
        // 5 east + 5 south with the join cell appearing once.
        assert_eq!(t.cells.len(), 11);
        let joins = t.cells.iter().filter(|c| **c == Cell::new(0, 5)).count();
        assert_eq!(joins, 1);
    }

    #[test]
    fn test_sequence_reports_prefix_on_failure() {
        let mut grid = flat(7, 7);
        // Wall off the last waypoint completely.
        let ring: Vec<Cell> = (0..7)
            .flat_map(|i| [Cell::new(5, i), Cell::new(i, 5)])
            .collect();
        grid.set_obstacle_list(&ring, true).unwrap();
        let mut cache =
            CostCache::build(&grid, Agent::default(), Weights::energy_only(), 1.0).unwrap();
        let waypoints = [Cell::new(0, 0), Cell::new(4, 0), Cell::new(6, 6)];
        let err =
            solve_sequence(&grid, &mut cache, &waypoints, &SolveOptions::default()).unwrap_err();
        assert_eq!(err.failed_segment, 1);
        assert_eq!(err.prefix.len(), 1);
        assert_eq!(err.source.kind(), "no_path");
    }
}
