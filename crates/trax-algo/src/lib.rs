//! # trax-algo: Traverse Cost Modelling and Search
//!
//! Builds the dense per-edge cost tables and admissible heuristic over a
//! `trax-core` terrain grid, and runs weighted A* against them.
//!
//! ## Pipeline
//!
//! 1. [`cost::CostCache::build`] precomputes distance/time/energy for every
//!    kernel edge (row-parallel via rayon).
//! 2. [`cost::CostCache::pin_goal`] fills the heuristic table for a goal.
//! 3. [`solver::solve`] / [`solver::solve_sequence`] consume the cache as a
//!    read-only oracle; [`planner::Planner`] orchestrates the lifecycle for
//!    drivers (CLI, network server).
//!
//! Concurrency follows the single-writer/many-reader rule: a grid and its
//! cache are immutable during solves, so independent solves against the
//! same pair may run on separate threads; mutation re-enters the builder
//! path through the planner.
//!
//! [`connectivity`] offers island diagnostics over the passable graph,
//! deliberately kept off the solver hot path.

pub mod connectivity;
pub mod cost;
pub mod planner;
pub mod report;
pub mod solver;

pub use connectivity::{grid_stats, passable_components, ComponentMap, GridStats};
pub use cost::{CostCache, EdgeCost, Weights};
pub use planner::{Planner, PlannerState};
pub use solver::{solve, solve_sequence, CancelToken, SequenceError, SolveOptions, Traverse};
