//! Solve run manifests: a JSON record of which scenario produced a
//! traverse output, under what settings, and what the traverse cost.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use trax_algo::Traverse;
use uuid::Uuid;

/// On-disk record of one `solve` run, written next to its output.
#[derive(Serialize, Deserialize)]
pub struct SolveManifest {
    pub run_id: String,
    pub version: String,
    pub timestamp: String,
    /// Scenario file the run solved.
    pub scenario: String,
    /// Terrain model the scenario named.
    pub model: String,
    /// Objective of the scalar edge cost (energy, time, distance).
    pub objective: String,
    /// Heuristic inflation the solve ran with; 1.0 means cost-optimal.
    pub alpha: f64,
    /// Output file and the format it was written in.
    pub output: String,
    pub format: String,
    /// Length and cumulative metrics of the returned traverse.
    pub cells: usize,
    pub distance_m: f64,
    pub duration_s: f64,
    pub energy_j: f64,
}

/// Record a manifest for a solved traverse. Returns the manifest path.
pub fn record_solve_manifest(
    output: &Path,
    scenario: &Path,
    model: &str,
    objective: &str,
    format: &str,
    traverse: &Traverse,
) -> Result<PathBuf> {
    let manifest = SolveManifest {
        run_id: Uuid::new_v4().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        scenario: scenario.display().to_string(),
        model: model.to_string(),
        objective: objective.to_string(),
        alpha: traverse.alpha,
        output: output.display().to_string(),
        format: format.to_string(),
        cells: traverse.cells.len(),
        distance_m: traverse.distance_m,
        duration_s: traverse.duration_s,
        energy_j: traverse.energy_j,
    };
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;
    let path = dir.join(format!("traverse-run-{}.json", manifest.run_id));
    let json = serde_json::to_string_pretty(&manifest)?;
    fs::write(&path, json + "\n").with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// Load a manifest written by [`record_solve_manifest`].
pub fn read_solve_manifest(path: &Path) -> Result<SolveManifest> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading manifest {}", path.display()))?;
    let manifest = serde_json::from_str(&json)
        .with_context(|| format!("parsing manifest {}", path.display()))?;
    Ok(manifest)
}
