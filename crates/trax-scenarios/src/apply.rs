//! Materialise a scenario into a ready-to-solve planner.

use crate::spec::Scenario;
use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;
use trax_algo::{Planner, Weights};
use trax_core::{Agent, Cell, Planet};
use trax_io::load_model;

/// A scenario resolved against its terrain model.
pub struct MaterializedScenario {
    pub planner: Planner,
    pub start: Cell,
    pub end: Cell,
    pub start_heading_deg: f64,
}

/// Load the scenario's model, apply its obstacle annotations, resolve the
/// endpoints, and wrap everything in a planner.
///
/// `base_dir` anchors the scenario's relative model path (normally the
/// directory the scenario file came from).
pub fn materialize(
    scenario: &Scenario,
    base_dir: &Path,
    agent: Agent,
    weights: Weights,
    alpha: f64,
) -> Result<MaterializedScenario> {
    let model_path = base_dir.join(&scenario.model);
    let planet = scenario.planet.unwrap_or(Planet::Earth);
    let mut grid = load_model(&model_path, planet, scenario.max_slope)
        .with_context(|| format!("loading model '{}'", scenario.model))?;

    if let Some(rows) = &scenario.obstacles {
        let mask_width = rows.first().map(Vec::len).unwrap_or(0);
        if rows.len() != grid.height() || mask_width != grid.width() {
            bail!(
                "'obstacles' grid is {}x{}, model is {}x{}",
                rows.len(),
                mask_width,
                grid.height(),
                grid.width()
            );
        }
        let cells: Vec<Cell> = rows
            .iter()
            .enumerate()
            .flat_map(|(r, row)| {
                row.iter()
                    .enumerate()
                    .filter(|(_, v)| **v != 0)
                    .map(move |(c, _)| Cell::new(r, c))
            })
            .collect();
        grid.set_obstacle_list(&cells, true)
            .context("applying scenario obstacle grid")?;
    } else if let Some(list) = &scenario.obstacles_list {
        let cells: Vec<Cell> = list.iter().map(|[r, c]| Cell::new(*r, *c)).collect();
        grid.set_obstacle_list(&cells, true)
            .context("applying scenario obstacle list")?;
    }

    let start = scenario
        .resolve_point(&grid, scenario.start)
        .context("resolving scenario start point")?;
    let end = scenario
        .resolve_point(&grid, scenario.end)
        .context("resolving scenario end point")?;
    info!(%start, %end, model = %scenario.model, "scenario materialised");

    let mut planner = Planner::new(grid, agent, weights, alpha);
    planner.set_start(trax_core::GeoPoint::RowCol { row: start.row, col: start.col })?;
    planner.set_goal(trax_core::GeoPoint::RowCol { row: end.row, col: end.col })?;

    Ok(MaterializedScenario { planner, start, end, start_heading_deg: scenario.start_heading })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::CoordinateSystem;
    use std::fs;
    use trax_algo::SolveOptions;

    fn write_model(dir: &Path) -> String {
        let body = "cellsize 1\n\
                    0 0 0 0 0\n\
                    0 0 0 0 0\n\
                    0 0 0 0 0\n\
                    0 0 0 0 0\n\
                    0 0 0 0 0\n";
        fs::write(dir.join("flat.txt"), body).unwrap();
        "flat.txt".into()
    }

    fn scenario(model: String) -> Scenario {
        Scenario {
            model,
            max_slope: 35.0,
            start: [0.0, 0.0],
            end: [4.0, 4.0],
            coordinate_system: CoordinateSystem::RowCol,
            start_heading: 0.0,
            planet: None,
            obstacles: None,
            obstacles_list: None,
        }
    }

    #[test]
    fn test_materialize_and_solve() {
        let dir = tempfile::tempdir().unwrap();
        let scenario = scenario(write_model(dir.path()));
        let mut m = materialize(
            &scenario,
            dir.path(),
            Agent::default(),
            Weights::energy_only(),
            1.0,
        )
        .unwrap();
        assert_eq!(m.start, Cell::new(0, 0));
        assert_eq!(m.end, Cell::new(4, 4));
        let t = m.planner.find_path(&SolveOptions::default()).unwrap();
        assert_eq!(t.cells.len(), 5);
    }

    #[test]
    fn test_obstacle_grid_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = scenario(write_model(dir.path()));
        let mut mask = vec![vec![0u8; 5]; 5];
        // Wall on the diagonal's middle.
        mask[2] = vec![0, 1, 1, 1, 0];
        s.obstacles = Some(mask);
        let mut m =
            materialize(&s, dir.path(), Agent::default(), Weights::energy_only(), 1.0).unwrap();
        let t = m.planner.find_path(&SolveOptions::default()).unwrap();
        assert!(t.cells.len() > 5, "wall forces a detour");
        assert!(!t.cells.contains(&Cell::new(2, 2)));
    }

    #[test]
    fn test_obstacle_grid_extent_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = scenario(write_model(dir.path()));
        s.obstacles = Some(vec![vec![0, 1], vec![1, 0]]);
        let err = materialize(&s, dir.path(), Agent::default(), Weights::energy_only(), 1.0);
        assert!(err.is_err());
    }

    #[test]
    fn test_missing_model_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let s = scenario("absent.txt".into());
        assert!(
            materialize(&s, dir.path(), Agent::default(), Weights::energy_only(), 1.0).is_err()
        );
    }
}
