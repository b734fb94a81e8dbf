//! Traverse result reporting: the JSON path-output contract and the
//! per-step CSV table.
//!
//! JSON shape: `{"path": [[row, col], …], "distance_m": …, "energy_j": …,
//! "duration_s": …, "alpha": …}`.

use crate::cost::CostCache;
use crate::solver::Traverse;
use anyhow::{Context, Result};
use serde_json::json;
use std::io::Write;
use std::path::Path;
use trax_core::kernel::offset_index;
use trax_core::TerrainGrid;

/// The path-output JSON document for a solved traverse.
pub fn traverse_json(traverse: &Traverse) -> serde_json::Value {
    let path: Vec<[usize; 2]> = traverse.cells.iter().map(|c| [c.row, c.col]).collect();
    json!({
        "path": path,
        "distance_m": traverse.distance_m,
        "energy_j": traverse.energy_j,
        "duration_s": traverse.duration_s,
        "alpha": traverse.alpha,
    })
}

/// Write the JSON path output to `path`.
pub fn write_traverse_json(out: &Path, traverse: &Traverse) -> Result<()> {
    let payload = serde_json::to_string_pretty(&traverse_json(traverse))
        .context("serializing traverse to JSON")?;
    std::fs::write(out, payload + "\n")
        .with_context(|| format!("writing traverse to {}", out.display()))?;
    Ok(())
}

/// Write the per-step CSV table: one row per visited cell with the edge
/// metrics spent to reach it (zero for the starting cell). Stations are
/// the traverse endpoints.
pub fn write_traverse_csv<W: Write>(
    writer: W,
    grid: &TerrainGrid,
    cache: &CostCache,
    traverse: &Traverse,
) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "is_station",
        "row",
        "col",
        "elevation_m",
        "distance_m",
        "energy_j",
        "duration_s",
    ])
    .context("writing CSV header")?;

    for (i, cell) in traverse.cells.iter().enumerate() {
        let (d, e, t) = if i == 0 {
            (0.0, 0.0, 0.0)
        } else {
            let prev = traverse.cells[i - 1];
            let dr = (cell.row as i64 - prev.row as i64) as i32;
            let dc = (cell.col as i64 - prev.col as i64) as i32;
            let k = offset_index(dr, dc)
                .context("traverse cells are not kernel-adjacent")?;
            let edge = cache.edge(prev, k);
            (edge.distance_m, edge.energy_j, edge.time_s)
        };
        let is_station = i == 0 || i == traverse.cells.len() - 1;
        let z = grid.elevation(*cell)?;
        csv.write_record([
            is_station.to_string(),
            cell.row.to_string(),
            cell.col.to_string(),
            format!("{z:.3}"),
            format!("{d:.3}"),
            format!("{e:.3}"),
            format!("{t:.3}"),
        ])
        .context("writing CSV row")?;
    }
    csv.flush().context("flushing CSV output")?;
    Ok(())
}
