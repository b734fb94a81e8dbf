//! Obstacle-maze loader: an 8-bit grayscale PNG where pixel value 0 marks
//! an obstacle and anything non-zero is free terrain. The result is a flat
//! zero-elevation grid at unit resolution with the obstacle mask applied
//! as explicit annotations.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::path::Path;
use tracing::debug;
use trax_core::{Cell, GridOrigin, Planet, TerrainGrid};

/// Load a PNG obstacle map into a terrain grid.
pub fn load_obstacle_map(path: &Path) -> Result<TerrainGrid> {
    let file = File::open(path)
        .with_context(|| format!("opening obstacle map {}", path.display()))?;
    let decoder = png::Decoder::new(file);
    let mut reader = decoder
        .read_info()
        .with_context(|| format!("decoding PNG header of {}", path.display()))?;
    let mut buf = vec![0u8; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .with_context(|| format!("decoding PNG frame of {}", path.display()))?;
    if info.color_type != png::ColorType::Grayscale {
        bail!(
            "obstacle map must be grayscale, {} is {:?}",
            path.display(),
            info.color_type
        );
    }
    if info.bit_depth != png::BitDepth::Eight {
        bail!(
            "obstacle map must be 8-bit, {} is {:?}",
            path.display(),
            info.bit_depth
        );
    }

    let width = info.width as usize;
    let height = info.height as usize;
    let pixels = &buf[..info.buffer_size()];

    // Flat unit-resolution terrain; slope can never mark an obstacle, so
    // passability is the annotation mask alone.
    let mut grid = TerrainGrid::from_elevations(
        &vec![0.0; width * height],
        width,
        height,
        1.0,
        GridOrigin::local_planar(),
        Planet::Earth,
        90.0,
        None,
    )?;

    let obstacles: Vec<Cell> = pixels
        .iter()
        .enumerate()
        .filter(|(_, value)| **value == 0)
        .map(|(i, _)| Cell::new(i / width, i % width))
        .collect();
    debug!(
        width,
        height,
        obstacles = obstacles.len(),
        "PNG obstacle map loaded"
    );
    grid.set_obstacle_list(&obstacles, true)?;
    Ok(grid)
}
