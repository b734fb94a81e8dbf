//! # trax-io: Terrain Model Importers
//!
//! Loads elevation rasters and obstacle maps into `trax-core` terrain
//! grids. Three formats are supported, dispatched by file extension:
//!
//! | Extension | Loader | Contents |
//! |-----------|--------|----------|
//! | `.txt` | [`legacy`] | key/value header + whitespace-separated DEM |
//! | `.tif`, `.tiff` | [`geotiff`] | single-band GeoTIFF with geo tags |
//! | `.png` | [`obstacle_png`] | 8-bit grayscale maze, 0 = obstacle |
//!
//! Every elevation source reduces to the [`raster::RasterData`] contract;
//! the core never sees a file format.

pub mod geotiff;
pub mod legacy;
pub mod obstacle_png;
pub mod raster;

pub use obstacle_png::load_obstacle_map;
pub use raster::{load_model, open_raster, RasterData};
