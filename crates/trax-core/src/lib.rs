//! # trax-core: Terrain and Energetics Core
//!
//! Fundamental data structures for planning walking traverses over gridded
//! digital elevation models: the terrain grid with its derived passability
//! tables, coordinate frames, physical-unit newtypes, the agent energetics
//! model, and the unified error type.
//!
//! ## Design Philosophy
//!
//! The 8-connected raster is modelled as dense row-major arrays indexed by
//! `(row, col)` and, for per-edge tables, a third kernel axis in the fixed
//! canonical order of [`kernel::OFFSETS`]. There is no graph library on the
//! hot path; the solver in `trax-algo` reads these tables directly.
//!
//! Ownership resolves the historical tangle between terrain, cost cache,
//! and solver: the cost cache borrows an immutable [`TerrainGrid`]; the
//! solver borrows both immutably for the duration of a solve; mutations go
//! through the grid's builder path and bump [`TerrainGrid::revision`],
//! which downstream caches check before serving.
//!
//! ## Quick Start
//!
//! ```rust
//! use trax_core::{Cell, GridOrigin, Planet, TerrainGrid};
//!
//! let grid = TerrainGrid::from_elevations(
//!     &vec![0.0; 25],
//!     5,
//!     5,
//!     1.0,
//!     GridOrigin::local_planar(),
//!     Planet::Earth,
//!     35.0,
//!     None,
//! )
//! .unwrap();
//! assert!(grid.is_passable(Cell::new(2, 2)));
//! ```

use serde::{Deserialize, Serialize};

pub mod energetics;
pub mod error;
pub mod frames;
pub mod kernel;
pub mod terrain;
pub mod units;

pub use energetics::{admissible_bounds, energy_and_speed, walking_speed, Agent, EnergeticsBounds, Planet};
pub use error::{TraxError, TraxResult};
pub use frames::{GeoPoint, Projection, UtmZone};
pub use terrain::{GridOrigin, SubWindow, TerrainGrid};
pub use units::{Degrees, Joules, Metres, MetresPerSecond, Radians, Seconds};

/// A grid cell: integer `(row, col)` indices, row 0 at the northern edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    #[inline]
    pub const fn new(row: usize, col: usize) -> Self {
        Cell { row, col }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
