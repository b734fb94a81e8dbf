//! Unified error types for the TRAX ecosystem
//!
//! This module provides a common error type [`TraxError`] that can represent
//! errors from any part of the system. Every variant carries a stable
//! identifier (see [`TraxError::kind`]) which is what the CLI exit codes and
//! the wire protocol report, so the enum can grow without breaking callers
//! that match on kinds.

use crate::Cell;
use thiserror::Error;

/// Unified error type for all TRAX operations.
#[derive(Error, Debug)]
pub enum TraxError {
    /// Coordinate outside the grid.
    #[error("cell ({}, {}) is out of bounds", cell.row, cell.col)]
    OutOfBounds { cell: Cell },

    /// The raster carries no recognisable CRS and a lat/long or UTM query
    /// was issued against it.
    #[error("grid uses a unit planar frame; {query} queries are unsupported")]
    UnsupportedProjection { query: &'static str },

    /// Source or target cell of a solve is not passable.
    #[error("endpoint ({}, {}) is not passable", cell.row, cell.col)]
    EndpointBlocked { cell: Cell },

    /// No connected route exists between the endpoints.
    #[error("no path from ({}, {}) to ({}, {})", origin.row, origin.col, target.row, target.col)]
    NoPath { origin: Cell, target: Cell },

    /// A solve was requested against an out-of-date cost cache.
    #[error("cost cache is stale: {0}")]
    CacheInvalid(String),

    /// Solve was cancelled or timed out.
    #[error("solve cancelled after {expansions} expansions")]
    Cancelled { expansions: usize },

    /// Underlying raster/scenario file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raster/scenario file could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Convenience type alias for Results using TraxError.
pub type TraxResult<T> = Result<T, TraxError>;

impl TraxError {
    /// Stable identifier for the error kind, as used by the CLI exit codes
    /// and the wire protocol.
    pub fn kind(&self) -> &'static str {
        match self {
            TraxError::OutOfBounds { .. } => "out_of_bounds",
            TraxError::UnsupportedProjection { .. } => "unsupported_projection",
            TraxError::EndpointBlocked { .. } => "endpoint_blocked",
            TraxError::NoPath { .. } => "no_path",
            TraxError::CacheInvalid(_) => "cache_invalid",
            TraxError::Cancelled { .. } => "cancelled",
            TraxError::Io(_) => "io_error",
            TraxError::Parse(_) => "parse_error",
        }
    }
}

impl From<anyhow::Error> for TraxError {
    fn from(err: anyhow::Error) -> Self {
        TraxError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_identifiers_are_stable() {
        let err = TraxError::NoPath {
            origin: Cell::new(0, 0),
            target: Cell::new(4, 4),
        };
        assert_eq!(err.kind(), "no_path");
        assert_eq!(
            TraxError::EndpointBlocked { cell: Cell::new(1, 2) }.kind(),
            "endpoint_blocked"
        );
    }

    #[test]
    fn test_display_names_the_cells() {
        let err = TraxError::OutOfBounds { cell: Cell::new(9, 7) };
        assert!(err.to_string().contains("(9, 7)"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing raster");
        let err: TraxError = io_err.into();
        assert!(matches!(err, TraxError::Io(_)));
        assert_eq!(err.kind(), "io_error");
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> TraxResult<()> {
            Err(TraxError::Parse("bad header".into()))
        }

        fn outer() -> TraxResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
