//! The canonical 8-neighbour search kernel.
//!
//! Every `[row][col][k]` table in the system (reach, edge costs) indexes its
//! third axis in the order given by [`OFFSETS`]. The order is part of the
//! on-disk contract of persisted caches; changing it is a breaking change.

/// Number of kernel offsets.
pub const KERNEL_SIZE: usize = 8;

/// The eight `(Δrow, Δcol)` offsets in canonical order.
pub const OFFSETS: [(i32, i32); KERNEL_SIZE] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

const SQRT_2: f64 = std::f64::consts::SQRT_2;

/// Planar step length of each offset in cell units (1 or √2), in the same
/// canonical order as [`OFFSETS`].
pub const STEP_LENGTHS: [f64; KERNEL_SIZE] = [SQRT_2, 1.0, SQRT_2, 1.0, 1.0, SQRT_2, 1.0, SQRT_2];

/// Kernel index of the offset that leads from `from` to `to`, if the two
/// cells are kernel-adjacent.
pub fn offset_index(d_row: i32, d_col: i32) -> Option<usize> {
    OFFSETS.iter().position(|&(dr, dc)| dr == d_row && dc == d_col)
}
