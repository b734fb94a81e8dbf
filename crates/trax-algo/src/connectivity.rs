//! Connectivity diagnostics over the passable graph.
//!
//! Off the solver hot path: used by the CLI's grid statistics and as a
//! pre-flight explanation when a solve comes back with `no_path` (the
//! endpoints sit in different islands). Union-find over the reach table.

use petgraph::unionfind::UnionFind;
use serde::Serialize;
use trax_core::kernel::KERNEL_SIZE;
use trax_core::{Cell, TerrainGrid};

/// Component labelling of the passable cells.
pub struct ComponentMap {
    width: usize,
    labels: Vec<Option<usize>>,
    sizes: Vec<usize>,
}

impl ComponentMap {
    /// Component id of a cell, `None` for impassable cells.
    pub fn component(&self, cell: Cell) -> Option<usize> {
        self.labels.get(cell.row * self.width + cell.col).copied().flatten()
    }

    /// Whether two cells are connected through passable terrain.
    pub fn connected(&self, a: Cell, b: Cell) -> bool {
        match (self.component(a), self.component(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    pub fn component_count(&self) -> usize {
        self.sizes.len()
    }

    /// Component sizes, largest first.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }
}

/// Label the connected components of the passable graph.
pub fn passable_components(grid: &TerrainGrid) -> ComponentMap {
    let width = grid.width();
    let n = width * grid.height();
    let mut uf = UnionFind::<usize>::new(n);
    for row in 0..grid.height() {
        for col in 0..width {
            let cell = Cell::new(row, col);
            if !grid.is_passable(cell) {
                continue;
            }
            for k in 0..KERNEL_SIZE {
                if grid.can_reach(cell, k) {
                    if let Some(dest) = grid.step(cell, k) {
                        uf.union(row * width + col, dest.row * width + dest.col);
                    }
                }
            }
        }
    }

    let mut rep_to_id: std::collections::HashMap<usize, usize> = std::collections::HashMap::new();
    let mut labels = vec![None; n];
    let mut sizes: Vec<usize> = Vec::new();
    for row in 0..grid.height() {
        for col in 0..width {
            let cell = Cell::new(row, col);
            if !grid.is_passable(cell) {
                continue;
            }
            let rep = uf.find(row * width + col);
            let next_id = sizes.len();
            let id = *rep_to_id.entry(rep).or_insert(next_id);
            if id == sizes.len() {
                sizes.push(0);
            }
            sizes[id] += 1;
            labels[row * width + col] = Some(id);
        }
    }

    // Relabel so component 0 is the largest.
    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by_key(|&id| std::cmp::Reverse(sizes[id]));
    let mut remap = vec![0usize; sizes.len()];
    for (new_id, &old_id) in order.iter().enumerate() {
        remap[old_id] = new_id;
    }
    for label in labels.iter_mut().flatten() {
        *label = remap[*label];
    }
    let mut sorted_sizes = sizes.clone();
    sorted_sizes.sort_unstable_by_key(|&s| std::cmp::Reverse(s));

    ComponentMap { width, labels, sizes: sorted_sizes }
}

/// Summary statistics of a grid, for diagnostics and the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct GridStats {
    pub width: usize,
    pub height: usize,
    pub resolution_m: f64,
    pub valid_cells: usize,
    pub passable_cells: usize,
    pub obstacle_cells: usize,
    pub components: usize,
    pub largest_component: usize,
}

pub fn grid_stats(grid: &TerrainGrid) -> GridStats {
    let components = passable_components(grid);
    let valid = grid.valid_count();
    let passable = grid.passable_count();
    GridStats {
        width: grid.width(),
        height: grid.height(),
        resolution_m: grid.resolution(),
        valid_cells: valid,
        passable_cells: passable,
        obstacle_cells: valid - passable,
        components: components.component_count(),
        largest_component: components.sizes().first().copied().unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trax_core::{GridOrigin, Planet};

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

    #[test]
    fn test_flat_grid_is_one_component() {
        let map = passable_components(&flat(6, 6));
        assert_eq!(map.component_count(), 1);
        assert_eq!(map.sizes(), &[36]);
        assert!(map.connected(Cell::new(0, 0), Cell::new(5, 5)));
    }

    #[test]
    fn test_wall_splits_components() {
        let mut grid = flat(5, 5);
        let wall: Vec<Cell> = (0..5).map(|r| Cell::new(r, 2)).collect();
        grid.set_obstacle_list(&wall, true).unwrap();
        let map = passable_components(&grid);
        assert_eq!(map.component_count(), 2);
        assert_eq!(map.sizes(), &[10, 10]);
        assert!(!map.connected(Cell::new(0, 0), Cell::new(0, 4)));
        assert!(map.connected(Cell::new(0, 0), Cell::new(4, 1)));
        assert_eq!(map.component(Cell::new(2, 2)), None);
    }

    #[test]
    fn test_stats_counts() {
        let mut grid = flat(4, 4);
        grid.set_obstacle_list(&[Cell::new(0, 0)], true).unwrap();
        let stats = grid_stats(&grid);
        assert_eq!(stats.valid_cells, 16);
        assert_eq!(stats.passable_cells, 15);
        assert_eq!(stats.obstacle_cells, 1);
        assert_eq!(stats.components, 1);
        assert_eq!(stats.largest_component, 15);
    }
}
