//! Per-cell average flow direction, recorded alongside the texture grid when
//! a facet's `count_direction` flag is set.

use cgmath::Vector3;

use crate::model::facet::TextureGrid;

#[derive(Debug, Clone, Copy)]
pub struct DirectionCell {
    pub sum_dir: Vector3<f64>,
    pub count: f64,
}

impl Default for DirectionCell {
    fn default() -> Self {
        DirectionCell { sum_dir: Vector3::new(0.0, 0.0, 0.0), count: 0.0 }
    }
}

#[derive(Debug, Clone)]
pub struct DirectionAccumulator {
    pub cells: Vec<DirectionCell>,
}

impl DirectionAccumulator {
    pub fn new(grid: &TextureGrid) -> Self {
        DirectionAccumulator { cells: vec![DirectionCell::default(); grid.cell_count()] }
    }

    /// `dir_times_speed` is the particle's velocity vector (direction scaled
    /// by speed) at the moment of the hit.
    pub fn record(&mut self, cell_idx: usize, dir_times_speed: Vector3<f64>, weight: f64) {
        let cell = &mut self.cells[cell_idx];
        cell.sum_dir += dir_times_speed * weight;
        cell.count += weight;
    }

    pub fn merge_from(&mut self, other: &DirectionAccumulator) {
        for (a, b) in self.cells.iter_mut().zip(other.cells.iter()) {
            a.sum_dir += b.sum_dir;
            a.count += b.count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_accumulates_weighted_vector_sum() {
        let grid = TextureGrid { width: 1, height: 1, inc: vec![1.0], large_enough: vec![true] };
        let mut acc = DirectionAccumulator::new(&grid);
        acc.record(0, Vector3::new(1.0, 0.0, 0.0), 2.0);
        acc.record(0, Vector3::new(0.0, 1.0, 0.0), 1.0);
        assert_eq!(acc.cells[0].sum_dir, Vector3::new(2.0, 1.0, 0.0));
        assert_eq!(acc.cells[0].count, 3.0);
    }

    #[test]
    fn merge_sums_cells() {
        let grid = TextureGrid { width: 1, height: 1, inc: vec![1.0], large_enough: vec![true] };
        let mut a = DirectionAccumulator::new(&grid);
        let mut b = DirectionAccumulator::new(&grid);
        a.record(0, Vector3::new(1.0, 0.0, 0.0), 1.0);
        b.record(0, Vector3::new(1.0, 0.0, 0.0), 1.0);
        a.merge_from(&b);
        assert_eq!(a.cells[0].count, 2.0);
    }
}
