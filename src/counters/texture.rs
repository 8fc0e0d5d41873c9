//! Per-facet texture grid accumulation. Three running sums per cell;
//! physical quantities (impingement rate, density, pressure) are derived
//! from these at export time, not stored directly.

use crate::model::facet::TextureGrid;

#[derive(Debug, Clone, Copy, Default)]
pub struct TextureCell {
    pub count_equiv: f64,
    pub sum_v_ort_per_area: f64,
    pub sum_1_per_v_ort: f64,
}

#[derive(Debug, Clone)]
pub struct TextureAccumulator {
    pub cells: Vec<TextureCell>,
}

impl TextureAccumulator {
    pub fn new(grid: &TextureGrid) -> Self {
        TextureAccumulator { cells: vec![TextureCell::default(); grid.cell_count()] }
    }

    /// Record a hit in cell `cell_idx`. `v_ort` is the velocity component
    /// orthogonal to the facet plane; `inc` is the cell's reciprocal area.
    pub fn record(&mut self, cell_idx: usize, v_ort: f64, inc: f64, weight: f64) {
        let cell = &mut self.cells[cell_idx];
        cell.count_equiv += weight;
        cell.sum_v_ort_per_area += weight * v_ort * inc;
        if v_ort > 0.0 {
            cell.sum_1_per_v_ort += weight / v_ort;
        }
    }

    /// Absorb uses a different `1/v_ort` weighting than Bounce (factor 2
    /// instead of 1); `sum_v_ort_per_area`'s weighting is unchanged.
    pub fn record_absorbed(&mut self, cell_idx: usize, v_ort: f64, inc: f64, weight: f64) {
        let cell = &mut self.cells[cell_idx];
        cell.count_equiv += weight;
        cell.sum_v_ort_per_area += weight * v_ort * inc;
        if v_ort > 0.0 {
            cell.sum_1_per_v_ort += 2.0 * weight / v_ort;
        }
    }

    pub fn merge_from(&mut self, other: &TextureAccumulator) {
        for (a, b) in self.cells.iter_mut().zip(other.cells.iter()) {
            a.count_equiv += b.count_equiv;
            a.sum_v_ort_per_area += b.sum_v_ort_per_area;
            a.sum_1_per_v_ort += b.sum_1_per_v_ort;
        }
    }

    /// Min/max of `sum_v_ort_per_area` over cells large enough to trust,
    /// used to autoscale texture display ranges.
    pub fn autoscale(&self, large_enough: &[bool]) -> Option<(f64, f64)> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut any = false;
        for (cell, &ok) in self.cells.iter().zip(large_enough.iter()) {
            if !ok {
                continue;
            }
            any = true;
            min = min.min(cell.sum_v_ort_per_area);
            max = max.max(cell.sum_v_ort_per_area);
        }
        if any {
            Some((min, max))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn autoscale_ignores_small_cells() {
        let grid = TextureGrid { width: 2, height: 1, inc: vec![1.0, 1.0], large_enough: vec![true, false] };
        let mut acc = TextureAccumulator::new(&grid);
        acc.record(0, 2.0, 1.0, 1.0);
        acc.record(1, 100.0, 1.0, 1.0);
        let (min, max) = acc.autoscale(&grid.large_enough).unwrap();
        assert_eq!(min, 2.0);
        assert_eq!(max, 2.0);
    }

    #[test]
    fn merge_sums_cells() {
        let grid = TextureGrid { width: 1, height: 1, inc: vec![1.0], large_enough: vec![true] };
        let mut a = TextureAccumulator::new(&grid);
        let mut b = TextureAccumulator::new(&grid);
        a.record(0, 1.0, 1.0, 1.0);
        b.record(0, 1.0, 1.0, 2.0);
        a.merge_from(&b);
        assert_eq!(a.cells[0].count_equiv, 3.0);
    }
}
