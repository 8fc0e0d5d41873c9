//! Piecewise-linear `(x, y)` curves used for time-dependent outgassing,
//! opacity and sticking.

use serde::{Deserialize, Serialize};

/// A user-supplied piecewise-linear curve with optional log-space
/// interpolation/extrapolation, controlled by four independent flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    /// Sorted ascending by `.0` (x).
    pub points: Vec<(f64, f64)>,
    pub log_x_interp: bool,
    pub log_y_interp: bool,
    pub log_x_extrap: bool,
    pub log_y_extrap: bool,
}

impl Parameter {
    pub fn constant(y: f64) -> Self {
        Parameter {
            points: vec![(0.0, y)],
            log_x_interp: false,
            log_y_interp: false,
            log_x_extrap: false,
            log_y_extrap: false,
        }
    }

    /// Evaluate the curve at `x`, interpolating between bracketing points or
    /// extrapolating past the first/last point, honoring the log flags.
    pub fn value_at(&self, x: f64) -> f64 {
        debug_assert!(!self.points.is_empty());
        if self.points.len() == 1 {
            return self.points[0].1;
        }

        if x <= self.points[0].0 {
            if x == self.points[0].0 {
                return self.points[0].1;
            }
            return self.extrapolate(self.points[0], self.points[1], x, self.log_x_extrap, self.log_y_extrap);
        }
        if x >= self.points[self.points.len() - 1].0 {
            let last = self.points[self.points.len() - 1];
            if x == last.0 {
                return last.1;
            }
            let prev = self.points[self.points.len() - 2];
            return self.extrapolate(prev, last, x, self.log_x_extrap, self.log_y_extrap);
        }

        let idx = match self.points.binary_search_by(|p| p.0.partial_cmp(&x).unwrap()) {
            Ok(i) => return self.points[i].1,
            Err(i) => i,
        };
        let (x0, y0) = self.points[idx - 1];
        let (x1, y1) = self.points[idx];
        interp(x0, y0, x1, y1, x, self.log_x_interp, self.log_y_interp)
    }

    fn extrapolate(&self, a: (f64, f64), b: (f64, f64), x: f64, log_x: bool, log_y: bool) -> f64 {
        interp(a.0, a.1, b.0, b.1, x, log_x, log_y)
    }
}

fn interp(x0: f64, y0: f64, x1: f64, y1: f64, x: f64, log_x: bool, log_y: bool) -> f64 {
    let (px0, px1, px) = if log_x { (x0.ln(), x1.ln(), x.ln()) } else { (x0, x1, x) };
    let (py0, py1) = if log_y { (y0.ln(), y1.ln()) } else { (y0, y1) };
    let t = if (px1 - px0).abs() < f64::EPSILON { 0.0 } else { (px - px0) / (px1 - px0) };
    let y = py0 + t * (py1 - py0);
    if log_y {
        y.exp()
    } else {
        y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_is_flat() {
        let p = Parameter::constant(5.0);
        assert_eq!(p.value_at(-10.0), 5.0);
        assert_eq!(p.value_at(100.0), 5.0);
    }

    #[test]
    fn linear_interpolation() {
        let p = Parameter {
            points: vec![(0.0, 0.0), (10.0, 100.0)],
            log_x_interp: false,
            log_y_interp: false,
            log_x_extrap: false,
            log_y_extrap: false,
        };
        assert!((p.value_at(5.0) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn linear_extrapolation_past_last_point() {
        let p = Parameter {
            points: vec![(0.0, 0.0), (10.0, 100.0)],
            log_x_interp: false,
            log_y_interp: false,
            log_x_extrap: false,
            log_y_extrap: false,
        };
        assert!((p.value_at(20.0) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn log_y_interpolation() {
        let p = Parameter {
            points: vec![(0.0, 1.0), (10.0, 100.0)],
            log_x_interp: false,
            log_y_interp: true,
            log_x_extrap: false,
            log_y_extrap: false,
        };
        // at the midpoint, log-space interpolation gives the geometric mean
        assert!((p.value_at(5.0) - 10.0).abs() < 1e-6);
    }
}
