//! Integrated-desorption tables: cumulative integral of a time-dependent
//! outgassing parameter from 0 to `latest_moment`.

use crate::model::Parameter;

/// Number of trapezoid subdivisions per non-flat segment.
const SUBDIVISIONS: usize = 20;
/// mbar*l/s -> Pa*m3/s.
const MBAR_L_PER_S_TO_PA_M3_PER_S: f64 = 0.100;

/// `(time, cumulative molecules)` pairs, strictly increasing.
#[derive(Debug, Clone)]
pub struct Id {
    pub param_id: u32,
    pub points: Vec<(f64, f64)>,
}

impl Id {
    pub fn build(param_id: u32, parameter: &Parameter, latest_moment: f64) -> Self {
        let mut knots: Vec<f64> = parameter.points.iter().map(|p| p.0).filter(|&x| x > 0.0 && x < latest_moment).collect();
        knots.push(0.0);
        knots.push(latest_moment);
        knots.sort_by(|a, b| a.partial_cmp(b).unwrap());
        knots.dedup_by(|a, b| (*a - *b).abs() < 1e-12);

        let mut points = vec![(0.0, 0.0)];
        for w in knots.windows(2) {
            let (t0, t1) = (w[0], w[1]);
            if t1 <= t0 {
                continue;
            }
            let y0 = parameter.value_at(t0);
            let y1 = parameter.value_at(t1);
            let cumulative_before = points.last().unwrap().1;

            if (y1 - y0).abs() < 1e-12 {
                let added = (t1 - t0) * y0 * MBAR_L_PER_S_TO_PA_M3_PER_S;
                points.push((t1, cumulative_before + added));
            } else {
                let dt = (t1 - t0) / SUBDIVISIONS as f64;
                let mut running = cumulative_before;
                let mut prev_t = t0;
                let mut prev_y = y0 * MBAR_L_PER_S_TO_PA_M3_PER_S;
                for k in 1..=SUBDIVISIONS {
                    let t = t0 + dt * k as f64;
                    let y = parameter.value_at(t) * MBAR_L_PER_S_TO_PA_M3_PER_S;
                    running += 0.5 * (prev_y + y) * dt;
                    points.push((t, running));
                    prev_t = t;
                    prev_y = y;
                }
                let _ = prev_t;
            }
        }

        Id { param_id, points }
    }

    pub fn total(&self) -> f64 {
        self.points.last().map(|p| p.1).unwrap_or(0.0)
    }

    /// Invert by piecewise-linear interpolation; extrapolation is allowed
    /// at the tails.
    pub fn sample_time(&self, cumulative: f64) -> f64 {
        let pts = &self.points;
        debug_assert!(pts.len() >= 2);
        if cumulative <= pts[0].1 {
            let (x0, y0) = pts[0];
            let (x1, y1) = pts[1];
            return lerp_x(x0, y0, x1, y1, cumulative);
        }
        let last = pts.len() - 1;
        if cumulative >= pts[last].1 {
            let (x0, y0) = pts[last - 1];
            let (x1, y1) = pts[last];
            return lerp_x(x0, y0, x1, y1, cumulative);
        }
        let idx = match pts.binary_search_by(|p| p.1.partial_cmp(&cumulative).unwrap()) {
            Ok(i) => return pts[i].0,
            Err(i) => i,
        };
        let (x0, y0) = pts[idx - 1];
        let (x1, y1) = pts[idx];
        lerp_x(x0, y0, x1, y1, cumulative)
    }
}

fn lerp_x(x0: f64, y0: f64, x1: f64, y1: f64, y: f64) -> f64 {
    if (y1 - y0).abs() < f64::EPSILON {
        x0
    } else {
        x0 + (x1 - x0) * (y - y0) / (y1 - y0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_rate_integrates_linearly() {
        let p = Parameter::constant(2.0);
        let id = Id::build(0, &p, 10.0);
        assert!((id.total() - 10.0 * 2.0 * MBAR_L_PER_S_TO_PA_M3_PER_S).abs() < 1e-9);
    }

    #[test]
    fn sample_time_inverts_monotonic_id() {
        let p = Parameter {
            points: vec![(0.0, 1.0), (5.0, 3.0), (10.0, 1.0)],
            log_x_interp: false,
            log_y_interp: false,
            log_x_extrap: false,
            log_y_extrap: false,
        };
        let id = Id::build(0, &p, 10.0);
        let mid = id.total() / 2.0;
        let t = id.sample_time(mid);
        assert!(t >= 0.0 && t <= 10.0);
    }
}
