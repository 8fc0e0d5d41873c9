//! Cumulative Maxwell-Boltzmann speed distribution per `(temperature,
//! gas_mass)`.

use super::{AMU, BOLTZMANN, GAS_CONSTANT};

/// `(speed, cumulative probability)` pairs, strictly increasing in both
/// components. Inversion happens at sample time, not here.
#[derive(Debug, Clone)]
pub struct Cdf {
    pub temperature: f64,
    pub points: Vec<(f64, f64)>,
}

impl Cdf {
    pub fn build(temperature: f64, gas_mass_g_per_mol: f64, bins: usize) -> Self {
        let a = (BOLTZMANN * temperature / (gas_mass_g_per_mol * AMU)).sqrt();
        let v_prob = (2.0 * GAS_CONSTANT * temperature / (gas_mass_g_per_mol / 1000.0)).sqrt();
        let bin_size = 4.0 * v_prob / bins as f64;

        let points = (0..bins)
            .map(|i| {
                let x = i as f64 * bin_size;
                let x2_2a2 = x * x / (2.0 * a * a);
                (x, 1.0 - (-x2_2a2).exp() * (x2_2a2 + 1.0))
            })
            .collect();

        Cdf { temperature, points }
    }

    /// Invert the CDF at `u` in `[0, 1)` by linear interpolation between
    /// bracketing bins, extrapolating past the last bin if `u` exceeds its
    /// cumulative value (rare, since the last bin approaches 1).
    pub fn sample(&self, u: f64) -> f64 {
        let pts = &self.points;
        debug_assert!(!pts.is_empty());
        if u <= pts[0].1 {
            return pts[0].0;
        }
        let last = pts.len() - 1;
        if u >= pts[last].1 {
            if pts.len() < 2 {
                return pts[last].0;
            }
            let (x0, y0) = pts[last - 1];
            let (x1, y1) = pts[last];
            return lerp_x(x0, y0, x1, y1, u);
        }
        let idx = match pts.binary_search_by(|p| p.1.partial_cmp(&u).unwrap()) {
            Ok(i) => return pts[i].0,
            Err(i) => i,
        };
        let (x0, y0) = pts[idx - 1];
        let (x1, y1) = pts[idx];
        lerp_x(x0, y0, x1, y1, u)
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
    fn cdf_is_monotonic_and_bounded() {
        let cdf = Cdf::build(300.0, 28.0, 100);
        let mut last = -1.0;
        for &(_, y) in &cdf.points {
            assert!(y >= last);
            assert!(y <= 1.0 + 1e-9);
            last = y;
        }
    }

    #[test]
    fn sample_roundtrips_through_cdf_approximately() {
        let cdf = Cdf::build(300.0, 28.0, 200);
        for &(x, y) in cdf.points.iter().skip(1) {
            let v = cdf.sample(y);
            assert!((v - x).abs() < x.max(1.0) * 0.05);
        }
    }
}
