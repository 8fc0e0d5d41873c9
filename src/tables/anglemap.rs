//! Per-facet recorded-angle-map 2D histogram: record incident (theta, phi)
//! hits, or invert it into an emission PDF.
//!
//! `theta_cdf` and `row_sums` are flat per-theta-bin vectors; `phi_cum` is
//! the dense `phi_width * theta_bin_count` array, built once per use-mode
//! transition and never mutated afterwards.

use std::f64::consts::PI;

use crate::model::facet::AngleMapParams;

/// Raw hit counts, moment-independent.
#[derive(Debug, Clone)]
pub struct AngleMapPdf {
    pub theta_bins: u32,
    pub phi_width: u32,
    pub counts: Vec<u64>,
}

impl AngleMapPdf {
    pub fn new(params: &AngleMapParams) -> Self {
        let theta_bins = params.theta_bin_count();
        AngleMapPdf {
            theta_bins,
            phi_width: params.phi_width,
            counts: vec![0; (theta_bins * params.phi_width) as usize],
        }
    }

    fn row(&self, theta_bin: u32) -> &[u64] {
        let w = self.phi_width as usize;
        let start = theta_bin as usize * w;
        &self.counts[start..start + w]
    }

    pub fn record(&mut self, params: &AngleMapParams, theta: f64, phi: f64) {
        let theta_bin = theta_bin_for(params, theta);
        let phi_bin = phi_bin_for(self.phi_width, phi);
        let idx = theta_bin as usize * self.phi_width as usize + phi_bin as usize;
        self.counts[idx] += 1;
    }

    pub fn merge_from(&mut self, other: &AngleMapPdf) {
        for (a, b) in self.counts.iter_mut().zip(other.counts.iter()) {
            *a += b;
        }
    }
}

pub fn theta_bin_for(params: &AngleMapParams, theta: f64) -> u32 {
    let theta = theta.max(0.0).min(PI / 2.0);
    if theta < params.theta_limit && params.theta_lower_res > 0 {
        let step = params.theta_limit / params.theta_lower_res as f64;
        ((theta / step).floor() as u32).min(params.theta_lower_res.saturating_sub(1))
    } else if params.theta_higher_res > 0 {
        let step = (PI / 2.0 - params.theta_limit) / params.theta_higher_res as f64;
        let bin = ((theta - params.theta_limit) / step).floor() as i64;
        params.theta_lower_res + (bin.max(0) as u32).min(params.theta_higher_res.saturating_sub(1))
    } else {
        params.theta_lower_res.saturating_sub(1)
    }
}

pub fn phi_bin_for(phi_width: u32, phi: f64) -> u32 {
    let step = 2.0 * PI / phi_width as f64;
    let wrapped = phi + PI; // [0, 2pi)
    (((wrapped / step).floor() as i64).rem_euclid(phi_width as i64)) as u32
}

/// theta edge for a continuous bin boundary `idx` in `0..=theta_bin_count`.
fn theta_edge(params: &AngleMapParams, idx: u32) -> f64 {
    if idx <= params.theta_lower_res {
        if params.theta_lower_res == 0 {
            0.0
        } else {
            params.theta_limit * idx as f64 / params.theta_lower_res as f64
        }
    } else {
        let over = idx - params.theta_lower_res;
        params.theta_limit + (PI / 2.0 - params.theta_limit) * over as f64 / params.theta_higher_res.max(1) as f64
    }
}

/// Built once per use-mode transition (record -> use); immutable thereafter.
#[derive(Debug, Clone)]
pub struct AngleMapTables {
    pub params: AngleMapParams,
    /// Cumulative row sums, normalized to `[0, 1]`, length `theta_bin_count`.
    pub theta_cdf: Vec<f64>,
    /// Per-row hit totals, length `theta_bin_count`.
    pub row_sums: Vec<f64>,
    /// Per-row cumulative counts (unnormalized), row-major
    /// `theta_bin_count x phi_width`.
    pub phi_cum: Vec<f64>,
    pub total: f64,
    /// Number of times a negative discriminant forced a linear-interpolation
    /// fallback. Counted, not treated as an error.
    pub fallback_count: u64,
}

/// Whether the most recent sample call used a numeric fallback; lets
/// callers bump a global counter.
pub struct SampleOutcome {
    pub theta: f64,
    pub phi: f64,
    pub used_fallback: bool,
}

impl AngleMapTables {
    pub fn build(pdf: &AngleMapPdf, params: AngleMapParams) -> Self {
        let n = pdf.theta_bins as usize;
        let w = pdf.phi_width as usize;
        let mut row_sums = vec![0.0; n];
        let mut phi_cum = vec![0.0; n * w];
        for t in 0..n {
            let row = pdf.row(t as u32);
            let mut running = 0.0;
            for (p, &c) in row.iter().enumerate() {
                running += c as f64;
                phi_cum[t * w + p] = running;
            }
            row_sums[t] = running;
        }
        let total: f64 = row_sums.iter().sum();
        let mut theta_cdf = vec![0.0; n];
        let mut running = 0.0;
        for t in 0..n {
            running += row_sums[t];
            theta_cdf[t] = if total > 0.0 { running / total } else { 0.0 };
        }
        if n > 0 {
            theta_cdf[n - 1] = 1.0;
        }
        AngleMapTables { params, theta_cdf, row_sums, phi_cum, total, fallback_count: 0 }
    }

    fn theta_bin_count(&self) -> usize {
        self.theta_cdf.len()
    }

    /// Invert the recorded PDF at `(u_theta, u_phi)` into an emission
    /// direction `(theta, phi)`. `theta` is in `[0, pi/2]` (incident-to-normal
    /// convention), `phi` in `(-pi, pi]`.
    pub fn sample(&mut self, u_theta: f64, u_phi: f64) -> SampleOutcome {
        let n = self.theta_bin_count();
        debug_assert!(n > 0);
        let mut used_fallback = false;

        let (theta, bin, overshoot) = self.invert_theta(u_theta, &mut used_fallback);
        let phi = self.invert_phi(bin, overshoot, u_phi, &mut used_fallback);

        if used_fallback {
            self.fallback_count += 1;
        }
        SampleOutcome { theta, phi, used_fallback }
    }

    fn invert_theta(&self, u: f64, used_fallback: &mut bool) -> (f64, usize, f64) {
        let n = self.theta_bin_count();
        let i = lower_bound(&self.theta_cdf, u);
        let lower_cum = if i == 0 { 0.0 } else { self.theta_cdf[i - 1] };
        let edge_lo = theta_edge(&self.params, i as u32);
        let edge_hi = theta_edge(&self.params, i as u32 + 1);
        let width = edge_hi - edge_lo;
        let bin_prob = if self.total > 0.0 { self.row_sums[i] / self.total } else { 0.0 };

        if bin_prob <= 0.0 || width <= 0.0 {
            return (edge_lo, i, 0.0);
        }

        // First and last bins: linear interpolation.
        if i == 0 || i == n - 1 {
            let t = ((u - lower_cum) / bin_prob).clamp(0.0, 1.0);
            return (edge_lo + t * width, i, t);
        }

        let next_prob = if self.total > 0.0 { self.row_sums[i + 1] / self.total } else { 0.0 };
        let b = bin_prob / width;
        let a = 0.5 * (next_prob - bin_prob) / (width * width);
        let dy = u - lower_cum;

        let dx = if a.abs() < 1e-15 {
            if b.abs() < 1e-15 {
                0.0
            } else {
                dy / b
            }
        } else {
            let discriminant = b * b + 4.0 * a * dy;
            if discriminant < 0.0 {
                *used_fallback = true;
                if bin_prob.abs() > 1e-15 { (dy / bin_prob) * width } else { 0.0 }
            } else {
                (-b + discriminant.sqrt()) / (2.0 * a)
            }
        };

        let t = (dx / width).clamp(0.0, 1.0);
        (edge_lo + t * width, i, t)
    }

    fn invert_phi(&self, theta_bin: usize, theta_overshoot: f64, u: f64, used_fallback: &mut bool) -> f64 {
        let w = self.params.phi_width as usize;
        if w == 1 {
            return -PI + 2.0 * PI * u;
        }
        let n = self.theta_bin_count();
        let next_bin = (theta_bin + 1).min(n - 1);
        let sum_lo = self.row_sums[theta_bin];
        let sum_hi = self.row_sums[next_bin];
        let div = sum_lo * (1.0 - theta_overshoot) + sum_hi * theta_overshoot;
        let weigh = if div > 0.0 { (theta_overshoot * sum_hi) / div } else { theta_overshoot };

        let row_lo = &self.phi_cum[theta_bin * w..theta_bin * w + w];
        let row_hi = &self.phi_cum[next_bin * w..next_bin * w + w];
        let blended_total = sum_lo * (1.0 - weigh) + sum_hi * weigh;
        if blended_total <= 0.0 {
            return -PI + 2.0 * PI * u;
        }

        let blended: Vec<f64> = (0..w).map(|j| (1.0 - weigh) * row_lo[j] + weigh * row_hi[j]).collect();
        let normalized: Vec<f64> = blended.iter().map(|c| c / blended_total).collect();

        let i = lower_bound(&normalized, u);
        let lower_cum = if i == 0 { 0.0 } else { normalized[i - 1] };
        let step = 2.0 * PI / w as f64;
        let edge_lo = -PI + i as f64 * step;

        let count_i = blended[i];
        let count_next = blended[(i + 1) % w];
        let bin_prob = count_i / blended_total;
        let next_prob = count_next / blended_total;

        if bin_prob <= 0.0 {
            return edge_lo + 0.5 * step;
        }

        let b = bin_prob / step;
        let a = 0.5 * (next_prob - bin_prob) / (step * step);
        let dy = u - lower_cum;

        let dx = if a.abs() < 1e-15 {
            if b.abs() < 1e-15 { 0.0 } else { dy / b }
        } else {
            let discriminant = b * b + 4.0 * a * dy;
            if discriminant < 0.0 {
                *used_fallback = true;
                if bin_prob.abs() > 1e-15 { (dy / bin_prob) * step } else { 0.0 }
            } else {
                (-b + discriminant.sqrt()) / (2.0 * a)
            }
        };

        edge_lo + dx.clamp(0.0, step)
    }
}

/// Index of the first element `>= value`, clamped to `len - 1`.
fn lower_bound(cdf: &[f64], value: f64) -> usize {
    match cdf.binary_search_by(|p| p.partial_cmp(&value).unwrap()) {
        Ok(i) => i,
        Err(i) => i.min(cdf.len() - 1),
    }
}
