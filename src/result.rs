//! Persisted result layout and physical-quantity export formulas.
//! The `Pod` records mirror what a worker merges into
//! [`crate::simulation::merge::GlobalState`]; export formulas turn the raw
//! weighted sums into impingement rate, density and pressure.

use bytemuck::{Pod, Zeroable};

use crate::simulation::merge::GlobalState;
use crate::tables::AMU;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GlobalHitRecord {
    pub desorbed: f64,
    pub hits: f64,
    pub absorbed: f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct FacetHitRecord {
    pub facet_id: u32,
    _pad: u32,
    pub desorbed: f64,
    pub hits: f64,
    pub absorbed: f64,
    pub transparent: f64,
}

/// Always reports the steady-state (index 0) track; per-moment breakdowns
/// live on `FacetCounters::moments` directly.
pub fn global_hit_record(state: &GlobalState) -> GlobalHitRecord {
    state.facet_counters.iter().fold(GlobalHitRecord::zeroed(), |mut acc, c| {
        let m = &c.moments[0];
        acc.desorbed += m.desorbed;
        acc.hits += m.hits;
        acc.absorbed += m.absorbed;
        acc
    })
}

pub fn facet_hit_records(state: &GlobalState) -> Vec<FacetHitRecord> {
    state
        .facet_counters
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let m = &c.moments[0];
            FacetHitRecord { facet_id: i as u32, _pad: 0, desorbed: m.desorbed, hits: m.hits, absorbed: m.absorbed, transparent: m.transparent }
        })
        .collect()
}

/// Impingement rate in particles / m^2 / s, given a facet area in cm^2
/// (the model's native length unit) and the run's elapsed time in seconds.
pub fn impingement_rate(hits: f64, area_cm2: f64, runtime_s: f64) -> f64 {
    if runtime_s <= 0.0 || area_cm2 <= 0.0 {
        return 0.0;
    }
    hits / (area_cm2 * 1e-4 * runtime_s)
}

/// Local gas density in particles / m^3.
pub fn density(sum_1_per_v_ort: f64, area_cm2: f64, runtime_s: f64) -> f64 {
    if runtime_s <= 0.0 || area_cm2 <= 0.0 {
        return 0.0;
    }
    sum_1_per_v_ort / (area_cm2 * 1e-4 * runtime_s)
}

/// Local pressure in mbar, from the texture/profile `sum_v_ort_per_area`
/// running sum (already divided by cell area) and the gas's molar mass.
pub fn pressure_mbar(sum_v_ort_per_area: f64, gas_mass_g_per_mol: f64, runtime_s: f64) -> f64 {
    if runtime_s <= 0.0 {
        return 0.0;
    }
    let mass_kg = gas_mass_g_per_mol * AMU;
    let pressure_pa = sum_v_ort_per_area * mass_kg * 1e4 / runtime_s;
    pressure_pa * 0.01
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impingement_rate_scales_with_area_and_time() {
        assert!((impingement_rate(100.0, 1.0, 1.0) - 100.0 / 1e-4).abs() < 1e-6);
        assert_eq!(impingement_rate(100.0, 0.0, 1.0), 0.0);
    }

    #[test]
    fn pressure_is_zero_for_zero_runtime() {
        assert_eq!(pressure_mbar(10.0, 28.0, 0.0), 0.0);
    }
}
