//! Geometry model. Built by an external loader, consumed read-only by every
//! worker once [`crate::precompute::prepare`] succeeds.

pub mod facet;
pub mod parameter;
pub mod vertex;

pub use facet::{Facet, FacetId};
pub use parameter::Parameter;
pub use vertex::Vertex;

use serde::{Deserialize, Serialize};

/// A disjoint subset of facets sharing an acceleration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Superstructure {
    pub facet_ids: Vec<FacetId>,
}

/// A time window on which samples are aggregated separately from the
/// steady-state (index 0) track.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Moment {
    pub center: f64,
    pub width: f64,
}

impl Moment {
    pub fn lower(&self) -> f64 {
        self.center - self.width / 2.0
    }

    pub fn upper(&self) -> f64 {
        self.center + self.width / 2.0
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.lower() && t <= self.upper()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MotionType {
    None,
    Translate,
    Rotate,
}

/// On-the-fly parameters, consumed at step entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnTheFlyParams {
    pub nb_process: usize,
    pub desorption_limit: Option<u64>,
    pub time_limit_seconds: Option<f64>,
    pub low_flux_mode: bool,
    pub low_flux_cutoff: f64,
    pub enable_logging: bool,
    pub log_facet_id: Option<FacetId>,
    pub log_limit: usize,
}

impl Default for OnTheFlyParams {
    fn default() -> Self {
        OnTheFlyParams {
            nb_process: 1,
            desorption_limit: None,
            time_limit_seconds: None,
            low_flux_mode: false,
            low_flux_cutoff: 1e-6,
            enable_logging: false,
            log_facet_id: None,
            log_limit: 0,
        }
    }
}

/// Global simulation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalParams {
    pub gas_mass: f64,
    pub use_maxwell: bool,
    pub enable_decay: bool,
    pub halflife: f64,
    pub motion_type: MotionType,
    pub motion_vector1: cgmath::Vector3<f64>,
    pub motion_vector2: cgmath::Vector3<f64>,
    pub calc_constant_flow: bool,
    /// Largest moment upper bound; computed by `prepare()` but also
    /// user-settable for steady-state-only runs.
    pub latest_moment: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub vertices: Vec<Vertex>,
    pub facets: Vec<Facet>,
    pub superstructures: Vec<Superstructure>,
    pub parameters: Vec<Parameter>,
    pub moments: Vec<Moment>,
    pub otf: OnTheFlyParams,
    pub global: GlobalParams,
}

impl Model {
    /// Number of moment slots, including index 0 (steady state).
    pub fn moment_count(&self) -> usize {
        1 + self.moments.len()
    }

    pub fn facet(&self, id: FacetId) -> &Facet {
        &self.facets[id as usize]
    }

    /// Index of the moment window containing `t`, or `None` if it falls in
    /// none of the user windows. Index 0 (constant flow) is handled
    /// separately by callers.
    pub fn moment_index_at(&self, t: f64) -> Option<usize> {
        self.moments.iter().position(|m| m.contains(t)).map(|i| i + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moment_contains_is_inclusive_on_bounds() {
        let m = Moment { center: 0.5, width: 0.2 };
        assert!(m.contains(0.4));
        assert!(m.contains(0.6));
        assert!(!m.contains(0.39));
    }
}
