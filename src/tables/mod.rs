//! CDF/ID tables. Built once by [`crate::precompute::prepare`], then
//! shared read-only by all workers.

pub mod anglemap;
pub mod cdf;
pub mod id;

pub use anglemap::AngleMapTables;
pub use cdf::Cdf;
pub use id::Id;

/// Default CDF resolution.
pub const DEFAULT_CDF_BINS: usize = 100;

/// Boltzmann constant, J/K.
pub const BOLTZMANN: f64 = 1.38e-23;
/// Universal gas constant, J/(mol*K).
pub const GAS_CONSTANT: f64 = 8.3144621;
/// Atomic mass unit, kg.
pub const AMU: f64 = 1.67e-27;

/// Non-Maxwell shortcut speed factor: `sqrt(8*R*1000/pi)/4/10`.
pub const NON_MAXWELL_SPEED_FACTOR: f64 = 145.469;
/// Non-Maxwell shortcut orthogonal-velocity weight factor.
pub const NON_MAXWELL_ORT_WEIGHT: f64 = 1.1781;

/// Immutable tables shared by value-style reference across workers.
#[derive(Debug, Clone, Default)]
pub struct TdParams {
    pub cdfs: Vec<Cdf>,
    pub ids: Vec<Id>,
}

impl TdParams {
    /// Find an existing CDF matching `temperature` within tolerance, or
    /// build and append a new one.
    pub fn get_or_build_cdf(&mut self, temperature: f64, gas_mass: f64, bins: usize) -> u32 {
        if let Some(i) = self.cdfs.iter().position(|c| (c.temperature - temperature).abs() < 1e-6) {
            return i as u32;
        }
        self.cdfs.push(Cdf::build(temperature, gas_mass, bins));
        (self.cdfs.len() - 1) as u32
    }

    /// Find an existing ID for `param_id`, or build and append a new one.
    pub fn get_or_build_id(&mut self, param_id: u32, parameters: &[crate::model::Parameter], latest_moment: f64) -> u32 {
        if let Some(i) = self.ids.iter().position(|d| d.param_id == param_id) {
            return i as u32;
        }
        self.ids.push(Id::build(param_id, &parameters[param_id as usize], latest_moment));
        (self.ids.len() - 1) as u32
    }
}
