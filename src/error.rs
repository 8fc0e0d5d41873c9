//! Error types for the preparation and simulation phases.

use thiserror::Error;

/// Raised by [`crate::precompute::prepare`]; aborts the run before any worker starts.
#[derive(Debug, Error, PartialEq)]
pub enum PreparationError {
    #[error("facet {facet} references unknown parameter id {param_id}")]
    InvalidParameterId { facet: u32, param_id: u32 },

    #[error("facet {facet} is configured to both record and use an angle map")]
    AngleMapConflict { facet: u32 },

    #[error("facet {facet} uses an angle map for desorption but has no recorded angle map")]
    NoRecordedAngleMap { facet: u32 },

    #[error("facet {facet} links to structure {dest} which does not exist")]
    InvalidStructureLink { facet: u32, dest: i32 },

    #[error("facet {facet} has non-positive area")]
    ZeroArea { facet: u32 },
}

/// Raised while validating user-supplied facet/global configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("total outgassing must be positive, got {0}")]
    NonPositiveOutgassing(f64),

    #[error("facet {facet} reflection fractions (diffuse={diffuse}, specular={specular}) exceed 1")]
    InvertedReflectionFractions { facet: u32, diffuse: f64, specular: f64 },
}

/// A particle attempted to desorb but no source facet could be selected.
///
/// This should be unreachable given a positive `total_outgassing` and is
/// raised to detect model corruption.
#[derive(Debug, Error, PartialEq)]
#[error("no source facet could be selected out of a total outgassing of {total_outgassing}")]
pub struct SourceSelectionError {
    pub total_outgassing: f64,
}

/// Raised by [`crate::simulation::merge::merge`] when the timed mutex could not
/// be acquired before the caller-supplied deadline. The caller retries
/// later; this is not a fatal condition.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("merge timed out before the global state mutex was acquired")]
pub struct MergeTimeout;
