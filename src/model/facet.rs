//! Facet definition. Immutable once [`crate::precompute::prepare`] has run.

use cgmath::{Point3, Vector3};
use serde::{Deserialize, Serialize};

pub type FacetId = u32;

/// -1 in the legacy model, used on `super_idx` to mean "member of all
/// superstructures" and on `teleport_dest` to mean "return to whence the
/// particle was last teleported from".
pub const SUPER_IDX_ALL: i32 = -1;
pub const TELEPORT_FROM_WHENCE: i32 = -1;
pub const TELEPORT_OFF: i32 = 0;
pub const SUPER_DEST_NONE: i32 = 0;

/// A scalar facet property that is either a compile-time constant or looked
/// up from a (possibly time-dependent) [`super::parameter::Parameter`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ParamOr {
    Constant(f64),
    Parameter(u32),
}

impl ParamOr {
    pub fn value_at(&self, t: f64, parameters: &[super::parameter::Parameter]) -> f64 {
        match *self {
            ParamOr::Constant(v) => v,
            ParamOr::Parameter(id) => parameters[id as usize].value_at(t),
        }
    }

    pub fn parameter_id(&self) -> Option<u32> {
        match *self {
            ParamOr::Constant(_) => None,
            ParamOr::Parameter(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum DesorbType {
    None,
    Uniform,
    Cosine,
    CosineN(f64),
    AngleMap,
}

/// Diffuse/specular/cosine^N split. The remainder `1 - diffuse - specular`
/// is the cosine^N fraction; the three must sum to at most 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReflectionLaw {
    pub diffuse: f64,
    pub specular: f64,
    pub cosine_n_exponent: f64,
}

impl ReflectionLaw {
    pub fn cosine_n_fraction(&self) -> f64 {
        1.0 - self.diffuse - self.specular
    }
}

/// Cumulative-and-per-cell outgassing map imported from a file, addressed
/// row-major.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgassingMap {
    pub width: u32,
    pub height: u32,
    /// Running cumulative outgassing per cell, row-major, monotonically
    /// increasing; the last entry is the facet's total outgassing.
    pub cumulative: Vec<f64>,
    pub per_cell: Vec<f64>,
}

impl OutgassingMap {
    pub fn total(&self) -> f64 {
        *self.cumulative.last().unwrap_or(&0.0)
    }

    /// Locate the cell containing cumulative value `r` (0 <= r < total()).
    pub fn cell_for(&self, r: f64) -> usize {
        match self.cumulative.binary_search_by(|v| v.partial_cmp(&r).unwrap()) {
            Ok(i) => i,
            Err(i) => i.min(self.cumulative.len() - 1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutgassingSource {
    Constant(ParamOr),
    TimeDependent { param_id: u32 },
    File(OutgassingMap),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextureGrid {
    pub width: u32,
    pub height: u32,
    /// Reciprocal of each cell's physical area, row-major.
    pub inc: Vec<f64>,
    /// Cells big enough to be trusted for autoscaling.
    pub large_enough: Vec<bool>,
}

impl TextureGrid {
    pub fn cell_index(&self, col_u: f64, col_v: f64) -> Option<usize> {
        if !(0.0..1.0).contains(&col_u) || !(0.0..1.0).contains(&col_v) {
            return None;
        }
        let u = (col_u * self.width as f64).floor() as u32;
        let v = (col_v * self.height as f64).floor() as u32;
        Some((v * self.width + u) as usize)
    }

    pub fn cell_count(&self) -> usize {
        (self.width * self.height) as usize
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProfileType {
    None,
    PressureU,
    PressureV,
    Angular,
    Speed,
    OrthogonalSpeed,
    TangentialSpeed,
}

impl ProfileType {
    /// Fixed slice count for all profile kinds.
    pub const PROFILE_SIZE: usize = 100;
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CountFlags {
    pub count_refl: bool,
    pub count_trans: bool,
    pub count_direction: bool,
    pub count_des: bool,
    pub count_abs: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AngleMapParams {
    pub record: bool,
    pub has_recorded: bool,
    pub phi_width: u32,
    pub theta_limit: f64,
    pub theta_lower_res: u32,
    pub theta_higher_res: u32,
}

impl AngleMapParams {
    pub fn theta_bin_count(&self) -> u32 {
        self.theta_lower_res + self.theta_higher_res
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Sojourn {
    pub enabled: bool,
    pub frequency_hz: f64,
    pub binding_energy_j_per_mol: f64,
}

/// Bin widths for the bounce/distance/time histograms; bin `bin_count - 1`
/// is a catch-all for overflow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HistogramAxis {
    pub bin_size: f64,
    pub bin_count: usize,
}

impl HistogramAxis {
    pub fn bin_for(&self, value: f64) -> usize {
        let bin = (value / self.bin_size).floor();
        if bin < 0.0 {
            0
        } else if bin as usize >= self.bin_count - 1 {
            self.bin_count - 1
        } else {
            bin as usize
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct HistogramParams {
    pub bounce: Option<HistogramAxis>,
    pub distance: Option<HistogramAxis>,
    pub time: Option<HistogramAxis>,
}

/// Derived plane basis computed once from the facet's vertex loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlaneBasis {
    pub origin: Point3<f64>,
    pub u: Vector3<f64>,
    pub v: Vector3<f64>,
    pub normal: Vector3<f64>,
    /// 2D bounding box in (u, v) plane coordinates: (min_u, min_v, max_u, max_v).
    pub bbox: (f64, f64, f64, f64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facet {
    pub id: FacetId,
    pub indices: Vec<u32>,
    pub plane: PlaneBasis,
    /// Polygon vertices projected into the (u, v) plane, used for
    /// point-in-polygon rejection sampling.
    pub vertices_2d: Vec<(f64, f64)>,
    pub area: f64,

    pub is_two_sided: bool,
    pub temperature: f64,
    pub opacity: ParamOr,
    pub sticking: ParamOr,
    pub reflection: ReflectionLaw,
    pub desorb_type: DesorbType,
    pub outgassing: OutgassingSource,
    pub is_moving: bool,
    pub is_volatile: bool,
    pub super_idx: i32,
    pub super_dest: i32,
    pub teleport_dest: i32,
    pub sojourn: Option<Sojourn>,

    pub texture: Option<TextureGrid>,
    pub profile_type: ProfileType,
    pub count: CountFlags,
    pub angle_map: Option<AngleMapParams>,
    /// Raw hit counts: an imported recorded map to sample from, or an
    /// initially-empty counter this run accumulates into.
    pub angle_map_counts: Option<Vec<u64>>,
    pub histogram_params: Option<HistogramParams>,

    /// Filled in by [`crate::simulation::precompute::prepare`].
    pub cdf_id: Option<u32>,
    pub id_id: Option<u32>,
}

impl Facet {
    pub fn is_link(&self) -> bool {
        self.super_dest != SUPER_DEST_NONE
    }

    pub fn desorbs(&self) -> bool {
        !matches!(self.desorb_type, DesorbType::None)
    }

    pub fn world_point(&self, col_u: f64, col_v: f64) -> Point3<f64> {
        self.plane.origin + self.plane.u * col_u + self.plane.v * col_v
    }
}
