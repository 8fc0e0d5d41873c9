//! Model preparation. Validates the geometry, builds the shared
//! velocity/outgassing tables, and computes the total outgassing used to
//! weight source-facet selection.

use crate::error::{ConfigError, PreparationError};
use crate::model::facet::{OutgassingSource, SUPER_DEST_NONE};
use crate::model::Model;
use crate::tables::anglemap::AngleMapPdf;
use crate::tables::{AngleMapTables, TdParams, BOLTZMANN, DEFAULT_CDF_BINS};

pub struct PreparedModel {
    pub model: Model,
    pub tables: TdParams,
    /// Indexed by facet id; `Some` only for facets with a usable recorded
    /// angle map.
    pub angle_maps: Vec<Option<AngleMapTables>>,
    pub total_outgassing: f64,
}

pub fn prepare(mut model: Model) -> Result<PreparedModel, PreparationError> {
    validate_geometry(&model)?;

    let mut tables = TdParams::default();
    let latest_moment = model.global.latest_moment;
    let gas_mass = model.global.gas_mass;

    for facet in &mut model.facets {
        facet.cdf_id = Some(tables.get_or_build_cdf(facet.temperature, gas_mass, DEFAULT_CDF_BINS));
        if let OutgassingSource::TimeDependent { param_id } = &facet.outgassing {
            let param_id = *param_id;
            facet.id_id = Some(tables.get_or_build_id(param_id, &model.parameters, latest_moment));
        }
    }

    let mut angle_maps = vec![None; model.facets.len()];
    for facet in &model.facets {
        if let (Some(params), Some(counts)) = (&facet.angle_map, &facet.angle_map_counts) {
            if params.has_recorded {
                let mut pdf = AngleMapPdf::new(params);
                pdf.counts.copy_from_slice(counts);
                angle_maps[facet.id as usize] = Some(AngleMapTables::build(&pdf, *params));
            }
        }
    }

    let total_outgassing = facet_sum_outgassing(&model, &tables);

    Ok(PreparedModel { model, tables, angle_maps, total_outgassing })
}

/// Run-level validation, separate from the structural checks in
/// [`prepare`] since it needs the tables `prepare` builds.
pub fn validate_config(prepared: &PreparedModel) -> Result<(), ConfigError> {
    if prepared.total_outgassing <= 0.0 {
        return Err(ConfigError::NonPositiveOutgassing(prepared.total_outgassing));
    }
    for facet in &prepared.model.facets {
        let sum = facet.reflection.diffuse + facet.reflection.specular;
        if sum > 1.0 + 1e-9 {
            return Err(ConfigError::InvertedReflectionFractions { facet: facet.id, diffuse: facet.reflection.diffuse, specular: facet.reflection.specular });
        }
    }
    Ok(())
}

fn validate_geometry(model: &Model) -> Result<(), PreparationError> {
    let param_count = model.parameters.len() as u32;
    let struct_count = model.superstructures.len() as i32;

    for facet in &model.facets {
        if facet.area <= 0.0 {
            return Err(PreparationError::ZeroArea { facet: facet.id });
        }
        if let Some(pid) = facet.opacity.parameter_id() {
            check_param(facet.id, pid, param_count)?;
        }
        if let Some(pid) = facet.sticking.parameter_id() {
            check_param(facet.id, pid, param_count)?;
        }
        if let OutgassingSource::TimeDependent { param_id } = &facet.outgassing {
            check_param(facet.id, *param_id, param_count)?;
        }
        if facet.super_dest != SUPER_DEST_NONE && (facet.super_dest < 1 || facet.super_dest > struct_count) {
            return Err(PreparationError::InvalidStructureLink { facet: facet.id, dest: facet.super_dest });
        }
        if let Some(params) = &facet.angle_map {
            let uses_map = matches!(facet.desorb_type, crate::model::facet::DesorbType::AngleMap);
            if params.record && uses_map {
                return Err(PreparationError::AngleMapConflict { facet: facet.id });
            }
            if uses_map && !params.has_recorded {
                return Err(PreparationError::NoRecordedAngleMap { facet: facet.id });
            }
        } else if matches!(facet.desorb_type, crate::model::facet::DesorbType::AngleMap) {
            return Err(PreparationError::NoRecordedAngleMap { facet: facet.id });
        }
    }
    Ok(())
}

fn check_param(facet: u32, param_id: u32, param_count: u32) -> Result<(), PreparationError> {
    if param_id >= param_count {
        Err(PreparationError::InvalidParameterId { facet, param_id })
    } else {
        Ok(())
    }
}

fn facet_sum_outgassing(model: &Model, tables: &TdParams) -> f64 {
    model.facets.iter().map(|facet| facet_total(facet, model, tables)).sum()
}

/// Molecules/s this facet contributes at steady state, used to weight
/// source-facet selection. Constant and file outgassing (Pa*m^3/s) are
/// converted via `outgassing * latest_moment / (k_B * T)`; time-dependent
/// outgassing uses the integrated `Id` table's total directly, already in
/// Pa*m^3 over `[0, latest_moment]`, divided by `k_B * T`.
pub(crate) fn facet_total(facet: &crate::model::Facet, model: &Model, tables: &TdParams) -> f64 {
    let kt = BOLTZMANN * facet.temperature;
    match &facet.outgassing {
        OutgassingSource::Constant(p) => p.value_at(0.0, &model.parameters) * model.global.latest_moment / kt,
        OutgassingSource::TimeDependent { .. } => {
            let id = facet.id_id.expect("id table built by prepare()");
            tables.ids[id as usize].total() / kt
        }
        OutgassingSource::File(map) => map.total() * model.global.latest_moment / kt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::facet::{CountFlags, DesorbType, Facet, ParamOr, PlaneBasis, ProfileType, ReflectionLaw};
    use crate::model::{GlobalParams, Moment, MotionType, OnTheFlyParams};
    use cgmath::{Point3, Vector3};

    fn base_facet(id: u32) -> Facet {
        Facet {
            id,
            indices: vec![0, 1, 2],
            plane: PlaneBasis {
                origin: Point3::new(0.0, 0.0, 0.0),
                u: Vector3::new(1.0, 0.0, 0.0),
                v: Vector3::new(0.0, 1.0, 0.0),
                normal: Vector3::new(0.0, 0.0, 1.0),
                bbox: (0.0, 0.0, 1.0, 1.0),
            },
            vertices_2d: vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)],
            area: 1.0,
            is_two_sided: false,
            temperature: 300.0,
            opacity: ParamOr::Constant(1.0),
            sticking: ParamOr::Constant(1.0),
            reflection: ReflectionLaw { diffuse: 1.0, specular: 0.0, cosine_n_exponent: 1.0 },
            desorb_type: DesorbType::Cosine,
            outgassing: OutgassingSource::Constant(ParamOr::Constant(1.0)),
            is_moving: false,
            is_volatile: false,
            super_idx: -1,
            super_dest: 0,
            teleport_dest: 0,
            sojourn: None,
            texture: None,
            profile_type: ProfileType::None,
            count: CountFlags::default(),
            angle_map: None,
            angle_map_counts: None,
            histogram_params: None,
            cdf_id: None,
            id_id: None,
        }
    }

    fn base_model(facets: Vec<Facet>) -> Model {
        Model {
            vertices: vec![],
            facets,
            superstructures: vec![],
            parameters: vec![],
            moments: vec![Moment { center: 1.0, width: 0.2 }],
            otf: OnTheFlyParams::default(),
            global: GlobalParams {
                gas_mass: 28.0,
                use_maxwell: true,
                enable_decay: false,
                halflife: 0.0,
                motion_type: MotionType::None,
                motion_vector1: Vector3::new(0.0, 0.0, 0.0),
                motion_vector2: Vector3::new(0.0, 0.0, 0.0),
                calc_constant_flow: true,
                latest_moment: 1.1,
            },
        }
    }

    #[test]
    fn rejects_zero_area_facet() {
        let mut f = base_facet(0);
        f.area = 0.0;
        let model = base_model(vec![f]);
        assert_eq!(prepare(model).unwrap_err(), PreparationError::ZeroArea { facet: 0 });
    }

    #[test]
    fn rejects_dangling_parameter_reference() {
        let mut f = base_facet(0);
        f.opacity = ParamOr::Parameter(3);
        let model = base_model(vec![f]);
        assert_eq!(prepare(model).unwrap_err(), PreparationError::InvalidParameterId { facet: 0, param_id: 3 });
    }

    #[test]
    fn prepares_valid_model_and_sums_outgassing() {
        let model = base_model(vec![base_facet(0), base_facet(1)]);
        let latest_moment = model.global.latest_moment;
        let temperature = model.facets[0].temperature;
        let prepared = prepare(model).unwrap();
        let expected_per_facet = 1.0 * latest_moment / (crate::tables::BOLTZMANN * temperature);
        assert!((prepared.total_outgassing - 2.0 * expected_per_facet).abs() / (2.0 * expected_per_facet) < 1e-9);
        assert!(validate_config(&prepared).is_ok());
    }

    #[test]
    fn validate_config_rejects_nonpositive_outgassing() {
        let mut f = base_facet(0);
        f.outgassing = OutgassingSource::Constant(ParamOr::Constant(0.0));
        let model = base_model(vec![f]);
        let prepared = prepare(model).unwrap();
        assert_eq!(validate_config(&prepared).unwrap_err(), ConfigError::NonPositiveOutgassing(0.0));
    }
}
