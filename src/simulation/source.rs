//! Weighted source-facet selection, position/angle/speed sampling for a
//! freshly-desorbed particle.

use cgmath::{InnerSpace, Point3};

use crate::error::SourceSelectionError;
use crate::intersect::point_in_polygon;
use crate::model::facet::{DesorbType, Facet, FacetId, OutgassingSource};
use crate::model::Model;
use crate::particle::Particle;
use crate::rng::Rng;
use crate::sampler::{local_to_world, sample_desorb_angles};
use crate::simulation::precompute::facet_total;
use crate::tables::{AngleMapTables, TdParams};

pub struct Desorption {
    pub facet_id: FacetId,
    pub pos: Point3<f64>,
    pub particle: Particle,
    /// A numeric fallback occurred inverting this facet's angle map.
    pub used_fallback: bool,
}

/// Pick a source facet weighted by its total outgassing, then sample a
/// desorption position, direction and speed.
pub fn start_from_source(model: &Model, tables: &TdParams, angle_maps: &mut [Option<AngleMapTables>], total_outgassing: f64, time: f64, rng: &mut Rng) -> Result<Desorption, SourceSelectionError> {
    let facet = select_source_facet(model, tables, total_outgassing, rng)?;
    let desorb_time = sample_desorb_time(facet, model, tables, time, rng);

    let (col_u, col_v) = sample_position(facet, rng);
    let pos = facet.world_point(col_u, col_v);

    let (theta, phi, used_fallback) = sample_direction(facet, angle_maps, rng);
    let mut dir = local_to_world(&facet.plane, theta, phi);
    if facet.is_two_sided && rng.uniform() < 0.5 {
        dir -= facet.plane.normal * (2.0 * dir.dot(facet.plane.normal));
    }

    let cdf_id = facet.cdf_id.expect("cdf built by prepare()");
    let speed = tables.cdfs[cdf_id as usize].sample(rng.uniform());

    let mut particle = Particle::new(pos, dir, speed, desorb_time, facet.super_idx, 1.0);
    particle.moment_index = model.moment_index_at(desorb_time).unwrap_or(0);
    if model.global.enable_decay {
        let r = rng.uniform();
        let t_decay = desorb_time + model.global.halflife * (1.0 / std::f64::consts::LN_2) * (-r.ln());
        particle.expected_decay_time = Some(t_decay);
    }

    Ok(Desorption { facet_id: facet.id, pos, particle, used_fallback })
}

fn select_source_facet<'a>(model: &'a Model, tables: &TdParams, total_outgassing: f64, rng: &mut Rng) -> Result<&'a Facet, SourceSelectionError> {
    if total_outgassing <= 0.0 {
        return Err(SourceSelectionError { total_outgassing });
    }
    let r = rng.uniform() * total_outgassing;
    let mut acc = 0.0;
    for facet in &model.facets {
        let w = facet_total(facet, model, tables);
        if w <= 0.0 {
            continue;
        }
        acc += w;
        if r <= acc {
            return Ok(facet);
        }
    }
    model.facets.iter().rev().find(|f| facet_total(f, model, tables) > 0.0).ok_or(SourceSelectionError { total_outgassing })
}

fn sample_desorb_time(facet: &Facet, model: &Model, tables: &TdParams, _now: f64, rng: &mut Rng) -> f64 {
    match &facet.outgassing {
        OutgassingSource::Constant(_) | OutgassingSource::File(_) => rng.uniform() * model.global.latest_moment,
        OutgassingSource::TimeDependent { .. } => {
            let id = &tables.ids[facet.id_id.expect("id built by prepare()") as usize];
            id.sample_time(rng.uniform() * id.total())
        }
    }
}

fn sample_position(facet: &Facet, rng: &mut Rng) -> (f64, f64) {
    if let OutgassingSource::File(map) = &facet.outgassing {
        let r = rng.uniform() * map.total();
        let cell = map.cell_for(r) as u32;
        let col = cell % map.width;
        let row = cell / map.width;
        let (min_u, min_v, max_u, max_v) = facet.plane.bbox;
        let cell_w = (max_u - min_u) / map.width as f64;
        let cell_h = (max_v - min_v) / map.height as f64;
        let u = min_u + (col as f64 + rng.uniform()) * cell_w;
        let v = min_v + (row as f64 + rng.uniform()) * cell_h;
        return (u, v);
    }
    rejection_sample_polygon(facet, rng)
}

/// Uniform rejection sampling inside the facet's polygon; falls back to the
/// bbox center if the polygon is pathologically thin.
fn rejection_sample_polygon(facet: &Facet, rng: &mut Rng) -> (f64, f64) {
    let (min_u, min_v, max_u, max_v) = facet.plane.bbox;
    for _ in 0..1000 {
        let u = min_u + rng.uniform() * (max_u - min_u);
        let v = min_v + rng.uniform() * (max_v - min_v);
        if point_in_polygon(&facet.vertices_2d, u, v) {
            return (u, v);
        }
    }
    ((min_u + max_u) / 2.0, (min_v + max_v) / 2.0)
}

fn sample_direction(facet: &Facet, angle_maps: &mut [Option<AngleMapTables>], rng: &mut Rng) -> (f64, f64, bool) {
    if matches!(facet.desorb_type, DesorbType::AngleMap) {
        let tables = angle_maps[facet.id as usize].as_mut().expect("angle map validated by prepare()");
        let outcome = tables.sample(rng.uniform(), rng.uniform());
        return (outcome.theta, outcome.phi, outcome.used_fallback);
    }
    let (theta, phi) = sample_desorb_angles(rng, &facet.desorb_type).unwrap_or((0.0, 0.0));
    (theta, phi, false)
}
