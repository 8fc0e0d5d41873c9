//! Ray/facet intersector. This is a separable collaborator: given
//! `(pos, dir, struct_id)` it returns the nearest opaque-hit facet plus the
//! ordered list of transparent-pass facets crossed en route. Any
//! implementation honoring this contract is acceptable; the brute-force
//! version here is the reference implementation.

use cgmath::{InnerSpace, Point3, Vector3};

use crate::model::facet::{FacetId, SUPER_IDX_ALL};
use crate::model::Model;
use crate::rng::Rng;

const EPSILON: f64 = 1e-9;

pub struct IntersectResult {
    pub hit: Option<FacetId>,
    /// Distance to the hit point, in cm.
    pub distance: f64,
    /// Facets whose plane the ray crossed before reaching `hit`, in
    /// traversal order, decided transparent by a per-facet opacity draw.
    pub transparent_passes: Vec<FacetId>,
}

pub trait Intersector {
    /// `time` is the particle's current simulation time, used to resolve a
    /// time-dependent opacity parameter.
    fn intersect(&self, model: &Model, pos: Point3<f64>, dir: Vector3<f64>, struct_id: i32, time: f64, rng: &mut Rng) -> IntersectResult;
}

/// Linear-scan reference intersector: no acceleration structure, checks
/// every facet in the current (or universal) superstructure.
pub struct BruteForceIntersector;

impl Intersector for BruteForceIntersector {
    fn intersect(&self, model: &Model, pos: Point3<f64>, dir: Vector3<f64>, struct_id: i32, time: f64, rng: &mut Rng) -> IntersectResult {
        let mut candidates: Vec<(f64, FacetId)> = Vec::new();

        for facet in &model.facets {
            if facet.super_idx != SUPER_IDX_ALL && facet.super_idx != struct_id {
                continue;
            }
            let denom = dir.dot(facet.plane.normal);
            if denom.abs() < EPSILON {
                continue; // ray parallel to facet plane
            }
            let t = (facet.plane.origin - pos).dot(facet.plane.normal) / denom;
            if t <= EPSILON {
                continue; // behind the ray origin
            }
            let hit_point = pos + dir * t;
            if !point_in_facet(facet, hit_point) {
                continue;
            }
            candidates.push((t, facet.id));
        }

        candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

        let mut transparent_passes = Vec::new();
        for (t, id) in candidates {
            let facet = model.facet(id);
            let opacity = facet.opacity.value_at(time, &model.parameters).clamp(0.0, 1.0);
            let is_opaque = if opacity >= 1.0 {
                true
            } else if opacity <= 0.0 {
                false
            } else {
                rng.uniform() < opacity
            };

            if is_opaque {
                return IntersectResult { hit: Some(id), distance: t, transparent_passes };
            }
            transparent_passes.push(id);
        }

        IntersectResult { hit: None, distance: 0.0, transparent_passes }
    }
}

fn point_in_facet(facet: &crate::model::Facet, world_point: Point3<f64>) -> bool {
    let rel = world_point - facet.plane.origin;
    let col_u = rel.dot(facet.plane.u);
    let col_v = rel.dot(facet.plane.v);
    let (min_u, min_v, max_u, max_v) = facet.plane.bbox;
    if col_u < min_u - EPSILON || col_u > max_u + EPSILON || col_v < min_v - EPSILON || col_v > max_v + EPSILON {
        return false;
    }
    point_in_polygon(&facet.vertices_2d, col_u, col_v)
}

/// Even-odd rule ray casting; works for convex and concave polygons.
pub(crate) fn point_in_polygon(poly: &[(f64, f64)], x: f64, y: f64) -> bool {
    let n = poly.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = poly[i];
        let (xj, yj) = poly[j];
        if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::facet::{CountFlags, DesorbType, Facet, OutgassingSource, ParamOr, PlaneBasis, ProfileType, ReflectionLaw};
    use crate::model::{GlobalParams, Model, MotionType, OnTheFlyParams};

    fn square_facet(id: FacetId, origin: Point3<f64>, normal: Vector3<f64>, opacity: f64) -> Facet {
        let u = Vector3::new(1.0, 0.0, 0.0);
        let v = Vector3::new(0.0, 1.0, 0.0);
        Facet {
            id,
            indices: vec![0, 1, 2, 3],
            plane: PlaneBasis { origin, u, v, normal, bbox: (0.0, 0.0, 1.0, 1.0) },
            vertices_2d: vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)],
            area: 1.0,
            is_two_sided: false,
            temperature: 300.0,
            opacity: ParamOr::Constant(opacity),
            sticking: ParamOr::Constant(1.0),
            reflection: ReflectionLaw { diffuse: 1.0, specular: 0.0, cosine_n_exponent: 1.0 },
            desorb_type: DesorbType::None,
            outgassing: OutgassingSource::Constant(ParamOr::Constant(0.0)),
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

    fn empty_model(facets: Vec<Facet>) -> Model {
        Model {
            vertices: vec![],
            facets,
            superstructures: vec![],
            parameters: vec![],
            moments: vec![],
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
                latest_moment: 1.0,
            },
        }
    }

    #[test]
    fn hits_opaque_facet_straight_ahead() {
        let model = empty_model(vec![square_facet(0, Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0), 1.0)]);
        let mut rng = Rng::from_seed(1);
        let result = BruteForceIntersector.intersect(&model, Point3::new(0.5, 0.5, 0.0), Vector3::new(0.0, 0.0, 1.0), -1, 0.0, &mut rng);
        assert_eq!(result.hit, Some(0));
        assert!((result.distance - 5.0).abs() < 1e-9);
    }

    #[test]
    fn misses_facet_outside_polygon() {
        let model = empty_model(vec![square_facet(0, Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0), 1.0)]);
        let mut rng = Rng::from_seed(1);
        let result = BruteForceIntersector.intersect(&model, Point3::new(5.0, 5.0, 0.0), Vector3::new(0.0, 0.0, 1.0), -1, 0.0, &mut rng);
        assert_eq!(result.hit, None);
    }

    #[test]
    fn fully_transparent_facet_is_recorded_and_passed() {
        let facets = vec![
            square_facet(0, Point3::new(0.0, 0.0, 2.0), Vector3::new(0.0, 0.0, -1.0), 0.0),
            square_facet(1, Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0), 1.0),
        ];
        let model = empty_model(facets);
        let mut rng = Rng::from_seed(1);
        let result = BruteForceIntersector.intersect(&model, Point3::new(0.5, 0.5, 0.0), Vector3::new(0.0, 0.0, 1.0), -1, 0.0, &mut rng);
        assert_eq!(result.hit, Some(1));
        assert_eq!(result.transparent_passes, vec![0]);
    }
}
