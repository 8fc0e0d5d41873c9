//! Polar -> Cartesian direction sampling for desorption angular
//! distributions and diffuse/specular/cosine^N reflection.

use cgmath::{InnerSpace, Vector3};
use std::f64::consts::PI;

use crate::model::facet::{DesorbType, PlaneBasis, ReflectionLaw};
use crate::rng::Rng;

/// Builds a unit direction vector from local polar coordinates in a facet's
/// `(u, v, normal)` basis: `theta` measured from the normal, `phi` the
/// azimuth around it.
pub fn local_to_world(plane: &PlaneBasis, theta: f64, phi: f64) -> Vector3<f64> {
    let (sin_t, cos_t) = theta.sin_cos();
    let (sin_p, cos_p) = phi.sin_cos();
    (plane.normal * cos_t + plane.u * (sin_t * cos_p) + plane.v * (sin_t * sin_p)).normalize()
}

/// Inverse of [`local_to_world`]: recovers `(theta, phi)` of `dir` in the
/// facet's local basis. `theta` is always in `[0, pi/2]`, taken from the
/// magnitude of the normal component for incident-angle bookkeeping.
pub fn local_angles_of(plane: &PlaneBasis, dir: Vector3<f64>) -> (f64, f64) {
    let n_comp = dir.dot(plane.normal);
    let u_comp = dir.dot(plane.u);
    let v_comp = dir.dot(plane.v);
    let theta = n_comp.abs().min(1.0).acos();
    let phi = v_comp.atan2(u_comp);
    (theta, phi)
}

/// Sample `(theta, phi)` for the uniform angular distribution.
pub fn sample_uniform(rng: &mut Rng) -> (f64, f64) {
    let r1 = rng.uniform();
    let r2 = rng.uniform();
    (r1.acos(), 2.0 * PI * r2)
}

/// Sample `(theta, phi)` for the cosine (Lambertian) distribution.
pub fn sample_cosine(rng: &mut Rng) -> (f64, f64) {
    let r1 = rng.uniform();
    let r2 = rng.uniform();
    (r1.sqrt().acos(), 2.0 * PI * r2)
}

/// Sample `(theta, phi)` for the cosine^N distribution.
pub fn sample_cosine_n(rng: &mut Rng, n: f64) -> (f64, f64) {
    let r1 = rng.uniform();
    let r2 = rng.uniform();
    (r1.powf(1.0 / (n + 1.0)).acos(), 2.0 * PI * r2)
}

/// Dispatch on a facet's `desorb_type`; returns `None` for `AngleMap` and
/// `None`, which callers handle via [`crate::tables::AngleMapTables::sample`]
/// instead.
pub fn sample_desorb_angles(rng: &mut Rng, desorb_type: &DesorbType) -> Option<(f64, f64)> {
    match *desorb_type {
        DesorbType::None => None,
        DesorbType::Uniform => Some(sample_uniform(rng)),
        DesorbType::Cosine => Some(sample_cosine(rng)),
        DesorbType::CosineN(n) => Some(sample_cosine_n(rng, n)),
        DesorbType::AngleMap => None,
    }
}

/// Which of the three reflection channels a hit falls into, drawn against
/// the facet's `(diffuse, specular, cosine^N)` split.
pub enum ReflectionChannel {
    Diffuse,
    Specular,
    CosineN,
}

pub fn choose_reflection_channel(rng: &mut Rng, law: &ReflectionLaw) -> ReflectionChannel {
    let r = rng.uniform();
    if r < law.diffuse {
        ReflectionChannel::Diffuse
    } else if r < law.diffuse + law.specular {
        ReflectionChannel::Specular
    } else {
        ReflectionChannel::CosineN
    }
}

/// Sample the outgoing `(theta, phi)` for a bounce, given the incident
/// direction's local angles and the facet's reflection law.
pub fn sample_reflection(rng: &mut Rng, law: &ReflectionLaw, incident_theta: f64, incident_phi: f64) -> (f64, f64) {
    match choose_reflection_channel(rng, law) {
        ReflectionChannel::Diffuse => sample_cosine(rng),
        ReflectionChannel::Specular => (incident_theta, incident_phi),
        ReflectionChannel::CosineN => sample_cosine_n(rng, law.cosine_n_exponent),
    }
}
