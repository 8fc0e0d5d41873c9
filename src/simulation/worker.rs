//! Per-thread particle loop. Each worker owns its own RNG, particle cursor,
//! and result accumulators; nothing here touches shared state except
//! through [`crate::simulation::merge`].

use cgmath::InnerSpace;

use crate::counters::{DirectionAccumulator, FacetHistograms, HitCache, HitCacheEntry, LeakCache, LeakCacheEntry, ProfileAccumulator, TextureAccumulator};
use crate::intersect::{BruteForceIntersector, Intersector};
use crate::model::facet::{Facet, FacetId, ProfileType, TELEPORT_FROM_WHENCE, TELEPORT_OFF};
use crate::particle::Particle;
use crate::rng::Rng;
use crate::sampler::{local_angles_of, local_to_world, sample_reflection};
use crate::simulation::moving::{correct_outgoing_velocity, facet_velocity};
use crate::simulation::precompute::PreparedModel;
use crate::simulation::source::start_from_source;
use crate::tables::anglemap::AngleMapPdf;
use crate::tables::{AngleMapTables, GAS_CONSTANT};

/// Per-moment-index running sums for one facet. Index 0 is the steady-state
/// (constant-flow) track, which always accumulates; indices `1..=M` track
/// the `Model::moments` time windows and accumulate in addition to index 0
/// whenever a particle's current time falls inside that window.
#[derive(Debug, Clone, Default)]
pub struct FacetMoment {
    pub desorbed: f64,
    pub hits: f64,
    pub hit_equiv: f64,
    pub absorbed: f64,
    pub abs_equiv: f64,
    pub transparent: f64,
    pub sum_v_ort: f64,
    pub sum_1_per_v: f64,
    pub sum_1_per_v_ort: f64,
    pub distance_total: f64,
    pub distance_full_hits_only: f64,
    pub texture: Option<TextureAccumulator>,
    pub profile: Option<ProfileAccumulator>,
    pub histogram: Option<FacetHistograms>,
    pub direction: Option<DirectionAccumulator>,
}

impl FacetMoment {
    fn new(facet: &Facet) -> Self {
        FacetMoment {
            texture: facet.texture.as_ref().map(TextureAccumulator::new),
            profile: if facet.profile_type != ProfileType::None { Some(ProfileAccumulator::new()) } else { None },
            histogram: facet.histogram_params.as_ref().map(FacetHistograms::new),
            direction: if facet.count.count_direction { facet.texture.as_ref().map(DirectionAccumulator::new) } else { None },
            ..Default::default()
        }
    }

    fn merge_from(&mut self, other: &FacetMoment) {
        self.desorbed += other.desorbed;
        self.hits += other.hits;
        self.hit_equiv += other.hit_equiv;
        self.absorbed += other.absorbed;
        self.abs_equiv += other.abs_equiv;
        self.transparent += other.transparent;
        self.sum_v_ort += other.sum_v_ort;
        self.sum_1_per_v += other.sum_1_per_v;
        self.sum_1_per_v_ort += other.sum_1_per_v_ort;
        self.distance_total += other.distance_total;
        self.distance_full_hits_only += other.distance_full_hits_only;
        if let (Some(a), Some(b)) = (self.texture.as_mut(), other.texture.as_ref()) {
            a.merge_from(b);
        }
        if let (Some(a), Some(b)) = (self.profile.as_mut(), other.profile.as_ref()) {
            a.merge_from(b);
        }
        if let (Some(a), Some(b)) = (self.histogram.as_mut(), other.histogram.as_ref()) {
            a.merge_from(b);
        }
        if let (Some(a), Some(b)) = (self.direction.as_mut(), other.direction.as_ref()) {
            a.merge_from(b);
        }
    }

    fn reset(&mut self) {
        self.desorbed = 0.0;
        self.hits = 0.0;
        self.hit_equiv = 0.0;
        self.absorbed = 0.0;
        self.abs_equiv = 0.0;
        self.transparent = 0.0;
        self.sum_v_ort = 0.0;
        self.sum_1_per_v = 0.0;
        self.sum_1_per_v_ort = 0.0;
        self.distance_total = 0.0;
        self.distance_full_hits_only = 0.0;
        if let Some(t) = self.texture.as_mut() {
            for cell in t.cells.iter_mut() {
                *cell = Default::default();
            }
        }
        if let Some(p) = self.profile.as_mut() {
            for slice in p.slices.iter_mut() {
                *slice = Default::default();
            }
        }
        if let Some(h) = self.histogram.as_mut() {
            if let Some(b) = h.bounce.as_mut() {
                b.iter_mut().for_each(|x| *x = 0.0);
            }
            if let Some(b) = h.distance.as_mut() {
                b.iter_mut().for_each(|x| *x = 0.0);
            }
            if let Some(b) = h.time.as_mut() {
                b.iter_mut().for_each(|x| *x = 0.0);
            }
        }
        if let Some(d) = self.direction.as_mut() {
            for cell in d.cells.iter_mut() {
                *cell = Default::default();
            }
        }
    }
}

/// One facet's counters, replicated once per moment index (`1 +
/// model.moments.len()`, index 0 = steady state).
#[derive(Debug, Clone)]
pub struct FacetCounters {
    pub moments: Vec<FacetMoment>,
}

impl FacetCounters {
    pub(crate) fn new(facet: &Facet, moment_count: usize) -> Self {
        FacetCounters { moments: (0..moment_count).map(|_| FacetMoment::new(facet)).collect() }
    }

    /// Fold another worker's snapshot into this one.
    pub fn merge_from(&mut self, other: &FacetCounters) {
        for (a, b) in self.moments.iter_mut().zip(other.moments.iter()) {
            a.merge_from(b);
        }
    }

    /// Zero this worker-local snapshot after it has been folded into the
    /// shared global state, so the next merge only carries the delta.
    pub fn reset(&mut self) {
        for m in self.moments.iter_mut() {
            m.reset();
        }
    }

    /// Apply `f` to the steady-state snapshot, and additionally to the
    /// windowed snapshot at `moment_index` when it names one (`!= 0`).
    fn record(&mut self, moment_index: usize, mut f: impl FnMut(&mut FacetMoment)) {
        f(&mut self.moments[0]);
        if moment_index != 0 {
            f(&mut self.moments[moment_index]);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Desorbed,
    Bounced,
    Absorbed,
    Teleported,
    /// Crossed a link facet into another structure without reflecting.
    Linked,
    Leaked,
    /// Flight truncated by the time-limit or decay-time cutoff before
    /// reaching the next facet; the particle is discarded and the next
    /// `step()` call restarts from the source.
    WindowExpired,
    SourceExhausted,
}

pub struct Worker {
    pub rng: Rng,
    pub particle: Option<Particle>,
    pub angle_maps: Vec<Option<AngleMapTables>>,
    /// Worker-local recorded-angle-map accumulators, one per facet with
    /// `angle_map.record` set; folded into `GlobalState` on merge.
    pub angle_map_recordings: Vec<Option<AngleMapPdf>>,
    pub facet_counters: Vec<FacetCounters>,
    pub hit_cache: HitCache,
    pub leak_cache: LeakCache,
    pub desorbed_count: u64,
    pub fallback_count: u64,
    pub leaks_total: f64,
    /// One-shot armed state for volatile facets; flips to `false` the first
    /// time each is hit and never rearms for the life of this worker.
    volatile_ready: Vec<bool>,
    intersector: BruteForceIntersector,
}

impl Worker {
    pub fn new(prepared: &PreparedModel, seed: u64) -> Self {
        let moment_count = prepared.model.moment_count();
        Worker {
            rng: Rng::from_seed(seed),
            particle: None,
            angle_maps: prepared.angle_maps.clone(),
            angle_map_recordings: prepared
                .model
                .facets
                .iter()
                .map(|f| match &f.angle_map {
                    Some(params) if params.record => Some(AngleMapPdf::new(params)),
                    _ => None,
                })
                .collect(),
            facet_counters: prepared.model.facets.iter().map(|f| FacetCounters::new(f, moment_count)).collect(),
            hit_cache: HitCache::with_default_capacity(),
            leak_cache: LeakCache::with_default_capacity(),
            desorbed_count: 0,
            fallback_count: 0,
            leaks_total: 0.0,
            volatile_ready: vec![true; prepared.model.facets.len()],
            intersector: BruteForceIntersector,
        }
    }

    pub fn step(&mut self, prepared: &PreparedModel) -> StepOutcome {
        if self.particle.is_none() {
            return self.desorb(prepared);
        }

        let (pos, dir, struct_id, time, velocity, ori_ratio, moment_index) = {
            let p = self.particle.as_ref().unwrap();
            (p.pos, p.dir, p.struct_id, p.time, p.velocity, p.ori_ratio, p.moment_index)
        };
        let result = self.intersector.intersect(&prepared.model, pos, dir, struct_id, time, &mut self.rng);

        for &facet_id in &result.transparent_passes {
            self.facet_counters[facet_id as usize].record(moment_index, |m| m.transparent += ori_ratio);
        }

        let hit_facet_id = match result.hit {
            Some(id) => id,
            None => {
                let p = self.particle.take().unwrap();
                self.leak_cache.push(LeakCacheEntry { pos: p.pos, dir: p.dir });
                self.leaks_total += ori_ratio;
                return StepOutcome::Leaked;
            }
        };

        let global = &prepared.model.global;
        let dt = result.distance / (100.0 * velocity);
        let t_new = time + dt;
        let decay_time = self.particle.as_ref().unwrap().expected_decay_time;
        let exceeds_time = !global.calc_constant_flow && t_new > global.latest_moment;
        let exceeds_decay = global.enable_decay && matches!(decay_time, Some(td) if t_new > td);

        if exceeds_time || exceeds_decay {
            let time_budget = match (exceeds_time, exceeds_decay) {
                (true, true) => (global.latest_moment - time).min(decay_time.unwrap() - time),
                (true, false) => global.latest_moment - time,
                (false, true) => decay_time.unwrap() - time,
                (false, false) => unreachable!(),
            }
            .max(0.0);
            let remainder_distance = velocity * 100.0 * time_budget;
            self.facet_counters[hit_facet_id as usize].record(moment_index, |m| {
                m.distance_total += ori_ratio * remainder_distance;
            });
            let p = self.particle.take().unwrap();
            self.hit_cache.push(HitCacheEntry { pos: p.pos + p.dir * remainder_distance, facet_id: hit_facet_id, kind: crate::counters::hitcache::HitKind::Last });
            return StepOutcome::WindowExpired;
        }

        {
            let p = self.particle.as_mut().unwrap();
            p.advance(result.distance);
            p.last_hit_facet = Some(hit_facet_id);
            p.moment_index = prepared.model.moment_index_at(p.time).unwrap_or(0);
        }
        let moment_index = self.particle.as_ref().unwrap().moment_index;

        let facet = prepared.model.facet(hit_facet_id);

        if facet.teleport_dest != TELEPORT_OFF {
            self.do_teleport(prepared, facet);
            return StepOutcome::Teleported;
        }

        self.facet_counters[hit_facet_id as usize].record(moment_index, |m| {
            m.hits += 1.0;
            m.hit_equiv += ori_ratio;
            m.distance_total += ori_ratio * result.distance;
            m.distance_full_hits_only += ori_ratio * result.distance;
        });

        if facet.is_link() {
            return self.do_link(prepared, facet, hit_facet_id, moment_index);
        }

        if facet.is_volatile && self.volatile_ready[hit_facet_id as usize] {
            self.volatile_ready[hit_facet_id as usize] = false;
            self.record_absorb(prepared, facet, hit_facet_id, moment_index, ori_ratio);
            self.particle = None;
            return StepOutcome::Absorbed;
        }

        self.record_hit(prepared, facet, hit_facet_id, moment_index);

        let time = self.particle.as_ref().unwrap().time;
        let sticking = facet.sticking.value_at(time, &prepared.model.parameters).clamp(0.0, 1.0);

        if prepared.model.otf.low_flux_mode {
            let ori_ratio = self.particle.as_ref().unwrap().ori_ratio;
            self.record_absorb(prepared, facet, hit_facet_id, moment_index, ori_ratio * sticking);
            let p = self.particle.as_mut().unwrap();
            p.ori_ratio *= 1.0 - sticking;
            if p.ori_ratio < prepared.model.otf.low_flux_cutoff {
                self.particle = None;
                return StepOutcome::Absorbed;
            }
            self.do_bounce(prepared, facet);
            StepOutcome::Bounced
        } else if self.rng.uniform() < sticking {
            let ori_ratio = self.particle.as_ref().unwrap().ori_ratio;
            self.record_absorb(prepared, facet, hit_facet_id, moment_index, ori_ratio);
            self.particle = None;
            StepOutcome::Absorbed
        } else {
            self.do_bounce(prepared, facet);
            StepOutcome::Bounced
        }
    }

    fn desorb(&mut self, prepared: &PreparedModel) -> StepOutcome {
        if let Some(limit) = prepared.model.otf.desorption_limit {
            if self.desorbed_count >= limit {
                return StepOutcome::SourceExhausted;
            }
        }
        match start_from_source(&prepared.model, &prepared.tables, &mut self.angle_maps, prepared.total_outgassing, 0.0, &mut self.rng) {
            Ok(d) => {
                self.desorbed_count += 1;
                if d.used_fallback {
                    self.fallback_count += 1;
                }
                let moment_index = d.particle.moment_index;
                self.facet_counters[d.facet_id as usize].record(moment_index, |m| m.desorbed += d.particle.ori_ratio);
                self.hit_cache.push(HitCacheEntry { pos: d.pos, facet_id: d.facet_id, kind: crate::counters::hitcache::HitKind::Desorb });
                self.particle = Some(d.particle);
                StepOutcome::Desorbed
            }
            Err(_) => StepOutcome::SourceExhausted,
        }
    }

    fn record_hit(&mut self, prepared: &PreparedModel, facet: &Facet, facet_id: FacetId, moment_index: usize) {
        let p = self.particle.as_ref().unwrap();
        let v_ort = p.dir.dot(facet.plane.normal).abs() * p.velocity;
        let ori_ratio = p.ori_ratio;
        let (raw_u, raw_v) = local_uv(facet, p.pos);
        let (min_u, min_v, max_u, max_v) = facet.plane.bbox;
        let col_u = (raw_u - min_u) / (max_u - min_u).max(1e-12);
        let col_v = (raw_v - min_v) / (max_v - min_v).max(1e-12);

        let (incident_theta, incident_phi) = local_angles_of(&facet.plane, -p.dir);
        if let Some(params) = &facet.angle_map {
            if params.record {
                if let Some(pdf) = self.angle_map_recordings[facet_id as usize].as_mut() {
                    pdf.record(params, incident_theta, incident_phi);
                }
            }
        }

        self.facet_counters[facet_id as usize].record(moment_index, |m| {
            m.sum_v_ort += ori_ratio * v_ort;
            m.sum_1_per_v += ori_ratio / p.velocity;
            if v_ort > 0.0 {
                m.sum_1_per_v_ort += ori_ratio / v_ort;
            }
        });

        if let Some(grid) = &facet.texture {
            if let Some(idx) = grid.cell_index(col_u, col_v) {
                let inc = grid.inc[idx];
                let dir_times_speed = p.dir * p.velocity;
                self.facet_counters[facet_id as usize].record(moment_index, |m| {
                    m.texture.as_mut().unwrap().record(idx, v_ort, inc, ori_ratio);
                    if let Some(d) = m.direction.as_mut() {
                        d.record(idx, dir_times_speed, ori_ratio);
                    }
                });
            }
        }

        if facet.profile_type != ProfileType::None {
            let speed_ref = profile_speed_ref(&prepared.model.global, facet.temperature);
            let normalized = profile_coordinate(facet.profile_type, col_u, col_v, incident_theta, p.velocity, speed_ref);
            self.facet_counters[facet_id as usize].record(moment_index, |m| {
                m.profile.as_mut().unwrap().record(normalized, v_ort, ori_ratio);
            });
        }
    }

    fn record_absorb(&mut self, prepared: &PreparedModel, facet: &Facet, facet_id: FacetId, moment_index: usize, weight: f64) {
        let p = self.particle.as_ref().unwrap();
        let v_ort = p.dir.dot(facet.plane.normal).abs() * p.velocity;
        let (raw_u, raw_v) = local_uv(facet, p.pos);
        let (min_u, min_v, max_u, max_v) = facet.plane.bbox;
        let col_u = (raw_u - min_u) / (max_u - min_u).max(1e-12);
        let col_v = (raw_v - min_v) / (max_v - min_v).max(1e-12);

        self.facet_counters[facet_id as usize].record(moment_index, |m| {
            m.absorbed += 1.0;
            m.abs_equiv += weight;
        });

        if let Some(params) = &facet.histogram_params {
            let bounce_count = p.bounce_count as f64;
            let distance = p.distance_traveled;
            let flight_time = p.time - p.generation_time;
            self.facet_counters[facet_id as usize].record(moment_index, |m| {
                m.histogram.as_mut().unwrap().record(params, bounce_count, distance, flight_time, weight);
            });
        }

        if let Some(grid) = &facet.texture {
            if let Some(idx) = grid.cell_index(col_u, col_v) {
                let inc = grid.inc[idx];
                let dir_times_speed = p.dir * p.velocity;
                self.facet_counters[facet_id as usize].record(moment_index, |m| {
                    m.texture.as_mut().unwrap().record_absorbed(idx, v_ort, inc, weight);
                    if let Some(d) = m.direction.as_mut() {
                        d.record(idx, dir_times_speed, weight);
                    }
                });
            }
        }

        if facet.profile_type != ProfileType::None {
            let (incident_theta, _) = local_angles_of(&facet.plane, -p.dir);
            let speed_ref = profile_speed_ref(&prepared.model.global, facet.temperature);
            let normalized = profile_coordinate(facet.profile_type, col_u, col_v, incident_theta, p.velocity, speed_ref);
            self.facet_counters[facet_id as usize].record(moment_index, |m| {
                m.profile.as_mut().unwrap().record(normalized, v_ort, weight);
            });
        }

        self.hit_cache.push(HitCacheEntry { pos: p.pos, facet_id, kind: crate::counters::hitcache::HitKind::Absorb });
    }

    fn do_bounce(&mut self, prepared: &PreparedModel, facet: &Facet) {
        let cdf_id = facet.cdf_id.expect("cdf built by prepare()");
        let mut speed = prepared.tables.cdfs[cdf_id as usize].sample(self.rng.uniform());

        if let Some(sojourn) = &facet.sojourn {
            if sojourn.enabled {
                let a = (-sojourn.binding_energy_j_per_mol / (GAS_CONSTANT * facet.temperature)).exp();
                let r = self.rng.uniform();
                let dt = -r.ln() / (a * sojourn.frequency_hz);
                self.particle.as_mut().unwrap().time += dt;
            }
        }

        let p = self.particle.as_mut().unwrap();
        let (incident_theta, incident_phi) = local_angles_of(&facet.plane, -p.dir);
        let (theta, phi) = sample_reflection(&mut self.rng, &facet.reflection, incident_theta, incident_phi);
        let mut dir = local_to_world(&facet.plane, theta, phi);

        if facet.is_moving {
            let outgoing = dir * speed + facet_velocity(&prepared.model.global, true, p.pos);
            speed = outgoing.magnitude();
            if speed > 0.0 {
                dir = outgoing / speed;
            }
        }

        p.dir = dir;
        p.velocity = speed;
        self.hit_cache.push(HitCacheEntry { pos: p.pos, facet_id: facet.id, kind: crate::counters::hitcache::HitKind::Bounce });
    }

    /// A link facet hops the particle into another structure as a
    /// transparent pass rather than reflecting it.
    fn do_link(&mut self, prepared: &PreparedModel, facet: &Facet, facet_id: FacetId, moment_index: usize) -> StepOutcome {
        let p = self.particle.as_mut().unwrap();
        let ori_ratio = p.ori_ratio;

        let outgoing = p.dir * p.velocity;
        let corrected = correct_outgoing_velocity(&prepared.model.global, facet.is_moving, p.pos, outgoing);
        let speed = corrected.magnitude();
        if speed > 0.0 {
            p.dir = corrected / speed;
            p.velocity = speed;
        }
        p.struct_id = facet.super_dest - 1;
        p.last_hit_facet = Some(facet_id);
        self.facet_counters[facet_id as usize].record(moment_index, |m| m.transparent += ori_ratio);
        self.hit_cache.push(HitCacheEntry { pos: p.pos, facet_id, kind: crate::counters::hitcache::HitKind::Bounce });
        StepOutcome::Linked
    }

    fn do_teleport(&mut self, prepared: &PreparedModel, facet: &Facet) {
        let p = self.particle.as_mut().unwrap();
        let dest_id = if facet.teleport_dest == TELEPORT_FROM_WHENCE {
            p.teleport_from.max(0) as u32
        } else {
            (facet.teleport_dest - 1) as u32
        };
        let (col_u, col_v) = local_uv(facet, p.pos);
        let dest_facet = prepared.model.facet(dest_id);
        p.pos = dest_facet.world_point(col_u, col_v);
        p.teleport_from = facet.id as i32;
        p.struct_id = dest_facet.super_idx;
    }
}

fn local_uv(facet: &Facet, point: cgmath::Point3<f64>) -> (f64, f64) {
    let rel = point - facet.plane.origin;
    (rel.dot(facet.plane.u), rel.dot(facet.plane.v))
}

/// Reference speed used to normalize the speed-family profiles into `[0,
/// 1]`, matching the `4 * v_prob` span `Cdf::build` bins its speed axis
/// over.
fn profile_speed_ref(global: &crate::model::GlobalParams, temperature: f64) -> f64 {
    let v_prob = (2.0 * GAS_CONSTANT * temperature / (global.gas_mass / 1000.0)).sqrt();
    4.0 * v_prob
}

/// Normalize a hit's axis value to `[0, 1)` for the profile slice it falls
/// into, per `facet.profile_type`.
fn profile_coordinate(profile_type: ProfileType, col_u: f64, col_v: f64, incident_theta: f64, velocity: f64, speed_ref: f64) -> f64 {
    match profile_type {
        ProfileType::None => 0.0,
        ProfileType::PressureU => col_u,
        ProfileType::PressureV => col_v,
        ProfileType::Angular => incident_theta / std::f64::consts::FRAC_PI_2,
        ProfileType::Speed | ProfileType::OrthogonalSpeed | ProfileType::TangentialSpeed => velocity / speed_ref,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::facet::{CountFlags, DesorbType, OutgassingSource, ParamOr, PlaneBasis, ProfileType, ReflectionLaw, Sojourn};
    use crate::model::{GlobalParams, Model, Moment, MotionType, OnTheFlyParams};
    use cgmath::{Point3, Vector3};

    fn two_facet_box() -> Model {
        let source = Facet {
            id: 0,
            indices: vec![0, 1, 2, 3],
            plane: PlaneBasis { origin: Point3::new(0.0, 0.0, 0.0), u: Vector3::new(1.0, 0.0, 0.0), v: Vector3::new(0.0, 1.0, 0.0), normal: Vector3::new(0.0, 0.0, 1.0), bbox: (0.0, 0.0, 1.0, 1.0) },
            vertices_2d: vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)],
            area: 1.0,
            is_two_sided: false,
            temperature: 300.0,
            opacity: ParamOr::Constant(1.0),
            sticking: ParamOr::Constant(0.0),
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
        };
        let mut absorber = source.clone();
        absorber.id = 1;
        absorber.plane.origin = Point3::new(0.0, 0.0, 5.0);
        absorber.plane.normal = Vector3::new(0.0, 0.0, -1.0);
        absorber.sticking = ParamOr::Constant(1.0);

        Model {
            vertices: vec![],
            facets: vec![source, absorber],
            superstructures: vec![],
            parameters: vec![],
            moments: vec![Moment { center: 1.0, width: 0.5 }],
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
                latest_moment: 1.25,
            },
        }
    }

    #[test]
    fn particle_desorbs_flies_and_is_absorbed() {
        let model = two_facet_box();
        let prepared = crate::simulation::precompute::prepare(model).unwrap();
        let mut worker = Worker::new(&prepared, 42);

        let mut outcomes = vec![];
        for _ in 0..50 {
            outcomes.push(worker.step(&prepared));
            if worker.facet_counters[1].moments[0].absorbed > 0.0 {
                break;
            }
        }
        assert!(outcomes.contains(&StepOutcome::Desorbed));
        assert!(worker.facet_counters[1].moments[0].absorbed > 0.0 || worker.facet_counters[1].moments[0].hits > 0.0);
    }

    #[test]
    fn link_facet_hops_structure_as_transparent_pass() {
        let mut model = two_facet_box();
        model.facets[0].super_dest = 2;
        model.superstructures = vec![crate::model::Superstructure { facet_ids: vec![0] }, crate::model::Superstructure { facet_ids: vec![1] }];
        let prepared = crate::simulation::precompute::prepare(model).unwrap();
        let mut worker = Worker::new(&prepared, 7);
        worker.particle = Some(Particle::new(Point3::new(0.5, 0.5, 0.0), Vector3::new(0.0, 0.0, 1.0), 300.0, 0.0, -1, 1.0));

        let facet = prepared.model.facet(0);
        let outcome = worker.do_link(&prepared, facet, 0, 0);

        assert_eq!(outcome, StepOutcome::Linked);
        assert_eq!(worker.facet_counters[0].moments[0].transparent, 1.0);
        assert_eq!(worker.particle.unwrap().struct_id, 1);
    }

    #[test]
    fn volatile_facet_absorbs_once_then_stays_inert() {
        let mut model = two_facet_box();
        model.facets[1].is_volatile = true;
        model.facets[1].sticking = ParamOr::Constant(0.0);
        let prepared = crate::simulation::precompute::prepare(model).unwrap();
        let mut worker = Worker::new(&prepared, 11);

        let mut absorbed_at_first_hit = None;
        for _ in 0..200 {
            worker.step(&prepared);
            if worker.facet_counters[1].moments[0].hits > 0.0 && absorbed_at_first_hit.is_none() {
                absorbed_at_first_hit = Some(worker.facet_counters[1].moments[0].absorbed);
            }
        }
        assert_eq!(absorbed_at_first_hit, Some(1.0));
        assert_eq!(worker.facet_counters[1].moments[0].absorbed, 1.0);
        assert!(worker.facet_counters[1].moments[0].hits > 1.0);
    }

    #[test]
    fn sojourn_adds_dwell_time_on_bounce() {
        let mut model = two_facet_box();
        model.facets[1].sojourn = Some(Sojourn { enabled: true, frequency_hz: 1e13, binding_energy_j_per_mol: 50_000.0 });
        let prepared = crate::simulation::precompute::prepare(model).unwrap();
        let mut worker = Worker::new(&prepared, 3);

        worker.particle = Some(Particle::new(Point3::new(0.5, 0.5, 5.0), Vector3::new(0.0, 0.0, 1.0), 300.0, 0.0, -1, 1.0));
        let before = worker.particle.as_ref().unwrap().time;
        let facet = prepared.model.facet(1);
        worker.do_bounce(&prepared, facet);
        let after = worker.particle.as_ref().unwrap().time;

        assert!(after > before);
    }

    #[test]
    fn decay_enabled_truncates_flight_and_restarts_from_source() {
        let mut model = two_facet_box();
        model.global.enable_decay = true;
        model.global.halflife = 1e-9;
        let prepared = crate::simulation::precompute::prepare(model).unwrap();
        let mut worker = Worker::new(&prepared, 5);
        worker.particle = Some(Particle::new(Point3::new(0.5, 0.5, 0.0), Vector3::new(0.0, 0.0, 1.0), 300.0, 0.0, -1, 1.0));
        worker.particle.as_mut().unwrap().expected_decay_time = Some(1e-12);

        let outcome = worker.step(&prepared);
        assert_eq!(outcome, StepOutcome::WindowExpired);
        assert!(worker.particle.is_none());
        assert!(worker.facet_counters[1].moments[0].distance_total >= 0.0);
    }
}
