//! Folding worker-local accumulators into the shared global state under a
//! timed mutex. A worker that can't acquire the lock within its deadline
//! just keeps simulating and retries later; a stalled merge must never
//! block forward progress.

use std::time::Duration;

use parking_lot::Mutex;

use crate::counters::{HitCache, LeakCache};
use crate::error::MergeTimeout;
use crate::simulation::precompute::PreparedModel;
use crate::simulation::worker::{FacetCounters, Worker};
use crate::tables::anglemap::AngleMapPdf;

#[derive(Clone)]
pub struct GlobalState {
    pub facet_counters: Vec<FacetCounters>,
    /// Folded recorded-angle-map hit counts, one slot per facet that has
    /// `angle_map.record` set.
    pub angle_map_recordings: Vec<Option<AngleMapPdf>>,
    pub hit_cache: HitCache,
    pub leak_cache: LeakCache,
    pub desorbed_count: u64,
    pub fallback_count: u64,
    pub leaks_total: f64,
    /// Each facet's `texture.large_enough` mask, cached here so autoscaling
    /// after a merge doesn't need the model.
    texture_masks: Vec<Option<Vec<bool>>>,
    /// Autoscaled (min, max) of the steady-state texture per facet, kept up
    /// to date after every merge.
    pub texture_ranges: Vec<Option<(f64, f64)>>,
}

impl GlobalState {
    pub fn new(prepared: &PreparedModel) -> Self {
        let moment_count = prepared.model.moment_count();
        GlobalState {
            facet_counters: prepared.model.facets.iter().map(|f| FacetCounters::new(f, moment_count)).collect(),
            angle_map_recordings: prepared
                .model
                .facets
                .iter()
                .map(|f| match &f.angle_map {
                    Some(params) if params.record => Some(AngleMapPdf::new(params)),
                    _ => None,
                })
                .collect(),
            hit_cache: HitCache::with_default_capacity(),
            leak_cache: LeakCache::with_default_capacity(),
            desorbed_count: 0,
            fallback_count: 0,
            leaks_total: 0.0,
            texture_masks: prepared.model.facets.iter().map(|f| f.texture.as_ref().map(|g| g.large_enough.clone())).collect(),
            texture_ranges: vec![None; prepared.model.facets.len()],
        }
    }
}

/// Merges `worker`'s current snapshot into `shared`, then zeroes the
/// worker's local counters so future merges only carry deltas. Returns
/// `Err(MergeTimeout)` if the lock isn't free within `timeout`.
pub fn merge(shared: &Mutex<GlobalState>, worker: &mut Worker, timeout: Duration) -> Result<(), MergeTimeout> {
    let mut guard = shared.try_lock_for(timeout).ok_or(MergeTimeout)?;

    for (dst, src) in guard.facet_counters.iter_mut().zip(worker.facet_counters.iter()) {
        dst.merge_from(src);
    }
    for (dst, src) in guard.angle_map_recordings.iter_mut().zip(worker.angle_map_recordings.iter()) {
        if let (Some(a), Some(b)) = (dst.as_mut(), src.as_ref()) {
            a.merge_from(b);
        }
    }
    for entry in worker.hit_cache.entries() {
        guard.hit_cache.push(*entry);
    }
    for entry in worker.leak_cache.entries() {
        guard.leak_cache.push(*entry);
    }
    guard.desorbed_count += worker.desorbed_count;
    guard.fallback_count += worker.fallback_count;
    guard.leaks_total += worker.leaks_total;

    let ranges: Vec<Option<(f64, f64)>> = guard
        .facet_counters
        .iter()
        .zip(guard.texture_masks.iter())
        .map(|(c, mask)| match (&c.moments[0].texture, mask) {
            (Some(t), Some(m)) => t.autoscale(m),
            _ => None,
        })
        .collect();
    guard.texture_ranges = ranges;
    drop(guard);

    for counters in worker.facet_counters.iter_mut() {
        counters.reset();
    }
    worker.desorbed_count = 0;
    worker.fallback_count = 0;
    worker.leaks_total = 0.0;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::facet::{CountFlags, DesorbType, Facet, OutgassingSource, ParamOr, PlaneBasis, ProfileType, ReflectionLaw};
    use crate::model::{GlobalParams, Model, Moment, MotionType, OnTheFlyParams};
    use cgmath::{Point3, Vector3};

    fn single_facet_model() -> Model {
        let facet = Facet {
            id: 0,
            indices: vec![0, 1, 2, 3],
            plane: PlaneBasis { origin: Point3::new(0.0, 0.0, 0.0), u: Vector3::new(1.0, 0.0, 0.0), v: Vector3::new(0.0, 1.0, 0.0), normal: Vector3::new(0.0, 0.0, 1.0), bbox: (0.0, 0.0, 1.0, 1.0) },
            vertices_2d: vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)],
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
        };
        Model {
            vertices: vec![],
            facets: vec![facet],
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
    fn merge_accumulates_and_resets_worker_state() {
        let prepared = crate::simulation::precompute::prepare(single_facet_model()).unwrap();
        let shared = Mutex::new(GlobalState::new(&prepared));
        let mut worker = Worker::new(&prepared, 1);

        for _ in 0..20 {
            worker.step(&prepared);
        }
        let desorbed_before = worker.desorbed_count;
        assert!(desorbed_before > 0);

        merge(&shared, &mut worker, Duration::from_millis(100)).unwrap();
        assert_eq!(worker.desorbed_count, 0);
        assert_eq!(shared.lock().desorbed_count, desorbed_before);
    }

    #[test]
    fn merge_times_out_on_held_lock() {
        let prepared = crate::simulation::precompute::prepare(single_facet_model()).unwrap();
        let shared = Mutex::new(GlobalState::new(&prepared));
        let mut worker = Worker::new(&prepared, 1);
        let _guard = shared.lock();
        assert_eq!(merge(&shared, &mut worker, Duration::from_millis(10)), Err(MergeTimeout));
    }
}
