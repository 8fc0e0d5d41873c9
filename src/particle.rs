//! Per-worker particle state.

use cgmath::{Point3, Vector3};

use crate::model::facet::{FacetId, TELEPORT_FROM_WHENCE};

#[derive(Debug, Clone, Copy)]
pub struct Particle {
    pub pos: Point3<f64>,
    pub dir: Vector3<f64>,
    pub velocity: f64,

    /// Simulation time since the run started, in seconds.
    pub time: f64,
    /// Time at which this particle was desorbed, used for sojourn/decay
    /// bookkeeping.
    pub generation_time: f64,

    pub struct_id: i32,
    /// Facet this particle last bounced off, `None` right after desorption.
    pub last_hit_facet: Option<FacetId>,
    /// Facet a teleport last departed from, so a `TELEPORT_FROM_WHENCE`
    /// destination can send it back.
    pub teleport_from: i32,

    /// Simulated decay time for a radioactive species; `None` when decay is
    /// disabled.
    pub expected_decay_time: Option<f64>,

    /// Low-flux mode statistical weight; 1.0 outside low-flux mode.
    pub ori_ratio: f64,

    pub bounce_count: u32,
    pub distance_traveled: f64,

    /// Index into `model.moments` (offset by one, 0 = steady state) the
    /// particle currently falls into, refreshed every step.
    pub moment_index: usize,
}

impl Particle {
    pub fn new(pos: Point3<f64>, dir: Vector3<f64>, velocity: f64, time: f64, struct_id: i32, ori_ratio: f64) -> Self {
        Particle {
            pos,
            dir,
            velocity,
            time,
            generation_time: time,
            struct_id,
            last_hit_facet: None,
            teleport_from: TELEPORT_FROM_WHENCE,
            expected_decay_time: None,
            ori_ratio,
            bounce_count: 0,
            distance_traveled: 0.0,
            moment_index: 0,
        }
    }

    pub fn has_decayed(&self) -> bool {
        matches!(self.expected_decay_time, Some(t) if self.time >= t)
    }

    pub fn advance(&mut self, distance_cm: f64) {
        self.pos += self.dir * distance_cm;
        self.distance_traveled += distance_cm;
        self.time += distance_cm / (100.0 * self.velocity);
        self.bounce_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_position_and_time() {
        let mut p = Particle::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0), 2.0, 0.0, -1, 1.0);
        p.advance(4.0);
        assert_eq!(p.pos, Point3::new(4.0, 0.0, 0.0));
        assert_eq!(p.time, 0.02);
        assert_eq!(p.bounce_count, 1);
    }

    #[test]
    fn has_decayed_respects_expected_time() {
        let mut p = Particle::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0), 1.0, 0.0, -1, 1.0);
        p.expected_decay_time = Some(5.0);
        assert!(!p.has_decayed());
        p.time = 5.0;
        assert!(p.has_decayed());
    }
}
