//! Simulation orchestration. A controller owns the prepared model and
//! shared result state; each worker thread runs its own [`worker::Worker`]
//! loop and periodically folds its snapshot back in through
//! [`merge::merge`].

pub mod merge;
pub mod moving;
pub mod precompute;
pub mod source;
pub mod worker;

pub use merge::{merge, GlobalState};
pub use precompute::{prepare, validate_config, PreparedModel};
pub use worker::{StepOutcome, Worker};

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;

/// Particle-level steps a worker takes between opportunities to merge. Kept
/// small enough that a paused/stopped controller reacts promptly.
const STEPS_PER_MERGE_ATTEMPT: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationControllerStatus {
    Idle,
    Running,
    Stopping,
}

struct WorkerHandle {
    stop_tx: Sender<()>,
    join: Option<JoinHandle<()>>,
}

pub struct SimulationController {
    pub status: SimulationControllerStatus,
    prepared: Arc<PreparedModel>,
    pub shared: Arc<Mutex<GlobalState>>,
    workers: Vec<WorkerHandle>,
    merge_timeout: Duration,
}

impl SimulationController {
    pub fn new(prepared: PreparedModel, merge_timeout: Duration) -> Self {
        let shared = Arc::new(Mutex::new(GlobalState::new(&prepared)));
        SimulationController { status: SimulationControllerStatus::Idle, prepared: Arc::new(prepared), shared, workers: Vec::new(), merge_timeout }
    }

    /// Spawn `nb_workers` threads, each running its own particle loop
    /// against a shared read-only copy of the prepared model.
    pub fn start(&mut self, nb_workers: usize, seed_base: u64) {
        self.stop();
        self.status = SimulationControllerStatus::Running;

        for i in 0..nb_workers {
            let (stop_tx, stop_rx) = unbounded();
            let prepared = Arc::clone(&self.prepared);
            let shared = Arc::clone(&self.shared);
            let merge_timeout = self.merge_timeout;
            let seed = seed_base.wrapping_add(i as u64);

            let join = std::thread::spawn(move || {
                let mut worker = Worker::new(&prepared, seed);
                let mut since_merge = 0u32;
                loop {
                    if stop_rx.try_recv().is_ok() {
                        break;
                    }
                    if worker.step(&prepared) == StepOutcome::SourceExhausted {
                        break;
                    }
                    since_merge += 1;
                    if since_merge >= STEPS_PER_MERGE_ATTEMPT {
                        since_merge = 0;
                        let _ = merge(&shared, &mut worker, merge_timeout);
                    }
                }
                // Final merge blocks longer: losing the tail of a stopped
                // run's statistics would be worse than a short stall.
                let _ = merge(&shared, &mut worker, Duration::from_secs(5));
            });

            self.workers.push(WorkerHandle { stop_tx, join: Some(join) });
        }
    }

    /// Signal every worker to stop and join its thread.
    pub fn stop(&mut self) {
        self.status = SimulationControllerStatus::Stopping;
        for handle in &self.workers {
            let _ = handle.stop_tx.send(());
        }
        for handle in self.workers.iter_mut() {
            if let Some(join) = handle.join.take() {
                let _ = join.join();
            }
        }
        self.workers.clear();
        self.status = SimulationControllerStatus::Idle;
    }

    /// A point-in-time copy of the shared global state, safe to export or
    /// render while workers keep running.
    pub fn snapshot(&self) -> GlobalState {
        self.shared.lock().clone()
    }

    pub fn model(&self) -> &crate::model::Model {
        &self.prepared.model
    }
}

impl Drop for SimulationController {
    fn drop(&mut self) {
        self.stop();
    }
}
