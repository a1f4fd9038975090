//! Background recommendation runner.
//!
//! Bundle generation is CPU-bound; the runner moves it onto its own thread so
//! an interactive caller stays responsive while the workflow is `Calculating`.

use std::thread;

use thiserror::Error;
use tracing::{debug, warn};

use fieldrep_catalog::Product;
use fieldrep_exchange::{
    AbortHandle, AvailabilitySet, BundleEngine, Recommendation, RecommendError,
    RecommendationRequest, RemovalSet,
};

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to spawn recommendation thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("recommendation thread panicked")]
    Panicked,

    #[error(transparent)]
    Recommend(#[from] RecommendError),
}

/// Owned inputs of one background run.
#[derive(Debug, Clone, Default)]
pub struct RecommendationJob {
    pub removed: RemovalSet,
    pub available: AvailabilitySet,
    pub catalog: Vec<Product>,
}

/// Spawns recommendation runs on named worker threads.
#[derive(Debug, Clone)]
pub struct RecommendationRunner {
    engine: BundleEngine,
    thread_name: String,
}

impl RecommendationRunner {
    pub fn new(engine: BundleEngine) -> Self {
        Self {
            engine,
            thread_name: "fieldrep-recommend".to_string(),
        }
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn spawn(&self, job: RecommendationJob) -> Result<RecommendationTask, RunnerError> {
        let abort = AbortHandle::new();
        let engine = self.engine.clone();
        let worker_abort = abort.clone();

        let join = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || {
                let request = RecommendationRequest {
                    removed: &job.removed,
                    available: &job.available,
                    catalog: &job.catalog,
                };
                engine.recommend_with_abort(request, &worker_abort)
            })?;

        debug!(thread = %self.thread_name, "recommendation run spawned");
        Ok(RecommendationTask { abort, join })
    }
}

/// A running recommendation.
#[derive(Debug)]
pub struct RecommendationTask {
    abort: AbortHandle,
    join: thread::JoinHandle<Result<Recommendation, RecommendError>>,
}

impl RecommendationTask {
    /// Ask the run to stop; `wait` then returns `RecommendError::Aborted`
    /// unless the run already finished.
    pub fn abort(&self) {
        self.abort.abort();
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub fn wait(self) -> Result<Recommendation, RunnerError> {
        match self.join.join() {
            Ok(result) => Ok(result?),
            Err(_) => {
                warn!("recommendation thread panicked");
                Err(RunnerError::Panicked)
            }
        }
    }
}
