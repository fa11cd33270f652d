use std::sync::Arc;

use log::{error, info};
use tracing::Span;

use crate::catalog::Job;
use crate::error::WorkerError;
use crate::pipeline::progress::ProgressReporter;
use crate::pipeline::Pipeline;
use crate::worker::pool::WorkerPool;
use crate::worker::summary::{RunSummary, SummaryAccumulator};

/// Fans jobs out to a worker pool and gathers their outcomes.
pub struct Scheduler {
    pipeline: Arc<Pipeline>,
    progress: Arc<dyn ProgressReporter>,
    worker_count: usize,
}

impl Scheduler {
    pub fn new(
        pipeline: Arc<Pipeline>,
        progress: Arc<dyn ProgressReporter>,
        worker_count: usize,
    ) -> Self {
        Self {
            pipeline,
            progress,
            worker_count,
        }
    }

    /// Workers actually started for `job_count` jobs: never zero, never more
    /// than there are jobs.
    pub fn effective_workers(&self, job_count: usize) -> usize {
        self.worker_count.clamp(1, job_count.max(1))
    }

    pub fn run(&self, jobs: &[Job]) -> Result<RunSummary, WorkerError> {
        self.run_with(jobs, SummaryAccumulator::new(jobs.len()))
    }

    /// Runs every job once and returns the sealed summary. Returns an error
    /// only when no worker could be started.
    pub fn run_with(
        &self,
        jobs: &[Job],
        accumulator: SummaryAccumulator,
    ) -> Result<RunSummary, WorkerError> {
        let workers = self.effective_workers(jobs.len());
        info!("Scheduling {} jobs on {} workers", jobs.len(), workers);

        let arena: Arc<[Job]> = jobs.to_vec().into();
        let pool = WorkerPool::spawn(
            arena,
            Arc::clone(&self.pipeline),
            Arc::clone(&self.progress),
            workers,
            Span::current(),
        )?;

        while let Some(outcome) = pool.recv_result() {
            if let Err(e) = accumulator.record(outcome) {
                error!("Discarding outcome: {}", e);
            }
        }
        pool.wait();

        Ok(accumulator.finish(jobs))
    }
}
