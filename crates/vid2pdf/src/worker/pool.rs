use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info};
use tracing::Span;

use crate::catalog::Job;
use crate::error::WorkerError;
use crate::pipeline::progress::{ProgressEvent, ProgressReporter};
use crate::pipeline::state::Stage;
use crate::pipeline::Pipeline;
use crate::worker::job::JobOutcome;

/// Fixed set of threads draining a queue of catalog positions.
///
/// The queue is filled with every position before the workers start and its
/// sender is dropped, so each position is handed out exactly once and workers
/// exit when it runs dry.
pub struct WorkerPool {
    result_receiver: Receiver<JobOutcome>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(
        jobs: Arc<[Job]>,
        pipeline: Arc<Pipeline>,
        progress: Arc<dyn ProgressReporter>,
        worker_count: usize,
        run_span: Span,
    ) -> Result<Self, WorkerError> {
        let worker_count = worker_count.max(1);
        let (job_sender, job_receiver) = unbounded::<usize>();
        let (result_sender, result_receiver) = unbounded::<JobOutcome>();

        for position in 0..jobs.len() {
            job_sender
                .send(position)
                .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;
        }
        drop(job_sender);

        let mut workers = Vec::with_capacity(worker_count);
        let mut last_error = None;

        for worker_id in 0..worker_count {
            let job_rx = job_receiver.clone();
            let result_tx = result_sender.clone();
            let worker_jobs = Arc::clone(&jobs);
            let worker_pipeline = Arc::clone(&pipeline);
            let worker_progress = Arc::clone(&progress);
            let span = run_span.clone();

            let spawned = thread::Builder::new()
                .name(format!("vid2pdf-worker-{}", worker_id))
                .spawn(move || {
                    let _run = span.entered();
                    run_worker(
                        worker_id,
                        worker_jobs,
                        job_rx,
                        result_tx,
                        worker_pipeline,
                        worker_progress,
                    );
                });

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    error!("Failed to spawn worker {}: {}", worker_id, e);
                    last_error = Some(e.to_string());
                }
            }
        }

        if workers.is_empty() {
            return Err(WorkerError::SpawnFailed(
                last_error.unwrap_or_else(|| "no workers started".to_string()),
            ));
        }

        info!("Started {} workers", workers.len());

        Ok(Self {
            result_receiver,
            workers,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Blocks for the next outcome. `None` once every worker has exited.
    pub fn recv_result(&self) -> Option<JobOutcome> {
        self.result_receiver.recv().ok()
    }

    pub fn wait(self) {
        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }
}

fn run_worker(
    worker_id: usize,
    jobs: Arc<[Job]>,
    job_receiver: Receiver<usize>,
    result_sender: Sender<JobOutcome>,
    pipeline: Arc<Pipeline>,
    progress: Arc<dyn ProgressReporter>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        match job_receiver.recv() {
            Ok(position) => {
                let Some(job) = jobs.get(position) else {
                    error!("Worker {} got unknown position {}", worker_id, position);
                    continue;
                };
                debug!("Worker {} processing {}", worker_id, job.file_name);

                let tracker = StageTracker::new(progress.as_ref());
                let outcome =
                    match panic::catch_unwind(AssertUnwindSafe(|| pipeline.run(job, &tracker))) {
                        Ok(outcome) => outcome,
                        Err(payload) => pipeline.recover_from_panic(
                            job,
                            tracker.current_stage(),
                            &panic_message(payload.as_ref()),
                        ),
                    };

                if let Err(e) = result_sender.send(outcome) {
                    error!("Worker {} failed to send result: {}", worker_id, e);
                    break;
                }
            }
            Err(crossbeam_channel::RecvError) => {
                debug!("Worker {} job queue drained", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}

/// Forwards events and remembers which stage the job is in, so a panic can be
/// attributed to it.
struct StageTracker<'a> {
    inner: &'a dyn ProgressReporter,
    current: Mutex<Stage>,
}

impl<'a> StageTracker<'a> {
    fn new(inner: &'a dyn ProgressReporter) -> Self {
        Self {
            inner,
            current: Mutex::new(Stage::Extract),
        }
    }

    fn current_stage(&self) -> Stage {
        self.current
            .lock()
            .map(|s| *s)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }
}

impl ProgressReporter for StageTracker<'_> {
    fn report(&self, job: &Job, event: ProgressEvent) {
        if let ProgressEvent::Transition { to, .. } = &event {
            if !to.is_terminal() {
                if let Ok(mut current) = self.current.lock() {
                    *current = to.stage();
                }
            }
        }
        self.inner.report(job, event);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::OutputLayout;
    use crate::error::StageError;
    use crate::pipeline::progress::NoopProgress;
    use crate::stages::{FrameExtractor, FrameSet, PageAssembler};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    struct FailingExtractor;

    impl FrameExtractor for FailingExtractor {
        fn extract(&self, _job: &Job) -> Result<FrameSet, StageError> {
            Err(StageError::ExtractionFailed {
                exit_code: Some(1),
                stderr_tail: "no".to_string(),
            })
        }
    }

    struct PanickingExtractor;

    impl FrameExtractor for PanickingExtractor {
        fn extract(&self, job: &Job) -> Result<FrameSet, StageError> {
            if job.position == 1 {
                panic!("decoder blew up");
            }
            Err(StageError::ExtractionFailed {
                exit_code: Some(1),
                stderr_tail: "no".to_string(),
            })
        }
    }

    struct UnusedAssembler;

    impl PageAssembler for UnusedAssembler {
        fn assemble(&self, _job: &Job, _frames: &FrameSet) -> Result<PathBuf, StageError> {
            unreachable!("extraction always fails in these tests")
        }
    }

    fn jobs(root: &Path, n: usize) -> Arc<[Job]> {
        let layout = OutputLayout::new(root.join("out"));
        (0..n)
            .map(|i| {
                let stem = format!("{:03}", i + 1);
                Job::new(i, root.join(format!("{}.mp4", stem)), stem, &layout)
            })
            .collect::<Vec<_>>()
            .into()
    }

    fn drain(pool: WorkerPool) -> Vec<JobOutcome> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = pool.recv_result() {
            outcomes.push(outcome);
        }
        pool.wait();
        outcomes
    }

    #[test]
    fn test_every_job_runs_exactly_once() {
        let temp_dir = TempDir::new().unwrap();
        let jobs = jobs(temp_dir.path(), 10);
        let pipeline = Arc::new(Pipeline::new(
            Arc::new(FailingExtractor),
            Arc::new(UnusedAssembler),
            true,
        ));

        let pool = WorkerPool::spawn(jobs, pipeline, Arc::new(NoopProgress), 3, Span::none())
            .unwrap();
        assert_eq!(pool.worker_count(), 3);

        let outcomes = drain(pool);
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for outcome in &outcomes {
            *counts.entry(outcome.position).or_insert(0) += 1;
        }
        assert_eq!(outcomes.len(), 10);
        assert!(counts.values().all(|&c| c == 1));
    }

    #[test]
    fn test_panic_becomes_failed_outcome() {
        let temp_dir = TempDir::new().unwrap();
        let jobs = jobs(temp_dir.path(), 3);
        let pipeline = Arc::new(Pipeline::new(
            Arc::new(PanickingExtractor),
            Arc::new(UnusedAssembler),
            true,
        ));

        let pool = WorkerPool::spawn(jobs, pipeline, Arc::new(NoopProgress), 1, Span::none())
            .unwrap();
        let outcomes = drain(pool);

        // The single worker survived the panic and ran the remaining jobs.
        assert_eq!(outcomes.len(), 3);
        let panicked = outcomes.iter().find(|o| o.position == 1).unwrap();
        let (stage, cause) = panicked.failure().unwrap();
        assert_eq!(stage, Stage::Extract);
        assert!(cause.contains("decoder blew up"));
    }

    #[test]
    fn test_empty_queue_workers_exit() {
        let temp_dir = TempDir::new().unwrap();
        let jobs = jobs(temp_dir.path(), 0);
        let pipeline = Arc::new(Pipeline::new(
            Arc::new(FailingExtractor),
            Arc::new(UnusedAssembler),
            true,
        ));

        let pool = WorkerPool::spawn(jobs, pipeline, Arc::new(NoopProgress), 2, Span::none())
            .unwrap();
        assert!(drain(pool).is_empty());
    }

    #[test]
    fn test_panic_message_variants() {
        let text: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(text.as_ref()), "static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
        let other: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
