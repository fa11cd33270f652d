use std::sync::Mutex;

use log::{error, warn};
use serde::Serialize;

use crate::catalog::Job;
use crate::error::WorkerError;
use crate::pipeline::state::Stage;
use crate::worker::job::JobOutcome;

pub const WORKER_LOST_CAUSE: &str = "worker exited before reporting";

/// Collects outcomes from concurrent workers: one write-once slot per
/// catalog position.
pub struct SummaryAccumulator {
    slots: Mutex<Vec<Option<JobOutcome>>>,
}

impl SummaryAccumulator {
    pub fn new(job_count: usize) -> Self {
        Self {
            slots: Mutex::new(vec![None; job_count]),
        }
    }

    /// Stores an outcome in its job's slot. A second write to the same slot
    /// is rejected and the first outcome kept.
    pub fn record(&self, outcome: JobOutcome) -> Result<(), WorkerError> {
        let position = outcome.position;
        let mut slots = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match slots.get_mut(position) {
            None => Err(WorkerError::UnknownJob(position)),
            Some(Some(_)) => Err(WorkerError::DuplicateOutcome(position)),
            Some(slot) => {
                *slot = Some(outcome);
                Ok(())
            }
        }
    }

    /// Positions still waiting for an outcome.
    pub fn missing(&self) -> Vec<usize> {
        let slots = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(position, _)| position)
            .collect()
    }

    /// Seals the accumulator. Jobs that never reported are recorded as failed
    /// during extraction, so the summary always covers every job.
    pub fn finish(self, jobs: &[Job]) -> RunSummary {
        let slots = self
            .slots
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let missing = slots.iter().filter(|s| s.is_none()).count();
        if missing > 0 {
            error!("{}", WorkerError::IncompleteSummary(missing));
        }

        let outcomes = slots
            .into_iter()
            .enumerate()
            .filter_map(|(position, slot)| match slot {
                Some(outcome) => Some(outcome),
                None => match jobs.get(position) {
                    Some(job) => {
                        warn!("No outcome for {}, marking it failed", job.file_name);
                        Some(JobOutcome::failed(job, Stage::Extract, WORKER_LOST_CAUSE))
                    }
                    None => None,
                },
            })
            .collect();

        RunSummary::from_outcomes(outcomes)
    }
}

/// Terminal state of every job in a run, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    succeeded: usize,
    failed: usize,
    skipped: usize,
    outcomes: Vec<JobOutcome>,
}

impl RunSummary {
    pub fn from_outcomes(mut outcomes: Vec<JobOutcome>) -> Self {
        outcomes.sort_by_key(|o| o.position);
        let skipped = outcomes.iter().filter(|o| o.is_done() && o.skipped).count();
        let succeeded = outcomes.iter().filter(|o| o.is_done() && !o.skipped).count();
        let failed = outcomes.iter().filter(|o| o.is_failed()).count();
        Self {
            succeeded,
            failed,
            skipped,
            outcomes,
        }
    }

    /// Jobs converted during this run.
    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Jobs whose document already existed.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn outcomes(&self) -> &[JobOutcome] {
        &self.outcomes
    }

    pub fn get(&self, position: usize) -> Option<&JobOutcome> {
        self.outcomes.iter().find(|o| o.position == position)
    }

    /// `Done` jobs in catalog order.
    pub fn done(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes.iter().filter(|o| o.is_done())
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }
}
