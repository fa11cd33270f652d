use std::fmt;

use serde::Serialize;

/// The stage a job was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extract,
    Assemble,
    Cleanup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extract => "extract",
            Stage::Assemble => "assemble",
            Stage::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// Lifecycle of one job.
///
/// ```text
/// Pending -> Extracting -> Assembling -> CleaningUp -> Done
///    |           |             |
///    |           v             v
///    |        Failed        Failed
///    +------------------------------------------------> Done (already converted)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Extracting,
    Assembling,
    CleaningUp,
    Done,
    Failed { stage: Stage, cause: String },
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed { .. })
    }

    /// The stage a failure in this state is attributed to.
    pub fn stage(&self) -> Stage {
        match self {
            JobState::Pending | JobState::Extracting => Stage::Extract,
            JobState::Assembling => Stage::Assemble,
            JobState::CleaningUp | JobState::Done => Stage::Cleanup,
            JobState::Failed { stage, .. } => *stage,
        }
    }

    /// Transitions only move forward; terminal states have no successors.
    /// A cleanup failure is a warning, so `CleaningUp` can only reach `Done`.
    pub fn can_transition_to(&self, next: &JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Pending, Extracting)
                | (Pending, Done)
                | (Extracting, Assembling)
                | (Extracting, Failed { .. })
                | (Assembling, CleaningUp)
                | (Assembling, Failed { .. })
                | (CleaningUp, Done)
        )
    }

    fn name(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Extracting => "extracting",
            JobState::Assembling => "assembling",
            JobState::CleaningUp => "cleaning_up",
            JobState::Done => "done",
            JobState::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Failed { stage, cause } => write!(f, "failed during {}: {}", stage, cause),
            other => f.write_str(other.name()),
        }
    }
}
