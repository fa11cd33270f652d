pub mod job;
pub mod pool;
pub mod scheduler;
pub mod summary;

pub use job::JobOutcome;
pub use pool::WorkerPool;
pub use scheduler::Scheduler;
pub use summary::{RunSummary, SummaryAccumulator};
