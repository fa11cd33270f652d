pub mod job;
pub mod scanner;

pub use job::{Job, OrderingKey, OutputLayout};
pub use scanner::JobCatalog;
