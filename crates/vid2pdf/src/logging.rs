//! Log setup: stderr plus an append-only run log, with `log` records bridged
//! into `tracing`.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

use crate::error::LoggingError;

pub const DEFAULT_LOG_FILTER: &str = "info";
pub const VERBOSE_LOG_FILTER: &str = "debug";

#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Run log to append to. `None` logs to stderr only.
    pub log_file: Option<PathBuf>,
    pub verbose: bool,
}

fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_LOG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    }
}

fn open_append(path: &Path) -> Result<File, LoggingError> {
    let open_failed = |source| LoggingError::OpenFile {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(open_failed)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(open_failed)
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let file_layer = match &config.log_file {
        Some(path) => Some(
            fmt::layer()
                .with_writer(Mutex::new(open_append(path)?))
                .with_ansi(false),
        ),
        None => None,
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter(config.verbose))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| LoggingError::Install(e.to_string()))?;
    tracing_log::LogTracer::init().map_err(|e| LoggingError::Install(e.to_string()))?;
    Ok(())
}

/// Identity of one run, stamped on the run log and on the `run` span.
#[derive(Debug, Clone)]
pub struct RunLog {
    pub run_id: String,
    pub started_at: DateTime<Local>,
}

impl RunLog {
    pub fn start() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at: Local::now(),
        }
    }

    pub fn banner(&self) -> String {
        format!(
            "========== vid2pdf run {} started {} ==========",
            self.run_id,
            self.started_at.format("%Y-%m-%d %H:%M:%S")
        )
    }

    /// Appends the banner so lines from different runs stay distinguishable.
    pub fn append_banner(&self, path: &Path) -> Result<(), LoggingError> {
        let mut file = open_append(path)?;
        writeln!(file, "\n{}", self.banner()).map_err(|source| LoggingError::OpenFile {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(RunLog::start().run_id, RunLog::start().run_id);
    }

    #[test]
    fn test_banner_contains_run_id() {
        let run = RunLog::start();
        assert!(run.banner().contains(&run.run_id));
    }

    #[test]
    fn test_append_banner_keeps_previous_runs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs").join("run.log");

        let first = RunLog::start();
        let second = RunLog::start();
        first.append_banner(&path).unwrap();
        second.append_banner(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let first_at = contents.find(&first.run_id).unwrap();
        let second_at = contents.find(&second.run_id).unwrap();
        assert!(first_at < second_at);
    }

    #[test]
    fn test_verbose_filter() {
        assert_eq!(env_filter(true).to_string(), VERBOSE_LOG_FILTER);
    }
}
