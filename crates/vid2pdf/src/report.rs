use std::fmt::Write;
use std::path::Path;

use tracing::info;

use crate::error::Vid2PdfError;
use crate::pipeline::JobState;
use crate::run::RunOutcome;
use crate::worker::RunSummary;

/// Writes the run as pretty JSON, replacing any previous summary.
pub fn write_summary(outcome: &RunOutcome, path: &Path) -> Result<(), Vid2PdfError> {
    let report_failed = |reason: String| Vid2PdfError::Report {
        path: path.to_path_buf(),
        reason,
    };

    let json = serde_json::to_string_pretty(outcome).map_err(|e| report_failed(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| report_failed(e.to_string()))
}

/// One line per job, in catalog order.
pub fn render_table(summary: &RunSummary) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "{:>4}  {:>5}  {:<8}  file", "#", "key", "result");

    for outcome in summary.outcomes() {
        let result = match &outcome.state {
            JobState::Done if outcome.skipped => "skipped",
            JobState::Done => "done",
            JobState::Failed { .. } => "FAILED",
            _ => "?",
        };
        let _ = writeln!(
            output,
            "{:>4}  {:>5}  {:<8}  {}",
            outcome.position + 1,
            outcome.ordering_key.to_string(),
            result,
            outcome.file_name
        );
        if let Some((stage, cause)) = outcome.failure() {
            let _ = writeln!(output, "{:>23}{}: {}", "", stage, cause);
        }
        if let Some(warning) = &outcome.cleanup_warning {
            let _ = writeln!(output, "{:>23}warning: {}", "", warning);
        }
    }

    let _ = write!(
        output,
        "{} converted, {} skipped, {} failed",
        summary.succeeded(),
        summary.skipped(),
        summary.failed()
    );
    output
}

pub fn log_report(outcome: &RunOutcome) {
    if outcome.summary.total() > 0 {
        info!("Run summary:\n{}", render_table(&outcome.summary));
    }

    match (&outcome.merge, &outcome.merge_error) {
        (Some(merge), _) => info!(
            "Final document: {} ({} pages)",
            merge.output_path.display(),
            merge.page_count
        ),
        (None, Some(error)) => info!("No final document: {}", error),
        (None, None) => {}
    }

    let elapsed = outcome.finished_at - outcome.started_at;
    info!(
        "Run {} finished with {:?} (exit code {}) in {}s",
        outcome.run_id,
        outcome.status,
        outcome.exit_code,
        elapsed.num_seconds()
    );
}
