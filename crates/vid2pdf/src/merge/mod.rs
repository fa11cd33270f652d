//! Final assembly: the documents of every converted job, in catalog order.

pub mod pdf;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, info_span};

use crate::error::MergeError;
use crate::worker::RunSummary;

pub use pdf::LopdfMerger;

/// Writes `inputs`, in order, as one document at `output` and returns the
/// number of pages written. `output` is replaced, never partially written.
pub trait DocumentMerger: Send + Sync {
    fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<usize, MergeError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub output_path: PathBuf,
    /// Merged documents in page order.
    pub documents: Vec<PathBuf>,
    pub page_count: usize,
    /// Jobs left out because they failed.
    pub excluded: Vec<String>,
}

pub struct MergeCoordinator {
    merger: Arc<dyn DocumentMerger>,
    output_path: PathBuf,
}

impl MergeCoordinator {
    pub fn new(merger: Arc<dyn DocumentMerger>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            merger,
            output_path: output_path.into(),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Merges the document of every `Done` job. The summary is already in
    /// catalog order, so selection is a filter and never a re-sort.
    pub fn merge(&self, summary: &RunSummary) -> Result<MergeReport, MergeError> {
        let _span = info_span!("merge").entered();

        let documents: Vec<PathBuf> = summary
            .done()
            .filter_map(|outcome| outcome.document_path.clone())
            .collect();
        if documents.is_empty() {
            return Err(MergeError::NothingToMerge);
        }

        let excluded: Vec<String> = summary
            .failures()
            .map(|outcome| outcome.file_name.clone())
            .collect();

        let page_count = self.merger.merge(&documents, &self.output_path)?;
        info!(
            "Merged {} documents ({} pages) into {}",
            documents.len(),
            page_count,
            self.output_path.display()
        );

        Ok(MergeReport {
            output_path: self.output_path.clone(),
            documents,
            page_count,
            excluded,
        })
    }
}
