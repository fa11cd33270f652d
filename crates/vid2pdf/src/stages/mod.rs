//! Stage drivers: the per-job work the pipeline sequences.
//!
//! Extraction and assembly sit behind traits so the pipeline can be driven by
//! fakes in tests; cleanup is a plain function.

pub mod assemble;
pub mod cleanup;
pub mod extract;
pub mod frames;

use std::path::PathBuf;

use crate::catalog::Job;
use crate::error::StageError;

pub use assemble::{document_exists, PdfPageAssembler};
pub use cleanup::remove_frames;
pub use extract::{check_ffmpeg, ExtractionSettings, FfmpegExtractor};
pub use frames::{existing_frames, Frame, FrameSet};

/// Samples frames for a job into its frame directory.
pub trait FrameExtractor: Send + Sync {
    fn extract(&self, job: &Job) -> Result<FrameSet, StageError>;
}

/// Builds a job's document from its frames and returns the document path.
pub trait PageAssembler: Send + Sync {
    fn assemble(&self, job: &Job, frames: &FrameSet) -> Result<PathBuf, StageError>;
}
