use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::StageError;

/// `printf`-style pattern handed to ffmpeg; parsed back by [`FrameSet::collect`].
pub const FRAME_PATTERN: &str = "frame_%04d.jpg";

static FRAME_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^frame_([0-9]+)\.jpg$").expect("valid frame-name pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub index: u32,
    pub path: PathBuf,
}

/// The ordered frames of one job.
///
/// Indices start at 1 and are contiguous; anything else is rejected when the
/// set is collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSet {
    dir: PathBuf,
    frames: Vec<Frame>,
}

impl FrameSet {
    /// Reads every `frame_<n>.jpg` in `dir`. Other files are ignored.
    pub fn collect(dir: &Path) -> Result<Self, StageError> {
        let invalid = |reason: String| StageError::InvalidFrameSet {
            dir: dir.to_path_buf(),
            reason,
        };

        let entries = std::fs::read_dir(dir).map_err(|e| invalid(format!("unreadable: {}", e)))?;

        let mut frames = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| invalid(format!("unreadable entry: {}", e)))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(captures) = FRAME_NAME.captures(name) else {
                continue;
            };
            let index = captures[1]
                .parse::<u32>()
                .map_err(|_| invalid(format!("frame index out of range in '{}'", name)))?;
            frames.push(Frame {
                index,
                path: entry.path(),
            });
        }

        frames.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.path.cmp(&b.path)));

        for (expected, frame) in (1u32..).zip(&frames) {
            if frame.index < expected {
                return Err(invalid(format!(
                    "frame index {} appears more than once",
                    frame.index
                )));
            }
            if frame.index > expected {
                return Err(invalid(format!(
                    "frame index {} is missing (next is {})",
                    expected, frame.index
                )));
            }
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            frames,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.frames.iter().map(|f| f.path.as_path())
    }
}

/// Idempotency predicate for extraction: a complete, well-ordered frame set
/// left by an earlier run.
pub fn existing_frames(dir: &Path) -> Option<FrameSet> {
    if !dir.is_dir() {
        return None;
    }
    match FrameSet::collect(dir) {
        Ok(set) if !set.is_empty() => Some(set),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("Ignoring existing frames: {}", e);
            None
        }
    }
}

/// Sibling directory ffmpeg writes into before the frames are published.
pub fn staging_dir(frame_dir: &Path) -> PathBuf {
    let mut name = frame_dir
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    frame_dir.with_file_name(name)
}
