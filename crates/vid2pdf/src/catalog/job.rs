use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Numeric ordering prefix parsed from a file name.
///
/// `Numbered` always sorts before `Unnumbered`; the derived `Ord` relies on
/// the variant order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum OrderingKey {
    Numbered(u64),
    Unnumbered,
}

static LEADING_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+").expect("valid leading-digits pattern"));

impl OrderingKey {
    /// Parses the longest leading ASCII digit run. Runs too large for `u64`
    /// saturate to `u64::MAX`.
    pub fn parse(file_name: &str) -> Self {
        match LEADING_DIGITS.find(file_name) {
            Some(m) => OrderingKey::Numbered(m.as_str().parse::<u64>().unwrap_or(u64::MAX)),
            None => OrderingKey::Unnumbered,
        }
    }
}

impl fmt::Display for OrderingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderingKey::Numbered(n) => write!(f, "{:03}", n),
            OrderingKey::Unnumbered => write!(f, "---"),
        }
    }
}

/// Where a run keeps its per-job artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn frames_root(&self) -> PathBuf {
        self.root.join("frames")
    }

    pub fn documents_root(&self) -> PathBuf {
        self.root.join("documents")
    }

    pub fn frame_dir(&self, artifact_stem: &str) -> PathBuf {
        self.frames_root().join(artifact_stem)
    }

    pub fn document_path(&self, artifact_stem: &str) -> PathBuf {
        self.documents_root().join(format!("{}.pdf", artifact_stem))
    }
}

/// One video to convert. Built once by the catalog; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    /// Position in catalog order, also the job's slot in the run summary.
    pub position: usize,
    pub source_path: PathBuf,
    pub file_name: String,
    pub ordering_key: OrderingKey,
    /// Name shared by the job's frame directory and document.
    pub artifact_stem: String,
    pub frame_dir: PathBuf,
    pub document_path: PathBuf,
}

impl Job {
    pub fn new(
        position: usize,
        source_path: PathBuf,
        artifact_stem: String,
        layout: &OutputLayout,
    ) -> Self {
        let file_name = source_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let ordering_key = OrderingKey::parse(&file_name);
        Self {
            position,
            frame_dir: layout.frame_dir(&artifact_stem),
            document_path: layout.document_path(&artifact_stem),
            source_path,
            file_name,
            ordering_key,
            artifact_stem,
        }
    }

    /// Catalog order: ordering key first, file name on ties.
    pub fn catalog_cmp(&self, other: &Job) -> Ordering {
        self.ordering_key
            .cmp(&other.ordering_key)
            .then_with(|| self.file_name.cmp(&other.file_name))
    }
}
