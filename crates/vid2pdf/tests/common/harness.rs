//! Test harness for isolated end-to-end runs.
//!
//! The `TestHarness` owns a temp directory with `input/` and `output/`
//! subdirectories and knows where a run leaves its artifacts.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use lopdf::Document;
use tempfile::TempDir;

use vid2pdf::{PipelineConfig, RunOutcome, Runner};

use super::builders::ConfigBuilder;

pub struct TestHarness {
    temp_dir: TempDir,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let input_dir = temp_dir.path().join("input");
        let output_dir = temp_dir.path().join("output");
        std::fs::create_dir_all(&input_dir).expect("Failed to create input dir");

        Self {
            temp_dir,
            input_dir,
            output_dir,
        }
    }

    /// Creates a placeholder video. Fake extractors never read it.
    pub fn add_video(&self, name: &str) -> PathBuf {
        let path = self.input_dir.join(name);
        std::fs::write(&path, b"not really a video").expect("Failed to write video");
        path
    }

    pub fn add_videos(&self, names: &[&str]) {
        for name in names {
            self.add_video(name);
        }
    }

    /// A builder already pointing at this harness's directories.
    pub fn config_builder(&self) -> ConfigBuilder {
        ConfigBuilder::new()
            .input_directory(&self.input_dir)
            .output_directory(&self.output_dir)
    }

    pub fn config(&self) -> PipelineConfig {
        PipelineConfig::from_config(&self.config_builder().build())
    }

    pub fn run(&self, runner: &Runner) -> RunOutcome {
        self.run_with(runner, &self.config())
    }

    pub fn run_with(&self, runner: &Runner, config: &PipelineConfig) -> RunOutcome {
        runner.run(config).expect("run should not fail fatally")
    }

    pub fn merged_path(&self) -> PathBuf {
        self.output_dir.join("final_merged.pdf")
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join("run_summary.json")
    }

    pub fn document_path(&self, stem: &str) -> PathBuf {
        self.output_dir.join("documents").join(format!("{}.pdf", stem))
    }

    pub fn frames_root(&self) -> PathBuf {
        self.output_dir.join("frames")
    }

    /// Entries left under the frames root (frame and staging directories).
    pub fn leftover_frame_dirs(&self) -> Vec<String> {
        match std::fs::read_dir(self.frames_root()) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Page widths of a PDF in page order. Fake frames encode their job and
/// index in the width, so this identifies every page.
pub fn page_widths(path: &Path) -> Vec<i64> {
    let doc = Document::load(path).expect("Failed to load PDF");
    doc.get_pages()
        .values()
        .map(|id| {
            let page = doc
                .get_object(*id)
                .and_then(|o| o.as_dict())
                .expect("page dictionary");
            let media_box = page
                .get(b"MediaBox")
                .and_then(|o| o.as_array())
                .expect("MediaBox");
            media_box[2].as_i64().expect("numeric width")
        })
        .collect()
}
