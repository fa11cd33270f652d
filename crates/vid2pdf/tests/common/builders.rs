//! Builders and fake collaborators for integration tests.
//!
//! The fakes write real JPEG frames and real PDFs, so everything after the
//! extraction seam runs production code.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{ImageFormat, Rgb, RgbImage};

use vid2pdf::config::Config;
use vid2pdf::stages::FrameSet;
use vid2pdf::{
    FrameExtractor, Job, LopdfMerger, OrderingKey, PageAssembler, PdfPageAssembler, Runner,
    StageError,
};

pub const FRAME_HEIGHT: u32 = 8;

/// Builder for creating `Config` instances.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Defaults suited to tests: two workers, no hardware acceleration.
    pub fn new() -> Self {
        Self {
            config: Config {
                worker_count: 2,
                ..Config::default()
            },
        }
    }

    pub fn input_directory(mut self, path: &Path) -> Self {
        self.config.input_directory = path.to_string_lossy().to_string();
        self
    }

    pub fn output_directory(mut self, path: &Path) -> Self {
        self.config.output_directory = path.to_string_lossy().to_string();
        self
    }

    pub fn worker_count(mut self, count: usize) -> Self {
        self.config.worker_count = count;
        self
    }

    pub fn ffmpeg_path(mut self, path: &str) -> Self {
        self.config.ffmpeg_path = path.to_string();
        self
    }

    pub fn cleanup_on_assembly_failure(mut self, enabled: bool) -> Self {
        self.config.cleanup_on_assembly_failure = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

/// Width of frame `index` of a job: `key * 10 + index`, so merged pages can
/// be traced back to their job.
pub fn frame_width(key: OrderingKey, index: u32) -> u32 {
    let base = match key {
        OrderingKey::Numbered(n) => n as u32,
        OrderingKey::Unnumbered => 0,
    };
    base * 10 + index
}

pub fn write_frame(path: &Path, width: u32) {
    RgbImage::from_pixel(width, FRAME_HEIGHT, Rgb([30, 120, 200]))
        .save_with_format(path, ImageFormat::Jpeg)
        .expect("Failed to write frame");
}

/// Extractor that writes real JPEG frames without running ffmpeg.
pub struct FakeExtractor {
    frames_per_job: u32,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<String>>,
}

impl FakeExtractor {
    pub fn new(frames_per_job: u32) -> Self {
        Self {
            frames_per_job,
            failing: HashSet::new(),
            panicking: HashSet::new(),
            delays: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Extraction of `file_name` exits non-zero.
    pub fn failing(mut self, file_name: &str) -> Self {
        self.failing.insert(file_name.to_string());
        self
    }

    pub fn panicking(mut self, file_name: &str) -> Self {
        self.panicking.insert(file_name.to_string());
        self
    }

    pub fn delay(mut self, file_name: &str, millis: u64) -> Self {
        self.delays
            .insert(file_name.to_string(), Duration::from_millis(millis));
        self
    }

    /// File names extraction was requested for, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl FrameExtractor for FakeExtractor {
    fn extract(&self, job: &Job) -> Result<FrameSet, StageError> {
        self.calls.lock().unwrap().push(job.file_name.clone());

        if let Some(delay) = self.delays.get(&job.file_name) {
            std::thread::sleep(*delay);
        }
        if self.panicking.contains(&job.file_name) {
            panic!("fake extractor panicked on {}", job.file_name);
        }
        if self.failing.contains(&job.file_name) {
            return Err(StageError::ExtractionFailed {
                exit_code: Some(1),
                stderr_tail: format!("{}: Invalid data found when processing input", job.file_name),
            });
        }

        std::fs::create_dir_all(&job.frame_dir).expect("Failed to create frame dir");
        for index in 1..=self.frames_per_job {
            write_frame(
                &job.frame_dir.join(format!("frame_{:04}.jpg", index)),
                frame_width(job.ordering_key, index),
            );
        }
        FrameSet::collect(&job.frame_dir)
    }
}

/// Production assembler that counts calls and can fail chosen jobs.
pub struct FakeAssembler {
    inner: PdfPageAssembler,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl FakeAssembler {
    pub fn new() -> Self {
        Self {
            inner: PdfPageAssembler::default(),
            failing: HashSet::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(mut self, file_name: &str) -> Self {
        self.failing.insert(file_name.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PageAssembler for FakeAssembler {
    fn assemble(&self, job: &Job, frames: &FrameSet) -> Result<PathBuf, StageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&job.file_name) {
            return Err(StageError::AssemblyFailed {
                cause: "frame_0001.jpg: failed to decode".to_string(),
            });
        }
        self.inner.assemble(job, frames)
    }
}

/// Extractor for runs that must not extract anything.
pub struct ForbiddenExtractor;

impl FrameExtractor for ForbiddenExtractor {
    fn extract(&self, job: &Job) -> Result<FrameSet, StageError> {
        panic!("extraction must not run for {}", job.file_name);
    }
}

/// Assembler for runs that must not assemble anything.
pub struct ForbiddenAssembler;

impl PageAssembler for ForbiddenAssembler {
    fn assemble(&self, job: &Job, _frames: &FrameSet) -> Result<PathBuf, StageError> {
        panic!("assembly must not run for {}", job.file_name);
    }
}

pub fn runner(extractor: Arc<dyn FrameExtractor>, assembler: Arc<dyn PageAssembler>) -> Runner {
    Runner::new(extractor, assembler, Arc::new(LopdfMerger))
}
