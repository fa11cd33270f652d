use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use crate::catalog::Job;
use crate::error::{ConfigError, StageError};
use crate::stages::frames::{existing_frames, staging_dir, FrameSet, FRAME_PATTERN};
use crate::stages::FrameExtractor;

/// Lines of ffmpeg stderr kept on failure.
const STDERR_TAIL_LINES: usize = 20;
const STDERR_TAIL_CHARS: usize = 2000;

#[derive(Debug, Clone)]
pub struct ExtractionSettings {
    pub ffmpeg_path: PathBuf,
    /// Frames per second of video.
    pub sampling_rate: f64,
    pub hardware_acceleration: bool,
    pub hwaccel_method: String,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            sampling_rate: 0.02,
            hardware_acceleration: false,
            hwaccel_method: "cuda".to_string(),
        }
    }
}

/// Samples frames by running an external `ffmpeg` process.
pub struct FfmpegExtractor {
    settings: ExtractionSettings,
}

impl FfmpegExtractor {
    pub fn new(settings: ExtractionSettings) -> Self {
        Self { settings }
    }

    fn build_args(&self, source: &Path, output_pattern: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-nostdin".into(),
        ];

        if self.settings.hardware_acceleration {
            args.push("-hwaccel".into());
            args.push(self.settings.hwaccel_method.clone().into());
        }

        args.push("-i".into());
        args.push(source.as_os_str().to_os_string());
        args.push("-vf".into());
        args.push(format!("fps={}", self.settings.sampling_rate).into());
        args.push("-q:v".into());
        args.push("2".into());
        args.push(output_pattern.as_os_str().to_os_string());
        args
    }

    fn run_ffmpeg(&self, job: &Job, staging: &Path) -> Result<(), StageError> {
        let args = self.build_args(&job.source_path, &staging.join(FRAME_PATTERN));
        debug!("Running {} {:?}", self.settings.ffmpeg_path.display(), args);

        let output = Command::new(&self.settings.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| StageError::ExtractionFailed {
                exit_code: None,
                stderr_tail: format!(
                    "failed to run {}: {}",
                    self.settings.ffmpeg_path.display(),
                    e
                ),
            })?;

        if !output.status.success() {
            return Err(StageError::ExtractionFailed {
                exit_code: output.status.code(),
                stderr_tail: stderr_tail(&String::from_utf8_lossy(&output.stderr)),
            });
        }

        Ok(())
    }
}

impl FrameExtractor for FfmpegExtractor {
    fn extract(&self, job: &Job) -> Result<FrameSet, StageError> {
        if let Some(frames) = existing_frames(&job.frame_dir) {
            info!(
                "Frames already exist for {} ({} frames)",
                job.file_name,
                frames.len()
            );
            return Ok(frames);
        }

        // Anything left here is empty or ill-ordered and gets re-extracted.
        remove_dir_if_present(&job.frame_dir).map_err(|e| StageError::ExtractionFailed {
            exit_code: None,
            stderr_tail: format!("failed to clear stale frames: {}", e),
        })?;

        let staging = staging_dir(&job.frame_dir);
        remove_dir_if_present(&staging)
            .and_then(|_| std::fs::create_dir_all(&staging))
            .map_err(|e| StageError::ExtractionFailed {
                exit_code: None,
                stderr_tail: format!("failed to prepare {}: {}", staging.display(), e),
            })?;

        info!("Extracting frames for {}", job.file_name);

        let published = self
            .run_ffmpeg(job, &staging)
            .and_then(|_| publish_frames(&staging, &job.frame_dir));

        match published {
            Ok(frames) => {
                info!(
                    "Frame extraction complete for {} ({} frames)",
                    job.file_name,
                    frames.len()
                );
                Ok(frames)
            }
            Err(e) => {
                if let Err(cleanup) = remove_dir_if_present(&staging) {
                    warn!(
                        "Failed to remove staging directory {}: {}",
                        staging.display(),
                        cleanup
                    );
                }
                Err(e)
            }
        }
    }
}

/// Validates the staged frames and moves them into place in one rename, so
/// `frame_dir` only ever holds a complete set.
fn publish_frames(staging: &Path, frame_dir: &Path) -> Result<FrameSet, StageError> {
    let staged = FrameSet::collect(staging)?;
    if staged.is_empty() {
        return Err(StageError::ExtractionFailed {
            exit_code: Some(0),
            stderr_tail: "ffmpeg produced no frames".to_string(),
        });
    }

    std::fs::rename(staging, frame_dir).map_err(|e| StageError::ExtractionFailed {
        exit_code: Some(0),
        stderr_tail: format!("failed to publish frames to {}: {}", frame_dir.display(), e),
    })?;

    FrameSet::collect(frame_dir)
}

fn remove_dir_if_present(dir: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(dir) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    let tail = lines[start..].join("\n");

    let count = tail.chars().count();
    if count > STDERR_TAIL_CHARS {
        tail.chars().skip(count - STDERR_TAIL_CHARS).collect()
    } else {
        tail
    }
}

/// Resolves the ffmpeg binary, failing early when it is not installed.
pub fn check_ffmpeg(ffmpeg_path: &Path) -> Result<PathBuf, ConfigError> {
    which::which(ffmpeg_path).map_err(|e| ConfigError::ToolMissing {
        tool: ffmpeg_path.display().to_string(),
        reason: e.to_string(),
    })
}
