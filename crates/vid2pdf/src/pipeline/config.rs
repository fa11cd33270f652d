use std::path::PathBuf;

use crate::catalog::OutputLayout;
use crate::config::{Config, MediaFormats};
use crate::stages::ExtractionSettings;

pub const RUN_SUMMARY_FILENAME: &str = "run_summary.json";
pub const DEFAULT_LOG_FILENAME: &str = "run.log";

/// Runtime settings for one run, resolved from the file config and CLI.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input_directory: PathBuf,
    pub output_directory: PathBuf,
    pub formats: MediaFormats,
    pub worker_count: usize,
    pub extraction: ExtractionSettings,
    pub jpeg_quality: u8,
    pub cleanup_on_assembly_failure: bool,
    pub merged_filename: String,
    pub log_file: PathBuf,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        let output_directory = PathBuf::from(&config.output_directory);
        let log_file = config
            .log_file
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| output_directory.join(DEFAULT_LOG_FILENAME));

        Self {
            input_directory: PathBuf::from(&config.input_directory),
            formats: MediaFormats::new(&config.supported_extensions),
            worker_count: config.worker_count.max(1),
            extraction: ExtractionSettings {
                ffmpeg_path: PathBuf::from(&config.ffmpeg_path),
                sampling_rate: config.sampling_rate,
                hardware_acceleration: config.hardware_acceleration,
                hwaccel_method: config.hwaccel_method.clone(),
            },
            jpeg_quality: config.jpeg_quality,
            cleanup_on_assembly_failure: config.cleanup_on_assembly_failure,
            merged_filename: config.merged_filename.clone(),
            log_file,
            output_directory,
        }
    }

    pub fn layout(&self) -> OutputLayout {
        OutputLayout::new(&self.output_directory)
    }

    pub fn merged_path(&self) -> PathBuf {
        self.output_directory.join(&self.merged_filename)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_directory.join(RUN_SUMMARY_FILENAME)
    }
}
