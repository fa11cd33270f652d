use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default = "default_input_directory")]
    pub input_directory: String,
    #[serde(default = "default_output_directory")]
    pub output_directory: String,
    /// Frames sampled per second of video.
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: f64,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default)]
    pub hardware_acceleration: bool,
    /// Value passed to `ffmpeg -hwaccel` when hardware acceleration is on.
    #[serde(default = "default_hwaccel_method")]
    pub hwaccel_method: String,
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
    #[serde(default = "default_supported_extensions")]
    pub supported_extensions: Vec<String>,
    /// Delete extracted frames even when assembly failed.
    #[serde(default = "default_true")]
    pub cleanup_on_assembly_failure: bool,
    #[serde(default = "default_merged_filename")]
    pub merged_filename: String,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Run log location. Defaults to `run.log` inside the output directory.
    #[serde(default)]
    pub log_file: Option<String>,
}

fn default_input_directory() -> String {
    "video".to_string()
}

fn default_output_directory() -> String {
    "pdf".to_string()
}

fn default_sampling_rate() -> f64 {
    0.02
}

fn default_worker_count() -> usize {
    num_cpus::get().clamp(1, 4)
}

fn default_hwaccel_method() -> String {
    "cuda".to_string()
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_supported_extensions() -> Vec<String> {
    vec!["mp4".to_string(), "webm".to_string(), "mkv".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_merged_filename() -> String {
    "final_merged.pdf".to_string()
}

fn default_jpeg_quality() -> u8 {
    90
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            input_directory: default_input_directory(),
            output_directory: default_output_directory(),
            sampling_rate: default_sampling_rate(),
            worker_count: default_worker_count(),
            hardware_acceleration: false,
            hwaccel_method: default_hwaccel_method(),
            ffmpeg_path: default_ffmpeg_path(),
            supported_extensions: default_supported_extensions(),
            cleanup_on_assembly_failure: true,
            merged_filename: default_merged_filename(),
            jpeg_quality: default_jpeg_quality(),
            log_file: None,
        }
    }
}

/// Container formats accepted by the catalog, matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFormats {
    extensions: Vec<String>,
}

impl MediaFormats {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut extensions: Vec<String> = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        extensions.sort();
        extensions.dedup();
        Self { extensions }
    }

    pub fn supports(&self, extension: &str) -> bool {
        let extension = extension.to_ascii_lowercase();
        self.extensions.iter().any(|e| *e == extension)
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

impl Default for MediaFormats {
    fn default() -> Self {
        Self::new(default_supported_extensions())
    }
}
