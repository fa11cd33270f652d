use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vid2pdf")]
#[command(author, version, about = "Turn a directory of numbered videos into one keyframe PDF")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Flags that take precedence over the config file.
#[derive(Args, Default)]
pub struct Overrides {
    /// Directory containing the videos
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Directory for documents, the merged PDF and the run log
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Frames sampled per second of video
    #[arg(long)]
    pub rate: Option<f64>,

    /// Number of videos converted in parallel
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Decode with hardware acceleration
    #[arg(long)]
    pub hwaccel: bool,

    /// Do not look for ffmpeg before starting
    #[arg(long)]
    pub skip_tool_check: bool,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Convert every video and merge the result (default)
    Run,

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses --config if not specified)
        #[arg(value_name = "CONFIG")]
        file: Option<PathBuf>,
    },
}
