mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, Overrides};
use vid2pdf::config::validate_config as validate_semantics;
use vid2pdf::{
    check_ffmpeg, init_logging, load_config, Config, LoggingConfig, PipelineConfig, Runner,
    EXIT_FATAL,
};

fn main() {
    let cli = Cli::parse();

    let code = match run_cli(cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            EXIT_FATAL
        }
    };
    std::process::exit(code);
}

fn run_cli(cli: Cli) -> Result<i32> {
    match cli.command.clone().unwrap_or(Commands::Run) {
        Commands::Run => run(&cli),
        Commands::CheckTools => {
            let config = resolve_config(cli.config.as_deref(), &cli.overrides)?;
            Ok(check_tools(&config))
        }
        Commands::Validate { file } => {
            let path = file.or(cli.config);
            validate(path.as_deref())
        }
    }
}

fn resolve_config(path: Option<&Path>, overrides: &Overrides) -> Result<Config> {
    let mut config = match path {
        Some(p) => load_config(p).with_context(|| format!("loading {}", p.display()))?,
        None => Config::default(),
    };

    if let Some(input) = &overrides.input {
        config.input_directory = input.to_string_lossy().to_string();
    }
    if let Some(output) = &overrides.output {
        config.output_directory = output.to_string_lossy().to_string();
    }
    if let Some(rate) = overrides.rate {
        config.sampling_rate = rate;
    }
    if let Some(workers) = overrides.workers {
        config.worker_count = workers;
    }
    if overrides.hwaccel {
        config.hardware_acceleration = true;
    }

    validate_semantics(&config).context("invalid settings")?;
    Ok(config)
}

fn run(cli: &Cli) -> Result<i32> {
    let config = resolve_config(cli.config.as_deref(), &cli.overrides)?;
    let pipeline_config = PipelineConfig::from_config(&config);

    init_logging(&LoggingConfig {
        log_file: Some(pipeline_config.log_file.clone()),
        verbose: cli.verbose,
    })?;

    if !cli.overrides.skip_tool_check {
        let ffmpeg = check_ffmpeg(&pipeline_config.extraction.ffmpeg_path)?;
        tracing::debug!("Using ffmpeg at {}", ffmpeg.display());
    }

    let outcome = Runner::from_config(&pipeline_config).run(&pipeline_config)?;
    Ok(outcome.exit_code)
}

fn check_tools(config: &Config) -> i32 {
    println!("Checking external tools...\n");

    match check_ffmpeg(Path::new(&config.ffmpeg_path)) {
        Ok(path) => {
            println!("✓ ffmpeg - {}", path.display());
            println!("\nAll required tools are available!");
            0
        }
        Err(e) => {
            println!("✗ ffmpeg ({})", e);
            println!("\nInstall ffmpeg or set ffmpeg_path in the config file.");
            EXIT_FATAL
        }
    }
}

fn validate(path: Option<&Path>) -> Result<i32> {
    match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            load_config(p)?;
            println!("Configuration is valid.");
            Ok(0)
        }
        None => {
            println!("No config file given; built-in defaults are used.");
            Ok(0)
        }
    }
}
