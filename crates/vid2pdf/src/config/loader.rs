use std::path::Path;

use crate::config::schema::{Config, CONFIG_VERSION};
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

/// Semantic checks that the schema cannot express.
///
/// Also applied to configs assembled in code (CLI overrides), which never pass
/// through the schema.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != CONFIG_VERSION {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if !config.sampling_rate.is_finite() || config.sampling_rate <= 0.0 {
        return Err(ConfigError::Validation {
            message: format!(
                "sampling_rate must be a positive number, got {}",
                config.sampling_rate
            ),
        });
    }

    if config.worker_count == 0 {
        return Err(ConfigError::Validation {
            message: "worker_count must be at least 1".to_string(),
        });
    }

    if config
        .supported_extensions
        .iter()
        .all(|e| e.trim_start_matches('.').is_empty())
    {
        return Err(ConfigError::Validation {
            message: "supported_extensions must list at least one extension".to_string(),
        });
    }

    let merged = Path::new(&config.merged_filename);
    let is_bare_name = merged.file_name().map(|n| n == merged.as_os_str()) == Some(true);
    let is_pdf = merged
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if !is_bare_name || !is_pdf {
        return Err(ConfigError::Validation {
            message: format!(
                "merged_filename must be a plain *.pdf file name, got '{}'",
                config.merged_filename
            ),
        });
    }

    if !(1..=100).contains(&config.jpeg_quality) {
        return Err(ConfigError::Validation {
            message: format!("jpeg_quality must be in 1..=100, got {}", config.jpeg_quality),
        });
    }

    Ok(())
}
