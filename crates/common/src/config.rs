//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory where projects are stored.
    pub projects_dir: PathBuf,

    /// Snapshot sampling defaults.
    #[serde(default)]
    pub sampler: SamplerDefaults,

    /// Clip construction defaults.
    #[serde(default)]
    pub clips: ClipDefaults,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Default snapshot sampler parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerDefaults {
    /// Maximum number of decode requests in flight at once.
    pub max_concurrency: usize,

    /// Per-sample decode timeout in milliseconds (0 = no timeout).
    pub sample_timeout_ms: u64,

    /// Clamp sample times past the timeline end instead of failing them.
    pub clamp_out_of_range: bool,
}

/// Default clip parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipDefaults {
    /// Main-track duration given to image clips opened from a file.
    pub image_duration_secs: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "montage=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            projects_dir: dirs_default_projects(),
            sampler: SamplerDefaults::default(),
            clips: ClipDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SamplerDefaults {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            sample_timeout_ms: 5_000,
            clamp_out_of_range: true,
        }
    }
}

impl Default for ClipDefaults {
    fn default() -> Self {
        Self {
            image_duration_secs: 3.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("montage").join("config.json")
}

/// Default projects directory.
fn dirs_default_projects() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("montage").join("projects")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{ "projects_dir": "/tmp/p", "sampler": { "max_concurrency": 8 } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.sampler.max_concurrency, 8);
        assert_eq!(config.sampler.sample_timeout_ms, 5_000);
        assert!(config.sampler.clamp_out_of_range);
        assert!((config.clips.image_duration_secs - 3.0).abs() < 1e-9);
        assert_eq!(config.logging.level, "info");
    }
}
