//! Configuration file handling for gemini-cli.
//!
//! Loads configuration from `~/.config/gemini-cli/config.toml` or a custom path.
//! Every setting is optional; command-line flags take precedence.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration file structure for gemini-cli.
#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Fallbacks for the per-invocation options.
#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    pub model: Option<String>,
    pub aspect_ratio: Option<String>,
    pub duration: Option<u32>,
    pub voice: Option<String>,
}

#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct FilesConfig {
    /// Files above this size (in MiB) are uploaded instead of sent inline.
    pub large_file_threshold_mb: Option<u64>,
}

#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct OutputConfig {
    /// Directory for generated artifacts (default: current directory).
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub video_timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
                path: path.clone(),
                source: e,
            })?;
            let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.clone(),
                source: e,
            })?;
            log::debug!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Large-file threshold in bytes, if configured.
    pub fn large_file_threshold_bytes(&self) -> Option<u64> {
        self.files
            .large_file_threshold_mb
            .map(|mb| mb.saturating_mul(1024 * 1024))
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("gemini-cli").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/gemini-cli/config.toml")
        })
}
