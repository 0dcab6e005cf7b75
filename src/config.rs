use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use docket_core::DebounceConfig;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Debounce delays for buffered writes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayConfig {
    /// Delay after the first buffered write for a document (ms)
    pub first_delay_ms: u64,
    /// Delay after each further write to the same document (ms)
    pub repeat_delay_ms: u64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            first_delay_ms: 5000,
            repeat_delay_ms: 3000,
        }
    }
}

impl DelayConfig {
    /// Converts to the core scheduler configuration.
    pub fn to_debounce_config(&self) -> DebounceConfig {
        DebounceConfig {
            first_delay: Duration::from_millis(self.first_delay_ms),
            repeat_delay: Duration::from_millis(self.repeat_delay_ms),
        }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Directory for stored documents
    pub data_dir: ConfigValue<PathBuf>,
    /// Directory for spooled (buffered, unflushed) writes
    pub spool_dir: ConfigValue<PathBuf>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    /// Debounce delays
    pub delays: DelayConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    spool_dir: Option<PathBuf>,
    delays: Option<DelayConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut data_dir =
            ConfigValue::new(Self::default_data_dir().join("data"), ConfigSource::Default);
        let mut spool_dir =
            ConfigValue::new(Self::default_data_dir().join("spool"), ConfigSource::Default);
        let mut config_file = None;
        let mut delays = DelayConfig::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(dir) = file_config.data_dir {
                data_dir = ConfigValue::new(Self::resolve(&path, dir), ConfigSource::File);
            }
            if let Some(dir) = file_config.spool_dir {
                spool_dir = ConfigValue::new(Self::resolve(&path, dir), ConfigSource::File);
            }
            if let Some(d) = file_config.delays {
                delays = d;
            }
        }

        // Apply environment variable overrides
        if let Ok(dir) = std::env::var("DOCKET_DATA_DIR") {
            data_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(dir) = std::env::var("DOCKET_SPOOL_DIR") {
            spool_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(ms) = std::env::var("DOCKET_FIRST_DELAY_MS") {
            if let Ok(ms) = ms.parse() {
                delays.first_delay_ms = ms;
            }
        }
        if let Ok(ms) = std::env::var("DOCKET_REPEAT_DELAY_MS") {
            if let Ok(ms) = ms.parse() {
                delays.repeat_delay_ms = ms;
            }
        }

        Ok(Self {
            data_dir,
            spool_dir,
            config_file,
            delays,
        })
    }

    /// Resolve relative paths against the config file's directory
    fn resolve(config_path: &std::path::Path, dir: PathBuf) -> PathBuf {
        if dir.is_relative() {
            config_path
                .parent()
                .map(|p| p.join(&dir))
                .unwrap_or(dir)
        } else {
            dir
        }
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/docket/
    /// - macOS: ~/Library/Application Support/docket/
    /// - Windows: %APPDATA%/docket/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("docket")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/docket/
    /// - macOS: ~/Library/Application Support/docket/
    /// - Windows: %APPDATA%/docket/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("docket")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
