// Configuration management
use crate::error::{Result, WindowError};
use crate::presentation::LabelConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "eyelabs-timer";
const INTERVAL_ENV: &str = "EYELABS_TICK_INTERVAL_MS";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub labels: LabelConfig,
    #[serde(default)]
    pub ticker: TickerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TickerConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_interval_ms() -> u64 {
    1000
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl TickerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Config {
    /// Get the config directory path
    ///
    /// Priority:
    /// 1. XDG_CONFIG_HOME/eyelabs-timer (if env var is set)
    /// 2. ~/.config/eyelabs-timer (if ~/.config exists)
    /// 3. ~/.eyelabs-timer (fallback on Unix, doesn't create ~/.config)
    /// 4. Platform default on Windows
    pub fn config_dir() -> Result<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg_config).join(APP_DIR));
        }

        #[cfg(unix)]
        {
            if let Some(home_dir) = dirs::home_dir() {
                let xdg_config = home_dir.join(".config");

                if xdg_config.exists() {
                    return Ok(xdg_config.join(APP_DIR));
                }

                return Ok(home_dir.join(format!(".{}", APP_DIR)));
            }
        }

        #[cfg(not(unix))]
        {
            if let Some(config_dir) = dirs::config_dir() {
                return Ok(config_dir.join(APP_DIR));
            }
        }

        Err(WindowError::ConfigError(
            "Could not determine config directory".to_string(),
        ))
    }

    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default path, environment and defaults
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_file_path()?)?;

        if let Ok(interval) = std::env::var(INTERVAL_ENV) {
            tracing::debug!("Using {} from environment: {}", INTERVAL_ENV, interval);
            config.ticker.interval_ms = interval.trim().parse().map_err(|e| {
                WindowError::ConfigError(format!("Invalid {}: {}", INTERVAL_ENV, e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file, falling back to defaults if absent
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            tracing::debug!("Loading config from: {}", path.display());
            let contents = fs::read_to_string(path)
                .map_err(|e| WindowError::ConfigError(format!("Failed to read config file: {}", e)))?;

            toml::from_str(&contents)?
        } else {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            Config::default()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ticker.interval_ms == 0 {
            return Err(WindowError::ConfigError(
                "ticker.interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a sample config file with comments at the default path
    pub fn create_sample() -> Result<PathBuf> {
        let config_path = Self::config_file_path()?;
        Self::create_sample_at(&config_path)?;
        Ok(config_path)
    }

    pub fn create_sample_at(config_path: &Path) -> Result<()> {
        if let Some(config_dir) = config_path.parent() {
            if !config_dir.exists() {
                fs::create_dir_all(config_dir).map_err(|e| {
                    WindowError::ConfigError(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        // Don't overwrite existing config
        if config_path.exists() {
            return Err(WindowError::ConfigError(format!(
                "Config file already exists at: {}",
                config_path.display()
            )));
        }

        fs::write(config_path, SAMPLE_CONFIG)
            .map_err(|e| WindowError::ConfigError(format!("Failed to write sample config: {}", e)))?;

        Ok(())
    }
}

const SAMPLE_CONFIG: &str = r#"# EyeLabs timer configuration
# Location priority:
#   1. $XDG_CONFIG_HOME/eyelabs-timer/config.toml (if XDG_CONFIG_HOME is set)
#   2. ~/.config/eyelabs-timer/config.toml (if ~/.config exists)
#   3. ~/.eyelabs-timer/config.toml (fallback)
#
# The tick interval can also be set via EYELABS_TICK_INTERVAL_MS.

[labels]
# {remaining} is replaced with the countdown, e.g. "1d 02h 00m 00s"
upcoming = "Starts in {remaining}"
active = "{remaining} remaining"
ended = "Ended"

[ticker]
# How often a live countdown is refreshed, in milliseconds (default: 1000)
interval_ms = 1000
"#;
