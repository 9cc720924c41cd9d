// Configuration management
use crate::countdown::engine::DEFAULT_TICK;
use crate::error::{LeaseError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub countdown: CountdownConfig,
    #[serde(default)]
    pub source: SourceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountdownConfig {
    /// Milliseconds between countdown ticks
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Leases with less time than this left are shown as expiring
    #[serde(default = "default_expiring_threshold_minutes")]
    pub expiring_threshold_minutes: i64,
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK.as_millis() as u64
}

fn default_expiring_threshold_minutes() -> i64 {
    60
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            expiring_threshold_minutes: default_expiring_threshold_minutes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SourceConfig {
    pub path: Option<PathBuf>,
}

impl Config {
    /// Get the config directory path
    ///
    /// Priority:
    /// 1. XDG_CONFIG_HOME/leasetimer (if env var is set)
    /// 2. ~/.config/leasetimer (if ~/.config exists)
    /// 3. ~/.leasetimer (fallback on Unix)
    /// 4. Platform default on Windows
    pub fn config_dir() -> Result<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg_config).join("leasetimer"));
        }

        #[cfg(unix)]
        {
            if let Some(home_dir) = dirs::home_dir() {
                let xdg_config = home_dir.join(".config");
                if xdg_config.exists() {
                    return Ok(xdg_config.join("leasetimer"));
                }
                return Ok(home_dir.join(".leasetimer"));
            }
        }

        #[cfg(not(unix))]
        {
            if let Some(config_dir) = dirs::config_dir() {
                return Ok(config_dir.join("leasetimer"));
            }
        }

        Err(LeaseError::ConfigError(
            "Could not determine config directory".to_string(),
        ))
    }

    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, environment variables, and defaults
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_file_path()?)?;
        config.apply_overrides(
            std::env::var("LEASETIMER_FILE").ok(),
            std::env::var("LEASETIMER_TICK_MS").ok(),
        )?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, falling back to defaults when it does not exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Config::default());
        }

        tracing::debug!("Loading config from: {}", config_path.display());
        let contents = fs::read_to_string(config_path)
            .map_err(|e| LeaseError::ConfigError(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&contents)
            .map_err(|e| LeaseError::ConfigError(format!("Failed to parse config file: {}", e)))
    }

    fn apply_overrides(&mut self, file: Option<String>, tick_ms: Option<String>) -> Result<()> {
        if let Some(file) = file.filter(|f| !f.is_empty()) {
            tracing::debug!("Using LEASETIMER_FILE from environment: {}", file);
            self.source.path = Some(PathBuf::from(file));
        }

        if let Some(tick_ms) = tick_ms {
            tracing::debug!("Using LEASETIMER_TICK_MS from environment: {}", tick_ms);
            self.countdown.tick_interval_ms = tick_ms.trim().parse().map_err(|_| {
                LeaseError::ConfigError(format!("Invalid LEASETIMER_TICK_MS: {}", tick_ms))
            })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.countdown.tick_interval_ms == 0 {
            return Err(LeaseError::ConfigError(
                "countdown.tick_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.countdown.expiring_threshold_minutes < 0 {
            return Err(LeaseError::ConfigError(
                "countdown.expiring_threshold_minutes must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.countdown.tick_interval_ms)
    }

    /// Lease file to read: the CLI flag wins over config and environment
    pub fn source_path(&self, cli_file: Option<PathBuf>) -> Result<PathBuf> {
        cli_file
            .or_else(|| self.source.path.clone())
            .ok_or(LeaseError::NoSourceConfigured)
    }

    /// Create a sample config file with comments
    pub fn create_sample() -> Result<PathBuf> {
        let config_path = Self::config_file_path()?;
        Self::write_sample(&config_path)?;
        Ok(config_path)
    }

    fn write_sample(config_path: &Path) -> Result<()> {
        if let Some(config_dir) = config_path.parent() {
            if !config_dir.exists() {
                fs::create_dir_all(config_dir).map_err(|e| {
                    LeaseError::ConfigError(format!("Failed to create config directory: {}", e))
                })?;
                tracing::info!("Created config directory: {}", config_dir.display());
            }
        }

        // Don't overwrite existing config
        if config_path.exists() {
            return Err(LeaseError::ConfigError(format!(
                "Config file already exists at: {}",
                config_path.display()
            )));
        }

        let sample_config = r#"# leasetimer configuration
# Location priority:
#   1. $XDG_CONFIG_HOME/leasetimer/config.toml (if XDG_CONFIG_HOME is set)
#   2. ~/.config/leasetimer/config.toml (if ~/.config exists)
#   3. ~/.leasetimer/config.toml (fallback)
#
# Environment overrides:
#   LEASETIMER_FILE     lease file path
#   LEASETIMER_TICK_MS  countdown tick interval

[countdown]
# Milliseconds between countdown refreshes (default: 1000)
tick_interval_ms = 1000

# Leases with fewer minutes left than this are shown as EXPIRING (default: 60)
expiring_threshold_minutes = 60

[source]
# JSON file with leases, either an array or {"lease": [...]}
# Example: path = "/home/me/leases.json"
"#;

        fs::write(config_path, sample_config)
            .map_err(|e| LeaseError::ConfigError(format!("Failed to write sample config: {}", e)))?;

        tracing::info!("Wrote sample config to: {}", config_path.display());
        Ok(())
    }
}
