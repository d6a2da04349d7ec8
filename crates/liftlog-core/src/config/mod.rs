//! LiftLog configuration: session defaults, timer tuning, storage location

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// LiftLog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub timers: TimerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Defaults applied to exercises added without explicit targets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub default_target_sets: u32,
    pub default_target_reps: String,
    pub default_rest_secs: u64,
    /// Move to the next exercise once the current one has every set logged
    pub auto_advance: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimerConfig {
    pub tick_interval_ms: u64,
    pub undo_window_secs: u64,
    pub rest_warning_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_target_sets: 3,
            default_target_reps: "8-12".to_string(),
            default_rest_secs: 90,
            auto_advance: false,
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            undo_window_secs: 5,
            rest_warning_secs: 10,
        }
    }
}

impl TimerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn undo_window(&self) -> Duration {
        Duration::from_secs(self.undo_window_secs)
    }
}

impl SessionConfig {
    pub fn default_rest(&self) -> Duration {
        Duration::from_secs(self.default_rest_secs)
    }
}

impl Config {
    /// Directory holding `config.toml` (`LIFTLOG_CONFIG_DIR` wins)
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("LIFTLOG_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("liftlog")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Directory holding saved workouts and the recovery marker
    pub fn data_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.storage.data_dir {
            return Ok(dir.clone());
        }
        if let Ok(custom_dir) = env::var("LIFTLOG_DATA_DIR") {
            return Ok(PathBuf::from(custom_dir));
        }
        Ok(dirs::data_dir()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?
            .join("liftlog"))
    }

    /// Load configuration from file, or return defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Reject settings the session engine cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.session.default_target_sets == 0 {
            return Err(anyhow!("session.default_target_sets must be at least 1"));
        }
        if self.timers.tick_interval_ms == 0 {
            return Err(anyhow!("timers.tick_interval_ms must be greater than 0"));
        }
        if self.timers.undo_window_secs == 0 {
            return Err(anyhow!("timers.undo_window_secs must be greater than 0"));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "session.default_target_sets" => Ok(self.session.default_target_sets.to_string()),
            "session.default_target_reps" => Ok(self.session.default_target_reps.clone()),
            "session.default_rest_secs" => Ok(self.session.default_rest_secs.to_string()),
            "session.auto_advance" => Ok(self.session.auto_advance.to_string()),

            "timers.tick_interval_ms" => Ok(self.timers.tick_interval_ms.to_string()),
            "timers.undo_window_secs" => Ok(self.timers.undo_window_secs.to_string()),
            "timers.rest_warning_secs" => Ok(self.timers.rest_warning_secs.to_string()),

            "storage.data_dir" => match &self.storage.data_dir {
                Some(dir) => Ok(dir.display().to_string()),
                None => Ok("(default)".to_string()),
            },

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `liftlog config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "session.default_target_sets" => {
                let sets: u32 = value
                    .parse()
                    .with_context(|| format!("Invalid default_target_sets value: {}", value))?;
                if sets == 0 {
                    return Err(anyhow!("Default target sets must be at least 1"));
                }
                self.session.default_target_sets = sets;
            }
            "session.default_target_reps" => {
                if value.trim().is_empty() {
                    return Err(anyhow!("Default target reps cannot be empty"));
                }
                self.session.default_target_reps = value.trim().to_string();
            }
            "session.default_rest_secs" => {
                self.session.default_rest_secs = value
                    .parse()
                    .with_context(|| format!("Invalid default_rest_secs value: {}", value))?;
            }
            "session.auto_advance" => {
                self.session.auto_advance = value
                    .parse()
                    .with_context(|| format!("Invalid auto_advance value: {}", value))?;
            }

            "timers.tick_interval_ms" => {
                let ms: u64 = value
                    .parse()
                    .with_context(|| format!("Invalid tick_interval_ms value: {}", value))?;
                if ms == 0 {
                    return Err(anyhow!("Tick interval must be greater than 0"));
                }
                self.timers.tick_interval_ms = ms;
            }
            "timers.undo_window_secs" => {
                let secs: u64 = value
                    .parse()
                    .with_context(|| format!("Invalid undo_window_secs value: {}", value))?;
                if secs == 0 {
                    return Err(anyhow!("Undo window must be greater than 0"));
                }
                self.timers.undo_window_secs = secs;
            }
            "timers.rest_warning_secs" => {
                self.timers.rest_warning_secs = value
                    .parse()
                    .with_context(|| format!("Invalid rest_warning_secs value: {}", value))?;
            }

            "storage.data_dir" => {
                self.storage.data_dir = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `liftlog config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// Every dotted key with its current value, in file order
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = vec![
            "session.default_target_sets",
            "session.default_target_reps",
            "session.default_rest_secs",
            "session.auto_advance",
            "timers.tick_interval_ms",
            "timers.undo_window_secs",
            "timers.rest_warning_secs",
            "storage.data_dir",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}
