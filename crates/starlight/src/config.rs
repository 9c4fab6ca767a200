//! # Configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no
//! file) is a valid configuration.
//!
//! ```toml
//! [simulation]
//! tick_rate = 20
//! sync_queue_capacity = 256
//!
//! [world]
//! removal_grace_ticks = 4
//!
//! [logging]
//! level = "info"
//! json_format = false
//!
//! [registry]
//! major = ["aevitas", "armara"]
//! perks = ["astral:root"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use starlight_networking::SyncConfig;
use starlight_shared::{RegistryDefinition, DEFAULT_SYNC_QUEUE_CAPACITY, TICK_RATE};
use starlight_world::{WorldConfig, DEFAULT_REMOVAL_GRACE_TICKS};

use crate::error::{ConfigError, ConfigResult};

/// Full configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarlightConfig {
    /// Step pacing and sync queue sizing.
    pub simulation: SimulationSettings,
    /// World behaviour.
    pub world: WorldSettings,
    /// Log output.
    pub logging: LoggingSettings,
    /// Known constellations, perks and targets.
    pub registry: RegistryDefinition,
}

/// `[simulation]` section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Steps per second.
    pub tick_rate: u32,
    /// Client sync queue capacity per player.
    pub sync_queue_capacity: usize,
    /// Warn about steps that exceed their time budget.
    pub enable_timing_logs: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            sync_queue_capacity: DEFAULT_SYNC_QUEUE_CAPACITY,
            enable_timing_logs: false,
        }
    }
}

/// `[world]` section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    /// Steps a collector may exist without a constellation.
    pub removal_grace_ticks: u32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            removal_grace_ticks: DEFAULT_REMOVAL_GRACE_TICKS,
        }
    }
}

/// `[logging]` section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter used when `RUST_LOG` is not set.
    pub level: String,
    /// JSON lines instead of human-readable output.
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl StarlightConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns error if the TOML is malformed or a value is out of range.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is invalid.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Renders the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.simulation.tick_rate == 0 {
            return Err(ConfigError::Invalid {
                field: "simulation.tick_rate",
                reason: "must be at least 1",
            });
        }
        if self.simulation.sync_queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "simulation.sync_queue_capacity",
                reason: "must be at least 1",
            });
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "logging.level",
                reason: "must not be empty",
            });
        }
        Ok(())
    }

    /// Client sync settings.
    #[must_use]
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            queue_capacity: self.simulation.sync_queue_capacity,
        }
    }

    /// World settings.
    #[must_use]
    pub fn world_config(&self) -> WorldConfig {
        WorldConfig {
            removal_grace_ticks: self.world.removal_grace_ticks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = StarlightConfig::from_toml_str("").unwrap();
        assert_eq!(config, StarlightConfig::default());
        assert_eq!(config.simulation.tick_rate, 20);
        assert_eq!(config.world_config().removal_grace_ticks, 4);
        assert_eq!(config.sync_config().queue_capacity, 256);
    }

    #[test]
    fn test_partial_sections() {
        let config = StarlightConfig::from_toml_str(
            r#"
            [simulation]
            sync_queue_capacity = 8

            [logging]
            json_format = true

            [registry]
            major = ["aevitas"]
            perks = ["astral:root"]
            "#,
        )
        .unwrap();
        assert_eq!(config.simulation.tick_rate, 20);
        assert_eq!(config.simulation.sync_queue_capacity, 8);
        assert!(config.logging.json_format);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.registry.major, vec!["aevitas".to_string()]);
        assert!(config.registry.weak.is_empty());
    }

    #[test]
    fn test_rejects_zero_tick_rate() {
        let err = StarlightConfig::from_toml_str("[simulation]\ntick_rate = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "simulation.tick_rate",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_wrong_type() {
        let err = StarlightConfig::from_toml_str("[simulation]\ntick_rate = \"fast\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = StarlightConfig::default();
        config.registry.minor.push("gelu".into());
        config.world.removal_grace_ticks = 10;
        let text = config.to_toml_string().unwrap();
        assert_eq!(StarlightConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        let err = StarlightConfig::load("/nonexistent/starlight.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
