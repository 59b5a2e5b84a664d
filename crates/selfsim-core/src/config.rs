//! Configuration loading and typed config structures for the SELF kernel.
//!
//! The engine reads `selfsim-config.yaml` from its working directory. This
//! module defines strongly-typed structs that mirror the kernel's part of
//! that file; organism-specific sections are ignored here and parsed by
//! the binary that owns them. Every field has a default, so an empty
//! document is a valid configuration.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but holds unusable values.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level kernel configuration, consumed once at construction or reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// World dimensions, seed, and starting time.
    #[serde(default)]
    pub world: WorldConfig,

    /// Scheduler behavior.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Run bounds used by the runner.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load and validate configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yml reads an empty document as a unit value, not a map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for zero world dimensions or a
    /// zero placement attempt cap.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world.rows == 0 || self.world.columns == 0 {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "world must be at least 1x1, got {}x{}",
                    self.world.rows, self.world.columns
                ),
            });
        }
        if self.scheduler.placement_attempts == 0 {
            return Err(ConfigError::Invalid {
                reason: "scheduler.placement_attempts must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Number of grid rows.
    #[serde(default = "default_rows")]
    pub rows: usize,

    /// Number of grid columns.
    #[serde(default = "default_columns")]
    pub columns: usize,

    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Logical time of the first round.
    #[serde(default)]
    pub initial_time: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            columns: default_columns(),
            seed: default_seed(),
            initial_time: 0,
        }
    }
}

/// How the scheduler reacts to an entity whose tick fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Abort the round and return the error.
    #[default]
    Strict,
    /// Log the failure, count it in the round summary, and continue.
    Lenient,
}

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchedulerConfig {
    /// Reaction to entity tick failures.
    #[serde(default)]
    pub failure_mode: FailureMode,

    /// Post `join` and `leave` messages when entities are added or dropped.
    #[serde(default = "default_true")]
    pub announce_lifecycle: bool,

    /// Cap on random draws when behaviors search the grid for a cell.
    #[serde(default = "default_placement_attempts")]
    pub placement_attempts: u32,

    /// Verify the occupancy invariant at the end of every round.
    #[serde(default = "default_true")]
    pub check_invariants: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            failure_mode: FailureMode::default(),
            announce_lifecycle: true,
            placement_attempts: default_placement_attempts(),
            check_invariants: true,
        }
    }
}

/// Run bounds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Maximum number of rounds to run.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u64,

    /// End the run once no organism is left on the grid.
    #[serde(default = "default_true")]
    pub stop_on_extinction: bool,
}

impl Default for SimulationBoundsConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            stop_on_extinction: true,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG`
    /// is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const fn default_rows() -> usize {
    60
}

const fn default_columns() -> usize {
    60
}

const fn default_seed() -> u64 {
    42
}

const fn default_true() -> bool {
    true
}

const fn default_placement_attempts() -> u32 {
    100
}

const fn default_max_rounds() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = SimulationConfig::parse("").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.world.rows, 60);
        assert_eq!(config.world.columns, 60);
        assert_eq!(config.scheduler.failure_mode, FailureMode::Strict);
        assert!(config.scheduler.announce_lifecycle);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let yaml = "
world:
  rows: 10
  seed: 7
scheduler:
  failure_mode: lenient
simulation:
  max_rounds: 25
";
        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config.world.rows, 10);
        assert_eq!(config.world.columns, 60);
        assert_eq!(config.world.seed, 7);
        assert_eq!(config.scheduler.failure_mode, FailureMode::Lenient);
        assert_eq!(config.scheduler.placement_attempts, 100);
        assert_eq!(config.simulation.max_rounds, 25);
        assert!(config.simulation.stop_on_extinction);
    }

    #[test]
    fn unknown_sections_are_ignored() {
        let yaml = "
ecology:
  genome: NESSWWWW
world:
  columns: 5
";
        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config.world.columns, 5);
    }

    #[test]
    fn zero_dimensions_rejected() {
        let err = SimulationConfig::parse("world:\n  rows: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn zero_placement_cap_rejected() {
        let err = SimulationConfig::parse("scheduler:\n  placement_attempts: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn malformed_yaml_is_a_yaml_error() {
        let err = SimulationConfig::parse("world: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = SimulationConfig::from_file(Path::new("/nonexistent/selfsim.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
