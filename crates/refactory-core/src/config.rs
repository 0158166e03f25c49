//! Configuration loading and typed config structures for ReFactory.
//!
//! The configuration lives in `refactory-config.yaml` in the working
//! directory. Every section and field has a default, so an empty or missing
//! file yields a playable session. Sections that belong to a lower crate
//! reuse that crate's type directly.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use refactory_robots::ActionRules;
use refactory_script::ScriptBudget;
use refactory_world::{Spawner, SpawnerConfig, StartingWorldConfig};

/// Environment variable overriding `persistence.snapshot_path`.
pub const ENV_SNAPSHOT_PATH: &str = "REFACTORY_SNAPSHOT_PATH";

/// Environment variable overriding `spawner.seed`.
pub const ENV_SEED: &str = "REFACTORY_SEED";

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

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {name}")]
    Env {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },

    /// A value is out of its allowed range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Starting floor: robot, machines, energy pool.
    #[serde(default)]
    pub world: StartingWorldConfig,

    /// Tick rate, speed bounds and catch-up limits.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Action costs and interaction ranges.
    #[serde(default)]
    pub actions: ActionRules,

    /// Resource spawning.
    #[serde(default)]
    pub spawner: SpawnerConfig,

    /// Script budgets and the starter script.
    #[serde(default)]
    pub script: ScriptConfig,

    /// Snapshot persistence.
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Run limits.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `REFACTORY_SNAPSHOT_PATH` overrides `persistence.snapshot_path`
    /// - `REFACTORY_SEED` overrides `spawner.seed`
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load `path` if it exists, otherwise start from defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var(ENV_SNAPSHOT_PATH) {
            self.persistence.snapshot_path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var(ENV_SEED) {
            self.spawner.seed = val.trim().parse().ok().ok_or(ConfigError::Env {
                name: ENV_SEED,
                value: val,
            })?;
        }
        Ok(())
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| {
            Err(ConfigError::Invalid {
                reason: reason.to_owned(),
            })
        };
        let t = &self.timing;
        if t.ticks_per_second == 0 {
            return invalid("timing.ticks_per_second must be at least 1");
        }
        if t.max_ticks_per_frame == 0 {
            return invalid("timing.max_ticks_per_frame must be at least 1");
        }
        if !(t.min_speed.is_finite() && t.max_speed.is_finite()) || t.min_speed <= 0.0 {
            return invalid("timing speed bounds must be finite and positive");
        }
        if t.min_speed > t.max_speed {
            return invalid("timing.min_speed exceeds timing.max_speed");
        }
        if !(t.min_speed..=t.max_speed).contains(&t.initial_speed) {
            return invalid("timing.initial_speed is outside the speed bounds");
        }
        if self.persistence.interval_ticks == 0 {
            return invalid("persistence.interval_ticks must be at least 1");
        }
        let w = &self.world;
        if w.max_energy < w.initial_energy {
            return invalid("world.initial_energy exceeds world.max_energy");
        }
        if !w.robot_speed.is_finite() || w.robot_speed < 0.0 {
            return invalid("world.robot_speed must be finite and not negative");
        }
        if ![w.robot_start, w.storage_position, w.assembler_position]
            .iter()
            .all(|p| p.is_finite())
        {
            return invalid("world positions must be finite");
        }
        Spawner::new(self.spawner.clone()).map_err(|e| ConfigError::Invalid {
            reason: format!("spawner: {e}"),
        })?;
        Ok(())
    }
}

/// Tick timing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimingConfig {
    /// Simulated ticks per second at speed 1.0.
    #[serde(default = "default_ticks_per_second")]
    pub ticks_per_second: u32,

    /// Speed multiplier at startup.
    #[serde(default = "default_initial_speed")]
    pub initial_speed: f64,

    /// Lowest accepted speed multiplier.
    #[serde(default = "default_min_speed")]
    pub min_speed: f64,

    /// Highest accepted speed multiplier.
    #[serde(default = "default_max_speed")]
    pub max_speed: f64,

    /// Most ticks run for a single frame; extra lag is dropped.
    #[serde(default = "default_max_ticks_per_frame")]
    pub max_ticks_per_frame: u32,

    /// Real-time milliseconds between frames.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: default_ticks_per_second(),
            initial_speed: default_initial_speed(),
            min_speed: default_min_speed(),
            max_speed: default_max_speed(),
            max_ticks_per_frame: default_max_ticks_per_frame(),
            frame_interval_ms: default_frame_interval_ms(),
        }
    }
}

/// Script execution settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ScriptConfig {
    /// Per-invocation limits.
    #[serde(default)]
    pub budget: ScriptBudget,

    /// File whose contents replace the built-in starter script.
    #[serde(default)]
    pub starter_path: Option<PathBuf>,
}

/// Snapshot settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PersistenceConfig {
    /// Snapshot file.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    /// Save every N ticks.
    #[serde(default = "default_snapshot_interval_ticks")]
    pub interval_ticks: u64,

    /// Restore the snapshot at startup when one exists.
    #[serde(default = "default_true")]
    pub restore_on_start: bool,

    /// Save once more when the run ends.
    #[serde(default = "default_true")]
    pub save_on_exit: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            interval_ticks: default_snapshot_interval_ticks(),
            restore_on_start: true,
            save_on_exit: true,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
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

/// Run limits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Maximum number of ticks before the run ends (0 = unlimited).
    #[serde(default)]
    pub max_ticks: u64,

    /// Maximum wall-clock seconds before the run ends (0 = unlimited).
    #[serde(default)]
    pub max_real_time_seconds: u64,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_ticks_per_second() -> u32 {
    30
}

const fn default_initial_speed() -> f64 {
    1.0
}

const fn default_min_speed() -> f64 {
    0.1
}

const fn default_max_speed() -> f64 {
    5.0
}

const fn default_max_ticks_per_frame() -> u32 {
    10
}

const fn default_frame_interval_ms() -> u64 {
    16
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("refactory-snapshot.json")
}

const fn default_snapshot_interval_ticks() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}
