use crate::driver::{DEFAULT_CLOCK_INTERVAL, DEFAULT_DETECTION_INTERVAL, DriverSettings};
use crate::scoring::heuristic::HeuristicParams;
use crate::tracking::TrackerConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const DEFAULT_SERVER_PORT: u16 = 8080;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub app: AppSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub session: Option<SessionSection>,
    #[serde(default)]
    pub tracking: Option<TrackerConfig>,
    #[serde(default)]
    pub scoring: Option<HeuristicParams>,
    #[serde(default)]
    pub detector: Option<DetectorSection>,
    #[serde(default)]
    pub server: Option<ServerSection>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionSection {
    /// Detection pipeline cadence in milliseconds (default: 500)
    pub detection_interval_ms: Option<u64>,
    /// Session clock cadence in milliseconds (default: 1000)
    pub clock_interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectorSection {
    /// Recorded detection batches to serve instead of a live detector
    pub replay_path: Option<PathBuf>,
    #[serde(default)]
    pub loop_replay: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSection {
    /// Port to listen on (default: 8080)
    pub port: Option<u16>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub fn load_default() -> Result<Config, ConfigError> {
    load_from_path(DEFAULT_CONFIG_PATH)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    fn validate(&self) -> Result<(), ConfigError> {
        let settings = self.driver_settings();
        if settings.detection_interval.is_zero() || settings.clock_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "session intervals must be greater than zero".to_string(),
            ));
        }
        if self.tracker_config().history_capacity == 0 {
            return Err(ConfigError::Invalid(
                "tracking.history_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn driver_settings(&self) -> DriverSettings {
        let session = self.session.as_ref();
        DriverSettings {
            detection_interval: session
                .and_then(|s| s.detection_interval_ms)
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_DETECTION_INTERVAL),
            clock_interval: session
                .and_then(|s| s.clock_interval_ms)
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_CLOCK_INTERVAL),
        }
    }

    /// Tick length fed to the scorer's eye-closure accumulator.
    pub fn tick_interval_ms(&self) -> u64 {
        self.driver_settings().detection_interval.as_millis() as u64
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        self.tracking.clone().unwrap_or_default()
    }

    pub fn replay_path(&self) -> Option<&Path> {
        let path = self.detector.as_ref()?.replay_path.as_deref()?;
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    }

    pub fn loop_replay(&self) -> bool {
        self.detector.as_ref().is_some_and(|d| d.loop_replay)
    }

    /// Returns the server port (default: 8080)
    pub fn server_port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_SERVER_PORT)
    }
}
