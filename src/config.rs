//! Application-level configuration loading: competition timing and store layout.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "LEADERBOARD_CONFIG_PATH";
/// Environment variable that overrides the configured competition duration, in seconds.
const DURATION_ENV: &str = "LEADERBOARD_DURATION_SECS";
/// Period of the countdown ticker. Each tick removes one second from the countdown.
pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);
const DEFAULT_COMPETITION_PATH: &str = "competition";

/// Reasons the configuration cannot be turned into an [`AppConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither the config file nor the environment set a competition duration.
    #[error(
        "competition duration is not configured (set `competition.duration_secs` or `LEADERBOARD_DURATION_SECS`)"
    )]
    MissingDuration,
    /// The environment override is not a whole number of seconds.
    #[error("invalid `LEADERBOARD_DURATION_SECS` value `{value}`")]
    InvalidDuration { value: String },
    /// The configured duration is zero seconds.
    #[error("competition duration must be greater than zero")]
    ZeroDuration,
    /// The countdown only ticks once per second.
    #[error("unsupported `competition.tick_interval_ms` value {ms}: the countdown ticks every 1000 ms")]
    UnsupportedTickInterval { ms: u64 },
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    duration: Duration,
    participants_path: String,
    competition_path: String,
}

impl AppConfig {
    /// Configuration for a competition lasting `duration`, with the default store layout.
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            participants_path: String::new(),
            competition_path: DEFAULT_COMPETITION_PATH.to_string(),
        }
    }

    /// Override the store regions holding participant records and competition state.
    pub fn with_paths(
        mut self,
        participants: impl Into<String>,
        competition: impl Into<String>,
    ) -> Self {
        self.participants_path = participants.into();
        self.competition_path = competition.into();
        self
    }

    /// Load the configuration from disk and environment.
    ///
    /// Unreadable or malformed files are logged and ignored; the competition duration has no
    /// built-in default and must come from one of the two sources.
    pub fn load() -> Result<Self, ConfigError> {
        let path = resolve_config_path();
        let raw = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded configuration file");
                    raw
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; ignoring file"
                    );
                    RawConfig::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using environment and built-in defaults"
                );
                RawConfig::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; ignoring file"
                );
                RawConfig::default()
            }
        };

        let config = raw.resolve(env::var(DURATION_ENV).ok())?;
        info!(
            duration_secs = config.duration_secs(),
            participants_path = %config.participants_path,
            competition_path = %config.competition_path,
            "competition configuration ready"
        );
        Ok(config)
    }

    /// Length of a competition run.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Configured duration in whole seconds, the unit of the countdown.
    pub fn duration_secs(&self) -> u64 {
        self.duration.as_secs()
    }

    /// Store region holding every participant record (empty for the root).
    pub fn participants_path(&self) -> &str {
        &self.participants_path
    }

    /// Store region holding the shared competition record.
    pub fn competition_path(&self) -> &str {
        &self.competition_path
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    competition: RawCompetition,
    paths: RawPaths,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCompetition {
    duration_secs: Option<u64>,
    tick_interval_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPaths {
    participants: Option<String>,
    competition: Option<String>,
}

impl RawConfig {
    /// Merge the file contents with the environment override into a validated config.
    fn resolve(self, duration_override: Option<String>) -> Result<AppConfig, ConfigError> {
        let duration_secs = match duration_override {
            Some(value) => {
                let parsed = value.trim().parse::<u64>();
                parsed.map_err(|_| ConfigError::InvalidDuration { value })?
            }
            None => self
                .competition
                .duration_secs
                .ok_or(ConfigError::MissingDuration)?,
        };
        if duration_secs == 0 {
            return Err(ConfigError::ZeroDuration);
        }

        match self.competition.tick_interval_ms {
            Some(ms) if Duration::from_millis(ms) != COUNTDOWN_TICK => {
                return Err(ConfigError::UnsupportedTickInterval { ms });
            }
            _ => {}
        }

        let config = AppConfig::new(Duration::from_secs(duration_secs))
            .with_paths(
                self.paths.participants.unwrap_or_default(),
                self.paths
                    .competition
                    .unwrap_or_else(|| DEFAULT_COMPETITION_PATH.to_string()),
            );
        Ok(config)
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
