//! Application-level configuration loading, including the match policy values.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_CLASH_BACK_CONFIG_PATH";

/// Rounds drawn per match when the config does not say otherwise.
const DEFAULT_ROUNDS_PER_MATCH: usize = 5;
/// Seconds both players get per round.
const DEFAULT_ROUND_TIME_LIMIT_SECS: u32 = 15;
/// Minimum age of a finished match before the sweep may purge it.
const DEFAULT_RETENTION_WINDOW_SECS: u64 = 600;
/// Pause between two retention sweeps.
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 600;
/// Default location of the round catalog file.
const DEFAULT_CATALOG_PATH: &str = "config/rounds.json";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Rounds drawn per match (capped by the catalog size).
    pub rounds_per_match: usize,
    /// Seconds players get per round. Always positive.
    pub round_time_limit_secs: u32,
    /// Minimum age of a finished match before the sweep purges it.
    pub retention_window_secs: u64,
    /// Interval at which the retention sweep runs.
    pub sweep_interval_secs: u64,
    /// Where the round catalog JSON lives.
    pub catalog_path: PathBuf,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the
    /// baked-in defaults on any failure.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), ?config, "loaded configuration");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rounds_per_match: DEFAULT_ROUNDS_PER_MATCH,
            round_time_limit_secs: DEFAULT_ROUND_TIME_LIMIT_SECS,
            retention_window_secs: DEFAULT_RETENTION_WINDOW_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    rounds_per_match: Option<usize>,
    #[serde(default)]
    round_time_limit_secs: Option<u32>,
    #[serde(default)]
    retention_window_secs: Option<u64>,
    #[serde(default)]
    sweep_interval_secs: Option<u64>,
    #[serde(default)]
    catalog_path: Option<PathBuf>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();

        let rounds_per_match = match value.rounds_per_match {
            Some(0) | None => defaults.rounds_per_match,
            Some(count) => count,
        };
        let round_time_limit_secs = match value.round_time_limit_secs {
            Some(0) | None => defaults.round_time_limit_secs,
            Some(limit) => limit,
        };
        if value.rounds_per_match == Some(0) || value.round_time_limit_secs == Some(0) {
            warn!("zero match policy values in config; using defaults instead");
        }

        Self {
            rounds_per_match,
            round_time_limit_secs,
            retention_window_secs: value
                .retention_window_secs
                .unwrap_or(defaults.retention_window_secs),
            sweep_interval_secs: value
                .sweep_interval_secs
                .unwrap_or(defaults.sweep_interval_secs),
            catalog_path: value.catalog_path.unwrap_or(defaults.catalog_path),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
