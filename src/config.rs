//! Application-level configuration loading for the round engine.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "FASTEST_FINGER_CONFIG_PATH";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Poll interval of the phase guard reconciler.
    pub guard_interval_ms: u64,
    /// Lower bound of the randomized suspense pause before GO.
    pub suspense_min_ms: u64,
    /// Upper bound of the randomized suspense pause before GO.
    pub suspense_max_ms: u64,
    /// Countdown duration used when the start request omits one.
    pub default_countdown_ms: u64,
    /// Reaction-window duration used when the start request omits one.
    pub default_window_ms: u64,
    /// Number of rows shown in the leaderboard window.
    pub leaderboard_size: usize,
    /// Capacity of the SSE broadcast channels.
    pub sse_capacity: usize,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration");
                    config.sanitized()
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

    /// Random suspense-pause bounds as an inclusive range.
    pub fn suspense_range(&self) -> std::ops::RangeInclusive<u64> {
        self.suspense_min_ms..=self.suspense_max_ms
    }

    /// Repair inverted or degenerate values that a hand-edited file can carry.
    fn sanitized(mut self) -> Self {
        if self.suspense_min_ms > self.suspense_max_ms {
            warn!(
                min = self.suspense_min_ms,
                max = self.suspense_max_ms,
                "suspense bounds inverted; swapping"
            );
            std::mem::swap(&mut self.suspense_min_ms, &mut self.suspense_max_ms);
        }
        if self.guard_interval_ms == 0 {
            warn!("guard interval of 0 ms rejected; using default");
            self.guard_interval_ms = AppConfig::default().guard_interval_ms;
        }
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            guard_interval_ms: 250,
            suspense_min_ms: 900,
            suspense_max_ms: 2_700,
            default_countdown_ms: 5_000,
            default_window_ms: 10_000,
            leaderboard_size: 5,
            sse_capacity: 16,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file; every field is optional.
struct RawConfig {
    guard_interval_ms: Option<u64>,
    suspense_min_ms: Option<u64>,
    suspense_max_ms: Option<u64>,
    default_countdown_ms: Option<u64>,
    default_window_ms: Option<u64>,
    leaderboard_size: Option<usize>,
    sse_capacity: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            guard_interval_ms: raw.guard_interval_ms.unwrap_or(defaults.guard_interval_ms),
            suspense_min_ms: raw.suspense_min_ms.unwrap_or(defaults.suspense_min_ms),
            suspense_max_ms: raw.suspense_max_ms.unwrap_or(defaults.suspense_max_ms),
            default_countdown_ms: raw
                .default_countdown_ms
                .unwrap_or(defaults.default_countdown_ms),
            default_window_ms: raw.default_window_ms.unwrap_or(defaults.default_window_ms),
            leaderboard_size: raw.leaderboard_size.unwrap_or(defaults.leaderboard_size),
            sse_capacity: raw.sse_capacity.unwrap_or(defaults.sse_capacity),
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
