use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

// =============================================================================
// Time-related constants
// =============================================================================

/// Quarantine window used when none (or an unusable one) is configured
pub const DEFAULT_QUARANTINE_DAYS: f64 = 7.0;

/// Milliseconds in one day
pub const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

const APP_NAME: &str = "npm-age-filter";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Filter configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AgeFilterConfig {
    pub quarantine_days: QuarantineDays,
}

impl AgeFilterConfig {
    /// Load the configuration from a JSON file.
    ///
    /// A missing file yields the default configuration.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config file at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Length of the quarantine window in days
///
/// Deserializes leniently: a number or numeric string is accepted, and anything
/// that is not a finite number worth at least one millisecond falls back to
/// [`DEFAULT_QUARANTINE_DAYS`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuarantineDays(f64);

impl QuarantineDays {
    /// Returns the configured days, or the default for unusable values
    pub fn new(days: f64) -> Self {
        if days.is_finite() && Self::rounded_millis(days) > 0.0 {
            Self(days)
        } else {
            Self(DEFAULT_QUARANTINE_DAYS)
        }
    }

    pub fn days(&self) -> f64 {
        self.0
    }

    /// The window as a duration, saturating at [`TimeDelta::MAX`]
    pub fn window(&self) -> TimeDelta {
        let millis = Self::rounded_millis(self.0);
        if millis >= i64::MAX as f64 {
            return TimeDelta::MAX;
        }
        TimeDelta::try_milliseconds(millis as i64).unwrap_or(TimeDelta::MAX)
    }

    fn rounded_millis(days: f64) -> f64 {
        (days * MILLIS_PER_DAY as f64).round()
    }

    fn from_value(value: &Value) -> Self {
        let days = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        Self::new(days.unwrap_or(DEFAULT_QUARANTINE_DAYS))
    }
}

impl Default for QuarantineDays {
    fn default() -> Self {
        Self(DEFAULT_QUARANTINE_DAYS)
    }
}

impl<'de> Deserialize<'de> for QuarantineDays {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

/// Returns the path to the config file.
/// Uses $XDG_CONFIG_HOME/npm-age-filter/config.json if XDG_CONFIG_HOME is set,
/// otherwise falls back to ~/.config/npm-age-filter/config.json,
/// or ./npm-age-filter/config.json if neither is available.
pub fn config_path() -> PathBuf {
    app_dir_with_env(
        std::env::var("XDG_CONFIG_HOME").ok(),
        dirs::home_dir(),
        ".config",
    )
    .join("config.json")
}

/// Returns the path to the log file.
/// Follows the same fallback chain as [`config_path`] rooted at
/// $XDG_DATA_HOME or ~/.local/share.
pub fn log_path() -> PathBuf {
    app_dir_with_env(
        std::env::var("XDG_DATA_HOME").ok(),
        dirs::home_dir(),
        ".local/share",
    )
    .join(format!("{APP_NAME}.log"))
}

fn app_dir_with_env(
    xdg_home: Option<String>,
    home_dir: Option<PathBuf>,
    home_relative: &str,
) -> PathBuf {
    let base = xdg_home
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(home_relative)))
        .unwrap_or_else(|| PathBuf::from("."));

    base.join(APP_NAME)
}
