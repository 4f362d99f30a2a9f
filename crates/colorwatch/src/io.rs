//! JSON configuration for a watch run.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use colorwatch_core::RawInputs;
use serde::{Deserialize, Serialize};

use crate::capture::CaptureOptions;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn default_target_color() -> String {
    RawInputs::default().target_color
}

fn default_tolerance() -> i64 {
    0
}

fn default_threshold() -> i64 {
    1
}

fn default_interval_ms() -> u64 {
    1000
}

/// Settings for `colorwatch watch`.
///
/// Numeric fields are signed on purpose: a stored negative tolerance is a
/// user input like any other and is rejected per tick, not at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_target_color")]
    pub target_color: String,
    #[serde(default = "default_tolerance")]
    pub tolerance: i64,
    #[serde(default = "default_threshold")]
    pub threshold: i64,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub notify: bool,
    #[serde(default)]
    pub monitor: Option<String>,
    #[serde(default)]
    pub prefs_path: Option<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            target_color: default_target_color(),
            tolerance: default_tolerance(),
            threshold: default_threshold(),
            interval_ms: default_interval_ms(),
            notify: false,
            monitor: None,
            prefs_path: None,
        }
    }
}

impl MonitorConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn raw_inputs(&self) -> RawInputs {
        RawInputs {
            target_color: self.target_color.clone(),
            tolerance: self.tolerance.to_string(),
            threshold: self.threshold.to_string(),
        }
    }

    /// Tick period; zero is bumped to one millisecond.
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            display: self.monitor.clone(),
            ..CaptureOptions::default()
        }
    }

    pub fn prefs_path(&self) -> Option<PathBuf> {
        self.prefs_path.as_ref().map(PathBuf::from)
    }
}
