//! Best-effort persistence of user preferences.
//!
//! The session never fails because of the store: [`read_pref`] and
//! [`write_pref`] log errors and carry on.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use colorwatch_core::RawInputs;

const APP_NAME: &str = "colorwatch";
const PREFS_FILE: &str = "prefs.json";

/// Namespace put in front of every key.
pub const KEY_PREFIX: &str = "colorwatch.";

pub mod keys {
    pub const TARGET_COLOR: &str = "targetColor";
    pub const TOLERANCE: &str = "allowedDifference";
    pub const THRESHOLD: &str = "filterThreshold";
    pub const NOTIFY: &str = "notifyOnDetection";
}

#[derive(thiserror::Error, Debug)]
pub enum PrefsError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub trait PreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, PrefsError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PrefsError>;
}

/// Read `key` (namespaced), logging and swallowing store errors.
pub fn read_pref<St: PreferenceStore + ?Sized>(store: &St, key: &str) -> Option<String> {
    match store.get(&format!("{KEY_PREFIX}{key}")) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("failed to read preference {key}: {e}");
            None
        }
    }
}

/// Write `key` (namespaced), logging and swallowing store errors.
pub fn write_pref<St: PreferenceStore + ?Sized>(store: &mut St, key: &str, value: &str) {
    if let Err(e) = store.set(&format!("{KEY_PREFIX}{key}"), value) {
        log::warn!("failed to save preference {key}: {e}");
    }
}

/// Stored inputs layered over `base`. Fields that were never saved keep
/// their `base` value.
pub fn load_inputs<St: PreferenceStore + ?Sized>(store: &St, base: RawInputs) -> RawInputs {
    RawInputs {
        target_color: read_pref(store, keys::TARGET_COLOR).unwrap_or(base.target_color),
        tolerance: read_pref(store, keys::TOLERANCE).unwrap_or(base.tolerance),
        threshold: read_pref(store, keys::THRESHOLD).unwrap_or(base.threshold),
    }
}

/// The saved "notify on detection" flag. Anything other than a missing
/// value or `"0"` counts as on.
pub fn load_notify<St: PreferenceStore + ?Sized>(store: &St) -> bool {
    read_pref(store, keys::NOTIFY).is_some_and(|v| v != "0")
}

#[derive(Clone, Debug, Default)]
pub struct MemoryPreferences {
    entries: BTreeMap<String, String>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Result<Option<String>, PrefsError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PrefsError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A flat JSON object on disk, rewritten on every `set`.
#[derive(Debug)]
pub struct JsonFilePreferences {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFilePreferences {
    /// Open `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PrefsError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries })
    }

    /// Open the store, falling back to an empty in-memory copy (still bound
    /// to `path`) when the file cannot be read.
    pub fn open_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::open(&path) {
            Ok(store) => store,
            Err(e) => {
                log::warn!("ignoring unreadable preferences {}: {e}", path.display());
                Self {
                    path,
                    entries: BTreeMap::new(),
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `$COLORWATCH_PREFS`, else the per-user config directory
    /// (`%APPDATA%`, `$XDG_CONFIG_HOME` or `~/.config`), else the working
    /// directory.
    pub fn default_path() -> PathBuf {
        if let Some(p) = std::env::var_os("COLORWATCH_PREFS") {
            return PathBuf::from(p);
        }
        Self::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(PREFS_FILE)
    }

    fn config_dir() -> Option<PathBuf> {
        let base = std::env::var_os("APPDATA")
            .or_else(|| std::env::var_os("XDG_CONFIG_HOME"))
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join(APP_NAME))
    }

    fn flush(&self) -> Result<(), PrefsError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl PreferenceStore for JsonFilePreferences {
    fn get(&self, key: &str) -> Result<Option<String>, PrefsError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PrefsError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }
}
