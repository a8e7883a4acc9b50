//! TOML-based configuration persistence for the M8 host.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\M8Client\config.toml`
//! - Linux:    `~/.config/m8client/config.toml`
//! - macOS:    `~/Library/Application Support/M8Client/config.toml`
//!
//! # What is TOML? (for beginners)
//!
//! TOML (Tom's Obvious Minimal Language) is a configuration file format designed
//! to be easy to read and write.  It looks similar to INI files but with more
//! data types.  Example:
//!
//! ```toml
//! [preferences]
//! audio_driver = "AAudio"
//! audio_device = 0
//! show_buttons = true
//! lock_orientation = false
//!
//! [logging]
//! level = "info"
//!
//! [usb]
//! event_channel_capacity = 64
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "some_fn")]` (or `#[serde(default)]`
//! for whole sections), so a missing file, a missing section, or a missing key
//! all fall back to the same defaults.  An older config file keeps working
//! after new fields are added.
//!
//! # Preferences are read per session
//!
//! [`TomlPreferenceStore`] re-reads the file on every `snapshot()`.  The
//! session takes exactly one snapshot at `start()`, so edits made between
//! sessions are picked up and edits made during a session are not.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use m8_core::PreferenceSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::application::session::{PreferenceError, PreferenceStore};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub preferences: PreferenceSet,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub usb: UsbConfig,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// USB event plumbing settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsbConfig {
    /// Capacity of the inbound host event channel.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_event_channel_capacity() -> usize {
    64
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for UsbConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cfg: AppConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("no config at {}, using defaults", path.display());
            Ok(AppConfig::default())
        }
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config directory including the `M8Client` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("M8Client"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("m8client"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("M8Client")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Preference stores ─────────────────────────────────────────────────────────

/// Serves preferences from the `[preferences]` section of a config file.
pub struct TomlPreferenceStore {
    path: PathBuf,
}

impl TomlPreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for TomlPreferenceStore {
    fn snapshot(&self) -> Result<PreferenceSet, PreferenceError> {
        load_config_from(&self.path)
            .map(|cfg| cfg.preferences)
            .map_err(|e| PreferenceError(e.to_string()))
    }
}

/// Keeps preferences in memory, for embeddings that own their settings UI.
#[derive(Default)]
pub struct MemoryPreferenceStore {
    preferences: Mutex<PreferenceSet>,
    failing: Mutex<bool>,
}

impl MemoryPreferenceStore {
    pub fn new(preferences: PreferenceSet) -> Self {
        Self {
            preferences: Mutex::new(preferences),
            failing: Mutex::new(false),
        }
    }

    /// Edits the stored preferences in place.
    pub fn update(&self, edit: impl FnOnce(&mut PreferenceSet)) {
        let mut preferences = lock(&self.preferences);
        edit(&mut preferences);
    }

    /// When `true`, `snapshot` fails.
    pub fn set_failing(&self, failing: bool) {
        *lock(&self.failing) = failing;
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn snapshot(&self) -> Result<PreferenceSet, PreferenceError> {
        if *lock(&self.failing) {
            return Err(PreferenceError("preference store offline".into()));
        }
        Ok(lock(&self.preferences).clone())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_config_path() -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("m8_test_{}", Uuid::new_v4()));
        let path = dir.join("config.toml");
        (dir, path)
    }

    // ── AppConfig defaults ────────────────────────────────────────────────────

    #[test]
    fn test_app_config_default_preferences() {
        // Arrange / Act
        let cfg = AppConfig::default();

        // Assert
        assert_eq!(cfg.preferences.audio_driver, "AAudio");
        assert_eq!(cfg.preferences.audio_device, 0);
        assert!(cfg.preferences.show_buttons);
        assert!(!cfg.preferences.lock_orientation);
    }

    #[test]
    fn test_app_config_default_ambient_sections() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.usb.event_channel_capacity, 64);
    }

    // ── TOML parsing ──────────────────────────────────────────────────────────

    #[test]
    fn test_deserialize_empty_toml_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_deserialize_partial_preferences_overrides_defaults() {
        // Arrange
        let toml_str = r#"
[preferences]
audio_driver = "OpenSLES"
lock_orientation = true
"#;

        // Act
        let cfg: AppConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.preferences.audio_driver, "OpenSLES");
        assert!(cfg.preferences.lock_orientation);
        // Unspecified fields keep their defaults
        assert!(cfg.preferences.show_buttons);
        assert_eq!(cfg.usb.event_channel_capacity, 64);
    }

    #[test]
    fn test_deserialize_invalid_toml_returns_parse_error() {
        let result: Result<AppConfig, toml::de::Error> = toml::from_str("[[[ not valid toml");
        assert!(result.is_err());
    }

    // ── load / save ───────────────────────────────────────────────────────────

    #[test]
    fn test_load_config_from_missing_file_returns_defaults() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/config.toml");
        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_load_config_from_malformed_file_is_parse_error() {
        // Arrange
        let (dir, path) = temp_config_path();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, "[preferences\naudio_device = ").unwrap();

        // Act
        let result = load_config_from(&path);

        // Assert
        assert!(matches!(result, Err(ConfigError::Parse(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_and_load_config_round_trip_via_temp_dir() {
        // Arrange
        let (dir, path) = temp_config_path();
        let mut cfg = AppConfig::default();
        cfg.preferences.audio_device = 2;
        cfg.logging.level = "debug".to_string();

        // Act
        save_config_to(&path, &cfg).unwrap();
        let loaded = load_config_from(&path).unwrap();

        // Assert
        assert_eq!(loaded, cfg);

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_config_file_path_ends_with_config_toml() {
        if let Ok(path) = config_file_path() {
            assert!(
                path.ends_with("config.toml"),
                "config file must be named config.toml, got {path:?}"
            );
        }
        // NoPlatformConfigDir is acceptable in a stripped CI environment.
    }

    // ── Preference stores ─────────────────────────────────────────────────────

    #[test]
    fn test_toml_store_rereads_file_on_each_snapshot() {
        // Arrange
        let (dir, path) = temp_config_path();
        let store = TomlPreferenceStore::new(&path);
        let before = store.snapshot().unwrap();

        // Act – edit the file between two sessions
        let mut cfg = AppConfig::default();
        cfg.preferences.show_buttons = false;
        save_config_to(&path, &cfg).unwrap();
        let after = store.snapshot().unwrap();

        // Assert
        assert!(before.show_buttons);
        assert!(!after.show_buttons);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_toml_store_maps_parse_failure_to_preference_error() {
        let (dir, path) = temp_config_path();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, "preferences = 7").unwrap();

        let result = TomlPreferenceStore::new(&path).snapshot();

        assert!(result.is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_memory_store_snapshot_is_a_copy() {
        // Arrange
        let store = MemoryPreferenceStore::new(PreferenceSet::default());
        let snapshot = store.snapshot().unwrap();

        // Act
        store.update(|p| p.audio_device = 9);

        // Assert
        assert_eq!(snapshot.audio_device, 0);
        assert_eq!(store.snapshot().unwrap().audio_device, 9);
    }

    #[test]
    fn test_memory_store_can_fail() {
        let store = MemoryPreferenceStore::default();
        store.set_failing(true);
        assert!(store.snapshot().is_err());
    }
}
