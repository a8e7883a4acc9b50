//! Immutable preference snapshot.
//!
//! The preference store is owned by the host application; the session core
//! only ever sees a [`PreferenceSet`] value captured once when a session
//! starts.  Changes the user makes afterwards apply to the *next* session.

use serde::{Deserialize, Serialize};

/// User preferences relevant to one device session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceSet {
    /// Audio backend identifier passed to the engine as a hint (e.g. `"AAudio"`).
    #[serde(default = "default_audio_driver")]
    pub audio_driver: String,
    /// Index of the audio output device the engine should open.
    #[serde(default)]
    pub audio_device: u32,
    /// Whether the on-screen button overlay is shown.
    #[serde(default = "default_true")]
    pub show_buttons: bool,
    /// Whether the engine should lock the display orientation.
    #[serde(default)]
    pub lock_orientation: bool,
}

fn default_audio_driver() -> String {
    "AAudio".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for PreferenceSet {
    fn default() -> Self {
        Self {
            audio_driver: default_audio_driver(),
            audio_device: 0,
            show_buttons: default_true(),
            lock_orientation: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_preferences_match_first_run_values() {
        let prefs = PreferenceSet::default();
        assert_eq!(prefs.audio_driver, "AAudio");
        assert_eq!(prefs.audio_device, 0);
        assert!(prefs.show_buttons);
        assert!(!prefs.lock_orientation);
    }
}
