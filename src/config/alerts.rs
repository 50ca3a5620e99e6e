//! Spoken alert configuration

use serde::{Deserialize, Serialize};

/// Which slots share suppression state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlertScope {
    /// One notifier per video slot; a slot's alert never suppresses another's
    #[default]
    PerSlot,
    /// A single notifier shared by all slots
    Shared,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Whether alerts are spoken at startup
    pub voice_enabled: bool,
    /// Seconds an identical alert stays suppressed after being spoken
    pub cooldown_seconds: u64,
    /// Speaking rate multiplier passed to the speech output
    pub speech_rate: f32,
    pub scope: AlertScope,
    /// External TTS program and arguments, e.g. `["espeak", "-s", "{wpm}"]`.
    /// Alerts are only logged when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_command: Option<Vec<String>>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            voice_enabled: false,
            cooldown_seconds: 5,
            speech_rate: 1.2,
            scope: AlertScope::PerSlot,
            speech_command: None,
        }
    }
}
