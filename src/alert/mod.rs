//! Spoken alert throttling.
//!
//! [`AlertNotifier`] turns a stream of optional alert texts into
//! [`SpeakCommand`]s, suppressing an identical text for a cool-down window.
//! Suppression is time-windowed, not edge-triggered: an alert that stays
//! active past the cool-down is announced again even if the hazard never
//! cleared in between.

pub mod speech;

pub use speech::{speech_from_config, ChannelSpeech, CommandSpeech, LogSpeech, SpeechOutput};

use crate::config::AlertConfig;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Default window during which an identical alert is not repeated.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5);

/// Default speaking rate multiplier.
pub const DEFAULT_SPEECH_RATE: f32 = 1.2;

/// Request to the speech-output collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeakCommand {
    pub text: String,
    pub rate: f32,
}

/// Decides when an alert text should be spoken.
#[derive(Debug, Clone)]
pub struct AlertNotifier {
    cooldown: Duration,
    rate: f32,
    last_spoken_text: Option<String>,
    suppressed_until: Option<Instant>,
}

impl AlertNotifier {
    pub fn new(cooldown: Duration, rate: f32) -> Self {
        Self {
            cooldown,
            rate,
            last_spoken_text: None,
            suppressed_until: None,
        }
    }

    pub fn from_config(config: &AlertConfig) -> Self {
        Self::new(Duration::from_secs(config.cooldown_seconds), config.speech_rate)
    }

    /// Consider the current alert and return a command if it should be spoken.
    ///
    /// Absent text or a disabled voice leaves the notifier untouched.
    pub fn consider(
        &mut self,
        alert_text: Option<&str>,
        enabled: bool,
        now: Instant,
    ) -> Option<SpeakCommand> {
        let text = match alert_text {
            Some(text) if enabled => text,
            _ => return None,
        };

        self.expire(now);

        if self.last_spoken_text.as_deref() == Some(text) {
            tracing::trace!(alert = text, "Suppressing repeated alert");
            return None;
        }

        self.last_spoken_text = Some(text.to_string());
        self.suppressed_until = Some(now + self.cooldown);

        Some(SpeakCommand {
            text: text.to_string(),
            rate: self.rate,
        })
    }

    /// Text of the most recent announcement still inside its cool-down, as of
    /// the last call to [`consider`](Self::consider).
    pub fn last_spoken_text(&self) -> Option<&str> {
        self.last_spoken_text.as_deref()
    }

    pub fn suppressed_until(&self) -> Option<Instant> {
        self.suppressed_until
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    fn expire(&mut self, now: Instant) {
        if matches!(self.suppressed_until, Some(until) if now >= until) {
            self.last_spoken_text = None;
            self.suppressed_until = None;
        }
    }
}

impl Default for AlertNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN, DEFAULT_SPEECH_RATE)
    }
}
