//! Speech-output collaborators.

use super::SpeakCommand;
use crate::config::AlertConfig;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Baseline words per minute that a rate of 1.0 maps to for `{wpm}`.
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// Fire-and-forget sink for spoken alerts.
pub trait SpeechOutput: Send + Sync {
    fn speak(&self, command: SpeakCommand);
}

/// Emits each alert as a tracing event.
#[derive(Debug, Default, Clone)]
pub struct LogSpeech;

impl SpeechOutput for LogSpeech {
    fn speak(&self, command: SpeakCommand) {
        tracing::info!(text = %command.text, rate = command.rate, "Speaking alert");
    }
}

/// Forwards commands over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSpeech {
    tx: mpsc::UnboundedSender<SpeakCommand>,
}

impl ChannelSpeech {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SpeakCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SpeechOutput for ChannelSpeech {
    fn speak(&self, command: SpeakCommand) {
        if self.tx.send(command).is_err() {
            tracing::debug!("Speech receiver dropped, discarding alert");
        }
    }
}

/// Runs an external text-to-speech program per alert (e.g. `espeak`).
///
/// `{rate}` and `{wpm}` in the arguments are replaced with the command's rate
/// and the equivalent words per minute; the alert text is appended last.
#[derive(Debug, Clone)]
pub struct CommandSpeech {
    program: String,
    args: Vec<String>,
}

impl CommandSpeech {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Arguments for one invocation, text last.
    pub fn render_args(&self, command: &SpeakCommand) -> Vec<String> {
        let wpm = (BASE_WORDS_PER_MINUTE * command.rate).round() as u32;
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{rate}", &command.rate.to_string())
                    .replace("{wpm}", &wpm.to_string())
            })
            .chain(std::iter::once(command.text.clone()))
            .collect()
    }
}

impl SpeechOutput for CommandSpeech {
    fn speak(&self, command: SpeakCommand) {
        let args = self.render_args(&command);
        let program = self.program.clone();

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!(program = %program, "No runtime available, alert not spoken");
                return;
            }
        };

        handle.spawn(async move {
            match tokio::process::Command::new(&program).args(&args).status().await {
                Ok(status) if status.success() => {}
                Ok(status) => {
                    tracing::warn!(program = %program, %status, "Speech command failed")
                }
                Err(e) => {
                    tracing::warn!(program = %program, error = %e, "Failed to run speech command")
                }
            }
        });
    }
}

/// Build the speech collaborator selected by configuration.
pub fn speech_from_config(config: &AlertConfig) -> Arc<dyn SpeechOutput> {
    match config.speech_command.as_deref() {
        Some([program, args @ ..]) => Arc::new(CommandSpeech::new(program.clone(), args.to_vec())),
        _ => Arc::new(LogSpeech),
    }
}
