// Messages flowing from the frame and transcription units back to the
// coordinator, and the sink the coordinator relays them to.

use std::fmt;
use std::sync::mpsc::Sender;

/// Which sub-pipeline produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Frames,
    Transcription,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frames => write!(f, "Frames"),
            Self::Transcription => write!(f, "Transcription"),
        }
    }
}

/// Sent by a unit over its own channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressMessage {
    /// Completed fraction of the current stage, in `0.0..=1.0`.
    Progress(f32),
    Status(String),
    Error(String),
}

/// Send half of a unit's channel. Sending never fails the unit: if the
/// coordinator is gone there is nobody left to tell.
#[derive(Debug, Clone)]
pub struct Reporter {
    sender: Sender<ProgressMessage>,
}

impl Reporter {
    pub fn new(sender: Sender<ProgressMessage>) -> Self {
        Self { sender }
    }

    pub fn progress(&self, done: usize, total: usize) {
        let fraction = if total == 0 {
            1.0
        } else {
            done as f32 / total as f32
        };
        let _ = self.sender.send(ProgressMessage::Progress(fraction));
    }

    pub fn status(&self, message: impl Into<String>) {
        let _ = self.sender.send(ProgressMessage::Status(message.into()));
    }

    pub fn error(&self, message: impl Into<String>) {
        let _ = self.sender.send(ProgressMessage::Error(message.into()));
    }
}

/// Receives everything the coordinator relays for one batch.
pub trait ProgressSink {
    fn file_started(&mut self, _path: &std::path::Path) {}
    fn message(&mut self, unit: Unit, message: &ProgressMessage);
}

/// Renders relayed messages as log lines.
#[derive(Debug, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn file_started(&mut self, path: &std::path::Path) {
        tracing::info!("Current file: {}", path.display());
    }

    fn message(&mut self, unit: Unit, message: &ProgressMessage) {
        match message {
            ProgressMessage::Progress(fraction) => {
                tracing::debug!("{}: {:.0}%", unit, fraction * 100.0)
            }
            ProgressMessage::Status(text) => tracing::info!("{}: {}", unit, text),
            ProgressMessage::Error(text) => tracing::error!("{}: {}", unit, text),
        }
    }
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
