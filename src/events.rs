//! Daemon events, written to stdout as one JSON object per line.

use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenState {
    Listening,
    Idle,
    Processing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DaemonEvent {
    Daemon {
        state: String,
    },
    Status {
        state: ListenState,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    Transcript {
        text: String,
    },
    Ignore {
        reason: String,
    },
    Reply {
        text: String,
    },
    Reminder {
        id: u64,
        text: String,
        time: Option<String>,
    },
}

impl DaemonEvent {
    #[must_use]
    pub fn started() -> Self {
        Self::Daemon {
            state: "started".to_owned(),
        }
    }

    #[must_use]
    pub fn status(state: ListenState) -> Self {
        Self::Status { state, text: None }
    }

    #[must_use]
    pub fn no_wake_word() -> Self {
        Self::Ignore {
            reason: "no_wake_word".to_owned(),
        }
    }
}

/// Receives daemon events. Emission never fails the caller.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &DaemonEvent);
}

/// Discards everything.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &DaemonEvent) {}
}

/// Serializes each event as a single line, flushing after every write.
pub struct JsonLineSink<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLineSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl JsonLineSink<std::io::Stdout> {
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> EventSink for JsonLineSink<W> {
    fn emit(&self, event: &DaemonEvent) {
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                warn!("failed to encode event: {e}");
                return;
            }
        };
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            warn!("failed to write event: {e}");
        }
    }
}
