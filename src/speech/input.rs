//! Speech input collaborators.
//!
//! Each `listen` call yields at most one recognized utterance. Timeouts,
//! empty recognitions and recognizer failures all come back as `None` and
//! are only logged.

use std::io::{BufRead, BufReader, Stdin};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

/// One-utterance-at-a-time speech source.
pub trait SpeechInput: Send {
    /// Block until an utterance is recognized or the attempt gives up.
    fn listen(&mut self) -> Option<String>;

    /// True once the source can never produce another utterance.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Reads one line per utterance. End of input closes the source.
pub struct LineInput<R> {
    reader: R,
    closed: bool,
}

impl<R: BufRead> LineInput<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            closed: false,
        }
    }
}

impl LineInput<BufReader<Stdin>> {
    #[must_use]
    pub fn stdin() -> Self {
        Self::new(BufReader::new(std::io::stdin()))
    }
}

impl<R: BufRead + Send> SpeechInput for LineInput<R> {
    fn listen(&mut self) -> Option<String> {
        if self.closed {
            return None;
        }
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => {
                self.closed = true;
                None
            }
            Ok(_) => non_empty(&line),
            Err(e) => {
                warn!("failed to read utterance: {e}");
                None
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Runs an external recognizer through the shell; its stdout is the utterance.
pub struct CommandInput {
    command: String,
}

impl CommandInput {
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl SpeechInput for CommandInput {
    fn listen(&mut self) -> Option<String> {
        let output = shell(&self.command)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();
        match output {
            Ok(out) if out.status.success() => non_empty(&String::from_utf8_lossy(&out.stdout)),
            Ok(out) => {
                debug!("recognizer exited with {}", out.status);
                None
            }
            Err(e) => {
                warn!("failed to run recognizer '{}': {e}", self.command);
                None
            }
        }
    }
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", command]);
    cmd
}

#[cfg(not(unix))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", command]);
    cmd
}

fn non_empty(raw: &str) -> Option<String> {
    let text = raw.trim();
    (!text.is_empty()).then(|| text.to_owned())
}

/// The recognizer command when configured, stdin lines otherwise.
#[must_use]
pub fn create_input(recognizer_command: Option<&str>) -> Box<dyn SpeechInput> {
    match recognizer_command.map(str::trim).filter(|c| !c.is_empty()) {
        Some(command) => Box::new(CommandInput::new(command)),
        None => Box::new(LineInput::stdin()),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use std::io::Cursor;

    #[test]
    fn line_input_yields_trimmed_utterances_then_closes() {
        let mut input = LineInput::new(Cursor::new("hey orion\n\n  open spotify  \n"));
        assert_eq!(input.listen().as_deref(), Some("hey orion"));
        assert_eq!(input.listen(), None);
        assert!(!input.is_closed());
        assert_eq!(input.listen().as_deref(), Some("open spotify"));
        assert_eq!(input.listen(), None);
        assert!(input.is_closed());
    }

    #[cfg(unix)]
    #[test]
    fn command_input_reads_stdout() {
        let mut input = CommandInput::new("echo '  what time is it '");
        assert_eq!(input.listen().as_deref(), Some("what time is it"));
    }

    #[cfg(unix)]
    #[test]
    fn failing_recognizer_is_no_utterance() {
        assert_eq!(CommandInput::new("exit 3").listen(), None);
        assert_eq!(CommandInput::new("true").listen(), None);
    }
}
