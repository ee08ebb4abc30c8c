//! Fire-and-forget speech and notification output.
//!
//! Callers hold a cloneable [`OutputHandle`] and push [`OutputMessage`]s onto
//! an unbounded channel; they never block and never see an error. A single
//! [`OutputWorker`] drains the channel in order, suppresses repeated
//! utterances inside the dedupe window, and hands the rest to the platform
//! [`Speaker`] / [`Notifier`].

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::SpeechConfig;
use crate::error::{OrionError, Result};

/// Work for the output worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMessage {
    Speak(String),
    Notify { title: String, message: String },
}

/// Non-blocking sender side of the output channel.
#[derive(Debug, Clone)]
pub struct OutputHandle {
    tx: mpsc::UnboundedSender<OutputMessage>,
}

impl OutputHandle {
    /// A handle and the receiver its messages arrive on.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutputMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue `text` to be spoken. Dropped silently if the worker is gone.
    pub fn speak(&self, text: impl Into<String>) {
        let text = text.into();
        if text.trim().is_empty() {
            return;
        }
        self.send(OutputMessage::Speak(text));
    }

    /// Queue a visual notification.
    pub fn notify(&self, title: impl Into<String>, message: impl Into<String>) {
        self.send(OutputMessage::Notify {
            title: title.into(),
            message: message.into(),
        });
    }

    fn send(&self, message: OutputMessage) {
        if self.tx.send(message).is_err() {
            debug!("output worker stopped; message dropped");
        }
    }
}

/// Suppresses an utterance identical to the previous one within `window`.
#[derive(Debug)]
pub struct Deduper {
    window: Duration,
    last: Option<(String, Instant)>,
}

impl Deduper {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// True if `text` should be spoken at `now`; records it if so.
    pub fn admit(&mut self, text: &str, now: Instant) -> bool {
        if let Some((last, at)) = &self.last
            && last == text
            && now.saturating_duration_since(*at) < self.window
        {
            return false;
        }
        self.last = Some((text.to_owned(), now));
        true
    }
}

/// Speech synthesis backend.
pub trait Speaker: Send {
    /// Start speaking `text` without waiting for it to finish.
    ///
    /// # Errors
    ///
    /// Returns [`OrionError::Speech`] if synthesis cannot be started.
    fn speak(&mut self, text: &str) -> Result<()>;
}

/// Desktop notification backend.
pub trait Notifier: Send {
    /// # Errors
    ///
    /// Returns an error if the notification cannot be shown.
    fn notify(&mut self, title: &str, message: &str) -> Result<()>;
}

/// macOS `say`, spawned detached.
pub struct SayCommand {
    program: PathBuf,
    voice: String,
    rate: u32,
}

impl SayCommand {
    /// `None` when `say` is not on `PATH`.
    #[must_use]
    pub fn discover(voice: &str, rate: u32) -> Option<Self> {
        let program = which::which("say").ok()?;
        Some(Self {
            program,
            voice: voice.to_owned(),
            rate,
        })
    }
}

impl Speaker for SayCommand {
    fn speak(&mut self, text: &str) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(["-v", &self.voice, "-r", &self.rate.to_string(), text])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| OrionError::Speech(format!("failed to start say: {e}")))?;
        // Reap off-thread so the worker never waits on playback.
        std::thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }
}

/// Logs utterances instead of speaking them.
pub struct LogSpeaker;

impl Speaker for LogSpeaker {
    fn speak(&mut self, text: &str) -> Result<()> {
        info!("(speech) {text}");
        Ok(())
    }
}

/// `osascript -e 'display notification ...'`.
pub struct OsascriptNotifier;

impl Notifier for OsascriptNotifier {
    fn notify(&mut self, title: &str, message: &str) -> Result<()> {
        let script = crate::actions::applescript::display_notification(title, message);
        crate::actions::applescript::run_osascript(&script).map(|_| ())
    }
}

/// Logs notifications.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, title: &str, message: &str) -> Result<()> {
        info!("[{title}] {message}");
        Ok(())
    }
}

/// Drains the output channel on a dedicated thread.
pub struct OutputWorker {
    rx: mpsc::UnboundedReceiver<OutputMessage>,
    speaker: Box<dyn Speaker>,
    notifier: Box<dyn Notifier>,
    deduper: Deduper,
}

impl OutputWorker {
    #[must_use]
    pub fn new(
        rx: mpsc::UnboundedReceiver<OutputMessage>,
        speaker: Box<dyn Speaker>,
        notifier: Box<dyn Notifier>,
        dedupe_window: Duration,
    ) -> Self {
        Self {
            rx,
            speaker,
            notifier,
            deduper: Deduper::new(dedupe_window),
        }
    }

    /// Handle one message. Backend failures are logged and swallowed.
    pub fn handle(&mut self, message: OutputMessage, now: Instant) {
        match message {
            OutputMessage::Speak(text) => {
                if !self.deduper.admit(&text, now) {
                    debug!("suppressed repeated utterance");
                    return;
                }
                if let Err(e) = self.speaker.speak(&text) {
                    warn!("speech output failed: {e}");
                }
            }
            OutputMessage::Notify { title, message } => {
                if let Err(e) = self.notifier.notify(&title, &message) {
                    warn!("notification failed: {e}");
                }
            }
        }
    }

    /// Run until every [`OutputHandle`] is dropped.
    pub fn spawn(mut self) -> tokio::task::JoinHandle<()> {
        tokio::task::spawn_blocking(move || {
            while let Some(message) = self.rx.blocking_recv() {
                self.handle(message, Instant::now());
            }
            debug!("output worker finished");
        })
    }
}

/// Build the output pipeline for this platform and config.
#[must_use]
pub fn create_output(config: &SpeechConfig) -> (OutputHandle, OutputWorker) {
    let (handle, rx) = OutputHandle::channel();

    let speaker: Box<dyn Speaker> = match config
        .enabled
        .then(|| SayCommand::discover(&config.voice, config.rate))
        .flatten()
    {
        Some(say) => Box::new(say),
        None => {
            if config.enabled {
                info!("`say` not found; speech goes to the log");
            }
            Box::new(LogSpeaker)
        }
    };

    let notifier: Box<dyn Notifier> =
        if config.notifications && cfg!(target_os = "macos") && which::which("osascript").is_ok() {
            Box::new(OsascriptNotifier)
        } else {
            Box::new(LogNotifier)
        };

    let worker = OutputWorker::new(
        rx,
        speaker,
        notifier,
        Duration::from_millis(config.dedupe_window_ms),
    );
    (handle, worker)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<String>>>);

    impl Speaker for Captured {
        fn speak(&mut self, text: &str) -> Result<()> {
            self.0.lock().unwrap().push(format!("say {text}"));
            Ok(())
        }
    }

    impl Notifier for Captured {
        fn notify(&mut self, title: &str, message: &str) -> Result<()> {
            self.0.lock().unwrap().push(format!("notify {title}: {message}"));
            Ok(())
        }
    }

    struct Broken;

    impl Speaker for Broken {
        fn speak(&mut self, _text: &str) -> Result<()> {
            Err(OrionError::Speech("no audio device".into()))
        }
    }

    #[test]
    fn deduper_suppresses_repeats_inside_the_window() {
        let mut d = Deduper::new(Duration::from_secs(1));
        let t0 = Instant::now();
        assert!(d.admit("hello", t0));
        assert!(!d.admit("hello", t0 + Duration::from_millis(500)));
        assert!(d.admit("goodbye", t0 + Duration::from_millis(600)));
        assert!(d.admit("hello", t0 + Duration::from_millis(700)));
        assert!(d.admit("hello", t0 + Duration::from_millis(1800)));
    }

    #[test]
    fn speaker_failures_are_swallowed() {
        let (_handle, rx) = OutputHandle::channel();
        let mut worker = OutputWorker::new(
            rx,
            Box::new(Broken),
            Box::new(LogNotifier),
            Duration::from_secs(1),
        );
        worker.handle(OutputMessage::Speak("hi".into()), Instant::now());
    }

    #[test]
    fn speak_after_worker_is_gone_does_not_panic() {
        let (handle, rx) = OutputHandle::channel();
        drop(rx);
        handle.speak("anyone there?");
        handle.notify("Orion", "still fine");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn worker_drains_in_order_and_dedupes() {
        let captured = Captured::default();
        let (handle, rx) = OutputHandle::channel();
        let worker = OutputWorker::new(
            rx,
            Box::new(captured.clone()),
            Box::new(captured.clone()),
            Duration::from_secs(1),
        );
        let join = worker.spawn();

        handle.speak("Reminder: stretch");
        handle.notify("Orion Reminder", "stretch");
        handle.speak("Reminder: stretch");
        handle.speak("   ");
        drop(handle);
        join.await.unwrap();

        assert_eq!(
            captured.0.lock().unwrap().clone(),
            vec!["say Reminder: stretch", "notify Orion Reminder: stretch"]
        );
    }
}
