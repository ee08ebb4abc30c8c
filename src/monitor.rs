//! Background reminder monitor.
//!
//! Spawns a tokio task that scans the shared store for due reminders,
//! flips them to triggered in one persisted batch, then announces each one
//! through the output worker. Between scans it sleeps in short increments so
//! cancellation is noticed within one increment.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::ReminderConfig;
use crate::error::Result;
use crate::events::{DaemonEvent, EventSink};
use crate::speech::OutputHandle;
use crate::store::{Reminder, SharedStore};

/// Title used for reminder notifications.
pub const NOTIFICATION_TITLE: &str = "Orion Reminder";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Running,
    Stopping,
    Stopped,
}

/// Flip and return every reminder due at the clock's current minute.
///
/// # Errors
///
/// Returns a store error if the flipped batch cannot be persisted; in that
/// case nothing is flipped in memory either.
pub fn collect_due(store: &SharedStore, clock: &Clock) -> Result<Vec<Reminder>> {
    let now = clock().naive_local();
    store.mutate(|doc| Ok(doc.take_due_reminders(now)))
}

/// Spoken and notified text for a due reminder.
#[must_use]
pub fn announcement(reminder: &Reminder) -> String {
    match reminder.time.as_deref() {
        Some(time) => format!("Reminder: {} (set for {time})", reminder.text),
        None => format!("Reminder: {}", reminder.text),
    }
}

/// Announce due reminders on every output the caller has.
pub fn announce(reminders: &[Reminder], output: &OutputHandle, events: &dyn EventSink) {
    for reminder in reminders {
        let text = announcement(reminder);
        info!("{text}");
        output.notify(NOTIFICATION_TITLE, text.clone());
        output.speak(text);
        events.emit(&DaemonEvent::Reminder {
            id: reminder.id,
            text: reminder.text.clone(),
            time: reminder.time.clone(),
        });
    }
}

pub struct ReminderMonitor {
    store: Arc<SharedStore>,
    output: OutputHandle,
    events: Arc<dyn EventSink>,
    clock: Clock,
    cadence: Duration,
    increment: Duration,
}

impl ReminderMonitor {
    pub fn new(
        store: Arc<SharedStore>,
        output: OutputHandle,
        events: Arc<dyn EventSink>,
        clock: Clock,
        config: &ReminderConfig,
    ) -> Self {
        let cadence = Duration::from_secs(config.check_interval_s.max(1));
        let increment = Duration::from_millis(config.poll_increment_ms.max(1)).min(cadence);
        Self {
            store,
            output,
            events,
            clock,
            cadence,
            increment,
        }
    }

    /// One scan. Persistence failures are logged and retried next cycle.
    pub fn tick(&self) -> usize {
        match collect_due(&self.store, &self.clock) {
            Ok(due) => {
                announce(&due, &self.output, self.events.as_ref());
                due.len()
            }
            Err(e) => {
                warn!("reminder check failed: {e}");
                0
            }
        }
    }

    /// Start the loop. It runs until `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> MonitorHandle {
        let (state_tx, state_rx) = watch::channel(MonitorState::Running);
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            info!(
                "reminder monitor started (every {}s)",
                self.cadence.as_secs()
            );
            'outer: loop {
                let fired = self.tick();
                if fired > 0 {
                    debug!("{fired} reminder(s) fired");
                }
                let mut slept = Duration::ZERO;
                while slept < self.cadence {
                    if token.is_cancelled() {
                        break 'outer;
                    }
                    let step = self.increment.min(self.cadence - slept);
                    tokio::time::sleep(step).await;
                    slept += step;
                }
                if token.is_cancelled() {
                    break;
                }
            }
            let _ = state_tx.send(MonitorState::Stopping);
            info!("reminder monitor stopped");
            let _ = state_tx.send(MonitorState::Stopped);
        });
        MonitorHandle {
            cancel,
            state: state_rx,
            task,
        }
    }
}

/// Control handle for a running [`ReminderMonitor`].
pub struct MonitorHandle {
    cancel: CancellationToken,
    state: watch::Receiver<MonitorState>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Request a stop. The loop exits within one sleep increment.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn state(&self) -> MonitorState {
        let current = *self.state.borrow();
        if current == MonitorState::Running && self.cancel.is_cancelled() {
            MonitorState::Stopping
        } else {
            current
        }
    }

    /// A receiver that observes state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<MonitorState> {
        self.state.clone()
    }

    /// Stop and wait for the loop to finish its current cycle.
    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.task.await {
            warn!("reminder monitor task failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::clock::fixed_clock;
    use crate::events::JsonLineSink;
    use crate::speech::OutputMessage;
    use crate::store::Document;
    use chrono::{Local, NaiveDateTime, TimeZone};

    fn at(value: &str) -> chrono::DateTime<Local> {
        let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M").unwrap();
        Local.from_local_datetime(&naive).earliest().unwrap()
    }

    fn store_with(reminders: &[(&str, Option<&str>)]) -> Arc<SharedStore> {
        let mut doc = Document::default();
        for (text, time) in reminders {
            doc.add_reminder(*text, time.map(str::to_owned));
        }
        Arc::new(SharedStore::with_document(doc))
    }

    #[test]
    fn due_reminder_fires_exactly_once() {
        let store = store_with(&[("call mum", Some("2024-01-01 09:00"))]);
        let clock = fixed_clock(at("2024-01-01 09:00"));

        let due = collect_due(&store, &clock).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, 1);
        assert!(store.load().unwrap().reminders[0].triggered);

        assert!(collect_due(&store, &clock).unwrap().is_empty());
    }

    #[test]
    fn future_and_untimed_reminders_stay_pending() {
        let store = store_with(&[
            ("later", Some("2024-01-01 10:00")),
            ("whenever", None),
            ("earlier", Some("2023-12-31 23:59")),
        ]);
        let due = collect_due(&store, &fixed_clock(at("2024-01-01 09:00"))).unwrap();
        let texts: Vec<_> = due.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["earlier"]);
    }

    #[test]
    fn persists_only_when_something_fired() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orion.json");
        let store = SharedStore::open(&path).unwrap();
        store
            .mutate(|doc| Ok(doc.add_reminder("stretch", Some("2024-01-01 10:00".into()))))
            .unwrap();
        let before = std::fs::metadata(&path).unwrap().modified().unwrap();

        std::thread::sleep(Duration::from_millis(20));
        collect_due(&store, &fixed_clock(at("2024-01-01 09:00"))).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), before);

        collect_due(&store, &fixed_clock(at("2024-01-01 10:00"))).unwrap();
        let on_disk: Document =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(on_disk.reminders[0].triggered);
    }

    #[test]
    fn announcement_includes_the_time() {
        let store = store_with(&[("call mum", Some("2024-01-01 09:00"))]);
        let due = collect_due(&store, &fixed_clock(at("2024-01-01 09:30"))).unwrap();
        assert_eq!(
            announcement(&due[0]),
            "Reminder: call mum (set for 2024-01-01 09:00)"
        );
    }

    #[tokio::test]
    async fn monitor_announces_and_stops_promptly() {
        let store = store_with(&[("call mum", Some("2024-01-01 09:00"))]);
        let (output, mut rx) = OutputHandle::channel();
        let sink = Arc::new(JsonLineSink::new(Vec::new()));
        let config = ReminderConfig {
            check_interval_s: 30,
            poll_increment_ms: 10,
        };
        let monitor = ReminderMonitor::new(
            Arc::clone(&store),
            output,
            sink.clone(),
            fixed_clock(at("2024-01-01 09:05")),
            &config,
        );

        let handle = monitor.spawn(CancellationToken::new());
        assert_eq!(
            rx.recv().await,
            Some(OutputMessage::Notify {
                title: NOTIFICATION_TITLE.into(),
                message: "Reminder: call mum (set for 2024-01-01 09:00)".into(),
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(OutputMessage::Speak(
                "Reminder: call mum (set for 2024-01-01 09:00)".into()
            ))
        );
        assert_eq!(handle.state(), MonitorState::Running);

        let mut states = handle.subscribe();
        tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
            .await
            .expect("monitor should stop within a few increments");
        assert_eq!(*states.borrow_and_update(), MonitorState::Stopped);
        assert!(store.load().unwrap().reminders[0].triggered);
    }

    #[tokio::test]
    async fn stop_is_reflected_in_state() {
        let store = store_with(&[]);
        let (output, _rx) = OutputHandle::channel();
        let config = ReminderConfig {
            check_interval_s: 30,
            poll_increment_ms: 10,
        };
        let monitor = ReminderMonitor::new(
            store,
            output,
            Arc::new(crate::events::NullSink),
            fixed_clock(at("2024-01-01 09:05")),
            &config,
        );
        let cancel = CancellationToken::new();
        let handle = monitor.spawn(cancel.clone());
        cancel.cancel();
        assert_ne!(handle.state(), MonitorState::Running);
        let mut states = handle.subscribe();
        tokio::time::timeout(Duration::from_secs(2), states.wait_for(|s| *s == MonitorState::Stopped))
            .await
            .unwrap()
            .unwrap();
    }
}
