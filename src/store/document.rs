//! The main notes / tasks / reminders document and its pure operations.

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::MINUTE_FORMAT;

/// A free-text note. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Unique id (0 on load means "not yet assigned").
    #[serde(default)]
    pub id: u64,
    pub content: String,
    #[serde(default)]
    pub created_at: String,
}

/// A to-do item. `done` only ever flips from false to true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: u64,
    pub description: String,
    #[serde(default)]
    pub done: bool,
    /// Optional due time, `YYYY-MM-DD HH:MM` or ISO-8601.
    #[serde(default)]
    pub due: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

/// A timed reminder. `triggered` only ever flips from false to true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    #[serde(default)]
    pub id: u64,
    pub text: String,
    /// Local time at minute precision (`YYYY-MM-DD HH:MM`). `None` is never due.
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub triggered: bool,
}

/// Outcome of [`Document::complete_task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCompletion {
    Completed,
    AlreadyDone,
    NotFound,
}

/// The whole persisted document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
}

impl Document {
    /// Assign ids to records loaded without one. Existing ids are kept.
    pub fn normalize(&mut self) {
        let mut next = next_id(self.notes.iter().map(|n| n.id));
        for note in self.notes.iter_mut().filter(|n| n.id == 0) {
            note.id = next;
            next += 1;
        }
        let mut next = next_id(self.tasks.iter().map(|t| t.id));
        for task in self.tasks.iter_mut().filter(|t| t.id == 0) {
            task.id = next;
            next += 1;
        }
        let mut next = next_id(self.reminders.iter().map(|r| r.id));
        for reminder in self.reminders.iter_mut().filter(|r| r.id == 0) {
            reminder.id = next;
            next += 1;
        }
    }

    /// Append a note and return its id.
    pub fn add_note(&mut self, content: impl Into<String>, created_at: impl Into<String>) -> u64 {
        let id = next_id(self.notes.iter().map(|n| n.id));
        self.notes.push(Note {
            id,
            content: content.into(),
            created_at: created_at.into(),
        });
        id
    }

    /// Append a pending task and return its id.
    pub fn add_task(
        &mut self,
        description: impl Into<String>,
        due: Option<String>,
        created_at: impl Into<String>,
    ) -> u64 {
        let id = next_id(self.tasks.iter().map(|t| t.id));
        self.tasks.push(Task {
            id,
            description: description.into(),
            done: false,
            due,
            created_at: created_at.into(),
        });
        id
    }

    /// Mark a task as done.
    pub fn complete_task(&mut self, id: u64) -> TaskCompletion {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            None => TaskCompletion::NotFound,
            Some(task) if task.done => TaskCompletion::AlreadyDone,
            Some(task) => {
                task.done = true;
                TaskCompletion::Completed
            }
        }
    }

    /// Append an untriggered reminder and return its id.
    pub fn add_reminder(&mut self, text: impl Into<String>, time: Option<String>) -> u64 {
        let id = next_id(self.reminders.iter().map(|r| r.id));
        self.reminders.push(Reminder {
            id,
            text: text.into(),
            time,
            triggered: false,
        });
        id
    }

    /// Flip every untriggered reminder whose time is at or before `now` and
    /// return copies of the flipped reminders.
    ///
    /// A reminder is returned by at most one call, because the flag it is
    /// selected on is set in the same pass.
    pub fn take_due_reminders(&mut self, now: NaiveDateTime) -> Vec<Reminder> {
        let now_str = now.format(MINUTE_FORMAT).to_string();
        let mut due = Vec::new();
        for reminder in &mut self.reminders {
            if reminder.triggered {
                continue;
            }
            let Some(time) = reminder.time.as_deref().filter(|t| !t.trim().is_empty()) else {
                continue;
            };
            let is_due = match parse_local_time(time) {
                Some(at) => at <= now,
                // Unparseable times fall back to string ordering.
                None => time <= now_str.as_str(),
            };
            if is_due {
                reminder.triggered = true;
                due.push(reminder.clone());
            }
        }
        due
    }
}

impl Task {
    /// True when the task is pending and its due time has passed.
    #[must_use]
    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        !self.done
            && self
                .due
                .as_deref()
                .and_then(parse_local_time)
                .is_some_and(|due| due < now)
    }
}

/// Parse the minute-precision and ISO-8601 local timestamp forms the
/// assistant writes and the language model tends to produce.
///
/// Offset-qualified RFC 3339 values are converted to local time.
#[must_use]
pub fn parse_local_time(value: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 5] = [
        MINUTE_FORMAT,
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    let value = value.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|at| at.with_timezone(&Local).naive_local())
        })
}

fn next_id(ids: impl Iterator<Item = u64>) -> u64 {
    ids.max().unwrap_or(0) + 1
}
