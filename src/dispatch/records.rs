//! Notes, tasks and reminders.

use chrono::NaiveDateTime;

use super::{HandlerContext, Reply};
use crate::error::{OrionError, Result};
use crate::intent::Command;
use crate::store::document::parse_local_time;
use crate::store::{CREATED_AT_FORMAT, MINUTE_FORMAT, Note, Reminder, Task, TaskCompletion};

const NOTE_TITLE_CHARS: usize = 40;

/// `"Your notes:"` followed by one `<id>. (<created_at>) <content>` line each.
#[must_use]
pub fn format_notes(notes: &[Note]) -> String {
    if notes.is_empty() {
        return "You have no notes yet.".to_owned();
    }
    let mut lines = vec!["Your notes:".to_owned()];
    lines.extend(
        notes
            .iter()
            .map(|n| format!("{}. ({}) {}", n.id, n.created_at, n.content)),
    );
    lines.join("\n")
}

/// `"Your tasks:"` followed by `<id>. [done|pending] <description>` lines,
/// with the due time and an overdue marker when relevant.
#[must_use]
pub fn format_tasks(tasks: &[Task], now: NaiveDateTime) -> String {
    if tasks.is_empty() {
        return "You have no tasks yet.".to_owned();
    }
    let mut lines = vec!["Your tasks:".to_owned()];
    for task in tasks {
        let status = if task.done { "done" } else { "pending" };
        let mut line = format!("{}. [{status}] {}", task.id, task.description);
        if let Some(due) = task.due.as_deref().filter(|d| !d.trim().is_empty()) {
            line.push_str(&format!(" (due: {due}"));
            if task.is_overdue(now) {
                line.push_str(" - OVERDUE");
            }
            line.push(')');
        }
        lines.push(line);
    }
    lines.join("\n")
}

/// `"Your reminders:"` followed by `<id>. [PENDING|DONE] <time> -> <text>` lines.
#[must_use]
pub fn format_reminders(reminders: &[Reminder]) -> String {
    if reminders.is_empty() {
        return "You have no reminders.".to_owned();
    }
    let mut lines = vec!["Your reminders:".to_owned()];
    lines.extend(reminders.iter().map(|r| {
        let status = if r.triggered { "DONE" } else { "PENDING" };
        let time = r.time.as_deref().unwrap_or("(no time)");
        format!("{}. [{status}] {time} -> {}", r.id, r.text)
    }));
    lines.join("\n")
}

/// Normalise a model-supplied time to `YYYY-MM-DD HH:MM`.
///
/// Absent or blank values mean "no time"; anything else must parse as an
/// absolute local timestamp.
fn normalize_time(name: &str, raw: Option<String>) -> Result<Option<String>> {
    let Some(raw) = raw.filter(|t| !t.trim().is_empty()) else {
        return Ok(None);
    };
    let at = parse_local_time(&raw).ok_or_else(|| {
        OrionError::InvalidArgument(format!(
            "'{name}' must be a YYYY-MM-DD HH:MM time, got '{raw}'"
        ))
    })?;
    Ok(Some(at.format(MINUTE_FORMAT).to_string()))
}

pub(super) fn add_note(ctx: &HandlerContext, cmd: &Command) -> Result<Reply> {
    let content = cmd.require_str("content")?;
    let created_at = ctx.now().format(CREATED_AT_FORMAT).to_string();
    ctx.store
        .mutate(|doc| Ok(doc.add_note(content.clone(), created_at)))?;

    let title: String = content
        .lines()
        .next()
        .unwrap_or_default()
        .chars()
        .take(NOTE_TITLE_CHARS)
        .collect();
    let title = if title.trim().is_empty() {
        "Note".to_owned()
    } else {
        title.trim().to_owned()
    };
    match ctx.actions.create_note(&title, &content) {
        Ok(mirrored) => Ok(Reply::Confirm(format!("Note saved. {mirrored}"))),
        Err(e) => Ok(Reply::Final(format!(
            "Note saved. (Couldn't update Notes: {})",
            e.detail()
        ))),
    }
}

pub(super) fn list_notes(ctx: &HandlerContext, _cmd: &Command) -> Result<Reply> {
    Ok(Reply::Final(format_notes(&ctx.store.load()?.notes)))
}

pub(super) fn add_task(ctx: &HandlerContext, cmd: &Command) -> Result<Reply> {
    let description = cmd.require_str("description")?;
    let due = normalize_time("due", cmd.str_arg("due"))?;
    let created_at = ctx.now().format(CREATED_AT_FORMAT).to_string();
    let id = ctx
        .store
        .mutate(|doc| Ok(doc.add_task(description, due, created_at)))?;
    Ok(Reply::Confirm(format!("Task #{id} added.")))
}

pub(super) fn list_tasks(ctx: &HandlerContext, _cmd: &Command) -> Result<Reply> {
    let doc = ctx.store.load()?;
    Ok(Reply::Final(format_tasks(&doc.tasks, ctx.now().naive_local())))
}

pub(super) fn complete_task(ctx: &HandlerContext, cmd: &Command) -> Result<Reply> {
    let id = cmd.require_int("id")?;
    let Ok(id) = u64::try_from(id) else {
        return Ok(Reply::Final("I couldn't find a task with that ID.".to_owned()));
    };
    let outcome = ctx.store.mutate(|doc| Ok(doc.complete_task(id)))?;
    Ok(match outcome {
        TaskCompletion::Completed => Reply::Confirm(format!("Task #{id} marked as done.")),
        TaskCompletion::AlreadyDone => Reply::Final("That task is already complete.".to_owned()),
        TaskCompletion::NotFound => {
            Reply::Final("I couldn't find a task with that ID.".to_owned())
        }
    })
}

pub(super) fn add_reminder(ctx: &HandlerContext, cmd: &Command) -> Result<Reply> {
    let text = cmd.require_str("text")?;
    let time = normalize_time("time", cmd.str_arg("time"))?;
    let at = time.as_deref().and_then(parse_local_time);
    let id = ctx
        .store
        .mutate(|doc| Ok(doc.add_reminder(text.clone(), time.clone())))?;

    match ctx.actions.create_reminder(&text, at) {
        Ok(_) => Ok(Reply::Confirm(match &time {
            Some(time) => format!("Reminder #{id} set for {time}."),
            None => format!("Reminder #{id} saved."),
        })),
        Err(e) => Ok(Reply::Final(format!(
            "Reminder saved. (Couldn't update Reminders: {})",
            e.detail()
        ))),
    }
}

pub(super) fn list_reminders(ctx: &HandlerContext, _cmd: &Command) -> Result<Reply> {
    Ok(Reply::Final(format_reminders(&ctx.store.load()?.reminders)))
}
