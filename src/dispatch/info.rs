//! Weather, time and local-file handlers.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::{HandlerContext, Reply};
use crate::error::Result;
use crate::intent::Command;
use crate::prompt::{SUMMARY_SYSTEM_PROMPT, summary_user_prompt};
use crate::resolver::timezone_for_place;
use crate::store::PreferenceKey;

/// Upper bound on `find_file` results.
pub const MAX_FIND_RESULTS: usize = 50;

const SUMMARY_MAX_CHARS: usize = 8000;

const READABLE_EXTENSIONS: &[&str] = &["txt", "md", "py", "rs", "json", "log", "csv", "toml"];

pub(super) fn get_weather(ctx: &HandlerContext, cmd: &Command) -> Result<Reply> {
    let query = match cmd.str_arg("location") {
        Some(location) => location,
        None => ctx
            .memory
            .get_pref(PreferenceKey::HomeCity)?
            .unwrap_or_else(|| "auto:ip".to_owned()),
    };
    ctx.lookup.weather(&query).map(Reply::Final)
}

pub(super) fn get_time(ctx: &HandlerContext, cmd: &Command) -> Result<Reply> {
    let now = ctx.now();
    let Some(location) = cmd.str_arg("location") else {
        return Ok(Reply::Final(
            now.format("It's %H:%M on %A, %d %B %Y.").to_string(),
        ));
    };
    if let Some(tz) = timezone_for_place(&location) {
        return Ok(Reply::Final(format!(
            "In {location} it's {}.",
            now.with_timezone(&tz).format("%H:%M on %A, %d %B %Y")
        )));
    }
    ctx.lookup.time_in(&location).map(Reply::Final)
}

/// The resolver already answered; fall back to local time if it did not.
pub(super) fn tell_time(ctx: &HandlerContext, cmd: &Command) -> Result<Reply> {
    Ok(Reply::Final(match cmd.suggested_reply() {
        Some(reply) => reply.to_owned(),
        None => ctx.now().format("It is %I:%M %p right now.").to_string(),
    }))
}

fn expand_home(raw: &str) -> PathBuf {
    let raw = raw.trim();
    match raw.strip_prefix('~') {
        Some(rest) => {
            let rest = rest.trim_start_matches(['/', '\\']);
            crate::orion_dirs::home_dir().join(rest)
        }
        None => PathBuf::from(raw),
    }
}

/// Files under `root` whose names contain `keyword` (case-insensitive).
///
/// Returns at most `limit` paths plus whether more were skipped.
pub(crate) fn find_files(root: &Path, keyword: &str, limit: usize) -> (Vec<PathBuf>, bool) {
    let keyword = keyword.to_lowercase();
    let mut found = Vec::new();
    let matches = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .to_lowercase()
                .contains(&keyword)
        });
    for entry in matches {
        if found.len() == limit {
            return (found, true);
        }
        found.push(entry.into_path());
    }
    (found, false)
}

pub(super) fn find_file(ctx: &HandlerContext, cmd: &Command) -> Result<Reply> {
    let keyword = cmd.require_str("keyword")?;
    let root = cmd
        .str_arg("start_path")
        .map_or_else(|| ctx.search_root.clone(), |p| expand_home(&p));
    if !root.exists() {
        return Ok(Reply::Final("Start path does not exist.".to_owned()));
    }

    debug!("searching {} for '{keyword}'", root.display());
    let (found, truncated) = find_files(&root, &keyword, MAX_FIND_RESULTS);
    if found.is_empty() {
        return Ok(Reply::Final(format!(
            "No files found containing '{keyword}'."
        )));
    }
    let mut lines = vec!["Matching files:".to_owned()];
    lines.extend(found.iter().map(|p| p.display().to_string()));
    if truncated {
        lines.push(format!("(showing the first {MAX_FIND_RESULTS})"));
    }
    Ok(Reply::Final(lines.join("\n")))
}

fn read_for_summary(path: &Path) -> std::result::Result<String, String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !READABLE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(format!("I don't know how to read '.{ext}' files yet."));
    }
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => format!("I couldn't find a file at: {}", path.display()),
        _ => e.to_string(),
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub(super) fn summarize_file(ctx: &HandlerContext, cmd: &Command) -> Result<Reply> {
    let path = expand_home(&cmd.require_str("path")?);
    let question = cmd.str_arg("question");

    let text = match read_for_summary(&path) {
        Ok(text) => text,
        Err(e) => return Ok(Reply::Final(format!("I couldn't read that file: {e}"))),
    };
    if text.trim().is_empty() {
        return Ok(Reply::Final(
            "The file seems to be empty or I couldn't extract any text.".to_owned(),
        ));
    }

    let excerpt: String = text.chars().take(SUMMARY_MAX_CHARS).collect();
    let prompt = summary_user_prompt(&excerpt, question.as_deref());
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(Reply::Final(
        match ctx.summarizer.complete(SUMMARY_SYSTEM_PROMPT, &prompt) {
            Ok(summary) => format!("Summary of {name}:\n\n{summary}"),
            Err(e) => format!("I couldn't generate a summary right now: {}", e.detail()),
        },
    ))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::super::test_support::*;
    use super::*;
    use crate::intent::Intent;

    #[test]
    fn weather_falls_back_to_home_city_then_ip() {
        let f = fixture();
        f.dispatcher.dispatch(&Command::new(Intent::GetWeather));
        f.dispatcher
            .context()
            .memory
            .set_pref(PreferenceKey::HomeCity, "Brixton")
            .unwrap();
        f.dispatcher.dispatch(&Command::new(Intent::GetWeather));
        f.dispatcher
            .dispatch(&Command::new(Intent::GetWeather).with_arg("location", "Oslo"));

        assert_eq!(
            f.lookup.queries.lock().unwrap().clone(),
            vec!["weather auto:ip", "weather Brixton", "weather Oslo"]
        );
    }

    #[test]
    fn get_time_uses_table_before_lookup() {
        let f = fixture();
        let reply = f
            .dispatcher
            .dispatch(&Command::new(Intent::GetTime).with_arg("location", "Tokyo"));
        assert!(reply.starts_with("In Tokyo it's "), "{reply}");
        assert!(f.lookup.queries.lock().unwrap().is_empty());

        let reply = f
            .dispatcher
            .dispatch(&Command::new(Intent::GetTime).with_arg("location", "Lima"));
        assert_eq!(reply, "In Lima it's noon.");
    }

    #[test]
    fn local_time_without_location() {
        let f = fixture();
        let reply = f.dispatcher.dispatch(&Command::new(Intent::GetTime));
        assert_eq!(reply, "It's 12:00 on Monday, 01 January 2024.");
    }

    #[test]
    fn tell_time_repeats_the_resolver_reply() {
        let f = fixture();
        let cmd = Command::new(Intent::TellTime).with_reply("The time in japan is 09:00 PM.");
        assert_eq!(f.dispatcher.dispatch(&cmd), "The time in japan is 09:00 PM.");
        assert_eq!(
            f.dispatcher.dispatch(&Command::new(Intent::TellTime)),
            "It is 12:00 PM right now."
        );
    }

    #[test]
    fn find_file_matches_case_insensitively_and_caps_results() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("Budget.xlsx"), "").unwrap();
        std::fs::write(dir.path().join("nested").join("budget-2024.csv"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        for i in 0..(MAX_FIND_RESULTS + 5) {
            std::fs::write(dir.path().join(format!("log{i}.txt")), "").unwrap();
        }

        let (found, truncated) = find_files(dir.path(), "BUDGET", MAX_FIND_RESULTS);
        assert_eq!(found.len(), 2);
        assert!(!truncated);

        let (found, truncated) = find_files(dir.path(), "log", MAX_FIND_RESULTS);
        assert_eq!(found.len(), MAX_FIND_RESULTS);
        assert!(truncated);

        let f = fixture();
        let reply = f.dispatcher.dispatch(
            &Command::new(Intent::FindFile)
                .with_arg("keyword", "zebra")
                .with_arg("start_path", dir.path().to_string_lossy().into_owned()),
        );
        assert_eq!(reply, "No files found containing 'zebra'.");
    }

    #[test]
    fn summarize_file_reads_and_asks_the_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.md");
        std::fs::write(&path, "x".repeat(SUMMARY_MAX_CHARS + 500)).unwrap();

        let f = fixture();
        let reply = f.dispatcher.dispatch(
            &Command::new(Intent::SummarizeFile).with_arg("path", path.to_string_lossy().into_owned()),
        );
        assert!(reply.starts_with("Summary of plan.md:\n\nsummary of "), "{reply}");
    }

    #[test]
    fn summarize_file_reports_unreadable_files() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture();

        let missing = dir.path().join("absent.txt");
        let reply = f.dispatcher.dispatch(
            &Command::new(Intent::SummarizeFile)
                .with_arg("path", missing.to_string_lossy().into_owned()),
        );
        assert!(reply.starts_with("I couldn't read that file: I couldn't find a file at:"));

        let binary = dir.path().join("photo.png");
        std::fs::write(&binary, [0u8, 1, 2]).unwrap();
        let reply = f.dispatcher.dispatch(
            &Command::new(Intent::SummarizeFile)
                .with_arg("path", binary.to_string_lossy().into_owned()),
        );
        assert_eq!(
            reply,
            "I couldn't read that file: I don't know how to read '.png' files yet."
        );
    }
}
