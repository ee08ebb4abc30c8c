//! AppleScript builders and the `osascript` runner.
//!
//! Script text is built by pure functions so it can be checked on any
//! platform; only [`run_osascript`] needs a Mac.

use std::process::Command;

use chrono::NaiveDateTime;

use super::Player;
use crate::error::{OrionError, Result};

/// Escape a value for use inside an AppleScript string literal.
#[must_use]
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\r' | '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

/// AppleScript `date "..."` literal for a local timestamp.
#[must_use]
pub fn date_literal(at: NaiveDateTime) -> String {
    at.format("%d %B %Y %H:%M").to_string()
}

pub fn create_note(title: &str, body: &str) -> String {
    format!(
        r#"tell application "Notes"
    tell default account
        make new note at folder "Notes" with properties {{name:"{}", body:"{}"}}
    end tell
end tell"#,
        escape(title),
        escape(body)
    )
}

pub fn create_reminder(text: &str, at: Option<NaiveDateTime>) -> String {
    match at {
        Some(at) => format!(
            r#"tell application "Reminders"
    make new reminder with properties {{name:"{}", remind me date:date "{}"}}
end tell"#,
            escape(text),
            date_literal(at)
        ),
        None => format!(
            r#"tell application "Reminders"
    make new reminder with properties {{name:"{}"}}
end tell"#,
            escape(text)
        ),
    }
}

pub fn set_volume(percent: u8) -> String {
    format!("set volume output volume {}", percent.min(100))
}

pub fn send_email(to: &str, subject: &str, body: &str) -> String {
    format!(
        r#"tell application "Mail"
    set newMessage to make new outgoing message with properties {{subject:"{}", content:"{}", visible:false}}
    tell newMessage
        make new to recipient at end of to recipients with properties {{address:"{}"}}
        send
    end tell
end tell"#,
        escape(subject),
        escape(body),
        escape(to)
    )
}

pub fn call_number(number: &str) -> String {
    format!(
        r#"tell application "FaceTime"
    activate
end tell
open location "tel://{}""#,
        escape(&number.replace(' ', ""))
    )
}

pub fn open_app(name: &str) -> String {
    format!(
        r#"tell application "{}"
    activate
end tell"#,
        escape(name)
    )
}

pub fn close_app(name: &str) -> String {
    format!(
        r#"if application "{0}" is running then
    tell application "{0}" to quit
end if"#,
        escape(name)
    )
}

/// Play on `player`, targeting a named playlist when the player supports it.
pub fn music_play(player: Player, playlist: Option<&str>) -> String {
    match (player, playlist) {
        (Player::AppleMusic, Some(playlist)) => format!(
            r#"tell application "Music"
    activate
    try
        play playlist "{}"
    on error
        play
    end try
end tell"#,
            escape(playlist)
        ),
        _ => format!(
            r#"tell application "{}"
    activate
    play
end tell"#,
            player.app_name()
        ),
    }
}

/// `pause`, `next track` or `previous track` for `player`.
pub fn music_transport(player: Player, verb: &str) -> String {
    format!(
        r#"tell application "{}"
    {verb}
end tell"#,
        player.app_name()
    )
}

pub fn display_notification(title: &str, message: &str) -> String {
    format!(
        r#"display notification "{}" with title "{}""#,
        escape(message),
        escape(title)
    )
}

/// Run a script through `osascript -e` and return trimmed stdout.
///
/// # Errors
///
/// Returns [`OrionError::Action`] if `osascript` is not installed, cannot be
/// spawned, or exits unsuccessfully (its stderr becomes the message).
pub fn run_osascript(script: &str) -> Result<String> {
    let osascript = which::which("osascript")
        .map_err(|_| OrionError::Action("osascript is not available on this system".into()))?;
    let output = Command::new(osascript)
        .arg("-e")
        .arg(script)
        .output()
        .map_err(|e| OrionError::Action(format!("failed to run osascript: {e}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        return Err(OrionError::Action(if stderr.is_empty() {
            "AppleScript error".to_owned()
        } else {
            stderr
        }));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn escape_quotes_backslashes_and_newlines() {
        assert_eq!(escape(r#"say "hi"\now"#), r#"say \"hi\"\\now"#);
        assert_eq!(escape("a\nb"), "a\\nb");
    }

    #[test]
    fn note_script_escapes_user_text() {
        let script = create_note("Groceries \"weekly\"", "milk");
        assert!(script.contains(r#"name:"Groceries \"weekly\"""#));
        assert!(script.contains(r#"body:"milk""#));
    }

    #[test]
    fn reminder_script_includes_date_when_timed() {
        let at = NaiveDateTime::parse_from_str("2024-01-01 09:00", "%Y-%m-%d %H:%M").unwrap();
        let script = create_reminder("call mum", Some(at));
        assert!(script.contains(r#"remind me date:date "01 January 2024 09:00""#));
        assert!(!create_reminder("call mum", None).contains("remind me date"));
    }

    #[test]
    fn volume_is_clamped() {
        assert_eq!(set_volume(250), "set volume output volume 100");
    }

    #[test]
    fn playlist_targeting_is_apple_music_only() {
        assert!(music_play(Player::AppleMusic, Some("Chill")).contains(r#"play playlist "Chill""#));
        let spotify = music_play(Player::Spotify, Some("Chill"));
        assert!(spotify.contains(r#"tell application "Spotify""#));
        assert!(!spotify.contains("Chill"));
    }
}
