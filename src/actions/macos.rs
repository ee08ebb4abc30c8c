//! AppleScript automation for macOS.

use chrono::NaiveDateTime;
use tracing::debug;

use super::applescript::{self, run_osascript};
use super::{Player, SystemActions};
use crate::error::Result;
use crate::store::MINUTE_FORMAT;

/// Drives Notes, Reminders, Mail, FaceTime, Music and Spotify via `osascript`.
pub struct MacActions;

fn run(action: &str, script: &str) -> Result<()> {
    debug!("osascript: {action}");
    run_osascript(script).map(|_| ())
}

impl SystemActions for MacActions {
    fn create_note(&self, title: &str, body: &str) -> Result<String> {
        run("create_note", &applescript::create_note(title, body))?;
        Ok(format!("Note created: {title}"))
    }

    fn create_reminder(&self, text: &str, at: Option<NaiveDateTime>) -> Result<String> {
        run("create_reminder", &applescript::create_reminder(text, at))?;
        Ok(match at {
            Some(at) => format!("Reminder added to Reminders for {}.", at.format(MINUTE_FORMAT)),
            None => "Reminder added to Reminders.".to_owned(),
        })
    }

    fn set_alarm(&self, at: NaiveDateTime, label: &str) -> Result<String> {
        // Reminders with a due date are the alarm backend.
        run("set_alarm", &applescript::create_reminder(label, Some(at)))?;
        Ok(format!("Alarm set for {}.", at.format(MINUTE_FORMAT)))
    }

    fn open_app(&self, name: &str) -> Result<String> {
        run("open_app", &applescript::open_app(name))?;
        Ok(format!("Opening {name}."))
    }

    fn close_app(&self, name: &str) -> Result<String> {
        run("close_app", &applescript::close_app(name))?;
        Ok(format!("Closing {name}."))
    }

    fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<String> {
        run("send_email", &applescript::send_email(to, subject, body))?;
        Ok(format!("Email sent to {to}."))
    }

    fn call_number(&self, number: &str) -> Result<String> {
        run("call_number", &applescript::call_number(number))?;
        Ok(format!("Calling {number}..."))
    }

    fn set_volume(&self, percent: u8) -> Result<String> {
        run("set_volume", &applescript::set_volume(percent))?;
        Ok(format!("Volume set to {percent}%."))
    }

    fn music_play(&self, player: Player, playlist: Option<&str>) -> Result<String> {
        run("music_play", &applescript::music_play(player, playlist))?;
        Ok(match (player, playlist) {
            (Player::AppleMusic, Some(playlist)) => {
                format!("Playing playlist '{playlist}' in Apple Music.")
            }
            _ => format!("Playing music in {}.", player.label()),
        })
    }

    fn music_pause(&self, player: Player) -> Result<String> {
        run("music_pause", &applescript::music_transport(player, "pause"))?;
        Ok(format!("Paused {}.", player.label()))
    }

    fn music_next(&self, player: Player) -> Result<String> {
        run("music_next", &applescript::music_transport(player, "next track"))?;
        Ok(format!("Skipping to the next track in {}.", player.label()))
    }

    fn music_previous(&self, player: Player) -> Result<String> {
        run(
            "music_previous",
            &applescript::music_transport(player, "previous track"),
        )?;
        Ok(format!(
            "Going back to the previous track in {}.",
            player.label()
        ))
    }
}
