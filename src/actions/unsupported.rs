//! Automation backend for platforms without AppleScript.

use chrono::NaiveDateTime;

use super::{Player, SystemActions};
use crate::error::{OrionError, Result};

/// Every action fails with a plain "not supported" error that the dispatch
/// boundary turns into a reply.
pub struct UnsupportedActions;

fn unsupported(what: &str) -> Result<String> {
    Err(OrionError::Action(format!(
        "{what} is not supported on this platform"
    )))
}

impl SystemActions for UnsupportedActions {
    fn create_note(&self, _title: &str, _body: &str) -> Result<String> {
        unsupported("creating Apple Notes")
    }

    fn create_reminder(&self, _text: &str, _at: Option<NaiveDateTime>) -> Result<String> {
        unsupported("creating system reminders")
    }

    fn set_alarm(&self, _at: NaiveDateTime, _label: &str) -> Result<String> {
        unsupported("setting alarms")
    }

    fn open_app(&self, _name: &str) -> Result<String> {
        unsupported("opening apps")
    }

    fn close_app(&self, _name: &str) -> Result<String> {
        unsupported("closing apps")
    }

    fn send_email(&self, _to: &str, _subject: &str, _body: &str) -> Result<String> {
        unsupported("sending email")
    }

    fn call_number(&self, _number: &str) -> Result<String> {
        unsupported("placing calls")
    }

    fn set_volume(&self, _percent: u8) -> Result<String> {
        unsupported("changing the volume")
    }

    fn music_play(&self, player: Player, _playlist: Option<&str>) -> Result<String> {
        unsupported(&format!("controlling {}", player.label()))
    }

    fn music_pause(&self, player: Player) -> Result<String> {
        unsupported(&format!("controlling {}", player.label()))
    }

    fn music_next(&self, player: Player) -> Result<String> {
        unsupported(&format!("controlling {}", player.label()))
    }

    fn music_previous(&self, player: Player) -> Result<String> {
        unsupported(&format!("controlling {}", player.label()))
    }
}
