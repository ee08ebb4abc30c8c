//! The closed intent catalogue and the [`Command`] value that carries one.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{OrionError, Result};

/// Every request category the assistant knows how to act on.
///
/// Anything else the resolver sees (including the model's own `"chat"`)
/// becomes [`Intent::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    AddNote,
    ListNotes,
    AddTask,
    ListTasks,
    CompleteTask,
    AddReminder,
    ListReminders,
    GetWeather,
    GetTime,
    TellTime,
    SetAlarm,
    OpenApp,
    CloseApp,
    SendEmail,
    CallNumber,
    SetVolume,
    FindFile,
    SummarizeFile,
    SetPreference,
    GetPreference,
    MusicPlay,
    MusicPause,
    MusicNext,
    MusicPrevious,
    MusicCurrent,
    Unknown,
}

impl Intent {
    pub const ALL: [Intent; 26] = [
        Intent::AddNote,
        Intent::ListNotes,
        Intent::AddTask,
        Intent::ListTasks,
        Intent::CompleteTask,
        Intent::AddReminder,
        Intent::ListReminders,
        Intent::GetWeather,
        Intent::GetTime,
        Intent::TellTime,
        Intent::SetAlarm,
        Intent::OpenApp,
        Intent::CloseApp,
        Intent::SendEmail,
        Intent::CallNumber,
        Intent::SetVolume,
        Intent::FindFile,
        Intent::SummarizeFile,
        Intent::SetPreference,
        Intent::GetPreference,
        Intent::MusicPlay,
        Intent::MusicPause,
        Intent::MusicNext,
        Intent::MusicPrevious,
        Intent::MusicCurrent,
        Intent::Unknown,
    ];

    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AddNote => "add_note",
            Self::ListNotes => "list_notes",
            Self::AddTask => "add_task",
            Self::ListTasks => "list_tasks",
            Self::CompleteTask => "complete_task",
            Self::AddReminder => "add_reminder",
            Self::ListReminders => "list_reminders",
            Self::GetWeather => "get_weather",
            Self::GetTime => "get_time",
            Self::TellTime => "tell_time",
            Self::SetAlarm => "set_alarm",
            Self::OpenApp => "open_app",
            Self::CloseApp => "close_app",
            Self::SendEmail => "send_email",
            Self::CallNumber => "call_number",
            Self::SetVolume => "set_volume",
            Self::FindFile => "find_file",
            Self::SummarizeFile => "summarize_file",
            Self::SetPreference => "set_preference",
            Self::GetPreference => "get_preference",
            Self::MusicPlay => "music_play",
            Self::MusicPause => "music_pause",
            Self::MusicNext => "music_next",
            Self::MusicPrevious => "music_previous",
            Self::MusicCurrent => "music_current",
            Self::Unknown => "unknown",
        }
    }

    /// Map a wire name to an intent. Unrecognised names are `Unknown`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|i| i.as_str().eq_ignore_ascii_case(raw))
            .unwrap_or(Self::Unknown)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Intent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Intent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(value.as_str().map_or(Self::Unknown, Self::parse))
    }
}

/// A resolved request: what to do, with which arguments, and an optional
/// model-authored reply handlers may prefer over their own wording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub intent: Intent,
    #[serde(default)]
    pub args: Map<String, Value>,
    #[serde(default)]
    pub reply: String,
}

impl Command {
    /// A command with no arguments and no reply.
    #[must_use]
    pub fn new(intent: Intent) -> Self {
        Self {
            intent,
            args: Map::new(),
            reply: String::new(),
        }
    }

    /// An `unknown` command carrying a conversational reply.
    #[must_use]
    pub fn chat(reply: impl Into<String>) -> Self {
        Self {
            intent: Intent::Unknown,
            args: Map::new(),
            reply: reply.into(),
        }
    }

    /// Builder-style argument setter.
    #[must_use]
    pub fn with_arg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.args.insert(key.to_owned(), value.into());
        self
    }

    /// Builder-style reply setter.
    #[must_use]
    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = reply.into();
        self
    }

    /// The model-authored reply, if it carries any text.
    #[must_use]
    pub fn suggested_reply(&self) -> Option<&str> {
        let reply = self.reply.trim();
        (!reply.is_empty()).then_some(reply)
    }

    /// Non-empty string argument. Numbers are rendered as text; null and
    /// blank strings count as absent.
    #[must_use]
    pub fn str_arg(&self, key: &str) -> Option<String> {
        match self.args.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Required string argument.
    ///
    /// # Errors
    ///
    /// Returns [`OrionError::InvalidArgument`] when the argument is absent or blank.
    pub fn require_str(&self, key: &str) -> Result<String> {
        self.str_arg(key)
            .ok_or_else(|| OrionError::InvalidArgument(format!("missing '{key}'")))
    }

    /// Integer argument; numeric strings such as `"3"` are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`OrionError::InvalidArgument`] when present but not an integer.
    pub fn int_arg(&self, key: &str) -> Result<Option<i64>> {
        match self.args.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(Some)
                .ok_or_else(|| OrionError::InvalidArgument(format!("'{key}' must be an integer"))),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .trim_start_matches('#')
                .parse::<i64>()
                .map(Some)
                .map_err(|_| OrionError::InvalidArgument(format!("'{key}' must be an integer"))),
            Some(_) => Err(OrionError::InvalidArgument(format!(
                "'{key}' must be an integer"
            ))),
        }
    }

    /// Required integer argument.
    ///
    /// # Errors
    ///
    /// Returns [`OrionError::InvalidArgument`] when absent or not an integer.
    pub fn require_int(&self, key: &str) -> Result<i64> {
        self.int_arg(key)?
            .ok_or_else(|| OrionError::InvalidArgument(format!("missing '{key}'")))
    }
}
