//! Turns raw user text into a [`Command`].
//!
//! Resolution never fails: time questions are answered locally, everything
//! else goes through the [`CommandInterpreter`], and any transport or decode
//! problem degrades to an `unknown` command carrying a chat reply.

use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Local};
use chrono_tz::Tz;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::intent::{Command, Intent};
use crate::llm::{CommandInterpreter, LanguageModel, PromptContext};
use crate::prompt::CHAT_SYSTEM_PROMPT;
use crate::store::MemoryStore;

/// Reply used when the model omits one.
pub const DEFAULT_REPLY: &str = "Done.";

const CLOCK_FORMAT: &str = "%I:%M %p";

static TIME_IN_PLACE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\btime\b.*\bin\s+([a-z\s]+)\??$").ok());

static PLAIN_TIME: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(?:what time is it|what's the time|whats the time|what is the time|tell me the time)(?:\s+now)?\s*\??$").ok()
});

/// Places the fast path knows without a network lookup.
const PLACES: &[(&str, Tz)] = &[
    ("japan", chrono_tz::Asia::Tokyo),
    ("tokyo", chrono_tz::Asia::Tokyo),
    ("south africa", chrono_tz::Africa::Johannesburg),
    ("johannesburg", chrono_tz::Africa::Johannesburg),
    ("uk", chrono_tz::Europe::London),
    ("england", chrono_tz::Europe::London),
    ("london", chrono_tz::Europe::London),
    ("germany", chrono_tz::Europe::Berlin),
    ("berlin", chrono_tz::Europe::Berlin),
    ("usa", chrono_tz::America::New_York),
    ("new york", chrono_tz::America::New_York),
    ("california", chrono_tz::America::Los_Angeles),
    ("los angeles", chrono_tz::America::Los_Angeles),
];

/// Look up a place in the static timezone table.
#[must_use]
pub fn timezone_for_place(place: &str) -> Option<Tz> {
    let place = place.trim().to_lowercase();
    PLACES
        .iter()
        .find(|(name, _)| *name == place)
        .map(|(_, tz)| *tz)
}

/// Answer "time in <place>" and "what time is it" locally.
///
/// Returns `None` when the text is not a time question.
#[must_use]
pub fn fast_time_command(text: &str, now: DateTime<Local>) -> Option<Command> {
    let lower = text.trim().to_lowercase();
    if !lower.contains("time") {
        return None;
    }

    if let Some(re) = TIME_IN_PLACE.as_ref()
        && let Some(caps) = re.captures(&lower)
        && let Some(place) = caps.get(1).map(|m| m.as_str().trim())
        && !place.is_empty()
    {
        let command = match timezone_for_place(place) {
            Some(tz) => Command::new(Intent::TellTime)
                .with_arg("place", place)
                .with_arg("timezone", tz.name())
                .with_reply(format!(
                    "The time in {place} is {}.",
                    now.with_timezone(&tz).format(CLOCK_FORMAT)
                )),
            None => Command::new(Intent::TellTime)
                .with_arg("place", place)
                .with_arg("timezone", Value::Null)
                .with_reply(format!(
                    "I'm not sure about the timezone for {place}, but right now my local time is {}.",
                    now.format(CLOCK_FORMAT)
                )),
        };
        return Some(command);
    }

    if PLAIN_TIME.as_ref().is_some_and(|re| re.is_match(&lower)) {
        return Some(
            Command::new(Intent::TellTime)
                .with_arg("place", Value::Null)
                .with_arg("timezone", Value::Null)
                .with_reply(format!("It is {} right now.", now.format(CLOCK_FORMAT))),
        );
    }
    None
}

/// Decode model output into a command, defaulting missing fields.
///
/// Tolerates surrounding whitespace, Markdown code fences and prose around a
/// single JSON object. Returns `None` when no JSON object can be decoded.
#[must_use]
pub fn parse_command(raw: &str) -> Option<Command> {
    let body = strip_code_fence(raw.trim());
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => {
            let start = body.find('{')?;
            let end = body.rfind('}')?;
            if end <= start {
                return None;
            }
            serde_json::from_str(&body[start..=end]).ok()?
        }
    };
    let Value::Object(obj) = value else {
        return None;
    };

    let intent = obj
        .get("intent")
        .and_then(Value::as_str)
        .map_or(Intent::Unknown, Intent::parse);
    let args = obj
        .get("args")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_else(Map::new);
    let reply = obj
        .get("reply")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_REPLY)
        .to_owned();
    Some(Command {
        intent,
        args,
        reply,
    })
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag line (```json).
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Resolves user text into commands.
pub struct IntentResolver {
    interpreter: Box<dyn CommandInterpreter>,
    chat: Arc<dyn LanguageModel>,
    memory: Arc<MemoryStore>,
}

impl IntentResolver {
    #[must_use]
    pub fn new(
        interpreter: Box<dyn CommandInterpreter>,
        chat: Arc<dyn LanguageModel>,
        memory: Arc<MemoryStore>,
    ) -> Self {
        Self {
            interpreter,
            chat,
            memory,
        }
    }

    /// Resolve `text` at the current local time.
    pub fn resolve(&self, text: &str) -> Command {
        self.resolve_at(text, Local::now())
    }

    /// Resolve `text` as if it were `now`.
    pub fn resolve_at(&self, text: &str, now: DateTime<Local>) -> Command {
        let text = text.trim();
        if text.is_empty() {
            return Command::chat("I didn't catch that.");
        }

        if let Some(command) = fast_time_command(text, now) {
            debug!("time question answered locally");
            return command;
        }

        let preferences = self.memory.preferences().unwrap_or_else(|e| {
            warn!("preferences unavailable for prompt: {e}");
            Default::default()
        });
        let context = PromptContext {
            now: now.naive_local(),
            preferences,
        };

        let raw = match self.interpreter.interpret(text, &context) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("command interpretation failed, falling back to chat: {e}");
                return Command::chat(self.chat_reply(text));
            }
        };

        let mut command = parse_command(&raw).unwrap_or_else(|| {
            warn!("model output is not a command object: {}", preview(&raw));
            Command::new(Intent::Unknown)
        });
        if command.intent == Intent::Unknown {
            command.args.clear();
            command.reply = self.chat_reply(text);
        }
        info!("resolved intent: {}", command.intent);
        command
    }

    /// Free-form conversational reply. Never empty.
    pub fn chat_reply(&self, text: &str) -> String {
        match self.chat.complete(CHAT_SYSTEM_PROMPT, text) {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_owned(),
            Ok(_) => "I'm here, but I have nothing to add to that.".to_owned(),
            Err(e) => {
                warn!("chat reply failed via {}: {e}", self.chat.name());
                format!("I'm here, but something went wrong talking to my language core: {e}")
            }
        }
    }
}

fn preview(raw: &str) -> String {
    raw.chars().take(120).collect()
}
