//! Command dispatch.
//!
//! [`handler_for`] maps every [`Intent`] to one handler function; the match
//! is exhaustive so adding an intent forces a decision here. [`Dispatcher`]
//! wraps each call in a failure boundary: handler errors and panics become a
//! reply sentence, never a propagated error.

mod info;
mod media;
mod prefs;
mod records;
mod system;

pub use info::MAX_FIND_RESULTS;
pub use records::{format_notes, format_reminders, format_tasks};

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::{debug, error, warn};

use crate::actions::{LookupService, MusicService, SystemActions};
use crate::clock::Clock;
use crate::error::Result;
use crate::intent::{Command, Intent};
use crate::llm::LanguageModel;
use crate::store::{MemoryStore, SharedStore};

/// Reply for intents without a handler when the command carries no reply.
pub const NOT_SURE_REPLY: &str = "I'm not sure how to do that yet.";

/// Prefix for replies produced by the failure boundary.
pub const FAILURE_PREFIX: &str = "Something went wrong executing the command:";

/// What a handler produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Terse confirmation of a side effect; the command's own reply, when
    /// present, is preferred over it.
    Confirm(String),
    /// Information the user asked for; always used as-is.
    Final(String),
}

/// Signature shared by every handler.
pub type Handler = fn(&HandlerContext, &Command) -> Result<Reply>;

/// Everything a handler may touch.
pub struct HandlerContext {
    pub store: Arc<SharedStore>,
    pub memory: Arc<MemoryStore>,
    pub actions: Arc<dyn SystemActions>,
    pub music: Arc<dyn MusicService>,
    pub lookup: Arc<dyn LookupService>,
    /// Model used for file summaries.
    pub summarizer: Arc<dyn LanguageModel>,
    /// Default root for `find_file`.
    pub search_root: PathBuf,
    pub clock: Clock,
}

impl HandlerContext {
    fn now(&self) -> DateTime<Local> {
        (self.clock)()
    }
}

/// The handler for `intent`, or `None` for [`Intent::Unknown`].
#[must_use]
pub fn handler_for(intent: Intent) -> Option<Handler> {
    let handler: Handler = match intent {
        Intent::AddNote => records::add_note,
        Intent::ListNotes => records::list_notes,
        Intent::AddTask => records::add_task,
        Intent::ListTasks => records::list_tasks,
        Intent::CompleteTask => records::complete_task,
        Intent::AddReminder => records::add_reminder,
        Intent::ListReminders => records::list_reminders,
        Intent::GetWeather => info::get_weather,
        Intent::GetTime => info::get_time,
        Intent::TellTime => info::tell_time,
        Intent::FindFile => info::find_file,
        Intent::SummarizeFile => info::summarize_file,
        Intent::SetAlarm => system::set_alarm,
        Intent::OpenApp => system::open_app,
        Intent::CloseApp => system::close_app,
        Intent::SendEmail => system::send_email,
        Intent::CallNumber => system::call_number,
        Intent::SetVolume => system::set_volume,
        Intent::SetPreference => prefs::set_preference,
        Intent::GetPreference => prefs::get_preference,
        Intent::MusicPlay => media::music_play,
        Intent::MusicPause => media::music_pause,
        Intent::MusicNext => media::music_next,
        Intent::MusicPrevious => media::music_previous,
        Intent::MusicCurrent => media::music_current,
        Intent::Unknown => return None,
    };
    Some(handler)
}

/// Routes commands to handlers behind the failure boundary.
pub struct Dispatcher {
    ctx: HandlerContext,
}

impl Dispatcher {
    #[must_use]
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }

    #[must_use]
    pub fn context(&self) -> &HandlerContext {
        &self.ctx
    }

    /// Run `command` and return the user-facing reply. Never fails.
    ///
    /// The usage counter is bumped once per call, whatever the outcome.
    pub fn dispatch(&self, command: &Command) -> String {
        if let Err(e) = self.ctx.memory.bump_command_count() {
            warn!("usage counter not updated: {e}");
        }

        let Some(handler) = handler_for(command.intent) else {
            return command
                .suggested_reply()
                .map_or_else(|| NOT_SURE_REPLY.to_owned(), str::to_owned);
        };

        debug!("dispatching {}", command.intent);
        match catch_unwind(AssertUnwindSafe(|| handler(&self.ctx, command))) {
            Ok(Ok(Reply::Confirm(own))) => command
                .suggested_reply()
                .map_or(own, str::to_owned),
            Ok(Ok(Reply::Final(text))) => text,
            Ok(Err(e)) => {
                warn!("{} failed: {e}", command.intent);
                format!("{FAILURE_PREFIX} {}", e.detail())
            }
            Err(panic) => {
                let cause = panic_message(panic.as_ref());
                error!("{} panicked: {cause}", command.intent);
                format!("{FAILURE_PREFIX} {cause}")
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "internal error".to_owned()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use std::sync::Mutex;

    use chrono::{NaiveDateTime, TimeZone};

    use super::*;
    use crate::actions::Player;
    use crate::error::OrionError;

    /// Records every automation call; optionally fails them all.
    #[derive(Default)]
    pub struct RecordingActions {
        pub calls: Mutex<Vec<String>>,
        pub fail: bool,
    }

    impl RecordingActions {
        fn record(&self, call: String) -> Result<String> {
            self.calls.lock().unwrap().push(call.clone());
            if self.fail {
                Err(OrionError::Action("automation offline".into()))
            } else {
                Ok(format!("ok: {call}"))
            }
        }
    }

    impl SystemActions for RecordingActions {
        fn create_note(&self, title: &str, body: &str) -> Result<String> {
            self.record(format!("note {title}|{body}"))
        }
        fn create_reminder(&self, text: &str, at: Option<NaiveDateTime>) -> Result<String> {
            self.record(format!("reminder {text}|{at:?}"))
        }
        fn set_alarm(&self, at: NaiveDateTime, label: &str) -> Result<String> {
            self.record(format!("alarm {at}|{label}"))
        }
        fn open_app(&self, name: &str) -> Result<String> {
            self.record(format!("open {name}"))
        }
        fn close_app(&self, name: &str) -> Result<String> {
            self.record(format!("close {name}"))
        }
        fn send_email(&self, to: &str, subject: &str, _body: &str) -> Result<String> {
            self.record(format!("email {to}|{subject}"))
        }
        fn call_number(&self, number: &str) -> Result<String> {
            self.record(format!("call {number}"))
        }
        fn set_volume(&self, percent: u8) -> Result<String> {
            self.record(format!("volume {percent}"))
        }
        fn music_play(&self, player: Player, playlist: Option<&str>) -> Result<String> {
            self.record(format!("play {}|{playlist:?}", player.label()))
        }
        fn music_pause(&self, player: Player) -> Result<String> {
            self.record(format!("pause {}", player.label()))
        }
        fn music_next(&self, player: Player) -> Result<String> {
            self.record(format!("next {}", player.label()))
        }
        fn music_previous(&self, player: Player) -> Result<String> {
            self.record(format!("previous {}", player.label()))
        }
    }

    #[derive(Default)]
    pub struct RecordingMusic {
        pub calls: Mutex<Vec<String>>,
    }

    impl RecordingMusic {
        fn record(&self, call: &str) -> Result<String> {
            self.calls.lock().unwrap().push(call.to_owned());
            Ok(format!("spotify {call}"))
        }
    }

    impl MusicService for RecordingMusic {
        fn play_playlist(&self, name: &str) -> Result<String> {
            self.record(&format!("playlist {name}"))
        }
        fn resume(&self) -> Result<String> {
            self.record("resume")
        }
        fn pause(&self) -> Result<String> {
            self.record("pause")
        }
        fn next_track(&self) -> Result<String> {
            self.record("next")
        }
        fn previous_track(&self) -> Result<String> {
            self.record("previous")
        }
        fn current_track(&self) -> Result<String> {
            self.record("current")
        }
    }

    #[derive(Default)]
    pub struct RecordingLookup {
        pub queries: Mutex<Vec<String>>,
    }

    impl LookupService for RecordingLookup {
        fn weather(&self, query: &str) -> Result<String> {
            self.queries.lock().unwrap().push(format!("weather {query}"));
            Ok(format!("Sunny in {query}."))
        }
        fn time_in(&self, location: &str) -> Result<String> {
            self.queries.lock().unwrap().push(format!("time {location}"));
            Ok(format!("In {location} it's noon."))
        }
    }

    pub struct EchoModel;

    impl LanguageModel for EchoModel {
        fn complete(&self, _system: &str, user: &str) -> Result<String> {
            Ok(format!("summary of {} chars", user.chars().count()))
        }
        fn name(&self) -> &str {
            "echo"
        }
    }

    pub struct Fixture {
        pub dispatcher: Dispatcher,
        pub actions: Arc<RecordingActions>,
        pub music: Arc<RecordingMusic>,
        pub lookup: Arc<RecordingLookup>,
    }

    pub fn at(value: &str) -> DateTime<Local> {
        let naive = crate::store::document::parse_local_time(value).unwrap();
        Local.from_local_datetime(&naive).earliest().unwrap()
    }

    pub fn fixture_with(actions: RecordingActions, now: &str) -> Fixture {
        let actions = Arc::new(actions);
        let music = Arc::new(RecordingMusic::default());
        let lookup = Arc::new(RecordingLookup::default());
        let ctx = HandlerContext {
            store: Arc::new(SharedStore::in_memory()),
            memory: Arc::new(MemoryStore::in_memory()),
            actions: actions.clone(),
            music: music.clone(),
            lookup: lookup.clone(),
            summarizer: Arc::new(EchoModel),
            search_root: std::env::temp_dir(),
            clock: crate::clock::fixed_clock(at(now)),
        };
        Fixture {
            dispatcher: Dispatcher::new(ctx),
            actions,
            music,
            lookup,
        }
    }

    pub fn fixture() -> Fixture {
        fixture_with(RecordingActions::default(), "2024-01-01 12:00")
    }
}
