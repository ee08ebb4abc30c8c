//! Wake-word gated voice loop.
//!
//! Runs on a blocking thread: every listen and every dispatch is
//! synchronous. Progress is reported as [`DaemonEvent`]s.

use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::assistant::Assistant;
use crate::config::ConversationConfig;
use crate::events::{DaemonEvent, EventSink, ListenState};
use crate::session::{ConversationController, SessionEvent, WakeMatcher};
use crate::speech::SpeechInput;

pub struct VoiceLoop<'a> {
    assistant: &'a Assistant,
    events: &'a dyn EventSink,
    controller: ConversationController,
    acknowledgement: String,
    greeting: String,
}

impl<'a> VoiceLoop<'a> {
    pub fn new(
        assistant: &'a Assistant,
        events: &'a dyn EventSink,
        config: &ConversationConfig,
    ) -> Self {
        let controller = ConversationController::new(
            WakeMatcher::new(&config.wake_words),
            config.session_timeout(),
        );
        Self {
            assistant,
            events,
            controller,
            acknowledgement: config.acknowledgement.clone(),
            greeting: config.greeting.clone(),
        }
    }

    /// Handle one listen result and return the reply, if a command ran.
    pub fn step(&mut self, heard: Option<&str>, now: Instant) -> Option<String> {
        if let Some(text) = heard.map(str::trim).filter(|t| !t.is_empty()) {
            self.events.emit(&DaemonEvent::Transcript {
                text: text.to_owned(),
            });
        }

        match self.controller.on_utterance(heard, now) {
            SessionEvent::NoInput => None,
            SessionEvent::Ignored => {
                debug!("no wake word; ignoring");
                self.events.emit(&DaemonEvent::no_wake_word());
                None
            }
            SessionEvent::Expired => {
                info!("session expired; waiting for the wake word");
                self.events.emit(&DaemonEvent::status(ListenState::Idle));
                None
            }
            SessionEvent::Prompt => {
                self.assistant.output().speak(self.acknowledgement.clone());
                self.events.emit(&DaemonEvent::Reply {
                    text: self.acknowledgement.clone(),
                });
                self.events.emit(&DaemonEvent::status(ListenState::Listening));
                None
            }
            SessionEvent::Dispatch(command) => {
                self.events.emit(&DaemonEvent::Status {
                    state: ListenState::Processing,
                    text: Some(command.clone()),
                });
                let reply = self.assistant.handle_text(&command);
                self.controller.touch(Instant::now());
                self.events.emit(&DaemonEvent::Reply {
                    text: reply.clone(),
                });
                self.events.emit(&DaemonEvent::status(ListenState::Listening));
                Some(reply)
            }
        }
    }

    /// Listen until `cancel` fires or the input closes.
    pub fn run(&mut self, input: &mut dyn SpeechInput, cancel: &CancellationToken) {
        self.events.emit(&DaemonEvent::started());
        if !self.greeting.trim().is_empty() {
            self.assistant.output().speak(self.greeting.clone());
        }
        self.events.emit(&DaemonEvent::status(ListenState::Listening));

        while !cancel.is_cancelled() && !input.is_closed() {
            let heard = input.listen();
            if cancel.is_cancelled() {
                break;
            }
            self.step(heard.as_deref(), Instant::now());
        }
        info!("voice loop finished");
    }
}
