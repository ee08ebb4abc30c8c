//! The assembled assistant: resolver, dispatcher and output.

use std::sync::Arc;

use tracing::{debug, info};

use crate::actions::{self, SpotifyClient, WebLookup};
use crate::clock::{Clock, system_clock};
use crate::config::OrionConfig;
use crate::dispatch::{Dispatcher, HandlerContext};
use crate::error::Result;
use crate::events::{EventSink, NullSink};
use crate::llm::{LanguageModel, OllamaClient, create_interpreter};
use crate::monitor::{announce, collect_due};
use crate::resolver::IntentResolver;
use crate::speech::OutputHandle;
use crate::store::{MemoryStore, Reminder, SharedStore};

pub struct Assistant {
    resolver: IntentResolver,
    dispatcher: Dispatcher,
    output: OutputHandle,
    clock: Clock,
}

impl Assistant {
    #[must_use]
    pub fn new(
        resolver: IntentResolver,
        dispatcher: Dispatcher,
        output: OutputHandle,
        clock: Clock,
    ) -> Self {
        Self {
            resolver,
            dispatcher,
            output,
            clock,
        }
    }

    /// Open both documents and build every collaborator from `config`.
    ///
    /// # Errors
    ///
    /// Fails only if the main document exists but cannot be read or parsed.
    pub fn from_config(config: &OrionConfig, output: OutputHandle) -> Result<Self> {
        let store = Arc::new(SharedStore::open(&config.data.data_file)?);
        let memory = Arc::new(MemoryStore::open(&config.data.memory_file));
        info!(
            "documents: {} and {}",
            config.data.data_file.display(),
            config.data.memory_file.display()
        );

        let chat: Arc<dyn LanguageModel> = Arc::new(OllamaClient::new(&config.llm));
        let interpreter = create_interpreter(&config.llm, Arc::clone(&chat));
        let resolver = IntentResolver::new(interpreter, Arc::clone(&chat), Arc::clone(&memory));

        let clock = system_clock();
        let ctx = HandlerContext {
            store,
            memory,
            actions: Arc::from(actions::create_actions()),
            music: Arc::new(SpotifyClient::new(&config.music)),
            lookup: Arc::new(WebLookup::new(&config.lookup)),
            summarizer: chat,
            search_root: crate::orion_dirs::home_dir(),
            clock: Arc::clone(&clock),
        };
        Ok(Self::new(resolver, Dispatcher::new(ctx), output, clock))
    }

    #[must_use]
    pub fn store(&self) -> &Arc<SharedStore> {
        &self.dispatcher.context().store
    }

    #[must_use]
    pub fn output(&self) -> &OutputHandle {
        &self.output
    }

    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Resolve and dispatch one utterance, speak the reply and return it.
    pub fn handle_text(&self, text: &str) -> String {
        let command = self.resolver.resolve_at(text, (self.clock)());
        debug!("command: {command:?}");
        let reply = self.dispatcher.dispatch(&command);
        self.output.speak(reply.clone());
        reply
    }

    /// Fire any reminders due now, outside the background monitor's cadence.
    ///
    /// # Errors
    ///
    /// Returns a store error if the flipped reminders cannot be persisted.
    pub fn check_reminders(&self, events: &dyn EventSink) -> Result<Vec<Reminder>> {
        let due = collect_due(self.store(), &self.clock)?;
        announce(&due, &self.output, events);
        Ok(due)
    }

    /// [`Self::check_reminders`] without an event channel.
    ///
    /// # Errors
    ///
    /// See [`Self::check_reminders`].
    pub fn check_reminders_quietly(&self) -> Result<Vec<Reminder>> {
        self.check_reminders(&NullSink)
    }
}
