//! Orion: a voice-driven personal assistant.
//!
//! Utterances flow through a small cascade:
//! Speech input → wake-word session → intent resolver → dispatch → reply
//!
//! # Architecture
//!
//! - **Session**: [`session`] gates speech on a wake phrase and keeps a
//!   follow-up window open after each interaction.
//! - **Resolver**: [`resolver`] asks a language model to turn free text into a
//!   structured [`intent::Command`], answering simple time questions locally.
//! - **Dispatch**: [`dispatch`] maps every intent to one handler behind a
//!   failure boundary that always produces a reply sentence.
//! - **State**: [`store`] holds notes, tasks and reminders in one locked,
//!   atomically persisted document, and preferences in a second one.
//! - **Reminders**: [`monitor`] fires due reminders from a background task.
//! - **Output**: [`speech`] speaks replies and shows notifications from a
//!   dedicated worker fed over a channel.

pub mod actions;
pub mod assistant;
pub mod clock;
pub mod config;
pub mod daemon;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod intent;
pub mod llm;
pub mod logging;
pub mod monitor;
pub mod orion_dirs;
pub mod prompt;
pub mod resolver;
pub mod session;
pub mod speech;
pub mod store;

pub use assistant::Assistant;
pub use config::OrionConfig;
pub use error::{OrionError, Result};
pub use intent::{Command, Intent};
