//! Speech input and output collaborators.

pub mod input;
pub mod output;

pub use input::{CommandInput, LineInput, SpeechInput, create_input};
pub use output::{
    Deduper, LogNotifier, LogSpeaker, Notifier, OutputHandle, OutputMessage, OutputWorker,
    Speaker, create_output,
};
