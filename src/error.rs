//! Error types for the orion assistant.

/// Top-level error type for the assistant core and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum OrionError {
    /// Main document (notes / tasks / reminders) load or persist failure.
    #[error("store error: {0}")]
    Store(String),

    /// Preferences / usage-stats document failure.
    #[error("memory error: {0}")]
    Memory(String),

    /// Language model transport or decode error.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Operating-system automation failure (AppleScript, player control).
    #[error("action error: {0}")]
    Action(String),

    /// Weather, time or music web API failure.
    #[error("lookup error: {0}")]
    Lookup(String),

    /// Speech capture or synthesis error.
    #[error("speech error: {0}")]
    Speech(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// A dispatched command was missing a required argument or carried a bad one.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrionError {
    /// The message without the category prefix, for user-facing replies.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Store(m)
            | Self::Memory(m)
            | Self::Llm(m)
            | Self::Action(m)
            | Self::Lookup(m)
            | Self::Speech(m)
            | Self::Config(m)
            | Self::InvalidArgument(m)
            | Self::Channel(m) => m.clone(),
            Self::Io(e) => e.to_string(),
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, OrionError>;
