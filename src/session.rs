//! Wake-word gated conversation sessions.
//!
//! The controller is a pure state machine: the caller feeds it utterances
//! together with the instant they arrived and acts on the returned
//! [`SessionEvent`].

use std::time::{Duration, Instant};

use tracing::debug;

/// A lower-cased alphanumeric word and its byte span in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    word: String,
    start: usize,
    end: usize,
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current: Option<(usize, String)> = None;
    for (i, c) in text.char_indices() {
        if c.is_alphanumeric() {
            let (_, word) = current.get_or_insert_with(|| (i, String::new()));
            word.extend(c.to_lowercase());
        } else if let Some((start, word)) = current.take() {
            tokens.push(Token { word, start, end: i });
        }
    }
    if let Some((start, word)) = current {
        tokens.push(Token {
            word,
            start,
            end: text.len(),
        });
    }
    tokens
}

fn trim_edges(text: &str) -> &str {
    text.trim_matches(|c: char| !c.is_alphanumeric())
}

/// Finds configured wake phrases, ignoring case and punctuation.
#[derive(Debug, Clone)]
pub struct WakeMatcher {
    /// Tokenized phrases, longest first so "hey orion" wins over "orion".
    phrases: Vec<Vec<String>>,
}

impl WakeMatcher {
    pub fn new<S: AsRef<str>>(phrases: &[S]) -> Self {
        let mut phrases: Vec<Vec<String>> = phrases
            .iter()
            .map(|p| tokenize(p.as_ref()).into_iter().map(|t| t.word).collect())
            .filter(|words: &Vec<String>| !words.is_empty())
            .collect();
        phrases.sort_by_key(|words| std::cmp::Reverse(words.len()));
        phrases.dedup();
        Self { phrases }
    }

    /// Byte span of the first wake phrase occurrence in `text`.
    fn locate(&self, text: &str) -> Option<(usize, usize)> {
        let tokens = tokenize(text);
        for phrase in &self.phrases {
            let hit = tokens.windows(phrase.len()).find(|window| {
                window
                    .iter()
                    .zip(phrase)
                    .all(|(token, word)| &token.word == word)
            });
            if let Some(window) = hit {
                return Some((window[0].start, window[window.len() - 1].end));
            }
        }
        None
    }

    /// `None` without a wake phrase; otherwise the command text around it.
    ///
    /// The command is whatever follows the phrase, or whatever precedes it
    /// when nothing follows. `Some(None)` means the phrase stood alone.
    #[must_use]
    pub fn split(&self, text: &str) -> Option<Option<String>> {
        let (start, end) = self.locate(text)?;
        let after = trim_edges(&text[end..]);
        let before = trim_edges(&text[..start]);
        let command = if after.is_empty() { before } else { after };
        Some((!command.is_empty()).then(|| command.to_owned()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
}

/// What the caller should do with an utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// No wake phrase while idle.
    Ignored,
    /// Woken (or kept awake) with nothing to do yet; acknowledge and listen.
    Prompt,
    /// Run this command text.
    Dispatch(String),
    /// The session timed out; any utterance that came with it was dropped.
    Expired,
    /// Nothing was heard.
    NoInput,
}

pub struct ConversationController {
    matcher: WakeMatcher,
    timeout: Duration,
    state: SessionState,
    last_interaction: Option<Instant>,
}

impl ConversationController {
    pub fn new(matcher: WakeMatcher, timeout: Duration) -> Self {
        Self {
            matcher,
            timeout,
            state: SessionState::Idle,
            last_interaction: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Record activity at `now`, keeping an active session alive.
    pub fn touch(&mut self, now: Instant) {
        if self.state == SessionState::Active {
            self.last_interaction = Some(now);
        }
    }

    fn expired(&self, now: Instant) -> bool {
        self.state == SessionState::Active
            && self
                .last_interaction
                .is_some_and(|last| now.saturating_duration_since(last) > self.timeout)
    }

    fn activate(&mut self, now: Instant) {
        self.state = SessionState::Active;
        self.last_interaction = Some(now);
    }

    /// Advance the state machine with one listen result.
    pub fn on_utterance(&mut self, utterance: Option<&str>, now: Instant) -> SessionEvent {
        if self.expired(now) {
            debug!("session timed out");
            self.state = SessionState::Idle;
            self.last_interaction = None;
            return SessionEvent::Expired;
        }

        let Some(text) = utterance.map(str::trim).filter(|t| !t.is_empty()) else {
            return SessionEvent::NoInput;
        };

        match self.state {
            SessionState::Idle => match self.matcher.split(text) {
                None => SessionEvent::Ignored,
                Some(command) => {
                    self.activate(now);
                    command.map_or(SessionEvent::Prompt, SessionEvent::Dispatch)
                }
            },
            SessionState::Active => {
                self.last_interaction = Some(now);
                let command = match self.matcher.split(text) {
                    Some(command) => command,
                    None => Some(text.to_owned()),
                };
                command.map_or(SessionEvent::Prompt, SessionEvent::Dispatch)
            }
        }
    }
}
