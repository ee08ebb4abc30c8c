//! Language-model collaborators.
//!
//! Two seams:
//!
//! - [`LanguageModel`] answers one system + user turn with plain text. Used
//!   for chat replies, file summaries and local command interpretation.
//! - [`CommandInterpreter`] turns user text into the raw command JSON the
//!   resolver decodes. Backed either by a [`LanguageModel`] with the command
//!   prompt ([`PromptInterpreter`]) or by a remote endpoint
//!   ([`CloudInterpreter`]).
//!
//! All calls are blocking (`ureq`); callers on the async runtime should use
//! `spawn_blocking`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::{LlmBackend, LlmConfig};
use crate::error::{OrionError, Result};

/// A single-turn text completion service.
pub trait LanguageModel: Send + Sync {
    /// Complete one turn and return the assistant text, trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`OrionError::Llm`] on transport or decode failure.
    fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Context the interpreter embeds in its request.
#[derive(Debug, Clone)]
pub struct PromptContext {
    pub now: NaiveDateTime,
    pub preferences: BTreeMap<String, String>,
}

/// Produces the raw (undecoded) command for a piece of user text.
pub trait CommandInterpreter: Send + Sync {
    /// # Errors
    ///
    /// Returns [`OrionError::Llm`] when the backend cannot be reached or
    /// answers with an error.
    fn interpret(&self, text: &str, context: &PromptContext) -> Result<String>;
}

/// Ollama `/api/chat` client (non-streaming).
pub struct OllamaClient {
    agent: ureq::Agent,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

impl OllamaClient {
    /// Build a client from config.
    #[must_use]
    pub fn new(config: &LlmConfig) -> Self {
        Self::with_endpoint(
            &config.api_url,
            &config.model,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Build a client for an explicit base URL.
    #[must_use]
    pub fn with_endpoint(base_url: &str, model: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_owned(),
            model: model.to_owned(),
        }
    }
}

impl LanguageModel for OllamaClient {
    fn complete(&self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "stream": false,
        });

        debug!("ollama request to {url} (model={})", self.model);
        let response = self
            .agent
            .post(&url)
            .send_json(body)
            .map_err(|e| OrionError::Llm(format!("ollama request failed: {e}")))?;
        let parsed: OllamaChatResponse = response
            .into_json()
            .map_err(|e| OrionError::Llm(format!("ollama response decode failed: {e}")))?;
        Ok(parsed.message.content.trim().to_owned())
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Interprets commands by sending the command prompt to a [`LanguageModel`].
pub struct PromptInterpreter {
    model: Arc<dyn LanguageModel>,
}

impl PromptInterpreter {
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

impl CommandInterpreter for PromptInterpreter {
    fn interpret(&self, text: &str, context: &PromptContext) -> Result<String> {
        let system = crate::prompt::command_system_prompt(context.now, &context.preferences);
        self.model.complete(&system, text)
    }
}

/// Remote interpreter: `POST {text, memory}` returning `{result: {intent, args, reply}}`.
pub struct CloudInterpreter {
    agent: ureq::Agent,
    url: String,
}

impl CloudInterpreter {
    #[must_use]
    pub fn new(config: &LlmConfig) -> Self {
        Self::with_endpoint(
            &config.cloud_url,
            Duration::from_secs(config.cloud_timeout_secs),
        )
    }

    #[must_use]
    pub fn with_endpoint(url: &str, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            url: url.to_owned(),
        }
    }
}

impl CommandInterpreter for CloudInterpreter {
    fn interpret(&self, text: &str, context: &PromptContext) -> Result<String> {
        let body = serde_json::json!({
            "text": text,
            "memory": context.preferences,
        });
        let response = self
            .agent
            .post(&self.url)
            .send_json(body)
            .map_err(|e| OrionError::Llm(format!("interpreter request failed: {e}")))?;
        let mut value: serde_json::Value = response
            .into_json()
            .map_err(|e| OrionError::Llm(format!("interpreter response decode failed: {e}")))?;
        let result = value
            .as_object_mut()
            .and_then(|obj| obj.remove("result"))
            .unwrap_or(value);
        Ok(match result {
            serde_json::Value::String(text) => text,
            other => other.to_string(),
        })
    }
}

/// Build the command interpreter selected by `config.backend`, sharing
/// `chat` for the local backend.
#[must_use]
pub fn create_interpreter(
    config: &LlmConfig,
    chat: Arc<dyn LanguageModel>,
) -> Box<dyn CommandInterpreter> {
    match config.backend {
        LlmBackend::Ollama => {
            info!("command interpreter: ollama model={} at {}", config.model, config.api_url);
            Box::new(PromptInterpreter::new(chat))
        }
        LlmBackend::Cloud => {
            info!("command interpreter: cloud endpoint {}", config.cloud_url);
            Box::new(CloudInterpreter::new(config))
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use std::sync::Mutex;

    struct Recording {
        calls: Mutex<Vec<(String, String)>>,
    }

    impl LanguageModel for Recording {
        fn complete(&self, system: &str, user: &str) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((system.to_owned(), user.to_owned()));
            Ok("{}".to_owned())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    #[test]
    fn prompt_interpreter_sends_command_prompt() {
        let model = Arc::new(Recording {
            calls: Mutex::new(Vec::new()),
        });
        let interpreter = PromptInterpreter::new(model.clone());
        let context = PromptContext {
            now: NaiveDateTime::parse_from_str("2025-01-02 03:04", "%Y-%m-%d %H:%M").unwrap(),
            preferences: BTreeMap::new(),
        };

        interpreter.interpret("list my tasks", &context).unwrap();

        let calls = model.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains("2025-01-02 03:04"));
        assert_eq!(calls[0].1, "list my tasks");
    }

    #[test]
    fn unreachable_ollama_is_an_llm_error() {
        let client =
            OllamaClient::with_endpoint("http://127.0.0.1:9", "llama3", Duration::from_millis(200));
        assert!(matches!(client.complete("s", "u"), Err(OrionError::Llm(_))));
    }
}
