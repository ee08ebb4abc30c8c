//! Configuration types for the assistant.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrionConfig {
    /// Persisted document locations.
    pub data: DataConfig,
    /// Language model settings.
    pub llm: LlmConfig,
    /// Conversation session settings (wake vocabulary / timeout).
    pub conversation: ConversationConfig,
    /// Reminder monitor cadence.
    pub reminders: ReminderConfig,
    /// Speech input/output settings.
    pub speech: SpeechConfig,
    /// Weather and world-time lookups.
    pub lookup: LookupConfig,
    /// Music service settings.
    pub music: MusicConfig,
}

/// Where the main and preferences documents are stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Notes / tasks / reminders document.
    pub data_file: PathBuf,
    /// Preferences and usage stats document.
    pub memory_file: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_file: crate::orion_dirs::data_file(),
            memory_file: crate::orion_dirs::memory_file(),
        }
    }
}

/// Which service turns free text into commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmBackend {
    /// Local Ollama chat API with the command prompt.
    #[default]
    Ollama,
    /// Remote interpreter endpoint returning `{result: {intent, args, reply}}`.
    Cloud,
}

/// Language model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend used for command interpretation.
    pub backend: LlmBackend,
    /// Ollama base URL.
    pub api_url: String,
    /// Ollama model name.
    pub model: String,
    /// Cloud interpreter endpoint.
    pub cloud_url: String,
    /// Request timeout for Ollama calls.
    pub timeout_secs: u64,
    /// Request timeout for the cloud interpreter.
    pub cloud_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::Ollama,
            api_url: "http://localhost:11434".to_owned(),
            model: "llama3".to_owned(),
            cloud_url: "http://localhost:3000/interpret".to_owned(),
            timeout_secs: 60,
            cloud_timeout_secs: 10,
        }
    }
}

/// Conversation session configuration (wake vocabulary and follow-up window).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Wake words or phrases (case- and punctuation-insensitive).
    ///
    /// Longer phrases are tried first, so `"hey orion"` wins over `"orion"`.
    pub wake_words: Vec<String>,
    /// Seconds after the last interaction during which follow-ups need no
    /// wake word.
    ///
    /// 0 is taken literally: every follow-up needs the wake word again.
    pub session_timeout_s: u64,
    /// Spoken when the wake word arrives without a command.
    pub acknowledgement: String,
    /// Spoken when the daemon starts.
    pub greeting: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            wake_words: vec!["hey orion".to_owned(), "orion".to_owned()],
            session_timeout_s: 30,
            acknowledgement: "Yes, sir?".to_owned(),
            greeting: "System online. All subsystems functioning within optimal parameters."
                .to_owned(),
        }
    }
}

impl ConversationConfig {
    /// Session timeout as a [`Duration`].
    #[must_use]
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_s)
    }
}

/// Reminder monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Seconds between due-reminder scans.
    pub check_interval_s: u64,
    /// Sleep increment between cancellation checks (ms).
    pub poll_increment_ms: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            check_interval_s: 30,
            poll_increment_ms: 1000,
        }
    }
}

/// Speech input/output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Whether replies are spoken aloud.
    pub enabled: bool,
    /// Voice passed to `say -v`.
    pub voice: String,
    /// Words per minute passed to `say -r`.
    pub rate: u32,
    /// Identical utterances within this window are spoken once (ms).
    pub dedupe_window_ms: u64,
    /// Whether reminders raise desktop notifications.
    pub notifications: bool,
    /// Optional external recognizer; its stdout is taken as one utterance.
    pub recognizer_command: Option<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            voice: "Karen".to_owned(),
            rate: 170,
            dedupe_window_ms: 1000,
            notifications: true,
            recognizer_command: None,
        }
    }
}

/// Weather and world-time lookup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Environment variable holding the weatherapi.com key.
    pub weather_api_key_env: String,
    /// Current-conditions endpoint.
    pub weather_url: String,
    /// World time API base URL.
    pub time_url: String,
    /// Request timeout.
    pub timeout_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            weather_api_key_env: "WEATHER_API_KEY".to_owned(),
            weather_url: "https://api.weatherapi.com/v1/current.json".to_owned(),
            time_url: "https://worldtimeapi.org/api/timezone".to_owned(),
            timeout_secs: 8,
        }
    }
}

/// Music service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicConfig {
    /// Environment variable holding a Spotify Web API access token.
    pub spotify_token_env: String,
    /// Spotify Web API base URL.
    pub spotify_api_url: String,
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            spotify_token_env: "SPOTIFY_ACCESS_TOKEN".to_owned(),
            spotify_api_url: "https://api.spotify.com/v1".to_owned(),
        }
    }
}

impl OrionConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::OrionError::Config(e.to_string()))
    }

    /// Load the config at `path`, or defaults when the file does not exist.
    /// Environment overrides are applied afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &std::path::Path) -> crate::error::Result<Self> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::OrionError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> PathBuf {
        crate::orion_dirs::config_file()
    }

    /// Apply `OLLAMA_HOST`, `ORION_LLM_MODEL` and `CLAUDE_ENDPOINT`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(host) = non_empty("OLLAMA_HOST") {
            self.llm.api_url = host;
        }
        if let Some(model) = non_empty("ORION_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(endpoint) = non_empty("CLAUDE_ENDPOINT") {
            self.llm.cloud_url = endpoint;
        }
    }
}
