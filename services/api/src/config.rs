//! Server settings, read once from the environment at startup.

use classroom_core::llm_client::CompletionOptions;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;

pub use classroom_core::llm_client::Provider;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    MissingVar(String),
    #[error("{0} has an unusable value: {1}")]
    InvalidValue(String, String),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub provider: Provider,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub chat_model: String,
    pub log_level: Level,
    /// Directory of `<role>.md` prompt overrides.
    pub prompts_path: Option<PathBuf>,
    /// Teaching turns per socket session before the review is sent.
    pub stream_max_turns: usize,
    /// Fixes the supporter's classification fallback when set.
    pub seed: Option<u64>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Parses `name` when it is set. Unset means `None`, a bad value is an error.
fn optional<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("'{raw}': {e}"))),
        Err(_) => Ok(None),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Tests control the environment themselves.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let provider = Provider::from_name(
            &std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string()),
        );
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let gemini_api_key = std::env::var("GEMINI_API_KEY").ok();
        let (key_var, key) = match provider {
            Provider::OpenAI => ("OPENAI_API_KEY", &openai_api_key),
            Provider::Gemini => ("GEMINI_API_KEY", &gemini_api_key),
        };
        if key.is_none() {
            return Err(ConfigError::MissingVar(key_var.to_string()));
        }

        let stream_max_turns = optional::<usize>("STREAM_MAX_TURNS")?.unwrap_or(5);
        if stream_max_turns == 0 {
            return Err(ConfigError::InvalidValue(
                "STREAM_MAX_TURNS".to_string(),
                "a session needs at least one turn".to_string(),
            ));
        }

        Ok(Self {
            bind_address: optional("BIND_ADDRESS")?
                .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000))),
            provider,
            openai_api_key,
            gemini_api_key,
            chat_model: std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4".to_string()),
            log_level: optional("RUST_LOG")?.unwrap_or(Level::INFO),
            prompts_path: std::env::var("PROMPTS_PATH").ok().map(PathBuf::from),
            stream_max_turns,
            seed: optional("SEED")?,
            temperature: optional("TEMPERATURE")?,
            max_tokens: optional("MAX_TOKENS")?,
        })
    }

    /// The API key for the configured provider.
    pub fn api_key(&self) -> Option<&str> {
        match self.provider {
            Provider::OpenAI => self.openai_api_key.as_deref(),
            Provider::Gemini => self.gemini_api_key.as_deref(),
        }
    }

    /// Sampling options shared by every agent the server creates.
    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}
