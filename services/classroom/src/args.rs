use anyhow::{Context, Result};
use classroom_core::llm_client::{CompletionOptions, Provider};
use classroom_core::transcript::ArtifactMeta;
use clap::Parser;
use std::path::PathBuf;

/// Simulate a classroom lecture and export the transcript.
#[derive(Debug, Parser)]
#[command(name = "classroom", version, about)]
pub struct Args {
    /// Seeds student selection and classification fallbacks.
    #[arg(long, default_value_t = 555)]
    pub seed: u64,

    /// Chat model used by every agent.
    #[arg(long, default_value = "gpt-4")]
    pub model: String,

    /// Size of the student pool.
    #[arg(long, default_value_t = 4, value_parser = parse_positive)]
    pub num_students: usize,

    /// Teaching turns before the closing statement.
    #[arg(long, default_value_t = 20, value_parser = parse_positive)]
    pub max_turns: usize,

    /// Topic of the lecture.
    #[arg(long)]
    pub topic: String,

    /// Directory the transcript is written to.
    #[arg(long, default_value = "data")]
    pub output_dir: PathBuf,

    #[arg(long, default_value = "openai", value_parser = ["openai", "gemini"])]
    pub provider: String,

    /// Directory of `<role>.md` prompt overrides.
    #[arg(long)]
    pub prompts: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    /// Sampling temperature for every agent; the provider default when unset.
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Upper bound on tokens per reply.
    #[arg(long)]
    pub max_tokens: Option<u32>,
}

fn parse_positive(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("'{value}' is not a positive number")),
    }
}

impl Args {
    pub fn provider(&self) -> Provider {
        Provider::from_name(&self.provider)
    }

    /// Reads the key for the selected provider from the environment.
    pub fn api_key(&self) -> Result<String> {
        let var = match self.provider() {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
        };
        std::env::var(var).with_context(|| format!("{var} must be set for '{}'", self.provider))
    }

    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub fn artifact_meta(&self) -> ArtifactMeta {
        ArtifactMeta {
            seed: self.seed,
            model: self.model.clone(),
            num_students: self.num_students,
            max_turns: self.max_turns,
            topic: self.topic.clone(),
        }
    }
}
