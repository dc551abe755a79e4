use std::time::Duration;

use crate::facts::pipeline::DEFAULT_SIMILARITY_THRESHOLD;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";

#[derive(Debug, Clone)]
pub struct Config {
    /// Port the API listens on
    pub port: u16,
    /// Bearer token for the chat-completions endpoint. Without it every
    /// generation attempt fails and requests are served from the fallback pool.
    pub openai_api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API (no trailing `/chat/completions`)
    pub openai_base_url: String,
    /// Model id sent with every completion request
    pub model: String,
    /// Sampling temperature for fact generation
    pub temperature: f32,
    /// Jaccard score above which a candidate counts as a repeat
    pub similarity_threshold: f64,
    /// Upper bound on a single completion round-trip
    pub llm_timeout: Duration,
    /// Frontend origins allowed by CORS
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let similarity_threshold = env_parse(
            "WELLNESS_SIMILARITY_THRESHOLD",
            DEFAULT_SIMILARITY_THRESHOLD,
        )?;
        if !(0.0..=1.0).contains(&similarity_threshold) {
            return Err(anyhow::anyhow!(
                "WELLNESS_SIMILARITY_THRESHOLD must be within [0, 1], got {similarity_threshold}"
            ));
        }

        Ok(Self {
            port: env_parse("WELLNESS_PORT", 8080)?,
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            openai_base_url: env_str("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            model: env_str("WELLNESS_MODEL", DEFAULT_MODEL),
            temperature: env_parse("WELLNESS_TEMPERATURE", 0.8)?,
            similarity_threshold,
            llm_timeout: Duration::from_secs(env_parse("WELLNESS_LLM_TIMEOUT_SECS", 30)?),
            allowed_origins: env_csv(
                "WELLNESS_ALLOWED_ORIGINS",
                &["http://localhost:3000", "http://127.0.0.1:3000"],
            ),
        })
    }
}

fn env_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse env var {key}={val}: {e}")),
        Err(_) => Ok(default),
    }
}

fn env_csv(key: &str, default: &[&str]) -> Vec<String> {
    match std::env::var(key) {
        Ok(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect(),
        Err(_) => default.iter().map(|s| (*s).to_string()).collect(),
    }
}
