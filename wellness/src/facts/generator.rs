//! Fact generator capability and its OpenAI-compatible implementation.
//!
//! The pipeline only sees [`FactGenerator`]; the HTTP round-trip, prompt
//! rendering and response parsing stay behind it so runs can be driven by
//! deterministic stubs in tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use shared_types::FactCategory;
use tracing::debug;

use super::prompt::build_fact_prompt;
use crate::config::Config;

pub type SharedFactGenerator = Arc<dyn FactGenerator>;

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("missing API key env var: {0}")]
    MissingApiKey(&'static str),
    #[error("generator request failed: {0}")]
    Request(String),
    #[error("generator returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("generator response parse failed: {0}")]
    Parse(String),
}

/// A candidate fact as returned by a generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFact {
    pub fact: String,
    pub category: FactCategory,
}

#[async_trait]
pub trait FactGenerator: Send + Sync {
    /// Produce one fact for `category`, steering away from `prior_facts`.
    async fn generate(
        &self,
        traits: &str,
        category: FactCategory,
        prior_facts: &[String],
    ) -> Result<GeneratedFact, GeneratorError>;
}

/// Generator backed by an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiFactGenerator {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl OpenAiFactGenerator {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self, GeneratorError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GeneratorError::Request(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            temperature,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, GeneratorError> {
        Self::new(
            config.openai_base_url.clone(),
            config.openai_api_key.clone(),
            config.model.clone(),
            config.temperature,
            config.llm_timeout,
        )
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl FactGenerator for OpenAiFactGenerator {
    async fn generate(
        &self,
        traits: &str,
        category: FactCategory,
        prior_facts: &[String],
    ) -> Result<GeneratedFact, GeneratorError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GeneratorError::MissingApiKey("OPENAI_API_KEY"))?;

        let seed: u32 = rand::rng().random_range(1..=1_000_000);
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "seed": seed,
            "messages": [
                {
                    "role": "user",
                    "content": build_fact_prompt(traits, category, prior_facts),
                }
            ],
        });

        debug!(
            category = %category,
            prior_facts = prior_facts.len(),
            seed,
            model = %self.model,
            "requesting wellness fact"
        );

        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GeneratorError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Status { status, body });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| GeneratorError::Parse(e.to_string()))?;
        parse_completion(&payload, category)
    }
}

/// Extract the fact from a chat-completions payload.
pub(crate) fn parse_completion(
    payload: &Value,
    requested: FactCategory,
) -> Result<GeneratedFact, GeneratorError> {
    let content = payload
        .pointer("/choices/0/message/content")
        .ok_or_else(|| GeneratorError::Parse("missing choices[0].message.content".to_string()))?;
    let text = message_text(content);
    parse_fact_content(&text, requested)
}

/// Message content is either a string or a list of typed parts; only text
/// parts are kept.
fn message_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| match part {
                Value::String(text) => Some(text.as_str()),
                Value::Object(_) if part.get("type").and_then(Value::as_str) == Some("text") => {
                    part.get("text").and_then(Value::as_str)
                }
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Parse the model's answer. JSON `{"fact", "category"}` is preferred; any
/// other non-empty text is taken as the fact itself.
pub(crate) fn parse_fact_content(
    content: &str,
    requested: FactCategory,
) -> Result<GeneratedFact, GeneratorError> {
    let unfenced = strip_code_fence(content.trim());

    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(unfenced) {
        let fact = obj
            .get("fact")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|fact| !fact.is_empty());
        if let Some(fact) = fact {
            let category = obj
                .get("category")
                .and_then(Value::as_str)
                .and_then(FactCategory::parse)
                .unwrap_or(requested);
            return Ok(GeneratedFact {
                fact: fact.to_string(),
                category,
            });
        }
    }

    let fact = unfenced.trim().trim_matches('"').trim();
    if fact.is_empty() {
        return Err(GeneratorError::Parse("empty completion".to_string()));
    }
    Ok(GeneratedFact {
        fact: fact.to_string(),
        category: requested,
    })
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an optional language tag on the opening fence line. A one-line
    // fence only carries a tag when JSON follows it.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => match rest.split_once(char::is_whitespace) {
            Some((tag, json)) if !tag.starts_with('{') && json.trim_start().starts_with('{') => {
                json
            }
            _ => rest,
        },
    };
    body.trim_end().trim_end_matches("```").trim()
}
