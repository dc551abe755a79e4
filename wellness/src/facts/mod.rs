//! Wellness fact generation
//!
//! The pipeline picks five categories, asks a [`FactGenerator`] for one fact
//! per category, rejects candidates that repeat earlier facts and falls back
//! to a pre-written pool when generation keeps failing or colliding.

pub mod categories;
pub mod fallback;
pub mod generator;
pub mod pipeline;
pub mod prompt;
pub mod similarity;

use serde::Serialize;
use shared_types::FactCategory;

pub use fallback::{FallbackPool, FALLBACK_FACTS};
pub use generator::{
    FactGenerator, GeneratedFact, GeneratorError, OpenAiFactGenerator, SharedFactGenerator,
};
pub use pipeline::{FactPipeline, FactRunOutcome};
pub use similarity::similarity;

/// Number of facts a run produces.
pub const FACTS_PER_RUN: usize = 5;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FactsError {
    #[error("Innie traits cannot be empty")]
    EmptyTraits,
}

/// Where an accepted fact came from
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FactSource {
    Generated(FactCategory),
    Fallback,
}

/// One entry of a run's fact collection
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WellnessFact {
    pub text: String,
    pub source: FactSource,
}

impl WellnessFact {
    pub fn generated(text: impl Into<String>, category: FactCategory) -> Self {
        Self {
            text: text.into(),
            source: FactSource::Generated(category),
        }
    }

    pub fn fallback(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: FactSource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.source, FactSource::Fallback)
    }
}
