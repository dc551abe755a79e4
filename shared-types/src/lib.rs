//! Shared types between the wellness API and the web frontend
//!
//! These types are used by both:
//! - the axum service (native Rust)
//! - the quiz frontend (TypeScript, via the ts-rs bindings)
//!
//! Serializable with serde for JSON over HTTP

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Subject phrase every wellness fact conventionally starts with.
pub const SUBJECT_PHRASE: &str = "Your Outie";

// ============================================================================
// Requests / Responses
// ============================================================================

/// Body of `POST /generate-facts`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "wellness.ts")]
pub struct InnieRequest {
    /// Free-text description of the innie (work self)
    pub innie_traits: String,

    /// Raw quiz answers the narrative was built from. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub raw_selections: Option<HashMap<String, String>>,
}

impl InnieRequest {
    /// Build a request whose traits are the narrative of the quiz answers.
    pub fn from_selections(selections: &InnieSelections) -> Self {
        Self {
            innie_traits: selections.narrative(),
            raw_selections: Some(selections.to_map()),
        }
    }
}

/// Successful (possibly degraded) response of `POST /generate-facts`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "wellness.ts")]
pub struct WellnessFactResponse {
    pub facts: Vec<String>,
}

/// Error body for rejected requests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "wellness.ts")]
pub struct ApiErrorBody {
    pub error: String,
}

// ============================================================================
// Quiz
// ============================================================================

/// The five multiple-choice answers collected by the quiz
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "wellness.ts")]
pub struct InnieSelections {
    pub primary_work_skill: String,
    pub work_personality: String,
    pub office_habit: String,
    pub worst_fear: String,
    pub break_room_activity: String,
}

impl InnieSelections {
    /// Turn the answers into the trait description sent to the generator.
    pub fn narrative(&self) -> String {
        format!(
            "My innie's primary skill is {}. They are {} at work. \
             Their notable habit is that they {}. \
             Their biggest fear at work is {}, \
             and during breaks they can usually be found {}.",
            self.primary_work_skill,
            self.work_personality.to_lowercase(),
            self.office_habit.to_lowercase(),
            self.worst_fear.to_lowercase(),
            self.break_room_activity.to_lowercase(),
        )
    }

    fn to_map(&self) -> HashMap<String, String> {
        HashMap::from([
            (
                "primary_work_skill".to_string(),
                self.primary_work_skill.clone(),
            ),
            ("work_personality".to_string(), self.work_personality.clone()),
            ("office_habit".to_string(), self.office_habit.clone()),
            ("worst_fear".to_string(), self.worst_fear.clone()),
            (
                "break_room_activity".to_string(),
                self.break_room_activity.clone(),
            ),
        ])
    }
}

// ============================================================================
// Categories
// ============================================================================

/// Semantic tag used to diversify generated facts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "wellness.ts")]
pub enum FactCategory {
    MoralVirtues,
    SocialInteractions,
    PracticalSkills,
    AestheticAppreciation,
    PhysicalAbilities,
    CulturalKnowledge,
    QuirkyHabits,
    SocialStanding,
    EmotionalTraits,
    EtiquetteBehaviors,
    UnusualTalents,
    Possessions,
    AnimalRelations,
    Achievements,
    FuturePredictions,
}

impl FactCategory {
    /// Every category, in declaration order.
    pub const ALL: [FactCategory; 15] = [
        Self::MoralVirtues,
        Self::SocialInteractions,
        Self::PracticalSkills,
        Self::AestheticAppreciation,
        Self::PhysicalAbilities,
        Self::CulturalKnowledge,
        Self::QuirkyHabits,
        Self::SocialStanding,
        Self::EmotionalTraits,
        Self::EtiquetteBehaviors,
        Self::UnusualTalents,
        Self::Possessions,
        Self::AnimalRelations,
        Self::Achievements,
        Self::FuturePredictions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MoralVirtues => "moral_virtues",
            Self::SocialInteractions => "social_interactions",
            Self::PracticalSkills => "practical_skills",
            Self::AestheticAppreciation => "aesthetic_appreciation",
            Self::PhysicalAbilities => "physical_abilities",
            Self::CulturalKnowledge => "cultural_knowledge",
            Self::QuirkyHabits => "quirky_habits",
            Self::SocialStanding => "social_standing",
            Self::EmotionalTraits => "emotional_traits",
            Self::EtiquetteBehaviors => "etiquette_behaviors",
            Self::UnusualTalents => "unusual_talents",
            Self::Possessions => "possessions",
            Self::AnimalRelations => "animal_relations",
            Self::Achievements => "achievements",
            Self::FuturePredictions => "future_predictions",
        }
    }

    /// Parse a category tag, ignoring case and surrounding whitespace.
    pub fn parse(input: &str) -> Option<Self> {
        let token = input.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|category| category.as_str() == token)
    }
}

impl fmt::Display for FactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
