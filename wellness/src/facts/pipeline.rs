//! Fact pipeline orchestration.
//!
//! One run walks `SELECTING_CATEGORY -> GENERATING -> SCORING -> {ACCEPTED |
//! RETRY | FALLBACK}` for each selected category, then tops the collection up
//! to [`FACTS_PER_RUN`]. Attempts are strictly sequential: every novelty check
//! depends on all facts accepted before it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use shared_types::FactCategory;
use tracing::{debug, info, warn};
use ulid::Ulid;

use super::categories::{random_category, select_categories};
use super::fallback::{FallbackDraws, FallbackPool};
use super::generator::{GeneratedFact, SharedFactGenerator};
use super::similarity::similarity;
use super::{FactsError, WellnessFact, FACTS_PER_RUN};

/// Scores strictly above this mark a candidate as a repeat.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.5;
/// Generation attempts per category slot before falling back.
pub const MAX_ATTEMPTS_PER_CATEGORY: usize = 3;
/// Extra generator calls allowed when the collection is still short after
/// every selected category was visited.
pub const TOP_UP_CALL_BUDGET: usize = 3;

#[derive(Clone)]
pub struct FactPipeline {
    generator: SharedFactGenerator,
    fallback: FallbackPool,
    categories: Vec<FactCategory>,
    similarity_threshold: f64,
}

/// Result of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct FactRunOutcome {
    pub run_id: String,
    pub facts: Vec<WellnessFact>,
    pub generator_calls: usize,
    /// True when no generator call succeeded and the facts are the head of
    /// the fallback pool.
    pub degraded: bool,
}

impl FactRunOutcome {
    pub fn texts(&self) -> Vec<String> {
        self.facts.iter().map(|fact| fact.text.clone()).collect()
    }

    pub fn into_texts(self) -> Vec<String> {
        self.facts.into_iter().map(|fact| fact.text).collect()
    }

    pub fn fallback_count(&self) -> usize {
        self.facts.iter().filter(|fact| fact.is_fallback()).count()
    }

    pub fn generated_count(&self) -> usize {
        self.facts.len() - self.fallback_count()
    }
}

/// How a category slot was filled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotOutcome {
    Accepted,
    Fallback,
    /// Pool exhausted; the last rejected candidate was kept anyway.
    Duplicate,
    Skipped,
}

/// Request-scoped state of one run.
struct FactRun<'a> {
    run_id: Ulid,
    traits: &'a str,
    accepted: Vec<WellnessFact>,
    draws: FallbackDraws<'a>,
    generator_calls: usize,
    generator_successes: usize,
}

impl FactRun<'_> {
    fn prior_facts(&self) -> Vec<String> {
        self.accepted.iter().map(|fact| fact.text.clone()).collect()
    }

    fn is_full(&self) -> bool {
        self.accepted.len() >= FACTS_PER_RUN
    }
}

impl FactPipeline {
    pub fn new(generator: SharedFactGenerator) -> Self {
        Self {
            generator,
            fallback: FallbackPool::default(),
            categories: FactCategory::ALL.to_vec(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }

    pub fn with_fallback_pool(mut self, fallback: FallbackPool) -> Self {
        self.fallback = fallback;
        self
    }

    /// Restrict the categories runs choose from.
    pub fn with_categories(mut self, categories: Vec<FactCategory>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    /// Generate a fresh collection of facts for `traits`.
    pub async fn run(&self, traits: &str) -> Result<FactRunOutcome, FactsError> {
        let mut rng = StdRng::from_rng(&mut rand::rng());
        self.run_with_rng(traits, &mut rng).await
    }

    /// Same as [`run`](Self::run) with a caller-provided random source.
    pub async fn run_with_rng<R>(
        &self,
        traits: &str,
        rng: &mut R,
    ) -> Result<FactRunOutcome, FactsError>
    where
        R: Rng + Send + ?Sized,
    {
        if traits.trim().is_empty() {
            return Err(FactsError::EmptyTraits);
        }

        let mut run = FactRun {
            run_id: Ulid::new(),
            traits,
            accepted: Vec::with_capacity(FACTS_PER_RUN),
            draws: self.fallback.draws(),
            generator_calls: 0,
            generator_successes: 0,
        };

        let selected = select_categories(&self.categories, FACTS_PER_RUN, rng);
        let names: Vec<&str> = selected.iter().map(FactCategory::as_str).collect();
        info!(
            run_id = %run.run_id,
            categories = ?names,
            threshold = self.similarity_threshold,
            "starting fact run"
        );

        for category in selected {
            let outcome = self.fill_slot(&mut run, category, rng).await;
            debug!(run_id = %run.run_id, category = %category, outcome = ?outcome, "slot done");
        }

        if !run.is_full() {
            self.top_up(&mut run, rng).await;
        }

        if run.generator_successes == 0 && !self.fallback.is_empty() {
            warn!(
                run_id = %run.run_id,
                generator_calls = run.generator_calls,
                "no generator call succeeded; serving fallback facts"
            );
            return Ok(FactRunOutcome {
                run_id: run.run_id.to_string(),
                facts: self.fallback.first(FACTS_PER_RUN),
                generator_calls: run.generator_calls,
                degraded: true,
            });
        }

        let outcome = FactRunOutcome {
            run_id: run.run_id.to_string(),
            facts: run.accepted,
            generator_calls: run.generator_calls,
            degraded: false,
        };
        info!(
            run_id = %outcome.run_id,
            facts = outcome.facts.len(),
            generated = outcome.generated_count(),
            fallback = outcome.fallback_count(),
            generator_calls = outcome.generator_calls,
            "fact run complete"
        );
        Ok(outcome)
    }

    async fn fill_slot<R>(
        &self,
        run: &mut FactRun<'_>,
        category: FactCategory,
        rng: &mut R,
    ) -> SlotOutcome
    where
        R: Rng + Send + ?Sized,
    {
        let mut last_rejected: Option<GeneratedFact> = None;

        for attempt in 1..=MAX_ATTEMPTS_PER_CATEGORY {
            let Some(candidate) = self.attempt(run, category).await else {
                continue;
            };

            if let Some(score) = self.collision_score(&run.accepted, &candidate.fact) {
                debug!(
                    run_id = %run.run_id,
                    category = %category,
                    attempt,
                    score,
                    "candidate too similar to an accepted fact"
                );
                last_rejected = Some(candidate);
                continue;
            }

            run.accepted
                .push(WellnessFact::generated(candidate.fact, candidate.category));
            return SlotOutcome::Accepted;
        }

        if let Some(fact) = run.draws.draw(&run.accepted, rng) {
            run.accepted.push(fact);
            return SlotOutcome::Fallback;
        }

        match last_rejected {
            Some(candidate) => {
                warn!(
                    run_id = %run.run_id,
                    category = %category,
                    "fallback pool exhausted; keeping a similar fact"
                );
                run.accepted
                    .push(WellnessFact::generated(candidate.fact, candidate.category));
                SlotOutcome::Duplicate
            }
            None => SlotOutcome::Skipped,
        }
    }

    async fn top_up<R>(&self, run: &mut FactRun<'_>, rng: &mut R)
    where
        R: Rng + Send + ?Sized,
    {
        let mut calls = 0;
        let mut rejected: Vec<GeneratedFact> = Vec::new();
        while !run.is_full() && calls < TOP_UP_CALL_BUDGET {
            let Some(category) = random_category(&self.categories, rng) else {
                break;
            };
            calls += 1;

            if let Some(candidate) = self.attempt(run, category).await {
                if self.collision_score(&run.accepted, &candidate.fact).is_none() {
                    run.accepted
                        .push(WellnessFact::generated(candidate.fact, candidate.category));
                } else {
                    rejected.push(candidate);
                }
            }
        }

        while !run.is_full() {
            match run.draws.draw(&run.accepted, rng) {
                Some(fact) => run.accepted.push(fact),
                None => break,
            }
        }

        // Pool exhausted: similar candidates beat a short collection.
        let mut rejected = rejected.into_iter();
        while !run.is_full() {
            let Some(candidate) = rejected.next() else {
                break;
            };
            debug!(
                run_id = %run.run_id,
                category = %candidate.category,
                "fallback pool exhausted; keeping a similar top-up fact"
            );
            run.accepted
                .push(WellnessFact::generated(candidate.fact, candidate.category));
        }

        if !run.is_full() {
            warn!(
                run_id = %run.run_id,
                facts = run.accepted.len(),
                "no source left to complete the fact collection"
            );
        }
    }

    /// One generator call. Failures are logged and reported as `None`.
    async fn attempt(
        &self,
        run: &mut FactRun<'_>,
        category: FactCategory,
    ) -> Option<GeneratedFact> {
        let prior = run.prior_facts();
        run.generator_calls += 1;
        match self.generator.generate(run.traits, category, &prior).await {
            Ok(candidate) => {
                run.generator_successes += 1;
                Some(candidate)
            }
            Err(e) => {
                warn!(
                    run_id = %run.run_id,
                    category = %category,
                    error = %e,
                    "fact generation failed"
                );
                None
            }
        }
    }

    /// Highest similarity against accepted facts, if it crosses the threshold.
    fn collision_score(&self, accepted: &[WellnessFact], candidate: &str) -> Option<f64> {
        accepted
            .iter()
            .map(|fact| similarity(&fact.text, candidate))
            .filter(|score| *score > self.similarity_threshold)
            .reduce(f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::generator::{FactGenerator, GeneratorError};
    use crate::facts::FALLBACK_FACTS;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};

    /// Returns the same fact for every call.
    struct ConstantGenerator {
        fact: String,
        calls: Mutex<Vec<FactCategory>>,
    }

    impl ConstantGenerator {
        fn new(fact: &str) -> Arc<Self> {
            Arc::new(Self {
                fact: fact.to_string(),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<FactCategory> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FactGenerator for ConstantGenerator {
        async fn generate(
            &self,
            _traits: &str,
            category: FactCategory,
            _prior_facts: &[String],
        ) -> Result<GeneratedFact, GeneratorError> {
            self.calls.lock().unwrap().push(category);
            Ok(GeneratedFact {
                fact: self.fact.clone(),
                category,
            })
        }
    }

    /// Fails every call.
    #[derive(Default)]
    struct FailingGenerator {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl FactGenerator for FailingGenerator {
        async fn generate(
            &self,
            _traits: &str,
            _category: FactCategory,
            _prior_facts: &[String],
        ) -> Result<GeneratedFact, GeneratorError> {
            *self.calls.lock().unwrap() += 1;
            Err(GeneratorError::Request("connection refused".to_string()))
        }
    }

    /// Distinct fact per category; records the prior facts it was shown.
    #[derive(Default)]
    struct DistinctGenerator {
        priors: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl FactGenerator for DistinctGenerator {
        async fn generate(
            &self,
            _traits: &str,
            category: FactCategory,
            prior_facts: &[String],
        ) -> Result<GeneratedFact, GeneratorError> {
            self.priors.lock().unwrap().push(prior_facts.to_vec());
            Ok(GeneratedFact {
                fact: format!(
                    "Your Outie specializes in {}.",
                    category.as_str().replace('_', " ")
                ),
                category,
            })
        }
    }

    /// Plays back a script of results, then repeats the last one.
    struct ScriptedGenerator {
        script: Mutex<Vec<Result<String, ()>>>,
    }

    impl ScriptedGenerator {
        fn new(script: Vec<Result<&str, ()>>) -> Arc<Self> {
            let mut script: Vec<Result<String, ()>> =
                script.into_iter().map(|r| r.map(ToString::to_string)).collect();
            script.reverse();
            Arc::new(Self {
                script: Mutex::new(script),
            })
        }
    }

    #[async_trait]
    impl FactGenerator for ScriptedGenerator {
        async fn generate(
            &self,
            _traits: &str,
            category: FactCategory,
            _prior_facts: &[String],
        ) -> Result<GeneratedFact, GeneratorError> {
            let mut script = self.script.lock().unwrap();
            let next = if script.len() > 1 {
                script.pop().unwrap()
            } else {
                script[0].clone()
            };
            next.map(|fact| GeneratedFact { fact, category })
                .map_err(|_| GeneratorError::Status {
                    status: 503,
                    body: "overloaded".to_string(),
                })
        }
    }

    fn seeded() -> StdRng {
        StdRng::seed_from_u64(1234)
    }

    #[tokio::test]
    async fn test_empty_traits_rejected_before_any_call() {
        let generator = ConstantGenerator::new("Your Outie is kind.");
        let pipeline = FactPipeline::new(generator.clone());

        for traits in ["", "   ", "\n\t"] {
            let err = pipeline
                .run_with_rng(traits, &mut seeded())
                .await
                .unwrap_err();
            assert_eq!(err, FactsError::EmptyTraits);
        }
        assert!(generator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_distinct_facts_are_all_accepted() {
        let generator = Arc::new(DistinctGenerator::default());
        let pipeline = FactPipeline::new(generator.clone());

        let outcome = pipeline
            .run_with_rng("Detail-oriented", &mut seeded())
            .await
            .unwrap();

        assert_eq!(outcome.facts.len(), 5);
        assert_eq!(outcome.generated_count(), 5);
        assert_eq!(outcome.generator_calls, 5);
        assert!(!outcome.degraded);

        let distinct: HashSet<String> = outcome.texts().into_iter().collect();
        assert_eq!(distinct.len(), 5);
    }

    #[tokio::test]
    async fn test_generator_sees_accepted_facts_in_order() {
        let generator = Arc::new(DistinctGenerator::default());
        let pipeline = FactPipeline::new(generator.clone());

        let outcome = pipeline
            .run_with_rng("Detail-oriented", &mut seeded())
            .await
            .unwrap();

        let priors = generator.priors.lock().unwrap().clone();
        assert_eq!(priors.len(), 5);
        for (idx, prior) in priors.iter().enumerate() {
            assert_eq!(prior, &outcome.texts()[..idx].to_vec());
        }
    }

    #[tokio::test]
    async fn test_constant_generator_gets_fallbacks_for_later_slots() {
        let generator = ConstantGenerator::new("Your Outie alphabetizes spice jars.");
        let pipeline = FactPipeline::new(generator.clone());

        let outcome = pipeline
            .run_with_rng("Detail-oriented, rule-follower", &mut seeded())
            .await
            .unwrap();

        assert_eq!(outcome.facts.len(), 5);
        assert_eq!(outcome.facts[0].text, "Your Outie alphabetizes spice jars.");
        assert_eq!(outcome.generated_count(), 1);
        assert_eq!(outcome.fallback_count(), 4);
        assert!(!outcome.degraded);

        let distinct: HashSet<String> = outcome.texts().into_iter().collect();
        assert_eq!(distinct.len(), 5);
        for fact in &outcome.facts[1..] {
            assert!(FALLBACK_FACTS.contains(&fact.text.as_str()));
        }

        // 1 accepted call + 3 rejected attempts for each of the other 4 slots
        assert_eq!(outcome.generator_calls, 13);
    }

    #[tokio::test]
    async fn test_never_more_than_three_attempts_per_slot() {
        let generator = ConstantGenerator::new("Your Outie alphabetizes spice jars.");
        let pipeline = FactPipeline::new(generator.clone());

        pipeline
            .run_with_rng("Detail-oriented", &mut seeded())
            .await
            .unwrap();

        let mut per_category: HashMap<FactCategory, usize> = HashMap::new();
        for category in generator.calls() {
            *per_category.entry(category).or_default() += 1;
        }
        assert_eq!(per_category.len(), 5);
        assert!(per_category.values().all(|count| *count <= MAX_ATTEMPTS_PER_CATEGORY));
    }

    #[tokio::test]
    async fn test_total_failure_returns_head_of_pool() {
        let generator = Arc::new(FailingGenerator::default());
        let pipeline = FactPipeline::new(generator.clone());

        let outcome = pipeline
            .run_with_rng("Quiet", &mut seeded())
            .await
            .unwrap();

        assert!(outcome.degraded);
        assert_eq!(outcome.texts(), FALLBACK_FACTS[..5].to_vec());
        assert_eq!(*generator.calls.lock().unwrap(), 15);
    }

    #[tokio::test]
    async fn test_total_failure_with_small_pool_returns_whole_pool() {
        let pool = FallbackPool::new(["Your Outie is kind.", "Your Outie values water."]);
        let pipeline =
            FactPipeline::new(Arc::new(FailingGenerator::default())).with_fallback_pool(pool);

        let outcome = pipeline
            .run_with_rng("Quiet", &mut seeded())
            .await
            .unwrap();

        assert!(outcome.degraded);
        assert_eq!(
            outcome.texts(),
            vec!["Your Outie is kind.", "Your Outie values water."]
        );
    }

    #[tokio::test]
    async fn test_exhausted_pool_accepts_duplicates() {
        let pool = FallbackPool::new(["Your Outie is kind."]);
        let pipeline =
            FactPipeline::new(ConstantGenerator::new("Your Outie alphabetizes spice jars."))
                .with_fallback_pool(pool);

        let outcome = pipeline
            .run_with_rng("Detail-oriented", &mut seeded())
            .await
            .unwrap();

        assert_eq!(outcome.facts.len(), 5);
        assert_eq!(outcome.fallback_count(), 1);
        let duplicates = outcome
            .facts
            .iter()
            .filter(|fact| fact.text == "Your Outie alphabetizes spice jars.")
            .count();
        assert_eq!(duplicates, 4);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried_within_slot() {
        let generator = ScriptedGenerator::new(vec![
            Err(()),
            Ok("Your Outie waits patiently in lines."),
            Ok("Your Outie owns many records."),
            Ok("Your Outie survived several earthquakes."),
            Ok("Your Outie understands insects thoroughly."),
            Ok("Your Outie likes radar sounds."),
        ]);
        let pipeline = FactPipeline::new(generator);

        let outcome = pipeline
            .run_with_rng("Quiet", &mut seeded())
            .await
            .unwrap();

        assert_eq!(outcome.generated_count(), 5);
        assert_eq!(outcome.generator_calls, 6);
        assert_eq!(outcome.facts[0].text, "Your Outie waits patiently in lines.");
    }

    #[tokio::test]
    async fn test_similar_candidate_is_retried_then_accepted() {
        let generator = ScriptedGenerator::new(vec![
            Ok("Your Outie alphabetizes spice jars."),
            Ok("Your Outie alphabetizes spice jars carefully."),
            Ok("Your Outie owns many records."),
            Ok("Your Outie survived several earthquakes."),
            Ok("Your Outie understands insects thoroughly."),
            Ok("Your Outie likes radar sounds."),
        ]);
        let pipeline = FactPipeline::new(generator);

        let outcome = pipeline
            .run_with_rng("Quiet", &mut seeded())
            .await
            .unwrap();

        assert_eq!(outcome.generated_count(), 5);
        assert_eq!(outcome.generator_calls, 6);
        assert!(!outcome
            .texts()
            .contains(&"Your Outie alphabetizes spice jars carefully.".to_string()));
    }

    #[tokio::test]
    async fn test_threshold_is_configurable() {
        // "spice jars" overlap scores 2/4 = 0.5 against the first fact
        let generator = ScriptedGenerator::new(vec![
            Ok("Your Outie alphabetizes spice jars."),
            Ok("Your Outie paints spice jars."),
            Ok("Your Outie owns many records."),
            Ok("Your Outie survived several earthquakes."),
            Ok("Your Outie understands insects thoroughly."),
            Ok("Your Outie likes radar sounds."),
        ]);
        let strict = FactPipeline::new(generator).with_similarity_threshold(0.25);

        let outcome = strict.run_with_rng("Quiet", &mut seeded()).await.unwrap();
        assert!(!outcome.texts().contains(&"Your Outie paints spice jars.".to_string()));
        assert_eq!(strict.similarity_threshold(), 0.25);
    }

    #[tokio::test]
    async fn test_short_category_list_is_topped_up() {
        let generator = Arc::new(DistinctGenerator::default());
        let pipeline = FactPipeline::new(generator.clone())
            .with_categories(vec![FactCategory::Possessions, FactCategory::Achievements]);

        let outcome = pipeline
            .run_with_rng("Quiet", &mut seeded())
            .await
            .unwrap();

        // Two categories give two novel facts; top-up calls only repeat them,
        // so the pool completes the collection.
        assert_eq!(outcome.facts.len(), 5);
        assert_eq!(outcome.generated_count(), 2);
        assert_eq!(outcome.fallback_count(), 3);
        assert_eq!(outcome.generator_calls, 2 + TOP_UP_CALL_BUDGET);
    }

    #[tokio::test]
    async fn test_top_up_keeps_similar_facts_when_pool_is_empty() {
        let pipeline = FactPipeline::new(Arc::new(DistinctGenerator::default()))
            .with_categories(vec![FactCategory::Possessions])
            .with_fallback_pool(FallbackPool::new(Vec::<String>::new()));

        let outcome = pipeline
            .run_with_rng("Quiet", &mut seeded())
            .await
            .unwrap();

        // 1 accepted fact plus every top-up repeat
        assert_eq!(outcome.facts.len(), 1 + TOP_UP_CALL_BUDGET);
        assert_eq!(outcome.generated_count(), 1 + TOP_UP_CALL_BUDGET);
        assert!(!outcome.degraded);
    }

    #[tokio::test]
    async fn test_constant_generator_with_empty_pool_fills_from_top_up() {
        let generator = ConstantGenerator::new("Your Outie alphabetizes spice jars.");
        let pipeline = FactPipeline::new(generator.clone())
            .with_categories(vec![FactCategory::Possessions])
            .with_fallback_pool(FallbackPool::new(Vec::<String>::new()));

        let outcome = pipeline
            .run_with_rng("Detail-oriented", &mut seeded())
            .await
            .unwrap();

        assert_eq!(outcome.facts.len(), 1 + TOP_UP_CALL_BUDGET);
        assert!(outcome
            .texts()
            .iter()
            .all(|text| text == "Your Outie alphabetizes spice jars."));
        assert_eq!(generator.calls().len(), 1 + TOP_UP_CALL_BUDGET);
    }

    #[tokio::test]
    async fn test_no_source_left_returns_what_was_accumulated() {
        let pipeline = FactPipeline::new(Arc::new(FailingGenerator::default()))
            .with_categories(vec![FactCategory::Possessions])
            .with_fallback_pool(FallbackPool::new(Vec::<String>::new()));

        let outcome = pipeline
            .run_with_rng("Quiet", &mut seeded())
            .await
            .unwrap();

        assert!(outcome.facts.is_empty());
        assert_eq!(outcome.generator_calls, MAX_ATTEMPTS_PER_CATEGORY + TOP_UP_CALL_BUDGET);
    }

    #[tokio::test]
    async fn test_run_uses_its_own_state() {
        let pipeline =
            FactPipeline::new(ConstantGenerator::new("Your Outie alphabetizes spice jars."));

        let first = pipeline.run("Quiet").await.unwrap();
        let second = pipeline.run("Quiet").await.unwrap();

        assert_ne!(first.run_id, second.run_id);
        assert_eq!(first.facts.len(), 5);
        assert_eq!(second.facts.len(), 5);
        assert_eq!(second.generated_count(), 1);
    }
}
