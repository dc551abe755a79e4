//! Pre-written facts served when generation fails or keeps colliding.

use std::collections::HashSet;
use std::sync::Arc;

use rand::seq::IndexedRandom;
use rand::Rng;

use super::WellnessFact;

pub const FALLBACK_FACTS: &[&str] = &[
    "Your Outie is kind.",
    "Your Outie has brightened people's days by merely smiling.",
    "Your Outie can parallel park in less than 20 seconds.",
    "Your Outie knows a beautiful rock from a plain one.",
    "Your Outie can set up a tent in under three minutes.",
    "Your Outie values water.",
    "Your Outie is splendid and can swim gracefully and well.",
    "Your Outie once captured a butterfly.",
    "Your Outie has both zaz and pep.",
    "Your Outie waits patiently in lines.",
    "Your Outie makes pleasing noises.",
    "Your Outie can leap admirably but does not do so to show off.",
    "Your Outie is admired by domesticated animals.",
    "Your Outie is the second tallest of their friend group.",
    "Your Outie listens to music while shaving, but not while showering.",
    "Your Outie prefers two scoops of ice cream in a serving, but they must be the same flavor.",
];

/// Immutable, ordered set of fallback facts. Cheap to clone.
#[derive(Debug, Clone)]
pub struct FallbackPool {
    entries: Arc<[String]>,
}

impl Default for FallbackPool {
    fn default() -> Self {
        Self::new(FALLBACK_FACTS.iter().copied())
    }
}

impl FallbackPool {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The first `n` entries in pool order (fewer if the pool is smaller).
    pub fn first(&self, n: usize) -> Vec<WellnessFact> {
        self.entries
            .iter()
            .take(n)
            .map(|text| WellnessFact::fallback(text.clone()))
            .collect()
    }

    /// Start a per-run draw that hands out each entry at most once.
    pub fn draws(&self) -> FallbackDraws<'_> {
        FallbackDraws {
            pool: self,
            drawn: HashSet::new(),
        }
    }
}

/// Run-scoped view of a [`FallbackPool`] that tracks what was handed out.
#[derive(Debug)]
pub struct FallbackDraws<'a> {
    pool: &'a FallbackPool,
    drawn: HashSet<usize>,
}

impl FallbackDraws<'_> {
    /// Draw a random entry that was not drawn before in this run and is not
    /// already part of `accepted`. `None` once the pool is exhausted.
    pub fn draw<R: Rng + ?Sized>(
        &mut self,
        accepted: &[WellnessFact],
        rng: &mut R,
    ) -> Option<WellnessFact> {
        let available: Vec<usize> = (0..self.pool.entries.len())
            .filter(|idx| !self.drawn.contains(idx))
            .filter(|idx| {
                let text = &self.pool.entries[*idx];
                !accepted.iter().any(|fact| fact.text == *text)
            })
            .collect();

        let idx = *available.choose(rng)?;
        self.drawn.insert(idx);
        Some(WellnessFact::fallback(self.pool.entries[idx].clone()))
    }

    #[cfg(test)]
    fn drawn_count(&self) -> usize {
        self.drawn.len()
    }
}
