use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use shared_types::FactCategory;

/// Pick up to `count` distinct categories from `pool` in random order.
///
/// Uniform shuffle of the whole pool truncated to `min(count, pool.len())`.
/// Duplicate entries in `pool` are collapsed first so the result never
/// repeats a category.
pub fn select_categories<R: Rng + ?Sized>(
    pool: &[FactCategory],
    count: usize,
    rng: &mut R,
) -> Vec<FactCategory> {
    let mut candidates: Vec<FactCategory> = Vec::with_capacity(pool.len());
    for category in pool {
        if !candidates.contains(category) {
            candidates.push(*category);
        }
    }
    candidates.shuffle(rng);
    candidates.truncate(count);
    candidates
}

/// Pick a single category, or `None` when `pool` is empty.
pub fn random_category<R: Rng + ?Sized>(
    pool: &[FactCategory],
    rng: &mut R,
) -> Option<FactCategory> {
    pool.choose(rng).copied()
}
