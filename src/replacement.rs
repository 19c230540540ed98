use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{cache::CacheSet, config::ReplacementKind};

/// Chooses which way of a full set gets overwritten on a fill.
pub trait ReplacementPolicy {
    /// Only called when every line in `set` is valid.
    fn select_victim(&mut self, set: &mut CacheSet) -> usize;
}

/// Walks the ways of each set in order, one cursor per set.
#[derive(Debug, Default)]
pub struct RoundRobin;

impl ReplacementPolicy for RoundRobin {
    fn select_victim(&mut self, set: &mut CacheSet) -> usize {
        let victim = set.cursor;
        set.cursor = (victim + 1) % set.ways();
        victim
    }
}

/// Uniform choice over the ways of the set.
#[derive(Debug)]
pub struct Random<R = StdRng> {
    rng: R,
}

impl<R: Rng> Random<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl Random<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> ReplacementPolicy for Random<R> {
    fn select_victim(&mut self, set: &mut CacheSet) -> usize {
        self.rng.gen_range(0..set.ways())
    }
}

pub fn build_policy(kind: ReplacementKind, seed: Option<u64>) -> Box<dyn ReplacementPolicy> {
    match (kind, seed) {
        (ReplacementKind::RoundRobin, _) => Box::new(RoundRobin),
        (ReplacementKind::Random, Some(seed)) => Box::new(Random::seeded(seed)),
        (ReplacementKind::Random, None) => Box::new(Random::from_entropy()),
    }
}
