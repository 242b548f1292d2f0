//! Shared state of one load run.

use crate::config::EngineConfig;
use crate::correlator::ResponseCorrelator;
use crate::pool::ResourcePool;
use crate::provider::Provider;
use crate::relations::RelationshipIndex;
use fake_generator::{FakeGenerator, ValueGenerator};
use rand::Rng;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Owns the pools and relationship index shared by every virtual user, and
/// hands out per-user providers and correlators bound to a profile.
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct RunContext {
    pool: Arc<ResourcePool>,
    relations: Arc<RelationshipIndex>,
    non_runtime: Arc<HashSet<String>>,
    seed: u64,
    next_user: Arc<AtomicU64>,
}

impl RunContext {
    /// Empty pools, entropy-seeded users.
    pub fn new() -> Self {
        Self::with_seed(rand::thread_rng().gen())
    }

    /// Empty pools; user `n` gets a seed derived from `seed` and `n`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            pool: Arc::new(ResourcePool::new()),
            relations: Arc::new(RelationshipIndex::new()),
            non_runtime: Arc::new(HashSet::new()),
            seed,
            next_user: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Pools seeded from the configured profiles.
    pub fn from_config(config: &EngineConfig) -> Self {
        let context = match config.seed {
            Some(seed) => Self::with_seed(seed),
            None => Self::new(),
        }
        .with_non_runtime_resources(config.non_runtime_resources.iter().cloned());

        config.seed_pool(&context.pool);
        context
    }

    /// Resources whose pools must not grow from responses.
    pub fn with_non_runtime_resources<I>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.non_runtime = Arc::new(names.into_iter().collect());
        self
    }

    pub fn pool(&self) -> &Arc<ResourcePool> {
        &self.pool
    }

    pub fn relations(&self) -> &Arc<RelationshipIndex> {
        &self.relations
    }

    /// Provider with a fake generator, seeded for the next user.
    pub fn provider(&self, profile: &str) -> Provider<FakeGenerator> {
        let seed = self.next_seed();
        self.provider_with(profile, FakeGenerator::new(seed), seed)
    }

    /// Provider with a caller-supplied generator.
    pub fn provider_with<G: ValueGenerator>(
        &self,
        profile: &str,
        generator: G,
        seed: u64,
    ) -> Provider<G> {
        Provider::new(
            profile,
            Arc::clone(&self.pool),
            Arc::clone(&self.relations),
            generator,
            seed,
        )
    }

    pub fn correlator(&self, profile: &str) -> ResponseCorrelator {
        ResponseCorrelator::new(
            profile,
            Arc::clone(&self.pool),
            Arc::clone(&self.relations),
            Arc::clone(&self.non_runtime),
        )
    }

    fn next_seed(&self) -> u64 {
        let index = self.next_user.fetch_add(1, Ordering::Relaxed);
        self.seed.wrapping_add(index.wrapping_mul(0x9E3779B97F4A7C15))
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
