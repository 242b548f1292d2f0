//! Shared resource pools.
//!
//! A pool is the set of values observed for one resource name within one
//! profile. Pools are shared by every virtual user of a run; each
//! `(profile, resource)` pair is locked independently, so a sample that
//! deletes its value is atomic with respect to any other operation on the
//! same pool.

use crate::error::{EngineError, Result};
use crate::keyed::KeyedStore;
use rand::seq::IteratorRandom;
use rand::Rng;
use schema_core::{ResourceOptions, ResourceValue, ValueSet};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// Identifies one pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolKey {
    pub profile: String,
    pub resource: String,
}

impl PoolKey {
    pub fn new(profile: &str, resource: &str) -> Self {
        Self {
            profile: profile.to_string(),
            resource: resource.to_string(),
        }
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.profile, self.resource)
    }
}

/// Resource pools for every profile of a run.
#[derive(Default)]
pub struct ResourcePool {
    sets: KeyedStore<PoolKey, ValueSet>,
}

impl ResourcePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw values using the thread-local RNG. See [`ResourcePool::sample_with`].
    pub fn sample(
        &self,
        profile: &str,
        resource: &str,
        options: &ResourceOptions,
    ) -> Vec<ResourceValue> {
        self.sample_with(profile, resource, options, &mut rand::thread_rng())
    }

    /// Draw up to `options.items()` distinct values uniformly at random.
    ///
    /// With `delete` set, exactly one value is drawn and removed from the pool
    /// before the lock is released, so concurrent deleting samples never
    /// return the same value. An absent or empty pool yields an empty list.
    pub fn sample_with<R: Rng + ?Sized>(
        &self,
        profile: &str,
        resource: &str,
        options: &ResourceOptions,
        rng: &mut R,
    ) -> Vec<ResourceValue> {
        let key = PoolKey::new(profile, resource);

        self.sets
            .with_existing(&key, |values| {
                if options.delete {
                    let chosen = values.iter().choose(rng).cloned();
                    match chosen {
                        Some(value) => {
                            values.remove(&value);
                            debug!(pool = %key, value = %value, "Deleted sampled value");
                            vec![value]
                        }
                        None => Vec::new(),
                    }
                } else {
                    values
                        .iter()
                        .choose_multiple(rng, options.items())
                        .into_iter()
                        .cloned()
                        .collect()
                }
            })
            .unwrap_or_default()
    }

    /// Like [`ResourcePool::sample_with`], but an empty draw is an error.
    pub fn require<R: Rng + ?Sized>(
        &self,
        profile: &str,
        resource: &str,
        options: &ResourceOptions,
        rng: &mut R,
    ) -> Result<Vec<ResourceValue>> {
        let values = self.sample_with(profile, resource, options, rng);
        if values.is_empty() {
            return Err(EngineError::EmptyResource {
                profile: profile.to_string(),
                resource: resource.to_string(),
            });
        }
        Ok(values)
    }

    /// Whether `value` is currently in the pool.
    pub fn exists(&self, profile: &str, resource: &str, value: &ResourceValue) -> bool {
        self.sets
            .with_existing(&PoolKey::new(profile, resource), |values| {
                values.contains(value)
            })
            .unwrap_or(false)
    }

    /// Union `values` into the pool, creating it if needed.
    ///
    /// Returns the number of values that were not already present.
    pub fn merge<I>(&self, profile: &str, resource: &str, values: I) -> usize
    where
        I: IntoIterator<Item = ResourceValue>,
    {
        let mut incoming = values.into_iter().peekable();
        if incoming.peek().is_none() {
            return 0;
        }

        let key = PoolKey::new(profile, resource);
        let added = self.sets.with_entry(&key, |set| {
            incoming.fold(0, |added, value| added + usize::from(set.insert(value)))
        });

        if added > 0 {
            debug!(pool = %key, added, "Merged resource values");
        }
        added
    }

    /// Remove one value. Returns whether it was present.
    pub fn delete(&self, profile: &str, resource: &str, value: &ResourceValue) -> bool {
        let key = PoolKey::new(profile, resource);
        let removed = self
            .sets
            .with_existing(&key, |values| values.remove(value))
            .unwrap_or(false);

        if removed {
            debug!(pool = %key, value = %value, "Deleted resource value");
        }
        removed
    }

    /// Put a value back after a failed request.
    pub fn restore(&self, profile: &str, resource: &str, value: ResourceValue) {
        let key = PoolKey::new(profile, resource);
        debug!(pool = %key, value = %value, "Restoring resource value");
        self.sets.with_entry(&key, |values| {
            values.insert(value);
        });
    }

    /// Number of values currently in the pool.
    pub fn len(&self, profile: &str, resource: &str) -> usize {
        self.sets
            .with_existing(&PoolKey::new(profile, resource), |values| values.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, profile: &str, resource: &str) -> bool {
        self.len(profile, resource) == 0
    }

    /// Snapshot of the pool's current values.
    pub fn values(&self, profile: &str, resource: &str) -> ValueSet {
        self.sets
            .with_existing(&PoolKey::new(profile, resource), |values| values.clone())
            .unwrap_or_default()
    }

    /// Profiles that have at least one pool.
    pub fn profiles(&self) -> BTreeSet<String> {
        self.sets.keys().into_iter().map(|key| key.profile).collect()
    }

    /// Resource names with a pool under `profile`.
    pub fn resources(&self, profile: &str) -> BTreeSet<String> {
        self.sets
            .keys()
            .into_iter()
            .filter(|key| key.profile == profile)
            .map(|key| key.resource)
            .collect()
    }
}
