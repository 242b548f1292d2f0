//! Index of resource values observed together.
//!
//! When a response reveals that pet `3` belongs to category `9`, both values
//! are recorded under the key `{category, pet}`. Later requests that need a
//! consistent `(category, pet)` pair query the index instead of drawing each
//! value independently.

use crate::keyed::KeyedStore;
use schema_core::{ResourceValue, ValueMap, ValueSet};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, warn};

/// Largest number of resources in one observation that will be indexed.
///
/// Every subset of two or more names gets its own key, so the work grows as
/// `2^n`.
pub const MAX_RELATED_RESOURCES: usize = 16;

/// Key of one relation: a profile and a sorted, de-duplicated name set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationKey {
    profile: String,
    names: Vec<String>,
}

impl RelationKey {
    pub fn new<I, S>(profile: &str, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        Self {
            profile: profile.to_string(),
            names,
        }
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Names in tuple order.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl fmt::Display for RelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.profile, self.names.join(","))
    }
}

/// Values of one relation, positionally aligned with [`RelationKey::names`].
pub type RelationTuple = Vec<ResourceValue>;

/// One queried relation row, keyed by resource name.
pub type RelatedValues = BTreeMap<String, ResourceValue>;

/// Shared index of co-observed resource values.
#[derive(Default)]
pub struct RelationshipIndex {
    tuples: KeyedStore<RelationKey, BTreeSet<RelationTuple>>,
}

impl RelationshipIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation.
    ///
    /// For every subset of two or more non-empty names, the cartesian product
    /// of their value sets is added under that subset's key. A subset in
    /// which more than one name carries several values is skipped: the
    /// observation cannot tell which of those values belong together.
    ///
    /// Returns the number of tuples that were not already indexed.
    pub fn insert(&self, values: &ValueMap, profile: &str) -> usize {
        let columns: Vec<(&String, &ValueSet)> =
            values.iter().filter(|(_, set)| !set.is_empty()).collect();

        if columns.len() < 2 {
            return 0;
        }

        if columns.len() > MAX_RELATED_RESOURCES {
            warn!(
                profile,
                resources = columns.len(),
                limit = MAX_RELATED_RESOURCES,
                "Too many resources in one observation, skipping related resource insertion"
            );
            return 0;
        }

        let mut added = 0;
        for mask in 1u32..(1u32 << columns.len()) {
            if mask.count_ones() < 2 {
                continue;
            }

            let subset: Vec<&(&String, &ValueSet)> = columns
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, column)| column)
                .collect();

            let key = RelationKey::new(profile, subset.iter().map(|(name, _)| name.as_str()));
            let multi_valued = subset.iter().filter(|(_, set)| set.len() > 1).count();
            if multi_valued > 1 {
                warn!(
                    relation = %key,
                    "Multiple values for multiple resources, skipping related resource insertion"
                );
                continue;
            }

            let tuples = cartesian(subset.iter().map(|(_, set)| *set));
            let inserted = self.tuples.with_entry(&key, |known| {
                tuples
                    .into_iter()
                    .fold(0, |count, tuple| count + usize::from(known.insert(tuple)))
            });

            if inserted > 0 {
                debug!(relation = %key, inserted, "Indexed related resources");
            }
            added += inserted;
        }

        added
    }

    /// All indexed rows for exactly this name set, in a stable order.
    pub fn query<S: AsRef<str>>(&self, names: &[S], profile: &str) -> Vec<RelatedValues> {
        let key = RelationKey::new(profile, names.iter().map(|name| name.as_ref()));

        self.tuples
            .with_existing(&key, |known| {
                known
                    .iter()
                    .map(|tuple| {
                        key.names()
                            .iter()
                            .cloned()
                            .zip(tuple.iter().cloned())
                            .collect()
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of tuples indexed under the name set.
    pub fn len<S: AsRef<str>>(&self, names: &[S], profile: &str) -> usize {
        let key = RelationKey::new(profile, names.iter().map(|name| name.as_ref()));
        self.tuples
            .with_existing(&key, |known| known.len())
            .unwrap_or(0)
    }

    /// Keys with at least one indexed tuple.
    pub fn keys(&self) -> Vec<RelationKey> {
        let mut keys = self.tuples.keys();
        keys.retain(|key| {
            self.tuples
                .with_existing(key, |known| !known.is_empty())
                .unwrap_or(false)
        });
        keys.sort();
        keys
    }
}

fn cartesian<'a, I>(columns: I) -> Vec<RelationTuple>
where
    I: IntoIterator<Item = &'a ValueSet>,
{
    columns.into_iter().fold(vec![Vec::new()], |partial, column| {
        partial
            .iter()
            .flat_map(|prefix| {
                column.iter().map(move |value| {
                    let mut tuple = prefix.clone();
                    tuple.push(value.clone());
                    tuple
                })
            })
            .collect()
    })
}
