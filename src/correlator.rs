//! Response-side extraction of resource values.
//!
//! A successful response is walked alongside its schema. Values at nodes that
//! declare a `resource` are merged into the pools, and the values that
//! appeared together are recorded in the relationship index.
//!
//! Walking produces a [`Correlation`] tree. Scalars found directly in an
//! object are shared by everything below that object; each element of an
//! array is an independent branch. [`format_resource_map`] flattens the tree
//! into one row per branch, each row also carrying the shared values of
//! every ancestor.

use crate::pool::ResourcePool;
use crate::relations::RelationshipIndex;
use schema_core::{scalar_set, ResourceValue, SchemaNode, ValueMap, ValueSet};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Only the first elements of an array of objects are walked.
pub const MAX_CORRELATED_ITEMS: usize = 10;

/// Values observed in one part of a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Correlation {
    /// Values observed together with no independent sub-parts.
    Row(ValueMap),
    /// Values shared by every branch, plus the branches themselves.
    Aggregate {
        shared: ValueMap,
        branches: Vec<Correlation>,
    },
}

impl Correlation {
    /// Build a node, collapsing to [`Correlation::Row`] when there are no branches.
    pub fn from_parts(shared: ValueMap, branches: Vec<Correlation>) -> Self {
        if branches.is_empty() {
            Correlation::Row(shared)
        } else {
            Correlation::Aggregate { shared, branches }
        }
    }

    pub fn shared(&self) -> &ValueMap {
        match self {
            Correlation::Row(values) => values,
            Correlation::Aggregate { shared, .. } => shared,
        }
    }

    pub fn shared_mut(&mut self) -> &mut ValueMap {
        match self {
            Correlation::Row(values) => values,
            Correlation::Aggregate { shared, .. } => shared,
        }
    }
}

impl Default for Correlation {
    fn default() -> Self {
        Correlation::Row(ValueMap::new())
    }
}

/// Flatten a correlation tree into rows of co-observed values.
///
/// Only branches produce rows: each row is a branch's values laid over the
/// shared values of all its ancestors, and on a name collision the branch
/// wins. A tree without branches produces no rows.
pub fn format_resource_map(correlation: &Correlation) -> Vec<ValueMap> {
    let mut rows = Vec::new();
    if let Correlation::Aggregate { shared, branches } = correlation {
        expand(shared, branches, &mut rows);
    }
    rows
}

fn expand(inherited: &ValueMap, branches: &[Correlation], rows: &mut Vec<ValueMap>) {
    for branch in branches {
        match branch {
            Correlation::Row(values) => {
                let row = overlay(inherited, values);
                if !row.is_empty() {
                    rows.push(row);
                }
            }
            Correlation::Aggregate { shared, branches } => {
                expand(&overlay(inherited, shared), branches, rows);
            }
        }
    }
}

fn overlay(base: &ValueMap, top: &ValueMap) -> ValueMap {
    let mut merged = base.clone();
    merged.extend(top.iter().map(|(name, values)| (name.clone(), values.clone())));
    merged
}

/// Per-user response correlator.
pub struct ResponseCorrelator {
    profile: String,
    pool: Arc<ResourcePool>,
    relations: Arc<RelationshipIndex>,
    non_runtime: Arc<HashSet<String>>,
}

impl ResponseCorrelator {
    pub fn new(
        profile: impl Into<String>,
        pool: Arc<ResourcePool>,
        relations: Arc<RelationshipIndex>,
        non_runtime: Arc<HashSet<String>>,
    ) -> Self {
        Self {
            profile: profile.into(),
            pool,
            relations,
            non_runtime,
        }
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Correlate a successful response.
    ///
    /// Resource values found in `response` are merged into the pools. The
    /// request's own resource usage joins the top-level shared values,
    /// overriding response values of the same name. Every resulting row is
    /// inserted into the relationship index. Returns the rows inserted.
    pub fn resolve(
        &self,
        schema: &SchemaNode,
        response: &Value,
        request_usage: &ValueMap,
    ) -> Vec<ValueMap> {
        let mut correlation = self.parse(schema, response);
        correlation.shared_mut().extend(
            request_usage
                .iter()
                .filter(|(_, values)| !values.is_empty())
                .map(|(name, values)| (name.clone(), values.clone())),
        );

        let rows = format_resource_map(&correlation);
        for row in &rows {
            self.relations.insert(row, &self.profile);
        }

        debug!(profile = %self.profile, rows = rows.len(), "Correlated response");
        rows
    }

    /// Walk `response` alongside `schema`, merging resource values into the pools.
    pub fn parse(&self, schema: &SchemaNode, response: &Value) -> Correlation {
        match response {
            Value::Object(object) => self.parse_object(schema, object),
            Value::Array(items) => {
                Correlation::from_parts(ValueMap::new(), self.parse_array(schema, items))
            }
            Value::Null => Correlation::default(),
            scalar => match schema.resource.as_deref() {
                Some(resource) => self.resource_row(resource, scalar),
                None => Correlation::default(),
            },
        }
    }

    fn parse_object(&self, schema: &SchemaNode, object: &Map<String, Value>) -> Correlation {
        let mut shared = ValueMap::new();
        let mut branches = Vec::new();

        for (key, child) in &schema.properties {
            let Some(value) = object.get(key).filter(|v| !v.is_null()) else {
                continue;
            };

            match value {
                Value::Array(items) => branches.extend(self.parse_array(child, items)),
                Value::Object(inner) if child.resource.is_none() => {
                    match self.parse_object(child, inner) {
                        Correlation::Row(values) => shared.extend(values),
                        Correlation::Aggregate {
                            shared: nested_shared,
                            branches: nested_branches,
                        } => {
                            shared.extend(nested_shared);
                            let existing = std::mem::replace(&mut branches, nested_branches);
                            branches.extend(existing);
                        }
                    }
                }
                _ => {
                    if let Some(resource) = child.resource.as_deref() {
                        let values = self.add_resource(resource, scalar_set(value));
                        if !values.is_empty() {
                            shared.insert(resource.to_string(), values);
                        }
                    }
                }
            }
        }

        Correlation::from_parts(shared, branches)
    }

    fn parse_array(&self, schema: &SchemaNode, items: &[Value]) -> Vec<Correlation> {
        let Some(first) = items.first() else {
            return Vec::new();
        };

        let default_item = SchemaNode::default();
        let item_schema = schema.items.as_deref().unwrap_or(&default_item);

        if first.is_object() || first.is_array() {
            return items
                .iter()
                .take(MAX_CORRELATED_ITEMS)
                .map(|item| self.parse(item_schema, item))
                .collect();
        }

        let resource = item_schema
            .resource
            .as_deref()
            .or(schema.resource.as_deref());
        match resource {
            Some(resource) => {
                let values = items.iter().flat_map(scalar_set).collect();
                let values = self.add_resource(resource, values);
                if values.is_empty() {
                    Vec::new()
                } else {
                    vec![Correlation::Row(BTreeMap::from([(resource.to_string(), values)]))]
                }
            }
            None => Vec::new(),
        }
    }

    fn resource_row(&self, resource: &str, value: &Value) -> Correlation {
        let values = self.add_resource(resource, scalar_set(value));
        if values.is_empty() {
            return Correlation::default();
        }
        Correlation::Row(BTreeMap::from([(resource.to_string(), values)]))
    }

    /// Merge values into a pool unless the resource is non-runtime.
    ///
    /// The values are returned either way so they still take part in
    /// relationships.
    pub fn add_resource(&self, resource: &str, values: ValueSet) -> ValueSet {
        if values.is_empty() {
            debug!(resource, "No scalar values found for resource");
            return values;
        }

        if self.non_runtime.contains(resource) {
            debug!(resource, "Resource is not updated at run time, skipping pool merge");
        } else {
            self.pool
                .merge(&self.profile, resource, values.iter().cloned());
        }
        values
    }

    /// Remove a value that a response showed no longer exists.
    pub fn forget(&self, resource: &str, value: &ResourceValue) -> bool {
        self.pool.delete(&self.profile, resource, value)
    }
}
