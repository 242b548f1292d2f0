//! Request-side resolution of schema nodes into concrete values.
//!
//! A [`Provider`] belongs to one virtual user and resolves every node of a
//! request. Resource-backed nodes draw from the shared pools (or from the
//! related selection made for the request); everything else is faked.
//! The provider remembers which values it used and which it deleted so the
//! caller can correlate the response or undo the deletions.

use crate::error::{EngineError, Result};
use crate::pool::ResourcePool;
use crate::relations::{RelatedValues, RelationshipIndex};
use fake_generator::{FakeGenerator, ValueGenerator};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use schema_core::{ResourceOptions, ResourceValue, SchemaNode, SchemaType, ValueMap};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Upper bound for array length when `maxItems` is absent.
pub const DEFAULT_MAX_ITEMS: usize = 10;

/// Per-user resolver for request values.
pub struct Provider<G = FakeGenerator> {
    profile: String,
    pool: Arc<ResourcePool>,
    relations: Arc<RelationshipIndex>,
    generator: G,
    rng: StdRng,
    usage: ValueMap,
    related: RelatedValues,
    deleted: Vec<(String, ResourceValue)>,
}

impl<G: ValueGenerator> Provider<G> {
    pub fn new(
        profile: impl Into<String>,
        pool: Arc<ResourcePool>,
        relations: Arc<RelationshipIndex>,
        generator: G,
        seed: u64,
    ) -> Self {
        Self {
            profile: profile.into(),
            pool,
            relations,
            generator,
            rng: StdRng::seed_from_u64(seed),
            usage: ValueMap::new(),
            related: RelatedValues::new(),
            deleted: Vec::new(),
        }
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Resolve a node into a JSON value.
    ///
    /// A node whose `(type, format)` has no generator resolves to `null`.
    pub fn resolve(&mut self, node: &SchemaNode) -> Result<Value> {
        Ok(self.resolve_node(node)?.unwrap_or(Value::Null))
    }

    fn resolve_node(&mut self, node: &SchemaNode) -> Result<Option<Value>> {
        if let Some(resource) = node.resource.as_deref() {
            return self
                .resolve_resource(resource, &node.resource_options())
                .map(Some);
        }

        match node.schema_type {
            None => Err(invalid("Item type must be defined", node)),
            Some(SchemaType::Array) => self.resolve_array(node).map(Some),
            Some(SchemaType::Object) => self.resolve_object(node).map(Some),
            Some(_) => Ok(self.generator.generate(node)?),
        }
    }

    fn resolve_resource(&mut self, resource: &str, options: &ResourceOptions) -> Result<Value> {
        let drawn = match self.take_related(resource, options) {
            Some(value) => vec![value],
            None => self
                .pool
                .require(&self.profile, resource, options, &mut self.rng)?,
        };

        if options.delete {
            self.deleted
                .extend(drawn.iter().map(|value| (resource.to_string(), value.clone())));
        }

        self.usage
            .entry(resource.to_string())
            .or_default()
            .extend(drawn.iter().cloned());

        if options.flat_for_single() && drawn.len() == 1 {
            return Ok(drawn[0].to_json());
        }
        Ok(Value::Array(drawn.iter().map(ResourceValue::to_json).collect()))
    }

    /// Value from the related selection, if one was made for `resource`.
    ///
    /// A deleting draw must win the race for the value; if another user
    /// deleted it first the caller falls back to the pool.
    fn take_related(&mut self, resource: &str, options: &ResourceOptions) -> Option<ResourceValue> {
        let value = self.related.get(resource)?.clone();

        if options.delete && !self.pool.delete(&self.profile, resource, &value) {
            debug!(
                profile = %self.profile,
                resource,
                value = %value,
                "Related value already deleted, sampling pool instead"
            );
            return None;
        }
        Some(value)
    }

    fn resolve_array(&mut self, node: &SchemaNode) -> Result<Value> {
        let item = node
            .items
            .as_deref()
            .ok_or_else(|| invalid("Items should be defined for Array type", node))?;

        let min_items = node.min_items.unwrap_or(0);
        let max_items = node
            .max_items
            .unwrap_or_else(|| DEFAULT_MAX_ITEMS.max(min_items + 1));
        if min_items > max_items {
            return Err(invalid("minItems cannot be greater than maxItems", node));
        }

        let count = self.rng.gen_range(min_items..=max_items);
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.resolve(item)?);
        }

        if !node.unique_items {
            return Ok(Value::Array(values));
        }

        let mut seen = HashSet::new();
        values.retain(|value| seen.insert(value.to_string()));
        while values.len() < min_items {
            let value = self.resolve(item)?;
            if seen.insert(value.to_string()) {
                values.push(value);
            }
        }

        Ok(Value::Array(values))
    }

    fn resolve_object(&mut self, node: &SchemaNode) -> Result<Value> {
        let mut object = Map::new();

        for (name, property) in &node.properties {
            if let Some(value) = self.resolve_node(property)?.filter(|v| !v.is_null()) {
                object.insert(name.clone(), value);
            }
        }

        if let Some(extra) = node.additional_properties.as_deref() {
            if !extra.is_empty() {
                let copies = extra.min_properties.or(node.min_properties).unwrap_or(0);
                if let Some(value) = self.resolve_node(extra)?.filter(|v| !v.is_null()) {
                    for i in 0..copies {
                        object.insert(format!("load_test_{i}"), value.clone());
                    }
                }
            }
        }

        Ok(Value::Object(object))
    }

    /// Pick one indexed relation of `resources` whose values all still exist.
    ///
    /// Subsequent resource draws for those names use the selection. Returns
    /// `false` when nothing usable is indexed; any earlier selection is
    /// dropped and draws then sample the pools independently.
    pub fn select_related<S: AsRef<str>>(&mut self, resources: &[S]) -> bool {
        self.related.clear();
        if resources.is_empty() {
            return false;
        }

        let candidates: Vec<RelatedValues> = self
            .relations
            .query(resources, &self.profile)
            .into_iter()
            .filter(|row| {
                row.iter()
                    .all(|(name, value)| self.pool.exists(&self.profile, name, value))
            })
            .collect();

        match candidates.choose(&mut self.rng) {
            Some(selection) => {
                debug!(
                    profile = %self.profile,
                    candidates = candidates.len(),
                    "Selected related resources"
                );
                self.related = selection.clone();
                true
            }
            None => false,
        }
    }

    /// Clear per-request state.
    pub fn reset(&mut self) {
        self.usage.clear();
        self.related.clear();
        self.deleted.clear();
    }

    /// Return one deleted value to its pool.
    pub fn rollback(&mut self, resource: &str, value: ResourceValue) {
        self.deleted
            .retain(|(name, deleted)| !(name == resource && *deleted == value));
        self.pool.restore(&self.profile, resource, value);
    }

    /// Return every value deleted since the last reset. Returns the count.
    pub fn rollback_deleted(&mut self) -> usize {
        let deleted = std::mem::take(&mut self.deleted);
        let count = deleted.len();
        for (resource, value) in deleted {
            self.pool.restore(&self.profile, &resource, value);
        }
        count
    }

    /// Resource values used since the last reset.
    pub fn usage(&self) -> &ValueMap {
        &self.usage
    }

    /// The current related selection.
    pub fn related(&self) -> &RelatedValues {
        &self.related
    }

    /// Values deleted since the last reset.
    pub fn deleted(&self) -> &[(String, ResourceValue)] {
        &self.deleted
    }
}

fn invalid(message: &str, node: &SchemaNode) -> EngineError {
    let rendered = serde_json::to_string(node).unwrap_or_default();
    EngineError::InvalidConfig(format!("{message} - {rendered}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake_generator::FakeError;
    use serde_json::json;
    use std::collections::VecDeque;

    fn node(value: Value) -> SchemaNode {
        SchemaNode::from_json_value(value).unwrap()
    }

    fn provider() -> Provider {
        Provider::new(
            "default",
            Arc::new(ResourcePool::new()),
            Arc::new(RelationshipIndex::new()),
            FakeGenerator::new(42),
            42,
        )
    }

    fn seeded(values: &[(&str, Vec<i64>)]) -> Provider {
        let provider = provider();
        for (name, pool) in values {
            provider
                .pool
                .merge("default", name, pool.iter().map(|v| ResourceValue::from(*v)));
        }
        provider
    }

    /// Returns queued values in order, then `null`.
    struct Scripted {
        values: VecDeque<Value>,
        calls: usize,
    }

    impl ValueGenerator for Scripted {
        fn generate(&mut self, _node: &SchemaNode) -> std::result::Result<Option<Value>, FakeError> {
            self.calls += 1;
            Ok(self.values.pop_front())
        }
    }

    #[test]
    fn test_resolve_scalar() {
        let mut provider = provider();
        let value = provider.resolve(&node(json!({"type": "integer"}))).unwrap();
        assert!((1..=100).contains(&value.as_i64().unwrap()));
    }

    #[test]
    fn test_resolve_missing_type() {
        let mut provider = provider();
        let result = provider.resolve(&node(json!({"format": "email"})));
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_resolve_unknown_format_is_null() {
        let mut provider = provider();
        let value = provider
            .resolve(&node(json!({"type": "string", "format": "ipv6"})))
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn test_resolve_resource_single() {
        let mut provider = seeded(&[("pet", vec![1, 2, 3])]);
        let value = provider.resolve(&SchemaNode::resource("pet")).unwrap();

        let drawn = ResourceValue::from_json(&value).unwrap();
        assert!(provider.usage()["pet"].contains(&drawn));
        assert_eq!(provider.pool.len("default", "pet"), 3);
    }

    #[test]
    fn test_resolve_resource_items() {
        let mut provider = seeded(&[("pet", vec![1, 2, 3, 4])]);
        let schema = node(json!({"resource": "pet", "options": {"items": 2}}));

        let value = provider.resolve(&schema).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
        assert_eq!(provider.usage()["pet"].len(), 2);
    }

    #[test]
    fn test_resolve_resource_single_not_flat() {
        let mut provider = seeded(&[("pet", vec![5])]);
        let schema = node(json!({"resource": "pet", "options": {"flatForSingle": false}}));
        assert_eq!(provider.resolve(&schema).unwrap(), json!([5]));
    }

    #[test]
    fn test_resolve_resource_empty_pool() {
        let mut provider = provider();
        let result = provider.resolve(&SchemaNode::resource("pet"));
        assert!(matches!(result, Err(EngineError::EmptyResource { .. })));
    }

    #[test]
    fn test_delete_and_rollback() {
        let mut provider = seeded(&[("pet", vec![9])]);
        let schema = node(json!({"resource": "pet", "options": {"delete": true}}));

        assert_eq!(provider.resolve(&schema).unwrap(), json!(9));
        assert!(provider.pool.is_empty("default", "pet"));
        assert_eq!(provider.deleted().len(), 1);

        assert_eq!(provider.rollback_deleted(), 1);
        assert!(provider.pool.exists("default", "pet", &ResourceValue::from(9)));
        assert!(provider.deleted().is_empty());
    }

    #[test]
    fn test_rollback_single_value() {
        let mut provider = seeded(&[("pet", vec![9])]);
        let schema = node(json!({"resource": "pet", "options": {"delete": true}}));
        provider.resolve(&schema).unwrap();

        provider.rollback("pet", ResourceValue::from(9));
        assert!(provider.deleted().is_empty());
        assert_eq!(provider.pool.len("default", "pet"), 1);
    }

    #[test]
    fn test_usage_unions_draws() {
        let mut provider = seeded(&[("pet", vec![1, 2])]);
        let schema = node(json!({"resource": "pet", "options": {"items": 2}}));
        provider.resolve(&schema).unwrap();
        provider.resolve(&schema).unwrap();

        assert_eq!(provider.usage()["pet"].len(), 2);
        provider.reset();
        assert!(provider.usage().is_empty());
    }

    #[test]
    fn test_object_drops_null_properties() {
        let mut provider = provider();
        let schema = node(json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "maxLength": 8},
                "avatar": {"type": "string", "format": "binary"}
            }
        }));

        let value = provider.resolve(&schema).unwrap();
        let object = value.as_object().unwrap();
        assert!(object.contains_key("name"));
        assert!(!object.contains_key("avatar"));
    }

    #[test]
    fn test_object_additional_properties() {
        let mut provider = provider();
        let schema = node(json!({
            "type": "object",
            "additionalProperties": {"type": "integer", "enum": [4], "minProperties": 3}
        }));

        assert_eq!(
            provider.resolve(&schema).unwrap(),
            json!({"load_test_0": 4, "load_test_1": 4, "load_test_2": 4})
        );
    }

    #[test]
    fn test_array_bounds() {
        let mut provider = provider();
        let schema = node(json!({
            "type": "array",
            "minItems": 2,
            "maxItems": 4,
            "items": {"type": "boolean"}
        }));

        for _ in 0..50 {
            let length = provider.resolve(&schema).unwrap().as_array().unwrap().len();
            assert!((2..=4).contains(&length));
        }
    }

    #[test]
    fn test_array_without_items() {
        let mut provider = provider();
        let result = provider.resolve(&node(json!({"type": "array"})));
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_unique_array_keeps_drawing_until_min_items() {
        let generator = Scripted {
            values: ["a", "a", "a", "b", "b", "c"].into_iter().map(Value::from).collect(),
            calls: 0,
        };
        let mut provider = Provider::new(
            "default",
            Arc::new(ResourcePool::new()),
            Arc::new(RelationshipIndex::new()),
            generator,
            42,
        );
        let schema = node(json!({
            "type": "array",
            "minItems": 3,
            "maxItems": 5,
            "uniqueItems": true,
            "items": {"type": "string"}
        }));

        let value = provider.resolve(&schema).unwrap();
        assert_eq!(value, json!(["a", "b", "c"]));
        assert_eq!(provider.generator.calls, 6);
    }

    #[test]
    fn test_select_related_uses_indexed_pair() {
        let mut provider = seeded(&[("pet", vec![1, 2, 3]), ("category", vec![7, 8, 9])]);
        provider.relations.insert(
            &ValueMap::from([
                ("pet".to_string(), [ResourceValue::from(2)].into()),
                ("category".to_string(), [ResourceValue::from(8)].into()),
            ]),
            "default",
        );

        assert!(provider.select_related(&["pet", "category"]));
        let schema = node(json!({
            "type": "object",
            "properties": {
                "petId": {"resource": "pet"},
                "categoryId": {"resource": "category"}
            }
        }));

        assert_eq!(
            provider.resolve(&schema).unwrap(),
            json!({"petId": 2, "categoryId": 8})
        );
    }

    #[test]
    fn test_select_related_skips_stale_rows() {
        let mut provider = seeded(&[("pet", vec![1]), ("category", vec![7])]);
        provider.relations.insert(
            &ValueMap::from([
                ("pet".to_string(), [ResourceValue::from(2)].into()),
                ("category".to_string(), [ResourceValue::from(7)].into()),
            ]),
            "default",
        );

        assert!(!provider.select_related(&["pet", "category"]));
        assert!(provider.related().is_empty());
        assert!(!provider.select_related::<&str>(&[]));
    }

    #[test]
    fn test_failed_selection_drops_previous_one() {
        let mut provider = seeded(&[
            ("pet", vec![1]),
            ("category", vec![7]),
            ("owner", vec![4]),
        ]);
        provider.relations.insert(
            &ValueMap::from([
                ("pet".to_string(), [ResourceValue::from(1)].into()),
                ("category".to_string(), [ResourceValue::from(7)].into()),
            ]),
            "default",
        );

        assert!(provider.select_related(&["pet", "category"]));
        assert_eq!(provider.related()["category"], ResourceValue::from(7));

        assert!(!provider.select_related(&["owner", "category"]));
        assert!(provider.related().is_empty());
    }

    #[test]
    fn test_related_delete_falls_back_when_gone() {
        let mut provider = seeded(&[("pet", vec![1, 2]), ("category", vec![7])]);
        provider.relations.insert(
            &ValueMap::from([
                ("pet".to_string(), [ResourceValue::from(2)].into()),
                ("category".to_string(), [ResourceValue::from(7)].into()),
            ]),
            "default",
        );
        assert!(provider.select_related(&["pet", "category"]));

        // Another user deletes the selected pet first.
        provider.pool.delete("default", "pet", &ResourceValue::from(2));

        let schema = node(json!({"resource": "pet", "options": {"delete": true}}));
        assert_eq!(provider.resolve(&schema).unwrap(), json!(1));
        assert!(provider.pool.is_empty("default", "pet"));
    }
}
