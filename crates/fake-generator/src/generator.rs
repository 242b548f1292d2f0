//! Entry point turning schema nodes into fake values.

use crate::generators;
use rand::rngs::StdRng;
use rand::SeedableRng;
use schema_core::SchemaNode;
use serde_json::Value;

/// Error type for generator operations.
#[derive(Debug, thiserror::Error)]
pub enum FakeError {
    /// Schema node is self-contradictory (missing type, inverted bounds)
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Pattern cannot be turned into a string generator
    #[error("Unsupported pattern '{pattern}': {reason}")]
    UnsupportedPattern { pattern: String, reason: String },
}

impl FakeError {
    pub(crate) fn invalid(message: &str, node: &SchemaNode) -> Self {
        let rendered = serde_json::to_string(node).unwrap_or_default();
        FakeError::InvalidConfig(format!("{message} - {rendered}"))
    }
}

/// Source of fake values for schema nodes.
///
/// `Ok(None)` means no generator exists for the node's `(type, format)`;
/// callers propagate it as an absent value.
pub trait ValueGenerator {
    /// Generate one value for the node.
    fn generate(&mut self, node: &SchemaNode) -> Result<Option<Value>, FakeError>;
}

/// Seeded fake value generator.
pub struct FakeGenerator {
    rng: StdRng,
}

impl FakeGenerator {
    /// Create a generator with a fixed seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create a generator seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl ValueGenerator for FakeGenerator {
    fn generate(&mut self, node: &SchemaNode) -> Result<Option<Value>, FakeError> {
        let kind = node
            .schema_type
            .ok_or_else(|| FakeError::invalid("Item type must be defined", node))?;

        match generators::lookup(kind, node.format()) {
            Some(fake) => fake(node, &mut self.rng).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(value: Value) -> SchemaNode {
        SchemaNode::from_json_value(value).unwrap()
    }

    #[test]
    fn test_missing_type_is_invalid_config() {
        let mut generator = FakeGenerator::new(42);
        let result = generator.generate(&node(json!({"format": "email"})));
        assert!(matches!(result, Err(FakeError::InvalidConfig(_))));
    }

    #[test]
    fn test_unknown_format_falls_back_to_any() {
        let mut generator = FakeGenerator::new(42);
        let value = generator
            .generate(&node(json!({"type": "integer", "format": "int64"})))
            .unwrap();
        assert!(value.unwrap().is_i64());
    }

    #[test]
    fn test_no_generator_yields_none() {
        let mut generator = FakeGenerator::new(42);

        // Strings have no "$any" fallback
        let value = generator
            .generate(&node(json!({"type": "string", "format": "hostname"})))
            .unwrap();
        assert!(value.is_none());

        let value = generator.generate(&node(json!({"type": "file"}))).unwrap();
        assert!(value.is_none());

        let value = generator.generate(&node(json!({"type": "object"}))).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_deterministic_generation() {
        let schema = node(json!({"type": "string", "maxLength": 40}));

        let mut gen1 = FakeGenerator::new(42);
        let mut gen2 = FakeGenerator::new(42);

        for _ in 0..10 {
            assert_eq!(
                gen1.generate(&schema).unwrap(),
                gen2.generate(&schema).unwrap()
            );
        }
    }

    #[test]
    fn test_boolean() {
        let mut generator = FakeGenerator::new(42);
        let schema = node(json!({"type": "boolean"}));
        let values: Vec<bool> = (0..50)
            .map(|_| generator.generate(&schema).unwrap().unwrap().as_bool().unwrap())
            .collect();

        assert!(values.contains(&true));
        assert!(values.contains(&false));
    }
}
