//! UUID value generator.

use crate::generator::FakeError;
use rand::rngs::StdRng;
use rand::Rng;
use schema_core::SchemaNode;
use serde_json::Value;
use uuid::{Builder, Uuid};

/// Random v4 UUID drawn from the seeded RNG, so runs are reproducible.
fn random_v4(rng: &mut StdRng) -> Uuid {
    Builder::from_random_bytes(rng.gen()).into_uuid()
}

/// Hyphenated UUID v4 string (`format: uuid`).
pub fn uuid(_node: &SchemaNode, rng: &mut StdRng) -> Result<Value, FakeError> {
    Ok(Value::String(random_v4(rng).hyphenated().to_string()))
}
