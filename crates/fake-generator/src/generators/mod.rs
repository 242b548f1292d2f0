//! Individual value generators for different schema kinds.
//!
//! Generators are plain functions looked up by `(type, format)`. A node
//! whose format has no exact entry falls back to the `"$any"` entry of its
//! type; types without one produce no value.

pub mod internet;
pub mod numeric;
pub mod pattern;
pub mod text;
pub mod timestamp;
pub mod uuid;

use crate::generator::FakeError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use schema_core::{SchemaNode, SchemaType};
use serde_json::Value;

/// Format key matching any format of a type.
pub const ANY_FORMAT: &str = "$any";

/// Default upper bound for numeric ranges.
pub const DEFAULT_MAXIMUM: f64 = 100.0;

/// Default lower bound for numeric ranges.
pub const DEFAULT_MINIMUM: f64 = 1.0;

/// Default `maxLength` for strings.
pub const DEFAULT_MAX_LENGTH: usize = 10;

/// Default `minLength` for strings.
pub const DEFAULT_MIN_LENGTH: usize = 1;

/// Signature shared by every generator.
pub type FakeFn = fn(&SchemaNode, &mut StdRng) -> Result<Value, FakeError>;

/// Find the generator for a `(type, format)` pair.
pub fn lookup(kind: SchemaType, format: Option<&str>) -> Option<FakeFn> {
    exact(kind, format).or_else(|| exact(kind, Some(ANY_FORMAT)))
}

fn exact(kind: SchemaType, format: Option<&str>) -> Option<FakeFn> {
    let fake: FakeFn = match (kind, format) {
        (SchemaType::Integer, None | Some(ANY_FORMAT)) => numeric::integer,
        (SchemaType::Number, None | Some(ANY_FORMAT)) => numeric::number,
        (SchemaType::String, None) => text::string,
        (SchemaType::String, Some("date")) => timestamp::date,
        (SchemaType::String, Some("date-time")) => timestamp::date_time,
        (SchemaType::String, Some("password")) => text::password,
        (SchemaType::String, Some("byte")) => text::base64,
        (SchemaType::String, Some("json")) => text::json_object,
        (SchemaType::String, Some("email")) => internet::email,
        (SchemaType::String, Some("uri")) => internet::uri,
        (SchemaType::String, Some("url")) => internet::url,
        (SchemaType::String, Some("slug")) => internet::slug,
        (SchemaType::String, Some("uuid")) => uuid::uuid,
        (SchemaType::Boolean, None) => boolean,
        _ => return None,
    };
    Some(fake)
}

/// Uniform `true`/`false`.
pub fn boolean(_node: &SchemaNode, rng: &mut StdRng) -> Result<Value, FakeError> {
    Ok(Value::Bool(rng.gen_bool(0.5)))
}

/// Pick a value from `enum`, if the node declares one.
///
/// Every listed value is a valid result, including `0`, `""` and `false`.
pub fn pick_enum<R: Rng>(node: &SchemaNode, rng: &mut R) -> Option<Value> {
    node.enum_values.choose(rng).cloned()
}

/// Inclusive numeric range implied by the node's bounds.
///
/// Exclusive flags move the corresponding bound inwards by one.
pub fn range(node: &SchemaNode) -> Result<(f64, f64), FakeError> {
    let mut minimum = node.minimum.unwrap_or(DEFAULT_MINIMUM);
    let mut maximum = node.maximum.unwrap_or(DEFAULT_MAXIMUM);

    if node.exclusive_minimum {
        minimum += 1.0;
    }

    if node.exclusive_maximum {
        maximum -= 1.0;
    }

    if minimum > maximum {
        return Err(FakeError::invalid(
            "Minimum cannot be greater than maximum",
            node,
        ));
    }

    Ok((minimum, maximum))
}

/// Target length for generated strings.
///
/// Half of `maxLength`, but never below `minLength`, so callers can append
/// to the value without breaking the maximum.
pub fn text_length(node: &SchemaNode) -> usize {
    let max = node.max_length.unwrap_or(DEFAULT_MAX_LENGTH);
    let min = node.min_length.unwrap_or(DEFAULT_MIN_LENGTH);
    (max / 2).max(min)
}
