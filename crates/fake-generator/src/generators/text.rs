//! Free-text string generators.

use super::pattern::generate_matching;
use super::{pick_enum, text_length};
use crate::generator::FakeError;
use base64::prelude::{Engine, BASE64_STANDARD};
use fake::faker::internet::en::Password;
use fake::faker::lorem::en::Paragraph;
use fake::Fake;
use rand::rngs::StdRng;
use schema_core::SchemaNode;
use serde_json::{Map, Value};

/// Plain string: enum choice, `pattern` match, or truncated lorem text.
pub fn string(node: &SchemaNode, rng: &mut StdRng) -> Result<Value, FakeError> {
    text(node, rng).map(Value::String)
}

/// Password of the target string length.
pub fn password(node: &SchemaNode, rng: &mut StdRng) -> Result<Value, FakeError> {
    if let Some(value) = pick_enum(node, rng) {
        return Ok(value);
    }

    let length = text_length(node);
    let value: String = Password(length..length + 1).fake_with_rng(rng);
    Ok(Value::String(value))
}

/// Base64 encoding of a generated string (`format: byte`).
pub fn base64(node: &SchemaNode, rng: &mut StdRng) -> Result<Value, FakeError> {
    let raw = text(node, rng)?;
    Ok(Value::String(BASE64_STANDARD.encode(raw)))
}

/// Empty JSON object (`format: json`).
pub fn json_object(_node: &SchemaNode, _rng: &mut StdRng) -> Result<Value, FakeError> {
    Ok(Value::Object(Map::new()))
}

fn text(node: &SchemaNode, rng: &mut StdRng) -> Result<String, FakeError> {
    if let Some(value) = pick_enum(node, rng) {
        return Ok(match value {
            Value::String(s) => s,
            other => other.to_string(),
        });
    }

    match node.pattern.as_deref() {
        Some(pattern) => generate_matching(pattern, rng),
        None => Ok(lorem(rng, text_length(node))),
    }
}

/// Lorem text of exactly `length` characters.
pub fn lorem(rng: &mut StdRng, length: usize) -> String {
    let mut text = String::new();
    while text.chars().count() < length {
        if !text.is_empty() {
            text.push(' ');
        }
        let paragraph: String = Paragraph(1..3).fake_with_rng(rng);
        text.push_str(&paragraph);
    }
    text.chars().take(length).collect()
}
