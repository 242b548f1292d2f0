//! Realistic internet-flavoured strings backed by the `fake` crate.

use super::pick_enum;
use crate::generator::FakeError;
use fake::faker::internet::en::{DomainSuffix, SafeEmail, Username};
use fake::faker::name::en::FirstName;
use fake::Fake;
use rand::rngs::StdRng;
use rand::Rng;
use schema_core::SchemaNode;
use serde_json::Value;

const URL_UNSAFE: &[char] = &[
    '\\', '~', '#', '&', '*', '{', '}', '/', ':', '<', '>', '?', '|', '"', '\'',
];

/// Email address (`format: email`).
pub fn email(node: &SchemaNode, rng: &mut StdRng) -> Result<Value, FakeError> {
    if let Some(value) = pick_enum(node, rng) {
        return Ok(value);
    }

    let value: String = SafeEmail().fake_with_rng(rng);
    Ok(Value::String(value))
}

/// Avatar-style resource URI (`format: uri`).
pub fn uri(_node: &SchemaNode, rng: &mut StdRng) -> Result<Value, FakeError> {
    let user: String = Username().fake_with_rng(rng);
    let suffix: String = DomainSuffix().fake_with_rng(rng);
    Ok(Value::String(format!(
        "https://avatars.example.{suffix}/{}/128.jpg",
        slugify(&user)
    )))
}

/// Short host URL (`format: url`).
///
/// The host is built from at most five letters of a first name so the URL
/// stays well under typical length limits.
pub fn url(_node: &SchemaNode, rng: &mut StdRng) -> Result<Value, FakeError> {
    let protocol = if rng.gen_bool(0.5) { "http" } else { "https" };
    let name: String = FirstName().fake_with_rng(rng);
    let host: String = name
        .chars()
        .take(5)
        .filter(|c| !URL_UNSAFE.contains(c))
        .collect::<String>()
        .to_lowercase();
    let suffix: String = DomainSuffix().fake_with_rng(rng);

    Ok(Value::String(format!("{protocol}://{host}.{suffix}")))
}

/// URL slug derived from a user name (`format: slug`).
pub fn slug(_node: &SchemaNode, rng: &mut StdRng) -> Result<Value, FakeError> {
    let user: String = Username().fake_with_rng(rng);
    Ok(Value::String(slugify(&user)))
}

/// Lowercase, with runs of non-alphanumerics collapsed into single dashes.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}
