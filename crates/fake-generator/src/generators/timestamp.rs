//! Date and date-time value generators.

use crate::generator::FakeError;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::Rng;
use schema_core::SchemaNode;
use serde_json::Value;

/// Average year length in milliseconds (365.25 days).
pub const MILLISECONDS_IN_YEAR: i64 = 31_557_600_000;

/// Random instant between now and one year from now.
///
/// This is NOT deterministic across runs: the window moves with the clock.
pub fn random_instant<R: Rng>(rng: &mut R) -> DateTime<Utc> {
    let offset = rng.gen_range(0..=MILLISECONDS_IN_YEAR);
    Utc::now() + Duration::milliseconds(offset)
}

/// `YYYY-MM-DD` within the next year.
pub fn date(_node: &SchemaNode, rng: &mut StdRng) -> Result<Value, FakeError> {
    Ok(Value::String(random_instant(rng).format("%Y-%m-%d").to_string()))
}

/// RFC 3339 timestamp (millisecond precision, `Z` suffix) within the next year.
pub fn date_time(_node: &SchemaNode, rng: &mut StdRng) -> Result<Value, FakeError> {
    Ok(Value::String(
        random_instant(rng).to_rfc3339_opts(SecondsFormat::Millis, true),
    ))
}
