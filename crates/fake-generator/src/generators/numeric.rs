//! Numeric value generators.

use super::{pick_enum, range};
use crate::generator::FakeError;
use rand::rngs::StdRng;
use rand::Rng;
use schema_core::SchemaNode;
use serde_json::Value;

/// Random integer within the node's range, honouring `multipleOf`.
///
/// The range is scaled down by the divisor, sampled, and scaled back up, so
/// every result is a multiple of the divisor. It lies inside the original
/// bounds whenever some multiple does.
pub fn integer(node: &SchemaNode, rng: &mut StdRng) -> Result<Value, FakeError> {
    if let Some(value) = pick_enum(node, rng) {
        return Ok(value);
    }

    let (low, high) = range(node)?;
    let step = node.multiple_of.filter(|m| *m > 0.0).unwrap_or(1.0);

    let low = (low / step).ceil() as i64;
    let high = (high / step).floor() as i64;
    // No multiple inside the range: the scaled bounds cross, and the draw
    // falls on one of the two multiples bracketing it.
    let (low, high) = if low > high { (high, low) } else { (low, high) };

    Ok(scaled(rng.gen_range(low..=high), step))
}

fn scaled(factor: i64, step: f64) -> Value {
    if step.fract() == 0.0 {
        Value::from(factor.saturating_mul(step as i64))
    } else {
        Value::from(factor as f64 * step)
    }
}

/// Random number within the node's range with a two-decimal fraction.
///
/// The whole part is drawn first; a fraction that pushes the value past the
/// maximum is clamped back onto it.
pub fn number(node: &SchemaNode, rng: &mut StdRng) -> Result<Value, FakeError> {
    if let Some(value) = pick_enum(node, rng) {
        return Ok(value);
    }

    let (minimum, maximum) = range(node)?;

    let whole = if minimum.fract() == 0.0 && maximum.fract() == 0.0 {
        rng.gen_range(minimum as i64..=maximum as i64) as f64
    } else {
        rng.gen_range(minimum..=maximum)
    };
    let fraction = (rng.gen::<f64>() * 100.0).round() / 100.0;

    let mut value = whole + fraction;
    if value > maximum {
        value = maximum;
    }

    Ok(Value::from(value))
}
