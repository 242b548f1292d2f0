//! Resource value representations.
//!
//! Resource pools hold interchangeable identifiers, so only scalars that can
//! act as identifiers are modelled: integers, non-integral numbers and
//! strings. All of them are totally ordered and hashable, which lets pools
//! and relationship tuples live in ordinary sets.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Set of values observed for one resource.
pub type ValueSet = BTreeSet<ResourceValue>;

/// Resource name to the values observed (or drawn) for it.
pub type ValueMap = BTreeMap<String, ValueSet>;

/// `f64` with bitwise equality and IEEE total ordering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FloatValue(pub f64);

impl PartialEq for FloatValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatValue {}

impl Hash for FloatValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl PartialOrd for FloatValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// A scalar identifier held in a resource pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceValue {
    /// Integral number
    Int(i64),

    /// Non-integral number
    Float(FloatValue),

    /// String identifier
    Str(String),
}

impl ResourceValue {
    /// Convert a JSON scalar into a resource value.
    ///
    /// Returns `None` for null, booleans, arrays and objects.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Self::Int(i))
                } else {
                    n.as_f64().map(|f| Self::Float(FloatValue(f)))
                }
            }
            Value::String(s) => Some(Self::Str(s.clone())),
            _ => None,
        }
    }

    /// Convert back into JSON.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Int(i) => Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(f.0)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Str(s) => Value::String(s.clone()),
        }
    }

    /// Try to get this value as an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{}", v.0),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ResourceValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ResourceValue {
    fn from(value: i32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<f64> for ResourceValue {
    fn from(value: f64) -> Self {
        Self::Float(FloatValue(value))
    }
}

impl From<&str> for ResourceValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ResourceValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// Collect the scalar values of a JSON value.
///
/// A scalar yields a singleton set, an array yields its scalar elements.
/// Anything else is ignored.
pub fn scalar_set(value: &Value) -> ValueSet {
    match value {
        Value::Array(items) => items.iter().filter_map(ResourceValue::from_json).collect(),
        other => ResourceValue::from_json(other).into_iter().collect(),
    }
}
