//! Fake value generator for the atlas load testing engine.
//!
//! This crate turns a [`SchemaNode`](schema_core::SchemaNode) into one
//! plausible JSON value. Generation is a pure function of the node and the
//! random source, so a [`FakeGenerator`] built from a fixed seed replays the
//! same values.
//!
//! # Architecture
//!
//! ```text
//! SchemaNode { type, format, constraints }
//!        │
//!        ▼
//! ┌──────────────────────┐
//! │    FakeGenerator     │   lookup (type, format)
//! │                      │   ├─ exact match
//! │  - rng (StdRng)      │   ├─ (type, "$any")
//! └──────────┬───────────┘   └─ none -> Ok(None)
//!            │
//!            ▼
//!   Option<serde_json::Value>
//! ```
//!
//! # Example
//!
//! ```rust
//! use fake_generator::{FakeGenerator, ValueGenerator};
//! use schema_core::SchemaNode;
//!
//! let node = SchemaNode::from_json_value(serde_json::json!({
//!     "type": "integer",
//!     "minimum": 18,
//!     "maximum": 80
//! })).unwrap();
//!
//! let mut generator = FakeGenerator::new(42);
//! let age = generator.generate(&node).unwrap().unwrap();
//! assert!((18..=80).contains(&age.as_i64().unwrap()));
//! ```
//!
//! # Generators
//!
//! | type      | format                  | output                               |
//! |-----------|-------------------------|--------------------------------------|
//! | `integer` | any                     | uniform integer, honours `multipleOf`|
//! | `number`  | any                     | integer part plus two decimals       |
//! | `string`  | none                    | lorem text or `pattern` match        |
//! | `string`  | `date`, `date-time`     | instant within the next year         |
//! | `string`  | `email`, `uri`, `url`, `slug`, `password` | realistic data     |
//! | `string`  | `uuid`                  | UUID v4                              |
//! | `string`  | `byte`                  | Base64 of a generated string         |
//! | `string`  | `json`                  | empty object                         |
//! | `boolean` | none                    | uniform `true`/`false`               |

pub mod generator;
pub mod generators;

// Re-exports for convenience
pub use generator::{FakeError, FakeGenerator, ValueGenerator};
