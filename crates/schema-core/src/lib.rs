//! Core types for the atlas load testing engine.
//!
//! This crate provides the foundational types shared by the value generator
//! and the runtime engine:
//!
//! - [`SchemaNode`] - Recursive description of a value to produce
//! - [`OperationSchema`] / [`SchemaBook`] - Per-operation request/response schemas
//! - [`ResourceValue`] - Scalar identifier stored in resource pools
//! - [`ValueMap`] - Resource name to observed value set, the unit of correlation
//!
//! # Architecture
//!
//! ```text
//! schema-core (this crate)
//!    │
//!    ├─── fake-generator  (SchemaNode -> fake serde_json::Value)
//!    │
//!    └─── atlas-engine    (pools, relationship index, provider, correlator)
//! ```
//!
//! # Example
//!
//! ```rust
//! use schema_core::{SchemaNode, SchemaType};
//!
//! let node: SchemaNode = serde_json::from_str(r#"{
//!     "type": "object",
//!     "properties": {
//!         "id": {"type": "integer", "resource": "pet"},
//!         "name": {"type": "string", "maxLength": 20}
//!     }
//! }"#).unwrap();
//!
//! assert_eq!(node.schema_type, Some(SchemaType::Object));
//! assert_eq!(node.properties["id"].resource.as_deref(), Some("pet"));
//! ```

pub mod schema;
pub mod values;

// Re-exports for convenience
pub use schema::{
    OperationSchema, ResourceOptions, SchemaBook, SchemaError, SchemaNode, SchemaType,
};
pub use values::{scalar_set, FloatValue, ResourceValue, ValueMap, ValueSet};
