//! Resource resolution and relationship engine for schema-driven load tests.
//!
//! Virtual users build requests from operation schemas. Values for nodes
//! tagged with a `resource` come from shared pools; everything else is
//! faked. Successful responses feed new values back into the pools and
//! record which values were observed together, so later requests can use
//! consistent combinations (a pet together with its own category, say).
//!
//! ```text
//!            ┌─────────────┐  resolve   ┌──────────────┐  send   ┌───────────┐
//! Schema ──▶ │  Provider   │ ─────────▶ │ VirtualUser  │ ──────▶ │ Transport │
//!            └──────┬──────┘            └──────┬───────┘         └─────┬─────┘
//!        sample /   │                          │ 2xx: correlate        │
//!        delete     ▼                          ▼                       │
//!            ┌─────────────┐  merge     ┌──────────────────┐           │
//!            │ResourcePool │ ◀───────── │ResponseCorrelator│ ◀─────────┘
//!            └─────────────┘            └────────┬─────────┘
//!                   ▲ exists                     │ insert
//!            ┌──────┴────────────┐               ▼
//!            │ RelationshipIndex │ ◀─────────────┘
//!            └───────────────────┘
//! ```
//!
//! Pools and the relationship index are keyed by profile: values observed
//! by one profile are never handed to another.

pub mod config;
pub mod context;
pub mod correlator;
pub mod error;
mod keyed;
pub mod pool;
pub mod provider;
pub mod relations;
pub mod runner;

pub use config::{ConfigError, EngineConfig, ProfileDefinition};
pub use context::RunContext;
pub use correlator::{format_resource_map, Correlation, ResponseCorrelator};
pub use error::{EngineError, Result};
pub use pool::{PoolKey, ResourcePool};
pub use provider::Provider;
pub use relations::{RelatedValues, RelationKey, RelationshipIndex};
pub use runner::{
    run_load, InboundResponse, OutboundRequest, Outcome, OutcomeCounts, RunSummary, RunnerConfig,
    Transport, VirtualUser,
};

pub use fake_generator::{FakeError, FakeGenerator, ValueGenerator};
pub use schema_core::{
    OperationSchema, ResourceOptions, ResourceValue, SchemaBook, SchemaNode, SchemaType, ValueMap,
    ValueSet,
};
