//! Error types for the resolution engine.

use fake_generator::FakeError;

/// Errors raised while resolving a request.
///
/// Both variants are fatal to the current resolution only. The caller
/// rolls back and moves on to the next iteration.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Schema node is self-contradictory (missing type, missing items,
    /// inverted bounds)
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// A required resource pool has no available values
    #[error("Resource pool is empty for '{resource}' (profile '{profile}')")]
    EmptyResource { profile: String, resource: String },
}

impl From<FakeError> for EngineError {
    fn from(err: FakeError) -> Self {
        match err {
            FakeError::InvalidConfig(message) => EngineError::InvalidConfig(message),
            other => EngineError::InvalidConfig(other.to_string()),
        }
    }
}

/// Result alias for engine operations.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;
