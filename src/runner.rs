//! Virtual users driving operations against a transport.
//!
//! Each virtual user runs in its own task and loops over the operations of
//! a [`SchemaBook`]: pick related resources, resolve parameters and body,
//! send, then correlate the response on success or roll back deletions on
//! failure. Per-request provider state is cleared after every operation.

use crate::context::RunContext;
use crate::correlator::ResponseCorrelator;
use crate::error::EngineError;
use crate::provider::Provider;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fake_generator::{FakeGenerator, ValueGenerator};
use schema_core::{OperationSchema, SchemaBook, SchemaNode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Profile used when the runner config names none.
pub const DEFAULT_PROFILE: &str = "default";

/// A resolved request, ready to send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundRequest {
    pub operation: String,
    pub profile: String,
    pub user: usize,
    pub parameters: Value,
    pub body: Value,
}

/// A transport's reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundResponse {
    pub status: u16,
    #[serde(default)]
    pub body: Value,
}

impl InboundResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Carries requests to the system under test.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> anyhow::Result<InboundResponse>;
}

/// Result of one operation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// 2xx response, correlated
    Succeeded,
    /// Transport error or non-2xx response, deletions rolled back
    Failed,
    /// Request could not be resolved (empty pool, invalid schema)
    Skipped,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Succeeded => write!(f, "succeeded"),
            Outcome::Failed => write!(f, "failed"),
            Outcome::Skipped => write!(f, "skipped"),
        }
    }
}

/// Runner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Concurrent virtual users
    pub users: usize,
    /// Passes over the operation list per user
    pub iterations: usize,
    /// Profiles assigned to users round-robin
    #[serde(default)]
    pub profiles: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            users: 1,
            iterations: 1,
            profiles: Vec::new(),
        }
    }
}

impl RunnerConfig {
    fn profile_for(&self, user: usize) -> String {
        if self.profiles.is_empty() {
            return DEFAULT_PROFILE.to_string();
        }
        self.profiles[user % self.profiles.len()].clone()
    }
}

/// Per-outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl OutcomeCounts {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Succeeded => self.succeeded += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }

    pub fn absorb(&mut self, other: OutcomeCounts) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }

    pub fn total(&self) -> u64 {
        self.succeeded + self.failed + self.skipped
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub users: usize,
    pub outcomes: OutcomeCounts,
}

impl RunSummary {
    pub fn duration_ms(&self) -> i64 {
        (self.completed_at - self.started_at).num_milliseconds()
    }
}

/// One simulated client.
pub struct VirtualUser<G = FakeGenerator> {
    id: usize,
    provider: Provider<G>,
    correlator: ResponseCorrelator,
}

impl<G: ValueGenerator> VirtualUser<G> {
    pub fn new(id: usize, provider: Provider<G>, correlator: ResponseCorrelator) -> Self {
        Self {
            id,
            provider,
            correlator,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn provider(&self) -> &Provider<G> {
        &self.provider
    }

    /// Resolve, send and settle one operation.
    pub async fn run_operation<T>(&mut self, operation: &OperationSchema, transport: &T) -> Outcome
    where
        T: Transport + ?Sized,
    {
        let outcome = self.attempt(operation, transport).await;
        debug!(user = self.id, operation = %operation.name, %outcome, "Operation finished");
        self.provider.reset();
        outcome
    }

    async fn attempt<T>(&mut self, operation: &OperationSchema, transport: &T) -> Outcome
    where
        T: Transport + ?Sized,
    {
        self.provider.select_related(operation.related_resources.as_slice());

        let request = match self.build_request(operation) {
            Ok(request) => request,
            Err(e) => {
                warn!(user = self.id, operation = %operation.name, error = %e, "Skipping operation");
                self.provider.rollback_deleted();
                return Outcome::Skipped;
            }
        };

        let response = match transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(user = self.id, operation = %operation.name, error = %e, "Request failed");
                self.provider.rollback_deleted();
                return Outcome::Failed;
            }
        };

        if !response.is_success() {
            warn!(
                user = self.id,
                operation = %operation.name,
                status = response.status,
                "Unsuccessful response, rolling back deleted resources"
            );
            self.provider.rollback_deleted();
            return Outcome::Failed;
        }

        let empty = SchemaNode::default();
        let schema = operation.response.as_ref().unwrap_or(&empty);
        self.correlator
            .resolve(schema, &response.body, self.provider.usage());
        Outcome::Succeeded
    }

    fn build_request(&mut self, operation: &OperationSchema) -> Result<OutboundRequest, EngineError> {
        let parameters = match &operation.parameters {
            Some(node) => self.provider.resolve(node)?,
            None => Value::Null,
        };
        let body = match &operation.body {
            Some(node) => self.provider.resolve(node)?,
            None => Value::Null,
        };

        Ok(OutboundRequest {
            operation: operation.name.clone(),
            profile: self.provider.profile().to_string(),
            user: self.id,
            parameters,
            body,
        })
    }
}

/// Run `config.users` virtual users concurrently until each has completed
/// `config.iterations` passes over the book's operations.
pub async fn run_load<T>(
    context: &RunContext,
    book: Arc<SchemaBook>,
    transport: Arc<T>,
    config: &RunnerConfig,
) -> anyhow::Result<RunSummary>
where
    T: Transport + 'static,
{
    let started_at = Utc::now();
    info!(
        users = config.users,
        iterations = config.iterations,
        operations = book.operations.len(),
        "Starting load run"
    );

    let mut tasks = JoinSet::new();
    for id in 0..config.users {
        let profile = config.profile_for(id);
        let mut user = VirtualUser::new(id, context.provider(&profile), context.correlator(&profile));
        let book = Arc::clone(&book);
        let transport = Arc::clone(&transport);
        let iterations = config.iterations;

        tasks.spawn(async move {
            let mut counts = OutcomeCounts::default();
            for _ in 0..iterations {
                for operation in &book.operations {
                    counts.record(user.run_operation(operation, transport.as_ref()).await);
                }
            }
            counts
        });
    }

    let mut outcomes = OutcomeCounts::default();
    while let Some(joined) = tasks.join_next().await {
        outcomes.absorb(joined.context("Virtual user task panicked")?);
    }

    let summary = RunSummary {
        started_at,
        completed_at: Utc::now(),
        users: config.users,
        outcomes,
    };
    info!(
        succeeded = summary.outcomes.succeeded,
        failed = summary.outcomes.failed,
        skipped = summary.outcomes.skipped,
        duration_ms = summary.duration_ms(),
        "Load run complete"
    );
    Ok(summary)
}
