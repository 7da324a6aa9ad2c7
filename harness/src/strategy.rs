//! The capability every connectivity method implements.
//!
//! The harness never branches on which strategy it is driving; it looks the
//! adapter up by [`StrategyId`] and calls [`QueryStrategy::execute`].

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::StrategyError;

/// Smallest accepted waterfall length.
pub const MIN_REPETITIONS: u32 = 1;
/// Largest accepted waterfall length.
pub const MAX_REPETITIONS: u32 = 5;
/// Upper bound on rows fetched by a single round trip.
pub const ROW_LIMIT: usize = 10;

/// Opaque key identifying a connectivity method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyId(String);

impl StrategyId {
    pub const TCP_POOL: &'static str = "tcp-pool";
    pub const HTTP: &'static str = "http";
    pub const WEBSOCKET: &'static str = "websocket";
    pub const HTTP_ORM: &'static str = "http-orm";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Human-readable label used in reports. Unknown ids render as themselves.
    pub fn display_name(&self) -> &str {
        match self.as_str() {
            Self::TCP_POOL => "Postgres pool (TCP)",
            Self::HTTP => "Serverless HTTP",
            Self::WEBSOCKET => "Serverless WebSocket",
            Self::HTTP_ORM => "Typed query builder (HTTP)",
            other => other,
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StrategyId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// What one adapter invocation produced.
#[derive(Debug, Clone, Default)]
pub struct QueryOutput {
    /// Rows of the final repetition only.
    pub rows: Vec<serde_json::Value>,
    /// Time spent inside `execute`, excluding dispatch overhead.
    pub query_duration_ms: f64,
    /// Whether the adapter had to open a new connection for this call.
    pub fresh_connection: bool,
}

/// One connectivity method: run `repetitions` sequential queries against the
/// fixed `employees` row set.
///
/// Implementations own their connections and are responsible for their
/// thread-safety; the harness never issues overlapping calls.
#[async_trait]
pub trait QueryStrategy: Send + Sync {
    fn id(&self) -> StrategyId;

    async fn execute(&self, repetitions: u32) -> Result<QueryOutput, StrategyError>;
}

/// Clamp an externally supplied repetition count into the accepted range,
/// defaulting to a single query when none was given.
pub fn clamp_repetitions(requested: Option<i64>) -> u32 {
    match requested {
        Some(n) => n.clamp(MIN_REPETITIONS as i64, MAX_REPETITIONS as i64) as u32,
        None => MIN_REPETITIONS,
    }
}
