//! Error taxonomy for the sampling harness.
//!
//! | Error                | Raised by         | Handling                                   |
//! |----------------------|-------------------|--------------------------------------------|
//! | `StrategyError`      | strategy adapters | recovered by the sample runner as a gap    |
//! | `ConfigurationError` | controller        | returned to the caller before a run starts |
//!
//! Nothing raised inside an iteration ever reaches the caller of a run.

use thiserror::Error;

use crate::strategy::StrategyId;

/// Failure of a single adapter invocation.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// Connection could not be established (DNS, TCP, TLS, handshake, auth).
    #[error("connect failed: {0}")]
    Connect(String),

    /// The database rejected or failed the query.
    #[error("query failed: {0}")]
    Query(String),

    /// Transport-level failure after the connection was up.
    #[error("transport error: {0}")]
    Transport(String),

    /// Response arrived but could not be decoded into rows.
    #[error("decode failed: {0}")]
    Decode(String),

    /// Adapters must perform at least one round trip.
    #[error("repetitions must be at least 1, got {0}")]
    InvalidRepetitions(u32),
}

/// Rejected run configuration. The controller refuses to start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("no strategy selected")]
    NoStrategy,

    #[error("strategy '{0}' is not registered")]
    UnknownStrategy(StrategyId),

    #[error("queries per sample must be within [{min}, {max}], got {got}")]
    QueriesOutOfRange { got: u32, min: u32, max: u32 },

    #[error("sample count must be at least 1")]
    EmptyRun,
}
