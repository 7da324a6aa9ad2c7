//! Latency sampling harness
//!
//! Measures how long database queries take through different connectivity
//! strategies, separating the cost of a cold invocation (connection setup)
//! from steady-state latency.
//!
//! # Architecture
//!
//! ```text
//! BenchmarkController ──► SampleRunner ──► dyn QueryStrategy (adapter)
//!        │                     │
//!        │                     └──► WarmthTracker (cold/warm per strategy)
//!        ▼
//!     RunBoard ──► aggregate::summarize ──► report
//! ```
//!
//! The controller issues one sample at a time and publishes a snapshot after
//! each. Adapter failures become gaps in the series; only configuration
//! errors ever reach the caller.

#![allow(clippy::uninlined_format_args)]

pub mod aggregate;
pub mod controller;
pub mod errors;
pub mod report;
pub mod sampler;
pub mod strategy;
pub mod warmth;

pub use aggregate::{summarize, Metric, Summary};
pub use controller::{
    BenchmarkController, RunBoard, RunConfiguration, RunParams, RunResult, RunSnapshot,
};
pub use errors::{ConfigurationError, StrategyError};
pub use sampler::{Sample, SampleRunner};
pub use strategy::{
    clamp_repetitions, QueryOutput, QueryStrategy, StrategyId, MAX_REPETITIONS, MIN_REPETITIONS,
    ROW_LIMIT,
};
pub use warmth::WarmthTracker;

/// Identifier assigned to every run.
pub use uuid::Uuid as RunId;
