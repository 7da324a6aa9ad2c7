//! Concrete connectivity strategies and CLI plumbing for the latency harness.
//!
//! The harness crate owns sampling, warmth and aggregation; this crate owns
//! the network: one [`latency_harness::QueryStrategy`] per connectivity
//! method, plus configuration loading and the command-line surface.

pub mod cli;
pub mod config;
pub mod schema;
pub mod strategies;

pub use config::{BenchConfig, FileConfig};
