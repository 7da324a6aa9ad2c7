//! Sample runner: one timed adapter invocation.
//!
//! Cold/warm state is read from the tracker *before* the call, so a sample
//! reports the state the strategy was in when it was invoked. Only a
//! successful call warms the strategy. Failures degrade to an absent sample.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::strategy::QueryStrategy;
use crate::warmth::WarmthTracker;

/// One timed execution of a strategy's workload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Time spent executing the repeated queries inside the adapter.
    #[serde(rename = "queryDuration")]
    pub query_duration_ms: f64,
    /// Wall-clock time observed by the runner, adapter overhead included.
    #[serde(rename = "elapsed")]
    pub total_elapsed_ms: f64,
    #[serde(rename = "invocationIsCold")]
    pub invocation_is_cold: bool,
    /// Adapter opened a new connection for this call.
    #[serde(rename = "freshConnection")]
    pub fresh_connection: bool,
    #[serde(rename = "rowCount")]
    pub row_count: usize,
}

/// Wraps adapter calls with timing and warmth bookkeeping.
#[derive(Debug, Clone)]
pub struct SampleRunner {
    tracker: Arc<WarmthTracker>,
}

impl SampleRunner {
    pub fn new(tracker: Arc<WarmthTracker>) -> Self {
        Self { tracker }
    }

    /// Invoke `strategy` once. Never fails: adapter errors yield `None`.
    pub async fn run(&self, strategy: &dyn QueryStrategy, repetitions: u32) -> Option<Sample> {
        let id = strategy.id();
        let invocation_is_cold = !self.tracker.is_warm(&id);

        let start = Instant::now();
        let result = strategy.execute(repetitions).await;
        let total_elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                warn!(
                    strategy = %id,
                    repetitions,
                    elapsed_ms = total_elapsed_ms,
                    error = %e,
                    "sample failed; recording gap"
                );
                return None;
            }
        };

        self.tracker.mark_warm(&id);

        let sample = Sample {
            query_duration_ms: output.query_duration_ms,
            total_elapsed_ms,
            invocation_is_cold,
            fresh_connection: output.fresh_connection,
            row_count: output.rows.len(),
        };
        debug!(
            strategy = %id,
            query_ms = sample.query_duration_ms,
            elapsed_ms = sample.total_elapsed_ms,
            cold = sample.invocation_is_cold,
            fresh_connection = sample.fresh_connection,
            "sample recorded"
        );
        Some(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StrategyError;
    use crate::strategy::{QueryOutput, StrategyId};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FixedStrategy {
        calls: AtomicU32,
        fail: bool,
    }

    impl FixedStrategy {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl QueryStrategy for FixedStrategy {
        fn id(&self) -> StrategyId {
            StrategyId::new("fixed")
        }

        async fn execute(&self, repetitions: u32) -> Result<QueryOutput, StrategyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StrategyError::Connect("refused".into()));
            }
            Ok(QueryOutput {
                rows: vec![serde_json::json!({ "emp_no": repetitions })],
                query_duration_ms: 4.0,
                fresh_connection: false,
            })
        }
    }

    #[tokio::test]
    async fn first_success_is_cold_then_warm() {
        let runner = SampleRunner::new(Arc::new(WarmthTracker::new()));
        let strategy = FixedStrategy::new(false);

        let first = runner.run(&strategy, 2).await.unwrap();
        let second = runner.run(&strategy, 2).await.unwrap();

        assert!(first.invocation_is_cold);
        assert!(!second.invocation_is_cold);
        assert_eq!(first.query_duration_ms, 4.0);
        assert_eq!(first.row_count, 1);
        assert!(first.total_elapsed_ms >= 0.0);
    }

    #[tokio::test]
    async fn failure_yields_gap_and_keeps_strategy_cold() {
        let tracker = Arc::new(WarmthTracker::new());
        let runner = SampleRunner::new(tracker.clone());
        let strategy = FixedStrategy::new(true);

        assert!(runner.run(&strategy, 1).await.is_none());
        assert!(!tracker.is_warm(&StrategyId::new("fixed")));
        assert_eq!(strategy.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sample_serializes_presentation_shape() {
        let sample = Sample {
            query_duration_ms: 12.5,
            total_elapsed_ms: 40.0,
            invocation_is_cold: true,
            fresh_connection: true,
            row_count: 10,
        };
        let json = serde_json::to_value(sample).unwrap();
        assert_eq!(json["queryDuration"], 12.5);
        assert_eq!(json["elapsed"], 40.0);
        assert_eq!(json["invocationIsCold"], true);
    }
}
