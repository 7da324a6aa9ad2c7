//! End-to-end controller scenarios against mocked strategy adapters.
//!
//! Tests verify:
//! - A cold first call marks the strategy warm and later samples report warm
//! - Changing sample count between runs clears every strategy's series
//! - Rerunning a strategy with unchanged params clears only that series
//! - Out-of-range query counts are rejected before any adapter call
//! - Completed runs always hold exactly `sample_count` entries

use std::sync::Arc;

use async_trait::async_trait;
use latency_harness::{
    BenchmarkController, ConfigurationError, QueryOutput, QueryStrategy, RunConfiguration,
    SampleRunner, StrategyError, StrategyId, WarmthTracker,
};
use mockall::mock;

mock! {
    pub Strategy {}

    #[async_trait]
    impl QueryStrategy for Strategy {
        fn id(&self) -> StrategyId;
        async fn execute(&self, repetitions: u32) -> Result<QueryOutput, StrategyError>;
    }
}

fn rows(n: usize) -> Vec<serde_json::Value> {
    (0..n)
        .map(|i| serde_json::json!({ "emp_no": i, "first_name": "Ada", "last_name": "Lovelace" }))
        .collect()
}

/// Mock that succeeds `times` times with the expected repetition count.
fn succeeding(id: &str, repetitions: u32, times: usize) -> MockStrategy {
    let mut mock = MockStrategy::new();
    mock.expect_id().return_const(StrategyId::new(id));
    mock.expect_execute()
        .withf(move |r| *r == repetitions)
        .times(times)
        .returning(|_| {
            Ok(QueryOutput {
                rows: rows(10),
                query_duration_ms: 3.5,
                fresh_connection: false,
            })
        });
    mock
}

fn controller(tracker: Arc<WarmthTracker>) -> BenchmarkController {
    BenchmarkController::new(SampleRunner::new(tracker))
}

// ── Scenario: cold first call, warm thereafter ─────────────────────

#[tokio::test]
async fn tcp_pool_cold_start_then_warm() {
    let tracker = Arc::new(WarmthTracker::new());
    let tcp = StrategyId::new(StrategyId::TCP_POOL);
    let mut ctl = controller(tracker.clone()).with_strategy(Arc::new(succeeding("tcp-pool", 2, 10)));

    assert!(!tracker.is_warm(&tcp));
    let result = ctl
        .run_to_completion(RunConfiguration::new("tcp-pool", 2, 10))
        .await
        .expect("valid configuration");

    assert!(result.first_invocation_was_cold);
    assert!(tracker.is_warm(&tcp));
    assert_eq!(result.samples.len(), 10);
    let cold: Vec<bool> = result
        .samples
        .iter()
        .map(|s| s.expect("no failures").invocation_is_cold)
        .collect();
    assert!(cold[0]);
    assert!(cold[1..].iter().all(|c| !c));
    assert!(result.samples.iter().flatten().all(|s| s.row_count == 10));
}

// ── Scenario: parameter change clears everything ───────────────────

#[tokio::test]
async fn changing_sample_count_clears_all_strategies() {
    let mut ctl = controller(Arc::new(WarmthTracker::new()))
        .with_strategy(Arc::new(succeeding("tcp-pool", 1, 50)))
        .with_strategy(Arc::new(succeeding("http", 1, 50 + 25)));

    ctl.run_to_completion(RunConfiguration::new("tcp-pool", 1, 50))
        .await
        .unwrap();
    ctl.run_to_completion(RunConfiguration::new("http", 1, 50))
        .await
        .unwrap();
    assert_eq!(ctl.board().series().len(), 2);

    let result = ctl
        .run_to_completion(RunConfiguration::new("http", 1, 25))
        .await
        .unwrap();

    assert_eq!(result.samples.len(), 25);
    assert_eq!(ctl.board().series().len(), 1);
    assert!(ctl.board().get(&StrategyId::new("tcp-pool")).is_none());
}

#[tokio::test]
async fn changing_query_count_clears_all_strategies() {
    let mut tcp = MockStrategy::new();
    tcp.expect_id().return_const(StrategyId::new("tcp-pool"));
    tcp.expect_execute().times(10).returning(|_| {
        Ok(QueryOutput {
            rows: rows(10),
            query_duration_ms: 1.0,
            fresh_connection: false,
        })
    });
    let mut ctl = controller(Arc::new(WarmthTracker::new()))
        .with_strategy(Arc::new(tcp))
        .with_strategy(Arc::new(succeeding("websocket", 5, 5)));

    ctl.run_to_completion(RunConfiguration::new("tcp-pool", 1, 5))
        .await
        .unwrap();
    ctl.run_to_completion(RunConfiguration::new("websocket", 5, 5))
        .await
        .unwrap();

    let ids: Vec<_> = ctl
        .board()
        .series()
        .iter()
        .map(|r| r.strategy.to_string())
        .collect();
    assert_eq!(ids, vec!["websocket"]);

    ctl.run_to_completion(RunConfiguration::new("tcp-pool", 5, 5))
        .await
        .unwrap();
    assert_eq!(ctl.board().series().len(), 2);
}

// ── Scenario: rerun keeps other series ─────────────────────────────

#[tokio::test]
async fn rerun_clears_only_the_rerun_strategy() {
    let mut ctl = controller(Arc::new(WarmthTracker::new()))
        .with_strategy(Arc::new(succeeding("tcp-pool", 2, 10)))
        .with_strategy(Arc::new(succeeding("http-orm", 2, 20)));

    let tcp = ctl
        .run_to_completion(RunConfiguration::new("tcp-pool", 2, 10))
        .await
        .unwrap();
    let first = ctl
        .run_to_completion(RunConfiguration::new("http-orm", 2, 10))
        .await
        .unwrap();
    let second = ctl
        .run_to_completion(RunConfiguration::new("http-orm", 2, 10))
        .await
        .unwrap();

    assert_eq!(ctl.board().series().len(), 2);
    assert_eq!(ctl.board().get(&StrategyId::new("tcp-pool")), Some(&tcp));
    let kept = ctl.board().get(&StrategyId::new("http-orm")).unwrap();
    assert_eq!(kept.run_id, second.run_id);
    assert_ne!(kept.run_id, first.run_id);
    assert_eq!(kept.samples.len(), 10);
}

// ── Boundary: query count range ────────────────────────────────────

#[tokio::test]
async fn out_of_range_queries_never_reach_the_adapter() {
    let mut mock = MockStrategy::new();
    mock.expect_id().return_const(StrategyId::new("http"));
    mock.expect_execute().never();
    let mut ctl = controller(Arc::new(WarmthTracker::new())).with_strategy(Arc::new(mock));

    for queries in [0, 6, 100] {
        let err = ctl
            .run_to_completion(RunConfiguration::new("http", queries, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::QueriesOutOfRange { got, .. } if got == queries));
    }
    assert!(ctl.board().is_empty());
}

// ── Property: completed runs have exactly n entries ────────────────

#[tokio::test]
async fn completed_run_length_matches_sample_count_despite_failures() {
    for n in [1usize, 10, 25, 50] {
        let mut mock = MockStrategy::new();
        mock.expect_id().return_const(StrategyId::new("websocket"));
        let mut call = 0usize;
        mock.expect_execute().times(n).returning(move |_| {
            call += 1;
            if call % 3 == 0 {
                Err(StrategyError::Connect("handshake timed out".into()))
            } else {
                Ok(QueryOutput {
                    rows: rows(10),
                    query_duration_ms: call as f64,
                    fresh_connection: true,
                })
            }
        });
        let mut ctl = controller(Arc::new(WarmthTracker::new())).with_strategy(Arc::new(mock));

        let result = ctl
            .run_to_completion(RunConfiguration::new("websocket", 1, n))
            .await
            .unwrap();

        assert_eq!(result.samples.len(), n, "n={}", n);
        assert_eq!(result.failed_samples(), n / 3, "n={}", n);
    }
}
