//! Concrete [`QueryStrategy`] adapters.
//!
//! | id          | Transport                            | Connection lifetime       |
//! |-------------|--------------------------------------|---------------------------|
//! | `tcp-pool`  | tokio-postgres over TLS              | kept for the process      |
//! | `http`      | SQL-over-HTTP (`POST /sql`)          | none (stateless)          |
//! | `websocket` | Postgres wire protocol over WebSocket| one per call              |
//! | `http-orm`  | typed builder over SQL-over-HTTP     | none (stateless)          |

pub mod http;
pub mod http_orm;
pub mod tcp_pool;
pub mod websocket;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use latency_harness::{clamp_repetitions, QueryStrategy, StrategyError, StrategyId};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::BenchConfig;

pub use http::{HttpStrategy, SqlOverHttp};
pub use http_orm::HttpOrmStrategy;
pub use tcp_pool::TcpPoolStrategy;
pub use websocket::{WebSocketStrategy, WsByteStream};

/// Every strategy id this binary knows, in presentation order.
pub const ALL: [&str; 4] = [
    StrategyId::TCP_POOL,
    StrategyId::HTTP,
    StrategyId::WEBSOCKET,
    StrategyId::HTTP_ORM,
];

/// Build every adapter from one configuration. Nothing connects here.
pub fn build_all(config: &BenchConfig) -> Result<Vec<Arc<dyn QueryStrategy>>> {
    let database_url = config.require_database_url()?;
    let http_endpoint = config.resolved_http_endpoint()?;
    let ws_endpoint = config.resolved_ws_endpoint()?;
    info!(%http_endpoint, %ws_endpoint, "Resolved serverless endpoints");

    let http = Arc::new(
        SqlOverHttp::new(http_endpoint, database_url).context("failed to build HTTP client")?,
    );

    let strategies: Vec<Arc<dyn QueryStrategy>> = vec![
        Arc::new(TcpPoolStrategy::new(database_url)),
        Arc::new(HttpStrategy::new(http.clone())),
        Arc::new(
            WebSocketStrategy::new(database_url, ws_endpoint)
                .context("database URL is not a valid Postgres connection string")?,
        ),
        Arc::new(HttpOrmStrategy::new(http)),
    ];
    Ok(strategies)
}

/// Body of a single ad-hoc invocation: the final repetition's rows and the
/// adapter-measured duration.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub data: Vec<serde_json::Value>,
    #[serde(rename = "queryDuration")]
    pub query_duration: f64,
}

/// Invoke `strategy` once with an untrusted repetition count. Out-of-range
/// counts are clamped into `[1, 5]`; a missing count means one query.
pub async fn invoke(
    strategy: &dyn QueryStrategy,
    requested: Option<i64>,
) -> Result<QueryResponse, StrategyError> {
    let repetitions = clamp_repetitions(requested);
    debug!(strategy = %strategy.id(), ?requested, repetitions, "ad-hoc invocation");
    let output = strategy.execute(repetitions).await?;
    Ok(QueryResponse {
        data: output.rows,
        query_duration: output.query_duration_ms,
    })
}

pub(crate) fn ensure_repetitions(repetitions: u32) -> Result<(), StrategyError> {
    if repetitions == 0 {
        return Err(StrategyError::InvalidRepetitions(repetitions));
    }
    Ok(())
}

pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
