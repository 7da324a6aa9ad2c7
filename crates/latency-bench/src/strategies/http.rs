//! Stateless SQL-over-HTTP transport.
//!
//! Each query is a single `POST` carrying the connection string in the
//! `Neon-Connection-String` header and `{"query", "params"}` in the body.
//! There is no session to keep warm, so every call reports a fresh
//! connection.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use latency_harness::{QueryOutput, QueryStrategy, StrategyError, StrategyId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{elapsed_ms, ensure_repetitions};
use crate::schema::EMPLOYEES_QUERY;

const CONNECTION_STRING_HEADER: &str = "Neon-Connection-String";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct SqlRequest<'a> {
    query: &'a str,
    params: &'a [serde_json::Value],
}

#[derive(Debug, Deserialize)]
struct SqlResponse {
    #[serde(default)]
    rows: Vec<serde_json::Value>,
}

/// Shared HTTP client bound to one endpoint and connection string.
pub struct SqlOverHttp {
    client: reqwest::Client,
    endpoint: String,
    connection_string: String,
}

impl SqlOverHttp {
    pub fn new(
        endpoint: impl Into<String>,
        connection_string: impl Into<String>,
    ) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            connection_string: connection_string.into(),
        })
    }

    /// Run one statement and return its rows.
    pub async fn query(
        &self,
        sql: &str,
        params: &[serde_json::Value],
    ) -> Result<Vec<serde_json::Value>, StrategyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONNECTION_STRING_HEADER, &self.connection_string)
            .json(&SqlRequest { query: sql, params })
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StrategyError::Query(format!("HTTP {status}: {body}")));
        }

        let body: SqlResponse = response
            .json()
            .await
            .map_err(|e| StrategyError::Decode(e.to_string()))?;
        debug!(rows = body.rows.len(), "sql-over-http response");
        Ok(body.rows)
    }
}

fn classify(err: reqwest::Error) -> StrategyError {
    if err.is_connect() {
        StrategyError::Connect(err.to_string())
    } else {
        StrategyError::Transport(err.to_string())
    }
}

/// Raw SQL over the shared HTTP transport.
pub struct HttpStrategy {
    http: Arc<SqlOverHttp>,
}

impl HttpStrategy {
    pub fn new(http: Arc<SqlOverHttp>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl QueryStrategy for HttpStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::new(StrategyId::HTTP)
    }

    async fn execute(&self, repetitions: u32) -> Result<QueryOutput, StrategyError> {
        ensure_repetitions(repetitions)?;
        let start = Instant::now();

        let mut rows = Vec::new();
        for _ in 0..repetitions {
            rows = self.http.query(EMPLOYEES_QUERY, &[]).await?;
        }

        Ok(QueryOutput {
            rows,
            query_duration_ms: elapsed_ms(start),
            fresh_connection: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let body = serde_json::to_value(SqlRequest {
            query: EMPLOYEES_QUERY,
            params: &[],
        })
        .unwrap();
        assert_eq!(body["query"], EMPLOYEES_QUERY);
        assert_eq!(body["params"], serde_json::json!([]));
    }

    #[test]
    fn response_rows_default_to_empty() {
        let parsed: SqlResponse =
            serde_json::from_str(r#"{"command":"SELECT","rowCount":0}"#).unwrap();
        assert!(parsed.rows.is_empty());

        let parsed: SqlResponse = serde_json::from_str(
            r#"{"rows":[{"emp_no":"10001","first_name":"Georgi","last_name":"Facello"}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.rows.len(), 1);
    }

    #[tokio::test]
    async fn refused_connection_is_a_connect_error() {
        let http = SqlOverHttp::new("http://127.0.0.1:1/sql", "postgres://u:p@h/db").unwrap();
        let err = http.query(EMPLOYEES_QUERY, &[]).await.unwrap_err();
        assert!(matches!(err, StrategyError::Connect(_)));
    }

    #[tokio::test]
    async fn zero_repetitions_rejected_without_request() {
        let http = Arc::new(SqlOverHttp::new("http://127.0.0.1:1/sql", "postgres://x").unwrap());
        let err = HttpStrategy::new(http).execute(0).await.unwrap_err();
        assert!(matches!(err, StrategyError::InvalidRepetitions(0)));
    }
}
