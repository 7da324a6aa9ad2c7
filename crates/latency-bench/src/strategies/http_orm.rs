//! Typed query builder over the SQL-over-HTTP transport.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use latency_harness::{QueryOutput, QueryStrategy, StrategyError, StrategyId, ROW_LIMIT};

use super::{elapsed_ms, ensure_repetitions, SqlOverHttp};
use crate::schema::{Employee, Select};

pub struct HttpOrmStrategy {
    http: Arc<SqlOverHttp>,
    query: Select<Employee>,
}

impl HttpOrmStrategy {
    pub fn new(http: Arc<SqlOverHttp>) -> Self {
        Self {
            http,
            query: Select::new().limit(ROW_LIMIT),
        }
    }
}

#[async_trait]
impl QueryStrategy for HttpOrmStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::new(StrategyId::HTTP_ORM)
    }

    async fn execute(&self, repetitions: u32) -> Result<QueryOutput, StrategyError> {
        ensure_repetitions(repetitions)?;
        let start = Instant::now();
        let sql = self.query.to_sql();

        let mut employees = Vec::new();
        for _ in 0..repetitions {
            let raw = self.http.query(&sql, &[]).await?;
            employees = self
                .query
                .decode(raw)
                .map_err(|e| StrategyError::Decode(e.to_string()))?;
        }

        let rows = employees
            .into_iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StrategyError::Decode(e.to_string()))?;

        Ok(QueryOutput {
            rows,
            query_duration_ms: elapsed_ms(start),
            fresh_connection: true,
        })
    }
}
