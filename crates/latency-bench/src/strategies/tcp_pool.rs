//! Long-lived Postgres connection over TCP + TLS.
//!
//! The client is opened on first use and kept in a slot for the rest of the
//! process, so only the first call (or the first after a dropped connection)
//! pays for the TCP, TLS and startup handshakes.

use std::time::Instant;

use async_trait::async_trait;
use latency_harness::{QueryOutput, QueryStrategy, StrategyError, StrategyId};
use postgres_native_tls::MakeTlsConnector;
use tokio::sync::Mutex;
use tokio_postgres::Client;
use tracing::{debug, info, warn};

use super::{elapsed_ms, ensure_repetitions};
use crate::schema::{Employee, EMPLOYEES_QUERY};

pub struct TcpPoolStrategy {
    database_url: String,
    slot: Mutex<Option<Client>>,
}

impl TcpPoolStrategy {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            slot: Mutex::new(None),
        }
    }

    async fn connect(&self) -> Result<Client, StrategyError> {
        let connector =
            native_tls::TlsConnector::new().map_err(|e| StrategyError::Connect(e.to_string()))?;
        let (client, connection) =
            tokio_postgres::connect(&self.database_url, MakeTlsConnector::new(connector))
                .await
                .map_err(|e| StrategyError::Connect(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "tcp-pool connection ended with error");
            }
        });
        info!("tcp-pool connection established");
        Ok(client)
    }
}

#[async_trait]
impl QueryStrategy for TcpPoolStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::new(StrategyId::TCP_POOL)
    }

    async fn execute(&self, repetitions: u32) -> Result<QueryOutput, StrategyError> {
        ensure_repetitions(repetitions)?;
        let start = Instant::now();

        let mut slot = self.slot.lock().await;
        let mut fresh_connection = false;
        if slot.as_ref().map_or(true, Client::is_closed) {
            *slot = Some(self.connect().await?);
            fresh_connection = true;
        }
        let Some(client) = slot.as_ref() else {
            return Err(StrategyError::Connect("connection slot empty".into()));
        };

        let mut rows = Vec::new();
        for _ in 0..repetitions {
            match client.query(EMPLOYEES_QUERY, &[]).await {
                Ok(r) => rows = r,
                Err(e) => {
                    if e.is_closed() {
                        debug!("dropping closed tcp-pool connection");
                        *slot = None;
                    }
                    return Err(StrategyError::Query(e.to_string()));
                }
            }
        }

        let rows = rows
            .iter()
            .map(|row| {
                let employee =
                    Employee::try_from(row).map_err(|e| StrategyError::Decode(e.to_string()))?;
                serde_json::to_value(employee).map_err(|e| StrategyError::Decode(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(QueryOutput {
            rows,
            query_duration_ms: elapsed_ms(start),
            fresh_connection,
        })
    }
}
