//! PostgreSQL target database operations.
//!
//! One fresh connection per checksum execution; the connection task ends
//! when the client is dropped at the end of the call.

use crate::config::EndpointConfig;
use crate::error::Result;
use crate::types::ChecksumResult;
use tokio_postgres::NoTls;
use tracing::debug;

/// Access to the PostgreSQL-compatible target engine.
pub struct PgTarget {
    config: EndpointConfig,
}

impl PgTarget {
    pub fn new(config: EndpointConfig) -> Self {
        Self { config }
    }

    fn pg_config(&self) -> Result<tokio_postgres::Config> {
        let mut config: tokio_postgres::Config = self.config.url.parse()?;
        config.user(&self.config.user);
        config.password(&self.config.password);
        Ok(config)
    }

    /// Execute a checksum query on a fresh connection, expecting a single
    /// `(cnt, cksum)` row. Returns `Ok(None)` when the query yields no rows.
    pub async fn execute_checksum(&self, sql: &str) -> Result<Option<ChecksumResult>> {
        let (client, connection) = self.pg_config()?.connect(NoTls).await?;
        let connection_task = tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!("Target connection terminated: {}", e);
            }
        });

        let outcome = match client.query_opt(sql, &[]).await? {
            Some(row) => {
                let count: i64 = row.try_get(0)?;
                let checksum: i64 = row.try_get(1)?;
                Ok(Some(ChecksumResult { count, checksum }))
            }
            None => Ok(None),
        };

        drop(client);
        let _ = connection_task.await;
        outcome
    }
}
