//! Oracle source database operations.
//!
//! The source driver is blocking; callers on the async runtime wrap these
//! operations in `tokio::task::spawn_blocking`. Checksum execution opens one
//! fresh connection per call and closes it on every exit path; planning
//! holds a single connection for its whole duration.

use crate::canon::{ColumnDescriptor, ColumnKind};
use crate::config::EndpointConfig;
use crate::error::{Result, SynthesisError};
use crate::types::ChecksumResult;
use oracle::sql_type::ToSql;
use oracle::Connection;
use tracing::debug;

/// Access to the Oracle-family source engine.
pub struct OracleSource {
    config: EndpointConfig,
}

impl OracleSource {
    pub fn new(config: EndpointConfig) -> Self {
        Self { config }
    }

    /// Open a fresh connection.
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::connect(&self.config.user, &self.config.password, &self.config.url)?;
        debug!("Connected to source: {}", self.config.url);
        Ok(conn)
    }

    /// Execute a checksum query on a fresh connection, expecting a single
    /// `(cnt, cksum)` row. Returns `Ok(None)` when the query yields no rows.
    pub fn execute_checksum(&self, sql: &str) -> Result<Option<ChecksumResult>> {
        let conn = self.connect()?;
        let outcome = fetch_checksum_row(&conn, sql);
        if let Err(e) = conn.close() {
            debug!("Closing source connection failed: {}", e);
        }
        outcome
    }
}

fn fetch_checksum_row(conn: &Connection, sql: &str) -> Result<Option<ChecksumResult>> {
    let mut rows = conn.query_as::<(i64, i64)>(sql, &[])?;
    match rows.next() {
        Some(row) => {
            let (count, checksum) = row?;
            Ok(Some(ChecksumResult { count, checksum }))
        }
        None => Ok(None),
    }
}

/// Describe the projected columns of a base query without fetching rows.
///
/// The wrapper `WHERE 1 = 0` makes the execution a pure describe: the driver
/// populates column metadata but no row is ever produced. This is the only
/// authoritative source of column names and kinds; the target is not probed.
pub fn describe_columns(
    conn: &Connection,
    base_sql: &str,
) -> std::result::Result<Vec<ColumnDescriptor>, SynthesisError> {
    let describe_sql = format!("select * from ({base_sql}) where 1 = 0");
    let rows = conn
        .query(&describe_sql, &[])
        .map_err(SynthesisError::describe_failed)?;
    let columns = rows
        .column_info()
        .iter()
        .map(|info| {
            ColumnDescriptor::new(info.name(), ColumnKind::from_oracle_type(info.oracle_type()))
        })
        .collect();
    Ok(columns)
}

/// List the qualified tables of one schema from the source catalog.
pub fn tables_in_schema(conn: &Connection, schema: &str) -> Result<Vec<String>> {
    let rows = conn.query_as::<(String, String)>(
        "select owner, table_name from dba_tables where owner = :1 \
         order by owner, table_name",
        &[&schema.to_uppercase()],
    )?;
    let mut tables = Vec::new();
    for row in rows {
        let (owner, table) = row?;
        tables.push(format!("{owner}.{table}"));
    }
    Ok(tables)
}

/// Fetch `(qualified_name, num_rows)` catalog statistics for the given
/// tables, largest first with unanalyzed tables last. Entries may be either
/// `schema.table` or bare `table`; matching folds to upper case.
pub fn table_row_counts(
    conn: &Connection,
    tables: &[String],
) -> Result<Vec<(String, Option<i64>)>> {
    if tables.is_empty() {
        return Ok(Vec::new());
    }

    let mut conditions = Vec::with_capacity(tables.len());
    let mut binds: Vec<String> = Vec::new();
    for table in tables {
        match table.split_once('.') {
            Some((schema, name)) => {
                conditions.push(format!(
                    "(owner = :{} and table_name = :{})",
                    binds.len() + 1,
                    binds.len() + 2
                ));
                binds.push(schema.to_uppercase());
                binds.push(name.to_uppercase());
            }
            None => {
                conditions.push(format!("table_name = :{}", binds.len() + 1));
                binds.push(table.to_uppercase());
            }
        }
    }

    let sql = format!(
        "select owner || '.' || table_name, num_rows from dba_tables \
         where {} order by num_rows desc nulls last",
        conditions.join(" or ")
    );
    let params: Vec<&dyn ToSql> = binds.iter().map(|b| b as &dyn ToSql).collect();

    let rows = conn.query_as::<(String, Option<i64>)>(&sql, &params)?;
    let mut stats = Vec::new();
    for row in rows {
        stats.push(row?);
    }
    Ok(stats)
}
