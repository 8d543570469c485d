//! Concurrent execution of paired checksum queries.
//!
//! Two bounded pools, one per engine, each `max(1, thread_count / 2)` wide.
//! Decoupled pools keep a slow engine from starving workers reserved for the
//! other. Every task submits one work item per side; each item acquires its
//! side's permit, opens a fresh connection, runs the emitted SQL and records
//! exactly one of result or error under its `(key, side)`. A failure on one
//! side never prevents the sibling side or other tasks from completing, and
//! the barrier fires once all `2 * N` items have finished.

use crate::error::{CheckError, Result};
use crate::source::OracleSource;
use crate::target::PgTarget;
use crate::types::{CheckTask, ChecksumResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Which engine a work item ran against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Src,
    Tgt,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Src => write!(f, "SRC"),
            Side::Tgt => write!(f, "TGT"),
        }
    }
}

/// Composite key used in the error map: `<task key>_<side>`.
pub fn error_key(key: &str, side: Side) -> String {
    format!("{key}_{side}")
}

/// What one work item reported back.
#[derive(Debug)]
struct SideOutcome {
    key: String,
    side: Side,
    result: std::result::Result<ChecksumResult, String>,
    duration_ms: u64,
}

/// Keyed result maps populated by the workers. Readers run only after the
/// barrier; every write key is unique, so plain maps filled at the join
/// point suffice.
#[derive(Debug, Default)]
pub struct ExecutionOutcome {
    pub src_results: HashMap<String, ChecksumResult>,
    pub tgt_results: HashMap<String, ChecksumResult>,
    /// Failures keyed `<task key>_<side>`.
    pub errors: HashMap<String, String>,
    pub src_durations: HashMap<String, u64>,
    pub tgt_durations: HashMap<String, u64>,
}

impl ExecutionOutcome {
    fn record(&mut self, outcome: SideOutcome) {
        let durations = match outcome.side {
            Side::Src => &mut self.src_durations,
            Side::Tgt => &mut self.tgt_durations,
        };
        durations.insert(outcome.key.clone(), outcome.duration_ms);

        match outcome.result {
            Ok(result) => {
                let results = match outcome.side {
                    Side::Src => &mut self.src_results,
                    Side::Tgt => &mut self.tgt_results,
                };
                results.insert(outcome.key, result);
            }
            Err(message) => {
                self.errors
                    .insert(error_key(&outcome.key, outcome.side), message);
            }
        }
    }

    pub fn error_for(&self, key: &str, side: Side) -> Option<&str> {
        self.errors.get(&error_key(key, side)).map(String::as_str)
    }

    pub fn duration_for(&self, key: &str, side: Side) -> Option<u64> {
        match side {
            Side::Src => self.src_durations.get(key).copied(),
            Side::Tgt => self.tgt_durations.get(key).copied(),
        }
    }
}

/// Runs the source and target sides of each task under two bounded pools.
pub struct DualExecutor {
    source: Arc<OracleSource>,
    target: Arc<PgTarget>,
    pool_size: usize,
}

impl DualExecutor {
    /// `thread_count` is the total worker budget across both pools.
    pub fn new(source: Arc<OracleSource>, target: Arc<PgTarget>, thread_count: usize) -> Self {
        Self {
            source,
            target,
            pool_size: (thread_count / 2).max(1),
        }
    }

    /// Workers per engine pool.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Execute all tasks and gather the keyed outcome maps.
    ///
    /// Waits until every work item has finished, success or failure. An
    /// interrupt on the cancel channel aborts both pools and returns
    /// `CheckError::Interrupted`.
    pub async fn run(
        &self,
        tasks: &[CheckTask],
        mut cancel: Option<watch::Receiver<bool>>,
    ) -> Result<ExecutionOutcome> {
        let src_pool = Arc::new(Semaphore::new(self.pool_size));
        let tgt_pool = Arc::new(Semaphore::new(self.pool_size));
        let mut workers: JoinSet<SideOutcome> = JoinSet::new();

        info!(
            "Executing {} checks with {} workers per engine",
            tasks.len(),
            self.pool_size
        );

        for task in tasks {
            workers.spawn(src_work_item(
                self.source.clone(),
                src_pool.clone(),
                task.key.clone(),
                task.src_sql.clone(),
            ));
            workers.spawn(tgt_work_item(
                self.target.clone(),
                tgt_pool.clone(),
                task.key.clone(),
                task.tgt_sql.clone(),
            ));
        }

        let mut outcome = ExecutionOutcome::default();
        loop {
            tokio::select! {
                joined = workers.join_next() => match joined {
                    Some(Ok(side_outcome)) => {
                        match &side_outcome.result {
                            Ok(result) => info!(
                                "{} [{}]: {} ({}ms)",
                                side_outcome.side, side_outcome.key, result, side_outcome.duration_ms
                            ),
                            Err(message) => warn!(
                                "{} [{}] execution failed: {}",
                                side_outcome.side, side_outcome.key, message
                            ),
                        }
                        outcome.record(side_outcome);
                    }
                    Some(Err(e)) => warn!("Checksum worker aborted: {}", e),
                    None => break,
                },
                _ = wait_cancelled(&mut cancel) => {
                    warn!("Interrupt received, aborting outstanding checksum workers");
                    workers.shutdown().await;
                    return Err(CheckError::Interrupted);
                }
            }
        }

        info!("Concurrent execution completed");
        Ok(outcome)
    }
}

fn src_work_item(
    source: Arc<OracleSource>,
    pool: Arc<Semaphore>,
    key: String,
    sql: String,
) -> impl std::future::Future<Output = SideOutcome> {
    async move {
        let _permit = match pool.acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return closed_pool_outcome(key, Side::Src),
        };
        let started = Instant::now();
        // The source driver is blocking; keep it off the async workers.
        let joined = tokio::task::spawn_blocking(move || source.execute_checksum(&sql)).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        let result = match joined {
            Ok(Ok(Some(result))) => Ok(result),
            Ok(Ok(None)) => Err("checksum query returned no rows".to_string()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) => Err(format!("source worker panicked: {e}")),
        };
        SideOutcome {
            key,
            side: Side::Src,
            result,
            duration_ms,
        }
    }
}

fn tgt_work_item(
    target: Arc<PgTarget>,
    pool: Arc<Semaphore>,
    key: String,
    sql: String,
) -> impl std::future::Future<Output = SideOutcome> {
    async move {
        let _permit = match pool.acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return closed_pool_outcome(key, Side::Tgt),
        };
        let started = Instant::now();
        let result = match target.execute_checksum(&sql).await {
            Ok(Some(result)) => Ok(result),
            Ok(None) => Err("checksum query returned no rows".to_string()),
            Err(e) => Err(e.to_string()),
        };
        let duration_ms = started.elapsed().as_millis() as u64;
        SideOutcome {
            key,
            side: Side::Tgt,
            result,
            duration_ms,
        }
    }
}

fn closed_pool_outcome(key: String, side: Side) -> SideOutcome {
    SideOutcome {
        key,
        side,
        result: Err("worker pool closed before execution".to_string()),
        duration_ms: 0,
    }
}

/// Resolves when the cancel channel reports an interrupt; pends forever when
/// no cancellation can arrive anymore.
async fn wait_cancelled(cancel: &mut Option<watch::Receiver<bool>>) {
    if let Some(rx) = cancel {
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
    }
    std::future::pending::<()>().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;

    fn endpoint() -> EndpointConfig {
        EndpointConfig {
            url: "//localhost:1521/XE".to_string(),
            user: "user".to_string(),
            password: "password".to_string(),
            driver_jar: None,
        }
    }

    fn executor(thread_count: usize) -> DualExecutor {
        DualExecutor::new(
            Arc::new(OracleSource::new(endpoint())),
            Arc::new(PgTarget::new(endpoint())),
            thread_count,
        )
    }

    #[test]
    fn test_pool_split_is_half_the_budget() {
        assert_eq!(executor(4).pool_size(), 2);
        assert_eq!(executor(8).pool_size(), 4);
        assert_eq!(executor(5).pool_size(), 2);
    }

    #[test]
    fn test_pool_size_is_at_least_one() {
        assert_eq!(executor(1).pool_size(), 1);
    }

    #[test]
    fn test_error_key_shape() {
        assert_eq!(error_key("TABLE:HR.EMP", Side::Src), "TABLE:HR.EMP_SRC");
        assert_eq!(error_key("CUSTOM:daily", Side::Tgt), "CUSTOM:daily_TGT");
    }

    #[test]
    fn test_record_keeps_exactly_one_of_result_or_error() {
        let mut outcome = ExecutionOutcome::default();
        outcome.record(SideOutcome {
            key: "TABLE:HR.EMP".to_string(),
            side: Side::Src,
            result: Ok(ChecksumResult {
                count: 2,
                checksum: 99,
            }),
            duration_ms: 12,
        });
        outcome.record(SideOutcome {
            key: "TABLE:HR.EMP".to_string(),
            side: Side::Tgt,
            result: Err("connection refused".to_string()),
            duration_ms: 3,
        });

        assert!(outcome.src_results.contains_key("TABLE:HR.EMP"));
        assert!(outcome.error_for("TABLE:HR.EMP", Side::Src).is_none());
        assert!(!outcome.tgt_results.contains_key("TABLE:HR.EMP"));
        assert_eq!(
            outcome.error_for("TABLE:HR.EMP", Side::Tgt),
            Some("connection refused")
        );
        assert_eq!(outcome.duration_for("TABLE:HR.EMP", Side::Src), Some(12));
        assert_eq!(outcome.duration_for("TABLE:HR.EMP", Side::Tgt), Some(3));
    }
}
