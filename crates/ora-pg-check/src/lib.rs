//! # ora-pg-check
//!
//! Checksum-based row-level data equivalence checker between an
//! Oracle-family source and a PostgreSQL-compatible target.
//!
//! Given a declared workload of tables and ad-hoc queries, the library
//! describes each base query's columns on the source, synthesizes a pair of
//! dialect-specific aggregation queries whose `(count, checksum)` result is
//! identical exactly when both engines hold the same multiset of rows,
//! executes the pairs concurrently under bounded per-engine pools, and
//! writes detail and summary reports.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ora_pg_check::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.yml")?;
//!     let orchestrator = Orchestrator::new(config)?;
//!     let summary = orchestrator.run(None).await?;
//!     println!("{}/{} consistent", summary.passed, summary.tasks_total);
//!     Ok(())
//! }
//! ```

pub mod canon;
pub mod config;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod planner;
pub mod report;
pub mod source;
pub mod synth;
pub mod target;
pub mod types;

// Re-exports for convenient access
pub use canon::{ColumnDescriptor, ColumnKind};
pub use config::{CheckScope, Config, CustomSql, DatabasesConfig, EndpointConfig, PerformanceConfig};
pub use error::{CheckError, Result, SynthesisError, SynthesisErrorKind};
pub use executor::{DualExecutor, ExecutionOutcome, Side};
pub use orchestrator::{Orchestrator, RunSummary};
pub use planner::{ExcludeFilter, Plan};
pub use report::{Reporter, StatusCounts, TaskStatus};
pub use source::OracleSource;
pub use synth::{SchemaMap, Synthesis};
pub use target::PgTarget;
pub use types::{CheckTask, ChecksumResult};
