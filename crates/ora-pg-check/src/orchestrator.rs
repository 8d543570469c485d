//! Check-run orchestrator - main workflow coordinator.

use crate::config::Config;
use crate::error::{CheckError, Result};
use crate::executor::DualExecutor;
use crate::planner::{self, Plan};
use crate::report::Reporter;
use crate::source::OracleSource;
use crate::synth::SchemaMap;
use crate::target::PgTarget;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Directory the timestamped reports are written to.
const REPORT_DIR: &str = "reports";

/// Check-run orchestrator.
pub struct Orchestrator {
    config: Config,
}

/// Result of a check run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Total task keys, synthesis failures included.
    pub tasks_total: usize,

    /// Tasks with matching `(count, checksum)` pairs.
    pub passed: usize,

    /// Tasks where both sides returned but the pairs differ.
    pub inconsistent: usize,

    /// Tasks where at least one side failed to execute.
    pub execution_failed: usize,

    /// Tasks whose checksum queries could not be synthesized.
    pub synthesis_failed: usize,

    /// Consistent share of synthesizable tasks, percent.
    pub consistency_rate: f64,

    /// Generated report files.
    pub detail_report: PathBuf,
    pub summary_report: PathBuf,
}

impl Orchestrator {
    /// Create a new orchestrator over a validated configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Run the full check workflow: plan, execute both sides of every task,
    /// compare and write reports.
    pub async fn run(&self, cancel: Option<watch::Receiver<bool>>) -> Result<RunSummary> {
        let started_at = Utc::now();

        // An unwritable report directory fails the run before any database
        // work happens.
        let reporter = Reporter::new(REPORT_DIR)?;

        let schema_map = SchemaMap::new(&self.config.check_scope.schema_mapping)
            .map_err(|e| CheckError::Config(format!("invalid schema mapping: {e}")))?;
        if !schema_map.is_empty() {
            info!(
                "Loaded {} schema mapping entries",
                self.config.check_scope.schema_mapping.len()
            );
        }

        let source = Arc::new(OracleSource::new(self.config.databases.src.clone()));
        let target = Arc::new(PgTarget::new(self.config.databases.tgt.clone()));

        info!("Planning check tasks");
        let plan = self.plan(source.clone(), schema_map).await?;
        info!(
            "Plan ready: {} tasks, {} synthesis failures",
            plan.tasks.len(),
            plan.synthesis_errors.len()
        );

        let executor = DualExecutor::new(source, target, self.config.performance.thread_count);
        let outcome = executor.run(&plan.tasks, cancel).await?;

        info!("Generating validation reports");
        let report_set = reporter.write_reports(&plan, &outcome)?;

        let completed_at = Utc::now();
        let counts = &report_set.counts;
        let summary = RunSummary {
            started_at,
            completed_at,
            duration_seconds: (completed_at - started_at).num_milliseconds() as f64 / 1000.0,
            tasks_total: counts.total,
            passed: counts.consistent,
            inconsistent: counts.inconsistent,
            execution_failed: counts.execution_failed,
            synthesis_failed: counts.synthesis_failed,
            consistency_rate: counts.consistency_rate(),
            detail_report: report_set.detail_path,
            summary_report: report_set.summary_path,
        };
        info!(
            "Check completed: {}/{} consistent ({:.2}%)",
            summary.passed,
            summary.tasks_total - summary.synthesis_failed,
            summary.consistency_rate
        );
        Ok(summary)
    }

    /// Build the plan on a dedicated blocking worker; the planner holds one
    /// source connection for its whole duration.
    async fn plan(&self, source: Arc<OracleSource>, schema_map: SchemaMap) -> Result<Plan> {
        let scope = self.config.check_scope.clone();
        tokio::task::spawn_blocking(move || -> Result<Plan> {
            let conn = source.connect()?;
            let plan = planner::build_plan(&conn, &scope, &schema_map);
            if let Err(e) = conn.close() {
                debug!("Closing planner connection failed: {}", e);
            }
            plan
        })
        .await
        .map_err(|e| CheckError::Plan(format!("planning task failed: {e}")))?
    }
}

impl RunSummary {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
