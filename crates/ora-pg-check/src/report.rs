//! Result classification and report generation.
//!
//! Two files per run, timestamped `yyyymmdd_hhmmss`, in the report
//! directory: a detail report with one block per task key and a summary
//! with counts, failure lists and the consistency rate. Every key present
//! in any result or error map appears exactly once in the detail report.

use crate::error::Result;
use crate::executor::{ExecutionOutcome, Side};
use crate::planner::Plan;
use crate::types::CheckTask;
use chrono::Local;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

/// Outcome classification for one task key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Both sides returned the same `(count, checksum)`.
    Pass,
    /// Both sides returned, but the pairs differ.
    FailInconsistent {
        count_mismatch: bool,
        checksum_mismatch: bool,
    },
    /// At least one side has no result.
    FailExecution,
    /// The checksum queries could not be synthesized.
    FailSynthesis,
}

/// Classify a task key against the plan and execution outcome.
pub fn classify(key: &str, plan: &Plan, outcome: &ExecutionOutcome) -> TaskStatus {
    if plan.synthesis_errors.contains_key(key) {
        return TaskStatus::FailSynthesis;
    }
    let (Some(src), Some(tgt)) = (outcome.src_results.get(key), outcome.tgt_results.get(key))
    else {
        return TaskStatus::FailExecution;
    };
    if src == tgt {
        TaskStatus::Pass
    } else {
        TaskStatus::FailInconsistent {
            count_mismatch: src.count != tgt.count,
            checksum_mismatch: src.checksum != tgt.checksum,
        }
    }
}

/// Status totals and failure lists for the summary report.
#[derive(Debug, Default)]
pub struct StatusCounts {
    pub total: usize,
    pub consistent: usize,
    pub inconsistent: usize,
    pub execution_failed: usize,
    pub synthesis_failed: usize,
    pub inconsistent_keys: Vec<String>,
    pub execution_failed_keys: Vec<String>,
    pub synthesis_failed_keys: Vec<String>,
}

impl StatusCounts {
    fn add(&mut self, key: &str, status: TaskStatus) {
        self.total += 1;
        match status {
            TaskStatus::Pass => self.consistent += 1,
            TaskStatus::FailInconsistent { .. } => {
                self.inconsistent += 1;
                self.inconsistent_keys.push(key.to_string());
            }
            TaskStatus::FailExecution => {
                self.execution_failed += 1;
                self.execution_failed_keys.push(key.to_string());
            }
            TaskStatus::FailSynthesis => {
                self.synthesis_failed += 1;
                self.synthesis_failed_keys.push(key.to_string());
            }
        }
    }

    /// Consistent share of the items whose queries could be synthesized, as
    /// a percentage. Synthesis failures are structural and excluded from the
    /// denominator so they do not penalize the engines.
    pub fn consistency_rate(&self) -> f64 {
        let valid = self.total - self.synthesis_failed;
        if valid == 0 {
            0.0
        } else {
            self.consistent as f64 / valid as f64 * 100.0
        }
    }
}

/// Writes the detail and summary reports for one run.
pub struct Reporter {
    dir: PathBuf,
}

/// Paths and totals of the generated reports.
#[derive(Debug)]
pub struct ReportSet {
    pub detail_path: PathBuf,
    pub summary_path: PathBuf,
    pub counts: StatusCounts,
}

impl Reporter {
    /// Create the report directory if absent. Failure here is fatal.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Render and write both reports.
    pub fn write_reports(&self, plan: &Plan, outcome: &ExecutionOutcome) -> Result<ReportSet> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let generated_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        let mut counts = StatusCounts::default();
        for key in report_keys(plan) {
            counts.add(key, classify(key, plan, outcome));
        }

        let detail_path = self.dir.join(format!("detail_report_{timestamp}.txt"));
        std::fs::write(&detail_path, render_detail(plan, outcome, &generated_at))?;
        info!("Detail report generated: {}", detail_path.display());

        let summary_path = self.dir.join(format!("summary_report_{timestamp}.txt"));
        std::fs::write(&summary_path, render_summary(&counts, &generated_at))?;
        info!("Summary report generated: {}", summary_path.display());

        Ok(ReportSet {
            detail_path,
            summary_path,
            counts,
        })
    }
}

/// Every reportable key exactly once: synthesized tasks in execution order,
/// then synthesis failures.
fn report_keys(plan: &Plan) -> impl Iterator<Item = &str> {
    plan.tasks
        .iter()
        .map(|task| task.key.as_str())
        .chain(plan.synthesis_errors.keys().map(String::as_str))
}

/// Collapse runs of whitespace so multi-line SQL fits one report line.
pub fn collapse_whitespace(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn render_detail(plan: &Plan, outcome: &ExecutionOutcome, generated_at: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Data Consistency Validation Detail Report ===");
    let _ = writeln!(out, "Generated at: {generated_at}");
    let _ = writeln!(out);

    for task in &plan.tasks {
        let _ = writeln!(out, "Check item: {}", task.key);
        let _ = writeln!(out, "{}", "=".repeat(50 + task.key.len()));
        if !task.excluded_columns.is_empty() {
            let _ = writeln!(
                out,
                "  Columns excluded from comparison: {}",
                task.excluded_columns.join(", ")
            );
        }
        render_side(&mut out, task, outcome, Side::Src);
        render_side(&mut out, task, outcome, Side::Tgt);
        render_status(&mut out, task, outcome, classify(&task.key, plan, outcome));
        let _ = writeln!(out);
    }

    for (key, error) in &plan.synthesis_errors {
        let _ = writeln!(out, "Check item: {key}");
        let _ = writeln!(out, "{}", "=".repeat(50 + key.len()));
        let _ = writeln!(out, "  Status: [ERROR] SQL generation failed");
        let _ = writeln!(out, "  Error: {error}");
        let _ = writeln!(out);
    }

    out
}

fn render_side(out: &mut String, task: &CheckTask, outcome: &ExecutionOutcome, side: Side) {
    let (label, sql, results) = match side {
        Side::Src => ("SRC database:", &task.src_sql, &outcome.src_results),
        Side::Tgt => ("TGT database:", &task.tgt_sql, &outcome.tgt_results),
    };
    let _ = writeln!(out, "{label}");
    let _ = writeln!(out, "  SQL: {}", collapse_whitespace(sql));
    match results.get(&task.key) {
        Some(result) => {
            let _ = writeln!(out, "  Result: {result}");
        }
        None => {
            let _ = writeln!(out, "  Result: Execution failed");
        }
    }
    if let Some(duration) = outcome.duration_for(&task.key, side) {
        let _ = writeln!(out, "  Execution time: {duration} ms");
    }
    if let Some(error) = outcome.error_for(&task.key, side) {
        let _ = writeln!(out, "  Error: {error}");
    }
}

fn render_status(
    out: &mut String,
    task: &CheckTask,
    outcome: &ExecutionOutcome,
    status: TaskStatus,
) {
    match status {
        TaskStatus::Pass => {
            let _ = writeln!(out, "  Status: [PASS] Consistent");
        }
        TaskStatus::FailInconsistent {
            count_mismatch,
            checksum_mismatch,
        } => {
            let _ = writeln!(out, "  Status: [FAIL] Inconsistent");
            let src = &outcome.src_results[&task.key];
            let tgt = &outcome.tgt_results[&task.key];
            if count_mismatch {
                let _ = writeln!(out, "  Count mismatch: SRC={}, TGT={}", src.count, tgt.count);
            }
            if checksum_mismatch {
                let _ = writeln!(
                    out,
                    "  Checksum mismatch: SRC={}, TGT={}",
                    src.checksum, tgt.checksum
                );
            }
        }
        TaskStatus::FailExecution => {
            let _ = writeln!(out, "  Status: [ERROR] Execution failed");
        }
        TaskStatus::FailSynthesis => {
            let _ = writeln!(out, "  Status: [ERROR] SQL generation failed");
        }
    }
}

fn render_summary(counts: &StatusCounts, generated_at: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Data Consistency Validation Summary Report ===");
    let _ = writeln!(out, "Generated at: {generated_at}");
    let _ = writeln!(out);

    let _ = writeln!(out, "Total configured items: {}", counts.total);
    let _ = writeln!(out, "SQL generation failed: {} items", counts.synthesis_failed);
    let _ = writeln!(out, "Data consistent: {} items", counts.consistent);
    let _ = writeln!(out, "Data inconsistent: {} items", counts.inconsistent);
    let _ = writeln!(out, "Execution failed: {} items", counts.execution_failed);
    let _ = writeln!(out);

    for (title, keys) in [
        ("SQL generation failed items:", &counts.synthesis_failed_keys),
        ("Inconsistent items:", &counts.inconsistent_keys),
        ("Execution failed items:", &counts.execution_failed_keys),
    ] {
        if !keys.is_empty() {
            let _ = writeln!(out, "{title}");
            for key in keys {
                let _ = writeln!(out, "  - {key}");
            }
            let _ = writeln!(out);
        }
    }

    let valid = counts.total - counts.synthesis_failed;
    let _ = writeln!(
        out,
        "Data consistency rate: {:.2}% (based on {} items with valid SQL)",
        counts.consistency_rate(),
        valid
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChecksumResult;

    fn task(key: &str) -> CheckTask {
        CheckTask {
            key: key.to_string(),
            src_sql: "select count(1) as cnt,\n  1 as cksum\nfrom src".to_string(),
            tgt_sql: "select count(1) as cnt,\n  1 as cksum\nfrom tgt".to_string(),
            excluded_columns: Vec::new(),
        }
    }

    fn record(
        outcome: &mut ExecutionOutcome,
        key: &str,
        src: Option<ChecksumResult>,
        tgt: Option<ChecksumResult>,
    ) {
        if let Some(result) = src {
            outcome.src_results.insert(key.to_string(), result);
        }
        if let Some(result) = tgt {
            outcome.tgt_results.insert(key.to_string(), result);
        }
    }

    fn fixture() -> (Plan, ExecutionOutcome) {
        let mut plan = Plan::default();
        let mut outcome = ExecutionOutcome::default();

        // Matching pair.
        plan.tasks.push(task("TABLE:HR.EMP"));
        record(
            &mut outcome,
            "TABLE:HR.EMP",
            Some(ChecksumResult { count: 2, checksum: 77 }),
            Some(ChecksumResult { count: 2, checksum: 77 }),
        );

        // Count and checksum diverge.
        plan.tasks.push(task("TABLE:HR.DEPT"));
        record(
            &mut outcome,
            "TABLE:HR.DEPT",
            Some(ChecksumResult { count: 3, checksum: 10 }),
            Some(ChecksumResult { count: 2, checksum: 8 }),
        );

        // Target side refused the connection.
        plan.tasks.push(task("TABLE:HR.JOBS"));
        record(
            &mut outcome,
            "TABLE:HR.JOBS",
            Some(ChecksumResult { count: 1, checksum: 5 }),
            None,
        );
        outcome
            .errors
            .insert("TABLE:HR.JOBS_TGT".to_string(), "connection refused".to_string());

        // Synthesis failed: only excluded column types.
        plan.synthesis_errors.insert(
            "TABLE:HR.LOBS".to_string(),
            "empty projection: all columns of the base query are of excluded types".to_string(),
        );

        (plan, outcome)
    }

    #[test]
    fn test_classification_priority() {
        let (plan, outcome) = fixture();
        assert_eq!(classify("TABLE:HR.EMP", &plan, &outcome), TaskStatus::Pass);
        assert_eq!(
            classify("TABLE:HR.DEPT", &plan, &outcome),
            TaskStatus::FailInconsistent {
                count_mismatch: true,
                checksum_mismatch: true
            }
        );
        assert_eq!(
            classify("TABLE:HR.JOBS", &plan, &outcome),
            TaskStatus::FailExecution
        );
        assert_eq!(
            classify("TABLE:HR.LOBS", &plan, &outcome),
            TaskStatus::FailSynthesis
        );
    }

    #[test]
    fn test_checksum_only_mismatch_is_itemized() {
        let mut plan = Plan::default();
        let mut outcome = ExecutionOutcome::default();
        plan.tasks.push(task("TABLE:HR.X"));
        record(
            &mut outcome,
            "TABLE:HR.X",
            Some(ChecksumResult { count: 4, checksum: 1 }),
            Some(ChecksumResult { count: 4, checksum: 2 }),
        );
        assert_eq!(
            classify("TABLE:HR.X", &plan, &outcome),
            TaskStatus::FailInconsistent {
                count_mismatch: false,
                checksum_mismatch: true
            }
        );
    }

    #[test]
    fn test_reports_written_to_directory() {
        let (plan, outcome) = fixture();
        let dir = tempfile::tempdir().unwrap();
        let reporter = Reporter::new(dir.path().join("reports")).unwrap();
        let report_set = reporter.write_reports(&plan, &outcome).unwrap();

        assert!(report_set.detail_path.exists());
        assert!(report_set.summary_path.exists());
        assert_eq!(report_set.counts.total, 4);
        assert_eq!(report_set.counts.consistent, 1);
        assert_eq!(report_set.counts.inconsistent, 1);
        assert_eq!(report_set.counts.execution_failed, 1);
        assert_eq!(report_set.counts.synthesis_failed, 1);
    }

    #[test]
    fn test_detail_report_is_complete() {
        let (plan, outcome) = fixture();
        let detail = render_detail(&plan, &outcome, "2026-01-01 00:00:00");

        for key in ["TABLE:HR.EMP", "TABLE:HR.DEPT", "TABLE:HR.JOBS", "TABLE:HR.LOBS"] {
            let occurrences = detail.matches(&format!("Check item: {key}\n")).count();
            assert_eq!(occurrences, 1, "{key} should appear exactly once");
        }
    }

    #[test]
    fn test_detail_report_itemizes_divergence() {
        let (plan, outcome) = fixture();
        let detail = render_detail(&plan, &outcome, "2026-01-01 00:00:00");
        assert!(detail.contains("Count mismatch: SRC=3, TGT=2"));
        assert!(detail.contains("Checksum mismatch: SRC=10, TGT=8"));
        assert!(detail.contains("Error: connection refused"));
    }

    #[test]
    fn test_detail_report_documents_excluded_columns() {
        let mut plan = Plan::default();
        let mut excluded_task = task("TABLE:HR.DOCS");
        excluded_task.excluded_columns = vec!["BODY".to_string(), "ATTACHMENT".to_string()];
        plan.tasks.push(excluded_task);
        let mut outcome = ExecutionOutcome::default();
        record(
            &mut outcome,
            "TABLE:HR.DOCS",
            Some(ChecksumResult { count: 0, checksum: 0 }),
            Some(ChecksumResult { count: 0, checksum: 0 }),
        );

        let detail = render_detail(&plan, &outcome, "2026-01-01 00:00:00");
        assert!(detail.contains("Columns excluded from comparison: BODY, ATTACHMENT"));
    }

    #[test]
    fn test_summary_lists_and_rate() {
        let (plan, outcome) = fixture();
        let mut counts = StatusCounts::default();
        for key in report_keys(&plan) {
            counts.add(key, classify(key, &plan, &outcome));
        }
        let summary = render_summary(&counts, "2026-01-01 00:00:00");

        assert!(summary.contains("Total configured items: 4"));
        assert!(summary.contains("SQL generation failed: 1 items"));
        assert!(summary.contains("  - TABLE:HR.DEPT"));
        assert!(summary.contains("  - TABLE:HR.JOBS"));
        assert!(summary.contains("  - TABLE:HR.LOBS"));
        // 1 consistent of 3 valid items.
        assert!(summary.contains("Data consistency rate: 33.33%"));
    }

    #[test]
    fn test_consistency_rate_excludes_synthesis_failures() {
        let mut counts = StatusCounts::default();
        counts.add("TABLE:A", TaskStatus::Pass);
        counts.add("TABLE:B", TaskStatus::FailSynthesis);
        assert!((counts.consistency_rate() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_consistency_rate_with_no_valid_items() {
        let mut counts = StatusCounts::default();
        counts.add("TABLE:A", TaskStatus::FailSynthesis);
        assert_eq!(counts.consistency_rate(), 0.0);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(
            collapse_whitespace("select  count(1)\n   from\tdual"),
            "select count(1) from dual"
        );
    }
}
