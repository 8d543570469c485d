//! Task planning: scope expansion, exclusion, size ordering, synthesis.
//!
//! Planning holds a single source connection for its whole duration.
//! Catalog failures are recoverable: the planner logs and proceeds with the
//! declared tables in declaration order. Synthesis failures are recorded
//! per task and never abort planning.

use crate::config::{CheckScope, CustomSql};
use crate::error::{CheckError, Result};
use crate::source;
use crate::synth::{self, SchemaMap};
use crate::types::CheckTask;
use oracle::Connection;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

/// The planned workload: synthesized tasks plus per-key synthesis failures.
#[derive(Debug, Default)]
pub struct Plan {
    /// Tasks in execution order: tables largest first, then custom queries.
    pub tasks: Vec<CheckTask>,
    /// Synthesis failure messages keyed by task key.
    pub synthesis_errors: BTreeMap<String, String>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.synthesis_errors.is_empty()
    }
}

/// Compiled exclusion patterns: exact case-insensitive matches or `*`
/// wildcards. Wildcards are anchored over the entire fully-qualified name,
/// so `TMP_*` matches `TMP_A` but not `HR.TMP_A`.
#[derive(Debug, Default)]
pub struct ExcludeFilter {
    exact: Vec<String>,
    wildcards: Vec<Regex>,
}

impl ExcludeFilter {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut exact = Vec::new();
        let mut wildcards = Vec::new();
        for pattern in patterns {
            if pattern.contains('*') {
                let regex = format!("(?i)^{}$", regex::escape(pattern).replace(r"\*", ".*"));
                let compiled = Regex::new(&regex).map_err(|e| {
                    CheckError::Config(format!("invalid exclude pattern '{pattern}': {e}"))
                })?;
                wildcards.push(compiled);
            } else {
                exact.push(pattern.clone());
            }
        }
        Ok(Self { exact, wildcards })
    }

    pub fn matches(&self, table: &str) -> bool {
        self.exact.iter().any(|p| p.eq_ignore_ascii_case(table))
            || self.wildcards.iter().any(|p| p.is_match(table))
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.wildcards.is_empty()
    }
}

/// Build the check plan on one source connection.
pub fn build_plan(conn: &Connection, scope: &CheckScope, schema_map: &SchemaMap) -> Result<Plan> {
    let filter = ExcludeFilter::new(&scope.exclude_tables)?;

    let mut tables = collect_tables(conn, scope, &filter);
    tables = order_by_size(conn, tables);

    let mut plan = Plan::default();
    for table in &tables {
        let key = format!("TABLE:{table}");
        let base_sql = format!("SELECT * FROM {table}");
        synthesize_into(&mut plan, conn, schema_map, key, &base_sql);
    }
    for CustomSql { name, sql } in &scope.custom_sqls {
        let key = format!("CUSTOM:{name}");
        synthesize_into(&mut plan, conn, schema_map, key, sql);
    }

    if plan.tasks.is_empty() {
        warn!("No valid check tasks generated; check the configured scope");
    } else {
        info!("Generated {} check tasks", plan.tasks.len());
    }
    Ok(plan)
}

fn synthesize_into(
    plan: &mut Plan,
    conn: &Connection,
    schema_map: &SchemaMap,
    key: String,
    base_sql: &str,
) {
    let synthesized = source::describe_columns(conn, base_sql)
        .and_then(|columns| synth::synthesize(&columns, schema_map, base_sql));
    match synthesized {
        Ok(synthesis) => {
            info!("Generated check task: {}", key);
            plan.tasks.push(CheckTask {
                key,
                src_sql: synthesis.src_sql,
                tgt_sql: synthesis.tgt_sql,
                excluded_columns: synthesis.excluded_columns,
            });
        }
        Err(e) => {
            warn!("Synthesis failed for {}: {}", key, e);
            plan.synthesis_errors.insert(key, e.to_string());
        }
    }
}

/// Merge the declared table list with schema expansion, applying exclusions
/// during expansion and after the merge, deduplicating case-insensitively.
fn collect_tables(conn: &Connection, scope: &CheckScope, filter: &ExcludeFilter) -> Vec<String> {
    let mut tables = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    let mut declared_excluded = 0usize;
    for table in &scope.tables {
        if filter.matches(table) {
            declared_excluded += 1;
            continue;
        }
        if seen.insert(table.to_uppercase()) {
            tables.push(table.clone());
        }
    }
    if declared_excluded > 0 {
        info!("Excluded {} declared tables by pattern", declared_excluded);
    }

    for schema in &scope.schemas {
        match source::tables_in_schema(conn, schema) {
            Ok(discovered) => {
                let mut added = 0usize;
                let mut excluded = 0usize;
                for table in discovered {
                    if filter.matches(&table) {
                        excluded += 1;
                        continue;
                    }
                    if seen.insert(table.to_uppercase()) {
                        tables.push(table);
                        added += 1;
                    }
                }
                info!(
                    "Schema {}: added {} tables ({} excluded by pattern)",
                    schema, added, excluded
                );
            }
            Err(e) => {
                warn!(
                    "Schema expansion failed for {}: {}; continuing with declared tables",
                    schema, e
                );
            }
        }
    }

    tables
}

/// Sort tables by catalog row count, largest first. Larger tasks start
/// first so critical-path latency stays low under a bounded pool. Falls back
/// to declaration order when the catalog is unavailable.
fn order_by_size(conn: &Connection, tables: Vec<String>) -> Vec<String> {
    if tables.is_empty() {
        return tables;
    }
    match source::table_row_counts(conn, &tables) {
        Ok(stats) => merge_size_ordering(&tables, &stats),
        Err(e) => {
            warn!(
                "Table statistics query failed: {}; proceeding in declaration order",
                e
            );
            tables
        }
    }
}

/// Combine catalog-ordered statistics with the declared list: tables found
/// in the catalog keep the catalog's size order; the rest are appended in
/// declaration order.
fn merge_size_ordering(declared: &[String], stats: &[(String, Option<i64>)]) -> Vec<String> {
    let mut ordered: Vec<String> = stats.iter().map(|(name, _)| name.clone()).collect();
    let found: HashSet<String> = ordered.iter().map(|name| name.to_uppercase()).collect();

    for table in declared {
        let normalized = table.to_uppercase();
        let matched = if table.contains('.') {
            found.contains(&normalized)
        } else {
            found
                .iter()
                .any(|f| f == &normalized || f.ends_with(&format!(".{normalized}")))
        };
        if !matched {
            warn!("Table {} not found in catalog statistics; appending", table);
            ordered.push(table.clone());
        }
    }

    ordered
}
