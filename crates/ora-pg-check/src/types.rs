//! Core data model for check tasks and results.

use std::fmt;

/// A single comparison unit: one base query with its paired checksum queries.
///
/// Created during planning and immutable thereafter. The key is
/// `TABLE:<schema>.<name>` for table checks and `CUSTOM:<label>` for ad-hoc
/// queries, preserving the user's original casing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckTask {
    pub key: String,
    pub src_sql: String,
    pub tgt_sql: String,
    /// Columns omitted from the checksum because of their type; part of the
    /// comparison contract, surfaced in the detail report.
    pub excluded_columns: Vec<String>,
}

/// The `(count, checksum)` pair produced by one side of a task.
///
/// Equality is componentwise. `count` is the row count of the base query on
/// that engine; `checksum` is the truncated sum of per-row lane quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumResult {
    pub count: i64,
    pub checksum: i64,
}

impl fmt::Display for ChecksumResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "count={}, checksum={}", self.count, self.checksum)
    }
}
