//! Cross-engine column canonicalization.
//!
//! The comparison works over textual-canonical tuples rather than native
//! values, which sidesteps engine-level comparison rules (NaN handling,
//! collation, timezone normalization) and makes the row hash deterministic.
//! This module classifies each described source column and generates the SQL
//! expression that renders it to the canonical text form.
//!
//! Canonicalization rules:
//! - Numerics (including binary float/double): fixed-format render, leading
//!   zeros suppressed, exactly 8 fractional digits.
//! - DATE: `yyyymmddhh24miss` plus six literal zeros, width-aligned with
//!   timestamps.
//! - Timestamps: `yyyymmddhh24missff6` (microsecond precision; PostgreSQL
//!   supports `FF6` from version 13).
//! - Fixed-width CHAR: right-trimmed. CHAR pads with spaces on one engine
//!   but not the other after a round-trip.
//! - Variable-width character data: identity.

use oracle::sql_type::OracleType;

/// Numeric render mask shared by both dialects.
const NUMERIC_MASK: &str = "fm99999999999999999999999999999.00000000";

/// Classification of a projected column, driving canonicalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    CharFixed,
    CharVar,
    Date,
    Timestamp,
    TimestampTz,
    TimestampLocalTz,
    BinaryFloat,
    BinaryDouble,
    /// Types that are intentionally not compared: LOBs, raw/long raw,
    /// rowid/urowid, intervals, ref and user-defined types, and anything
    /// else the driver reports that has no canonical text form.
    Excluded,
}

impl ColumnKind {
    /// Classify a column from the type the source driver described.
    pub fn from_oracle_type(ty: &OracleType) -> Self {
        match ty {
            OracleType::Number(_, _)
            | OracleType::Float(_)
            | OracleType::Int64
            | OracleType::UInt64 => ColumnKind::Numeric,
            OracleType::BinaryFloat => ColumnKind::BinaryFloat,
            OracleType::BinaryDouble => ColumnKind::BinaryDouble,
            OracleType::Date => ColumnKind::Date,
            OracleType::Timestamp(_) => ColumnKind::Timestamp,
            OracleType::TimestampTZ(_) => ColumnKind::TimestampTz,
            OracleType::TimestampLTZ(_) => ColumnKind::TimestampLocalTz,
            OracleType::Char(_) | OracleType::NChar(_) => ColumnKind::CharFixed,
            OracleType::Varchar2(_) | OracleType::NVarchar2(_) | OracleType::Long => {
                ColumnKind::CharVar
            }
            // BLOB, CLOB, NCLOB, BFILE, Raw, LongRaw, Rowid, intervals,
            // object/ref types, JSON, XML and anything newer.
            _ => ColumnKind::Excluded,
        }
    }

    pub fn is_excluded(&self) -> bool {
        matches!(self, ColumnKind::Excluded)
    }
}

/// A projected column as described by the source engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Original column name, case preserved.
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Quote an identifier for either dialect. Both engines use double quotes;
/// embedded quotes are doubled.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Generate the Oracle expression rendering a column to canonical text.
///
/// Returns `None` for excluded columns, which are dropped from the
/// projection entirely.
pub fn oracle_canon_expr(column: &ColumnDescriptor) -> Option<String> {
    let name = quote_ident(&column.name);
    let expr = match column.kind {
        ColumnKind::Numeric | ColumnKind::BinaryFloat | ColumnKind::BinaryDouble => {
            format!("to_char({name}, '{NUMERIC_MASK}')")
        }
        ColumnKind::Date => {
            format!("to_char({name}, 'yyyymmddhh24miss') || '000000'")
        }
        ColumnKind::Timestamp | ColumnKind::TimestampTz | ColumnKind::TimestampLocalTz => {
            format!("to_char({name}, 'yyyymmddhh24missff6')")
        }
        ColumnKind::CharFixed => format!("rtrim({name})"),
        ColumnKind::CharVar => name,
        ColumnKind::Excluded => return None,
    };
    Some(expr)
}

/// Generate the PostgreSQL expression rendering a column to canonical text.
///
/// Must produce exactly the same text as [`oracle_canon_expr`] for
/// semantically equal values; the format masks are chosen to be valid and
/// equivalent in both engines.
pub fn postgres_canon_expr(column: &ColumnDescriptor) -> Option<String> {
    let name = quote_ident(&column.name);
    let expr = match column.kind {
        ColumnKind::Numeric | ColumnKind::BinaryFloat | ColumnKind::BinaryDouble => {
            format!("to_char({name}, '{NUMERIC_MASK}')")
        }
        ColumnKind::Date => {
            format!("to_char({name}, 'yyyymmddhh24miss') || '000000'")
        }
        ColumnKind::Timestamp | ColumnKind::TimestampTz | ColumnKind::TimestampLocalTz => {
            format!("to_char({name}, 'yyyymmddhh24missff6')")
        }
        ColumnKind::CharFixed => format!("rtrim({name})"),
        ColumnKind::CharVar => name,
        ColumnKind::Excluded => return None,
    };
    Some(expr)
}
