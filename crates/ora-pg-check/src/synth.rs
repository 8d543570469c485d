//! Checksum-query synthesis.
//!
//! Given the described column list of a base query, this module emits one
//! aggregation query per dialect whose single `(cnt, cksum)` row is equal on
//! both engines exactly when the engines return the same multiset of rows
//! under the canonicalization rules of [`crate::canon`].
//!
//! ## Scheme
//!
//! Each side projects the same ordered, canonicalized, quoted-alias column
//! list, serializes every row to JSON (identical key order and naming on
//! both engines), and hashes the serialization with MD5. The 16-byte hash is
//! split into four big-endian signed 32-bit lanes; each row contributes
//! `(L0 + L1 + L2 + L3) / 4` and the lane quantities are summed. SUM is
//! associative and commutative, so row order between the engines is
//! immaterial; dividing each lane by four keeps intermediate sums small when
//! row counts are large.
//!
//! The aggregate is truncated to an integral value before it leaves the
//! engine so both drivers fetch a plain 64-bit integer; equal exact sums
//! truncate to equal integers. An empty input coalesces to `(0, 0)`.

use crate::canon::{oracle_canon_expr, postgres_canon_expr, quote_ident, ColumnDescriptor};
use crate::error::SynthesisError;
use regex::Regex;
use std::collections::HashMap;

/// Outcome of synthesis for one base query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesis {
    /// Checksum query for the source engine.
    pub src_sql: String,
    /// Checksum query for the target engine, schema rewrites applied.
    pub tgt_sql: String,
    /// Columns omitted from the comparison because of their type. Part of
    /// the comparison contract; surfaced per task in the detail report.
    pub excluded_columns: Vec<String>,
}

/// Configured source-schema to target-schema rewrites.
///
/// Keys and values are lowercased on construction; application is a
/// case-insensitive, word-boundary replacement of every `<src_schema>.`
/// occurrence.
#[derive(Debug, Default)]
pub struct SchemaMap {
    rules: Vec<(Regex, String)>,
}

impl SchemaMap {
    pub fn new(mapping: &HashMap<String, String>) -> Result<Self, regex::Error> {
        let mut rules = Vec::with_capacity(mapping.len());
        for (src_schema, tgt_schema) in mapping {
            let src_schema = src_schema.to_lowercase();
            let tgt_schema = tgt_schema.to_lowercase();
            let pattern = Regex::new(&format!(r"(?i)\b{}\.", regex::escape(&src_schema)))?;
            rules.push((pattern, format!("{tgt_schema}.")));
        }
        // Deterministic application order regardless of map iteration order.
        rules.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        Ok(Self { rules })
    }

    /// Rewrite every `<src_schema>.` prefix in `sql` to its target schema.
    pub fn apply(&self, sql: &str) -> String {
        let mut result = sql.to_string();
        for (pattern, replacement) in &self.rules {
            result = pattern
                .replace_all(&result, replacement.as_str())
                .into_owned();
        }
        result
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Synthesize the paired checksum queries for a base query whose columns
/// have already been described on the source engine.
pub fn synthesize(
    columns: &[ColumnDescriptor],
    schema_map: &SchemaMap,
    base_sql: &str,
) -> Result<Synthesis, SynthesisError> {
    let mut src_items = Vec::new();
    let mut tgt_items = Vec::new();
    let mut excluded_columns = Vec::new();

    for column in columns {
        let alias = quote_ident(&column.name);
        match (oracle_canon_expr(column), postgres_canon_expr(column)) {
            (Some(src_expr), Some(tgt_expr)) => {
                src_items.push(format!("{src_expr} AS {alias}"));
                tgt_items.push(format!("{tgt_expr} AS {alias}"));
            }
            _ => excluded_columns.push(column.name.clone()),
        }
    }

    if src_items.is_empty() {
        return Err(SynthesisError::empty_projection());
    }

    let src_sql = oracle_checksum_query(&src_items.join(", "), base_sql);
    let tgt_sql = schema_map.apply(&postgres_checksum_query(&tgt_items.join(", "), base_sql));

    if src_sql.trim().is_empty() {
        return Err(SynthesisError::empty_emission("source"));
    }
    if tgt_sql.trim().is_empty() {
        return Err(SynthesisError::empty_emission("target"));
    }

    Ok(Synthesis {
        src_sql,
        tgt_sql,
        excluded_columns,
    })
}

/// Build the Oracle checksum query.
///
/// `dbms_crypto.hash(.., 2)` is MD5; `json_object(t.* returning blob)` gives
/// the UTF-8 JSON bytes of the projected row. The inline `uf_raw2int` helper
/// reads a big-endian signed 32-bit lane out of the raw hash
/// (`utl_raw.substr` positions are 1-based, so the lanes sit at 1, 5, 9, 13).
pub fn oracle_checksum_query(projection: &str, base_sql: &str) -> String {
    format!(
        r#"with function uf_raw2int(input raw, pos number, len number) return number is
begin
  return utl_raw.cast_to_binary_integer(utl_raw.substr(input, pos, len));
end;
select count(1) as cnt,
       nvl(trunc(sum(uf_raw2int(a, 1, 4) / 4 +
                     uf_raw2int(a, 5, 4) / 4 +
                     uf_raw2int(a, 9, 4) / 4 +
                     uf_raw2int(a, 13, 4) / 4)), 0) as cksum
  from (select dbms_crypto.hash(json_object(t.* returning blob), 2) a
          from (select {projection} from ({base_sql})) t)"#,
        projection = projection,
        base_sql = base_sql,
    )
}

/// Build the PostgreSQL checksum query.
///
/// `md5()` yields 32 hex characters; each lane is 8 hex characters
/// reinterpreted as a signed 32-bit integer via `::bit(32)::int4`, matching
/// the source side's big-endian lane decomposition.
pub fn postgres_checksum_query(projection: &str, base_sql: &str) -> String {
    format!(
        r#"select count(1) as cnt,
       coalesce(trunc(sum(('x' || substr(a, 1, 8))::bit(32)::int4::numeric / 4 +
                          ('x' || substr(a, 9, 8))::bit(32)::int4::numeric / 4 +
                          ('x' || substr(a, 17, 8))::bit(32)::int4::numeric / 4 +
                          ('x' || substr(a, 25, 8))::bit(32)::int4::numeric / 4)), 0)::int8 as cksum
  from (select md5(row_to_json(t)::text) a
          from (select {projection} from ({base_sql})) t)"#,
        projection = projection,
        base_sql = base_sql,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canon::ColumnKind;
    use crate::error::SynthesisErrorKind;

    fn emp_columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("ID", ColumnKind::Numeric),
            ColumnDescriptor::new("Name", ColumnKind::CharFixed),
            ColumnDescriptor::new("HIRED", ColumnKind::Date),
            ColumnDescriptor::new("PHOTO", ColumnKind::Excluded),
        ]
    }

    fn schema_map(pairs: &[(&str, &str)]) -> SchemaMap {
        let mapping = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SchemaMap::new(&mapping).unwrap()
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let map = schema_map(&[("hr", "hr_app")]);
        let a = synthesize(&emp_columns(), &map, "SELECT * FROM HR.EMP").unwrap();
        let b = synthesize(&emp_columns(), &map, "SELECT * FROM HR.EMP").unwrap();
        assert_eq!(a.src_sql, b.src_sql);
        assert_eq!(a.tgt_sql, b.tgt_sql);
    }

    #[test]
    fn test_projection_agreement() {
        let map = SchemaMap::default();
        let synthesis = synthesize(&emp_columns(), &map, "SELECT * FROM EMP").unwrap();

        let aliases = |sql: &str| -> Vec<String> {
            let re = Regex::new(r#" AS ("[^"]+")"#).unwrap();
            re.captures_iter(sql).map(|c| c[1].to_string()).collect()
        };
        let src_aliases = aliases(&synthesis.src_sql);
        assert_eq!(src_aliases, vec!["\"ID\"", "\"Name\"", "\"HIRED\""]);
        assert_eq!(src_aliases, aliases(&synthesis.tgt_sql));
    }

    #[test]
    fn test_excluded_columns_reported() {
        let map = SchemaMap::default();
        let synthesis = synthesize(&emp_columns(), &map, "SELECT * FROM EMP").unwrap();
        assert_eq!(synthesis.excluded_columns, vec!["PHOTO"]);
        assert!(!synthesis.src_sql.contains("PHOTO"));
        assert!(!synthesis.tgt_sql.contains("PHOTO"));
    }

    #[test]
    fn test_all_excluded_fails_with_empty_projection() {
        let columns = vec![
            ColumnDescriptor::new("BLOB_A", ColumnKind::Excluded),
            ColumnDescriptor::new("BLOB_B", ColumnKind::Excluded),
        ];
        let err = synthesize(&columns, &SchemaMap::default(), "SELECT * FROM LOBS").unwrap_err();
        assert_eq!(err.kind, SynthesisErrorKind::EmptyProjection);
    }

    #[test]
    fn test_lane_offsets_are_aligned() {
        let map = SchemaMap::default();
        let synthesis = synthesize(&emp_columns(), &map, "SELECT * FROM EMP").unwrap();

        // Four raw byte lanes at 1-based positions 1, 5, 9, 13 ...
        for pos in [1, 5, 9, 13] {
            assert!(synthesis.src_sql.contains(&format!("uf_raw2int(a, {pos}, 4)")));
        }
        // ... matching four hex lanes at positions 1, 9, 17, 25.
        for pos in [1, 9, 17, 25] {
            assert!(synthesis.tgt_sql.contains(&format!("substr(a, {pos}, 8)")));
        }
    }

    #[test]
    fn test_empty_input_coalesces_to_zero() {
        let map = SchemaMap::default();
        let synthesis = synthesize(&emp_columns(), &map, "SELECT * FROM EMP").unwrap();
        assert!(synthesis.src_sql.contains("nvl(trunc(sum("));
        assert!(synthesis.tgt_sql.contains("coalesce(trunc(sum("));
    }

    #[test]
    fn test_row_hash_shape() {
        let map = SchemaMap::default();
        let synthesis = synthesize(&emp_columns(), &map, "SELECT * FROM EMP").unwrap();
        assert!(synthesis
            .src_sql
            .contains("dbms_crypto.hash(json_object(t.* returning blob), 2)"));
        assert!(synthesis.tgt_sql.contains("md5(row_to_json(t)::text)"));
        assert!(synthesis.src_sql.contains("count(1) as cnt"));
        assert!(synthesis.tgt_sql.contains("count(1) as cnt"));
    }

    #[test]
    fn test_schema_rewrite_applies_to_target_only() {
        let map = schema_map(&[("hr", "hr_app")]);
        let synthesis = synthesize(&emp_columns(), &map, "SELECT * FROM HR.EMP").unwrap();
        assert!(synthesis.src_sql.contains("HR.EMP"));
        assert!(synthesis.tgt_sql.contains("hr_app.EMP"));
        assert!(!synthesis.tgt_sql.to_lowercase().contains("hr.emp"));
    }

    #[test]
    fn test_schema_rewrite_is_case_insensitive() {
        let map = schema_map(&[("HR", "HR_APP")]);
        assert_eq!(map.apply("select * from hr.emp"), "select * from hr_app.emp");
        assert_eq!(map.apply("select * from Hr.EMP"), "select * from hr_app.EMP");
    }

    #[test]
    fn test_schema_rewrite_respects_word_boundaries() {
        let map = schema_map(&[("hr", "hr_app")]);
        // OTHER_HR.T does not start the identifier "hr", so it is untouched.
        assert_eq!(map.apply("select * from OTHER_HR.T"), "select * from OTHER_HR.T");
        assert_eq!(map.apply("select hr.emp.id from hr.emp"), "select hr_app.emp.id from hr_app.emp");
    }

    #[test]
    fn test_empty_schema_map_is_identity() {
        let map = SchemaMap::default();
        assert!(map.is_empty());
        assert_eq!(map.apply("select * from hr.emp"), "select * from hr.emp");
    }
}
