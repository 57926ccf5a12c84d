use chrono::{DateTime, SecondsFormat, Utc};
use hsfilter::ValueKind;
use serde_json::Value as Json;

use super::{Column, Dialect};

/// SQLite with the JSON1 functions. Compound selects cannot be parenthesized.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn name(&self) -> &'static str { "sqlite" }

    fn extract(&self, column: Column, tag: &str) -> String { format!("json_extract({},'$.{}')", column, tag) }

    fn has_tag(&self, column: Column, tag: &str) -> String { format!("json_type({},'$.{}') IS NOT NULL", column, tag) }

    fn missing_tag(&self, column: Column, tag: &str) -> String { format!("json_type({},'$.{}') IS NULL", column, tag) }

    fn json_equals(&self, column: Column, tag: &str, literal: &Json) -> String {
        // json_extract turns true/false/null into SQL values, so those compare by JSON type
        match literal {
            Json::Null => format!("json_type({},'$.{}') = 'null'", column, tag),
            Json::Bool(true) => format!("json_type({},'$.{}') = 'true'", column, tag),
            Json::Bool(false) => format!("json_type({},'$.{}') = 'false'", column, tag),
            other => format!("{} = json({})", self.extract(column, tag), self.quote(&other.to_string())),
        }
    }

    fn ref_id(&self, expr: &str) -> String { format!("rtrim(substr({expr},1,instr({expr}||' ',' ')))") }

    fn cast_payload(&self, payload: &str, kind: ValueKind) -> String {
        match kind {
            // CAST would read INF as 0; 9e999 overflows to infinity
            ValueKind::Number => {
                format!("CASE {payload} WHEN 'INF' THEN 9e999 WHEN '-INF' THEN -9e999 WHEN 'NaN' THEN NULL ELSE CAST({payload} AS REAL) END")
            }
            ValueKind::Date => format!("date({})", payload),
            // julianday keeps fractional seconds, datetime() would drop them
            ValueKind::DateTime => format!("julianday(substr({payload},1,instr({payload}||' ',' ')-1))"),
            _ => payload.to_string(),
        }
    }

    fn cast_literal(&self, literal: &str, kind: ValueKind) -> String {
        match kind {
            ValueKind::Date => format!("date({})", literal),
            ValueKind::DateTime => format!("julianday({})", literal),
            _ => literal.to_string(),
        }
    }

    fn as_of(&self, as_of: &DateTime<Utc>) -> String { format!("datetime('{}')", as_of.to_rfc3339_opts(SecondsFormat::AutoSi, true)) }

    fn period_bound(&self, column: &str) -> String { format!("datetime({})", column) }

    fn nests_compounds(&self) -> bool { false }
}
