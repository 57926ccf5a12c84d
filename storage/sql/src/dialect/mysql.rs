use chrono::{DateTime, Utc};
use hsfilter::ValueKind;
use serde_json::Value as Json;

use super::{Column, Dialect};

/// MySQL 8 JSON columns. Set operations need 8.0.31 or later for INTERSECT.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn name(&self) -> &'static str { "mysql" }

    fn extract(&self, column: Column, tag: &str) -> String { format!("{}->>'$.{}'", column, tag) }

    fn has_tag(&self, column: Column, tag: &str) -> String { format!("JSON_CONTAINS_PATH({},'one','$.{}')", column, tag) }

    fn json_equals(&self, column: Column, tag: &str, literal: &Json) -> String {
        format!("{}->'$.{}' = CAST({} AS JSON)", column, tag, self.quote(&literal.to_string()))
    }

    fn ref_id(&self, expr: &str) -> String { format!("SUBSTRING_INDEX({},' ',1)", expr) }

    fn cast_payload(&self, payload: &str, kind: ValueKind) -> String {
        match kind {
            // DOUBLE has no infinity, the largest finite values stand in for it
            ValueKind::Number => format!(
                "CASE {payload} WHEN 'INF' THEN 1.7976931348623157e308 WHEN '-INF' THEN -1.7976931348623157e308 WHEN 'NaN' THEN NULL \
                 ELSE CAST(SUBSTRING_INDEX({payload},' ',1) AS DOUBLE) END"
            ),
            ValueKind::Date => format!("CAST({} AS DATE)", payload),
            ValueKind::Time => format!("CAST({} AS TIME(6))", payload),
            ValueKind::DateTime => format!("CAST(SUBSTRING_INDEX({},' ',1) AS DATETIME(6))", payload),
            _ => payload.to_string(),
        }
    }

    fn cast_literal(&self, literal: &str, kind: ValueKind) -> String {
        match kind {
            ValueKind::Date => format!("CAST({} AS DATE)", literal),
            ValueKind::Time => format!("CAST({} AS TIME(6))", literal),
            ValueKind::DateTime => format!("CAST({} AS DATETIME(6))", literal),
            _ => literal.to_string(),
        }
    }

    fn as_of(&self, as_of: &DateTime<Utc>) -> String { format!("'{}'", as_of.format("%Y-%m-%d %H:%M:%S%.f")) }

    /// Backslash is an escape character in MySQL string literals.
    fn quote(&self, text: &str) -> String { format!("'{}'", text.replace('\0', "").replace('\\', "\\\\").replace('\'', "''")) }
}
