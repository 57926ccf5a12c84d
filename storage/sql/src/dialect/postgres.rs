use chrono::{DateTime, SecondsFormat, Utc};
use hsfilter::{UnaryOperator, ValueKind};
use hsfilter_storage_common::{Junction, PresenceRun};
use serde_json::Value as Json;

use super::{Column, Dialect};

/// Postgres over a JSONB entity column.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str { "postgres" }

    fn extract(&self, column: Column, tag: &str) -> String { format!("{}->>'{}'", column, tag) }

    fn has_tag(&self, column: Column, tag: &str) -> String { format!("{} ? '{}'", column, tag) }

    fn presence_run(&self, column: Column, run: &PresenceRun) -> Option<String> {
        let tags = run.tags.iter().map(|tag| format!("'{}'", tag)).collect::<Vec<_>>().join(",");
        Some(match (run.operator, run.junction) {
            (UnaryOperator::Has, Junction::And) => format!("{} ?& array[{}]", column, tags),
            (UnaryOperator::Has, Junction::Or) => format!("{} ?| array[{}]", column, tags),
            (UnaryOperator::Not, Junction::And) => format!("NOT {} ?| array[{}]", column, tags),
            (UnaryOperator::Not, Junction::Or) => format!("NOT {} ?& array[{}]", column, tags),
        })
    }

    fn json_equals(&self, column: Column, tag: &str, literal: &Json) -> String {
        format!("{}->'{}' = {}::jsonb", column, tag, self.quote(&literal.to_string()))
    }

    fn ref_id(&self, expr: &str) -> String { format!("split_part({},' ',1)", expr) }

    fn cast_payload(&self, payload: &str, kind: ValueKind) -> String {
        match kind {
            // float reads INF itself, but NaN sorts above every number
            ValueKind::Number => format!("NULLIF(split_part({},' ',1)::float, 'NaN')", payload),
            ValueKind::Date => format!("({})::DATE", payload),
            ValueKind::Time => format!("({})::TIME", payload),
            ValueKind::DateTime => format!("split_part({},' ',1)::TIMESTAMPTZ", payload),
            _ => format!("{} COLLATE \"C\"", payload),
        }
    }

    fn cast_literal(&self, literal: &str, kind: ValueKind) -> String {
        match kind {
            ValueKind::Date => format!("{}::DATE", literal),
            ValueKind::Time => format!("{}::TIME", literal),
            ValueKind::DateTime => format!("{}::TIMESTAMPTZ", literal),
            _ => literal.to_string(),
        }
    }

    fn as_of(&self, as_of: &DateTime<Utc>) -> String { format!("'{}'", as_of.to_rfc3339_opts(SecondsFormat::AutoSi, true)) }
}
