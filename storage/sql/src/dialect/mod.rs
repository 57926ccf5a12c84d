//! Everything that differs between the SQL backends. The join and set-operation algorithm in
//! [`crate::compiler`] is shared and only talks to a [`Dialect`].

mod mysql;
mod postgres;
mod sqlite;

use chrono::{DateTime, Utc};
use hsfilter::ValueKind;
use hsfilter_storage_common::PresenceRun;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

pub use mysql::MySql;
pub use postgres::Postgres;
pub use sqlite::Sqlite;

/// A JSON column addressed by its table alias, e.g. `t2.entity`.
#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    pub alias: &'a str,
    pub name: &'a str,
}

impl std::fmt::Display for Column<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}.{}", self.alias, self.name) }
}

pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    /// The unquoted text of `tag`, NULL when absent.
    fn extract(&self, column: Column, tag: &str) -> String;

    /// True when `tag` is present, even if it holds a JSON null.
    fn has_tag(&self, column: Column, tag: &str) -> String;

    fn missing_tag(&self, column: Column, tag: &str) -> String { format!("NOT {}", self.has_tag(column, tag)) }

    /// A whole run of presence tests in one expression, for backends with key-set operators.
    fn presence_run(&self, _column: Column, _run: &PresenceRun) -> Option<String> { None }

    /// Structural comparison of `tag` with a JSON document.
    fn json_equals(&self, column: Column, tag: &str, literal: &Json) -> String;

    /// An encoded ref up to its first space, dropping the display name.
    fn ref_id(&self, expr: &str) -> String;

    /// Cast the payload of an encoded scalar (prefix already stripped) to a comparable type.
    fn cast_payload(&self, payload: &str, kind: ValueKind) -> String;

    /// Cast a quoted literal to the same type as [`Dialect::cast_payload`].
    fn cast_literal(&self, literal: &str, kind: ValueKind) -> String;

    fn as_of(&self, as_of: &DateTime<Utc>) -> String;

    /// A validity column, as compared with [`Dialect::as_of`].
    fn period_bound(&self, column: &str) -> String { column.to_string() }

    /// Whether set-operation operands may be parenthesized. Without it, compounds are emitted flat.
    fn nests_compounds(&self) -> bool { true }

    /// A string literal with `'` doubled and NUL bytes dropped.
    fn quote(&self, text: &str) -> String { format!("'{}'", text.replace('\0', "").replace('\'', "''")) }
}

/// The SQL backend a compiler targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[default]
    Sqlite,
    Postgres,
    Mysql,
}

static SQLITE: Sqlite = Sqlite;
static POSTGRES: Postgres = Postgres;
static MYSQL: MySql = MySql;

impl SqlDialect {
    pub fn dialect(&self) -> &'static dyn Dialect {
        match self {
            SqlDialect::Sqlite => &SQLITE,
            SqlDialect::Postgres => &POSTGRES,
            SqlDialect::Mysql => &MYSQL,
        }
    }
}
