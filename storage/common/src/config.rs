use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{CompileError, ConfigError};
use crate::planner::validate_identifier;

pub const DEFAULT_TABLE: &str = "haystack";

/// Column names of the entity table (or document fields of the collection), and the tag holding
/// each entity's own ref.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSchema {
    pub tenant_column: String,
    pub start_column: String,
    pub end_column: String,
    pub entity_column: String,
    pub id_tag: String,
}

impl Default for StoreSchema {
    fn default() -> Self {
        Self {
            tenant_column: "customer_id".to_string(),
            start_column: "start_datetime".to_string(),
            end_column: "end_datetime".to_string(),
            entity_column: "entity".to_string(),
            id_tag: "id".to_string(),
        }
    }
}

impl StoreSchema {
    /// Every name is inlined into queries, so each must be a plain identifier.
    pub fn validate(&self) -> Result<(), CompileError> {
        for name in [&self.tenant_column, &self.start_column, &self.end_column, &self.entity_column, &self.id_tag] {
            validate_identifier(name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Sqlite,
    Postgres,
    Mysql,
    Mongo,
}

/// A store location parsed from a URL such as `postgres://host/db#haystack`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreTarget {
    pub backend: Backend,
    pub url: Url,
    /// Table or collection, taken from the URL fragment.
    pub table: String,
}

impl StoreTarget {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut url = Url::parse(text)?;
        let backend = match url.scheme() {
            "sqlite" => Backend::Sqlite,
            "postgres" | "postgresql" => Backend::Postgres,
            "mysql" => Backend::Mysql,
            "mongodb" | "mongodb+srv" => Backend::Mongo,
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        };
        let table = match url.fragment() {
            Some(fragment) if !fragment.is_empty() => fragment.to_string(),
            _ => DEFAULT_TABLE.to_string(),
        };
        validate_identifier(&table)?;
        url.set_fragment(None);
        debug!("StoreTarget: {:?} table {} at {}://{}", backend, table, url.scheme(), url.host_str().unwrap_or_default());
        Ok(Self { backend, url, table })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_targets() {
        let target = StoreTarget::parse("postgres://user@localhost:5432/haystackdb#points").unwrap();
        assert_eq!(target.backend, Backend::Postgres);
        assert_eq!(target.table, "points");
        assert_eq!(target.url.as_str(), "postgres://user@localhost:5432/haystackdb");

        let target = StoreTarget::parse("sqlite:///tmp/test.db").unwrap();
        assert_eq!(target.backend, Backend::Sqlite);
        assert_eq!(target.table, DEFAULT_TABLE);

        assert_eq!(StoreTarget::parse("mongodb+srv://cluster0.example.net/db").unwrap().backend, Backend::Mongo);
        assert_eq!(StoreTarget::parse("mysql://localhost/db#t1").unwrap().backend, Backend::Mysql);
    }

    #[test]
    fn test_rejects_bad_targets() {
        assert!(matches!(StoreTarget::parse("ftp://host/x"), Err(ConfigError::UnsupportedScheme(s)) if s == "ftp"));
        assert!(matches!(StoreTarget::parse("not a url"), Err(ConfigError::InvalidUrl(_))));
        assert!(matches!(
            StoreTarget::parse("sqlite:///tmp/x.db#drop;table"),
            Err(ConfigError::Compile(CompileError::InvalidIdentifier(_)))
        ));
    }

    #[test]
    fn test_schema_from_partial_json() {
        let schema: StoreSchema = serde_json::from_str(r#"{"tenant_column": "tenant"}"#).unwrap();
        assert_eq!(schema.tenant_column, "tenant");
        assert_eq!(schema.entity_column, "entity");
        assert!(schema.validate().is_ok());

        let schema = StoreSchema { entity_column: "entity data".into(), ..Default::default() };
        assert_eq!(schema.validate(), Err(CompileError::InvalidIdentifier("entity data".into())));
    }
}
