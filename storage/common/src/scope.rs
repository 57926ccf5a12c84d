use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CompileError;

/// Which slice of the store a query sees: one tenant, at one instant, optionally limited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub tenant: String,
    pub as_of: DateTime<Utc>,
    /// Zero means unlimited.
    #[serde(default)]
    pub limit: i64,
}

impl Scope {
    pub fn new(tenant: impl Into<String>, as_of: DateTime<Utc>) -> Self { Self { tenant: tenant.into(), as_of, limit: 0 } }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// `as_of` in ISO 8601 with a `Z` suffix, e.g. `2020-10-01T00:00:00Z`.
    pub fn as_of_iso(&self) -> String { self.as_of.to_rfc3339_opts(SecondsFormat::AutoSi, true) }

    /// The row limit to emit, if any. Negative limits are rejected.
    pub fn checked_limit(&self) -> Result<Option<u64>, CompileError> {
        match self.limit {
            0 => Ok(None),
            n if n > 0 => Ok(Some(n as u64)),
            n => Err(CompileError::InvalidLimit(n)),
        }
    }
}
