use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use hsfilter::{Dict, Ref, Value};
use hsfilter_storage_common::Scope;
use serde::Deserialize;
use tracing::Level;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() { let _ = tracing_subscriber::fmt().with_max_level(Level::INFO).with_test_writer().try_init(); }

pub const TENANT: &str = "demo";

/// Rows are stored with these validity periods: `CURRENT` covers [`as_of`], `SUPERSEDED` ends before it.
pub const CURRENT: (&str, &str) = ("2020-01-01T00:00:00Z", "9999-12-31T23:59:59Z");
#[allow(unused)]
pub const SUPERSEDED: (&str, &str) = ("2019-01-01T00:00:00Z", "2020-01-01T00:00:00Z");

pub fn as_of() -> DateTime<Utc> { Utc.with_ymd_and_hms(2021, 3, 1, 0, 0, 0).unwrap() }

pub fn scope() -> Scope { Scope::new(TENANT, as_of()) }

#[derive(Debug, Deserialize)]
pub struct PredicateCases {
    pub suites: Vec<TestSuite>,
}
#[derive(Debug, Deserialize)]
pub struct TestSuite {
    pub name: String,
    pub cases: Vec<TestCase>,
}
#[derive(Debug, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub entities: Vec<TestEntity>,
    pub expectations: Vec<Expectation>,
}
/// Tags are filter literals. The label doubles as the entity's `id`.
#[derive(Debug, Deserialize)]
pub struct TestEntity {
    pub label: String,
    pub tags: BTreeMap<String, String>,
}
#[derive(Debug, Deserialize)]
pub struct Expectation {
    pub filter: String,
    pub matches: Vec<String>,
}

impl TestEntity {
    pub fn dict(&self) -> Result<Dict> {
        let mut dict = Dict::new();
        dict.insert("id".to_string(), Value::Ref(Ref::new(self.label.as_str())));
        for (name, literal) in &self.tags {
            dict.insert(name.clone(), Value::from_str(literal)?);
        }
        Ok(dict)
    }
}

impl TestCase {
    /// The entities keyed by label, which is also what their refs resolve by.
    pub fn database(&self) -> Result<HashMap<String, Dict>> { self.entities.iter().map(|entity| Ok((entity.label.clone(), entity.dict()?))).collect() }
}

impl Expectation {
    pub fn expected(&self) -> BTreeSet<String> { self.matches.iter().cloned().collect() }
}

/// The label of a stored entity, read back from its encoded `id`.
#[allow(unused)]
pub fn label_of(stored: &serde_json::Value) -> Result<String> {
    let entity = hsfilter_storage_common::decode_entity(stored)?;
    match entity.get("id") {
        Some(Value::Ref(reference)) => Ok(reference.id.clone()),
        other => anyhow::bail!("stored entity without a ref id: {:?}", other),
    }
}
