//! Predicate Checks: stores vs the in-memory evaluator
//!
//! Every filter must select the same entities through `evaluate`, a compiled predicate and each
//! store backend. Test cases loaded from `tests/predicate_cases.json`.

mod common;
mod pg_common;

use anyhow::Result;
use common::{label_of, scope, TestCase, CURRENT, SUPERSEDED, TENANT};
use hsfilter::{compile_predicate, evaluate, parse_filter, Dict, FilterNode, Path, Ref, Value};
use hsfilter_storage_common::{encode_entity, navigation_paths};
use hsfilter_storage_mongo::PipelineCompiler;
use hsfilter_storage_sql::{SqlCompiler, SqlDialect, StoreSchema};
use rusqlite::Connection;
use tracing::info;

// =============================================================================
// TEST CASE LOADING
// =============================================================================

const PREDICATE_CASES_JSON: &str = include_str!("../predicate_cases.json");

fn all_test_cases() -> Result<Vec<TestCase>> {
    let cases: common::PredicateCases = serde_json::from_str(PREDICATE_CASES_JSON)?;
    Ok(cases.suites.into_iter().flat_map(|s| s.cases).collect())
}

fn sorted(labels: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut labels: Vec<String> = labels.into_iter().collect();
    labels.sort();
    labels
}

type Row = (&'static str, (&'static str, &'static str), Dict);

/// One current row per entity, plus rows no scoped query may return: the same entity under another
/// tenant, and a superseded version holding nothing but its id.
fn rows(case: &TestCase) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    for entity in &case.entities {
        let dict = entity.dict()?;
        let mut stale = Dict::new();
        stale.insert("id".to_string(), Value::Ref(Ref::new(entity.label.as_str())));
        rows.push(("other", CURRENT, dict.clone()));
        rows.push((TENANT, SUPERSEDED, stale));
        rows.push((TENANT, CURRENT, dict));
    }
    Ok(rows)
}

// =============================================================================
// EVALUATOR REFERENCE
// =============================================================================

fn verify_evaluator(case: &TestCase) -> Result<()> {
    let db = case.database()?;
    for exp in &case.expectations {
        let node = parse_filter(&exp.filter)?;
        let evaluated = sorted(db.iter().filter(|(_, entity)| evaluate(&node, *entity, &db)).map(|(label, _)| label.clone()));
        assert_eq!(evaluated, sorted(exp.expected()), "[evaluate] case={} filter='{}'", case.name, exp.filter);

        let predicate = compile_predicate(&node);
        let predicated = sorted(db.iter().filter(|(_, entity)| predicate.matches(*entity, &db)).map(|(label, _)| label.clone()));
        assert_eq!(predicated, evaluated, "[predicate] case={} filter='{}'", case.name, exp.filter);
    }
    Ok(())
}

// =============================================================================
// SQLITE PREDICATE CHECK
// =============================================================================

fn sqlite_database(case: &TestCase) -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("CREATE TABLE haystack (customer_id TEXT NOT NULL, start_datetime TEXT NOT NULL, end_datetime TEXT NOT NULL, entity JSON NOT NULL)")?;
    for (tenant, (start, end), dict) in rows(case)? {
        conn.execute("INSERT INTO haystack VALUES (?1, ?2, ?3, json(?4))", rusqlite::params![tenant, start, end, serde_json::to_string(&encode_entity(&dict))?])?;
    }
    Ok(conn)
}

fn sqlite_select(conn: &Connection, sql: &str) -> Result<Vec<String>> {
    let mut statement = conn.prepare(sql)?;
    let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
    let mut labels = Vec::new();
    for row in rows {
        labels.push(label_of(&serde_json::from_str(&row?)?)?);
    }
    Ok(sorted(labels))
}

#[test]
fn test_sqlite_predicate_checks() -> Result<()> {
    let compiler = SqlCompiler::new(SqlDialect::Sqlite, StoreSchema::default());
    for case in &all_test_cases()? {
        verify_evaluator(case)?;

        let conn = sqlite_database(case)?;
        for exp in &case.expectations {
            let node = parse_filter(&exp.filter)?;
            let compiled = compiler.compile(Some(&node), &exp.filter, "haystack", &scope())?;
            if compiled.approximate {
                info!("[Sqlite] skipping approximate query for '{}'", exp.filter);
                continue;
            }
            assert_eq!(sqlite_select(&conn, &compiled.sql)?, sorted(exp.expected()), "[Sqlite] case={} filter='{}'", case.name, exp.filter);
        }
    }
    Ok(())
}

#[test]
fn test_sqlite_read_by_ids() -> Result<()> {
    let compiler = SqlCompiler::new(SqlDialect::Sqlite, StoreSchema::default());
    for case in &all_test_cases()? {
        let conn = sqlite_database(case)?;
        let mut ids: Vec<Ref> = case.entities.iter().map(|entity| Ref::new(entity.label.as_str())).collect();
        ids.push(Ref::new("nowhere"));
        let compiled = compiler.compile_ids(&ids, "haystack", &scope())?;
        assert_eq!(sqlite_select(&conn, &compiled.sql)?, sorted(case.entities.iter().map(|entity| entity.label.clone())), "case={}", case.name);

        let compiled = compiler.compile_ids(&[], "haystack", &scope())?;
        assert!(sqlite_select(&conn, &compiled.sql)?.is_empty());
    }
    Ok(())
}

// =============================================================================
// HAS / NOT DUALITY
// =============================================================================

#[test]
fn test_has_and_not_partition_entities() -> Result<()> {
    let compiler = SqlCompiler::new(SqlDialect::Sqlite, StoreSchema::default());
    for case in &all_test_cases()? {
        let db = case.database()?;
        let conn = sqlite_database(case)?;
        let all = sorted(db.keys().cloned());

        let nodes = case.expectations.iter().map(|exp| parse_filter(&exp.filter)).collect::<Result<Vec<_>, _>>()?;
        let mut paths: Vec<Path> = Vec::new();
        for node in &nodes {
            node.walk_paths(&mut |path| {
                if !paths.contains(path) {
                    paths.push(path.clone());
                }
            });
        }

        for path in paths {
            let (has, not) = (FilterNode::has(path.clone()), FilterNode::missing(path));

            let evaluated = |node: &FilterNode| db.iter().filter(|(_, entity)| evaluate(node, *entity, &db)).map(|(label, _)| label.clone()).collect::<Vec<_>>();
            let (present, missing) = (evaluated(&has), evaluated(&not));
            assert!(present.iter().all(|label| !missing.contains(label)), "[evaluate] case={} {} overlaps {}", case.name, has, not);
            assert_eq!(sorted(present.into_iter().chain(missing)), all, "[evaluate] case={} {} / {}", case.name, has, not);

            let present = sqlite_select(&conn, &compiler.compile(Some(&has), &has.to_string(), "haystack", &scope())?.sql)?;
            let missing = sqlite_select(&conn, &compiler.compile(Some(&not), &not.to_string(), "haystack", &scope())?.sql)?;
            assert_eq!(sorted(present.into_iter().chain(missing)), all, "[Sqlite] case={} {} / {}", case.name, has, not);
        }
    }
    Ok(())
}

// =============================================================================
// PIPELINE SHAPES
// =============================================================================

#[test]
fn test_pipelines_for_every_case() -> Result<()> {
    let compiler = PipelineCompiler::default();
    for case in &all_test_cases()? {
        for exp in &case.expectations {
            let node = parse_filter(&exp.filter)?;
            let stages = compiler.compile(Some(&node), &scope())?;
            let paths = navigation_paths(&node);
            let hops: usize = paths.iter().map(|path| path.hops().len()).sum();
            let aliases: Vec<&str> = stages.iter().filter_map(|stage| stage["$lookup"]["as"].as_str()).collect();
            assert!(aliases.len() <= hops, "[Pipeline] filter='{}'", exp.filter);
            for path in &paths {
                let deepest = path.hops().iter().map(|hop| format!("{}_entity_", hop)).collect::<Vec<_>>().join(".");
                assert!(aliases.contains(&deepest.as_str()), "[Pipeline] filter='{}' lookup of {}", exp.filter, deepest);
            }
            assert_eq!(stages.iter().filter(|stage| stage.get("$match").is_some()).count(), 2, "[Pipeline] filter='{}'", exp.filter);
        }
    }
    Ok(())
}

// =============================================================================
// POSTGRES PREDICATE CHECK
// =============================================================================

#[cfg(feature = "postgres")]
#[tokio::test]
async fn test_postgres_predicate_checks() -> Result<()> {
    let (container, client) = pg_common::create_postgres_container().await?;
    let compiler = SqlCompiler::new(SqlDialect::Postgres, StoreSchema::default());

    for case in &all_test_cases()? {
        client.batch_execute("TRUNCATE haystack").await?;
        for (tenant, (start, end), dict) in rows(case)? {
            let entity = encode_entity(&dict);
            client.execute("INSERT INTO haystack VALUES ($1, $2::text::timestamptz, $3::text::timestamptz, $4)", &[&tenant, &start, &end, &entity]).await?;
        }

        for exp in &case.expectations {
            let node = parse_filter(&exp.filter)?;
            let compiled = compiler.compile(Some(&node), &exp.filter, "haystack", &scope())?;
            let mut labels = Vec::new();
            for row in client.query(compiled.sql.as_str(), &[]).await? {
                labels.push(label_of(&row.try_get::<_, serde_json::Value>(0)?)?);
            }
            assert_eq!(sorted(labels), sorted(exp.expected()), "[Postgres] case={} filter='{}'", case.name, exp.filter);
        }
    }

    drop(container);
    Ok(())
}
