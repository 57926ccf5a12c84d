//! Compiles a filter into one SQL query over the bitemporal entity table.
//!
//! Leaves on direct tags are tested in the `WHERE` clause of a single `SELECT`. Every hop of a
//! multi-segment path self-joins the table once more. A boolean combinator whose subtree navigates
//! through refs can't share one `SELECT`, so it becomes an `INTERSECT` (and) or `UNION` (or) of
//! independently compiled operands.

use hsfilter::{ComparisonOperator, FilterNode, Path, Ref, UnaryOperator, Value};
use hsfilter_storage_common::encoding::{encode_instant, encode_number, encode_time};
use hsfilter_storage_common::{
    encode_scalar, encode_value, kind_prefix, presence_run, validate_identifier, validate_paths, CompileError, Junction, Scope, StoreSchema,
};
use tracing::{debug, warn};

use crate::dialect::{Column, Dialect, SqlDialect};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSql {
    pub sql: String,
    /// Set when the backend could not express the boolean structure exactly. The result can then hold
    /// extra rows and also miss matching ones, so post-filtering with [`hsfilter::evaluate`] is not
    /// enough. Use a dialect that nests compound selects, or split the filter.
    pub approximate: bool,
}

/// Table aliases handed out during one compilation: `t1`, `t2`, ...
#[derive(Debug, Default)]
struct SqlContext {
    aliases: usize,
}

impl SqlContext {
    fn next_alias(&mut self) -> String {
        self.aliases += 1;
        format!("t{}", self.aliases)
    }
}

/// One `SELECT` of the entity column of its root alias.
#[derive(Debug)]
struct Select {
    root: String,
    joins: Vec<String>,
    conditions: Vec<String>,
}

#[derive(Debug)]
enum Plan {
    Select(Select),
    SetOp { junction: Junction, left: Box<Plan>, right: Box<Plan> },
}

impl Plan {
    /// A flat compound chain evaluates left to right. It matches the tree when every right operand
    /// that is itself compound only uses its parent's operator.
    fn flattens_exactly(&self) -> bool {
        match self {
            Plan::Select(_) => true,
            Plan::SetOp { junction, left, right } => left.flattens_exactly() && right.is_uniform(*junction),
        }
    }

    fn is_uniform(&self, junction: Junction) -> bool {
        match self {
            Plan::Select(_) => true,
            Plan::SetOp { junction: op, left, right } => *op == junction && left.is_uniform(junction) && right.is_uniform(junction),
        }
    }
}

fn set_operator(junction: Junction) -> &'static str {
    match junction {
        Junction::And => "INTERSECT",
        Junction::Or => "UNION",
    }
}

/// Compiles filters for one SQL dialect and table layout. Cheap to share, holds no per-query state.
#[derive(Debug, Clone)]
pub struct SqlCompiler {
    dialect: SqlDialect,
    schema: StoreSchema,
}

impl SqlCompiler {
    pub fn new(dialect: SqlDialect, schema: StoreSchema) -> Self { Self { dialect, schema } }

    pub fn dialect(&self) -> SqlDialect { self.dialect }

    pub fn schema(&self) -> &StoreSchema { &self.schema }

    /// Compile `node` into a query selecting the matching entities of `table` visible in `scope`.
    /// `source` is the filter text echoed in the leading comment. `None` selects every visible entity.
    pub fn compile(&self, node: Option<&FilterNode>, source: &str, table: &str, scope: &Scope) -> Result<CompiledSql, CompileError> {
        let limit = self.check(table, scope)?;
        let mut builder = QueryBuilder::new(self.dialect.dialect(), &self.schema, table, scope);
        let plan = match node {
            Some(node) => {
                validate_paths(node)?;
                builder.plan(node)?
            }
            None => Plan::Select(builder.select()),
        };

        let nests = builder.dialect.nests_compounds();
        let approximate = !nests && !plan.flattens_exactly();
        if approximate {
            warn!("{} can't nest compound selects for {:?}, result may be invalid", builder.dialect.name(), source);
        }

        let mut sql = format!("-- {}\n", comment(source));
        builder.render(&plan, nests, &mut sql);
        if let Some(limit) = limit {
            sql.push_str(&format!("\nLIMIT {}", limit));
        }
        debug!("SqlCompiler({}): {}", builder.dialect.name(), sql);
        Ok(CompiledSql { sql, approximate })
    }

    /// Compile a read of the entities whose id is one of `ids`.
    pub fn compile_ids(&self, ids: &[Ref], table: &str, scope: &Scope) -> Result<CompiledSql, CompileError> {
        let limit = self.check(table, scope)?;
        let mut builder = QueryBuilder::new(self.dialect.dialect(), &self.schema, table, scope);
        let mut select = builder.select();
        select.conditions.push(builder.id_membership(&select.root, ids));

        let listed = ids.iter().map(|r| format!("@{}", r.id)).collect::<Vec<_>>().join(", ");
        let mut sql = format!("-- ids: {}\n", comment(&listed));
        builder.render(&Plan::Select(select), true, &mut sql);
        if let Some(limit) = limit {
            sql.push_str(&format!("\nLIMIT {}", limit));
        }
        debug!("SqlCompiler({}): {}", builder.dialect.name(), sql);
        Ok(CompiledSql { sql, approximate: false })
    }

    fn check(&self, table: &str, scope: &Scope) -> Result<Option<u64>, CompileError> {
        validate_identifier(table)?;
        self.schema.validate()?;
        scope.checked_limit()
    }
}

/// The comment line must stay one line.
fn comment(source: &str) -> String { source.replace(['\r', '\n'], " ") }

struct QueryBuilder<'a> {
    dialect: &'static dyn Dialect,
    schema: &'a StoreSchema,
    table: &'a str,
    scope: &'a Scope,
    context: SqlContext,
}

impl<'a> QueryBuilder<'a> {
    fn new(dialect: &'static dyn Dialect, schema: &'a StoreSchema, table: &'a str, scope: &'a Scope) -> Self {
        Self { dialect, schema, table, scope, context: SqlContext::default() }
    }

    fn column<'c>(&'c self, alias: &'c str) -> Column<'c> { Column { alias, name: &self.schema.entity_column } }

    /// Tenant and validity period for one alias. Applied to the root and every joined alias.
    fn guard(&self, alias: &str) -> String {
        format!(
            "{} BETWEEN {} AND {} AND {}.{} = {}",
            self.dialect.as_of(&self.scope.as_of),
            self.dialect.period_bound(&format!("{}.{}", alias, self.schema.start_column)),
            self.dialect.period_bound(&format!("{}.{}", alias, self.schema.end_column)),
            alias,
            self.schema.tenant_column,
            self.dialect.quote(&self.scope.tenant)
        )
    }

    fn select(&mut self) -> Select {
        let root = self.context.next_alias();
        let guard = self.guard(&root);
        Select { root, joins: Vec::new(), conditions: vec![guard] }
    }

    fn plan(&mut self, node: &FilterNode) -> Result<Plan, CompileError> {
        match node {
            FilterNode::And(left, right) | FilterNode::Or(left, right) if node.has_navigation() => {
                let junction = if matches!(node, FilterNode::And(..)) { Junction::And } else { Junction::Or };
                let mut left = Box::new(self.plan(left)?);
                let mut right = Box::new(self.plan(right)?);
                // a flat chain only keeps compound operands exact on the left; and/or commute
                if !self.dialect.nests_compounds() && !right.is_uniform(junction) && left.is_uniform(junction) {
                    std::mem::swap(&mut left, &mut right);
                }
                Ok(Plan::SetOp { junction, left, right })
            }
            _ => {
                let mut select = self.select();
                let condition = self.condition(node, &mut select)?;
                select.conditions.push(condition);
                Ok(Plan::Select(select))
            }
        }
    }

    fn condition(&mut self, node: &FilterNode, select: &mut Select) -> Result<String, CompileError> {
        match node {
            FilterNode::And(left, right) | FilterNode::Or(left, right) => {
                let merged = presence_run(node).and_then(|run| self.dialect.presence_run(self.column(&select.root), &run));
                if let Some(merged) = merged {
                    return Ok(merged);
                }
                let keyword = if matches!(node, FilterNode::And(..)) { "AND" } else { "OR" };
                let left = self.condition(left, select)?;
                let right = self.condition(right, select)?;
                Ok(format!("({} {} {})", left, keyword, right))
            }
            FilterNode::Unary { operator: UnaryOperator::Has, path } => {
                let alias = self.navigate(path, select, false);
                Ok(self.dialect.has_tag(self.column(&alias), path.last()))
            }
            FilterNode::Unary { operator: UnaryOperator::Not, path } if path.is_simple() => {
                Ok(self.dialect.missing_tag(self.column(&select.root), path.last()))
            }
            FilterNode::Unary { operator: UnaryOperator::Not, path } => {
                // an unresolvable hop leaves the outer-joined alias NULL, which counts as missing
                let alias = self.navigate(path, select, true);
                Ok(format!("({} IS NULL OR {})", self.column(&alias), self.dialect.missing_tag(self.column(&alias), path.last())))
            }
            FilterNode::Comparison { path, operator, value } => {
                let alias = self.navigate(path, select, false);
                self.comparison(self.column(&alias), path.last(), *operator, value)
            }
        }
    }

    /// Join one alias per hop of `path` and return the alias holding its final tag.
    fn navigate(&mut self, path: &Path, select: &mut Select, outer: bool) -> String {
        let join = if outer { "LEFT JOIN" } else { "INNER JOIN" };
        let mut previous = select.root.clone();
        for hop in path.hops() {
            let alias = self.context.next_alias();
            let reference = self.dialect.extract(self.column(&previous), hop);
            let id = self.dialect.extract(self.column(&alias), &self.schema.id_tag);
            select.joins.push(format!(
                "{} {} AS {} ON ({} AND ({} = {} OR {} = {}))",
                join,
                self.table,
                alias,
                self.guard(&alias),
                reference,
                id,
                self.dialect.ref_id(&reference),
                self.dialect.ref_id(&id)
            ));
            previous = alias;
        }
        previous
    }

    fn comparison(&self, column: Column, tag: &str, operator: ComparisonOperator, value: &Value) -> Result<String, CompileError> {
        match (operator, value) {
            // NaN equals nothing, not even a stored NaN
            (ComparisonOperator::Equal, Value::Number(number)) if number.value.is_nan() => return Ok("1 = 0".to_string()),
            (ComparisonOperator::NotEqual, Value::Number(number)) if number.value.is_nan() => return Ok(self.dialect.has_tag(column, tag)),
            _ => {}
        }
        match operator {
            ComparisonOperator::Equal => Ok(self.equality(column, tag, value)),
            // a present tag with any other value, including values of another kind
            ComparisonOperator::NotEqual => Ok(format!("({} AND ({}) IS NOT TRUE)", self.dialect.has_tag(column, tag), self.equality(column, tag, value))),
            _ => self.ordering(column, tag, operator, value),
        }
    }

    fn equality(&self, column: Column, tag: &str, value: &Value) -> String {
        let actual = self.dialect.extract(column, tag);
        match value {
            Value::Ref(reference) => self.prefix_equality(&actual, &format!("r:{}", reference.id)),
            Value::Number(number) if !number.value.is_nan() => self.prefix_equality(&actual, &format!("n:{}", encode_number(number.value))),
            Value::Bool(_) | Value::Null | Value::List(_) | Value::Dict(_) => self.dialect.json_equals(column, tag, &encode_value(value)),
            scalar => match encode_scalar(scalar) {
                Some(encoded) => format!("{} = {}", actual, self.dialect.quote(&encoded)),
                None => self.dialect.json_equals(column, tag, &encode_value(value)),
            },
        }
    }

    /// `encoded` alone, or followed by a space and a suffix (a ref's display name, a number's unit).
    fn prefix_equality(&self, actual: &str, encoded: &str) -> String {
        let prefix = format!("{} ", encoded);
        format!(
            "({} = {} OR substr({},1,{}) = {})",
            actual,
            self.dialect.quote(encoded),
            actual,
            prefix.chars().count(),
            self.dialect.quote(&prefix)
        )
    }

    fn ordering(&self, column: Column, tag: &str, operator: ComparisonOperator, value: &Value) -> Result<String, CompileError> {
        let kind = value.kind();
        let unsupported = || CompileError::UnsupportedComparison { operator, kind };
        let literal = match value {
            Value::Number(number) if !number.value.is_finite() => {
                return Err(CompileError::UnsupportedShape(format!("ordering against {} has no SQL form", value)));
            }
            Value::Number(number) => format!("{:?}", number.value),
            Value::Str(text) => self.dialect.quote(text),
            Value::Date(date) => self.dialect.quote(&date.format("%Y-%m-%d").to_string()),
            Value::Time(time) => self.dialect.quote(&encode_time(time)),
            Value::DateTime(datetime) => self.dialect.quote(&encode_instant(datetime)),
            _ => return Err(unsupported()),
        };
        let prefix = kind_prefix(kind).ok_or_else(unsupported)?;
        let actual = self.dialect.extract(column, tag);
        let payload = self.dialect.cast_payload(&format!("substr({},3)", actual), kind);
        // the cast only sees payloads of the literal's kind, whatever order the backend evaluates in
        Ok(format!(
            "(CASE WHEN substr({},1,2) = '{}' THEN {} END {} {})",
            actual,
            prefix,
            payload,
            operator.symbol(),
            self.dialect.cast_literal(&literal, kind)
        ))
    }

    fn id_membership(&self, root: &str, ids: &[Ref]) -> String {
        if ids.is_empty() {
            return "1 = 0".to_string();
        }
        let actual = self.dialect.extract(self.column(root), &self.schema.id_tag);
        let listed = ids.iter().map(|r| self.dialect.quote(&format!("r:{}", r.id))).collect::<Vec<_>>().join(", ");
        format!("{} IN ({})", self.dialect.ref_id(&actual), listed)
    }

    fn render(&self, plan: &Plan, nests: bool, out: &mut String) {
        match plan {
            Plan::Select(select) => {
                out.push_str(&format!("SELECT {}\nFROM {} AS {}", self.column(&select.root), self.table, select.root));
                for join in &select.joins {
                    out.push('\n');
                    out.push_str(join);
                }
                out.push_str("\nWHERE ");
                out.push_str(&select.conditions.join(" AND "));
            }
            Plan::SetOp { junction, left, right } if nests => {
                out.push_str("(\n");
                self.render(left, nests, out);
                out.push_str(&format!("\n)\n{}\n(\n", set_operator(*junction)));
                self.render(right, nests, out);
                out.push_str("\n)");
            }
            Plan::SetOp { junction, left, right } => {
                self.render(left, nests, out);
                out.push_str(&format!("\n{}\n", set_operator(*junction)));
                self.render(right, nests, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use hsfilter::parse_filter;

    use super::*;

    fn scope() -> Scope { Scope::new("customer", Utc.with_ymd_and_hms(2020, 10, 1, 0, 0, 0).unwrap()) }

    fn compile_with(dialect: SqlDialect, filter: &str) -> Result<CompiledSql, CompileError> {
        let node = parse_filter(filter).unwrap();
        SqlCompiler::new(dialect, StoreSchema::default()).compile(Some(&node), filter, "haystack", &scope())
    }

    fn sqlite(filter: &str) -> CompiledSql { compile_with(SqlDialect::Sqlite, filter).unwrap() }

    const GUARD_T1: &str =
        "datetime('2020-10-01T00:00:00Z') BETWEEN datetime(t1.start_datetime) AND datetime(t1.end_datetime) AND t1.customer_id = 'customer'";

    #[test]
    fn test_simple_has() {
        let node = parse_filter("site").unwrap();
        let compiled = SqlCompiler::new(SqlDialect::Sqlite, StoreSchema::default())
            .compile(Some(&node), "site", "haystack", &scope().with_limit(10))
            .unwrap();
        assert_eq!(
            compiled.sql,
            format!("-- site\nSELECT t1.entity\nFROM haystack AS t1\nWHERE {} AND json_type(t1.entity,'$.site') IS NOT NULL\nLIMIT 10", GUARD_T1)
        );
        assert!(!compiled.approximate);
    }

    #[test]
    fn test_join_on_hop() {
        let compiled = sqlite("siteRef->geoPostalCode == \"78280\"");
        let lines: Vec<&str> = compiled.sql.lines().collect();
        assert_eq!(lines[0], "-- siteRef->geoPostalCode == \"78280\"");
        assert_eq!(lines[2], "FROM haystack AS t1");
        assert!(lines[3].starts_with("INNER JOIN haystack AS t2 ON (datetime('2020-10-01T00:00:00Z') BETWEEN datetime(t2.start_datetime)"));
        assert!(lines[3].contains("t2.customer_id = 'customer'"));
        assert!(lines[3].contains("json_extract(t1.entity,'$.siteRef') = json_extract(t2.entity,'$.id')"));
        assert_eq!(lines[4], format!("WHERE {} AND json_extract(t2.entity,'$.geoPostalCode') = 's:78280'", GUARD_T1));
        assert_eq!(compiled.sql.matches("JOIN").count(), 1);
    }

    #[test]
    fn test_encoded_literals() {
        assert!(sqlite("a == 1").sql.contains("'n:1.000000'"));
        assert!(sqlite("a == 55400°").sql.contains("= 'n:55400.000000' OR substr("));
        assert!(sqlite("a == \"abc\"").sql.contains("= 's:abc'"));
        assert!(sqlite("a == M").sql.contains("= 'm:'"));
        assert!(sqlite("a == 2020-10-01").sql.contains("= 'd:2020-10-01'"));
        assert!(sqlite("a == `http://x`").sql.contains("= 'u:http://x'"));
        assert!(sqlite("a == \"O'Hare\"").sql.contains("= 's:O''Hare'"));
        assert!(sqlite("a == T").sql.contains("json_type(t1.entity,'$.a') = 'true'"));
        assert!(sqlite("a == N").sql.contains("json_type(t1.entity,'$.a') = 'null'"));
    }

    #[test]
    fn test_ref_equality_ignores_display_name() {
        let compiled = sqlite("siteRef == @s1");
        assert!(compiled.sql.contains("(json_extract(t1.entity,'$.siteRef') = 'r:s1' OR substr(json_extract(t1.entity,'$.siteRef'),1,5) = 'r:s1 ')"));
    }

    #[test]
    fn test_not_equal_requires_presence() {
        let compiled = sqlite("a != \"x\"");
        assert!(compiled.sql.ends_with("AND (json_type(t1.entity,'$.a') IS NOT NULL AND (json_extract(t1.entity,'$.a') = 's:x') IS NOT TRUE)"));
    }

    #[test]
    fn test_non_finite_equality() {
        assert!(sqlite("v == NaN").sql.ends_with(&format!("WHERE {} AND 1 = 0", GUARD_T1)));
        assert!(sqlite("v != NaN").sql.ends_with(&format!("WHERE {} AND json_type(t1.entity,'$.v') IS NOT NULL", GUARD_T1)));
        assert!(sqlite("v == INF").sql.contains("(json_extract(t1.entity,'$.v') = 'n:INF' OR substr(json_extract(t1.entity,'$.v'),1,6) = 'n:INF ')"));
        assert!(sqlite("v == -INF").sql.contains("= 'n:-INF'"));
    }

    #[test]
    fn test_orderings() {
        let curval = "json_extract(t1.entity,'$.curVal')";
        assert!(sqlite("curVal > 1").sql.contains(&format!(
            "(CASE WHEN substr({curval},1,2) = 'n:' THEN CASE substr({curval},3) WHEN 'INF' THEN 9e999 WHEN '-INF' THEN -9e999 \
             WHEN 'NaN' THEN NULL ELSE CAST(substr({curval},3) AS REAL) END END > 1.0)"
        )));
        assert!(sqlite("d <= 2020-10-01").sql.contains("THEN date(substr(json_extract(t1.entity,'$.d'),3)) END <= date('2020-10-01')"));
        assert!(sqlite("s < \"m\"").sql.ends_with("(CASE WHEN substr(json_extract(t1.entity,'$.s'),1,2) = 's:' THEN substr(json_extract(t1.entity,'$.s'),3) END < 'm')"));

        let postgres = compile_with(SqlDialect::Postgres, "curVal >= 72.5").unwrap();
        assert!(postgres.sql.contains(
            "(CASE WHEN substr(t1.entity->>'curVal',1,2) = 'n:' THEN NULLIF(split_part(substr(t1.entity->>'curVal',3),' ',1)::float, 'NaN') END >= 72.5)"
        ));
        let mysql = compile_with(SqlDialect::Mysql, "t < 10:00").unwrap();
        assert!(mysql.sql.contains("CAST(substr(t1.entity->>'$.t',3) AS TIME(6)) < CAST('10:00:00' AS TIME(6))"));
    }

    #[test]
    fn test_inline_compound() {
        let compiled = sqlite("site and (dis == \"x\" or not equip)");
        assert!(!compiled.sql.contains("INTERSECT"));
        assert!(compiled.sql.ends_with(
            "AND (json_type(t1.entity,'$.site') IS NOT NULL AND (json_extract(t1.entity,'$.dis') = 's:x' OR json_type(t1.entity,'$.equip') IS NULL))"
        ));
    }

    #[test]
    fn test_set_operations() {
        let compiled = sqlite("siteRef->area > 10 and point");
        let parts: Vec<&str> = compiled.sql.split("\nINTERSECT\n").collect();
        assert_eq!(parts.len(), 2);
        assert!(parts[0].contains("INNER JOIN haystack AS t2"));
        assert!(parts[1].starts_with("SELECT t3.entity\nFROM haystack AS t3\nWHERE"));
        assert!(!compiled.approximate);

        let compiled = compile_with(SqlDialect::Postgres, "siteRef->area > 10 or point").unwrap();
        assert!(compiled.sql.starts_with("-- siteRef->area > 10 or point\n(\nSELECT t1.entity"));
        assert!(compiled.sql.contains("\n)\nUNION\n(\nSELECT t3.entity"));
        assert!(compiled.sql.ends_with("\n)"));
    }

    #[test]
    fn test_sqlite_flat_compound_fallback() {
        // both operands compound with the other operator: no order of the flat chain is exact
        assert!(sqlite("(a->b or c->d) and (e->f or g->h)").approximate);
        assert!(sqlite("(a->b and c->d) or (e->f and g->h)").approximate);
        // a compound right operand moves to the front of the chain
        let compiled = sqlite("a->b or (c->d and e->f)");
        assert!(!compiled.approximate);
        let parts: Vec<&str> = compiled.sql.lines().filter(|line| matches!(*line, "UNION" | "INTERSECT")).collect();
        assert_eq!(parts, vec!["INTERSECT", "UNION"]);
        assert!(!sqlite("a->b and (c->d or e->f)").approximate);
        assert!(!sqlite("(a->b and c->d) and (e->f or g->h)").approximate);
        // left-nested and uniform shapes flatten exactly
        assert!(!sqlite("(a->b or c->d) and e->f").approximate);
        assert!(!sqlite("a->b and (c->d and e->f)").approximate);
        assert!(!sqlite("a->b or c->d or e->f").approximate);

        for dialect in [SqlDialect::Postgres, SqlDialect::Mysql] {
            assert!(!compile_with(dialect, "a->b and (c->d or e->f)").unwrap().approximate);
        }
    }

    #[test]
    fn test_not_on_path_outer_joins() {
        let compiled = sqlite("not siteRef->area");
        assert!(compiled.sql.contains("\nLEFT JOIN haystack AS t2 ON ("));
        assert!(compiled.sql.ends_with("AND (t2.entity IS NULL OR json_type(t2.entity,'$.area') IS NULL)"));
    }

    #[test]
    fn test_presence_merging() {
        let compiled = compile_with(SqlDialect::Postgres, "site and equip and point").unwrap();
        assert!(compiled.sql.ends_with("AND t1.entity ?& array['site','equip','point']"));
        let compiled = compile_with(SqlDialect::Postgres, "not site or not equip").unwrap();
        assert!(compiled.sql.ends_with("AND NOT t1.entity ?& array['site','equip']"));
        // other dialects keep the chain
        assert!(sqlite("site and equip").sql.ends_with("(json_type(t1.entity,'$.site') IS NOT NULL AND json_type(t1.entity,'$.equip') IS NOT NULL)"));
    }

    #[test]
    fn test_no_filter_selects_visible_entities() {
        let compiled = SqlCompiler::new(SqlDialect::Sqlite, StoreSchema::default()).compile(None, "", "haystack", &scope()).unwrap();
        assert_eq!(compiled.sql, format!("-- \nSELECT t1.entity\nFROM haystack AS t1\nWHERE {}", GUARD_T1));
    }

    #[test]
    fn test_compile_errors() {
        assert_eq!(
            compile_with(SqlDialect::Sqlite, "a > @p1"),
            Err(CompileError::UnsupportedComparison { operator: ComparisonOperator::GreaterThan, kind: hsfilter::ValueKind::Ref })
        );
        assert!(matches!(compile_with(SqlDialect::Sqlite, "a < INF"), Err(CompileError::UnsupportedShape(_))));

        let compiler = SqlCompiler::new(SqlDialect::Sqlite, StoreSchema::default());
        let node = parse_filter("site").unwrap();
        assert_eq!(compiler.compile(Some(&node), "site", "hay stack", &scope()), Err(CompileError::InvalidIdentifier("hay stack".into())));
        assert_eq!(compiler.compile(Some(&node), "site", "haystack", &scope().with_limit(-3)), Err(CompileError::InvalidLimit(-3)));
    }

    #[test]
    fn test_compile_ids() {
        let compiler = SqlCompiler::new(SqlDialect::Postgres, StoreSchema::default());
        let compiled = compiler.compile_ids(&[Ref::new("s1"), Ref::with_dis("e1", "AHU")], "haystack", &scope()).unwrap();
        assert!(compiled.sql.starts_with("-- ids: @s1, @e1\n"));
        assert!(compiled.sql.ends_with("AND split_part(t1.entity->>'id',' ',1) IN ('r:s1', 'r:e1')"));
        assert!(compiler.compile_ids(&[], "haystack", &scope()).unwrap().sql.ends_with("AND 1 = 0"));
    }
}
