//! Aggregation pipeline assembly.
//!
//! Stage layout of a compiled filter:
//!
//! 1. `$match` on tenant and validity period, then `$replaceRoot` onto the entity.
//! 2. For each distinct navigating path, one `$lookup` plus `$set` pair per hop.
//! 3. A single `$match` holding the filter as an `$expr`.
//! 4. `$replaceRoot` back onto `$$ROOT` when lookups were added, then an optional `$limit`.

use std::collections::HashSet;

use hsfilter::{FilterNode, Path, Ref};
use hsfilter_storage_common::{navigation_paths, validate_identifier, validate_paths, CompileError, Scope, StoreSchema, DEFAULT_TABLE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as Json};
use tracing::debug;

use crate::expression::{ref_id, single, ExpressionBuilder};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Collection the entities live in, also the target of every `$lookup`.
    pub collection: String,
    /// Test runs like `a and b and c` as one flat `$and` instead of nested pairs.
    pub flatten_has_tests: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self { Self { collection: DEFAULT_TABLE.to_string(), flatten_has_tests: false } }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineCompiler {
    options: PipelineOptions,
    schema: StoreSchema,
}

impl PipelineCompiler {
    pub fn new(options: PipelineOptions, schema: StoreSchema) -> Self { Self { options, schema } }

    pub fn options(&self) -> &PipelineOptions { &self.options }

    pub fn schema(&self) -> &StoreSchema { &self.schema }

    /// Compile `node` into the stages selecting the matching entities visible in `scope`. `None`
    /// selects every visible entity.
    pub fn compile(&self, node: Option<&FilterNode>, scope: &Scope) -> Result<Vec<Json>, CompileError> {
        let limit = self.check(scope)?;
        let mut context = PipelineContext::new(&self.options, &self.schema, scope);
        context.push_scope();
        if let Some(node) = node {
            validate_paths(node)?;
            let expression = ExpressionBuilder { flatten_has_tests: self.options.flatten_has_tests }.build(node)?;
            let paths = navigation_paths(node);
            for path in &paths {
                context.push_lookups(path);
            }
            context.stages.push(json!({"$match": {"$expr": expression}}));
            if !paths.is_empty() {
                context.stages.push(json!({"$replaceRoot": {"newRoot": "$$ROOT"}}));
            }
        }
        context.push_limit(limit);
        debug!("PipelineCompiler({}): {} stages, {} lookups", self.options.collection, context.stages.len(), context.lookups);
        Ok(context.stages)
    }

    /// Compile a read of the entities whose id is one of `ids`.
    pub fn compile_ids(&self, ids: &[Ref], scope: &Scope) -> Result<Vec<Json>, CompileError> {
        let limit = self.check(scope)?;
        let mut context = PipelineContext::new(&self.options, &self.schema, scope);
        context.push_scope();
        let listed: Vec<Json> = ids.iter().map(|r| json!(r.id)).collect();
        let id = ref_id(&format!("${}", self.schema.id_tag));
        context.stages.push(json!({"$match": {"$expr": {"$in": [id, listed]}}}));
        context.push_limit(limit);
        debug!("PipelineCompiler({}): read of {} ids", self.options.collection, ids.len());
        Ok(context.stages)
    }

    fn check(&self, scope: &Scope) -> Result<Option<u64>, CompileError> {
        validate_identifier(&self.options.collection)?;
        self.schema.validate()?;
        scope.checked_limit()
    }
}

/// Stages of the pipeline under construction.
struct PipelineContext<'a> {
    options: &'a PipelineOptions,
    schema: &'a StoreSchema,
    scope: &'a Scope,
    as_of: Json,
    lookups: usize,
    /// Aliases with a deeper alias set inside them. Looking one up again would replace that document.
    nested: HashSet<String>,
    stages: Vec<Json>,
}

impl<'a> PipelineContext<'a> {
    fn new(options: &'a PipelineOptions, schema: &'a StoreSchema, scope: &'a Scope) -> Self {
        let as_of = json!({"$date": scope.as_of_iso()});
        Self { options, schema, scope, as_of, lookups: 0, nested: HashSet::new(), stages: Vec::new() }
    }

    fn push_scope(&mut self) {
        let mut filter = Map::new();
        filter.insert(self.schema.tenant_column.clone(), json!(self.scope.tenant));
        filter.insert(self.schema.start_column.clone(), json!({"$lte": self.as_of}));
        filter.insert(self.schema.end_column.clone(), json!({"$gt": self.as_of}));
        self.stages.push(json!({"$match": filter}));
        self.stages.push(json!({"$replaceRoot": {"newRoot": format!("${}", self.schema.entity_column)}}));
    }

    /// One `$lookup` and `$set` per hop of `path`, each hop resolved from the entity pulled in by the
    /// previous one. Hops shared with an earlier, longer path are already in place.
    fn push_lookups(&mut self, path: &Path) {
        let schema = self.schema;
        let mut parent: Option<String> = None;
        for hop in path.hops() {
            let prefix = parent.as_ref().map(|alias| format!("{}.", alias)).unwrap_or_default();
            let alias = format!("{}{}_entity_", prefix, hop);
            if let Some(parent) = parent.replace(alias.clone()) {
                self.nested.insert(parent);
            }
            if self.nested.contains(&alias) {
                continue;
            }
            let variable = format!("{}_id_", hop);
            let visible = json!({"$and": [
                {"$eq": [format!("${}", schema.tenant_column), self.scope.tenant]},
                {"$lte": [format!("${}", schema.start_column), self.as_of]},
                {"$gt": [format!("${}", schema.end_column), self.as_of]},
                {"$eq": [format!("${}.{}", schema.entity_column, schema.id_tag), format!("$${}", variable)]}
            ]});
            self.stages.push(json!({
                "$lookup": {
                    "from": self.options.collection,
                    "as": alias,
                    "let": single(&variable, json!(format!("${}{}", prefix, hop))),
                    "pipeline": [{"$match": {"$expr": visible}}]
                }
            }));
            self.stages.push(json!({
                "$set": single(&alias, json!({"$arrayElemAt": [format!("${}.{}", alias, schema.entity_column), 0]}))
            }));
            self.lookups += 1;
        }
    }

    fn push_limit(&mut self, limit: Option<u64>) {
        if let Some(limit) = limit {
            self.stages.push(json!({"$limit": limit}));
        }
    }
}
