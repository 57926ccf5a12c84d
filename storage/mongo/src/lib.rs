//! Document-store compiler for hsfilter.
//!
//! Produces aggregation pipeline stages as [`serde_json::Value`]s. Each document of the collection
//! carries the tenant, the validity period and the kind-prefix encoded entity. Ref hops become
//! `$lookup` stages that pull the referenced entity in beside the root document, and the whole
//! boolean tree lands in a single `$match`.

mod expression;
pub mod pipeline;

pub use hsfilter_storage_common::{CompileError, Scope, StoreSchema};
pub use pipeline::{PipelineCompiler, PipelineOptions};
