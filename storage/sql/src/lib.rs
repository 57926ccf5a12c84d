//! Relational store compiler for hsfilter.
//!
//! Entities live in one table with a JSON entity column holding kind-prefixed scalars (see
//! [`hsfilter_storage_common::encoding`]), plus tenant and validity period columns. A filter
//! compiles into a single inlined SQL statement:
//!
//! ```rust,ignore
//! use hsfilter_storage_sql::{SqlCompiler, SqlDialect};
//!
//! let compiler = SqlCompiler::new(SqlDialect::Postgres, StoreSchema::default());
//! let node = parse_filter("equip and siteRef->geoCity == \"Chicago\"")?;
//! let compiled = compiler.compile(Some(&node), text, "haystack", &Scope::new("acme", Utc::now()))?;
//! ```
//!
//! SQLite can't parenthesize compound selects, so some filter shapes compile to a flat chain that
//! is flagged [`CompiledSql::approximate`].

pub mod compiler;
pub mod dialect;

pub use compiler::{CompiledSql, SqlCompiler};
pub use dialect::{Dialect, SqlDialect};
pub use hsfilter_storage_common::{CompileError, Scope, StoreSchema};
