//! Project Haystack filter expressions: parsing, in-memory evaluation and compiled predicates.

pub mod ast;
pub mod collation;
pub mod conversion;
pub mod entity;
pub mod error;
pub mod grammar;
pub mod parser;
pub mod selection;
pub mod value;

pub use ast::{ComparisonOperator, FilterNode, Path, UnaryOperator};
pub use entity::{resolve_path, NoRefs, RefResolver, TaggedEntity};
pub use error::ParseError;
pub use parser::{parse_filter, parse_value};
pub use selection::cache::PredicateCache;
pub use selection::filter::{evaluate, filter_entities, FilterIterator, FilterResult};
pub use selection::predicate::{compile_predicate, CompiledPredicate};
pub use value::{Coord, Dict, Number, Ref, Value, ValueKind, XStr, ZonedDateTime};
