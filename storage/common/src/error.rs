use hsfilter::{ComparisonOperator, ValueKind};
use thiserror::Error;

/// Failure to translate a filter into a store query. Fatal for that compilation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    #[error("cannot apply {} to a {kind} value", .operator.symbol())]
    UnsupportedComparison { operator: ComparisonOperator, kind: ValueKind },
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),
    #[error("invalid limit: {0}")]
    InvalidLimit(i64),
    #[error("unsupported shape: {0}")]
    UnsupportedShape(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CodecError {
    #[error("unknown kind prefix in {0:?}")]
    UnknownPrefix(String),
    #[error("invalid {kind} payload {text:?}")]
    InvalidScalar { kind: ValueKind, text: String },
    #[error("expected a JSON object for an entity")]
    NotAnObject,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid store url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("unsupported store scheme: {0}")]
    UnsupportedScheme(String),
    #[error(transparent)]
    Compile(#[from] CompileError),
}
