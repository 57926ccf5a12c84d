use crate::grammar::Rule;
use thiserror::Error;

/// Errors raised while turning filter text into a [`crate::ast::FilterNode`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("Syntax error at offset {offset} (line {line}, column {column}): {message}")]
    Syntax { offset: usize, line: usize, column: usize, message: String },
    #[error("Invalid literal at offset {offset}: {message}")]
    InvalidLiteral { offset: usize, message: String },
    #[error("Empty expression")]
    EmptyExpression,
    #[error("Expected {expected}, got {got:?}")]
    UnexpectedRule { expected: &'static str, got: Rule },
}

impl ParseError {
    /// Byte offset into the filter text, when the error has a position.
    pub fn offset(&self) -> Option<usize> {
        match self {
            ParseError::Syntax { offset, .. } | ParseError::InvalidLiteral { offset, .. } => Some(*offset),
            ParseError::EmptyExpression | ParseError::UnexpectedRule { .. } => None,
        }
    }

    pub(crate) fn invalid_literal(offset: usize, message: impl Into<String>) -> Self {
        ParseError::InvalidLiteral { offset, message: message.into() }
    }
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let offset = match err.location {
            pest::error::InputLocation::Pos(pos) => pos,
            pest::error::InputLocation::Span((start, _)) => start,
        };
        let (line, column) = match err.line_col {
            pest::error::LineColLocation::Pos(lc) => lc,
            pest::error::LineColLocation::Span(lc, _) => lc,
        };
        let message = match &err.variant {
            pest::error::ErrorVariant::ParsingError { positives, .. } if !positives.is_empty() => {
                format!("expected one of {}", positives.iter().map(|r| format!("{:?}", r)).collect::<Vec<_>>().join(", "))
            }
            pest::error::ErrorVariant::ParsingError { .. } => "unexpected input".to_string(),
            pest::error::ErrorVariant::CustomError { message } => message.clone(),
        };
        ParseError::Syntax { offset, line, column, message }
    }
}
