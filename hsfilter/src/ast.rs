use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterNode {
    Unary { operator: UnaryOperator, path: Path },
    Comparison { path: Path, operator: ComparisonOperator, value: Value },
    And(Box<FilterNode>, Box<FilterNode>),
    Or(Box<FilterNode>, Box<FilterNode>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    Has, // bare path
    Not, // not path
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOperator {
    Equal,              // ==
    NotEqual,           // !=
    LessThan,           // <
    LessThanOrEqual,    // <=
    GreaterThan,        // >
    GreaterThanOrEqual, // >=
}

impl ComparisonOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOperator::Equal => "==",
            ComparisonOperator::NotEqual => "!=",
            ComparisonOperator::LessThan => "<",
            ComparisonOperator::LessThanOrEqual => "<=",
            ComparisonOperator::GreaterThan => ">",
            ComparisonOperator::GreaterThanOrEqual => ">=",
        }
    }

    /// True for the four ordering operators.
    pub fn is_ordering(&self) -> bool { !matches!(self, ComparisonOperator::Equal | ComparisonOperator::NotEqual) }
}

/// A tag path such as `equipRef->siteRef->area`. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    pub fn single(name: impl Into<String>) -> Self { Self { segments: vec![name.into()] } }

    pub fn segments(&self) -> &[String] { &self.segments }

    pub fn first(&self) -> &str { &self.segments[0] }

    pub fn last(&self) -> &str { &self.segments[self.segments.len() - 1] }

    /// The ref tags dereferenced before reaching the final tag.
    pub fn hops(&self) -> &[String] { &self.segments[..self.segments.len() - 1] }

    pub fn len(&self) -> usize { self.segments.len() }

    /// A single-segment path reads a tag of the entity itself.
    pub fn is_simple(&self) -> bool { self.segments.len() == 1 }
}

impl TryFrom<Vec<String>> for Path {
    type Error = &'static str;
    fn try_from(segments: Vec<String>) -> Result<Self, Self::Error> {
        if segments.is_empty() {
            return Err("a path needs at least one segment");
        }
        Ok(Self { segments })
    }
}

impl From<Path> for Vec<String> {
    fn from(path: Path) -> Self { path.segments }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.segments.join("->")) }
}

impl FilterNode {
    pub fn has(path: Path) -> Self { FilterNode::Unary { operator: UnaryOperator::Has, path } }

    pub fn missing(path: Path) -> Self { FilterNode::Unary { operator: UnaryOperator::Not, path } }

    pub fn compare(path: Path, operator: ComparisonOperator, value: impl Into<Value>) -> Self {
        FilterNode::Comparison { path, operator, value: value.into() }
    }

    pub fn and(self, right: FilterNode) -> Self { FilterNode::And(Box::new(self), Box::new(right)) }

    pub fn or(self, right: FilterNode) -> Self { FilterNode::Or(Box::new(self), Box::new(right)) }

    pub fn path(&self) -> Option<&Path> {
        match self {
            FilterNode::Unary { path, .. } | FilterNode::Comparison { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn is_compound(&self) -> bool { matches!(self, FilterNode::And(..) | FilterNode::Or(..)) }

    /// Visits every leaf path, left to right.
    pub fn walk_paths<'a>(&'a self, visit: &mut impl FnMut(&'a Path)) {
        match self {
            FilterNode::Unary { path, .. } | FilterNode::Comparison { path, .. } => visit(path),
            FilterNode::And(left, right) | FilterNode::Or(left, right) => {
                left.walk_paths(visit);
                right.walk_paths(visit);
            }
        }
    }

    /// True if any leaf navigates through a ref.
    pub fn has_navigation(&self) -> bool {
        let mut found = false;
        self.walk_paths(&mut |path| found |= !path.is_simple());
        found
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, node: &FilterNode, parent_is_and: bool) -> fmt::Result {
    match node {
        FilterNode::Or(..) if parent_is_and => write!(f, "({})", node),
        _ => write!(f, "{}", node),
    }
}

/// Canonical filter text. Parsing the output yields an equal tree.
impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterNode::Unary { operator: UnaryOperator::Has, path } => write!(f, "{}", path),
            FilterNode::Unary { operator: UnaryOperator::Not, path } => write!(f, "not {}", path),
            FilterNode::Comparison { path, operator, value } => write!(f, "{} {} {}", path, operator.symbol(), value),
            FilterNode::And(left, right) => {
                write_operand(f, left, true)?;
                f.write_str(" and ")?;
                match right.as_ref() {
                    FilterNode::And(..) | FilterNode::Or(..) => write!(f, "({})", right),
                    _ => write!(f, "{}", right),
                }
            }
            FilterNode::Or(left, right) => {
                write_operand(f, left, false)?;
                f.write_str(" or ")?;
                match right.as_ref() {
                    FilterNode::Or(..) => write!(f, "({})", right),
                    _ => write!(f, "{}", right),
                }
            }
        }
    }
}
