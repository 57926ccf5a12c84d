//! Shape analysis shared by the store compilers.

use hsfilter::{FilterNode, Path, UnaryOperator};
use indexmap::IndexSet;

use crate::error::CompileError;

/// Names inlined into queries (tags, tables, columns) must look like `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_identifier(name: &str) -> Result<(), CompileError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => (first.is_ascii_alphabetic() || first == '_') && chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
        None => false,
    };
    if valid { Ok(()) } else { Err(CompileError::InvalidIdentifier(name.to_string())) }
}

/// Validate every segment of every path in the filter.
pub fn validate_paths(node: &FilterNode) -> Result<(), CompileError> {
    let mut result = Ok(());
    node.walk_paths(&mut |path| {
        if result.is_ok() {
            result = path.segments().iter().try_for_each(|segment| validate_identifier(segment));
        }
    });
    result
}

/// The distinct multi-hop paths of a filter, in order of first appearance.
pub fn navigation_paths(node: &FilterNode) -> Vec<&Path> {
    let mut paths = IndexSet::new();
    node.walk_paths(&mut |path| {
        if !path.is_simple() {
            paths.insert(path);
        }
    });
    paths.into_iter().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Junction {
    And,
    Or,
}

impl Junction {
    pub fn of(node: &FilterNode) -> Option<Junction> {
        match node {
            FilterNode::And(..) => Some(Junction::And),
            FilterNode::Or(..) => Some(Junction::Or),
            _ => None,
        }
    }
}

/// A run of presence tests on direct tags joined by a single junction, e.g. `a and b and c` or
/// `not a or not b`. Stores with a multi-key presence operator test such a run in one go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceRun<'a> {
    pub junction: Junction,
    pub operator: UnaryOperator,
    pub tags: Vec<&'a str>,
}

/// Recognize `node` as a presence run of at least two tags.
pub fn presence_run(node: &FilterNode) -> Option<PresenceRun<'_>> {
    let junction = Junction::of(node)?;
    let mut operator = None;
    let mut tags = Vec::new();
    collect_presence(node, junction, &mut operator, &mut tags)?;
    Some(PresenceRun { junction, operator: operator?, tags })
}

fn collect_presence<'a>(node: &'a FilterNode, junction: Junction, operator: &mut Option<UnaryOperator>, tags: &mut Vec<&'a str>) -> Option<()> {
    match node {
        FilterNode::Unary { operator: op, path } if path.is_simple() => {
            if operator.is_some_and(|seen| seen != *op) {
                return None;
            }
            *operator = Some(*op);
            tags.push(path.first());
            Some(())
        }
        FilterNode::And(left, right) | FilterNode::Or(left, right) if Junction::of(node) == Some(junction) => {
            collect_presence(left, junction, operator, tags)?;
            collect_presence(right, junction, operator, tags)
        }
        _ => None,
    }
}
