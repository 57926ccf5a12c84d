//! Filter tagged entities in memory. Used where records were not pre-filtered by a store query, or to
//! post-filter results a store compiler marked as approximate.

use crate::ast::{FilterNode, UnaryOperator};
use crate::collation::Collation;
use crate::entity::{resolve_path, RefResolver, TaggedEntity};

/// Evaluate `node` against `entity`, following ref hops through `resolver`. Never fails: unresolved
/// paths and incompatible comparisons are simply false.
pub fn evaluate<E, R>(node: &FilterNode, entity: &E, resolver: &R) -> bool
where
    E: TaggedEntity,
    R: RefResolver<E> + ?Sized,
{
    match node {
        FilterNode::Unary { operator, path } => {
            let present = resolve_path(path, entity, resolver).is_some();
            match operator {
                UnaryOperator::Has => present,
                UnaryOperator::Not => !present,
            }
        }
        FilterNode::Comparison { path, operator, value } => match resolve_path(path, entity, resolver) {
            Some(actual) => actual.satisfies(*operator, value),
            None => false,
        },
        FilterNode::And(left, right) => evaluate(left, entity, resolver) && evaluate(right, entity, resolver),
        FilterNode::Or(left, right) => evaluate(left, entity, resolver) || evaluate(right, entity, resolver),
    }
}

/// Collect the entities matching `node`, preserving input order.
pub fn filter_entities<'a, E, R>(entities: impl IntoIterator<Item = &'a E>, node: &FilterNode, resolver: &R) -> Vec<&'a E>
where
    E: TaggedEntity + 'a,
    R: RefResolver<E> + ?Sized,
{
    entities.into_iter().filter(|entity| evaluate(node, *entity, resolver)).collect()
}

#[derive(Debug, PartialEq)]
pub enum FilterResult<R> {
    Pass(R),
    Skip(R),
}

impl<R> FilterResult<R> {
    pub fn passed(&self) -> bool { matches!(self, FilterResult::Pass(_)) }

    pub fn into_inner(self) -> R {
        match self {
            FilterResult::Pass(r) | FilterResult::Skip(r) => r,
        }
    }
}

/// Tags each record of a stream with whether it passes the filter.
pub struct FilterIterator<'r, I, Res: ?Sized> {
    iter: I,
    node: FilterNode,
    resolver: &'r Res,
}

impl<'r, I, E, Res> FilterIterator<'r, I, Res>
where
    I: Iterator<Item = E>,
    E: TaggedEntity,
    Res: RefResolver<E> + ?Sized,
{
    pub fn new(iter: I, node: FilterNode, resolver: &'r Res) -> Self { Self { iter, node, resolver } }
}

impl<'r, I, E, Res> Iterator for FilterIterator<'r, I, Res>
where
    I: Iterator<Item = E>,
    E: TaggedEntity,
    Res: RefResolver<E> + ?Sized,
{
    type Item = FilterResult<E>;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|record| match evaluate(&self.node, &record, self.resolver) {
            true => FilterResult::Pass(record),
            false => FilterResult::Skip(record),
        })
    }
}
