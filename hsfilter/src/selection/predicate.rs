//! Compile a filter once into a tree of closures, for filtering many entities with the same filter.

use std::cmp::Ordering;
use std::fmt;

use crate::ast::{ComparisonOperator, FilterNode, Path, UnaryOperator};
use crate::collation::Collation;
use crate::entity::{DynResolver, ErasedResolver, RefResolver, TaggedEntity};
use crate::value::Value;

type Test = Box<dyn Fn(&dyn TaggedEntity, &dyn DynResolver) -> bool + Send + Sync>;
type ValueTest = Box<dyn Fn(&Value) -> bool + Send + Sync>;

/// A filter lowered into closures. Matches exactly the entities [`crate::evaluate`] accepts.
pub struct CompiledPredicate {
    node: FilterNode,
    test: Test,
}

impl CompiledPredicate {
    pub fn matches<E, R>(&self, entity: &E, resolver: &R) -> bool
    where
        E: TaggedEntity,
        R: RefResolver<E> + ?Sized,
    {
        let resolver = ErasedResolver::<E, R>::new(resolver);
        (self.test)(entity, &resolver)
    }

    /// The filter this predicate was compiled from.
    pub fn node(&self) -> &FilterNode { &self.node }
}

impl fmt::Debug for CompiledPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.debug_struct("CompiledPredicate").field("filter", &self.node.to_string()).finish() }
}

pub fn compile_predicate(node: &FilterNode) -> CompiledPredicate { CompiledPredicate { node: node.clone(), test: lower(node) } }

fn lower(node: &FilterNode) -> Test {
    match node {
        FilterNode::Unary { operator: UnaryOperator::Has, path } => {
            let walk = PathWalk::new(path);
            Box::new(move |entity: &dyn TaggedEntity, resolver: &dyn DynResolver| walk.resolve(entity, resolver).is_some())
        }
        FilterNode::Unary { operator: UnaryOperator::Not, path } => {
            let walk = PathWalk::new(path);
            Box::new(move |entity: &dyn TaggedEntity, resolver: &dyn DynResolver| walk.resolve(entity, resolver).is_none())
        }
        FilterNode::Comparison { path, operator, value } => {
            let walk = PathWalk::new(path);
            let test = lower_comparison(*operator, value);
            Box::new(move |entity: &dyn TaggedEntity, resolver: &dyn DynResolver| walk.resolve(entity, resolver).is_some_and(|actual| test(actual)))
        }
        FilterNode::And(left, right) => {
            let (left, right) = (lower(left), lower(right));
            Box::new(move |entity: &dyn TaggedEntity, resolver: &dyn DynResolver| left(entity, resolver) && right(entity, resolver))
        }
        FilterNode::Or(left, right) => {
            let (left, right) = (lower(left), lower(right));
            Box::new(move |entity: &dyn TaggedEntity, resolver: &dyn DynResolver| left(entity, resolver) || right(entity, resolver))
        }
    }
}

struct PathWalk {
    hops: Vec<String>,
    tag: String,
}

impl PathWalk {
    fn new(path: &Path) -> Self { Self { hops: path.hops().to_vec(), tag: path.last().to_string() } }

    fn resolve<'e>(&self, entity: &'e dyn TaggedEntity, resolver: &'e dyn DynResolver) -> Option<&'e Value> {
        let mut current = entity;
        for hop in &self.hops {
            let reference = current.tag(hop)?.as_reference()?;
            current = resolver.resolve_entity(reference)?;
        }
        current.tag(&self.tag)
    }
}

fn lower_comparison(operator: ComparisonOperator, literal: &Value) -> ValueTest {
    match operator {
        ComparisonOperator::Equal => lower_equality(literal),
        ComparisonOperator::NotEqual => {
            let equal = lower_equality(literal);
            Box::new(move |actual: &Value| !equal(actual))
        }
        _ => lower_ordering(operator, literal),
    }
}

fn lower_equality(literal: &Value) -> ValueTest {
    match literal {
        Value::Number(n) => {
            let expected = n.value;
            Box::new(move |actual: &Value| matches!(actual, Value::Number(a) if a.value == expected))
        }
        Value::Str(s) => {
            let expected = s.clone();
            Box::new(move |actual: &Value| matches!(actual, Value::Str(a) if *a == expected))
        }
        Value::Ref(r) => {
            let expected = r.id.clone();
            Box::new(move |actual: &Value| matches!(actual, Value::Ref(a) if a.id == expected))
        }
        Value::Marker => Box::new(|actual: &Value| matches!(actual, Value::Marker)),
        Value::Null => Box::new(|actual: &Value| matches!(actual, Value::Null)),
        Value::Na => Box::new(|actual: &Value| matches!(actual, Value::Na)),
        other => {
            let expected = other.clone();
            Box::new(move |actual: &Value| actual.same_as(&expected))
        }
    }
}

fn accepts(operator: ComparisonOperator) -> fn(Ordering) -> bool {
    match operator {
        ComparisonOperator::LessThan => Ordering::is_lt,
        ComparisonOperator::LessThanOrEqual => Ordering::is_le,
        ComparisonOperator::GreaterThan => Ordering::is_gt,
        ComparisonOperator::GreaterThanOrEqual => Ordering::is_ge,
        // equality never reaches here
        ComparisonOperator::Equal => Ordering::is_eq,
        ComparisonOperator::NotEqual => Ordering::is_ne,
    }
}

fn lower_ordering(operator: ComparisonOperator, literal: &Value) -> ValueTest {
    let accept = accepts(operator);
    match literal {
        Value::Number(n) => {
            let bound = n.value;
            Box::new(move |actual: &Value| match actual {
                Value::Number(a) => a.value.partial_cmp(&bound).is_some_and(accept),
                _ => false,
            })
        }
        other if other.kind().is_ordered() => {
            let bound = other.clone();
            Box::new(move |actual: &Value| actual.collate(&bound).is_some_and(accept))
        }
        _ => Box::new(|_: &Value| false),
    }
}
