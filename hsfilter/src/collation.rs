use std::cmp::Ordering;

use crate::ast::ComparisonOperator;
use crate::value::Value;

/// Equality and ordering as seen by filter comparisons.
///
/// Equality is total: values of different kinds are simply unequal. Ordering is partial and only
/// defined between two values of the same ordered kind.
pub trait Collation {
    fn same_as(&self, other: &Self) -> bool;

    fn collate(&self, other: &Self) -> Option<Ordering>;

    /// Applies a comparison operator, with the left side being `self`.
    fn satisfies(&self, operator: ComparisonOperator, other: &Self) -> bool {
        match operator {
            ComparisonOperator::Equal => self.same_as(other),
            ComparisonOperator::NotEqual => !self.same_as(other),
            ComparisonOperator::LessThan => self.collate(other) == Some(Ordering::Less),
            ComparisonOperator::LessThanOrEqual => matches!(self.collate(other), Some(Ordering::Less | Ordering::Equal)),
            ComparisonOperator::GreaterThan => self.collate(other) == Some(Ordering::Greater),
            ComparisonOperator::GreaterThanOrEqual => matches!(self.collate(other), Some(Ordering::Greater | Ordering::Equal)),
        }
    }
}

impl Collation for Value {
    fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            // units are not part of the comparison
            (Value::Number(a), Value::Number(b)) => a.value == b.value,
            (Value::Ref(a), Value::Ref(b)) => a.id == b.id,
            (Value::DateTime(a), Value::DateTime(b)) => a.instant == b.instant,
            (Value::List(a), Value::List(b)) => a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_as(y)),
            (Value::Dict(a), Value::Dict(b)) => a.len() == b.len() && a.iter().all(|(k, v)| b.get(k).is_some_and(|w| v.same_as(w))),
            (a, b) => a == b,
        }
    }

    fn collate(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.value.partial_cmp(&b.value),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.instant.cmp(&b.instant)),
            _ => None,
        }
    }
}
