use std::collections::HashMap;
use std::marker::PhantomData;

use indexmap::IndexMap;

use crate::ast::Path;
use crate::value::{Dict, Ref, Value};

/// A record of tags, looked up by name.
pub trait TaggedEntity {
    fn tag(&self, name: &str) -> Option<&Value>;
}

impl TaggedEntity for Dict {
    fn tag(&self, name: &str) -> Option<&Value> { self.get(name) }
}

impl TaggedEntity for HashMap<String, Value> {
    fn tag(&self, name: &str) -> Option<&Value> { self.get(name) }
}

impl<T: TaggedEntity + ?Sized> TaggedEntity for &T {
    fn tag(&self, name: &str) -> Option<&Value> { (**self).tag(name) }
}

/// Finds the entity a ref points at. Used to walk the hops of a path.
pub trait RefResolver<E> {
    fn resolve(&self, reference: &Ref) -> Option<&E>;
}

/// Entities keyed by their id.
impl<E> RefResolver<E> for HashMap<String, E> {
    fn resolve(&self, reference: &Ref) -> Option<&E> { self.get(&reference.id) }
}

impl<E> RefResolver<E> for IndexMap<String, E> {
    fn resolve(&self, reference: &Ref) -> Option<&E> { self.get(&reference.id) }
}

impl<E, R: RefResolver<E> + ?Sized> RefResolver<E> for &R {
    fn resolve(&self, reference: &Ref) -> Option<&E> { (**self).resolve(reference) }
}

/// A resolver that never resolves anything, for filters over isolated records.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRefs;

impl<E> RefResolver<E> for NoRefs {
    fn resolve(&self, _reference: &Ref) -> Option<&E> { None }
}

/// Follow `path` from `entity`, returning the value of its final tag.
///
/// Every segment but the last must hold a ref the resolver knows about, otherwise the path is
/// unresolved and `None` is returned.
pub fn resolve_path<'a, E, R>(path: &Path, entity: &'a E, resolver: &'a R) -> Option<&'a Value>
where
    E: TaggedEntity,
    R: RefResolver<E> + ?Sized,
{
    let mut current = entity;
    for hop in path.hops() {
        let reference = current.tag(hop)?.as_reference()?;
        current = resolver.resolve(reference)?;
    }
    current.tag(path.last())
}

/// Object-safe view of a resolver, so compiled predicates need not be generic.
pub(crate) trait DynResolver {
    fn resolve_entity(&self, reference: &Ref) -> Option<&dyn TaggedEntity>;
}

pub(crate) struct ErasedResolver<'a, E, R: ?Sized> {
    resolver: &'a R,
    _entity: PhantomData<fn() -> E>,
}

impl<'a, E, R: ?Sized> ErasedResolver<'a, E, R> {
    pub(crate) fn new(resolver: &'a R) -> Self { Self { resolver, _entity: PhantomData } }
}

impl<'a, E, R> DynResolver for ErasedResolver<'a, E, R>
where
    E: TaggedEntity + 'a,
    R: RefResolver<E> + ?Sized,
{
    fn resolve_entity(&self, reference: &Ref) -> Option<&dyn TaggedEntity> { self.resolver.resolve(reference).map(|e| e as &dyn TaggedEntity) }
}
