use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use tracing::debug;

use super::predicate::{compile_predicate, CompiledPredicate};
use crate::error::ParseError;
use crate::parser::parse_filter;

pub const DEFAULT_CAPACITY: usize = 500;

/// Bounded LRU of compiled predicates keyed by filter text.
pub struct PredicateCache {
    entries: Mutex<LruCache<String, Arc<CompiledPredicate>>>,
}

impl Default for PredicateCache {
    fn default() -> Self { Self::new(DEFAULT_CAPACITY) }
}

impl PredicateCache {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self { entries: Mutex::new(LruCache::new(capacity)) }
    }

    /// Returns the cached predicate for `filter`, parsing and compiling it on a miss. Parse errors are
    /// not cached.
    pub fn get_or_compile(&self, filter: &str) -> Result<Arc<CompiledPredicate>, ParseError> {
        if let Some(hit) = self.lock().get(filter) {
            return Ok(hit.clone());
        }
        // compiled outside the lock; a racing miss compiles the same filter twice
        let predicate = Arc::new(compile_predicate(&parse_filter(filter)?));
        debug!("PredicateCache: compiled {}", filter);
        self.lock().put(filter.to_string(), predicate.clone());
        Ok(predicate)
    }

    pub fn len(&self) -> usize { self.lock().len() }

    pub fn is_empty(&self) -> bool { self.lock().is_empty() }

    pub fn clear(&self) { self.lock().clear() }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, Arc<CompiledPredicate>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
