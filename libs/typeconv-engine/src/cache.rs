use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use typeconv_api::Type;

use crate::fields::FieldMap;
use crate::plan::CompiledPlan;

/// Concurrent memo table with insert-if-absent semantics.
///
/// Entries are never evicted. Values are shared read-only through `Arc`.
#[derive(Debug)]
pub struct Memo<K, V> {
    name: &'static str,
    entries: RwLock<HashMap<K, Arc<V>>>,
}

impl<K: Eq + Hash, V> Memo<K, V> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.read().get(key).cloned()
    }

    /// Store `value` unless another thread got there first; returns the
    /// entry that ends up in the table.
    pub fn insert(&self, key: K, value: V) -> Arc<V> {
        self.write().entry(key).or_insert_with(|| Arc::new(value)).clone()
    }

    /// Cached value for `key`, building it outside the lock on a miss.
    pub fn get_or_insert_with(&self, key: K, build: impl FnOnce() -> V) -> Arc<V> {
        if let Some(hit) = self.get(&key) {
            return hit;
        }
        self.insert(key, build())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<K, Arc<V>>> {
        match self.entries.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!(cache = self.name, "read lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<K, Arc<V>>> {
        match self.entries.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!(cache = self.name, "write lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

/// Top-level plan cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanKey {
    pub src: Type,
    pub dst: Type,
    pub strict_types: bool,
    pub tag: String,
}

/// The two process-lifetime caches of an engine: discovered field maps and
/// compiled top-level plans. Nested plans are never stored here.
#[derive(Debug)]
pub struct PlanCache {
    pub field_maps: Memo<(Type, String), FieldMap>,
    pub plans: Memo<PlanKey, CompiledPlan>,
}

impl Default for PlanCache {
    fn default() -> Self {
        Self {
            field_maps: Memo::new("field_maps"),
            plans: Memo::new("plans"),
        }
    }
}

impl PlanCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn first_insert_wins() {
        let memo: Memo<u32, String> = Memo::new("test");
        let a = memo.insert(1, "first".into());
        let b = memo.insert(1, "second".into());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*b, "first");
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn concurrent_inserts_agree() {
        let memo: Arc<Memo<u32, u32>> = Arc::new(Memo::new("test"));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let memo = Arc::clone(&memo);
                thread::spawn(move || memo.get_or_insert_with(7, || i))
            })
            .collect();
        let winners: Vec<Arc<u32>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(winners.iter().all(|w| Arc::ptr_eq(w, &winners[0])));
    }
}
