use std::collections::hash_map::{Entry, HashMap};
use std::fmt;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A map that can be shared between threads.
///
/// Reads take a shared lock, writes an exclusive one. Values are cloned out
/// on load, so keep them cheap to clone (wrap them in an `Arc` otherwise).
pub struct Map<K, V> {
    inner: RwLock<HashMap<K, V>>,
}

impl<K: Eq + Hash, V> Map<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.read().get(key).cloned()
    }

    pub fn store(&self, key: K, value: V) {
        self.write().insert(key, value);
    }

    /// Returns the existing value and `true`, or stores `value` and returns
    /// it with `false`.
    pub fn load_or_store(&self, key: K, value: V) -> (V, bool)
    where
        V: Clone,
    {
        self.load_or_store_lazy(key, || value)
    }

    /// Like [`load_or_store`](Self::load_or_store), but only builds the value
    /// when the key is absent.
    ///
    /// `init` runs under the write lock, at most once.
    pub fn load_or_store_lazy<F>(&self, key: K, init: F) -> (V, bool)
    where
        V: Clone,
        F: FnOnce() -> V,
    {
        if let Some(value) = self.read().get(&key) {
            return (value.clone(), true);
        }

        match self.write().entry(key) {
            Entry::Occupied(entry) => (entry.get().clone(), true),
            Entry::Vacant(entry) => (entry.insert(init()).clone(), false),
        }
    }

    pub fn load_and_delete(&self, key: &K) -> Option<V> {
        self.write().remove(key)
    }

    pub fn delete(&self, key: &K) {
        self.write().remove(key);
    }

    /// Calls `f` on every entry until it returns `false`.
    ///
    /// Holds the read lock throughout, so `f` must not write to this map.
    pub fn range<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        for (key, value) in self.read().iter() {
            if !f(key, value) {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    #[inline]
    fn read(&self) -> RwLockReadGuard<'_, HashMap<K, V>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    fn write(&self) -> RwLockWriteGuard<'_, HashMap<K, V>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K: Eq + Hash, V> Default for Map<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for Map<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("Map { .. }")
    }
}
