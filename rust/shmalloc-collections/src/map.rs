use std::borrow::Borrow;
use std::fmt;

use rune_alloc::BTreeMap;
use shmalloc::{Result, SharedAlloc};

/// An ordered map whose nodes live in the shared arena.
///
/// A thin pre-binding of the allocator-parameterized B-tree map to
/// [`SharedAlloc`]. Lookup, ordering and iteration are exactly the
/// underlying map's; the only added behavior is where the nodes come from,
/// which is what makes entries visible to every process of the fork
/// family.
///
/// As everywhere in this family, concurrent mutation from several
/// processes is not synchronized here; callers bring their own mutual
/// exclusion.
pub struct SharedMap<K, V> {
    inner: BTreeMap<K, V, SharedAlloc>,
    alloc: SharedAlloc,
}

impl<K: Ord, V> SharedMap<K, V> {
    /// Creates an empty map bound to the process-global arena.
    ///
    /// # Panics
    ///
    /// Panics when no global arena is installed.
    pub fn new() -> SharedMap<K, V> {
        SharedMap::new_in(SharedAlloc::default())
    }

    /// Creates an empty map bound to `alloc`.
    pub fn new_in(alloc: SharedAlloc) -> SharedMap<K, V> {
        SharedMap {
            inner: BTreeMap::new_in(alloc),
            alloc,
        }
    }

    /// Deep-copies a process-local map into the arena.
    ///
    /// The designed migration path: stage entries in an ordinary
    /// `std::collections::BTreeMap`, then copy them once into shared
    /// memory. No storage is aliased; the source remains untouched.
    pub fn from_local_in(
        local: &std::collections::BTreeMap<K, V>,
        alloc: SharedAlloc,
    ) -> Result<SharedMap<K, V>>
    where
        K: Clone,
        V: Clone,
    {
        SharedMap::from_local_with(local, |k, v| Ok((k.clone(), v.clone())), alloc)
    }

    /// Deep-copies a process-local map, converting each entry through `f`.
    ///
    /// Covers entries whose key or value types themselves allocate from
    /// the arena (for example `std::String` values becoming shared
    /// strings).
    pub fn from_local_with<K2, V2>(
        local: &std::collections::BTreeMap<K2, V2>,
        mut f: impl FnMut(&K2, &V2) -> Result<(K, V)>,
        alloc: SharedAlloc,
    ) -> Result<SharedMap<K, V>> {
        let mut map = SharedMap::new_in(alloc);
        for (key, value) in local {
            let (key, value) = f(key, value)?;
            map.insert(key, value)?;
        }
        Ok(map)
    }

    /// Copies an arbitrary range of entries into the arena.
    pub fn from_iter_in(
        iter: impl IntoIterator<Item = (K, V)>,
        alloc: SharedAlloc,
    ) -> Result<SharedMap<K, V>> {
        let mut map = SharedMap::new_in(alloc);
        for (key, value) in iter {
            map.insert(key, value)?;
        }
        Ok(map)
    }

    /// The allocator this map is bound to.
    pub fn allocator(&self) -> SharedAlloc {
        self.alloc
    }

    /// Inserts an entry, returning the previous value for the key.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        Ok(self.inner.try_insert(key, value)?)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.inner.get(key)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.inner.get_mut(key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.inner.contains_key(key)
    }

    /// Removes an entry, returning its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.inner.remove(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drops every entry, returning the nodes to the arena.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.inner.iter()
    }

    /// Iterates entries in key order with mutable values.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> {
        self.inner.iter_mut()
    }

    /// Iterates keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.inner.keys()
    }

    /// Iterates values in key order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.inner.values()
    }
}

impl<K: Ord, V> Default for SharedMap<K, V> {
    fn default() -> SharedMap<K, V> {
        SharedMap::new()
    }
}

impl<K: Ord + fmt::Debug, V: fmt::Debug> fmt::Debug for SharedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SharedString;
    use crate::tests::test_alloc;

    #[test]
    fn test_insert_get_remove() {
        let (_arena, alloc) = test_alloc();
        let mut map = SharedMap::new_in(alloc);
        assert_eq!(map.insert(2, "b").unwrap(), None);
        assert_eq!(map.insert(1, "a").unwrap(), None);
        assert_eq!(map.insert(2, "B").unwrap(), Some("b"));

        assert_eq!(map.get(&1), Some(&"a"));
        assert_eq!(map.get(&2), Some(&"B"));
        assert!(map.get(&3).is_none());

        assert_eq!(map.remove(&1), Some("a"));
        assert!(!map.contains_key(&1));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_iterates_in_key_order() {
        let (_arena, alloc) = test_alloc();
        let mut map = SharedMap::new_in(alloc);
        for key in [5, 1, 4, 2, 3] {
            map.insert(key, key * 10).unwrap();
        }
        let keys: Vec<i32> = map.keys().copied().collect();
        assert_eq!(keys, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_from_local_preserves_entries() {
        let (_arena, alloc) = test_alloc();
        let mut local = std::collections::BTreeMap::new();
        local.insert(100, "XMAP".to_string());

        let map = SharedMap::from_local_with(
            &local,
            |k, v| Ok((*k, SharedString::from_str_in(v, alloc)?)),
            alloc,
        )
        .unwrap();
        drop(local);

        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&100).unwrap(), "XMAP");
    }

    #[test]
    fn test_nodes_live_in_arena() {
        let (arena, alloc) = test_alloc();
        let before = arena.available();
        {
            let mut map = SharedMap::new_in(alloc);
            for key in 0..500u32 {
                map.insert(key, u64::from(key)).unwrap();
            }
            assert!(arena.available() < before, "nodes must consume arena space");
        }
        assert_eq!(arena.available(), before);
    }

    #[test]
    fn test_random_ops_mirror_std_btreemap() {
        let (_arena, alloc) = test_alloc();
        let mut shared = SharedMap::new_in(alloc);
        let mut model = std::collections::BTreeMap::new();

        for _ in 0..2000 {
            let key = fastrand::u16(0..64);
            if fastrand::bool() {
                let value = fastrand::u64(..);
                assert_eq!(
                    shared.insert(key, value).unwrap(),
                    model.insert(key, value)
                );
            } else {
                assert_eq!(shared.remove(&key), model.remove(&key));
            }
            assert_eq!(shared.len(), model.len());
        }
        assert!(shared.iter().eq(model.iter()));
    }

    #[test]
    fn test_exhaustion_propagates() {
        let arena = shmalloc_arena::SharedArena::create(4096).unwrap();
        let alloc = SharedAlloc::for_arena(arena.shared());
        let mut map = SharedMap::new_in(alloc);
        let mut failed = false;
        for key in 0..100_000u64 {
            if map.insert(key, [0u8; 64]).is_err() {
                failed = true;
                break;
            }
        }
        assert!(failed, "inserting past arena capacity must fail");
    }
}
