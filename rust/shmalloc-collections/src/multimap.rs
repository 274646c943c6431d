use std::borrow::Borrow;
use std::fmt;

use rune_alloc::BTreeMap;
use shmalloc::{Result, SharedAlloc};

use crate::vec::SharedVec;

/// An ordered multimap whose storage lives in the shared arena.
///
/// Duplicate keys are allowed; the values of one key keep their insertion
/// order, and iteration visits keys in ascending order. Internally the
/// entries of a key are grouped in an arena-backed bucket, so both the
/// tree nodes and the buckets come from the arena.
pub struct SharedMultimap<K, V> {
    inner: BTreeMap<K, SharedVec<V>, SharedAlloc>,
    len: usize,
    alloc: SharedAlloc,
}

impl<K: Ord, V> SharedMultimap<K, V> {
    /// Creates an empty multimap bound to the process-global arena.
    ///
    /// # Panics
    ///
    /// Panics when no global arena is installed.
    pub fn new() -> SharedMultimap<K, V> {
        SharedMultimap::new_in(SharedAlloc::default())
    }

    /// Creates an empty multimap bound to `alloc`.
    pub fn new_in(alloc: SharedAlloc) -> SharedMultimap<K, V> {
        SharedMultimap {
            inner: BTreeMap::new_in(alloc),
            len: 0,
            alloc,
        }
    }

    /// Copies an arbitrary range of entries into the arena.
    pub fn from_iter_in(
        iter: impl IntoIterator<Item = (K, V)>,
        alloc: SharedAlloc,
    ) -> Result<SharedMultimap<K, V>> {
        let mut map = SharedMultimap::new_in(alloc);
        for (key, value) in iter {
            map.insert(key, value)?;
        }
        Ok(map)
    }

    /// The allocator this multimap is bound to.
    pub fn allocator(&self) -> SharedAlloc {
        self.alloc
    }

    /// Inserts an entry. Existing entries for the key are kept.
    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
        if let Some(bucket) = self.inner.get_mut(&key) {
            bucket.push(value)?;
            self.len += 1;
            return Ok(());
        }
        let mut bucket = SharedVec::new_in(self.alloc);
        bucket.push(value)?;
        self.inner.try_insert(key, bucket)?;
        self.len += 1;
        Ok(())
    }

    /// The first value inserted for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.inner.get(key).and_then(|bucket| bucket.first())
    }

    /// Every value inserted for `key`, in insertion order.
    pub fn get_all<Q>(&self, key: &Q) -> &[V]
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.inner
            .get(key)
            .map(|bucket| bucket.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.inner.contains_key(key)
    }

    /// Number of entries stored for `key`.
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_all(key).len()
    }

    /// Removes every entry for `key`, returning how many were removed.
    pub fn remove<Q>(&mut self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.inner.remove(key) {
            Some(bucket) => {
                self.len -= bucket.len();
                bucket.len()
            }
            None => 0,
        }
    }

    /// Total number of entries, duplicates included.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.inner.len()
    }

    /// Drops every entry, returning all storage to the arena.
    pub fn clear(&mut self) {
        self.inner.clear();
        self.len = 0;
    }

    /// Iterates `(key, value)` pairs: keys ascending, each key's values in
    /// insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.inner
            .iter()
            .flat_map(|(key, bucket)| bucket.iter().map(move |value| (key, value)))
    }

    /// Iterates distinct keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.inner.keys()
    }
}

impl<K: Ord, V> Default for SharedMultimap<K, V> {
    fn default() -> SharedMultimap<K, V> {
        SharedMultimap::new()
    }
}

impl<K: Ord + fmt::Debug, V: fmt::Debug> fmt::Debug for SharedMultimap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
