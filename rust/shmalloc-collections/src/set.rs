use std::borrow::Borrow;
use std::fmt;

use rune_alloc::BTreeSet;
use shmalloc::{Result, SharedAlloc};

/// An ordered set whose nodes live in the shared arena.
///
/// The set counterpart of [`SharedMap`]: a pre-binding of the
/// allocator-parameterized B-tree set to [`SharedAlloc`], with converting
/// constructors from the process-local equivalent.
///
/// [`SharedMap`]: crate::SharedMap
pub struct SharedSet<T> {
    inner: BTreeSet<T, SharedAlloc>,
    alloc: SharedAlloc,
}

impl<T: Ord> SharedSet<T> {
    /// Creates an empty set bound to the process-global arena.
    ///
    /// # Panics
    ///
    /// Panics when no global arena is installed.
    pub fn new() -> SharedSet<T> {
        SharedSet::new_in(SharedAlloc::default())
    }

    /// Creates an empty set bound to `alloc`.
    pub fn new_in(alloc: SharedAlloc) -> SharedSet<T> {
        SharedSet {
            inner: BTreeSet::new_in(alloc),
            alloc,
        }
    }

    /// Deep-copies a process-local set into the arena.
    pub fn from_local_in(
        local: &std::collections::BTreeSet<T>,
        alloc: SharedAlloc,
    ) -> Result<SharedSet<T>>
    where
        T: Clone,
    {
        SharedSet::from_local_with(local, |v| Ok(v.clone()), alloc)
    }

    /// Deep-copies a process-local set, converting each value through `f`.
    pub fn from_local_with<U>(
        local: &std::collections::BTreeSet<U>,
        mut f: impl FnMut(&U) -> Result<T>,
        alloc: SharedAlloc,
    ) -> Result<SharedSet<T>>
    where
        U: Ord,
    {
        let mut set = SharedSet::new_in(alloc);
        for value in local {
            set.insert(f(value)?)?;
        }
        Ok(set)
    }

    /// Copies an arbitrary range of values into the arena.
    pub fn from_iter_in(
        iter: impl IntoIterator<Item = T>,
        alloc: SharedAlloc,
    ) -> Result<SharedSet<T>> {
        let mut set = SharedSet::new_in(alloc);
        for value in iter {
            set.insert(value)?;
        }
        Ok(set)
    }

    /// The allocator this set is bound to.
    pub fn allocator(&self) -> SharedAlloc {
        self.alloc
    }

    /// Inserts a value; returns whether it was newly inserted.
    pub fn insert(&mut self, value: T) -> Result<bool> {
        Ok(self.inner.try_insert(value)?)
    }

    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.inner.contains(value)
    }

    /// Removes a value; returns whether it was present.
    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.inner.remove(value)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drops every value, returning the nodes to the arena.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Iterates values in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.inner.iter()
    }
}

impl<T: Ord> Default for SharedSet<T> {
    fn default() -> SharedSet<T> {
        SharedSet::new()
    }
}

impl<T: Ord + fmt::Debug> fmt::Debug for SharedSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SharedString;
    use crate::tests::test_alloc;

    #[test]
    fn test_insert_contains_remove() {
        let (_arena, alloc) = test_alloc();
        let mut set = SharedSet::new_in(alloc);
        assert!(set.insert(3).unwrap());
        assert!(set.insert(1).unwrap());
        assert!(!set.insert(3).unwrap(), "duplicate insert must report false");

        assert!(set.contains(&1));
        assert!(!set.contains(&2));
        assert!(set.remove(&1));
        assert!(!set.remove(&1));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_ordered_iteration_of_shared_strings() {
        let (_arena, alloc) = test_alloc();
        let mut set = SharedSet::new_in(alloc);
        for name in ["pepa", "franta", "honza"] {
            set.insert(SharedString::from_str_in(name, alloc).unwrap())
                .unwrap();
        }
        let names: Vec<&str> = set.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, ["franta", "honza", "pepa"]);
    }

    #[test]
    fn test_from_local_in() {
        let (_arena, alloc) = test_alloc();
        let local: std::collections::BTreeSet<u32> = [4, 2, 7].into_iter().collect();
        let set = SharedSet::from_local_in(&local, alloc).unwrap();
        assert_eq!(set.len(), 3);
        assert!(set.contains(&7));
    }

    #[test]
    fn test_clear_returns_storage() {
        let (arena, alloc) = test_alloc();
        let before = arena.available();
        let mut set = SharedSet::from_iter_in(0..200u64, alloc).unwrap();
        assert!(arena.available() < before);
        set.clear();
        drop(set);
        assert_eq!(arena.available(), before);
    }
}
