use std::borrow::Borrow;
use std::fmt;

use rune_alloc::BTreeMap;
use shmalloc::{Result, SharedAlloc};

/// An ordered multiset whose storage lives in the shared arena.
///
/// Equal values may be inserted repeatedly; iteration yields each value as
/// many times as it was inserted, in ascending order. Internally one tree
/// node per distinct value carries an occurrence count, so repeated
/// insertions of the same value cost no additional arena space.
pub struct SharedMultiset<T> {
    inner: BTreeMap<T, usize, SharedAlloc>,
    len: usize,
    alloc: SharedAlloc,
}

impl<T: Ord> SharedMultiset<T> {
    /// Creates an empty multiset bound to the process-global arena.
    ///
    /// # Panics
    ///
    /// Panics when no global arena is installed.
    pub fn new() -> SharedMultiset<T> {
        SharedMultiset::new_in(SharedAlloc::default())
    }

    /// Creates an empty multiset bound to `alloc`.
    pub fn new_in(alloc: SharedAlloc) -> SharedMultiset<T> {
        SharedMultiset {
            inner: BTreeMap::new_in(alloc),
            len: 0,
            alloc,
        }
    }

    /// Copies an arbitrary range of values into the arena.
    pub fn from_iter_in(
        iter: impl IntoIterator<Item = T>,
        alloc: SharedAlloc,
    ) -> Result<SharedMultiset<T>> {
        let mut set = SharedMultiset::new_in(alloc);
        for value in iter {
            set.insert(value)?;
        }
        Ok(set)
    }

    /// The allocator this multiset is bound to.
    pub fn allocator(&self) -> SharedAlloc {
        self.alloc
    }

    /// Inserts a value, keeping any equal values already present.
    pub fn insert(&mut self, value: T) -> Result<()> {
        if let Some(count) = self.inner.get_mut(&value) {
            *count += 1;
            self.len += 1;
            return Ok(());
        }
        self.inner.try_insert(value, 1)?;
        self.len += 1;
        Ok(())
    }

    /// How many times `value` occurs.
    pub fn count<Q>(&self, value: &Q) -> usize
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.inner.get(value).copied().unwrap_or(0)
    }

    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.inner.contains_key(value)
    }

    /// Removes one occurrence of `value`; returns whether one was present.
    pub fn remove_one<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        if let Some(count) = self.inner.get_mut(value) {
            if *count > 1 {
                *count -= 1;
                self.len -= 1;
                return true;
            }
        } else {
            return false;
        }
        // Last occurrence: drop the node itself.
        self.inner.remove(value);
        self.len -= 1;
        true
    }

    /// Removes every occurrence of `value`, returning how many there were.
    pub fn remove_all<Q>(&mut self, value: &Q) -> usize
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.inner.remove(value) {
            Some(count) => {
                self.len -= count;
                count
            }
            None => 0,
        }
    }

    /// Total number of values, duplicates included.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drops everything, returning the nodes to the arena.
    pub fn clear(&mut self) {
        self.inner.clear();
        self.len = 0;
    }

    /// Iterates values in ascending order, each one `count` times.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.inner
            .iter()
            .flat_map(|(value, count)| std::iter::repeat_n(value, *count))
    }
}

impl<T: Ord> Default for SharedMultiset<T> {
    fn default() -> SharedMultiset<T> {
        SharedMultiset::new()
    }
}

impl<T: Ord + fmt::Debug> fmt::Debug for SharedMultiset<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_alloc;

    #[test]
    fn test_duplicates_are_counted() {
        let (_arena, alloc) = test_alloc();
        let mut set = SharedMultiset::new_in(alloc);
        for name in ["franta", "pepa", "honza", "franta", "pepa", "honza"] {
            set.insert(name).unwrap();
        }
        assert_eq!(set.len(), 6);
        assert_eq!(set.count(&"franta"), 2);
        let values: Vec<&str> = set.iter().copied().collect();
        assert_eq!(
            values,
            ["franta", "franta", "honza", "honza", "pepa", "pepa"]
        );
    }

    #[test]
    fn test_remove_one_and_all() {
        let (_arena, alloc) = test_alloc();
        let mut set = SharedMultiset::from_iter_in([1, 1, 1, 2], alloc).unwrap();
        assert!(set.remove_one(&1));
        assert_eq!(set.count(&1), 2);
        assert_eq!(set.remove_all(&1), 2);
        assert!(!set.contains(&1));
        assert_eq!(set.len(), 1);
        assert!(!set.remove_one(&1));
    }

    #[test]
    fn test_clear_empties() {
        let (_arena, alloc) = test_alloc();
        let mut set = SharedMultiset::from_iter_in(0..50u8, alloc).unwrap();
        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.count(&3), 0);
    }
}
