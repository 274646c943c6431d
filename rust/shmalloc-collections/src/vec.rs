use std::fmt;
use std::ops::{Deref, DerefMut};

use rune_alloc::Vec;
use shmalloc::{Result, SharedAlloc};

/// A contiguous growable array whose storage lives in the shared arena.
///
/// A thin pre-binding of the allocator-parameterized vector to
/// [`SharedAlloc`]: element storage comes from the arena, growth and layout
/// behave exactly like the underlying vector, and the fallible `try_*`
/// surface of the allocator-aware library is exposed as `Result`-returning
/// mutations. Dereferences to `[T]`, so reads and in-place element writes
/// use ordinary slice syntax.
///
/// The header (`ptr`/`len`/`capacity`) lives wherever this value is
/// stored; place it via [`Shared::new_in`] when other processes need to
/// reach the vector itself.
///
/// [`Shared::new_in`]: shmalloc::Shared::new_in
pub struct SharedVec<T> {
    inner: Vec<T, SharedAlloc>,
    alloc: SharedAlloc,
}

impl<T> SharedVec<T> {
    /// Creates an empty vector bound to the process-global arena.
    ///
    /// # Panics
    ///
    /// Panics when no global arena is installed.
    pub fn new() -> SharedVec<T> {
        SharedVec::new_in(SharedAlloc::default())
    }

    /// Creates an empty vector bound to `alloc`.
    pub fn new_in(alloc: SharedAlloc) -> SharedVec<T> {
        SharedVec {
            inner: Vec::new_in(alloc),
            alloc,
        }
    }

    /// Creates a vector with room for `capacity` elements.
    pub fn with_capacity_in(capacity: usize, alloc: SharedAlloc) -> Result<SharedVec<T>> {
        let mut vec = SharedVec::new_in(alloc);
        vec.inner.try_reserve(capacity)?;
        Ok(vec)
    }

    /// Creates a vector of `len` clones of `elem` in the arena.
    pub fn from_elem_in(elem: T, len: usize, alloc: SharedAlloc) -> Result<SharedVec<T>>
    where
        T: Clone,
    {
        let mut vec = SharedVec::with_capacity_in(len, alloc)?;
        for _ in 0..len {
            vec.inner.try_push(elem.clone())?;
        }
        Ok(vec)
    }

    /// Deep-copies a process-local slice or vector into the arena.
    pub fn from_local_in(local: &[T], alloc: SharedAlloc) -> Result<SharedVec<T>>
    where
        T: Clone,
    {
        let mut vec = SharedVec::with_capacity_in(local.len(), alloc)?;
        for item in local {
            vec.inner.try_push(item.clone())?;
        }
        Ok(vec)
    }

    /// Deep-copies a process-local sequence, converting each element
    /// through `f`. Covers element types that themselves allocate from the
    /// arena, such as shared strings.
    pub fn from_local_with<U>(
        local: &[U],
        mut f: impl FnMut(&U) -> Result<T>,
        alloc: SharedAlloc,
    ) -> Result<SharedVec<T>> {
        let mut vec = SharedVec::with_capacity_in(local.len(), alloc)?;
        for item in local {
            vec.inner.try_push(f(item)?)?;
        }
        Ok(vec)
    }

    /// Copies an arbitrary range of values into the arena.
    pub fn from_iter_in(
        iter: impl IntoIterator<Item = T>,
        alloc: SharedAlloc,
    ) -> Result<SharedVec<T>> {
        let mut vec = SharedVec::new_in(alloc);
        for item in iter {
            vec.inner.try_push(item)?;
        }
        Ok(vec)
    }

    /// The allocator this vector is bound to.
    pub fn allocator(&self) -> SharedAlloc {
        self.alloc
    }

    /// Appends an element, growing in the arena as needed.
    pub fn push(&mut self, value: T) -> Result<()> {
        self.inner.try_push(value)?;
        Ok(())
    }

    /// Removes and returns the last element.
    pub fn pop(&mut self) -> Option<T> {
        self.inner.pop()
    }

    /// Removes and returns the element at `index`, shifting the tail left.
    ///
    /// # Panics
    ///
    /// Panics when `index` is out of bounds.
    pub fn remove(&mut self, index: usize) -> T {
        self.inner.remove(index)
    }

    /// Reserves room for at least `additional` more elements.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        self.inner.try_reserve(additional)?;
        Ok(())
    }

    /// Appends every element of `other`.
    pub fn extend_from_slice(&mut self, other: &[T]) -> Result<()>
    where
        T: Clone,
    {
        self.inner.try_reserve(other.len())?;
        for item in other {
            self.inner.try_push(item.clone())?;
        }
        Ok(())
    }

    /// Shortens the vector to `len` elements, dropping the rest.
    pub fn truncate(&mut self, len: usize) {
        self.inner.truncate(len);
    }

    /// Drops every element.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Number of elements the vector can hold without growing.
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Borrows the elements as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.inner
    }

    /// Borrows the elements as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.inner
    }
}

impl<T> Default for SharedVec<T> {
    fn default() -> SharedVec<T> {
        SharedVec::new()
    }
}

impl<T> Deref for SharedVec<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.inner
    }
}

impl<T> DerefMut for SharedVec<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.inner
    }
}

impl<T: fmt::Debug> fmt::Debug for SharedVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, T> IntoIterator for &'a SharedVec<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_alloc;

    #[test]
    fn test_push_pop_index() {
        let (_arena, alloc) = test_alloc();
        let mut vec = SharedVec::new_in(alloc);
        vec.push(10).unwrap();
        vec.push(20).unwrap();
        vec.push(30).unwrap();

        assert_eq!(vec.len(), 3);
        assert_eq!(vec[1], 20);
        vec[1] = 21;
        assert_eq!(vec[1], 21);
        assert_eq!(vec.pop(), Some(30));
        assert_eq!(vec.len(), 2);
    }

    #[test]
    fn test_from_local_deep_copies() {
        let (_arena, alloc) = test_alloc();
        let local = vec![1u32, 2, 3, 4];
        let shared = SharedVec::from_local_in(&local, alloc).unwrap();
        drop(local);
        assert_eq!(shared.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_from_iter_in() {
        let (_arena, alloc) = test_alloc();
        let shared = SharedVec::from_iter_in((0..5).map(|i| i * i), alloc).unwrap();
        assert_eq!(shared.as_slice(), &[0, 1, 4, 9, 16]);
    }

    #[test]
    fn test_storage_returns_to_arena() {
        let (arena, alloc) = test_alloc();
        let before = arena.available();
        {
            let mut vec = SharedVec::new_in(alloc);
            for i in 0..1000u64 {
                vec.push(i).unwrap();
            }
            assert!(arena.available() < before);
        }
        assert_eq!(arena.available(), before);
    }

    #[test]
    fn test_exhaustion_propagates() {
        let arena = shmalloc_arena::SharedArena::create(4096).unwrap();
        let alloc = SharedAlloc::for_arena(arena.shared());
        let mut vec: SharedVec<u64> = SharedVec::new_in(alloc);
        let mut failed = false;
        for i in 0..10_000 {
            if vec.push(i).is_err() {
                failed = true;
                break;
            }
        }
        assert!(failed, "pushing past arena capacity must fail, not succeed");
    }
}
