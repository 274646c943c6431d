use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::alloc::SharedAlloc;
use crate::error::Result;
use crate::place::{Shared, destroy};

/// An owning pointer to a value placed in the arena.
///
/// Where [`Shared`] is a bare handle with manual teardown, `SharedBox`
/// adds single ownership: the process holding it destroys the value when
/// the box goes out of scope. Useful when one process (typically the
/// creator) is the designated owner of a shared object and wants scoped
/// cleanup; [`into_shared`] opts back out into manual management.
///
/// Ownership is strict: the box cannot be cloned, and handing copies of
/// the underlying handle to other processes while keeping the box means
/// those processes must not outlive the owner's scope.
///
/// [`into_shared`]: SharedBox::into_shared
pub struct SharedBox<T> {
    inner: Shared<T>,
}

impl<T> SharedBox<T> {
    /// Places `value` into the arena behind `alloc` and owns it.
    pub fn new_in(value: T, alloc: SharedAlloc) -> Result<SharedBox<T>> {
        Ok(SharedBox {
            inner: Shared::new_in(value, alloc)?,
        })
    }

    /// Places `value` into the process-global arena and owns it.
    pub fn new(value: T) -> Result<SharedBox<T>> {
        Ok(SharedBox {
            inner: Shared::new(value)?,
        })
    }

    /// Takes ownership of an already-placed value.
    ///
    /// # Safety
    ///
    /// `handle` must designate a live placed object that nothing else will
    /// destroy.
    pub unsafe fn from_shared(handle: Shared<T>) -> SharedBox<T> {
        SharedBox { inner: handle }
    }

    /// Releases ownership, returning the bare handle without destroying
    /// the value.
    pub fn into_shared(self) -> Shared<T> {
        let inner = self.inner;
        std::mem::forget(self);
        inner
    }

    /// A copy of the underlying handle, for sharing with other processes.
    ///
    /// The box still owns the value; every copy dangles once the box is
    /// dropped.
    pub fn handle(&self) -> Shared<T> {
        self.inner
    }
}

impl<T> Deref for SharedBox<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // The box is the unique owner in this process; cross-process
        // readers are the caller's synchronization problem, as everywhere
        // in this crate.
        unsafe { self.inner.as_ref() }
    }
}

impl<T> DerefMut for SharedBox<T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { self.inner.as_mut() }
    }
}

impl<T: fmt::Debug> fmt::Debug for SharedBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        T::fmt(self, f)
    }
}

impl<T> Drop for SharedBox<T> {
    fn drop(&mut self) {
        unsafe { destroy(self.inner) };
    }
}
