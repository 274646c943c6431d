//! Placement of whole objects into the arena.
//!
//! Binding [`SharedAlloc`] into a container type only routes the
//! container's *internal* allocations into shared memory; the container
//! object itself (its control block) still lives wherever the caller put
//! it. For another process to reach the container at all, that header has
//! to be in the arena too. [`Shared::new_in`] performs exactly that step:
//! it allocates the object's own storage from the arena and moves the
//! value in, returning a copyable handle that stays meaningful in every
//! process of the fork family.
//!
//! Nothing ever tears such an object down implicitly: a process exiting
//! runs no destructor for it, since no single process owns it. Teardown is
//! one explicit [`destroy`] call, made by exactly one process, after which
//! the handle dangles everywhere simultaneously.

use std::alloc::Layout;
use std::ptr::NonNull;

use crate::alloc::SharedAlloc;
use crate::error::{Error, Result};

/// A handle to a value whose own storage lives in a shared arena.
///
/// Copyable: hand copies to as many holders (and, via fork, processes) as
/// needed. The handle does not own the value (dropping it is a no-op) and
/// carries the allocator it was placed with so that [`destroy`] can return
/// the storage to the right arena.
pub struct Shared<T: ?Sized> {
    ptr: NonNull<T>,
    alloc: SharedAlloc,
}

impl<T: ?Sized> Clone for Shared<T> {
    fn clone(&self) -> Shared<T> {
        *self
    }
}

impl<T: ?Sized> Copy for Shared<T> {}

impl<T: ?Sized> std::fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared").field("ptr", &self.ptr).finish()
    }
}

impl<T: ?Sized> PartialEq for Shared<T> {
    fn eq(&self, other: &Shared<T>) -> bool {
        std::ptr::addr_eq(self.ptr.as_ptr(), other.ptr.as_ptr())
    }
}

impl<T: ?Sized> Eq for Shared<T> {}

impl<T> Shared<T> {
    /// Places `value` into the arena behind `alloc`.
    ///
    /// # Errors
    ///
    /// [`Error::Exhausted`] when the arena cannot hold the object; `value`
    /// is dropped in that case.
    pub fn new_in(value: T, alloc: SharedAlloc) -> Result<Shared<T>> {
        let layout = Layout::new::<T>();
        let ptr = if layout.size() == 0 {
            NonNull::<T>::dangling()
        } else {
            alloc
                .arena()
                .alloc(layout)
                .ok_or(Error::Exhausted)?
                .cast::<T>()
        };
        unsafe { ptr.as_ptr().write(value) };
        Ok(Shared { ptr, alloc })
    }

    /// Places `value` into the process-global arena.
    pub fn new(value: T) -> Result<Shared<T>> {
        Shared::new_in(value, SharedAlloc::global()?)
    }
}

impl<T> Shared<[T]> {
    /// Places a slice of `len` values produced by `f(index)` into the arena.
    ///
    /// If `f` panics, the values constructed so far are dropped and the
    /// storage is returned to the arena before the panic continues.
    pub fn slice_from_fn_in(
        len: usize,
        mut f: impl FnMut(usize) -> T,
        alloc: SharedAlloc,
    ) -> Result<Shared<[T]>> {
        let layout = Layout::array::<T>(len).map_err(|_| Error::CapacityOverflow)?;
        let data = if layout.size() == 0 {
            NonNull::<T>::dangling()
        } else {
            alloc
                .arena()
                .alloc(layout)
                .ok_or(Error::Exhausted)?
                .cast::<T>()
        };

        struct PartialGuard<T> {
            data: NonNull<T>,
            init: usize,
            layout: Layout,
            alloc: SharedAlloc,
        }
        impl<T> Drop for PartialGuard<T> {
            fn drop(&mut self) {
                unsafe {
                    std::ptr::slice_from_raw_parts_mut(self.data.as_ptr(), self.init)
                        .drop_in_place();
                    if self.layout.size() != 0 {
                        self.alloc.arena().free(self.data.cast());
                    }
                }
            }
        }

        let mut guard = PartialGuard {
            data,
            init: 0,
            layout,
            alloc,
        };
        for i in 0..len {
            unsafe { guard.data.as_ptr().add(i).write(f(i)) };
            guard.init += 1;
        }
        std::mem::forget(guard);

        Ok(Shared {
            ptr: NonNull::slice_from_raw_parts(data, len),
            alloc,
        })
    }

    /// Places a copy of `src` into the arena.
    pub fn slice_from_copy_in(src: &[T], alloc: SharedAlloc) -> Result<Shared<[T]>>
    where
        T: Copy,
    {
        Shared::slice_from_fn_in(src.len(), |i| src[i], alloc)
    }
}

impl<T: ?Sized> Shared<T> {
    /// The raw pointer to the shared value.
    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// The allocator (hence arena) this object was placed with.
    pub fn allocator(&self) -> SharedAlloc {
        self.alloc
    }

    /// Borrows the shared value.
    ///
    /// # Safety
    ///
    /// The object must not have been destroyed, and for the duration of the
    /// borrow no process may mutate it (the arena provides no
    /// synchronization; any required mutual exclusion is the caller's).
    pub unsafe fn as_ref<'a>(&self) -> &'a T {
        unsafe { self.ptr.as_ref() }
    }

    /// Mutably borrows the shared value.
    ///
    /// # Safety
    ///
    /// The object must not have been destroyed, and the caller must
    /// guarantee the borrow is exclusive across *all* processes of the
    /// family for its duration.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn as_mut<'a>(&self) -> &'a mut T {
        unsafe { &mut *self.ptr.as_ptr() }
    }

    /// Reassembles a handle from its raw parts.
    ///
    /// # Safety
    ///
    /// `ptr` must designate a live value placed with `alloc` via this
    /// placement protocol.
    pub unsafe fn from_raw_parts(ptr: NonNull<T>, alloc: SharedAlloc) -> Shared<T> {
        Shared { ptr, alloc }
    }
}

/// Destroys a shared object: runs its destructor in place, then returns its
/// storage to the arena it was placed in.
///
/// This is the only teardown path for objects placed via [`Shared`]; no
/// process exit ever destroys them implicitly. Passing `None` is a no-op,
/// mirroring deletion of a null pointer.
///
/// # Safety
///
/// The handle must designate a live object that no process will touch
/// again: after this call the storage is gone for every process of the
/// family at once, and destroying the same object twice is undefined
/// behavior.
pub unsafe fn destroy<T: ?Sized>(handle: impl Into<Option<Shared<T>>>) {
    let Some(handle) = handle.into() else {
        return;
    };
    let ptr = handle.ptr.as_ptr();
    unsafe {
        let layout = Layout::for_value(handle.ptr.as_ref());
        ptr.drop_in_place();
        if layout.size() != 0 {
            handle.alloc.arena().free(handle.ptr.cast());
        }
    }
}
