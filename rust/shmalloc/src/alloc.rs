use std::alloc::Layout;
use std::ptr::NonNull;

use rune_alloc::alloc::{AllocError, Allocator};
use shmalloc_arena::ArenaRef;

use crate::global;

/// The allocator adapter: routes every allocation to one shared arena.
///
/// `SharedAlloc` is a copyable value carrying nothing but the identity of
/// the arena it is bound to; all allocator state lives in the arena's
/// shared segment. Binding it into a container type redirects every node
/// and buffer allocation that container performs into shared memory, which
/// is the invariant cross-process visibility rests on.
///
/// One adapter serves every element and node type of a container: the
/// [`Allocator`] contract is expressed in terms of [`Layout`], so the
/// per-type rebinding a typed allocator interface would need does not
/// arise here.
///
/// # Equality
///
/// Two adapters compare equal exactly when they are bound to the same
/// arena, whatever types they have been allocating for. Containers may
/// therefore treat adapters of one arena as fully interchangeable, while
/// adapters of distinct arenas (which can coexist, notably in tests) are
/// correctly kept apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedAlloc {
    arena: ArenaRef,
}

impl SharedAlloc {
    /// Binds an adapter to an explicit arena.
    pub fn for_arena(arena: ArenaRef) -> SharedAlloc {
        SharedAlloc { arena }
    }

    /// Binds an adapter to the process-global arena.
    ///
    /// # Errors
    ///
    /// [`Error::NoArena`] when no arena has been installed.
    ///
    /// [`Error::NoArena`]: crate::Error::NoArena
    pub fn global() -> crate::Result<SharedAlloc> {
        Ok(SharedAlloc {
            arena: global::global()?.shared(),
        })
    }

    /// The arena this adapter is bound to.
    pub fn arena(&self) -> ArenaRef {
        self.arena
    }

    /// Free bytes currently available in the bound arena.
    pub fn available(&self) -> usize {
        self.arena.available()
    }

    /// Upper bound on how many `T` values could still be allocated.
    ///
    /// A snapshot, not a promise: other processes of the family may consume
    /// capacity at any time.
    pub fn max_size_for<T>(&self) -> usize {
        self.arena.available() / size_of::<T>().max(1)
    }
}

/// Binds to the process-global arena.
///
/// # Panics
///
/// Panics when no arena has been installed; fallible callers should use
/// [`SharedAlloc::global`] instead. This impl exists so container types can
/// offer the conventional no-argument constructor.
impl Default for SharedAlloc {
    fn default() -> SharedAlloc {
        SharedAlloc::global().expect("no shared arena installed; call shmalloc::install first")
    }
}

unsafe impl Allocator for SharedAlloc {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        if layout.size() == 0 {
            // Zero-size requests never touch the arena; a well-aligned
            // dangling pointer satisfies the allocator contract.
            let dangling = unsafe { NonNull::new_unchecked(layout.align() as *mut u8) };
            return Ok(NonNull::slice_from_raw_parts(dangling, 0));
        }
        self.arena.alloc(layout).ok_or(AllocError)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }
        unsafe { self.arena.free(ptr) }
    }
}
