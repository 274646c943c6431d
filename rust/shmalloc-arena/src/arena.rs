use std::alloc::Layout;
use std::ptr::NonNull;

use log::debug;

use crate::heap::{self, ArenaHeader};
use crate::mmap;

/// Configuration for creating a [`SharedArena`].
///
/// ```no_run
/// use shmalloc_arena::ArenaOptions;
///
/// let arena = ArenaOptions::new(1024 * 1024).populate(true).create()?;
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ArenaOptions {
    size: usize,
    populate: bool,
}

impl ArenaOptions {
    /// Starts building an arena with at least `size` usable bytes.
    pub fn new(size: usize) -> ArenaOptions {
        ArenaOptions {
            size,
            populate: false,
        }
    }

    /// Pre-faults the mapping so the first allocations do not take page
    /// faults. Only effective on Linux.
    pub fn populate(mut self, populate: bool) -> ArenaOptions {
        self.populate = populate;
        self
    }

    /// Maps and formats the arena.
    ///
    /// # Errors
    ///
    /// Returns the OS error when the mapping cannot be established, for
    /// example when system shared-memory limits are exceeded. Not
    /// recoverable by retrying without resolving the underlying shortage.
    pub fn create(self) -> std::io::Result<SharedArena> {
        let (ptr, capacity) = mmap::map_shared(self.size.saturating_add(256), self.populate)?;
        let base = ptr as *mut u8;
        unsafe {
            heap::format(base, capacity, mmap::current_pid());
        }
        debug!("created shared arena: {capacity} bytes at {base:p}");
        Ok(SharedArena {
            header: unsafe { NonNull::new_unchecked(base as *mut ArenaHeader) },
        })
    }
}

/// A process-local handle to one shared memory arena.
///
/// The handle itself is an ordinary value; the arena it designates is the
/// mapping, which forked children inherit. A child that was forked while
/// the handle existed holds a bitwise copy of it that is just as valid as
/// the parent's, because the mapping occupies the same address range in
/// both processes.
///
/// # Teardown
///
/// Exactly one process must tear the arena down, after every object inside
/// it has been destroyed. Dropping the handle unmaps the arena only in the
/// process that created it; in forked children the drop is a no-op, so a
/// child exiting normally never pulls the mapping out from under its
/// siblings. [`destroy`] unmaps unconditionally for callers that manage
/// teardown themselves.
///
/// # Lifetime discipline
///
/// [`ArenaRef`] tokens and the blocks handed out by [`alloc`] are raw
/// capabilities: they must not outlive the mapping. Keeping the
/// `SharedArena` alive for the lifetime of everything allocated from it
/// (or installing it process-wide and never unmapping) is the caller's
/// responsibility.
///
/// [`destroy`]: SharedArena::destroy
/// [`alloc`]: SharedArena::alloc
#[derive(Debug)]
pub struct SharedArena {
    header: NonNull<ArenaHeader>,
}

// The header is only ever mutated through atomics or under the in-segment
// lock, so handles may be used from any thread.
unsafe impl Send for SharedArena {}
unsafe impl Sync for SharedArena {}

impl SharedArena {
    /// Maps and formats an arena with at least `size` usable bytes.
    ///
    /// Shorthand for [`ArenaOptions::new(size).create()`](ArenaOptions).
    pub fn create(size: usize) -> std::io::Result<SharedArena> {
        ArenaOptions::new(size).create()
    }

    fn header(&self) -> &ArenaHeader {
        unsafe { self.header.as_ref() }
    }

    /// Total bytes managed by the arena heap.
    pub fn capacity(&self) -> usize {
        self.header().capacity()
    }

    /// Free bytes currently available, bookkeeping overhead included.
    ///
    /// An upper bound, not a promise: other processes of the family may
    /// allocate between this call and a subsequent [`alloc`].
    ///
    /// [`alloc`]: SharedArena::alloc
    pub fn available(&self) -> usize {
        self.header().available()
    }

    /// Allocates a block satisfying `layout`.
    ///
    /// Returns `None` when the arena cannot satisfy the request. The arena
    /// never retries internally; freeing other blocks and calling again is
    /// the caller's decision.
    pub fn alloc(&self, layout: Layout) -> Option<NonNull<[u8]>> {
        self.header().alloc(layout)
    }

    /// Returns a block to the arena.
    ///
    /// The block size is recorded in the segment, so no layout is needed.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by [`alloc`] on this arena (from any
    /// process of the family) and not freed since.
    ///
    /// [`alloc`]: SharedArena::alloc
    pub unsafe fn free(&self, ptr: NonNull<u8>) {
        unsafe { self.header().free(ptr) }
    }

    /// Returns the capability token through which allocators address this
    /// arena.
    pub fn shared(&self) -> ArenaRef {
        ArenaRef {
            header: self.header,
        }
    }

    /// Whether the calling process is the one that created the arena.
    pub fn is_creator(&self) -> bool {
        self.header().creator_pid() == mmap::current_pid()
    }

    /// Unmaps the arena now, regardless of which process calls.
    ///
    /// Every object inside the arena must already have been destroyed, and
    /// no other process of the family may touch the arena afterwards.
    pub fn destroy(self) {
        let header = self.header;
        std::mem::forget(self);
        unsafe { unmap_segment(header) };
    }
}

impl Drop for SharedArena {
    fn drop(&mut self) {
        // Children drop their inherited handles without unmapping; only the
        // creator tears the mapping down (and the kernel reclaims it anyway
        // when the last process of the family exits).
        if self.is_creator() {
            unsafe { unmap_segment(self.header) };
        }
    }
}

unsafe fn unmap_segment(header: NonNull<ArenaHeader>) {
    let map_len = unsafe { header.as_ref().map_len() };
    debug!("destroying shared arena at {:p} ({map_len} bytes)", header);
    if let Err(err) = unsafe { mmap::unmap(header.as_ptr() as *mut _, map_len) } {
        debug!("failed to unmap arena: {err}");
    }
}

/// A `Copy` capability token addressing one arena.
///
/// This is what allocator values embed: it stays valid in every process of
/// the fork family because the mapping lives at the same address
/// everywhere. Two tokens compare equal exactly when they address the same
/// arena.
///
/// A token must not be used after the arena it addresses has been
/// unmapped.
#[derive(Debug, Clone, Copy)]
pub struct ArenaRef {
    header: NonNull<ArenaHeader>,
}

unsafe impl Send for ArenaRef {}
unsafe impl Sync for ArenaRef {}

impl PartialEq for ArenaRef {
    fn eq(&self, other: &ArenaRef) -> bool {
        self.header == other.header
    }
}

impl Eq for ArenaRef {}

impl ArenaRef {
    fn header(&self) -> &ArenaHeader {
        let header = unsafe { self.header.as_ref() };
        header.check_magic();
        header
    }

    /// Total bytes managed by the arena heap.
    pub fn capacity(&self) -> usize {
        self.header().capacity()
    }

    /// Free bytes currently available. See [`SharedArena::available`].
    pub fn available(&self) -> usize {
        self.header().available()
    }

    /// Allocates a block satisfying `layout`. See [`SharedArena::alloc`].
    pub fn alloc(&self, layout: Layout) -> Option<NonNull<[u8]>> {
        self.header().alloc(layout)
    }

    /// Returns a block to the arena.
    ///
    /// # Safety
    ///
    /// Same contract as [`SharedArena::free`].
    pub unsafe fn free(&self, ptr: NonNull<u8>) {
        unsafe { self.header().free(ptr) }
    }
}
