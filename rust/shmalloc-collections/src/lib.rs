//! Container types backed by a shared memory arena.
//!
//! Each member of the family is a thin pre-binding of an ordinary,
//! allocator-parameterized container to [`SharedAlloc`]: the container
//! behaves exactly as its conventional counterpart, except that every node
//! and buffer it allocates comes from the shared arena, which is all it
//! takes for forked processes to observe each other's mutations without
//! copying or serialization.
//!
//! Two independent decisions govern where things live:
//!
//! 1. a shared container *type* puts its element storage in the arena;
//! 2. the container *object* (its header) reaches the arena only when
//!    placed there explicitly via [`Shared::new_in`].
//!
//! A container that other processes should reach needs both. The usual
//! flow mirrors the classic staging pattern: build data in process-local
//! containers, convert once via the `from_local_in` constructors, place
//! the result, fork, and hand the [`Shared`] handle around.
//!
//! ```no_run
//! use shmalloc::{Shared, SharedAlloc, destroy};
//! use shmalloc_collections::{SharedMap, SharedString};
//!
//! shmalloc::install_new(1024 * 1024)?;
//! let alloc = SharedAlloc::global()?;
//!
//! let mut staged = std::collections::BTreeMap::new();
//! staged.insert(100, "XMAP".to_string());
//!
//! let map = Shared::new(SharedMap::from_local_with(
//!     &staged,
//!     |k, v| Ok((*k, SharedString::from_str_in(v, alloc)?)),
//!     alloc,
//! )?)?;
//!
//! // fork(); both processes mutate and read through `map` ...
//! unsafe {
//!     map.as_mut().insert(1, SharedString::from_local("A")?)?;
//!     destroy(map);
//! }
//! # Ok::<(), shmalloc::Error>(())
//! ```
//!
//! Nothing here synchronizes concurrent mutation: as with the rest of the
//! crate family, two processes mutating one container must be serialized
//! by the caller (semaphores, futexes in the arena, ...). Concurrent
//! *allocation* is safe; it is the containers' contents that need care.

mod deque;
mod list;
mod map;
mod multimap;
mod multiset;
mod set;
mod stack;
mod string;
mod vec;

pub use shmalloc::{Error, Result, Shared, SharedAlloc, SharedBox, destroy};

pub use self::deque::SharedDeque;
pub use self::list::SharedList;
pub use self::map::SharedMap;
pub use self::multimap::SharedMultimap;
pub use self::multiset::SharedMultiset;
pub use self::set::SharedSet;
pub use self::stack::{Sequence, SharedStack};
pub use self::string::SharedString;

#[cfg(test)]
pub(crate) mod tests {
    use shmalloc::SharedAlloc;
    use shmalloc_arena::SharedArena;

    /// A fresh arena per test, with an adapter bound to it.
    ///
    /// The arena must stay alive for the duration of the test; containers
    /// built on the adapter must be dropped before it.
    pub(crate) fn test_alloc() -> (SharedArena, SharedAlloc) {
        let arena = SharedArena::create(1024 * 1024).expect("create test arena");
        let alloc = SharedAlloc::for_arena(arena.shared());
        (arena, alloc)
    }
}
