//! Shared-memory allocation for cooperating (forked) processes.
//!
//! This crate is the bridge between a [`SharedArena`] (a fork-inheritable
//! shared memory mapping with its own internal heap) and ordinary
//! container code:
//!
//! - [`SharedAlloc`] satisfies the standard allocator contract
//!   ([`rune_alloc::alloc::Allocator`]) while delegating every allocation
//!   to an arena. Any collection parameterized by that contract becomes a
//!   shared collection simply by being bound to it.
//! - [`Shared`] and [`destroy`] form the placement protocol: they put an
//!   object's *own* storage (not just its elements) into the arena and
//!   tear it down exactly once, from whichever process the caller
//!   designates. [`SharedBox`] layers scoped single ownership on top.
//! - [`install`] / [`install_new`] bind one arena process-wide for the
//!   common single-arena deployment; explicit [`ArenaRef`] bindings remain
//!   available everywhere, which keeps multiple arenas usable side by side
//!   in tests.
//!
//! What this crate deliberately does not do: synchronize concurrent
//! mutation of shared objects (callers bring their own locks), garbage
//! collect or refcount shared objects, or resize arenas.
//!
//! ```no_run
//! use shmalloc::{Shared, SharedAlloc, destroy};
//!
//! shmalloc::install_new(1024 * 1024)?;
//!
//! let counter = Shared::new(0u64)?;
//! // fork(): both processes now reach the same counter through `counter`.
//! unsafe {
//!     *counter.as_mut() += 1;
//!     destroy(counter);
//! }
//! # Ok::<(), shmalloc::Error>(())
//! ```

mod alloc;
mod boxed;
mod error;
mod global;
mod place;

pub use rune_alloc;
pub use shmalloc_arena::{ArenaOptions, ArenaRef, SharedArena};

pub use self::alloc::SharedAlloc;
pub use self::boxed::SharedBox;
pub use self::error::{Error, Result};
pub use self::global::{global, install, install_new, try_global};
pub use self::place::{Shared, destroy};
