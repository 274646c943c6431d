//! Shared memory arena for cooperating (forked) processes.
//!
//! A [`SharedArena`] owns a single anonymous, shared memory mapping together
//! with a small heap that lives *inside* that mapping: the free list, the
//! capacity accounting and the lock that guards them are all stored in the
//! mapped region itself. A process that creates an arena and then forks
//! shares both the arena bytes and the allocator state with every child, so
//! any process in the family can allocate, free and dereference blocks, and
//! every other process observes the result without copying.
//!
//! The arena hands out raw blocks; it knows nothing about the objects placed
//! in them. Higher layers bind it into an allocator and into container types.
//!
//! # Sharing model
//!
//! The mapping is `MAP_SHARED | MAP_ANON`: it has no name in the filesystem
//! and is reachable only through fork inheritance. Processes that were not
//! forked from the creator cannot attach to it. On non-unix targets a
//! process-local emulation is provided so the crate remains usable for
//! single-process tests, without any cross-process sharing.
//!
//! # Concurrency
//!
//! `alloc` and `free` are internally serialized by a spinlock stored in the
//! segment header, so concurrent allocation from several processes is safe.
//! The arena does not synchronize anything else; two processes mutating the
//! same object inside the arena race unless the caller provides its own
//! mutual exclusion.

mod arena;
mod heap;

#[cfg_attr(unix, path = "mmap_unix.rs")]
#[cfg_attr(not(unix), path = "mmap_fallback.rs")]
mod mmap;

pub use arena::{ArenaOptions, ArenaRef, SharedArena};
