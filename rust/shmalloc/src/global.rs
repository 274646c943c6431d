use std::sync::OnceLock;

use log::debug;
use shmalloc_arena::SharedArena;

use crate::error::{Error, Result};

static GLOBAL: OnceLock<SharedArena> = OnceLock::new();

/// Installs `arena` as the process-global arena.
///
/// The single-arena deployment: install once at startup, before forking,
/// and every allocator, placement and container constructed without an
/// explicit arena binds to it. Forked children inherit both the mapping
/// and the installation.
///
/// The installed arena is never unmapped by a handle drop; the kernel
/// reclaims the mapping when the last process of the family exits.
///
/// # Errors
///
/// [`Error::AlreadyInstalled`] when an arena was installed earlier; the
/// passed arena is dropped in that case (unmapping it if this process
/// created it).
pub fn install(arena: SharedArena) -> Result<&'static SharedArena> {
    let mut installed = false;
    let slot = GLOBAL.get_or_init(|| {
        installed = true;
        arena
    });
    if installed {
        debug!("installed process-global arena ({} bytes)", slot.capacity());
        Ok(slot)
    } else {
        Err(Error::AlreadyInstalled)
    }
}

/// Creates an arena of at least `size` usable bytes and installs it.
///
/// # Errors
///
/// [`Error::ArenaCreate`] when the mapping fails (the bootstrap failure
/// path, typically fatal to startup), or [`Error::AlreadyInstalled`].
pub fn install_new(size: usize) -> Result<&'static SharedArena> {
    let arena = SharedArena::create(size).map_err(Error::arena_create)?;
    install(arena)
}

/// Returns the process-global arena.
///
/// # Errors
///
/// [`Error::NoArena`] when nothing has been installed.
pub fn global() -> Result<&'static SharedArena> {
    GLOBAL.get().ok_or(Error::NoArena)
}

/// Returns the process-global arena if one has been installed.
pub fn try_global() -> Option<&'static SharedArena> {
    GLOBAL.get()
}
