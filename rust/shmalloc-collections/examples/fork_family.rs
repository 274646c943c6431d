//! A parent stages data locally, migrates it into the shared arena, forks,
//! and both processes read and mutate the same containers.
//!
//! Synchronized access is deliberately out of scope for the library; this
//! demo serializes the two processes with a handshake word placed in the
//! arena, standing in for whatever semaphore discipline a real deployment
//! would use.

#[cfg(unix)]
fn main() {
    use std::sync::atomic::{AtomicU32, Ordering};

    use shmalloc::{Shared, SharedAlloc, destroy};
    use shmalloc_collections::{SharedMap, SharedString};

    let arena = shmalloc::install_new(4 * 1024 * 1024).expect("create shared arena");
    let alloc = SharedAlloc::global().expect("arena installed");

    // Stage locally, copy once into the arena.
    let mut staged = std::collections::BTreeMap::new();
    staged.insert(100, "XMAP".to_string());
    let map = Shared::new(
        SharedMap::from_local_with(
            &staged,
            |k, v| Ok((*k, SharedString::from_str_in(v, alloc)?)),
            alloc,
        )
        .expect("migrate staged map"),
    )
    .expect("place map header");

    let turn = Shared::new(AtomicU32::new(0)).expect("place handshake");

    let pid = unsafe { libc::fork() };
    assert!(pid >= 0, "fork failed");

    if pid == 0 {
        // Child: wait for the parent's inserts, then answer.
        unsafe {
            while turn.as_ref().load(Ordering::Acquire) != 1 {
                std::hint::spin_loop();
            }
            for (key, value) in map.as_ref().iter() {
                println!("CHILD: MAP: {key} -> {value}");
            }
            map.as_mut().remove(&1);
            turn.as_ref().store(2, Ordering::Release);
            libc::_exit(0);
        }
    }

    unsafe {
        for (key, value) in [(1, "A"), (2, "B"), (3, "C")] {
            map.as_mut()
                .insert(key, SharedString::from_str_in(value, alloc).expect("string"))
                .expect("insert");
        }
        turn.as_ref().store(1, Ordering::Release);

        while turn.as_ref().load(Ordering::Acquire) != 2 {
            std::hint::spin_loop();
        }
        let mut status = 0;
        libc::waitpid(pid, &mut status, 0);

        for (key, value) in map.as_ref().iter() {
            println!("PARENT: MAP: {key} -> {value}");
        }

        destroy(map);
        destroy(turn);
    }
    println!("PARENT: arena available: {} bytes", arena.available());
}

#[cfg(not(unix))]
fn main() {
    eprintln!("fork-based sharing requires a unix target");
}
