//! Cross-process tests: a parent and a forked child mutate the same shared
//! containers and observe each other's writes through nothing but the
//! inherited mapping.
//!
//! Parent and child take turns through a handshake word placed in the
//! arena itself; the child reports every assertion through its exit
//! status.

#![cfg(unix)]

use std::sync::atomic::{AtomicU32, Ordering};

use shmalloc::{Shared, SharedAlloc, destroy};
use shmalloc_arena::SharedArena;
use shmalloc_collections::{SharedDeque, SharedMap, SharedStack, SharedString};

/// Spin until the handshake word reaches `value`.
fn wait_for(flag: &AtomicU32, value: u32) {
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(30);
    while flag.load(Ordering::Acquire) != value {
        std::hint::spin_loop();
        std::thread::yield_now();
        assert!(
            std::time::Instant::now() < deadline,
            "peer never advanced the handshake"
        );
    }
}

fn fork() -> libc::pid_t {
    let pid = unsafe { libc::fork() };
    assert!(pid >= 0, "fork failed");
    pid
}

fn child_exit(ok: bool) -> ! {
    unsafe { libc::_exit(if ok { 0 } else { 1 }) }
}

fn assert_child_succeeded(pid: libc::pid_t) {
    let mut status = 0;
    let waited = unsafe { libc::waitpid(pid, &mut status, 0) };
    assert_eq!(waited, pid);
    assert!(
        libc::WIFEXITED(status) && libc::WEXITSTATUS(status) == 0,
        "child reported failure (status {status})"
    );
}

#[test]
fn parent_mutations_visible_in_child_and_back() {
    let arena = SharedArena::create(4 * 1024 * 1024).expect("create arena");
    let alloc = SharedAlloc::for_arena(arena.shared());

    let map = Shared::new_in(SharedMap::<i32, SharedString>::new_in(alloc), alloc).unwrap();
    let flag = Shared::new_in(AtomicU32::new(0), alloc).unwrap();

    unsafe {
        for (key, value) in [(1, "A"), (2, "B"), (3, "C")] {
            map.as_mut()
                .insert(key, SharedString::from_str_in(value, alloc).unwrap())
                .unwrap();
        }
    }

    let pid = fork();
    if pid == 0 {
        // Child: pre-fork entries are visible immediately.
        let ok =
            unsafe { map.as_ref().len() == 3 && map.as_ref().get(&2).is_some_and(|v| v == "B") };
        if !ok {
            child_exit(false);
        }

        // Wait for the entry the parent inserts *after* the fork.
        unsafe { wait_for(flag.as_ref(), 1) };
        let ok = unsafe { map.as_ref().get(&4).is_some_and(|v| v == "D") };
        if !ok {
            child_exit(false);
        }

        // Mutate in the other direction.
        unsafe {
            map.as_mut().remove(&1);
            flag.as_ref().store(2, Ordering::Release);
        }
        child_exit(true);
    }

    // Parent: insert a fourth entry, then let the child look.
    unsafe {
        map.as_mut()
            .insert(4, SharedString::from_str_in("D", alloc).unwrap())
            .unwrap();
        flag.as_ref().store(1, Ordering::Release);
    }

    // The child's erase must become visible here, including the freeing of
    // the erased entry's nodes, which happened in the child.
    unsafe { wait_for(flag.as_ref(), 2) };
    assert_child_succeeded(pid);
    unsafe {
        assert!(!map.as_ref().contains_key(&1), "child's erase not visible");
        assert_eq!(map.as_ref().len(), 3);
        destroy(map);
        destroy(flag);
    }
    assert_eq!(arena.available(), arena.capacity());
}

#[test]
fn stack_pushed_by_parent_pops_lifo_in_child() {
    let arena = SharedArena::create(1024 * 1024).expect("create arena");
    let alloc = SharedAlloc::for_arena(arena.shared());

    let stack = Shared::new_in(
        SharedStack::<SharedString>::from_sequence(SharedDeque::new_in(alloc)),
        alloc,
    )
    .unwrap();

    unsafe {
        for s in ["a", "b", "c"] {
            stack
                .as_mut()
                .push(SharedString::from_str_in(s, alloc).unwrap())
                .unwrap();
        }
    }

    let pid = fork();
    if pid == 0 {
        let ok = unsafe {
            stack.as_mut().pop().is_some_and(|s| s == "c")
                && stack.as_mut().pop().is_some_and(|s| s == "b")
                && stack.as_mut().pop().is_some_and(|s| s == "a")
                && stack.as_mut().pop().is_none()
        };
        child_exit(ok);
    }
    assert_child_succeeded(pid);

    // The child consumed the stack in the shared segment.
    unsafe {
        assert!(stack.as_ref().is_empty());
        destroy(stack);
    }
    assert_eq!(arena.available(), arena.capacity());
}

#[test]
fn allocations_by_child_are_freed_by_parent() {
    let arena = SharedArena::create(1024 * 1024).expect("create arena");
    let alloc = SharedAlloc::for_arena(arena.shared());

    let slot = Shared::new_in(Option::<Shared<SharedString>>::None, alloc).unwrap();
    let flag = Shared::new_in(AtomicU32::new(0), alloc).unwrap();

    let pid = fork();
    if pid == 0 {
        // Child allocates a string and publishes its handle.
        let ok = (|| {
            let s = SharedString::from_str_in("made in child", alloc).ok()?;
            let placed = Shared::new_in(s, alloc).ok()?;
            unsafe {
                *slot.as_mut() = Some(placed);
                flag.as_ref().store(1, Ordering::Release);
            }
            Some(())
        })()
        .is_some();
        child_exit(ok);
    }

    unsafe { wait_for(flag.as_ref(), 1) };
    assert_child_succeeded(pid);

    // The parent destroys an object another process created: ownership of
    // shared objects is not tied to any process.
    unsafe {
        let placed = slot.as_mut().take().expect("child published a handle");
        assert_eq!(*placed.as_ref(), "made in child");
        destroy(placed);
        destroy(slot);
        destroy(flag);
    }
    assert_eq!(arena.available(), arena.capacity());
}
