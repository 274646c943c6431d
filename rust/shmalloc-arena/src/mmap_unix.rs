use std::sync::OnceLock;

/// Maps an anonymous region shared across `fork`.
///
/// The region is created with `MAP_SHARED | MAP_ANON`, which is the property
/// the whole crate rests on: child processes forked after this call see the
/// same physical pages at the same address, so writes made by any process in
/// the family are visible to all of them.
///
/// # Arguments
///
/// * `size` - The number of bytes to map. The actual mapping is rounded up
///   to the nearest page boundary.
/// * `populate` - On Linux, pre-fault the pages (`MAP_POPULATE`) so the
///   first allocations do not take page faults. Ignored elsewhere.
///
/// # Returns
///
/// `Ok((ptr, capacity))` with a pointer to the mapping and its page-rounded
/// length, or the OS error if the mapping fails.
pub fn map_shared(size: usize, populate: bool) -> std::io::Result<(*mut std::ffi::c_void, usize)> {
    let page_size = get_page_size();
    assert!(page_size.is_power_of_two());
    let capacity = (size.max(1) + page_size - 1) & !(page_size - 1);

    #[cfg(target_os = "linux")]
    let flags = if populate {
        libc::MAP_SHARED | libc::MAP_ANON | libc::MAP_POPULATE
    } else {
        libc::MAP_SHARED | libc::MAP_ANON
    };
    #[cfg(not(target_os = "linux"))]
    let flags = {
        let _ = populate;
        libc::MAP_SHARED | libc::MAP_ANON
    };

    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            capacity,
            libc::PROT_READ | libc::PROT_WRITE,
            flags,
            -1,
            0,
        )
    };
    if ptr.is_null() || ptr == libc::MAP_FAILED {
        return Err(std::io::Error::last_os_error());
    }
    Ok((ptr, capacity))
}

/// Unmaps a region previously returned by [`map_shared`].
///
/// # Safety
///
/// `ptr` and `size` must be exactly the values returned by [`map_shared`],
/// the region must not have been unmapped already, and no live reference
/// into the region may exist in the calling process afterwards. Other
/// processes holding the mapping are unaffected; their pages stay valid
/// until they unmap or exit.
pub unsafe fn unmap(ptr: *mut std::ffi::c_void, size: usize) -> std::io::Result<()> {
    let res = unsafe { libc::munmap(ptr, size) };
    if res != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// Returns the size of a regular memory page on the current system.
pub fn get_page_size() -> usize {
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
    *PAGE_SIZE.get_or_init(|| {
        let res = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if res > 0 { res as usize } else { 4096 }
    })
}

/// Returns the id of the calling process.
pub fn current_pid() -> u32 {
    (unsafe { libc::getpid() }) as u32
}
