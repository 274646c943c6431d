use std::alloc::{Layout, alloc_zeroed, dealloc};

/// Maps an anonymous region (emulated).
///
/// There is no fork-style sharing on this target; the "mapping" is ordinary
/// process-local memory, which keeps the arena usable for single-process
/// tests. `populate` is accepted for interface compatibility and ignored.
pub fn map_shared(size: usize, populate: bool) -> std::io::Result<(*mut std::ffi::c_void, usize)> {
    let _ = populate;
    let page_size = get_page_size();
    assert!(page_size.is_power_of_two());
    let capacity = (size.max(1) + page_size - 1) & !(page_size - 1);

    let layout = Layout::from_size_align(capacity, page_size)
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "Invalid layout"))?;

    let ptr = unsafe { alloc_zeroed(layout) };
    if ptr.is_null() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::OutOfMemory,
            "Failed to allocate memory",
        ));
    }

    Ok((ptr as *mut std::ffi::c_void, capacity))
}

/// Unmaps a region previously returned by [`map_shared`] (emulated).
///
/// # Safety
///
/// `ptr` and `size` must be exactly the values returned by [`map_shared`]
/// and the region must not have been freed already.
pub unsafe fn unmap(ptr: *mut std::ffi::c_void, size: usize) -> std::io::Result<()> {
    let page_size = get_page_size();
    assert!(size.is_multiple_of(page_size));

    let layout = Layout::from_size_align(size, page_size)
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "Invalid layout"))?;

    unsafe {
        dealloc(ptr as *mut u8, layout);
    }
    Ok(())
}

/// Returns the "standard page" size in bytes.
pub fn get_page_size() -> usize {
    4 * 1024
}

/// Returns the id of the calling process.
pub fn current_pid() -> u32 {
    std::process::id()
}
