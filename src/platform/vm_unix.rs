//! POSIX backing for the VM shim: `mmap`/`mprotect`/`madvise`/`munmap`.

pub(super) fn reserve(size: u64) -> *mut u8 {
    unsafe {
        let ptr = libc::mmap(
            std::ptr::null_mut(),
            size as libc::size_t,
            libc::PROT_NONE,
            libc::MAP_PRIVATE | libc::MAP_ANON,
            -1,
            0,
        );
        if ptr == libc::MAP_FAILED {
            std::ptr::null_mut()
        } else {
            ptr.cast()
        }
    }
}

pub(super) fn commit(ptr: *mut u8, size: u64) -> bool {
    unsafe { libc::mprotect(ptr.cast(), size as libc::size_t, libc::PROT_READ | libc::PROT_WRITE) == 0 }
}

pub(super) fn decommit(ptr: *mut u8, size: u64) {
    unsafe {
        libc::madvise(ptr.cast(), size as libc::size_t, libc::MADV_DONTNEED);
        libc::mprotect(ptr.cast(), size as libc::size_t, libc::PROT_NONE);
    }
}

pub(super) fn release(ptr: *mut u8, size: u64) {
    unsafe {
        libc::munmap(ptr.cast(), size as libc::size_t);
    }
}

pub(super) fn query_page_size() -> u64 {
    unsafe { libc::sysconf(libc::_SC_PAGESIZE).max(4096) as u64 }
}

pub(super) fn query_large_page_size() -> u64 {
    if cfg!(target_os = "macos") || cfg!(target_os = "linux") {
        2 * 1024 * 1024
    } else {
        query_page_size()
    }
}
