//! Windows backing for the VM shim: `VirtualAlloc`/`VirtualFree`.

use windows_sys::Win32::System::Memory::{
    MEM_COMMIT, MEM_DECOMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_NOACCESS, PAGE_READWRITE, VirtualAlloc,
    VirtualFree,
};
use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

pub(super) fn reserve(size: u64) -> *mut u8 {
    unsafe { VirtualAlloc(std::ptr::null(), size as usize, MEM_RESERVE, PAGE_NOACCESS).cast() }
}

pub(super) fn commit(ptr: *mut u8, size: u64) -> bool {
    unsafe { !VirtualAlloc(ptr.cast(), size as usize, MEM_COMMIT, PAGE_READWRITE).is_null() }
}

pub(super) fn decommit(ptr: *mut u8, size: u64) {
    unsafe {
        VirtualFree(ptr.cast(), size as usize, MEM_DECOMMIT);
    }
}

pub(super) fn release(ptr: *mut u8, _size: u64) {
    unsafe {
        VirtualFree(ptr.cast(), 0, MEM_RELEASE);
    }
}

pub(super) fn query_page_size() -> u64 {
    unsafe {
        let mut info: SYSTEM_INFO = std::mem::zeroed();
        GetSystemInfo(&mut info);
        info.dwPageSize.max(4096) as u64
    }
}

pub(super) fn query_large_page_size() -> u64 {
    // Windows large-page allocation requires SeLockMemoryPrivilege; we don't
    // attempt to acquire it here, so fall back to the base page size and let
    // `vm::large_page_size` select it via the not-a-multiple rule.
    0
}
