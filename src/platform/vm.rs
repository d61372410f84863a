//! Reserve/commit/decommit/release virtual pages (spec §6.1).
//!
//! The actual syscalls are in `vm_unix.rs` / `vm_windows.rs`; this module
//! only adds the page-size caching and the large-page fallback rule.

use super::vm_os;
use once_cell::sync::OnceCell;

static PAGE_SIZE: OnceCell<u64> = OnceCell::new();
static LARGE_PAGE_SIZE: OnceCell<u64> = OnceCell::new();

/// Reserve `size` bytes of address space with no physical backing.
/// Returns null on failure.
pub fn mem_reserve(size: u64) -> *mut u8 {
    if size == 0 {
        return std::ptr::null_mut();
    }
    let ptr = vm_os::reserve(size);
    if ptr.is_null() {
        log::error!("mem_reserve: failed to reserve {size} bytes");
    }
    ptr
}

/// Commit `size` bytes starting at `ptr`, which must lie within a prior
/// reservation. `ptr`/`size` should already be page-aligned by the caller.
pub fn mem_commit(ptr: *mut u8, size: u64) -> bool {
    if ptr.is_null() || size == 0 {
        return false;
    }
    let ok = vm_os::commit(ptr, size);
    if !ok {
        log::error!("mem_commit: failed to commit {size} bytes at {ptr:p}");
    }
    ok
}

/// Decommit `size` bytes starting at `ptr`, returning the physical pages to
/// the OS while keeping the address range reserved.
pub fn mem_decommit(ptr: *mut u8, size: u64) {
    if ptr.is_null() || size == 0 {
        return;
    }
    vm_os::decommit(ptr, size);
}

/// Release a reservation made by `mem_reserve`. `size` must match the
/// original reservation size.
pub fn mem_release(ptr: *mut u8, size: u64) {
    if ptr.is_null() || size == 0 {
        return;
    }
    vm_os::release(ptr, size);
}

/// The OS base page size, queried once and cached.
pub fn page_size() -> u64 {
    *PAGE_SIZE.get_or_init(vm_os::query_page_size)
}

/// The large/huge page size. 2 MiB on Apple Silicon/Intel macOS; platform
/// native otherwise. Falls back to the base page size if the platform's
/// large page size isn't a multiple of the base page size.
pub fn large_page_size() -> u64 {
    *LARGE_PAGE_SIZE.get_or_init(|| {
        let base = page_size();
        let large = vm_os::query_large_page_size();
        if large == 0 || large % base != 0 {
            base
        } else {
            large
        }
    })
}

/// Round `value` up to the next multiple of `align` (`align` must be a
/// nonzero power of two for page/alignment rounding; this also tolerates
/// non-power-of-two alignments such as page size on odd platforms).
pub fn align_up(value: u64, align: u64) -> u64 {
    if align == 0 {
        return value;
    }
    let rem = value % align;
    if rem == 0 { value } else { value + (align - rem) }
}
