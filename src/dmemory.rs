//! Dynamic memory allocator (spec §3.3, §4.3): one reserved-but-mostly-
//! uncommitted virtual range, sub-allocated by an embedded freelist, with a
//! header in front of every user allocation carrying the bookkeeping the
//! freelist needs to take the block back.

use crate::freelist::{self, FreeList};
use crate::platform;

const MIN_ALIGNMENT: u64 = {
    // max(alignof<*const ()>, alignof<u64>, alignof<Header>)
    let ptr_align = std::mem::align_of::<*const ()>() as u64;
    let u64_align = std::mem::align_of::<u64>() as u64;
    let header_align = std::mem::align_of::<Header>() as u64;
    let a = if ptr_align > u64_align { ptr_align } else { u64_align };
    if a > header_align { a } else { header_align }
};

#[repr(C)]
#[derive(Clone, Copy)]
struct Header {
    offset: u64,
    request_size: u64,
    user_size: u64,
    alignment: u64,
}

const HEADER_SIZE: u64 = std::mem::size_of::<Header>() as u64;

fn align_up(value: u64, align: u64) -> u64 {
    let rem = value % align;
    if rem == 0 { value } else { value + (align - rem) }
}

fn is_pow2(v: u64) -> bool {
    v != 0 && (v & (v - 1)) == 0
}

/// A dynamic, general-purpose allocator backed by reserved virtual memory.
pub struct DMemory {
    base: *mut u8,
    reserve_size: u64,
    committed_size: u64,
    total_size: u64,
    freelist: FreeList,
}

unsafe impl Send for DMemory {}

impl DMemory {
    /// Reserve `reserve_size` bytes and commit an initial `total_size`
    /// (which must be `<= reserve_size`).
    pub fn create(total_size: u64, reserve_size: u64) -> Option<DMemory> {
        if total_size == 0 || reserve_size < total_size {
            log::error!("DMemory::create: invalid sizes (total={total_size}, reserve={reserve_size})");
            return None;
        }

        let page = if reserve_size >= platform::large_page_size() {
            platform::large_page_size()
        } else {
            platform::page_size()
        };

        let overhead_slack = HEADER_SIZE + MIN_ALIGNMENT;
        let Some(total_with_slack) = total_size.checked_add(overhead_slack) else {
            log::error!("DMemory::create: total_size overflow");
            return None;
        };
        let Some(reserve_with_slack) = reserve_size.checked_add(overhead_slack) else {
            log::error!("DMemory::create: reserve_size overflow");
            return None;
        };

        let aligned_total = align_up(total_with_slack, page);
        let aligned_reserve = align_up(reserve_with_slack, page).max(aligned_total);

        let base = platform::mem_reserve(aligned_reserve);
        if base.is_null() {
            return None;
        }
        if !platform::mem_commit(base, aligned_total) {
            platform::mem_release(base, aligned_reserve);
            return None;
        }

        let node_capacity = freelist::calculate_node_capacity(aligned_total);
        let freelist = match FreeList::create(aligned_total, node_capacity) {
            Some(fl) => fl,
            None => {
                platform::mem_decommit(base, aligned_total);
                platform::mem_release(base, aligned_reserve);
                return None;
            }
        };

        Some(DMemory {
            base,
            reserve_size: aligned_reserve,
            committed_size: aligned_total,
            total_size: aligned_total,
            freelist,
        })
    }

    pub fn owns_ptr(&self, ptr: *const u8) -> bool {
        let start = self.base as usize;
        let end = start + self.reserve_size as usize;
        let p = ptr as usize;
        p >= start && p < end
    }

    fn normalize_alignment(alignment: u64) -> Option<u64> {
        let alignment = if alignment == 0 { MIN_ALIGNMENT } else { alignment };
        if !is_pow2(alignment) {
            log::error!("DMemory: alignment {alignment} is not a power of two");
            return None;
        }
        Some(alignment.max(MIN_ALIGNMENT))
    }

    /// Allocate `user_size` bytes with default alignment.
    pub fn alloc(&mut self, user_size: u64) -> *mut u8 {
        self.alloc_aligned(user_size, MIN_ALIGNMENT)
    }

    /// Allocate `user_size` bytes aligned to `alignment` (rounded up to at
    /// least the allocator's minimum and validated as a power of two).
    pub fn alloc_aligned(&mut self, user_size: u64, alignment: u64) -> *mut u8 {
        if user_size == 0 {
            log::error!("DMemory::alloc_aligned: zero size requested");
            return std::ptr::null_mut();
        }
        let Some(alignment) = Self::normalize_alignment(alignment) else {
            return std::ptr::null_mut();
        };

        let Some(request_size) = user_size
            .checked_add(alignment)
            .and_then(|v| v.checked_add(HEADER_SIZE))
        else {
            log::error!("DMemory::alloc_aligned: request size overflow");
            return std::ptr::null_mut();
        };

        let Some(offset) = self.freelist.allocate(request_size) else {
            return std::ptr::null_mut();
        };

        let aligned_offset = align_up(offset + HEADER_SIZE, alignment);
        if aligned_offset + user_size > offset + request_size {
            log::error!("DMemory::alloc_aligned: alignment slack insufficient, rolling back");
            self.freelist.free(request_size, offset);
            return std::ptr::null_mut();
        }

        unsafe {
            let aligned_ptr = self.base.add(aligned_offset as usize);
            let header_ptr = aligned_ptr.sub(HEADER_SIZE as usize).cast::<Header>();
            header_ptr.write(Header {
                offset,
                request_size,
                user_size,
                alignment,
            });
            aligned_ptr
        }
    }

    fn read_header(&self, ptr: *mut u8) -> Option<Header> {
        if ptr.is_null() || !self.owns_ptr(ptr) {
            return None;
        }
        let header_addr = (ptr as usize).checked_sub(HEADER_SIZE as usize)?;
        if header_addr < self.base as usize {
            return None;
        }
        let header = unsafe { *(header_addr as *const Header) };
        if header.offset.checked_add(header.request_size)? > self.total_size {
            log::error!("DMemory: corrupt header at {ptr:p} (offset+request_size exceeds total_size)");
            return None;
        }
        Some(header)
    }

    /// Free a pointer returned by `alloc`/`alloc_aligned`. `size`/`alignment`
    /// are accepted for cross-checking against the header but the header's
    /// own values are authoritative for the actual free.
    pub fn free(&mut self, ptr: *mut u8, size: u64, alignment: u64) -> bool {
        let Some(header) = self.read_header(ptr) else {
            log::error!("DMemory::free: pointer {ptr:p} not owned or header is corrupt");
            return false;
        };
        if size != 0 && size != header.user_size {
            log::warn!(
                "DMemory::free: caller size {size} differs from header user_size {}",
                header.user_size
            );
        }
        if alignment != 0 && alignment != header.alignment {
            log::warn!(
                "DMemory::free: caller alignment {alignment} differs from header alignment {}",
                header.alignment
            );
        }
        self.freelist.free(header.request_size, header.offset)
    }

    /// Null+zero -> null. Null+nonzero -> alloc. Nonzero+zero -> free.
    /// Otherwise allocate fresh, copy `min(old, new)` bytes, free the old
    /// block (no in-place resize).
    pub fn realloc(&mut self, ptr: *mut u8, new_size: u64, alignment: u64) -> *mut u8 {
        if ptr.is_null() {
            if new_size == 0 {
                return std::ptr::null_mut();
            }
            return self.alloc_aligned(new_size, alignment);
        }
        if new_size == 0 {
            self.free(ptr, 0, 0);
            return std::ptr::null_mut();
        }

        let Some(header) = self.read_header(ptr) else {
            log::error!("DMemory::realloc: pointer {ptr:p} not owned");
            return std::ptr::null_mut();
        };
        let effective_align = header.alignment.max(if alignment == 0 { MIN_ALIGNMENT } else { alignment });

        let new_ptr = self.alloc_aligned(new_size, effective_align);
        if new_ptr.is_null() {
            return std::ptr::null_mut();
        }

        let copy_len = new_size.min(header.user_size) as usize;
        unsafe {
            std::ptr::copy_nonoverlapping(ptr, new_ptr, copy_len);
        }
        self.free(ptr, 0, 0);
        new_ptr
    }

    /// Grow the committed/tracked range to `new_total`. Rejects shrinking
    /// and rejects a target below the space currently in use.
    pub fn resize(&mut self, new_total: u64) -> bool {
        if new_total < self.total_size {
            log::error!("DMemory::resize: shrinking is not supported");
            return false;
        }
        let used = self.total_size - self.freelist.free_space();
        if new_total < used {
            log::error!("DMemory::resize: new_total below space in use");
            return false;
        }

        let overhead_slack = HEADER_SIZE + MIN_ALIGNMENT;
        let Some(with_slack) = new_total.checked_add(overhead_slack) else {
            log::error!("DMemory::resize: overflow computing slack");
            return false;
        };
        let page = platform::page_size();
        let aligned_new_total = align_up(with_slack, page);
        if aligned_new_total > self.reserve_size {
            log::error!("DMemory::resize: requested size exceeds reserve");
            return false;
        }

        if aligned_new_total > self.committed_size {
            let growth = aligned_new_total - self.committed_size;
            let incremental_base = unsafe { self.base.add(self.committed_size as usize) };
            if !platform::mem_commit(incremental_base, growth) {
                return false;
            }
            self.committed_size = aligned_new_total;
        }

        let required_capacity = freelist::calculate_node_capacity(aligned_new_total);
        if required_capacity > self.freelist.node_capacity() && !self.freelist.resize_nodes(required_capacity) {
            log::error!("DMemory::resize: failed to grow freelist node capacity");
            return false;
        }
        self.freelist.grow_in_place(aligned_new_total);
        self.total_size = aligned_new_total;
        true
    }
}

impl Drop for DMemory {
    fn drop(&mut self) {
        if !self.base.is_null() {
            platform::mem_release(self.base, self.reserve_size);
        }
    }
}
