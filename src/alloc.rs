//! Allocator callbacks backing the codec's custom-memory contract.
//!
//! The codec expects plain `malloc`/`free` semantics through a pair of
//! C-ABI callbacks plus an opaque pointer.  Each allocation is prefixed with
//! an 8-byte record holding the total span length, so the free callback can
//! return (and account) the exact span without a side table.
//!
//! Two personalities, selected per context at creation time:
//!
//! - **compression** (`blocking == false`): a single allocation attempt; on
//!   failure the callback returns null and the codec call fails, which the
//!   pipeline turns into "store this block uncompressed".
//! - **decompression** (`blocking == true`): on failure the callback keeps
//!   retrying until memory arrives.  A decompression that fails for lack of
//!   memory would surface as an unreadable block, so it is not allowed to.
//!
//! Both personalities bump `alloc_fail` on the first failed attempt and keep
//! the `size` gauge in sync with the bytes the codec currently holds.

use std::alloc::{alloc as raw_alloc, dealloc, Layout};
use std::os::raw::c_void;
use std::ptr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::stats::{AdapterStats, Stat};

/// Size of the length record prefixed to every span.
pub(crate) const RECORD_HEADER_SIZE: usize = 8;

/// Alignment of every returned pointer.  The record header is 8 bytes, so an
/// 8-byte-aligned base keeps the payload aligned for any primitive the codec
/// stores in its workspace.
pub(crate) const RECORD_ALIGN: usize = 8;

/// Pause between attempts in the blocking personality.
const RETRY_DELAY: Duration = Duration::from_millis(10);

/// Per-context state reached through the codec's opaque pointer.
///
/// Boxed by the owning context handle so its address stays stable for the
/// lifetime of the context; the callbacks only ever read it.
pub(crate) struct MemHooks {
    pub(crate) blocking: bool,
    pub(crate) stats: Arc<AdapterStats>,
}

/// Builds the codec-facing callback table for one context.
pub(crate) fn custom_mem(hooks: &MemHooks) -> zstd_sys::ZSTD_customMem {
    zstd_sys::ZSTD_customMem {
        customAlloc: Some(zstd_alloc_cb),
        customFree: Some(zstd_free_cb),
        opaque: hooks as *const MemHooks as *mut c_void,
    }
}

/// `customAlloc` — called by the codec for every workspace allocation.
///
/// # Safety
/// `opaque` must point at a live [`MemHooks`]; the codec guarantees it passes
/// back the pointer it was created with.
pub(crate) unsafe extern "C" fn zstd_alloc_cb(opaque: *mut c_void, size: usize) -> *mut c_void {
    let hooks = &*(opaque as *const MemHooks);

    let total = match size.checked_add(RECORD_HEADER_SIZE) {
        Some(total) => total,
        None => return ptr::null_mut(),
    };
    let layout = match Layout::from_size_align(total, RECORD_ALIGN) {
        Ok(layout) => layout,
        Err(_) => return ptr::null_mut(),
    };

    let mut base = raw_alloc(layout);
    if base.is_null() {
        hooks.stats.bump(Stat::AllocFail);
        if !hooks.blocking {
            return ptr::null_mut();
        }
        // Decompression personality: wait the pressure out.
        while base.is_null() {
            thread::sleep(RETRY_DELAY);
            base = raw_alloc(layout);
        }
    }

    // base is RECORD_ALIGN-aligned, so the u64 store is aligned.
    (base as *mut u64).write(total as u64);
    hooks.stats.add(Stat::Size, total as u64);
    base.add(RECORD_HEADER_SIZE) as *mut c_void
}

/// `customFree` — recovers the span length from the record header.
///
/// # Safety
/// `ptr_in` must be null or a pointer previously returned by
/// [`zstd_alloc_cb`] with the same `opaque`.
pub(crate) unsafe extern "C" fn zstd_free_cb(opaque: *mut c_void, ptr_in: *mut c_void) {
    if ptr_in.is_null() {
        return;
    }
    let hooks = &*(opaque as *const MemHooks);

    let base = (ptr_in as *mut u8).sub(RECORD_HEADER_SIZE);
    let total = (base as *const u64).read() as usize;
    hooks.stats.sub(Stat::Size, total as u64);

    let layout = Layout::from_size_align_unchecked(total, RECORD_ALIGN);
    dealloc(base, layout);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hooks() -> Box<MemHooks> {
        Box::new(MemHooks { blocking: false, stats: Arc::new(AdapterStats::new()) })
    }

    #[test]
    fn alloc_prefixes_the_span_length() {
        let hooks = hooks();
        let opaque = &*hooks as *const MemHooks as *mut c_void;
        unsafe {
            let p = zstd_alloc_cb(opaque, 100) as *mut u8;
            assert!(!p.is_null());
            let total = (p.sub(RECORD_HEADER_SIZE) as *const u64).read();
            assert_eq!(total, 108);
            zstd_free_cb(opaque, p as *mut c_void);
        }
    }

    #[test]
    fn size_gauge_tracks_live_bytes() {
        let hooks = hooks();
        let opaque = &*hooks as *const MemHooks as *mut c_void;
        unsafe {
            let a = zstd_alloc_cb(opaque, 64);
            let b = zstd_alloc_cb(opaque, 192);
            assert_eq!(
                hooks.stats.get(Stat::Size),
                (64 + RECORD_HEADER_SIZE + 192 + RECORD_HEADER_SIZE) as u64,
            );
            zstd_free_cb(opaque, a);
            zstd_free_cb(opaque, b);
        }
        assert_eq!(hooks.stats.get(Stat::Size), 0);
    }

    #[test]
    fn returned_pointers_are_aligned() {
        let hooks = hooks();
        let opaque = &*hooks as *const MemHooks as *mut c_void;
        unsafe {
            for size in [1usize, 7, 24, 1000] {
                let p = zstd_alloc_cb(opaque, size);
                assert_eq!(p as usize % RECORD_ALIGN, 0, "size {size}");
                zstd_free_cb(opaque, p);
            }
        }
    }

    #[test]
    fn free_of_null_is_a_no_op() {
        let hooks = hooks();
        let opaque = &*hooks as *const MemHooks as *mut c_void;
        unsafe { zstd_free_cb(opaque, ptr::null_mut()) };
        assert_eq!(hooks.stats.get(Stat::Size), 0);
    }
}
