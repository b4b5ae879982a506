//! Global-allocator strategy, available with the `heap` feature.
//!
//! Each block is prefixed with an 8-byte size header so release can rebuild
//! the layout the block was allocated with.

#![allow(unsafe_code)]

use core::ptr::NonNull;

use alloc::alloc::{alloc, dealloc, Layout};

use crate::jsonmap::error::Error;
use crate::jsonmap::mem::{align_up, ALIGN};

const HEADER: usize = 8;

pub(crate) struct HeapAlloc;

impl HeapAlloc {
    pub(crate) fn acquire(&mut self, size: usize) -> Result<NonNull<u8>, Error> {
        let total = align_up(size) + HEADER;
        let layout = Layout::from_size_align(total, ALIGN).map_err(|_| Error::OutOfMemory)?;
        // SAFETY: `total` is non-zero.
        let raw = unsafe { alloc(layout) };
        let Some(block) = NonNull::new(raw) else {
            return Err(Error::OutOfMemory);
        };
        // SAFETY: the first HEADER bytes are in bounds and 8-aligned; the
        // caller's block starts right after.
        unsafe {
            (block.as_ptr() as *mut u64).write(total as u64);
            Ok(NonNull::new_unchecked(block.as_ptr().add(HEADER)))
        }
    }

    pub(crate) fn release(&mut self, ptr: NonNull<u8>) {
        // SAFETY: `ptr` came out of `acquire`, so the size header sits
        // directly before it and describes the original layout.
        unsafe {
            let raw = ptr.as_ptr().sub(HEADER);
            let total = (raw as *const u64).read() as usize;
            dealloc(raw, Layout::from_size_align_unchecked(total, ALIGN));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_are_aligned_and_writable() {
        let mut heap = HeapAlloc;
        let block = heap.acquire(24).unwrap();
        assert_eq!(block.as_ptr() as usize % ALIGN, 0);
        // SAFETY: 24 bytes were just allocated at `block`.
        unsafe {
            core::slice::from_raw_parts_mut(block.as_ptr(), 24).fill(0xAB);
        }
        heap.release(block);
    }
}
