//! First-fit byte pool over a caller-provided buffer.
//!
//! The pool keeps its bookkeeping in band: every chunk starts with a `u64`
//! header holding the payload size (always a multiple of 8, so the low bits
//! are free) with bit 0 marking the chunk used. Releasing a block clears its
//! used bit and merges adjacent free chunks, so long-lived pools do not
//! fragment across repeated serialize/parse cycles.

#![allow(unsafe_code)]

use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::jsonmap::error::Error;
use crate::jsonmap::mem::{align_up, ALIGN};

const HEADER: usize = 8;
const USED: u64 = 1;

/// Smallest payload a chunk is split down to.
const MIN_CHUNK: usize = 8;

/// Smallest buffer worth accepting, headers included.
const MIN_CAPACITY: usize = 64;

pub(crate) struct BytePool<'b> {
    base: NonNull<u8>,
    cap: usize,
    _buf: PhantomData<&'b mut [u8]>,
}

impl<'b> BytePool<'b> {
    pub(crate) fn new(buf: &'b mut [u8]) -> Result<Self, Error> {
        let lead = buf.as_ptr().align_offset(ALIGN);
        if buf.len() < lead + MIN_CAPACITY {
            return Err(Error::InvalidBuffer);
        }
        let cap = (buf.len() - lead) & !(ALIGN - 1);
        // SAFETY: `lead` is in bounds of the buffer, checked above.
        let base = unsafe { NonNull::new_unchecked(buf.as_mut_ptr().add(lead)) };
        let mut pool = Self {
            base,
            cap,
            _buf: PhantomData,
        };
        pool.write_header(0, (cap - HEADER) as u64);
        Ok(pool)
    }

    pub(crate) fn acquire(&mut self, size: usize) -> Result<NonNull<u8>, Error> {
        let need = align_up(size);
        if need == 0 {
            return Err(Error::OutOfMemory);
        }
        let mut off = 0;
        while off < self.cap {
            let header = self.read_header(off);
            let chunk = (header as usize) & !(ALIGN - 1);
            if header & USED == 0 && chunk >= need {
                if chunk - need >= HEADER + MIN_CHUNK {
                    // Split: the tail becomes a new free chunk.
                    self.write_header(off + HEADER + need, (chunk - need - HEADER) as u64);
                    self.write_header(off, need as u64 | USED);
                } else {
                    self.write_header(off, chunk as u64 | USED);
                }
                // SAFETY: the payload lies inside the borrowed buffer.
                return Ok(unsafe { NonNull::new_unchecked(self.base.as_ptr().add(off + HEADER)) });
            }
            off += HEADER + chunk;
        }
        Err(Error::OutOfMemory)
    }

    pub(crate) fn release(&mut self, ptr: NonNull<u8>) {
        let addr = ptr.as_ptr() as usize;
        let base = self.base.as_ptr() as usize;
        debug_assert!(addr > base && addr < base + self.cap);
        let off = addr - base - HEADER;
        let header = self.read_header(off);
        debug_assert!(header & USED != 0, "double release");
        self.write_header(off, header & !USED);
        self.coalesce();
    }

    fn coalesce(&mut self) {
        let mut off = 0;
        while off < self.cap {
            let header = self.read_header(off);
            let chunk = (header as usize) & !(ALIGN - 1);
            let next = off + HEADER + chunk;
            if header & USED == 0 && next < self.cap {
                let next_header = self.read_header(next);
                if next_header & USED == 0 {
                    let next_chunk = (next_header as usize) & !(ALIGN - 1);
                    self.write_header(off, (chunk + HEADER + next_chunk) as u64);
                    // Re-check the grown chunk against its new neighbour.
                    continue;
                }
            }
            off = next;
        }
    }

    fn read_header(&self, off: usize) -> u64 {
        debug_assert!(off + HEADER <= self.cap);
        // SAFETY: off is 8-aligned relative to the 8-aligned base and in
        // bounds, so this is an aligned read inside the buffer.
        unsafe { (self.base.as_ptr().add(off) as *const u64).read() }
    }

    fn write_header(&mut self, off: usize, header: u64) {
        debug_assert!(off + HEADER <= self.cap);
        // SAFETY: as in `read_header`, but the pool holds the buffer
        // exclusively so writing is fine.
        unsafe { (self.base.as_ptr().add(off) as *mut u64).write(header) }
    }
}
