//! Bump arena over a caller-provided buffer.
//!
//! Carves sequential aligned offsets out of a single borrowed buffer.
//! Individual blocks cannot be reclaimed; `reset` restores the offset to
//! zero, invalidating every previously returned block at once. The mapper
//! resets at the start of each serialize/parse call, so callers must have
//! fully consumed the previous result before issuing a new one.

#![allow(unsafe_code)]

use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::jsonmap::error::Error;
use crate::jsonmap::mem::{align_up, ALIGN};

/// Smallest buffer worth accepting; anything below this cannot hold even a
/// single document node plus a short string.
const MIN_CAPACITY: usize = 64;

pub(crate) struct BumpArena<'b> {
    base: NonNull<u8>,
    cap: usize,
    offset: usize,
    _buf: PhantomData<&'b mut [u8]>,
}

impl<'b> BumpArena<'b> {
    pub(crate) fn new(buf: &'b mut [u8]) -> Result<Self, Error> {
        let lead = buf.as_ptr().align_offset(ALIGN);
        if buf.len() < lead + MIN_CAPACITY {
            return Err(Error::InvalidBuffer);
        }
        let cap = (buf.len() - lead) & !(ALIGN - 1);
        // SAFETY: `lead` is in bounds of the buffer, checked above.
        let base = unsafe { NonNull::new_unchecked(buf.as_mut_ptr().add(lead)) };
        Ok(Self {
            base,
            cap,
            offset: 0,
            _buf: PhantomData,
        })
    }

    pub(crate) fn acquire(&mut self, size: usize) -> Result<NonNull<u8>, Error> {
        let need = align_up(size);
        if need == 0 || need > self.cap - self.offset {
            return Err(Error::OutOfMemory);
        }
        // SAFETY: offset + need <= cap, so the block stays inside the
        // borrowed buffer.
        let ptr = unsafe { NonNull::new_unchecked(self.base.as_ptr().add(self.offset)) };
        self.offset += need;
        Ok(ptr)
    }

    pub(crate) fn reset(&mut self) {
        self.offset = 0;
    }

    #[cfg(test)]
    pub(crate) fn used(&self) -> usize {
        self.offset
    }
}
