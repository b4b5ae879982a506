//! Application-supplied allocation hooks.
//!
//! Bridges the mapper onto an external allocator (an RTOS byte pool, a
//! custom heap) without this crate knowing anything about it. Both hooks
//! must be provided; a half-configured [`Hooks`] is rejected at mapper
//! construction rather than failing mid-operation.

use core::ptr::NonNull;

use crate::jsonmap::error::Error;

/// Allocation hook. Must return a block aligned to at least 8 bytes, or
/// null when the request cannot be satisfied.
pub type AcquireFn = fn(usize) -> *mut u8;

/// Deallocation hook. Receives exactly the pointers returned by the
/// matching [`AcquireFn`].
pub type ReleaseFn = fn(*mut u8);

/// Pair of hook functions handed to
/// [`Mapper::hooks`](crate::jsonmap::Mapper::hooks).
#[derive(Debug, Clone, Copy, Default)]
pub struct Hooks {
    pub acquire: Option<AcquireFn>,
    pub release: Option<ReleaseFn>,
}

pub(crate) struct HookAlloc {
    acquire: AcquireFn,
    release: ReleaseFn,
}

impl HookAlloc {
    pub(crate) fn new(hooks: Hooks) -> Result<Self, Error> {
        match (hooks.acquire, hooks.release) {
            (Some(acquire), Some(release)) => Ok(Self { acquire, release }),
            _ => Err(Error::MissingHook),
        }
    }

    pub(crate) fn acquire(&mut self, size: usize) -> Result<NonNull<u8>, Error> {
        NonNull::new((self.acquire)(size)).ok_or(Error::OutOfMemory)
    }

    pub(crate) fn release(&mut self, ptr: NonNull<u8>) {
        (self.release)(ptr.as_ptr());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_either_hook_is_rejected() {
        fn noop_release(_: *mut u8) {}

        assert!(matches!(HookAlloc::new(Hooks::default()), Err(Error::MissingHook)));
        assert!(matches!(
            HookAlloc::new(Hooks {
                acquire: None,
                release: Some(noop_release),
            }),
            Err(Error::MissingHook)
        ));
    }

    #[test]
    fn failing_hook_maps_to_out_of_memory() {
        fn never(_: usize) -> *mut u8 {
            core::ptr::null_mut()
        }
        fn noop(_: *mut u8) {}

        let mut alloc = HookAlloc::new(Hooks {
            acquire: Some(never),
            release: Some(noop),
        })
        .unwrap();
        assert_eq!(alloc.acquire(16), Err(Error::OutOfMemory));
    }
}
