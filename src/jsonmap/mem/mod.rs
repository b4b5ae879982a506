//! Pluggable memory strategies backing the ephemeral document tree.
//!
//! Everything above this module allocates through [`MemoryContext::acquire`]
//! and [`MemoryContext::release`]; which memory those touch is decided once,
//! when the context is constructed. All strategies are non-blocking: a
//! request that cannot be satisfied fails immediately and the caller aborts
//! the current operation.

pub(crate) mod arena;
#[cfg(feature = "heap")]
pub(crate) mod heap;
pub mod hooks;
pub(crate) mod pool;

use core::ptr::NonNull;

use crate::jsonmap::error::Error;

/// Alignment of every block handed out by a strategy. Covers the document
/// node layout (`f64` members) on all supported targets.
pub(crate) const ALIGN: usize = 8;

pub(crate) const fn align_up(n: usize) -> usize {
    (n + ALIGN - 1) & !(ALIGN - 1)
}

enum Strategy<'b> {
    Pool(pool::BytePool<'b>),
    Arena(arena::BumpArena<'b>),
    #[cfg(feature = "heap")]
    Heap(heap::HeapAlloc),
    Hooks(hooks::HookAlloc),
}

/// Holds the active strategy for one mapper instance.
///
/// Replaces a process-wide singleton: each context is an independent value
/// and its lifetime is its init/deinit cycle.
pub(crate) struct MemoryContext<'b> {
    strategy: Strategy<'b>,
}

impl<'b> MemoryContext<'b> {
    pub(crate) fn pool(buf: &'b mut [u8]) -> Result<Self, Error> {
        Ok(Self {
            strategy: Strategy::Pool(pool::BytePool::new(buf)?),
        })
    }

    pub(crate) fn arena(buf: &'b mut [u8]) -> Result<Self, Error> {
        Ok(Self {
            strategy: Strategy::Arena(arena::BumpArena::new(buf)?),
        })
    }

    #[cfg(feature = "heap")]
    pub(crate) fn heap() -> Self {
        Self {
            strategy: Strategy::Heap(heap::HeapAlloc),
        }
    }

    pub(crate) fn hooks(hooks: hooks::Hooks) -> Result<Self, Error> {
        Ok(Self {
            strategy: Strategy::Hooks(hooks::HookAlloc::new(hooks)?),
        })
    }

    /// Acquires an 8-aligned block of at least `size` bytes.
    pub(crate) fn acquire(&mut self, size: usize) -> Result<NonNull<u8>, Error> {
        let result = match &mut self.strategy {
            Strategy::Pool(pool) => pool.acquire(size),
            Strategy::Arena(arena) => arena.acquire(size),
            #[cfg(feature = "heap")]
            Strategy::Heap(heap) => heap.acquire(size),
            Strategy::Hooks(hooks) => hooks.acquire(size),
        };
        if result.is_err() {
            log::debug!("allocation of {size} bytes failed");
        }
        result
    }

    /// Returns a block to the strategy. A no-op under the arena strategy,
    /// which reclaims memory only through [`Self::reset`].
    pub(crate) fn release(&mut self, ptr: NonNull<u8>) {
        match &mut self.strategy {
            Strategy::Pool(pool) => pool.release(ptr),
            Strategy::Arena(_) => {}
            #[cfg(feature = "heap")]
            Strategy::Heap(heap) => heap.release(ptr),
            Strategy::Hooks(hooks) => hooks.release(ptr),
        }
    }

    /// Invalidates every outstanding block at once where the strategy
    /// supports it (arena only). Called at the start of each operation.
    pub(crate) fn reset(&mut self) {
        if let Strategy::Arena(arena) = &mut self.strategy {
            arena.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_context_acquires_and_releases() {
        let mut buf = [0u8; 512];
        let mut ctx = MemoryContext::pool(&mut buf).unwrap();
        let a = ctx.acquire(16).unwrap();
        let b = ctx.acquire(16).unwrap();
        assert_ne!(a, b);
        ctx.release(a);
        ctx.release(b);
    }

    #[test]
    fn arena_context_reset_reclaims() {
        let mut buf = [0u8; 256];
        let mut ctx = MemoryContext::arena(&mut buf).unwrap();
        let first = ctx.acquire(64).unwrap();
        ctx.reset();
        let again = ctx.acquire(64).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn hooks_context_requires_both_functions() {
        assert!(matches!(
            MemoryContext::hooks(hooks::Hooks::default()),
            Err(Error::MissingHook)
        ));
    }
}
