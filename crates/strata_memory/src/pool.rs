//! # Block Pools
//!
//! The rent/release capability buffers are generic over, and a pool that
//! keeps released blocks around for reuse.

use std::rc::Rc;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;

use crate::block::Block;

/// Source of memory blocks.
///
/// # Contract
///
/// - `rent(size)` returns a block of **at least** `size` bytes. Its contents
///   are unspecified: a pooled block may still hold bytes from its last user.
/// - `release(block)` hands a rented block back. Since blocks are moved in,
///   a block cannot be released twice.
///
/// Both calls are synchronous and never block.
pub trait BlockPool {
    /// Obtains a block holding at least `min_size` bytes.
    fn rent(&self, min_size: usize) -> Block;

    /// Returns a previously rented block.
    fn release(&self, block: Block);
}

impl<P: BlockPool + ?Sized> BlockPool for &P {
    #[inline]
    fn rent(&self, min_size: usize) -> Block {
        (**self).rent(min_size)
    }

    #[inline]
    fn release(&self, block: Block) {
        (**self).release(block);
    }
}

impl<P: BlockPool + ?Sized> BlockPool for Rc<P> {
    #[inline]
    fn rent(&self, min_size: usize) -> Block {
        (**self).rent(min_size)
    }

    #[inline]
    fn release(&self, block: Block) {
        (**self).release(block);
    }
}

impl<P: BlockPool + ?Sized> BlockPool for Arc<P> {
    #[inline]
    fn rent(&self, min_size: usize) -> Block {
        (**self).rent(min_size)
    }

    #[inline]
    fn release(&self, block: Block) {
        (**self).release(block);
    }
}

/// Pool settings, usually read from the `[pool]` table of a TOML file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    /// Maximum number of released blocks kept for reuse.
    pub max_retained_blocks: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_retained_blocks: 64,
        }
    }
}

/// Snapshot of pool activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total `rent` calls.
    pub rents: u64,
    /// Rents served from the free list.
    pub reuses: u64,
    /// Total `release` calls.
    pub releases: u64,
    /// Releases dropped because the free list was full.
    pub discarded: u64,
    /// Blocks currently held in the free list.
    pub retained_blocks: usize,
    /// Bytes currently held in the free list.
    pub retained_bytes: usize,
}

/// A pool that retains released blocks in a free list.
///
/// Renting takes the smallest retained block large enough and falls
/// back to a fresh allocation. At most `max_retained_blocks` released blocks
/// are kept; anything beyond that is freed.
///
/// # Thread Safety
///
/// The free list sits behind a `parking_lot::Mutex`, so the pool can be
/// shared through an `Arc`. Buffers renting from it are still single-owner.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use strata_memory::{BlockPool, FreeListPool};
///
/// let pool = Arc::new(FreeListPool::new(4));
/// let block = pool.rent(1024);
/// pool.release(block);
/// assert_eq!(pool.stats().retained_blocks, 1);
/// ```
pub struct FreeListPool {
    inner: Mutex<PoolInner>,
    max_retained: usize,
}

struct PoolInner {
    free_list: Vec<Block>,
    stats: PoolStats,
}

impl FreeListPool {
    /// Creates an empty pool retaining at most `max_retained` blocks.
    #[must_use]
    pub fn new(max_retained: usize) -> Self {
        Self {
            inner: Mutex::new(PoolInner {
                free_list: Vec::new(),
                stats: PoolStats::default(),
            }),
            max_retained,
        }
    }

    /// Creates a pool from configuration.
    #[must_use]
    pub fn from_config(config: &PoolConfig) -> Self {
        Self::new(config.max_retained_blocks)
    }

    /// Returns the maximum number of retained blocks.
    #[inline]
    #[must_use]
    pub const fn max_retained(&self) -> usize {
        self.max_retained
    }

    /// Returns a snapshot of the pool counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.inner.lock().stats
    }

    /// Frees every retained block, returning the number of bytes released.
    pub fn trim(&self) -> usize {
        let mut inner = self.inner.lock();
        let freed = inner.stats.retained_bytes;
        inner.free_list.clear();
        inner.stats.retained_blocks = 0;
        inner.stats.retained_bytes = 0;
        tracing::debug!(freed, "pool trimmed");
        freed
    }
}

impl Default for FreeListPool {
    fn default() -> Self {
        Self::from_config(&PoolConfig::default())
    }
}

impl BlockPool for FreeListPool {
    fn rent(&self, min_size: usize) -> Block {
        let mut inner = self.inner.lock();
        inner.stats.rents += 1;

        // best fit
        let best_fit = inner
            .free_list
            .iter()
            .enumerate()
            .filter(|(_, block)| block.len() >= min_size)
            .min_by_key(|(_, block)| block.len())
            .map(|(index, _)| index);

        if let Some(index) = best_fit {
            let block = inner.free_list.swap_remove(index);
            inner.stats.reuses += 1;
            inner.stats.retained_blocks -= 1;
            inner.stats.retained_bytes -= block.len();
            tracing::trace!(min_size, len = block.len(), "reused pooled block");
            return block;
        }

        drop(inner);
        let block = Block::zeroed(min_size);
        tracing::trace!(min_size, len = block.len(), "allocated block");
        block
    }

    fn release(&self, block: Block) {
        let mut inner = self.inner.lock();
        inner.stats.releases += 1;

        if inner.free_list.len() >= self.max_retained {
            inner.stats.discarded += 1;
            tracing::trace!(len = block.len(), "free list full, dropping block");
            return;
        }

        inner.stats.retained_blocks += 1;
        inner.stats.retained_bytes += block.len();
        inner.free_list.push(block);
    }
}
