//! # Heap Allocator
//!
//! A non-pooling [`BlockPool`] that allocates on every rent and frees on every
//! release, while counting what is outstanding.

use std::cell::Cell;

use crate::block::Block;
use crate::pool::BlockPool;

/// A block source with no reuse.
///
/// Every `rent` allocates a fresh zeroed block sized to the request (rounded
/// to the block alignment) and every `release` frees it. The counters make it
/// the natural fake for tests: once a buffer is disposed,
/// [`outstanding_blocks`](Self::outstanding_blocks) must be back to zero.
///
/// # Thread Safety
///
/// This allocator is NOT thread-safe. Use one allocator per thread.
///
/// # Example
///
/// ```rust
/// use strata_memory::{BlockPool, HeapAllocator};
///
/// let heap = HeapAllocator::new();
/// let block = heap.rent(100);
/// assert_eq!(heap.outstanding_blocks(), 1);
///
/// heap.release(block);
/// assert_eq!(heap.outstanding_blocks(), 0);
/// ```
#[derive(Debug, Default)]
pub struct HeapAllocator {
    /// Blocks rented and not yet released.
    outstanding_blocks: Cell<usize>,
    /// Bytes rented and not yet released.
    outstanding_bytes: Cell<usize>,
    /// Total rents since creation.
    total_rents: Cell<u64>,
}

impl HeapAllocator {
    /// Creates an allocator with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of rented blocks not yet released.
    #[inline]
    #[must_use]
    pub fn outstanding_blocks(&self) -> usize {
        self.outstanding_blocks.get()
    }

    /// Returns the number of rented bytes not yet released.
    #[inline]
    #[must_use]
    pub fn outstanding_bytes(&self) -> usize {
        self.outstanding_bytes.get()
    }

    /// Returns the total number of rents.
    #[inline]
    #[must_use]
    pub fn total_rents(&self) -> u64 {
        self.total_rents.get()
    }
}

impl BlockPool for HeapAllocator {
    fn rent(&self, min_size: usize) -> Block {
        let block = Block::zeroed(min_size);
        self.outstanding_blocks.set(self.outstanding_blocks.get() + 1);
        self.outstanding_bytes.set(self.outstanding_bytes.get() + block.len());
        self.total_rents.set(self.total_rents.get() + 1);
        block
    }

    fn release(&self, block: Block) {
        self.outstanding_blocks
            .set(self.outstanding_blocks.get().saturating_sub(1));
        self.outstanding_bytes
            .set(self.outstanding_bytes.get().saturating_sub(block.len()));
    }
}
