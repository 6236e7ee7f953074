//! # Memory Blocks
//!
//! An owned, aligned byte region rented from a pool.

use bytemuck::{Pod, Zeroable};
use zeroize::Zeroize;

/// Alignment guaranteed for the first byte of every [`Block`].
pub const BLOCK_ALIGN: usize = 16;

/// One alignment unit of block storage.
#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C, align(16))]
#[allow(dead_code)] // only read through byte casts
struct Chunk([u8; BLOCK_ALIGN]);

/// A fixed-capacity, 16-byte aligned memory region.
///
/// Blocks are moved, never shared: whoever holds the `Block` value owns the
/// memory. Buffers take blocks from a [`BlockPool`](crate::BlockPool) with
/// `rent` and hand them back with `release`.
///
/// The length is the requested size rounded up to a multiple of
/// [`BLOCK_ALIGN`]. It never changes after construction.
pub struct Block {
    chunks: Box<[Chunk]>,
}

impl Block {
    /// Allocates a zeroed block holding at least `min_len` bytes.
    #[must_use]
    pub fn zeroed(min_len: usize) -> Self {
        let chunks = vec![Chunk::zeroed(); min_len.div_ceil(BLOCK_ALIGN)];
        Self {
            chunks: chunks.into_boxed_slice(),
        }
    }

    /// Returns the block size in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len() * BLOCK_ALIGN
    }

    /// Returns `true` for a zero-sized block.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Views the whole block as bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.chunks)
    }

    /// Views the whole block as mutable bytes.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.chunks)
    }

    /// Overwrites every byte with zero.
    ///
    /// The wipe is volatile and cannot be optimized away, so it is safe to
    /// use before returning a block that held sensitive data.
    pub fn zeroize(&mut self) {
        self.as_bytes_mut().zeroize();
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block").field("len", &self.len()).finish()
    }
}
