//! # STRATA Memory
//!
//! Pooled memory blocks for the STRATA buffers.
//!
//! ## Design Philosophy
//!
//! Buffers never allocate directly. They rent fixed-size blocks from a
//! [`BlockPool`] and hand every block back when they are disposed:
//! - Blocks are owned values, so a block is held by exactly one buffer
//! - Block memory is 16-byte aligned, so plain-data items can be viewed in place
//! - Pools are injected, so tests can swap in a counting [`HeapAllocator`]
//!
//! ## Example
//!
//! ```rust
//! use strata_memory::{BlockPool, FreeListPool};
//!
//! let pool = FreeListPool::new(8);
//! let block = pool.rent(4096);
//! assert!(block.len() >= 4096);
//! pool.release(block);
//!
//! // The next rent of the same size reuses the retained block.
//! let again = pool.rent(4096);
//! assert_eq!(pool.stats().reuses, 1);
//! pool.release(again);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

mod block;
mod heap;
mod pool;

pub use block::{Block, BLOCK_ALIGN};
pub use heap::HeapAllocator;
pub use pool::{BlockPool, FreeListPool, PoolConfig, PoolStats};
