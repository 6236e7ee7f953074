//! # STRATA Buffers
//!
//! Growable, typed, append-only buffers over pooled memory, for serializers
//! and network codecs that build payloads of unknown size.
//!
//! Two storage strategies share one contract ([`TypedBuffer`]):
//!
//! | | [`SegmentedBuffer`] | [`ContinuousBuffer`] |
//! |---|---|---|
//! | Storage | list of equal segments | one block |
//! | Growth | rent more segments | rent a larger block and copy |
//! | Bytes moved on growth | none | everything written |
//! | Zero-copy view | one slice per segment | one slice |
//!
//! ## Architecture Rules
//!
//! 1. **Memory is rented** - blocks come from an injected [`BlockPool`] and
//!    all go back on `dispose` or drop
//! 2. **Items are plain data** - the [`Item`] bound rules out pointers and
//!    references at compile time
//! 3. **Synchronous** - no operation blocks except on the caller's stream
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use strata_buffer::{FreeListPool, SegmentedBuffer, StrataConfig};
//!
//! let config = StrataConfig::from_toml_str(
//!     "[buffer]\nsegment_size = 4096\n\n[pool]\nmax_retained_blocks = 32\n",
//! )?;
//! let pool = Arc::new(FreeListPool::from_config(&config.pool));
//!
//! let mut buffer = SegmentedBuffer::<u8, _>::from_config(Arc::clone(&pool), &config.buffer)?;
//! buffer.write(&[7u8; 10_000])?;
//! assert_eq!(buffer.segment_count(), 3);
//!
//! let mut out = Vec::new();
//! buffer.copy_to(&mut out)?;
//! assert_eq!(out.len(), 10_000);
//!
//! buffer.dispose();
//! assert_eq!(pool.stats().retained_blocks, 3);
//! # Ok::<(), strata_buffer::BufferError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod buffer;
pub mod config;
pub mod continuous;
pub mod error;
pub mod item;
pub mod segmented;

pub use buffer::{ReadOutcome, TypedBuffer};
pub use config::{BufferConfig, StrataConfig, DEFAULT_SEGMENT_SIZE};
pub use continuous::ContinuousBuffer;
pub use error::{BufferError, BufferResult};
pub use item::{Item, ItemLayout};
pub use segmented::SegmentedBuffer;
pub use strata_memory::{Block, BlockPool, FreeListPool, HeapAllocator, PoolConfig, PoolStats};
