//! # Buffer Error Types
//!
//! All errors that can occur while building, writing or reading a buffer.

use thiserror::Error;

/// Errors that can occur in buffer operations.
#[derive(Error, Debug)]
pub enum BufferError {
    /// The buffer was used after `dispose`.
    #[error("buffer has been disposed")]
    Disposed,

    /// Invalid configuration value or file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Segment or block size is not a whole number of items.
    #[error("block size {block_size} is not a non-zero multiple of item size {item_size}")]
    ItemSizeMismatch {
        /// Configured segment or block size in bytes.
        block_size: usize,
        /// Size of one item in bytes.
        item_size: usize,
    },

    /// Item type cannot be stored in place in a block.
    #[error("item alignment {align} exceeds block alignment {max}")]
    ItemAlignment {
        /// Alignment required by the item type.
        align: usize,
        /// Alignment guaranteed by blocks.
        max: usize,
    },

    /// Read offset lies beyond the written data.
    #[error("offset {offset} is beyond written length {length}")]
    OutOfRange {
        /// Requested byte offset.
        offset: usize,
        /// Bytes written so far.
        length: usize,
    },

    /// Growing to the requested length would overflow `usize`.
    #[error("requested capacity overflows usize")]
    CapacityOverflow,

    /// A stream ended in the middle of an item.
    #[error("stream ended with {trailing} bytes of a {item_size}-byte item")]
    PartialItem {
        /// Bytes of the incomplete item that were discarded.
        trailing: usize,
        /// Size of one item in bytes.
        item_size: usize,
    },

    /// I/O error from a source or destination stream.
    #[error("stream i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for buffer operations.
pub type BufferResult<T> = Result<T, BufferError>;

impl From<BufferError> for std::io::Error {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::Io(inner) => inner,
            other => std::io::Error::other(other),
        }
    }
}
