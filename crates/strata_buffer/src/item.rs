//! # Item Layout
//!
//! Buffers store raw bytes but are typed over a plain-data item. Items must be
//! fixed-size values with no pointers inside, which `bytemuck::Pod` expresses
//! at compile time.

use bytemuck::Pod;
use strata_memory::BLOCK_ALIGN;

use crate::error::{BufferError, BufferResult};

/// Marker trait for buffer items.
///
/// Items must be:
/// - `Pod`: plain old data, any bit pattern valid, no padding or pointers
/// - `Send + Sync + 'static`: no borrowed data
///
/// Every `Pod` type qualifies, so `u8`, `u32`, `f64` and `#[repr(C)]`
/// structs deriving `Pod` all work as items.
///
/// # Example
///
/// ```rust
/// use bytemuck::{Pod, Zeroable};
/// use strata_buffer::{SegmentedBuffer, TypedBuffer};
///
/// #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
/// #[repr(C)]
/// struct Sample {
///     timestamp: u64,
///     value: f64,
/// }
///
/// let mut buffer = SegmentedBuffer::<Sample>::new(1024).unwrap();
/// buffer.write(&[Sample { timestamp: 1, value: 0.5 }]).unwrap();
/// assert_eq!(buffer.count(), 1);
/// ```
pub trait Item: Pod + Send + Sync + 'static {}

impl<T: Pod + Send + Sync + 'static> Item for T {}

/// Byte layout of an item type, computed once per buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemLayout {
    size: usize,
    align: usize,
}

impl ItemLayout {
    /// Captures the layout of `T`.
    ///
    /// # Errors
    ///
    /// Fails for zero-sized items and items aligned beyond [`BLOCK_ALIGN`].
    pub fn for_item<T: Item>() -> BufferResult<Self> {
        let size = std::mem::size_of::<T>();
        let align = std::mem::align_of::<T>();

        if size == 0 {
            return Err(BufferError::InvalidConfig(
                "zero-sized items cannot be buffered".to_owned(),
            ));
        }
        if align > BLOCK_ALIGN {
            return Err(BufferError::ItemAlignment {
                align,
                max: BLOCK_ALIGN,
            });
        }

        Ok(Self { size, align })
    }

    /// Returns the item size in bytes.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Returns the item alignment in bytes.
    #[inline]
    #[must_use]
    pub const fn align(&self) -> usize {
        self.align
    }

    /// Checks that a segment or block of `block_size` bytes holds whole items.
    ///
    /// # Errors
    ///
    /// Fails if `block_size` is zero or not a multiple of the item size.
    pub fn check_block_size(&self, block_size: usize) -> BufferResult<()> {
        if block_size == 0 || block_size % self.size != 0 {
            return Err(BufferError::ItemSizeMismatch {
                block_size,
                item_size: self.size,
            });
        }
        Ok(())
    }

    /// Converts an item count to bytes.
    ///
    /// # Errors
    ///
    /// Fails if the byte count overflows `usize`; `length` is reported as
    /// context in the error.
    pub fn bytes_for(&self, items: usize, length: usize) -> BufferResult<usize> {
        items
            .checked_mul(self.size)
            .ok_or(BufferError::OutOfRange {
                offset: usize::MAX,
                length,
            })
    }

    /// Converts a byte count to whole items.
    #[inline]
    #[must_use]
    pub const fn items_in(&self, bytes: usize) -> usize {
        bytes / self.size
    }
}
