//! # Continuous Buffer
//!
//! A growable buffer kept in one pooled block, so the written items are
//! always a single slice.
//!
//! ## Growth
//!
//! When a write needs `required` bytes and the block holds `capacity`, a new
//! block of the smallest multiple of `capacity` that is `>= required` is
//! rented, the written bytes are copied over and the old block goes back to
//! the pool. Writing one byte past a 4 KiB block therefore rents 8 KiB;
//! writing 10 KiB into it rents 12 KiB.

use std::io;
use std::marker::PhantomData;

use strata_memory::{Block, BlockPool, HeapAllocator};

use crate::buffer::{read_some, stream_remaining, ReadOutcome, TypedBuffer};
use crate::config::BufferConfig;
use crate::error::{BufferError, BufferResult};
use crate::item::{Item, ItemLayout};

/// A typed buffer stored in one contiguous pooled block.
///
/// [`as_span`](Self::as_span) hands out the written items without copying.
/// The borrow checker keeps such views from outliving the next write, which
/// may move the data to a new block. [`generation`](Self::generation) counts
/// those moves for callers that track positions across writes.
///
/// # Thread Safety
///
/// Not synchronized. Wrap in a mutex to share between threads.
///
/// # Example
///
/// ```rust
/// use strata_buffer::{ContinuousBuffer, TypedBuffer};
///
/// let mut buffer = ContinuousBuffer::<u16>::new(8).unwrap();
/// buffer.write(&[1, 2, 3, 4, 5]).unwrap();
///
/// assert_eq!(buffer.capacity(), 16);
/// assert_eq!(buffer.as_span().unwrap(), &[1, 2, 3, 4, 5]);
/// ```
pub struct ContinuousBuffer<T: Item, P: BlockPool = HeapAllocator> {
    /// Where blocks come from and go back to.
    pool: P,
    /// Current block, `None` once disposed.
    block: Option<Block>,
    /// Usable bytes of the current block.
    capacity: usize,
    /// Bytes written.
    pos: usize,
    /// Largest single read from an unseekable stream.
    chunk_size: usize,
    layout: ItemLayout,
    /// Zero blocks before releasing them.
    clear_on_dispose: bool,
    /// Number of reallocations so far.
    generation: u64,
    _item: PhantomData<T>,
}

impl<T: Item> ContinuousBuffer<T, HeapAllocator> {
    /// Creates a buffer with a block of `block_size` bytes, backed by a
    /// private heap allocator.
    ///
    /// # Errors
    ///
    /// `ItemSizeMismatch` if `block_size` is not a non-zero multiple of the
    /// item size.
    pub fn new(block_size: usize) -> BufferResult<Self> {
        Self::from_config(HeapAllocator::new(), &BufferConfig::with_segment_size(block_size))
    }
}

impl<T: Item, P: BlockPool> ContinuousBuffer<T, P> {
    /// Creates a buffer renting its first block of `block_size` bytes from
    /// `pool`.
    ///
    /// # Errors
    ///
    /// See [`from_config`](Self::from_config).
    pub fn with_pool(pool: P, block_size: usize) -> BufferResult<Self> {
        Self::from_config(pool, &BufferConfig::with_segment_size(block_size))
    }

    /// Creates a buffer from configuration. `segment_size` is the initial
    /// block size; `initial_segments` is ignored.
    ///
    /// # Errors
    ///
    /// Fails with the item layout error or `ItemSizeMismatch` before any
    /// block is rented.
    pub fn from_config(pool: P, config: &BufferConfig) -> BufferResult<Self> {
        let layout = config.validate::<T>()?;
        let block = pool.rent(config.segment_size);

        Ok(Self {
            pool,
            block: Some(block),
            capacity: config.segment_size,
            pos: 0,
            chunk_size: config.segment_size,
            layout,
            clear_on_dispose: config.clear_on_dispose,
            generation: 0,
            _item: PhantomData,
        })
    }

    /// Bytes written so far.
    #[inline]
    #[must_use]
    pub const fn len_bytes(&self) -> usize {
        self.pos
    }

    /// Bytes reserved in the current block.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items written so far.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> usize {
        self.layout.items_in(self.pos)
    }

    /// `true` if nothing has been written.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pos == 0
    }

    /// `true` once the buffer has been disposed.
    #[inline]
    #[must_use]
    pub const fn is_disposed(&self) -> bool {
        self.block.is_none()
    }

    /// Number of times the data moved to a larger block.
    #[inline]
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// The pool this buffer rents from.
    #[inline]
    #[must_use]
    pub const fn pool(&self) -> &P {
        &self.pool
    }

    /// The written items, without copying.
    ///
    /// # Errors
    ///
    /// `Disposed`.
    pub fn as_span(&self) -> BufferResult<&[T]> {
        // Blocks start BLOCK_ALIGN-aligned and the item alignment was checked
        // at construction, so the cast cannot fail.
        Ok(bytemuck::cast_slice(self.as_byte_span()?))
    }

    /// The written bytes, without copying.
    ///
    /// # Errors
    ///
    /// `Disposed`.
    pub fn as_byte_span(&self) -> BufferResult<&[u8]> {
        let block = self.block.as_ref().ok_or(BufferError::Disposed)?;
        Ok(&block.as_bytes()[..self.pos])
    }

    /// Appends items.
    ///
    /// # Errors
    ///
    /// `Disposed` or `CapacityOverflow`.
    pub fn write(&mut self, items: &[T]) -> BufferResult<()> {
        self.write_bytes(bytemuck::cast_slice(items))
    }

    /// Appends raw bytes holding whole items.
    ///
    /// # Errors
    ///
    /// `Disposed`, `PartialItem` or `CapacityOverflow`. Nothing is written on
    /// error.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> BufferResult<()> {
        self.ensure_active()?;

        let trailing = bytes.len() % self.layout.size();
        if trailing != 0 {
            return Err(BufferError::PartialItem {
                trailing,
                item_size: self.layout.size(),
            });
        }

        let start = self.pos;
        let end = start
            .checked_add(bytes.len())
            .ok_or(BufferError::CapacityOverflow)?;
        let block = self.grow_to(end)?;
        block.as_bytes_mut()[start..end].copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    /// Grows the block so `additional` more bytes fit.
    ///
    /// # Errors
    ///
    /// `Disposed` or `CapacityOverflow`.
    pub fn reserve_bytes(&mut self, additional: usize) -> BufferResult<()> {
        self.ensure_active()?;
        let required = self
            .pos
            .checked_add(additional)
            .ok_or(BufferError::CapacityOverflow)?;
        self.grow_to(required)?;
        Ok(())
    }

    /// Appends everything `reader` yields, at most one initial block size per
    /// read.
    ///
    /// # Errors
    ///
    /// See [`TypedBuffer::write_from_reader`].
    pub fn write_from_reader<R: io::Read>(&mut self, mut reader: R) -> BufferResult<usize> {
        self.ensure_active()?;
        let start = self.pos;

        let filled = self.fill_from(&mut reader);

        // Keep the length item-granular whatever the stream did.
        let trailing = (self.pos - start) % self.layout.size();
        self.pos -= trailing;

        filled?;
        if trailing != 0 {
            return Err(BufferError::PartialItem {
                trailing,
                item_size: self.layout.size(),
            });
        }
        Ok(self.pos - start)
    }

    /// Appends the rest of a seekable stream, growing once up front.
    ///
    /// # Errors
    ///
    /// See [`TypedBuffer::write_from_reader`].
    pub fn write_from_seekable<R: io::Read + io::Seek>(&mut self, mut reader: R) -> BufferResult<usize> {
        self.ensure_active()?;
        let remaining = stream_remaining(&mut reader)?;
        self.reserve_bytes(remaining)?;
        self.write_from_reader(reader)
    }

    /// Copies items starting at item `offset` into `dst`.
    ///
    /// # Errors
    ///
    /// `Disposed` or `OutOfRange`.
    pub fn read(&self, dst: &mut [T], offset: usize) -> BufferResult<ReadOutcome> {
        let written = self.as_byte_span()?;

        let start = self.layout.bytes_for(offset, self.pos)?;
        if start > self.pos {
            return Err(BufferError::OutOfRange {
                offset: start,
                length: self.pos,
            });
        }

        let dst: &mut [u8] = bytemuck::cast_slice_mut(dst);
        let n = dst.len().min(self.pos - start);
        dst[..n].copy_from_slice(&written[start..start + n]);

        Ok(ReadOutcome {
            items_written: self.layout.items_in(n),
            has_more: start + n < self.pos,
        })
    }

    /// Copies all written items into a new vector.
    ///
    /// # Errors
    ///
    /// `Disposed`.
    pub fn to_vec(&self) -> BufferResult<Vec<T>> {
        Ok(self.as_span()?.to_vec())
    }

    /// Writes the valid bytes to `dst`.
    ///
    /// # Errors
    ///
    /// `Disposed` or `Io`.
    pub fn copy_to<W: io::Write>(&self, mut dst: W) -> BufferResult<usize> {
        let written = self.as_byte_span()?;
        dst.write_all(written)?;
        Ok(written.len())
    }

    /// Resets the length to zero, keeping the current block.
    ///
    /// # Errors
    ///
    /// `Disposed`.
    pub fn clear(&mut self) -> BufferResult<()> {
        self.ensure_active()?;
        self.pos = 0;
        Ok(())
    }

    /// Returns the block to the pool, zeroing it first if configured.
    pub fn dispose(&mut self) {
        let Some(block) = self.block.take() else {
            return;
        };
        self.release(block);
        self.capacity = 0;
        self.pos = 0;

        tracing::debug!(
            generation = self.generation,
            zeroed = self.clear_on_dispose,
            "continuous buffer disposed"
        );
    }

    #[inline]
    fn ensure_active(&self) -> BufferResult<()> {
        if self.block.is_none() {
            Err(BufferError::Disposed)
        } else {
            Ok(())
        }
    }

    fn release(&self, mut block: Block) {
        if self.clear_on_dispose {
            block.zeroize();
        }
        self.pool.release(block);
    }

    /// Moves the data to a block of at least `required` bytes if needed and
    /// returns the current block.
    fn grow_to(&mut self, required: usize) -> BufferResult<&mut Block> {
        if required > self.capacity {
            let new_capacity = required
                .div_ceil(self.capacity)
                .checked_mul(self.capacity)
                .filter(|&bytes| isize::try_from(bytes).is_ok())
                .ok_or(BufferError::CapacityOverflow)?;

            let mut grown = self.pool.rent(new_capacity);
            let old = self.block.take().ok_or(BufferError::Disposed)?;
            grown.as_bytes_mut()[..self.pos].copy_from_slice(&old.as_bytes()[..self.pos]);
            self.release(old);

            tracing::debug!(
                old_capacity = self.capacity,
                new_capacity,
                copied = self.pos,
                "continuous buffer reallocated"
            );

            self.block = Some(grown);
            self.capacity = new_capacity;
            self.generation += 1;
        }

        self.block.as_mut().ok_or(BufferError::Disposed)
    }

    /// Reads until end of stream, growing whenever the block is full.
    fn fill_from<R: io::Read>(&mut self, reader: &mut R) -> BufferResult<()> {
        loop {
            if self.pos == self.capacity {
                let required = self
                    .pos
                    .checked_add(self.chunk_size)
                    .ok_or(BufferError::CapacityOverflow)?;
                self.grow_to(required)?;
            }

            let pos = self.pos;
            let end = self.capacity.min(pos.saturating_add(self.chunk_size));
            let block = self.block.as_mut().ok_or(BufferError::Disposed)?;
            let n = read_some(reader, &mut block.as_bytes_mut()[pos..end])?;
            if n == 0 {
                return Ok(());
            }
            self.pos += n;
        }
    }
}

impl<T: Item, P: BlockPool> TypedBuffer<T> for ContinuousBuffer<T, P> {
    fn len_bytes(&self) -> usize {
        self.pos
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn item_layout(&self) -> ItemLayout {
        self.layout
    }

    fn is_disposed(&self) -> bool {
        self.block.is_none()
    }

    fn write(&mut self, items: &[T]) -> BufferResult<()> {
        ContinuousBuffer::write(self, items)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> BufferResult<()> {
        ContinuousBuffer::write_bytes(self, bytes)
    }

    fn reserve_bytes(&mut self, additional: usize) -> BufferResult<()> {
        ContinuousBuffer::reserve_bytes(self, additional)
    }

    fn write_from_reader<R: io::Read>(&mut self, reader: R) -> BufferResult<usize> {
        ContinuousBuffer::write_from_reader(self, reader)
    }

    fn write_from_seekable<R: io::Read + io::Seek>(&mut self, reader: R) -> BufferResult<usize> {
        ContinuousBuffer::write_from_seekable(self, reader)
    }

    fn read(&self, dst: &mut [T], offset: usize) -> BufferResult<ReadOutcome> {
        ContinuousBuffer::read(self, dst, offset)
    }

    fn to_vec(&self) -> BufferResult<Vec<T>> {
        ContinuousBuffer::to_vec(self)
    }

    fn copy_to<W: io::Write>(&self, dst: W) -> BufferResult<usize> {
        ContinuousBuffer::copy_to(self, dst)
    }

    fn clear(&mut self) -> BufferResult<()> {
        ContinuousBuffer::clear(self)
    }

    fn dispose(&mut self) {
        ContinuousBuffer::dispose(self);
    }
}

/// Byte buffers double as `io::Write` sinks for serializers.
impl<P: BlockPool> io::Write for ContinuousBuffer<u8, P> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: Item, P: BlockPool> Drop for ContinuousBuffer<T, P> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T: Item, P: BlockPool> std::fmt::Debug for ContinuousBuffer<T, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContinuousBuffer")
            .field("capacity", &self.capacity)
            .field("pos", &self.pos)
            .field("generation", &self.generation)
            .field("disposed", &self.block.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_memory::FreeListPool;

    #[test]
    fn test_growth_is_multiple_of_current_capacity() {
        let mut buffer = ContinuousBuffer::<u8>::new(100).unwrap();

        buffer.write(&[1; 100]).unwrap();
        assert_eq!(buffer.capacity(), 100);
        assert_eq!(buffer.generation(), 0);

        buffer.write(&[2; 1]).unwrap();
        assert_eq!(buffer.capacity(), 200);
        assert_eq!(buffer.generation(), 1);

        // 101 + 500 = 601 -> smallest multiple of 200 is 800
        buffer.write(&[3; 500]).unwrap();
        assert_eq!(buffer.capacity(), 800);
        assert_eq!(buffer.generation(), 2);

        let span = buffer.as_byte_span().unwrap();
        assert_eq!(span.len(), 601);
        assert!(span[..100].iter().all(|&b| b == 1));
        assert_eq!(span[100], 2);
        assert!(span[101..].iter().all(|&b| b == 3));
    }

    #[test]
    fn test_reallocation_returns_old_block() {
        let heap = HeapAllocator::new();
        {
            let mut buffer = ContinuousBuffer::<u8, _>::with_pool(&heap, 64).unwrap();
            buffer.write(&[0; 1000]).unwrap();
            assert_eq!(heap.outstanding_blocks(), 1);
            assert_eq!(heap.total_rents(), 2);
            assert_eq!(buffer.capacity(), 1024);
        }
        assert_eq!(heap.outstanding_blocks(), 0);
    }

    #[test]
    fn test_typed_span() {
        let mut buffer = ContinuousBuffer::<f64>::new(32).unwrap();
        buffer.write(&[0.5, 1.5, 2.5, 3.5, 4.5]).unwrap();

        assert_eq!(buffer.count(), 5);
        assert_eq!(buffer.as_span().unwrap(), &[0.5, 1.5, 2.5, 3.5, 4.5]);
        assert_eq!(buffer.as_byte_span().unwrap().len(), 40);
    }

    #[test]
    fn test_read_sub_range() {
        let data: Vec<u16> = (0..500).collect();
        let mut buffer = ContinuousBuffer::<u16>::new(64).unwrap();
        buffer.write(&data).unwrap();

        let mut dst = [0u16; 10];
        let outcome = buffer.read(&mut dst, 490).unwrap();
        assert_eq!(outcome, ReadOutcome { items_written: 10, has_more: false });
        assert_eq!(&dst[..], &data[490..]);

        let outcome = buffer.read(&mut dst, 100).unwrap();
        assert!(outcome.has_more);
        assert_eq!(&dst[..], &data[100..110]);

        assert!(matches!(
            buffer.read(&mut dst, 501),
            Err(BufferError::OutOfRange { offset: 1002, length: 1000 })
        ));
    }

    #[test]
    fn test_clear_keeps_block() {
        let mut buffer = ContinuousBuffer::<u8>::new(16).unwrap();
        buffer.write(&[1; 100]).unwrap();
        let capacity = buffer.capacity();

        buffer.clear().unwrap();
        assert_eq!(buffer.capacity(), capacity);
        assert!(buffer.as_span().unwrap().is_empty());

        buffer.write(&[2; 4]).unwrap();
        assert_eq!(buffer.to_vec().unwrap(), vec![2; 4]);
    }

    #[test]
    fn test_unseekable_reader() {
        let data: Vec<u8> = (0..=255).cycle().take(3000).collect();
        let mut buffer = ContinuousBuffer::<u8>::new(256).unwrap();

        let written = buffer.write_from_reader(&data[..]).unwrap();
        assert_eq!(written, 3000);
        assert_eq!(buffer.as_byte_span().unwrap(), &data[..]);
    }

    #[test]
    fn test_seekable_reader_grows_once() {
        let data = vec![9u8; 3000];
        let mut buffer = ContinuousBuffer::<u8>::new(256).unwrap();

        buffer.write_from_seekable(io::Cursor::new(&data)).unwrap();
        assert_eq!(buffer.generation(), 1);
        assert_eq!(buffer.capacity(), 3072);
        assert_eq!(buffer.to_vec().unwrap(), data);
    }

    #[test]
    fn test_stream_partial_item_rolled_back() {
        let mut buffer = ContinuousBuffer::<u64>::new(64).unwrap();
        let err = buffer.write_from_reader(&[0u8; 20][..]).unwrap_err();
        assert!(matches!(err, BufferError::PartialItem { trailing: 4, item_size: 8 }));
        assert_eq!(buffer.count(), 2);
    }

    #[test]
    fn test_disposed_access() {
        let heap = HeapAllocator::new();
        let mut buffer = ContinuousBuffer::<u8, _>::with_pool(&heap, 16).unwrap();
        buffer.write(&[1; 40]).unwrap();
        buffer.dispose();
        assert_eq!(heap.outstanding_blocks(), 0);
        assert!(buffer.is_disposed());

        let mut dst = [0u8; 1];
        assert!(matches!(buffer.write(&[1]), Err(BufferError::Disposed)));
        assert!(matches!(buffer.read(&mut dst, 0), Err(BufferError::Disposed)));
        assert!(matches!(buffer.as_span(), Err(BufferError::Disposed)));
        assert!(matches!(buffer.to_vec(), Err(BufferError::Disposed)));
        assert!(matches!(buffer.clear(), Err(BufferError::Disposed)));
        assert!(matches!(buffer.copy_to(Vec::new()), Err(BufferError::Disposed)));
        assert!(matches!(buffer.reserve_bytes(8), Err(BufferError::Disposed)));
    }

    #[test]
    fn test_clear_on_dispose_wipes_replaced_blocks() {
        let pool = FreeListPool::new(8);
        let config = BufferConfig {
            segment_size: 32,
            initial_segments: 1,
            clear_on_dispose: true,
        };
        let mut buffer = ContinuousBuffer::<u8, _>::from_config(&pool, &config).unwrap();
        buffer.write(&[0xEE; 32]).unwrap();
        buffer.write(&[0xEE; 1]).unwrap();

        // the 32-byte block went back on growth, wiped
        let stale = pool.rent(32);
        assert!(stale.as_bytes().iter().all(|&b| b == 0));
        pool.release(stale);
    }

    #[test]
    fn test_oversized_growth_is_an_error() {
        let heap = HeapAllocator::new();
        let mut buffer = ContinuousBuffer::<u8, _>::with_pool(&heap, 16).unwrap();
        buffer.write(&[9; 4]).unwrap();

        assert!(matches!(buffer.reserve_bytes(usize::MAX), Err(BufferError::CapacityOverflow)));
        assert!(matches!(
            buffer.reserve_bytes(usize::MAX - 64),
            Err(BufferError::CapacityOverflow)
        ));
        assert_eq!(buffer.capacity(), 16);
        assert_eq!(buffer.generation(), 0);
        assert_eq!(heap.total_rents(), 1);
        assert_eq!(buffer.as_byte_span().unwrap(), &[9; 4]);
    }

    #[test]
    fn test_io_write_sink() {
        use std::io::Write as _;

        let mut buffer = ContinuousBuffer::<u8>::new(4).unwrap();
        buffer.write_all(b"continuous").unwrap();
        assert_eq!(buffer.as_byte_span().unwrap(), b"continuous");
    }
}
