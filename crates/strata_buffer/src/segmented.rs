//! # Segmented Buffer
//!
//! A growable buffer built from equally sized pooled segments.
//!
//! ## Growth
//!
//! Capacity grows in whole segments only. When a write needs `required` bytes
//! and `capacity` are reserved, exactly
//! `ceil((required - capacity) / segment_size)` new segments are rented and
//! appended. Written bytes never move.
//!
//! ```text
//!   segments:  [ seg 0 | full ] [ seg 1 | full ] [ seg 2 | part.. ] [ seg 3 | empty ]
//!   cursor:                                      (2, offset) ^
//! ```

use std::io;
use std::marker::PhantomData;

use strata_memory::{Block, BlockPool, HeapAllocator};

use crate::buffer::{read_some, stream_remaining, ReadOutcome, TypedBuffer};
use crate::config::BufferConfig;
use crate::error::{BufferError, BufferResult};
use crate::item::{Item, ItemLayout};

/// Position inside the segment list.
///
/// `offset` may equal the segment size: the cursor then sits at the end of a
/// full segment and moves to the next one on the following write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct SegmentPosition {
    segment: usize,
    offset: usize,
}

/// A typed buffer that grows by renting whole segments.
///
/// Compared to a `Vec`, growing never copies: a 1 GiB buffer grows by renting
/// one more segment, not by moving a gigabyte. The price is that the data is
/// not one slice; use [`segments`](Self::segments) to walk it without copying.
///
/// # Thread Safety
///
/// Not synchronized. Wrap in a mutex to share between threads.
///
/// # Example
///
/// ```rust
/// use strata_buffer::{SegmentedBuffer, TypedBuffer};
///
/// let mut buffer = SegmentedBuffer::<u8>::new(16).unwrap();
/// buffer.write(&[1u8; 40]).unwrap();
///
/// assert_eq!(buffer.segment_count(), 3);
/// assert_eq!(buffer.capacity(), 48);
/// assert_eq!(buffer.to_vec().unwrap(), vec![1u8; 40]);
/// ```
pub struct SegmentedBuffer<T: Item, P: BlockPool = HeapAllocator> {
    /// Where segments come from and go back to.
    pool: P,
    /// Rented segments, in write order.
    segments: Vec<Block>,
    /// Usable bytes per segment.
    segment_size: usize,
    /// Item size and alignment.
    layout: ItemLayout,
    /// Next write position.
    cursor: SegmentPosition,
    /// Bytes written.
    length: usize,
    /// Zero segments before releasing them.
    clear_on_dispose: bool,
    disposed: bool,
    _item: PhantomData<T>,
}

impl<T: Item> SegmentedBuffer<T, HeapAllocator> {
    /// Creates a buffer with one segment of `segment_size` bytes, backed by a
    /// private heap allocator.
    ///
    /// # Errors
    ///
    /// `ItemSizeMismatch` if `segment_size` is not a non-zero multiple of the
    /// item size.
    pub fn new(segment_size: usize) -> BufferResult<Self> {
        Self::from_config(HeapAllocator::new(), &BufferConfig::with_segment_size(segment_size))
    }
}

impl<T: Item, P: BlockPool> SegmentedBuffer<T, P> {
    /// Creates a buffer renting `initial_segments` segments from `pool`.
    ///
    /// At least one segment is always rented.
    ///
    /// # Errors
    ///
    /// See [`from_config`](Self::from_config).
    pub fn with_pool(pool: P, segment_size: usize, initial_segments: usize) -> BufferResult<Self> {
        Self::from_config(
            pool,
            &BufferConfig {
                segment_size,
                initial_segments,
                ..BufferConfig::default()
            },
        )
    }

    /// Creates a buffer from configuration.
    ///
    /// # Errors
    ///
    /// Fails with the item layout error, `ItemSizeMismatch`, `InvalidConfig`
    /// or `CapacityOverflow` before any segment is rented.
    pub fn from_config(pool: P, config: &BufferConfig) -> BufferResult<Self> {
        let layout = config.validate::<T>()?;
        let initial = config.initial_segments.max(1);

        let mut segments = Vec::new();
        segments
            .try_reserve(initial)
            .map_err(|_| BufferError::CapacityOverflow)?;
        for _ in 0..initial {
            segments.push(pool.rent(config.segment_size));
        }

        Ok(Self {
            pool,
            segments,
            segment_size: config.segment_size,
            layout,
            cursor: SegmentPosition::default(),
            length: 0,
            clear_on_dispose: config.clear_on_dispose,
            disposed: false,
            _item: PhantomData,
        })
    }

    /// Bytes per segment.
    #[inline]
    #[must_use]
    pub const fn segment_size(&self) -> usize {
        self.segment_size
    }

    /// Number of rented segments.
    #[inline]
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Bytes written so far.
    #[inline]
    #[must_use]
    pub const fn len_bytes(&self) -> usize {
        self.length
    }

    /// Bytes reserved across all segments.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.segments.len() * self.segment_size
    }

    /// Items written so far.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> usize {
        self.layout.items_in(self.length)
    }

    /// `true` if nothing has been written.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// `true` once the buffer has been disposed.
    #[inline]
    #[must_use]
    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// The pool this buffer rents from.
    #[inline]
    #[must_use]
    pub const fn pool(&self) -> &P {
        &self.pool
    }

    /// Iterates over the written bytes of each segment, in order.
    ///
    /// Every slice but the last is a full segment. Nothing is copied.
    pub fn segments(&self) -> impl Iterator<Item = &[u8]> + '_ {
        let mut remaining = self.length;
        self.segments.iter().map_while(move |block| {
            if remaining == 0 {
                return None;
            }
            let valid = remaining.min(self.segment_size);
            remaining -= valid;
            Some(&block.as_bytes()[..valid])
        })
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

        let required = self
            .length
            .checked_add(bytes.len())
            .ok_or(BufferError::CapacityOverflow)?;
        self.grow_to(required)?;
        self.append(bytes);
        Ok(())
    }

    /// Rents segments so `additional` more bytes fit.
    ///
    /// # Errors
    ///
    /// `Disposed` or `CapacityOverflow`.
    pub fn reserve_bytes(&mut self, additional: usize) -> BufferResult<()> {
        self.ensure_active()?;
        let required = self
            .length
            .checked_add(additional)
            .ok_or(BufferError::CapacityOverflow)?;
        self.grow_to(required)
    }

    /// Appends everything `reader` yields, one segment at a time.
    ///
    /// # Errors
    ///
    /// See [`TypedBuffer::write_from_reader`].
    pub fn write_from_reader<R: io::Read>(&mut self, mut reader: R) -> BufferResult<usize> {
        self.ensure_active()?;
        let start = self.length;

        let filled = self.fill_from(&mut reader);

        // Keep the length item-granular whatever the stream did.
        let trailing = (self.length - start) % self.layout.size();
        if trailing != 0 {
            self.truncate(self.length - trailing);
        }

        filled?;
        if trailing != 0 {
            return Err(BufferError::PartialItem {
                trailing,
                item_size: self.layout.size(),
            });
        }
        Ok(self.length - start)
    }

    /// Appends the rest of a seekable stream, renting all needed segments
    /// up front.
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
        self.ensure_active()?;

        let start = self.layout.bytes_for(offset, self.length)?;
        if start > self.length {
            return Err(BufferError::OutOfRange {
                offset: start,
                length: self.length,
            });
        }

        let dst: &mut [u8] = bytemuck::cast_slice_mut(dst);
        let to_copy = dst.len().min(self.length - start);

        let mut pos = self.position_of(start);
        let mut copied = 0;
        while copied < to_copy {
            let source = &self.segments[pos.segment].as_bytes()[pos.offset..self.segment_size];
            let n = source.len().min(to_copy - copied);
            dst[copied..copied + n].copy_from_slice(&source[..n]);
            copied += n;
            pos = SegmentPosition {
                segment: pos.segment + 1,
                offset: 0,
            };
        }

        Ok(ReadOutcome {
            items_written: self.layout.items_in(copied),
            has_more: start + copied < self.length,
        })
    }

    /// Copies all written items into a new vector.
    ///
    /// # Errors
    ///
    /// `Disposed`.
    pub fn to_vec(&self) -> BufferResult<Vec<T>> {
        self.ensure_active()?;
        let mut items = vec![T::zeroed(); self.count()];
        self.read(&mut items, 0)?;
        Ok(items)
    }

    /// Writes each segment's valid bytes to `dst`.
    ///
    /// # Errors
    ///
    /// `Disposed` or `Io`.
    pub fn copy_to<W: io::Write>(&self, mut dst: W) -> BufferResult<usize> {
        self.ensure_active()?;
        for bytes in self.segments() {
            dst.write_all(bytes)?;
        }
        Ok(self.length)
    }

    /// Resets the length to zero, keeping every segment.
    ///
    /// # Errors
    ///
    /// `Disposed`.
    pub fn clear(&mut self) -> BufferResult<()> {
        self.ensure_active()?;
        self.truncate(0);
        Ok(())
    }

    /// Returns every segment to the pool, zeroing them first if configured.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        let returned = self.segments.len();
        for mut block in self.segments.drain(..) {
            if self.clear_on_dispose {
                block.zeroize();
            }
            self.pool.release(block);
        }
        self.length = 0;
        self.cursor = SegmentPosition::default();

        tracing::debug!(returned, zeroed = self.clear_on_dispose, "segmented buffer disposed");
    }

    #[inline]
    fn ensure_active(&self) -> BufferResult<()> {
        if self.disposed {
            Err(BufferError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Rents enough whole segments for `required` bytes.
    ///
    /// Nothing is rented if the segment list cannot hold them.
    fn grow_to(&mut self, required: usize) -> BufferResult<()> {
        let capacity = self.capacity();
        if required <= capacity {
            return Ok(());
        }

        let added = (required - capacity).div_ceil(self.segment_size);
        added
            .checked_mul(self.segment_size)
            .and_then(|bytes| bytes.checked_add(capacity))
            .ok_or(BufferError::CapacityOverflow)?;
        self.segments
            .try_reserve(added)
            .map_err(|_| BufferError::CapacityOverflow)?;
        for _ in 0..added {
            self.segments.push(self.pool.rent(self.segment_size));
        }

        tracing::debug!(
            added,
            segments = self.segments.len(),
            capacity = self.capacity(),
            "segmented buffer grew"
        );
        Ok(())
    }

    #[inline]
    fn position_of(&self, byte_offset: usize) -> SegmentPosition {
        SegmentPosition {
            segment: byte_offset / self.segment_size,
            offset: byte_offset % self.segment_size,
        }
    }

    /// Unwritten space of the segment under the cursor.
    ///
    /// Callers guarantee `capacity > length`.
    fn tail_mut(&mut self) -> &mut [u8] {
        if self.cursor.offset == self.segment_size {
            self.cursor = SegmentPosition {
                segment: self.cursor.segment + 1,
                offset: 0,
            };
        }
        let SegmentPosition { segment, offset } = self.cursor;
        &mut self.segments[segment].as_bytes_mut()[offset..self.segment_size]
    }

    #[inline]
    fn advance(&mut self, n: usize) {
        self.cursor.offset += n;
        self.length += n;
    }

    /// Copies `src` behind the cursor. Capacity must already fit it.
    fn append(&mut self, mut src: &[u8]) {
        while !src.is_empty() {
            let tail = self.tail_mut();
            let n = tail.len().min(src.len());
            tail[..n].copy_from_slice(&src[..n]);
            self.advance(n);
            src = &src[n..];
        }
    }

    /// Reads until end of stream, growing one segment whenever full.
    fn fill_from<R: io::Read>(&mut self, reader: &mut R) -> BufferResult<()> {
        loop {
            if self.length == self.capacity() {
                let next = self
                    .length
                    .checked_add(self.segment_size)
                    .ok_or(BufferError::CapacityOverflow)?;
                self.grow_to(next)?;
            }
            let n = read_some(reader, self.tail_mut())?;
            if n == 0 {
                return Ok(());
            }
            self.advance(n);
        }
    }

    fn truncate(&mut self, length: usize) {
        self.length = length;
        self.cursor = self.position_of(length);
    }
}

impl<T: Item, P: BlockPool> TypedBuffer<T> for SegmentedBuffer<T, P> {
    fn len_bytes(&self) -> usize {
        self.length
    }

    fn capacity(&self) -> usize {
        SegmentedBuffer::capacity(self)
    }

    fn item_layout(&self) -> ItemLayout {
        self.layout
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn write(&mut self, items: &[T]) -> BufferResult<()> {
        SegmentedBuffer::write(self, items)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> BufferResult<()> {
        SegmentedBuffer::write_bytes(self, bytes)
    }

    fn reserve_bytes(&mut self, additional: usize) -> BufferResult<()> {
        SegmentedBuffer::reserve_bytes(self, additional)
    }

    fn write_from_reader<R: io::Read>(&mut self, reader: R) -> BufferResult<usize> {
        SegmentedBuffer::write_from_reader(self, reader)
    }

    fn write_from_seekable<R: io::Read + io::Seek>(&mut self, reader: R) -> BufferResult<usize> {
        SegmentedBuffer::write_from_seekable(self, reader)
    }

    fn read(&self, dst: &mut [T], offset: usize) -> BufferResult<ReadOutcome> {
        SegmentedBuffer::read(self, dst, offset)
    }

    fn to_vec(&self) -> BufferResult<Vec<T>> {
        SegmentedBuffer::to_vec(self)
    }

    fn copy_to<W: io::Write>(&self, dst: W) -> BufferResult<usize> {
        SegmentedBuffer::copy_to(self, dst)
    }

    fn clear(&mut self) -> BufferResult<()> {
        SegmentedBuffer::clear(self)
    }

    fn dispose(&mut self) {
        SegmentedBuffer::dispose(self);
    }
}

/// Byte buffers double as `io::Write` sinks for serializers.
impl<P: BlockPool> io::Write for SegmentedBuffer<u8, P> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: Item, P: BlockPool> Drop for SegmentedBuffer<T, P> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T: Item, P: BlockPool> std::fmt::Debug for SegmentedBuffer<T, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentedBuffer")
            .field("segment_size", &self.segment_size)
            .field("segments", &self.segments.len())
            .field("length", &self.length)
            .field("disposed", &self.disposed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_memory::FreeListPool;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_initial_segments() {
        let heap = HeapAllocator::new();
        let buffer = SegmentedBuffer::<u8, _>::with_pool(&heap, 64, 3).unwrap();
        assert_eq!(buffer.segment_count(), 3);
        assert_eq!(buffer.capacity(), 192);
        assert_eq!(heap.outstanding_blocks(), 3);

        let buffer = SegmentedBuffer::<u8, _>::with_pool(&heap, 64, 0).unwrap();
        assert_eq!(buffer.segment_count(), 1);
    }

    #[test]
    fn test_growth_adds_exact_segment_count() {
        let mut buffer = SegmentedBuffer::<u8>::new(100).unwrap();

        buffer.write(&pattern(100)).unwrap();
        assert_eq!(buffer.segment_count(), 1);

        // 1 byte over capacity -> one more segment
        buffer.write(&[0]).unwrap();
        assert_eq!(buffer.segment_count(), 2);

        // 101 + 350 = 451 bytes -> ceil((451 - 200) / 100) = 3 more
        buffer.write(&pattern(350)).unwrap();
        assert_eq!(buffer.segment_count(), 5);
        assert_eq!(buffer.capacity(), 500);
        assert_eq!(buffer.len_bytes(), 451);
    }

    #[test]
    fn test_cursor_at_segment_boundary() {
        let mut buffer = SegmentedBuffer::<u8>::new(8).unwrap();
        buffer.write(&[1; 8]).unwrap();
        assert_eq!(buffer.cursor, SegmentPosition { segment: 0, offset: 8 });

        buffer.write(&[2; 3]).unwrap();
        assert_eq!(buffer.cursor, SegmentPosition { segment: 1, offset: 3 });

        let slices: Vec<&[u8]> = buffer.segments().collect();
        assert_eq!(slices, vec![&[1u8; 8][..], &[2u8; 3][..]]);
    }

    #[test]
    fn test_read_across_segments() {
        let data = pattern(1000);
        let mut buffer = SegmentedBuffer::<u8>::new(64).unwrap();
        buffer.write(&data).unwrap();

        let mut dst = vec![0u8; 300];
        let outcome = buffer.read(&mut dst, 50).unwrap();
        assert_eq!(outcome, ReadOutcome { items_written: 300, has_more: true });
        assert_eq!(dst, &data[50..350]);

        let mut tail = vec![0u8; 300];
        let outcome = buffer.read(&mut tail, 900).unwrap();
        assert_eq!(outcome, ReadOutcome { items_written: 100, has_more: false });
        assert_eq!(&tail[..100], &data[900..]);
    }

    #[test]
    fn test_read_at_end_and_past_end() {
        let mut buffer = SegmentedBuffer::<u8>::new(16).unwrap();
        buffer.write(&[9; 16]).unwrap();

        let mut dst = [0u8; 4];
        let outcome = buffer.read(&mut dst, 16).unwrap();
        assert_eq!(outcome, ReadOutcome::default());

        assert!(matches!(
            buffer.read(&mut dst, 17),
            Err(BufferError::OutOfRange { offset: 17, length: 16 })
        ));
        assert_eq!(dst, [0; 4]);
    }

    #[test]
    fn test_typed_items() {
        let mut buffer = SegmentedBuffer::<u32>::new(16).unwrap();
        let items: Vec<u32> = (0..37).collect();
        buffer.write(&items).unwrap();

        assert_eq!(buffer.count(), 37);
        assert_eq!(buffer.len_bytes(), 148);
        assert_eq!(buffer.to_vec().unwrap(), items);

        let mut dst = [0u32; 5];
        let outcome = buffer.read(&mut dst, 10).unwrap();
        assert_eq!(outcome.items_written, 5);
        assert_eq!(dst, [10, 11, 12, 13, 14]);
    }

    #[test]
    fn test_segment_size_must_fit_items() {
        assert!(matches!(
            SegmentedBuffer::<u64>::new(12),
            Err(BufferError::ItemSizeMismatch { block_size: 12, item_size: 8 })
        ));
    }

    #[test]
    fn test_partial_item_bytes_rejected() {
        let mut buffer = SegmentedBuffer::<u32>::new(16).unwrap();
        assert!(matches!(
            buffer.write_bytes(&[0; 6]),
            Err(BufferError::PartialItem { trailing: 2, item_size: 4 })
        ));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_clear_keeps_segments() {
        let mut buffer = SegmentedBuffer::<u8>::new(32).unwrap();
        buffer.write(&pattern(200)).unwrap();
        let capacity = buffer.capacity();

        buffer.clear().unwrap();
        assert_eq!(buffer.capacity(), capacity);
        assert!(buffer.to_vec().unwrap().is_empty());
        assert_eq!(buffer.segments().count(), 0);

        buffer.write(&[5; 10]).unwrap();
        assert_eq!(buffer.to_vec().unwrap(), vec![5; 10]);
        assert_eq!(buffer.capacity(), capacity);
    }

    #[test]
    fn test_dispose_returns_every_segment() {
        let heap = HeapAllocator::new();
        {
            let mut buffer = SegmentedBuffer::<u8, _>::with_pool(&heap, 64, 1).unwrap();
            buffer.write(&pattern(1000)).unwrap();
            assert_eq!(heap.outstanding_blocks(), 16);

            buffer.dispose();
            assert_eq!(heap.outstanding_blocks(), 0);
            assert!(buffer.is_disposed());
            assert_eq!(buffer.capacity(), 0);

            // second dispose and drop are no-ops
            buffer.dispose();
        }
        assert_eq!(heap.outstanding_blocks(), 0);
        assert_eq!(heap.total_rents(), 16);
    }

    #[test]
    fn test_drop_returns_segments() {
        let heap = HeapAllocator::new();
        {
            let mut buffer = SegmentedBuffer::<u8, _>::with_pool(&heap, 64, 2).unwrap();
            buffer.write(&pattern(300)).unwrap();
        }
        assert_eq!(heap.outstanding_blocks(), 0);
    }

    #[test]
    fn test_disposed_access() {
        let mut buffer = SegmentedBuffer::<u8>::new(16).unwrap();
        buffer.dispose();

        let mut dst = [0u8; 1];
        assert!(matches!(buffer.write(&[1]), Err(BufferError::Disposed)));
        assert!(matches!(buffer.read(&mut dst, 0), Err(BufferError::Disposed)));
        assert!(matches!(buffer.to_vec(), Err(BufferError::Disposed)));
        assert!(matches!(buffer.clear(), Err(BufferError::Disposed)));
        assert!(matches!(buffer.reserve_bytes(1), Err(BufferError::Disposed)));
        assert!(matches!(buffer.copy_to(Vec::new()), Err(BufferError::Disposed)));
        assert!(matches!(
            buffer.write_from_reader(&[1u8][..]),
            Err(BufferError::Disposed)
        ));
    }

    #[test]
    fn test_clear_on_dispose_wipes_pooled_segments() {
        let pool = FreeListPool::new(4);
        let config = BufferConfig {
            segment_size: 32,
            initial_segments: 1,
            clear_on_dispose: true,
        };
        let mut buffer = SegmentedBuffer::<u8, _>::from_config(&pool, &config).unwrap();
        buffer.write(&[0xFF; 32]).unwrap();
        buffer.dispose();

        let block = pool.rent(32);
        assert_eq!(pool.stats().reuses, 1);
        assert!(block.as_bytes().iter().all(|&b| b == 0));
        pool.release(block);
    }

    #[test]
    fn test_unseekable_reader_grows_one_segment_at_a_time() {
        let data = pattern(1000);
        let mut buffer = SegmentedBuffer::<u8>::new(128).unwrap();

        let written = buffer.write_from_reader(&data[..]).unwrap();
        assert_eq!(written, 1000);
        assert_eq!(buffer.segment_count(), 8);
        assert_eq!(buffer.to_vec().unwrap(), data);
    }

    #[test]
    fn test_seekable_reader_pregrows() {
        let data = pattern(1000);
        let heap = HeapAllocator::new();
        let mut buffer = SegmentedBuffer::<u8, _>::with_pool(&heap, 128, 1).unwrap();

        let written = buffer.write_from_seekable(io::Cursor::new(&data)).unwrap();
        assert_eq!(written, 1000);
        assert_eq!(buffer.segment_count(), 8);
        assert_eq!(heap.total_rents(), 8);
        assert_eq!(buffer.to_vec().unwrap(), data);
    }

    #[test]
    fn test_stream_partial_item_rolled_back() {
        let mut buffer = SegmentedBuffer::<u32>::new(16).unwrap();
        buffer.write(&[7]).unwrap();

        let err = buffer.write_from_reader(&[1u8; 10][..]).unwrap_err();
        assert!(matches!(err, BufferError::PartialItem { trailing: 2, item_size: 4 }));
        assert_eq!(buffer.count(), 3);
        assert_eq!(buffer.to_vec().unwrap(), vec![7, 0x0101_0101, 0x0101_0101]);

        buffer.write(&[9]).unwrap();
        assert_eq!(buffer.to_vec().unwrap()[3], 9);
    }

    /// Reports an enormous remaining length without holding any data.
    struct Bottomless;

    impl io::Read for Bottomless {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    impl io::Seek for Bottomless {
        fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
            Ok(match pos {
                io::SeekFrom::End(_) => u64::MAX - 3,
                _ => 0,
            })
        }
    }

    #[test]
    fn test_oversized_growth_is_an_error() {
        let heap = HeapAllocator::new();
        let mut buffer = SegmentedBuffer::<u8, _>::with_pool(&heap, 1, 1).unwrap();
        buffer.write(&[5]).unwrap();

        assert!(matches!(buffer.reserve_bytes(usize::MAX), Err(BufferError::CapacityOverflow)));
        assert!(matches!(buffer.reserve_bytes(usize::MAX - 1), Err(BufferError::CapacityOverflow)));
        assert_eq!(buffer.segment_count(), 1);
        assert_eq!(heap.total_rents(), 1);

        let mut buffer = SegmentedBuffer::<u8>::new(8).unwrap();
        assert!(matches!(
            buffer.write_from_seekable(Bottomless),
            Err(BufferError::CapacityOverflow)
        ));
        buffer.write(&[1, 2, 3]).unwrap();
        assert_eq!(buffer.to_vec().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_oversized_initial_segments_rent_nothing() {
        let heap = HeapAllocator::new();
        let config = BufferConfig {
            segment_size: 1,
            initial_segments: usize::MAX >> 1,
            clear_on_dispose: false,
        };

        let err = SegmentedBuffer::<u8, _>::from_config(&heap, &config).unwrap_err();
        assert!(matches!(err, BufferError::CapacityOverflow));
        assert_eq!(heap.total_rents(), 0);

        let config = BufferConfig {
            segment_size: 8192,
            ..config
        };
        let err = SegmentedBuffer::<u8, _>::from_config(&heap, &config).unwrap_err();
        assert!(matches!(err, BufferError::InvalidConfig(_)));
    }

    #[test]
    fn test_io_write_sink() {
        use std::io::Write as _;

        let mut buffer = SegmentedBuffer::<u8>::new(8).unwrap();
        write!(buffer, "segment {}", 42).unwrap();
        assert_eq!(buffer.to_vec().unwrap(), b"segment 42");
    }
}
