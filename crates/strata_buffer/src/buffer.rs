//! # Buffer Contract
//!
//! The read/write/append surface shared by [`SegmentedBuffer`] and
//! [`ContinuousBuffer`], so serializers and codecs can be written once against
//! either storage strategy.
//!
//! [`SegmentedBuffer`]: crate::SegmentedBuffer
//! [`ContinuousBuffer`]: crate::ContinuousBuffer

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::error::BufferResult;
use crate::item::{Item, ItemLayout};

/// Result of a [`TypedBuffer::read`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Items copied into the destination.
    pub items_written: usize,
    /// `true` if written data remains past the copied range.
    pub has_more: bool,
}

/// A growable, append-only store of plain-data items.
///
/// # Lifecycle
///
/// A buffer is **Active** from construction until [`dispose`](Self::dispose)
/// and **Disposed** afterwards. Every fallible operation on a disposed buffer
/// returns [`BufferError::Disposed`](crate::BufferError::Disposed); the size
/// accessors report zero.
///
/// # Invariants
///
/// - `len_bytes() <= capacity()`
/// - `len_bytes()` is always a whole number of items
/// - `clear()` keeps every rented block, so `capacity()` is unchanged
pub trait TypedBuffer<T: Item> {
    /// Bytes written so far.
    fn len_bytes(&self) -> usize;

    /// Bytes reserved across all owned blocks.
    fn capacity(&self) -> usize;

    /// Layout of the item type.
    fn item_layout(&self) -> ItemLayout;

    /// `true` once the buffer has been disposed.
    fn is_disposed(&self) -> bool;

    /// Items written so far.
    fn count(&self) -> usize {
        self.item_layout().items_in(self.len_bytes())
    }

    /// `true` if nothing has been written.
    fn is_empty(&self) -> bool {
        self.len_bytes() == 0
    }

    /// Appends items.
    ///
    /// # Errors
    ///
    /// `Disposed`, or `CapacityOverflow` if the new length overflows.
    fn write(&mut self, items: &[T]) -> BufferResult<()>;

    /// Appends raw bytes holding whole items.
    ///
    /// # Errors
    ///
    /// `PartialItem` if `bytes` does not hold a whole number of items, plus
    /// the errors of [`write`](Self::write).
    fn write_bytes(&mut self, bytes: &[u8]) -> BufferResult<()>;

    /// Grows capacity so `additional` more bytes fit without further renting.
    ///
    /// # Errors
    ///
    /// `Disposed` or `CapacityOverflow`.
    fn reserve_bytes(&mut self, additional: usize) -> BufferResult<()>;

    /// Appends everything `reader` yields until end of stream.
    ///
    /// Reads go straight into block memory, at most one segment at a time,
    /// growing on demand. Returns the number of bytes appended. A read that
    /// fails with `ErrorKind::Interrupted` is retried, as `std::io::copy`
    /// does; no other error is retried.
    ///
    /// # Errors
    ///
    /// I/O errors propagate unchanged; bytes appended before the error stay
    /// written and grown capacity is kept. A trailing partial item is dropped
    /// and reported as `PartialItem`.
    fn write_from_reader<R: Read>(&mut self, reader: R) -> BufferResult<usize>;

    /// Appends the rest of a seekable stream, growing once to its remaining
    /// length before reading.
    ///
    /// # Errors
    ///
    /// As for [`write_from_reader`](Self::write_from_reader).
    fn write_from_seekable<R: Read + Seek>(&mut self, reader: R) -> BufferResult<usize>;

    /// Copies items starting at item `offset` into `dst`.
    ///
    /// # Errors
    ///
    /// `Disposed`, or `OutOfRange` if `offset` lies past the written items.
    /// Nothing is copied on error.
    fn read(&self, dst: &mut [T], offset: usize) -> BufferResult<ReadOutcome>;

    /// Copies all written items into a new vector.
    ///
    /// # Errors
    ///
    /// `Disposed`.
    fn to_vec(&self) -> BufferResult<Vec<T>>;

    /// Writes the valid bytes to `dst`, returning the byte count.
    ///
    /// # Errors
    ///
    /// `Disposed`, or `Io` from the destination.
    fn copy_to<W: Write>(&self, dst: W) -> BufferResult<usize>;

    /// Forgets the written data but keeps all rented memory.
    ///
    /// # Errors
    ///
    /// `Disposed`.
    fn clear(&mut self) -> BufferResult<()>;

    /// Returns every rented block to the pool. Calling it again does nothing.
    fn dispose(&mut self);
}

/// Bytes left between the current position and the end of `reader`.
///
/// The stream position is left where it was.
pub(crate) fn stream_remaining<R: Seek>(reader: &mut R) -> io::Result<usize> {
    let pos = reader.stream_position()?;
    let end = reader.seek(SeekFrom::End(0))?;
    if end != pos {
        reader.seek(SeekFrom::Start(pos))?;
    }
    usize::try_from(end.saturating_sub(pos))
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "stream too large to buffer"))
}

/// Single `read` call that retries on `Interrupted`, as `std::io` helpers do.
pub(crate) fn read_some<R: Read>(reader: &mut R, dst: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(dst) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct Flaky {
        interrupted: bool,
        data: Cursor<Vec<u8>>,
    }

    impl Read for Flaky {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::ErrorKind::Interrupted.into());
            }
            self.data.read(buf)
        }
    }

    #[test]
    fn test_stream_remaining_keeps_position() {
        let mut cursor = Cursor::new(vec![0u8; 100]);
        cursor.set_position(30);
        assert_eq!(stream_remaining(&mut cursor).unwrap(), 70);
        assert_eq!(cursor.position(), 30);
    }

    #[test]
    fn test_stream_remaining_at_end() {
        let mut cursor = Cursor::new(vec![0u8; 8]);
        cursor.set_position(8);
        assert_eq!(stream_remaining(&mut cursor).unwrap(), 0);
    }

    #[test]
    fn test_read_some_retries_interrupted() {
        let mut reader = Flaky {
            interrupted: false,
            data: Cursor::new(vec![7u8; 4]),
        };
        let mut dst = [0u8; 4];
        assert_eq!(read_some(&mut reader, &mut dst).unwrap(), 4);
        assert_eq!(dst, [7; 4]);
    }
}
