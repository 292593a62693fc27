//! RIFF writer with deferred size finalization.

use crate::error::*;
use crate::types::*;
use crate::ChunkWrite;
use std::io::{self, Seek, SeekFrom, Write};
use tracing::{debug, trace, warn};

/// Offset of the size field, right after the `RIFF` tag.
const SIZE_OFFSET: u64 = 4;

/// A sink that can overwrite bytes it has already written.
///
/// Every `Write + Seek` type gets this for free: the implementation seeks to
/// `offset`, writes, then restores the previous position.
pub trait WriteAt {
    /// Writes `buf` at the absolute `offset`, returning how many bytes were
    /// written.
    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize>;
}

impl<T: Write + Seek + ?Sized> WriteAt for T {
    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        let pos = self.stream_position()?;
        self.seek(SeekFrom::Start(offset))?;
        let res = self.write(buf);
        self.seek(SeekFrom::Start(pos))?;
        res
    }
}

/// Writes RIFF chunks to a stream.
///
/// The header is written immediately with a placeholder size. The real size
/// is only known once every chunk is out, so [`close`](Writer::close) patches
/// it in place; a writer dropped without being closed does this itself and
/// logs any failure.
///
/// The stream is expected to be positioned at its start.
#[derive(Debug)]
pub struct Writer<W: Write + WriteAt> {
    inner: W,
    file_type: FileType,
    size: u64,
    closed: bool,
}

impl<W: Write + WriteAt> Writer<W> {
    /// Writes `"RIFF"`, an empty size field and `file_type` to `inner`.
    pub fn new(mut inner: W, file_type: FileType) -> Result<Self> {
        let (_, res) = write_all_counted(
            &mut inner,
            &[&FourCC::RIFF.as_bytes()[..], &[0; 4][..], &file_type.as_bytes()[..]],
        );
        res?;
        debug!(%file_type, "started RIFF stream");

        Ok(Self {
            inner,
            file_type,
            size: 4,
            closed: false,
        })
    }

    /// Writes `chunk` as identifier, size and padded data, returning the
    /// number of bytes written.
    ///
    /// A chunk that would push the RIFF size past `u32::MAX` is refused
    /// without writing anything. If the stream fails partway, the bytes that
    /// did get through still count towards the RIFF size.
    pub fn write_chunk(&mut self, chunk: &Chunk) -> Result<usize> {
        if self.closed {
            return Err(RiffError::Closed);
        }

        let new_size = self
            .size
            .checked_add(chunk.byte_length())
            .filter(|&size| size <= u32::MAX as u64)
            .ok_or(Corruption::SizeOverflow)?;

        let data = pad(&chunk.data);
        let (n, res) = write_all_counted(
            &mut self.inner,
            &[
                &chunk.id.as_bytes()[..],
                &le_u32(chunk.data.len() as u32)[..],
                &data[..],
            ],
        );
        self.size += n as u64;
        res?;

        debug_assert_eq!(self.size, new_size);
        trace!(id = %chunk.id, size = chunk.data.len(), "wrote chunk");
        Ok(n)
    }

    /// Finalizes the stream by writing the RIFF size into the header.
    ///
    /// Only the first call does anything; later calls fail with
    /// [`RiffError::Closed`], even if the first one failed.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(RiffError::Closed);
        }
        self.closed = true;

        let size = le_u32(self.size as u32);
        if self.inner.write_at(&size, SIZE_OFFSET)? < size.len() {
            return Err(Corruption::ShortWrite.into());
        }
        self.inner.flush()?;

        debug!(file_type = %self.file_type, size = self.size, "finalized RIFF stream");
        Ok(())
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// RIFF size accounted so far: the file type plus every chunk byte
    /// written.
    pub fn size(&self) -> u32 {
        self.size as u32
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }
}

impl<W: Write + WriteAt> ChunkWrite for Writer<W> {
    fn write_chunk(&mut self, chunk: &Chunk) -> Result<usize> {
        Writer::write_chunk(self, chunk)
    }
}

impl<W: Write + WriteAt> Drop for Writer<W> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(err) = self.close() {
                warn!(%err, "failed to finalize RIFF stream on drop");
            }
        }
    }
}
