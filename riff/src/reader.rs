//! Streaming RIFF reader.

use crate::error::*;
use crate::types::*;
use crate::ChunkRead;
use byteorder::{ByteOrder, LE};
use std::io::Read;
use tracing::{debug, trace};

const RIFF_HEADER_LEN: usize = 12;

/// Reads RIFF chunks, in order, from a byte stream.
///
/// The reader never reads past the size declared in the RIFF header; a
/// stream which keeps yielding chunks beyond that point is reported as
/// corrupted. Pass `&mut R` to keep ownership of the underlying stream.
#[derive(Debug)]
pub struct Reader<R> {
    inner: R,
    file_type: FileType,
    size: u32,
    bytes_read: u64,
    /// Set once iteration has yielded an error or reached the end.
    done: bool,
}

impl<R: Read> Reader<R> {
    /// Parses the 12-byte RIFF header from `inner`.
    ///
    /// A short header, a header not starting with `RIFF` or a declared size
    /// too small to hold the file type are all corruption. Other I/O errors
    /// are returned as is.
    pub fn new(mut inner: R) -> Result<Self> {
        let mut header = [0; RIFF_HEADER_LEN];
        if read_full(&mut inner, &mut header)? < RIFF_HEADER_LEN {
            return Err(Corruption::ShortRead.into());
        }

        let mut magic = [0; 4];
        magic.copy_from_slice(&header[0..4]);
        if FourCC::from(magic) != FourCC::RIFF {
            return Err(Corruption::NotRiff(FileType::from(magic)).into());
        }

        let size = LE::read_u32(&header[4..8]);
        if size < 4 {
            return Err(Corruption::SizeTooSmall(size).into());
        }

        let mut file_type = [0; 4];
        file_type.copy_from_slice(&header[8..12]);
        let file_type = FileType::from(file_type);
        debug!(%file_type, size, "opened RIFF stream");

        Ok(Self {
            inner,
            file_type,
            size,
            bytes_read: 4,
            done: false,
        })
    }

    /// Reads the next chunk, returning it with the number of bytes consumed
    /// from the stream (header and padding included).
    ///
    /// `Ok(None)` means the stream ended cleanly on a chunk boundary. Running
    /// out of data anywhere inside a chunk is corruption.
    ///
    /// A chunk whose padded size does not fit in the rest of the declared
    /// RIFF size fails with `OutOfBounds` before its payload is read, so the
    /// stream is not touched past the chunk header in that case.
    pub fn read_chunk(&mut self) -> Result<Option<(Chunk, usize)>> {
        let mut header = [0; CHUNK_HEADER_LEN];
        let header_len = read_full(&mut self.inner, &mut header)?;
        if header_len == 0 {
            return Ok(None);
        }
        self.advance(header_len as u64)?;
        if header_len < CHUNK_HEADER_LEN {
            return Err(Corruption::ShortRead.into());
        }

        let mut id = [0; 4];
        id.copy_from_slice(&header[0..4]);
        let id = FourCC::from(id);
        let size = LE::read_u32(&header[4..8]);
        let padded = padded_length(size as u64);

        // Refuse chunks that cannot fit before touching their payload.
        if self.bytes_read + padded > self.limit() {
            return Err(self.out_of_bounds(self.bytes_read + padded));
        }

        // On error, `read_to_end` leaves what it got in `data`.
        let mut data = Vec::new();
        let res = (&mut self.inner).take(padded).read_to_end(&mut data);
        let data_len = data.len();
        self.advance(data_len as u64)?;
        res?;
        if (data_len as u64) < padded {
            return Err(Corruption::ShortRead.into());
        }
        data.truncate(size as usize);

        trace!(%id, size, "read chunk");
        Ok(Some((Chunk { id, data }, header_len + data_len)))
    }

    /// Reads chunks until the end of the stream, appending them to `chunks`.
    ///
    /// Returns how many chunks were appended. On error, the chunks read
    /// before the failure are left in `chunks`.
    pub fn read_to_end(&mut self, chunks: &mut Vec<Chunk>) -> Result<usize> {
        let start = chunks.len();
        while let Some((chunk, _)) = self.read_chunk()? {
            chunks.push(chunk);
        }
        Ok(chunks.len() - start)
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// Content length as declared by the RIFF header.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Bytes consumed after the size field so far, including the file type.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    fn limit(&self) -> u64 {
        padded_length(self.size as u64)
    }

    fn advance(&mut self, n: u64) -> Result<()> {
        self.bytes_read = self.bytes_read.saturating_add(n);
        if self.bytes_read > self.limit() {
            return Err(self.out_of_bounds(self.bytes_read));
        }
        Ok(())
    }

    fn out_of_bounds(&self, consumed: u64) -> RiffError {
        Corruption::OutOfBounds {
            consumed,
            declared: self.size,
        }
        .into()
    }
}

impl<R: Read> ChunkRead for Reader<R> {
    fn read_chunk(&mut self) -> Result<Option<(Chunk, usize)>> {
        Reader::read_chunk(self)
    }
}

impl<R: Read> Iterator for Reader<R> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_chunk() {
            Ok(Some((chunk, _))) => Some(Ok(chunk)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<R: Read> std::iter::FusedIterator for Reader<R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::{self, Cursor};

    fn header(size: u32, file_type: &[u8; 4]) -> Vec<u8> {
        let mut data = b"RIFF".to_vec();
        data.extend_from_slice(&le_u32(size));
        data.extend_from_slice(file_type);
        data
    }

    fn chunk_bytes(id: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut data = id.to_vec();
        data.extend_from_slice(&le_u32(payload.len() as u32));
        data.extend_from_slice(&pad(payload));
        data
    }

    /// Replays a scripted sequence of read results.
    #[derive(Debug)]
    struct ScriptedReader {
        reads: VecDeque<io::Result<Vec<u8>>>,
    }

    impl ScriptedReader {
        fn new() -> Self {
            Self {
                reads: VecDeque::new(),
            }
        }

        fn then(mut self, data: &[u8]) -> Self {
            self.reads.push_back(Ok(data.to_vec()));
            self
        }

        fn then_err(mut self, msg: &str) -> Self {
            self.reads
                .push_back(Err(io::Error::new(io::ErrorKind::Other, msg.to_string())));
            self
        }
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                None => Ok(0),
                Some(Err(e)) => Err(e),
                Some(Ok(data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    if n < data.len() {
                        self.reads.push_front(Ok(data[n..].to_vec()));
                    }
                    Ok(n)
                }
            }
        }
    }

    #[test]
    fn parses_header() {
        let r = Reader::new(Cursor::new(header(4, b"WAVE"))).unwrap();
        assert_eq!(r.file_type(), FileType::WAVE);
        assert_eq!(r.size(), 4);
        assert_eq!(r.bytes_read(), 4);
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut data = header(4, b"WAVE");
        data[..4].copy_from_slice(b"RIFX");
        let err = Reader::new(Cursor::new(data)).unwrap_err();
        assert!(matches!(
            err,
            RiffError::Corrupted(Corruption::NotRiff(_))
        ));
    }

    #[test]
    fn rejects_impossibly_small_size() {
        let err = Reader::new(Cursor::new(header(3, b"WAVE"))).unwrap_err();
        assert!(matches!(
            err,
            RiffError::Corrupted(Corruption::SizeTooSmall(3))
        ));
    }

    #[test]
    fn short_or_empty_header_is_corruption() {
        let err = Reader::new(Cursor::new(Vec::new())).unwrap_err();
        assert!(err.is_corrupted());
        let err = Reader::new(Cursor::new(b"RIFF\x04\x00".to_vec())).unwrap_err();
        assert!(err.is_corrupted());
    }

    #[test]
    fn header_transport_error_passes_through() {
        let err = Reader::new(ScriptedReader::new().then_err("boom")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn reads_chunk() {
        let mut data = header(4 + 12, b"WAVE");
        data.extend(chunk_bytes(b"data", &[1, 2, 3, 4]));
        let mut r = Reader::new(Cursor::new(data)).unwrap();

        let (chunk, n) = r.read_chunk().unwrap().unwrap();
        assert_eq!(n, 12);
        assert_eq!(chunk, Chunk::new(FourCC::DATA, vec![1, 2, 3, 4]));
        assert!(r.read_chunk().unwrap().is_none());
    }

    #[test]
    fn padding_is_consumed_but_not_exposed() {
        let mut data = header(4 + 14, b"WAVE");
        data.extend(chunk_bytes(b"data", &[1, 2, 3, 4, 5]));
        let mut r = Reader::new(Cursor::new(data)).unwrap();

        let (chunk, n) = r.read_chunk().unwrap().unwrap();
        assert_eq!(n, 14);
        assert_eq!(chunk.data, vec![1, 2, 3, 4, 5]);
        assert_eq!(r.bytes_read(), 18);
    }

    #[test]
    fn reads_two_chunk_wave_stream() {
        let mut data = header(42, b"WAVE");
        data.extend(chunk_bytes(b"fmt ", &[1, 2, 3, 4, 5]));
        data.extend(chunk_bytes(b"data", &[1, 2, 3, 4, 5, 6, 7, 8]));
        let mut r = Reader::new(Cursor::new(data)).unwrap();

        let (first, n1) = r.read_chunk().unwrap().unwrap();
        let (second, n2) = r.read_chunk().unwrap().unwrap();
        assert_eq!(n1 + n2, 30);
        assert_eq!(first, Chunk::new(FourCC::FMT, vec![1, 2, 3, 4, 5]));
        assert_eq!(second, Chunk::new(FourCC::DATA, vec![1, 2, 3, 4, 5, 6, 7, 8]));
        assert!(r.read_chunk().unwrap().is_none());
    }

    #[test]
    fn read_to_end_collects_in_order() {
        let mut data = header(42, b"WAVE");
        data.extend(chunk_bytes(b"fmt ", &[1, 2, 3, 4, 5]));
        data.extend(chunk_bytes(b"data", &[1, 2, 3, 4, 5, 6, 7, 8]));
        let mut r = Reader::new(Cursor::new(data)).unwrap();

        let mut chunks = Vec::new();
        assert_eq!(r.read_to_end(&mut chunks).unwrap(), 2);
        assert_eq!(chunks[0].id, FourCC::FMT);
        assert_eq!(chunks[0].data, vec![1, 2, 3, 4, 5]);
        assert_eq!(chunks[1].id, FourCC::DATA);
        assert_eq!(chunks[1].data, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn read_to_end_keeps_chunks_before_failure() {
        let mut data = header(64, b"WAVE");
        data.extend(chunk_bytes(b"data", &[7, 7]));
        data.extend_from_slice(b"LIST\x10\x00\x00\x00abc");
        let mut r = Reader::new(Cursor::new(data)).unwrap();

        let mut chunks = Vec::new();
        let err = r.read_to_end(&mut chunks).unwrap_err();
        assert!(matches!(err, RiffError::Corrupted(Corruption::ShortRead)));
        assert_eq!(chunks, vec![Chunk::new(FourCC::DATA, vec![7, 7])]);
    }

    #[test]
    fn iterates_chunks() {
        let mut data = header(4 + 10 + 10, b"WEBP");
        data.extend(chunk_bytes(b"VP8 ", &[1, 2]));
        data.extend(chunk_bytes(b"EXIF", &[3]));
        let r = Reader::new(Cursor::new(data)).unwrap();

        let ids = r
            .map(|chunk| chunk.map(|c| c.id.to_string()))
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(ids, vec!["VP8 ", "EXIF"]);
    }

    #[test]
    fn data_past_declared_size_is_corruption() {
        let mut data = header(4 + 12, b"WAVE");
        data.extend(chunk_bytes(b"data", &[1, 2, 3, 4]));
        data.extend(chunk_bytes(b"junk", &[1, 2]));
        let mut r = Reader::new(Cursor::new(data)).unwrap();

        r.read_chunk().unwrap().unwrap();
        let err = r.read_chunk().unwrap_err();
        assert!(matches!(
            err,
            RiffError::Corrupted(Corruption::OutOfBounds { .. })
        ));
    }

    #[test]
    fn oversized_chunk_is_rejected_before_reading_payload() {
        let mut data = header(32, b"WAVE");
        data.extend_from_slice(b"data\xff\xff\xff\xff");
        let mut r = Reader::new(Cursor::new(data)).unwrap();

        let err = r.read_chunk().unwrap_err();
        assert!(matches!(
            err,
            RiffError::Corrupted(Corruption::OutOfBounds { .. })
        ));
    }

    #[test]
    fn overflowing_consumption_is_corruption() {
        let mut data = header(32, b"WAVE");
        data.extend_from_slice(&[0, 14, 90, 32]);
        let mut r = Reader::new(Cursor::new(data)).unwrap();
        r.bytes_read = u32::MAX as u64;

        assert!(r.read_chunk().unwrap_err().is_corrupted());
    }

    #[test]
    fn transport_error_on_chunk_header_passes_through() {
        let src = ScriptedReader::new().then(&header(32, b"WAVE")).then_err("read error");
        let mut r = Reader::new(src).unwrap();

        let err = r.read_chunk().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn short_chunk_header_is_corruption() {
        let src = ScriptedReader::new().then(&header(32, b"WAVE")).then(&[4, 3, 1]);
        let mut r = Reader::new(src).unwrap();

        assert!(matches!(
            r.read_chunk().unwrap_err(),
            RiffError::Corrupted(Corruption::ShortRead)
        ));
    }

    #[test]
    fn transport_error_on_payload_passes_through() {
        let src = ScriptedReader::new()
            .then(&header(32, b"WAVE"))
            .then(&[42, 42, 42, 42, 4, 0, 0, 0])
            .then_err("read error");
        let mut r = Reader::new(src).unwrap();

        assert_eq!(r.read_chunk().unwrap_err().kind(), ErrorKind::Transport);
        assert_eq!(r.bytes_read(), 12);
    }

    #[test]
    fn partial_payload_counts_towards_bytes_read() {
        let src = ScriptedReader::new()
            .then(&header(32, b"WAVE"))
            .then(&[42, 42, 42, 42, 6, 0, 0, 0])
            .then(&[1, 2, 3])
            .then_err("read error");
        let mut r = Reader::new(src).unwrap();

        assert_eq!(r.read_chunk().unwrap_err().kind(), ErrorKind::Transport);
        assert_eq!(r.bytes_read(), 15);
    }

    #[test]
    fn oversized_chunk_does_not_touch_payload() {
        let src = ScriptedReader::new()
            .then(&header(12, b"WAVE"))
            .then(&[42, 42, 42, 42, 9, 0, 0, 0])
            .then_err("read error");
        let mut r = Reader::new(src).unwrap();

        assert!(matches!(
            r.read_chunk().unwrap_err(),
            RiffError::Corrupted(Corruption::OutOfBounds {
                consumed: 22,
                declared: 12
            })
        ));
        assert_eq!(r.bytes_read(), 12);
    }

    #[test]
    fn iteration_stops_after_an_error() {
        let src = ScriptedReader::new()
            .then(&header(32, b"WAVE"))
            .then_err("read error")
            .then_err("read error")
            .then(&chunk_bytes(b"data", &[1, 2]));
        let mut r = Reader::new(src).unwrap();

        assert!(r.next().unwrap().is_err());
        assert!(r.next().is_none());
        assert!(r.next().is_none());

        let src = ScriptedReader::new()
            .then(&header(32, b"WAVE"))
            .then_err("read error")
            .then_err("read error");
        let r = Reader::new(src).unwrap();
        assert_eq!(r.filter_map(|chunk| chunk.ok()).count(), 0);
    }

    #[test]
    fn truncated_payload_is_corruption() {
        let src = ScriptedReader::new()
            .then(&header(32, b"WAVE"))
            .then(&[42, 42, 42, 42, 5, 0, 0, 0])
            .then(&[1, 2]);
        let mut r = Reader::new(src).unwrap();

        assert!(matches!(
            r.read_chunk().unwrap_err(),
            RiffError::Corrupted(Corruption::ShortRead)
        ));
    }
}
