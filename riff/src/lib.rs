//! Streaming support for RIFF (Resource Interchange File Format) data, the
//! container used by `.wav` and `.webp` files among others.
//!
//! A RIFF stream is a 12-byte header followed by chunks:
//!
//! Offset | Size | Data
//! -----: | ---: | ----------------------------------------------------
//!      0 |    4 | `"RIFF"`
//!      4 |    4 | u32 LE size of everything after this field
//!      8 |    4 | file type, e.g. `"WAVE"`
//!     12 |  ... | chunks: FourCC, u32 LE size, data, pad byte if odd
//!
//! [`Reader`] walks the chunks of a stream in order, checking them against
//! the declared size. [`Writer`] emits chunks and fills in the size when it
//! is closed, which is why it needs a sink it can write back into (see
//! [`WriteAt`]). The [`wave`] module reads and writes the WAVE format chunk
//! on top of both.

pub mod error;
pub mod reader;
pub mod types;
pub mod wave;
pub mod writer;

pub use error::{Corruption, ErrorKind, FormatError, PartialWrite, Result, RiffError};
pub use reader::Reader;
pub use types::{pad, padded_length, Chunk, FileType, FourCC, CHUNK_HEADER_LEN};
pub use writer::{WriteAt, Writer};

/// A source of RIFF chunks.
pub trait ChunkRead {
    /// Reads the next chunk along with the number of bytes it took up in the
    /// stream. `Ok(None)` marks a clean end of stream.
    fn read_chunk(&mut self) -> Result<Option<(Chunk, usize)>>;
}

/// A sink for RIFF chunks.
pub trait ChunkWrite {
    /// Writes `chunk`, returning the number of bytes written to the stream.
    fn write_chunk(&mut self, chunk: &Chunk) -> Result<usize>;
}
