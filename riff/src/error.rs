use crate::types::{FileType, FourCC};
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiffError {
    /// Failure reported by the underlying transport, passed through verbatim.
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("corrupted: {0}")]
    Corrupted(#[from] Corruption),
    #[error("closed")]
    Closed,
    #[error("invalid chunk")]
    BadChunk,
    #[error("invalid format: {0}")]
    InvalidFormat(#[from] FormatError),
}

/// Coarse error category, for branching without looking at messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transport,
    Corrupted,
    Closed,
    BadChunk,
    InvalidFormat,
}

impl RiffError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RiffError::Io(_) => ErrorKind::Transport,
            RiffError::Corrupted(_) => ErrorKind::Corrupted,
            RiffError::Closed => ErrorKind::Closed,
            RiffError::BadChunk => ErrorKind::BadChunk,
            RiffError::InvalidFormat(_) => ErrorKind::InvalidFormat,
        }
    }

    pub fn is_corrupted(&self) -> bool {
        self.kind() == ErrorKind::Corrupted
    }
}

/// Structural or consistency violations found in RIFF data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Corruption {
    #[error("data does not begin with RIFF header (found {0})")]
    NotRiff(FileType),
    #[error("read fewer bytes than expected")]
    ShortRead,
    #[error("wrote fewer bytes than expected")]
    ShortWrite,
    #[error("impossibly small file size ({0})")]
    SizeTooSmall(u32),
    #[error("read outside file size ({consumed} bytes consumed, {declared} declared)")]
    OutOfBounds { consumed: u64, declared: u32 },
    #[error("wrote too many bytes - size overflow")]
    SizeOverflow,
    #[error("missing {0} chunk")]
    MissingChunk(FourCC),
    #[error("unexpected {found} chunk, should be {expected}")]
    UnexpectedChunk { expected: FourCC, found: FourCC },
    #[error("format chunk is invalid size ({0})")]
    FormatChunkLength(usize),
    #[error("invalid average bytes-per-second field (expected {expected}, was {found})")]
    ByteRateMismatch { expected: u32, found: u32 },
    #[error("invalid block alignment (expected {expected}, was {found})")]
    BlockAlignMismatch { expected: u16, found: u16 },
}

/// Field-level problems with a WAVE format, independent of any stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("channel count is zero")]
    ZeroChannels,
    #[error("sample rate is zero")]
    ZeroSampleRate,
    #[error("bits per sample must be a nonzero multiple of 8 (was {0})")]
    InvalidBitsPerSample(u16),
    #[error("derived byte rate or block alignment does not fit its field")]
    DerivedFieldOverflow,
}

/// An error raised partway through a multi-chunk write.
#[derive(Error, Debug)]
#[error("failed after writing {written} bytes: {source}")]
pub struct PartialWrite {
    pub written: usize,
    #[source]
    pub source: RiffError,
}

impl From<PartialWrite> for RiffError {
    fn from(err: PartialWrite) -> Self {
        err.source
    }
}

pub type Result<T> = std::result::Result<T, RiffError>;
