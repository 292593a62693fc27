//! The WAVE `fmt ` chunk.
//!
//! Every Wavefile starts with a format chunk describing its audio, followed
//! by the `data` chunk holding the samples:
//!
//! Offset | Size | Field
//! -----: | ---: | ---------------------------------------------
//!      0 |    4 | `"fmt "`
//!      4 |    4 | chunk size, always 16
//!      8 |    2 | audio format (1 for PCM)
//!     10 |    2 | channels
//!     12 |    4 | sample rate
//!     16 |    4 | byte rate: `sample_rate * bits_per_sample / 8 * channels`
//!     20 |    2 | block align: `bits_per_sample / 8 * channels`
//!     22 |    2 | bits per sample
//!
//! Byte rate and block align are redundant; they are recomputed when writing
//! and checked when reading.

use crate::error::*;
use crate::types::*;
use crate::{ChunkRead, ChunkWrite};
use std::convert::TryFrom;
use std::fmt;
use std::time::Duration;

/// On-wire length of the format chunk, header included.
pub const FORMAT_CHUNK_LEN: usize = CHUNK_HEADER_LEN + FORMAT_DATA_LEN;

const FORMAT_DATA_LEN: usize = 16;

/// Audio encoding code stored in the format chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat(pub u16);

impl AudioFormat {
    pub const PCM: AudioFormat = AudioFormat(1);
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            AudioFormat::PCM => write!(f, "PCM"),
            AudioFormat(code) => write!(f, "AudioFormat({})", code),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format {
    pub audio_format: AudioFormat,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl Format {
    pub fn pcm(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            audio_format: AudioFormat::PCM,
            channels,
            sample_rate,
            bits_per_sample,
        }
    }

    /// Bytes per sample frame, `bits_per_sample / 8 * channels`.
    pub fn block_align(&self) -> u16 {
        (self.bits_per_sample / 8).wrapping_mul(self.channels)
    }

    /// Bytes per second of audio, `sample_rate * bits_per_sample / 8 * channels`.
    pub fn bytes_per_second(&self) -> u32 {
        (self.sample_rate.wrapping_mul(self.bits_per_sample as u32) / 8)
            .wrapping_mul(self.channels as u32)
    }

    /// Checks that the format describes playable audio.
    pub fn validate(&self) -> std::result::Result<(), FormatError> {
        if self.channels == 0 {
            return Err(FormatError::ZeroChannels);
        }
        if self.sample_rate == 0 {
            return Err(FormatError::ZeroSampleRate);
        }
        if self.bits_per_sample == 0 || self.bits_per_sample % 8 != 0 {
            return Err(FormatError::InvalidBitsPerSample(self.bits_per_sample));
        }

        // Same operation order as the encoded fields.
        let block_align = (self.bits_per_sample / 8).checked_mul(self.channels);
        let bytes_per_second = self
            .sample_rate
            .checked_mul(self.bits_per_sample as u32)
            .and_then(|bits| (bits / 8).checked_mul(self.channels as u32));
        if block_align.is_none() || bytes_per_second.is_none() {
            return Err(FormatError::DerivedFieldOverflow);
        }
        Ok(())
    }

    /// Playback time of `data_len` bytes of samples in this format.
    pub fn audio_length(&self, data_len: u64) -> Duration {
        let block_align = self.block_align();
        if block_align == 0 || self.sample_rate == 0 {
            return Duration::from_secs(0);
        }
        let frames = data_len / block_align as u64;
        Duration::from_secs_f64(frames as f64 / self.sample_rate as f64)
    }

    fn to_bytes(&self) -> [u8; FORMAT_DATA_LEN] {
        let mut data = [0; FORMAT_DATA_LEN];
        data[0..2].copy_from_slice(&le_u16(self.audio_format.0));
        data[2..4].copy_from_slice(&le_u16(self.channels));
        data[4..8].copy_from_slice(&le_u32(self.sample_rate));
        data[8..12].copy_from_slice(&le_u32(self.bytes_per_second()));
        data[12..14].copy_from_slice(&le_u16(self.block_align()));
        data[14..16].copy_from_slice(&le_u16(self.bits_per_sample));
        data
    }

    pub fn to_chunk(&self) -> Chunk {
        Chunk::new(FourCC::FMT, &self.to_bytes()[..])
    }
}

/// Decodes a format chunk that has already been read.
impl<'a> TryFrom<&'a Chunk> for Format {
    type Error = RiffError;

    fn try_from(chunk: &'a Chunk) -> Result<Self> {
        if chunk.byte_length() != FORMAT_CHUNK_LEN as u64 {
            return Err(Corruption::FormatChunkLength(chunk.byte_length() as usize).into());
        }
        if chunk.id != FourCC::FMT {
            return Err(Corruption::UnexpectedChunk {
                expected: FourCC::FMT,
                found: chunk.id,
            }
            .into());
        }

        let mut data = &chunk.data[..];
        let audio_format = AudioFormat(read_u16(&mut data)?);
        let channels = read_u16(&mut data)?;
        let sample_rate = read_u32(&mut data)?;
        let byte_rate = read_u32(&mut data)?;
        let block_align = read_u16(&mut data)?;
        let bits_per_sample = read_u16(&mut data)?;

        let format = Format {
            audio_format,
            channels,
            sample_rate,
            bits_per_sample,
        };

        if byte_rate != format.bytes_per_second() {
            return Err(Corruption::ByteRateMismatch {
                expected: format.bytes_per_second(),
                found: byte_rate,
            }
            .into());
        }
        if block_align != format.block_align() {
            return Err(Corruption::BlockAlignMismatch {
                expected: format.block_align(),
                found: block_align,
            }
            .into());
        }

        Ok(format)
    }
}

/// Reads a single chunk from `r`, expecting it to be the Wavefile's format.
pub fn read_format<R: ChunkRead + ?Sized>(r: &mut R) -> Result<Format> {
    let (chunk, n) = r
        .read_chunk()?
        .ok_or(Corruption::MissingChunk(FourCC::FMT))?;
    if n != FORMAT_CHUNK_LEN {
        return Err(Corruption::FormatChunkLength(n).into());
    }
    Format::try_from(&chunk)
}

/// Writes `format` as the format chunk followed by `pcm` as the data chunk,
/// returning the total number of bytes written.
///
/// The data chunk is only attempted once the format chunk is out. On failure
/// the error carries the bytes written by the chunks that completed.
pub fn write_pcm<W: ChunkWrite + ?Sized>(
    w: &mut W,
    format: &Format,
    pcm: &[u8],
) -> std::result::Result<usize, PartialWrite> {
    let fmt_n = w
        .write_chunk(&format.to_chunk())
        .map_err(|source| PartialWrite { written: 0, source })?;

    let data_n = w
        .write_chunk(&Chunk::new(FourCC::DATA, pcm))
        .map_err(|source| PartialWrite {
            written: fmt_n,
            source,
        })?;

    Ok(fmt_n + data_n)
}
