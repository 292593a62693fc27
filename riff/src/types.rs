use crate::error::*;
use byteorder::{ByteOrder, LE};
use std::borrow::Cow;
use std::convert::{TryFrom, TryInto};
use std::fmt;
use std::io::{self, Read, Write};
use std::str::FromStr;

/// Length of a chunk header: FourCC plus a u32 size.
pub const CHUNK_HEADER_LEN: usize = 8;

const WORD_LEN: u64 = 2;

macro_rules! tag {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Hash, PartialEq, Eq)]
        pub struct $name([u8; 4]);

        impl $name {
            pub const fn new(bytes: [u8; 4]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 4] {
                &self.0
            }
        }

        impl From<[u8; 4]> for $name {
            fn from(bytes: [u8; 4]) -> Self {
                Self(bytes)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(", stringify!($name))?;
                fmt::Display::fmt(&self, f)?;
                write!(f, ")")
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(
                    f,
                    "{}{}{}{}",
                    self.0[0] as char, self.0[1] as char, self.0[2] as char, self.0[3] as char,
                )
            }
        }
    };
}

tag! {
    /// Four-character code identifying a chunk.
    FourCC
}

tag! {
    /// Content type carried in the RIFF header, e.g. `WAVE`.
    FileType
}

impl FourCC {
    pub const RIFF: FourCC = FourCC(*b"RIFF");
    pub const FMT: FourCC = FourCC(*b"fmt ");
    pub const DATA: FourCC = FourCC(*b"data");
    pub const LIST: FourCC = FourCC(*b"LIST");
    pub const SMPL: FourCC = FourCC(*b"smpl");
    pub const WSMP: FourCC = FourCC(*b"wsmp");
}

impl FileType {
    pub const WAVE: FileType = FileType(*b"WAVE");
    pub const WEBP: FileType = FileType(*b"WEBP");
}

/// Accepts exactly four printable ASCII bytes, with spaces allowed only as
/// trailing padding.
impl<'a> TryFrom<&'a [u8]> for FourCC {
    type Error = RiffError;

    fn try_from(value: &'a [u8]) -> Result<Self> {
        let bytes: [u8; 4] = value.try_into().map_err(|_| RiffError::BadChunk)?;

        let mut has_spaces = false;
        for b in bytes.iter() {
            match b {
                b' ' => {
                    has_spaces = true;
                }
                0x21..=0x7e => {
                    if has_spaces {
                        return Err(RiffError::BadChunk);
                    }
                }

                _ => return Err(RiffError::BadChunk),
            }
        }

        Ok(Self(bytes))
    }
}

impl FromStr for FourCC {
    type Err = RiffError;

    fn from_str(s: &str) -> Result<Self> {
        Self::try_from(s.as_bytes())
    }
}

/// A RIFF chunk. The chunk's size is the length of `data`; padding is only
/// ever added on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: FourCC,
    pub data: Vec<u8>,
}

impl Chunk {
    pub fn new(id: FourCC, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            data: data.into(),
        }
    }

    /// Bytes this chunk occupies once written, header and padding included.
    pub fn byte_length(&self) -> u64 {
        CHUNK_HEADER_LEN as u64 + padded_length(self.data.len() as u64)
    }
}

/// Rounds `n` up to the next word boundary.
pub fn padded_length(n: u64) -> u64 {
    match n % WORD_LEN {
        0 => n,
        rem => n + (WORD_LEN - rem),
    }
}

/// Pads `data` with zeroes to the next word boundary, borrowing when no
/// padding is needed.
pub fn pad(data: &[u8]) -> Cow<'_, [u8]> {
    if data.len() as u64 % WORD_LEN == 0 {
        Cow::Borrowed(data)
    } else {
        let mut padded = Vec::with_capacity(data.len() + 1);
        padded.extend_from_slice(data);
        padded.push(0);
        Cow::Owned(padded)
    }
}

pub fn le_u16(value: u16) -> [u8; 2] {
    let mut buf = [0; 2];
    LE::write_u16(&mut buf, value);
    buf
}

pub fn le_u32(value: u32) -> [u8; 4] {
    let mut buf = [0; 4];
    LE::write_u32(&mut buf, value);
    buf
}

pub fn read_u16(data: &mut &[u8]) -> Result<u16> {
    if data.len() < 2 {
        return Err(Corruption::ShortRead.into());
    }
    let value = LE::read_u16(&data[0..2]);
    *data = &data[2..];
    Ok(value)
}

pub fn read_u32(data: &mut &[u8]) -> Result<u32> {
    if data.len() < 4 {
        return Err(Corruption::ShortRead.into());
    }
    let value = LE::read_u32(&data[0..4]);
    *data = &data[4..];
    Ok(value)
}

/// Reads until `buf` is full or the reader runs dry, returning the number of
/// bytes read.
pub(crate) fn read_full<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match r.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

/// Writes each slice in turn. The byte count reflects what the writer
/// actually accepted, including when an error cut the sequence short.
pub(crate) fn write_all_counted<W: Write + ?Sized>(
    w: &mut W,
    bufs: &[&[u8]],
) -> (usize, Result<()>) {
    let mut total = 0;
    for buf in bufs {
        let mut written = 0;
        while written < buf.len() {
            match w.write(&buf[written..]) {
                Ok(0) => return (total, Err(Corruption::ShortWrite.into())),
                Ok(n) => {
                    written += n;
                    total += n;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return (total, Err(e.into())),
            }
        }
    }
    (total, Ok(()))
}
