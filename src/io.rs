//! Seek-driven primitives over a DEX image.
//!
//! Every read in this crate goes through a reader implementing
//! [`std::io::Read`] and [`std::io::Seek`]; this module extends those with
//! the fixed-width and variable-length integer reads the DEX format is
//! built from. All multi-byte reads are little-endian.

use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::DexError;
use crate::Result;

/// A LEB128 encoding of a 32-bit value spans at most five bytes.
const LEB128_MAX_BYTES: u32 = 5;

pub trait ReadExt: Read + Seek {
    /// Seeks to an absolute offset from the start of the image.
    fn goto(&mut self, offset: u64) -> Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn pos(&mut self) -> Result<u64> {
        Ok(self.stream_position()?)
    }

    fn read_ubyte(&mut self) -> Result<u8> {
        let offset = self.pos()?;
        ReadBytesExt::read_u8(self).map_err(|e| truncated(e, offset))
    }

    fn read_ushort(&mut self) -> Result<u16> {
        let offset = self.pos()?;
        ReadBytesExt::read_u16::<LittleEndian>(self).map_err(|e| truncated(e, offset))
    }

    fn read_uint(&mut self) -> Result<u32> {
        let offset = self.pos()?;
        ReadBytesExt::read_u32::<LittleEndian>(self).map_err(|e| truncated(e, offset))
    }

    fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let offset = self.pos()?;
        let mut buf = vec![0u8; n];
        self.read_exact(&mut buf).map_err(|e| truncated(e, offset))?;
        Ok(buf)
    }

    fn read_uleb128(&mut self) -> Result<u32> {
        let start = self.pos()?;
        let mut value: u32 = 0;
        for i in 0..LEB128_MAX_BYTES {
            let byte = self.read_ubyte()?;
            value |= ((byte & 0x7F) as u32) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(DexError::LebOverflow { offset: start })
    }

    fn read_sleb128(&mut self) -> Result<i32> {
        let start = self.pos()?;
        let mut value: i32 = 0;
        let mut shift = 0;
        for _ in 0..LEB128_MAX_BYTES {
            let byte = self.read_ubyte()?;
            value |= ((byte & 0x7F) as i32) << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                if shift < 32 && byte & 0x40 != 0 {
                    value |= -1i32 << shift;
                }
                return Ok(value);
            }
        }
        Err(DexError::LebOverflow { offset: start })
    }
}

impl<R: Read + Seek> ReadExt for R {}

fn truncated(e: io::Error, offset: u64) -> DexError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        DexError::Truncated { offset }
    } else {
        DexError::Io(e)
    }
}

/// Maps a [`binrw`] failure for a record read at `offset` into the crate
/// error, turning a short read into [`DexError::Truncated`].
pub(crate) fn record_error(e: binrw::Error, offset: u64) -> DexError {
    if e.is_eof() {
        DexError::Truncated { offset }
    } else {
        DexError::Parse(e)
    }
}
