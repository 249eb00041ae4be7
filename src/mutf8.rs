//! Modified UTF-8 string data decoding.
//!
//! DEX string data is stored as MUTF-8, which is UTF-8 restricted to the
//! one-, two- and three-byte encodings: `U+0000` is encoded in two-byte
//! form (`C0 80`) and supplementary code points are stored as a surrogate
//! pair of two three-byte sequences. MUTF-8 is therefore an encoding of
//! UTF-16 code units rather than of Unicode scalar values.

use std::io::{Read, Seek};

use crate::error::DexError;
use crate::io::ReadExt;
use crate::Result;

/// Decodes the `string_data_item` the reader is positioned at: a ULEB128
/// code-unit count followed by that many MUTF-8 encoded UTF-16 code units.
///
/// The count drives the decode; the trailing null byte of the on-disk
/// record is not consulted. Unpaired surrogates are replaced during the
/// final UTF-16 conversion, keeping the code-unit count intact.
pub fn read<R: Read + Seek>(reader: &mut R) -> Result<String> {
    let utf16_len = reader.read_uleb128()? as usize;
    let units = read_code_units(reader, utf16_len)?;
    Ok(String::from_utf16_lossy(&units))
}

/// Decodes exactly `utf16_len` UTF-16 code units from the MUTF-8 byte
/// stream.
pub fn read_code_units<R: Read + Seek>(reader: &mut R, utf16_len: usize) -> Result<Vec<u16>> {
    let mut out: Vec<u16> = Vec::with_capacity(utf16_len);
    while out.len() < utf16_len {
        let offset = reader.pos()?;
        let byte = reader.read_ubyte()?;
        let unit = match byte >> 4 {
            0x00..=0x07 => {
                // 0xxx xxxx
                byte as u16
            }
            0x0C | 0x0D => {
                // 110x xxxx, one continuation; this range carries the
                // two-byte encoding of U+0000
                let two = continuation(reader)?;
                ((byte as u16 & 0x1F) << 6) | (two as u16 & 0x3F)
            }
            0x0E => {
                // 1110 xxxx, two continuations
                let two = continuation(reader)?;
                let three = continuation(reader)?;
                ((byte as u16 & 0x0F) << 12)
                    | ((two as u16 & 0x3F) << 6)
                    | (three as u16 & 0x3F)
            }
            _ => {
                return Err(DexError::BadMutf8 {
                    offset,
                    reason: "illegal lead byte",
                })
            }
        };
        out.push(unit);
    }
    Ok(out)
}

fn continuation<R: Read + Seek>(reader: &mut R) -> Result<u8> {
    let offset = reader.pos()?;
    let byte = reader.read_ubyte()?;
    if byte & 0xC0 != 0x80 {
        return Err(DexError::BadMutf8 {
            offset,
            reason: "bad continuation byte",
        });
    }
    Ok(byte)
}
