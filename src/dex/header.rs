use binrw::binread;
use openssl::sha;
use std::io::{Read, Seek};

use super::types::*;
use crate::error::DexError;
use crate::io::ReadExt;
use crate::Result;

/// The magic number at the start of every DEX file, b'dex\n'.
pub const DEX_FILE_MAGIC: [UByte; 4] = [0x64, 0x65, 0x78, 0x0a];

/// Default endianness constant indicator
pub const ENDIAN_CONSTANT: UInt = 0x12345678;

/// Reverse endianness constant indicator
///
/// Files with this constant have performed byte-swapping and are not
/// supported by this crate.
pub const REVERSE_ENDIAN_CONSTANT: UInt = 0x78563412;

/// The constant `NO_INDEX` is used to indicate that an index value is
/// absent, e.g. the superclass of `java.lang.Object`.
pub const NO_INDEX: UInt = 0xFFFF_FFFF;

/// Header item size
pub const HEADER_SIZE: usize = 0x70;

/// The magic of a DEX file: the `dex\n` prefix followed by a three digit
/// ASCII version number and a trailing null byte.
#[binread]
#[br(little)]
#[derive(Debug, Clone, Copy)]
pub struct Magic {
    prefix: [UByte; 4],
    version: [UByte; 4],
}

impl Magic {
    /// Whether this magic carries the `dex\n` prefix and a well-formed
    /// version field. Any three digit version is accepted.
    pub fn is_valid(&self) -> bool {
        self.prefix == DEX_FILE_MAGIC
            && self.version[..3].iter().all(u8::is_ascii_digit)
            && self.version[3] == 0x00
    }

    /// Returns the version as a u32, or `None` for a malformed field.
    pub fn version_num(&self) -> Option<UInt> {
        String::from_utf8_lossy(&self.version[..3]).parse().ok()
    }

    pub fn raw(&self) -> [UByte; 8] {
        let mut out = [0u8; 8];
        out[..4].copy_from_slice(&self.prefix);
        out[4..].copy_from_slice(&self.version);
        out
    }
}

/// Header item data structure
///
/// All offsets are absolute from the start of the file; each pool is
/// described by a `{size, offset}` pair. The checksum and signature are
/// exposed verbatim and only validated by [`HeaderItem::verify`].
#[binread]
#[br(little)]
#[derive(Debug)]
pub struct HeaderItem {
    /// magic value
    pub magic: Magic,

    /// Adler32 checksum of the rest of the file (everything but `magic`
    /// and this field)
    pub checksum: UInt,

    /// SHA-1 hash of the rest of the file (everything but `magic`,
    /// `checksum`, and this field)
    pub signature: SHA1Signature,

    /// size of the entire file including the header
    pub file_size: UInt,

    /// size of this struct, always 0x70
    pub header_size: UInt,

    /// endianness specification
    pub endian_tag: UInt,

    /// size of the link section, or 0 if this file isn't statically linked
    pub link_size: UInt,
    pub link_off: UInt,

    /// offset from the start of the file to the map item
    pub map_off: UInt,

    /// count of strings in the string identifiers list
    pub string_ids_size: UInt,
    pub string_ids_off: UInt,

    /// count of elements in the type identifiers list
    pub type_ids_size: UInt,
    pub type_ids_off: UInt,

    /// count of elements in the proto identifiers list
    pub proto_ids_size: UInt,
    pub proto_ids_off: UInt,

    /// count of elements in the field identifiers list
    pub field_ids_size: UInt,
    pub field_ids_off: UInt,

    /// count of elements in the method identifiers list
    pub method_ids_size: UInt,
    pub method_ids_off: UInt,

    /// count of elements in the class definitions list
    pub class_defs_size: UInt,
    pub class_defs_off: UInt,

    /// size of the data section (in bytes)
    pub data_size: UInt,
    pub data_off: UInt,
}

impl HeaderItem {
    /// Checks magic, endian tag and pool offsets against the actual source
    /// length. Runs as part of `Dex::open`; checksum and signature are not
    /// touched here.
    pub(crate) fn validate(&self, source_len: u64) -> Result<()> {
        if !self.magic.is_valid() {
            return Err(DexError::BadMagic(self.magic.raw()));
        }

        if self.endian_tag != ENDIAN_CONSTANT {
            return Err(DexError::UnsupportedEndian(self.endian_tag));
        }

        let sections = [
            (self.link_off, "link"),
            (self.map_off, "map"),
            (self.string_ids_off, "string_ids"),
            (self.type_ids_off, "type_ids"),
            (self.proto_ids_off, "proto_ids"),
            (self.field_ids_off, "field_ids"),
            (self.method_ids_off, "method_ids"),
            (self.class_defs_off, "class_defs"),
            (self.data_off, "data"),
        ];
        for (offset, section) in sections {
            if offset as u64 > source_len {
                return Err(DexError::BadOffsetTooLarge {
                    offset,
                    size: source_len,
                    section,
                });
            }
        }
        Ok(())
    }

    /// Validates the Adler32 checksum and the SHA-1 signature against the
    /// image contents. Opt-in; parsing never requires it.
    pub fn verify<R>(&self, reader: &mut R) -> Result<()>
    where
        R: Read + Seek,
    {
        // The checksum covers everything after magic and checksum.
        reader.goto(12)?;
        let checksum = adler32::adler32(&mut *reader)?;
        if checksum != self.checksum {
            return Err(DexError::BadChecksum {
                actual: checksum,
                expected: self.checksum,
            });
        }

        // The signature covers everything after magic, checksum and the
        // signature field itself.
        reader.goto(32)?;
        let mut hasher = sha::Sha1::new();
        let mut buffer = [0u8; 1024];
        loop {
            let count = reader.read(&mut buffer)?;
            if count == 0 {
                break;
            }
            hasher.update(&buffer[..count]);
        }
        let digest = hasher.finish();
        if digest != self.signature {
            return Err(DexError::BadSignature {
                actual: digest,
                expected: self.signature,
            });
        }
        Ok(())
    }
}
