use binrw::meta::{EndianKind, ReadEndian};
use binrw::{BinRead, Endian};
use bitflags::bitflags;
use std::{io, result};

use crate::io::ReadExt;

/// 8bit signed int
pub type Byte = i8;

/// 8bit unsigned int
pub type UByte = u8;

/// 16bit signed int
pub type Short = i16;

/// 16bit unsigned int
pub type UShort = u16;

/// 32bit signed int
pub type Int = i32;

/// 32bit unsigned int
pub type UInt = u32;

/// 64bit signed int
pub type Long = i64;

/// 64bit unsigned int
pub type ULong = u64;

/// SHA-1 signature type alias
pub type SHA1Signature = [UByte; 20];

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccessFlags: UInt {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;

        /// @note Only valid for methods.
        const SYNCHRONIZED = 0x0020;

        /// @note Only valid for fields.
        const VOLATILE = 0x0040;

        /// @note Only valid for methods.
        const BRIDGE = 0x0040;

        /// @note Only valid for fields.
        const TRANSIENT = 0x0080;

        /// @note Only valid for methods.
        const VARARGS = 0x0080;

        /// @note Only valid for methods.
        const NATIVE = 0x0100;

        /// @note Only valid for classes.
        const INTERFACE = 0x0200;

        /// @note Only valid for classes and methods.
        const ABSTRACT = 0x0400;

        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;

        /// @note Only valid for classes.
        const ANNOTATION = 0x2000;

        /// @note Only valid for classes and fields.
        const ENUM = 0x4000;

        const MANDATED = 0x8000;

        /// @note Only valid for methods.
        const CONSTRUCTOR = 0x10000;

        /// @note Only valid for methods.
        const DECLARED_SYNCHRONIZED = 0x20000;
    }
}

/// unsigned LEB128, variable-length
///
/// Android only uses LEB128 to encode 32bit entities, so the payload of
/// this wrapper is a u32. Reading enforces the resulting five byte limit.
#[derive(Debug, Clone, Copy)]
pub struct ULeb128(pub u32);

impl ReadEndian for ULeb128 {
    const ENDIAN: EndianKind = EndianKind::None;
}

impl BinRead for ULeb128 {
    type Args<'a> = ();

    fn read_options<R: io::Read + io::Seek>(
        reader: &mut R,
        _: Endian,
        _: Self::Args<'_>,
    ) -> result::Result<Self, binrw::Error> {
        match reader.read_uleb128() {
            Ok(x) => Ok(Self(x)),
            Err(e) => Err(binrw::Error::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                e,
            ))),
        }
    }
}
