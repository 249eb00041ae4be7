use std::fmt::Debug;
use std::io;

use thiserror::Error;

#[derive(Error)]
pub enum DexError {
    #[error("Bad file magic: {0:02x?}")]
    BadMagic([u8; 8]),

    #[error("Unsupported endian tag: {0:#010x}")]
    UnsupportedEndian(u32),

    #[error("Unexpected end of image at offset {offset}")]
    Truncated { offset: u64 },

    #[error("Index({index}) to {pool} should be less than {count}")]
    OutOfRange {
        pool: &'static str,
        index: u32,
        count: u32,
    },

    #[error("LEB128 sequence at offset {offset} runs past five bytes")]
    LebOverflow { offset: u64 },

    #[error("Bad MUTF-8 data at offset {offset}: {reason}")]
    BadMutf8 { offset: u64, reason: &'static str },

    #[error("Malformed section map: {0}")]
    MalformedMap(String),

    #[error("Unknown opcode {opcode:#04x} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: u64 },

    #[error("Inconsistent operands for {mnemonic} at offset {offset}")]
    BadInstructionFormat {
        mnemonic: &'static str,
        offset: u64,
    },

    #[error("Offset({offset}) should be within file size {size} for {section}")]
    BadOffsetTooLarge {
        offset: u32,
        size: u64,
        section: &'static str,
    },

    #[error("Unsupported encoded value type {value_type:#04x} at offset {offset}")]
    BadValue { value_type: u8, offset: u64 },

    #[error("Malformed class data: {0}")]
    BadClassData(String),

    #[error("Bad checksum: {actual:#010x}, expected {expected:#010x}")]
    BadChecksum { actual: u32, expected: u32 },

    #[error("Bad signature: {actual:02x?}, expected {expected:02x?}")]
    BadSignature {
        actual: [u8; 20],
        expected: [u8; 20],
    },

    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Parse(#[from] binrw::Error),
}

impl Debug for DexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}
