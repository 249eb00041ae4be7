//! Dalvik executable instruction set decoding.
//!
//! More details can be taken from [Android Docs: Dalvik executable
//! instruction formats](https://source.android.com/docs/core/runtime/instruction-formats)
//!
//! Decoding is cursor driven: [`decode_insn`] reads exactly one
//! instruction at the given absolute file offset and advances the cursor
//! past its last byte. Every opcode maps to one of the Dalvik instruction
//! formats, which determines both the operand layout and the instruction
//! length in 16-bit code units. Pool-index operands are recorded as
//! `(pool, index)` pairs and never resolved here; that is the consumer's
//! job.

use std::io::{Read, Seek};

use binrw::BinRead;

use crate::dex::{FillArrayData, PackedSwitch, SparseSwitch};
use crate::error::DexError;
use crate::io::{record_error, ReadExt};
use crate::Result;

/// Identifies the pool an index operand resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    String,
    Type,
    Field,
    Method,
    Proto,
    CallSite,
    MethodHandle,
}

/// An unresolved pool reference carried by an instruction operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolRef {
    pub kind: PoolKind,
    pub index: u32,
}

/// The Dalvik instruction format taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Format10x,
    Format12x,
    Format11n,
    Format11x,
    Format10t,
    Format20t,
    Format22x,
    Format21t,
    Format21s,
    Format21h,
    Format21c,
    Format23x,
    Format22b,
    Format22t,
    Format22s,
    Format22c,
    Format30t,
    Format32x,
    Format31i,
    Format31t,
    Format31c,
    Format35c,
    Format3rc,
    Format45cc,
    Format4rcc,
    Format51l,
}

/// Static description of one opcode: its mnemonic, format and length in
/// 16-bit code units, plus the pool its index operand resolves against
/// where the format carries one.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeInfo {
    pub value: u8,
    pub name: &'static str,
    pub format: Format,
    pub units: u8,
    pub pool: Option<PoolKind>,
}

/// Decoded operands, one variant per instruction format.
///
/// Register fields keep the field names of the format specification
/// (`a`, `b`, `c`). Branch formats carry both the raw signed code-unit
/// delta and the absolute byte offset of the target. The `21h` literal is
/// already shifted to its canonical width.
#[derive(Debug, PartialEq)]
pub enum Operands {
    Format10x,
    Format12x { a: u8, b: u8 },
    Format11n { a: u8, b: i8 },
    Format11x { a: u8 },
    Format10t { delta: i8, target: u64 },
    Format20t { delta: i16, target: u64 },
    Format22x { a: u8, b: u16 },
    Format21t { a: u8, delta: i16, target: u64 },
    Format21s { a: u8, b: i16 },
    Format21h { a: u8, b: i64 },
    Format21c { a: u8, b: PoolRef },
    Format23x { a: u8, b: u8, c: u8 },
    Format22b { a: u8, b: u8, c: i8 },
    Format22t { a: u8, b: u8, delta: i16, target: u64 },
    Format22s { a: u8, b: u8, c: i16 },
    Format22c { a: u8, b: u8, c: PoolRef },
    Format30t { delta: i32, target: u64 },
    Format32x { a: u16, b: u16 },
    Format31i { a: u8, b: i32 },
    Format31t { a: u8, delta: i32, target: u64 },
    Format31c { a: u8, b: PoolRef },
    /// `args[..argc as usize]` are the argument registers.
    Format35c { argc: u8, args: [u8; 5], b: PoolRef },
    /// Registers `first .. first + count as u16` are the arguments.
    Format3rc { count: u8, first: u16, b: PoolRef },
    Format45cc { argc: u8, args: [u8; 5], b: PoolRef, h: PoolRef },
    Format4rcc { count: u8, first: u16, b: PoolRef, h: PoolRef },
    Format51l { a: u8, b: i64 },
    PackedSwitchPayload(PackedSwitch),
    SparseSwitchPayload(SparseSwitch),
    FillArrayDataPayload(FillArrayData),
}

/// A decoded instruction.
#[derive(Debug)]
pub struct Insn {
    /// mnemonic from the opcode table
    pub name: &'static str,

    /// the opcode byte; 0x00 for payload pseudo-instructions
    pub opcode: u8,

    /// total size in bytes, including any payload padding
    pub size: u32,

    /// absolute file offset of the first code unit
    pub offset: u64,

    pub operands: Operands,
}

macro_rules! op {
    () => {
        None
    };
    ($name:literal := $value:literal $fmt:ident/$units:literal) => {
        Some(OpcodeInfo {
            value: $value,
            name: $name,
            format: Format::$fmt,
            units: $units,
            pool: None,
        })
    };
    ($name:literal := $value:literal $fmt:ident/$units:literal @ $pool:ident) => {
        Some(OpcodeInfo {
            value: $value,
            name: $name,
            format: Format::$fmt,
            units: $units,
            pool: Some(PoolKind::$pool),
        })
    };
}

/// The opcode table, indexed by opcode byte. Slots left `None` are
/// undefined in the Dalvik instruction set and fail decoding with
/// `UnknownOpcode`.
pub static OPCODES: [Option<OpcodeInfo>; 256] = [
    op! { "nop" := 0x00 Format10x/1 },
    // move ops
    op! { "move"               := 0x01 Format12x/1 },
    op! { "move/from16"        := 0x02 Format22x/2 },
    op! { "move/16"            := 0x03 Format32x/3 },
    op! { "move-wide"          := 0x04 Format12x/1 },
    op! { "move-wide/from16"   := 0x05 Format22x/2 },
    op! { "move-wide/16"       := 0x06 Format32x/3 },
    op! { "move-object"        := 0x07 Format12x/1 },
    op! { "move-object/from16" := 0x08 Format22x/2 },
    op! { "move-object/16"     := 0x09 Format32x/3 },
    op! { "move-result"        := 0x0A Format11x/1 },
    op! { "move-result-wide"   := 0x0B Format11x/1 },
    op! { "move-result-object" := 0x0C Format11x/1 },
    op! { "move-exception"     := 0x0D Format11x/1 },
    // return ops
    op! { "return-void"   := 0x0E Format10x/1 },
    op! { "return"        := 0x0F Format11x/1 },
    op! { "return-wide"   := 0x10 Format11x/1 },
    op! { "return-object" := 0x11 Format11x/1 },
    // const ops
    op! { "const/4"            := 0x12 Format11n/1 },
    op! { "const/16"           := 0x13 Format21s/2 },
    op! { "const"              := 0x14 Format31i/3 },
    op! { "const/high16"       := 0x15 Format21h/2 },
    op! { "const-wide/16"      := 0x16 Format21s/2 },
    op! { "const-wide/32"      := 0x17 Format31i/3 },
    op! { "const-wide"         := 0x18 Format51l/5 },
    op! { "const-wide/high16"  := 0x19 Format21h/2 },
    op! { "const-string"       := 0x1A Format21c/2 @ String },
    op! { "const-string/jumbo" := 0x1B Format31c/3 @ String },
    op! { "const-class"        := 0x1C Format21c/2 @ Type },
    // monitor ops
    op! { "monitor-enter" := 0x1D Format11x/1 },
    op! { "monitor-exit"  := 0x1E Format11x/1 },
    op! { "check-cast"   := 0x1F Format21c/2 @ Type },
    op! { "instance-of"  := 0x20 Format22c/2 @ Type },
    op! { "array-length" := 0x21 Format12x/1 },
    // allocation ops
    op! { "new-instance"           := 0x22 Format21c/2 @ Type },
    op! { "new-array"              := 0x23 Format22c/2 @ Type },
    op! { "filled-new-array"       := 0x24 Format35c/3 @ Type },
    op! { "filled-new-array/range" := 0x25 Format3rc/3 @ Type },
    op! { "fill-array-data"        := 0x26 Format31t/3 },
    op! { "throw" := 0x27 Format11x/1 },
    // goto ops
    op! { "goto"    := 0x28 Format10t/1 },
    op! { "goto/16" := 0x29 Format20t/2 },
    op! { "goto/32" := 0x2A Format30t/3 },
    // switch ops; the tables live behind the data-offset operand
    op! { "packed-switch" := 0x2B Format31t/3 },
    op! { "sparse-switch" := 0x2C Format31t/3 },
    // comparisons
    op! { "cmpl-float"  := 0x2D Format23x/2 },
    op! { "cmpg-float"  := 0x2E Format23x/2 },
    op! { "cmpl-double" := 0x2F Format23x/2 },
    op! { "cmpg-double" := 0x30 Format23x/2 },
    op! { "cmp-long"    := 0x31 Format23x/2 },
    // if ops
    op! { "if-eq"  := 0x32 Format22t/2 },
    op! { "if-ne"  := 0x33 Format22t/2 },
    op! { "if-lt"  := 0x34 Format22t/2 },
    op! { "if-ge"  := 0x35 Format22t/2 },
    op! { "if-gt"  := 0x36 Format22t/2 },
    op! { "if-le"  := 0x37 Format22t/2 },
    op! { "if-eqz" := 0x38 Format21t/2 },
    op! { "if-nez" := 0x39 Format21t/2 },
    op! { "if-ltz" := 0x3A Format21t/2 },
    op! { "if-gez" := 0x3B Format21t/2 },
    op! { "if-gtz" := 0x3C Format21t/2 },
    op! { "if-lez" := 0x3D Format21t/2 },
    // unused
    op!(),
    op!(),
    op!(),
    op!(),
    op!(),
    op!(),
    // array ops
    op! { "aget"         := 0x44 Format23x/2 },
    op! { "aget-wide"    := 0x45 Format23x/2 },
    op! { "aget-object"  := 0x46 Format23x/2 },
    op! { "aget-boolean" := 0x47 Format23x/2 },
    op! { "aget-byte"    := 0x48 Format23x/2 },
    op! { "aget-char"    := 0x49 Format23x/2 },
    op! { "aget-short"   := 0x4A Format23x/2 },
    op! { "aput"         := 0x4B Format23x/2 },
    op! { "aput-wide"    := 0x4C Format23x/2 },
    op! { "aput-object"  := 0x4D Format23x/2 },
    op! { "aput-boolean" := 0x4E Format23x/2 },
    op! { "aput-byte"    := 0x4F Format23x/2 },
    op! { "aput-char"    := 0x50 Format23x/2 },
    op! { "aput-short"   := 0x51 Format23x/2 },
    // instance field ops
    op! { "iget"         := 0x52 Format22c/2 @ Field },
    op! { "iget-wide"    := 0x53 Format22c/2 @ Field },
    op! { "iget-object"  := 0x54 Format22c/2 @ Field },
    op! { "iget-boolean" := 0x55 Format22c/2 @ Field },
    op! { "iget-byte"    := 0x56 Format22c/2 @ Field },
    op! { "iget-char"    := 0x57 Format22c/2 @ Field },
    op! { "iget-short"   := 0x58 Format22c/2 @ Field },
    op! { "iput"         := 0x59 Format22c/2 @ Field },
    op! { "iput-wide"    := 0x5A Format22c/2 @ Field },
    op! { "iput-object"  := 0x5B Format22c/2 @ Field },
    op! { "iput-boolean" := 0x5C Format22c/2 @ Field },
    op! { "iput-byte"    := 0x5D Format22c/2 @ Field },
    op! { "iput-char"    := 0x5E Format22c/2 @ Field },
    op! { "iput-short"   := 0x5F Format22c/2 @ Field },
    // static field ops
    op! { "sget"         := 0x60 Format21c/2 @ Field },
    op! { "sget-wide"    := 0x61 Format21c/2 @ Field },
    op! { "sget-object"  := 0x62 Format21c/2 @ Field },
    op! { "sget-boolean" := 0x63 Format21c/2 @ Field },
    op! { "sget-byte"    := 0x64 Format21c/2 @ Field },
    op! { "sget-char"    := 0x65 Format21c/2 @ Field },
    op! { "sget-short"   := 0x66 Format21c/2 @ Field },
    op! { "sput"         := 0x67 Format21c/2 @ Field },
    op! { "sput-wide"    := 0x68 Format21c/2 @ Field },
    op! { "sput-object"  := 0x69 Format21c/2 @ Field },
    op! { "sput-boolean" := 0x6A Format21c/2 @ Field },
    op! { "sput-byte"    := 0x6B Format21c/2 @ Field },
    op! { "sput-char"    := 0x6C Format21c/2 @ Field },
    op! { "sput-short"   := 0x6D Format21c/2 @ Field },
    // invoke ops
    op! { "invoke-virtual"   := 0x6E Format35c/3 @ Method },
    op! { "invoke-super"     := 0x6F Format35c/3 @ Method },
    op! { "invoke-direct"    := 0x70 Format35c/3 @ Method },
    op! { "invoke-static"    := 0x71 Format35c/3 @ Method },
    op! { "invoke-interface" := 0x72 Format35c/3 @ Method },
    // unused
    op!(),
    op! { "invoke-virtual/range"   := 0x74 Format3rc/3 @ Method },
    op! { "invoke-super/range"     := 0x75 Format3rc/3 @ Method },
    op! { "invoke-direct/range"    := 0x76 Format3rc/3 @ Method },
    op! { "invoke-static/range"    := 0x77 Format3rc/3 @ Method },
    op! { "invoke-interface/range" := 0x78 Format3rc/3 @ Method },
    // unused
    op!(),
    op!(),
    // unary ops
    op! { "neg-int"         := 0x7B Format12x/1 },
    op! { "not-int"         := 0x7C Format12x/1 },
    op! { "neg-long"        := 0x7D Format12x/1 },
    op! { "not-long"        := 0x7E Format12x/1 },
    op! { "neg-float"       := 0x7F Format12x/1 },
    op! { "neg-double"      := 0x80 Format12x/1 },
    op! { "int-to-long"     := 0x81 Format12x/1 },
    op! { "int-to-float"    := 0x82 Format12x/1 },
    op! { "int-to-double"   := 0x83 Format12x/1 },
    op! { "long-to-int"     := 0x84 Format12x/1 },
    op! { "long-to-float"   := 0x85 Format12x/1 },
    op! { "long-to-double"  := 0x86 Format12x/1 },
    op! { "float-to-int"    := 0x87 Format12x/1 },
    op! { "float-to-long"   := 0x88 Format12x/1 },
    op! { "float-to-double" := 0x89 Format12x/1 },
    op! { "double-to-int"   := 0x8A Format12x/1 },
    op! { "double-to-long"  := 0x8B Format12x/1 },
    op! { "double-to-float" := 0x8C Format12x/1 },
    op! { "int-to-byte"     := 0x8D Format12x/1 },
    op! { "int-to-char"     := 0x8E Format12x/1 },
    op! { "int-to-short"    := 0x8F Format12x/1 },
    // binary ops
    op! { "add-int"    := 0x90 Format23x/2 },
    op! { "sub-int"    := 0x91 Format23x/2 },
    op! { "mul-int"    := 0x92 Format23x/2 },
    op! { "div-int"    := 0x93 Format23x/2 },
    op! { "rem-int"    := 0x94 Format23x/2 },
    op! { "and-int"    := 0x95 Format23x/2 },
    op! { "or-int"     := 0x96 Format23x/2 },
    op! { "xor-int"    := 0x97 Format23x/2 },
    op! { "shl-int"    := 0x98 Format23x/2 },
    op! { "shr-int"    := 0x99 Format23x/2 },
    op! { "ushr-int"   := 0x9A Format23x/2 },
    op! { "add-long"   := 0x9B Format23x/2 },
    op! { "sub-long"   := 0x9C Format23x/2 },
    op! { "mul-long"   := 0x9D Format23x/2 },
    op! { "div-long"   := 0x9E Format23x/2 },
    op! { "rem-long"   := 0x9F Format23x/2 },
    op! { "and-long"   := 0xA0 Format23x/2 },
    op! { "or-long"    := 0xA1 Format23x/2 },
    op! { "xor-long"   := 0xA2 Format23x/2 },
    op! { "shl-long"   := 0xA3 Format23x/2 },
    op! { "shr-long"   := 0xA4 Format23x/2 },
    op! { "ushr-long"  := 0xA5 Format23x/2 },
    op! { "add-float"  := 0xA6 Format23x/2 },
    op! { "sub-float"  := 0xA7 Format23x/2 },
    op! { "mul-float"  := 0xA8 Format23x/2 },
    op! { "div-float"  := 0xA9 Format23x/2 },
    op! { "rem-float"  := 0xAA Format23x/2 },
    op! { "add-double" := 0xAB Format23x/2 },
    op! { "sub-double" := 0xAC Format23x/2 },
    op! { "mul-double" := 0xAD Format23x/2 },
    op! { "div-double" := 0xAE Format23x/2 },
    op! { "rem-double" := 0xAF Format23x/2 },
    // binary ops, two-address form
    op! { "add-int/2addr"    := 0xB0 Format12x/1 },
    op! { "sub-int/2addr"    := 0xB1 Format12x/1 },
    op! { "mul-int/2addr"    := 0xB2 Format12x/1 },
    op! { "div-int/2addr"    := 0xB3 Format12x/1 },
    op! { "rem-int/2addr"    := 0xB4 Format12x/1 },
    op! { "and-int/2addr"    := 0xB5 Format12x/1 },
    op! { "or-int/2addr"     := 0xB6 Format12x/1 },
    op! { "xor-int/2addr"    := 0xB7 Format12x/1 },
    op! { "shl-int/2addr"    := 0xB8 Format12x/1 },
    op! { "shr-int/2addr"    := 0xB9 Format12x/1 },
    op! { "ushr-int/2addr"   := 0xBA Format12x/1 },
    op! { "add-long/2addr"   := 0xBB Format12x/1 },
    op! { "sub-long/2addr"   := 0xBC Format12x/1 },
    op! { "mul-long/2addr"   := 0xBD Format12x/1 },
    op! { "div-long/2addr"   := 0xBE Format12x/1 },
    op! { "rem-long/2addr"   := 0xBF Format12x/1 },
    op! { "and-long/2addr"   := 0xC0 Format12x/1 },
    op! { "or-long/2addr"    := 0xC1 Format12x/1 },
    op! { "xor-long/2addr"   := 0xC2 Format12x/1 },
    op! { "shl-long/2addr"   := 0xC3 Format12x/1 },
    op! { "shr-long/2addr"   := 0xC4 Format12x/1 },
    op! { "ushr-long/2addr"  := 0xC5 Format12x/1 },
    op! { "add-float/2addr"  := 0xC6 Format12x/1 },
    op! { "sub-float/2addr"  := 0xC7 Format12x/1 },
    op! { "mul-float/2addr"  := 0xC8 Format12x/1 },
    op! { "div-float/2addr"  := 0xC9 Format12x/1 },
    op! { "rem-float/2addr"  := 0xCA Format12x/1 },
    op! { "add-double/2addr" := 0xCB Format12x/1 },
    op! { "sub-double/2addr" := 0xCC Format12x/1 },
    op! { "mul-double/2addr" := 0xCD Format12x/1 },
    op! { "div-double/2addr" := 0xCE Format12x/1 },
    op! { "rem-double/2addr" := 0xCF Format12x/1 },
    // binary ops, 16-bit literal
    op! { "add-int/lit16"  := 0xD0 Format22s/2 },
    op! { "rsub-int"       := 0xD1 Format22s/2 },
    op! { "mul-int/lit16"  := 0xD2 Format22s/2 },
    op! { "div-int/lit16"  := 0xD3 Format22s/2 },
    op! { "rem-int/lit16"  := 0xD4 Format22s/2 },
    op! { "and-int/lit16"  := 0xD5 Format22s/2 },
    op! { "or-int/lit16"   := 0xD6 Format22s/2 },
    op! { "xor-int/lit16"  := 0xD7 Format22s/2 },
    // binary ops, 8-bit literal
    op! { "add-int/lit8"   := 0xD8 Format22b/2 },
    op! { "rsub-int/lit8"  := 0xD9 Format22b/2 },
    op! { "mul-int/lit8"   := 0xDA Format22b/2 },
    op! { "div-int/lit8"   := 0xDB Format22b/2 },
    op! { "rem-int/lit8"   := 0xDC Format22b/2 },
    op! { "and-int/lit8"   := 0xDD Format22b/2 },
    op! { "or-int/lit8"    := 0xDE Format22b/2 },
    op! { "xor-int/lit8"   := 0xDF Format22b/2 },
    op! { "shl-int/lit8"   := 0xE0 Format22b/2 },
    op! { "shr-int/lit8"   := 0xE1 Format22b/2 },
    op! { "ushr-int/lit8"  := 0xE2 Format22b/2 },
    // unused
    op!(),
    op!(),
    op!(),
    op!(),
    op!(),
    op!(),
    op!(),
    op!(),
    op!(),
    op!(),
    op!(),
    op!(),
    op!(),
    op!(),
    op!(),
    op!(),
    op!(),
    op!(),
    op!(),
    op!(),
    op!(),
    op!(),
    op!(),
    op! { "invoke-polymorphic"       := 0xFA Format45cc/4 @ Method },
    op! { "invoke-polymorphic/range" := 0xFB Format4rcc/4 @ Method },
    op! { "invoke-custom"            := 0xFC Format35c/3 @ CallSite },
    op! { "invoke-custom/range"      := 0xFD Format3rc/3 @ CallSite },
    op! { "const-method-handle"      := 0xFE Format21c/2 @ MethodHandle },
    op! { "const-method-type"        := 0xFF Format21c/2 @ Proto },
];

/// Decodes the instruction starting at `*cursor` and advances the cursor
/// to the byte immediately after it. On failure the cursor is left
/// untouched and decoding must be treated as terminated.
pub fn decode_insn<R: Read + Seek>(reader: &mut R, cursor: &mut u64) -> Result<Insn> {
    let offset = *cursor;
    reader.goto(offset)?;
    let unit = reader.read_ushort()?;
    let op = (unit & 0xFF) as u8;
    let hi = (unit >> 8) as u8;

    let insn = if op == 0x00 && matches!(hi, 0x01..=0x03) {
        decode_payload(reader, hi, offset)?
    } else {
        let info = OPCODES[op as usize].ok_or(DexError::UnknownOpcode { opcode: op, offset })?;
        let operands = decode_operands(reader, &info, hi, offset)?;
        Insn {
            name: info.name,
            opcode: op,
            size: info.units as u32 * 2,
            offset,
            operands,
        }
    };
    *cursor = offset + insn.size as u64;
    Ok(insn)
}

fn decode_payload<R: Read + Seek>(reader: &mut R, ident: u8, offset: u64) -> Result<Insn> {
    let (name, operands) = match ident {
        0x01 => {
            let table = PackedSwitch::read(reader).map_err(|e| record_error(e, offset))?;
            ("packed-switch-payload", Operands::PackedSwitchPayload(table))
        }
        0x02 => {
            let table = SparseSwitch::read(reader).map_err(|e| record_error(e, offset))?;
            ("sparse-switch-payload", Operands::SparseSwitchPayload(table))
        }
        _ => {
            let table = FillArrayData::read(reader).map_err(|e| record_error(e, offset))?;
            ("fill-array-data-payload", Operands::FillArrayDataPayload(table))
        }
    };
    // the stream stays aligned to code units, so odd-sized array data is
    // followed by one padding byte
    let consumed = reader.pos()? - offset;
    let size = (consumed + 1) & !1;
    Ok(Insn {
        name,
        opcode: 0x00,
        size: size as u32,
        offset,
        operands,
    })
}

/// Reads the operand bytes after the first code unit; `hi` is that unit's
/// high byte.
fn decode_operands<R: Read + Seek>(
    reader: &mut R,
    info: &OpcodeInfo,
    hi: u8,
    offset: u64,
) -> Result<Operands> {
    let operands = match info.format {
        Format::Format10x => Operands::Format10x,
        Format::Format12x => Operands::Format12x {
            a: hi & 0x0F,
            b: hi >> 4,
        },
        Format::Format11n => Operands::Format11n {
            a: hi & 0x0F,
            // the literal is the sign-extended high nibble
            b: (hi as i8) >> 4,
        },
        Format::Format11x => Operands::Format11x { a: hi },
        Format::Format10t => {
            let delta = hi as i8;
            Operands::Format10t {
                delta,
                target: branch_target(offset, delta as i64, info)?,
            }
        }
        Format::Format20t => {
            let delta = reader.read_ushort()? as i16;
            Operands::Format20t {
                delta,
                target: branch_target(offset, delta as i64, info)?,
            }
        }
        Format::Format22x => Operands::Format22x {
            a: hi,
            b: reader.read_ushort()?,
        },
        Format::Format21t => {
            let delta = reader.read_ushort()? as i16;
            Operands::Format21t {
                a: hi,
                delta,
                target: branch_target(offset, delta as i64, info)?,
            }
        }
        Format::Format21s => Operands::Format21s {
            a: hi,
            b: reader.read_ushort()? as i16,
        },
        Format::Format21h => {
            // the 16-bit literal holds the high bits of the value:
            // const/high16 widens to 32 bits, const-wide/high16 to 64
            let shift = if info.value == 0x19 { 48 } else { 16 };
            Operands::Format21h {
                a: hi,
                b: (reader.read_ushort()? as i16 as i64) << shift,
            }
        }
        Format::Format21c => Operands::Format21c {
            a: hi,
            b: pool_ref(info, reader.read_ushort()? as u32, offset)?,
        },
        Format::Format23x => {
            let next = reader.read_ushort()?;
            Operands::Format23x {
                a: hi,
                b: (next & 0xFF) as u8,
                c: (next >> 8) as u8,
            }
        }
        Format::Format22b => {
            let next = reader.read_ushort()?;
            Operands::Format22b {
                a: hi,
                b: (next & 0xFF) as u8,
                c: (next >> 8) as i8,
            }
        }
        Format::Format22t => {
            let delta = reader.read_ushort()? as i16;
            Operands::Format22t {
                a: hi & 0x0F,
                b: hi >> 4,
                delta,
                target: branch_target(offset, delta as i64, info)?,
            }
        }
        Format::Format22s => Operands::Format22s {
            a: hi & 0x0F,
            b: hi >> 4,
            c: reader.read_ushort()? as i16,
        },
        Format::Format22c => Operands::Format22c {
            a: hi & 0x0F,
            b: hi >> 4,
            c: pool_ref(info, reader.read_ushort()? as u32, offset)?,
        },
        Format::Format30t => {
            let delta = reader.read_uint()? as i32;
            Operands::Format30t {
                delta,
                target: branch_target(offset, delta as i64, info)?,
            }
        }
        Format::Format32x => Operands::Format32x {
            a: reader.read_ushort()?,
            b: reader.read_ushort()?,
        },
        Format::Format31i => Operands::Format31i {
            a: hi,
            b: reader.read_uint()? as i32,
        },
        Format::Format31t => {
            let delta = reader.read_uint()? as i32;
            Operands::Format31t {
                a: hi,
                delta,
                target: branch_target(offset, delta as i64, info)?,
            }
        }
        Format::Format31c => Operands::Format31c {
            a: hi,
            b: pool_ref(info, reader.read_uint()?, offset)?,
        },
        Format::Format35c => {
            let b = pool_ref(info, reader.read_ushort()? as u32, offset)?;
            let (argc, args) = arg_regs(reader, hi, info, offset)?;
            Operands::Format35c { argc, args, b }
        }
        Format::Format3rc => Operands::Format3rc {
            count: hi,
            b: pool_ref(info, reader.read_ushort()? as u32, offset)?,
            first: reader.read_ushort()?,
        },
        Format::Format45cc => {
            let b = pool_ref(info, reader.read_ushort()? as u32, offset)?;
            let (argc, args) = arg_regs(reader, hi, info, offset)?;
            let h = PoolRef {
                kind: PoolKind::Proto,
                index: reader.read_ushort()? as u32,
            };
            Operands::Format45cc { argc, args, b, h }
        }
        Format::Format4rcc => Operands::Format4rcc {
            count: hi,
            b: pool_ref(info, reader.read_ushort()? as u32, offset)?,
            first: reader.read_ushort()?,
            h: PoolRef {
                kind: PoolKind::Proto,
                index: reader.read_ushort()? as u32,
            },
        },
        Format::Format51l => {
            let low = reader.read_uint()? as u64;
            let high = reader.read_uint()? as u64;
            Operands::Format51l {
                a: hi,
                b: ((high << 32) | low) as i64,
            }
        }
    };
    Ok(operands)
}

/// Argument registers of the `35c`/`45cc` formats: C..G from the third
/// code unit plus G from the first, selected by the count in A.
fn arg_regs<R: Read + Seek>(
    reader: &mut R,
    hi: u8,
    info: &OpcodeInfo,
    offset: u64,
) -> Result<(u8, [u8; 5])> {
    let argc = hi >> 4;
    if argc > 5 {
        return Err(DexError::BadInstructionFormat {
            mnemonic: info.name,
            offset,
        });
    }
    let third = reader.read_ushort()?;
    let args = [
        (third & 0x0F) as u8,
        ((third >> 4) & 0x0F) as u8,
        ((third >> 8) & 0x0F) as u8,
        ((third >> 12) & 0x0F) as u8,
        hi & 0x0F,
    ];
    Ok((argc, args))
}

fn pool_ref(info: &OpcodeInfo, index: u32, offset: u64) -> Result<PoolRef> {
    let kind = info.pool.ok_or(DexError::BadInstructionFormat {
        mnemonic: info.name,
        offset,
    })?;
    Ok(PoolRef { kind, index })
}

fn branch_target(offset: u64, delta: i64, info: &OpcodeInfo) -> Result<u64> {
    offset
        .checked_add_signed(2 * delta)
        .ok_or(DexError::BadInstructionFormat {
            mnemonic: info.name,
            offset,
        })
}
