use std::io::{Read, Seek};
use std::rc::Rc;

use crate::dex::{AccessFlags, CodeItem, DexType};
use crate::insns::Insn;
use crate::Result;

use super::Dex;

/// A method prototype: the shorty signature string, the return type and
/// the parameter types in declaration order.
#[derive(Debug)]
pub struct DexPrototype {
    pub shorty: Rc<String>,
    pub return_type: Rc<DexType>,
    pub parameters: Vec<Rc<DexType>>,
}

/// The fixed part of a method's `code_item` plus the absolute offset of
/// its instruction stream.
#[derive(Debug, Clone, Copy)]
pub struct CodeBlock {
    pub registers_size: u16,
    pub ins_size: u16,
    pub outs_size: u16,
    pub tries_size: u16,
    pub debug_info_off: u32,

    /// size of the instruction stream, in 16-bit code units
    pub insns_size: u32,

    /// absolute file offset of the first instruction
    pub insns_off: u64,
}

impl CodeBlock {
    pub(crate) fn new(item: CodeItem, code_off: u32) -> CodeBlock {
        CodeBlock {
            registers_size: item.registers_size,
            ins_size: item.ins_size,
            outs_size: item.outs_size,
            tries_size: item.tries_size,
            debug_info_off: item.debug_info_off,
            insns_size: item.insns_size,
            // the instruction stream starts right after the fixed fields
            insns_off: code_off as u64 + 16,
        }
    }

    /// Offset one past the last code unit of the instruction stream.
    pub fn insns_end(&self) -> u64 {
        self.insns_off + 2 * self.insns_size as u64
    }
}

/// A method as described by the `method_ids` pool, with its pool links
/// resolved.
#[derive(Debug, Clone)]
pub struct DexMethod {
    /// index into the `method_ids` pool
    pub identity: u32,

    /// The declaring class of this method
    pub class: Rc<DexType>,

    /// The name of the method
    pub name: Rc<String>,

    /// The method signature as a prototype reference
    pub proto: Rc<DexPrototype>,

    /// Code attached to this method. Present only when the method was
    /// fetched with a code offset; abstract and native methods have none.
    pub code: Option<CodeBlock>,
}

impl DexMethod {
    /// Decodes this method's whole instruction stream. Methods without
    /// code yield an empty list.
    pub fn disasm<R: Read + Seek>(&self, dex: &mut Dex<R>) -> Result<Vec<Insn>> {
        let Some(code) = &self.code else {
            return Ok(Vec::new());
        };
        let mut insns = Vec::new();
        let mut cursor = code.insns_off;
        while cursor < code.insns_end() {
            insns.push(dex.decode_insn(&mut cursor)?);
        }
        Ok(insns)
    }
}

/// A method declared by a class, as listed in its class data block.
#[derive(Debug)]
pub struct ClassMethod {
    pub method: Rc<DexMethod>,

    pub access_flags: Option<AccessFlags>,
}
