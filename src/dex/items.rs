use binrw::binread;

use super::types::*;

/// A string identifier: the offset from the start of the file to the
/// string data of this item.
#[binread]
#[br(little)]
#[derive(Debug)]
pub struct StringIdItem {
    pub offset: UInt,
}

/// A type identifier: an index into `string_ids` for the descriptor string
/// of this type.
#[binread]
#[br(little)]
#[derive(Debug)]
pub struct TypeIdItem {
    pub descriptor_idx: UInt,
}

#[binread]
#[br(little)]
#[derive(Debug)]
pub struct ProtoIdItem {
    /// index into the `string_ids` list for the shorty string of this
    /// prototype
    pub shorty_idx: UInt,

    /// index into the `type_ids` list for the return type
    pub return_type_idx: UInt,

    /// offset from the start of the file to the parameter type list, or 0
    /// if this prototype takes no parameters
    pub parameters_off: UInt,
}

#[binread]
#[br(little)]
#[derive(Debug)]
pub struct FieldIdItem {
    /// index into the `type_ids` list for the enclosing type
    pub class_idx: UShort,

    /// index into the `type_ids` list for the type of this field
    pub type_idx: UShort,

    /// index into the `string_ids` list for the name of this field
    pub name_idx: UInt,
}

#[binread]
#[br(little)]
#[derive(Debug)]
pub struct MethodIdItem {
    /// index into the `type_ids` list for the declaring class
    pub class_idx: UShort,

    /// index into the `proto_ids` list for the prototype of this method
    pub proto_idx: UShort,

    /// index into the `string_ids` list for the name of this method
    pub name_idx: UInt,
}

/// The fixed 32-byte class definition record.
#[binread]
#[br(little)]
#[derive(Debug)]
pub struct ClassDefItem {
    /// index into the `type_ids` list for this class
    pub class_idx: UInt,

    /// access flags for this class
    pub access_flags: UInt,

    /// index into the `type_ids` list for the superclass, or `NO_INDEX`
    /// for a class without one
    pub superclass_idx: UInt,

    /// offset to the list of implemented interfaces, or 0 for none
    pub interfaces_off: UInt,

    /// index into the `string_ids` list for the source file name, or
    /// `NO_INDEX` when not recorded
    pub source_file_idx: UInt,

    /// offset to the annotations directory, or 0 for none
    pub annotations_off: UInt,

    /// offset to the class data block, or 0 for a marker class
    pub class_data_off: UInt,

    /// offset to the initial values for static fields, or 0 when all
    /// statics start at their type's default
    pub static_values_off: UInt,
}

#[binread]
#[br(little)]
#[derive(Debug)]
pub struct CallSiteIdItem {
    /// offset from the start of the file to the call site definition
    pub call_site_off: UInt,
}

#[binread]
#[br(little)]
#[derive(Debug)]
pub struct MethodHandleItem {
    /// type of this method handle, one of the `METHOD_HANDLE_*` kinds
    #[br(pad_after = 2)]
    pub method_handle_type: UShort,

    /// field or method id depending on whether the handle is an accessor
    /// or an invoker
    #[br(pad_after = 2)]
    pub field_or_method_id: UShort,
}

#[binread]
#[br(little)]
#[derive(Debug)]
pub struct TypeItem {
    /// index into the `type_ids` list
    pub type_idx: UShort,
}

/// A counted list of type indices, used for prototype parameters and
/// interface lists.
#[binread]
#[br(little)]
#[derive(Debug)]
pub struct TypeList {
    pub size: UInt,

    #[br(count = size as usize)]
    pub list: Vec<TypeItem>,
}

/// The fixed part of a `code_item`; the instruction stream follows
/// immediately after it.
#[binread]
#[br(little)]
#[derive(Debug, Clone, Copy)]
pub struct CodeItem {
    /// the number of registers used by this code
    pub registers_size: UShort,

    /// the number of words of incoming arguments
    pub ins_size: UShort,

    /// the number of words of outgoing argument space
    pub outs_size: UShort,

    /// the number of try items for this instance
    pub tries_size: UShort,

    /// offset to the debug info sequence, or 0 if there is none
    pub debug_info_off: UInt,

    /// size of the instruction stream, in 16-bit code units
    pub insns_size: UInt,
}

/// Field entry of a class data block; `field_idx_diff` accumulates over
/// the preceding entries of the same list.
#[binread]
#[br(little)]
#[derive(Debug)]
pub struct EncodedFieldItem {
    pub field_idx_diff: ULeb128,
    pub access_flags: ULeb128,
}

/// Method entry of a class data block.
#[binread]
#[br(little)]
#[derive(Debug)]
pub struct EncodedMethodItem {
    pub method_idx_diff: ULeb128,
    pub access_flags: ULeb128,

    /// offset to the `code_item`, or 0 for abstract and native methods
    pub code_off: ULeb128,
}

/// The class data block: declared fields and methods, each list ULEB128
/// counted.
#[binread]
#[br(little)]
#[derive(Debug)]
pub struct ClassDataItem {
    pub static_fields_size: ULeb128,
    pub instance_fields_size: ULeb128,
    pub direct_methods_size: ULeb128,
    pub virtual_methods_size: ULeb128,

    #[br(count = static_fields_size.0 as usize)]
    pub static_fields: Vec<EncodedFieldItem>,

    #[br(count = instance_fields_size.0 as usize)]
    pub instance_fields: Vec<EncodedFieldItem>,

    #[br(count = direct_methods_size.0 as usize)]
    pub direct_methods: Vec<EncodedMethodItem>,

    #[br(count = virtual_methods_size.0 as usize)]
    pub virtual_methods: Vec<EncodedMethodItem>,
}

// instruction payload data, referenced through data-offset operands

/// Table behind a `fill-array-data` instruction.
#[binread]
#[br(little)]
#[derive(Debug, PartialEq, Eq)]
pub struct FillArrayData {
    /// number of bytes in each element
    pub width: UShort,

    /// number of elements in the table
    pub size: UInt,

    /// raw element values
    #[br(count = (size as u64 * width as u64) as usize)]
    pub data: Vec<UByte>,
}

/// Table behind a `packed-switch` instruction.
#[binread]
#[br(little)]
#[derive(Debug, PartialEq, Eq)]
pub struct PackedSwitch {
    /// number of entries in the table
    pub size: UShort,

    /// first (and lowest) switch case value
    pub first_key: Int,

    /// branch targets relative to the switch instruction, in code units
    #[br(count = size as usize)]
    pub targets: Vec<Int>,
}

/// Table behind a `sparse-switch` instruction.
#[binread]
#[br(little)]
#[derive(Debug, PartialEq, Eq)]
pub struct SparseSwitch {
    /// number of entries in the table
    pub size: UShort,

    /// case values, sorted low to high
    #[br(count = size as usize)]
    pub keys: Vec<Int>,

    /// branch targets relative to the switch instruction, in code units
    #[br(count = size as usize)]
    pub targets: Vec<Int>,
}
