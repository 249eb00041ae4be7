//! End-to-end tests driving the public surface over synthetically built
//! images.

use std::io::Cursor;
use std::rc::Rc;

use dexode::dex::{section, AccessFlags, EncodedValue};
use dexode::error::DexError;
use dexode::file::Dex;
use dexode::insns::Operands;
use dexode::Result;

const HEADER_SIZE: usize = 0x70;

/// Incrementally builds a little-endian DEX image. Data records are
/// appended first so their absolute offsets are known when the id tables
/// are emitted; header fields are patched in place.
struct ImageBuilder {
    bytes: Vec<u8>,
}

impl ImageBuilder {
    fn new() -> ImageBuilder {
        let mut bytes = vec![0u8; HEADER_SIZE];
        bytes[..8].copy_from_slice(b"dex\n035\0");
        bytes[36..40].copy_from_slice(&0x70u32.to_le_bytes());
        bytes[40..44].copy_from_slice(&0x12345678u32.to_le_bytes());
        ImageBuilder { bytes }
    }

    fn here(&self) -> u32 {
        self.bytes.len() as u32
    }

    fn u8(&mut self, v: u8) {
        self.bytes.push(v);
    }

    fn u16(&mut self, v: u16) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    fn uleb(&mut self, mut v: u32) {
        loop {
            let mut byte = (v & 0x7F) as u8;
            v >>= 7;
            if v != 0 {
                byte |= 0x80;
            }
            self.u8(byte);
            if v == 0 {
                break;
            }
        }
    }

    fn align4(&mut self) {
        while self.bytes.len() % 4 != 0 {
            self.u8(0);
        }
    }

    fn patch_u32(&mut self, at: usize, v: u32) {
        self.bytes[at..at + 4].copy_from_slice(&v.to_le_bytes());
    }

    /// Appends a string data record (ASCII payloads only) and returns its
    /// offset.
    fn string_data(&mut self, s: &str) -> u32 {
        let off = self.here();
        self.uleb(s.len() as u32);
        self.bytes.extend_from_slice(s.as_bytes());
        self.u8(0);
        off
    }

    fn type_list(&mut self, type_ids: &[u16]) -> u32 {
        self.align4();
        let off = self.here();
        self.u32(type_ids.len() as u32);
        for &t in type_ids {
            self.u16(t);
        }
        off
    }

    fn code_item(&mut self, registers: u16, ins: u16, insns: &[u16]) -> u32 {
        self.align4();
        let off = self.here();
        self.u16(registers);
        self.u16(ins);
        self.u16(0); // outs
        self.u16(0); // tries
        self.u32(0); // debug info
        self.u32(insns.len() as u32);
        for &unit in insns {
            self.u16(unit);
        }
        off
    }

    fn string_ids(&mut self, data_offs: &[u32]) {
        self.align4();
        let off = self.here();
        for &o in data_offs {
            self.u32(o);
        }
        self.set_pool(56, data_offs.len() as u32, off);
    }

    fn type_ids(&mut self, descriptor_string_ids: &[u32]) {
        self.align4();
        let off = self.here();
        for &idx in descriptor_string_ids {
            self.u32(idx);
        }
        self.set_pool(64, descriptor_string_ids.len() as u32, off);
    }

    fn proto_ids(&mut self, protos: &[(u32, u32, u32)]) {
        self.align4();
        let off = self.here();
        for &(shorty, return_type, params_off) in protos {
            self.u32(shorty);
            self.u32(return_type);
            self.u32(params_off);
        }
        self.set_pool(72, protos.len() as u32, off);
    }

    fn field_ids(&mut self, fields: &[(u16, u16, u32)]) {
        self.align4();
        let off = self.here();
        for &(class, type_, name) in fields {
            self.u16(class);
            self.u16(type_);
            self.u32(name);
        }
        self.set_pool(80, fields.len() as u32, off);
    }

    fn method_ids(&mut self, methods: &[(u16, u16, u32)]) {
        self.align4();
        let off = self.here();
        for &(class, proto, name) in methods {
            self.u16(class);
            self.u16(proto);
            self.u32(name);
        }
        self.set_pool(88, methods.len() as u32, off);
    }

    fn class_defs(&mut self, defs: &[[u32; 8]]) {
        self.align4();
        let off = self.here();
        for def in defs {
            for &word in def {
                self.u32(word);
            }
        }
        self.set_pool(96, defs.len() as u32, off);
    }

    fn set_pool(&mut self, size_field: usize, count: u32, off: u32) {
        self.patch_u32(size_field, count);
        self.patch_u32(size_field + 4, if count == 0 { 0 } else { off });
    }

    /// Emits the section map (a header entry plus the given extras),
    /// patches the remaining header fields and returns the image.
    fn finish(mut self, extra_map_entries: &[(u16, u32, u32)]) -> Vec<u8> {
        self.align4();
        let map_off = self.here();
        self.u32(1 + extra_map_entries.len() as u32);
        self.u16(section::HEADER_ITEM);
        self.u16(0);
        self.u32(1);
        self.u32(0);
        for &(type_, size, offset) in extra_map_entries {
            self.u16(type_);
            self.u16(0);
            self.u32(size);
            self.u32(offset);
        }
        self.patch_u32(52, map_off);
        let len = self.bytes.len() as u32;
        self.patch_u32(32, len);
        self.bytes
    }
}

fn open(bytes: Vec<u8>) -> Result<Dex<Cursor<Vec<u8>>>> {
    Dex::open(Cursor::new(bytes))
}

fn empty_image() -> Vec<u8> {
    ImageBuilder::new().finish(&[])
}

#[test]
fn test_empty_image() {
    let mut dex = open(empty_image()).unwrap();
    assert_eq!(dex.string_count(), 0);
    assert_eq!(dex.type_count(), 0);
    assert_eq!(dex.proto_count(), 0);
    assert_eq!(dex.field_count(), 0);
    assert_eq!(dex.method_count(), 0);
    assert_eq!(dex.class_count(), 0);

    assert!(dex.strings().next().is_none());
    assert!(dex.type_names().next().is_none());
    assert!(dex.protos().next().is_none());
    assert!(dex.fields().next().is_none());
    assert!(dex.methods().next().is_none());
    assert!(dex.classes().next().is_none());

    assert!(matches!(
        dex.get_string(0),
        Err(DexError::OutOfRange {
            pool: "string",
            index: 0,
            count: 0
        })
    ));
    dex.close();
}

#[test]
fn test_bad_magic() {
    let mut bytes = empty_image();
    bytes[0] = b'x';
    assert!(matches!(open(bytes), Err(DexError::BadMagic(_))));
}

#[test]
fn test_unsupported_endian() {
    let mut bytes = empty_image();
    bytes[40..44].copy_from_slice(&0x78563412u32.to_le_bytes());
    assert!(matches!(
        open(bytes),
        Err(DexError::UnsupportedEndian(0x78563412))
    ));
}

#[test]
fn test_duplicate_map_entry() {
    let bytes = ImageBuilder::new().finish(&[(section::HEADER_ITEM, 1, 0)]);
    assert!(matches!(open(bytes), Err(DexError::MalformedMap(_))));
}

#[test]
fn test_string_pool() {
    let mut b = ImageBuilder::new();
    let hello = b.string_data("Hello");
    b.string_ids(&[hello]);
    let mut dex = open(b.finish(&[])).unwrap();

    assert_eq!(dex.string_count(), 1);
    assert_eq!(*dex.get_string(0).unwrap(), "Hello");
    assert!(matches!(
        dex.get_string(1),
        Err(DexError::OutOfRange {
            pool: "string",
            index: 1,
            count: 1
        })
    ));

    let all: Result<Vec<Rc<String>>> = dex.strings().collect();
    assert_eq!(all.unwrap().len(), 1);
}

#[test]
fn test_types_and_protos() {
    let mut b = ImageBuilder::new();
    let s_void = b.string_data("V");
    let s_shorty = b.string_data("VL");
    let s_obj = b.string_data("Ljava/lang/Object;");
    b.string_ids(&[s_void, s_shorty, s_obj]);
    b.type_ids(&[0, 2]);
    // shorty "VL", returns void, no parameters
    b.proto_ids(&[(1, 0, 0)]);
    let mut dex = open(b.finish(&[])).unwrap();

    assert_eq!(dex.get_type_name(0).unwrap(), "void");
    assert_eq!(dex.get_type_name(1).unwrap(), "java.lang.Object");
    assert_eq!(*dex.get_type_desc(1).unwrap(), "Ljava/lang/Object;");

    let proto = dex.get_proto(0).unwrap();
    assert_eq!(*proto.shorty, "VL");
    assert_eq!(proto.return_type.display_name(), "void");
    assert!(proto.parameters.is_empty());

    let names: Result<Vec<String>> = dex.type_names().collect();
    assert_eq!(names.unwrap(), vec!["void", "java.lang.Object"]);
}

#[test]
fn test_proto_with_parameters() {
    let mut b = ImageBuilder::new();
    let s_int = b.string_data("I");
    let s_shorty = b.string_data("III");
    b.string_ids(&[s_int, s_shorty]);
    let params = b.type_list(&[0, 0]);
    b.type_ids(&[0]);
    b.proto_ids(&[(1, 0, params)]);
    let mut dex = open(b.finish(&[])).unwrap();

    let proto = dex.get_proto(0).unwrap();
    assert_eq!(proto.parameters.len(), 2);
    assert_eq!(proto.parameters[0].display_name(), "int");
}

#[test]
fn test_class_with_method_code() {
    let mut b = ImageBuilder::new();
    let s_foo = b.string_data("LFoo;");
    let s_obj = b.string_data("Ljava/lang/Object;");
    let s_void = b.string_data("V");
    let s_run = b.string_data("run");
    let s_src = b.string_data("Foo.java");
    b.string_ids(&[s_foo, s_obj, s_void, s_run, s_src]);
    b.type_ids(&[0, 1, 2]);
    b.proto_ids(&[(2, 2, 0)]);
    b.method_ids(&[(0, 0, 3)]);

    // const/4 v0, #+1; return v0
    let code = b.code_item(1, 1, &[0x1012, 0x000F]);

    b.align4();
    let class_data = b.here();
    b.uleb(0); // static fields
    b.uleb(0); // instance fields
    b.uleb(1); // direct methods
    b.uleb(0); // virtual methods
    b.uleb(0); // method_idx_diff
    b.uleb(AccessFlags::PUBLIC.bits());
    b.uleb(code);

    b.class_defs(&[[0, AccessFlags::PUBLIC.bits(), 1, 0, 4, 0, class_data, 0]]);
    let mut dex = open(b.finish(&[])).unwrap();

    let class = dex.get_class(0).unwrap();
    assert_eq!(class.type_.display_name(), "Foo");
    assert_eq!(
        class.super_class.as_ref().unwrap().display_name(),
        "java.lang.Object"
    );
    assert_eq!(**class.source_file.as_ref().unwrap(), "Foo.java");
    assert_eq!(class.flags, Some(AccessFlags::PUBLIC));
    assert!(class.interfaces.is_empty());
    assert_eq!(class.direct_methods.len(), 1);

    let method = class.direct_methods[0].method.clone();
    assert_eq!(*method.name, "run");
    assert_eq!(method.class.display_name(), "Foo");
    let code = method.code.unwrap();
    assert_eq!(code.registers_size, 1);
    assert_eq!(code.insns_size, 2);

    let insns = method.disasm(&mut dex).unwrap();
    assert_eq!(insns.len(), 2);
    assert_eq!(insns[0].name, "const/4");
    assert_eq!(insns[1].name, "return");
    assert_eq!(insns[0].size, 2);
    assert_eq!(insns[1].size, 2);
    assert_eq!(insns[1].offset, insns[0].offset + 2);
    assert_eq!(insns[0].operands, Operands::Format11n { a: 0, b: 1 });

    // decoding covers exactly the declared number of code units
    let total: u32 = insns.iter().map(|i| i.size).sum();
    assert_eq!(total, 2 * code.insns_size);
}

#[test]
fn test_packed_switch_through_data_pointer() {
    let mut b = ImageBuilder::new();
    let s_foo = b.string_data("LFoo;");
    let s_void = b.string_data("V");
    let s_run = b.string_data("run");
    b.string_ids(&[s_foo, s_void, s_run]);
    b.type_ids(&[0, 1]);
    b.proto_ids(&[(1, 1, 0)]);
    b.method_ids(&[(0, 0, 2)]);

    // unit 0:    packed-switch v0, payload at +4 units
    // unit 3:    return-void
    // units 4..: the payload (2 cases, first key 10)
    let insns: &[u16] = &[
        0x002B, 0x0004, 0x0000, // packed-switch v0, +4
        0x000E, // return-void
        0x0100, 0x0002, // payload ident, size
        0x000A, 0x0000, // first_key = 10
        0x0004, 0x0000, // target 4
        0x0006, 0x0000, // target 6
    ];
    let code = b.code_item(1, 1, insns);
    let mut dex = open(b.finish(&[])).unwrap();

    let method = dex.get_method(0, Some(code)).unwrap();
    let block = method.code.unwrap();

    let mut cursor = block.insns_off;
    let switch = dex.decode_insn(&mut cursor).unwrap();
    assert_eq!(switch.name, "packed-switch");
    let target = match switch.operands {
        Operands::Format31t { a: 0, delta: 4, target } => target,
        other => panic!("unexpected operands: {:?}", other),
    };
    assert_eq!(target, switch.offset + 8);

    let mut payload_cursor = target;
    let payload = dex.decode_insn(&mut payload_cursor).unwrap();
    assert_eq!(payload.name, "packed-switch-payload");
    match payload.operands {
        Operands::PackedSwitchPayload(table) => {
            assert_eq!(table.size, 2);
            assert_eq!(table.first_key, 10);
            assert_eq!(table.targets, vec![4, 6]);
        }
        other => panic!("unexpected operands: {:?}", other),
    }
    assert_eq!(payload_cursor, block.insns_end());
}

#[test]
fn test_static_field_values() {
    let mut b = ImageBuilder::new();
    let s_foo = b.string_data("LFoo;");
    let s_int = b.string_data("I");
    let s_x = b.string_data("x");
    b.string_ids(&[s_foo, s_int, s_x]);
    b.type_ids(&[0, 1]);
    b.field_ids(&[(0, 1, 2)]);

    b.align4();
    let static_values = b.here();
    b.uleb(1); // one value
    b.u8(0x04); // VALUE_INT, one payload byte
    b.u8(42);

    let class_data = b.here();
    b.uleb(1); // static fields
    b.uleb(0);
    b.uleb(0);
    b.uleb(0);
    b.uleb(0); // field_idx_diff
    b.uleb((AccessFlags::PUBLIC | AccessFlags::STATIC).bits());

    b.class_defs(&[[
        0,
        AccessFlags::PUBLIC.bits(),
        0xFFFF_FFFF, // no superclass
        0,
        0xFFFF_FFFF, // no source file
        0,
        class_data,
        static_values,
    ]]);
    let mut dex = open(b.finish(&[])).unwrap();

    let class = dex.get_class(0).unwrap();
    assert!(class.super_class.is_none());
    assert!(class.source_file.is_none());

    let field = &class.static_fields[0];
    assert_eq!(*field.field.name, "x");
    assert_eq!(field.field.type_.display_name(), "int");
    assert_eq!(field.init_value, Some(EncodedValue::Int(42)));
}

#[test]
fn test_class_interfaces() {
    let mut b = ImageBuilder::new();
    let s_foo = b.string_data("LFoo;");
    let s_runnable = b.string_data("Ljava/lang/Runnable;");
    b.string_ids(&[s_foo, s_runnable]);
    let interfaces = b.type_list(&[1]);
    b.type_ids(&[0, 1]);
    b.class_defs(&[[0, 0, 0xFFFF_FFFF, interfaces, 0xFFFF_FFFF, 0, 0, 0]]);
    let mut dex = open(b.finish(&[])).unwrap();

    let class = dex.get_class(0).unwrap();
    assert_eq!(class.interfaces.len(), 1);
    assert_eq!(class.interfaces[0].display_name(), "java.lang.Runnable");
}

#[test]
fn test_method_handles_from_map() {
    let mut b = ImageBuilder::new();
    b.align4();
    let handles = b.here();
    b.u16(0x0001); // static-get
    b.u16(0);
    b.u16(5);
    b.u16(0);
    let bytes = b.finish(&[(section::METHOD_HANDLE_ITEM, 1, handles)]);
    let mut dex = open(bytes).unwrap();

    assert_eq!(dex.method_handle_count(), 1);
    let handle = dex.get_method_handle(0).unwrap();
    assert_eq!(handle.method_handle_type, 0x0001);
    assert_eq!(handle.field_or_method_id, 5);
    assert!(matches!(
        dex.get_method_handle(1),
        Err(DexError::OutOfRange { .. })
    ));
}

#[test]
fn test_verify_checksum_and_signature() {
    let mut bytes = empty_image();

    // fill in a valid signature, then a valid checksum over it
    let digest = openssl::sha::sha1(&bytes[32..]);
    bytes[12..32].copy_from_slice(&digest);
    let checksum = adler32::adler32(&bytes[12..]).unwrap();
    bytes[8..12].copy_from_slice(&checksum.to_le_bytes());

    let mut dex = open(bytes.clone()).unwrap();
    dex.verify().unwrap();

    // flip one bit in the payload
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    let mut dex = open(bytes).unwrap();
    assert!(matches!(dex.verify(), Err(DexError::BadChecksum { .. })));
}

#[test]
fn test_truncated_image() {
    assert!(matches!(
        open(vec![0x64, 0x65, 0x78]),
        Err(DexError::Truncated { .. })
    ));
}
