use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::rc::Rc;

use binrw::BinRead;
use log::debug;

use crate::dex::{
    section, CallSiteIdItem, ClassDefItem, CodeItem, DexType, FieldIdItem, HeaderItem,
    MethodHandleItem, MethodIdItem, ProtoIdItem, RawMapList, SectionMap, TypeList,
};
use crate::error::DexError;
use crate::insns::{self, Insn};
use crate::io::{record_error, ReadExt};
use crate::Result;

pub mod class_def;
pub use class_def::*;

pub mod field;
pub use field::*;

pub mod method;
pub use method::*;

type Pool<T> = BTreeMap<u32, Rc<T>>;

macro_rules! check_index {
    ($index:expr, $count:expr, $pool:literal) => {
        if $index >= $count {
            return Err(DexError::OutOfRange {
                pool: $pool,
                index: $index,
                count: $count,
            });
        }
    };
}

/// An opened DEX image.
///
/// The handle owns the byte source and its cursor; every accessor is a
/// sequence of seek-then-read steps, so concurrent use requires external
/// serialization (which `&mut self` enforces at compile time). Resolved
/// pool entries are cached behind `Rc`, making the returned entities
/// independent of the handle's lifetime.
pub struct Dex<R: Read + Seek> {
    rd: R,
    header: HeaderItem,
    map: SectionMap,
    source_len: u64,

    // located through the section map, not the header
    method_handles_size: u32,
    method_handles_off: u32,
    call_sites_size: u32,
    call_sites_off: u32,

    strings: Pool<String>,
    types: Pool<DexType>,
    protos: Pool<DexPrototype>,
    fields: Pool<DexField>,
    methods: Pool<DexMethod>,
    method_handles: Pool<MethodHandleItem>,
    call_sites: Pool<CallSiteIdItem>,
    classes: Pool<DexClass>,
}

impl<R: Read + Seek> Dex<R> {
    /// Opens an image: parses and validates the header, then decodes the
    /// section map. Pool entries are resolved lazily on access.
    pub fn open(mut reader: R) -> Result<Dex<R>> {
        let source_len = reader.seek(SeekFrom::End(0))?;
        reader.goto(0)?;
        let header = HeaderItem::read(&mut reader).map_err(|e| record_error(e, 0))?;
        header.validate(source_len)?;
        debug!(
            "opened dex image: version {}, {} bytes",
            header.magic.version_num().unwrap_or(0),
            source_len
        );

        if header.map_off == 0 {
            return Err(DexError::MalformedMap("missing section map".to_string()));
        }
        reader.goto(header.map_off as u64)?;
        let raw_map =
            RawMapList::read(&mut reader).map_err(|e| record_error(e, header.map_off as u64))?;
        let map = SectionMap::from_raw(raw_map)?;
        debug!("section map holds {} entries", map.len());

        Ok(Dex {
            method_handles_size: map.item_count(section::METHOD_HANDLE_ITEM),
            method_handles_off: map.item_offset(section::METHOD_HANDLE_ITEM),
            call_sites_size: map.item_count(section::CALL_SITE_ID_ITEM),
            call_sites_off: map.item_offset(section::CALL_SITE_ID_ITEM),
            rd: reader,
            header,
            map,
            source_len,
            strings: BTreeMap::new(),
            types: BTreeMap::new(),
            protos: BTreeMap::new(),
            fields: BTreeMap::new(),
            methods: BTreeMap::new(),
            method_handles: BTreeMap::new(),
            call_sites: BTreeMap::new(),
            classes: BTreeMap::new(),
        })
    }

    pub fn header(&self) -> &HeaderItem {
        &self.header
    }

    pub fn section_map(&self) -> &SectionMap {
        &self.map
    }

    pub fn file_size(&self) -> u64 {
        self.source_len
    }

    /// Validates checksum and signature against the image contents.
    /// Opt-in; `open` never runs it.
    pub fn verify(&mut self) -> Result<()> {
        self.header.verify(&mut self.rd)
    }

    /// Releases the image: the byte source is closed and all cached pool
    /// entries are dropped. Entities fetched earlier stay usable since
    /// they hold their resolved fields.
    pub fn close(self) {}

    // -- strings

    pub fn string_count(&self) -> u32 {
        self.header.string_ids_size
    }

    /// Two-stage string resolution: the string id holds the offset of the
    /// data record, which holds the ULEB128 code-unit count and the
    /// MUTF-8 bytes.
    pub fn get_string(&mut self, index: u32) -> Result<Rc<String>> {
        check_index!(index, self.header.string_ids_size, "string");
        if !self.strings.contains_key(&index) {
            let offset = self.header.string_ids_off as u64 + 4 * index as u64;
            self.rd.goto(offset)?;
            let data_off = self.rd.read_uint()?;
            self.rd.goto(data_off as u64)?;
            let value = crate::mutf8::read(&mut self.rd)?;
            self.strings.insert(index, Rc::new(value));
        }
        Ok(self.strings[&index].clone())
    }

    pub fn strings(&mut self) -> Strings<'_, R> {
        Strings {
            dex: self,
            index: 0,
            failed: false,
        }
    }

    // -- types

    pub fn type_count(&self) -> u32 {
        self.header.type_ids_size
    }

    pub fn get_type(&mut self, index: u32) -> Result<Rc<DexType>> {
        check_index!(index, self.header.type_ids_size, "type");
        if !self.types.contains_key(&index) {
            let offset = self.header.type_ids_off as u64 + 4 * index as u64;
            self.rd.goto(offset)?;
            let descriptor_idx = self.rd.read_uint()?;
            let descriptor = self.get_string(descriptor_idx)?;
            self.types.insert(index, Rc::new(DexType::new(descriptor)));
        }
        Ok(self.types[&index].clone())
    }

    /// The raw descriptor string of a type, e.g. `Ljava/lang/String;`.
    pub fn get_type_desc(&mut self, index: u32) -> Result<Rc<String>> {
        Ok(self.get_type(index)?.descriptor.clone())
    }

    /// The human readable name of a type, e.g. `java.lang.String`.
    pub fn get_type_name(&mut self, index: u32) -> Result<String> {
        Ok(self.get_type(index)?.display_name())
    }

    pub fn type_names(&mut self) -> TypeNames<'_, R> {
        TypeNames {
            dex: self,
            index: 0,
            failed: false,
        }
    }

    // -- prototypes

    pub fn proto_count(&self) -> u32 {
        self.header.proto_ids_size
    }

    pub fn get_proto(&mut self, index: u32) -> Result<Rc<DexPrototype>> {
        check_index!(index, self.header.proto_ids_size, "proto");
        if !self.protos.contains_key(&index) {
            let offset = self.header.proto_ids_off as u64 + 12 * index as u64;
            self.rd.goto(offset)?;
            let item = ProtoIdItem::read(&mut self.rd).map_err(|e| record_error(e, offset))?;

            let shorty = self.get_string(item.shorty_idx)?;
            let return_type = self.get_type(item.return_type_idx)?;
            let mut proto = DexPrototype {
                shorty,
                return_type,
                parameters: Vec::new(),
            };

            if item.parameters_off != 0 {
                // type list only present if offset is != 0
                self.rd.goto(item.parameters_off as u64)?;
                let params = TypeList::read(&mut self.rd)
                    .map_err(|e| record_error(e, item.parameters_off as u64))?;
                for entry in &params.list {
                    proto.parameters.push(self.get_type(entry.type_idx as u32)?);
                }
            }
            self.protos.insert(index, Rc::new(proto));
        }
        Ok(self.protos[&index].clone())
    }

    pub fn protos(&mut self) -> Protos<'_, R> {
        Protos {
            dex: self,
            index: 0,
            failed: false,
        }
    }

    // -- fields

    pub fn field_count(&self) -> u32 {
        self.header.field_ids_size
    }

    pub fn get_field(&mut self, index: u32) -> Result<Rc<DexField>> {
        check_index!(index, self.header.field_ids_size, "field");
        if !self.fields.contains_key(&index) {
            let offset = self.header.field_ids_off as u64 + 8 * index as u64;
            self.rd.goto(offset)?;
            let item = FieldIdItem::read(&mut self.rd).map_err(|e| record_error(e, offset))?;
            let field = DexField {
                identity: index,
                class: self.get_type(item.class_idx as u32)?,
                type_: self.get_type(item.type_idx as u32)?,
                name: self.get_string(item.name_idx)?,
            };
            self.fields.insert(index, Rc::new(field));
        }
        Ok(self.fields[&index].clone())
    }

    pub fn fields(&mut self) -> Fields<'_, R> {
        Fields {
            dex: self,
            index: 0,
            failed: false,
        }
    }

    // -- methods

    pub fn method_count(&self) -> u32 {
        self.header.method_ids_size
    }

    /// Resolves a method id. With a non-zero `code_off` the returned
    /// method additionally carries its code block; such methods are built
    /// fresh and bypass the cache.
    pub fn get_method(&mut self, index: u32, code_off: Option<u32>) -> Result<Rc<DexMethod>> {
        check_index!(index, self.header.method_ids_size, "method");
        if !self.methods.contains_key(&index) {
            let offset = self.header.method_ids_off as u64 + 8 * index as u64;
            self.rd.goto(offset)?;
            let item = MethodIdItem::read(&mut self.rd).map_err(|e| record_error(e, offset))?;
            let method = DexMethod {
                identity: index,
                class: self.get_type(item.class_idx as u32)?,
                name: self.get_string(item.name_idx)?,
                proto: self.get_proto(item.proto_idx as u32)?,
                code: None,
            };
            self.methods.insert(index, Rc::new(method));
        }

        let method = self.methods[&index].clone();
        match code_off {
            None | Some(0) => Ok(method),
            Some(off) => {
                let code = self.read_code_block(off)?;
                Ok(Rc::new(DexMethod {
                    code: Some(code),
                    ..(*method).clone()
                }))
            }
        }
    }

    pub fn methods(&mut self) -> Methods<'_, R> {
        Methods {
            dex: self,
            index: 0,
            failed: false,
        }
    }

    pub(crate) fn read_code_block(&mut self, code_off: u32) -> Result<CodeBlock> {
        self.rd.goto(code_off as u64)?;
        let item = CodeItem::read(&mut self.rd).map_err(|e| record_error(e, code_off as u64))?;
        Ok(CodeBlock::new(item, code_off))
    }

    // -- class defs

    pub fn class_count(&self) -> u32 {
        self.header.class_defs_size
    }

    pub fn get_class(&mut self, index: u32) -> Result<Rc<DexClass>> {
        check_index!(index, self.header.class_defs_size, "class_def");
        if !self.classes.contains_key(&index) {
            let offset = self.header.class_defs_off as u64 + 32 * index as u64;
            self.rd.goto(offset)?;
            let item = ClassDefItem::read(&mut self.rd).map_err(|e| record_error(e, offset))?;
            let class = DexClass::build(self, index, item)?;
            self.classes.insert(index, Rc::new(class));
        }
        Ok(self.classes[&index].clone())
    }

    pub fn classes(&mut self) -> Classes<'_, R> {
        Classes {
            dex: self,
            index: 0,
            failed: false,
        }
    }

    // -- method handles

    pub fn method_handle_count(&self) -> u32 {
        self.method_handles_size
    }

    pub fn get_method_handle(&mut self, index: u32) -> Result<Rc<MethodHandleItem>> {
        check_index!(index, self.method_handles_size, "method_handle");
        if !self.method_handles.contains_key(&index) {
            let offset = self.method_handles_off as u64 + 8 * index as u64;
            self.rd.goto(offset)?;
            let item = MethodHandleItem::read(&mut self.rd).map_err(|e| record_error(e, offset))?;
            self.method_handles.insert(index, Rc::new(item));
        }
        Ok(self.method_handles[&index].clone())
    }

    // -- call sites

    pub fn call_site_count(&self) -> u32 {
        self.call_sites_size
    }

    pub fn get_call_site(&mut self, index: u32) -> Result<Rc<CallSiteIdItem>> {
        check_index!(index, self.call_sites_size, "call_site");
        if !self.call_sites.contains_key(&index) {
            let offset = self.call_sites_off as u64 + 4 * index as u64;
            self.rd.goto(offset)?;
            let item = CallSiteIdItem::read(&mut self.rd).map_err(|e| record_error(e, offset))?;
            self.call_sites.insert(index, Rc::new(item));
        }
        Ok(self.call_sites[&index].clone())
    }

    // -- instructions

    /// Decodes the instruction at `*cursor` and advances the cursor past
    /// it. See [`insns::decode_insn`] for the cursor contract.
    pub fn decode_insn(&mut self, cursor: &mut u64) -> Result<Insn> {
        insns::decode_insn(&mut self.rd, cursor)
    }
}

macro_rules! pool_iter {
    ($(#[$meta:meta])* $name:ident, $item:ty, $count:ident, $get:ident $(, $extra:expr)?) => {
        $(#[$meta])*
        pub struct $name<'a, R: Read + Seek> {
            dex: &'a mut Dex<R>,
            index: u32,
            failed: bool,
        }

        impl<'a, R: Read + Seek> Iterator for $name<'a, R> {
            type Item = Result<$item>;

            fn next(&mut self) -> Option<Self::Item> {
                if self.failed || self.index >= self.dex.$count() {
                    return None;
                }
                let item = self.dex.$get(self.index $(, $extra)?);
                self.index += 1;
                // enumeration short-circuits after the first failure
                self.failed = item.is_err();
                Some(item)
            }
        }
    };
}

pool_iter!(Strings, Rc<String>, string_count, get_string);
pool_iter!(
    /// Iterates the human readable names of all types.
    TypeNames, String, type_count, get_type_name
);
pool_iter!(Protos, Rc<DexPrototype>, proto_count, get_proto);
pool_iter!(Fields, Rc<DexField>, field_count, get_field);
pool_iter!(Methods, Rc<DexMethod>, method_count, get_method, None);
pool_iter!(Classes, Rc<DexClass>, class_count, get_class);

/// Maps a DEX file into memory and opens handles over it.
pub struct DexFileContainer {
    mmap: memmap2::Mmap,
}

impl DexFileContainer {
    pub fn new(file: &File) -> Result<DexFileContainer> {
        Ok(DexFileContainer {
            mmap: unsafe { memmap2::Mmap::map(file)? },
        })
    }

    pub fn open(&self) -> Result<Dex<Cursor<&[u8]>>> {
        Dex::open(Cursor::new(&self.mmap[..]))
    }

    pub fn data(&self) -> &[u8] {
        &self.mmap
    }
}
