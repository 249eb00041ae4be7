use std::io::{Read, Seek};
use std::rc::Rc;

use binrw::BinRead;
use log::debug;

use crate::dex::{
    encoded_value, AccessFlags, ClassDataItem, ClassDefItem, DexType, TypeList, NO_INDEX,
};
use crate::error::DexError;
use crate::io::{record_error, ReadExt};
use crate::Result;

use super::field::ClassField;
use super::method::ClassMethod;
use super::Dex;

/// A fully resolved class definition.
#[derive(Debug)]
pub struct DexClass {
    /// index into the `class_defs` pool
    pub identity: u32,

    /// The type naming this class.
    pub type_: Rc<DexType>,

    pub flags: Option<AccessFlags>,

    /// The superclass, absent only for `java.lang.Object`.
    pub super_class: Option<Rc<DexType>>,

    /// Interfaces implemented by this class.
    pub interfaces: Vec<Rc<DexType>>,

    /// Name of the source file this class was compiled from, when
    /// recorded.
    pub source_file: Option<Rc<String>>,

    /// Raw offset of the annotations directory, or 0. Annotation decoding
    /// is outside this crate's scope; the offset is kept for consumers.
    pub annotations_off: u32,

    pub static_fields: Vec<ClassField>,
    pub instance_fields: Vec<ClassField>,
    pub direct_methods: Vec<ClassMethod>,
    pub virtual_methods: Vec<ClassMethod>,
}

impl DexClass {
    /// Resolves a `class_def_item` and, when present, walks its class
    /// data block and static values.
    pub(super) fn build<R: Read + Seek>(
        dex: &mut Dex<R>,
        index: u32,
        item: ClassDefItem,
    ) -> Result<DexClass> {
        let mut class = DexClass {
            identity: index,
            type_: dex.get_type(item.class_idx)?,
            flags: AccessFlags::from_bits(item.access_flags),
            super_class: None,
            interfaces: Vec::new(),
            source_file: None,
            annotations_off: item.annotations_off,
            static_fields: Vec::new(),
            instance_fields: Vec::new(),
            direct_methods: Vec::new(),
            virtual_methods: Vec::new(),
        };

        if item.superclass_idx != NO_INDEX {
            class.super_class = Some(dex.get_type(item.superclass_idx)?);
        }

        if item.interfaces_off != 0 {
            dex.rd.goto(item.interfaces_off as u64)?;
            let types = TypeList::read(&mut dex.rd)
                .map_err(|e| record_error(e, item.interfaces_off as u64))?;
            for type_item in &types.list {
                class.interfaces.push(dex.get_type(type_item.type_idx as u32)?);
            }
        }

        if item.source_file_idx != NO_INDEX {
            class.source_file = Some(dex.get_string(item.source_file_idx)?);
        }

        if item.class_data_off != 0 {
            dex.rd.goto(item.class_data_off as u64)?;
            let data = ClassDataItem::read(&mut dex.rd)
                .map_err(|e| record_error(e, item.class_data_off as u64))?;

            class.process_fields(&data, dex)?;
            class.process_methods(&data, dex)?;
            class.process_init_values(&item, dex)?;
        }

        debug!(
            "resolved class {}: {} fields, {} methods",
            class.type_.descriptor,
            class.static_fields.len() + class.instance_fields.len(),
            class.direct_methods.len() + class.virtual_methods.len(),
        );
        Ok(class)
    }

    fn process_fields<R>(&mut self, data: &ClassDataItem, dex: &mut Dex<R>) -> Result<()>
    where
        R: Read + Seek,
    {
        // The idx_diff of the first entry is an absolute field_ids index;
        // every following entry is a delta on its predecessor.
        macro_rules! walk {
            ($attr:ident) => {
                let mut index = 0;
                for encoded in &data.$attr {
                    index += encoded.field_idx_diff.0;
                    self.$attr.push(ClassField {
                        field: dex.get_field(index)?,
                        access_flags: AccessFlags::from_bits(encoded.access_flags.0),
                        init_value: None,
                    });
                }
            };
        }
        walk!(static_fields);
        walk!(instance_fields);
        Ok(())
    }

    fn process_methods<R>(&mut self, data: &ClassDataItem, dex: &mut Dex<R>) -> Result<()>
    where
        R: Read + Seek,
    {
        macro_rules! walk {
            ($attr:ident) => {
                let mut index = 0;
                for encoded in &data.$attr {
                    index += encoded.method_idx_diff.0;
                    let code_off = match encoded.code_off.0 {
                        0 => None,
                        off => Some(off),
                    };
                    self.$attr.push(ClassMethod {
                        method: dex.get_method(index, code_off)?,
                        access_flags: AccessFlags::from_bits(encoded.access_flags.0),
                    });
                }
            };
        }
        walk!(direct_methods);
        walk!(virtual_methods);
        Ok(())
    }

    fn process_init_values<R>(&mut self, item: &ClassDefItem, dex: &mut Dex<R>) -> Result<()>
    where
        R: Read + Seek,
    {
        if item.static_values_off == 0 {
            return Ok(());
        }

        dex.rd.goto(item.static_values_off as u64)?;
        let values = encoded_value::read_array(&mut dex.rd)?;
        if values.len() > self.static_fields.len() {
            return Err(DexError::BadClassData(
                "more static values than static fields".to_string(),
            ));
        }

        // values map onto the leading static fields in declaration order
        for (field, value) in self.static_fields.iter_mut().zip(values) {
            field.init_value = Some(value);
        }
        Ok(())
    }
}

/* public API */
impl DexClass {
    pub fn methods(&self) -> impl Iterator<Item = &ClassMethod> {
        self.direct_methods.iter().chain(self.virtual_methods.iter())
    }

    pub fn fields(&self) -> impl Iterator<Item = &ClassField> {
        self.static_fields.iter().chain(self.instance_fields.iter())
    }
}
