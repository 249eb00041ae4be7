use std::rc::Rc;

use crate::dex::{AccessFlags, DexType, EncodedValue};

/// A field as described by the `field_ids` pool, with its pool links
/// resolved.
#[derive(Debug, Clone)]
pub struct DexField {
    /// index into the `field_ids` pool
    pub identity: u32,

    /// The declaring class of this field
    pub class: Rc<DexType>,

    /// The type of the field (may be primitive, class or array type)
    pub type_: Rc<DexType>,

    /// The name of the field
    pub name: Rc<String>,
}

/// A field declared by a class, as listed in its class data block.
#[derive(Debug)]
pub struct ClassField {
    pub field: Rc<DexField>,

    pub access_flags: Option<AccessFlags>,

    /// The initial value of this field. Only static fields with a
    /// recorded static value carry one.
    pub init_value: Option<EncodedValue>,
}
