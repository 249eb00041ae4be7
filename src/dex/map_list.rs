use std::collections::BTreeMap;

use binrw::binread;

use super::types::*;
use crate::error::DexError;
use crate::Result;

/// Well-known section type codes. Kept as plain constants so that entries
/// with codes this crate does not know about survive the decode.
pub mod section {
    pub const HEADER_ITEM: u16 = 0x0000;
    pub const STRING_ID_ITEM: u16 = 0x0001;
    pub const TYPE_ID_ITEM: u16 = 0x0002;
    pub const PROTO_ID_ITEM: u16 = 0x0003;
    pub const FIELD_ID_ITEM: u16 = 0x0004;
    pub const METHOD_ID_ITEM: u16 = 0x0005;
    pub const CLASS_DEF_ITEM: u16 = 0x0006;
    pub const CALL_SITE_ID_ITEM: u16 = 0x0007;
    pub const METHOD_HANDLE_ITEM: u16 = 0x0008;
    pub const MAP_LIST: u16 = 0x1000;
    pub const TYPE_LIST: u16 = 0x1001;
    pub const ANNOTATION_SET_REF_LIST: u16 = 0x1002;
    pub const ANNOTATION_SET_ITEM: u16 = 0x1003;
    pub const CLASS_DATA_ITEM: u16 = 0x2000;
    pub const CODE_ITEM: u16 = 0x2001;
    pub const STRING_DATA_ITEM: u16 = 0x2002;
    pub const DEBUG_INFO_ITEM: u16 = 0x2003;
    pub const ANNOTATION_ITEM: u16 = 0x2004;
    pub const ENCODED_ARRAY_ITEM: u16 = 0x2005;
    pub const ANNOTATIONS_DIRECTORY_ITEM: u16 = 0x2006;
    pub const HIDDENAPI_CLASS_DATA_ITEM: u16 = 0xF000;
}

#[binread]
#[br(little)]
#[derive(Debug)]
pub struct MapItem {
    /// type code of the section described by this entry
    #[br(pad_after = 2)]
    pub type_: UShort,

    /// count of the number of items to be found at the indicated offset
    pub size: UInt,

    /// offset from the start of the file to the section
    pub offset: UInt,
}

/// The raw on-disk map list: a count followed by that many entries.
#[binread]
#[br(little)]
#[derive(Debug)]
pub struct RawMapList {
    pub size: UInt,

    #[br(count = size as usize)]
    pub list: Vec<MapItem>,
}

/// The decoded section map, keyed by type code.
///
/// Entries are unique per type code; a duplicate marks the image as
/// malformed.
#[derive(Debug, Default)]
pub struct SectionMap {
    entries: BTreeMap<UShort, (UInt, UInt)>,
}

impl SectionMap {
    pub(crate) fn from_raw(raw: RawMapList) -> Result<SectionMap> {
        let mut entries = BTreeMap::new();
        for item in raw.list {
            if entries.insert(item.type_, (item.size, item.offset)).is_some() {
                return Err(DexError::MalformedMap(format!(
                    "duplicate entry for type code {:#06x}",
                    item.type_
                )));
            }
        }
        Ok(SectionMap { entries })
    }

    /// Returns `(count, offset)` for a type code, if present.
    pub fn get(&self, type_: UShort) -> Option<(UInt, UInt)> {
        self.entries.get(&type_).copied()
    }

    pub fn item_count(&self, type_: UShort) -> UInt {
        self.get(type_).map(|(count, _)| count).unwrap_or(0)
    }

    pub fn item_offset(&self, type_: UShort) -> UInt {
        self.get(type_).map(|(_, offset)| offset).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (UShort, (UInt, UInt))> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binrw::BinRead;
    use std::io::Cursor;

    fn raw(entries: &[(u16, u32, u32)]) -> RawMapList {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        for (type_, size, offset) in entries {
            bytes.extend_from_slice(&type_.to_le_bytes());
            bytes.extend_from_slice(&[0, 0]);
            bytes.extend_from_slice(&size.to_le_bytes());
            bytes.extend_from_slice(&offset.to_le_bytes());
        }
        RawMapList::read(&mut Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn test_decode() {
        let map = SectionMap::from_raw(raw(&[
            (section::HEADER_ITEM, 1, 0),
            (section::STRING_ID_ITEM, 3, 0x70),
        ]))
        .unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(section::STRING_ID_ITEM), Some((3, 0x70)));
        assert_eq!(map.item_count(section::CODE_ITEM), 0);
    }

    #[test]
    fn test_duplicate_entry() {
        let result = SectionMap::from_raw(raw(&[
            (section::HEADER_ITEM, 1, 0),
            (section::HEADER_ITEM, 1, 0x70),
        ]));
        assert!(matches!(result, Err(DexError::MalformedMap(_))));
    }
}
