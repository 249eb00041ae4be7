//! Decoding of `encoded_value` records, used for the initial values of
//! static fields.
//!
//! Each value starts with a lead byte holding the value type in its low
//! five bits and a type-specific argument in the high three. For the
//! integral types the argument is the number of payload bytes minus one;
//! sign- or zero-extension reconstructs the full width.

use std::io::{Read, Seek};

use super::types::*;
use crate::error::DexError;
use crate::io::ReadExt;
use crate::Result;

const VALUE_BYTE: u8 = 0x00;
const VALUE_SHORT: u8 = 0x02;
const VALUE_CHAR: u8 = 0x03;
const VALUE_INT: u8 = 0x04;
const VALUE_LONG: u8 = 0x06;
const VALUE_FLOAT: u8 = 0x10;
const VALUE_DOUBLE: u8 = 0x11;
const VALUE_METHOD_TYPE: u8 = 0x15;
const VALUE_METHOD_HANDLE: u8 = 0x16;
const VALUE_STRING: u8 = 0x17;
const VALUE_TYPE: u8 = 0x18;
const VALUE_FIELD: u8 = 0x19;
const VALUE_METHOD: u8 = 0x1A;
const VALUE_ENUM: u8 = 0x1B;
const VALUE_ARRAY: u8 = 0x1C;
const VALUE_NULL: u8 = 0x1E;
const VALUE_BOOLEAN: u8 = 0x1F;

/// A decoded `encoded_value`. Pool-typed variants carry the raw index into
/// their pool; resolution is up to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedValue {
    Byte(Byte),
    Short(Short),
    Char(UShort),
    Int(Int),
    Long(Long),
    Float(f32),
    Double(f64),
    MethodType(UInt),
    MethodHandle(UInt),
    String(UInt),
    Type(UInt),
    Field(UInt),
    Method(UInt),
    Enum(UInt),
    Array(Vec<EncodedValue>),
    Null,
    Boolean(bool),
}

/// Reads one `encoded_value` at the reader's position.
pub fn read_value<R: Read + Seek>(reader: &mut R) -> Result<EncodedValue> {
    let offset = reader.pos()?;
    let lead = reader.read_ubyte()?;
    let value_type = lead & 0x1F;
    let value_arg = (lead >> 5) as usize;

    let value = match value_type {
        VALUE_BYTE => EncodedValue::Byte(reader.read_ubyte()? as i8),
        VALUE_SHORT => EncodedValue::Short(sign_extended(reader, value_arg + 1)? as i16),
        VALUE_CHAR => EncodedValue::Char(zero_extended(reader, value_arg + 1)? as u16),
        VALUE_INT => EncodedValue::Int(sign_extended(reader, value_arg + 1)? as i32),
        VALUE_LONG => EncodedValue::Long(sign_extended(reader, value_arg + 1)?),
        VALUE_FLOAT => {
            if value_arg >= 4 {
                return Err(DexError::BadValue { value_type, offset });
            }
            let bits = right_extended(reader, value_arg + 1, 4)? as u32;
            EncodedValue::Float(f32::from_bits(bits))
        }
        VALUE_DOUBLE => {
            let bits = right_extended(reader, value_arg + 1, 8)?;
            EncodedValue::Double(f64::from_bits(bits))
        }
        VALUE_METHOD_TYPE => EncodedValue::MethodType(zero_extended(reader, value_arg + 1)? as u32),
        VALUE_METHOD_HANDLE => {
            EncodedValue::MethodHandle(zero_extended(reader, value_arg + 1)? as u32)
        }
        VALUE_STRING => EncodedValue::String(zero_extended(reader, value_arg + 1)? as u32),
        VALUE_TYPE => EncodedValue::Type(zero_extended(reader, value_arg + 1)? as u32),
        VALUE_FIELD => EncodedValue::Field(zero_extended(reader, value_arg + 1)? as u32),
        VALUE_METHOD => EncodedValue::Method(zero_extended(reader, value_arg + 1)? as u32),
        VALUE_ENUM => EncodedValue::Enum(zero_extended(reader, value_arg + 1)? as u32),
        VALUE_ARRAY => EncodedValue::Array(read_array(reader)?),
        VALUE_NULL => EncodedValue::Null,
        VALUE_BOOLEAN => EncodedValue::Boolean(value_arg != 0),
        // VALUE_ANNOTATION (0x1D) is deliberately not handled; annotation
        // decoding is outside this crate's scope.
        _ => return Err(DexError::BadValue { value_type, offset }),
    };
    Ok(value)
}

/// Reads an `encoded_array`: a ULEB128 count followed by that many values.
pub fn read_array<R: Read + Seek>(reader: &mut R) -> Result<Vec<EncodedValue>> {
    let size = reader.read_uleb128()? as usize;
    let mut values = Vec::with_capacity(size);
    for _ in 0..size {
        values.push(read_value(reader)?);
    }
    Ok(values)
}

fn zero_extended<R: Read + Seek>(reader: &mut R, size: usize) -> Result<u64> {
    let mut value: u64 = 0;
    for (i, byte) in reader.read_bytes(size)?.into_iter().enumerate() {
        value |= (byte as u64) << (8 * i);
    }
    Ok(value)
}

fn sign_extended<R: Read + Seek>(reader: &mut R, size: usize) -> Result<i64> {
    let value = zero_extended(reader, size)?;
    let shift = 64 - 8 * size as u32;
    Ok(((value << shift) as i64) >> shift)
}

/// Float and double payloads are zero-extended to the right: the stored
/// bytes are the most significant ones.
fn right_extended<R: Read + Seek>(reader: &mut R, size: usize, width: usize) -> Result<u64> {
    Ok(zero_extended(reader, size)? << (8 * (width - size) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn decode(bytes: &[u8]) -> Result<EncodedValue> {
        read_value(&mut Cursor::new(bytes))
    }

    #[test]
    fn test_integrals() {
        assert_eq!(decode(&[0x00, 0xFF]).unwrap(), EncodedValue::Byte(-1));
        assert_eq!(decode(&[0x04, 0x2A]).unwrap(), EncodedValue::Int(42));
        // two payload bytes, sign-extended
        assert_eq!(
            decode(&[0x24, 0x00, 0x80]).unwrap(),
            EncodedValue::Int(-32768)
        );
        assert_eq!(decode(&[0x06, 0x80]).unwrap(), EncodedValue::Long(-128));
    }

    #[test]
    fn test_floats() {
        // 2.0f is 0x40000000; only the high byte is stored
        assert_eq!(decode(&[0x10, 0x40]).unwrap(), EncodedValue::Float(2.0));
        assert_eq!(decode(&[0x11, 0x40]).unwrap(), EncodedValue::Double(2.0));
    }

    #[test]
    fn test_pool_indices_and_constants() {
        assert_eq!(decode(&[0x17, 0x07]).unwrap(), EncodedValue::String(7));
        assert_eq!(decode(&[0x1E]).unwrap(), EncodedValue::Null);
        assert_eq!(decode(&[0x3F]).unwrap(), EncodedValue::Boolean(true));
        assert_eq!(decode(&[0x1F]).unwrap(), EncodedValue::Boolean(false));
    }

    #[test]
    fn test_array() {
        let value = decode(&[0x1C, 0x02, 0x04, 0x01, 0x04, 0x02]).unwrap();
        assert_eq!(
            value,
            EncodedValue::Array(vec![EncodedValue::Int(1), EncodedValue::Int(2)])
        );
    }

    #[test]
    fn test_annotation_rejected() {
        assert!(matches!(
            decode(&[0x1D]),
            Err(DexError::BadValue {
                value_type: 0x1D,
                offset: 0
            })
        ));
    }
}
