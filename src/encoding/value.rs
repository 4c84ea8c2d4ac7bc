//! Application Data Values
//!
//! The tagged union covering every BACnet primitive an application property
//! can carry, discriminated by its application tag. This is the unit of
//! payload handed between the service codecs and the object dispatch layer:
//! a WriteProperty payload decodes into one of these, a ReadProperty ack
//! encodes one (or a sequence) back out.

use core::fmt;

use crate::encoding::{
    decode_bit_string_content, decode_character_string_content, decode_date_content,
    decode_double_content, decode_object_id_content, decode_octet_string_content,
    decode_real_content, decode_signed_content, decode_time_content, decode_unsigned_content,
    encode_application_bit_string, encode_application_boolean,
    encode_application_character_string, encode_application_date, encode_application_double,
    encode_application_enumerated, encode_application_null, encode_application_object_id,
    encode_application_octet_string, encode_application_real, encode_application_signed,
    encode_application_time, encode_application_unsigned, signed_content_len,
    unsigned_content_len, ApplicationTag, BitString, CharacterString, Date, EncodingError, Result,
    Tag, TagClass, Time,
};
use crate::object::ObjectIdentifier;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// One decoded application-tagged value.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplicationDataValue {
    Null,
    Boolean(bool),
    Unsigned(u64),
    Signed(i64),
    Real(f32),
    Double(f64),
    OctetString(Vec<u8>),
    CharacterString(CharacterString),
    BitString(BitString),
    Enumerated(u32),
    Date(Date),
    Time(Time),
    ObjectId(ObjectIdentifier),
    /// Marker for an empty list; encodes to nothing.
    EmptyList,
}

impl ApplicationDataValue {
    /// The application tag this value encodes under, if any.
    pub fn tag(&self) -> Option<ApplicationTag> {
        match self {
            ApplicationDataValue::Null => Some(ApplicationTag::Null),
            ApplicationDataValue::Boolean(_) => Some(ApplicationTag::Boolean),
            ApplicationDataValue::Unsigned(_) => Some(ApplicationTag::UnsignedInt),
            ApplicationDataValue::Signed(_) => Some(ApplicationTag::SignedInt),
            ApplicationDataValue::Real(_) => Some(ApplicationTag::Real),
            ApplicationDataValue::Double(_) => Some(ApplicationTag::Double),
            ApplicationDataValue::OctetString(_) => Some(ApplicationTag::OctetString),
            ApplicationDataValue::CharacterString(_) => Some(ApplicationTag::CharacterString),
            ApplicationDataValue::BitString(_) => Some(ApplicationTag::BitString),
            ApplicationDataValue::Enumerated(_) => Some(ApplicationTag::Enumerated),
            ApplicationDataValue::Date(_) => Some(ApplicationTag::Date),
            ApplicationDataValue::Time(_) => Some(ApplicationTag::Time),
            ApplicationDataValue::ObjectId(_) => Some(ApplicationTag::ObjectIdentifier),
            ApplicationDataValue::EmptyList => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ApplicationDataValue::Null)
    }

    /// Encode with the appropriate application tag, returning bytes written.
    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        match self {
            ApplicationDataValue::Null => encode_application_null(buffer),
            ApplicationDataValue::Boolean(value) => encode_application_boolean(buffer, *value),
            ApplicationDataValue::Unsigned(value) => encode_application_unsigned(buffer, *value),
            ApplicationDataValue::Signed(value) => encode_application_signed(buffer, *value),
            ApplicationDataValue::Real(value) => encode_application_real(buffer, *value),
            ApplicationDataValue::Double(value) => encode_application_double(buffer, *value),
            ApplicationDataValue::OctetString(value) => {
                encode_application_octet_string(buffer, value)
            }
            ApplicationDataValue::CharacterString(value) => {
                encode_application_character_string(buffer, value)
            }
            ApplicationDataValue::BitString(value) => {
                encode_application_bit_string(buffer, value)
            }
            ApplicationDataValue::Enumerated(value) => {
                encode_application_enumerated(buffer, *value)
            }
            ApplicationDataValue::Date(value) => encode_application_date(buffer, value),
            ApplicationDataValue::Time(value) => encode_application_time(buffer, value),
            ApplicationDataValue::ObjectId(id) => {
                encode_application_object_id(buffer, id.object_type.into(), id.instance)
            }
            ApplicationDataValue::EmptyList => Ok(0),
        }
    }

    /// Bytes `encode` would write, without writing them.
    pub fn encoded_len(&self) -> usize {
        match self {
            ApplicationDataValue::Null | ApplicationDataValue::Boolean(_) => 1,
            ApplicationDataValue::Unsigned(value) => {
                let len = unsigned_content_len(*value);
                Tag::application(ApplicationTag::UnsignedInt, len as u32).encoded_len() + len
            }
            ApplicationDataValue::Signed(value) => {
                let len = signed_content_len(*value);
                Tag::application(ApplicationTag::SignedInt, len as u32).encoded_len() + len
            }
            ApplicationDataValue::Real(_) => 5,
            ApplicationDataValue::Double(_) => {
                Tag::application(ApplicationTag::Double, 8).encoded_len() + 8
            }
            ApplicationDataValue::OctetString(value) => {
                Tag::application(ApplicationTag::OctetString, value.len() as u32).encoded_len()
                    + value.len()
            }
            ApplicationDataValue::CharacterString(value) => {
                let len = value.bytes.len() as u32 + 1;
                Tag::application(ApplicationTag::CharacterString, len).encoded_len() + len as usize
            }
            ApplicationDataValue::BitString(value) => {
                let len = value.byte_len() as u32 + 1;
                Tag::application(ApplicationTag::BitString, len).encoded_len() + len as usize
            }
            ApplicationDataValue::Enumerated(value) => {
                1 + unsigned_content_len(*value as u64)
            }
            ApplicationDataValue::Date(_) | ApplicationDataValue::Time(_) => 5,
            ApplicationDataValue::ObjectId(_) => 5,
            ApplicationDataValue::EmptyList => 0,
        }
    }

    /// Decode one application-tagged value from the front of `data`.
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let (tag, consumed) = Tag::decode(data)?;
        if tag.class != TagClass::Application {
            return Err(EncodingError::InvalidTag);
        }
        let (value, content_len) = Self::decode_content(&tag, &data[consumed..])?;
        Ok((value, consumed + content_len))
    }

    /// Decode the content of a value whose tag header is already consumed.
    ///
    /// Returns the value and the number of content bytes read.
    pub fn decode_content(tag: &Tag, data: &[u8]) -> Result<(Self, usize)> {
        let app_tag = ApplicationTag::try_from(tag.number)?;
        let len = tag.lvt as usize;
        let value = match app_tag {
            ApplicationTag::Null => {
                if tag.lvt != 0 {
                    return Err(EncodingError::InvalidLength);
                }
                return Ok((ApplicationDataValue::Null, 0));
            }
            ApplicationTag::Boolean => {
                let value = match tag.lvt {
                    0 => false,
                    1 => true,
                    _ => return Err(EncodingError::InvalidLength),
                };
                return Ok((ApplicationDataValue::Boolean(value), 0));
            }
            ApplicationTag::UnsignedInt => {
                ApplicationDataValue::Unsigned(decode_unsigned_content(data, len)?)
            }
            ApplicationTag::SignedInt => {
                ApplicationDataValue::Signed(decode_signed_content(data, len)?)
            }
            ApplicationTag::Real => ApplicationDataValue::Real(decode_real_content(data, len)?),
            ApplicationTag::Double => {
                ApplicationDataValue::Double(decode_double_content(data, len)?)
            }
            ApplicationTag::OctetString => {
                ApplicationDataValue::OctetString(decode_octet_string_content(data, len)?)
            }
            ApplicationTag::CharacterString => ApplicationDataValue::CharacterString(
                decode_character_string_content(data, len)?,
            ),
            ApplicationTag::BitString => {
                ApplicationDataValue::BitString(decode_bit_string_content(data, len)?)
            }
            ApplicationTag::Enumerated => {
                if len > 4 {
                    return Err(EncodingError::InvalidLength);
                }
                ApplicationDataValue::Enumerated(decode_unsigned_content(data, len)? as u32)
            }
            ApplicationTag::Date => ApplicationDataValue::Date(decode_date_content(data, len)?),
            ApplicationTag::Time => ApplicationDataValue::Time(decode_time_content(data, len)?),
            ApplicationTag::ObjectIdentifier => {
                let (object_type, instance) = decode_object_id_content(data, len)?;
                ApplicationDataValue::ObjectId(ObjectIdentifier::from_parts(object_type, instance))
            }
            ApplicationTag::Reserved13 | ApplicationTag::Reserved14 | ApplicationTag::Reserved15 => {
                return Err(EncodingError::InvalidTag);
            }
        };
        Ok((value, len))
    }

    /// Decode every application-tagged value in `data`, in order.
    pub fn decode_list(data: &[u8]) -> Result<Vec<Self>> {
        let mut values = Vec::new();
        let mut pos = 0;
        while pos < data.len() {
            let (value, consumed) = Self::decode(&data[pos..])?;
            values.push(value);
            pos += consumed;
        }
        Ok(values)
    }
}

impl fmt::Display for ApplicationDataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationDataValue::Null => write!(f, "Null"),
            ApplicationDataValue::Boolean(value) => write!(f, "{}", value),
            ApplicationDataValue::Unsigned(value) => write!(f, "{}", value),
            ApplicationDataValue::Signed(value) => write!(f, "{}", value),
            ApplicationDataValue::Real(value) => write!(f, "{}", value),
            ApplicationDataValue::Double(value) => write!(f, "{}", value),
            ApplicationDataValue::OctetString(value) => write!(f, "0x{}", hex::encode(value)),
            ApplicationDataValue::CharacterString(value) => write!(f, "\"{}\"", value),
            ApplicationDataValue::BitString(value) => {
                write!(f, "B'")?;
                for i in 0..value.len() {
                    write!(f, "{}", value.bit(i) as u8)?;
                }
                write!(f, "'")
            }
            ApplicationDataValue::Enumerated(value) => write!(f, "enum {}", value),
            ApplicationDataValue::Date(value) => write!(
                f,
                "{}-{}-{} (dow {})",
                value.year, value.month, value.day, value.weekday
            ),
            ApplicationDataValue::Time(value) => write!(
                f,
                "{:02}:{:02}:{:02}.{:02}",
                value.hour, value.minute, value.second, value.hundredths
            ),
            ApplicationDataValue::ObjectId(id) => write!(f, "{:?}:{}", id.object_type, id.instance),
            ApplicationDataValue::EmptyList => write!(f, "{{}}"),
        }
    }
}

impl From<bool> for ApplicationDataValue {
    fn from(value: bool) -> Self {
        ApplicationDataValue::Boolean(value)
    }
}

impl From<u64> for ApplicationDataValue {
    fn from(value: u64) -> Self {
        ApplicationDataValue::Unsigned(value)
    }
}

impl From<u32> for ApplicationDataValue {
    fn from(value: u32) -> Self {
        ApplicationDataValue::Unsigned(value as u64)
    }
}

impl From<i64> for ApplicationDataValue {
    fn from(value: i64) -> Self {
        ApplicationDataValue::Signed(value)
    }
}

impl From<f32> for ApplicationDataValue {
    fn from(value: f32) -> Self {
        ApplicationDataValue::Real(value)
    }
}

impl From<f64> for ApplicationDataValue {
    fn from(value: f64) -> Self {
        ApplicationDataValue::Double(value)
    }
}

impl From<&str> for ApplicationDataValue {
    fn from(value: &str) -> Self {
        ApplicationDataValue::CharacterString(CharacterString::new(value))
    }
}

impl From<ObjectIdentifier> for ApplicationDataValue {
    fn from(value: ObjectIdentifier) -> Self {
        ApplicationDataValue::ObjectId(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectType;

    #[cfg(not(feature = "std"))]
    use alloc::{vec, vec::Vec};

    fn roundtrip(value: ApplicationDataValue) {
        let mut buffer = Vec::new();
        let written = value.encode(&mut buffer).unwrap();
        assert_eq!(written, buffer.len());
        assert_eq!(written, value.encoded_len(), "{:?}", value);

        if matches!(value, ApplicationDataValue::EmptyList) {
            assert!(buffer.is_empty());
            return;
        }
        let (decoded, consumed) = ApplicationDataValue::decode(&buffer).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(consumed, buffer.len());
    }

    #[test]
    fn test_value_roundtrips() {
        roundtrip(ApplicationDataValue::Null);
        roundtrip(ApplicationDataValue::Boolean(true));
        roundtrip(ApplicationDataValue::Unsigned(0));
        roundtrip(ApplicationDataValue::Unsigned(u64::MAX));
        roundtrip(ApplicationDataValue::Signed(-8_388_608));
        roundtrip(ApplicationDataValue::Real(72.5));
        roundtrip(ApplicationDataValue::Double(-1.5e300));
        roundtrip(ApplicationDataValue::OctetString(vec![1, 2, 3]));
        roundtrip(ApplicationDataValue::CharacterString(CharacterString::new(
            "zone-4 setpoint",
        )));
        roundtrip(ApplicationDataValue::BitString(BitString::from_bits(&[
            true, false, false, true,
        ])));
        roundtrip(ApplicationDataValue::Enumerated(95));
        roundtrip(ApplicationDataValue::Date(Date::new(2026, 8, 1, 6)));
        roundtrip(ApplicationDataValue::Time(Time::new(10, 30, 0, 0)));
        roundtrip(ApplicationDataValue::ObjectId(ObjectIdentifier::new(
            ObjectType::AnalogInput,
            7,
        )));
        roundtrip(ApplicationDataValue::EmptyList);
    }

    #[test]
    fn test_long_octet_string_extended_length() {
        let value = ApplicationDataValue::OctetString(vec![0xAB; 300]);
        roundtrip(value);
    }

    #[test]
    fn test_decode_list() {
        let mut buffer = Vec::new();
        ApplicationDataValue::Real(1.0).encode(&mut buffer).unwrap();
        ApplicationDataValue::Unsigned(2).encode(&mut buffer).unwrap();
        ApplicationDataValue::Null.encode(&mut buffer).unwrap();

        let values = ApplicationDataValue::decode_list(&buffer).unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values[1], ApplicationDataValue::Unsigned(2));
    }

    #[test]
    fn test_decode_rejects_context_tag() {
        let data = [0x09, 0x55];
        assert!(ApplicationDataValue::decode(&data).is_err());
    }

    #[test]
    fn test_decode_truncated_value() {
        let mut buffer = Vec::new();
        ApplicationDataValue::Real(3.5).encode(&mut buffer).unwrap();
        assert!(ApplicationDataValue::decode(&buffer[..3]).is_err());
    }
}
