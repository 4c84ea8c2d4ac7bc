//! WriteProperty service codec
//!
//! ```text
//! WriteProperty-Request ::= SEQUENCE {
//!     object-identifier    [0] BACnetObjectIdentifier,
//!     property-identifier  [1] BACnetPropertyIdentifier,
//!     property-array-index [2] Unsigned OPTIONAL,
//!     property-value       [3] ABSTRACT-SYNTAX.&Type,
//!     priority             [4] Unsigned (1..16) OPTIONAL
//! }
//! ```
//!
//! The property-value payload stays raw in the request struct so a
//! malformed value is a semantic error (`value-out-of-range`) at dispatch
//! time rather than a syntax error at decode time.

use crate::encoding::constructed::enclosed_data_length;
use crate::encoding::value::ApplicationDataValue;
use crate::encoding::{
    decode_context_enumerated, decode_context_object_id, decode_context_unsigned,
    encode_closing_tag, encode_context_enumerated, encode_context_object_id,
    encode_context_unsigned, encode_opening_tag, EncodingError, Result, Tag,
};
use crate::object::{ObjectIdentifier, PropertyIdentifier};

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

fn next_is_context(data: &[u8], number: u8) -> bool {
    matches!(Tag::decode(data), Ok((tag, _)) if tag.is_context(number))
}

fn next_is_opening(data: &[u8], number: u8) -> bool {
    matches!(Tag::decode(data), Ok((tag, _)) if tag.is_opening(number))
}

/// WriteProperty service request
#[derive(Debug, Clone, PartialEq)]
pub struct WritePropertyRequest {
    pub object_id: ObjectIdentifier,
    pub property: PropertyIdentifier,
    pub array_index: Option<u32>,
    /// Raw encoded payload of the `[3]` envelope.
    pub value_payload: Vec<u8>,
    pub priority: Option<u8>,
}

impl WritePropertyRequest {
    pub fn new(
        object_id: ObjectIdentifier,
        property: PropertyIdentifier,
        value: &ApplicationDataValue,
    ) -> Self {
        let mut value_payload = Vec::new();
        // Vec-backed encoding of an application value cannot fail.
        let _ = value.encode(&mut value_payload);
        Self {
            object_id,
            property,
            array_index: None,
            value_payload,
            priority: None,
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_array_index(mut self, array_index: u32) -> Self {
        self.array_index = Some(array_index);
        self
    }

    /// Decode the payload as a single application value.
    pub fn decode_value(&self) -> Result<ApplicationDataValue> {
        let (value, consumed) = ApplicationDataValue::decode(&self.value_payload)?;
        if consumed != self.value_payload.len() {
            return Err(EncodingError::InvalidLength);
        }
        Ok(value)
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        let start = buffer.len();
        encode_context_object_id(
            buffer,
            0,
            self.object_id.object_type.into(),
            self.object_id.instance,
        )?;
        encode_context_enumerated(buffer, 1, self.property.into())?;
        if let Some(index) = self.array_index {
            encode_context_unsigned(buffer, 2, index as u64)?;
        }
        encode_opening_tag(buffer, 3)?;
        buffer.extend_from_slice(&self.value_payload);
        encode_closing_tag(buffer, 3)?;
        if let Some(priority) = self.priority {
            encode_context_unsigned(buffer, 4, priority as u64)?;
        }
        Ok(buffer.len() - start)
    }

    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let mut pos = 0;
        let ((object_type, instance), consumed) = decode_context_object_id(&data[pos..], 0)?;
        pos += consumed;
        let (property, consumed) = decode_context_enumerated(&data[pos..], 1)?;
        pos += consumed;

        let array_index = if next_is_context(&data[pos..], 2) {
            let (index, consumed) = decode_context_unsigned(&data[pos..], 2)?;
            pos += consumed;
            Some(index as u32)
        } else {
            None
        };

        if !next_is_opening(&data[pos..], 3) {
            return Err(EncodingError::TagMismatch);
        }
        let inner_len = enclosed_data_length(&data[pos..])?;
        let value_payload = data[pos + 1..pos + 1 + inner_len].to_vec();
        pos += inner_len + 2;

        let priority = if pos < data.len() && next_is_context(&data[pos..], 4) {
            let (priority, consumed) = decode_context_unsigned(&data[pos..], 4)?;
            if !(1..=16).contains(&priority) {
                return Err(EncodingError::ValueOutOfRange);
            }
            pos += consumed;
            Some(priority as u8)
        } else {
            None
        };

        Ok((
            Self {
                object_id: ObjectIdentifier::from_parts(object_type, instance),
                property: PropertyIdentifier::from(property),
                array_index,
                value_payload,
                priority,
            },
            pos,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectType;

    #[test]
    fn test_write_property_roundtrip() {
        let request = WritePropertyRequest::new(
            ObjectIdentifier::new(ObjectType::AnalogOutput, 1),
            PropertyIdentifier::PresentValue,
            &ApplicationDataValue::Real(25.0),
        )
        .with_priority(8);

        let mut buffer = Vec::new();
        request.encode(&mut buffer).unwrap();
        let (decoded, consumed) = WritePropertyRequest::decode(&buffer).unwrap();
        assert_eq!(decoded, request);
        assert_eq!(consumed, buffer.len());
        assert_eq!(decoded.decode_value().unwrap(), ApplicationDataValue::Real(25.0));
    }

    #[test]
    fn test_write_null_is_relinquish_payload() {
        let request = WritePropertyRequest::new(
            ObjectIdentifier::new(ObjectType::AnalogOutput, 1),
            PropertyIdentifier::PresentValue,
            &ApplicationDataValue::Null,
        )
        .with_priority(8);

        let mut buffer = Vec::new();
        request.encode(&mut buffer).unwrap();
        let (decoded, _) = WritePropertyRequest::decode(&buffer).unwrap();
        assert!(decoded.decode_value().unwrap().is_null());
    }

    #[test]
    fn test_write_property_rejects_priority_out_of_band() {
        let request = WritePropertyRequest::new(
            ObjectIdentifier::new(ObjectType::AnalogOutput, 1),
            PropertyIdentifier::PresentValue,
            &ApplicationDataValue::Real(1.0),
        )
        .with_priority(17);

        let mut buffer = Vec::new();
        request.encode(&mut buffer).unwrap();
        assert!(matches!(
            WritePropertyRequest::decode(&buffer),
            Err(EncodingError::ValueOutOfRange)
        ));
    }

    #[test]
    fn test_write_property_array_element() {
        let request = WritePropertyRequest::new(
            ObjectIdentifier::new(ObjectType::AnalogOutput, 1),
            PropertyIdentifier::PriorityArray,
            &ApplicationDataValue::Real(10.0),
        )
        .with_array_index(8);

        let mut buffer = Vec::new();
        request.encode(&mut buffer).unwrap();
        let (decoded, _) = WritePropertyRequest::decode(&buffer).unwrap();
        assert_eq!(decoded.array_index, Some(8));
    }
}
