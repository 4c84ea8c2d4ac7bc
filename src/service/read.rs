//! ReadProperty and ReadPropertyMultiple service codecs
//!
//! ```text
//! ReadProperty-Request ::= SEQUENCE {
//!     object-identifier    [0] BACnetObjectIdentifier,
//!     property-identifier  [1] BACnetPropertyIdentifier,
//!     property-array-index [2] Unsigned OPTIONAL
//! }
//! ```
//!
//! The acks carry the property payload as raw encoded bytes: the caller
//! decides whether to decode one application value, a whole array or a
//! constructed type.

use crate::encoding::constructed::{enclosed_data_length, ReadAccessSpecification};
use crate::encoding::{
    decode_context_enumerated, decode_context_object_id, decode_context_unsigned,
    encode_closing_tag, encode_context_enumerated, encode_context_object_id,
    encode_context_unsigned, encode_opening_tag, decode_application_enumerated,
    encode_application_enumerated, EncodingError, Result, Tag, TagClass,
};
use crate::object::{ObjectIdentifier, PropertyIdentifier};
use crate::service::{ErrorClass, ErrorCode};

#[cfg(not(feature = "std"))]
use alloc::{string::ToString, vec::Vec};

fn next_is_context(data: &[u8], number: u8) -> bool {
    matches!(Tag::decode(data), Ok((tag, _)) if tag.is_context(number))
}

fn next_is_opening(data: &[u8], number: u8) -> bool {
    matches!(Tag::decode(data), Ok((tag, _)) if tag.is_opening(number))
}

fn next_is_closing(data: &[u8], number: u8) -> bool {
    matches!(Tag::decode(data), Ok((tag, _)) if tag.is_closing(number))
}

/// ReadProperty service request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPropertyRequest {
    pub object_id: ObjectIdentifier,
    pub property: PropertyIdentifier,
    pub array_index: Option<u32>,
}

impl ReadPropertyRequest {
    pub fn new(object_id: ObjectIdentifier, property: PropertyIdentifier) -> Self {
        Self {
            object_id,
            property,
            array_index: None,
        }
    }

    pub fn with_array_index(
        object_id: ObjectIdentifier,
        property: PropertyIdentifier,
        array_index: u32,
    ) -> Self {
        Self {
            object_id,
            property,
            array_index: Some(array_index),
        }
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
        Ok(buffer.len() - start)
    }

    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let mut pos = 0;
        let ((object_type, instance), consumed) = decode_context_object_id(&data[pos..], 0)?;
        pos += consumed;
        let (property, consumed) = decode_context_enumerated(&data[pos..], 1)?;
        pos += consumed;
        let array_index = if pos < data.len() && next_is_context(&data[pos..], 2) {
            let (index, consumed) = decode_context_unsigned(&data[pos..], 2)?;
            pos += consumed;
            Some(index as u32)
        } else {
            None
        };
        Ok((
            Self {
                object_id: ObjectIdentifier::from_parts(object_type, instance),
                property: PropertyIdentifier::from(property),
                array_index,
            },
            pos,
        ))
    }
}

/// ReadProperty complex-ack payload
#[derive(Debug, Clone, PartialEq)]
pub struct ReadPropertyAck {
    pub object_id: ObjectIdentifier,
    pub property: PropertyIdentifier,
    pub array_index: Option<u32>,
    /// Raw encoded property payload from the `[3]` envelope.
    pub property_value: Vec<u8>,
}

impl ReadPropertyAck {
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
        buffer.extend_from_slice(&self.property_value);
        encode_closing_tag(buffer, 3)?;
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
        let property_value = data[pos + 1..pos + 1 + inner_len].to_vec();
        pos += inner_len + 2;

        Ok((
            Self {
                object_id: ObjectIdentifier::from_parts(object_type, instance),
                property: PropertyIdentifier::from(property),
                array_index,
                property_value,
            },
            pos,
        ))
    }
}

/// ReadPropertyMultiple service request: a sequence of read-access
/// specifications.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadPropertyMultipleRequest {
    pub specifications: Vec<ReadAccessSpecification>,
}

impl ReadPropertyMultipleRequest {
    pub fn new(specifications: Vec<ReadAccessSpecification>) -> Self {
        Self { specifications }
    }

    pub fn add_specification(&mut self, specification: ReadAccessSpecification) {
        self.specifications.push(specification);
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        let start = buffer.len();
        for specification in &self.specifications {
            specification.encode(buffer)?;
        }
        Ok(buffer.len() - start)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut specifications = Vec::new();
        let mut pos = 0;
        while pos < data.len() {
            let (specification, consumed) = ReadAccessSpecification::decode(&data[pos..])?;
            specifications.push(specification);
            pos += consumed;
        }
        if specifications.is_empty() {
            return Err(EncodingError::UnexpectedEndOfData);
        }
        Ok(Self { specifications })
    }
}

/// Outcome of one property access inside an RPM ack: the raw payload on
/// success, the error pair otherwise. Per-property errors ride alongside
/// successes in the same ack.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyAccessOutcome {
    Value(Vec<u8>),
    Error { class: ErrorClass, code: ErrorCode },
}

/// One per-property result inside a read-access result.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyAccessResult {
    pub property: PropertyIdentifier,
    pub array_index: Option<u32>,
    pub outcome: PropertyAccessOutcome,
}

/// `ReadAccessResult ::= SEQUENCE { [0] object-id, [1] {results} }` where
/// each result is `[2] property, [3] index?, [4] {value} | [5] {error}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadAccessResult {
    pub object_id: ObjectIdentifier,
    pub results: Vec<PropertyAccessResult>,
}

impl ReadAccessResult {
    pub fn new(object_id: ObjectIdentifier) -> Self {
        Self {
            object_id,
            results: Vec::new(),
        }
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        let start = buffer.len();
        encode_context_object_id(
            buffer,
            0,
            self.object_id.object_type.into(),
            self.object_id.instance,
        )?;
        encode_opening_tag(buffer, 1)?;
        for result in &self.results {
            encode_context_enumerated(buffer, 2, result.property.into())?;
            if let Some(index) = result.array_index {
                encode_context_unsigned(buffer, 3, index as u64)?;
            }
            match &result.outcome {
                PropertyAccessOutcome::Value(payload) => {
                    encode_opening_tag(buffer, 4)?;
                    buffer.extend_from_slice(payload);
                    encode_closing_tag(buffer, 4)?;
                }
                PropertyAccessOutcome::Error { class, code } => {
                    encode_opening_tag(buffer, 5)?;
                    encode_application_enumerated(buffer, (*class).into())?;
                    encode_application_enumerated(buffer, (*code).into())?;
                    encode_closing_tag(buffer, 5)?;
                }
            }
        }
        encode_closing_tag(buffer, 1)?;
        Ok(buffer.len() - start)
    }

    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let mut pos = 0;
        let ((object_type, instance), consumed) = decode_context_object_id(&data[pos..], 0)?;
        pos += consumed;

        if !next_is_opening(&data[pos..], 1) {
            return Err(EncodingError::TagMismatch);
        }
        pos += 1;

        let mut results = Vec::new();
        while !next_is_closing(&data[pos..], 1) {
            let (property, consumed) = decode_context_enumerated(&data[pos..], 2)?;
            pos += consumed;
            let array_index = if next_is_context(&data[pos..], 3) {
                let (index, consumed) = decode_context_unsigned(&data[pos..], 3)?;
                pos += consumed;
                Some(index as u32)
            } else {
                None
            };

            let outcome = if next_is_opening(&data[pos..], 4) {
                let inner_len = enclosed_data_length(&data[pos..])?;
                let payload = data[pos + 1..pos + 1 + inner_len].to_vec();
                pos += inner_len + 2;
                PropertyAccessOutcome::Value(payload)
            } else if next_is_opening(&data[pos..], 5) {
                let inner_len = enclosed_data_length(&data[pos..])?;
                let inner = &data[pos + 1..pos + 1 + inner_len];
                let (class, consumed_class) = decode_application_enumerated(inner)?;
                let (code, consumed_code) = decode_application_enumerated(&inner[consumed_class..])?;
                if consumed_class + consumed_code != inner_len {
                    return Err(EncodingError::InvalidFormat(
                        "trailing bytes in property error".to_string(),
                    ));
                }
                pos += inner_len + 2;
                PropertyAccessOutcome::Error {
                    class: ErrorClass::from(class),
                    code: ErrorCode::from(code),
                }
            } else {
                return Err(EncodingError::TagMismatch);
            };

            results.push(PropertyAccessResult {
                property: PropertyIdentifier::from(property),
                array_index,
                outcome,
            });
        }
        pos += 1;

        Ok((
            Self {
                object_id: ObjectIdentifier::from_parts(object_type, instance),
                results,
            },
            pos,
        ))
    }
}

/// ReadPropertyMultiple complex-ack payload: a sequence of read-access
/// results.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadPropertyMultipleAck {
    pub results: Vec<ReadAccessResult>,
}

impl ReadPropertyMultipleAck {
    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        let start = buffer.len();
        for result in &self.results {
            result.encode(buffer)?;
        }
        Ok(buffer.len() - start)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut results = Vec::new();
        let mut pos = 0;
        while pos < data.len() {
            let (result, consumed) = ReadAccessResult::decode(&data[pos..])?;
            results.push(result);
            pos += consumed;
        }
        Ok(Self { results })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::constructed::PropertyReference;
    use crate::encoding::encode_application_real;
    use crate::object::ObjectType;

    #[cfg(not(feature = "std"))]
    use alloc::vec;

    #[test]
    fn test_read_property_request_roundtrip() {
        let request = ReadPropertyRequest::new(
            ObjectIdentifier::new(ObjectType::AnalogInput, 0),
            PropertyIdentifier::PresentValue,
        );
        let mut buffer = Vec::new();
        request.encode(&mut buffer).unwrap();
        // [0] object-id, [1] property 85
        assert_eq!(buffer, [0x0C, 0x00, 0x00, 0x00, 0x00, 0x19, 0x55]);

        let (decoded, consumed) = ReadPropertyRequest::decode(&buffer).unwrap();
        assert_eq!(decoded, request);
        assert_eq!(consumed, buffer.len());
    }

    #[test]
    fn test_read_property_request_with_index() {
        let request = ReadPropertyRequest::with_array_index(
            ObjectIdentifier::new(ObjectType::AnalogOutput, 1),
            PropertyIdentifier::PriorityArray,
            8,
        );
        let mut buffer = Vec::new();
        request.encode(&mut buffer).unwrap();
        let (decoded, _) = ReadPropertyRequest::decode(&buffer).unwrap();
        assert_eq!(decoded.array_index, Some(8));
    }

    #[test]
    fn test_read_property_ack_roundtrip() {
        let mut payload = Vec::new();
        encode_application_real(&mut payload, 72.5).unwrap();

        let ack = ReadPropertyAck {
            object_id: ObjectIdentifier::new(ObjectType::AnalogInput, 0),
            property: PropertyIdentifier::PresentValue,
            array_index: None,
            property_value: payload,
        };
        let mut buffer = Vec::new();
        ack.encode(&mut buffer).unwrap();
        let (decoded, consumed) = ReadPropertyAck::decode(&buffer).unwrap();
        assert_eq!(decoded, ack);
        assert_eq!(consumed, buffer.len());
    }

    #[test]
    fn test_rpm_request_roundtrip() {
        let mut spec =
            ReadAccessSpecification::new(ObjectIdentifier::new(ObjectType::AnalogInput, 4));
        spec.add_property(PropertyReference::new(PropertyIdentifier::PresentValue));
        spec.add_property(PropertyReference::new(PropertyIdentifier::StatusFlags));
        let mut spec2 =
            ReadAccessSpecification::new(ObjectIdentifier::new(ObjectType::BinaryValue, 7));
        spec2.add_property(PropertyReference::new(PropertyIdentifier::PresentValue));

        let request = ReadPropertyMultipleRequest::new(vec![spec, spec2]);
        let mut buffer = Vec::new();
        request.encode(&mut buffer).unwrap();
        let decoded = ReadPropertyMultipleRequest::decode(&buffer).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_rpm_ack_interleaved_errors() {
        let mut payload = Vec::new();
        encode_application_real(&mut payload, 21.0).unwrap();

        let mut result = ReadAccessResult::new(ObjectIdentifier::new(ObjectType::AnalogInput, 4));
        result.results.push(PropertyAccessResult {
            property: PropertyIdentifier::PresentValue,
            array_index: None,
            outcome: PropertyAccessOutcome::Value(payload),
        });
        result.results.push(PropertyAccessResult {
            property: PropertyIdentifier::from(999u32),
            array_index: None,
            outcome: PropertyAccessOutcome::Error {
                class: ErrorClass::Property,
                code: ErrorCode::UnknownProperty,
            },
        });

        let ack = ReadPropertyMultipleAck {
            results: vec![result],
        };
        let mut buffer = Vec::new();
        ack.encode(&mut buffer).unwrap();
        let decoded = ReadPropertyMultipleAck::decode(&buffer).unwrap();
        assert_eq!(decoded, ack);

        // The error rides next to the success in the same result list.
        let outcomes = &decoded.results[0].results;
        assert!(matches!(outcomes[0].outcome, PropertyAccessOutcome::Value(_)));
        assert!(matches!(
            outcomes[1].outcome,
            PropertyAccessOutcome::Error {
                class: ErrorClass::Property,
                code: ErrorCode::UnknownProperty
            }
        ));
    }

    #[test]
    fn test_rpm_request_rejects_empty() {
        assert!(ReadPropertyMultipleRequest::decode(&[]).is_err());
    }
}
