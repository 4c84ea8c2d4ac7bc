//! AddListElement / RemoveListElement service codec
//!
//! ```text
//! AddListElement-Request ::= SEQUENCE {
//!     object-identifier    [0] BACnetObjectIdentifier,
//!     property-identifier  [1] BACnetPropertyIdentifier,
//!     property-array-index [2] Unsigned OPTIONAL,
//!     list-of-elements     [3] ABSTRACT-SYNTAX.&Type
//! }
//! ```
//!
//! RemoveListElement shares the request shape. On partial failure the reply
//! is the ChangeList constructed error carrying the 1-based index of the
//! first element that could not be applied.

use crate::encoding::constructed::enclosed_data_length;
use crate::encoding::{
    decode_application_enumerated, decode_context_enumerated, decode_context_object_id,
    decode_context_unsigned, encode_application_enumerated, encode_closing_tag,
    encode_context_enumerated, encode_context_object_id, encode_context_unsigned,
    encode_opening_tag, EncodingError, Result, Tag,
};
use crate::object::{ObjectIdentifier, PropertyIdentifier};
use crate::service::{ErrorClass, ErrorCode};

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

fn next_is_context(data: &[u8], number: u8) -> bool {
    matches!(Tag::decode(data), Ok((tag, _)) if tag.is_context(number))
}

fn next_is_opening(data: &[u8], number: u8) -> bool {
    matches!(Tag::decode(data), Ok((tag, _)) if tag.is_opening(number))
}

fn next_is_closing(data: &[u8], number: u8) -> bool {
    matches!(Tag::decode(data), Ok((tag, _)) if tag.is_closing(number))
}

/// AddListElement / RemoveListElement service request
#[derive(Debug, Clone, PartialEq)]
pub struct ListElementRequest {
    pub object_id: ObjectIdentifier,
    pub property: PropertyIdentifier,
    pub array_index: Option<u32>,
    /// Raw element payload of the `[3]` envelope: a sequence of encoded
    /// list elements.
    pub elements: Vec<u8>,
}

impl ListElementRequest {
    pub fn new(object_id: ObjectIdentifier, property: PropertyIdentifier, elements: Vec<u8>) -> Self {
        Self {
            object_id,
            property,
            array_index: None,
            elements,
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
        encode_opening_tag(buffer, 3)?;
        buffer.extend_from_slice(&self.elements);
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
        let elements = data[pos + 1..pos + 1 + inner_len].to_vec();
        pos += inner_len + 2;

        Ok((
            Self {
                object_id: ObjectIdentifier::from_parts(object_type, instance),
                property: PropertyIdentifier::from(property),
                array_index,
                elements,
            },
            pos,
        ))
    }
}

/// The ChangeList constructed error:
/// `[0] {error-class, error-code} [1] first-failed-element-number`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListElementErrorAck {
    pub error_class: ErrorClass,
    pub error_code: ErrorCode,
    /// 1-based index into the submitted element list; 0 when no element
    /// was at fault.
    pub first_failed_element: u32,
}

impl ListElementErrorAck {
    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        let start = buffer.len();
        encode_opening_tag(buffer, 0)?;
        encode_application_enumerated(buffer, self.error_class.into())?;
        encode_application_enumerated(buffer, self.error_code.into())?;
        encode_closing_tag(buffer, 0)?;
        encode_context_unsigned(buffer, 1, self.first_failed_element as u64)?;
        Ok(buffer.len() - start)
    }

    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        // Each field is decoded against a fresh remaining slice.
        if !next_is_opening(data, 0) {
            return Err(EncodingError::TagMismatch);
        }
        let mut pos = 1;
        let (class, consumed) = decode_application_enumerated(&data[pos..])?;
        pos += consumed;
        let (code, consumed) = decode_application_enumerated(&data[pos..])?;
        pos += consumed;
        if !next_is_closing(&data[pos..], 0) {
            return Err(EncodingError::TagMismatch);
        }
        pos += 1;
        let (first_failed_element, consumed) = decode_context_unsigned(&data[pos..], 1)?;
        pos += consumed;

        Ok((
            Self {
                error_class: ErrorClass::from(class),
                error_code: ErrorCode::from(code),
                first_failed_element: first_failed_element as u32,
            },
            pos,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::constructed::Destination;
    use crate::object::ObjectType;

    #[test]
    fn test_list_element_request_roundtrip() {
        let destination =
            Destination::for_device(ObjectIdentifier::new(ObjectType::Device, 99), 7);
        let mut elements = Vec::new();
        destination.encode(&mut elements).unwrap();

        let request = ListElementRequest::new(
            ObjectIdentifier::new(ObjectType::NotificationClass, 1),
            PropertyIdentifier::RecipientList,
            elements,
        );
        let mut buffer = Vec::new();
        request.encode(&mut buffer).unwrap();
        let (decoded, consumed) = ListElementRequest::decode(&buffer).unwrap();
        assert_eq!(decoded, request);
        assert_eq!(consumed, buffer.len());

        let (element, _) = Destination::decode(&decoded.elements).unwrap();
        assert_eq!(element, destination);
    }

    #[test]
    fn test_list_element_error_ack_roundtrip() {
        let ack = ListElementErrorAck {
            error_class: ErrorClass::Services,
            error_code: ErrorCode::ListElementNotFound,
            first_failed_element: 2,
        };
        let mut buffer = Vec::new();
        ack.encode(&mut buffer).unwrap();
        let (decoded, consumed) = ListElementErrorAck::decode(&buffer).unwrap();
        assert_eq!(decoded, ack);
        assert_eq!(consumed, buffer.len());
    }

    #[test]
    fn test_list_element_request_requires_envelope() {
        let request = ListElementRequest::new(
            ObjectIdentifier::new(ObjectType::NotificationClass, 1),
            PropertyIdentifier::RecipientList,
            Vec::new(),
        );
        let mut buffer = Vec::new();
        request.encode(&mut buffer).unwrap();
        // Drop the closing tag; the decoder must notice.
        buffer.pop();
        assert!(ListElementRequest::decode(&buffer).is_err());
    }
}
