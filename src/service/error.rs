//! Error, Abort and Reject PDU codecs
//!
//! The three failure PDUs of the application layer. Error PDUs carry the
//! semantic class/code pair (bare, or inside the constructed production for
//! ChangeList-style services); Abort and Reject are single-reason PDUs.

use crate::encoding::{
    decode_application_enumerated, encode_application_enumerated, EncodingError, Result,
};
use crate::service::list_element::ListElementErrorAck;
use crate::service::{AbortReason, ConfirmedServiceChoice, ErrorClass, ErrorCode, RejectReason};

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

const PDU_TYPE_ERROR: u8 = 0x50;
const PDU_TYPE_ABORT: u8 = 0x60;
const PDU_TYPE_REJECT: u8 = 0x70;
const SERVER_BIT: u8 = 0x01;

/// Error PDU: semantic failure of a confirmed service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPdu {
    pub invoke_id: u8,
    pub service: ConfirmedServiceChoice,
    pub error_class: ErrorClass,
    pub error_code: ErrorCode,
    /// Only for services with the constructed error production (ChangeList).
    pub first_failed_element: Option<u32>,
}

impl ErrorPdu {
    pub fn new(
        invoke_id: u8,
        service: ConfirmedServiceChoice,
        error_class: ErrorClass,
        error_code: ErrorCode,
    ) -> Self {
        Self {
            invoke_id,
            service,
            error_class,
            error_code,
            first_failed_element: None,
        }
    }

    /// Encode the complete PDU including the header byte.
    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        let start = buffer.len();
        buffer.push(PDU_TYPE_ERROR);
        buffer.push(self.invoke_id);
        buffer.push(self.service as u8);
        if self.service.has_constructed_error() {
            let ack = ListElementErrorAck {
                error_class: self.error_class,
                error_code: self.error_code,
                first_failed_element: self.first_failed_element.unwrap_or(0),
            };
            ack.encode(buffer)?;
        } else {
            encode_application_enumerated(buffer, self.error_class.into())?;
            encode_application_enumerated(buffer, self.error_code.into())?;
        }
        Ok(buffer.len() - start)
    }

    /// Decode a complete Error PDU.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < 3 {
            return Err(EncodingError::UnexpectedEndOfData);
        }
        if data[0] & 0xF0 != PDU_TYPE_ERROR {
            return Err(EncodingError::InvalidTag);
        }
        let invoke_id = data[1];
        let service =
            ConfirmedServiceChoice::try_from(data[2]).map_err(|_| EncodingError::ValueOutOfRange)?;
        let payload = &data[3..];

        if service.has_constructed_error() {
            let (ack, _) = ListElementErrorAck::decode(payload)?;
            Ok(Self {
                invoke_id,
                service,
                error_class: ack.error_class,
                error_code: ack.error_code,
                first_failed_element: Some(ack.first_failed_element),
            })
        } else {
            let (class, consumed) = decode_application_enumerated(payload)?;
            let (code, _) = decode_application_enumerated(&payload[consumed..])?;
            Ok(Self {
                invoke_id,
                service,
                error_class: ErrorClass::from(class),
                error_code: ErrorCode::from(code),
                first_failed_element: None,
            })
        }
    }
}

/// Abort PDU: structural failure; either side may send it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbortPdu {
    pub server: bool,
    pub invoke_id: u8,
    pub reason: AbortReason,
}

impl AbortPdu {
    pub fn new(server: bool, invoke_id: u8, reason: AbortReason) -> Self {
        Self {
            server,
            invoke_id,
            reason,
        }
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        buffer.push(PDU_TYPE_ABORT | if self.server { SERVER_BIT } else { 0 });
        buffer.push(self.invoke_id);
        buffer.push(self.reason.into());
        Ok(3)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < 3 {
            return Err(EncodingError::UnexpectedEndOfData);
        }
        if data[0] & 0xF0 != PDU_TYPE_ABORT {
            return Err(EncodingError::InvalidTag);
        }
        Ok(Self {
            server: data[0] & SERVER_BIT != 0,
            invoke_id: data[1],
            reason: AbortReason::from(data[2]),
        })
    }
}

/// Reject PDU: the request never made it past syntax checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectPdu {
    pub invoke_id: u8,
    pub reason: RejectReason,
}

impl RejectPdu {
    pub fn new(invoke_id: u8, reason: RejectReason) -> Self {
        Self { invoke_id, reason }
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        buffer.push(PDU_TYPE_REJECT);
        buffer.push(self.invoke_id);
        buffer.push(self.reason.into());
        Ok(3)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < 3 {
            return Err(EncodingError::UnexpectedEndOfData);
        }
        if data[0] & 0xF0 != PDU_TYPE_REJECT {
            return Err(EncodingError::InvalidTag);
        }
        Ok(Self {
            invoke_id: data[1],
            reason: RejectReason::from(data[2]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_pdu_bare_form() {
        let pdu = ErrorPdu::new(
            42,
            ConfirmedServiceChoice::ReadProperty,
            ErrorClass::Property,
            ErrorCode::UnknownProperty,
        );
        let mut buffer = Vec::new();
        pdu.encode(&mut buffer).unwrap();
        assert_eq!(&buffer[..3], [0x50, 42, 12]);
        // class 2, code 32 as application enumerateds
        assert_eq!(&buffer[3..], [0x91, 0x02, 0x91, 0x20]);

        let decoded = ErrorPdu::decode(&buffer).unwrap();
        assert_eq!(decoded, pdu);
    }

    #[test]
    fn test_error_pdu_constructed_form() {
        let pdu = ErrorPdu {
            invoke_id: 7,
            service: ConfirmedServiceChoice::AddListElement,
            error_class: ErrorClass::Services,
            error_code: ErrorCode::ListElementNotFound,
            first_failed_element: Some(3),
        };
        let mut buffer = Vec::new();
        pdu.encode(&mut buffer).unwrap();
        let decoded = ErrorPdu::decode(&buffer).unwrap();
        assert_eq!(decoded, pdu);
        assert_eq!(decoded.first_failed_element, Some(3));
    }

    #[test]
    fn test_abort_pdu_roundtrip() {
        let pdu = AbortPdu::new(true, 99, AbortReason::SegmentationNotSupported);
        let mut buffer = Vec::new();
        pdu.encode(&mut buffer).unwrap();
        assert_eq!(buffer, [0x61, 99, 4]);

        let decoded = AbortPdu::decode(&buffer).unwrap();
        assert_eq!(decoded, pdu);
    }

    #[test]
    fn test_reject_pdu_roundtrip() {
        let pdu = RejectPdu::new(5, RejectReason::UnrecognizedService);
        let mut buffer = Vec::new();
        pdu.encode(&mut buffer).unwrap();
        assert_eq!(buffer, [0x70, 5, 9]);

        let decoded = RejectPdu::decode(&buffer).unwrap();
        assert_eq!(decoded, pdu);
    }

    #[test]
    fn test_truncated_pdus() {
        assert!(ErrorPdu::decode(&[0x50, 1]).is_err());
        assert!(AbortPdu::decode(&[0x60]).is_err());
        assert!(RejectPdu::decode(&[]).is_err());
    }
}
