//! Who-Is / I-Am service codecs
//!
//! The discovery pair: Who-Is broadcasts an optional device-instance range,
//! I-Am answers with the device identity. Both ride in unconfirmed-request
//! PDUs.

use crate::encoding::{
    decode_application_enumerated, decode_application_object_id, decode_application_unsigned,
    decode_context_unsigned, encode_application_enumerated, encode_application_object_id,
    encode_application_unsigned, encode_context_unsigned, EncodingError, Result,
};
use crate::object::{ObjectIdentifier, ObjectType, Segmentation};

#[cfg(not(feature = "std"))]
use alloc::{string::ToString, vec::Vec};

/// Who-Is service request with an optional instance range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WhoIsRequest {
    pub device_instance_low: Option<u32>,
    pub device_instance_high: Option<u32>,
}

impl WhoIsRequest {
    /// Who-Is for all devices
    pub fn new() -> Self {
        Self::default()
    }

    /// Who-Is for one device instance
    pub fn for_device(device_instance: u32) -> Self {
        Self {
            device_instance_low: Some(device_instance),
            device_instance_high: Some(device_instance),
        }
    }

    /// Who-Is for an inclusive instance range
    pub fn for_range(low: u32, high: u32) -> Self {
        Self {
            device_instance_low: Some(low),
            device_instance_high: Some(high),
        }
    }

    /// Whether a device with this instance should answer.
    pub fn matches(&self, device_instance: u32) -> bool {
        match (self.device_instance_low, self.device_instance_high) {
            (Some(low), Some(high)) => (low..=high).contains(&device_instance),
            _ => true,
        }
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        let start = buffer.len();
        if let (Some(low), Some(high)) = (self.device_instance_low, self.device_instance_high) {
            if low > crate::BACNET_MAX_INSTANCE || high > crate::BACNET_MAX_INSTANCE || low > high {
                return Err(EncodingError::ValueOutOfRange);
            }
            encode_context_unsigned(buffer, 0, low as u64)?;
            encode_context_unsigned(buffer, 1, high as u64)?;
        }
        Ok(buffer.len() - start)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::new());
        }
        let (low, consumed) = decode_context_unsigned(data, 0)?;
        let (high, _) = decode_context_unsigned(&data[consumed..], 1)?;
        if low > crate::BACNET_MAX_INSTANCE as u64 || high > crate::BACNET_MAX_INSTANCE as u64 {
            return Err(EncodingError::ValueOutOfRange);
        }
        Ok(Self::for_range(low as u32, high as u32))
    }
}

/// I-Am service request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IAmRequest {
    pub device_id: ObjectIdentifier,
    pub max_apdu_length_accepted: u32,
    pub segmentation_supported: Segmentation,
    pub vendor_identifier: u16,
}

impl IAmRequest {
    pub fn new(
        device_id: ObjectIdentifier,
        max_apdu_length_accepted: u32,
        segmentation_supported: Segmentation,
        vendor_identifier: u16,
    ) -> Self {
        Self {
            device_id,
            max_apdu_length_accepted,
            segmentation_supported,
            vendor_identifier,
        }
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        let start = buffer.len();
        encode_application_object_id(
            buffer,
            self.device_id.object_type.into(),
            self.device_id.instance,
        )?;
        encode_application_unsigned(buffer, self.max_apdu_length_accepted as u64)?;
        encode_application_enumerated(buffer, self.segmentation_supported as u32)?;
        encode_application_unsigned(buffer, self.vendor_identifier as u64)?;
        Ok(buffer.len() - start)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut pos = 0;
        let ((object_type, instance), consumed) = decode_application_object_id(data)?;
        pos += consumed;
        if ObjectType::from(object_type) != ObjectType::Device {
            return Err(EncodingError::InvalidFormat(
                "I-Am object is not a device".to_string(),
            ));
        }
        let (max_apdu, consumed) = decode_application_unsigned(&data[pos..])?;
        pos += consumed;
        let (segmentation, consumed) = decode_application_enumerated(&data[pos..])?;
        pos += consumed;
        let (vendor_id, _) = decode_application_unsigned(&data[pos..])?;

        Ok(Self {
            device_id: ObjectIdentifier::from_parts(object_type, instance),
            max_apdu_length_accepted: max_apdu as u32,
            segmentation_supported: Segmentation::try_from(segmentation)?,
            vendor_identifier: vendor_id as u16,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_who_is_unbounded() {
        let request = WhoIsRequest::new();
        let mut buffer = Vec::new();
        request.encode(&mut buffer).unwrap();
        assert!(buffer.is_empty());

        let decoded = WhoIsRequest::decode(&buffer).unwrap();
        assert!(decoded.matches(0));
        assert!(decoded.matches(crate::BACNET_MAX_INSTANCE));
    }

    #[test]
    fn test_who_is_range_roundtrip() {
        let request = WhoIsRequest::for_range(100, 200);
        let mut buffer = Vec::new();
        request.encode(&mut buffer).unwrap();
        let decoded = WhoIsRequest::decode(&buffer).unwrap();
        assert_eq!(decoded, request);
        assert!(decoded.matches(150));
        assert!(!decoded.matches(99));
        assert!(!decoded.matches(201));
    }

    #[test]
    fn test_who_is_rejects_inverted_range() {
        let request = WhoIsRequest::for_range(200, 100);
        let mut buffer = Vec::new();
        assert!(request.encode(&mut buffer).is_err());
    }

    #[test]
    fn test_i_am_roundtrip() {
        let request = IAmRequest::new(
            ObjectIdentifier::new(ObjectType::Device, 1234),
            crate::BACNET_MAX_APDU as u32,
            Segmentation::NoSegmentation,
            260,
        );
        let mut buffer = Vec::new();
        request.encode(&mut buffer).unwrap();
        let decoded = IAmRequest::decode(&buffer).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_i_am_rejects_non_device() {
        let request = IAmRequest::new(
            ObjectIdentifier::new(ObjectType::AnalogInput, 1),
            1476,
            Segmentation::NoSegmentation,
            0,
        );
        let mut buffer = Vec::new();
        request.encode(&mut buffer).unwrap();
        assert!(IAmRequest::decode(&buffer).is_err());
    }
}
