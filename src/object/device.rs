//! Device Object
//!
//! The device's own identity: name, vendor, firmware, protocol conformance
//! and the object-list spanning every object the database holds. One per
//! device; the database dispatches reads of `(Device, instance)` here.

use crate::encoding::value::ApplicationDataValue;
use crate::encoding::{BitString, CharacterString};
use crate::object::{
    encode_array_property, AccessResult, ObjectIdentifier, ObjectType, PropertyError,
    PropertyIdentifier, PropertyLists, ReadPropertyData, Segmentation, StatusFlags,
    WritePropertyData,
};

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

const DEVICE_PROPERTIES_REQUIRED: &[PropertyIdentifier] = &[
    PropertyIdentifier::ObjectIdentifier,
    PropertyIdentifier::ObjectName,
    PropertyIdentifier::ObjectType,
    PropertyIdentifier::SystemStatus,
    PropertyIdentifier::VendorName,
    PropertyIdentifier::VendorIdentifier,
    PropertyIdentifier::ModelName,
    PropertyIdentifier::FirmwareRevision,
    PropertyIdentifier::ApplicationSoftwareVersion,
    PropertyIdentifier::ProtocolVersion,
    PropertyIdentifier::ProtocolRevision,
    PropertyIdentifier::ProtocolServicesSupported,
    PropertyIdentifier::ProtocolObjectTypesSupported,
    PropertyIdentifier::ObjectList,
    PropertyIdentifier::MaxApduLengthAccepted,
    PropertyIdentifier::SegmentationSupported,
    PropertyIdentifier::ApduTimeout,
    PropertyIdentifier::NumberOfApduRetries,
    PropertyIdentifier::DatabaseRevision,
    PropertyIdentifier::PropertyList,
];

const DEVICE_PROPERTIES_OPTIONAL: &[PropertyIdentifier] = &[
    PropertyIdentifier::Description,
    PropertyIdentifier::LocalDate,
    PropertyIdentifier::LocalTime,
    PropertyIdentifier::StatusFlags,
];

const NO_PROPERTIES: &[PropertyIdentifier] = &[];

/// Device status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum DeviceStatus {
    Operational = 0,
    OperationalReadOnly = 1,
    DownloadRequired = 2,
    DownloadInProgress = 3,
    NonOperational = 4,
    BackupInProgress = 5,
}

/// The Device object's own state.
#[derive(Debug, Clone)]
pub struct DeviceObject {
    pub instance: u32,
    pub object_name: CharacterString,
    pub description: CharacterString,
    pub system_status: DeviceStatus,
    pub vendor_name: CharacterString,
    pub vendor_identifier: u16,
    pub model_name: CharacterString,
    pub firmware_revision: CharacterString,
    pub application_software_version: CharacterString,
    pub protocol_version: u8,
    pub protocol_revision: u8,
    /// Bit string indexed by confirmed/unconfirmed service number.
    pub protocol_services_supported: BitString,
    /// Bit string indexed by object-type number.
    pub protocol_object_types_supported: BitString,
    pub max_apdu_length_accepted: u16,
    pub segmentation_supported: Segmentation,
    pub apdu_timeout_ms: u32,
    pub number_of_apdu_retries: u8,
    pub database_revision: u32,
}

impl DeviceObject {
    pub fn new(instance: u32, object_name: &str) -> Self {
        Self {
            instance,
            object_name: CharacterString::new(object_name),
            description: CharacterString::default(),
            system_status: DeviceStatus::Operational,
            vendor_name: CharacterString::new("bacnet-core"),
            vendor_identifier: 260,
            model_name: CharacterString::new("bacnet-core device"),
            firmware_revision: CharacterString::new(env!("CARGO_PKG_VERSION")),
            application_software_version: CharacterString::new(env!("CARGO_PKG_VERSION")),
            protocol_version: crate::BACNET_PROTOCOL_VERSION,
            protocol_revision: crate::BACNET_PROTOCOL_REVISION,
            protocol_services_supported: BitString::from_bits(&[false; 40]),
            protocol_object_types_supported: BitString::from_bits(&[false; 64]),
            max_apdu_length_accepted: crate::BACNET_MAX_APDU as u16,
            segmentation_supported: Segmentation::NoSegmentation,
            apdu_timeout_ms: crate::app::tsm::APDU_TIMEOUT_MS as u32,
            number_of_apdu_retries: crate::app::tsm::APDU_RETRIES,
            database_revision: 1,
        }
    }

    pub fn object_id(&self) -> ObjectIdentifier {
        ObjectIdentifier::new(ObjectType::Device, self.instance)
    }

    /// Mark a confirmed or unconfirmed service as supported.
    pub fn set_service_supported(&mut self, bit: usize) {
        self.protocol_services_supported.set_bit(bit, true);
    }

    pub fn set_object_type_supported(&mut self, object_type: ObjectType) {
        self.protocol_object_types_supported
            .set_bit(u16::from(object_type) as usize, true);
    }

    pub fn property_lists(&self) -> PropertyLists {
        PropertyLists {
            required: DEVICE_PROPERTIES_REQUIRED,
            optional: DEVICE_PROPERTIES_OPTIONAL,
            proprietary: NO_PROPERTIES,
        }
    }

    /// Read a device property; `object_list` is the database's full object
    /// enumeration, device object first.
    pub fn read_property(
        &self,
        object_list: &[ObjectIdentifier],
        request: &ReadPropertyData,
        buffer: &mut Vec<u8>,
    ) -> AccessResult<usize> {
        let start = buffer.len();
        match request.property {
            PropertyIdentifier::SystemStatus => {
                crate::encoding::encode_application_enumerated(buffer, self.system_status as u32)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::VendorName => {
                crate::encoding::encode_application_character_string(buffer, &self.vendor_name)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::VendorIdentifier => {
                crate::encoding::encode_application_unsigned(
                    buffer,
                    self.vendor_identifier as u64,
                )
                .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::ModelName => {
                crate::encoding::encode_application_character_string(buffer, &self.model_name)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::FirmwareRevision => {
                crate::encoding::encode_application_character_string(
                    buffer,
                    &self.firmware_revision,
                )
                .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::ApplicationSoftwareVersion => {
                crate::encoding::encode_application_character_string(
                    buffer,
                    &self.application_software_version,
                )
                .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::Description => {
                crate::encoding::encode_application_character_string(buffer, &self.description)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::ProtocolVersion => {
                crate::encoding::encode_application_unsigned(buffer, self.protocol_version as u64)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::ProtocolRevision => {
                crate::encoding::encode_application_unsigned(
                    buffer,
                    self.protocol_revision as u64,
                )
                .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::ProtocolServicesSupported => {
                crate::encoding::encode_application_bit_string(
                    buffer,
                    &self.protocol_services_supported,
                )
                .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::ProtocolObjectTypesSupported => {
                crate::encoding::encode_application_bit_string(
                    buffer,
                    &self.protocol_object_types_supported,
                )
                .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::ObjectList => {
                return encode_array_property(
                    buffer,
                    request.array_index,
                    object_list.len() as u32,
                    |index, buffer| {
                        let id = &object_list[(index - 1) as usize];
                        crate::encoding::encode_application_object_id(
                            buffer,
                            id.object_type.into(),
                            id.instance,
                        )
                    },
                );
            }
            PropertyIdentifier::MaxApduLengthAccepted => {
                crate::encoding::encode_application_unsigned(
                    buffer,
                    self.max_apdu_length_accepted as u64,
                )
                .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::SegmentationSupported => {
                crate::encoding::encode_application_enumerated(
                    buffer,
                    self.segmentation_supported as u32,
                )
                .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::ApduTimeout => {
                crate::encoding::encode_application_unsigned(buffer, self.apdu_timeout_ms as u64)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::NumberOfApduRetries => {
                crate::encoding::encode_application_unsigned(
                    buffer,
                    self.number_of_apdu_retries as u64,
                )
                .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::DatabaseRevision => {
                crate::encoding::encode_application_unsigned(
                    buffer,
                    self.database_revision as u64,
                )
                .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::StatusFlags => {
                crate::encoding::encode_application_bit_string(
                    buffer,
                    &StatusFlags::empty().to_bit_string(),
                )
                .map_err(|_| PropertyError::value_out_of_range())?;
            }
            #[cfg(feature = "std")]
            PropertyIdentifier::LocalDate => {
                let today = crate::encoding::Date::today();
                crate::encoding::encode_application_date(buffer, &today)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            #[cfg(feature = "std")]
            PropertyIdentifier::LocalTime => {
                let now = crate::encoding::Time::now();
                crate::encoding::encode_application_time(buffer, &now)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            _ => return Err(PropertyError::unknown_property().into()),
        }
        Ok(buffer.len() - start)
    }

    pub fn write_property(&mut self, request: &WritePropertyData) -> AccessResult<()> {
        match (request.property, &request.value) {
            (PropertyIdentifier::ObjectName, ApplicationDataValue::CharacterString(name)) => {
                if name.is_empty() {
                    return Err(PropertyError::value_out_of_range().into());
                }
                self.object_name = name.clone();
                Ok(())
            }
            (PropertyIdentifier::Description, ApplicationDataValue::CharacterString(text)) => {
                self.description = text.clone();
                Ok(())
            }
            _ => Err(PropertyError::write_access_denied().into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BACNET_ARRAY_ALL;

    fn read(property: PropertyIdentifier, array_index: u32) -> ReadPropertyData {
        ReadPropertyData {
            object_instance: 1234,
            property,
            array_index,
        }
    }

    #[test]
    fn test_identity_properties() {
        let device = DeviceObject::new(1234, "test device");
        let list = [device.object_id()];

        let mut buffer = Vec::new();
        device
            .read_property(&list, &read(PropertyIdentifier::VendorIdentifier, BACNET_ARRAY_ALL), &mut buffer)
            .unwrap();
        let (vendor, _) = crate::encoding::decode_application_unsigned(&buffer).unwrap();
        assert_eq!(vendor, 260);

        buffer.clear();
        device
            .read_property(
                &list,
                &read(PropertyIdentifier::SegmentationSupported, BACNET_ARRAY_ALL),
                &mut buffer,
            )
            .unwrap();
        let (segmentation, _) = crate::encoding::decode_application_enumerated(&buffer).unwrap();
        assert_eq!(segmentation, Segmentation::NoSegmentation as u32);
    }

    #[test]
    fn test_object_list_array() {
        let device = DeviceObject::new(1234, "test device");
        let list = [
            device.object_id(),
            ObjectIdentifier::new(ObjectType::AnalogInput, 0),
        ];

        let mut buffer = Vec::new();
        device
            .read_property(&list, &read(PropertyIdentifier::ObjectList, 0), &mut buffer)
            .unwrap();
        let (count, _) = crate::encoding::decode_application_unsigned(&buffer).unwrap();
        assert_eq!(count, 2);

        buffer.clear();
        device
            .read_property(&list, &read(PropertyIdentifier::ObjectList, 2), &mut buffer)
            .unwrap();
        let ((object_type, instance), _) =
            crate::encoding::decode_application_object_id(&buffer).unwrap();
        assert_eq!(object_type, 0);
        assert_eq!(instance, 0);
    }

    #[test]
    fn test_services_supported_bits() {
        let mut device = DeviceObject::new(1, "bits");
        device.set_service_supported(12);
        device.set_service_supported(15);
        assert!(device.protocol_services_supported.bit(12));
        assert!(device.protocol_services_supported.bit(15));
        assert!(!device.protocol_services_supported.bit(14));

        device.set_object_type_supported(ObjectType::AnalogInput);
        assert!(device.protocol_object_types_supported.bit(0));
    }

    #[test]
    fn test_name_write() {
        let mut device = DeviceObject::new(1, "old");
        device
            .write_property(&WritePropertyData {
                object_instance: 1,
                property: PropertyIdentifier::ObjectName,
                array_index: BACNET_ARRAY_ALL,
                value: ApplicationDataValue::CharacterString(CharacterString::new("new")),
                priority: 0,
            })
            .unwrap();
        assert_eq!(device.object_name, CharacterString::new("new"));

        assert!(device
            .write_property(&WritePropertyData {
                object_instance: 1,
                property: PropertyIdentifier::VendorIdentifier,
                array_index: BACNET_ARRAY_ALL,
                value: ApplicationDataValue::Unsigned(1),
                priority: 0,
            })
            .is_err());
    }
}
