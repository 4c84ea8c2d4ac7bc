//! Binary Object Types
//!
//! Binary Input, Binary Output and Binary Value objects. Binary points mark
//! change-of-value on any present-value transition rather than against an
//! increment.

use crate::encoding::value::ApplicationDataValue;
use crate::encoding::CharacterString;
use crate::object::{
    cov_value_list, encode_array_property, AccessResult, BinaryPv, EventState, InstanceList,
    ObjectHandler, ObjectType, Polarity, PriorityArray, PropertyError, PropertyIdentifier,
    PropertyLists, ReadPropertyData, Reliability, StatusFlags, WritePropertyData,
};

#[cfg(not(feature = "std"))]
use alloc::{format, vec::Vec};

/// Notified after a commandable binary present-value change commits.
pub type BinaryWriteCallback = fn(u32, BinaryPv, BinaryPv);

const BINARY_INPUT_PROPERTIES_REQUIRED: &[PropertyIdentifier] = &[
    PropertyIdentifier::ObjectIdentifier,
    PropertyIdentifier::ObjectName,
    PropertyIdentifier::ObjectType,
    PropertyIdentifier::PresentValue,
    PropertyIdentifier::StatusFlags,
    PropertyIdentifier::EventState,
    PropertyIdentifier::OutOfService,
    PropertyIdentifier::Polarity,
    PropertyIdentifier::PropertyList,
];

const BINARY_INPUT_PROPERTIES_OPTIONAL: &[PropertyIdentifier] = &[
    PropertyIdentifier::Reliability,
    PropertyIdentifier::ActiveText,
    PropertyIdentifier::InactiveText,
    PropertyIdentifier::ChangeOfStateCount,
];

const BINARY_OUTPUT_PROPERTIES_REQUIRED: &[PropertyIdentifier] = &[
    PropertyIdentifier::ObjectIdentifier,
    PropertyIdentifier::ObjectName,
    PropertyIdentifier::ObjectType,
    PropertyIdentifier::PresentValue,
    PropertyIdentifier::StatusFlags,
    PropertyIdentifier::EventState,
    PropertyIdentifier::OutOfService,
    PropertyIdentifier::Polarity,
    PropertyIdentifier::PriorityArray,
    PropertyIdentifier::RelinquishDefault,
    PropertyIdentifier::CurrentCommandPriority,
    PropertyIdentifier::PropertyList,
];

const BINARY_OUTPUT_PROPERTIES_OPTIONAL: &[PropertyIdentifier] = &[
    PropertyIdentifier::Reliability,
    PropertyIdentifier::ActiveText,
    PropertyIdentifier::InactiveText,
    PropertyIdentifier::ChangeOfStateCount,
];

const NO_PROPERTIES: &[PropertyIdentifier] = &[];

fn binary_pv_from_value(value: &ApplicationDataValue) -> Result<BinaryPv, PropertyError> {
    match value {
        ApplicationDataValue::Enumerated(0) => Ok(BinaryPv::Inactive),
        ApplicationDataValue::Enumerated(1) => Ok(BinaryPv::Active),
        ApplicationDataValue::Enumerated(_) => Err(PropertyError::value_out_of_range()),
        _ => Err(PropertyError::invalid_data_type()),
    }
}

/// Binary point state shared by all three types; the priority array is only
/// consulted for the commandable ones.
#[derive(Debug, Clone)]
pub struct BinaryPoint {
    name: Option<CharacterString>,
    present_value: BinaryPv,
    priority_array: PriorityArray<BinaryPv>,
    pub relinquish_default: BinaryPv,
    pub polarity: Polarity,
    pub active_text: CharacterString,
    pub inactive_text: CharacterString,
    pub event_state: EventState,
    pub reliability: Reliability,
    pub out_of_service: bool,
    pub change_of_state_count: u32,
    changed: bool,
}

impl BinaryPoint {
    fn new() -> Self {
        Self {
            name: None,
            present_value: BinaryPv::Inactive,
            priority_array: PriorityArray::new(),
            relinquish_default: BinaryPv::Inactive,
            polarity: Polarity::Normal,
            active_text: CharacterString::new("active"),
            inactive_text: CharacterString::new("inactive"),
            event_state: EventState::Normal,
            reliability: Reliability::NoFaultDetected,
            out_of_service: false,
            change_of_state_count: 0,
            changed: false,
        }
    }

    fn status_flags(&self) -> StatusFlags {
        let mut flags = StatusFlags::empty();
        if self.out_of_service {
            flags |= StatusFlags::OUT_OF_SERVICE;
        }
        if self.reliability != Reliability::NoFaultDetected {
            flags |= StatusFlags::FAULT;
        }
        flags
    }
}

/// Handler covering Binary Input (measured) and the commandable Binary
/// Output / Binary Value types.
#[derive(Debug)]
pub struct BinaryHandler {
    object_type: ObjectType,
    objects: InstanceList<BinaryPoint>,
    write_callback: Option<BinaryWriteCallback>,
}

impl BinaryHandler {
    pub fn binary_input() -> Self {
        Self {
            object_type: ObjectType::BinaryInput,
            objects: InstanceList::new(),
            write_callback: None,
        }
    }

    pub fn binary_output() -> Self {
        Self {
            object_type: ObjectType::BinaryOutput,
            objects: InstanceList::new(),
            write_callback: None,
        }
    }

    pub fn binary_value() -> Self {
        Self {
            object_type: ObjectType::BinaryValue,
            objects: InstanceList::new(),
            write_callback: None,
        }
    }

    fn commandable(&self) -> bool {
        self.object_type != ObjectType::BinaryInput
    }

    pub fn set_write_callback(&mut self, callback: BinaryWriteCallback) {
        self.write_callback = Some(callback);
    }

    pub fn present_value(&self, instance: u32) -> Option<BinaryPv> {
        self.objects.get(instance).map(|object| {
            if self.commandable() {
                object
                    .priority_array
                    .value()
                    .unwrap_or(object.relinquish_default)
            } else {
                object.present_value
            }
        })
    }

    pub fn current_command_priority(&self, instance: u32) -> Option<u8> {
        self.objects
            .get(instance)
            .and_then(|object| object.priority_array.active_priority())
    }

    /// Update a measured input, marking COV on transitions.
    pub fn set_present_value(&mut self, instance: u32, value: BinaryPv) -> bool {
        match self.objects.get_mut(instance) {
            Some(object) => {
                if object.present_value != value {
                    object.changed = true;
                    object.change_of_state_count =
                        object.change_of_state_count.wrapping_add(1);
                }
                object.present_value = value;
                true
            }
            None => false,
        }
    }

    pub fn set_name(&mut self, instance: u32, name: CharacterString) {
        if let Some(object) = self.objects.get_mut(instance) {
            object.name = Some(name);
        }
    }

    fn command(
        &mut self,
        instance: u32,
        value: Option<BinaryPv>,
        priority: u8,
    ) -> Result<(), PropertyError> {
        let callback = self.write_callback;
        let commandable = self.commandable();
        let object = self
            .objects
            .get_mut(instance)
            .ok_or(PropertyError::unknown_object())?;
        if !commandable {
            return Err(PropertyError::write_access_denied());
        }

        let old_value = object
            .priority_array
            .value()
            .unwrap_or(object.relinquish_default);
        object.priority_array.set(priority, value)?;
        let new_value = object
            .priority_array
            .value()
            .unwrap_or(object.relinquish_default);

        if new_value != old_value {
            object.changed = true;
            object.change_of_state_count = object.change_of_state_count.wrapping_add(1);
            if !object.out_of_service {
                if let Some(callback) = callback {
                    callback(instance, old_value, new_value);
                }
            }
        }
        Ok(())
    }

    fn default_name(&self, instance: u32) -> CharacterString {
        let prefix = match self.object_type {
            ObjectType::BinaryInput => "BINARY INPUT",
            ObjectType::BinaryOutput => "BINARY OUTPUT",
            _ => "BINARY VALUE",
        };
        CharacterString::new(&format!("{} {}", prefix, instance))
    }
}

impl ObjectHandler for BinaryHandler {
    fn object_type(&self) -> ObjectType {
        self.object_type
    }

    fn property_lists(&self) -> PropertyLists {
        if self.commandable() {
            PropertyLists {
                required: BINARY_OUTPUT_PROPERTIES_REQUIRED,
                optional: BINARY_OUTPUT_PROPERTIES_OPTIONAL,
                proprietary: NO_PROPERTIES,
            }
        } else {
            PropertyLists {
                required: BINARY_INPUT_PROPERTIES_REQUIRED,
                optional: BINARY_INPUT_PROPERTIES_OPTIONAL,
                proprietary: NO_PROPERTIES,
            }
        }
    }

    fn count(&self) -> usize {
        self.objects.count()
    }

    fn valid_instance(&self, instance: u32) -> bool {
        self.objects.contains(instance)
    }

    fn index_to_instance(&self, index: usize) -> Option<u32> {
        self.objects.index_to_instance(index)
    }

    fn instance_to_index(&self, instance: u32) -> Option<usize> {
        self.objects.instance_to_index(instance)
    }

    fn object_name(&self, instance: u32) -> Option<CharacterString> {
        let object = self.objects.get(instance)?;
        Some(match &object.name {
            Some(name) => name.clone(),
            None => self.default_name(instance),
        })
    }

    fn set_object_name(&mut self, instance: u32, name: CharacterString) -> bool {
        match self.objects.get_mut(instance) {
            Some(object) => {
                object.name = Some(name);
                true
            }
            None => false,
        }
    }

    fn create(&mut self, instance: u32) -> Result<u32, PropertyError> {
        let instance = if instance == crate::BACNET_MAX_INSTANCE {
            self.objects.next_free_instance()
        } else {
            instance
        };
        self.objects.insert(instance, BinaryPoint::new())?;
        Ok(instance)
    }

    fn delete(&mut self, instance: u32) -> bool {
        self.objects.remove(instance).is_some()
    }

    fn read_property(
        &self,
        request: &ReadPropertyData,
        buffer: &mut Vec<u8>,
    ) -> AccessResult<usize> {
        let object = self
            .objects
            .get(request.object_instance)
            .ok_or(PropertyError::unknown_object())?;
        let present_value = self.present_value(request.object_instance).unwrap();
        let start = buffer.len();
        match request.property {
            PropertyIdentifier::PresentValue => {
                crate::encoding::encode_application_enumerated(buffer, present_value as u32)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::PriorityArray if self.commandable() => {
                return encode_array_property(
                    buffer,
                    request.array_index,
                    crate::BACNET_MAX_PRIORITY as u32,
                    |index, buffer| match object.priority_array.slot(index as u8) {
                        Some(value) => {
                            crate::encoding::encode_application_enumerated(buffer, value as u32)
                        }
                        None => crate::encoding::encode_application_null(buffer),
                    },
                );
            }
            PropertyIdentifier::RelinquishDefault if self.commandable() => {
                crate::encoding::encode_application_enumerated(
                    buffer,
                    object.relinquish_default as u32,
                )
                .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::CurrentCommandPriority if self.commandable() => {
                match object.priority_array.active_priority() {
                    Some(priority) => {
                        crate::encoding::encode_application_unsigned(buffer, priority as u64)
                    }
                    None => crate::encoding::encode_application_null(buffer),
                }
                .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::StatusFlags => {
                crate::encoding::encode_application_bit_string(
                    buffer,
                    &object.status_flags().to_bit_string(),
                )
                .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::EventState => {
                crate::encoding::encode_application_enumerated(buffer, object.event_state as u32)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::Reliability => {
                crate::encoding::encode_application_enumerated(buffer, object.reliability as u32)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::OutOfService => {
                crate::encoding::encode_application_boolean(buffer, object.out_of_service)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::Polarity => {
                crate::encoding::encode_application_enumerated(buffer, object.polarity as u32)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::ActiveText => {
                crate::encoding::encode_application_character_string(buffer, &object.active_text)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::InactiveText => {
                crate::encoding::encode_application_character_string(
                    buffer,
                    &object.inactive_text,
                )
                .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::ChangeOfStateCount => {
                crate::encoding::encode_application_unsigned(
                    buffer,
                    object.change_of_state_count as u64,
                )
                .map_err(|_| PropertyError::value_out_of_range())?;
            }
            _ => return Err(PropertyError::unknown_property().into()),
        }
        Ok(buffer.len() - start)
    }

    fn write_property(&mut self, request: &WritePropertyData) -> AccessResult<()> {
        if !self.objects.contains(request.object_instance) {
            return Err(PropertyError::unknown_object().into());
        }
        match request.property {
            PropertyIdentifier::PresentValue if self.commandable() => {
                let priority = request.effective_priority();
                match &request.value {
                    ApplicationDataValue::Null => {
                        self.command(request.object_instance, None, priority)?;
                        Ok(())
                    }
                    value => {
                        let value = binary_pv_from_value(value)?;
                        self.command(request.object_instance, Some(value), priority)?;
                        Ok(())
                    }
                }
            }
            PropertyIdentifier::PresentValue => {
                // Inputs take direct writes only while out of service.
                let object = self.objects.get_mut(request.object_instance).unwrap();
                if !object.out_of_service {
                    return Err(PropertyError::write_access_denied().into());
                }
                let value = binary_pv_from_value(&request.value)?;
                if object.present_value != value {
                    object.changed = true;
                }
                object.present_value = value;
                Ok(())
            }
            PropertyIdentifier::RelinquishDefault if self.commandable() => {
                let value = binary_pv_from_value(&request.value)?;
                let object = self.objects.get_mut(request.object_instance).unwrap();
                object.relinquish_default = value;
                Ok(())
            }
            PropertyIdentifier::OutOfService => {
                let object = self.objects.get_mut(request.object_instance).unwrap();
                match request.value {
                    ApplicationDataValue::Boolean(value) => {
                        if object.out_of_service != value {
                            object.changed = true;
                        }
                        object.out_of_service = value;
                        Ok(())
                    }
                    _ => Err(PropertyError::invalid_data_type().into()),
                }
            }
            _ => Err(PropertyError::write_access_denied().into()),
        }
    }

    fn value_list(
        &self,
        instance: u32,
    ) -> Option<Vec<crate::encoding::constructed::PropertyValue>> {
        let object = self.objects.get(instance)?;
        let present_value = self.present_value(instance)?;
        Some(cov_value_list(
            ApplicationDataValue::Enumerated(present_value as u32),
            object.status_flags(),
        ))
    }

    fn change_of_value(&self, instance: u32) -> bool {
        self.objects
            .get(instance)
            .map(|object| object.changed)
            .unwrap_or(false)
    }

    fn change_of_value_clear(&mut self, instance: u32) {
        if let Some(object) = self.objects.get_mut(instance) {
            object.changed = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BACNET_ARRAY_ALL;

    fn write_pv(instance: u32, value: ApplicationDataValue, priority: u8) -> WritePropertyData {
        WritePropertyData {
            object_instance: instance,
            property: PropertyIdentifier::PresentValue,
            array_index: BACNET_ARRAY_ALL,
            value,
            priority,
        }
    }

    #[test]
    fn test_input_transition_marks_cov() {
        let mut handler = BinaryHandler::binary_input();
        handler.create(3).unwrap();
        assert!(!handler.change_of_value(3));

        handler.set_present_value(3, BinaryPv::Active);
        assert!(handler.change_of_value(3));
        handler.change_of_value_clear(3);

        // Same value, no transition.
        handler.set_present_value(3, BinaryPv::Active);
        assert!(!handler.change_of_value(3));
    }

    #[test]
    fn test_output_command_and_relinquish() {
        let mut handler = BinaryHandler::binary_output();
        handler.create(2).unwrap();

        handler
            .write_property(&write_pv(2, ApplicationDataValue::Enumerated(1), 8))
            .unwrap();
        assert_eq!(handler.present_value(2), Some(BinaryPv::Active));
        assert_eq!(handler.current_command_priority(2), Some(8));

        handler
            .write_property(&write_pv(2, ApplicationDataValue::Null, 8))
            .unwrap();
        assert_eq!(handler.present_value(2), Some(BinaryPv::Inactive));
        assert_eq!(handler.current_command_priority(2), None);
    }

    #[test]
    fn test_output_rejects_priority_six_and_bad_enum() {
        let mut handler = BinaryHandler::binary_output();
        handler.create(2).unwrap();

        assert!(handler
            .write_property(&write_pv(2, ApplicationDataValue::Enumerated(1), 6))
            .is_err());
        assert!(handler
            .write_property(&write_pv(2, ApplicationDataValue::Enumerated(2), 8))
            .is_err());
        assert!(handler
            .write_property(&write_pv(2, ApplicationDataValue::Real(1.0), 8))
            .is_err());
    }

    #[test]
    fn test_input_not_commandable() {
        let mut handler = BinaryHandler::binary_input();
        handler.create(1).unwrap();
        assert!(handler
            .write_property(&write_pv(1, ApplicationDataValue::Enumerated(1), 8))
            .is_err());
    }

    #[test]
    fn test_read_texts_and_polarity() {
        let mut handler = BinaryHandler::binary_value();
        handler.create(1).unwrap();

        let mut buffer = Vec::new();
        handler
            .read_property(
                &ReadPropertyData {
                    object_instance: 1,
                    property: PropertyIdentifier::ActiveText,
                    array_index: BACNET_ARRAY_ALL,
                },
                &mut buffer,
            )
            .unwrap();
        let (text, _) = crate::encoding::decode_application_character_string(&buffer).unwrap();
        assert_eq!(text, CharacterString::new("active"));

        buffer.clear();
        handler
            .read_property(
                &ReadPropertyData {
                    object_instance: 1,
                    property: PropertyIdentifier::Polarity,
                    array_index: BACNET_ARRAY_ALL,
                },
                &mut buffer,
            )
            .unwrap();
        let (polarity, _) = crate::encoding::decode_application_enumerated(&buffer).unwrap();
        assert_eq!(polarity, Polarity::Normal as u32);
    }
}
