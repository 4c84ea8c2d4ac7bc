//! Multi-state Object Types
//!
//! Multi-state Input, Output and Value objects. The present-value is an
//! unsigned state number 1..=number-of-states; state-text is a BACnetARRAY
//! of names, one per state.

use crate::encoding::value::ApplicationDataValue;
use crate::encoding::CharacterString;
use crate::object::{
    cov_value_list, encode_array_property, AccessResult, EventState, InstanceList, ObjectHandler,
    ObjectType, PriorityArray, PropertyError, PropertyIdentifier, PropertyLists,
    ReadPropertyData, Reliability, StatusFlags, WritePropertyData,
};

#[cfg(not(feature = "std"))]
use alloc::{format, vec::Vec};

const MULTISTATE_PROPERTIES_REQUIRED: &[PropertyIdentifier] = &[
    PropertyIdentifier::ObjectIdentifier,
    PropertyIdentifier::ObjectName,
    PropertyIdentifier::ObjectType,
    PropertyIdentifier::PresentValue,
    PropertyIdentifier::StatusFlags,
    PropertyIdentifier::EventState,
    PropertyIdentifier::OutOfService,
    PropertyIdentifier::NumberOfStates,
    PropertyIdentifier::PropertyList,
];

const MULTISTATE_COMMANDABLE_PROPERTIES_REQUIRED: &[PropertyIdentifier] = &[
    PropertyIdentifier::ObjectIdentifier,
    PropertyIdentifier::ObjectName,
    PropertyIdentifier::ObjectType,
    PropertyIdentifier::PresentValue,
    PropertyIdentifier::StatusFlags,
    PropertyIdentifier::EventState,
    PropertyIdentifier::OutOfService,
    PropertyIdentifier::NumberOfStates,
    PropertyIdentifier::PriorityArray,
    PropertyIdentifier::RelinquishDefault,
    PropertyIdentifier::CurrentCommandPriority,
    PropertyIdentifier::PropertyList,
];

const MULTISTATE_PROPERTIES_OPTIONAL: &[PropertyIdentifier] = &[
    PropertyIdentifier::Reliability,
    PropertyIdentifier::StateText,
];

const NO_PROPERTIES: &[PropertyIdentifier] = &[];

const DEFAULT_STATE_COUNT: u32 = 3;

/// Multi-state point state
#[derive(Debug, Clone)]
pub struct MultiStatePoint {
    name: Option<CharacterString>,
    present_value: u32,
    priority_array: PriorityArray<u32>,
    pub relinquish_default: u32,
    pub number_of_states: u32,
    pub state_text: Vec<CharacterString>,
    pub event_state: EventState,
    pub reliability: Reliability,
    pub out_of_service: bool,
    changed: bool,
}

impl MultiStatePoint {
    fn new() -> Self {
        Self {
            name: None,
            present_value: 1,
            priority_array: PriorityArray::new(),
            relinquish_default: 1,
            number_of_states: DEFAULT_STATE_COUNT,
            state_text: Vec::new(),
            event_state: EventState::Normal,
            reliability: Reliability::NoFaultDetected,
            out_of_service: false,
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

    fn state_in_range(&self, state: u32) -> bool {
        (1..=self.number_of_states).contains(&state)
    }
}

/// Handler covering Multi-state Input (measured) and the commandable
/// Multi-state Output / Value types.
#[derive(Debug)]
pub struct MultiStateHandler {
    object_type: ObjectType,
    objects: InstanceList<MultiStatePoint>,
}

impl MultiStateHandler {
    pub fn multistate_input() -> Self {
        Self {
            object_type: ObjectType::MultiStateInput,
            objects: InstanceList::new(),
        }
    }

    pub fn multistate_output() -> Self {
        Self {
            object_type: ObjectType::MultiStateOutput,
            objects: InstanceList::new(),
        }
    }

    pub fn multistate_value() -> Self {
        Self {
            object_type: ObjectType::MultiStateValue,
            objects: InstanceList::new(),
        }
    }

    fn commandable(&self) -> bool {
        self.object_type != ObjectType::MultiStateInput
    }

    pub fn present_value(&self, instance: u32) -> Option<u32> {
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

    pub fn set_present_value(&mut self, instance: u32, state: u32) -> bool {
        match self.objects.get_mut(instance) {
            Some(object) if object.state_in_range(state) => {
                if object.present_value != state {
                    object.changed = true;
                }
                object.present_value = state;
                true
            }
            _ => false,
        }
    }

    pub fn configure_states(&mut self, instance: u32, state_text: &[&str]) {
        if let Some(object) = self.objects.get_mut(instance) {
            object.number_of_states = state_text.len() as u32;
            object.state_text = state_text
                .iter()
                .map(|text| CharacterString::new(text))
                .collect();
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
        value: Option<u32>,
        priority: u8,
    ) -> Result<(), PropertyError> {
        let object = self
            .objects
            .get_mut(instance)
            .ok_or(PropertyError::unknown_object())?;
        if let Some(state) = value {
            if !object.state_in_range(state) {
                return Err(PropertyError::value_out_of_range());
            }
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
        }
        Ok(())
    }

    fn default_name(&self, instance: u32) -> CharacterString {
        let prefix = match self.object_type {
            ObjectType::MultiStateInput => "MULTI-STATE INPUT",
            ObjectType::MultiStateOutput => "MULTI-STATE OUTPUT",
            _ => "MULTI-STATE VALUE",
        };
        CharacterString::new(&format!("{} {}", prefix, instance))
    }
}

impl ObjectHandler for MultiStateHandler {
    fn object_type(&self) -> ObjectType {
        self.object_type
    }

    fn property_lists(&self) -> PropertyLists {
        PropertyLists {
            required: if self.commandable() {
                MULTISTATE_COMMANDABLE_PROPERTIES_REQUIRED
            } else {
                MULTISTATE_PROPERTIES_REQUIRED
            },
            optional: MULTISTATE_PROPERTIES_OPTIONAL,
            proprietary: NO_PROPERTIES,
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
        self.objects.insert(instance, MultiStatePoint::new())?;
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
                crate::encoding::encode_application_unsigned(buffer, present_value as u64)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::NumberOfStates => {
                crate::encoding::encode_application_unsigned(
                    buffer,
                    object.number_of_states as u64,
                )
                .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::StateText => {
                if object.state_text.is_empty() {
                    return Err(PropertyError::unknown_property().into());
                }
                return encode_array_property(
                    buffer,
                    request.array_index,
                    object.state_text.len() as u32,
                    |index, buffer| {
                        crate::encoding::encode_application_character_string(
                            buffer,
                            &object.state_text[(index - 1) as usize],
                        )
                    },
                );
            }
            PropertyIdentifier::PriorityArray if self.commandable() => {
                return encode_array_property(
                    buffer,
                    request.array_index,
                    crate::BACNET_MAX_PRIORITY as u32,
                    |index, buffer| match object.priority_array.slot(index as u8) {
                        Some(value) => {
                            crate::encoding::encode_application_unsigned(buffer, value as u64)
                        }
                        None => crate::encoding::encode_application_null(buffer),
                    },
                );
            }
            PropertyIdentifier::RelinquishDefault if self.commandable() => {
                crate::encoding::encode_application_unsigned(
                    buffer,
                    object.relinquish_default as u64,
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
                match request.value {
                    ApplicationDataValue::Unsigned(state) => {
                        self.command(request.object_instance, Some(state as u32), priority)?;
                        Ok(())
                    }
                    ApplicationDataValue::Null => {
                        self.command(request.object_instance, None, priority)?;
                        Ok(())
                    }
                    _ => Err(PropertyError::invalid_data_type().into()),
                }
            }
            PropertyIdentifier::PresentValue => {
                let object = self.objects.get_mut(request.object_instance).unwrap();
                if !object.out_of_service {
                    return Err(PropertyError::write_access_denied().into());
                }
                match request.value {
                    ApplicationDataValue::Unsigned(state) => {
                        let state = state as u32;
                        if !object.state_in_range(state) {
                            return Err(PropertyError::value_out_of_range().into());
                        }
                        if object.present_value != state {
                            object.changed = true;
                        }
                        object.present_value = state;
                        Ok(())
                    }
                    _ => Err(PropertyError::invalid_data_type().into()),
                }
            }
            PropertyIdentifier::RelinquishDefault if self.commandable() => {
                let object = self.objects.get_mut(request.object_instance).unwrap();
                match request.value {
                    ApplicationDataValue::Unsigned(state) => {
                        let state = state as u32;
                        if !object.state_in_range(state) {
                            return Err(PropertyError::value_out_of_range().into());
                        }
                        object.relinquish_default = state;
                        Ok(())
                    }
                    _ => Err(PropertyError::invalid_data_type().into()),
                }
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
            ApplicationDataValue::Unsigned(present_value as u64),
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
