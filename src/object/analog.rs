//! Analog Object Types
//!
//! Analog Input, Analog Output and Analog Value objects. Outputs and values
//! are commandable: their present-value is arbitrated by the 16-slot
//! priority array with a relinquish-default fallback, and every mutation
//! runs change-of-value detection before the write-indication callback
//! fires.

use crate::encoding::value::ApplicationDataValue;
use crate::encoding::CharacterString;
use crate::object::{
    cov_value_list, encode_array_property, AccessResult, CovTracker, EngineeringUnits,
    EventState, InstanceList, ObjectHandler, ObjectType, PriorityArray, PropertyError,
    PropertyIdentifier, PropertyLists, ReadPropertyData, Reliability, StatusFlags,
    WritePropertyData,
};

#[cfg(not(feature = "std"))]
use alloc::{format, vec::Vec};

/// Notified after a commandable present-value change commits:
/// `(instance, old_value, new_value)`.
pub type AnalogWriteCallback = fn(u32, f32, f32);

const ANALOG_INPUT_PROPERTIES_REQUIRED: &[PropertyIdentifier] = &[
    PropertyIdentifier::ObjectIdentifier,
    PropertyIdentifier::ObjectName,
    PropertyIdentifier::ObjectType,
    PropertyIdentifier::PresentValue,
    PropertyIdentifier::StatusFlags,
    PropertyIdentifier::EventState,
    PropertyIdentifier::OutOfService,
    PropertyIdentifier::Units,
    PropertyIdentifier::PropertyList,
];

const ANALOG_INPUT_PROPERTIES_OPTIONAL: &[PropertyIdentifier] = &[
    PropertyIdentifier::Reliability,
    PropertyIdentifier::CovIncrement,
    PropertyIdentifier::MinPresValue,
    PropertyIdentifier::MaxPresValue,
];

const ANALOG_OUTPUT_PROPERTIES_REQUIRED: &[PropertyIdentifier] = &[
    PropertyIdentifier::ObjectIdentifier,
    PropertyIdentifier::ObjectName,
    PropertyIdentifier::ObjectType,
    PropertyIdentifier::PresentValue,
    PropertyIdentifier::StatusFlags,
    PropertyIdentifier::EventState,
    PropertyIdentifier::OutOfService,
    PropertyIdentifier::Units,
    PropertyIdentifier::PriorityArray,
    PropertyIdentifier::RelinquishDefault,
    PropertyIdentifier::CurrentCommandPriority,
    PropertyIdentifier::PropertyList,
];

const ANALOG_OUTPUT_PROPERTIES_OPTIONAL: &[PropertyIdentifier] = &[
    PropertyIdentifier::Reliability,
    PropertyIdentifier::CovIncrement,
    PropertyIdentifier::MinPresValue,
    PropertyIdentifier::MaxPresValue,
];

const NO_PROPERTIES: &[PropertyIdentifier] = &[];

/// Analog Input point state
#[derive(Debug, Clone)]
pub struct AnalogInput {
    name: Option<CharacterString>,
    pub present_value: f32,
    pub units: EngineeringUnits,
    pub event_state: EventState,
    pub reliability: Reliability,
    pub out_of_service: bool,
    cov: CovTracker,
}

impl AnalogInput {
    fn new() -> Self {
        Self {
            name: None,
            present_value: 0.0,
            units: EngineeringUnits::NoUnits,
            event_state: EventState::Normal,
            reliability: Reliability::NoFaultDetected,
            out_of_service: false,
            cov: CovTracker::new(1.0),
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

/// Analog Input object handler
#[derive(Debug, Default)]
pub struct AnalogInputHandler {
    objects: InstanceList<AnalogInput>,
}

impl AnalogInputHandler {
    pub fn new() -> Self {
        Self {
            objects: InstanceList::new(),
        }
    }

    /// Update the measured value, running COV detection.
    pub fn set_present_value(&mut self, instance: u32, value: f32) -> bool {
        match self.objects.get_mut(instance) {
            Some(object) => {
                object.present_value = value;
                object.cov.track(value);
                true
            }
            None => false,
        }
    }

    pub fn present_value(&self, instance: u32) -> Option<f32> {
        self.objects.get(instance).map(|object| object.present_value)
    }

    pub fn set_units(&mut self, instance: u32, units: EngineeringUnits) {
        if let Some(object) = self.objects.get_mut(instance) {
            object.units = units;
        }
    }

    pub fn set_cov_increment(&mut self, instance: u32, increment: f32) {
        if let Some(object) = self.objects.get_mut(instance) {
            object.cov.increment = increment;
        }
    }

    pub fn set_name(&mut self, instance: u32, name: CharacterString) {
        if let Some(object) = self.objects.get_mut(instance) {
            object.name = Some(name);
        }
    }
}

impl ObjectHandler for AnalogInputHandler {
    fn object_type(&self) -> ObjectType {
        ObjectType::AnalogInput
    }

    fn property_lists(&self) -> PropertyLists {
        PropertyLists {
            required: ANALOG_INPUT_PROPERTIES_REQUIRED,
            optional: ANALOG_INPUT_PROPERTIES_OPTIONAL,
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
            None => CharacterString::new(&format!("ANALOG INPUT {}", instance)),
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
        self.objects.insert(instance, AnalogInput::new())?;
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
        let start = buffer.len();
        match request.property {
            PropertyIdentifier::PresentValue => {
                crate::encoding::encode_application_real(buffer, object.present_value)
            }
            PropertyIdentifier::StatusFlags => crate::encoding::encode_application_bit_string(
                buffer,
                &object.status_flags().to_bit_string(),
            ),
            PropertyIdentifier::EventState => {
                crate::encoding::encode_application_enumerated(buffer, object.event_state as u32)
            }
            PropertyIdentifier::Reliability => {
                crate::encoding::encode_application_enumerated(buffer, object.reliability as u32)
            }
            PropertyIdentifier::OutOfService => {
                crate::encoding::encode_application_boolean(buffer, object.out_of_service)
            }
            PropertyIdentifier::Units => {
                crate::encoding::encode_application_enumerated(buffer, object.units.into())
            }
            PropertyIdentifier::CovIncrement => {
                crate::encoding::encode_application_real(buffer, object.cov.increment)
            }
            _ => return Err(PropertyError::unknown_property().into()),
        }
        .map_err(|_| PropertyError::value_out_of_range())?;
        Ok(buffer.len() - start)
    }

    fn write_property(&mut self, request: &WritePropertyData) -> AccessResult<()> {
        let object = self
            .objects
            .get_mut(request.object_instance)
            .ok_or(PropertyError::unknown_object())?;
        match request.property {
            // Inputs take direct writes only while out of service.
            PropertyIdentifier::PresentValue => {
                if !object.out_of_service {
                    return Err(PropertyError::write_access_denied().into());
                }
                match request.value {
                    ApplicationDataValue::Real(value) => {
                        object.present_value = value;
                        object.cov.track(value);
                        Ok(())
                    }
                    _ => Err(PropertyError::invalid_data_type().into()),
                }
            }
            PropertyIdentifier::OutOfService => match request.value {
                ApplicationDataValue::Boolean(value) => {
                    if object.out_of_service != value {
                        object.cov.mark_changed();
                    }
                    object.out_of_service = value;
                    Ok(())
                }
                _ => Err(PropertyError::invalid_data_type().into()),
            },
            PropertyIdentifier::CovIncrement => match request.value {
                ApplicationDataValue::Real(value) if value >= 0.0 => {
                    object.cov.increment = value;
                    Ok(())
                }
                ApplicationDataValue::Real(_) => Err(PropertyError::value_out_of_range().into()),
                _ => Err(PropertyError::invalid_data_type().into()),
            },
            _ => Err(PropertyError::write_access_denied().into()),
        }
    }

    fn value_list(
        &self,
        instance: u32,
    ) -> Option<Vec<crate::encoding::constructed::PropertyValue>> {
        let object = self.objects.get(instance)?;
        Some(cov_value_list(
            ApplicationDataValue::Real(object.present_value),
            object.status_flags(),
        ))
    }

    fn change_of_value(&self, instance: u32) -> bool {
        self.objects
            .get(instance)
            .map(|object| object.cov.changed())
            .unwrap_or(false)
    }

    fn change_of_value_clear(&mut self, instance: u32) {
        if let Some(object) = self.objects.get_mut(instance) {
            object.cov.clear();
        }
    }
}

/// Commandable analog point state, shared by Analog Output and Analog Value.
#[derive(Debug, Clone)]
pub struct AnalogCommandable {
    name: Option<CharacterString>,
    priority_array: PriorityArray<f32>,
    pub relinquish_default: f32,
    pub units: EngineeringUnits,
    pub event_state: EventState,
    pub reliability: Reliability,
    pub out_of_service: bool,
    pub min_pres_value: f32,
    pub max_pres_value: f32,
    cov: CovTracker,
}

impl AnalogCommandable {
    fn new() -> Self {
        Self {
            name: None,
            priority_array: PriorityArray::new(),
            relinquish_default: 0.0,
            units: EngineeringUnits::NoUnits,
            event_state: EventState::Normal,
            reliability: Reliability::NoFaultDetected,
            out_of_service: false,
            min_pres_value: f32::MIN,
            max_pres_value: f32::MAX,
            cov: CovTracker::new(1.0),
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

    fn present_value(&self) -> f32 {
        self.priority_array.value().unwrap_or(self.relinquish_default)
    }
}

/// Handler for the commandable analog types (Analog Output, Analog Value).
#[derive(Debug)]
pub struct AnalogCommandableHandler {
    object_type: ObjectType,
    objects: InstanceList<AnalogCommandable>,
    write_callback: Option<AnalogWriteCallback>,
}

impl AnalogCommandableHandler {
    pub fn analog_output() -> Self {
        Self {
            object_type: ObjectType::AnalogOutput,
            objects: InstanceList::new(),
            write_callback: None,
        }
    }

    pub fn analog_value() -> Self {
        Self {
            object_type: ObjectType::AnalogValue,
            objects: InstanceList::new(),
            write_callback: None,
        }
    }

    /// Register the write-indication callback, invoked after COV detection
    /// whenever an in-service present-value changes.
    pub fn set_write_callback(&mut self, callback: AnalogWriteCallback) {
        self.write_callback = Some(callback);
    }

    pub fn present_value(&self, instance: u32) -> Option<f32> {
        self.objects.get(instance).map(|object| object.present_value())
    }

    pub fn current_command_priority(&self, instance: u32) -> Option<u8> {
        self.objects
            .get(instance)
            .and_then(|object| object.priority_array.active_priority())
    }

    pub fn set_relinquish_default(&mut self, instance: u32, value: f32) {
        if let Some(object) = self.objects.get_mut(instance) {
            object.relinquish_default = value;
        }
    }

    pub fn set_limits(&mut self, instance: u32, min: f32, max: f32) {
        if let Some(object) = self.objects.get_mut(instance) {
            object.min_pres_value = min;
            object.max_pres_value = max;
        }
    }

    pub fn set_name(&mut self, instance: u32, name: CharacterString) {
        if let Some(object) = self.objects.get_mut(instance) {
            object.name = Some(name);
        }
    }

    /// The commandable write algorithm: commit the slot, recompute, detect
    /// COV, then notify.
    fn command(
        &mut self,
        instance: u32,
        value: Option<f32>,
        priority: u8,
    ) -> Result<(), PropertyError> {
        let callback = self.write_callback;
        let object = self
            .objects
            .get_mut(instance)
            .ok_or(PropertyError::unknown_object())?;

        if let Some(value) = value {
            if value < object.min_pres_value || value > object.max_pres_value {
                return Err(PropertyError::value_out_of_range());
            }
        }

        let old_value = object.present_value();
        object.priority_array.set(priority, value)?;
        let new_value = object.present_value();

        if new_value != old_value {
            object.cov.track(new_value);
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
            ObjectType::AnalogValue => "ANALOG VALUE",
            _ => "ANALOG OUTPUT",
        };
        CharacterString::new(&format!("{} {}", prefix, instance))
    }
}

impl ObjectHandler for AnalogCommandableHandler {
    fn object_type(&self) -> ObjectType {
        self.object_type
    }

    fn property_lists(&self) -> PropertyLists {
        PropertyLists {
            required: ANALOG_OUTPUT_PROPERTIES_REQUIRED,
            optional: ANALOG_OUTPUT_PROPERTIES_OPTIONAL,
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
        self.objects.insert(instance, AnalogCommandable::new())?;
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
        let start = buffer.len();
        match request.property {
            PropertyIdentifier::PresentValue => {
                crate::encoding::encode_application_real(buffer, object.present_value())
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::PriorityArray => {
                return encode_array_property(
                    buffer,
                    request.array_index,
                    crate::BACNET_MAX_PRIORITY as u32,
                    |index, buffer| match object.priority_array.slot(index as u8) {
                        Some(value) => crate::encoding::encode_application_real(buffer, value),
                        None => crate::encoding::encode_application_null(buffer),
                    },
                );
            }
            PropertyIdentifier::RelinquishDefault => {
                crate::encoding::encode_application_real(buffer, object.relinquish_default)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::CurrentCommandPriority => {
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
            PropertyIdentifier::Units => {
                crate::encoding::encode_application_enumerated(buffer, object.units.into())
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::CovIncrement => {
                crate::encoding::encode_application_real(buffer, object.cov.increment)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::MinPresValue => {
                crate::encoding::encode_application_real(buffer, object.min_pres_value)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::MaxPresValue => {
                crate::encoding::encode_application_real(buffer, object.max_pres_value)
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
            PropertyIdentifier::PresentValue => {
                let priority = request.effective_priority();
                match request.value {
                    ApplicationDataValue::Real(value) => {
                        self.command(request.object_instance, Some(value), priority)?;
                        Ok(())
                    }
                    // Null relinquishes the slot.
                    ApplicationDataValue::Null => {
                        self.command(request.object_instance, None, priority)?;
                        Ok(())
                    }
                    _ => Err(PropertyError::invalid_data_type().into()),
                }
            }
            PropertyIdentifier::RelinquishDefault => {
                let object = self.objects.get_mut(request.object_instance).unwrap();
                match request.value {
                    ApplicationDataValue::Real(value) => {
                        object.relinquish_default = value;
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
                            object.cov.mark_changed();
                        }
                        object.out_of_service = value;
                        Ok(())
                    }
                    _ => Err(PropertyError::invalid_data_type().into()),
                }
            }
            PropertyIdentifier::CovIncrement => {
                let object = self.objects.get_mut(request.object_instance).unwrap();
                match request.value {
                    ApplicationDataValue::Real(value) if value >= 0.0 => {
                        object.cov.increment = value;
                        Ok(())
                    }
                    ApplicationDataValue::Real(_) => {
                        Err(PropertyError::value_out_of_range().into())
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
        Some(cov_value_list(
            ApplicationDataValue::Real(object.present_value()),
            object.status_flags(),
        ))
    }

    fn change_of_value(&self, instance: u32) -> bool {
        self.objects
            .get(instance)
            .map(|object| object.cov.changed())
            .unwrap_or(false)
    }

    fn change_of_value_clear(&mut self, instance: u32) {
        if let Some(object) = self.objects.get_mut(instance) {
            object.cov.clear();
        }
    }
}
