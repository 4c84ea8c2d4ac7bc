//! Notification Class Object
//!
//! Holds the alarm-distribution policy: a priority triple, the
//! ack-required transitions and a recipient-list of [`Destination`]
//! entries. The recipient-list is the device's canonical
//! AddListElement/RemoveListElement target.

use crate::encoding::constructed::Destination;
use crate::encoding::value::ApplicationDataValue;
use crate::encoding::{BitString, CharacterString};
use crate::object::{
    encode_array_property, AccessResult, InstanceList, ListElementData, ListElementError,
    ObjectHandler, ObjectType, PropertyError, PropertyIdentifier, PropertyLists,
    ReadPropertyData, WritePropertyData,
};
use crate::service::{ErrorClass, ErrorCode};

#[cfg(not(feature = "std"))]
use alloc::{format, vec::Vec};

const NOTIFICATION_PROPERTIES_REQUIRED: &[PropertyIdentifier] = &[
    PropertyIdentifier::ObjectIdentifier,
    PropertyIdentifier::ObjectName,
    PropertyIdentifier::ObjectType,
    PropertyIdentifier::NotificationClass,
    PropertyIdentifier::Priority,
    PropertyIdentifier::AckRequired,
    PropertyIdentifier::RecipientList,
    PropertyIdentifier::PropertyList,
];

const NO_PROPERTIES: &[PropertyIdentifier] = &[];

/// Notification Class object state
#[derive(Debug, Clone)]
pub struct NotificationClass {
    name: Option<CharacterString>,
    /// Event priorities for to-offnormal, to-fault, to-normal.
    pub priority: [u32; 3],
    /// Ack-required bits for the same three transitions.
    pub ack_required: BitString,
    pub recipient_list: Vec<Destination>,
}

impl NotificationClass {
    fn new() -> Self {
        Self {
            name: None,
            priority: [255, 255, 255],
            ack_required: BitString::from_bits(&[false; 3]),
            recipient_list: Vec::new(),
        }
    }
}

/// Notification Class object handler
#[derive(Debug, Default)]
pub struct NotificationClassHandler {
    objects: InstanceList<NotificationClass>,
}

impl NotificationClassHandler {
    pub fn new() -> Self {
        Self {
            objects: InstanceList::new(),
        }
    }

    pub fn recipient_list(&self, instance: u32) -> Option<&[Destination]> {
        self.objects
            .get(instance)
            .map(|object| object.recipient_list.as_slice())
    }

    pub fn add_recipient(&mut self, instance: u32, destination: Destination) -> bool {
        match self.objects.get_mut(instance) {
            Some(object) => {
                object.recipient_list.push(destination);
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

    fn decode_destinations(payload: &[u8]) -> Result<Vec<Destination>, ListElementError> {
        let mut destinations = Vec::new();
        let mut pos = 0;
        while pos < payload.len() {
            match Destination::decode(&payload[pos..]) {
                Ok((destination, consumed)) => {
                    destinations.push(destination);
                    pos += consumed;
                }
                Err(_) => {
                    return Err(ListElementError::new(
                        PropertyError::new(ErrorClass::Property, ErrorCode::InvalidDataType),
                        destinations.len() as u32 + 1,
                    ));
                }
            }
        }
        Ok(destinations)
    }
}

impl ObjectHandler for NotificationClassHandler {
    fn object_type(&self) -> ObjectType {
        ObjectType::NotificationClass
    }

    fn property_lists(&self) -> PropertyLists {
        PropertyLists {
            required: NOTIFICATION_PROPERTIES_REQUIRED,
            optional: NO_PROPERTIES,
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
            None => CharacterString::new(&format!("NOTIFICATION CLASS {}", instance)),
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
        self.objects.insert(instance, NotificationClass::new())?;
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
            PropertyIdentifier::NotificationClass => {
                crate::encoding::encode_application_unsigned(
                    buffer,
                    request.object_instance as u64,
                )
                .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::Priority => {
                return encode_array_property(buffer, request.array_index, 3, |index, buffer| {
                    crate::encoding::encode_application_unsigned(
                        buffer,
                        object.priority[(index - 1) as usize] as u64,
                    )
                });
            }
            PropertyIdentifier::AckRequired => {
                crate::encoding::encode_application_bit_string(buffer, &object.ack_required)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::RecipientList => {
                for destination in &object.recipient_list {
                    destination
                        .encode(buffer)
                        .map_err(|_| PropertyError::value_out_of_range())?;
                }
            }
            _ => return Err(PropertyError::unknown_property().into()),
        }
        Ok(buffer.len() - start)
    }

    fn write_property(&mut self, request: &WritePropertyData) -> AccessResult<()> {
        let object = self
            .objects
            .get_mut(request.object_instance)
            .ok_or(PropertyError::unknown_object())?;
        match (request.property, &request.value) {
            (PropertyIdentifier::Priority, ApplicationDataValue::Unsigned(value)) => {
                let index = request.array_index;
                if !(1..=3).contains(&index) {
                    return Err(PropertyError::invalid_array_index().into());
                }
                if *value > 255 {
                    return Err(PropertyError::value_out_of_range().into());
                }
                object.priority[(index - 1) as usize] = *value as u32;
                Ok(())
            }
            _ => Err(PropertyError::write_access_denied().into()),
        }
    }

    fn add_list_element(&mut self, request: &ListElementData) -> Result<(), ListElementError> {
        if request.property != PropertyIdentifier::RecipientList {
            return Err(ListElementError::new(PropertyError::not_a_list(), 0));
        }
        let destinations = Self::decode_destinations(&request.elements)?;
        let object = self
            .objects
            .get_mut(request.object_instance)
            .ok_or_else(|| ListElementError::new(PropertyError::unknown_object(), 0))?;
        object.recipient_list.extend(destinations);
        Ok(())
    }

    fn remove_list_element(&mut self, request: &ListElementData) -> Result<(), ListElementError> {
        if request.property != PropertyIdentifier::RecipientList {
            return Err(ListElementError::new(PropertyError::not_a_list(), 0));
        }
        let destinations = Self::decode_destinations(&request.elements)?;
        let object = self
            .objects
            .get_mut(request.object_instance)
            .ok_or_else(|| ListElementError::new(PropertyError::unknown_object(), 0))?;

        for (index, destination) in destinations.iter().enumerate() {
            if !object.recipient_list.contains(destination) {
                return Err(ListElementError::new(
                    PropertyError::new(ErrorClass::Services, ErrorCode::ListElementNotFound),
                    index as u32 + 1,
                ));
            }
        }
        for destination in &destinations {
            if let Some(position) = object
                .recipient_list
                .iter()
                .position(|entry| entry == destination)
            {
                object.recipient_list.remove(position);
            }
        }
        Ok(())
    }
}
