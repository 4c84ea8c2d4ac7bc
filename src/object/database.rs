//! Object Database
//!
//! One registry per object type, all owned by a single [`ObjectDatabase`]
//! that the service handlers dispatch through. The database enforces the
//! device-wide invariants (object-name uniqueness, known-property
//! membership, array semantics for the centrally-served properties) and
//! fans the maintenance tick out to object timers.
//!
//! There is no global state: the database is an explicit value the host
//! owns and passes to the APDU handler.

use crate::encoding::value::ApplicationDataValue;
use crate::encoding::CharacterString;
use crate::object::{
    encode_array_property, AccessError, AccessResult, DeviceObject, ListElementData,
    ListElementError, ObjectHandler, ObjectIdentifier, ObjectType, PropertyError,
    PropertyIdentifier, ReadPropertyData, WritePropertyData,
};
use crate::service::{ErrorClass, ErrorCode};

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, vec::Vec};

/// Properties every object answers through the database rather than its own
/// handler.
fn is_common_property(property: PropertyIdentifier) -> bool {
    matches!(
        property,
        PropertyIdentifier::ObjectIdentifier
            | PropertyIdentifier::ObjectName
            | PropertyIdentifier::ObjectType
            | PropertyIdentifier::PropertyList
    )
}

/// BACnetARRAY properties; an array index on anything else is an error.
fn is_array_property(property: PropertyIdentifier) -> bool {
    matches!(
        property,
        PropertyIdentifier::PriorityArray
            | PropertyIdentifier::PropertyList
            | PropertyIdentifier::ObjectList
            | PropertyIdentifier::StateText
            | PropertyIdentifier::WeeklySchedule
            | PropertyIdentifier::Action
            | PropertyIdentifier::Priority
    )
}

/// The in-device object registry and dispatch layer.
pub struct ObjectDatabase {
    device: DeviceObject,
    handlers: Vec<Box<dyn ObjectHandler>>,
}

impl ObjectDatabase {
    pub fn new(device: DeviceObject) -> Self {
        let mut database = Self {
            device,
            handlers: Vec::new(),
        };
        database
            .device
            .set_object_type_supported(ObjectType::Device);
        database
    }

    /// Register the handler for one object type. Registration order fixes
    /// the object-list order.
    pub fn register(&mut self, handler: Box<dyn ObjectHandler>) -> Result<(), PropertyError> {
        let object_type = handler.object_type();
        if object_type == ObjectType::Device || self.handler(object_type).is_some() {
            return Err(PropertyError::new(
                ErrorClass::Object,
                ErrorCode::DuplicateObjectId,
            ));
        }
        self.device.set_object_type_supported(object_type);
        self.handlers.push(handler);
        Ok(())
    }

    pub fn device(&self) -> &DeviceObject {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut DeviceObject {
        &mut self.device
    }

    pub fn handler(&self, object_type: ObjectType) -> Option<&dyn ObjectHandler> {
        self.handlers
            .iter()
            .find(|handler| handler.object_type() == object_type)
            .map(|handler| handler.as_ref())
    }

    pub fn handler_mut(&mut self, object_type: ObjectType) -> Option<&mut Box<dyn ObjectHandler>> {
        self.handlers
            .iter_mut()
            .find(|handler| handler.object_type() == object_type)
    }

    fn is_device(&self, id: ObjectIdentifier) -> bool {
        id.object_type == ObjectType::Device
            && (id.instance == self.device.instance || id.instance == crate::BACNET_MAX_INSTANCE)
    }

    /// Every object in the device, device object first, then each type's
    /// instances in insertion order.
    pub fn object_list(&self) -> Vec<ObjectIdentifier> {
        let mut list = Vec::with_capacity(1 + self.object_count());
        list.push(self.device.object_id());
        for handler in &self.handlers {
            for index in 0..handler.count() {
                if let Some(instance) = handler.index_to_instance(index) {
                    list.push(ObjectIdentifier::new(handler.object_type(), instance));
                }
            }
        }
        list
    }

    /// Number of objects excluding the device object.
    pub fn object_count(&self) -> usize {
        self.handlers.iter().map(|handler| handler.count()).sum()
    }

    pub fn contains(&self, id: ObjectIdentifier) -> bool {
        if self.is_device(id) {
            return true;
        }
        self.handler(id.object_type)
            .map(|handler| handler.valid_instance(id.instance))
            .unwrap_or(false)
    }

    /// Resolve an object by its device-unique name.
    pub fn object_id_by_name(&self, name: &CharacterString) -> Option<ObjectIdentifier> {
        if self.device.object_name == *name {
            return Some(self.device.object_id());
        }
        for handler in &self.handlers {
            for index in 0..handler.count() {
                if let Some(instance) = handler.index_to_instance(index) {
                    if handler.object_name(instance).as_ref() == Some(name) {
                        return Some(ObjectIdentifier::new(handler.object_type(), instance));
                    }
                }
            }
        }
        None
    }

    /// Rename an object, enforcing device-wide name uniqueness.
    pub fn set_object_name(
        &mut self,
        id: ObjectIdentifier,
        name: CharacterString,
    ) -> Result<(), PropertyError> {
        if let Some(existing) = self.object_id_by_name(&name) {
            if existing != id {
                return Err(PropertyError::new(
                    ErrorClass::Property,
                    ErrorCode::DuplicateName,
                ));
            }
        }
        if self.is_device(id) {
            self.device.object_name = name;
            return Ok(());
        }
        let handler = self
            .handler_mut(id.object_type)
            .ok_or(PropertyError::unknown_object())?;
        if handler.set_object_name(id.instance, name) {
            Ok(())
        } else {
            Err(PropertyError::unknown_object())
        }
    }

    /// Create an object; `BACNET_MAX_INSTANCE` picks the next free instance.
    pub fn create_object(
        &mut self,
        object_type: ObjectType,
        instance: u32,
    ) -> Result<u32, PropertyError> {
        if !crate::util::is_valid_instance_number(instance) {
            return Err(PropertyError::value_out_of_range());
        }
        let handler = self.handler_mut(object_type).ok_or(PropertyError::new(
            ErrorClass::Object,
            ErrorCode::UnsupportedObjectType,
        ))?;
        let instance = handler.create(instance)?;
        self.device.database_revision = self.device.database_revision.wrapping_add(1);
        Ok(instance)
    }

    pub fn delete_object(&mut self, id: ObjectIdentifier) -> bool {
        let deleted = self
            .handler_mut(id.object_type)
            .map(|handler| handler.delete(id.instance))
            .unwrap_or(false);
        if deleted {
            self.device.database_revision = self.device.database_revision.wrapping_add(1);
        }
        deleted
    }

    fn read_common_property(
        &self,
        id: ObjectIdentifier,
        name: CharacterString,
        lists: crate::object::PropertyLists,
        request: &ReadPropertyData,
        buffer: &mut Vec<u8>,
    ) -> AccessResult<usize> {
        let start = buffer.len();
        match request.property {
            PropertyIdentifier::ObjectIdentifier => {
                crate::encoding::encode_application_object_id(
                    buffer,
                    id.object_type.into(),
                    id.instance,
                )
                .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::ObjectName => {
                crate::encoding::encode_application_character_string(buffer, &name)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::ObjectType => {
                crate::encoding::encode_application_enumerated(
                    buffer,
                    u16::from(id.object_type) as u32,
                )
                .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::PropertyList => {
                let members: Vec<PropertyIdentifier> = lists.listable().collect();
                return encode_array_property(
                    buffer,
                    request.array_index,
                    members.len() as u32,
                    |index, buffer| {
                        crate::encoding::encode_application_enumerated(
                            buffer,
                            members[(index - 1) as usize].into(),
                        )
                    },
                );
            }
            _ => return Err(PropertyError::unknown_property().into()),
        }
        Ok(buffer.len() - start)
    }

    /// The generic ReadProperty path: object lookup, membership, array
    /// semantics, then type dispatch.
    pub fn read_property(
        &self,
        id: ObjectIdentifier,
        request: &ReadPropertyData,
        buffer: &mut Vec<u8>,
    ) -> AccessResult<usize> {
        if request.array_index != crate::BACNET_ARRAY_ALL && !is_array_property(request.property)
        {
            return Err(PropertyError::not_an_array().into());
        }

        if self.is_device(id) {
            let lists = self.device.property_lists();
            if !lists.contains(request.property) {
                return Err(PropertyError::unknown_property().into());
            }
            if is_common_property(request.property) {
                return self.read_common_property(
                    self.device.object_id(),
                    self.device.object_name.clone(),
                    lists,
                    request,
                    buffer,
                );
            }
            return self.device.read_property(&self.object_list(), request, buffer);
        }

        let handler = self
            .handler(id.object_type)
            .ok_or(PropertyError::unknown_object())?;
        if !handler.valid_instance(id.instance) {
            return Err(PropertyError::unknown_object().into());
        }
        let lists = handler.property_lists();
        if !lists.contains(request.property) {
            return Err(PropertyError::unknown_property().into());
        }
        if is_common_property(request.property) {
            let name = handler
                .object_name(id.instance)
                .ok_or(PropertyError::unknown_object())?;
            return self.read_common_property(id, name, lists, request, buffer);
        }
        handler.read_property(request, buffer)
    }

    /// The generic WriteProperty path: lookup and membership checks, then
    /// type dispatch; Command selections execute afterwards.
    pub fn write_property(
        &mut self,
        id: ObjectIdentifier,
        request: &WritePropertyData,
    ) -> AccessResult<()> {
        if self.is_device(id) {
            let lists = self.device.property_lists();
            if !lists.contains(request.property) {
                return Err(PropertyError::unknown_property().into());
            }
            return self.device.write_property(request);
        }

        let handler = self
            .handler_mut(id.object_type)
            .ok_or(PropertyError::unknown_object())?;
        if !handler.valid_instance(id.instance) {
            return Err(PropertyError::unknown_object().into());
        }
        if !handler.property_lists().contains(request.property) {
            return Err(PropertyError::unknown_property().into());
        }
        handler.write_property(request)?;

        if id.object_type == ObjectType::Command {
            self.execute_pending_actions();
        }
        Ok(())
    }

    /// Run the action lists selected by Command present-value writes.
    fn execute_pending_actions(&mut self) {
        loop {
            let pending = match self.handler_mut(ObjectType::Command) {
                Some(handler) => handler.pending_actions(),
                None => return,
            };
            if pending.is_empty() {
                return;
            }
            for (instance, action) in pending {
                let commands = self
                    .handler(ObjectType::Command)
                    .and_then(|handler| handler.action_commands(instance, action))
                    .unwrap_or_default();

                let mut results = Vec::with_capacity(commands.len());
                let mut all_successful = true;
                for (index, command) in commands.iter().enumerate() {
                    let successful = self.execute_action_command(command);
                    results.push((index, successful));
                    if !successful {
                        all_successful = false;
                        if command.quit_on_failure {
                            // Skipped entries keep write-successful false.
                            break;
                        }
                    }
                }
                if let Some(handler) = self.handler_mut(ObjectType::Command) {
                    handler.complete_actions(instance, &results, all_successful);
                }
            }
        }
    }

    fn execute_action_command(
        &mut self,
        command: &crate::encoding::constructed::ActionCommand,
    ) -> bool {
        // Only writes within this device are performed.
        if let Some(device_id) = command.device_id {
            if device_id.instance != self.device.instance {
                log::warn!("action command targets remote {}, skipped", device_id);
                return false;
            }
        }
        let request = WritePropertyData {
            object_instance: command.object_id.instance,
            property: command.property,
            array_index: command.array_index.unwrap_or(crate::BACNET_ARRAY_ALL),
            value: command.value.clone(),
            priority: command.priority.unwrap_or(0),
        };
        match self.write_property(command.object_id, &request) {
            Ok(()) => true,
            Err(error) => {
                log::debug!("action write to {} failed: {:?}", command.object_id, error);
                false
            }
        }
    }

    /// AddListElement dispatch.
    pub fn add_list_element(
        &mut self,
        id: ObjectIdentifier,
        request: &ListElementData,
    ) -> Result<(), ListElementError> {
        let handler = self
            .handler_mut(id.object_type)
            .ok_or_else(|| ListElementError::new(PropertyError::unknown_object(), 0))?;
        if !handler.valid_instance(id.instance) {
            return Err(ListElementError::new(PropertyError::unknown_object(), 0));
        }
        if !handler.property_lists().contains(request.property) {
            return Err(ListElementError::new(PropertyError::unknown_property(), 0));
        }
        handler.add_list_element(request)
    }

    /// RemoveListElement dispatch.
    pub fn remove_list_element(
        &mut self,
        id: ObjectIdentifier,
        request: &ListElementData,
    ) -> Result<(), ListElementError> {
        let handler = self
            .handler_mut(id.object_type)
            .ok_or_else(|| ListElementError::new(PropertyError::unknown_object(), 0))?;
        if !handler.valid_instance(id.instance) {
            return Err(ListElementError::new(PropertyError::unknown_object(), 0));
        }
        if !handler.property_lists().contains(request.property) {
            return Err(ListElementError::new(PropertyError::unknown_property(), 0));
        }
        handler.remove_list_element(request)
    }

    /// Advance object timers by `milliseconds`.
    pub fn tick(&mut self, milliseconds: u64) {
        for handler in &mut self.handlers {
            handler.timer(milliseconds);
        }
    }

    /// Objects whose change-of-value flag is set.
    pub fn changed_objects(&self) -> Vec<ObjectIdentifier> {
        let mut changed = Vec::new();
        for handler in &self.handlers {
            for index in 0..handler.count() {
                if let Some(instance) = handler.index_to_instance(index) {
                    if handler.change_of_value(instance) {
                        changed.push(ObjectIdentifier::new(handler.object_type(), instance));
                    }
                }
            }
        }
        changed
    }

    /// The canonical COV value list for one object.
    pub fn value_list(
        &self,
        id: ObjectIdentifier,
    ) -> Option<Vec<crate::encoding::constructed::PropertyValue>> {
        self.handler(id.object_type)?.value_list(id.instance)
    }

    pub fn clear_change_of_value(&mut self, id: ObjectIdentifier) {
        if let Some(handler) = self.handler_mut(id.object_type) {
            handler.change_of_value_clear(id.instance);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::constructed::ActionCommand;
    use crate::object::analog::{AnalogCommandableHandler, AnalogInputHandler};
    use crate::object::command::CommandHandler;
    use crate::BACNET_ARRAY_ALL;

    fn test_database() -> ObjectDatabase {
        let mut database = ObjectDatabase::new(DeviceObject::new(1234, "unit device"));
        let mut inputs = AnalogInputHandler::new();
        inputs.create(0).unwrap();
        inputs.set_present_value(0, 72.5);
        database.register(Box::new(inputs)).unwrap();

        let mut outputs = AnalogCommandableHandler::analog_output();
        outputs.create(1).unwrap();
        database.register(Box::new(outputs)).unwrap();
        database
    }

    fn read(
        database: &ObjectDatabase,
        id: ObjectIdentifier,
        property: PropertyIdentifier,
        array_index: u32,
    ) -> AccessResult<Vec<u8>> {
        let mut buffer = Vec::new();
        database.read_property(
            id,
            &ReadPropertyData {
                object_instance: id.instance,
                property,
                array_index,
            },
            &mut buffer,
        )?;
        Ok(buffer)
    }

    #[test]
    fn test_unknown_object_and_property() {
        let database = test_database();
        let missing = ObjectIdentifier::new(ObjectType::AnalogInput, 9);
        let error = read(&database, missing, PropertyIdentifier::PresentValue, BACNET_ARRAY_ALL)
            .unwrap_err();
        assert_eq!(error, AccessError::Error(PropertyError::unknown_object()));

        let ai = ObjectIdentifier::new(ObjectType::AnalogInput, 0);
        let error = read(
            &database,
            ai,
            PropertyIdentifier::from(999u32),
            BACNET_ARRAY_ALL,
        )
        .unwrap_err();
        assert_eq!(error, AccessError::Error(PropertyError::unknown_property()));
    }

    #[test]
    fn test_common_properties_served_centrally() {
        let database = test_database();
        let ai = ObjectIdentifier::new(ObjectType::AnalogInput, 0);

        let buffer = read(&database, ai, PropertyIdentifier::ObjectName, BACNET_ARRAY_ALL).unwrap();
        let (name, _) = crate::encoding::decode_application_character_string(&buffer).unwrap();
        assert!(!name.is_empty());

        let buffer = read(&database, ai, PropertyIdentifier::ObjectType, BACNET_ARRAY_ALL).unwrap();
        let (object_type, _) = crate::encoding::decode_application_enumerated(&buffer).unwrap();
        assert_eq!(object_type, 0);

        // property-list array: index 0 is its length.
        let buffer = read(&database, ai, PropertyIdentifier::PropertyList, 0).unwrap();
        let (count, _) = crate::encoding::decode_application_unsigned(&buffer).unwrap();
        assert!(count >= 5);
    }

    #[test]
    fn test_array_index_on_scalar_property() {
        let database = test_database();
        let ai = ObjectIdentifier::new(ObjectType::AnalogInput, 0);
        let error = read(&database, ai, PropertyIdentifier::PresentValue, 1).unwrap_err();
        assert_eq!(error, AccessError::Error(PropertyError::not_an_array()));
    }

    #[test]
    fn test_device_object_list() {
        let database = test_database();
        let list = database.object_list();
        assert_eq!(list[0], ObjectIdentifier::new(ObjectType::Device, 1234));
        assert_eq!(list.len(), 3);

        let device_id = ObjectIdentifier::new(ObjectType::Device, 1234);
        let buffer = read(&database, device_id, PropertyIdentifier::ObjectList, 0).unwrap();
        let (count, _) = crate::encoding::decode_application_unsigned(&buffer).unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_wildcard_device_instance() {
        let database = test_database();
        let wildcard = ObjectIdentifier::new(ObjectType::Device, crate::BACNET_MAX_INSTANCE);
        let buffer =
            read(&database, wildcard, PropertyIdentifier::VendorIdentifier, BACNET_ARRAY_ALL)
                .unwrap();
        let (vendor, _) = crate::encoding::decode_application_unsigned(&buffer).unwrap();
        assert_eq!(vendor, 260);
    }

    #[test]
    fn test_name_uniqueness() {
        let mut database = test_database();
        let ai = ObjectIdentifier::new(ObjectType::AnalogInput, 0);
        let ao = ObjectIdentifier::new(ObjectType::AnalogOutput, 1);

        database
            .set_object_name(ai, CharacterString::new("zone temp"))
            .unwrap();
        let error = database
            .set_object_name(ao, CharacterString::new("zone temp"))
            .unwrap_err();
        assert_eq!(error.code, ErrorCode::DuplicateName);

        assert_eq!(
            database.object_id_by_name(&CharacterString::new("zone temp")),
            Some(ai)
        );
    }

    #[test]
    fn test_write_and_relinquish_via_dispatch() {
        let mut database = test_database();
        let ao = ObjectIdentifier::new(ObjectType::AnalogOutput, 1);

        database
            .write_property(
                ao,
                &WritePropertyData {
                    object_instance: 1,
                    property: PropertyIdentifier::PresentValue,
                    array_index: BACNET_ARRAY_ALL,
                    value: ApplicationDataValue::Real(25.0),
                    priority: 8,
                },
            )
            .unwrap();

        let buffer = read(&database, ao, PropertyIdentifier::PresentValue, BACNET_ARRAY_ALL).unwrap();
        let (value, _) = crate::encoding::decode_application_real(&buffer).unwrap();
        assert_eq!(value, 25.0);

        database
            .write_property(
                ao,
                &WritePropertyData {
                    object_instance: 1,
                    property: PropertyIdentifier::PresentValue,
                    array_index: BACNET_ARRAY_ALL,
                    value: ApplicationDataValue::Null,
                    priority: 8,
                },
            )
            .unwrap();
        let buffer = read(&database, ao, PropertyIdentifier::PresentValue, BACNET_ARRAY_ALL).unwrap();
        let (value, _) = crate::encoding::decode_application_real(&buffer).unwrap();
        assert_eq!(value, 0.0);
    }

    #[test]
    fn test_command_execution_through_database() {
        let mut database = test_database();
        let mut commands = CommandHandler::new();
        commands.create(1).unwrap();
        commands.set_action_list(
            1,
            1,
            vec![
                ActionCommand {
                    device_id: None,
                    object_id: ObjectIdentifier::new(ObjectType::AnalogOutput, 1),
                    property: PropertyIdentifier::PresentValue,
                    array_index: None,
                    value: ApplicationDataValue::Real(42.0),
                    priority: Some(10),
                    post_delay: None,
                    quit_on_failure: true,
                    write_successful: false,
                },
                // This write fails: unknown object.
                ActionCommand {
                    device_id: None,
                    object_id: ObjectIdentifier::new(ObjectType::AnalogOutput, 99),
                    property: PropertyIdentifier::PresentValue,
                    array_index: None,
                    value: ApplicationDataValue::Real(1.0),
                    priority: Some(10),
                    post_delay: None,
                    quit_on_failure: true,
                    write_successful: false,
                },
            ],
        );
        database.register(Box::new(commands)).unwrap();

        let command_id = ObjectIdentifier::new(ObjectType::Command, 1);
        database
            .write_property(
                command_id,
                &WritePropertyData {
                    object_instance: 1,
                    property: PropertyIdentifier::PresentValue,
                    array_index: BACNET_ARRAY_ALL,
                    value: ApplicationDataValue::Unsigned(1),
                    priority: 0,
                },
            )
            .unwrap();

        // First entry applied, second failed, execution finished.
        let ao = ObjectIdentifier::new(ObjectType::AnalogOutput, 1);
        let buffer = read(&database, ao, PropertyIdentifier::PresentValue, BACNET_ARRAY_ALL).unwrap();
        let (value, _) = crate::encoding::decode_application_real(&buffer).unwrap();
        assert_eq!(value, 42.0);

        let buffer = read(
            &database,
            command_id,
            PropertyIdentifier::AllWritesSuccessful,
            BACNET_ARRAY_ALL,
        )
        .unwrap();
        let (all_ok, _) = crate::encoding::decode_application_boolean(&buffer).unwrap();
        assert!(!all_ok);

        let buffer =
            read(&database, command_id, PropertyIdentifier::InProcess, BACNET_ARRAY_ALL).unwrap();
        let (in_process, _) = crate::encoding::decode_application_boolean(&buffer).unwrap();
        assert!(!in_process);
    }
}
