//! Command Object
//!
//! A Command object holds an array of action lists. Writing an action
//! number 0..N to the present-value selects a list; the owning database
//! then executes each [`ActionCommand`] in order against local objects,
//! honoring quit-on-failure, and records the outcome in
//! all-writes-successful. `in-process` is true for the duration of the
//! execution.

use crate::encoding::constructed::ActionCommand;
use crate::encoding::value::ApplicationDataValue;
use crate::encoding::CharacterString;
use crate::object::{
    encode_array_property, AccessResult, InstanceList, ObjectHandler, ObjectType, PropertyError,
    PropertyIdentifier, PropertyLists, ReadPropertyData, StatusFlags, WritePropertyData,
};

#[cfg(not(feature = "std"))]
use alloc::{format, vec::Vec};

const COMMAND_PROPERTIES_REQUIRED: &[PropertyIdentifier] = &[
    PropertyIdentifier::ObjectIdentifier,
    PropertyIdentifier::ObjectName,
    PropertyIdentifier::ObjectType,
    PropertyIdentifier::PresentValue,
    PropertyIdentifier::InProcess,
    PropertyIdentifier::AllWritesSuccessful,
    PropertyIdentifier::Action,
    PropertyIdentifier::StatusFlags,
    PropertyIdentifier::PropertyList,
];

const NO_PROPERTIES: &[PropertyIdentifier] = &[];

/// Command object state
#[derive(Debug, Clone, Default)]
pub struct Command {
    name: Option<CharacterString>,
    pub present_value: u32,
    pub in_process: bool,
    pub all_writes_successful: bool,
    /// The Action array: one list of commands per action number.
    pub action_lists: Vec<Vec<ActionCommand>>,
}

impl Command {
    fn new() -> Self {
        Self {
            all_writes_successful: true,
            ..Default::default()
        }
    }
}

/// Command object handler.
///
/// Action execution needs write access to the whole device, so the handler
/// only records the selected action; [`crate::object::ObjectDatabase`]
/// drains it via [`CommandHandler::take_pending`] right after the write and
/// feeds the results back through [`CommandHandler::finish_execution`].
#[derive(Debug, Default)]
pub struct CommandHandler {
    objects: InstanceList<Command>,
    pending: Vec<(u32, u32)>,
}

impl CommandHandler {
    pub fn new() -> Self {
        Self {
            objects: InstanceList::new(),
            pending: Vec::new(),
        }
    }

    pub fn present_value(&self, instance: u32) -> Option<u32> {
        self.objects.get(instance).map(|object| object.present_value)
    }

    pub fn in_process(&self, instance: u32) -> Option<bool> {
        self.objects.get(instance).map(|object| object.in_process)
    }

    pub fn all_writes_successful(&self, instance: u32) -> Option<bool> {
        self.objects
            .get(instance)
            .map(|object| object.all_writes_successful)
    }

    /// Install the action list for one action number (1-based).
    pub fn set_action_list(&mut self, instance: u32, action: u32, commands: Vec<ActionCommand>) {
        if action == 0 {
            return;
        }
        if let Some(object) = self.objects.get_mut(instance) {
            let index = (action - 1) as usize;
            if object.action_lists.len() <= index {
                object.action_lists.resize(index + 1, Vec::new());
            }
            object.action_lists[index] = commands;
        }
    }

    pub fn action_list(&self, instance: u32, action: u32) -> Option<&[ActionCommand]> {
        let object = self.objects.get(instance)?;
        object
            .action_lists
            .get((action.checked_sub(1)?) as usize)
            .map(|commands| commands.as_slice())
    }

    /// The `(instance, action)` pairs selected since the last drain.
    pub fn take_pending(&mut self) -> Vec<(u32, u32)> {
        core::mem::take(&mut self.pending)
    }

    /// Record the outcome of an executed action list.
    pub fn finish_execution(
        &mut self,
        instance: u32,
        results: &[(usize, bool)],
        all_successful: bool,
    ) {
        if let Some(object) = self.objects.get_mut(instance) {
            if let Some(commands) = object
                .action_lists
                .get_mut((object.present_value as usize).wrapping_sub(1))
            {
                for (index, successful) in results {
                    if let Some(command) = commands.get_mut(*index) {
                        command.write_successful = *successful;
                    }
                }
            }
            object.all_writes_successful = all_successful;
            object.in_process = false;
        }
    }

    pub fn set_name(&mut self, instance: u32, name: CharacterString) {
        if let Some(object) = self.objects.get_mut(instance) {
            object.name = Some(name);
        }
    }
}

impl ObjectHandler for CommandHandler {
    fn object_type(&self) -> ObjectType {
        ObjectType::Command
    }

    fn property_lists(&self) -> PropertyLists {
        PropertyLists {
            required: COMMAND_PROPERTIES_REQUIRED,
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
            None => CharacterString::new(&format!("COMMAND {}", instance)),
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

    fn pending_actions(&mut self) -> Vec<(u32, u32)> {
        self.take_pending()
    }

    fn action_commands(&self, instance: u32, action: u32) -> Option<Vec<ActionCommand>> {
        self.action_list(instance, action)
            .map(|commands| commands.to_vec())
    }

    fn complete_actions(&mut self, instance: u32, results: &[(usize, bool)], all_successful: bool) {
        self.finish_execution(instance, results, all_successful);
    }

    fn create(&mut self, instance: u32) -> Result<u32, PropertyError> {
        let instance = if instance == crate::BACNET_MAX_INSTANCE {
            self.objects.next_free_instance()
        } else {
            instance
        };
        self.objects.insert(instance, Command::new())?;
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
                crate::encoding::encode_application_unsigned(buffer, object.present_value as u64)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::InProcess => {
                crate::encoding::encode_application_boolean(buffer, object.in_process)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::AllWritesSuccessful => {
                crate::encoding::encode_application_boolean(buffer, object.all_writes_successful)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::Action => {
                return encode_array_property(
                    buffer,
                    request.array_index,
                    object.action_lists.len() as u32,
                    |index, buffer| {
                        let mut written = 0;
                        for command in &object.action_lists[(index - 1) as usize] {
                            written += command.encode(buffer)?;
                        }
                        Ok(written)
                    },
                );
            }
            PropertyIdentifier::StatusFlags => {
                crate::encoding::encode_application_bit_string(
                    buffer,
                    &StatusFlags::empty().to_bit_string(),
                )
                .map_err(|_| PropertyError::value_out_of_range())?;
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
        match request.property {
            PropertyIdentifier::PresentValue => match request.value {
                ApplicationDataValue::Unsigned(action) => {
                    let action = action as u32;
                    if action as usize > object.action_lists.len() {
                        return Err(PropertyError::value_out_of_range().into());
                    }
                    if object.in_process {
                        return Err(PropertyError::new(
                            crate::service::ErrorClass::Object,
                            crate::service::ErrorCode::DeviceBusy,
                        )
                        .into());
                    }
                    object.present_value = action;
                    // Action 0 selects nothing.
                    if action > 0 {
                        object.in_process = true;
                        object.all_writes_successful = true;
                        self.pending.push((request.object_instance, action));
                    }
                    Ok(())
                }
                _ => Err(PropertyError::invalid_data_type().into()),
            },
            _ => Err(PropertyError::write_access_denied().into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectIdentifier;
    use crate::BACNET_ARRAY_ALL;

    fn action(target: u32, value: f32) -> ActionCommand {
        ActionCommand {
            device_id: None,
            object_id: ObjectIdentifier::new(ObjectType::AnalogValue, target),
            property: PropertyIdentifier::PresentValue,
            array_index: None,
            value: ApplicationDataValue::Real(value),
            priority: Some(10),
            post_delay: None,
            quit_on_failure: true,
            write_successful: false,
        }
    }

    #[test]
    fn test_selector_write_queues_execution() {
        let mut handler = CommandHandler::new();
        handler.create(1).unwrap();
        handler.set_action_list(1, 1, vec![action(1, 20.0), action(2, 21.0)]);

        handler
            .write_property(&WritePropertyData {
                object_instance: 1,
                property: PropertyIdentifier::PresentValue,
                array_index: BACNET_ARRAY_ALL,
                value: ApplicationDataValue::Unsigned(1),
                priority: 0,
            })
            .unwrap();

        assert_eq!(handler.in_process(1), Some(true));
        assert_eq!(handler.take_pending(), vec![(1, 1)]);
        assert!(handler.take_pending().is_empty());
    }

    #[test]
    fn test_selector_out_of_range() {
        let mut handler = CommandHandler::new();
        handler.create(1).unwrap();
        handler.set_action_list(1, 1, vec![action(1, 20.0)]);

        let error = handler
            .write_property(&WritePropertyData {
                object_instance: 1,
                property: PropertyIdentifier::PresentValue,
                array_index: BACNET_ARRAY_ALL,
                value: ApplicationDataValue::Unsigned(5),
                priority: 0,
            })
            .unwrap_err();
        assert_eq!(
            error,
            crate::object::AccessError::Error(PropertyError::value_out_of_range())
        );
    }

    #[test]
    fn test_finish_execution_records_outcome() {
        let mut handler = CommandHandler::new();
        handler.create(1).unwrap();
        handler.set_action_list(1, 1, vec![action(1, 20.0), action(2, 21.0)]);
        handler
            .write_property(&WritePropertyData {
                object_instance: 1,
                property: PropertyIdentifier::PresentValue,
                array_index: BACNET_ARRAY_ALL,
                value: ApplicationDataValue::Unsigned(1),
                priority: 0,
            })
            .unwrap();

        handler.finish_execution(1, &[(0, true), (1, false)], false);
        assert_eq!(handler.in_process(1), Some(false));
        assert_eq!(handler.all_writes_successful(1), Some(false));
        let commands = handler.action_list(1, 1).unwrap();
        assert!(commands[0].write_successful);
        assert!(!commands[1].write_successful);
    }

    #[test]
    fn test_zero_selector_is_idle() {
        let mut handler = CommandHandler::new();
        handler.create(1).unwrap();
        handler
            .write_property(&WritePropertyData {
                object_instance: 1,
                property: PropertyIdentifier::PresentValue,
                array_index: BACNET_ARRAY_ALL,
                value: ApplicationDataValue::Unsigned(0),
                priority: 0,
            })
            .unwrap();
        assert_eq!(handler.in_process(1), Some(false));
        assert!(handler.take_pending().is_empty());
    }
}
