//! Binary Lighting Output
//!
//! A commandable lighting relay with blink-warn semantics. Beyond plain
//! ON/OFF commands the present-value accepts WARN, WARN_OFF and
//! WARN_RELINQUISH operations: a blink-warn notification fires, the egress
//! timer runs for egress-time seconds, and on expiry the terminal value is
//! applied to the priority slot (or the slot is relinquished).
//!
//! A warn operation is suppressed when any of these hold:
//! - the specified priority is not the highest active priority,
//! - the current value is OFF,
//! - blink-warn-enable is false,
//! - (WARN_RELINQUISH) the slot holds no value, or the next value that
//!   would take over, including relinquish-default, is ON.

use crate::encoding::value::ApplicationDataValue;
use crate::encoding::CharacterString;
use crate::object::{
    cov_value_list, encode_array_property, AccessResult, BinaryLightingPv, EventState,
    InstanceList, ObjectHandler, ObjectType, PriorityArray, PropertyError, PropertyIdentifier,
    PropertyLists, ReadPropertyData, Reliability, StatusFlags, WritePropertyData,
};

#[cfg(not(feature = "std"))]
use alloc::{format, vec::Vec};

/// Called on every blink-warn notification: once when the warn is accepted
/// and once per timer pass while egress runs.
pub type BlinkWarnCallback = fn(u32);

/// Notified after the physical output value changes:
/// `(instance, old_value, new_value)`.
pub type LightingWriteCallback = fn(u32, BinaryLightingPv, BinaryLightingPv);

const BINARY_LIGHTING_PROPERTIES_REQUIRED: &[PropertyIdentifier] = &[
    PropertyIdentifier::ObjectIdentifier,
    PropertyIdentifier::ObjectName,
    PropertyIdentifier::ObjectType,
    PropertyIdentifier::PresentValue,
    PropertyIdentifier::StatusFlags,
    PropertyIdentifier::EventState,
    PropertyIdentifier::OutOfService,
    PropertyIdentifier::BlinkWarnEnable,
    PropertyIdentifier::EgressTime,
    PropertyIdentifier::EgressActive,
    PropertyIdentifier::PriorityArray,
    PropertyIdentifier::RelinquishDefault,
    PropertyIdentifier::CurrentCommandPriority,
    PropertyIdentifier::PropertyList,
];

const BINARY_LIGHTING_PROPERTIES_OPTIONAL: &[PropertyIdentifier] = &[
    PropertyIdentifier::Reliability,
    PropertyIdentifier::FeedbackValue,
];

const NO_PROPERTIES: &[PropertyIdentifier] = &[];

/// What happens to the slot when the egress timer expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EgressAction {
    None,
    TurnOn,
    TurnOff,
    Relinquish,
}

/// Binary Lighting Output state
#[derive(Debug, Clone)]
pub struct BinaryLightingOutput {
    name: Option<CharacterString>,
    priority_array: PriorityArray<BinaryLightingPv>,
    pub relinquish_default: BinaryLightingPv,
    pub blink_warn_enable: bool,
    /// Egress duration in seconds.
    pub egress_time: u32,
    egress_timer_ms: u64,
    egress_action: EgressAction,
    egress_priority: u8,
    feedback_value: BinaryLightingPv,
    pub event_state: EventState,
    pub reliability: Reliability,
    pub out_of_service: bool,
    changed: bool,
}

impl BinaryLightingOutput {
    fn new() -> Self {
        Self {
            name: None,
            priority_array: PriorityArray::new(),
            relinquish_default: BinaryLightingPv::Off,
            blink_warn_enable: false,
            egress_time: 0,
            egress_timer_ms: 0,
            egress_action: EgressAction::None,
            egress_priority: 0,
            feedback_value: BinaryLightingPv::Off,
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

    fn present_value(&self) -> BinaryLightingPv {
        self.priority_array.value().unwrap_or(self.relinquish_default)
    }

    fn egress_active(&self) -> bool {
        self.egress_action != EgressAction::None
    }
}

/// Binary Lighting Output object handler
#[derive(Debug)]
pub struct BinaryLightingOutputHandler {
    objects: InstanceList<BinaryLightingOutput>,
    blink_callback: Option<BlinkWarnCallback>,
    write_callback: Option<LightingWriteCallback>,
}

impl Default for BinaryLightingOutputHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl BinaryLightingOutputHandler {
    pub fn new() -> Self {
        Self {
            objects: InstanceList::new(),
            blink_callback: None,
            write_callback: None,
        }
    }

    pub fn set_blink_warn_callback(&mut self, callback: BlinkWarnCallback) {
        self.blink_callback = Some(callback);
    }

    pub fn set_write_callback(&mut self, callback: LightingWriteCallback) {
        self.write_callback = Some(callback);
    }

    pub fn present_value(&self, instance: u32) -> Option<BinaryLightingPv> {
        self.objects.get(instance).map(|object| object.present_value())
    }

    pub fn feedback_value(&self, instance: u32) -> Option<BinaryLightingPv> {
        self.objects.get(instance).map(|object| object.feedback_value)
    }

    pub fn egress_active(&self, instance: u32) -> bool {
        self.objects
            .get(instance)
            .map(|object| object.egress_active())
            .unwrap_or(false)
    }

    pub fn configure(
        &mut self,
        instance: u32,
        blink_warn_enable: bool,
        egress_time: u32,
        relinquish_default: BinaryLightingPv,
    ) {
        if let Some(object) = self.objects.get_mut(instance) {
            object.blink_warn_enable = blink_warn_enable;
            object.egress_time = egress_time;
            object.relinquish_default = relinquish_default;
        }
    }

    pub fn set_name(&mut self, instance: u32, name: CharacterString) {
        if let Some(object) = self.objects.get_mut(instance) {
            object.name = Some(name);
        }
    }

    /// Commit a slot mutation: recompute, mark COV, drive the output.
    fn commit(&mut self, instance: u32, old_value: BinaryLightingPv) {
        let callback = self.write_callback;
        let object = match self.objects.get_mut(instance) {
            Some(object) => object,
            None => return,
        };
        let new_value = object.present_value();
        if new_value != old_value {
            object.changed = true;
            if !object.out_of_service {
                if let Some(callback) = callback {
                    callback(instance, object.feedback_value, new_value);
                }
            }
            object.feedback_value = new_value;
        }
    }

    fn apply_on_off(
        &mut self,
        instance: u32,
        value: BinaryLightingPv,
        priority: u8,
    ) -> Result<(), PropertyError> {
        let object = self
            .objects
            .get_mut(instance)
            .ok_or(PropertyError::unknown_object())?;
        let old_value = object.present_value();
        object.priority_array.set(priority, Some(value))?;
        // A direct command at the controlling priority ends any egress.
        if priority <= object.egress_priority || object.priority_array.active_priority() == Some(priority)
        {
            object.egress_action = EgressAction::None;
            object.egress_timer_ms = 0;
        }
        self.commit(instance, old_value);
        Ok(())
    }

    fn relinquish(&mut self, instance: u32, priority: u8) -> Result<(), PropertyError> {
        let object = self
            .objects
            .get_mut(instance)
            .ok_or(PropertyError::unknown_object())?;
        let old_value = object.present_value();
        object.priority_array.set(priority, None)?;
        self.commit(instance, old_value);
        Ok(())
    }

    fn warn(
        &mut self,
        instance: u32,
        operation: BinaryLightingPv,
        priority: u8,
    ) -> Result<(), PropertyError> {
        let blink_callback = self.blink_callback;
        let object = self
            .objects
            .get_mut(instance)
            .ok_or(PropertyError::unknown_object())?;

        if priority == crate::BACNET_RESERVED_PRIORITY {
            return Err(PropertyError::write_access_denied());
        }
        if !crate::util::is_valid_priority(priority) {
            return Err(PropertyError::value_out_of_range());
        }

        // Suppression conditions; a suppressed warn succeeds without action.
        let active = object
            .priority_array
            .active_priority()
            .unwrap_or(crate::BACNET_MAX_PRIORITY + 1);
        if priority > active {
            return Ok(());
        }
        if object.present_value() == BinaryLightingPv::Off {
            return Ok(());
        }
        if !object.blink_warn_enable {
            return Ok(());
        }
        if operation == BinaryLightingPv::WarnRelinquish {
            if !object.priority_array.is_active(priority) {
                return Ok(());
            }
            let next = object
                .priority_array
                .next_value_below(priority)
                .unwrap_or(object.relinquish_default);
            if next == BinaryLightingPv::On {
                return Ok(());
            }
        }

        object.egress_priority = priority;
        object.egress_timer_ms = 1000 * object.egress_time as u64;
        object.egress_action = match operation {
            BinaryLightingPv::Warn => EgressAction::TurnOn,
            BinaryLightingPv::WarnOff => EgressAction::TurnOff,
            _ => EgressAction::Relinquish,
        };

        // Warn at least once.
        if !object.out_of_service {
            if let Some(callback) = blink_callback {
                callback(instance);
            }
        }

        if object.egress_timer_ms == 0 {
            self.expire_egress(instance);
        }
        Ok(())
    }

    fn expire_egress(&mut self, instance: u32) {
        let (action, priority, old_value) = match self.objects.get_mut(instance) {
            Some(object) => {
                let action = object.egress_action;
                object.egress_action = EgressAction::None;
                object.egress_timer_ms = 0;
                (action, object.egress_priority, object.present_value())
            }
            None => return,
        };

        let object = self.objects.get_mut(instance).unwrap();
        match action {
            EgressAction::TurnOn => {
                let _ = object
                    .priority_array
                    .set(priority, Some(BinaryLightingPv::On));
            }
            EgressAction::TurnOff => {
                let _ = object
                    .priority_array
                    .set(priority, Some(BinaryLightingPv::Off));
            }
            EgressAction::Relinquish => {
                let _ = object.priority_array.set(priority, None);
            }
            EgressAction::None => return,
        }
        self.commit(instance, old_value);
    }

    fn default_name(&self, instance: u32) -> CharacterString {
        CharacterString::new(&format!("BINARY LIGHTING OUTPUT {}", instance))
    }
}

impl ObjectHandler for BinaryLightingOutputHandler {
    fn object_type(&self) -> ObjectType {
        ObjectType::BinaryLightingOutput
    }

    fn property_lists(&self) -> PropertyLists {
        PropertyLists {
            required: BINARY_LIGHTING_PROPERTIES_REQUIRED,
            optional: BINARY_LIGHTING_PROPERTIES_OPTIONAL,
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
        self.objects.insert(instance, BinaryLightingOutput::new())?;
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
                crate::encoding::encode_application_enumerated(
                    buffer,
                    object.present_value() as u32,
                )
                .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::FeedbackValue => {
                crate::encoding::encode_application_enumerated(
                    buffer,
                    object.feedback_value as u32,
                )
                .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::BlinkWarnEnable => {
                crate::encoding::encode_application_boolean(buffer, object.blink_warn_enable)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::EgressTime => {
                crate::encoding::encode_application_unsigned(buffer, object.egress_time as u64)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::EgressActive => {
                crate::encoding::encode_application_boolean(buffer, object.egress_active())
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::PriorityArray => {
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
            PropertyIdentifier::RelinquishDefault => {
                crate::encoding::encode_application_enumerated(
                    buffer,
                    object.relinquish_default as u32,
                )
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
                if priority == crate::BACNET_RESERVED_PRIORITY {
                    return Err(PropertyError::write_access_denied().into());
                }
                match request.value {
                    ApplicationDataValue::Null => {
                        self.relinquish(request.object_instance, priority)?;
                        Ok(())
                    }
                    ApplicationDataValue::Enumerated(raw) => {
                        let value = BinaryLightingPv::try_from(raw)?;
                        match value {
                            BinaryLightingPv::Off | BinaryLightingPv::On => {
                                self.apply_on_off(request.object_instance, value, priority)?;
                            }
                            BinaryLightingPv::Warn
                            | BinaryLightingPv::WarnOff
                            | BinaryLightingPv::WarnRelinquish => {
                                self.warn(request.object_instance, value, priority)?;
                            }
                            BinaryLightingPv::Stop => {
                                let object =
                                    self.objects.get_mut(request.object_instance).unwrap();
                                object.egress_action = EgressAction::None;
                                object.egress_timer_ms = 0;
                            }
                        }
                        Ok(())
                    }
                    _ => Err(PropertyError::invalid_data_type().into()),
                }
            }
            PropertyIdentifier::BlinkWarnEnable => {
                let object = self.objects.get_mut(request.object_instance).unwrap();
                match request.value {
                    ApplicationDataValue::Boolean(value) => {
                        object.blink_warn_enable = value;
                        Ok(())
                    }
                    _ => Err(PropertyError::invalid_data_type().into()),
                }
            }
            PropertyIdentifier::EgressTime => {
                let object = self.objects.get_mut(request.object_instance).unwrap();
                match request.value {
                    ApplicationDataValue::Unsigned(value) => {
                        object.egress_time = value as u32;
                        Ok(())
                    }
                    _ => Err(PropertyError::invalid_data_type().into()),
                }
            }
            PropertyIdentifier::RelinquishDefault => {
                let object = self.objects.get_mut(request.object_instance).unwrap();
                match request.value {
                    ApplicationDataValue::Enumerated(raw) => {
                        let value = BinaryLightingPv::try_from(raw)?;
                        if !matches!(value, BinaryLightingPv::Off | BinaryLightingPv::On) {
                            return Err(PropertyError::value_out_of_range().into());
                        }
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
        Some(cov_value_list(
            ApplicationDataValue::Enumerated(object.present_value() as u32),
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

    /// Advance egress timers; fires the blink callback each pass while
    /// egress runs and applies the terminal action on expiry.
    fn timer(&mut self, milliseconds: u64) {
        let blink_callback = self.blink_callback;
        let mut expired = Vec::new();
        for (instance, object) in self.objects.iter_mut() {
            if object.egress_action == EgressAction::None {
                continue;
            }
            if object.egress_timer_ms > milliseconds {
                object.egress_timer_ms -= milliseconds;
                if !object.out_of_service {
                    if let Some(callback) = blink_callback {
                        callback(instance);
                    }
                }
            } else {
                expired.push(instance);
            }
        }
        for instance in expired {
            self.expire_egress(instance);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BACNET_ARRAY_ALL;
    use std::sync::atomic::{AtomicU32, Ordering};

    static BLINKS: AtomicU32 = AtomicU32::new(0);

    fn blink(_instance: u32) {
        BLINKS.fetch_add(1, Ordering::SeqCst);
    }

    fn write_pv(value: ApplicationDataValue, priority: u8) -> WritePropertyData {
        WritePropertyData {
            object_instance: 1,
            property: PropertyIdentifier::PresentValue,
            array_index: BACNET_ARRAY_ALL,
            value,
            priority,
        }
    }

    fn lighting(blink_warn: bool, egress_seconds: u32) -> BinaryLightingOutputHandler {
        let mut handler = BinaryLightingOutputHandler::new();
        handler.create(1).unwrap();
        handler.configure(1, blink_warn, egress_seconds, BinaryLightingPv::Off);
        handler
    }

    #[test]
    fn test_on_off_commands() {
        let mut handler = lighting(false, 0);
        handler
            .write_property(&write_pv(ApplicationDataValue::Enumerated(1), 8))
            .unwrap();
        assert_eq!(handler.present_value(1), Some(BinaryLightingPv::On));
        assert_eq!(handler.feedback_value(1), Some(BinaryLightingPv::On));

        handler
            .write_property(&write_pv(ApplicationDataValue::Enumerated(0), 8))
            .unwrap();
        assert_eq!(handler.present_value(1), Some(BinaryLightingPv::Off));
    }

    #[test]
    fn test_reserved_priority_rejected() {
        let mut handler = lighting(false, 0);
        assert!(handler
            .write_property(&write_pv(ApplicationDataValue::Enumerated(1), 6))
            .is_err());
        assert!(handler
            .write_property(&write_pv(ApplicationDataValue::Null, 6))
            .is_err());
    }

    #[test]
    fn test_warn_suppressed_without_enable() {
        let mut handler = lighting(false, 10);
        handler
            .write_property(&write_pv(ApplicationDataValue::Enumerated(1), 8))
            .unwrap();
        // WARN_OFF suppressed: blink-warn-enable is false.
        handler
            .write_property(&write_pv(ApplicationDataValue::Enumerated(3), 8))
            .unwrap();
        assert!(!handler.egress_active(1));
        assert_eq!(handler.present_value(1), Some(BinaryLightingPv::On));
    }

    #[test]
    fn test_warn_suppressed_when_off() {
        let mut handler = lighting(true, 10);
        handler
            .write_property(&write_pv(ApplicationDataValue::Enumerated(0), 8))
            .unwrap();
        handler
            .write_property(&write_pv(ApplicationDataValue::Enumerated(3), 8))
            .unwrap();
        assert!(!handler.egress_active(1));
    }

    #[test]
    fn test_warn_suppressed_below_highest_priority() {
        let mut handler = lighting(true, 10);
        handler
            .write_property(&write_pv(ApplicationDataValue::Enumerated(1), 4))
            .unwrap();
        // Priority 10 is not the highest active priority.
        handler
            .write_property(&write_pv(ApplicationDataValue::Enumerated(3), 10))
            .unwrap();
        assert!(!handler.egress_active(1));
    }

    #[test]
    fn test_warn_off_runs_egress_then_turns_off() {
        let mut handler = lighting(true, 10);
        handler.set_blink_warn_callback(blink);
        BLINKS.store(0, Ordering::SeqCst);

        handler
            .write_property(&write_pv(ApplicationDataValue::Enumerated(1), 8))
            .unwrap();
        handler
            .write_property(&write_pv(ApplicationDataValue::Enumerated(3), 8))
            .unwrap();
        assert!(handler.egress_active(1));
        // Accepted warn fires the callback at least once.
        assert!(BLINKS.load(Ordering::SeqCst) >= 1);
        assert_eq!(handler.present_value(1), Some(BinaryLightingPv::On));

        // 9 seconds of ticks: still warning.
        for _ in 0..9 {
            handler.timer(1000);
        }
        assert!(handler.egress_active(1));
        assert!(BLINKS.load(Ordering::SeqCst) >= 9);

        // Expiry applies OFF at the slot.
        handler.timer(1000);
        assert!(!handler.egress_active(1));
        assert_eq!(handler.present_value(1), Some(BinaryLightingPv::Off));
    }

    #[test]
    fn test_warn_relinquish_requires_slot_value() {
        let mut handler = lighting(true, 5);
        handler
            .write_property(&write_pv(ApplicationDataValue::Enumerated(1), 4))
            .unwrap();
        // Slot 8 holds nothing; WARN_RELINQUISH there is suppressed.
        handler
            .write_property(&write_pv(ApplicationDataValue::Enumerated(4), 8))
            .unwrap();
        assert!(!handler.egress_active(1));
    }

    #[test]
    fn test_warn_relinquish_suppressed_when_next_is_on() {
        let mut handler = lighting(true, 5);
        handler
            .write_property(&write_pv(ApplicationDataValue::Enumerated(1), 4))
            .unwrap();
        handler
            .write_property(&write_pv(ApplicationDataValue::Enumerated(1), 10))
            .unwrap();
        // Relinquishing slot 4 would hand over to ON at slot 10: suppressed.
        handler
            .write_property(&write_pv(ApplicationDataValue::Enumerated(4), 4))
            .unwrap();
        assert!(!handler.egress_active(1));
    }

    #[test]
    fn test_warn_relinquish_relinquishes_after_egress() {
        let mut handler = lighting(true, 2);
        handler
            .write_property(&write_pv(ApplicationDataValue::Enumerated(1), 4))
            .unwrap();
        handler
            .write_property(&write_pv(ApplicationDataValue::Enumerated(4), 4))
            .unwrap();
        assert!(handler.egress_active(1));

        handler.timer(2000);
        assert!(!handler.egress_active(1));
        // All slots relinquished; falls back to relinquish-default.
        assert_eq!(handler.present_value(1), Some(BinaryLightingPv::Off));
        assert_eq!(handler.current_command_priority(1), None);
    }

    #[test]
    fn test_stop_halts_egress() {
        let mut handler = lighting(true, 10);
        handler
            .write_property(&write_pv(ApplicationDataValue::Enumerated(1), 8))
            .unwrap();
        handler
            .write_property(&write_pv(ApplicationDataValue::Enumerated(3), 8))
            .unwrap();
        assert!(handler.egress_active(1));

        handler
            .write_property(&write_pv(ApplicationDataValue::Enumerated(5), 8))
            .unwrap();
        assert!(!handler.egress_active(1));
        // The slot keeps its ON value; nothing was applied.
        assert_eq!(handler.present_value(1), Some(BinaryLightingPv::On));
    }

    impl BinaryLightingOutputHandler {
        fn current_command_priority(&self, instance: u32) -> Option<u8> {
            self.objects
                .get(instance)
                .and_then(|object| object.priority_array.active_priority())
        }
    }
}
