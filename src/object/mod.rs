//! BACnet Object Model
//!
//! Objects are the fundamental modeling concept in BACnet: named, typed,
//! addressable state exposed to remote peers. Every object carries an
//! identifier (type + instance), a name that is unique device-wide, status
//! flags, an event state and a type-specific property set.
//!
//! This module defines the object/property vocabulary (types, property
//! identifiers, status flags), the dispatch data structures handed between
//! the service handlers and object implementations, the [`ObjectHandler`]
//! vtable every object type implements, and the shared building blocks for
//! commandable objects: the 16-slot [`PriorityArray`] and change-of-value
//! tracking.
//!
//! # Example
//!
//! ```no_run
//! use bacnet_core::object::*;
//!
//! let obj_id = ObjectIdentifier::new(ObjectType::AnalogInput, 1);
//! assert!(obj_id.is_valid());
//! ```

use core::fmt;

use crate::encoding::constructed::PropertyValue;
use crate::encoding::value::ApplicationDataValue;
use crate::encoding::{BitString, CharacterString, Result as EncodingResult};
use crate::generate_custom_enum;
use crate::service::{AbortReason, ErrorClass, ErrorCode, RejectReason};

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, vec::Vec};

pub mod analog;
pub mod binary;
pub mod calendar;
pub mod command;
pub mod database;
pub mod device;
pub mod lighting;
pub mod multistate;
pub mod notification;
pub mod schedule;

pub use database::ObjectDatabase;
pub use device::DeviceObject;

generate_custom_enum! {
    /// BACnet object types. The proprietary range starts at 128; the 10-bit
    /// ceiling is 1023.
    ObjectType {
        AnalogInput = 0,
        AnalogOutput = 1,
        AnalogValue = 2,
        BinaryInput = 3,
        BinaryOutput = 4,
        BinaryValue = 5,
        Calendar = 6,
        Command = 7,
        Device = 8,
        EventEnrollment = 9,
        File = 10,
        Group = 11,
        Loop = 12,
        MultiStateInput = 13,
        MultiStateOutput = 14,
        NotificationClass = 15,
        Program = 16,
        Schedule = 17,
        Averaging = 18,
        MultiStateValue = 19,
        TrendLog = 20,
        Timer = 31,
        Channel = 53,
        BinaryLightingOutput = 54,
        LightingOutput = 55,
        Color = 57,
        ColorTemperature = 58,
    },
    u16,
    128..=1023
}

generate_custom_enum! {
    /// BACnet property identifiers used by this stack. The proprietary range
    /// starts at 512.
    PropertyIdentifier {
        AckRequired = 1,
        Action = 2,
        ActionText = 3,
        ActiveText = 4,
        AllWritesSuccessful = 9,
        ApduTimeout = 11,
        ApplicationSoftwareVersion = 12,
        ChangeOfStateCount = 15,
        NotificationClass = 17,
        CovIncrement = 22,
        DateList = 23,
        Deadband = 25,
        Description = 28,
        DeviceAddressBinding = 30,
        DeviceType = 31,
        EffectivePeriod = 32,
        EventState = 36,
        ExceptionSchedule = 38,
        FeedbackValue = 40,
        FirmwareRevision = 44,
        InactiveText = 46,
        InProcess = 47,
        ListOfObjectPropertyReferences = 54,
        LocalDate = 56,
        LocalTime = 57,
        MaxApduLengthAccepted = 62,
        MaxPresValue = 65,
        MinPresValue = 69,
        ModelName = 70,
        NumberOfApduRetries = 73,
        NumberOfStates = 74,
        ObjectIdentifier = 75,
        ObjectList = 76,
        ObjectName = 77,
        ObjectType = 79,
        OutOfService = 81,
        Polarity = 84,
        PresentValue = 85,
        Priority = 86,
        PriorityArray = 87,
        PriorityForWriting = 88,
        ProcessIdentifier = 89,
        ProtocolObjectTypesSupported = 96,
        ProtocolServicesSupported = 97,
        ProtocolVersion = 98,
        RecipientList = 102,
        Reliability = 103,
        RelinquishDefault = 104,
        SegmentationSupported = 107,
        StateText = 110,
        StatusFlags = 111,
        SystemStatus = 112,
        Units = 117,
        VendorIdentifier = 120,
        VendorName = 121,
        WeeklySchedule = 123,
        ProtocolRevision = 139,
        DatabaseRevision = 155,
        ScheduleDefault = 174,
        PropertyList = 371,
        BlinkWarnEnable = 373,
        EgressTime = 377,
        EgressActive = 386,
        CurrentCommandPriority = 431,
    },
    u32,
    512..=4_194_303
}

bitflags::bitflags! {
    /// The four standard status flags every object reports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StatusFlags: u8 {
        const IN_ALARM = 0x01;
        const FAULT = 0x02;
        const OVERRIDDEN = 0x04;
        const OUT_OF_SERVICE = 0x08;
    }
}

impl StatusFlags {
    /// The 4-bit wire form, bit 0 = in-alarm.
    pub fn to_bit_string(self) -> BitString {
        BitString::from_bits(&[
            self.contains(StatusFlags::IN_ALARM),
            self.contains(StatusFlags::FAULT),
            self.contains(StatusFlags::OVERRIDDEN),
            self.contains(StatusFlags::OUT_OF_SERVICE),
        ])
    }
}

/// Event state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum EventState {
    Normal = 0,
    Fault = 1,
    OffNormal = 2,
    HighLimit = 3,
    LowLimit = 4,
    LifeSafetyAlarm = 5,
}

/// Reliability enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Reliability {
    NoFaultDetected = 0,
    NoSensor = 1,
    OverRange = 2,
    UnderRange = 3,
    OpenLoop = 4,
    ShortedLoop = 5,
    NoOutput = 6,
    UnreliableOther = 7,
    ProcessError = 8,
    MultiStateFault = 9,
    ConfigurationError = 10,
}

generate_custom_enum! {
    /// Engineering units (subset; proprietary range starts at 256).
    EngineeringUnits {
        Amperes = 2,
        Ohms = 4,
        Volts = 5,
        Lumens = 36,
        Luxes = 37,
        Watts = 47,
        Kilowatts = 48,
        Pascals = 53,
        Kilopascals = 54,
        DegreesCelsius = 62,
        DegreesKelvin = 63,
        DegreesFahrenheit = 64,
        NoUnits = 95,
        PartsPerMillion = 96,
        Percent = 98,
        Millivolts = 124,
    },
    u32,
    256..=65_535
}

/// Segmentation support enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Segmentation {
    Both = 0,
    Transmit = 1,
    Receive = 2,
    NoSegmentation = 3,
}

impl TryFrom<u32> for Segmentation {
    type Error = crate::encoding::EncodingError;

    fn try_from(value: u32) -> core::result::Result<Self, crate::encoding::EncodingError> {
        match value {
            0 => Ok(Segmentation::Both),
            1 => Ok(Segmentation::Transmit),
            2 => Ok(Segmentation::Receive),
            3 => Ok(Segmentation::NoSegmentation),
            _ => Err(crate::encoding::EncodingError::ValueOutOfRange),
        }
    }
}

/// Binary present-value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum BinaryPv {
    Inactive = 0,
    Active = 1,
}

/// Binary input/output polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Polarity {
    Normal = 0,
    Reverse = 1,
}

/// Binary lighting present-value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum BinaryLightingPv {
    Off = 0,
    On = 1,
    Warn = 2,
    WarnOff = 3,
    WarnRelinquish = 4,
    Stop = 5,
}

impl TryFrom<u32> for BinaryLightingPv {
    type Error = PropertyError;

    fn try_from(value: u32) -> core::result::Result<Self, PropertyError> {
        match value {
            0 => Ok(BinaryLightingPv::Off),
            1 => Ok(BinaryLightingPv::On),
            2 => Ok(BinaryLightingPv::Warn),
            3 => Ok(BinaryLightingPv::WarnOff),
            4 => Ok(BinaryLightingPv::WarnRelinquish),
            5 => Ok(BinaryLightingPv::Stop),
            _ => Err(PropertyError::value_out_of_range()),
        }
    }
}

/// Object identifier (type + instance number)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectIdentifier {
    pub object_type: ObjectType,
    pub instance: u32,
}

impl ObjectIdentifier {
    pub fn new(object_type: ObjectType, instance: u32) -> Self {
        Self {
            object_type,
            instance,
        }
    }

    pub fn from_parts(object_type: u16, instance: u32) -> Self {
        Self {
            object_type: ObjectType::from(object_type),
            instance,
        }
    }

    /// Check if instance number is valid (0..=4194302; 4194303 is the wildcard)
    pub fn is_valid(&self) -> bool {
        self.instance < crate::BACNET_MAX_INSTANCE
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.object_type, self.instance)
    }
}

// ---------------------------------------------------------------------------
// Error bands carried from object accessors to the wire
// ---------------------------------------------------------------------------

/// Semantic failure from a property accessor; lifted verbatim into an
/// Error PDU by the service handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyError {
    pub class: ErrorClass,
    pub code: ErrorCode,
}

impl PropertyError {
    pub fn new(class: ErrorClass, code: ErrorCode) -> Self {
        Self { class, code }
    }

    pub fn unknown_object() -> Self {
        Self::new(ErrorClass::Object, ErrorCode::UnknownObject)
    }

    pub fn unknown_property() -> Self {
        Self::new(ErrorClass::Property, ErrorCode::UnknownProperty)
    }

    pub fn write_access_denied() -> Self {
        Self::new(ErrorClass::Property, ErrorCode::WriteAccessDenied)
    }

    pub fn value_out_of_range() -> Self {
        Self::new(ErrorClass::Property, ErrorCode::ValueOutOfRange)
    }

    pub fn invalid_array_index() -> Self {
        Self::new(ErrorClass::Property, ErrorCode::InvalidArrayIndex)
    }

    pub fn invalid_data_type() -> Self {
        Self::new(ErrorClass::Property, ErrorCode::InvalidDataType)
    }

    pub fn not_an_array() -> Self {
        Self::new(ErrorClass::Property, ErrorCode::PropertyIsNotAnArray)
    }

    pub fn not_a_list() -> Self {
        Self::new(ErrorClass::Property, ErrorCode::PropertyIsNotAList)
    }
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error class {} code {}", self.class, self.code)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PropertyError {}

/// The three failure bands of spec'd BACnet error handling: semantic errors
/// become Error PDUs, structural problems Abort PDUs, syntax problems
/// Reject PDUs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    Error(PropertyError),
    Abort(AbortReason),
    Reject(RejectReason),
}

impl From<PropertyError> for AccessError {
    fn from(error: PropertyError) -> Self {
        AccessError::Error(error)
    }
}

pub type AccessResult<T> = core::result::Result<T, AccessError>;

// ---------------------------------------------------------------------------
// Dispatch data structures
// ---------------------------------------------------------------------------

/// A ReadProperty request as seen by an object implementation.
#[derive(Debug, Clone, Copy)]
pub struct ReadPropertyData {
    pub object_instance: u32,
    pub property: PropertyIdentifier,
    /// `BACNET_ARRAY_ALL` when no index was supplied.
    pub array_index: u32,
}

/// A WriteProperty request as seen by an object implementation.
#[derive(Debug, Clone)]
pub struct WritePropertyData {
    pub object_instance: u32,
    pub property: PropertyIdentifier,
    /// `BACNET_ARRAY_ALL` when no index was supplied.
    pub array_index: u32,
    pub value: ApplicationDataValue,
    /// Write priority 1..=16; 0 when the request carried none.
    pub priority: u8,
}

impl WritePropertyData {
    /// The priority slot this write lands in; an absent priority writes at
    /// the lowest slot.
    pub fn effective_priority(&self) -> u8 {
        if self.priority == 0 {
            crate::BACNET_MAX_PRIORITY
        } else {
            self.priority
        }
    }
}

/// An AddListElement/RemoveListElement request as seen by an object.
#[derive(Debug, Clone)]
pub struct ListElementData {
    pub object_instance: u32,
    pub property: PropertyIdentifier,
    pub array_index: u32,
    /// Raw application-tagged element payload from the `[3]` envelope.
    pub elements: Vec<u8>,
}

/// Failure of a list-element operation, carrying the 1-based index of the
/// first element that could not be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListElementError {
    pub error: PropertyError,
    pub first_failed_element: u32,
}

impl ListElementError {
    pub fn new(error: PropertyError, first_failed_element: u32) -> Self {
        Self {
            error,
            first_failed_element,
        }
    }
}

/// The required/optional/proprietary property-id sets of an object type.
/// Their union is the membership test for "known property".
#[derive(Debug, Clone, Copy)]
pub struct PropertyLists {
    pub required: &'static [PropertyIdentifier],
    pub optional: &'static [PropertyIdentifier],
    pub proprietary: &'static [PropertyIdentifier],
}

impl PropertyLists {
    pub fn contains(&self, property: PropertyIdentifier) -> bool {
        self.required.contains(&property)
            || self.optional.contains(&property)
            || self.proprietary.contains(&property)
    }

    /// All members except the three that never appear in property-list.
    pub fn listable(&self) -> impl Iterator<Item = PropertyIdentifier> + '_ {
        self.required
            .iter()
            .chain(self.optional.iter())
            .chain(self.proprietary.iter())
            .copied()
            .filter(|property| {
                !matches!(
                    property,
                    PropertyIdentifier::ObjectIdentifier
                        | PropertyIdentifier::ObjectName
                        | PropertyIdentifier::ObjectType
                        | PropertyIdentifier::PropertyList
                )
            })
    }
}

// ---------------------------------------------------------------------------
// The per-object-type vtable
// ---------------------------------------------------------------------------

/// The callback set every object type registers with the dispatch layer.
///
/// One handler owns every instance of its type, keyed by instance number in
/// insertion order.
pub trait ObjectHandler {
    fn object_type(&self) -> ObjectType;

    fn property_lists(&self) -> PropertyLists;

    fn count(&self) -> usize;

    fn valid_instance(&self, instance: u32) -> bool;

    fn index_to_instance(&self, index: usize) -> Option<u32>;

    fn instance_to_index(&self, instance: u32) -> Option<usize>;

    fn object_name(&self, instance: u32) -> Option<CharacterString>;

    /// Rename an instance; uniqueness is the database's concern. False when
    /// the instance does not exist.
    fn set_object_name(&mut self, instance: u32, name: CharacterString) -> bool {
        let _ = (instance, name);
        false
    }

    /// Create an instance; `BACNET_MAX_INSTANCE` asks for the next free one.
    fn create(&mut self, instance: u32) -> core::result::Result<u32, PropertyError>;

    fn delete(&mut self, instance: u32) -> bool;

    /// Encode the requested property into `buffer`, returning bytes written.
    fn read_property(
        &self,
        request: &ReadPropertyData,
        buffer: &mut Vec<u8>,
    ) -> AccessResult<usize>;

    fn write_property(&mut self, request: &WritePropertyData) -> AccessResult<()>;

    /// The canonical COV value list: present-value then status-flags.
    fn value_list(&self, instance: u32) -> Option<Vec<PropertyValue>> {
        let _ = instance;
        None
    }

    fn change_of_value(&self, instance: u32) -> bool {
        let _ = instance;
        false
    }

    fn change_of_value_clear(&mut self, instance: u32) {
        let _ = instance;
    }

    fn add_list_element(
        &mut self,
        request: &ListElementData,
    ) -> core::result::Result<(), ListElementError> {
        let _ = request;
        Err(ListElementError::new(
            PropertyError::new(ErrorClass::Property, ErrorCode::OptionalFunctionalityNotSupported),
            0,
        ))
    }

    fn remove_list_element(
        &mut self,
        request: &ListElementData,
    ) -> core::result::Result<(), ListElementError> {
        let _ = request;
        Err(ListElementError::new(
            PropertyError::new(ErrorClass::Property, ErrorCode::OptionalFunctionalityNotSupported),
            0,
        ))
    }

    /// Advance object-internal timers (egress, schedules) by `milliseconds`.
    fn timer(&mut self, milliseconds: u64) {
        let _ = milliseconds;
    }

    /// Deferred whole-device work recorded during a write: `(instance,
    /// action)` selections awaiting execution. Only the Command object uses
    /// this channel.
    fn pending_actions(&mut self) -> Vec<(u32, u32)> {
        Vec::new()
    }

    /// The action commands behind one selection.
    fn action_commands(
        &self,
        instance: u32,
        action: u32,
    ) -> Option<Vec<crate::encoding::constructed::ActionCommand>> {
        let _ = (instance, action);
        None
    }

    /// Record per-entry outcomes of an executed action list.
    fn complete_actions(&mut self, instance: u32, results: &[(usize, bool)], all_successful: bool) {
        let _ = (instance, results, all_successful);
    }
}

// ---------------------------------------------------------------------------
// Instance registry
// ---------------------------------------------------------------------------

/// Insertion-ordered instance registry used inside each object handler.
#[derive(Debug, Clone)]
pub struct InstanceList<T> {
    entries: Vec<(u32, T)>,
}

impl<T> Default for InstanceList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> InstanceList<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, instance: u32) -> bool {
        self.entries.iter().any(|(key, _)| *key == instance)
    }

    pub fn get(&self, instance: u32) -> Option<&T> {
        self.entries
            .iter()
            .find(|(key, _)| *key == instance)
            .map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, instance: u32) -> Option<&mut T> {
        self.entries
            .iter_mut()
            .find(|(key, _)| *key == instance)
            .map(|(_, value)| value)
    }

    /// Insert a new instance; fails when the key is already present.
    pub fn insert(&mut self, instance: u32, value: T) -> core::result::Result<(), PropertyError> {
        if self.contains(instance) {
            return Err(PropertyError::new(
                ErrorClass::Object,
                ErrorCode::DuplicateObjectId,
            ));
        }
        self.entries.push((instance, value));
        Ok(())
    }

    pub fn remove(&mut self, instance: u32) -> Option<T> {
        let index = self.entries.iter().position(|(key, _)| *key == instance)?;
        Some(self.entries.remove(index).1)
    }

    pub fn index_to_instance(&self, index: usize) -> Option<u32> {
        self.entries.get(index).map(|(key, _)| *key)
    }

    pub fn instance_to_index(&self, instance: u32) -> Option<usize> {
        self.entries.iter().position(|(key, _)| *key == instance)
    }

    /// Lowest unused instance number >= 1.
    pub fn next_free_instance(&self) -> u32 {
        let mut candidate = 1;
        while self.contains(candidate) {
            candidate += 1;
        }
        candidate
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.entries.iter().map(|(key, value)| (*key, value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut T)> {
        self.entries.iter_mut().map(|(key, value)| (*key, value))
    }
}

// ---------------------------------------------------------------------------
// Commandable-object building blocks
// ---------------------------------------------------------------------------

/// The 16-slot priority array arbitrating a commandable present-value.
///
/// Slot 6 is reserved for the Minimum On/Off algorithm and rejects writes
/// and relinquishes alike.
#[derive(Debug, Clone, Copy)]
pub struct PriorityArray<T: Copy> {
    slots: [Option<T>; crate::BACNET_MAX_PRIORITY as usize],
}

impl<T: Copy> Default for PriorityArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> PriorityArray<T> {
    pub fn new() -> Self {
        Self {
            slots: [None; crate::BACNET_MAX_PRIORITY as usize],
        }
    }

    /// Write or relinquish (None) at a priority 1..=16.
    pub fn set(
        &mut self,
        priority: u8,
        value: Option<T>,
    ) -> core::result::Result<(), PropertyError> {
        if priority == crate::BACNET_RESERVED_PRIORITY {
            return Err(PropertyError::write_access_denied());
        }
        if !crate::util::is_valid_priority(priority) {
            return Err(PropertyError::value_out_of_range());
        }
        self.slots[(priority - 1) as usize] = value;
        Ok(())
    }

    pub fn slot(&self, priority: u8) -> Option<T> {
        if crate::util::is_valid_priority(priority) {
            self.slots[(priority - 1) as usize]
        } else {
            None
        }
    }

    /// Derived value: the first occupied slot, lowest priority number wins.
    pub fn value(&self) -> Option<T> {
        self.slots.iter().find_map(|slot| *slot)
    }

    /// First occupied slot starting below `priority` (exclusive); used by
    /// relinquish handling to find what takes over.
    pub fn next_value_below(&self, priority: u8) -> Option<T> {
        self.slots
            .iter()
            .skip(priority as usize)
            .find_map(|slot| *slot)
    }

    /// 1..=16 of the first occupied slot, or None when all are relinquished.
    pub fn active_priority(&self) -> Option<u8> {
        self.slots
            .iter()
            .position(|slot| slot.is_some())
            .map(|index| index as u8 + 1)
    }

    pub fn is_active(&self, priority: u8) -> bool {
        self.slot(priority).is_some()
    }
}

/// Encode one BACnetARRAY property honoring the array-index semantics:
/// index 0 yields the length, `BACNET_ARRAY_ALL` every element, 1..=size one
/// element, anything else `invalid-array-index`.
pub fn encode_array_property<F>(
    buffer: &mut Vec<u8>,
    array_index: u32,
    size: u32,
    mut encode_element: F,
) -> AccessResult<usize>
where
    F: FnMut(u32, &mut Vec<u8>) -> EncodingResult<usize>,
{
    let start = buffer.len();
    match array_index {
        0 => {
            crate::encoding::encode_application_unsigned(buffer, size as u64)
                .map_err(|_| AccessError::Abort(AbortReason::Other))?;
        }
        crate::BACNET_ARRAY_ALL => {
            for index in 1..=size {
                encode_element(index, buffer)
                    .map_err(|_| AccessError::Abort(AbortReason::Other))?;
            }
        }
        index if index <= size => {
            encode_element(index, buffer).map_err(|_| AccessError::Abort(AbortReason::Other))?;
        }
        _ => return Err(PropertyError::invalid_array_index().into()),
    }
    Ok(buffer.len() - start)
}

/// The canonical 2-entry COV value list: present-value then status-flags,
/// both with no array index and no priority.
pub fn cov_value_list(
    present_value: ApplicationDataValue,
    status_flags: StatusFlags,
) -> Vec<PropertyValue> {
    let mut list = Vec::with_capacity(2);
    list.push(PropertyValue::new(
        PropertyIdentifier::PresentValue,
        present_value,
    ));
    list.push(PropertyValue::new(
        PropertyIdentifier::StatusFlags,
        ApplicationDataValue::BitString(status_flags.to_bit_string()),
    ));
    list
}

/// Change-of-value detector for analog values: asserts once the distance
/// from the last reported value reaches the increment.
#[derive(Debug, Clone, Copy)]
pub struct CovTracker {
    pub increment: f32,
    prior_value: f32,
    changed: bool,
}

impl CovTracker {
    pub fn new(increment: f32) -> Self {
        Self {
            increment,
            prior_value: 0.0,
            changed: false,
        }
    }

    /// Runs after every present-value commit.
    pub fn track(&mut self, new_value: f32) {
        if (new_value - self.prior_value).abs() >= self.increment {
            self.prior_value = new_value;
            self.changed = true;
        }
    }

    /// Out-of-service and fault transitions always assert the flag.
    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn clear(&mut self) {
        self.changed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_type_open_enumeration() {
        assert_eq!(u16::from(ObjectType::AnalogInput), 0);
        assert_eq!(ObjectType::from(8u16), ObjectType::Device);
        assert!(matches!(ObjectType::from(300u16), ObjectType::Custom(_)));
        assert!(matches!(ObjectType::from(1100u16), ObjectType::Reserved(_)));
        // Unknown wire values survive a round-trip unmodified.
        assert_eq!(u16::from(ObjectType::from(300u16)), 300);
    }

    #[test]
    fn test_property_identifier_round_trip() {
        assert_eq!(u32::from(PropertyIdentifier::PresentValue), 85);
        assert_eq!(PropertyIdentifier::from(85u32), PropertyIdentifier::PresentValue);
        assert_eq!(u32::from(PropertyIdentifier::from(999u32)), 999);
    }

    #[test]
    fn test_status_flags_bit_string() {
        let flags = StatusFlags::FAULT | StatusFlags::OUT_OF_SERVICE;
        let bits = flags.to_bit_string();
        assert_eq!(bits.len(), 4);
        assert!(!bits.bit(0));
        assert!(bits.bit(1));
        assert!(!bits.bit(2));
        assert!(bits.bit(3));
    }

    #[test]
    fn test_priority_array_arbitration() {
        let mut array: PriorityArray<f32> = PriorityArray::new();
        assert_eq!(array.value(), None);
        assert_eq!(array.active_priority(), None);

        array.set(8, Some(25.0)).unwrap();
        array.set(12, Some(10.0)).unwrap();
        assert_eq!(array.value(), Some(25.0));
        assert_eq!(array.active_priority(), Some(8));

        // Lower priority number wins.
        array.set(3, Some(99.0)).unwrap();
        assert_eq!(array.value(), Some(99.0));
        assert_eq!(array.active_priority(), Some(3));

        array.set(3, None).unwrap();
        assert_eq!(array.value(), Some(25.0));

        array.set(8, None).unwrap();
        array.set(12, None).unwrap();
        assert_eq!(array.value(), None);
        assert_eq!(array.active_priority(), None);
    }

    #[test]
    fn test_priority_array_reserved_slot() {
        let mut array: PriorityArray<f32> = PriorityArray::new();
        let error = array.set(6, Some(1.0)).unwrap_err();
        assert_eq!(error, PropertyError::write_access_denied());
        assert!(array.set(0, Some(1.0)).is_err());
        assert!(array.set(17, Some(1.0)).is_err());
    }

    #[test]
    fn test_instance_list() {
        let mut list: InstanceList<&str> = InstanceList::new();
        list.insert(5, "five").unwrap();
        list.insert(1, "one").unwrap();
        assert!(list.insert(5, "again").is_err());

        assert_eq!(list.count(), 2);
        // Insertion order is preserved.
        assert_eq!(list.index_to_instance(0), Some(5));
        assert_eq!(list.index_to_instance(1), Some(1));
        assert_eq!(list.instance_to_index(1), Some(1));
        assert_eq!(list.next_free_instance(), 2);

        assert_eq!(list.remove(5), Some("five"));
        assert_eq!(list.index_to_instance(0), Some(1));
    }

    #[test]
    fn test_encode_array_property_semantics() {
        let encode_element = |index: u32, buffer: &mut Vec<u8>| {
            crate::encoding::encode_application_unsigned(buffer, index as u64 * 10)
        };

        // Index 0 yields the length.
        let mut buffer = Vec::new();
        encode_array_property(&mut buffer, 0, 3, encode_element).unwrap();
        let (length, _) = crate::encoding::decode_application_unsigned(&buffer).unwrap();
        assert_eq!(length, 3);

        // ALL concatenates each element.
        buffer.clear();
        encode_array_property(&mut buffer, crate::BACNET_ARRAY_ALL, 3, encode_element).unwrap();
        let values = crate::encoding::value::ApplicationDataValue::decode_list(&buffer).unwrap();
        assert_eq!(values.len(), 3);

        // One element.
        buffer.clear();
        encode_array_property(&mut buffer, 2, 3, encode_element).unwrap();
        let (value, _) = crate::encoding::decode_application_unsigned(&buffer).unwrap();
        assert_eq!(value, 20);

        // Out of range.
        buffer.clear();
        let error = encode_array_property(&mut buffer, 4, 3, encode_element).unwrap_err();
        assert_eq!(
            error,
            AccessError::Error(PropertyError::invalid_array_index())
        );
    }

    #[test]
    fn test_cov_tracker_threshold() {
        let mut tracker = CovTracker::new(1.0);
        tracker.track(0.5);
        assert!(!tracker.changed());
        tracker.track(1.0);
        assert!(tracker.changed());
        tracker.clear();
        // Prior advanced to 1.0; small moves stay quiet.
        tracker.track(1.5);
        assert!(!tracker.changed());
        tracker.track(2.5);
        assert!(tracker.changed());
    }

    #[test]
    fn test_cov_value_list_canonical_form() {
        let list = cov_value_list(ApplicationDataValue::Real(72.5), StatusFlags::empty());
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].property, PropertyIdentifier::PresentValue);
        assert_eq!(list[1].property, PropertyIdentifier::StatusFlags);
        assert!(list[0].array_index.is_none());
        assert!(list[0].priority.is_none());
    }
}
