//! BACnet Services
//!
//! Per-service request/ack codecs and the service-level vocabulary: service
//! choice numbers, reject and abort reasons, and the error class/code
//! enumerations carried by Error PDUs.
//!
//! Each confirmed service gets a request struct with `encode`/`decode`; acks
//! get their own structs. The handlers in [`crate::app`] translate between
//! these and the wire.

pub mod error;
pub mod list_element;
pub mod read;
pub mod whois;
pub mod write;

pub use error::{AbortPdu, ErrorPdu, RejectPdu};
pub use list_element::{ListElementErrorAck, ListElementRequest};
pub use read::{
    PropertyAccessOutcome, ReadAccessResult, ReadPropertyAck, ReadPropertyMultipleAck,
    ReadPropertyMultipleRequest, ReadPropertyRequest,
};
pub use whois::{IAmRequest, WhoIsRequest};
pub use write::WritePropertyRequest;

use crate::encoding::EncodingError;
use crate::generate_custom_enum;

/// Confirmed service choices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConfirmedServiceChoice {
    AcknowledgeAlarm = 0,
    ConfirmedCovNotification = 1,
    ConfirmedEventNotification = 2,
    GetAlarmSummary = 3,
    GetEnrollmentSummary = 4,
    SubscribeCov = 5,
    AtomicReadFile = 6,
    AtomicWriteFile = 7,
    AddListElement = 8,
    RemoveListElement = 9,
    CreateObject = 10,
    DeleteObject = 11,
    ReadProperty = 12,
    ReadPropertyConditional = 13,
    ReadPropertyMultiple = 14,
    WriteProperty = 15,
    WritePropertyMultiple = 16,
    DeviceCommunicationControl = 17,
    ConfirmedPrivateTransfer = 18,
    ConfirmedTextMessage = 19,
    ReinitializeDevice = 20,
    VtOpen = 21,
    VtClose = 22,
    VtData = 23,
    Authenticate = 24,
    RequestKey = 25,
    ReadRange = 26,
    LifeSafetyOperation = 27,
    SubscribeCovProperty = 28,
    GetEventInformation = 29,
}

impl TryFrom<u8> for ConfirmedServiceChoice {
    type Error = EncodingError;

    fn try_from(value: u8) -> Result<Self, EncodingError> {
        match value {
            0 => Ok(ConfirmedServiceChoice::AcknowledgeAlarm),
            1 => Ok(ConfirmedServiceChoice::ConfirmedCovNotification),
            2 => Ok(ConfirmedServiceChoice::ConfirmedEventNotification),
            3 => Ok(ConfirmedServiceChoice::GetAlarmSummary),
            4 => Ok(ConfirmedServiceChoice::GetEnrollmentSummary),
            5 => Ok(ConfirmedServiceChoice::SubscribeCov),
            6 => Ok(ConfirmedServiceChoice::AtomicReadFile),
            7 => Ok(ConfirmedServiceChoice::AtomicWriteFile),
            8 => Ok(ConfirmedServiceChoice::AddListElement),
            9 => Ok(ConfirmedServiceChoice::RemoveListElement),
            10 => Ok(ConfirmedServiceChoice::CreateObject),
            11 => Ok(ConfirmedServiceChoice::DeleteObject),
            12 => Ok(ConfirmedServiceChoice::ReadProperty),
            13 => Ok(ConfirmedServiceChoice::ReadPropertyConditional),
            14 => Ok(ConfirmedServiceChoice::ReadPropertyMultiple),
            15 => Ok(ConfirmedServiceChoice::WriteProperty),
            16 => Ok(ConfirmedServiceChoice::WritePropertyMultiple),
            17 => Ok(ConfirmedServiceChoice::DeviceCommunicationControl),
            18 => Ok(ConfirmedServiceChoice::ConfirmedPrivateTransfer),
            19 => Ok(ConfirmedServiceChoice::ConfirmedTextMessage),
            20 => Ok(ConfirmedServiceChoice::ReinitializeDevice),
            21 => Ok(ConfirmedServiceChoice::VtOpen),
            22 => Ok(ConfirmedServiceChoice::VtClose),
            23 => Ok(ConfirmedServiceChoice::VtData),
            24 => Ok(ConfirmedServiceChoice::Authenticate),
            25 => Ok(ConfirmedServiceChoice::RequestKey),
            26 => Ok(ConfirmedServiceChoice::ReadRange),
            27 => Ok(ConfirmedServiceChoice::LifeSafetyOperation),
            28 => Ok(ConfirmedServiceChoice::SubscribeCovProperty),
            29 => Ok(ConfirmedServiceChoice::GetEventInformation),
            _ => Err(EncodingError::ValueOutOfRange),
        }
    }
}

impl ConfirmedServiceChoice {
    /// Services whose Error PDU uses the constructed ("extended") error
    /// production instead of the bare class/code pair.
    pub fn has_constructed_error(self) -> bool {
        matches!(
            self,
            ConfirmedServiceChoice::AddListElement
                | ConfirmedServiceChoice::RemoveListElement
                | ConfirmedServiceChoice::CreateObject
                | ConfirmedServiceChoice::WritePropertyMultiple
                | ConfirmedServiceChoice::VtData
                | ConfirmedServiceChoice::ConfirmedPrivateTransfer
                | ConfirmedServiceChoice::RequestKey
        )
    }
}

/// Unconfirmed service choices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum UnconfirmedServiceChoice {
    IAm = 0,
    IHave = 1,
    UnconfirmedCovNotification = 2,
    UnconfirmedEventNotification = 3,
    UnconfirmedPrivateTransfer = 4,
    UnconfirmedTextMessage = 5,
    TimeSynchronization = 6,
    WhoHas = 7,
    WhoIs = 8,
    UtcTimeSynchronization = 9,
    WriteGroup = 10,
}

impl TryFrom<u8> for UnconfirmedServiceChoice {
    type Error = EncodingError;

    fn try_from(value: u8) -> Result<Self, EncodingError> {
        match value {
            0 => Ok(UnconfirmedServiceChoice::IAm),
            1 => Ok(UnconfirmedServiceChoice::IHave),
            2 => Ok(UnconfirmedServiceChoice::UnconfirmedCovNotification),
            3 => Ok(UnconfirmedServiceChoice::UnconfirmedEventNotification),
            4 => Ok(UnconfirmedServiceChoice::UnconfirmedPrivateTransfer),
            5 => Ok(UnconfirmedServiceChoice::UnconfirmedTextMessage),
            6 => Ok(UnconfirmedServiceChoice::TimeSynchronization),
            7 => Ok(UnconfirmedServiceChoice::WhoHas),
            8 => Ok(UnconfirmedServiceChoice::WhoIs),
            9 => Ok(UnconfirmedServiceChoice::UtcTimeSynchronization),
            10 => Ok(UnconfirmedServiceChoice::WriteGroup),
            _ => Err(EncodingError::ValueOutOfRange),
        }
    }
}

generate_custom_enum! {
    /// Reject reasons; the proprietary band starts at 64.
    RejectReason {
        Other = 0,
        BufferOverflow = 1,
        InconsistentParameters = 2,
        InvalidParameterDataType = 3,
        InvalidTag = 4,
        MissingRequiredParameter = 5,
        ParameterOutOfRange = 6,
        TooManyArguments = 7,
        UndefinedEnumeration = 8,
        UnrecognizedService = 9,
    },
    u8,
    64..=255
}

impl RejectReason {
    /// Map a decode failure onto the reject code the wire gets.
    pub fn from_decode_error(error: &EncodingError) -> Self {
        match error {
            EncodingError::InvalidTag | EncodingError::TagMismatch => RejectReason::InvalidTag,
            EncodingError::UnexpectedEndOfData => RejectReason::MissingRequiredParameter,
            EncodingError::ValueOutOfRange => RejectReason::ParameterOutOfRange,
            EncodingError::InvalidLength => RejectReason::InvalidParameterDataType,
            _ => RejectReason::Other,
        }
    }
}

generate_custom_enum! {
    /// Abort reasons; the proprietary band starts at 64.
    AbortReason {
        Other = 0,
        BufferOverflow = 1,
        InvalidApduInThisState = 2,
        PreemptedByHigherPriorityTask = 3,
        SegmentationNotSupported = 4,
        SecurityError = 5,
        InsufficientSecurity = 6,
        WindowSizeOutOfRange = 7,
        ApplicationExceededReplyTime = 8,
        OutOfResources = 9,
        TsmTimeout = 10,
        ApduTooLong = 11,
    },
    u8,
    64..=255
}

generate_custom_enum! {
    /// Error classes; the proprietary band starts at 64.
    ErrorClass {
        Device = 0,
        Object = 1,
        Property = 2,
        Resources = 3,
        Security = 4,
        Services = 5,
        Vt = 6,
        Communication = 7,
    },
    u32,
    64..=65_535
}

generate_custom_enum! {
    /// Error codes. This is an open enumeration: the wire value is carried
    /// unmodified in both directions. Proprietary band starts at 256.
    ErrorCode {
        Other = 0,
        ConfigurationInProgress = 2,
        DeviceBusy = 3,
        InconsistentParameters = 7,
        InvalidDataType = 9,
        MissingRequiredParameter = 16,
        NoSpaceForObject = 18,
        NoSpaceToWriteProperty = 20,
        PropertyIsNotAList = 22,
        ObjectDeletionNotPermitted = 23,
        ReadAccessDenied = 27,
        ServiceRequestDenied = 29,
        Timeout = 30,
        UnknownObject = 31,
        UnknownProperty = 32,
        UnsupportedObjectType = 36,
        ValueOutOfRange = 37,
        WriteAccessDenied = 40,
        CharacterSetNotSupported = 41,
        InvalidArrayIndex = 42,
        NotCovProperty = 44,
        OptionalFunctionalityNotSupported = 45,
        DatatypeNotSupported = 47,
        DuplicateName = 48,
        DuplicateObjectId = 49,
        PropertyIsNotAnArray = 50,
        AbortBufferOverflow = 51,
        AbortInvalidApduInThisState = 52,
        ListElementNotFound = 81,
    },
    u32,
    256..=65_535
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_choice_conversions() {
        assert_eq!(ConfirmedServiceChoice::ReadProperty as u8, 12);
        assert_eq!(
            ConfirmedServiceChoice::try_from(15).unwrap(),
            ConfirmedServiceChoice::WriteProperty
        );
        assert!(ConfirmedServiceChoice::try_from(200).is_err());

        assert_eq!(
            UnconfirmedServiceChoice::try_from(8).unwrap(),
            UnconfirmedServiceChoice::WhoIs
        );
    }

    #[test]
    fn test_constructed_error_services() {
        assert!(ConfirmedServiceChoice::AddListElement.has_constructed_error());
        assert!(ConfirmedServiceChoice::RemoveListElement.has_constructed_error());
        assert!(!ConfirmedServiceChoice::ReadProperty.has_constructed_error());
        assert!(!ConfirmedServiceChoice::WriteProperty.has_constructed_error());
    }

    #[test]
    fn test_error_code_open_enumeration() {
        assert_eq!(u32::from(ErrorCode::WriteAccessDenied), 40);
        assert_eq!(ErrorCode::from(40u32), ErrorCode::WriteAccessDenied);
        // Unknown codes pass through verbatim.
        assert_eq!(u32::from(ErrorCode::from(500u32)), 500);
        assert_eq!(u32::from(ErrorCode::from(99u32)), 99);
    }

    #[test]
    fn test_reject_reason_mapping() {
        assert_eq!(
            RejectReason::from_decode_error(&EncodingError::UnexpectedEndOfData),
            RejectReason::MissingRequiredParameter
        );
        assert_eq!(
            RejectReason::from_decode_error(&EncodingError::InvalidTag),
            RejectReason::InvalidTag
        );
    }
}
