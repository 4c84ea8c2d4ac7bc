//! APDU handler and router
//!
//! Turns incoming frames into service dispatches and emits the reply before
//! returning, so request and response stay in causal order on the wire.
//! The service-handler table is explicit and built at device construction
//! time; there is no global registration.
//!
//! Failure bands:
//! - syntax problems answer with a Reject PDU,
//! - structural problems (segmentation, oversized replies) with an Abort,
//! - semantic problems with an Error PDU carrying the accessor's
//!   class/code verbatim.

use crate::app::tsm::TransactionStateMachine;
use crate::app::Apdu;
use crate::datalink::{BacnetAddress, DataLink};
use crate::network::Npdu;
use crate::object::{
    AccessError, ListElementData, ListElementError, ObjectDatabase, ObjectIdentifier,
    ReadPropertyData, WritePropertyData,
};
use crate::service::{
    AbortPdu, AbortReason, ConfirmedServiceChoice, ErrorPdu, IAmRequest, ListElementRequest,
    PropertyAccessOutcome, ReadAccessResult, ReadPropertyAck, ReadPropertyMultipleAck,
    ReadPropertyMultipleRequest, ReadPropertyRequest, RejectPdu, RejectReason,
    UnconfirmedServiceChoice, WhoIsRequest, WritePropertyRequest,
};
use crate::service::read::PropertyAccessResult;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Which services this device answers. Disabled services are rejected with
/// `unrecognized-service`.
#[derive(Debug, Clone, Copy)]
pub struct ServiceTable {
    pub read_property: bool,
    pub read_property_multiple: bool,
    pub write_property: bool,
    pub add_list_element: bool,
    pub remove_list_element: bool,
    pub who_is: bool,
}

impl Default for ServiceTable {
    fn default() -> Self {
        Self {
            read_property: true,
            read_property_multiple: true,
            write_property: true,
            add_list_element: true,
            remove_list_element: true,
            who_is: true,
        }
    }
}

/// The application-layer entry point: object database, transaction state
/// machine and service dispatch in one place.
pub struct ApduHandler {
    database: ObjectDatabase,
    tsm: TransactionStateMachine,
    services: ServiceTable,
}

impl ApduHandler {
    pub fn new(database: ObjectDatabase) -> Self {
        Self::with_services(database, ServiceTable::default())
    }

    pub fn with_services(mut database: ObjectDatabase, services: ServiceTable) -> Self {
        let device = database.device_mut();
        if services.read_property {
            device.set_service_supported(ConfirmedServiceChoice::ReadProperty as usize);
        }
        if services.read_property_multiple {
            device.set_service_supported(ConfirmedServiceChoice::ReadPropertyMultiple as usize);
        }
        if services.write_property {
            device.set_service_supported(ConfirmedServiceChoice::WriteProperty as usize);
        }
        if services.add_list_element {
            device.set_service_supported(ConfirmedServiceChoice::AddListElement as usize);
        }
        if services.remove_list_element {
            device.set_service_supported(ConfirmedServiceChoice::RemoveListElement as usize);
        }
        if services.who_is {
            // Unconfirmed services sit after the 26 confirmed ones.
            device.set_service_supported(26 + UnconfirmedServiceChoice::WhoIs as usize);
            device.set_service_supported(26 + UnconfirmedServiceChoice::IAm as usize);
        }
        Self {
            database,
            tsm: TransactionStateMachine::new(),
            services,
        }
    }

    pub fn database(&self) -> &ObjectDatabase {
        &self.database
    }

    pub fn database_mut(&mut self) -> &mut ObjectDatabase {
        &mut self.database
    }

    pub fn tsm(&self) -> &TransactionStateMachine {
        &self.tsm
    }

    /// Process one received frame: strip the NPDU, dispatch the APDU and
    /// emit any reply through the link before returning.
    pub fn process(
        &mut self,
        link: &mut dyn DataLink,
        source: &BacnetAddress,
        mpdu: &[u8],
    ) -> bool {
        let (npdu, header_len) = match Npdu::decode(mpdu) {
            Ok(decoded) => decoded,
            Err(error) => {
                log::debug!("dropping frame with bad NPDU: {}", error);
                return false;
            }
        };
        if npdu.is_network_message() {
            // Network-layer traffic belongs to routers.
            return false;
        }
        let reply = self.handle_apdu(source, &mpdu[header_len..]);
        if let Some(reply) = reply {
            let reply_npdu = Npdu::reply_to(&npdu);
            if let Err(error) = link.send_pdu(source, &reply_npdu, &reply) {
                log::warn!("reply to {} failed: {}", source, error);
            }
            return true;
        }
        false
    }

    /// Dispatch one APDU, returning the reply APDU bytes if one is due.
    pub fn handle_apdu(&mut self, source: &BacnetAddress, apdu: &[u8]) -> Option<Vec<u8>> {
        let decoded = match Apdu::decode(apdu) {
            Ok(decoded) => decoded,
            Err(error) => {
                log::debug!(
                    "undecodable APDU from {}: {}\n{}",
                    source,
                    error,
                    crate::util::hex_dump(apdu, "  ")
                );
                return None;
            }
        };

        match decoded {
            Apdu::ConfirmedRequest {
                segmented,
                invoke_id,
                service_choice,
                service_data,
                ..
            } => Some(self.confirmed_request(segmented, invoke_id, service_choice, &service_data)),
            Apdu::UnconfirmedRequest {
                service_choice,
                service_data,
            } => self.unconfirmed_request(service_choice, &service_data),
            Apdu::SimpleAck { invoke_id, .. }
            | Apdu::ComplexAck { invoke_id, .. }
            | Apdu::Error { invoke_id, .. } => {
                self.tsm.confirmation(invoke_id, source);
                None
            }
            Apdu::Reject {
                invoke_id,
                reject_reason,
            } => {
                self.tsm
                    .reject(invoke_id, source, RejectReason::from(reject_reason));
                None
            }
            Apdu::Abort {
                invoke_id,
                abort_reason,
                ..
            } => {
                self.tsm
                    .abort(invoke_id, source, AbortReason::from(abort_reason));
                None
            }
            Apdu::SegmentAck { .. } => None,
        }
    }

    fn confirmed_request(
        &mut self,
        segmented: bool,
        invoke_id: u8,
        service_choice: u8,
        service_data: &[u8],
    ) -> Vec<u8> {
        // No segmentation support, full stop.
        if segmented {
            return encode_abort(invoke_id, AbortReason::SegmentationNotSupported);
        }

        let service = match ConfirmedServiceChoice::try_from(service_choice) {
            Ok(service) => service,
            Err(_) => return encode_reject(invoke_id, RejectReason::UnrecognizedService),
        };

        match service {
            ConfirmedServiceChoice::ReadProperty if self.services.read_property => {
                self.read_property_request(invoke_id, service_data)
            }
            ConfirmedServiceChoice::ReadPropertyMultiple
                if self.services.read_property_multiple =>
            {
                self.read_property_multiple_request(invoke_id, service_data)
            }
            ConfirmedServiceChoice::WriteProperty if self.services.write_property => {
                self.write_property_request(invoke_id, service_data)
            }
            ConfirmedServiceChoice::AddListElement if self.services.add_list_element => {
                self.list_element_request(invoke_id, service_data, true)
            }
            ConfirmedServiceChoice::RemoveListElement if self.services.remove_list_element => {
                self.list_element_request(invoke_id, service_data, false)
            }
            _ => encode_reject(invoke_id, RejectReason::UnrecognizedService),
        }
    }

    fn unconfirmed_request(&mut self, service_choice: u8, service_data: &[u8]) -> Option<Vec<u8>> {
        let service = UnconfirmedServiceChoice::try_from(service_choice).ok()?;
        match service {
            UnconfirmedServiceChoice::WhoIs if self.services.who_is => {
                let request = WhoIsRequest::decode(service_data).ok()?;
                let device = self.database.device();
                if !request.matches(device.instance) {
                    return None;
                }
                let i_am = IAmRequest::new(
                    device.object_id(),
                    device.max_apdu_length_accepted as u32,
                    device.segmentation_supported,
                    device.vendor_identifier,
                );
                let mut service_data = Vec::new();
                i_am.encode(&mut service_data).ok()?;
                Some(
                    Apdu::UnconfirmedRequest {
                        service_choice: UnconfirmedServiceChoice::IAm as u8,
                        service_data,
                    }
                    .encode(),
                )
            }
            _ => None,
        }
    }

    /// Generic ReadProperty handler: lookup, membership, array semantics and
    /// reply-size checks all live behind the database call.
    fn read_property_request(&mut self, invoke_id: u8, service_data: &[u8]) -> Vec<u8> {
        let (request, _) = match ReadPropertyRequest::decode(service_data) {
            Ok(decoded) => decoded,
            Err(error) => {
                return encode_reject(invoke_id, RejectReason::from_decode_error(&error))
            }
        };

        let mut payload = Vec::new();
        let read = ReadPropertyData {
            object_instance: request.object_id.instance,
            property: request.property,
            array_index: request.array_index.unwrap_or(crate::BACNET_ARRAY_ALL),
        };
        match self.database.read_property(request.object_id, &read, &mut payload) {
            Ok(_) => {
                let ack = ReadPropertyAck {
                    object_id: request.object_id,
                    property: request.property,
                    array_index: request.array_index,
                    property_value: payload,
                };
                let mut service_data = Vec::new();
                if ack.encode(&mut service_data).is_err() {
                    return encode_abort(invoke_id, AbortReason::Other);
                }
                let reply = Apdu::complex_ack(
                    invoke_id,
                    ConfirmedServiceChoice::ReadProperty as u8,
                    service_data,
                )
                .encode();
                if reply.len() > crate::BACNET_MAX_APDU {
                    // The encoded response only fits segmented, which is
                    // unsupported.
                    return encode_abort(invoke_id, AbortReason::SegmentationNotSupported);
                }
                reply
            }
            Err(error) => {
                encode_access_error(invoke_id, ConfirmedServiceChoice::ReadProperty, error)
            }
        }
    }

    fn read_property_multiple_request(&mut self, invoke_id: u8, service_data: &[u8]) -> Vec<u8> {
        let request = match ReadPropertyMultipleRequest::decode(service_data) {
            Ok(decoded) => decoded,
            Err(error) => {
                return encode_reject(invoke_id, RejectReason::from_decode_error(&error))
            }
        };

        let mut ack = ReadPropertyMultipleAck::default();
        for specification in &request.specifications {
            let mut result = ReadAccessResult::new(specification.object_id);
            for reference in &specification.properties {
                let mut payload = Vec::new();
                let read = ReadPropertyData {
                    object_instance: specification.object_id.instance,
                    property: reference.property,
                    array_index: reference.array_index.unwrap_or(crate::BACNET_ARRAY_ALL),
                };
                let outcome = match self.database.read_property(
                    specification.object_id,
                    &read,
                    &mut payload,
                ) {
                    Ok(_) => PropertyAccessOutcome::Value(payload),
                    // Per-property semantic errors ride inside the ack.
                    Err(AccessError::Error(error)) => PropertyAccessOutcome::Error {
                        class: error.class,
                        code: error.code,
                    },
                    Err(AccessError::Abort(reason)) => return encode_abort(invoke_id, reason),
                    Err(AccessError::Reject(reason)) => {
                        return encode_reject(invoke_id, reason)
                    }
                };
                result.results.push(PropertyAccessResult {
                    property: reference.property,
                    array_index: reference.array_index,
                    outcome,
                });
            }
            ack.results.push(result);
        }

        let mut service_data = Vec::new();
        if ack.encode(&mut service_data).is_err() {
            return encode_abort(invoke_id, AbortReason::Other);
        }
        let reply = Apdu::complex_ack(
            invoke_id,
            ConfirmedServiceChoice::ReadPropertyMultiple as u8,
            service_data,
        )
        .encode();
        if reply.len() > crate::BACNET_MAX_APDU {
            return encode_abort(invoke_id, AbortReason::SegmentationNotSupported);
        }
        reply
    }

    /// Generic WriteProperty handler per the commandable-object rules: a
    /// malformed value payload is `value-out-of-range`, a Null write is a
    /// relinquish at the given priority.
    fn write_property_request(&mut self, invoke_id: u8, service_data: &[u8]) -> Vec<u8> {
        let (request, _) = match WritePropertyRequest::decode(service_data) {
            Ok(decoded) => decoded,
            Err(error) => {
                return encode_reject(invoke_id, RejectReason::from_decode_error(&error))
            }
        };

        let value = match request.decode_value() {
            Ok(value) => value,
            Err(_) => {
                return encode_access_error(
                    invoke_id,
                    ConfirmedServiceChoice::WriteProperty,
                    AccessError::Error(crate::object::PropertyError::value_out_of_range()),
                )
            }
        };

        let write = WritePropertyData {
            object_instance: request.object_id.instance,
            property: request.property,
            array_index: request.array_index.unwrap_or(crate::BACNET_ARRAY_ALL),
            value,
            priority: request.priority.unwrap_or(0),
        };
        match self.database.write_property(request.object_id, &write) {
            Ok(()) => Apdu::SimpleAck {
                invoke_id,
                service_choice: ConfirmedServiceChoice::WriteProperty as u8,
            }
            .encode(),
            Err(error) => {
                encode_access_error(invoke_id, ConfirmedServiceChoice::WriteProperty, error)
            }
        }
    }

    fn list_element_request(&mut self, invoke_id: u8, service_data: &[u8], add: bool) -> Vec<u8> {
        let service = if add {
            ConfirmedServiceChoice::AddListElement
        } else {
            ConfirmedServiceChoice::RemoveListElement
        };
        let (request, _) = match ListElementRequest::decode(service_data) {
            Ok(decoded) => decoded,
            Err(error) => {
                return encode_reject(invoke_id, RejectReason::from_decode_error(&error))
            }
        };

        let data = ListElementData {
            object_instance: request.object_id.instance,
            property: request.property,
            array_index: request.array_index.unwrap_or(crate::BACNET_ARRAY_ALL),
            elements: request.elements,
        };
        let outcome = if add {
            self.database.add_list_element(request.object_id, &data)
        } else {
            self.database.remove_list_element(request.object_id, &data)
        };
        match outcome {
            Ok(()) => Apdu::SimpleAck {
                invoke_id,
                service_choice: service as u8,
            }
            .encode(),
            Err(ListElementError {
                error,
                first_failed_element,
            }) => {
                let mut pdu = ErrorPdu::new(invoke_id, service, error.class, error.code);
                pdu.first_failed_element = Some(first_failed_element);
                let mut buffer = Vec::new();
                match pdu.encode(&mut buffer) {
                    Ok(_) => buffer,
                    Err(_) => encode_abort(invoke_id, AbortReason::Other),
                }
            }
        }
    }

    /// Initiate a confirmed request: allocate an invoke-id, send, and arm
    /// the retry machinery. Returns 0 when the invoke-id pool is exhausted;
    /// the caller must back off.
    pub fn initiate_confirmed_request(
        &mut self,
        link: &mut dyn DataLink,
        destination: BacnetAddress,
        service: ConfirmedServiceChoice,
        service_data: Vec<u8>,
    ) -> u8 {
        let invoke_id = self.tsm.next_free_invoke_id();
        if invoke_id == crate::BACNET_NO_INVOKE_ID {
            return invoke_id;
        }
        let pdu = Apdu::confirmed_request(invoke_id, service as u8, service_data).encode();
        let npdu = Npdu::for_request(true);
        if let Err(error) = link.send_pdu(&destination, &npdu, &pdu) {
            log::warn!("initial send of invoke id {} failed: {}", invoke_id, error);
        }
        self.tsm.set(invoke_id, destination, npdu, &pdu);
        invoke_id
    }

    /// The periodic maintenance entry: TSM retries/timeouts and object
    /// timers. Returns invoke-ids that newly failed.
    pub fn tick(&mut self, elapsed_ms: u64, link: &mut dyn DataLink) -> Vec<u8> {
        self.database.tick(elapsed_ms);
        self.tsm.tick(elapsed_ms, link)
    }
}

fn encode_reject(invoke_id: u8, reason: RejectReason) -> Vec<u8> {
    let mut buffer = Vec::new();
    // Three fixed bytes; cannot fail.
    let _ = RejectPdu::new(invoke_id, reason).encode(&mut buffer);
    buffer
}

fn encode_abort(invoke_id: u8, reason: AbortReason) -> Vec<u8> {
    let mut buffer = Vec::new();
    let _ = AbortPdu::new(true, invoke_id, reason).encode(&mut buffer);
    buffer
}

fn encode_access_error(
    invoke_id: u8,
    service: ConfirmedServiceChoice,
    error: AccessError,
) -> Vec<u8> {
    match error {
        AccessError::Error(error) => {
            let pdu = ErrorPdu::new(invoke_id, service, error.class, error.code);
            let mut buffer = Vec::new();
            match pdu.encode(&mut buffer) {
                Ok(_) => buffer,
                Err(_) => encode_abort(invoke_id, AbortReason::Other),
            }
        }
        AccessError::Abort(reason) => encode_abort(invoke_id, reason),
        AccessError::Reject(reason) => encode_reject(invoke_id, reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::constructed::Destination;
    use crate::encoding::value::ApplicationDataValue;
    use crate::object::analog::{AnalogCommandableHandler, AnalogInputHandler};
    use crate::object::notification::NotificationClassHandler;
    use crate::object::{DeviceObject, ObjectHandler, ObjectType, PropertyIdentifier};
    use crate::service::{ErrorClass, ErrorCode};

    fn peer() -> BacnetAddress {
        BacnetAddress::local(&[0x0A])
    }

    fn test_handler() -> ApduHandler {
        let mut database = ObjectDatabase::new(DeviceObject::new(1234, "scenario device"));

        let mut inputs = AnalogInputHandler::new();
        inputs.create(0).unwrap();
        inputs.set_present_value(0, 72.5);
        database.register(Box::new(inputs)).unwrap();

        let mut outputs = AnalogCommandableHandler::analog_output();
        outputs.create(1).unwrap();
        outputs.set_relinquish_default(1, 10.0);
        database.register(Box::new(outputs)).unwrap();

        let mut notifications = NotificationClassHandler::new();
        notifications.create(1).unwrap();
        notifications.add_recipient(
            1,
            Destination::for_device(ObjectIdentifier::new(ObjectType::Device, 500), 1),
        );
        database.register(Box::new(notifications)).unwrap();

        ApduHandler::new(database)
    }

    fn confirmed(invoke_id: u8, service: ConfirmedServiceChoice, payload: Vec<u8>) -> Vec<u8> {
        Apdu::confirmed_request(invoke_id, service as u8, payload).encode()
    }

    fn read_property_apdu(
        invoke_id: u8,
        object_id: ObjectIdentifier,
        property: PropertyIdentifier,
    ) -> Vec<u8> {
        let mut payload = Vec::new();
        ReadPropertyRequest::new(object_id, property)
            .encode(&mut payload)
            .unwrap();
        confirmed(invoke_id, ConfirmedServiceChoice::ReadProperty, payload)
    }

    fn write_property_apdu(
        invoke_id: u8,
        object_id: ObjectIdentifier,
        value: ApplicationDataValue,
        priority: u8,
    ) -> Vec<u8> {
        let mut payload = Vec::new();
        WritePropertyRequest::new(object_id, PropertyIdentifier::PresentValue, &value)
            .with_priority(priority)
            .encode(&mut payload)
            .unwrap();
        confirmed(invoke_id, ConfirmedServiceChoice::WriteProperty, payload)
    }

    #[test]
    fn test_rp_unknown_property_error() {
        let mut handler = test_handler();
        let request = read_property_apdu(
            7,
            ObjectIdentifier::new(ObjectType::AnalogInput, 0),
            PropertyIdentifier::from(999u32),
        );
        let reply = handler.handle_apdu(&peer(), &request).unwrap();

        let error = ErrorPdu::decode(&reply).unwrap();
        assert_eq!(error.invoke_id, 7);
        assert_eq!(error.error_class, ErrorClass::Property);
        assert_eq!(error.error_code, ErrorCode::UnknownProperty);
    }

    #[test]
    fn test_rp_present_value_complex_ack_bytes() {
        let mut handler = test_handler();
        let request = read_property_apdu(
            42,
            ObjectIdentifier::new(ObjectType::AnalogInput, 0),
            PropertyIdentifier::PresentValue,
        );
        let reply = handler.handle_apdu(&peer(), &request).unwrap();

        // ComplexAck, invoke 42, ReadProperty.
        assert_eq!(&reply[..3], [0x30, 0x2A, 0x0C]);

        let ack = match Apdu::decode(&reply).unwrap() {
            Apdu::ComplexAck { service_data, .. } => {
                ReadPropertyAck::decode(&service_data).unwrap().0
            }
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(
            ack.object_id,
            ObjectIdentifier::new(ObjectType::AnalogInput, 0)
        );
        assert_eq!(u32::from(ack.property), 85);
        let (value, _) = crate::encoding::decode_application_real(&ack.property_value).unwrap();
        assert_eq!(value, 72.5);
    }

    #[test]
    fn test_wp_commandable_write_then_relinquish() {
        let mut handler = test_handler();
        let ao = ObjectIdentifier::new(ObjectType::AnalogOutput, 1);

        let reply = handler
            .handle_apdu(
                &peer(),
                &write_property_apdu(1, ao, ApplicationDataValue::Real(25.0), 8),
            )
            .unwrap();
        assert!(matches!(
            Apdu::decode(&reply).unwrap(),
            Apdu::SimpleAck { .. }
        ));

        let reply = handler
            .handle_apdu(
                &peer(),
                &write_property_apdu(2, ao, ApplicationDataValue::Null, 8),
            )
            .unwrap();
        assert!(matches!(
            Apdu::decode(&reply).unwrap(),
            Apdu::SimpleAck { .. }
        ));

        // Present-value is back at the relinquish-default.
        let reply = handler
            .handle_apdu(
                &peer(),
                &read_property_apdu(3, ao, PropertyIdentifier::PresentValue),
            )
            .unwrap();
        let ack = match Apdu::decode(&reply).unwrap() {
            Apdu::ComplexAck { service_data, .. } => {
                ReadPropertyAck::decode(&service_data).unwrap().0
            }
            other => panic!("unexpected {:?}", other),
        };
        let (value, _) = crate::encoding::decode_application_real(&ack.property_value).unwrap();
        assert_eq!(value, 10.0);
    }

    #[test]
    fn test_wp_reserved_priority_denied() {
        let mut handler = test_handler();
        let ao = ObjectIdentifier::new(ObjectType::AnalogOutput, 1);
        let reply = handler
            .handle_apdu(
                &peer(),
                &write_property_apdu(9, ao, ApplicationDataValue::Real(50.0), 6),
            )
            .unwrap();

        let error = ErrorPdu::decode(&reply).unwrap();
        assert_eq!(error.error_class, ErrorClass::Property);
        assert_eq!(error.error_code, ErrorCode::WriteAccessDenied);
        assert_eq!(error.invoke_id, 9);
    }

    #[test]
    fn test_segmented_request_aborted() {
        let mut handler = test_handler();
        let mut request = read_property_apdu(
            13,
            ObjectIdentifier::new(ObjectType::AnalogInput, 0),
            PropertyIdentifier::PresentValue,
        );
        request[0] |= 0x08;
        // Segmented header carries sequence and window bytes.
        request.insert(3, 0);
        request.insert(4, 1);

        let reply = handler.handle_apdu(&peer(), &request).unwrap();
        let abort = AbortPdu::decode(&reply).unwrap();
        assert!(abort.server);
        assert_eq!(abort.invoke_id, 13);
        assert_eq!(abort.reason, AbortReason::SegmentationNotSupported);
    }

    #[test]
    fn test_add_then_remove_list_element_roundtrip() {
        let mut handler = test_handler();
        let nc = ObjectIdentifier::new(ObjectType::NotificationClass, 1);

        let newcomer = Destination::for_device(ObjectIdentifier::new(ObjectType::Device, 600), 2);
        let mut elements = Vec::new();
        newcomer.encode(&mut elements).unwrap();

        let mut payload = Vec::new();
        ListElementRequest::new(nc, PropertyIdentifier::RecipientList, elements.clone())
            .encode(&mut payload)
            .unwrap();

        let reply = handler
            .handle_apdu(
                &peer(),
                &confirmed(20, ConfirmedServiceChoice::AddListElement, payload.clone()),
            )
            .unwrap();
        assert!(matches!(
            Apdu::decode(&reply).unwrap(),
            Apdu::SimpleAck { .. }
        ));

        let reply = handler
            .handle_apdu(
                &peer(),
                &confirmed(21, ConfirmedServiceChoice::RemoveListElement, payload),
            )
            .unwrap();
        assert!(matches!(
            Apdu::decode(&reply).unwrap(),
            Apdu::SimpleAck { .. }
        ));

        // The prior single-recipient list answers the read.
        let reply = handler
            .handle_apdu(
                &peer(),
                &read_property_apdu(22, nc, PropertyIdentifier::RecipientList),
            )
            .unwrap();
        let ack = match Apdu::decode(&reply).unwrap() {
            Apdu::ComplexAck { service_data, .. } => {
                ReadPropertyAck::decode(&service_data).unwrap().0
            }
            other => panic!("unexpected {:?}", other),
        };
        let (first, consumed) = Destination::decode(&ack.property_value).unwrap();
        assert_eq!(consumed, ack.property_value.len());
        assert_eq!(
            first,
            Destination::for_device(ObjectIdentifier::new(ObjectType::Device, 500), 1)
        );
    }

    #[test]
    fn test_remove_missing_element_error_ack() {
        let mut handler = test_handler();
        let nc = ObjectIdentifier::new(ObjectType::NotificationClass, 1);

        let stranger = Destination::for_device(ObjectIdentifier::new(ObjectType::Device, 999), 3);
        let mut elements = Vec::new();
        stranger.encode(&mut elements).unwrap();

        let mut payload = Vec::new();
        ListElementRequest::new(nc, PropertyIdentifier::RecipientList, elements)
            .encode(&mut payload)
            .unwrap();

        let reply = handler
            .handle_apdu(
                &peer(),
                &confirmed(30, ConfirmedServiceChoice::RemoveListElement, payload),
            )
            .unwrap();
        let error = ErrorPdu::decode(&reply).unwrap();
        assert_eq!(error.service, ConfirmedServiceChoice::RemoveListElement);
        assert_eq!(error.error_code, ErrorCode::ListElementNotFound);
        assert_eq!(error.first_failed_element, Some(1));
    }

    #[test]
    fn test_rpm_interleaves_values_and_errors() {
        let mut handler = test_handler();
        let ai = ObjectIdentifier::new(ObjectType::AnalogInput, 0);

        let mut specification =
            crate::encoding::constructed::ReadAccessSpecification::new(ai);
        specification.add_property(crate::encoding::constructed::PropertyReference::new(
            PropertyIdentifier::PresentValue,
        ));
        specification.add_property(crate::encoding::constructed::PropertyReference::new(
            PropertyIdentifier::from(999u32),
        ));
        let mut payload = Vec::new();
        ReadPropertyMultipleRequest::new(vec![specification])
            .encode(&mut payload)
            .unwrap();

        let reply = handler
            .handle_apdu(
                &peer(),
                &confirmed(11, ConfirmedServiceChoice::ReadPropertyMultiple, payload),
            )
            .unwrap();
        let ack = match Apdu::decode(&reply).unwrap() {
            Apdu::ComplexAck { service_data, .. } => {
                ReadPropertyMultipleAck::decode(&service_data).unwrap()
            }
            other => panic!("unexpected {:?}", other),
        };
        let outcomes = &ack.results[0].results;
        assert!(matches!(outcomes[0].outcome, PropertyAccessOutcome::Value(_)));
        assert!(matches!(
            outcomes[1].outcome,
            PropertyAccessOutcome::Error {
                class: ErrorClass::Property,
                code: ErrorCode::UnknownProperty,
            }
        ));
    }

    #[test]
    fn test_unknown_service_rejected() {
        let mut handler = test_handler();
        let request = confirmed(5, ConfirmedServiceChoice::ReinitializeDevice, vec![]);
        let reply = handler.handle_apdu(&peer(), &request).unwrap();
        let reject = RejectPdu::decode(&reply).unwrap();
        assert_eq!(reject.reason, RejectReason::UnrecognizedService);
        assert_eq!(reject.invoke_id, 5);
    }

    #[test]
    fn test_malformed_request_rejected() {
        let mut handler = test_handler();
        // ReadProperty with a truncated payload.
        let request = confirmed(6, ConfirmedServiceChoice::ReadProperty, vec![0x0C, 0x00]);
        let reply = handler.handle_apdu(&peer(), &request).unwrap();
        assert!(RejectPdu::decode(&reply).is_ok());
    }

    #[test]
    fn test_who_is_answered_with_i_am() {
        let mut handler = test_handler();
        let mut payload = Vec::new();
        WhoIsRequest::for_range(1000, 2000)
            .encode(&mut payload)
            .unwrap();
        let request = Apdu::UnconfirmedRequest {
            service_choice: UnconfirmedServiceChoice::WhoIs as u8,
            service_data: payload,
        }
        .encode();

        let reply = handler.handle_apdu(&peer(), &request).unwrap();
        match Apdu::decode(&reply).unwrap() {
            Apdu::UnconfirmedRequest {
                service_choice,
                service_data,
            } => {
                assert_eq!(service_choice, UnconfirmedServiceChoice::IAm as u8);
                let i_am = IAmRequest::decode(&service_data).unwrap();
                assert_eq!(i_am.device_id.instance, 1234);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_who_is_outside_range_ignored() {
        let mut handler = test_handler();
        let mut payload = Vec::new();
        WhoIsRequest::for_range(1, 10).encode(&mut payload).unwrap();
        let request = Apdu::UnconfirmedRequest {
            service_choice: UnconfirmedServiceChoice::WhoIs as u8,
            service_data: payload,
        }
        .encode();
        assert!(handler.handle_apdu(&peer(), &request).is_none());
    }

    #[test]
    fn test_write_malformed_value_is_out_of_range() {
        let mut handler = test_handler();

        // Hand-build a WP request whose [3] payload holds a context tag.
        let mut payload = Vec::new();
        crate::encoding::encode_context_object_id(&mut payload, 0, 1, 1).unwrap();
        crate::encoding::encode_context_enumerated(&mut payload, 1, 85).unwrap();
        crate::encoding::encode_opening_tag(&mut payload, 3).unwrap();
        crate::encoding::encode_context_unsigned(&mut payload, 9, 1).unwrap();
        crate::encoding::encode_closing_tag(&mut payload, 3).unwrap();

        let reply = handler
            .handle_apdu(
                &peer(),
                &confirmed(17, ConfirmedServiceChoice::WriteProperty, payload),
            )
            .unwrap();
        let error = ErrorPdu::decode(&reply).unwrap();
        assert_eq!(error.error_code, ErrorCode::ValueOutOfRange);
    }

    #[test]
    fn test_process_emits_reply_through_link() {
        let mut handler = test_handler();
        let mut link = crate::datalink::LoopbackLink::new(&[0x01]);

        let apdu = read_property_apdu(
            42,
            ObjectIdentifier::new(ObjectType::AnalogInput, 0),
            PropertyIdentifier::PresentValue,
        );
        let mut mpdu = Npdu::for_request(true).encode();
        mpdu.extend_from_slice(&apdu);

        assert!(handler.process(&mut link, &peer(), &mpdu));
        let sent = link.take_sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].0.matches(&peer()));
        // Reply NPDU is 2 bytes; the APDU starts with the complex-ack header.
        assert_eq!(&sent[0].1[2..5], [0x30, 0x2A, 0x0C]);
    }

    #[test]
    fn test_initiate_request_and_ack_completion() {
        let mut handler = test_handler();
        let mut link = crate::datalink::LoopbackLink::new(&[0x01]);

        let mut payload = Vec::new();
        ReadPropertyRequest::new(
            ObjectIdentifier::new(ObjectType::AnalogInput, 3),
            PropertyIdentifier::PresentValue,
        )
        .encode(&mut payload)
        .unwrap();

        let invoke_id = handler.initiate_confirmed_request(
            &mut link,
            peer(),
            ConfirmedServiceChoice::ReadProperty,
            payload,
        );
        assert_ne!(invoke_id, 0);
        assert_eq!(link.sent_count(), 1);
        assert_eq!(
            handler.tsm().state(invoke_id),
            crate::app::tsm::TransactionState::AwaitConfirmation
        );

        // Peer acks; transaction completes.
        let ack = Apdu::SimpleAck {
            invoke_id,
            service_choice: ConfirmedServiceChoice::ReadProperty as u8,
        }
        .encode();
        handler.handle_apdu(&peer(), &ack);
        assert_eq!(
            handler.tsm().state(invoke_id),
            crate::app::tsm::TransactionState::Completed
        );
    }
}
