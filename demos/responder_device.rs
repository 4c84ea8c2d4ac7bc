//! Responder Device Demo
//!
//! Builds a small device with a handful of objects and drives it through
//! the loopback datalink: a Who-Is is answered with I-Am, a ReadProperty
//! and a WriteProperty round-trip, and the maintenance tick runs.
//!
//! Run with `RUST_LOG=debug` to watch the handler's dispatch decisions.

use bacnet_core::app::handler::ApduHandler;
use bacnet_core::app::Apdu;
use bacnet_core::datalink::{BacnetAddress, LoopbackLink};
use bacnet_core::encoding::value::ApplicationDataValue;
use bacnet_core::network::Npdu;
use bacnet_core::object::analog::{AnalogCommandableHandler, AnalogInputHandler};
use bacnet_core::object::{DeviceObject, ObjectDatabase, ObjectHandler, ObjectIdentifier};
use bacnet_core::service::{
    ConfirmedServiceChoice, ReadPropertyRequest, UnconfirmedServiceChoice, WhoIsRequest,
    WritePropertyRequest,
};
use bacnet_core::{ObjectType, PropertyIdentifier};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("bacnet-core Responder Device Demo");
    println!("=================================");

    let mut database = ObjectDatabase::new(DeviceObject::new(12345, "Demo Device"));

    let mut inputs = AnalogInputHandler::new();
    inputs.create(0)?;
    inputs.set_present_value(0, 72.5);
    database.register(Box::new(inputs))?;

    let mut outputs = AnalogCommandableHandler::analog_output();
    outputs.create(1)?;
    outputs.set_relinquish_default(1, 20.0);
    database.register(Box::new(outputs))?;

    println!("Device instance: {}", database.device().instance);
    println!("Objects: {}", database.object_list().len());

    let mut handler = ApduHandler::new(database);
    let mut link = LoopbackLink::new(&[0xC0, 0xA8, 0x00, 0x01, 0xBA, 0xC0]);
    let peer = BacnetAddress::local(&[0xC0, 0xA8, 0x00, 0x02, 0xBA, 0xC0]);

    // Who-Is from the peer; the device answers with I-Am.
    let mut who_is = Vec::new();
    WhoIsRequest::new().encode(&mut who_is)?;
    let apdu = Apdu::UnconfirmedRequest {
        service_choice: UnconfirmedServiceChoice::WhoIs as u8,
        service_data: who_is,
    }
    .encode();
    let mut mpdu = Npdu::new().encode();
    mpdu.extend_from_slice(&apdu);
    handler.process(&mut link, &peer, &mpdu);
    println!("Who-Is answered: {} frame(s) sent", link.take_sent().len());

    // ReadProperty of the input's present-value.
    let mut read = Vec::new();
    ReadPropertyRequest::new(
        ObjectIdentifier::new(ObjectType::AnalogInput, 0),
        PropertyIdentifier::PresentValue,
    )
    .encode(&mut read)?;
    let apdu = Apdu::confirmed_request(1, ConfirmedServiceChoice::ReadProperty as u8, read);
    let mut mpdu = Npdu::for_request(true).encode();
    mpdu.extend_from_slice(&apdu.encode());
    handler.process(&mut link, &peer, &mpdu);
    for (_, frame) in link.take_sent() {
        println!("ReadProperty reply: {} bytes", frame.len());
    }

    // WriteProperty commanding the output at priority 8.
    let mut write = Vec::new();
    WritePropertyRequest::new(
        ObjectIdentifier::new(ObjectType::AnalogOutput, 1),
        PropertyIdentifier::PresentValue,
        &ApplicationDataValue::Real(42.0),
    )
    .with_priority(8)
    .encode(&mut write)?;
    let apdu = Apdu::confirmed_request(2, ConfirmedServiceChoice::WriteProperty as u8, write);
    let mut mpdu = Npdu::for_request(true).encode();
    mpdu.extend_from_slice(&apdu.encode());
    handler.process(&mut link, &peer, &mpdu);
    for (_, frame) in link.take_sent() {
        println!("WriteProperty reply: {} bytes", frame.len());
    }

    // One maintenance pass: TSM retries and object timers.
    handler.tick(1000, &mut link);

    println!("done");
    Ok(())
}
