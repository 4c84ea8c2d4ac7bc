#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

pub mod app;
pub mod datalink;
pub mod encoding;
pub mod network;
pub mod object;
pub mod service;
pub mod util;

// Re-export main types without glob imports to avoid conflicts
pub use app::{Apdu, ApduType};
pub use datalink::{BacnetAddress, DataLink};
pub use encoding::{ApplicationTag, EncodingError, Tag, TagClass};
pub use object::{ObjectIdentifier, ObjectType, PropertyIdentifier};
pub use service::{ConfirmedServiceChoice, ErrorClass, ErrorCode, UnconfirmedServiceChoice};

#[cfg(feature = "std")]
extern crate std;

#[cfg(not(feature = "std"))]
extern crate alloc;

pub const BACNET_PROTOCOL_VERSION: u8 = 1;
pub const BACNET_PROTOCOL_REVISION: u8 = 24;

/// Largest application PDU this stack sends or accepts.
pub const BACNET_MAX_APDU: usize = 1476;
/// Largest media PDU including NPDU framing.
pub const BACNET_MAX_MPDU: usize = 1497;

/// Highest valid object instance; also the wildcard used on object creation.
pub const BACNET_MAX_INSTANCE: u32 = 0x3F_FFFF;
/// Highest valid 10-bit object type.
pub const BACNET_MAX_OBJECT_TYPE: u16 = 1023;

/// Sentinel meaning "no array index present" in property requests.
pub const BACNET_ARRAY_ALL: u32 = u32::MAX;

/// Commandable objects arbitrate their present-value over this many slots.
pub const BACNET_MAX_PRIORITY: u8 = 16;
/// Slot reserved for the Minimum On/Off algorithm; never writable.
pub const BACNET_RESERVED_PRIORITY: u8 = 6;

/// Invoke-id value meaning "none"; live transactions use 1..=255.
pub const BACNET_NO_INVOKE_ID: u8 = 0;
