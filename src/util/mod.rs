//! Utility Functions Module
//!
//! Small helpers shared across the stack: object-id packing, priority
//! validation and hex rendering for log output.

pub mod enum_macros;

#[cfg(not(feature = "std"))]
use alloc::{format, string::String, vec::Vec};

/// Check if an instance number is valid (0..=4194303)
pub fn is_valid_instance_number(instance: u32) -> bool {
    instance <= crate::BACNET_MAX_INSTANCE
}

/// Pack an object type and instance into the 32-bit wire form
pub fn encode_object_id(object_type: u16, instance: u32) -> Option<u32> {
    if object_type > crate::BACNET_MAX_OBJECT_TYPE || instance > crate::BACNET_MAX_INSTANCE {
        return None;
    }
    Some(((object_type as u32) << 22) | instance)
}

/// Unpack a 32-bit object identifier into type and instance
pub fn decode_object_id(object_id: u32) -> (u16, u32) {
    (
        (object_id >> 22) as u16,
        object_id & crate::BACNET_MAX_INSTANCE,
    )
}

/// True for a write priority in the valid 1..=16 band
pub fn is_valid_priority(priority: u8) -> bool {
    (1..=crate::BACNET_MAX_PRIORITY).contains(&priority)
}

/// Format a byte slice as a hex dump with an address column, 16 bytes per row
pub fn hex_dump(data: &[u8], prefix: &str) -> String {
    let mut output = String::new();
    for (i, chunk) in data.chunks(16).enumerate() {
        output.push_str(&format!("{}{:04x}: {}\n", prefix, i * 16, hex::encode(chunk)));
    }
    output
}
