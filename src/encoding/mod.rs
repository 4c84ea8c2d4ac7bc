//! BACnet Encoding and Decoding
//!
//! Tag-level and primitive-value codec for BACnet application data according
//! to ASHRAE Standard 135. Every value on the wire is a tag-length-value
//! element:
//!
//! - **Tag**: data type (application class) or position (context class)
//! - **Length**: payload length, inline for 0..4, extended above
//! - **Value**: big-endian payload bytes
//!
//! # Application Tags
//!
//! | Tag | Type |
//! |-----|------|
//! | 0 | Null |
//! | 1 | Boolean |
//! | 2 | Unsigned Integer |
//! | 3 | Signed Integer |
//! | 4 | Real (IEEE-754 single) |
//! | 5 | Double (IEEE-754 double) |
//! | 6 | Octet String |
//! | 7 | Character String |
//! | 8 | Bit String |
//! | 9 | Enumerated |
//! | 10 | Date |
//! | 11 | Time |
//! | 12 | Object Identifier |
//!
//! # Examples
//!
//! ```rust
//! use bacnet_core::encoding::{encode_application_unsigned, decode_application_unsigned};
//!
//! let mut buffer = Vec::new();
//! encode_application_unsigned(&mut buffer, 42).unwrap();
//! assert_eq!(buffer, [0x21, 0x2A]);
//!
//! let (value, consumed) = decode_application_unsigned(&buffer).unwrap();
//! assert_eq!(value, 42);
//! assert_eq!(consumed, 2);
//! ```
//!
//! # Decoder contract
//!
//! Every decoder takes a slice and returns `(value, bytes_consumed)`. No
//! decoder reads beyond the slice; truncated input yields
//! [`EncodingError::UnexpectedEndOfData`], a tag of the wrong type or class
//! yields [`EncodingError::InvalidTag`], and payloads wider than the widest
//! supported integer yield [`EncodingError::InvalidLength`].

pub mod constructed;
pub mod value;

use core::fmt;

#[cfg(feature = "std")]
use std::error::Error;

#[cfg(not(feature = "std"))]
use alloc::{string::String, string::ToString, vec::Vec};

/// Result type for encoding operations
pub type Result<T> = core::result::Result<T, EncodingError>;

/// Errors that can occur during encoding/decoding operations
#[derive(Debug, Clone, PartialEq)]
pub enum EncodingError {
    /// Encoded output would exceed an imposed size limit
    BufferOverflow,
    /// Invalid tag number or class encountered
    InvalidTag,
    /// Tag present but not the expected one
    TagMismatch,
    /// Invalid length value
    InvalidLength,
    /// Unexpected end of data during decoding
    UnexpectedEndOfData,
    /// Invalid encoding format
    InvalidFormat(String),
    /// Value out of valid range
    ValueOutOfRange,
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingError::BufferOverflow => write!(f, "Buffer overflow during encoding"),
            EncodingError::InvalidTag => write!(f, "Invalid tag encountered"),
            EncodingError::TagMismatch => write!(f, "Unexpected tag"),
            EncodingError::InvalidLength => write!(f, "Invalid length value"),
            EncodingError::UnexpectedEndOfData => write!(f, "Unexpected end of data"),
            EncodingError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            EncodingError::ValueOutOfRange => write!(f, "Value out of valid range"),
        }
    }
}

#[cfg(feature = "std")]
impl Error for EncodingError {}

/// BACnet application tag numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ApplicationTag {
    Null = 0,
    Boolean = 1,
    UnsignedInt = 2,
    SignedInt = 3,
    Real = 4,
    Double = 5,
    OctetString = 6,
    CharacterString = 7,
    BitString = 8,
    Enumerated = 9,
    Date = 10,
    Time = 11,
    ObjectIdentifier = 12,
    Reserved13 = 13,
    Reserved14 = 14,
    Reserved15 = 15,
}

impl TryFrom<u8> for ApplicationTag {
    type Error = EncodingError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ApplicationTag::Null),
            1 => Ok(ApplicationTag::Boolean),
            2 => Ok(ApplicationTag::UnsignedInt),
            3 => Ok(ApplicationTag::SignedInt),
            4 => Ok(ApplicationTag::Real),
            5 => Ok(ApplicationTag::Double),
            6 => Ok(ApplicationTag::OctetString),
            7 => Ok(ApplicationTag::CharacterString),
            8 => Ok(ApplicationTag::BitString),
            9 => Ok(ApplicationTag::Enumerated),
            10 => Ok(ApplicationTag::Date),
            11 => Ok(ApplicationTag::Time),
            12 => Ok(ApplicationTag::ObjectIdentifier),
            _ => Err(EncodingError::InvalidTag),
        }
    }
}

/// Class of an encoded tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagClass {
    /// Carries BACnet primitive type information
    Application,
    /// Carries a position number within a constructed type
    Context,
    /// Starts a constructed value
    Opening,
    /// Ends a constructed value
    Closing,
}

/// A decoded tag header.
///
/// `lvt` is the payload length for application/context tags, the boolean
/// value for the boolean application tag, and zero for opening/closing tags,
/// which never carry data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    pub number: u8,
    pub class: TagClass,
    pub lvt: u32,
}

impl Tag {
    pub fn application(tag: ApplicationTag, lvt: u32) -> Self {
        Self {
            number: tag as u8,
            class: TagClass::Application,
            lvt,
        }
    }

    pub fn context(number: u8, lvt: u32) -> Self {
        Self {
            number,
            class: TagClass::Context,
            lvt,
        }
    }

    pub fn opening(number: u8) -> Self {
        Self {
            number,
            class: TagClass::Opening,
            lvt: 0,
        }
    }

    pub fn closing(number: u8) -> Self {
        Self {
            number,
            class: TagClass::Closing,
            lvt: 0,
        }
    }

    pub fn is_application(&self, tag: ApplicationTag) -> bool {
        self.class == TagClass::Application && self.number == tag as u8
    }

    pub fn is_context(&self, number: u8) -> bool {
        self.class == TagClass::Context && self.number == number
    }

    pub fn is_opening(&self, number: u8) -> bool {
        self.class == TagClass::Opening && self.number == number
    }

    pub fn is_closing(&self, number: u8) -> bool {
        self.class == TagClass::Closing && self.number == number
    }

    /// Payload length in bytes (zero for opening/closing and boolean).
    pub fn value_len(&self) -> usize {
        match self.class {
            TagClass::Opening | TagClass::Closing => 0,
            TagClass::Application if self.number == ApplicationTag::Boolean as u8 => 0,
            _ => self.lvt as usize,
        }
    }

    /// Number of bytes the encoded tag header occupies.
    pub fn encoded_len(&self) -> usize {
        let mut len = 1;
        if self.number >= 15 {
            len += 1;
        }
        match self.class {
            TagClass::Opening | TagClass::Closing => len,
            TagClass::Application if self.number == ApplicationTag::Boolean as u8 => len,
            _ => {
                if self.lvt >= 5 {
                    if self.lvt < 254 {
                        len += 1;
                    } else if self.lvt < 65536 {
                        len += 3;
                    } else {
                        len += 5;
                    }
                }
                len
            }
        }
    }

    /// Encode the tag header, returning the number of bytes written.
    pub fn encode(&self, buffer: &mut Vec<u8>) -> usize {
        let start = buffer.len();
        let mut lead: u8 = if self.number >= 15 {
            0xF0
        } else {
            self.number << 4
        };

        match self.class {
            TagClass::Application => {
                if self.number == ApplicationTag::Boolean as u8 {
                    lead |= (self.lvt & 0x01) as u8;
                    buffer.push(lead);
                } else {
                    Self::push_with_length(buffer, lead, self.number, self.lvt);
                    return buffer.len() - start;
                }
            }
            TagClass::Context => {
                lead |= 0x08;
                Self::push_with_length(buffer, lead, self.number, self.lvt);
                return buffer.len() - start;
            }
            TagClass::Opening => {
                lead |= 0x08 | 0x06;
                buffer.push(lead);
            }
            TagClass::Closing => {
                lead |= 0x08 | 0x07;
                buffer.push(lead);
            }
        }
        if self.number >= 15 {
            buffer.push(self.number);
        }

        buffer.len() - start
    }

    fn push_with_length(buffer: &mut Vec<u8>, mut lead: u8, number: u8, lvt: u32) {
        if lvt < 5 {
            lead |= lvt as u8;
        } else {
            lead |= 5;
        }
        buffer.push(lead);
        if number >= 15 {
            buffer.push(number);
        }
        if lvt >= 5 {
            if lvt < 254 {
                buffer.push(lvt as u8);
            } else if lvt < 65536 {
                buffer.push(254);
                buffer.extend_from_slice(&(lvt as u16).to_be_bytes());
            } else {
                buffer.push(255);
                buffer.extend_from_slice(&lvt.to_be_bytes());
            }
        }
    }

    /// Decode a tag header from the front of `data`.
    pub fn decode(data: &[u8]) -> Result<(Tag, usize)> {
        if data.is_empty() {
            return Err(EncodingError::UnexpectedEndOfData);
        }

        let lead = data[0];
        let mut consumed = 1;

        let mut number = lead >> 4;
        if number == 0x0F {
            if data.len() < 2 {
                return Err(EncodingError::UnexpectedEndOfData);
            }
            number = data[1];
            if number == 255 {
                return Err(EncodingError::InvalidTag);
            }
            consumed += 1;
        }

        let context_class = (lead & 0x08) != 0;
        let nibble = lead & 0x07;

        // Opening/closing are context-class only and never carry data.
        if context_class && nibble == 6 {
            return Ok((Tag::opening(number), consumed));
        }
        if context_class && nibble == 7 {
            return Ok((Tag::closing(number), consumed));
        }
        if !context_class && nibble >= 6 {
            return Err(EncodingError::InvalidTag);
        }

        let lvt: u32 = if nibble == 5 {
            if data.len() < consumed + 1 {
                return Err(EncodingError::UnexpectedEndOfData);
            }
            let ext = data[consumed];
            consumed += 1;
            if ext < 254 {
                ext as u32
            } else if ext == 254 {
                if data.len() < consumed + 2 {
                    return Err(EncodingError::UnexpectedEndOfData);
                }
                let len = u16::from_be_bytes([data[consumed], data[consumed + 1]]) as u32;
                consumed += 2;
                len
            } else {
                if data.len() < consumed + 4 {
                    return Err(EncodingError::UnexpectedEndOfData);
                }
                let len = u32::from_be_bytes([
                    data[consumed],
                    data[consumed + 1],
                    data[consumed + 2],
                    data[consumed + 3],
                ]);
                consumed += 4;
                len
            }
        } else {
            nibble as u32
        };

        let class = if context_class {
            TagClass::Context
        } else {
            TagClass::Application
        };

        Ok((
            Tag {
                number,
                class,
                lvt,
            },
            consumed,
        ))
    }
}

/// Decode a tag and verify that its payload fits in the remaining slice.
pub fn decode_tag_checked(data: &[u8]) -> Result<(Tag, usize)> {
    let (tag, consumed) = Tag::decode(data)?;
    if data.len() < consumed + tag.value_len() {
        return Err(EncodingError::UnexpectedEndOfData);
    }
    Ok((tag, consumed))
}

// ---------------------------------------------------------------------------
// Content codecs shared by the application and context forms
// ---------------------------------------------------------------------------

/// Content bytes needed for an unsigned value, 1..=8.
pub fn unsigned_content_len(value: u64) -> usize {
    match value {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFF_FFFF => 3,
        0x100_0000..=0xFFFF_FFFF => 4,
        0x1_0000_0000..=0xFF_FFFF_FFFF => 5,
        0x100_0000_0000..=0xFFFF_FFFF_FFFF => 6,
        0x1_0000_0000_0000..=0xFF_FFFF_FFFF_FFFF => 7,
        _ => 8,
    }
}

/// Content bytes needed for a signed value, shortest that preserves sign.
pub fn signed_content_len(value: i64) -> usize {
    let mut len = 1;
    let mut v = value;
    while !(-128..=127).contains(&v) {
        len += 1;
        v >>= 8;
    }
    len
}

pub(crate) fn encode_unsigned_content(buffer: &mut Vec<u8>, value: u64) -> usize {
    let len = unsigned_content_len(value);
    buffer.extend_from_slice(&value.to_be_bytes()[8 - len..]);
    len
}

pub(crate) fn encode_signed_content(buffer: &mut Vec<u8>, value: i64) -> usize {
    let len = signed_content_len(value);
    buffer.extend_from_slice(&value.to_be_bytes()[8 - len..]);
    len
}

pub(crate) fn decode_unsigned_content(data: &[u8], len: usize) -> Result<u64> {
    if len == 0 || len > 8 {
        return Err(EncodingError::InvalidLength);
    }
    if data.len() < len {
        return Err(EncodingError::UnexpectedEndOfData);
    }
    let mut value: u64 = 0;
    for &byte in &data[..len] {
        value = (value << 8) | byte as u64;
    }
    Ok(value)
}

pub(crate) fn decode_signed_content(data: &[u8], len: usize) -> Result<i64> {
    if len == 0 || len > 8 {
        return Err(EncodingError::InvalidLength);
    }
    if data.len() < len {
        return Err(EncodingError::UnexpectedEndOfData);
    }
    let mut value: i64 = if data[0] & 0x80 != 0 { -1 } else { 0 };
    for &byte in &data[..len] {
        value = (value << 8) | byte as i64;
    }
    Ok(value)
}

pub(crate) fn decode_real_content(data: &[u8], len: usize) -> Result<f32> {
    if len != 4 {
        return Err(EncodingError::InvalidLength);
    }
    if data.len() < 4 {
        return Err(EncodingError::UnexpectedEndOfData);
    }
    Ok(f32::from_be_bytes([data[0], data[1], data[2], data[3]]))
}

pub(crate) fn decode_double_content(data: &[u8], len: usize) -> Result<f64> {
    if len != 8 {
        return Err(EncodingError::InvalidLength);
    }
    if data.len() < 8 {
        return Err(EncodingError::UnexpectedEndOfData);
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[..8]);
    Ok(f64::from_be_bytes(bytes))
}

pub(crate) fn decode_object_id_content(data: &[u8], len: usize) -> Result<(u16, u32)> {
    if len != 4 {
        return Err(EncodingError::InvalidLength);
    }
    if data.len() < 4 {
        return Err(EncodingError::UnexpectedEndOfData);
    }
    let raw = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    Ok(((raw >> 22) as u16, raw & crate::BACNET_MAX_INSTANCE))
}

pub(crate) fn decode_date_content(data: &[u8], len: usize) -> Result<Date> {
    if len != 4 {
        return Err(EncodingError::InvalidLength);
    }
    if data.len() < 4 {
        return Err(EncodingError::UnexpectedEndOfData);
    }
    Ok(Date {
        year: if data[0] == 0xFF {
            Date::UNSPECIFIED_YEAR
        } else {
            1900 + data[0] as u16
        },
        month: data[1],
        day: data[2],
        weekday: data[3],
    })
}

pub(crate) fn decode_time_content(data: &[u8], len: usize) -> Result<Time> {
    if len != 4 {
        return Err(EncodingError::InvalidLength);
    }
    if data.len() < 4 {
        return Err(EncodingError::UnexpectedEndOfData);
    }
    Ok(Time {
        hour: data[0],
        minute: data[1],
        second: data[2],
        hundredths: data[3],
    })
}

pub(crate) fn decode_character_string_content(data: &[u8], len: usize) -> Result<CharacterString> {
    if data.len() < len {
        return Err(EncodingError::UnexpectedEndOfData);
    }
    if len == 0 {
        // A zero-length payload has no encoding byte; treat as empty UTF-8.
        return Ok(CharacterString::default());
    }
    Ok(CharacterString {
        encoding: CharacterEncoding::from(data[0]),
        bytes: data[1..len].to_vec(),
    })
}

pub(crate) fn decode_bit_string_content(data: &[u8], len: usize) -> Result<BitString> {
    if len == 0 {
        return Err(EncodingError::InvalidLength);
    }
    if data.len() < len {
        return Err(EncodingError::UnexpectedEndOfData);
    }
    BitString::from_wire(data[0], &data[1..len])
}

pub(crate) fn decode_octet_string_content(data: &[u8], len: usize) -> Result<Vec<u8>> {
    if data.len() < len {
        return Err(EncodingError::UnexpectedEndOfData);
    }
    Ok(data[..len].to_vec())
}

// ---------------------------------------------------------------------------
// Application-tagged primitives
// ---------------------------------------------------------------------------

/// Encode an application-tagged Null
pub fn encode_application_null(buffer: &mut Vec<u8>) -> Result<usize> {
    Ok(Tag::application(ApplicationTag::Null, 0).encode(buffer))
}

/// Decode an application-tagged Null
pub fn decode_application_null(data: &[u8]) -> Result<usize> {
    let (tag, consumed) = Tag::decode(data)?;
    if !tag.is_application(ApplicationTag::Null) || tag.lvt != 0 {
        return Err(EncodingError::InvalidTag);
    }
    Ok(consumed)
}

/// Encode an application-tagged boolean; the value lives in the tag itself.
pub fn encode_application_boolean(buffer: &mut Vec<u8>, value: bool) -> Result<usize> {
    Ok(Tag::application(ApplicationTag::Boolean, value as u32).encode(buffer))
}

/// Decode an application-tagged boolean
pub fn decode_application_boolean(data: &[u8]) -> Result<(bool, usize)> {
    let (tag, consumed) = Tag::decode(data)?;
    if !tag.is_application(ApplicationTag::Boolean) {
        return Err(EncodingError::InvalidTag);
    }
    match tag.lvt {
        0 => Ok((false, consumed)),
        1 => Ok((true, consumed)),
        _ => Err(EncodingError::InvalidLength),
    }
}

/// Encode an application-tagged unsigned integer, minimal length.
pub fn encode_application_unsigned(buffer: &mut Vec<u8>, value: u64) -> Result<usize> {
    let len = unsigned_content_len(value) as u32;
    let mut written = Tag::application(ApplicationTag::UnsignedInt, len).encode(buffer);
    written += encode_unsigned_content(buffer, value);
    Ok(written)
}

/// Decode an application-tagged unsigned integer
pub fn decode_application_unsigned(data: &[u8]) -> Result<(u64, usize)> {
    let (tag, consumed) = Tag::decode(data)?;
    if !tag.is_application(ApplicationTag::UnsignedInt) {
        return Err(EncodingError::InvalidTag);
    }
    let value = decode_unsigned_content(&data[consumed..], tag.lvt as usize)?;
    Ok((value, consumed + tag.lvt as usize))
}

/// Encode an application-tagged signed integer, shortest sign-preserving form.
pub fn encode_application_signed(buffer: &mut Vec<u8>, value: i64) -> Result<usize> {
    let len = signed_content_len(value) as u32;
    let mut written = Tag::application(ApplicationTag::SignedInt, len).encode(buffer);
    written += encode_signed_content(buffer, value);
    Ok(written)
}

/// Decode an application-tagged signed integer
pub fn decode_application_signed(data: &[u8]) -> Result<(i64, usize)> {
    let (tag, consumed) = Tag::decode(data)?;
    if !tag.is_application(ApplicationTag::SignedInt) {
        return Err(EncodingError::InvalidTag);
    }
    let value = decode_signed_content(&data[consumed..], tag.lvt as usize)?;
    Ok((value, consumed + tag.lvt as usize))
}

/// Encode an application-tagged REAL
pub fn encode_application_real(buffer: &mut Vec<u8>, value: f32) -> Result<usize> {
    let written = Tag::application(ApplicationTag::Real, 4).encode(buffer);
    buffer.extend_from_slice(&value.to_be_bytes());
    Ok(written + 4)
}

/// Decode an application-tagged REAL
pub fn decode_application_real(data: &[u8]) -> Result<(f32, usize)> {
    let (tag, consumed) = Tag::decode(data)?;
    if !tag.is_application(ApplicationTag::Real) {
        return Err(EncodingError::InvalidTag);
    }
    let value = decode_real_content(&data[consumed..], tag.lvt as usize)?;
    Ok((value, consumed + 4))
}

/// Encode an application-tagged Double
pub fn encode_application_double(buffer: &mut Vec<u8>, value: f64) -> Result<usize> {
    let written = Tag::application(ApplicationTag::Double, 8).encode(buffer);
    buffer.extend_from_slice(&value.to_be_bytes());
    Ok(written + 8)
}

/// Decode an application-tagged Double
pub fn decode_application_double(data: &[u8]) -> Result<(f64, usize)> {
    let (tag, consumed) = Tag::decode(data)?;
    if !tag.is_application(ApplicationTag::Double) {
        return Err(EncodingError::InvalidTag);
    }
    let value = decode_double_content(&data[consumed..], tag.lvt as usize)?;
    Ok((value, consumed + 8))
}

/// Encode an application-tagged octet string
pub fn encode_application_octet_string(buffer: &mut Vec<u8>, value: &[u8]) -> Result<usize> {
    let written = Tag::application(ApplicationTag::OctetString, value.len() as u32).encode(buffer);
    buffer.extend_from_slice(value);
    Ok(written + value.len())
}

/// Decode an application-tagged octet string
pub fn decode_application_octet_string(data: &[u8]) -> Result<(Vec<u8>, usize)> {
    let (tag, consumed) = Tag::decode(data)?;
    if !tag.is_application(ApplicationTag::OctetString) {
        return Err(EncodingError::InvalidTag);
    }
    let value = decode_octet_string_content(&data[consumed..], tag.lvt as usize)?;
    Ok((value, consumed + tag.lvt as usize))
}

/// Encode an application-tagged character string; the tag length includes
/// the encoding byte.
pub fn encode_application_character_string(
    buffer: &mut Vec<u8>,
    value: &CharacterString,
) -> Result<usize> {
    let len = value.bytes.len() as u32 + 1;
    let written = Tag::application(ApplicationTag::CharacterString, len).encode(buffer);
    buffer.push(value.encoding.into());
    buffer.extend_from_slice(&value.bytes);
    Ok(written + len as usize)
}

/// Decode an application-tagged character string
pub fn decode_application_character_string(data: &[u8]) -> Result<(CharacterString, usize)> {
    let (tag, consumed) = Tag::decode(data)?;
    if !tag.is_application(ApplicationTag::CharacterString) {
        return Err(EncodingError::InvalidTag);
    }
    let value = decode_character_string_content(&data[consumed..], tag.lvt as usize)?;
    Ok((value, consumed + tag.lvt as usize))
}

/// Encode an application-tagged bit string
pub fn encode_application_bit_string(buffer: &mut Vec<u8>, value: &BitString) -> Result<usize> {
    let len = value.byte_len() as u32 + 1;
    let written = Tag::application(ApplicationTag::BitString, len).encode(buffer);
    buffer.push(value.unused_bits());
    buffer.extend_from_slice(value.bytes());
    Ok(written + len as usize)
}

/// Decode an application-tagged bit string
pub fn decode_application_bit_string(data: &[u8]) -> Result<(BitString, usize)> {
    let (tag, consumed) = Tag::decode(data)?;
    if !tag.is_application(ApplicationTag::BitString) {
        return Err(EncodingError::InvalidTag);
    }
    let value = decode_bit_string_content(&data[consumed..], tag.lvt as usize)?;
    Ok((value, consumed + tag.lvt as usize))
}

/// Encode an application-tagged enumerated value
pub fn encode_application_enumerated(buffer: &mut Vec<u8>, value: u32) -> Result<usize> {
    let len = unsigned_content_len(value as u64) as u32;
    let mut written = Tag::application(ApplicationTag::Enumerated, len).encode(buffer);
    written += encode_unsigned_content(buffer, value as u64);
    Ok(written)
}

/// Decode an application-tagged enumerated value
pub fn decode_application_enumerated(data: &[u8]) -> Result<(u32, usize)> {
    let (tag, consumed) = Tag::decode(data)?;
    if !tag.is_application(ApplicationTag::Enumerated) {
        return Err(EncodingError::InvalidTag);
    }
    let len = tag.lvt as usize;
    if len > 4 {
        return Err(EncodingError::InvalidLength);
    }
    let value = decode_unsigned_content(&data[consumed..], len)? as u32;
    Ok((value, consumed + len))
}

/// Encode an application-tagged Date
pub fn encode_application_date(buffer: &mut Vec<u8>, value: &Date) -> Result<usize> {
    let written = Tag::application(ApplicationTag::Date, 4).encode(buffer);
    buffer.extend_from_slice(&value.to_wire());
    Ok(written + 4)
}

/// Decode an application-tagged Date
pub fn decode_application_date(data: &[u8]) -> Result<(Date, usize)> {
    let (tag, consumed) = Tag::decode(data)?;
    if !tag.is_application(ApplicationTag::Date) {
        return Err(EncodingError::InvalidTag);
    }
    let value = decode_date_content(&data[consumed..], tag.lvt as usize)?;
    Ok((value, consumed + 4))
}

/// Encode an application-tagged Time
pub fn encode_application_time(buffer: &mut Vec<u8>, value: &Time) -> Result<usize> {
    let written = Tag::application(ApplicationTag::Time, 4).encode(buffer);
    buffer.extend_from_slice(&value.to_wire());
    Ok(written + 4)
}

/// Decode an application-tagged Time
pub fn decode_application_time(data: &[u8]) -> Result<(Time, usize)> {
    let (tag, consumed) = Tag::decode(data)?;
    if !tag.is_application(ApplicationTag::Time) {
        return Err(EncodingError::InvalidTag);
    }
    let value = decode_time_content(&data[consumed..], tag.lvt as usize)?;
    Ok((value, consumed + 4))
}

/// Encode an application-tagged object identifier
pub fn encode_application_object_id(
    buffer: &mut Vec<u8>,
    object_type: u16,
    instance: u32,
) -> Result<usize> {
    if object_type > crate::BACNET_MAX_OBJECT_TYPE || instance > crate::BACNET_MAX_INSTANCE {
        return Err(EncodingError::ValueOutOfRange);
    }
    let written = Tag::application(ApplicationTag::ObjectIdentifier, 4).encode(buffer);
    let raw = ((object_type as u32) << 22) | instance;
    buffer.extend_from_slice(&raw.to_be_bytes());
    Ok(written + 4)
}

/// Decode an application-tagged object identifier
pub fn decode_application_object_id(data: &[u8]) -> Result<((u16, u32), usize)> {
    let (tag, consumed) = Tag::decode(data)?;
    if !tag.is_application(ApplicationTag::ObjectIdentifier) {
        return Err(EncodingError::InvalidTag);
    }
    let value = decode_object_id_content(&data[consumed..], tag.lvt as usize)?;
    Ok((value, consumed + 4))
}

// ---------------------------------------------------------------------------
// Context-tagged primitives
// ---------------------------------------------------------------------------

/// Encode an opening tag for constructed data
pub fn encode_opening_tag(buffer: &mut Vec<u8>, number: u8) -> Result<usize> {
    Ok(Tag::opening(number).encode(buffer))
}

/// Encode a closing tag for constructed data
pub fn encode_closing_tag(buffer: &mut Vec<u8>, number: u8) -> Result<usize> {
    Ok(Tag::closing(number).encode(buffer))
}

/// True when the next tag is the opening tag of the given number.
pub fn is_opening_tag_number(data: &[u8], number: u8) -> bool {
    matches!(Tag::decode(data), Ok((tag, _)) if tag.is_opening(number))
}

/// True when the next tag is the closing tag of the given number.
pub fn is_closing_tag_number(data: &[u8], number: u8) -> bool {
    matches!(Tag::decode(data), Ok((tag, _)) if tag.is_closing(number))
}

fn expect_context_tag(data: &[u8], number: u8) -> Result<(Tag, usize)> {
    let (tag, consumed) = Tag::decode(data)?;
    if !tag.is_context(number) {
        return Err(EncodingError::TagMismatch);
    }
    Ok((tag, consumed))
}

/// Encode a context-tagged unsigned integer
pub fn encode_context_unsigned(buffer: &mut Vec<u8>, number: u8, value: u64) -> Result<usize> {
    let len = unsigned_content_len(value) as u32;
    let mut written = Tag::context(number, len).encode(buffer);
    written += encode_unsigned_content(buffer, value);
    Ok(written)
}

/// Decode a context-tagged unsigned integer with the expected tag number
pub fn decode_context_unsigned(data: &[u8], number: u8) -> Result<(u64, usize)> {
    let (tag, consumed) = expect_context_tag(data, number)?;
    let value = decode_unsigned_content(&data[consumed..], tag.lvt as usize)?;
    Ok((value, consumed + tag.lvt as usize))
}

/// Encode a context-tagged signed integer
pub fn encode_context_signed(buffer: &mut Vec<u8>, number: u8, value: i64) -> Result<usize> {
    let len = signed_content_len(value) as u32;
    let mut written = Tag::context(number, len).encode(buffer);
    written += encode_signed_content(buffer, value);
    Ok(written)
}

/// Decode a context-tagged signed integer with the expected tag number
pub fn decode_context_signed(data: &[u8], number: u8) -> Result<(i64, usize)> {
    let (tag, consumed) = expect_context_tag(data, number)?;
    let value = decode_signed_content(&data[consumed..], tag.lvt as usize)?;
    Ok((value, consumed + tag.lvt as usize))
}

/// Encode a context-tagged enumerated value
pub fn encode_context_enumerated(buffer: &mut Vec<u8>, number: u8, value: u32) -> Result<usize> {
    let len = unsigned_content_len(value as u64) as u32;
    let mut written = Tag::context(number, len).encode(buffer);
    written += encode_unsigned_content(buffer, value as u64);
    Ok(written)
}

/// Decode a context-tagged enumerated value with the expected tag number
pub fn decode_context_enumerated(data: &[u8], number: u8) -> Result<(u32, usize)> {
    let (tag, consumed) = expect_context_tag(data, number)?;
    let len = tag.lvt as usize;
    if len > 4 {
        return Err(EncodingError::InvalidLength);
    }
    let value = decode_unsigned_content(&data[consumed..], len)? as u32;
    Ok((value, consumed + len))
}

/// Encode a context-tagged boolean; unlike the application form it carries
/// one payload byte.
pub fn encode_context_boolean(buffer: &mut Vec<u8>, number: u8, value: bool) -> Result<usize> {
    let written = Tag::context(number, 1).encode(buffer);
    buffer.push(value as u8);
    Ok(written + 1)
}

/// Decode a context-tagged boolean with the expected tag number
pub fn decode_context_boolean(data: &[u8], number: u8) -> Result<(bool, usize)> {
    let (tag, consumed) = expect_context_tag(data, number)?;
    if tag.lvt != 1 {
        return Err(EncodingError::InvalidLength);
    }
    if data.len() < consumed + 1 {
        return Err(EncodingError::UnexpectedEndOfData);
    }
    Ok((data[consumed] != 0, consumed + 1))
}

/// Encode a context-tagged REAL
pub fn encode_context_real(buffer: &mut Vec<u8>, number: u8, value: f32) -> Result<usize> {
    let written = Tag::context(number, 4).encode(buffer);
    buffer.extend_from_slice(&value.to_be_bytes());
    Ok(written + 4)
}

/// Decode a context-tagged REAL with the expected tag number
pub fn decode_context_real(data: &[u8], number: u8) -> Result<(f32, usize)> {
    let (tag, consumed) = expect_context_tag(data, number)?;
    let value = decode_real_content(&data[consumed..], tag.lvt as usize)?;
    Ok((value, consumed + 4))
}

/// Encode a context-tagged Double
pub fn encode_context_double(buffer: &mut Vec<u8>, number: u8, value: f64) -> Result<usize> {
    let written = Tag::context(number, 8).encode(buffer);
    buffer.extend_from_slice(&value.to_be_bytes());
    Ok(written + 8)
}

/// Decode a context-tagged Double with the expected tag number
pub fn decode_context_double(data: &[u8], number: u8) -> Result<(f64, usize)> {
    let (tag, consumed) = expect_context_tag(data, number)?;
    let value = decode_double_content(&data[consumed..], tag.lvt as usize)?;
    Ok((value, consumed + 8))
}

/// Encode a context-tagged object identifier
pub fn encode_context_object_id(
    buffer: &mut Vec<u8>,
    number: u8,
    object_type: u16,
    instance: u32,
) -> Result<usize> {
    if object_type > crate::BACNET_MAX_OBJECT_TYPE || instance > crate::BACNET_MAX_INSTANCE {
        return Err(EncodingError::ValueOutOfRange);
    }
    let written = Tag::context(number, 4).encode(buffer);
    let raw = ((object_type as u32) << 22) | instance;
    buffer.extend_from_slice(&raw.to_be_bytes());
    Ok(written + 4)
}

/// Decode a context-tagged object identifier with the expected tag number
pub fn decode_context_object_id(data: &[u8], number: u8) -> Result<((u16, u32), usize)> {
    let (tag, consumed) = expect_context_tag(data, number)?;
    let value = decode_object_id_content(&data[consumed..], tag.lvt as usize)?;
    Ok((value, consumed + 4))
}

/// Encode a context-tagged character string
pub fn encode_context_character_string(
    buffer: &mut Vec<u8>,
    number: u8,
    value: &CharacterString,
) -> Result<usize> {
    let len = value.bytes.len() as u32 + 1;
    let written = Tag::context(number, len).encode(buffer);
    buffer.push(value.encoding.into());
    buffer.extend_from_slice(&value.bytes);
    Ok(written + len as usize)
}

/// Decode a context-tagged character string with the expected tag number
pub fn decode_context_character_string(
    data: &[u8],
    number: u8,
) -> Result<(CharacterString, usize)> {
    let (tag, consumed) = expect_context_tag(data, number)?;
    let value = decode_character_string_content(&data[consumed..], tag.lvt as usize)?;
    Ok((value, consumed + tag.lvt as usize))
}

/// Encode a context-tagged octet string
pub fn encode_context_octet_string(
    buffer: &mut Vec<u8>,
    number: u8,
    value: &[u8],
) -> Result<usize> {
    let written = Tag::context(number, value.len() as u32).encode(buffer);
    buffer.extend_from_slice(value);
    Ok(written + value.len())
}

/// Decode a context-tagged octet string with the expected tag number
pub fn decode_context_octet_string(data: &[u8], number: u8) -> Result<(Vec<u8>, usize)> {
    let (tag, consumed) = expect_context_tag(data, number)?;
    let value = decode_octet_string_content(&data[consumed..], tag.lvt as usize)?;
    Ok((value, consumed + tag.lvt as usize))
}

/// Encode a context-tagged Date
pub fn encode_context_date(buffer: &mut Vec<u8>, number: u8, value: &Date) -> Result<usize> {
    let written = Tag::context(number, 4).encode(buffer);
    buffer.extend_from_slice(&value.to_wire());
    Ok(written + 4)
}

/// Decode a context-tagged Date with the expected tag number
pub fn decode_context_date(data: &[u8], number: u8) -> Result<(Date, usize)> {
    let (tag, consumed) = expect_context_tag(data, number)?;
    let value = decode_date_content(&data[consumed..], tag.lvt as usize)?;
    Ok((value, consumed + 4))
}

/// Encode a context-tagged Time
pub fn encode_context_time(buffer: &mut Vec<u8>, number: u8, value: &Time) -> Result<usize> {
    let written = Tag::context(number, 4).encode(buffer);
    buffer.extend_from_slice(&value.to_wire());
    Ok(written + 4)
}

/// Decode a context-tagged Time with the expected tag number
pub fn decode_context_time(data: &[u8], number: u8) -> Result<(Time, usize)> {
    let (tag, consumed) = expect_context_tag(data, number)?;
    let value = decode_time_content(&data[consumed..], tag.lvt as usize)?;
    Ok((value, consumed + 4))
}

// ---------------------------------------------------------------------------
// Value types carried by the codec
// ---------------------------------------------------------------------------

/// Character string encodings carried in the first payload byte.
///
/// The wire byte round-trips verbatim even for encodings this crate cannot
/// transcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CharacterEncoding {
    Utf8,
    MsDbcs,
    JisX0208,
    Ucs4,
    Ucs2,
    Latin1,
    Other(u8),
}

impl From<u8> for CharacterEncoding {
    fn from(value: u8) -> Self {
        match value {
            0 => CharacterEncoding::Utf8,
            1 => CharacterEncoding::MsDbcs,
            2 => CharacterEncoding::JisX0208,
            3 => CharacterEncoding::Ucs4,
            4 => CharacterEncoding::Ucs2,
            5 => CharacterEncoding::Latin1,
            other => CharacterEncoding::Other(other),
        }
    }
}

impl From<CharacterEncoding> for u8 {
    fn from(value: CharacterEncoding) -> Self {
        match value {
            CharacterEncoding::Utf8 => 0,
            CharacterEncoding::MsDbcs => 1,
            CharacterEncoding::JisX0208 => 2,
            CharacterEncoding::Ucs4 => 3,
            CharacterEncoding::Ucs2 => 4,
            CharacterEncoding::Latin1 => 5,
            CharacterEncoding::Other(other) => other,
        }
    }
}

/// A BACnet character string: raw payload bytes plus their declared encoding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CharacterString {
    pub encoding: CharacterEncoding,
    pub bytes: Vec<u8>,
}

impl Default for CharacterEncoding {
    fn default() -> Self {
        CharacterEncoding::Utf8
    }
}

impl CharacterString {
    pub fn new(text: &str) -> Self {
        Self {
            encoding: CharacterEncoding::Utf8,
            bytes: text.as_bytes().to_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Transcode to a Rust string where the encoding is supported.
    pub fn to_text(&self) -> Option<String> {
        match self.encoding {
            CharacterEncoding::Utf8 => Some(String::from_utf8_lossy(&self.bytes).into_owned()),
            CharacterEncoding::Latin1 => Some(encoding_rs::mem::decode_latin1(&self.bytes).into_owned()),
            CharacterEncoding::Ucs2 => {
                let (text, _, _) = encoding_rs::UTF_16BE.decode(&self.bytes);
                Some(text.into_owned())
            }
            _ => None,
        }
    }
}

impl From<&str> for CharacterString {
    fn from(text: &str) -> Self {
        CharacterString::new(text)
    }
}

impl fmt::Display for CharacterString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Some(text) => write!(f, "{}", text),
            None => write!(f, "0x{}", hex::encode(&self.bytes)),
        }
    }
}

/// A BACnet bit string, MSB-first within each byte.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BitString {
    data: Vec<u8>,
    bit_count: usize,
}

impl BitString {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the wire form: unused-bit count plus payload bytes.
    pub fn from_wire(unused_bits: u8, bytes: &[u8]) -> Result<Self> {
        if unused_bits > 7 {
            return Err(EncodingError::InvalidFormat(
                "unused bits must be 0..7".to_string(),
            ));
        }
        if bytes.is_empty() && unused_bits != 0 {
            return Err(EncodingError::InvalidLength);
        }
        Ok(Self {
            data: bytes.to_vec(),
            bit_count: bytes.len() * 8 - unused_bits as usize,
        })
    }

    pub fn from_bits(bits: &[bool]) -> Self {
        let mut value = Self::new();
        for (i, &bit) in bits.iter().enumerate() {
            value.set_bit(i, bit);
        }
        value
    }

    /// Number of significant bits.
    pub fn len(&self) -> usize {
        self.bit_count
    }

    pub fn is_empty(&self) -> bool {
        self.bit_count == 0
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn unused_bits(&self) -> u8 {
        ((8 - (self.bit_count % 8)) % 8) as u8
    }

    pub fn bit(&self, index: usize) -> bool {
        if index >= self.bit_count {
            return false;
        }
        (self.data[index / 8] & (0x80 >> (index % 8))) != 0
    }

    /// Set a bit, growing the string as needed.
    pub fn set_bit(&mut self, index: usize, value: bool) {
        while self.data.len() <= index / 8 {
            self.data.push(0);
        }
        if index >= self.bit_count {
            self.bit_count = index + 1;
        }
        if value {
            self.data[index / 8] |= 0x80 >> (index % 8);
        } else {
            self.data[index / 8] &= !(0x80 >> (index % 8));
        }
    }
}

/// BACnet date with wildcard support.
///
/// A field value of 255 is "any". Months 13 and 14 select odd and even
/// months, days 32 and 33 select odd and even days of the month. Weekday
/// runs 1 (Monday) to 7 (Sunday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub weekday: u8,
}

impl Date {
    pub const UNSPECIFIED_YEAR: u16 = 255;
    pub const WILDCARD: u8 = 255;
    pub const MONTH_ODD: u8 = 13;
    pub const MONTH_EVEN: u8 = 14;
    pub const DAY_ODD: u8 = 32;
    pub const DAY_EVEN: u8 = 33;

    pub fn new(year: u16, month: u8, day: u8, weekday: u8) -> Self {
        Self {
            year,
            month,
            day,
            weekday,
        }
    }

    /// A date with every field wild.
    pub fn unspecified() -> Self {
        Self {
            year: Self::UNSPECIFIED_YEAR,
            month: Self::WILDCARD,
            day: Self::WILDCARD,
            weekday: Self::WILDCARD,
        }
    }

    pub fn is_unspecified(&self) -> bool {
        self.year == Self::UNSPECIFIED_YEAR
            && self.month == Self::WILDCARD
            && self.day == Self::WILDCARD
            && self.weekday == Self::WILDCARD
    }

    pub fn has_wildcards(&self) -> bool {
        self.year == Self::UNSPECIFIED_YEAR
            || self.month >= Self::MONTH_ODD
            || self.day >= Self::DAY_ODD
            || self.weekday == Self::WILDCARD
    }

    pub(crate) fn to_wire(self) -> [u8; 4] {
        let year = if self.year == Self::UNSPECIFIED_YEAR {
            0xFF
        } else {
            (self.year - 1900) as u8
        };
        [year, self.month, self.day, self.weekday]
    }

    /// Whether `self`, treated as a pattern, matches the concrete `date`.
    pub fn matches(&self, date: &Date) -> bool {
        if self.year != Self::UNSPECIFIED_YEAR && self.year != date.year {
            return false;
        }
        let month_ok = match self.month {
            Self::WILDCARD => true,
            Self::MONTH_ODD => date.month % 2 == 1,
            Self::MONTH_EVEN => date.month % 2 == 0,
            m => m == date.month,
        };
        if !month_ok {
            return false;
        }
        let day_ok = match self.day {
            Self::WILDCARD => true,
            Self::DAY_ODD => date.day % 2 == 1,
            Self::DAY_EVEN => date.day % 2 == 0,
            d => d == date.day,
        };
        if !day_ok {
            return false;
        }
        self.weekday == Self::WILDCARD || self.weekday == date.weekday
    }

    /// Today's local date.
    #[cfg(feature = "std")]
    pub fn today() -> Self {
        use chrono::Datelike;
        let now = chrono::Local::now().date_naive();
        Self {
            year: now.year() as u16,
            month: now.month() as u8,
            day: now.day() as u8,
            weekday: now.weekday().number_from_monday() as u8,
        }
    }
}

impl Default for Date {
    fn default() -> Self {
        Self::unspecified()
    }
}

/// BACnet time; any field may be 255 ("any").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Time {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub hundredths: u8,
}

impl Time {
    pub const WILDCARD: u8 = 255;

    pub fn new(hour: u8, minute: u8, second: u8, hundredths: u8) -> Self {
        Self {
            hour,
            minute,
            second,
            hundredths,
        }
    }

    pub fn unspecified() -> Self {
        Self {
            hour: Self::WILDCARD,
            minute: Self::WILDCARD,
            second: Self::WILDCARD,
            hundredths: Self::WILDCARD,
        }
    }

    pub fn is_unspecified(&self) -> bool {
        self.hour == Self::WILDCARD
            && self.minute == Self::WILDCARD
            && self.second == Self::WILDCARD
            && self.hundredths == Self::WILDCARD
    }

    pub fn has_wildcards(&self) -> bool {
        self.hour == Self::WILDCARD
            || self.minute == Self::WILDCARD
            || self.second == Self::WILDCARD
            || self.hundredths == Self::WILDCARD
    }

    pub(crate) fn to_wire(self) -> [u8; 4] {
        [self.hour, self.minute, self.second, self.hundredths]
    }

    /// The current local time.
    #[cfg(feature = "std")]
    pub fn now() -> Self {
        use chrono::Timelike;
        let now = chrono::Local::now().time();
        Self {
            hour: now.hour() as u8,
            minute: now.minute() as u8,
            second: now.second() as u8,
            hundredths: (now.nanosecond() / 10_000_000) as u8,
        }
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::unspecified()
    }
}
