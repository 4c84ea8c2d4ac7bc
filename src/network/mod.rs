//! BACnet Network Layer (thin framing adapter)
//!
//! Just enough NPDU handling for the application layer to address replies:
//! version byte, control octet, optional DNET/DADR and SNET/SADR pairs and
//! the hop count. Cross-network routing is a router's job, not this crate's;
//! the APDU handler only needs to know where a frame came from and whether a
//! reply is expected.

use core::fmt;

#[cfg(feature = "std")]
use std::error::Error;

#[cfg(not(feature = "std"))]
use alloc::{format, string::String, string::ToString, vec::Vec};

/// Result type for network operations
pub type Result<T> = core::result::Result<T, NetworkError>;

/// Errors that can occur in network operations
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkError {
    /// Invalid NPDU format
    InvalidNpdu(String),
    /// Network-layer message where an APDU was expected
    NotApplicationMessage,
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::InvalidNpdu(msg) => write!(f, "Invalid NPDU: {}", msg),
            NetworkError::NotApplicationMessage => {
                write!(f, "Network-layer message, no APDU present")
            }
        }
    }
}

#[cfg(feature = "std")]
impl Error for NetworkError {}

/// NPDU control octet flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NpduControl {
    /// Frame carries a network-layer message instead of an APDU
    pub network_message: bool,
    /// DNET/DADR pair present
    pub destination_present: bool,
    /// SNET/SADR pair present
    pub source_present: bool,
    /// Sender expects a reply frame
    pub expecting_reply: bool,
    /// Network priority, 0 (normal) to 3 (life safety)
    pub priority: u8,
}

impl NpduControl {
    pub fn to_byte(self) -> u8 {
        let mut byte = self.priority & 0x03;
        if self.network_message {
            byte |= 0x80;
        }
        if self.destination_present {
            byte |= 0x20;
        }
        if self.source_present {
            byte |= 0x08;
        }
        if self.expecting_reply {
            byte |= 0x04;
        }
        byte
    }

    pub fn from_byte(byte: u8) -> Self {
        Self {
            network_message: (byte & 0x80) != 0,
            destination_present: (byte & 0x20) != 0,
            source_present: (byte & 0x08) != 0,
            expecting_reply: (byte & 0x04) != 0,
            priority: byte & 0x03,
        }
    }
}

/// Network address (network number + MAC address)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NetworkAddress {
    /// Network number (0 = local network, 65535 = broadcast)
    pub network: u16,
    /// MAC address on that network
    pub address: Vec<u8>,
}

impl NetworkAddress {
    pub fn new(network: u16, address: Vec<u8>) -> Self {
        Self { network, address }
    }

    pub fn is_broadcast(&self) -> bool {
        self.network == 0xFFFF
    }

    pub fn is_local(&self) -> bool {
        self.network == 0
    }
}

/// Network Protocol Data Unit header
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Npdu {
    /// Protocol version (always 1)
    pub version: u8,
    pub control: NpduControl,
    pub destination: Option<NetworkAddress>,
    pub source: Option<NetworkAddress>,
    /// Only present with a destination
    pub hop_count: Option<u8>,
}

impl Npdu {
    pub fn new() -> Self {
        Self {
            version: crate::BACNET_PROTOCOL_VERSION,
            ..Default::default()
        }
    }

    /// Header for a locally-delivered request; `expecting_reply` set for
    /// confirmed services.
    pub fn for_request(expecting_reply: bool) -> Self {
        Self {
            version: crate::BACNET_PROTOCOL_VERSION,
            control: NpduControl {
                expecting_reply,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Header for a global broadcast.
    pub fn global_broadcast() -> Self {
        Self {
            version: crate::BACNET_PROTOCOL_VERSION,
            control: NpduControl {
                destination_present: true,
                ..Default::default()
            },
            destination: Some(NetworkAddress::new(0xFFFF, Vec::new())),
            source: None,
            hop_count: Some(255),
        }
    }

    /// Header for the reply to a frame, routing back via the frame's SNET
    /// when it came through a router.
    pub fn reply_to(request: &Npdu) -> Self {
        Self {
            version: crate::BACNET_PROTOCOL_VERSION,
            control: NpduControl {
                destination_present: request.source.is_some(),
                ..Default::default()
            },
            destination: request.source.clone(),
            source: None,
            hop_count: request.source.as_ref().map(|_| 255),
        }
    }

    pub fn is_network_message(&self) -> bool {
        self.control.network_message
    }

    /// Encode the NPDU header to bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        buffer.push(self.version);

        let mut control = self.control;
        control.destination_present = self.destination.is_some();
        control.source_present = self.source.is_some();
        buffer.push(control.to_byte());

        if let Some(ref dest) = self.destination {
            buffer.extend_from_slice(&dest.network.to_be_bytes());
            buffer.push(dest.address.len() as u8);
            buffer.extend_from_slice(&dest.address);
        }
        if let Some(ref src) = self.source {
            buffer.extend_from_slice(&src.network.to_be_bytes());
            buffer.push(src.address.len() as u8);
            buffer.extend_from_slice(&src.address);
        }
        if self.destination.is_some() {
            buffer.push(self.hop_count.unwrap_or(255));
        }

        buffer
    }

    /// Decode an NPDU header, returning it and the header length.
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < 2 {
            return Err(NetworkError::InvalidNpdu("NPDU too short".to_string()));
        }

        let version = data[0];
        if version != crate::BACNET_PROTOCOL_VERSION {
            return Err(NetworkError::InvalidNpdu(format!(
                "Invalid NPDU version: {}",
                version
            )));
        }
        let control = NpduControl::from_byte(data[1]);
        let mut pos = 2;

        let mut read_address = |pos: &mut usize| -> Result<NetworkAddress> {
            if *pos + 3 > data.len() {
                return Err(NetworkError::InvalidNpdu("truncated address".to_string()));
            }
            let network = u16::from_be_bytes([data[*pos], data[*pos + 1]]);
            *pos += 2;
            let len = data[*pos] as usize;
            *pos += 1;
            if *pos + len > data.len() {
                return Err(NetworkError::InvalidNpdu(
                    "truncated address bytes".to_string(),
                ));
            }
            let address = data[*pos..*pos + len].to_vec();
            *pos += len;
            Ok(NetworkAddress::new(network, address))
        };

        let destination = if control.destination_present {
            Some(read_address(&mut pos)?)
        } else {
            None
        };
        let source = if control.source_present {
            Some(read_address(&mut pos)?)
        } else {
            None
        };
        let hop_count = if control.destination_present {
            if pos >= data.len() {
                return Err(NetworkError::InvalidNpdu("missing hop count".to_string()));
            }
            let hops = data[pos];
            pos += 1;
            Some(hops)
        } else {
            None
        };

        Ok((
            Self {
                version,
                control,
                destination,
                source,
                hop_count,
            },
            pos,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "std"))]
    use alloc::vec;

    #[test]
    fn test_npdu_minimal_roundtrip() {
        let npdu = Npdu::for_request(true);
        let encoded = npdu.encode();
        assert_eq!(encoded, [0x01, 0x04]);

        let (decoded, consumed) = Npdu::decode(&encoded).unwrap();
        assert_eq!(consumed, 2);
        assert!(decoded.control.expecting_reply);
        assert!(decoded.destination.is_none());
    }

    #[test]
    fn test_npdu_global_broadcast() {
        let npdu = Npdu::global_broadcast();
        let encoded = npdu.encode();
        assert_eq!(encoded, [0x01, 0x20, 0xFF, 0xFF, 0x00, 0xFF]);

        let (decoded, _) = Npdu::decode(&encoded).unwrap();
        assert!(decoded.destination.unwrap().is_broadcast());
        assert_eq!(decoded.hop_count, Some(255));
    }

    #[test]
    fn test_npdu_routed_reply() {
        let request = Npdu {
            version: 1,
            control: NpduControl {
                source_present: true,
                expecting_reply: true,
                ..Default::default()
            },
            destination: None,
            source: Some(NetworkAddress::new(5, vec![0x42])),
            hop_count: None,
        };

        let reply = Npdu::reply_to(&request);
        assert_eq!(reply.destination, Some(NetworkAddress::new(5, vec![0x42])));
        assert_eq!(reply.hop_count, Some(255));

        let encoded = reply.encode();
        let (decoded, consumed) = Npdu::decode(&encoded).unwrap();
        assert_eq!(consumed, encoded.len());
        assert_eq!(decoded.destination, reply.destination);
    }

    #[test]
    fn test_npdu_rejects_bad_version() {
        assert!(Npdu::decode(&[0x02, 0x00]).is_err());
    }

    #[test]
    fn test_npdu_truncated_address() {
        assert!(Npdu::decode(&[0x01, 0x20, 0xFF]).is_err());
    }
}
