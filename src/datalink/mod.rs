//! Data Link Layer contract
//!
//! The core is datalink-agnostic: BACnet/IP, MS/TP, Ethernet or BACnet/SC
//! drivers live outside this crate and plug in through the [`DataLink`]
//! trait. The core only needs to send an NPDU+APDU to an opaque
//! [`BacnetAddress`], receive frames with a source address, and drive the
//! driver's maintenance timer.

use core::fmt;

use crate::network::Npdu;

#[cfg(feature = "std")]
use std::error::Error;

#[cfg(not(feature = "std"))]
use alloc::{collections::VecDeque, vec::Vec};

#[cfg(feature = "std")]
use std::collections::VecDeque;

/// Result type for datalink operations
pub type Result<T> = core::result::Result<T, DataLinkError>;

/// Errors surfaced by datalink drivers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLinkError {
    /// Frame exceeds the link MTU
    FrameTooLarge,
    /// The driver cannot send right now
    SendFailed,
    /// The driver is not up
    NotConnected,
}

impl fmt::Display for DataLinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataLinkError::FrameTooLarge => write!(f, "Frame exceeds MTU"),
            DataLinkError::SendFailed => write!(f, "Send failed"),
            DataLinkError::NotConnected => write!(f, "Datalink not connected"),
        }
    }
}

#[cfg(feature = "std")]
impl Error for DataLinkError {}

const MAX_MAC_LEN: usize = 7;

/// Opaque transport address: a local MAC plus an optional remote-network
/// `(net, adr)` pair filled in by routers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BacnetAddress {
    /// Remote network number; 0 means the local network
    pub net: u16,
    mac: [u8; MAX_MAC_LEN],
    mac_len: u8,
    adr: [u8; MAX_MAC_LEN],
    adr_len: u8,
}

impl BacnetAddress {
    /// An address on the local network.
    pub fn local(mac: &[u8]) -> Self {
        let mut address = Self::default();
        address.set_mac(mac);
        address
    }

    /// An address on a remote network behind a router.
    pub fn remote(net: u16, adr: &[u8]) -> Self {
        let mut address = Self::default();
        address.net = net;
        address.set_adr(adr);
        address
    }

    /// The local-broadcast address (zero-length MAC).
    pub fn broadcast() -> Self {
        Self::default()
    }

    pub fn set_mac(&mut self, mac: &[u8]) {
        let len = mac.len().min(MAX_MAC_LEN);
        self.mac[..len].copy_from_slice(&mac[..len]);
        self.mac_len = len as u8;
    }

    pub fn set_adr(&mut self, adr: &[u8]) {
        let len = adr.len().min(MAX_MAC_LEN);
        self.adr[..len].copy_from_slice(&adr[..len]);
        self.adr_len = len as u8;
    }

    pub fn mac(&self) -> &[u8] {
        &self.mac[..self.mac_len as usize]
    }

    pub fn adr(&self) -> &[u8] {
        &self.adr[..self.adr_len as usize]
    }

    pub fn is_broadcast(&self) -> bool {
        self.mac_len == 0 && self.net == 0
    }

    /// Address equivalence: `(net, adr)` tuples when remote, MAC otherwise.
    pub fn matches(&self, other: &BacnetAddress) -> bool {
        if self.net != 0 || other.net != 0 {
            self.net == other.net && self.adr() == other.adr()
        } else {
            self.mac() == other.mac()
        }
    }
}

impl fmt::Display for BacnetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.net != 0 {
            write!(f, "net {} adr {}", self.net, hex::encode(self.adr()))
        } else if self.mac_len == 0 {
            write!(f, "broadcast")
        } else {
            write!(f, "mac {}", hex::encode(self.mac()))
        }
    }
}

/// The contract every datalink driver provides to the core.
pub trait DataLink {
    /// Send an NPDU-framed PDU; returns bytes handed to the medium.
    fn send_pdu(&mut self, dest: &BacnetAddress, npdu: &Npdu, pdu: &[u8]) -> Result<usize>;

    /// Receive one frame, blocking up to `timeout_ms`; `None` on timeout.
    fn receive(&mut self, timeout_ms: u32) -> Result<Option<(BacnetAddress, Vec<u8>)>>;

    /// This station's address.
    fn my_address(&self) -> BacnetAddress;

    /// Driver housekeeping (foreign-device re-registration and the like).
    fn maintenance_timer(&mut self, _seconds_elapsed: u32) {}
}

/// In-memory datalink used by tests and examples: frames sent come back out
/// of [`LoopbackLink::take_sent`], frames pushed with
/// [`LoopbackLink::inject`] come back from [`DataLink::receive`].
#[derive(Debug, Default)]
pub struct LoopbackLink {
    address: BacnetAddress,
    inbound: VecDeque<(BacnetAddress, Vec<u8>)>,
    sent: VecDeque<(BacnetAddress, Vec<u8>)>,
}

impl LoopbackLink {
    pub fn new(mac: &[u8]) -> Self {
        Self {
            address: BacnetAddress::local(mac),
            inbound: VecDeque::new(),
            sent: VecDeque::new(),
        }
    }

    /// Queue a frame for the next `receive` call.
    pub fn inject(&mut self, source: BacnetAddress, mpdu: Vec<u8>) {
        self.inbound.push_back((source, mpdu));
    }

    /// Drain the frames sent through this link, oldest first.
    pub fn take_sent(&mut self) -> Vec<(BacnetAddress, Vec<u8>)> {
        self.sent.drain(..).collect()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.len()
    }
}

impl DataLink for LoopbackLink {
    fn send_pdu(&mut self, dest: &BacnetAddress, npdu: &Npdu, pdu: &[u8]) -> Result<usize> {
        let mut mpdu = npdu.encode();
        mpdu.extend_from_slice(pdu);
        if mpdu.len() > crate::BACNET_MAX_MPDU {
            return Err(DataLinkError::FrameTooLarge);
        }
        log::trace!("loopback send {} bytes to {}", mpdu.len(), dest);
        let len = mpdu.len();
        self.sent.push_back((*dest, mpdu));
        Ok(len)
    }

    fn receive(&mut self, _timeout_ms: u32) -> Result<Option<(BacnetAddress, Vec<u8>)>> {
        Ok(self.inbound.pop_front())
    }

    fn my_address(&self) -> BacnetAddress {
        self.address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_matching_local() {
        let a = BacnetAddress::local(&[0xC0, 0xA8, 0x00, 0x01, 0xBA, 0xC0]);
        let b = BacnetAddress::local(&[0xC0, 0xA8, 0x00, 0x01, 0xBA, 0xC0]);
        let c = BacnetAddress::local(&[0xC0, 0xA8, 0x00, 0x02, 0xBA, 0xC0]);
        assert!(a.matches(&b));
        assert!(!a.matches(&c));
    }

    #[test]
    fn test_address_matching_remote() {
        let a = BacnetAddress::remote(5, &[0x42]);
        let b = BacnetAddress::remote(5, &[0x42]);
        let c = BacnetAddress::remote(6, &[0x42]);
        // Remote match ignores the router MAC used to reach the network.
        let mut b_via_other_router = b;
        b_via_other_router.set_mac(&[0x0A]);
        assert!(a.matches(&b));
        assert!(a.matches(&b_via_other_router));
        assert!(!a.matches(&c));
    }

    #[test]
    fn test_broadcast_address() {
        assert!(BacnetAddress::broadcast().is_broadcast());
        assert!(!BacnetAddress::local(&[1]).is_broadcast());
    }

    #[test]
    fn test_loopback_link() {
        let mut link = LoopbackLink::new(&[0x01]);
        let dest = BacnetAddress::local(&[0x02]);
        let npdu = Npdu::for_request(true);

        let sent_len = link.send_pdu(&dest, &npdu, &[0xDE, 0xAD]).unwrap();
        assert_eq!(sent_len, 4);

        let frames = link.take_sent();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].1[2..], [0xDE, 0xAD]);

        link.inject(dest, frames[0].1.clone());
        let (source, mpdu) = link.receive(0).unwrap().unwrap();
        assert!(source.matches(&dest));
        assert_eq!(mpdu.len(), 4);
        assert!(link.receive(0).unwrap().is_none());
    }
}
