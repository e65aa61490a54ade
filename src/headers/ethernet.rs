use std::fmt::Write;

use crate::headers::{read_u16, swap_ranges, ParseError};

pub const ETHERNET_HEADER_LEN: usize = 14;
pub const ETHERTYPE_IPV4: u16 = 0x0800;

/// Ethernet II header of a frame read from a TAP interface.
#[derive(Debug)]
pub struct EthernetFrame<'a> {
    pub header: EthernetHeader<'a>,
    pub payload: &'a mut [u8],
}

impl<'a> EthernetFrame<'a> {
    pub fn parse(frame: &'a mut [u8]) -> Result<Self, ParseError> {
        let captured = frame.len();
        if captured < ETHERNET_HEADER_LEN {
            return Err(ParseError::TooShort {
                needed: ETHERNET_HEADER_LEN,
                captured,
            });
        }
        let (header, payload) = frame.split_at_mut(ETHERNET_HEADER_LEN);
        Ok(Self {
            header: EthernetHeader { bytes: header },
            payload,
        })
    }
}

#[derive(Debug)]
pub struct EthernetHeader<'a> {
    bytes: &'a mut [u8],
}

impl EthernetHeader<'_> {
    pub fn destination(&self) -> [u8; 6] {
        let mut mac = [0; 6];
        mac.copy_from_slice(&self.bytes[0..6]);
        mac
    }

    pub fn source(&self) -> [u8; 6] {
        let mut mac = [0; 6];
        mac.copy_from_slice(&self.bytes[6..12]);
        mac
    }

    pub fn ether_type(&self) -> u16 {
        read_u16(self.bytes, 12)
    }

    pub fn swap_addresses(&mut self) {
        swap_ranges(self.bytes, 0, 6, 6);
    }
}

/// Converts a MAC address in its hexadecimal form
pub fn mac_from_dec_to_hex(mac_dec: [u8; 6]) -> String {
    let mut mac_hex = String::new();
    for n in &mac_dec {
        let _ = write!(mac_hex, "{n:02x}:");
    }
    mac_hex.pop();
    mac_hex
}
