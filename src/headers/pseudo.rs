use crate::headers::IPPROTO_UDP;

pub const PSEUDO_HEADER_LEN: usize = 12;

/// Checksum-only header binding a UDP checksum to the enclosing IP addresses.
/// Never transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PseudoHeader {
    pub source: [u8; 4],
    pub destination: [u8; 4],
    pub protocol: u8,
    /// UDP length (header + payload), host order.
    pub length: u16,
}

impl PseudoHeader {
    pub fn udp(source: [u8; 4], destination: [u8; 4], length: u16) -> Self {
        Self {
            source,
            destination,
            protocol: IPPROTO_UDP,
            length,
        }
    }

    /// Network order layout: source, destination, zero pad, protocol, length.
    pub fn to_bytes(&self) -> [u8; PSEUDO_HEADER_LEN] {
        let mut bytes = [0; PSEUDO_HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.source);
        bytes[4..8].copy_from_slice(&self.destination);
        bytes[9] = self.protocol;
        bytes[10..12].copy_from_slice(&self.length.to_be_bytes());
        bytes
    }
}
