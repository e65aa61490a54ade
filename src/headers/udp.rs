use crate::headers::{read_u16, write_u16, ParseError};

pub const UDP_HEADER_LEN: usize = 8;

const SOURCE_PORT: usize = 0;
const DESTINATION_PORT: usize = 2;
const LENGTH: usize = 4;
const CHECKSUM: usize = 6;

/// A validated UDP datagram: header plus exactly `length - 8` payload bytes.
#[derive(Debug)]
pub struct UdpDatagram<'a> {
    bytes: &'a mut [u8],
}

impl<'a> UdpDatagram<'a> {
    /// Validates the UDP header at the start of `ip_payload` (the bytes after the IP header,
    /// bounded by the IP total length).
    pub fn parse(ip_payload: &'a mut [u8]) -> Result<Self, ParseError> {
        let available = ip_payload.len();
        if available < UDP_HEADER_LEN {
            return Err(ParseError::TooShort {
                needed: UDP_HEADER_LEN,
                captured: available,
            });
        }

        let udp_len = usize::from(read_u16(ip_payload, LENGTH));
        if udp_len < UDP_HEADER_LEN || udp_len > available {
            return Err(ParseError::LengthInconsistent { udp_len, available });
        }

        Ok(Self {
            bytes: &mut ip_payload[..udp_len],
        })
    }

    pub fn source_port(&self) -> u16 {
        read_u16(self.bytes, SOURCE_PORT)
    }

    pub fn destination_port(&self) -> u16 {
        read_u16(self.bytes, DESTINATION_PORT)
    }

    pub fn swap_ports(&mut self) {
        let source = self.source_port();
        let destination = self.destination_port();
        write_u16(self.bytes, SOURCE_PORT, destination);
        write_u16(self.bytes, DESTINATION_PORT, source);
    }

    /// Value of the length field (header included).
    pub fn length(&self) -> u16 {
        read_u16(self.bytes, LENGTH)
    }

    /// Number of payload bytes after the header.
    pub fn data_len(&self) -> usize {
        self.bytes.len() - UDP_HEADER_LEN
    }

    pub fn checksum(&self) -> u16 {
        read_u16(self.bytes, CHECKSUM)
    }

    pub fn set_checksum(&mut self, checksum: u16) {
        write_u16(self.bytes, CHECKSUM, checksum);
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[UDP_HEADER_LEN..]
    }

    /// Header and payload, `length` bytes in total.
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes
    }
}
