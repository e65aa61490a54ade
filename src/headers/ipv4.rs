use std::net::Ipv4Addr;

use crate::craft::checksums::checksum;
use crate::headers::{read_u16, swap_ranges, write_u16, ParseError};

/// Minimum length of an IPv4 header (no options).
pub const IPV4_MIN_HEADER_LEN: usize = 20;

const TOTAL_LEN: usize = 2;
const IDENTIFICATION: usize = 4;
const FLAGS_FRAGMENT: usize = 6;
const TTL: usize = 8;
const PROTOCOL: usize = 9;
const CHECKSUM: usize = 10;
const SOURCE: usize = 12;
const DESTINATION: usize = 16;

const MORE_FRAGMENTS: u16 = 0x2000;
const FRAGMENT_OFFSET: u16 = 0x1fff;

/// A validated IPv4 datagram inside a frame buffer.
///
/// The buffer is split into two disjoint regions so that the header and the payload
/// can be borrowed mutably at the same time.
#[derive(Debug)]
pub struct Ipv4Packet<'a> {
    pub header: Ipv4Header<'a>,
    /// Bytes between the end of the header and the declared total length.
    pub payload: &'a mut [u8],
}

impl<'a> Ipv4Packet<'a> {
    /// Validates the IPv4 header at the start of `frame`.
    ///
    /// The frame must hold at least 20 bytes, carry version 4, and declare header and total
    /// lengths that fit in the captured bytes. Bytes past the total length are left out.
    pub fn parse(frame: &'a mut [u8]) -> Result<Self, ParseError> {
        let captured = frame.len();
        if captured < IPV4_MIN_HEADER_LEN {
            return Err(ParseError::TooShort {
                needed: IPV4_MIN_HEADER_LEN,
                captured,
            });
        }

        let version = frame[0] >> 4;
        if version != 4 {
            return Err(ParseError::BadVersion(version));
        }

        let header_len = usize::from(frame[0] & 0x0f) * 4;
        if header_len < IPV4_MIN_HEADER_LEN || header_len > captured {
            return Err(ParseError::HeaderLenInconsistent {
                header_len,
                captured,
            });
        }

        let total_len = usize::from(read_u16(frame, TOTAL_LEN));
        if total_len < header_len || total_len > captured {
            return Err(ParseError::TotalLenInconsistent {
                total_len,
                header_len,
                captured,
            });
        }

        let (header, rest) = frame[..total_len].split_at_mut(header_len);
        Ok(Self {
            header: Ipv4Header { bytes: header },
            payload: rest,
        })
    }
}

/// Accessors over the `ihl * 4` header bytes; multi-byte fields stay in network order in the
/// buffer and are converted here.
#[derive(Debug)]
pub struct Ipv4Header<'a> {
    bytes: &'a mut [u8],
}

impl Ipv4Header<'_> {
    /// Header length in bytes (IHL field times four).
    pub fn header_len(&self) -> usize {
        usize::from(self.bytes[0] & 0x0f) * 4
    }

    pub fn total_len(&self) -> u16 {
        read_u16(self.bytes, TOTAL_LEN)
    }

    pub fn identification(&self) -> u16 {
        read_u16(self.bytes, IDENTIFICATION)
    }

    pub fn set_identification(&mut self, id: u16) {
        write_u16(self.bytes, IDENTIFICATION, id);
    }

    /// True if this datagram is one piece of a fragmented one.
    pub fn is_fragment(&self) -> bool {
        let flags_fragment = read_u16(self.bytes, FLAGS_FRAGMENT);
        flags_fragment & MORE_FRAGMENTS != 0 || flags_fragment & FRAGMENT_OFFSET != 0
    }

    pub fn ttl(&self) -> u8 {
        self.bytes[TTL]
    }

    pub fn set_ttl(&mut self, ttl: u8) {
        self.bytes[TTL] = ttl;
    }

    pub fn protocol(&self) -> u8 {
        self.bytes[PROTOCOL]
    }

    pub fn set_protocol(&mut self, protocol: u8) {
        self.bytes[PROTOCOL] = protocol;
    }

    pub fn checksum(&self) -> u16 {
        read_u16(self.bytes, CHECKSUM)
    }

    pub fn set_checksum(&mut self, checksum: u16) {
        write_u16(self.bytes, CHECKSUM, checksum);
    }

    pub fn source(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.source_octets())
    }

    pub fn destination(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.destination_octets())
    }

    pub fn source_octets(&self) -> [u8; 4] {
        let mut octets = [0; 4];
        octets.copy_from_slice(&self.bytes[SOURCE..SOURCE + 4]);
        octets
    }

    pub fn destination_octets(&self) -> [u8; 4] {
        let mut octets = [0; 4];
        octets.copy_from_slice(&self.bytes[DESTINATION..DESTINATION + 4]);
        octets
    }

    pub fn swap_addresses(&mut self) {
        swap_ranges(self.bytes, SOURCE, DESTINATION, 4);
    }

    /// Checksum of the header bytes as they are now (the checksum field included).
    ///
    /// Zero the checksum field first to compute a fresh one; a header with a valid checksum
    /// yields zero.
    pub fn compute_checksum(&self) -> u16 {
        checksum(self.bytes)
    }
}
