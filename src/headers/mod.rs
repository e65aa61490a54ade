pub mod ethernet;
pub mod ipv4;
pub mod pseudo;
pub mod udp;

use thiserror::Error;

/// IANA protocol number of UDP.
pub const IPPROTO_UDP: u8 = 17;

/// Reasons a byte range can't be viewed as the requested header.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("buffer too short: {needed} bytes needed, {captured} captured")]
    TooShort { needed: usize, captured: usize },
    #[error("IP version {0} is not supported")]
    BadVersion(u8),
    #[error("IP header length {header_len} inconsistent with {captured} captured bytes")]
    HeaderLenInconsistent { header_len: usize, captured: usize },
    #[error("IP total length {total_len} inconsistent with header length {header_len} and {captured} captured bytes")]
    TotalLenInconsistent {
        total_len: usize,
        header_len: usize,
        captured: usize,
    },
    #[error("UDP length {udp_len} inconsistent with {available} available bytes")]
    LengthInconsistent { udp_len: usize, available: usize },
}

/// Reads the network order `u16` at `offset`.
pub(crate) fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([bytes[offset], bytes[offset + 1]])
}

/// Writes `value` in network order at `offset`.
pub(crate) fn write_u16(bytes: &mut [u8], offset: usize, value: u16) {
    bytes[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

/// Swaps two equally long, non-overlapping ranges of `bytes`.
pub(crate) fn swap_ranges(bytes: &mut [u8], a: usize, b: usize, len: usize) {
    debug_assert!(a + len <= b);
    let (head, tail) = bytes.split_at_mut(b);
    head[a..a + len].swap_with_slice(&mut tail[..len]);
}
