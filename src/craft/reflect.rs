use std::net::SocketAddrV4;

use log::debug;
use thiserror::Error;

use crate::config::LinkMode;
use crate::craft::checksums::Checksum;
use crate::headers::ethernet::{
    mac_from_dec_to_hex, EthernetFrame, ETHERNET_HEADER_LEN, ETHERTYPE_IPV4,
};
use crate::headers::ipv4::Ipv4Packet;
use crate::headers::pseudo::PseudoHeader;
use crate::headers::udp::UdpDatagram;
use crate::headers::{ParseError, IPPROTO_UDP};

/// TTL of every reflected datagram.
pub const REFLECTED_TTL: u8 = 64;

/// Why a frame was not reflected. Drops are never fatal.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    #[error("malformed Ethernet frame: {0}")]
    MalformedEthernet(ParseError),
    #[error("unsupported EtherType {0:#06x}")]
    UnsupportedEtherType(u16),
    #[error("malformed IP datagram: {0}")]
    MalformedIp(ParseError),
    #[error("unsupported IP protocol {0}")]
    UnsupportedProtocol(u8),
    #[error("fragmented IP datagram")]
    Fragmented,
    #[error("malformed UDP datagram: {0}")]
    MalformedUdp(ParseError),
}

/// Outcome of a successful reflection; the frame buffer itself was rewritten in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReflectedFrame {
    /// Number of bytes of the buffer to write back.
    pub len: usize,
    /// Source of the reflected datagram (the original destination).
    pub source: SocketAddrV4,
    /// Destination of the reflected datagram (the original source).
    pub destination: SocketAddrV4,
    /// UDP payload length.
    pub data_len: usize,
    pub ip_checksum: u16,
    pub udp_checksum: u16,
}

/// Turns UDP datagrams around: swaps addresses and ports and recomputes both checksums.
#[derive(Debug, Clone, Copy)]
pub struct Reflector {
    mode: LinkMode,
    verbose: bool,
}

impl Reflector {
    pub fn new(mode: LinkMode, verbose: bool) -> Self {
        Self { mode, verbose }
    }

    /// Reflects the frame in place.
    ///
    /// On `Err` the frame may have been inspected but was not modified.
    pub fn reflect(&self, frame: &mut [u8]) -> Result<ReflectedFrame, DropReason> {
        match self.mode {
            LinkMode::Tun => self.reflect_ip(frame),
            LinkMode::Tap => self.reflect_ethernet(frame),
        }
    }

    fn reflect_ethernet(&self, frame: &mut [u8]) -> Result<ReflectedFrame, DropReason> {
        let EthernetFrame {
            mut header,
            payload,
        } = EthernetFrame::parse(frame).map_err(DropReason::MalformedEthernet)?;

        let ether_type = header.ether_type();
        if ether_type != ETHERTYPE_IPV4 {
            return Err(DropReason::UnsupportedEtherType(ether_type));
        }

        let reflected = self.reflect_ip(payload)?;
        header.swap_addresses();
        if self.verbose {
            debug!(
                "MAC: {} ---> {}",
                mac_from_dec_to_hex(header.source()),
                mac_from_dec_to_hex(header.destination())
            );
        }

        Ok(ReflectedFrame {
            len: ETHERNET_HEADER_LEN + reflected.len,
            ..reflected
        })
    }

    fn reflect_ip(&self, datagram: &mut [u8]) -> Result<ReflectedFrame, DropReason> {
        let Ipv4Packet {
            mut header,
            payload,
        } = Ipv4Packet::parse(datagram).map_err(DropReason::MalformedIp)?;

        // only UDP gets past this point
        let protocol = header.protocol();
        if protocol != IPPROTO_UDP {
            return Err(DropReason::UnsupportedProtocol(protocol));
        }
        if header.is_fragment() {
            return Err(DropReason::Fragmented);
        }

        let mut udp = UdpDatagram::parse(payload).map_err(DropReason::MalformedUdp)?;
        let data_len = udp.data_len();

        if self.verbose {
            debug!(
                "Recv: {}:{} ---> {}:{} ttl: {} csum: {:04x} udp csum: {:04x}",
                header.source(),
                udp.source_port(),
                header.destination(),
                udp.destination_port(),
                header.ttl(),
                header.checksum(),
                udp.checksum()
            );
            debug!("Data: {}", String::from_utf8_lossy(udp.payload()));
        }

        // the pseudo header already reflects the swapped addresses
        let pseudo_header = PseudoHeader::udp(
            header.destination_octets(),
            header.source_octets(),
            udp.length(),
        );

        // UDP header
        udp.set_checksum(0);
        udp.swap_ports();
        let udp_checksum = match Checksum::new()
            .add_bytes(&pseudo_header.to_bytes())
            .add_bytes(udp.as_bytes())
            .finish()
        {
            // zero means "no checksum" for UDP
            0 => 0xffff,
            sum => sum,
        };
        udp.set_checksum(udp_checksum);

        // IP header
        header.set_checksum(0);
        header.swap_addresses();
        header.set_ttl(REFLECTED_TTL);
        header.set_identification(header.identification().wrapping_add(1));
        header.set_protocol(IPPROTO_UDP);
        let ip_checksum = header.compute_checksum();
        header.set_checksum(ip_checksum);

        let reflected = ReflectedFrame {
            len: usize::from(header.total_len()),
            source: SocketAddrV4::new(header.source(), udp.source_port()),
            destination: SocketAddrV4::new(header.destination(), udp.destination_port()),
            data_len,
            ip_checksum,
            udp_checksum,
        };

        if self.verbose {
            debug!(
                "Send: {} ---> {} csum: {ip_checksum:04x}",
                reflected.source, reflected.destination
            );
        }

        Ok(reflected)
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use etherparse::{Ipv4HeaderSlice, UdpHeaderSlice};

    use super::*;
    use crate::craft::checksums::checksum;

    /// Builds an IPv4/UDP datagram with a valid IP checksum and a zero UDP checksum.
    fn udp_datagram(
        source: ([u8; 4], u16),
        destination: ([u8; 4], u16),
        id: u16,
        payload: &[u8],
    ) -> Vec<u8> {
        let udp_len = u16::try_from(8 + payload.len()).unwrap();
        let total_len = 20 + udp_len;
        #[rustfmt::skip]
        let mut datagram = vec![
            0x45, 0x00,                 // version, header length, tos
            0x00, 0x00,                 // total length (set below)
            0x00, 0x00, 0x00, 0x00,     // identification (set below), fragmentation
            0x40, 0x11,                 // ttl and protocol
            0x00, 0x00,                 // header checksum (set below)
            0x00, 0x00, 0x00, 0x00,     // source (set below)
            0x00, 0x00, 0x00, 0x00,     // dest (set below)
            0x00, 0x00,                 // src port (set below)
            0x00, 0x00,                 // dst port (set below)
            0x00, 0x00,                 // UDP length (set below)
            0x00, 0x00,                 // UDP checksum
        ];
        datagram[2..4].copy_from_slice(&total_len.to_be_bytes());
        datagram[4..6].copy_from_slice(&id.to_be_bytes());
        datagram[12..16].copy_from_slice(&source.0);
        datagram[16..20].copy_from_slice(&destination.0);
        datagram[20..22].copy_from_slice(&source.1.to_be_bytes());
        datagram[22..24].copy_from_slice(&destination.1.to_be_bytes());
        datagram[24..26].copy_from_slice(&udp_len.to_be_bytes());
        datagram.extend_from_slice(payload);
        let sum = checksum(&datagram[..20]);
        datagram[10..12].copy_from_slice(&sum.to_be_bytes());
        datagram
    }

    fn end_to_end_input() -> Vec<u8> {
        udp_datagram(([10, 0, 0, 1], 1234), ([10, 0, 0, 2], 5678), 1, &[])
    }

    /// Checks both checksums of a reflected datagram, independently of this crate's engine.
    fn assert_checksums_valid(datagram: &[u8]) {
        let ip = Ipv4HeaderSlice::from_slice(datagram).unwrap();
        assert_eq!(ip.to_header().calc_header_checksum(), ip.header_checksum());
        assert_eq!(checksum(ip.slice()), 0);

        let header_len = ip.slice().len();
        let total_len = usize::from(ip.total_len());
        let udp = UdpHeaderSlice::from_slice(&datagram[header_len..total_len]).unwrap();
        let payload = &datagram[header_len + 8..total_len];
        assert_eq!(
            udp.to_header()
                .calc_checksum_ipv4_raw(ip.source(), ip.destination(), payload)
                .unwrap(),
            udp.checksum()
        );

        let pseudo_header = PseudoHeader::udp(ip.source(), ip.destination(), udp.length());
        let mut sum = Checksum::new();
        sum.add_bytes(&pseudo_header.to_bytes())
            .add_bytes(&datagram[header_len..total_len]);
        assert_eq!(sum.finish(), 0);
    }

    #[test]
    fn test_end_to_end_scenario() {
        let mut frame = end_to_end_input();
        let reflector = Reflector::new(LinkMode::Tun, false);

        let reflected = reflector.reflect(&mut frame).unwrap();

        assert_eq!(reflected.len, 28);
        assert_eq!(
            reflected.source,
            SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 2), 5678)
        );
        assert_eq!(
            reflected.destination,
            SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 1234)
        );
        assert_eq!(reflected.data_len, 0);
        assert_eq!(reflected.ip_checksum, 0x66cd);
        assert_eq!(reflected.udp_checksum, 0xd0db);

        #[rustfmt::skip]
        let expected: [u8; 28] = [
            0x45, 0x00, 0x00, 0x1c,
            0x00, 0x02, 0x00, 0x00,
            0x40, 0x11, 0x66, 0xcd,
            10, 0, 0, 2,
            10, 0, 0, 1,
            0x16, 0x2e, 0x04, 0xd2,
            0x00, 0x08, 0xd0, 0xdb,
        ];
        assert_eq!(frame, expected);
        assert_checksums_valid(&frame);
    }

    #[test]
    fn test_round_trip_with_payload() {
        let mut frame = udp_datagram(
            ([192, 168, 1, 113], 40000),
            ([10, 0, 0, 3], 7),
            0x1234,
            b"hello, reflector",
        );
        let original = frame.clone();
        let reflected = Reflector::new(LinkMode::Tun, true)
            .reflect(&mut frame)
            .unwrap();

        assert_eq!(reflected.len, original.len());
        assert_eq!(reflected.data_len, 16);
        let ip = Ipv4HeaderSlice::from_slice(&frame).unwrap();
        assert_eq!(ip.source(), [10, 0, 0, 3]);
        assert_eq!(ip.destination(), [192, 168, 1, 113]);
        assert_eq!(ip.ttl(), REFLECTED_TTL);
        assert_eq!(ip.identification(), 0x1235);
        assert_eq!(ip.total_len(), 44);
        let udp = UdpHeaderSlice::from_slice(&frame[20..]).unwrap();
        assert_eq!(udp.source_port(), 7);
        assert_eq!(udp.destination_port(), 40000);
        assert_eq!(udp.length(), 24);
        assert_eq!(&frame[28..], &original[28..]);
        assert_checksums_valid(&frame);
    }

    #[test]
    fn test_odd_payload_length() {
        let mut frame = udp_datagram(([10, 0, 0, 1], 53), ([10, 0, 0, 2], 53), 9, b"abc");
        Reflector::new(LinkMode::Tun, false)
            .reflect(&mut frame)
            .unwrap();
        assert_checksums_valid(&frame);
    }

    #[test]
    fn test_ttl_reset_and_id_wraps() {
        let mut frame = udp_datagram(([10, 0, 0, 1], 1), ([10, 0, 0, 2], 2), 0xffff, b"x");
        frame[8] = 3;

        Reflector::new(LinkMode::Tun, false)
            .reflect(&mut frame)
            .unwrap();
        assert_eq!(frame[8], 64);
        assert_eq!(&frame[4..6], &[0x00, 0x00]);
        assert_checksums_valid(&frame);
    }

    #[test]
    fn test_header_with_options() {
        let mut frame = udp_datagram(([10, 0, 0, 1], 1000), ([10, 0, 0, 2], 2000), 5, b"opt");
        // insert a 4 bytes option (NOP x3 + EOL) and fix lengths
        let udp = frame.split_off(20);
        frame.extend_from_slice(&[0x01, 0x01, 0x01, 0x00]);
        frame.extend(udp);
        frame[0] = 0x46;
        let total_len = u16::try_from(frame.len()).unwrap();
        frame[2..4].copy_from_slice(&total_len.to_be_bytes());

        let reflected = Reflector::new(LinkMode::Tun, false)
            .reflect(&mut frame)
            .unwrap();
        assert_eq!(reflected.len, frame.len());
        assert_eq!(&frame[20..24], &[0x01, 0x01, 0x01, 0x00]);
        assert_eq!(checksum(&frame[..24]), 0);
        assert_eq!(reflected.destination.port(), 1000);
        assert_checksums_valid(&frame);
    }

    #[test]
    fn test_trailing_bytes_not_reflected() {
        let mut frame = end_to_end_input();
        frame.extend_from_slice(&[0xee; 10]);
        let reflected = Reflector::new(LinkMode::Tun, false)
            .reflect(&mut frame)
            .unwrap();
        assert_eq!(reflected.len, 28);
        assert_eq!(&frame[28..], &[0xee; 10]);
        assert_checksums_valid(&frame[..reflected.len]);
    }

    #[test]
    fn test_unsupported_protocol_untouched() {
        for protocol in [1, 6, 41, 255] {
            let mut frame = end_to_end_input();
            frame[9] = protocol;
            let original = frame.clone();
            assert_eq!(
                Reflector::new(LinkMode::Tun, false).reflect(&mut frame),
                Err(DropReason::UnsupportedProtocol(protocol))
            );
            assert_eq!(frame, original);
        }
    }

    #[test]
    fn test_unsupported_protocol_with_garbage_after_header() {
        // nothing beyond the IP header is looked at
        let mut frame = end_to_end_input();
        frame[9] = 6;
        frame[24..26].copy_from_slice(&[0xff, 0xff]);
        assert_eq!(
            Reflector::new(LinkMode::Tun, false).reflect(&mut frame),
            Err(DropReason::UnsupportedProtocol(6))
        );
    }

    #[test]
    fn test_malformed_ip_untouched() {
        let reflector = Reflector::new(LinkMode::Tun, false);

        let mut short = end_to_end_input()[..19].to_vec();
        assert!(matches!(
            reflector.reflect(&mut short),
            Err(DropReason::MalformedIp(ParseError::TooShort { .. }))
        ));

        let mut ipv6 = end_to_end_input();
        ipv6[0] = 0x60;
        assert_eq!(
            reflector.reflect(&mut ipv6),
            Err(DropReason::MalformedIp(ParseError::BadVersion(6)))
        );

        let mut long_header = end_to_end_input();
        long_header[0] = 0x48;
        let original = long_header.clone();
        assert!(matches!(
            reflector.reflect(&mut long_header),
            Err(DropReason::MalformedIp(
                ParseError::HeaderLenInconsistent { .. }
            ))
        ));
        assert_eq!(long_header, original);

        let mut long_total = end_to_end_input();
        long_total[2..4].copy_from_slice(&100u16.to_be_bytes());
        let original = long_total.clone();
        assert!(matches!(
            reflector.reflect(&mut long_total),
            Err(DropReason::MalformedIp(
                ParseError::TotalLenInconsistent { .. }
            ))
        ));
        assert_eq!(long_total, original);
    }

    #[test]
    fn test_malformed_udp_untouched() {
        let reflector = Reflector::new(LinkMode::Tun, false);

        let mut long_udp = udp_datagram(([10, 0, 0, 1], 1), ([10, 0, 0, 2], 2), 1, b"abcd");
        long_udp[24..26].copy_from_slice(&13u16.to_be_bytes());
        let original = long_udp.clone();
        assert_eq!(
            reflector.reflect(&mut long_udp),
            Err(DropReason::MalformedUdp(ParseError::LengthInconsistent {
                udp_len: 13,
                available: 12
            }))
        );
        assert_eq!(long_udp, original);

        let mut short_udp = udp_datagram(([10, 0, 0, 1], 1), ([10, 0, 0, 2], 2), 1, b"abcd");
        short_udp[24..26].copy_from_slice(&4u16.to_be_bytes());
        assert!(matches!(
            reflector.reflect(&mut short_udp),
            Err(DropReason::MalformedUdp(
                ParseError::LengthInconsistent { udp_len: 4, .. }
            ))
        ));

        // total length leaves no room for a UDP header
        let mut no_udp = end_to_end_input();
        no_udp[2..4].copy_from_slice(&24u16.to_be_bytes());
        assert!(matches!(
            reflector.reflect(&mut no_udp),
            Err(DropReason::MalformedUdp(ParseError::TooShort { .. }))
        ));
    }

    #[test]
    fn test_fragments_dropped() {
        let mut frame = end_to_end_input();
        frame[6] = 0x20;
        let original = frame.clone();
        assert_eq!(
            Reflector::new(LinkMode::Tun, false).reflect(&mut frame),
            Err(DropReason::Fragmented)
        );
        assert_eq!(frame, original);
    }

    #[rustfmt::skip]
    fn ethernet_header(ether_type: u16) -> Vec<u8> {
        let mut header = vec![
            0x02, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa,     // destination
            0x02, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb,     // source
        ];
        header.extend_from_slice(&ether_type.to_be_bytes());
        header
    }

    #[test]
    fn test_tap_mode_swaps_macs() {
        let mut frame = ethernet_header(ETHERTYPE_IPV4);
        frame.extend(udp_datagram(([10, 0, 0, 1], 1234), ([10, 0, 0, 2], 5678), 1, b"tap"));

        let reflected = Reflector::new(LinkMode::Tap, true)
            .reflect(&mut frame)
            .unwrap();

        assert_eq!(reflected.len, 14 + 31);
        assert_eq!(&frame[0..6], &[0x02, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb]);
        assert_eq!(&frame[6..12], &[0x02, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa]);
        assert_eq!(&frame[12..14], &[0x08, 0x00]);
        assert_eq!(reflected.destination.port(), 1234);
        assert_checksums_valid(&frame[14..]);
    }

    #[test]
    fn test_tap_mode_drops() {
        let reflector = Reflector::new(LinkMode::Tap, false);

        let mut arp = ethernet_header(0x0806);
        arp.extend_from_slice(&[0; 28]);
        let original = arp.clone();
        assert_eq!(
            reflector.reflect(&mut arp),
            Err(DropReason::UnsupportedEtherType(0x0806))
        );
        assert_eq!(arp, original);

        let mut runt = ethernet_header(ETHERTYPE_IPV4)[..10].to_vec();
        assert!(matches!(
            reflector.reflect(&mut runt),
            Err(DropReason::MalformedEthernet(ParseError::TooShort { .. }))
        ));

        // IP errors keep MACs untouched
        let mut bad_ip = ethernet_header(ETHERTYPE_IPV4);
        bad_ip.extend_from_slice(&[0x45; 10]);
        let original = bad_ip.clone();
        assert!(matches!(
            reflector.reflect(&mut bad_ip),
            Err(DropReason::MalformedIp(_))
        ));
        assert_eq!(bad_ip, original);
    }

    #[test]
    fn test_drop_reason_display() {
        assert_eq!(
            DropReason::UnsupportedProtocol(6).to_string(),
            "unsupported IP protocol 6"
        );
        assert_eq!(
            DropReason::UnsupportedEtherType(0x86dd).to_string(),
            "unsupported EtherType 0x86dd"
        );
    }
}
