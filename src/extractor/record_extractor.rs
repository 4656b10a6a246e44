//! Frame to record extraction.

use pnet::packet::ethernet::EtherTypes;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::ipv6::Ipv6Packet;
use pnet::packet::Packet;

use super::link::network_payload;
use crate::capture::Frame;
use crate::domain::{format_timestamp, protocol_name, Record};

/// Addresses and protocol read from a network-layer header.
struct NetworkFields {
    src: String,
    dst: String,
    protocol: String,
}

/// Map one frame to a record.
///
/// IPv4 is tried before IPv6. Frames with neither (ARP, LLDP, truncated
/// headers, unsupported link types) yield `None`; this is not an error.
/// The record's length is the frame's on-wire length.
pub fn extract(frame: &Frame) -> Option<Record> {
    let (ethertype, payload) = network_payload(frame.link_type, &frame.data)?;

    let fields = if ethertype == EtherTypes::Ipv4 {
        ipv4_fields(payload)?
    } else if ethertype == EtherTypes::Ipv6 {
        ipv6_fields(payload)?
    } else {
        return None;
    };

    Some(Record {
        timestamp: format_timestamp(&frame.timestamp),
        src_ip: fields.src,
        dst_ip: fields.dst,
        protocol: fields.protocol,
        length: frame.wire_len,
    })
}

fn ipv4_fields(payload: &[u8]) -> Option<NetworkFields> {
    let ip = Ipv4Packet::new(payload)?;
    if ip.get_version() != 4 || ip.get_header_length() < 5 {
        return None;
    }

    Some(NetworkFields {
        src: ip.get_source().to_string(),
        dst: ip.get_destination().to_string(),
        protocol: protocol_name(ip.get_next_level_protocol()).into_owned(),
    })
}

fn ipv6_fields(payload: &[u8]) -> Option<NetworkFields> {
    let ip = Ipv6Packet::new(payload)?;
    if ip.get_version() != 6 {
        return None;
    }

    // An IPv4 header carried directly inside IPv6 takes precedence.
    if ip.get_next_header() == IpNextHeaderProtocols::Ipv4 {
        if let Some(inner) = ipv4_fields(ip.payload()) {
            return Some(inner);
        }
    }

    Some(NetworkFields {
        src: ip.get_source().to_string(),
        dst: ip.get_destination().to_string(),
        protocol: protocol_name(ip.get_next_header()).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use pcap_parser::Linktype;

    fn ipv4_header(protocol: u8, src: [u8; 4], dst: [u8; 4], payload_len: usize) -> Vec<u8> {
        let total = (20 + payload_len) as u16;
        let mut h = vec![0x45, 0x00];
        h.extend_from_slice(&total.to_be_bytes());
        h.extend_from_slice(&[0x00, 0x01, 0x40, 0x00, 64, protocol, 0x00, 0x00]);
        h.extend_from_slice(&src);
        h.extend_from_slice(&dst);
        h.extend(std::iter::repeat(0u8).take(payload_len));
        h
    }

    fn ipv6_header(next_header: u8, src: [u8; 16], dst: [u8; 16], payload: &[u8]) -> Vec<u8> {
        let mut h = vec![0x60, 0x00, 0x00, 0x00];
        h.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        h.extend_from_slice(&[next_header, 64]);
        h.extend_from_slice(&src);
        h.extend_from_slice(&dst);
        h.extend_from_slice(payload);
        h
    }

    fn ethernet(ethertype: u16, payload: &[u8]) -> Vec<u8> {
        let mut f = vec![0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x02, 0x00, 0x00, 0x00, 0x00, 0x01];
        f.extend_from_slice(&ethertype.to_be_bytes());
        f.extend_from_slice(payload);
        f
    }

    fn frame(link_type: Linktype, data: Vec<u8>, wire_len: u32) -> Frame {
        Frame {
            data,
            timestamp: DateTime::from_timestamp(1_709_294_400, 0).unwrap(),
            wire_len,
            link_type,
        }
    }

    fn v6(last: u8) -> [u8; 16] {
        let mut a = [0u8; 16];
        a[0] = 0x20;
        a[1] = 0x01;
        a[2] = 0x0d;
        a[3] = 0xb8;
        a[15] = last;
        a
    }

    #[test]
    fn test_ipv4_tcp() {
        let data = ethernet(0x0800, &ipv4_header(6, [192, 168, 1, 10], [10, 0, 0, 1], 20));
        let record = extract(&frame(Linktype::ETHERNET, data, 54)).unwrap();

        assert_eq!(record.timestamp, "2024-03-01T12:00:00Z");
        assert_eq!(record.src_ip, "192.168.1.10");
        assert_eq!(record.dst_ip, "10.0.0.1");
        assert_eq!(record.protocol, "TCP");
        assert_eq!(record.length, 54);
    }

    #[test]
    fn test_length_is_wire_length_not_captured_size() {
        // Snapped capture: only 34 bytes kept of a 1514-byte frame.
        let data = ethernet(0x0800, &ipv4_header(17, [1, 1, 1, 1], [8, 8, 8, 8], 0));
        let record = extract(&frame(Linktype::ETHERNET, data, 1514)).unwrap();
        assert_eq!(record.protocol, "UDP");
        assert_eq!(record.length, 1514);
    }

    #[test]
    fn test_ipv6_udp() {
        let data = ethernet(0x86dd, &ipv6_header(17, v6(1), v6(2), &[0u8; 8]));
        let record = extract(&frame(Linktype::ETHERNET, data, 70)).unwrap();

        assert_eq!(record.src_ip, "2001:db8::1");
        assert_eq!(record.dst_ip, "2001:db8::2");
        assert_eq!(record.protocol, "UDP");
        assert_eq!(record.length, 70);
    }

    #[test]
    fn test_ipv6_reports_first_next_header() {
        let data = ethernet(0x86dd, &ipv6_header(0, v6(1), v6(2), &[58, 0, 0, 0, 0, 0, 0, 0]));
        let record = extract(&frame(Linktype::ETHERNET, data, 70)).unwrap();
        assert_eq!(record.protocol, "HOPOPT");
    }

    #[test]
    fn test_ipv4_in_ipv6_prefers_inner_ipv4() {
        let inner = ipv4_header(1, [172, 16, 0, 1], [172, 16, 0, 2], 8);
        let data = ethernet(0x86dd, &ipv6_header(4, v6(1), v6(2), &inner));
        let record = extract(&frame(Linktype::ETHERNET, data, 122)).unwrap();

        assert_eq!(record.src_ip, "172.16.0.1");
        assert_eq!(record.protocol, "ICMP");
    }

    #[test]
    fn test_arp_yields_nothing() {
        let data = ethernet(0x0806, &[0u8; 28]);
        assert!(extract(&frame(Linktype::ETHERNET, data, 42)).is_none());
    }

    #[test]
    fn test_truncated_ipv4_yields_nothing() {
        let data = ethernet(0x0800, &[0x45, 0x00, 0x00]);
        assert!(extract(&frame(Linktype::ETHERNET, data, 17)).is_none());
    }

    #[test]
    fn test_wrong_version_nibble_yields_nothing() {
        let mut header = ipv4_header(6, [1, 2, 3, 4], [5, 6, 7, 8], 0);
        header[0] = 0x65;
        let data = ethernet(0x0800, &header);
        assert!(extract(&frame(Linktype::ETHERNET, data, 34)).is_none());
    }

    #[test]
    fn test_vlan_tagged_ipv4() {
        let mut payload = vec![0x00, 0x64, 0x08, 0x00];
        payload.extend(ipv4_header(6, [10, 1, 1, 1], [10, 1, 1, 2], 0));
        let data = ethernet(0x8100, &payload);
        let record = extract(&frame(Linktype::ETHERNET, data, 38)).unwrap();
        assert_eq!(record.src_ip, "10.1.1.1");
    }

    #[test]
    fn test_raw_ip_link_type() {
        let data = ipv4_header(47, [10, 0, 0, 1], [10, 0, 0, 2], 4);
        let record = extract(&frame(Linktype::RAW, data, 24)).unwrap();
        assert_eq!(record.protocol, "GRE");
    }

    #[test]
    fn test_unsupported_link_type_yields_nothing() {
        let data = ipv4_header(6, [10, 0, 0, 1], [10, 0, 0, 2], 0);
        assert!(extract(&frame(Linktype(105 /* LINKTYPE_IEEE802_11 */), data, 20)).is_none());
    }
}
