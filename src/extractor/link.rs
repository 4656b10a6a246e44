//! Link-layer demultiplexing down to the network layer.

use pcap_parser::Linktype;
use pnet::packet::ethernet::{EtherType, EtherTypes};

const ETHERNET_HEADER_LEN: usize = 14;
const VLAN_TAG_LEN: usize = 4;
const MAX_VLAN_TAGS: usize = 2;
const SLL_HEADER_LEN: usize = 16;
const SLL2_HEADER_LEN: usize = 20;
const NULL_HEADER_LEN: usize = 4;

/// BSD address families seen in null/loopback headers.
const AF_INET: u32 = 2;
const AF_INET6: [u32; 3] = [24, 28, 30];

/// Locate the network-layer payload of a frame.
///
/// Returns the EtherType describing the payload and the payload itself, or
/// `None` when the link type is unsupported or the header is truncated.
pub(super) fn network_payload(link_type: Linktype, data: &[u8]) -> Option<(EtherType, &[u8])> {
    match link_type.0 {
        // ETHERNET
        1 => ethernet(data),
        // NULL (host byte order) and LOOP (network byte order)
        0 => null_loopback(data, false),
        108 => null_loopback(data, true),
        // RAW, plus the BSD DLT_RAW values that leak into some files
        101 | 12 | 14 => raw_ip(data),
        // IPV4 / IPV6
        228 => Some((EtherTypes::Ipv4, data)),
        229 => Some((EtherTypes::Ipv6, data)),
        // LINUX_SLL
        113 => {
            let proto = be_u16(data, 14)?;
            Some((EtherType(proto), data.get(SLL_HEADER_LEN..)?))
        }
        // LINUX_SLL2
        276 => {
            let proto = be_u16(data, 0)?;
            Some((EtherType(proto), data.get(SLL2_HEADER_LEN..)?))
        }
        _ => None,
    }
}

fn ethernet(data: &[u8]) -> Option<(EtherType, &[u8])> {
    let mut ethertype = EtherType(be_u16(data, 12)?);
    let mut offset = ETHERNET_HEADER_LEN;

    for _ in 0..MAX_VLAN_TAGS {
        if !is_vlan(ethertype) {
            break;
        }
        // The tag's inner EtherType follows the 2-byte TCI.
        ethertype = EtherType(be_u16(data, offset + 2)?);
        offset += VLAN_TAG_LEN;
    }

    Some((ethertype, data.get(offset..)?))
}

fn is_vlan(ethertype: EtherType) -> bool {
    ethertype == EtherTypes::Vlan || ethertype == EtherTypes::QinQ || ethertype == EtherTypes::PBridge
}

fn null_loopback(data: &[u8], network_order: bool) -> Option<(EtherType, &[u8])> {
    let header: [u8; 4] = data.get(..NULL_HEADER_LEN)?.try_into().ok()?;
    let family = if network_order {
        u32::from_be_bytes(header)
    } else {
        // Host order of the capturing machine, which we do not know.
        let le = u32::from_le_bytes(header);
        if le > 0xffff {
            u32::from_be_bytes(header)
        } else {
            le
        }
    };

    let payload = &data[NULL_HEADER_LEN..];
    if family == AF_INET {
        Some((EtherTypes::Ipv4, payload))
    } else if AF_INET6.contains(&family) {
        Some((EtherTypes::Ipv6, payload))
    } else {
        None
    }
}

fn raw_ip(data: &[u8]) -> Option<(EtherType, &[u8])> {
    match data.first()? >> 4 {
        4 => Some((EtherTypes::Ipv4, data)),
        6 => Some((EtherTypes::Ipv6, data)),
        _ => None,
    }
}

fn be_u16(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}
