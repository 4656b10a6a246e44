//! Capture file and multipart builders shared by integration tests.

pub const BOUNDARY: &str = "X-PACKET-SNIFFER-BOUNDARY";

/// Ethernet frame carrying an IPv4 header with the given protocol.
pub fn ipv4_frame(protocol: u8, src: [u8; 4], dst: [u8; 4]) -> Vec<u8> {
    let mut frame = ethernet_header(0x0800);
    frame.extend_from_slice(&[0x45, 0x00, 0x00, 0x28, 0x00, 0x01, 0x40, 0x00, 64, protocol, 0, 0]);
    frame.extend_from_slice(&src);
    frame.extend_from_slice(&dst);
    frame.extend_from_slice(&[0u8; 20]);
    frame
}

/// Ethernet frame carrying an IPv6 header with the given next header.
pub fn ipv6_frame(next_header: u8, src_last: u8, dst_last: u8) -> Vec<u8> {
    let mut frame = ethernet_header(0x86dd);
    frame.extend_from_slice(&[0x60, 0, 0, 0, 0x00, 0x08, next_header, 64]);
    for last in [src_last, dst_last] {
        let mut addr = [0u8; 16];
        addr[0] = 0xfe;
        addr[1] = 0x80;
        addr[15] = last;
        frame.extend_from_slice(&addr);
    }
    frame.extend_from_slice(&[0u8; 8]);
    frame
}

pub fn arp_frame() -> Vec<u8> {
    let mut frame = ethernet_header(0x0806);
    frame.extend_from_slice(&[0u8; 28]);
    frame
}

fn ethernet_header(ethertype: u16) -> Vec<u8> {
    let mut header = vec![0xff; 6];
    header.extend_from_slice(&[0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
    header.extend_from_slice(&ethertype.to_be_bytes());
    header
}

/// Legacy little-endian microsecond pcap file with Ethernet link type.
///
/// Each frame is `(ts_sec, data, wire_len)`.
pub fn pcap_file(frames: &[(u32, Vec<u8>, u32)]) -> Vec<u8> {
    pcap_file_with_snaplen(65535, frames)
}

pub fn pcap_file_with_snaplen(snaplen: u32, frames: &[(u32, Vec<u8>, u32)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0xa1b2_c3d4u32.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&snaplen.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());

    for (ts_sec, data, wire_len) in frames {
        out.extend_from_slice(&ts_sec.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&wire_len.to_le_bytes());
        out.extend_from_slice(data);
    }
    out
}

/// Multipart body with a single file part under `field`.
pub fn multipart_body(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Multipart body with a single plain form value under `field`.
pub fn multipart_value_body(field: &str, value: &str) -> Vec<u8> {
    format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n--{b}--\r\n",
        b = BOUNDARY,
    )
    .into_bytes()
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}
