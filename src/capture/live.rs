//! pnet-based live capture.

use chrono::Utc;
use pcap_parser::Linktype;
use pnet::datalink::{self, Channel, Config, DataLinkReceiver, NetworkInterface};

use super::{Frame, FrameSource};
use crate::error::CaptureError;

/// Frames read from a network interface in promiscuous mode.
///
/// Reads block until a frame arrives; there is no read timeout.
pub struct LiveSource {
    interface: NetworkInterface,
    rx: Box<dyn DataLinkReceiver>,
}

impl LiveSource {
    /// Open a capture on the named interface.
    pub fn open(interface_name: &str) -> Result<Self, CaptureError> {
        let interface = datalink::interfaces()
            .into_iter()
            .find(|iface| iface.name == interface_name)
            .ok_or_else(|| CaptureError::InterfaceNotFound(interface_name.to_string()))?;

        let config = Config {
            promiscuous: true,
            read_timeout: None,
            ..Config::default()
        };

        let rx = match datalink::channel(&interface, config) {
            Ok(Channel::Ethernet(_tx, rx)) => rx,
            Ok(_) => {
                return Err(CaptureError::ChannelCreation(
                    "unsupported channel type".to_string(),
                ))
            }
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("permission") || msg.contains("Operation not permitted") {
                    return Err(CaptureError::InsufficientPermissions);
                }
                return Err(CaptureError::ChannelCreation(msg));
            }
        };

        Ok(Self { interface, rx })
    }

    /// Get the name of the interface being captured.
    pub fn interface_name(&self) -> &str {
        &self.interface.name
    }

    /// List all available network interfaces.
    pub fn list_interfaces() -> Vec<String> {
        datalink::interfaces()
            .into_iter()
            .map(|iface| {
                let status = if iface.is_up() { "UP" } else { "DOWN" };
                let ips: Vec<_> = iface.ips.iter().map(|ip| ip.to_string()).collect();
                format!(
                    "{}: {} [{}]",
                    iface.name,
                    status,
                    if ips.is_empty() {
                        "no IP".to_string()
                    } else {
                        ips.join(", ")
                    }
                )
            })
            .collect()
    }
}

impl FrameSource for LiveSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        loop {
            match self.rx.next() {
                Ok(packet) => {
                    // pnet hands over the received bytes only, so the receive
                    // time and received length stand in for capture metadata.
                    return Ok(Some(Frame {
                        data: packet.to_vec(),
                        timestamp: Utc::now(),
                        wire_len: packet.len() as u32,
                        link_type: Linktype::ETHERNET,
                    }));
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => {
                    return Err(CaptureError::Read(format!(
                        "{}: {}",
                        self.interface.name, e
                    )))
                }
            }
        }
    }
}
