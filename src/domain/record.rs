//! Normalized per-frame records.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Fields extracted from one frame's network-layer header.
///
/// Serialized as `{"timestamp", "src_ip", "dst_ip", "protocol", "length"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Capture time, RFC3339 in UTC
    pub timestamp: String,
    /// Source address in its canonical text form
    pub src_ip: String,
    /// Destination address in its canonical text form
    pub dst_ip: String,
    /// IANA protocol keyword
    pub protocol: String,
    /// On-wire length of the frame
    pub length: u32,
}

/// The single message sent on a live stream when capture cannot start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamError {
    pub error: String,
}

impl StreamError {
    pub fn device_unavailable(interface: &str) -> Self {
        Self {
            error: format!("Could not open network device: {}", interface),
        }
    }
}

/// Format a capture timestamp as RFC3339 with second precision.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
