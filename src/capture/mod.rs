//! Frame source abstraction.
//!
//! This module defines the `FrameSource` trait and two implementations:
//! a pnet-backed live interface source and a pcap-parser-backed offline
//! file source. Extraction and the HTTP handlers only see the trait.

mod live;
mod offline;

pub use live::LiveSource;
pub use offline::OfflineSource;

use chrono::{DateTime, Utc};
use pcap_parser::Linktype;

use crate::error::CaptureError;

/// One captured link-layer frame with its capture metadata.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Captured bytes, starting at the link-layer header
    pub data: Vec<u8>,
    /// Capture time
    pub timestamp: DateTime<Utc>,
    /// Length of the frame on the wire (may exceed `data.len()`)
    pub wire_len: u32,
    /// Link-layer type of `data`
    pub link_type: Linktype,
}

/// A source of captured frames.
///
/// Both live and offline sources expose the same "next frame or end"
/// operation, so callers can stay source-agnostic and tests can use
/// in-memory sources.
pub trait FrameSource: Send {
    /// Return the next frame, `Ok(None)` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        (**self).next_frame()
    }
}
