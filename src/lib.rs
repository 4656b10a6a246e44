//! Packet sniffer backend.
//!
//! Captures frames live from a network interface or from an uploaded
//! pcap/pcapng file, extracts a small record per IPv4/IPv6 frame, and
//! serves the records over HTTP:
//!
//! - `GET /live` streams one JSON record per frame over a WebSocket
//! - `POST /upload` returns the records of an uploaded capture as a JSON array

pub mod capture;
pub mod config;
pub mod domain;
pub mod error;
pub mod extractor;
pub mod routes;
pub mod session;

pub use capture::{Frame, FrameSource, LiveSource, OfflineSource};
pub use config::{AppState, Config, OriginPolicy};
pub use domain::{Record, StreamError};
pub use error::{AppError, CaptureError};
pub use extractor::extract;
