//! Record extraction.
//!
//! This module maps captured frames to normalized records, dropping
//! frames that carry neither IPv4 nor IPv6.

mod link;
mod record_extractor;

pub use record_extractor::extract;
