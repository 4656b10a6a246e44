//! Domain models for captured traffic.
//!
//! These types are independent of how frames are captured or how records
//! reach a client.

mod protocol;
mod record;

pub use protocol::protocol_name;
pub use record::{format_timestamp, Record, StreamError};
