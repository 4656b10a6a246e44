//! Capture sessions: the live stream state machine and the frame pump
//! shared by the live and batch paths.

use std::fmt;

use crate::capture::FrameSource;
use crate::domain::Record;
use crate::error::CaptureError;
use crate::extractor::extract;

/// Frames between progress log lines.
const PROGRESS_INTERVAL: u64 = 100;

/// Lifecycle of one live capture connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Upgrading the HTTP request to a WebSocket
    Connecting,
    /// Source open, records flowing to the client
    Capturing,
    /// Source exhausted or client gone; releasing resources
    Draining,
    Closed,
}

impl SessionState {
    /// Check whether `next` is a legal successor of this state.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Connecting, Capturing)
                | (Connecting, Closed)
                | (Capturing, Draining)
                | (Capturing, Closed)
                | (Draining, Closed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Connecting => "connecting",
            SessionState::Capturing => "capturing",
            SessionState::Draining => "draining",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// State of one live capture connection.
#[derive(Debug)]
pub struct LiveSession {
    interface: String,
    state: SessionState,
}

impl LiveSession {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            state: SessionState::Connecting,
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Move to `next`. Illegal transitions are logged and ignored.
    pub fn transition(&mut self, next: SessionState) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                "[{}] ignoring illegal session transition {} -> {}",
                self.interface,
                self.state,
                next
            );
            return false;
        }
        tracing::debug!("[{}] session {} -> {}", self.interface, self.state, next);
        self.state = next;
        true
    }
}

/// The consumer of pumped records went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

/// Why a pump stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PumpEnd {
    SourceExhausted,
    SinkClosed,
    SourceFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpSummary {
    pub frames: u64,
    pub records: u64,
    pub end: PumpEnd,
}

/// Pull frames from `source` and push each extracted record to `sink`.
///
/// Blocks on every frame. Runs until the source ends or fails, or the sink
/// reports that its consumer is gone.
pub fn pump<S, F>(source: &mut S, mut sink: F) -> PumpSummary
where
    S: FrameSource + ?Sized,
    F: FnMut(Record) -> Result<(), SinkClosed>,
{
    let mut frames = 0u64;
    let mut records = 0u64;

    let end = loop {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break PumpEnd::SourceExhausted,
            Err(e) => break PumpEnd::SourceFailed(e.to_string()),
        };

        frames += 1;
        if frames % PROGRESS_INTERVAL == 0 {
            tracing::info!("Captured {} frames so far", frames);
        }

        if let Some(record) = extract(&frame) {
            if sink(record).is_err() {
                break PumpEnd::SinkClosed;
            }
            records += 1;
        }
    };

    PumpSummary {
        frames,
        records,
        end,
    }
}

/// Consume an entire source into records, in capture order.
pub fn collect<S>(source: &mut S) -> Result<Vec<Record>, CaptureError>
where
    S: FrameSource + ?Sized,
{
    let mut records = Vec::new();
    while let Some(frame) = source.next_frame()? {
        if let Some(record) = extract(&frame) {
            records.push(record);
        }
    }
    Ok(records)
}
