//! Capture trait definitions
//!
//! Source-agnostic traits for the sensor boundary. A source exposes only
//! `read()`; everything about the device behind it (camera, microphone,
//! GPIO line) is someone else's problem.

use chrono::{DateTime, Utc};

use crate::utils::error::CaptureError;

/// Kind of sensor pipeline a channel runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Video,
    Audio,
    Switch,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Video => "video",
            ChannelKind::Audio => "audio",
            ChannelKind::Switch => "switch",
        }
    }
}

/// One reading from a sensor channel
#[derive(Debug, Clone)]
pub struct SignalChunk {
    /// Raw payload: a frame, a PCM chunk, or a single level byte
    pub data: Vec<u8>,

    /// Wall-clock time of the read
    pub timestamp: DateTime<Utc>,
}

impl SignalChunk {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            timestamp: Utc::now(),
        }
    }
}

/// A blocking sensor source owned exclusively by one channel worker
///
/// `read()` returns `Ok(None)` on end-of-stream; the owning worker logs
/// and terminates its own loop, never its siblings.
pub trait SignalSource: Send {
    /// Read the next chunk, blocking until one is available
    fn read(&mut self) -> Result<Option<SignalChunk>, CaptureError>;
}
