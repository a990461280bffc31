//! Recording capability
//!
//! A channel may detect, record, both, or neither. The `Records` trait is
//! the recording half; detection is expressed through the registry. The
//! coordinator drives `start`/`stop`, the owning worker drives `append`.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::capture::SignalChunk;
use crate::utils::error::RecordError;

/// Recorder shared between the coordinator (start/stop) and the owning
/// channel worker (append)
pub type SharedRecorder = Arc<Mutex<dyn Records>>;

/// Container-relevant facts about a finished artifact
#[derive(Debug, Clone)]
pub enum ArtifactMeta {
    /// Headerless raw frames; geometry needed to feed the encoder
    RawVideo {
        width: u32,
        height: u32,
        bytes_per_pixel: u32,
    },
    /// Self-describing WAV file
    Wav,
}

/// One channel's finished output for a closed session
#[derive(Debug, Clone)]
pub struct SessionArtifact {
    /// Owning channel name
    pub channel: String,

    /// Artifact location under the session's tmp path
    pub path: PathBuf,

    /// Units actually written: frames for video, sample frames for audio
    pub units_written: u64,

    /// Wall-clock time the sink was open
    pub elapsed: Duration,

    pub meta: ArtifactMeta,
}

impl SessionArtifact {
    /// True observed rate in units per second
    ///
    /// Derived from what was actually written rather than the nominal
    /// capture rate, which may drift; the encoder needs this for correct
    /// playback speed.
    pub fn observed_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.units_written as f64 / secs
        } else {
            0.0
        }
    }
}

/// The recording half of a channel
pub trait Records: Send {
    /// Allocate the output sink for a session
    ///
    /// Calling this while already recording is a logged no-op, which is
    /// what makes session opening idempotent across racing channels.
    fn start(&mut self, session_dir: &Path, session_id: &str) -> Result<(), RecordError>;

    /// Buffer or write one chunk; called once per capture tick while the
    /// session is open
    fn append(&mut self, chunk: &SignalChunk) -> Result<(), RecordError>;

    /// Flush and close the sink, reporting what was actually written
    fn stop(&mut self) -> Result<SessionArtifact, RecordError>;

    /// Whether a sink is currently open
    fn is_recording(&self) -> bool;
}
