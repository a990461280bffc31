//! Recording system module
//!
//! The shared-session side of the daemon:
//! - `Records` capability trait plus the audio/video recorders
//! - the session state machine
//! - the coordinator that drives it from registry observations
//! - WAV container synthesis for the audio artifact

pub mod audio;
pub mod channel;
pub mod coordinator;
pub mod state;
pub mod video;
pub mod wav;

pub use audio::AudioRecorder;
pub use channel::{ArtifactMeta, Records, SessionArtifact, SharedRecorder};
pub use coordinator::{SessionCoordinator, SessionEvent};
pub use state::{Session, SessionPhase, SessionPolicy, SessionTracker};
pub use video::VideoRecorder;
pub use wav::WavSpec;
