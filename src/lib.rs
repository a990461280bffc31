//! Vigil - activity-triggered multi-channel recording daemon.
//!
//! Independent sensor channels (camera motion, microphone noise, a
//! passive motion switch) each run a sliding-window threshold detector
//! and publish their state to a shared registry. A session coordinator
//! polls the registry and, while anything is happening, keeps one shared
//! recording session open across all channels; when activity subsides
//! the per-channel artifacts are merged into a single archived file.

pub mod archive;
pub mod capture;
pub mod config;
pub mod detect;
pub mod recorder;
pub mod utils;
pub mod worker;

pub use archive::Archiver;
pub use config::VigilConfig;
pub use detect::{DetectionRegistry, FileRegistry, MemoryRegistry, SlidingWindowDetector};
pub use recorder::{SessionCoordinator, SessionEvent, SessionPhase};
pub use utils::error::{VigilError, VigilResult};
pub use worker::ChannelWorker;
