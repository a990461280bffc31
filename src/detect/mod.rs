//! Detection pipeline
//!
//! Raw chunks become scalar intensities (probes), intensities become a
//! boolean per-channel state (sliding window), and per-channel state
//! becomes system-wide state (registry).

pub mod probe;
pub mod registry;
pub mod window;

pub use probe::{FrameDiffProbe, IntensityProbe, LevelProbe, RmsProbe};
pub use registry::{DetectionRegistry, FileRegistry, MemoryRegistry};
pub use window::{calibrate, BaselineStat, Sample, SlidingWindowDetector};
