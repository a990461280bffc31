//! Daemon configuration
//!
//! One explicit configuration structure consumed by the core. The binary
//! loads it from a JSON file; the library never reads the environment
//! piecemeal.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VigilConfig {
    /// Where per-channel artifacts are written while a session is open
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: PathBuf,

    /// Where merged session artifacts end up
    #[serde(default = "default_archive_dir")]
    pub archive_dir: PathBuf,

    /// Shared directory for cross-worker lock records
    #[serde(default = "default_locks_dir")]
    pub locks_dir: PathBuf,

    /// Session policy (grace period, hard cap, poll interval)
    #[serde(default)]
    pub session: SessionConfig,

    /// Detection policy shared by all channels
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Video channel, if present
    pub video: Option<VideoConfig>,

    /// Audio channel, if present
    pub audio: Option<AudioConfig>,

    /// Motion-switch channel, if present
    pub switch: Option<SwitchConfig>,
}

fn default_tmp_dir() -> PathBuf {
    PathBuf::from("tmp")
}

fn default_archive_dir() -> PathBuf {
    PathBuf::from("archive")
}

fn default_locks_dir() -> PathBuf {
    PathBuf::from("locks")
}

/// Session lifecycle policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Seconds to keep recording after all channels go quiet
    pub grace_secs: u64,

    /// Hard cap on session duration in seconds; fires even while a
    /// channel is still detecting
    pub max_recording_secs: u64,

    /// Coordinator poll interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grace_secs: 5,
            max_recording_secs: 300,
            poll_interval_ms: 250,
        }
    }
}

/// Detection policy shared by all channels
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionConfig {
    /// Sliding-window length in seconds
    pub window_secs: u64,

    /// Baseline samples consumed before normal operation
    pub calibration_samples: usize,

    /// Threshold = baseline statistic × margin_factor + margin_offset
    pub margin_factor: f64,
    pub margin_offset: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            window_secs: 5,
            calibration_samples: 50,
            margin_factor: 1.5,
            margin_offset: 0.0,
        }
    }
}

/// Video channel configuration
///
/// Capture is delegated to an external command (e.g. ffmpeg reading a
/// v4l2 device) emitting raw frames on stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoConfig {
    /// Capture command and arguments; must write rawvideo to stdout
    pub command: Vec<String>,

    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Bytes per pixel of the raw stream (3 for rgb24, 1 for gray)
    #[serde(default = "default_bytes_per_pixel")]
    pub bytes_per_pixel: u32,

    /// Nominal capture rate, used only to size the detection window
    pub nominal_fps: u32,

    /// Fixed motion threshold: percent of pixels changed per frame
    #[serde(default = "default_motion_threshold")]
    pub threshold: f64,
}

fn default_bytes_per_pixel() -> u32 {
    3
}

fn default_motion_threshold() -> f64 {
    3.0
}

impl VideoConfig {
    /// Size of one raw frame in bytes
    pub fn frame_size(&self) -> usize {
        (self.width * self.height * self.bytes_per_pixel) as usize
    }
}

/// Audio channel configuration
///
/// Capture is delegated to an external command (e.g. arecord) emitting
/// raw PCM on stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioConfig {
    /// Capture command and arguments; must write raw PCM to stdout
    pub command: Vec<String>,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Channel count
    pub channels: u16,

    /// Bits per sample of the raw stream
    #[serde(default = "default_bits_per_sample")]
    pub bits_per_sample: u16,

    /// Samples per chunk read from the source
    #[serde(default = "default_chunk_samples")]
    pub chunk_samples: u32,
}

fn default_bits_per_sample() -> u16 {
    16
}

fn default_chunk_samples() -> u32 {
    2048
}

impl AudioConfig {
    /// Size of one PCM chunk in bytes
    pub fn chunk_size(&self) -> usize {
        (self.chunk_samples * self.channels as u32 * self.bits_per_sample as u32 / 8) as usize
    }

    /// Chunks read per second at the nominal rate
    pub fn chunks_per_sec(&self) -> u32 {
        (self.sample_rate / self.chunk_samples).max(1)
    }
}

/// Motion-switch channel configuration (e.g. a PIR sensor on GPIO)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchConfig {
    /// Path to the sysfs value file for the input line
    pub value_path: PathBuf,

    /// Poll interval in milliseconds
    #[serde(default = "default_switch_poll_ms")]
    pub poll_interval_ms: u64,

    /// Seconds the channel stays active after the line drops
    #[serde(default = "default_hold_secs")]
    pub hold_secs: u64,
}

fn default_switch_poll_ms() -> u64 {
    200
}

fn default_hold_secs() -> u64 {
    3
}

impl VigilConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &std::path::Path) -> Result<Self, crate::utils::error::VigilError> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| crate::utils::error::VigilError::Config(e.to_string()))
    }

    /// Create all working directories
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [&self.tmp_dir, &self.archive_dir, &self.locks_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
