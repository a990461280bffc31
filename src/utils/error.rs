//! Error types and handling
//!
//! Common error types used across the daemon. Each fault family is local
//! to the worker or step that raised it; nothing here is fatal to the
//! coordinator.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading from a capture source
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to spawn capture command `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("capture command produced no stdout")]
    NoStdout,
}

/// Errors raised during threshold calibration at worker start
#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("no baseline samples available for calibration")]
    NoSamples,

    #[error("source failed during calibration: {0}")]
    Capture(#[from] CaptureError),

    #[error("source ended after {got} of {want} baseline samples")]
    ShortRead { got: usize, want: usize },
}

/// Errors raised by the shared detection registry
///
/// Readers treat these conservatively ("channel currently inactive");
/// they never propagate past the registry boundary.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to persist lock record: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("unparseable lock record at {path}: {content:?}")]
    BadRecord { path: PathBuf, content: String },
}

/// Errors raised by recorders
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("recorder is not recording")]
    NotRecording,
}

/// Errors raised while merging session artifacts
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to spawn encoder: {0}")]
    Spawn(std::io::Error),

    #[error("encoder exited with {status}: {stderr}")]
    Encode {
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("session produced no artifacts to merge")]
    NothingToMerge,
}

/// Daemon-wide error type
#[derive(Error, Debug)]
pub enum VigilError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias using VigilError
pub type VigilResult<T> = Result<T, VigilError>;
