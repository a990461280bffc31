//! Detection-state registry
//!
//! The shared register that makes one channel's detection state visible
//! to the coordinator and peer workers. Each key has exactly one writer
//! (its owning channel) and many readers. A record exists iff the channel
//! is active; its content is the first-activation timestamp, which must
//! survive repeated detections within the same streak.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::utils::error::RegistryError;

/// Shared many-reader / single-writer-per-key detection state store
pub trait DetectionRegistry: Send + Sync {
    /// Mark a channel active; a no-op if it already is, so the streak's
    /// first-activation timestamp is never overwritten
    fn set_active(&self, channel: &str, since: DateTime<Utc>) -> Result<(), RegistryError>;

    /// Remove a channel's record
    fn clear_active(&self, channel: &str) -> Result<(), RegistryError>;

    /// Whether at least one channel is currently active
    fn is_any_active(&self) -> bool;

    /// Minimum `since` across all current records
    fn earliest_active_timestamp(&self) -> Option<DateTime<Utc>>;
}

/// In-process registry backed by a concurrent map
///
/// The default when all channel workers share one process.
#[derive(Default)]
pub struct MemoryRegistry {
    records: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DetectionRegistry for MemoryRegistry {
    fn set_active(&self, channel: &str, since: DateTime<Utc>) -> Result<(), RegistryError> {
        self.records
            .write()
            .entry(channel.to_string())
            .or_insert(since);
        Ok(())
    }

    fn clear_active(&self, channel: &str) -> Result<(), RegistryError> {
        self.records.write().remove(channel);
        Ok(())
    }

    fn is_any_active(&self) -> bool {
        !self.records.read().is_empty()
    }

    fn earliest_active_timestamp(&self) -> Option<DateTime<Utc>> {
        self.records.read().values().min().copied()
    }
}

/// Registry backed by one lock file per channel in a shared directory
///
/// Works across separate OS processes and survives worker restarts.
/// Writes go through a temp file and an atomic rename so a reader never
/// observes a partially-written record.
pub struct FileRegistry {
    dir: PathBuf,
}

const LOCK_EXT: &str = "lock";

impl FileRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn record_path(&self, channel: &str) -> PathBuf {
        self.dir.join(format!("{channel}.{LOCK_EXT}"))
    }

    fn parse_record(path: &Path) -> Result<DateTime<Utc>, RegistryError> {
        let content = std::fs::read_to_string(path)?;
        content
            .trim()
            .parse::<DateTime<Utc>>()
            .map_err(|_| RegistryError::BadRecord {
                path: path.to_path_buf(),
                content,
            })
    }

    /// All current records; unreadable entries are logged and skipped
    fn records(&self) -> Vec<DateTime<Utc>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Registry directory unreadable, treating as inactive: {}", e);
                return Vec::new();
            }
        };

        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map(|e| e == LOCK_EXT).unwrap_or(false))
            .filter_map(|path| match Self::parse_record(&path) {
                Ok(since) => Some(since),
                Err(e) => {
                    tracing::warn!("Skipping lock record: {}", e);
                    None
                }
            })
            .collect()
    }
}

impl DetectionRegistry for FileRegistry {
    fn set_active(&self, channel: &str, since: DateTime<Utc>) -> Result<(), RegistryError> {
        let path = self.record_path(channel);
        if path.exists() {
            // Already active; keep the streak's original timestamp
            return Ok(());
        }

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        write!(tmp, "{}", since.to_rfc3339())?;
        tmp.persist(&path)?;

        tracing::debug!("Channel {} active since {}", channel, since);
        Ok(())
    }

    fn clear_active(&self, channel: &str) -> Result<(), RegistryError> {
        match std::fs::remove_file(self.record_path(channel)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn is_any_active(&self) -> bool {
        !self.records().is_empty()
    }

    fn earliest_active_timestamp(&self) -> Option<DateTime<Utc>> {
        self.records().into_iter().min()
    }
}
