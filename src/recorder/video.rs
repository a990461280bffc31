//! Video recorder
//!
//! Spills raw frames straight to disk through a buffered writer; frames
//! are too large to hold for a whole session. The artifact is headerless
//! rawvideo, so the archiver needs the geometry and the true frame rate
//! reported at stop.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use super::channel::{ArtifactMeta, Records, SessionArtifact};
use crate::capture::SignalChunk;
use crate::utils::error::RecordError;

struct OpenSink {
    path: std::path::PathBuf,
    writer: BufWriter<std::fs::File>,
    frames_written: u64,
    opened_at: Instant,
}

/// Writes raw frames to a session-scoped .raw file
pub struct VideoRecorder {
    channel: String,
    width: u32,
    height: u32,
    bytes_per_pixel: u32,
    sink: Option<OpenSink>,
}

impl VideoRecorder {
    pub fn new(channel: impl Into<String>, width: u32, height: u32, bytes_per_pixel: u32) -> Self {
        Self {
            channel: channel.into(),
            width,
            height,
            bytes_per_pixel,
            sink: None,
        }
    }
}

impl Records for VideoRecorder {
    fn start(&mut self, session_dir: &Path, session_id: &str) -> Result<(), RecordError> {
        if self.sink.is_some() {
            tracing::info!("Video recorder already running, ignoring start");
            return Ok(());
        }

        let path = session_dir.join(format!("{session_id}.raw"));
        let file = std::fs::File::create(&path)?;
        let frame_size = (self.width * self.height * self.bytes_per_pixel) as usize;

        self.sink = Some(OpenSink {
            path,
            writer: BufWriter::with_capacity(frame_size * 2, file),
            frames_written: 0,
            opened_at: Instant::now(),
        });
        tracing::info!("Video recording started for session {}", session_id);
        Ok(())
    }

    fn append(&mut self, chunk: &SignalChunk) -> Result<(), RecordError> {
        let sink = self.sink.as_mut().ok_or(RecordError::NotRecording)?;
        sink.writer.write_all(&chunk.data)?;
        sink.frames_written += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<SessionArtifact, RecordError> {
        let mut sink = self.sink.take().ok_or(RecordError::NotRecording)?;
        sink.writer.flush()?;
        let elapsed = sink.opened_at.elapsed();

        tracing::info!(
            "Video recording stopped: {} frames in {:?} ({:.1} fps actual)",
            sink.frames_written,
            elapsed,
            sink.frames_written as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
        );

        Ok(SessionArtifact {
            channel: self.channel.clone(),
            path: sink.path,
            units_written: sink.frames_written,
            elapsed,
            meta: ArtifactMeta::RawVideo {
                width: self.width,
                height: self.height,
                bytes_per_pixel: self.bytes_per_pixel,
            },
        })
    }

    fn is_recording(&self) -> bool {
        self.sink.is_some()
    }
}
