//! Audio recorder
//!
//! Buffers PCM chunks in memory while the session is open and writes a
//! single WAV file on stop. Appending never touches the filesystem, so
//! the capture loop stays on pace.

use std::io::Write;
use std::path::Path;
use std::time::Instant;

use super::channel::{ArtifactMeta, Records, SessionArtifact};
use super::wav::{self, WavSpec};
use crate::capture::SignalChunk;
use crate::utils::error::RecordError;

struct OpenSink {
    path: std::path::PathBuf,
    buffer: Vec<u8>,
    opened_at: Instant,
}

/// Buffers PCM and synthesizes a WAV artifact on stop
pub struct AudioRecorder {
    channel: String,
    spec: WavSpec,
    sink: Option<OpenSink>,
}

impl AudioRecorder {
    pub fn new(channel: impl Into<String>, spec: WavSpec) -> Self {
        Self {
            channel: channel.into(),
            spec,
            sink: None,
        }
    }
}

impl Records for AudioRecorder {
    fn start(&mut self, session_dir: &Path, session_id: &str) -> Result<(), RecordError> {
        if self.sink.is_some() {
            tracing::info!("Audio recorder already running, ignoring start");
            return Ok(());
        }

        self.sink = Some(OpenSink {
            path: session_dir.join(format!("{session_id}.wav")),
            buffer: Vec::new(),
            opened_at: Instant::now(),
        });
        tracing::info!("Audio recording started for session {}", session_id);
        Ok(())
    }

    fn append(&mut self, chunk: &SignalChunk) -> Result<(), RecordError> {
        let sink = self.sink.as_mut().ok_or(RecordError::NotRecording)?;
        sink.buffer.extend_from_slice(&chunk.data);
        Ok(())
    }

    fn stop(&mut self) -> Result<SessionArtifact, RecordError> {
        let sink = self.sink.take().ok_or(RecordError::NotRecording)?;
        let elapsed = sink.opened_at.elapsed();

        let data_len = sink.buffer.len() as u32;
        let mut file = std::fs::File::create(&sink.path)?;
        file.write_all(&wav::header(&self.spec, data_len))?;
        file.write_all(&sink.buffer)?;
        file.flush()?;

        let frames = data_len as u64 / self.spec.block_align().max(1) as u64;
        tracing::info!(
            "Audio recording stopped: {} sample frames, {:?}",
            frames,
            elapsed
        );

        Ok(SessionArtifact {
            channel: self.channel.clone(),
            path: sink.path,
            units_written: frames,
            elapsed,
            meta: ArtifactMeta::Wav,
        })
    }

    fn is_recording(&self) -> bool {
        self.sink.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> WavSpec {
        WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
        }
    }

    #[test]
    fn writes_wav_with_exact_declared_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = AudioRecorder::new("noise", spec());

        rec.start(dir.path(), "20240101_120000").unwrap();
        rec.append(&SignalChunk::new(vec![1; 1000])).unwrap();
        rec.append(&SignalChunk::new(vec![2; 1000])).unwrap();
        let artifact = rec.stop().unwrap();

        let written = std::fs::read(&artifact.path).unwrap();
        assert_eq!(written.len(), wav::HEADER_LEN + 2000);

        // Declared sizes match the payload exactly
        assert_eq!(
            u32::from_le_bytes(written[40..44].try_into().unwrap()),
            2000
        );
        assert_eq!(
            u32::from_le_bytes(written[4..8].try_into().unwrap()),
            2000 + 36
        );

        // 2000 bytes of 16-bit mono = 1000 sample frames
        assert_eq!(artifact.units_written, 1000);
        assert!(matches!(artifact.meta, ArtifactMeta::Wav));
    }

    #[test]
    fn double_start_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = AudioRecorder::new("noise", spec());

        rec.start(dir.path(), "a").unwrap();
        rec.append(&SignalChunk::new(vec![0; 10])).unwrap();
        rec.start(dir.path(), "b").unwrap();

        // Still writing to the first session's sink
        let artifact = rec.stop().unwrap();
        assert!(artifact.path.ends_with("a.wav"));
    }

    #[test]
    fn append_and_stop_require_an_open_sink() {
        let mut rec = AudioRecorder::new("noise", spec());
        assert!(rec.append(&SignalChunk::new(vec![0; 4])).is_err());
        assert!(rec.stop().is_err());
        assert!(!rec.is_recording());
    }
}
