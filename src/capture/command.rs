//! External capture command source
//!
//! Device capture is delegated to an external process (ffmpeg for a
//! camera, arecord for a microphone) that writes raw fixed-size chunks
//! to stdout. The daemon only reads bytes; it never touches the device.

use std::io::{BufReader, Read};
use std::process::{Child, ChildStdout, Command, Stdio};

use super::traits::{SignalChunk, SignalSource};
use crate::utils::error::CaptureError;

/// Reads fixed-size chunks from a spawned capture command's stdout
pub struct CommandSource {
    process: Child,
    stdout: BufReader<ChildStdout>,
    chunk_size: usize,
    chunks_read: u64,
}

impl CommandSource {
    /// Spawn `command` and attach to its stdout
    ///
    /// `chunk_size` is the exact number of bytes per read: one raw frame
    /// for video, one PCM block for audio.
    pub fn spawn(command: &[String], chunk_size: usize) -> Result<Self, CaptureError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| CaptureError::Spawn {
                command: String::new(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
            })?;

        tracing::info!("Spawning capture command: {} {:?}", program, args);

        let mut process = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CaptureError::Spawn {
                command: program.clone(),
                source: e,
            })?;

        let stdout = process.stdout.take().ok_or(CaptureError::NoStdout)?;

        Ok(Self {
            process,
            stdout: BufReader::with_capacity(chunk_size * 2, stdout),
            chunk_size,
            chunks_read: 0,
        })
    }

    /// Number of chunks read so far
    pub fn chunks_read(&self) -> u64 {
        self.chunks_read
    }
}

impl SignalSource for CommandSource {
    fn read(&mut self) -> Result<Option<SignalChunk>, CaptureError> {
        let mut buffer = vec![0u8; self.chunk_size];

        match self.stdout.read_exact(&mut buffer) {
            Ok(()) => {
                self.chunks_read += 1;
                Ok(Some(SignalChunk::new(buffer)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                // Capture process ended
                Ok(None)
            }
            Err(e) => Err(CaptureError::Io(e)),
        }
    }
}

impl Drop for CommandSource {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_fixed_size_chunks_until_eof() {
        // 10 bytes of output, chunk size 4: two full chunks, then EOF
        let cmd = vec![
            "sh".to_string(),
            "-c".to_string(),
            "printf 'abcdefghij'".to_string(),
        ];
        let mut source = CommandSource::spawn(&cmd, 4).unwrap();

        let first = source.read().unwrap().unwrap();
        assert_eq!(first.data, b"abcd");
        let second = source.read().unwrap().unwrap();
        assert_eq!(second.data, b"efgh");

        // Trailing partial chunk is dropped with the stream
        assert!(source.read().unwrap().is_none());
        assert_eq!(source.chunks_read(), 2);
    }

    #[test]
    fn spawn_failure_is_reported() {
        let cmd = vec!["/nonexistent/capture-tool".to_string()];
        assert!(matches!(
            CommandSource::spawn(&cmd, 16),
            Err(CaptureError::Spawn { .. })
        ));
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(CommandSource::spawn(&[], 16).is_err());
    }
}
