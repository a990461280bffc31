//! Session archiving
//!
//! Merges a closed session's per-channel artifacts into one timestamped
//! deliverable via an external encoder subprocess. Sources are deleted
//! only on success; on failure they are left in place for manual
//! recovery and nothing retries automatically.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::recorder::channel::{ArtifactMeta, SessionArtifact};
use crate::utils::error::ArchiveError;

/// Default external encoder
const DEFAULT_ENCODER: &str = "ffmpeg";

/// Merges session artifacts into one container in the archive directory
#[derive(Debug, Clone)]
pub struct Archiver {
    archive_dir: PathBuf,
    encoder: String,
}

impl Archiver {
    pub fn new(archive_dir: impl Into<PathBuf>) -> Self {
        Self {
            archive_dir: archive_dir.into(),
            encoder: DEFAULT_ENCODER.to_string(),
        }
    }

    /// Override the encoder binary (used by tests)
    pub fn with_encoder(mut self, encoder: impl Into<String>) -> Self {
        self.encoder = encoder.into();
        self
    }

    /// Merge artifacts into `<archive_dir>/<session_id>.mp4`
    ///
    /// Zero exit status deletes the now-redundant sources; anything else
    /// leaves them untouched and surfaces the encoder's stderr.
    pub fn merge(
        &self,
        session_id: &str,
        artifacts: &[SessionArtifact],
    ) -> Result<PathBuf, ArchiveError> {
        if artifacts.is_empty() {
            return Err(ArchiveError::NothingToMerge);
        }

        let output_path = self.archive_dir.join(format!("{session_id}.mp4"));
        let args = build_merge_args(artifacts, &output_path);

        tracing::info!("Merging session {}: {} {:?}", session_id, self.encoder, args);

        let output = Command::new(&self.encoder)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(ArchiveError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return Err(ArchiveError::Encode {
                status: output.status,
                stderr,
            });
        }

        for artifact in artifacts {
            if let Err(e) = std::fs::remove_file(&artifact.path) {
                tracing::warn!("Failed to remove source {:?}: {}", artifact.path, e);
            }
        }

        tracing::info!("Merged session {} into {:?}", session_id, output_path);
        Ok(output_path)
    }
}

/// Build the encoder argument list for a set of artifacts
///
/// Raw video inputs carry their geometry and the true observed frame
/// rate; WAV inputs are self-describing.
fn build_merge_args(artifacts: &[SessionArtifact], output_path: &Path) -> Vec<String> {
    let mut args = vec!["-hide_banner".to_string(), "-y".to_string()];
    let mut has_video = false;
    let mut has_audio = false;

    for artifact in artifacts {
        match &artifact.meta {
            ArtifactMeta::RawVideo {
                width,
                height,
                bytes_per_pixel,
            } => {
                has_video = true;
                args.extend([
                    "-f".to_string(),
                    "rawvideo".to_string(),
                    "-pix_fmt".to_string(),
                    pixel_format(*bytes_per_pixel).to_string(),
                    "-s".to_string(),
                    format!("{}x{}", width, height),
                    "-r".to_string(),
                    format!("{:.3}", artifact.observed_rate().max(1.0)),
                ]);
                args.extend(["-i".to_string(), artifact.path.to_string_lossy().into_owned()]);
            }
            ArtifactMeta::Wav => {
                has_audio = true;
                args.extend(["-i".to_string(), artifact.path.to_string_lossy().into_owned()]);
            }
        }
    }

    if has_video {
        args.extend([
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "veryfast".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
        ]);
    }
    if has_audio {
        args.extend(["-c:a".to_string(), "aac".to_string()]);
    }

    args.push(output_path.to_string_lossy().into_owned());
    args
}

fn pixel_format(bytes_per_pixel: u32) -> &'static str {
    match bytes_per_pixel {
        1 => "gray",
        4 => "rgba",
        _ => "rgb24",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn video_artifact(path: PathBuf) -> SessionArtifact {
        SessionArtifact {
            channel: "motion".into(),
            path,
            units_written: 150,
            elapsed: Duration::from_secs(10),
            meta: ArtifactMeta::RawVideo {
                width: 320,
                height: 240,
                bytes_per_pixel: 3,
            },
        }
    }

    fn audio_artifact(path: PathBuf) -> SessionArtifact {
        SessionArtifact {
            channel: "noise".into(),
            path,
            units_written: 160_000,
            elapsed: Duration::from_secs(10),
            meta: ArtifactMeta::Wav,
        }
    }

    #[test]
    fn merge_args_carry_true_rate_and_geometry() {
        let args = build_merge_args(
            &[
                video_artifact(PathBuf::from("tmp/s.raw")),
                audio_artifact(PathBuf::from("tmp/s.wav")),
            ],
            Path::new("archive/s.mp4"),
        );

        let joined = args.join(" ");
        assert!(joined.contains("-s 320x240"));
        assert!(joined.contains("-r 15.000"), "true fps = 150 frames / 10 s");
        assert!(joined.contains("-i tmp/s.raw"));
        assert!(joined.contains("-i tmp/s.wav"));
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-c:a aac"));
        assert_eq!(args.last().unwrap(), "archive/s.mp4");
    }

    #[test]
    fn audio_only_session_skips_video_codec() {
        let args = build_merge_args(
            &[audio_artifact(PathBuf::from("tmp/s.wav"))],
            Path::new("archive/s.mp4"),
        );
        assert!(!args.join(" ").contains("-c:v"));
        assert!(args.join(" ").contains("-c:a aac"));
    }

    #[test]
    fn success_removes_sources() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("s.wav");
        std::fs::write(&source, b"payload").unwrap();

        // `true` stands in for an encoder that always succeeds
        let archiver = Archiver::new(dir.path()).with_encoder("true");
        let out = archiver.merge("s", &[audio_artifact(source.clone())]).unwrap();

        assert!(!source.exists(), "source must be deleted on success");
        assert_eq!(out, dir.path().join("s.mp4"));
    }

    #[test]
    fn failure_keeps_sources_and_surfaces_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("s.wav");
        std::fs::write(&source, b"payload").unwrap();

        let archiver = Archiver::new(dir.path()).with_encoder("false");
        let result = archiver.merge("s", &[audio_artifact(source.clone())]);

        assert!(matches!(result, Err(ArchiveError::Encode { .. })));
        assert!(source.exists(), "source must survive a failed merge");
    }

    #[test]
    fn empty_session_is_rejected() {
        let archiver = Archiver::new("archive").with_encoder("true");
        assert!(matches!(
            archiver.merge("s", &[]),
            Err(ArchiveError::NothingToMerge)
        ));
    }
}
