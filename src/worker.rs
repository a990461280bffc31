//! Channel workers
//!
//! One long-lived worker per channel: read from the source, turn the
//! chunk into an intensity, classify it, publish the result to the
//! registry, and hand the raw chunk to the recorder while a session is
//! open. Workers talk to each other only through the registry.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::capture::{ChannelKind, CommandSource, GpioSwitch, SignalSource};
use crate::config::{AudioConfig, DetectionConfig, SwitchConfig, VideoConfig};
use crate::detect::{
    calibrate, BaselineStat, DetectionRegistry, FrameDiffProbe, IntensityProbe, LevelProbe,
    RmsProbe, Sample, SlidingWindowDetector,
};
use crate::recorder::{AudioRecorder, Records, SharedRecorder, VideoRecorder, WavSpec};
use crate::utils::error::{CalibrationError, VigilError, VigilResult};

/// How a worker fixes its detection threshold at startup
pub enum ThresholdSpec {
    /// Use this value as-is
    Fixed(f64),

    /// Consume baseline samples before normal operation; no runtime
    /// recalibration afterwards
    Calibrate {
        samples: usize,
        stat: BaselineStat,
        margin_factor: f64,
        margin_offset: f64,
    },
}

/// An independently running sensor pipeline
pub struct ChannelWorker {
    name: String,
    kind: ChannelKind,
    source: Box<dyn SignalSource>,
    probe: Box<dyn IntensityProbe>,
    threshold: ThresholdSpec,
    window_capacity: usize,
    registry: Arc<dyn DetectionRegistry>,
    recorder: Option<SharedRecorder>,
    shutdown: watch::Receiver<bool>,
}

impl ChannelWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        kind: ChannelKind,
        source: Box<dyn SignalSource>,
        probe: Box<dyn IntensityProbe>,
        threshold: ThresholdSpec,
        window_capacity: usize,
        registry: Arc<dyn DetectionRegistry>,
        recorder: Option<SharedRecorder>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            source,
            probe,
            threshold,
            window_capacity,
            registry,
            recorder,
            shutdown,
        }
    }

    /// Build the video channel: external rawvideo capture, frame-diff
    /// probe, fixed movement threshold
    pub fn video(
        name: &str,
        config: &VideoConfig,
        detection: &DetectionConfig,
        registry: Arc<dyn DetectionRegistry>,
        shutdown: watch::Receiver<bool>,
    ) -> VigilResult<(Self, SharedRecorder)> {
        let source = CommandSource::spawn(&config.command, config.frame_size())?;
        let recorder: SharedRecorder = Arc::new(parking_lot::Mutex::new(VideoRecorder::new(
            name,
            config.width,
            config.height,
            config.bytes_per_pixel,
        )));

        let worker = Self::new(
            name,
            ChannelKind::Video,
            Box::new(source),
            Box::new(FrameDiffProbe::default()),
            ThresholdSpec::Fixed(config.threshold),
            (config.nominal_fps as u64 * detection.window_secs).max(1) as usize,
            registry,
            Some(recorder.clone()),
            shutdown,
        );
        Ok((worker, recorder))
    }

    /// Build the audio channel: external PCM capture, RMS probe,
    /// threshold calibrated against ambient noise
    pub fn audio(
        name: &str,
        config: &AudioConfig,
        detection: &DetectionConfig,
        registry: Arc<dyn DetectionRegistry>,
        shutdown: watch::Receiver<bool>,
    ) -> VigilResult<(Self, SharedRecorder)> {
        let source = CommandSource::spawn(&config.command, config.chunk_size())?;
        let recorder: SharedRecorder = Arc::new(parking_lot::Mutex::new(AudioRecorder::new(
            name,
            WavSpec {
                channels: config.channels,
                sample_rate: config.sample_rate,
                bits_per_sample: config.bits_per_sample,
            },
        )));

        let worker = Self::new(
            name,
            ChannelKind::Audio,
            Box::new(source),
            Box::new(RmsProbe),
            ThresholdSpec::Calibrate {
                samples: detection.calibration_samples,
                stat: BaselineStat::Mean,
                margin_factor: detection.margin_factor,
                margin_offset: detection.margin_offset,
            },
            (config.chunks_per_sec() as u64 * detection.window_secs).max(1) as usize,
            registry,
            Some(recorder.clone()),
            shutdown,
        );
        Ok((worker, recorder))
    }

    /// Build the motion-switch channel: sysfs polling, no recorder
    ///
    /// The hold-off after the line drops is expressed through the window
    /// length, so the channel stays active for `hold_secs` past the last
    /// high reading.
    pub fn switch(
        name: &str,
        config: &SwitchConfig,
        registry: Arc<dyn DetectionRegistry>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let source = GpioSwitch::new(
            config.value_path.clone(),
            Duration::from_millis(config.poll_interval_ms),
        );
        let reads_per_sec = (1000 / config.poll_interval_ms.max(1)).max(1);

        Self::new(
            name,
            ChannelKind::Switch,
            Box::new(source),
            Box::new(LevelProbe),
            ThresholdSpec::Fixed(0.5),
            (reads_per_sec * config.hold_secs).max(1) as usize,
            registry,
            None,
            shutdown,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Run the capture/detect loop to completion (blocking)
    ///
    /// Exits on shutdown, end-of-stream, or a capture fault; all three
    /// paths clear this channel's registry record and release the source.
    pub fn run(mut self) -> VigilResult<()> {
        let threshold = self.resolve_threshold()?;
        let mut detector = SlidingWindowDetector::new(self.window_capacity, threshold);

        tracing::info!("Channel {} ({}) listening", self.name, self.kind.as_str());

        loop {
            if *self.shutdown.borrow() {
                tracing::info!("Channel {} shutting down", self.name);
                break;
            }

            match self.source.read() {
                Ok(Some(chunk)) => self.handle_chunk(&mut detector, chunk),
                Ok(None) => {
                    tracing::info!("Channel {}: end of feed", self.name);
                    break;
                }
                Err(e) => {
                    // A capture fault kills only this worker
                    tracing::error!("Channel {} capture failed: {}", self.name, e);
                    break;
                }
            }
        }

        if let Err(e) = self.registry.clear_active(&self.name) {
            tracing::warn!("Channel {} could not clear its record: {}", self.name, e);
        }
        Ok(())
    }

    /// Spawn onto the blocking pool
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        let name = self.name.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = self.run() {
                tracing::error!("Channel {} terminated: {}", name, e);
            }
        })
    }

    fn resolve_threshold(&mut self) -> Result<f64, VigilError> {
        match self.threshold {
            ThresholdSpec::Fixed(value) => Ok(value),
            ThresholdSpec::Calibrate {
                samples,
                stat,
                margin_factor,
                margin_offset,
            } => {
                tracing::info!("Channel {}: determining threshold...", self.name);

                let mut baseline = Vec::with_capacity(samples);
                for _ in 0..samples {
                    match self.source.read().map_err(CalibrationError::Capture)? {
                        Some(chunk) => baseline.push(self.probe.intensity(&chunk)),
                        None => {
                            return Err(CalibrationError::ShortRead {
                                got: baseline.len(),
                                want: samples,
                            }
                            .into())
                        }
                    }
                }

                let threshold = calibrate(&baseline, stat, margin_factor, margin_offset)?;
                tracing::info!("Channel {}: threshold set to {:.3}", self.name, threshold);
                Ok(threshold)
            }
        }
    }

    fn handle_chunk(&mut self, detector: &mut SlidingWindowDetector, chunk: crate::capture::SignalChunk) {
        let intensity = self.probe.intensity(&chunk);
        detector.ingest(Sample::new(chunk.timestamp, intensity));

        if detector.active() {
            if let Some(since) = detector.active_since() {
                if let Err(e) = self.registry.set_active(&self.name, since) {
                    // Registry trouble means this channel just looks
                    // inactive to everyone else
                    tracing::warn!("Channel {} could not publish state: {}", self.name, e);
                }
            }
        } else if let Err(e) = self.registry.clear_active(&self.name) {
            tracing::warn!("Channel {} could not clear state: {}", self.name, e);
        }

        if let Some(recorder) = &self.recorder {
            let mut recorder = recorder.lock();
            if recorder.is_recording() {
                if let Err(e) = recorder.append(&chunk) {
                    tracing::warn!("Channel {} dropped a chunk: {}", self.name, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::SignalChunk;
    use crate::detect::MemoryRegistry;
    use crate::recorder::Records;
    use crate::utils::error::CaptureError;
    use chrono::{DateTime, TimeZone, Utc};
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Replays a scripted sequence of levels, then signals end-of-stream
    struct ScriptedSource {
        chunks: VecDeque<SignalChunk>,
    }

    impl ScriptedSource {
        fn levels(levels: &[u8]) -> Self {
            let base = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
            Self {
                chunks: levels
                    .iter()
                    .enumerate()
                    .map(|(i, &level)| SignalChunk {
                        data: vec![level],
                        timestamp: base + chrono::Duration::seconds(i as i64),
                    })
                    .collect(),
            }
        }
    }

    impl SignalSource for ScriptedSource {
        fn read(&mut self) -> Result<Option<SignalChunk>, CaptureError> {
            Ok(self.chunks.pop_front())
        }
    }

    /// Registry spy that records every write for later assertion
    #[derive(Default)]
    struct SpyRegistry {
        inner: MemoryRegistry,
        log: Mutex<Vec<(String, Option<DateTime<Utc>>)>>,
    }

    impl DetectionRegistry for SpyRegistry {
        fn set_active(
            &self,
            channel: &str,
            since: DateTime<Utc>,
        ) -> Result<(), crate::utils::error::RegistryError> {
            if !self.inner.is_any_active() {
                self.log.lock().push((channel.to_string(), Some(since)));
            }
            self.inner.set_active(channel, since)
        }

        fn clear_active(&self, channel: &str) -> Result<(), crate::utils::error::RegistryError> {
            if self.inner.is_any_active() {
                self.log.lock().push((channel.to_string(), None));
            }
            self.inner.clear_active(channel)
        }

        fn is_any_active(&self) -> bool {
            self.inner.is_any_active()
        }

        fn earliest_active_timestamp(&self) -> Option<DateTime<Utc>> {
            self.inner.earliest_active_timestamp()
        }
    }

    fn shutdown_handle() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(false)
    }

    fn switch_worker(
        levels: &[u8],
        window: usize,
        registry: Arc<SpyRegistry>,
        recorder: Option<SharedRecorder>,
    ) -> ChannelWorker {
        let (_tx, rx) = shutdown_handle();
        ChannelWorker::new(
            "switch",
            ChannelKind::Switch,
            Box::new(ScriptedSource::levels(levels)),
            Box::new(LevelProbe),
            ThresholdSpec::Fixed(0.5),
            window,
            registry,
            recorder,
            rx,
        )
    }

    #[test]
    fn activation_and_release_reach_the_registry() {
        let registry = Arc::new(SpyRegistry::default());

        // High at index 2; window of 1 releases on the next low reading
        let worker = switch_worker(&[0, 0, 1, 0, 0], 1, registry.clone(), None);
        worker.run().unwrap();

        let log = registry.log.lock();
        let base = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(
            log[0],
            ("switch".to_string(), Some(base + chrono::Duration::seconds(2)))
        );
        assert_eq!(log[1], ("switch".to_string(), None));
        assert!(!registry.is_any_active());
    }

    #[test]
    fn window_holds_activation_past_the_edge() {
        let registry = Arc::new(SpyRegistry::default());

        // Window of 3: the single high reading keeps the channel active
        // for two further lows, releasing on the third
        let worker = switch_worker(&[1, 0, 0, 0], 3, registry.clone(), None);
        worker.run().unwrap();

        let log = registry.log.lock();
        assert_eq!(log.len(), 2, "one activation, one release");
    }

    #[test]
    fn calibration_failure_stops_the_worker_before_the_loop() {
        let registry = Arc::new(SpyRegistry::default());
        let (_tx, rx) = shutdown_handle();

        let worker = ChannelWorker::new(
            "noise",
            ChannelKind::Audio,
            Box::new(ScriptedSource::levels(&[0, 0])),
            Box::new(LevelProbe),
            ThresholdSpec::Calibrate {
                samples: 10,
                stat: BaselineStat::Mean,
                margin_factor: 1.5,
                margin_offset: 0.0,
            },
            4,
            registry,
            None,
            rx,
        );

        match worker.run() {
            Err(VigilError::Calibration(CalibrationError::ShortRead { got, want })) => {
                assert_eq!((got, want), (2, 10));
            }
            other => panic!("expected ShortRead, got {:?}", other),
        }
    }

    #[test]
    fn chunks_reach_an_open_recorder() {
        let registry = Arc::new(SpyRegistry::default());
        let dir = tempfile::tempdir().unwrap();

        let recorder: SharedRecorder = Arc::new(Mutex::new(AudioRecorder::new(
            "noise",
            WavSpec {
                channels: 1,
                sample_rate: 8,
                bits_per_sample: 8,
            },
        )));
        recorder.lock().start(dir.path(), "s").unwrap();

        let worker = switch_worker(&[1, 1, 1], 2, registry, Some(recorder.clone()));
        worker.run().unwrap();

        let artifact = recorder.lock().stop().unwrap();
        // Three one-byte chunks appended while the sink was open
        assert_eq!(artifact.units_written, 3);
    }

    #[test]
    fn shutdown_flag_exits_the_loop() {
        let registry = Arc::new(SpyRegistry::default());
        let (tx, rx) = shutdown_handle();
        tx.send(true).unwrap();

        let worker = ChannelWorker::new(
            "switch",
            ChannelKind::Switch,
            Box::new(ScriptedSource::levels(&[1; 100])),
            Box::new(LevelProbe),
            ThresholdSpec::Fixed(0.5),
            4,
            registry.clone(),
            None,
            rx,
        );
        worker.run().unwrap();
        assert!(!registry.is_any_active());
    }
}
