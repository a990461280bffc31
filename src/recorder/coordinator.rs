//! Session coordinator
//!
//! Polls the detection registry on a fixed interval, drives the session
//! state machine, and fans start/stop out to every recording channel.
//! The tick itself only reads the registry; recorder I/O and the merge
//! subprocess run on the blocking pool so the loop never stalls.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};

use super::channel::{Records, SessionArtifact, SharedRecorder};
use super::state::{Session, SessionAction, SessionPhase, SessionPolicy, SessionTracker};
use crate::archive::Archiver;
use crate::config::SessionConfig;
use crate::detect::DetectionRegistry;

/// Events emitted over the session lifecycle
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A session opened and recorders were started
    Opened { session: Session },

    /// A session closed; `archived` is the merged artifact on success
    Closed {
        session: Session,
        archived: Option<PathBuf>,
    },
}

/// One recording channel registered with the coordinator
struct RecordingChannel {
    name: String,
    recorder: SharedRecorder,
}

/// Orchestrates the shared recording session across all channels
pub struct SessionCoordinator {
    registry: Arc<dyn DetectionRegistry>,
    channels: Vec<RecordingChannel>,
    tracker: SessionTracker,
    archiver: Archiver,
    tmp_dir: PathBuf,
    poll_interval: Duration,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionCoordinator {
    pub fn new(
        registry: Arc<dyn DetectionRegistry>,
        archiver: Archiver,
        tmp_dir: impl Into<PathBuf>,
        config: &SessionConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            registry,
            channels: Vec::new(),
            tracker: SessionTracker::new(SessionPolicy {
                grace: chrono::Duration::seconds(config.grace_secs as i64),
                max_length: chrono::Duration::seconds(config.max_recording_secs as i64),
            }),
            archiver,
            tmp_dir: tmp_dir.into(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            event_tx,
        }
    }

    /// Register a channel's recorder
    pub fn add_recorder(&mut self, name: impl Into<String>, recorder: SharedRecorder) {
        let name = name.into();
        tracing::info!("Adding recording channel: {}", name);
        self.channels.push(RecordingChannel { name, recorder });
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Current session phase
    pub fn phase(&self) -> SessionPhase {
        self.tracker.phase()
    }

    /// Run the poll loop until shutdown is signalled
    ///
    /// An open session is closed (and archived best-effort) on the way
    /// out.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!("Session coordinator ready");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(Utc::now()).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        if let Some(session) = self.tracker.session().cloned() {
            tracing::info!("Shutting down with session {} open, closing it", session.id);
            self.close_session(&session).await;
        }
        self.tracker.finish();
        tracing::info!("Session coordinator stopped");
    }

    /// Perform one poll step at the given instant
    pub async fn tick(&mut self, now: DateTime<Utc>) {
        let any_active = self.registry.is_any_active();
        let earliest = self.registry.earliest_active_timestamp();

        match self.tracker.advance(now, any_active, earliest) {
            Some(SessionAction::Start(session)) => self.open_session(&session).await,
            Some(SessionAction::Close(session)) => {
                self.close_session(&session).await;
                // The session is discarded whatever the archiver said
                self.tracker.finish();
            }
            None => {}
        }
    }

    async fn open_session(&mut self, session: &Session) {
        tracing::info!("Session {} opened, recording started", session.id);

        let recorders: Vec<(String, SharedRecorder)> = self
            .channels
            .iter()
            .map(|c| (c.name.clone(), c.recorder.clone()))
            .collect();
        let dir = self.tmp_dir.clone();
        let id = session.id.clone();

        let joined = tokio::task::spawn_blocking(move || {
            for (name, recorder) in recorders {
                if let Err(e) = recorder.lock().start(&dir, &id) {
                    // A channel that cannot open its sink sits this
                    // session out; the others keep going
                    tracing::error!("Channel {} failed to start recording: {}", name, e);
                }
            }
        })
        .await;

        if let Err(e) = joined {
            tracing::error!("Recorder start task panicked: {}", e);
        }

        let _ = self.event_tx.send(SessionEvent::Opened {
            session: session.clone(),
        });
    }

    async fn close_session(&mut self, session: &Session) {
        tracing::info!("Session {} closing, recording stopped", session.id);

        let recorders: Vec<(String, SharedRecorder)> = self
            .channels
            .iter()
            .map(|c| (c.name.clone(), c.recorder.clone()))
            .collect();
        let archiver = self.archiver.clone();
        let id = session.id.clone();

        let joined = tokio::task::spawn_blocking(move || {
            let mut artifacts: Vec<SessionArtifact> = Vec::new();
            for (name, recorder) in recorders {
                match recorder.lock().stop() {
                    Ok(artifact) => artifacts.push(artifact),
                    Err(e) => {
                        tracing::warn!("Channel {} produced no artifact: {}", name, e);
                    }
                }
            }

            match archiver.merge(&id, &artifacts) {
                Ok(path) => Some(path),
                Err(e) => {
                    // Sources stay on disk for manual recovery; no retry
                    tracing::error!("Archiving session {} failed: {}", id, e);
                    None
                }
            }
        })
        .await;

        let archived = match joined {
            Ok(archived) => archived,
            Err(e) => {
                tracing::error!("Session close task panicked: {}", e);
                None
            }
        };

        let _ = self.event_tx.send(SessionEvent::Closed {
            session: session.clone(),
            archived,
        });
        tracing::info!("Waiting for activity...");
    }
}
