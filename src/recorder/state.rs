//! Session state management
//!
//! The session lifecycle as a pure, timestamp-driven state machine. The
//! coordinator feeds it registry observations each tick and performs the
//! side effects it asks for; keeping the transitions free of clocks and
//! I/O is what makes the hysteresis and hard-cap rules testable.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Phase of the system-wide recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// No session open
    Idle,
    /// Session opened this tick; recorders are being started
    Armed,
    /// At least one channel active, recorders running
    Recording,
    /// All channels quiet; still recording through the grace period
    Grace,
    /// Recorders stopping, artifacts being archived
    Closing,
}

impl Default for SessionPhase {
    fn default() -> Self {
        Self::Idle
    }
}

/// One shared recording session; at most one is open system-wide
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Session id, also the artifact stem: start time as %Y%m%d_%H%M%S
    pub id: String,

    /// Start time = earliest first-activation timestamp across channels
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            id: started_at.format("%Y%m%d_%H%M%S").to_string(),
            started_at,
        }
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        now - self.started_at
    }
}

/// Session policy knobs
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    /// Keep recording this long after the last channel goes quiet
    pub grace: Duration,

    /// Hard cap on session duration; fires even while still detecting
    pub max_length: Duration,
}

/// Side effect requested by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Start all recorders for this newly opened session
    Start(Session),

    /// Stop all recorders and archive this session's artifacts
    Close(Session),
}

/// Drives the session phase from per-tick registry observations
#[derive(Debug)]
pub struct SessionTracker {
    policy: SessionPolicy,
    phase: SessionPhase,
    session: Option<Session>,
    quiet_since: Option<DateTime<Utc>>,
}

impl SessionTracker {
    pub fn new(policy: SessionPolicy) -> Self {
        Self {
            policy,
            phase: SessionPhase::Idle,
            session: None,
            quiet_since: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Advance one poll tick
    ///
    /// `any_active` and `earliest` are the registry observations for this
    /// tick. Opening is guarded by the phase itself: a continuously
    /// active channel cannot re-open a session because only Idle arms.
    pub fn advance(
        &mut self,
        now: DateTime<Utc>,
        any_active: bool,
        earliest: Option<DateTime<Utc>>,
    ) -> Option<SessionAction> {
        match self.phase {
            SessionPhase::Idle => {
                if !any_active {
                    return None;
                }

                // Time the session from whichever channel detected first,
                // not from this poll tick
                let session = Session::new(earliest.unwrap_or(now));
                self.session = Some(session.clone());
                self.phase = SessionPhase::Armed;
                self.quiet_since = None;
                Some(SessionAction::Start(session))
            }

            SessionPhase::Armed | SessionPhase::Recording => {
                if self.cap_reached(now) {
                    return Some(self.begin_close());
                }

                if any_active {
                    self.phase = SessionPhase::Recording;
                } else {
                    self.phase = SessionPhase::Grace;
                    self.quiet_since = Some(now);
                }
                None
            }

            SessionPhase::Grace => {
                if self.cap_reached(now) {
                    return Some(self.begin_close());
                }

                if any_active {
                    // Re-activation during grace resumes the same session
                    self.phase = SessionPhase::Recording;
                    self.quiet_since = None;
                    return None;
                }

                let quiet_since = self.quiet_since.unwrap_or(now);
                if now - quiet_since >= self.policy.grace {
                    return Some(self.begin_close());
                }
                None
            }

            // Close already requested; waiting for finish()
            SessionPhase::Closing => None,
        }
    }

    /// Discard the session after the close side effects ran, regardless
    /// of their outcome
    pub fn finish(&mut self) {
        self.session = None;
        self.quiet_since = None;
        self.phase = SessionPhase::Idle;
    }

    fn cap_reached(&self, now: DateTime<Utc>) -> bool {
        self.session
            .as_ref()
            .map(|s| s.elapsed(now) >= self.policy.max_length)
            .unwrap_or(false)
    }

    fn begin_close(&mut self) -> SessionAction {
        self.phase = SessionPhase::Closing;
        let session = self
            .session
            .clone()
            .expect("close requested without an open session");
        SessionAction::Close(session)
    }
}
