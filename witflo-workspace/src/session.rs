//! Session lifecycle and the auto-lock idle timer.
//!
//! Structurally grounded on `citadel-keystore::threat::ThreatAssessor`: a
//! `Mutex`-guarded struct that records events, recomputes its own state on
//! each event plus an external poll, and keeps a transition history. The
//! threat-scoring math itself has no counterpart here — this just compares
//! elapsed idle time against a configured duration.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutoLockDuration {
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    Disabled,
}

impl AutoLockDuration {
    pub fn as_duration(self) -> Option<Duration> {
        match self {
            Self::FiveMinutes => Some(Duration::from_secs(5 * 60)),
            Self::FifteenMinutes => Some(Duration::from_secs(15 * 60)),
            Self::ThirtyMinutes => Some(Duration::from_secs(30 * 60)),
            Self::OneHour => Some(Duration::from_secs(60 * 60)),
            Self::Disabled => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Unlocked,
    Locked,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum LockCause {
    IdleExpiry,
    BackgroundEvent,
    Explicit,
}

struct Inner {
    state: SessionState,
    last_activity: Instant,
    duration: AutoLockDuration,
    history: Vec<(SessionState, Instant)>,
}

/// Tracks idle time since the last user activity and decides when a vault
/// should auto-lock. Polling granularity is left to the caller (`spec.md`
/// §4.9 calls for ≤10s); this struct only answers "should I lock now?" —
/// it does not own a timer thread.
pub struct Session {
    inner: Mutex<Inner>,
}

impl Session {
    pub fn new(duration: AutoLockDuration) -> Self {
        let now = Instant::now();
        Self {
            inner: Mutex::new(Inner {
                state: SessionState::Unlocked,
                last_activity: now,
                duration,
                history: vec![(SessionState::Unlocked, now)],
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().unwrap().state
    }

    /// Records user activity, resetting the idle clock. Resurrects a
    /// `Locked` session back to `Unlocked`? No — activity alone never
    /// unlocks; the caller must re-authenticate. This only matters while
    /// `Unlocked`.
    pub fn record_activity(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == SessionState::Unlocked {
            inner.last_activity = Instant::now();
        }
    }

    /// Polls the idle timer and locks if it has expired. Returns the lock
    /// cause if a transition happened this call, `None` otherwise.
    pub fn poll(&self) -> Option<LockCause> {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != SessionState::Unlocked {
            return None;
        }
        let Some(timeout) = inner.duration.as_duration() else {
            return None;
        };
        if inner.last_activity.elapsed() >= timeout {
            inner.state = SessionState::Locked;
            inner.history.push((SessionState::Locked, Instant::now()));
            info!("session auto-locked after idle timeout");
            return Some(LockCause::IdleExpiry);
        }
        None
    }

    /// Locks immediately regardless of idle time: app backgrounded, device
    /// slept, or the user asked to lock explicitly.
    pub fn lock_now(&self, cause: LockCause) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = SessionState::Locked;
        inner.history.push((SessionState::Locked, Instant::now()));
        info!(?cause, "session locked");
    }

    pub fn unlock(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = SessionState::Unlocked;
        inner.last_activity = Instant::now();
        inner.history.push((SessionState::Unlocked, Instant::now()));
    }

    pub fn set_duration(&self, duration: AutoLockDuration) {
        self.inner.lock().unwrap().duration = duration;
    }

    /// Test hook: backdates the last-activity timestamp so idle expiry can
    /// be exercised without an actual wait (`spec.md` §8 scenario S5
    /// advances simulated time rather than sleeping).
    pub fn backdate_last_activity(&self, by: Duration) {
        self.inner.lock().unwrap().last_activity = Instant::now() - by;
    }

    pub fn transition_count(&self) -> usize {
        self.inner.lock().unwrap().history.len()
    }
}

impl std::fmt::Debug for LockCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::IdleExpiry => "idle_expiry",
            Self::BackgroundEvent => "background_event",
            Self::Explicit => "explicit",
        };
        write!(f, "{label}")
    }
}
