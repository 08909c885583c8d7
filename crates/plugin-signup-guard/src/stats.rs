//! Counters shared by the hook plugin and the stats application.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Event counters of the signup guard.
#[derive(Debug)]
pub struct GuardStats {
    /// When the counters were created.
    since: DateTime<Utc>,
    signups_checked: AtomicU64,
    signups_rejected: AtomicU64,
    logins: AtomicU64,
    sessions_started: AtomicU64,
    sessions_terminated: AtomicU64,
}

/// Point-in-time copy of [`GuardStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// When counting started.
    pub since: DateTime<Utc>,
    /// Signups inspected.
    pub signups_checked: u64,
    /// Signups rejected for a blocked domain.
    pub signups_rejected: u64,
    /// Logins observed.
    pub logins: u64,
    /// Compute sessions started.
    pub sessions_started: u64,
    /// Compute sessions terminated.
    pub sessions_terminated: u64,
}

impl GuardStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self {
            since: Utc::now(),
            signups_checked: AtomicU64::new(0),
            signups_rejected: AtomicU64::new(0),
            logins: AtomicU64::new(0),
            sessions_started: AtomicU64::new(0),
            sessions_terminated: AtomicU64::new(0),
        }
    }

    /// Records an inspected signup.
    pub fn record_signup(&self, rejected: bool) {
        self.signups_checked.fetch_add(1, Ordering::Relaxed);
        if rejected {
            self.signups_rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records a login.
    pub fn record_login(&self) {
        self.logins.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a compute session start.
    pub fn record_session_start(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a compute session termination.
    pub fn record_session_terminate(&self) {
        self.sessions_terminated.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a snapshot.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            since: self.since,
            signups_checked: self.signups_checked.load(Ordering::Relaxed),
            signups_rejected: self.signups_rejected.load(Ordering::Relaxed),
            logins: self.logins.load(Ordering::Relaxed),
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_terminated: self.sessions_terminated.load(Ordering::Relaxed),
        }
    }
}

impl Default for GuardStats {
    fn default() -> Self {
        Self::new()
    }
}
