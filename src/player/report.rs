//! Failure reporting.
//!
//! Backend failures during playback never interrupt the session. They are
//! handed to a [`FailureReporter`] and playback continues.

use parking_lot::Mutex;
use std::fmt;
use theatre_common::SessionId;

/// Which operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    ChunkFetch,
    Heartbeat,
    FinalFlush,
    KeepAliveStart,
    KeepAliveStop,
    CurrentIndex,
    EpisodeListing,
    MalformedResumeOffset,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ChunkFetch => "chunk_fetch",
            Self::Heartbeat => "heartbeat",
            Self::FinalFlush => "final_flush",
            Self::KeepAliveStart => "keep_alive_start",
            Self::KeepAliveStop => "keep_alive_stop",
            Self::CurrentIndex => "current_index",
            Self::EpisodeListing => "episode_listing",
            Self::MalformedResumeOffset => "malformed_resume_offset",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct Failure {
    pub session: Option<SessionId>,
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(session: Option<SessionId>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            session,
            kind,
            message: message.into(),
        }
    }
}

/// Sink for non-fatal playback failures.
pub trait FailureReporter: Send + Sync {
    fn report(&self, failure: Failure);
}

/// Logs failures as warnings.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl FailureReporter for TracingReporter {
    fn report(&self, failure: Failure) {
        match failure.session {
            Some(session) => tracing::warn!(
                session = %session,
                kind = %failure.kind,
                "Playback failure: {}",
                failure.message
            ),
            None => tracing::warn!(kind = %failure.kind, "Playback failure: {}", failure.message),
        }
    }
}

/// Keeps every failure in memory, then logs it.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    failures: Mutex<Vec<Failure>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<Failure> {
        self.failures.lock().clone()
    }

    pub fn count(&self, kind: FailureKind) -> usize {
        self.failures.lock().iter().filter(|f| f.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.lock().is_empty()
    }
}

impl FailureReporter for CollectingReporter {
    fn report(&self, failure: Failure) {
        TracingReporter.report(failure.clone());
        self.failures.lock().push(failure);
    }
}
