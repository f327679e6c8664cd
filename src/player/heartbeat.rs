//! Periodic progress persistence.
//!
//! While a session is open its position is written to the backend every
//! `interval_secs`, and once more (awaited) when the session closes.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use super::report::{Failure, FailureKind, FailureReporter};
use super::session::PlaybackSession;
use super::PlayerEvent;
use crate::backend::Backend;
use crate::config::HeartbeatConfig;

#[derive(Debug, Clone, Copy)]
pub struct Heartbeat {
    interval: Duration,
}

impl Heartbeat {
    pub fn new(config: &HeartbeatConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start the session's tick timer. The first tick fires one interval after opening.
    pub fn arm(&self, session: &mut PlaybackSession, tx: UnboundedSender<PlayerEvent>) {
        let id = session.id;
        session
            .heartbeat_timer
            .arm_interval(self.interval, tx, move || PlayerEvent::HeartbeatTick(id));
    }

    /// Persist the current position without waiting for the result.
    pub fn beat(
        backend: Arc<dyn Backend>,
        reporter: Arc<dyn FailureReporter>,
        session: &PlaybackSession,
    ) -> JoinHandle<()> {
        let id = session.id;
        let reference = session.reference.clone();
        let position = session.position();

        tracing::trace!(session = %id, position = %position, "Heartbeat");

        tokio::spawn(async move {
            if let Err(e) = backend.persist_progress(&reference, &position).await {
                reporter.report(Failure::new(Some(id), FailureKind::Heartbeat, e.to_string()));
            }
        })
    }

    /// Persist the final position and wait for the outcome.
    ///
    /// A session closed before its resume offset was applied persists that
    /// offset unchanged.
    pub async fn flush(
        backend: &dyn Backend,
        reporter: &dyn FailureReporter,
        session: &PlaybackSession,
    ) -> bool {
        let position = session.resume_point();
        match backend.persist_progress(&session.reference, &position).await {
            Ok(()) => {
                tracing::debug!(session = %session.id, position = %position, "Final progress saved");
                true
            }
            Err(e) => {
                reporter.report(Failure::new(
                    Some(session.id),
                    FailureKind::FinalFlush,
                    e.to_string(),
                ));
                false
            }
        }
    }
}
