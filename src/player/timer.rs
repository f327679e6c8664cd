//! Owned timer handles.
//!
//! Every periodic or delayed callback of a session is a spawned task that only
//! sends a [`PlayerEvent`] tagged with the session ID. The session keeps the
//! [`TimerHandle`] and aborts it when closing.

use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use super::PlayerEvent;

/// A named, cancellable timer task.
#[derive(Debug)]
pub struct TimerHandle {
    name: &'static str,
    task: Option<JoinHandle<()>>,
}

impl TimerHandle {
    /// A handle with no running task.
    pub fn idle(name: &'static str) -> Self {
        Self { name, task: None }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Send `make_event()` every `period`, first after one full period.
    pub fn arm_interval<F>(&mut self, period: Duration, tx: UnboundedSender<PlayerEvent>, make_event: F)
    where
        F: Fn() -> PlayerEvent + Send + 'static,
    {
        self.cancel();
        self.task = Some(tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                if tx.send(make_event()).is_err() {
                    break;
                }
            }
        }));
    }

    /// Send `event` once after `delay`.
    pub fn arm_once(&mut self, delay: Duration, tx: UnboundedSender<PlayerEvent>, event: PlayerEvent) {
        self.cancel();
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(event);
        }));
    }

    /// Abort the task. Returns `false` when nothing was armed.
    pub fn cancel(&mut self) -> bool {
        match self.task.take() {
            Some(task) => {
                task.abort();
                tracing::trace!(timer = self.name, "Timer cancelled");
                true
            }
            None => false,
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
