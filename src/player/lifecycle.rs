//! Session lifecycle.
//!
//! [`Controller`] owns the media element and at most one [`PlaybackSession`].
//! It opens sessions, applies the resume offset, routes element events to the
//! scheduler and tears sessions down in a fixed order:
//!
//! 1. cancel the session's timers and any in-flight fetch
//! 2. persist the final position (awaited)
//! 3. stop the keep-alive job if the session started it (awaited)
//! 4. leave fullscreen and release the media source
//! 5. publish [`NoticePayload::SessionClosed`]

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use theatre_common::{MediaReference, Result, SeriesId, SessionId, Timecode};
use tokio::sync::mpsc::UnboundedSender;

use super::controls::{self, ControlsOverlay, ProgressBar};
use super::element::{MediaElement, MediaEvent};
use super::heartbeat::Heartbeat;
use super::notice::{CloseReason, NoticeBus, NoticePayload};
use super::report::{Failure, FailureKind, FailureReporter};
use super::scheduler::{ChunkScheduler, Trigger};
use super::session::{Capabilities, PendingFetch, PlaybackSession, Phase};
use super::PlayerEvent;
use crate::backend::{Backend, ByteRange, RangeChunk};
use crate::config::{Config, KeepAliveConfig, SessionConfig};

/// Summary of a session that finished closing.
#[derive(Debug, Clone)]
pub struct ClosedSession {
    pub id: SessionId,
    pub reference: MediaReference,
    pub capabilities: Capabilities,
    pub reason: CloseReason,
    pub position: Timecode,
}

pub struct Controller<E: MediaElement> {
    session_config: SessionConfig,
    keep_alive: KeepAliveConfig,
    scheduler: ChunkScheduler,
    heartbeat: Heartbeat,
    controls: ControlsOverlay,
    backend: Arc<dyn Backend>,
    reporter: Arc<dyn FailureReporter>,
    notices: Arc<NoticeBus>,
    element: E,
    session: Option<PlaybackSession>,
    tx: UnboundedSender<PlayerEvent>,
}

impl<E: MediaElement> Controller<E> {
    pub fn new(
        config: &Config,
        backend: Arc<dyn Backend>,
        reporter: Arc<dyn FailureReporter>,
        notices: Arc<NoticeBus>,
        element: E,
        tx: UnboundedSender<PlayerEvent>,
    ) -> Self {
        Self {
            session_config: config.session.clone(),
            keep_alive: config.keep_alive.clone(),
            scheduler: ChunkScheduler::new(&config.scheduler),
            heartbeat: Heartbeat::new(&config.heartbeat),
            controls: ControlsOverlay::new(&config.controls),
            backend,
            reporter,
            notices,
            element,
            session: None,
            tx,
        }
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn element(&self) -> &E {
        &self.element
    }

    pub fn element_mut(&mut self) -> &mut E {
        &mut self.element
    }

    pub(crate) fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub(crate) fn report(&self, session: Option<SessionId>, kind: FailureKind, message: impl Into<String>) {
        self.reporter.report(Failure::new(session, kind, message));
    }

    pub(crate) fn notify(&self, payload: NoticePayload) {
        self.notices.publish(payload);
    }

    /// The open session when `id` names it and it is not shutting down.
    fn live_session(&mut self, id: SessionId) -> Option<&mut PlaybackSession> {
        self.session
            .as_mut()
            .filter(|s| s.id == id && !s.phase.is_terminating())
    }

    /// Open a session for `reference`, closing any session already open.
    pub async fn open(&mut self, reference: MediaReference, capabilities: Capabilities) -> SessionId {
        if self.session.is_some() {
            self.close(CloseReason::Replaced).await;
        }

        let mut session = PlaybackSession::new(reference, capabilities);
        let id = session.id;
        session.transition(Phase::Opening);

        tracing::info!(
            session = %id,
            media = %session.reference,
            resume = %session.reference.resume_offset,
            "Opening playback session"
        );

        if capabilities.keep_alive && self.keep_alive.enabled {
            session.keep_alive_active = true;
            Self::spawn_keep_alive_start(&self.backend, &self.keep_alive, &self.tx, &mut session);
        }

        self.heartbeat.arm(&mut session, self.tx.clone());
        self.controls.show(&mut session, self.tx.clone());

        let delay = self.session_config.startup_delay_ms;
        if delay > 0 {
            session.startup_timer.arm_once(
                Duration::from_millis(delay),
                self.tx.clone(),
                PlayerEvent::StartupElapsed(id),
            );
        }

        self.notify(NoticePayload::SessionOpened {
            session: id,
            reference: session.reference.clone(),
        });
        self.notify(NoticePayload::ControlsVisibility {
            session: id,
            visible: true,
        });
        self.session = Some(session);

        if delay == 0 {
            self.begin_playback(id);
        }

        id
    }

    fn spawn_keep_alive_start(
        backend: &Arc<dyn Backend>,
        keep_alive: &KeepAliveConfig,
        tx: &UnboundedSender<PlayerEvent>,
        session: &mut PlaybackSession,
    ) {
        let id = session.id;
        let backend = Arc::clone(backend);
        let interval = keep_alive.interval.clone();
        let tx = tx.clone();

        session.keep_alive_pending = true;
        session.keep_alive_start = Some(tokio::spawn(async move {
            let result = backend.start_keep_alive(&interval).await;
            let _ = tx.send(PlayerEvent::KeepAliveStarted {
                session: id,
                result,
            });
        }));
    }

    /// Apply the resume offset and start playing. Runs once per session.
    pub fn begin_playback(&mut self, id: SessionId) {
        let Some(session) = self
            .session
            .as_mut()
            .filter(|s| s.id == id && s.phase == Phase::Opening)
        else {
            return;
        };
        session.startup_timer.cancel();

        let mut resumed_at = None;
        if !session.resume_applied {
            session.resume_applied = true;
            match session.reference.resume_offset.seconds() {
                Ok(0) => {}
                Ok(seconds) => {
                    session.transition(Phase::SkippingToResume);
                    self.element.seek(seconds as f64);
                    resumed_at = Some(seconds);
                }
                Err(e) => {
                    self.reporter.report(Failure::new(
                        Some(id),
                        FailureKind::MalformedResumeOffset,
                        e.to_string(),
                    ));
                }
            }
        }

        self.element.play();
        session.transition(Phase::Playing);

        if !session.fullscreen_requested {
            session.fullscreen_requested = true;
            if self.session_config.fullscreen_on_start {
                self.element.request_fullscreen();
            }
        }

        self.notify(NoticePayload::PlaybackStarted {
            session: id,
            resumed_at,
        });

        self.evaluate(Trigger::Progress);
    }

    /// Run the scheduler against the element and start a fetch when one is due.
    fn evaluate(&mut self, trigger: Trigger) {
        let Some(session) = self.session.as_mut().filter(|s| s.phase.is_active()) else {
            return;
        };
        session.observe(&self.element);

        let Some(plan) = self.scheduler.evaluate(session, trigger) else {
            return;
        };

        let id = session.id;
        let reference = session.reference.clone();
        let position = session.position();
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        let range = plan.range;

        tracing::debug!(session = %id, range = %range, position = %position, "Fetching chunk");

        let task = tokio::spawn(async move {
            let result = backend.fetch_range(&reference, range, &position).await;
            let _ = tx.send(PlayerEvent::ChunkFetched {
                session: id,
                range,
                result,
            });
        });

        session.pending_fetch = Some(PendingFetch {
            range,
            previous: plan.previous,
            task,
        });
        if session.phase == Phase::Playing {
            session.transition(Phase::Buffering);
        }
    }

    pub fn on_chunk_fetched(&mut self, id: SessionId, range: ByteRange, result: Result<RangeChunk>) {
        let Some(session) = self
            .session
            .as_mut()
            .filter(|s| s.id == id && !s.phase.is_terminating())
        else {
            tracing::debug!(session = %id, range = %range, "Dropping chunk for closed session");
            return;
        };

        match session.pending_fetch.take() {
            Some(pending) if pending.range == range => match result {
                Ok(chunk) => {
                    if chunk.total_len.is_some() {
                        session.content_length = chunk.total_len;
                    }
                    session.cursor.commit(chunk.range);
                    self.scheduler.deliver(&mut self.element, chunk.bytes);
                    session.has_source = true;
                }
                Err(e) => {
                    session.cursor = pending.previous;
                    self.reporter.report(Failure::new(
                        Some(id),
                        FailureKind::ChunkFetch,
                        format!("range {}: {}", range, e),
                    ));
                }
            },
            other => {
                session.pending_fetch = other;
                tracing::debug!(session = %id, range = %range, "Dropping stale chunk");
                return;
            }
        }

        if session.phase == Phase::Buffering {
            session.transition(Phase::Playing);
        }
    }

    /// Handle an element event. Returns the closed session when playback ended.
    pub async fn on_media(&mut self, event: MediaEvent) -> Option<ClosedSession> {
        let phase = self.session.as_ref()?.phase;
        if !phase.is_active() {
            return None;
        }

        match event {
            MediaEvent::TimeUpdate => self.evaluate(Trigger::Progress),
            MediaEvent::Seeked => self.evaluate(Trigger::Seek),
            MediaEvent::Ended => return self.close(CloseReason::NaturalEnd).await,
            MediaEvent::Paused => {
                if let Some(session) = self.session.as_mut() {
                    session.transition(Phase::Paused);
                }
            }
            MediaEvent::Playing => {
                if let Some(session) = self.session.as_mut() {
                    if session.phase == Phase::Paused {
                        let next = if session.fetch_in_flight() {
                            Phase::Buffering
                        } else {
                            Phase::Playing
                        };
                        session.transition(next);
                    }
                }
            }
        }
        None
    }

    pub fn on_heartbeat_tick(&mut self, id: SessionId) {
        let Some(session) = self
            .session
            .as_mut()
            .filter(|s| s.id == id && s.phase.is_active())
        else {
            return;
        };
        session.observe(&self.element);
        Heartbeat::beat(Arc::clone(&self.backend), Arc::clone(&self.reporter), session);

        // A keep-alive start that failed is retried once per tick.
        if session.keep_alive_active && !session.keep_alive_confirmed && !session.keep_alive_pending {
            tracing::debug!(session = %id, "Retrying keep-alive start");
            Self::spawn_keep_alive_start(&self.backend, &self.keep_alive, &self.tx, session);
        }
    }

    pub fn on_keep_alive_started(&mut self, id: SessionId, result: Result<()>) {
        let Some(session) = self.live_session(id) else {
            return;
        };
        session.keep_alive_pending = false;
        session.keep_alive_start = None;

        match result {
            Ok(()) => {
                session.keep_alive_confirmed = true;
                tracing::debug!(session = %id, "Keep-alive job started");
            }
            Err(e) => self.report(Some(id), FailureKind::KeepAliveStart, e.to_string()),
        }
    }

    pub fn on_startup_elapsed(&mut self, id: SessionId) {
        self.begin_playback(id);
    }

    pub fn on_hide_controls(&mut self, id: SessionId) {
        let controls = self.controls;
        let Some(session) = self.live_session(id) else {
            return;
        };
        if controls.hide(session) {
            self.notify(NoticePayload::ControlsVisibility {
                session: id,
                visible: false,
            });
        }
    }

    pub fn pointer_moved(&mut self) {
        let Some(session) = self.session.as_mut().filter(|s| !s.phase.is_terminating()) else {
            return;
        };
        let id = session.id;
        if self.controls.show(session, self.tx.clone()) {
            self.notify(NoticePayload::ControlsVisibility {
                session: id,
                visible: true,
            });
        }
    }

    pub fn toggle_play(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.phase {
            Phase::Playing | Phase::Buffering => {
                self.element.pause();
                session.transition(Phase::Paused);
            }
            Phase::Paused => {
                self.element.play();
                let next = if session.fetch_in_flight() {
                    Phase::Buffering
                } else {
                    Phase::Playing
                };
                session.transition(next);
            }
            _ => {}
        }
    }

    /// Seek by `delta` seconds, clamped to the media.
    pub fn seek_by(&mut self, delta: f64) {
        if !self.session.as_ref().is_some_and(|s| s.phase.is_active()) {
            return;
        }
        let target = controls::seek_target(self.element.current_time(), delta, self.element.duration());
        // The element answers with `Seeked`, which runs the scheduler.
        self.element.seek(target);
    }

    pub fn seek_step(&self) -> f64 {
        self.controls.seek_step()
    }

    /// Seek to the media position under the pointer and persist it.
    pub fn scrub(&mut self, pointer_x: f64, bar: ProgressBar) {
        let Some(session) = self.session.as_mut().filter(|s| s.phase.is_active()) else {
            return;
        };
        let Some(target) = bar.position_at(pointer_x, self.element.duration()) else {
            return;
        };

        self.element.seek(target);
        session.observe(&self.element);
        Heartbeat::beat(Arc::clone(&self.backend), Arc::clone(&self.reporter), session);
    }

    /// Record the episode a series is on. Failures are reported, not returned.
    pub(crate) async fn persist_current_index(&self, series: SeriesId, index: usize) {
        if let Err(e) = self.backend.set_current_index(series, index).await {
            self.report(None, FailureKind::CurrentIndex, e.to_string());
        }
    }

    /// Tear down the open session. A second call, or a call with no session, does nothing.
    pub async fn close(&mut self, reason: CloseReason) -> Option<ClosedSession> {
        let session = self.session.as_mut()?;
        if session.phase.is_terminating() {
            return None;
        }

        session.transition(Phase::Closing);
        session.observe(&self.element);
        session.cancel_timers();
        session.abandon_fetch();

        Heartbeat::flush(self.backend.as_ref(), self.reporter.as_ref(), session).await;

        if session.keep_alive_active {
            // A start still in flight must reach the backend before the stop.
            if let Some(start) = session.keep_alive_start.take() {
                if let Err(e) = start.await {
                    tracing::debug!(session = %session.id, "Keep-alive start task ended: {}", e);
                }
            }
            if let Err(e) = self.backend.stop_keep_alive().await {
                self.reporter.report(Failure::new(
                    Some(session.id),
                    FailureKind::KeepAliveStop,
                    e.to_string(),
                ));
            }
            session.keep_alive_active = false;
        }

        if self.element.is_fullscreen() {
            self.element.exit_fullscreen();
        }
        if session.has_source {
            self.element.release_source();
            session.has_source = false;
        }
        session.transition(Phase::Closed);

        let session = self.session.take()?;
        let position = session.resume_point();

        tracing::info!(
            session = %session.id,
            media = %session.reference,
            position = %position,
            reason = ?reason,
            duration_secs = (Utc::now() - session.opened_at).num_seconds(),
            "Playback session closed"
        );

        self.notify(NoticePayload::SessionClosed {
            session: session.id,
            reference: session.reference.clone(),
            reason,
            position: position.clone(),
        });

        Some(ClosedSession {
            id: session.id,
            reference: session.reference,
            capabilities: session.capabilities,
            reason,
            position,
        })
    }
}
