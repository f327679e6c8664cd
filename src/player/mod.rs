//! Playback controller.
//!
//! A [`Player`] is a single event loop. UI commands, media element events,
//! timer ticks and network completions all arrive as [`PlayerEvent`]s on one
//! channel and are handled in order, so session state is never shared between
//! tasks. Timer and network events carry the [`SessionId`] of the session that
//! started them and are dropped when that session is gone.

pub mod controls;
pub mod element;
pub mod heartbeat;
pub mod lifecycle;
pub mod notice;
pub mod report;
pub mod scheduler;
pub mod sequence;
pub mod session;
pub mod timer;

pub use controls::ProgressBar;
pub use element::{MediaElement, MediaEvent};
pub use lifecycle::{ClosedSession, Controller};
pub use notice::{CloseReason, Notice, NoticeBus, NoticePayload};
pub use report::{CollectingReporter, Failure, FailureKind, FailureReporter, TracingReporter};
pub use sequence::{Advance, Resume, SequenceAdvancer};
pub use session::{Capabilities, ChunkCursor, Phase, PlaybackSession};

use std::sync::Arc;
use theatre_common::{MediaReference, Result, SeriesId, SessionId};
use tokio::sync::mpsc;

use crate::backend::{Backend, ByteRange, RangeChunk};
use crate::config::Config;

/// Requests from the UI.
#[derive(Debug, Clone)]
pub enum Command {
    /// Play a movie from its resume offset.
    PlayMovie(MediaReference),
    /// Open any reference with explicit capabilities.
    Open {
        reference: MediaReference,
        capabilities: Capabilities,
    },
    PlayEpisode {
        series: SeriesId,
        index: usize,
        resume: Resume,
    },
    /// Resume a series at its last played episode.
    ContinueSeries(SeriesId),
    TogglePlay,
    SeekForward,
    SeekBackward,
    Scrub {
        pointer_x: f64,
        bar: ProgressBar,
    },
    PointerMoved,
    /// Close the session and leave any series.
    Close,
    /// Close everything and stop the loop.
    Shutdown,
}

/// Everything the event loop reacts to.
#[derive(Debug)]
pub enum PlayerEvent {
    Command(Command),
    Media(MediaEvent),
    StartupElapsed(SessionId),
    HeartbeatTick(SessionId),
    HideControls(SessionId),
    ChunkFetched {
        session: SessionId,
        range: ByteRange,
        result: Result<RangeChunk>,
    },
    KeepAliveStarted {
        session: SessionId,
        result: Result<()>,
    },
}

/// Discriminant of a [`PlayerEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Command,
    Media,
    StartupElapsed,
    HeartbeatTick,
    HideControls,
    ChunkFetched,
    KeepAliveStarted,
}

impl PlayerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Command(_) => EventKind::Command,
            Self::Media(_) => EventKind::Media,
            Self::StartupElapsed(_) => EventKind::StartupElapsed,
            Self::HeartbeatTick(_) => EventKind::HeartbeatTick,
            Self::HideControls(_) => EventKind::HideControls,
            Self::ChunkFetched { .. } => EventKind::ChunkFetched,
            Self::KeepAliveStarted { .. } => EventKind::KeepAliveStarted,
        }
    }
}

/// Whether the loop keeps running after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Shutdown,
}

/// Cloneable sender into a [`Player`].
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    tx: mpsc::UnboundedSender<PlayerEvent>,
}

impl PlayerHandle {
    /// Returns `false` when the player is gone.
    pub fn command(&self, command: Command) -> bool {
        self.tx.send(PlayerEvent::Command(command)).is_ok()
    }

    /// Returns `false` when the player is gone.
    pub fn media(&self, event: MediaEvent) -> bool {
        self.tx.send(PlayerEvent::Media(event)).is_ok()
    }
}

pub struct Player<E: MediaElement> {
    controller: Controller<E>,
    sequence: SequenceAdvancer,
    notices: Arc<NoticeBus>,
    tx: mpsc::UnboundedSender<PlayerEvent>,
    rx: mpsc::UnboundedReceiver<PlayerEvent>,
}

impl<E: MediaElement> Player<E> {
    pub fn new(
        config: &Config,
        backend: Arc<dyn Backend>,
        reporter: Arc<dyn FailureReporter>,
        element: E,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let notices = Arc::new(NoticeBus::default());
        let controller = Controller::new(
            config,
            backend,
            reporter,
            Arc::clone(&notices),
            element,
            tx.clone(),
        );

        Self {
            controller,
            sequence: SequenceAdvancer::new(),
            notices,
            tx,
            rx,
        }
    }

    pub fn handle(&self) -> PlayerHandle {
        PlayerHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn notices(&self) -> Arc<NoticeBus> {
        Arc::clone(&self.notices)
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.controller.session()
    }

    pub fn sequence(&self) -> &SequenceAdvancer {
        &self.sequence
    }

    pub fn element(&self) -> &E {
        self.controller.element()
    }

    pub fn element_mut(&mut self) -> &mut E {
        self.controller.element_mut()
    }

    /// Handle one event.
    pub async fn dispatch(&mut self, event: PlayerEvent) -> Flow {
        match event {
            PlayerEvent::Command(command) => return self.on_command(command).await,
            PlayerEvent::Media(event) => {
                if let Some(closed) = self.controller.on_media(event).await {
                    self.after_close(closed).await;
                }
            }
            PlayerEvent::StartupElapsed(id) => self.controller.on_startup_elapsed(id),
            PlayerEvent::HeartbeatTick(id) => self.controller.on_heartbeat_tick(id),
            PlayerEvent::HideControls(id) => self.controller.on_hide_controls(id),
            PlayerEvent::ChunkFetched {
                session,
                range,
                result,
            } => self.controller.on_chunk_fetched(session, range, result),
            PlayerEvent::KeepAliveStarted { session, result } => {
                self.controller.on_keep_alive_started(session, result)
            }
        }
        Flow::Continue
    }

    async fn on_command(&mut self, command: Command) -> Flow {
        match command {
            Command::PlayMovie(reference) => {
                self.sequence.clear();
                self.controller.open(reference, Capabilities::movie()).await;
            }
            Command::Open {
                reference,
                capabilities,
            } => {
                self.sequence.clear();
                self.controller.open(reference, capabilities).await;
            }
            Command::PlayEpisode {
                series,
                index,
                resume,
            } => {
                if let Err(e) = self
                    .sequence
                    .play_episode(&mut self.controller, series, index, resume)
                    .await
                {
                    tracing::warn!(series = %series, index, "Cannot play episode: {}", e);
                }
            }
            Command::ContinueSeries(series) => {
                if let Err(e) = self
                    .sequence
                    .continue_series(&mut self.controller, series)
                    .await
                {
                    tracing::warn!(series = %series, "Cannot continue series: {}", e);
                }
            }
            Command::TogglePlay => self.controller.toggle_play(),
            Command::SeekForward => {
                let step = self.controller.seek_step();
                self.controller.seek_by(step);
            }
            Command::SeekBackward => {
                let step = self.controller.seek_step();
                self.controller.seek_by(-step);
            }
            Command::Scrub { pointer_x, bar } => self.controller.scrub(pointer_x, bar),
            Command::PointerMoved => self.controller.pointer_moved(),
            Command::Close => {
                self.sequence.clear();
                self.controller.close(CloseReason::UserClose).await;
            }
            Command::Shutdown => {
                self.detach().await;
                return Flow::Shutdown;
            }
        }
        Flow::Continue
    }

    async fn after_close(&mut self, closed: ClosedSession) {
        match self
            .sequence
            .on_session_closed(&mut self.controller, &closed)
            .await
        {
            Advance::Next { index } => tracing::debug!(index, "Advanced to next episode"),
            Advance::Finished | Advance::Unchanged => {}
        }
    }

    /// Close the open session and forget any series. Safe to call repeatedly.
    pub async fn detach(&mut self) {
        self.sequence.clear();
        self.controller.close(CloseReason::Detached).await;
    }

    /// Wait for the next event and handle it. Returns its kind.
    pub async fn step(&mut self) -> Option<EventKind> {
        let event = self.rx.recv().await?;
        let kind = event.kind();
        self.dispatch(event).await;
        Some(kind)
    }

    /// Handle events until a [`Command::Shutdown`] arrives.
    pub async fn run(&mut self) {
        tracing::debug!("Player loop started");
        while let Some(event) = self.rx.recv().await {
            if self.dispatch(event).await == Flow::Shutdown {
                break;
            }
        }
        tracing::debug!("Player loop stopped");
    }
}
