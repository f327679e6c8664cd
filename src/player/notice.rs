//! Notices published to the embedding UI.
//!
//! [`NoticeBus`] wraps a `tokio::sync::broadcast` channel with a bounded
//! ring-buffer of recent notices so a UI attaching late can catch up.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use theatre_common::{MediaReference, SeriesId, SessionId, Timecode};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Maximum number of notices retained in the ring buffer.
const MAX_RECENT_NOTICES: usize = 100;

/// Why a session was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The user closed the player.
    UserClose,
    /// Playback reached the end of the media.
    NaturalEnd,
    /// A new session was opened over this one.
    Replaced,
    /// The controller was detached from its host.
    Detached,
}

/// What happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NoticePayload {
    SessionOpened {
        session: SessionId,
        reference: MediaReference,
    },
    PlaybackStarted {
        session: SessionId,
        /// Seconds skipped to on start, when a resume offset was applied.
        resumed_at: Option<u64>,
    },
    SessionClosed {
        session: SessionId,
        reference: MediaReference,
        reason: CloseReason,
        position: Timecode,
    },
    ControlsVisibility {
        session: SessionId,
        visible: bool,
    },
    SequenceAdvanced {
        series: SeriesId,
        index: usize,
    },
    SequenceFinished {
        series: SeriesId,
    },
}

/// A timestamped notice ready for broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub payload: NoticePayload,
}

impl Notice {
    pub fn new(payload: NoticePayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Broadcast channel with a bounded ring buffer of recent notices.
pub struct NoticeBus {
    tx: broadcast::Sender<Notice>,
    recent: RwLock<VecDeque<Notice>>,
}

impl NoticeBus {
    /// `capacity` sizes the broadcast channel, not the ring buffer.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            recent: RwLock::new(VecDeque::with_capacity(MAX_RECENT_NOTICES)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn publish(&self, payload: NoticePayload) {
        let notice = Notice::new(payload);

        {
            let mut recent = self.recent.write();
            if recent.len() >= MAX_RECENT_NOTICES {
                recent.pop_back();
            }
            recent.push_front(notice.clone());
        }

        // No subscribers is fine.
        let _ = self.tx.send(notice);
    }

    /// The `n` most recent notices, newest first.
    pub fn recent(&self, n: usize) -> Vec<Notice> {
        self.recent.read().iter().take(n).cloned().collect()
    }

    /// All retained notices, oldest first.
    pub fn history(&self) -> Vec<NoticePayload> {
        self.recent
            .read()
            .iter()
            .rev()
            .map(|n| n.payload.clone())
            .collect()
    }
}

impl Default for NoticeBus {
    fn default() -> Self {
        Self::new(64)
    }
}
