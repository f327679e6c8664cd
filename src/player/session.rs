//! State of one open-to-close playback session.

use chrono::{DateTime, Utc};
use std::fmt;
use theatre_common::{MediaReference, SessionId, Timecode};
use tokio::task::JoinHandle;

use super::element::MediaElement;
use super::timer::TimerHandle;
use crate::backend::ByteRange;

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    Opening,
    SkippingToResume,
    Playing,
    Paused,
    Buffering,
    Closing,
    Closed,
}

impl Phase {
    /// Phases during which media events, heartbeats and fetches are handled.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Playing | Self::Paused | Self::Buffering)
    }

    /// Phases after which no further work may start.
    pub fn is_terminating(self) -> bool {
        matches!(self, Self::Closing | Self::Closed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Opening => "opening",
            Self::SkippingToResume => "skipping_to_resume",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Buffering => "buffering",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Side effects a session is allowed to have beyond playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Start the backend keep-alive job while the session is open.
    pub keep_alive: bool,
    /// Natural end hands over to the sequence advancer.
    pub in_sequence: bool,
}

impl Capabilities {
    pub fn movie() -> Self {
        Self {
            keep_alive: true,
            in_sequence: false,
        }
    }

    pub fn episode() -> Self {
        Self {
            keep_alive: true,
            in_sequence: true,
        }
    }
}

/// Byte cursor into the media file.
///
/// `next_range_end` is exclusive and is where the next request starts.
/// `next_range_start` is the start of the most recent request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkCursor {
    pub next_range_start: u64,
    pub next_range_end: u64,
}

impl ChunkCursor {
    /// Move the cursor over the next segment and return the inclusive range
    /// to request. Returns `None` once `limit` (the content length) is reached.
    pub fn advance(&mut self, segment: u64, limit: Option<u64>) -> Option<ByteRange> {
        let start = self.next_range_end;
        let mut end = start.saturating_add(segment.max(1));
        if let Some(limit) = limit {
            if start >= limit {
                return None;
            }
            end = end.min(limit);
        }

        let range = ByteRange::new(start, end - 1)?;
        self.next_range_start = start;
        self.next_range_end = end;
        Some(range)
    }

    /// Record the range the server actually served. Never moves backward.
    pub fn commit(&mut self, served: ByteRange) {
        let served_end = served.end.saturating_add(1);
        if served_end > self.next_range_end {
            self.next_range_end = served_end;
        }
    }

    /// Skip forward to `byte`. A position behind the cursor is ignored.
    pub fn jump_to(&mut self, byte: u64) -> bool {
        if byte <= self.next_range_end {
            return false;
        }
        self.next_range_start = byte;
        self.next_range_end = byte;
        true
    }

    /// True when every byte up to `limit` has been requested.
    pub fn is_exhausted(&self, limit: Option<u64>) -> bool {
        limit.is_some_and(|limit| self.next_range_end >= limit)
    }
}

/// A chunk request that has not completed yet.
#[derive(Debug)]
pub struct PendingFetch {
    pub range: ByteRange,
    /// Cursor before the request, restored when the fetch fails.
    pub previous: ChunkCursor,
    pub task: JoinHandle<()>,
}

/// Element state mirrored at the last observed event.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BufferSnapshot {
    pub current_time: f64,
    pub buffered_end: Option<f64>,
    pub duration: Option<f64>,
}

impl BufferSnapshot {
    pub fn observe<E: MediaElement + ?Sized>(element: &E) -> Self {
        Self {
            current_time: element.current_time(),
            buffered_end: element.buffered_end(),
            duration: element.duration(),
        }
    }

    /// Seconds buffered ahead of the playhead. Nothing buffered counts as zero.
    pub fn margin(&self) -> f64 {
        self.buffered_end
            .map(|end| (end - self.current_time).max(0.0))
            .unwrap_or(0.0)
    }

    /// Playhead is outside the buffered region.
    pub fn is_past_buffer(&self) -> bool {
        match self.buffered_end {
            Some(end) => self.current_time > end,
            None => true,
        }
    }
}

/// One open-to-close playback of one media item.
#[derive(Debug)]
pub struct PlaybackSession {
    pub(crate) id: SessionId,
    pub(crate) reference: MediaReference,
    pub(crate) capabilities: Capabilities,
    pub(crate) phase: Phase,
    pub(crate) snapshot: BufferSnapshot,
    pub(crate) cursor: ChunkCursor,
    pub(crate) pending_fetch: Option<PendingFetch>,
    pub(crate) content_length: Option<u64>,
    pub(crate) heartbeat_timer: TimerHandle,
    pub(crate) controls_hide_timer: TimerHandle,
    pub(crate) startup_timer: TimerHandle,
    pub(crate) keep_alive_active: bool,
    pub(crate) keep_alive_confirmed: bool,
    pub(crate) keep_alive_pending: bool,
    pub(crate) keep_alive_start: Option<JoinHandle<()>>,
    pub(crate) resume_applied: bool,
    pub(crate) fullscreen_requested: bool,
    pub(crate) controls_visible: bool,
    pub(crate) has_source: bool,
    pub(crate) opened_at: DateTime<Utc>,
}

impl PlaybackSession {
    pub fn new(reference: MediaReference, capabilities: Capabilities) -> Self {
        Self {
            id: SessionId::new(),
            reference,
            capabilities,
            phase: Phase::Idle,
            snapshot: BufferSnapshot::default(),
            cursor: ChunkCursor::default(),
            pending_fetch: None,
            content_length: None,
            heartbeat_timer: TimerHandle::idle("heartbeat"),
            controls_hide_timer: TimerHandle::idle("controls_hide"),
            startup_timer: TimerHandle::idle("startup"),
            keep_alive_active: false,
            keep_alive_confirmed: false,
            keep_alive_pending: false,
            keep_alive_start: None,
            resume_applied: false,
            fullscreen_requested: false,
            controls_visible: false,
            has_source: false,
            opened_at: Utc::now(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn reference(&self) -> &MediaReference {
        &self.reference
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cursor(&self) -> ChunkCursor {
        self.cursor
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn snapshot(&self) -> BufferSnapshot {
        self.snapshot
    }

    pub fn fetch_in_flight(&self) -> bool {
        self.pending_fetch.is_some()
    }

    pub fn keep_alive_active(&self) -> bool {
        self.keep_alive_active
    }

    pub fn controls_visible(&self) -> bool {
        self.controls_visible
    }

    /// Playhead as a progress timecode.
    pub fn position(&self) -> Timecode {
        Timecode::from_seconds(self.snapshot.current_time)
    }

    /// Offset to persist for this session.
    ///
    /// Before the resume offset has been applied the element is still at zero,
    /// so the offset the session was opened with is kept instead.
    pub fn resume_point(&self) -> Timecode {
        if self.resume_applied {
            self.position()
        } else {
            self.reference.resume_offset.clone()
        }
    }

    /// Refresh the mirrored element state.
    pub fn observe<E: MediaElement + ?Sized>(&mut self, element: &E) {
        self.snapshot = BufferSnapshot::observe(element);
    }

    pub(crate) fn transition(&mut self, next: Phase) {
        if self.phase != next {
            tracing::debug!(session = %self.id, from = %self.phase, to = %next, "Session phase");
            self.phase = next;
        }
    }

    /// Abort every timer owned by the session.
    pub(crate) fn cancel_timers(&mut self) {
        self.heartbeat_timer.cancel();
        self.controls_hide_timer.cancel();
        self.startup_timer.cancel();
    }

    /// Abort an in-flight fetch, restoring the cursor.
    pub(crate) fn abandon_fetch(&mut self) {
        if let Some(pending) = self.pending_fetch.take() {
            pending.task.abort();
            self.cursor = pending.previous;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use theatre_common::MediaId;

    const SEG: u64 = 500 * 1024;

    #[test]
    fn test_cursor_first_advance() {
        let mut cursor = ChunkCursor::default();
        let range = cursor.advance(SEG, None).unwrap();
        assert_eq!(range, ByteRange::new(0, SEG - 1).unwrap());
        assert_eq!(cursor.next_range_start, 0);
        assert_eq!(cursor.next_range_end, SEG);
    }

    #[test]
    fn test_cursor_consecutive_ranges_are_contiguous() {
        let mut cursor = ChunkCursor::default();
        let first = cursor.advance(SEG, None).unwrap();
        let second = cursor.advance(SEG, None).unwrap();
        assert_eq!(second.start, first.end + 1);
        assert_eq!(second.len(), SEG);
        assert_eq!(cursor.next_range_start, SEG);
        assert_eq!(cursor.next_range_end, 2 * SEG);
    }

    #[test]
    fn test_cursor_clamps_to_content_length() {
        let mut cursor = ChunkCursor::default();
        let limit = Some(SEG + 100);
        cursor.advance(SEG, limit).unwrap();
        let tail = cursor.advance(SEG, limit).unwrap();
        assert_eq!(tail, ByteRange::new(SEG, SEG + 99).unwrap());
        assert!(cursor.is_exhausted(limit));
        assert!(cursor.advance(SEG, limit).is_none());
    }

    #[test]
    fn test_cursor_jump_is_forward_only() {
        let mut cursor = ChunkCursor::default();
        cursor.advance(SEG, None);
        assert!(!cursor.jump_to(100));
        assert_eq!(cursor.next_range_end, SEG);

        assert!(cursor.jump_to(10 * SEG));
        let range = cursor.advance(SEG, None).unwrap();
        assert_eq!(range.start, 10 * SEG);
    }

    #[test]
    fn test_cursor_commit_never_rewinds() {
        let mut cursor = ChunkCursor::default();
        cursor.advance(SEG, None);
        cursor.commit(ByteRange::new(0, 9).unwrap());
        assert_eq!(cursor.next_range_end, SEG);

        cursor.commit(ByteRange::new(0, 4 * SEG - 1).unwrap());
        assert_eq!(cursor.next_range_end, 4 * SEG);
    }

    #[test]
    fn test_snapshot_margin() {
        let empty = BufferSnapshot {
            current_time: 12.0,
            buffered_end: None,
            duration: Some(100.0),
        };
        assert_eq!(empty.margin(), 0.0);
        assert!(empty.is_past_buffer());

        let ahead = BufferSnapshot {
            current_time: 12.0,
            buffered_end: Some(30.0),
            duration: None,
        };
        assert_eq!(ahead.margin(), 18.0);
        assert!(!ahead.is_past_buffer());
    }

    #[test]
    fn test_new_session_defaults() {
        let reference = MediaReference::movie(MediaId::new(1), "a.mp4", Timecode::zero());
        let session = PlaybackSession::new(reference, Capabilities::movie());
        assert_eq!(session.phase(), Phase::Idle);
        assert!(!session.fetch_in_flight());
        assert_eq!(session.cursor(), ChunkCursor::default());
        assert!(!session.heartbeat_timer.is_armed());
        assert_eq!(session.position().as_str(), "00:00");
    }

    #[test]
    fn test_resume_point_before_and_after_resume() {
        let reference = MediaReference::movie(MediaId::new(1), "a.mp4", Timecode::from_raw("12:00"));
        let mut session = PlaybackSession::new(reference, Capabilities::movie());
        session.snapshot.current_time = 3.0;
        assert_eq!(session.resume_point().as_str(), "12:00");

        session.resume_applied = true;
        assert_eq!(session.resume_point().as_str(), "00:03");
    }

    #[test]
    fn test_phase_classification() {
        assert!(Phase::Buffering.is_active());
        assert!(!Phase::Opening.is_active());
        assert!(Phase::Closing.is_terminating());
        assert!(!Phase::Paused.is_terminating());
    }
}
