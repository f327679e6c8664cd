//! Chunk scheduling.
//!
//! Decides when to request the next byte range of the media file. A fetch is
//! issued when no other fetch is in flight, fewer than `low_watermark_secs`
//! are buffered ahead of the playhead and the playhead has caught up with the
//! byte cursor (see [`CursorGate`]). A forward seek past the buffered region
//! waives the cursor gate.

use bytes::Bytes;

use super::element::MediaElement;
use super::session::{BufferSnapshot, ChunkCursor, PlaybackSession};
use crate::backend::ByteRange;
use crate::config::{BufferingStrategy, CursorGate, SchedulerConfig};

/// What caused an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Playback progressed or started.
    Progress,
    /// A seek completed.
    Seek,
}

/// A request the scheduler committed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPlan {
    pub range: ByteRange,
    /// Cursor before the plan was made.
    pub previous: ChunkCursor,
}

#[derive(Debug, Clone)]
pub struct ChunkScheduler {
    segment_size: u64,
    low_watermark: f64,
    gate: CursorGate,
    buffering: BufferingStrategy,
}

impl ChunkScheduler {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            segment_size: config.segment_size_bytes,
            low_watermark: config.low_watermark_secs,
            gate: config.cursor_gate,
            buffering: config.buffering,
        }
    }

    pub fn segment_size(&self) -> u64 {
        self.segment_size
    }

    /// Playhead expressed in the unit the cursor is compared against.
    pub fn playhead(&self, snapshot: &BufferSnapshot, content_length: Option<u64>) -> f64 {
        match self.gate {
            CursorGate::Seconds => snapshot.current_time,
            CursorGate::ProjectedBytes => self
                .projected_byte(snapshot, content_length)
                .map(|b| b as f64)
                .unwrap_or(snapshot.current_time),
        }
    }

    fn projected_byte(&self, snapshot: &BufferSnapshot, content_length: Option<u64>) -> Option<u64> {
        let length = content_length?;
        let duration = snapshot.duration.filter(|d| d.is_finite() && *d > 0.0)?;
        let byte = (snapshot.current_time.max(0.0) * length as f64 / duration).round();
        Some(byte.min(length as f64) as u64)
    }

    /// Whether the session needs another chunk right now.
    pub fn should_fetch(&self, session: &PlaybackSession) -> bool {
        if session.fetch_in_flight() || session.cursor.is_exhausted(session.content_length) {
            return false;
        }

        let snapshot = &session.snapshot;
        snapshot.margin() < self.low_watermark
            && self.playhead(snapshot, session.content_length) >= session.cursor.next_range_end as f64
    }

    /// Evaluate the session and advance its cursor when a fetch is due.
    pub fn evaluate(&self, session: &mut PlaybackSession, trigger: Trigger) -> Option<FetchPlan> {
        if session.fetch_in_flight() {
            return None;
        }

        let previous = session.cursor;
        let snapshot = session.snapshot;

        let forced = trigger == Trigger::Seek && snapshot.is_past_buffer();
        if forced {
            if self.gate == CursorGate::ProjectedBytes {
                if let Some(byte) = self.projected_byte(&snapshot, session.content_length) {
                    session.cursor.jump_to(byte);
                }
            }
            tracing::debug!(
                session = %session.id,
                position = snapshot.current_time,
                "Seek past buffered region"
            );
        } else if !self.should_fetch(session) {
            return None;
        }

        match session.cursor.advance(self.segment_size, session.content_length) {
            Some(range) => Some(FetchPlan { range, previous }),
            None => {
                session.cursor = previous;
                None
            }
        }
    }

    /// Hand fetched bytes to the element.
    pub fn deliver<E: MediaElement + ?Sized>(&self, element: &mut E, bytes: Bytes) {
        match self.buffering {
            BufferingStrategy::ReplaceSource => element.replace_source(bytes),
            BufferingStrategy::Append => element.append_buffer(bytes),
        }
    }
}
