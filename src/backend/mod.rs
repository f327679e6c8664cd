//! Media-library backend consumed by the playback controller.
//!
//! The controller never talks HTTP directly; it goes through [`Backend`] so the
//! transport can be swapped for a recording fake in tests.
//!
//! # Endpoints
//!
//! - `GET {media_path}?file=..&timePlaying=MM:SS` with `Range` - media byte range
//! - `POST /last-access/{id}?time=MM:SS` - movie progress
//! - `POST /episodes/{id}/last-access?time=MM:SS` - episode progress
//! - `GET|POST /series/{id}/current` - last played episode index
//! - `GET /series/{id}/episodes` - episode listing
//! - `POST /start-cronos?interval=..`, `POST /stop-cronos` - keep-alive job

mod http;
pub mod range;

pub use http::HttpBackend;
pub use range::ByteRange;

use bytes::Bytes;
use theatre_common::{Episode, MediaReference, Result, SeriesId, Timecode};

/// A slice of a media file returned by the media endpoint.
#[derive(Debug, Clone)]
pub struct RangeChunk {
    /// Range actually served.
    pub range: ByteRange,
    /// Total size of the media file, when the server reported it.
    pub total_len: Option<u64>,
    pub bytes: Bytes,
}

/// Interface of the media-library server.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// Read `range` of the media file. `position` is the playhead at request time.
    async fn fetch_range(
        &self,
        reference: &MediaReference,
        range: ByteRange,
        position: &Timecode,
    ) -> Result<RangeChunk>;

    /// Persist the resume point of a movie or episode. Idempotent.
    async fn persist_progress(&self, reference: &MediaReference, offset: &Timecode) -> Result<()>;

    /// Last played episode index of a series.
    async fn current_index(&self, series: SeriesId) -> Result<usize>;

    /// Record the last played episode index of a series.
    async fn set_current_index(&self, series: SeriesId, index: usize) -> Result<()>;

    /// Episodes of a series ordered by their episode index.
    async fn list_episodes(&self, series: SeriesId) -> Result<Vec<Episode>>;

    /// Start the backend keep-alive job.
    async fn start_keep_alive(&self, interval: &str) -> Result<()>;

    /// Stop the backend keep-alive job.
    async fn stop_keep_alive(&self) -> Result<()>;
}
