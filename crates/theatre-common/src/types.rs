//! Core type definitions for playable media.
//!
//! A [`MediaReference`] identifies one playable item and the resume point it
//! was opened with. It never changes during a session: moving to another item
//! builds a new reference.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{MediaId, SeriesId};
use crate::timecode::Timecode;

/// What kind of content a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MediaKind {
    /// A standalone movie.
    Movie,
    /// One episode of a series, at a position in the series' episode list.
    Episode {
        /// Series the episode belongs to.
        series_id: SeriesId,
        /// Zero-based position in the series' ordered episode list.
        index: usize,
    },
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie => write!(f, "movie"),
            Self::Episode { .. } => write!(f, "episode"),
        }
    }
}

/// Identifies playable content for the lifetime of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaReference {
    /// Backend identifier of the movie or episode.
    pub id: MediaId,
    /// Path of the media file as understood by the media endpoint.
    pub locator: String,
    /// Movie or episode.
    pub kind: MediaKind,
    /// Resume point supplied when the session was opened.
    pub resume_offset: Timecode,
}

impl MediaReference {
    pub fn movie<S: Into<String>>(id: MediaId, locator: S, resume_offset: Timecode) -> Self {
        Self {
            id,
            locator: locator.into(),
            kind: MediaKind::Movie,
            resume_offset,
        }
    }

    pub fn episode<S: Into<String>>(
        id: MediaId,
        locator: S,
        series_id: SeriesId,
        index: usize,
        resume_offset: Timecode,
    ) -> Self {
        Self {
            id,
            locator: locator.into(),
            kind: MediaKind::Episode { series_id, index },
            resume_offset,
        }
    }

    /// Same item, different resume point.
    #[must_use]
    pub fn with_resume_offset(&self, resume_offset: Timecode) -> Self {
        Self {
            resume_offset,
            ..self.clone()
        }
    }

    pub fn is_episode(&self) -> bool {
        matches!(self.kind, MediaKind::Episode { .. })
    }
}

impl fmt::Display for MediaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind, self.id, self.locator)
    }
}

/// An episode as listed by the series endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    #[serde(rename = "ID")]
    pub id: MediaId,

    #[serde(rename = "Path")]
    pub path: String,

    /// Persisted resume point; empty when the episode was never played.
    #[serde(rename = "ResumeAt", default)]
    pub resume_at: String,

    #[serde(rename = "EpisodeIndex", default)]
    pub episode_index: i64,

    #[serde(rename = "series_id", alias = "SeriesID")]
    pub series_id: SeriesId,
}

impl Episode {
    /// Build a reference for this episode at `position` in its series.
    pub fn reference(&self, position: usize, resume_offset: Timecode) -> MediaReference {
        MediaReference::episode(self.id, &self.path, self.series_id, position, resume_offset)
    }

    /// The persisted resume point, with a never-played episode starting at zero.
    pub fn saved_offset(&self) -> Timecode {
        if self.resume_at.trim().is_empty() {
            Timecode::zero()
        } else {
            Timecode::from_raw(self.resume_at.as_str())
        }
    }
}
