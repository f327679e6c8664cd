//! Series playback.
//!
//! Tracks which episode of a series is playing. When an episode ends on its
//! own the next one opens from the start, until the last episode finishes.

use theatre_common::{Episode, Error, Result, SeriesId, Timecode};

use super::element::MediaElement;
use super::lifecycle::{ClosedSession, Controller};
use super::notice::{CloseReason, NoticePayload};
use super::report::FailureKind;
use super::session::Capabilities;

/// Where an explicitly chosen episode starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// From the beginning.
    Restart,
    /// From the episode's saved offset.
    Saved,
}

/// Outcome of a closed session for the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The next episode was opened.
    Next { index: usize },
    /// The last episode ended.
    Finished,
    /// The session was not part of an active sequence, or did not end naturally.
    Unchanged,
}

#[derive(Debug)]
struct Sequence {
    series: SeriesId,
    episodes: Vec<Episode>,
    index: usize,
}

#[derive(Debug, Default)]
pub struct SequenceAdvancer {
    active: Option<Sequence>,
}

impl SequenceAdvancer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn series(&self) -> Option<SeriesId> {
        self.active.as_ref().map(|s| s.series)
    }

    /// Position of the playing episode in the series listing.
    pub fn index(&self) -> Option<usize> {
        self.active.as_ref().map(|s| s.index)
    }

    pub fn episode_count(&self) -> usize {
        self.active.as_ref().map_or(0, |s| s.episodes.len())
    }

    pub fn clear(&mut self) {
        if let Some(sequence) = self.active.take() {
            tracing::debug!(series = %sequence.series, "Sequence cleared");
        }
    }

    async fn load<E: MediaElement>(ctl: &Controller<E>, series: SeriesId) -> Result<Vec<Episode>> {
        match ctl.backend().list_episodes(series).await {
            Ok(episodes) => Ok(episodes),
            Err(e) => {
                ctl.report(None, FailureKind::EpisodeListing, e.to_string());
                Err(e)
            }
        }
    }

    /// Play episode `index` of `series`.
    pub async fn play_episode<E: MediaElement>(
        &mut self,
        ctl: &mut Controller<E>,
        series: SeriesId,
        index: usize,
        resume: Resume,
    ) -> Result<()> {
        let episodes = Self::load(ctl, series).await?;
        if index >= episodes.len() {
            return Err(Error::invalid_input(format!(
                "Episode {} out of range for series {} ({} episodes)",
                index,
                series,
                episodes.len()
            )));
        }
        self.start(ctl, series, episodes, index, resume).await;
        Ok(())
    }

    /// Resume a series at its last played episode.
    pub async fn continue_series<E: MediaElement>(
        &mut self,
        ctl: &mut Controller<E>,
        series: SeriesId,
    ) -> Result<()> {
        let episodes = Self::load(ctl, series).await?;
        if episodes.is_empty() {
            tracing::info!(series = %series, "Series has no episodes");
            self.clear();
            ctl.notify(NoticePayload::SequenceFinished { series });
            return Ok(());
        }

        let stored = match ctl.backend().current_index(series).await {
            Ok(index) => index,
            Err(e) => {
                ctl.report(None, FailureKind::CurrentIndex, e.to_string());
                0
            }
        };
        let index = stored.min(episodes.len() - 1);
        if index != stored {
            tracing::warn!(series = %series, stored, index, "Stored episode index out of range");
        }

        self.start(ctl, series, episodes, index, Resume::Saved).await;
        Ok(())
    }

    async fn start<E: MediaElement>(
        &mut self,
        ctl: &mut Controller<E>,
        series: SeriesId,
        episodes: Vec<Episode>,
        index: usize,
        resume: Resume,
    ) {
        let episode = &episodes[index];
        let offset = match resume {
            Resume::Restart => Timecode::zero(),
            Resume::Saved => episode.saved_offset(),
        };
        let reference = episode.reference(index, offset);

        tracing::info!(series = %series, index, total = episodes.len(), "Starting series playback");

        // The previous session must be gone before the index moves.
        ctl.close(CloseReason::Replaced).await;
        ctl.persist_current_index(series, index).await;
        self.active = Some(Sequence {
            series,
            episodes,
            index,
        });
        ctl.open(reference, Capabilities::episode()).await;
    }

    /// React to a closed session. Only a natural end of an in-sequence session advances.
    pub async fn on_session_closed<E: MediaElement>(
        &mut self,
        ctl: &mut Controller<E>,
        closed: &ClosedSession,
    ) -> Advance {
        if closed.reason != CloseReason::NaturalEnd || !closed.capabilities.in_sequence {
            return Advance::Unchanged;
        }
        let Some(sequence) = self.active.as_mut() else {
            return Advance::Unchanged;
        };

        let next = sequence.index + 1;
        let series = sequence.series;

        if next >= sequence.episodes.len() {
            tracing::info!(series = %series, "Series finished");
            self.active = None;
            ctl.notify(NoticePayload::SequenceFinished { series });
            return Advance::Finished;
        }

        sequence.index = next;
        let reference = sequence.episodes[next].reference(next, Timecode::zero());

        ctl.persist_current_index(series, next).await;
        ctl.notify(NoticePayload::SequenceAdvanced {
            series,
            index: next,
        });
        ctl.open(reference, Capabilities::episode()).await;

        Advance::Next { index: next }
    }
}
