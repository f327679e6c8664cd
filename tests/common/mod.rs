//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which wires a [`Player`] to a recording
//! [`FakeBackend`] and a scriptable [`FakeElement`]. Backend calls and element
//! teardown are also written to one [`Journal`] so tests can check ordering.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use theatre::backend::{Backend, ByteRange, RangeChunk};
use theatre::config::Config;
use theatre::player::{
    CollectingReporter, Command, EventKind, MediaElement, MediaEvent, NoticePayload, Player,
    PlayerEvent,
};
use theatre_common::{Episode, Error, MediaId, MediaReference, Result, SeriesId, Timecode};

/// Segment size used by the default test config.
pub const SEGMENT: u64 = 8;

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Index of the last entry starting with `prefix`.
    pub fn last_index_of(&self, prefix: &str) -> Option<usize> {
        self.0.lock().iter().rposition(|e| e.starts_with(prefix))
    }
}

// ---------------------------------------------------------------------------
// FakeBackend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Fetch {
        media: MediaId,
        range: ByteRange,
        position: String,
    },
    Persist {
        media: MediaId,
        offset: String,
    },
    CurrentIndex(SeriesId),
    SetCurrentIndex(SeriesId, usize),
    ListEpisodes(SeriesId),
    StartKeepAlive(String),
    StopKeepAlive,
}

/// Backend that records every call and answers from memory.
pub struct FakeBackend {
    calls: Mutex<Vec<Call>>,
    journal: Journal,
    series: Mutex<HashMap<SeriesId, Vec<Episode>>>,
    current_index: Mutex<HashMap<SeriesId, usize>>,
    content_length: Mutex<Option<u64>>,
    hold_fetches: AtomicBool,
    fetch_gate: Semaphore,
    fail_fetches: AtomicUsize,
    fail_persists: AtomicBool,
    fail_keep_alive_starts: AtomicUsize,
    keep_alive_start_delay: Mutex<Option<Duration>>,
    fail_current_index: AtomicBool,
}

impl FakeBackend {
    pub fn new(journal: Journal) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            journal,
            series: Mutex::new(HashMap::new()),
            current_index: Mutex::new(HashMap::new()),
            content_length: Mutex::new(None),
            hold_fetches: AtomicBool::new(false),
            fetch_gate: Semaphore::new(0),
            fail_fetches: AtomicUsize::new(0),
            fail_persists: AtomicBool::new(false),
            fail_keep_alive_starts: AtomicUsize::new(0),
            keep_alive_start_delay: Mutex::new(None),
            fail_current_index: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn fetches(&self) -> Vec<ByteRange> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Fetch { range, .. } => Some(*range),
                _ => None,
            })
            .collect()
    }

    pub fn persists(&self) -> Vec<(MediaId, String)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Persist { media, offset } => Some((*media, offset.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| matches(c)).count()
    }

    pub fn set_series(&self, series: SeriesId, episodes: Vec<Episode>) {
        self.series.lock().insert(series, episodes);
    }

    pub fn set_current_index(&self, series: SeriesId, index: usize) {
        self.current_index.lock().insert(series, index);
    }

    pub fn stored_index(&self, series: SeriesId) -> Option<usize> {
        self.current_index.lock().get(&series).copied()
    }

    pub fn set_content_length(&self, length: Option<u64>) {
        *self.content_length.lock() = length;
    }

    /// Keep fetches pending until [`FakeBackend::release_fetch`].
    pub fn hold_fetches(&self) {
        self.hold_fetches.store(true, Ordering::SeqCst);
    }

    pub fn release_fetch(&self) {
        self.fetch_gate.add_permits(1);
    }

    pub fn fail_next_fetches(&self, count: usize) {
        self.fail_fetches.store(count, Ordering::SeqCst);
    }

    pub fn fail_persists(&self, fail: bool) {
        self.fail_persists.store(fail, Ordering::SeqCst);
    }

    pub fn fail_next_keep_alive_starts(&self, count: usize) {
        self.fail_keep_alive_starts.store(count, Ordering::SeqCst);
    }

    /// Make the keep-alive start answer only after `delay`.
    pub fn delay_keep_alive_start(&self, delay: Duration) {
        *self.keep_alive_start_delay.lock() = Some(delay);
    }

    pub fn fail_current_index(&self, fail: bool) {
        self.fail_current_index.store(fail, Ordering::SeqCst);
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait::async_trait]
impl Backend for FakeBackend {
    async fn fetch_range(
        &self,
        reference: &MediaReference,
        range: ByteRange,
        position: &Timecode,
    ) -> Result<RangeChunk> {
        self.record(Call::Fetch {
            media: reference.id,
            range,
            position: position.to_string(),
        });

        if self.hold_fetches.load(Ordering::SeqCst) {
            let permit = self
                .fetch_gate
                .acquire()
                .await
                .map_err(|e| Error::transport(e.to_string()))?;
            permit.forget();
        }

        if Self::take_failure(&self.fail_fetches) {
            return Err(Error::transport("connection reset"));
        }

        let total_len = *self.content_length.lock();
        let end = match total_len {
            Some(total) => range.end.min(total.saturating_sub(1)),
            None => range.end,
        };
        let served = ByteRange::new(range.start, end)
            .ok_or_else(|| Error::decode("range past end of content"))?;

        Ok(RangeChunk {
            range: served,
            total_len,
            bytes: Bytes::from(vec![0u8; served.len() as usize]),
        })
    }

    async fn persist_progress(&self, reference: &MediaReference, offset: &Timecode) -> Result<()> {
        self.record(Call::Persist {
            media: reference.id,
            offset: offset.to_string(),
        });
        self.journal.push(format!("persist {} {}", reference.id, offset));

        if self.fail_persists.load(Ordering::SeqCst) {
            return Err(Error::status("POST /last-access", 503));
        }
        Ok(())
    }

    async fn current_index(&self, series: SeriesId) -> Result<usize> {
        self.record(Call::CurrentIndex(series));
        if self.fail_current_index.load(Ordering::SeqCst) {
            return Err(Error::transport("connection refused"));
        }
        Ok(self.stored_index(series).unwrap_or(0))
    }

    async fn set_current_index(&self, series: SeriesId, index: usize) -> Result<()> {
        self.record(Call::SetCurrentIndex(series, index));
        self.journal.push(format!("set_index {} {}", series, index));
        self.current_index.lock().insert(series, index);
        Ok(())
    }

    async fn list_episodes(&self, series: SeriesId) -> Result<Vec<Episode>> {
        self.record(Call::ListEpisodes(series));
        self.series
            .lock()
            .get(&series)
            .cloned()
            .ok_or_else(|| Error::status(format!("GET /series/{}/episodes", series), 404))
    }

    async fn start_keep_alive(&self, interval: &str) -> Result<()> {
        self.record(Call::StartKeepAlive(interval.to_string()));
        let delay = *self.keep_alive_start_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.journal.push("start_keep_alive");
        if Self::take_failure(&self.fail_keep_alive_starts) {
            return Err(Error::status("POST /start-cronos", 500));
        }
        Ok(())
    }

    async fn stop_keep_alive(&self) -> Result<()> {
        self.record(Call::StopKeepAlive);
        self.journal.push("stop_keep_alive");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeElement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ElementCall {
    Seek(f64),
    Play,
    Pause,
    RequestFullscreen,
    ExitFullscreen,
    ReplaceSource(usize),
    AppendBuffer(usize),
    ReleaseSource,
}

#[derive(Debug)]
struct ElementState {
    current_time: f64,
    duration: Option<f64>,
    buffered_end: Option<f64>,
    fullscreen: bool,
    calls: Vec<ElementCall>,
}

/// Element whose clock and buffer are set by the test. Clones share state.
#[derive(Debug, Clone)]
pub struct FakeElement {
    state: Arc<Mutex<ElementState>>,
    journal: Journal,
}

impl FakeElement {
    pub fn new(journal: Journal) -> Self {
        Self {
            state: Arc::new(Mutex::new(ElementState {
                current_time: 0.0,
                duration: Some(600.0),
                buffered_end: None,
                fullscreen: false,
                calls: Vec::new(),
            })),
            journal,
        }
    }

    pub fn set_position(&self, seconds: f64) {
        self.state.lock().current_time = seconds;
    }

    pub fn set_buffered_end(&self, end: Option<f64>) {
        self.state.lock().buffered_end = end;
    }

    pub fn set_duration(&self, duration: Option<f64>) {
        self.state.lock().duration = duration;
    }

    pub fn calls(&self) -> Vec<ElementCall> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, call: &ElementCall) -> usize {
        self.state.lock().calls.iter().filter(|c| *c == call).count()
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                ElementCall::Seek(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ElementCall) {
        self.state.lock().calls.push(call);
    }
}

impl MediaElement for FakeElement {
    fn current_time(&self) -> f64 {
        self.state.lock().current_time
    }

    fn seek(&mut self, seconds: f64) {
        self.state.lock().current_time = seconds;
        self.record(ElementCall::Seek(seconds));
    }

    fn duration(&self) -> Option<f64> {
        self.state.lock().duration
    }

    fn buffered_end(&self) -> Option<f64> {
        self.state.lock().buffered_end
    }

    fn play(&mut self) {
        self.record(ElementCall::Play);
    }

    fn pause(&mut self) {
        self.record(ElementCall::Pause);
    }

    fn request_fullscreen(&mut self) {
        self.state.lock().fullscreen = true;
        self.record(ElementCall::RequestFullscreen);
    }

    fn exit_fullscreen(&mut self) {
        self.state.lock().fullscreen = false;
        self.record(ElementCall::ExitFullscreen);
    }

    fn is_fullscreen(&self) -> bool {
        self.state.lock().fullscreen
    }

    fn replace_source(&mut self, bytes: Bytes) {
        self.record(ElementCall::ReplaceSource(bytes.len()));
    }

    fn append_buffer(&mut self, bytes: Bytes) {
        self.record(ElementCall::AppendBuffer(bytes.len()));
    }

    fn release_source(&mut self) {
        self.record(ElementCall::ReleaseSource);
        self.journal.push("release_source");
    }
}

// ---------------------------------------------------------------------------
// TestHarness
// ---------------------------------------------------------------------------

/// Config with no startup delay and a tiny segment size.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.session.startup_delay_ms = 0;
    config.scheduler.segment_size_bytes = SEGMENT;
    config
}

pub fn movie(id: u64, resume: &str) -> MediaReference {
    MediaReference::movie(MediaId::new(id), format!("movies/{}.mp4", id), Timecode::from_raw(resume))
}

pub fn episode(series: u64, id: u64, index: i64, resume_at: &str) -> Episode {
    Episode {
        id: MediaId::new(id),
        path: format!("series/{}/{}.mp4", series, id),
        resume_at: resume_at.to_string(),
        episode_index: index,
        series_id: SeriesId::new(series),
    }
}

pub struct TestHarness {
    pub player: Player<FakeElement>,
    pub backend: Arc<FakeBackend>,
    pub reporter: Arc<CollectingReporter>,
    pub element: FakeElement,
    pub journal: Journal,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let journal = Journal::default();
        let backend = Arc::new(FakeBackend::new(journal.clone()));
        let reporter = Arc::new(CollectingReporter::new());
        let element = FakeElement::new(journal.clone());

        let player = Player::new(&config, backend.clone(), reporter.clone(), element.clone());

        Self {
            player,
            backend,
            reporter,
            element,
            journal,
        }
    }

    pub async fn command(&mut self, command: Command) {
        self.player.dispatch(PlayerEvent::Command(command)).await;
    }

    pub async fn media(&mut self, event: MediaEvent) {
        self.player.dispatch(PlayerEvent::Media(event)).await;
    }

    /// Let spawned backend tasks run.
    pub async fn settle(&self) {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    /// Handle events until one of `kind` has been handled.
    pub async fn step_until(&mut self, kind: EventKind) {
        let wait = async {
            loop {
                if self.player.step().await == Some(kind) {
                    break;
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(600), wait)
            .await
            .unwrap_or_else(|_| panic!("no {:?} event within 600s", kind));
    }

    /// Handle every event that arrives within `window`.
    pub async fn drain_for(&mut self, window: Duration) -> Vec<EventKind> {
        let deadline = tokio::time::Instant::now() + window;
        let mut kinds = Vec::new();
        while let Ok(Some(kind)) = tokio::time::timeout_at(deadline, self.player.step()).await {
            kinds.push(kind);
        }
        kinds
    }

    pub fn notices(&self) -> Vec<NoticePayload> {
        self.player.notices().history()
    }
}
