//! A media element without a screen.
//!
//! [`HeadlessElement`] models playback with a simulated clock: bytes received
//! are converted to buffered seconds at a fixed bitrate and the playhead only
//! moves through buffered media. [`spawn_clock`] drives it in real time and
//! feeds the resulting element events to a player.

use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::{Config, CursorGate};
use crate::player::controls::progress_label;
use crate::player::{MediaElement, MediaEvent, PlayerHandle};

#[derive(Debug)]
struct State {
    current_time: f64,
    duration: Option<f64>,
    bytes_per_second: f64,
    buffered_bytes: u64,
    paused: bool,
    fullscreen: bool,
    ended: bool,
    seeked: bool,
    has_source: bool,
}

impl State {
    fn buffered_end(&self) -> Option<f64> {
        if self.buffered_bytes == 0 || self.bytes_per_second <= 0.0 {
            return None;
        }
        let end = self.buffered_bytes as f64 / self.bytes_per_second;
        Some(match self.duration {
            Some(duration) => end.min(duration),
            None => end,
        })
    }
}

/// Simulated element. Clones share the same state.
#[derive(Debug, Clone)]
pub struct HeadlessElement {
    state: Arc<Mutex<State>>,
}

impl HeadlessElement {
    pub fn new(duration: Option<f64>, bytes_per_second: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                current_time: 0.0,
                duration,
                bytes_per_second,
                buffered_bytes: 0,
                paused: true,
                fullscreen: false,
                ended: false,
                seeked: false,
                has_source: false,
            })),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    pub fn has_source(&self) -> bool {
        self.state.lock().has_source
    }

    /// Move the clock forward by `elapsed` seconds and return the events raised.
    ///
    /// A seek since the last call is reported first, even while paused.
    pub fn advance(&self, elapsed: f64) -> Vec<MediaEvent> {
        let mut state = self.state.lock();
        let mut events = Vec::new();
        if std::mem::take(&mut state.seeked) {
            events.push(MediaEvent::Seeked);
        }
        if state.paused || state.ended {
            return events;
        }

        let limit = state.buffered_end().unwrap_or(0.0);
        if state.current_time < limit {
            state.current_time = (state.current_time + elapsed).min(limit);
        }

        events.push(MediaEvent::TimeUpdate);
        if let Some(duration) = state.duration {
            if state.current_time >= duration {
                state.ended = true;
                state.paused = true;
                events.push(MediaEvent::Ended);
            }
        }
        events
    }
}

impl MediaElement for HeadlessElement {
    fn current_time(&self) -> f64 {
        self.state.lock().current_time
    }

    fn seek(&mut self, seconds: f64) {
        let mut state = self.state.lock();
        state.current_time = seconds.max(0.0);
        state.ended = false;
        state.seeked = true;
    }

    fn duration(&self) -> Option<f64> {
        self.state.lock().duration
    }

    fn buffered_end(&self) -> Option<f64> {
        self.state.lock().buffered_end()
    }

    fn play(&mut self) {
        self.state.lock().paused = false;
    }

    fn pause(&mut self) {
        self.state.lock().paused = true;
    }

    fn request_fullscreen(&mut self) {
        self.state.lock().fullscreen = true;
    }

    fn exit_fullscreen(&mut self) {
        self.state.lock().fullscreen = false;
    }

    fn is_fullscreen(&self) -> bool {
        self.state.lock().fullscreen
    }

    fn replace_source(&mut self, bytes: Bytes) {
        let mut state = self.state.lock();
        state.buffered_bytes = bytes.len() as u64;
        state.has_source = true;
    }

    fn append_buffer(&mut self, bytes: Bytes) {
        let mut state = self.state.lock();
        state.buffered_bytes += bytes.len() as u64;
        state.has_source = true;
    }

    fn release_source(&mut self) {
        let mut state = self.state.lock();
        state.buffered_bytes = 0;
        state.has_source = false;
        state.current_time = 0.0;
        state.ended = false;
        state.seeked = false;
        state.paused = true;
    }
}

/// Adjust `config` for a player driving a [`HeadlessElement`].
///
/// The simulated playhead never moves past buffered media, so under the
/// seconds gate it cannot reach a cursor measured in bytes. The projected
/// byte gate is always used.
pub fn configure(config: &mut Config) {
    if config.scheduler.cursor_gate != CursorGate::ProjectedBytes {
        tracing::info!(
            "Using projected_bytes cursor gate for headless playback (configured: {:?})",
            config.scheduler.cursor_gate
        );
        config.scheduler.cursor_gate = CursorGate::ProjectedBytes;
    }
}

/// Advance `element` every `tick` and forward its events to the player.
pub fn spawn_clock(element: HeadlessElement, player: PlayerHandle, tick: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            let events = element.advance(tick.as_secs_f64());
            if !events.is_empty() {
                tracing::trace!(
                    progress = %progress_label(element.current_time(), element.duration()),
                    "Clock tick"
                );
            }
            for event in events {
                if !player.media(event) {
                    return;
                }
            }
        }
    })
}
