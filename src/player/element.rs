//! The media element the controller drives.
//!
//! Mirrors the small surface of a `<video>` element the playback logic needs.
//! Calls are synchronous: they happen on the controller's event loop and must
//! not block.

use bytes::Bytes;

/// A playable surface with a position, a buffer and a fullscreen mode.
pub trait MediaElement: Send {
    /// Playhead position in seconds.
    fn current_time(&self) -> f64;

    /// Move the playhead.
    fn seek(&mut self, seconds: f64);

    /// Media duration in seconds, once known.
    fn duration(&self) -> Option<f64>;

    /// End of the last contiguous buffered range, `None` when nothing is buffered.
    fn buffered_end(&self) -> Option<f64>;

    fn play(&mut self);

    fn pause(&mut self);

    fn request_fullscreen(&mut self);

    fn exit_fullscreen(&mut self);

    fn is_fullscreen(&self) -> bool;

    /// Swap the current source for `bytes`.
    fn replace_source(&mut self, bytes: Bytes);

    /// Extend the current source with `bytes`.
    fn append_buffer(&mut self, bytes: Bytes);

    /// Drop the source object created from fetched bytes.
    fn release_source(&mut self);
}

/// Events raised by the media element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    /// The playhead moved during playback.
    TimeUpdate,
    /// A seek completed.
    Seeked,
    /// Playback reached the end of the media.
    Ended,
    /// Playback was paused from the element's own controls.
    Paused,
    /// Playback was resumed from the element's own controls.
    Playing,
}
