//! On-screen controls: progress bar scrubbing, relative seeks and auto-hide.

use std::time::Duration;
use theatre_common::timecode;
use tokio::sync::mpsc::UnboundedSender;

use super::session::PlaybackSession;
use super::PlayerEvent;
use crate::config::ControlsConfig;

/// Horizontal extent of the progress bar, in the same units as pointer positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressBar {
    pub left: f64,
    pub width: f64,
}

impl ProgressBar {
    pub fn new(left: f64, width: f64) -> Self {
        Self { left, width }
    }

    /// Map a pointer position to a media position in seconds.
    ///
    /// Pointers outside the bar clamp to its ends. Returns `None` when the bar
    /// has no width or the duration is not known yet.
    pub fn position_at(&self, pointer_x: f64, duration: Option<f64>) -> Option<f64> {
        let duration = duration.filter(|d| d.is_finite() && *d > 0.0)?;
        if !(self.width.is_finite() && self.width > 0.0) || !pointer_x.is_finite() {
            return None;
        }

        let fraction = ((pointer_x - self.left) / self.width).clamp(0.0, 1.0);
        Some(fraction * duration)
    }
}

/// Target of a relative seek, clamped to the media.
pub fn seek_target(current: f64, delta: f64, duration: Option<f64>) -> f64 {
    let target = (current + delta).max(0.0);
    match duration.filter(|d| d.is_finite()) {
        Some(duration) => target.min(duration),
        None => target,
    }
}

/// `"M:SS / M:SS"` label shown next to the progress bar.
pub fn progress_label(current: f64, duration: Option<f64>) -> String {
    format!(
        "{} / {}",
        timecode::clock(current),
        timecode::clock(duration.unwrap_or(0.0))
    )
}

#[derive(Debug, Clone, Copy)]
pub struct ControlsOverlay {
    hide_after: Duration,
    seek_step: f64,
}

impl ControlsOverlay {
    pub fn new(config: &ControlsConfig) -> Self {
        Self {
            hide_after: Duration::from_millis(config.hide_after_ms),
            seek_step: config.seek_step_secs,
        }
    }

    pub fn seek_step(&self) -> f64 {
        self.seek_step
    }

    /// Show the controls and restart the hide countdown.
    ///
    /// Returns `true` when the controls were hidden before.
    pub fn show(&self, session: &mut PlaybackSession, tx: UnboundedSender<PlayerEvent>) -> bool {
        let id = session.id;
        session
            .controls_hide_timer
            .arm_once(self.hide_after, tx, PlayerEvent::HideControls(id));

        let changed = !session.controls_visible;
        session.controls_visible = true;
        changed
    }

    /// Hide the controls. Returns `true` when they were visible.
    pub fn hide(&self, session: &mut PlaybackSession) -> bool {
        let changed = session.controls_visible;
        session.controls_visible = false;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrub_maps_fraction_of_bar() {
        let bar = ProgressBar::new(100.0, 400.0);
        assert_eq!(bar.position_at(300.0, Some(600.0)), Some(300.0));
        assert_eq!(bar.position_at(100.0, Some(600.0)), Some(0.0));
        assert_eq!(bar.position_at(500.0, Some(600.0)), Some(600.0));
    }

    #[test]
    fn test_scrub_clamps_outside_bar() {
        let bar = ProgressBar::new(100.0, 400.0);
        assert_eq!(bar.position_at(20.0, Some(600.0)), Some(0.0));
        assert_eq!(bar.position_at(900.0, Some(600.0)), Some(600.0));
    }

    #[test]
    fn test_scrub_needs_width_and_duration() {
        assert_eq!(ProgressBar::new(0.0, 0.0).position_at(10.0, Some(60.0)), None);
        assert_eq!(ProgressBar::new(0.0, 100.0).position_at(10.0, None), None);
        assert_eq!(ProgressBar::new(0.0, 100.0).position_at(10.0, Some(f64::NAN)), None);
    }

    #[test]
    fn test_seek_target_clamps() {
        assert_eq!(seek_target(100.0, 15.0, Some(600.0)), 115.0);
        assert_eq!(seek_target(5.0, -15.0, Some(600.0)), 0.0);
        assert_eq!(seek_target(595.0, 15.0, Some(600.0)), 600.0);
        assert_eq!(seek_target(595.0, 15.0, None), 610.0);
    }

    #[test]
    fn test_progress_label() {
        assert_eq!(progress_label(65.0, Some(3600.0)), "1:05 / 60:00");
        assert_eq!(progress_label(0.0, None), "0:00 / 0:00");
    }
}
