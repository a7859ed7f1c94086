//! Pause accounting for host visibility changes
//!
//! While the host page or window is hidden, playback is presumed suspended.
//! The producer polls [`PauseTracker::take_duration`] to learn how long the
//! last suspension lasted so it can re-anchor its schedule.
//!
//! States:
//! - `Idle`: no window recorded
//! - `Open`: hidden, start recorded
//! - `Closed`: shown again, duration available once
//!
//! A hide always opens a fresh window (last hide wins) and a show always
//! overwrites the end of the current window (last show wins).

use tracing::debug;

/// Returned by [`PauseTracker::take_duration`] while the host is hidden
pub const SUSPENDED: f64 = -1.0;

/// One hidden-host interval, timestamps in host seconds
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PauseWindow {
    #[default]
    Idle,
    Open {
        start: f64,
    },
    Closed {
        start: f64,
        end: f64,
    },
}

#[derive(Debug, Clone, Default)]
pub struct PauseTracker {
    window: PauseWindow,
}

impl PauseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn window(&self) -> PauseWindow {
        self.window
    }

    /// Host became hidden at `timestamp`
    pub fn suspend(&mut self, timestamp: f64) {
        if let PauseWindow::Closed { start, end } = self.window {
            debug!(
                start,
                end, "Unconsumed pause window replaced by a new suspension"
            );
        }
        self.window = PauseWindow::Open { start: timestamp };
    }

    /// Host became visible at `timestamp`. Ignored when no window exists.
    pub fn resume(&mut self, timestamp: f64) {
        match self.window {
            PauseWindow::Idle => {
                debug!(timestamp, "Visible without a preceding hide, ignoring");
            }
            PauseWindow::Open { start } | PauseWindow::Closed { start, .. } => {
                self.window = PauseWindow::Closed {
                    start,
                    end: timestamp,
                };
            }
        }
    }

    /// Consume the last suspension.
    ///
    /// - closed window with positive length: its length in seconds, window cleared
    /// - open window: [`SUSPENDED`] (-1)
    /// - otherwise: 0 (a zero-length or inverted closed window is cleared)
    pub fn take_duration(&mut self) -> f64 {
        match self.window {
            PauseWindow::Idle => 0.0,
            PauseWindow::Open { .. } => SUSPENDED,
            PauseWindow::Closed { start, end } => {
                self.window = PauseWindow::Idle;
                let duration = end - start;
                if duration > 0.0 {
                    duration
                } else {
                    0.0
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_pause_reports_zero() {
        let mut tracker = PauseTracker::new();
        assert_eq!(tracker.take_duration(), 0.0);
        assert_eq!(tracker.window(), PauseWindow::Idle);
    }

    #[test]
    fn test_hide_then_show_reports_once() {
        let mut tracker = PauseTracker::new();
        tracker.suspend(10.0);
        tracker.resume(12.5);
        assert_eq!(tracker.take_duration(), 2.5);
        assert_eq!(tracker.take_duration(), 0.0);
    }

    #[test]
    fn test_open_window_reports_suspended() {
        let mut tracker = PauseTracker::new();
        tracker.suspend(3.0);
        assert_eq!(tracker.take_duration(), SUSPENDED);
        // Querying does not consume an open window
        assert_eq!(tracker.take_duration(), SUSPENDED);
        tracker.resume(4.0);
        assert_eq!(tracker.take_duration(), 1.0);
    }

    #[test]
    fn test_show_without_hide_is_ignored() {
        let mut tracker = PauseTracker::new();
        tracker.resume(5.0);
        assert_eq!(tracker.window(), PauseWindow::Idle);
        assert_eq!(tracker.take_duration(), 0.0);
    }

    #[test]
    fn test_last_hide_wins() {
        let mut tracker = PauseTracker::new();
        tracker.suspend(1.0);
        tracker.resume(2.0);
        tracker.suspend(5.0);
        assert_eq!(tracker.take_duration(), SUSPENDED);
        tracker.resume(5.75);
        assert_eq!(tracker.take_duration(), 0.75);
    }

    #[test]
    fn test_last_show_wins() {
        let mut tracker = PauseTracker::new();
        tracker.suspend(1.0);
        tracker.resume(2.0);
        tracker.resume(4.0);
        assert_eq!(tracker.take_duration(), 3.0);
    }

    #[test]
    fn test_zero_length_window_cleared() {
        let mut tracker = PauseTracker::new();
        tracker.suspend(7.0);
        tracker.resume(7.0);
        assert_eq!(tracker.take_duration(), 0.0);
        assert_eq!(tracker.window(), PauseWindow::Idle);
    }
}
