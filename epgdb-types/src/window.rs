//! Retention / import time window.

use crate::identity::clamp_duration;

const SECS_PER_HOUR: i64 = 3600;
const SECS_PER_DAY: i64 = 86400;

/// Time range `(now - outdated, now + timespan)` within which events are
/// written. Both bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportWindow {
    /// Events must end after this time.
    pub epoch_time: i64,
    /// Events must begin before this time.
    pub cutoff_time: i64,
}

impl ImportWindow {
    pub fn new(now: i64, outdated_hours: i64, timespan_days: i64) -> Self {
        Self {
            epoch_time: now.saturating_sub(outdated_hours.saturating_mul(SECS_PER_HOUR)),
            cutoff_time: now.saturating_add(timespan_days.saturating_mul(SECS_PER_DAY)),
        }
    }

    /// Whether an event starting at `begin_time` lasting `duration` seconds
    /// falls inside the window.
    pub fn contains(&self, begin_time: i64, duration: i64) -> bool {
        let end_time = begin_time.saturating_add(clamp_duration(duration));
        end_time > self.epoch_time && begin_time < self.cutoff_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_window_bounds() {
        let window = ImportWindow::new(NOW, 2, 7);
        assert_eq!(window.epoch_time, NOW - 7200);
        assert_eq!(window.cutoff_time, NOW + 7 * 86400);
    }

    #[test]
    fn test_window_end_boundary_is_exclusive() {
        let window = ImportWindow::new(NOW, 1, 1);
        // Ends exactly at now - 1h: excluded.
        assert!(!window.contains(NOW - 3600 - 600, 600));
        // Ends one second later: included.
        assert!(window.contains(NOW - 3600 - 600, 601));
    }

    #[test]
    fn test_window_begin_boundary_is_exclusive() {
        let window = ImportWindow::new(NOW, 0, 1);
        assert!(!window.contains(NOW + 86400, 60));
        assert!(window.contains(NOW + 86400 - 1, 60));
    }

    #[test]
    fn test_window_clamps_duration() {
        let window = ImportWindow::new(NOW, 0, 1);
        // A zero-length event at `now` still ends after `now` once clamped.
        assert!(window.contains(NOW, 0));
        assert!(!window.contains(NOW - 1, 0));
    }

    #[test]
    fn test_extreme_begin_time_is_outside_window() {
        let window = ImportWindow::new(NOW, 0, 7);
        assert!(!window.contains(i64::MAX - 10, 3600));
        assert!(!window.contains(i64::MIN, i64::MAX));
    }

    #[test]
    fn test_huge_timespans_saturate() {
        let window = ImportWindow::new(NOW, i64::MAX, i64::MAX);
        assert_eq!(window.epoch_time, NOW - i64::MAX);
        assert_eq!(window.cutoff_time, i64::MAX);
        assert!(window.contains(NOW, 60));
    }
}
