// src/engine/temporal.rs

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Availability of a time-boxed assessment (or goal) at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalState {
    /// `opening >= closing`. Never attemptable, whatever the current time.
    Invalid,
    Scheduled,
    Available,
    Completed,
}

/// An opening/closing pair. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub opening: DateTime<Utc>,
    pub closing: DateTime<Utc>,
}

impl Window {
    pub fn new(opening: DateTime<Utc>, closing: DateTime<Utc>) -> Self {
        Self { opening, closing }
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> TemporalState {
        evaluate_temporal_state(self, now)
    }

    /// Whether `instant` falls inside a valid window.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.state_at(instant) == TemporalState::Available
    }
}

/// Derives the availability state of `window` at `now`.
///
/// The window's own consistency is checked first, so an inverted window
/// stays `Invalid` for every `now`. Callers must re-evaluate on each query.
pub fn evaluate_temporal_state(window: &Window, now: DateTime<Utc>) -> TemporalState {
    if window.opening >= window.closing {
        TemporalState::Invalid
    } else if now < window.opening {
        TemporalState::Scheduled
    } else if now <= window.closing {
        TemporalState::Available
    } else {
        TemporalState::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_inverted_window_is_invalid_at_any_time() {
        let window = Window::new(at(2025, 2, 1), at(2025, 1, 1));
        for now in [at(2024, 12, 1), at(2025, 1, 15), at(2025, 3, 1)] {
            assert_eq!(evaluate_temporal_state(&window, now), TemporalState::Invalid);
        }
    }

    #[test]
    fn test_zero_length_window_is_invalid() {
        let window = Window::new(at(2025, 1, 1), at(2025, 1, 1));
        assert_eq!(window.state_at(at(2025, 1, 1)), TemporalState::Invalid);
    }

    #[test]
    fn test_states_follow_the_clock() {
        let window = Window::new(at(2025, 1, 1), at(2025, 1, 10));
        assert_eq!(window.state_at(at(2024, 12, 31)), TemporalState::Scheduled);
        assert_eq!(window.state_at(at(2025, 1, 5)), TemporalState::Available);
        assert_eq!(window.state_at(at(2025, 1, 11)), TemporalState::Completed);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let window = Window::new(at(2025, 1, 1), at(2025, 1, 10));
        assert!(window.contains(at(2025, 1, 1)));
        assert!(window.contains(at(2025, 1, 10)));
        assert!(!window.contains(at(2025, 1, 10) + chrono::Duration::seconds(1)));
    }
}
