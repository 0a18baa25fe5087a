// src/engine/gate.rs

use std::fmt;

use serde::Serialize;

use crate::engine::temporal::TemporalState;

/// Why a new attempt may not start. Each variant maps to its own user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefusalReason {
    NotYetOpen,
    AlreadyClosed,
    InvalidWindow,
    AttemptsExhausted,
}

impl RefusalReason {
    /// Stable machine-readable code, same as the serialized form.
    pub fn code(&self) -> &'static str {
        match self {
            RefusalReason::NotYetOpen => "not_yet_open",
            RefusalReason::AlreadyClosed => "already_closed",
            RefusalReason::InvalidWindow => "invalid_window",
            RefusalReason::AttemptsExhausted => "attempts_exhausted",
        }
    }
}

impl fmt::Display for RefusalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            RefusalReason::NotYetOpen => "This assessment is not open yet",
            RefusalReason::AlreadyClosed => "This assessment is already closed",
            RefusalReason::InvalidWindow => "This assessment has an invalid schedule",
            RefusalReason::AttemptsExhausted => "No attempts left for this assessment",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    Allowed { remaining: u32 },
    Refused { reason: RefusalReason },
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allowed { .. })
    }
}

/// Decides whether a learner holding `existing` attempts may start another one.
///
/// An invalid window is reported first. An exhausted cap comes next and is
/// stable for any later instant, then the temporal refusals.
pub fn decide(state: TemporalState, existing: u32, allowed: u32) -> GateDecision {
    let reason = match state {
        TemporalState::Invalid => Some(RefusalReason::InvalidWindow),
        _ if existing >= allowed => Some(RefusalReason::AttemptsExhausted),
        TemporalState::Scheduled => Some(RefusalReason::NotYetOpen),
        TemporalState::Completed => Some(RefusalReason::AlreadyClosed),
        TemporalState::Available => None,
    };

    match reason {
        Some(reason) => GateDecision::Refused { reason },
        None => GateDecision::Allowed {
            remaining: allowed - existing,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_reports_remaining_slots() {
        assert_eq!(
            decide(TemporalState::Available, 1, 3),
            GateDecision::Allowed { remaining: 2 }
        );
    }

    #[test]
    fn test_cap_reached_is_exhausted() {
        assert_eq!(
            decide(TemporalState::Available, 1, 1),
            GateDecision::Refused {
                reason: RefusalReason::AttemptsExhausted
            }
        );
        assert!(!decide(TemporalState::Available, 5, 1).is_allowed());
    }

    #[test]
    fn test_temporal_reasons_are_distinct() {
        let reason = |state| match decide(state, 0, 1) {
            GateDecision::Refused { reason } => reason,
            GateDecision::Allowed { .. } => panic!("expected refusal"),
        };
        assert_eq!(reason(TemporalState::Invalid), RefusalReason::InvalidWindow);
        assert_eq!(reason(TemporalState::Scheduled), RefusalReason::NotYetOpen);
        assert_eq!(reason(TemporalState::Completed), RefusalReason::AlreadyClosed);
    }

    #[test]
    fn test_exhausted_wins_over_closed() {
        assert_eq!(
            decide(TemporalState::Completed, 3, 1),
            GateDecision::Refused {
                reason: RefusalReason::AttemptsExhausted
            }
        );
        assert_eq!(
            decide(TemporalState::Scheduled, 1, 1),
            GateDecision::Refused {
                reason: RefusalReason::AttemptsExhausted
            }
        );
    }

    #[test]
    fn test_invalid_window_wins_over_exhausted() {
        assert_eq!(
            decide(TemporalState::Invalid, 3, 1),
            GateDecision::Refused {
                reason: RefusalReason::InvalidWindow
            }
        );
    }
}
