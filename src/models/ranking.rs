// src/models/ranking.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Pre-aggregated experience points of one learner in one classroom.
/// Maintained by the external XP subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XpRow {
    pub learner_id: i64,
    pub classroom_id: i64,
    pub xp: i64,
    /// Earliest XP event that counted toward `xp`; `None` if there was none.
    pub first_event_at: Option<DateTime<Utc>>,
}

/// Leaderboard line. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankingEntry {
    pub position: u64,
    pub learner_id: i64,
    pub xp: i64,
    pub first_event_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankingPage {
    pub page: u32,
    pub page_size: u32,
    pub total_learners: u64,
    pub entries: Vec<RankingEntry>,
    /// Requesting learner's position, even when outside `entries`.
    pub own_position: Option<u64>,
}

/// Query for `GET /api/ranking`. Without `classroom_id` the caller's own classrooms are combined.
#[derive(Debug, Deserialize, Validate)]
pub struct RankingParams {
    pub classroom_id: Option<i64>,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1))]
    pub page_size: Option<u32>,
}
