// src/models/assessment.rs

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::{gate::GateDecision, temporal::TemporalState, temporal::Window};

/// Mock exam ("practice") or essay prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentKind {
    MockExam,
    Essay,
}

impl AssessmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentKind::MockExam => "mock_exam",
            AssessmentKind::Essay => "essay",
        }
    }
}

impl fmt::Display for AssessmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssessmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mock_exam" => Ok(AssessmentKind::MockExam),
            "essay" => Ok(AssessmentKind::Essay),
            other => Err(format!("unknown assessment kind '{}'", other)),
        }
    }
}

/// An assessment as the engine sees it.
///
/// Question ids and classroom ids are sets: duplicates in the stored arrays
/// are collapsed on load.
#[derive(Debug, Clone, Serialize)]
pub struct Assessment {
    pub id: i64,
    pub kind: AssessmentKind,
    pub title: String,
    pub classroom_ids: BTreeSet<i64>,
    pub opening_date: DateTime<Utc>,
    pub closing_date: DateTime<Utc>,
    pub question_ids: BTreeSet<i64>,
    pub min_words: Option<i32>,
    /// `None` means "not configured"; see [`Assessment::attempt_limit`].
    pub allowed_attempts: Option<i32>,
}

impl Assessment {
    pub fn window(&self) -> Window {
        Window::new(self.opening_date, self.closing_date)
    }

    pub fn distinct_question_count(&self) -> usize {
        self.question_ids.len()
    }

    /// Effective attempt cap. Essays fall back to a single attempt, mock
    /// exams to the configured default.
    pub fn attempt_limit(&self, default_allowed: u32) -> u32 {
        match (self.allowed_attempts, self.kind) {
            (Some(n), _) => n.max(1) as u32,
            (None, AssessmentKind::Essay) => 1,
            (None, AssessmentKind::MockExam) => default_allowed.max(1),
        }
    }
}

/// Catalog input for an assessment. Owned by the external catalog; used to seed stores.
#[derive(Debug, Clone)]
pub struct NewAssessment {
    pub kind: AssessmentKind,
    pub title: String,
    pub classroom_ids: Vec<i64>,
    pub opening_date: DateTime<Utc>,
    pub closing_date: DateTime<Utc>,
    pub question_ids: Vec<i64>,
    pub min_words: Option<i32>,
    pub allowed_attempts: Option<i32>,
}

/// Response for `GET /api/assessments/{id}/status`.
#[derive(Debug, Serialize)]
pub struct AssessmentStatusResponse {
    pub assessment_id: i64,
    pub kind: AssessmentKind,
    pub state: TemporalState,
    pub opening_date: DateTime<Utc>,
    pub closing_date: DateTime<Utc>,
    pub attempts_used: u32,
    pub allowed_attempts: u32,
    #[serde(flatten)]
    pub gate: GateDecision,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assessment(kind: AssessmentKind, allowed_attempts: Option<i32>) -> Assessment {
        Assessment {
            id: 1,
            kind,
            title: "t".to_string(),
            classroom_ids: BTreeSet::new(),
            opening_date: Utc::now(),
            closing_date: Utc::now(),
            question_ids: BTreeSet::new(),
            min_words: None,
            allowed_attempts,
        }
    }

    #[test]
    fn test_attempt_limit_defaults() {
        assert_eq!(assessment(AssessmentKind::Essay, None).attempt_limit(3), 1);
        assert_eq!(assessment(AssessmentKind::MockExam, None).attempt_limit(3), 3);
        assert_eq!(assessment(AssessmentKind::Essay, Some(2)).attempt_limit(3), 2);
    }

    #[test]
    fn test_kind_parses_round_trip_names() {
        assert_eq!("essay".parse::<AssessmentKind>(), Ok(AssessmentKind::Essay));
        assert!("quiz".parse::<AssessmentKind>().is_err());
    }
}
