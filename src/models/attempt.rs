// src/models/attempt.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{engine::scorer::MockExamScore, models::assessment::AssessmentKind};

/// One learner's submission against an assessment.
/// Immutable after creation; essays only gain a correction.
#[derive(Debug, Clone, Serialize)]
pub struct Attempt {
    pub id: i64,
    pub learner_id: i64,
    pub assessment_id: i64,
    pub kind: AssessmentKind,
    /// 1-based, unique per (learner, assessment).
    pub attempt_number: i32,
    /// Mock exam answers, keyed by question id.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub answers: BTreeMap<i64, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub essay_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_count: Option<i32>,
    pub duration_seconds: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// An attempt as returned to clients, with its mock-exam score.
/// The score's correct count is clamped for display; the stored row is not touched.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredAttempt {
    #[serde(flatten)]
    pub attempt: Attempt,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<MockExamScore>,
}

/// What the learner hands in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptPayload {
    MockExam { answers: BTreeMap<i64, String> },
    Essay { text: String },
}

impl AttemptPayload {
    pub fn kind(&self) -> AssessmentKind {
        match self {
            AttemptPayload::MockExam { .. } => AssessmentKind::MockExam,
            AttemptPayload::Essay { .. } => AssessmentKind::Essay,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AttemptSubmission {
    pub payload: AttemptPayload,
    pub duration_seconds: Option<i32>,
}

/// Row to insert. `attempt_number` is the slot being claimed.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub learner_id: i64,
    pub assessment_id: i64,
    pub kind: AssessmentKind,
    pub attempt_number: i32,
    pub answers: BTreeMap<i64, String>,
    pub essay_text: Option<String>,
    pub correct_count: Option<i32>,
    pub duration_seconds: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Result of a conditional attempt insert.
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    Inserted(Attempt),
    /// Another submission already claimed this attempt number.
    SlotTaken,
}

/// Attempt count and highest attempt number for one (learner, assessment) key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptSlots {
    pub count: i64,
    pub last_number: i32,
}

/// Read projections over the ledger. Results are ordered by `created_at` ascending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptFilter {
    pub learner_id: Option<i64>,
    pub assessment_id: Option<i64>,
}

impl AttemptFilter {
    pub fn learner(learner_id: i64) -> Self {
        Self {
            learner_id: Some(learner_id),
            assessment_id: None,
        }
    }

    pub fn assessment(assessment_id: i64) -> Self {
        Self {
            learner_id: None,
            assessment_id: Some(assessment_id),
        }
    }

    pub fn learner_assessment(learner_id: i64, assessment_id: i64) -> Self {
        Self {
            learner_id: Some(learner_id),
            assessment_id: Some(assessment_id),
        }
    }

    pub fn matches(&self, attempt: &Attempt) -> bool {
        self.learner_id.is_none_or(|id| id == attempt.learner_id)
            && self.assessment_id.is_none_or(|id| id == attempt.assessment_id)
    }
}

/// DTO for submitting an attempt.
/// Mock exams send `answers`; essays send `text`.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAttemptRequest {
    #[serde(default)]
    #[validate(custom(function = validate_answers))]
    pub answers: BTreeMap<i64, String>,

    #[validate(length(min = 1, max = 20000))]
    pub text: Option<String>,

    #[validate(range(min = 0, max = 86400))]
    pub duration_seconds: Option<i32>,
}

impl SubmitAttemptRequest {
    pub fn into_submission(self) -> AttemptSubmission {
        let payload = match self.text {
            Some(text) => AttemptPayload::Essay { text },
            None => AttemptPayload::MockExam {
                answers: self.answers,
            },
        };
        AttemptSubmission {
            payload,
            duration_seconds: self.duration_seconds,
        }
    }
}

fn validate_answers(answers: &BTreeMap<i64, String>) -> Result<(), validator::ValidationError> {
    if answers.len() > 500 {
        return Err(validator::ValidationError::new("too_many_answers"));
    }
    for answer in answers.values() {
        if answer.len() > 500 {
            return Err(validator::ValidationError::new("answer_too_long"));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct AttemptListParams {
    pub assessment_id: Option<i64>,
}
