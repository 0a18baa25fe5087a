// src/models/stats.rs

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::engine::scorer::IntegrityWarning;

/// Per-learner roll-up of the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearnerStats {
    pub learner_id: i64,
    /// Distinct assessments with at least one attempt.
    pub completion_count: usize,
    pub attempt_count: usize,
    /// Mean mock-exam percentage; 0 without mock-exam attempts.
    pub average_score: f64,
    /// Mean over attempts that reported a duration.
    pub average_duration_seconds: Option<f64>,
    /// Mean total of corrected essays.
    pub average_essay_total: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<IntegrityWarning>,
}

/// DTO for `POST /api/me/progress`.
#[derive(Debug, Deserialize, Validate)]
pub struct ProgressRequest {
    #[validate(length(max = 1000))]
    pub assessment_ids: Vec<i64>,
}

impl ProgressRequest {
    pub fn assessment_set(&self) -> BTreeSet<i64> {
        self.assessment_ids.iter().copied().collect()
    }
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub total_assessments: usize,
    pub completed: usize,
    pub percentage: i64,
}
