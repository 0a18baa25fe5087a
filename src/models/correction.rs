// src/models/correction.rs

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::engine::scorer::{COMPETENCY_COUNT, CompetencyScores};

/// A mentor's scored feedback on an essay attempt. At most one per attempt.
#[derive(Debug, Clone, Serialize)]
pub struct Correction {
    pub id: i64,
    pub attempt_id: i64,
    pub mentor_id: i64,
    pub competency_scores: CompetencyScores,
    /// One comment per competency, sanitized HTML.
    pub comments: Vec<String>,
    /// Opaque tags picked by the mentor.
    pub achievements: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Correction {
    pub fn total(&self) -> i32 {
        self.competency_scores.total()
    }
}

#[derive(Debug, Clone)]
pub struct NewCorrection {
    pub attempt_id: i64,
    pub mentor_id: i64,
    pub competency_scores: CompetencyScores,
    pub comments: Vec<String>,
    pub achievements: BTreeSet<String>,
    pub at: DateTime<Utc>,
}

/// DTO for attaching or replacing a correction.
#[derive(Debug, Deserialize, Validate)]
pub struct CorrectionRequest {
    #[validate(length(equal = 5))]
    pub competency_scores: Vec<i32>,

    #[serde(default)]
    #[validate(custom(function = validate_comments))]
    pub comments: Vec<String>,

    #[serde(default)]
    #[validate(custom(function = validate_achievements))]
    pub achievements: Vec<String>,
}

fn validate_comments(comments: &[String]) -> Result<(), validator::ValidationError> {
    if comments.len() > COMPETENCY_COUNT {
        return Err(validator::ValidationError::new("too_many_comments"));
    }
    for comment in comments {
        if comment.len() > 5000 {
            return Err(validator::ValidationError::new("comment_too_long"));
        }
    }
    Ok(())
}

fn validate_achievements(tags: &[String]) -> Result<(), validator::ValidationError> {
    for tag in tags {
        if tag.is_empty() || tag.len() > 50 {
            return Err(validator::ValidationError::new("invalid_achievement"));
        }
    }
    Ok(())
}

/// Correction plus its derived total, as returned to clients.
#[derive(Debug, Serialize)]
pub struct CorrectionResponse {
    #[serde(flatten)]
    pub correction: Correction,
    pub total: i32,
}

impl From<Correction> for CorrectionResponse {
    fn from(correction: Correction) -> Self {
        let total = correction.total();
        Self { correction, total }
    }
}
