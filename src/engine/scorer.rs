// src/engine/scorer.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{assessment::AssessmentKind, attempt::Attempt};

/// Maximum score of a single essay competency.
pub const COMPETENCY_MAX: i32 = 200;
/// Number of competencies an essay is graded on.
pub const COMPETENCY_COUNT: usize = 5;

/// Non-fatal data problem found while scoring. Logged and returned alongside the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityWarning {
    pub attempt_id: i64,
    pub stored_correct_count: i32,
    pub distinct_question_count: usize,
}

impl fmt::Display for IntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempt {} stores {} correct answers but its assessment has {} distinct questions",
            self.attempt_id, self.stored_correct_count, self.distinct_question_count
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MockExamScore {
    /// Correct count after clamping to the distinct question count.
    pub correct_count: i32,
    pub distinct_question_count: usize,
    /// In `[0, 1]`.
    pub fraction: f64,
    pub warning: Option<IntegrityWarning>,
}

impl MockExamScore {
    pub fn percentage(&self) -> f64 {
        self.fraction * 100.0
    }
}

/// Scores a mock-exam attempt as `correct / distinct questions`.
///
/// An assessment without questions scores 0. A stored count above the
/// question count is clamped and reported through `warning`.
pub fn mock_exam_score(
    attempt_id: i64,
    correct_count: i32,
    distinct_question_count: usize,
) -> MockExamScore {
    let total = distinct_question_count as i32;
    let warning = (correct_count > total).then(|| {
        let warning = IntegrityWarning {
            attempt_id,
            stored_correct_count: correct_count,
            distinct_question_count,
        };
        tracing::warn!("Integrity warning: {}", warning);
        warning
    });

    let correct_count = correct_count.clamp(0, total);
    let fraction = if total == 0 {
        0.0
    } else {
        correct_count as f64 / total as f64
    };

    MockExamScore {
        correct_count,
        distinct_question_count,
        fraction,
        warning,
    }
}

/// Score of a stored attempt for display. Essays have none.
pub fn score_attempt(attempt: &Attempt, distinct_question_count: usize) -> Option<MockExamScore> {
    (attempt.kind == AssessmentKind::MockExam).then(|| {
        mock_exam_score(
            attempt.id,
            attempt.correct_count.unwrap_or(0),
            distinct_question_count,
        )
    })
}

/// Counts the submitted answers that match the answer key.
///
/// Only questions belonging to the assessment count, so the result can never
/// exceed the size of `question_ids`. Matching is strict string equality.
pub fn grade_answers(
    question_ids: &BTreeSet<i64>,
    answers: &BTreeMap<i64, String>,
    answer_key: &HashMap<i64, String>,
) -> i32 {
    answers
        .iter()
        .filter(|&(q_id, given)| {
            question_ids.contains(q_id) && answer_key.get(q_id).is_some_and(|correct| correct == given)
        })
        .count() as i32
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreError {
    WrongCompetencyCount(usize),
    OutOfRange { competency: usize, value: i32 },
}

impl fmt::Display for ScoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreError::WrongCompetencyCount(n) => {
                write!(f, "expected {} competency scores, got {}", COMPETENCY_COUNT, n)
            }
            ScoreError::OutOfRange { competency, value } => write!(
                f,
                "competency {} score {} is outside 0..={}",
                competency, value, COMPETENCY_MAX
            ),
        }
    }
}

impl std::error::Error for ScoreError {}

/// Five essay competency scores, each validated to `[0, 200]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<i32>", into = "Vec<i32>")]
pub struct CompetencyScores([i32; COMPETENCY_COUNT]);

impl CompetencyScores {
    pub fn new(scores: [i32; COMPETENCY_COUNT]) -> Result<Self, ScoreError> {
        // Competencies are numbered from 1.
        if let Some((idx, &value)) = scores
            .iter()
            .enumerate()
            .find(|(_, v)| !(0..=COMPETENCY_MAX).contains(*v))
        {
            return Err(ScoreError::OutOfRange {
                competency: idx + 1,
                value,
            });
        }
        Ok(Self(scores))
    }

    /// Essay score, at most 1000.
    pub fn total(&self) -> i32 {
        self.0.iter().sum()
    }

    pub fn values(&self) -> &[i32; COMPETENCY_COUNT] {
        &self.0
    }
}

impl TryFrom<Vec<i32>> for CompetencyScores {
    type Error = ScoreError;

    fn try_from(values: Vec<i32>) -> Result<Self, Self::Error> {
        let scores: [i32; COMPETENCY_COUNT] = values
            .as_slice()
            .try_into()
            .map_err(|_| ScoreError::WrongCompetencyCount(values.len()))?;
        Self::new(scores)
    }
}

impl From<CompetencyScores> for Vec<i32> {
    fn from(scores: CompetencyScores) -> Self {
        scores.0.to_vec()
    }
}
