// src/engine/aggregate.rs

use std::collections::{BTreeSet, HashMap};

use crate::{
    engine::scorer::score_attempt,
    models::{
        assessment::{Assessment, AssessmentKind},
        attempt::Attempt,
        correction::Correction,
        stats::{LearnerStats, ProgressResponse},
    },
};

/// Rolls a learner's attempts up into [`LearnerStats`].
///
/// * `completion_count` counts distinct assessments, not attempts.
/// * `average_score` covers mock-exam attempts only. An attempt whose
///   assessment has no questions (or is gone) contributes 0.
/// * Attempts without a duration are left out of `average_duration_seconds` entirely.
pub fn learner_stats(
    learner_id: i64,
    attempts: &[Attempt],
    assessments: &HashMap<i64, Assessment>,
    corrections: &HashMap<i64, Correction>,
) -> LearnerStats {
    let completion_count = attempts
        .iter()
        .map(|a| a.assessment_id)
        .collect::<BTreeSet<_>>()
        .len();

    let mut warnings = Vec::new();
    let mock_percentages: Vec<f64> = attempts
        .iter()
        .filter_map(|a| {
            let distinct = assessments
                .get(&a.assessment_id)
                .map(Assessment::distinct_question_count)
                .unwrap_or(0);
            score_attempt(a, distinct)
        })
        .map(|score| {
            if let Some(warning) = score.warning.clone() {
                warnings.push(warning);
            }
            score.percentage()
        })
        .collect();

    let durations: Vec<f64> = attempts
        .iter()
        .filter_map(|a| a.duration_seconds)
        .map(f64::from)
        .collect();

    let essay_totals: Vec<f64> = attempts
        .iter()
        .filter(|a| a.kind == AssessmentKind::Essay)
        .filter_map(|a| corrections.get(&a.id))
        .map(|c| f64::from(c.total()))
        .collect();

    LearnerStats {
        learner_id,
        completion_count,
        attempt_count: attempts.len(),
        average_score: mean(&mock_percentages).unwrap_or(0.0),
        average_duration_seconds: mean(&durations),
        average_essay_total: mean(&essay_totals),
        warnings,
    }
}

/// Share of `assessment_set` the learner has attempted at least once, as a
/// rounded percentage. An empty set yields 0.
pub fn progress_percentage(attempts: &[Attempt], assessment_set: &BTreeSet<i64>) -> ProgressResponse {
    let completed = attempts
        .iter()
        .map(|a| a.assessment_id)
        .filter(|id| assessment_set.contains(id))
        .collect::<BTreeSet<_>>()
        .len();
    let total = assessment_set.len();

    let percentage = if total == 0 {
        0
    } else {
        (completed as f64 / total as f64 * 100.0).round() as i64
    };

    ProgressResponse {
        total_assessments: total,
        completed,
        percentage,
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::scorer::CompetencyScores;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn assessment(id: i64, questions: &[i64]) -> Assessment {
        Assessment {
            id,
            kind: AssessmentKind::MockExam,
            title: format!("Practice {}", id),
            classroom_ids: BTreeSet::new(),
            opening_date: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            closing_date: Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
            question_ids: questions.iter().copied().collect(),
            min_words: None,
            allowed_attempts: Some(3),
        }
    }

    fn mock_attempt(id: i64, assessment_id: i64, correct: i32, duration: Option<i32>) -> Attempt {
        Attempt {
            id,
            learner_id: 7,
            assessment_id,
            kind: AssessmentKind::MockExam,
            attempt_number: 1,
            answers: BTreeMap::new(),
            essay_text: None,
            correct_count: Some(correct),
            duration_seconds: duration,
            created_at: Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap(),
        }
    }

    fn by_id(list: Vec<Assessment>) -> HashMap<i64, Assessment> {
        list.into_iter().map(|a| (a.id, a)).collect()
    }

    #[test]
    fn test_no_attempts_is_defined() {
        let stats = learner_stats(7, &[], &HashMap::new(), &HashMap::new());
        assert_eq!(stats.completion_count, 0);
        assert_eq!(stats.average_score, 0.0);
        assert_eq!(stats.average_duration_seconds, None);
        assert_eq!(stats.average_essay_total, None);
    }

    #[test]
    fn test_completion_counts_distinct_assessments() {
        let assessments = by_id(vec![assessment(1, &[1, 2]), assessment(2, &[3, 4])]);
        let attempts = vec![
            mock_attempt(1, 1, 1, None),
            mock_attempt(2, 1, 2, None),
            mock_attempt(3, 1, 2, None),
            mock_attempt(4, 2, 0, None),
        ];
        let stats = learner_stats(7, &attempts, &assessments, &HashMap::new());
        assert_eq!(stats.completion_count, 2);
        assert_eq!(stats.attempt_count, 4);
        // (50 + 100 + 100 + 0) / 4
        assert_eq!(stats.average_score, 62.5);
    }

    #[test]
    fn test_missing_duration_is_excluded() {
        let assessments = by_id(vec![assessment(1, &[1])]);
        let attempts = vec![mock_attempt(1, 1, 1, Some(600)), mock_attempt(2, 1, 1, None)];
        let stats = learner_stats(7, &attempts, &assessments, &HashMap::new());
        assert_eq!(stats.average_duration_seconds, Some(600.0));
    }

    #[test]
    fn test_empty_question_set_contributes_zero() {
        let assessments = by_id(vec![assessment(1, &[]), assessment(2, &[1])]);
        let attempts = vec![mock_attempt(1, 1, 0, None), mock_attempt(2, 2, 1, None)];
        let stats = learner_stats(7, &attempts, &assessments, &HashMap::new());
        assert_eq!(stats.average_score, 50.0);
    }

    #[test]
    fn test_inflated_correct_count_is_clamped_and_reported() {
        let assessments = by_id(vec![assessment(1, &[1, 2])]);
        let attempts = vec![mock_attempt(9, 1, 5, None)];
        let stats = learner_stats(7, &attempts, &assessments, &HashMap::new());
        assert_eq!(stats.average_score, 100.0);
        assert_eq!(stats.warnings.len(), 1);
        assert_eq!(stats.warnings[0].attempt_id, 9);
    }

    #[test]
    fn test_essay_average_uses_corrections() {
        let mut essay = mock_attempt(5, 3, 0, None);
        essay.kind = AssessmentKind::Essay;
        essay.correct_count = None;
        let correction = Correction {
            id: 1,
            attempt_id: 5,
            mentor_id: 2,
            competency_scores: CompetencyScores::new([180, 160, 170, 150, 140]).unwrap(),
            comments: vec![],
            achievements: BTreeSet::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let corrections = HashMap::from([(5, correction)]);
        let stats = learner_stats(7, &[essay], &HashMap::new(), &corrections);
        assert_eq!(stats.average_essay_total, Some(800.0));
        assert_eq!(stats.average_score, 0.0);
        assert_eq!(stats.completion_count, 1);
    }

    #[test]
    fn test_progress_percentage() {
        let attempts = vec![
            mock_attempt(1, 1, 0, None),
            mock_attempt(2, 1, 0, None),
            mock_attempt(3, 4, 0, None),
        ];
        let set: BTreeSet<i64> = [1, 2, 3].into_iter().collect();
        let progress = progress_percentage(&attempts, &set);
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.percentage, 33);

        let empty = progress_percentage(&attempts, &BTreeSet::new());
        assert_eq!(empty.percentage, 0);
    }
}
