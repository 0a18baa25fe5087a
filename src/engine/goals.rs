// src/engine/goals.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{
    assessment::Assessment,
    attempt::Attempt,
    goal::{Goal, GoalProgress},
};

/// Counts the learner's attempts that qualify for `goal`.
///
/// An attempt qualifies when its kind matches the goal type, it was created
/// inside the goal window, and its assessment belongs to one of the goal's
/// classrooms. The count is not capped at the target.
pub fn goal_progress(
    goal: &Goal,
    attempts: &[Attempt],
    assessments: &HashMap<i64, Assessment>,
    now: DateTime<Utc>,
) -> GoalProgress {
    let window = goal.window();
    let progress = attempts
        .iter()
        .filter(|a| goal.goal_type.counts(a.kind))
        .filter(|a| window.contains(a.created_at))
        .filter(|a| {
            assessments
                .get(&a.assessment_id)
                .is_some_and(|s| !s.classroom_ids.is_disjoint(&goal.classroom_ids))
        })
        .count() as i64;

    GoalProgress {
        goal_id: goal.id,
        progress,
        target: goal.target,
        complete: progress >= i64::from(goal.target),
        state: window.state_at(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::temporal::TemporalState;
    use crate::models::{assessment::AssessmentKind, goal::GoalType};
    use chrono::TimeZone;
    use std::collections::{BTreeMap, BTreeSet};

    fn day(m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, m, d, 12, 0, 0).unwrap()
    }

    fn assessment(id: i64, kind: AssessmentKind, classroom: i64) -> Assessment {
        Assessment {
            id,
            kind,
            title: String::new(),
            classroom_ids: BTreeSet::from([classroom]),
            opening_date: day(1, 1),
            closing_date: day(12, 1),
            question_ids: BTreeSet::new(),
            min_words: None,
            allowed_attempts: None,
        }
    }

    fn attempt(id: i64, assessment_id: i64, kind: AssessmentKind, at: DateTime<Utc>) -> Attempt {
        Attempt {
            id,
            learner_id: 1,
            assessment_id,
            kind,
            attempt_number: 1,
            answers: BTreeMap::new(),
            essay_text: None,
            correct_count: None,
            duration_seconds: None,
            created_at: at,
        }
    }

    fn question_goal() -> Goal {
        Goal {
            id: 3,
            target: 10,
            goal_type: GoalType::Question,
            classroom_ids: BTreeSet::from([100]),
            opening_date: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
            final_date: Utc.with_ymd_and_hms(2025, 3, 31, 23, 59, 59).unwrap(),
        }
    }

    #[test]
    fn test_progress_is_not_capped() {
        let assessments = HashMap::from([
            (1, assessment(1, AssessmentKind::MockExam, 100)),
            (2, assessment(2, AssessmentKind::Essay, 100)),
        ]);
        let mut attempts: Vec<Attempt> = (0..12)
            .map(|i| attempt(i, 1, AssessmentKind::MockExam, day(3, 2 + i as u32)))
            .collect();
        attempts.extend((12..15).map(|i| attempt(i, 2, AssessmentKind::Essay, day(3, 5))));

        let progress = goal_progress(&question_goal(), &attempts, &assessments, day(3, 20));
        assert_eq!(progress.progress, 12);
        assert!(progress.complete);
        assert_eq!(progress.state, TemporalState::Available);
    }

    #[test]
    fn test_attempts_outside_window_or_scope_are_ignored() {
        let assessments = HashMap::from([
            (1, assessment(1, AssessmentKind::MockExam, 100)),
            (2, assessment(2, AssessmentKind::MockExam, 200)),
        ]);
        let attempts = vec![
            attempt(1, 1, AssessmentKind::MockExam, day(2, 27)),
            attempt(2, 1, AssessmentKind::MockExam, day(3, 10)),
            attempt(3, 2, AssessmentKind::MockExam, day(3, 10)),
            attempt(4, 1, AssessmentKind::MockExam, day(4, 1)),
        ];

        let progress = goal_progress(&question_goal(), &attempts, &assessments, day(4, 2));
        assert_eq!(progress.progress, 1);
        assert!(!progress.complete);
        assert_eq!(progress.state, TemporalState::Completed);
    }

    #[test]
    fn test_invalid_goal_window_counts_nothing() {
        let mut goal = question_goal();
        goal.final_date = goal.opening_date;
        let assessments = HashMap::from([(1, assessment(1, AssessmentKind::MockExam, 100))]);
        let attempts = vec![attempt(1, 1, AssessmentKind::MockExam, goal.opening_date)];

        let progress = goal_progress(&goal, &attempts, &assessments, day(3, 1));
        assert_eq!(progress.progress, 0);
        assert_eq!(progress.state, TemporalState::Invalid);
    }
}
