// src/store/memory.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    error::AppError,
    models::{
        assessment::{Assessment, NewAssessment},
        attempt::{Attempt, AttemptFilter, AttemptSlots, InsertOutcome, NewAttempt},
        correction::{Correction, NewCorrection},
        goal::{Goal, NewGoal},
        ranking::XpRow,
    },
    store::Store,
};

#[derive(Default)]
struct Inner {
    next_id: i64,
    assessments: BTreeMap<i64, Assessment>,
    answer_key: HashMap<i64, String>,
    attempts: BTreeMap<i64, Attempt>,
    /// Keyed by attempt id.
    corrections: HashMap<i64, Correction>,
    goals: BTreeMap<i64, Goal>,
    /// (classroom_id, learner_id)
    members: BTreeSet<(i64, i64)>,
    /// (classroom_id, mentor_id)
    mentors: BTreeSet<(i64, i64)>,
    /// Keyed by (learner_id, classroom_id).
    xp: BTreeMap<(i64, i64), XpRow>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-process [`Store`] with the same uniqueness rules as the Postgres schema.
///
/// The `add_*` / `set_*` helpers stand in for the external catalog and XP
/// subsystem when seeding tests or a local demo.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_assessment(&self, new: NewAssessment) -> Assessment {
        let mut inner = self.inner.write().await;
        let assessment = Assessment {
            id: inner.next_id(),
            kind: new.kind,
            title: new.title,
            classroom_ids: new.classroom_ids.into_iter().collect(),
            opening_date: new.opening_date,
            closing_date: new.closing_date,
            question_ids: new.question_ids.into_iter().collect(),
            min_words: new.min_words,
            allowed_attempts: new.allowed_attempts,
        };
        inner.assessments.insert(assessment.id, assessment.clone());
        assessment
    }

    pub async fn add_question(&self, question_id: i64, answer: &str) {
        self.inner
            .write()
            .await
            .answer_key
            .insert(question_id, answer.to_string());
    }

    pub async fn add_goal(&self, new: NewGoal) -> Goal {
        let mut inner = self.inner.write().await;
        let goal = Goal {
            id: inner.next_id(),
            target: new.target,
            goal_type: new.goal_type,
            classroom_ids: new.classroom_ids.into_iter().collect(),
            opening_date: new.opening_date,
            final_date: new.final_date,
        };
        inner.goals.insert(goal.id, goal.clone());
        goal
    }

    pub async fn add_member(&self, classroom_id: i64, learner_id: i64) {
        self.inner
            .write()
            .await
            .members
            .insert((classroom_id, learner_id));
    }

    pub async fn add_mentor(&self, classroom_id: i64, mentor_id: i64) {
        self.inner
            .write()
            .await
            .mentors
            .insert((classroom_id, mentor_id));
    }

    /// Sets a learner's XP in a classroom, enrolling them if needed.
    pub async fn set_xp(&self, row: XpRow) {
        let mut inner = self.inner.write().await;
        inner.members.insert((row.classroom_id, row.learner_id));
        inner.xp.insert((row.learner_id, row.classroom_id), row);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn assessment(&self, id: i64) -> Result<Option<Assessment>, AppError> {
        Ok(self.inner.read().await.assessments.get(&id).cloned())
    }

    async fn assessments(&self, ids: &[i64]) -> Result<Vec<Assessment>, AppError> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(|id| inner.assessments.get(id).cloned())
            .collect())
    }

    async fn answer_key(&self, question_ids: &[i64]) -> Result<HashMap<i64, String>, AppError> {
        let inner = self.inner.read().await;
        Ok(question_ids
            .iter()
            .filter_map(|id| inner.answer_key.get(id).map(|a| (*id, a.clone())))
            .collect())
    }

    async fn attempt_slots(
        &self,
        learner_id: i64,
        assessment_id: i64,
    ) -> Result<AttemptSlots, AppError> {
        let filter = AttemptFilter::learner_assessment(learner_id, assessment_id);
        let inner = self.inner.read().await;
        Ok(inner
            .attempts
            .values()
            .filter(|a| filter.matches(a))
            .fold(AttemptSlots::default(), |slots, a| AttemptSlots {
                count: slots.count + 1,
                last_number: slots.last_number.max(a.attempt_number),
            }))
    }

    async fn attempt(&self, id: i64) -> Result<Option<Attempt>, AppError> {
        Ok(self.inner.read().await.attempts.get(&id).cloned())
    }

    async fn list_attempts(&self, filter: AttemptFilter) -> Result<Vec<Attempt>, AppError> {
        let inner = self.inner.read().await;
        let mut attempts: Vec<Attempt> = inner
            .attempts
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        attempts.sort_by_key(|a| (a.created_at, a.id));
        Ok(attempts)
    }

    async fn insert_attempt(&self, new: NewAttempt) -> Result<InsertOutcome, AppError> {
        let mut inner = self.inner.write().await;
        if !inner.assessments.contains_key(&new.assessment_id) {
            return Err(AppError::NotFound(format!(
                "Assessment {} not found",
                new.assessment_id
            )));
        }

        let taken = inner.attempts.values().any(|a| {
            a.learner_id == new.learner_id
                && a.assessment_id == new.assessment_id
                && a.attempt_number == new.attempt_number
        });
        if taken {
            return Ok(InsertOutcome::SlotTaken);
        }

        let attempt = Attempt {
            id: inner.next_id(),
            learner_id: new.learner_id,
            assessment_id: new.assessment_id,
            kind: new.kind,
            attempt_number: new.attempt_number,
            answers: new.answers,
            essay_text: new.essay_text,
            correct_count: new.correct_count,
            duration_seconds: new.duration_seconds,
            created_at: new.created_at,
        };
        inner.attempts.insert(attempt.id, attempt.clone());
        Ok(InsertOutcome::Inserted(attempt))
    }

    async fn delete_attempt(&self, id: i64) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        inner.corrections.remove(&id);
        Ok(inner.attempts.remove(&id).is_some())
    }

    async fn corrections(&self, attempt_ids: &[i64]) -> Result<Vec<Correction>, AppError> {
        let inner = self.inner.read().await;
        Ok(attempt_ids
            .iter()
            .filter_map(|id| inner.corrections.get(id).cloned())
            .collect())
    }

    async fn insert_correction(&self, new: NewCorrection) -> Result<Option<Correction>, AppError> {
        let mut inner = self.inner.write().await;
        if !inner.attempts.contains_key(&new.attempt_id) {
            return Err(AppError::NotFound(format!(
                "Attempt {} not found",
                new.attempt_id
            )));
        }
        if inner.corrections.contains_key(&new.attempt_id) {
            return Ok(None);
        }

        let correction = Correction {
            id: inner.next_id(),
            attempt_id: new.attempt_id,
            mentor_id: new.mentor_id,
            competency_scores: new.competency_scores,
            comments: new.comments,
            achievements: new.achievements,
            created_at: new.at,
            updated_at: new.at,
        };
        inner
            .corrections
            .insert(correction.attempt_id, correction.clone());
        Ok(Some(correction))
    }

    async fn replace_correction(&self, new: NewCorrection) -> Result<Option<Correction>, AppError> {
        let mut inner = self.inner.write().await;
        let Some(existing) = inner.corrections.get_mut(&new.attempt_id) else {
            return Ok(None);
        };
        existing.mentor_id = new.mentor_id;
        existing.competency_scores = new.competency_scores;
        existing.comments = new.comments;
        existing.achievements = new.achievements;
        existing.updated_at = new.at;
        Ok(Some(existing.clone()))
    }

    async fn goal(&self, id: i64) -> Result<Option<Goal>, AppError> {
        Ok(self.inner.read().await.goals.get(&id).cloned())
    }

    async fn learner_classrooms(&self, learner_id: i64) -> Result<Vec<i64>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .members
            .iter()
            .filter(|(_, learner)| *learner == learner_id)
            .map(|(classroom, _)| *classroom)
            .collect())
    }

    async fn mentor_classrooms(&self, mentor_id: i64) -> Result<Vec<i64>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .mentors
            .iter()
            .filter(|(_, mentor)| *mentor == mentor_id)
            .map(|(classroom, _)| *classroom)
            .collect())
    }

    async fn xp_rows(&self, classroom_ids: &[i64]) -> Result<Vec<XpRow>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .members
            .iter()
            .filter(|(classroom, _)| classroom_ids.contains(classroom))
            .map(|&(classroom_id, learner_id)| {
                inner
                    .xp
                    .get(&(learner_id, classroom_id))
                    .cloned()
                    .unwrap_or(XpRow {
                        learner_id,
                        classroom_id,
                        xp: 0,
                        first_event_at: None,
                    })
            })
            .collect())
    }
}
