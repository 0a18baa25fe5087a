// src/engine/ledger.rs

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    config::{EngineConfig, RECORD_ATTEMPT_MAX_RETRIES},
    engine::{
        aggregate,
        gate::{self, GateDecision},
        goals,
        ranking::{self, RankingScope},
        scorer::{grade_answers, score_attempt},
    },
    error::AppError,
    models::{
        assessment::{Assessment, AssessmentKind, AssessmentStatusResponse},
        attempt::{
            Attempt, AttemptFilter, AttemptPayload, AttemptSlots, AttemptSubmission,
            InsertOutcome, NewAttempt, ScoredAttempt,
        },
        correction::{Correction, NewCorrection},
        goal::GoalProgress,
        ranking::RankingPage,
        stats::{LearnerStats, ProgressResponse},
    },
    store::Store,
};

/// Assessment lifecycle service: gates, records and corrects attempts, and
/// serves the derived views. Holds no state of its own beyond the store handle.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn Store>,
    config: EngineConfig,
}

fn scored(attempt: Attempt, assessment: Option<&Assessment>) -> ScoredAttempt {
    let distinct = assessment
        .map(Assessment::distinct_question_count)
        .unwrap_or(0);
    let score = score_attempt(&attempt, distinct);
    ScoredAttempt { attempt, score }
}

impl Ledger {
    pub fn new(store: Arc<dyn Store>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    async fn require_assessment(&self, id: i64) -> Result<Assessment, AppError> {
        self.store
            .assessment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Assessment {} not found", id)))
    }

    async fn require_attempt(&self, id: i64) -> Result<Attempt, AppError> {
        self.store
            .attempt(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attempt {} not found", id)))
    }

    fn decide(&self, assessment: &Assessment, slots: AttemptSlots, now: DateTime<Utc>) -> GateDecision {
        let state = assessment.window().state_at(now);
        let existing = u32::try_from(slots.count).unwrap_or(u32::MAX);
        gate::decide(
            state,
            existing,
            assessment.attempt_limit(self.config.default_allowed_attempts),
        )
    }

    /// Whether `learner_id` may start a new attempt on the assessment at `now`.
    pub async fn can_start_attempt(
        &self,
        learner_id: i64,
        assessment_id: i64,
        now: DateTime<Utc>,
    ) -> Result<GateDecision, AppError> {
        let assessment = self.require_assessment(assessment_id).await?;
        let slots = self.store.attempt_slots(learner_id, assessment_id).await?;
        Ok(self.decide(&assessment, slots, now))
    }

    /// Temporal state and gate decision together, for status screens.
    pub async fn assessment_status(
        &self,
        learner_id: i64,
        assessment_id: i64,
        now: DateTime<Utc>,
    ) -> Result<AssessmentStatusResponse, AppError> {
        let assessment = self.require_assessment(assessment_id).await?;
        let slots = self.store.attempt_slots(learner_id, assessment_id).await?;

        Ok(AssessmentStatusResponse {
            assessment_id,
            kind: assessment.kind,
            state: assessment.window().state_at(now),
            opening_date: assessment.opening_date,
            closing_date: assessment.closing_date,
            attempts_used: u32::try_from(slots.count).unwrap_or(u32::MAX),
            allowed_attempts: assessment.attempt_limit(self.config.default_allowed_attempts),
            gate: self.decide(&assessment, slots, now),
        })
    }

    /// Appends a new attempt after re-running the gate.
    ///
    /// The gate check and the insert race against other submissions for the
    /// same (learner, assessment) only: the insert claims the next attempt
    /// number, and losing that claim re-runs the gate. A refusal never writes.
    pub async fn record_attempt(
        &self,
        learner_id: i64,
        assessment_id: i64,
        submission: AttemptSubmission,
        now: DateTime<Utc>,
    ) -> Result<ScoredAttempt, AppError> {
        let assessment = self.require_assessment(assessment_id).await?;

        if submission.payload.kind() != assessment.kind {
            return Err(AppError::BadRequest(format!(
                "Assessment {} expects a {} submission",
                assessment.id, assessment.kind
            )));
        }

        let (answers, essay_text, correct_count) = match submission.payload {
            AttemptPayload::MockExam { answers } => {
                let question_ids: Vec<i64> = assessment.question_ids.iter().copied().collect();
                let answer_key = self.store.answer_key(&question_ids).await?;
                let correct = grade_answers(&assessment.question_ids, &answers, &answer_key);
                (answers, None, Some(correct))
            }
            AttemptPayload::Essay { text } => {
                let words = text.split_whitespace().count();
                let min_words = assessment.min_words.unwrap_or(0).max(0) as usize;
                if words < min_words {
                    return Err(AppError::BadRequest(format!(
                        "Essay needs at least {} words, got {}",
                        min_words, words
                    )));
                }
                (Default::default(), Some(text), None)
            }
        };

        for _ in 0..=RECORD_ATTEMPT_MAX_RETRIES {
            let slots = self.store.attempt_slots(learner_id, assessment_id).await?;
            if let GateDecision::Refused { reason } = self.decide(&assessment, slots, now) {
                tracing::info!(
                    learner_id,
                    assessment_id,
                    reason = reason.code(),
                    "Attempt refused"
                );
                return Err(AppError::Refused(reason));
            }

            let new = NewAttempt {
                learner_id,
                assessment_id,
                kind: assessment.kind,
                attempt_number: slots.last_number + 1,
                answers: answers.clone(),
                essay_text: essay_text.clone(),
                correct_count,
                duration_seconds: submission.duration_seconds,
                created_at: now,
            };

            match self.store.insert_attempt(new).await? {
                InsertOutcome::Inserted(attempt) => {
                    tracing::info!(
                        learner_id,
                        assessment_id,
                        attempt_id = attempt.id,
                        attempt_number = attempt.attempt_number,
                        "Attempt recorded"
                    );
                    return Ok(scored(attempt, Some(&assessment)));
                }
                InsertOutcome::SlotTaken => {
                    tracing::debug!(learner_id, assessment_id, "Attempt slot taken, re-checking gate");
                }
            }
        }

        tracing::warn!(learner_id, assessment_id, "Gave up recording attempt after repeated slot conflicts");
        Err(AppError::Conflict(
            "Concurrent submissions for this assessment, please retry".to_string(),
        ))
    }

    /// Attempts matching `filter`, oldest first, each with its display score.
    pub async fn list_attempts(&self, filter: AttemptFilter) -> Result<Vec<ScoredAttempt>, AppError> {
        let attempts = self.store.list_attempts(filter).await?;
        let assessments = self.assessments_for(&attempts).await?;

        Ok(attempts
            .into_iter()
            .map(|attempt| {
                let assessment = assessments.get(&attempt.assessment_id);
                scored(attempt, assessment)
            })
            .collect())
    }

    /// Administrative override; learners never delete attempts.
    pub async fn delete_attempt(&self, attempt_id: i64) -> Result<(), AppError> {
        if !self.store.delete_attempt(attempt_id).await? {
            return Err(AppError::NotFound(format!("Attempt {} not found", attempt_id)));
        }
        tracing::info!(attempt_id, "Attempt deleted by administrator");
        Ok(())
    }

    async fn require_essay_attempt(&self, attempt_id: i64) -> Result<Attempt, AppError> {
        let attempt = self.require_attempt(attempt_id).await?;
        if attempt.kind != AssessmentKind::Essay {
            return Err(AppError::BadRequest(format!(
                "Attempt {} is not an essay",
                attempt_id
            )));
        }
        Ok(attempt)
    }

    /// Attaches the first and only correction of an essay attempt.
    pub async fn attach_correction(&self, new: NewCorrection) -> Result<Correction, AppError> {
        let attempt_id = new.attempt_id;
        self.require_essay_attempt(attempt_id).await?;

        match self.store.insert_correction(new).await? {
            Some(correction) => {
                tracing::info!(attempt_id, total = correction.total(), "Correction attached");
                Ok(correction)
            }
            None => Err(AppError::AlreadyCorrected(attempt_id)),
        }
    }

    /// Replaces every field of an existing correction.
    pub async fn update_correction(&self, new: NewCorrection) -> Result<Correction, AppError> {
        let attempt_id = new.attempt_id;
        self.require_essay_attempt(attempt_id).await?;

        self.store.replace_correction(new).await?.ok_or_else(|| {
            AppError::NotFound(format!("Attempt {} has no correction yet", attempt_id))
        })
    }

    pub async fn attempt(&self, attempt_id: i64) -> Result<Attempt, AppError> {
        self.require_attempt(attempt_id).await
    }

    pub async fn correction(&self, attempt_id: i64) -> Result<Option<Correction>, AppError> {
        Ok(self.store.corrections(&[attempt_id]).await?.into_iter().next())
    }

    async fn assessments_for(&self, attempts: &[Attempt]) -> Result<HashMap<i64, Assessment>, AppError> {
        let ids: Vec<i64> = attempts
            .iter()
            .map(|a| a.assessment_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Ok(self
            .store
            .assessments(&ids)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect())
    }

    pub async fn learner_stats(&self, learner_id: i64) -> Result<LearnerStats, AppError> {
        let attempts = self.store.list_attempts(AttemptFilter::learner(learner_id)).await?;
        let assessments = self.assessments_for(&attempts).await?;

        let essay_ids: Vec<i64> = attempts
            .iter()
            .filter(|a| a.kind == AssessmentKind::Essay)
            .map(|a| a.id)
            .collect();
        let corrections: HashMap<i64, Correction> = if essay_ids.is_empty() {
            HashMap::new()
        } else {
            self.store
                .corrections(&essay_ids)
                .await?
                .into_iter()
                .map(|c| (c.attempt_id, c))
                .collect()
        };

        Ok(aggregate::learner_stats(
            learner_id,
            &attempts,
            &assessments,
            &corrections,
        ))
    }

    pub async fn progress(
        &self,
        learner_id: i64,
        assessment_set: &BTreeSet<i64>,
    ) -> Result<ProgressResponse, AppError> {
        let attempts = self.store.list_attempts(AttemptFilter::learner(learner_id)).await?;
        Ok(aggregate::progress_percentage(&attempts, assessment_set))
    }

    /// Admins reach every assessment. Mentors only reach assessments of a
    /// classroom they mentor.
    pub async fn ensure_staff_access(
        &self,
        staff_id: i64,
        is_admin: bool,
        assessment_id: i64,
    ) -> Result<(), AppError> {
        let assessment = self.require_assessment(assessment_id).await?;
        if is_admin {
            return Ok(());
        }

        let classrooms = self.store.mentor_classrooms(staff_id).await?;
        if classrooms.iter().any(|c| assessment.classroom_ids.contains(c)) {
            Ok(())
        } else {
            tracing::info!(staff_id, assessment_id, "Mentor outside the assessment's classrooms");
            Err(AppError::Forbidden(
                "You do not mentor a classroom of this assessment".to_string(),
            ))
        }
    }

    pub async fn learner_classrooms(&self, learner_id: i64) -> Result<Vec<i64>, AppError> {
        self.store.learner_classrooms(learner_id).await
    }

    /// One page of the leaderboard for `scope`, plus the requester's own position.
    pub async fn ranking(
        &self,
        scope: RankingScope,
        page: u32,
        page_size: u32,
        requesting_learner: i64,
    ) -> Result<RankingPage, AppError> {
        let classroom_ids = match scope {
            RankingScope::Classroom(id) => vec![id],
            RankingScope::LearnerClassrooms(learner_id) => {
                self.store.learner_classrooms(learner_id).await?
            }
        };

        let rows = if classroom_ids.is_empty() {
            Vec::new()
        } else {
            self.store.xp_rows(&classroom_ids).await?
        };

        let page_size = page_size.clamp(1, self.config.max_page_size);
        let ranked = ranking::rank(rows, self.config.xp_policy);
        Ok(ranking::paginate(ranked, page, page_size, requesting_learner))
    }

    pub async fn goal_progress(
        &self,
        learner_id: i64,
        goal_id: i64,
        now: DateTime<Utc>,
    ) -> Result<GoalProgress, AppError> {
        let goal = self
            .store
            .goal(goal_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Goal {} not found", goal_id)))?;
        let attempts = self.store.list_attempts(AttemptFilter::learner(learner_id)).await?;
        let assessments = self.assessments_for(&attempts).await?;

        Ok(goals::goal_progress(&goal, &attempts, &assessments, now))
    }
}
