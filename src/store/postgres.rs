// src/store/postgres.rs

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::Json};

use crate::{
    engine::scorer::CompetencyScores,
    error::AppError,
    models::{
        assessment::Assessment,
        attempt::{Attempt, AttemptFilter, AttemptSlots, InsertOutcome, NewAttempt},
        correction::{Correction, NewCorrection},
        goal::Goal,
        ranking::XpRow,
    },
    store::Store,
};

const ASSESSMENT_COLUMNS: &str = "id, kind, title, classroom_ids, opening_date, closing_date, \
     question_ids, min_words, allowed_attempts";

const ATTEMPT_COLUMNS: &str = "id, learner_id, assessment_id, kind, attempt_number, answers, \
     essay_text, correct_count, duration_seconds, created_at";

const CORRECTION_COLUMNS: &str = "id, attempt_id, mentor_id, competency_scores, comments, \
     achievements, created_at, updated_at";

/// Row of the 'assessments' table.
#[derive(Debug, FromRow)]
struct AssessmentRow {
    id: i64,
    kind: String,
    title: String,
    classroom_ids: Vec<i64>,
    opening_date: DateTime<Utc>,
    closing_date: DateTime<Utc>,
    question_ids: Vec<i64>,
    min_words: Option<i32>,
    allowed_attempts: Option<i32>,
}

impl TryFrom<AssessmentRow> for Assessment {
    type Error = AppError;

    fn try_from(row: AssessmentRow) -> Result<Self, Self::Error> {
        Ok(Assessment {
            id: row.id,
            kind: row.kind.parse().map_err(AppError::InternalServerError)?,
            title: row.title,
            classroom_ids: row.classroom_ids.into_iter().collect(),
            opening_date: row.opening_date,
            closing_date: row.closing_date,
            question_ids: row.question_ids.into_iter().collect(),
            min_words: row.min_words,
            allowed_attempts: row.allowed_attempts,
        })
    }
}

/// Row of the 'attempts' table.
#[derive(Debug, FromRow)]
struct AttemptRow {
    id: i64,
    learner_id: i64,
    assessment_id: i64,
    kind: String,
    attempt_number: i32,
    answers: Option<Json<BTreeMap<i64, String>>>,
    essay_text: Option<String>,
    correct_count: Option<i32>,
    duration_seconds: Option<i32>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AttemptRow> for Attempt {
    type Error = AppError;

    fn try_from(row: AttemptRow) -> Result<Self, Self::Error> {
        Ok(Attempt {
            id: row.id,
            learner_id: row.learner_id,
            assessment_id: row.assessment_id,
            kind: row.kind.parse().map_err(AppError::InternalServerError)?,
            attempt_number: row.attempt_number,
            answers: row.answers.map(|Json(a)| a).unwrap_or_default(),
            essay_text: row.essay_text,
            correct_count: row.correct_count,
            duration_seconds: row.duration_seconds,
            created_at: row.created_at,
        })
    }
}

/// Row of the 'corrections' table.
#[derive(Debug, FromRow)]
struct CorrectionRow {
    id: i64,
    attempt_id: i64,
    mentor_id: i64,
    competency_scores: Vec<i32>,
    comments: Vec<String>,
    achievements: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CorrectionRow> for Correction {
    type Error = AppError;

    fn try_from(row: CorrectionRow) -> Result<Self, Self::Error> {
        let competency_scores = CompetencyScores::try_from(row.competency_scores).map_err(|e| {
            AppError::InternalServerError(format!("correction {}: {}", row.id, e))
        })?;
        Ok(Correction {
            id: row.id,
            attempt_id: row.attempt_id,
            mentor_id: row.mentor_id,
            competency_scores,
            comments: row.comments,
            achievements: row.achievements.into_iter().collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Row of the 'goals' table.
#[derive(Debug, FromRow)]
struct GoalRow {
    id: i64,
    target: i32,
    goal_type: String,
    classroom_ids: Vec<i64>,
    opening_date: DateTime<Utc>,
    final_date: DateTime<Utc>,
}

impl TryFrom<GoalRow> for Goal {
    type Error = AppError;

    fn try_from(row: GoalRow) -> Result<Self, Self::Error> {
        Ok(Goal {
            id: row.id,
            target: row.target,
            goal_type: row.goal_type.parse().map_err(AppError::InternalServerError)?,
            classroom_ids: row.classroom_ids.into_iter().collect(),
            opening_date: row.opening_date,
            final_date: row.final_date,
        })
    }
}

#[derive(Debug, FromRow)]
struct XpRecord {
    learner_id: i64,
    classroom_id: i64,
    xp: i64,
    first_event_at: Option<DateTime<Utc>>,
}

/// [`Store`] backed by Postgres. Uniqueness constraints in the schema
/// make the conditional inserts safe across processes.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn assessment(&self, id: i64) -> Result<Option<Assessment>, AppError> {
        let sql = format!("SELECT {} FROM assessments WHERE id = $1", ASSESSMENT_COLUMNS);
        sqlx::query_as::<_, AssessmentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Assessment::try_from)
            .transpose()
    }

    async fn assessments(&self, ids: &[i64]) -> Result<Vec<Assessment>, AppError> {
        let sql = format!(
            "SELECT {} FROM assessments WHERE id = ANY($1) ORDER BY id",
            ASSESSMENT_COLUMNS
        );
        sqlx::query_as::<_, AssessmentRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Assessment::try_from)
            .collect()
    }

    async fn answer_key(&self, question_ids: &[i64]) -> Result<HashMap<i64, String>, AppError> {
        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, answer FROM questions WHERE id = ANY($1)")
                .bind(question_ids)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to fetch answer key: {:?}", e);
                    AppError::InternalServerError(e.to_string())
                })?;

        Ok(rows.into_iter().collect())
    }

    async fn attempt_slots(
        &self,
        learner_id: i64,
        assessment_id: i64,
    ) -> Result<AttemptSlots, AppError> {
        let (count, last_number): (i64, i32) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(MAX(attempt_number), 0)
            FROM attempts
            WHERE learner_id = $1 AND assessment_id = $2
            "#,
        )
        .bind(learner_id)
        .bind(assessment_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(AttemptSlots { count, last_number })
    }

    async fn attempt(&self, id: i64) -> Result<Option<Attempt>, AppError> {
        let sql = format!("SELECT {} FROM attempts WHERE id = $1", ATTEMPT_COLUMNS);
        sqlx::query_as::<_, AttemptRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Attempt::try_from)
            .transpose()
    }

    async fn list_attempts(&self, filter: AttemptFilter) -> Result<Vec<Attempt>, AppError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM attempts
            WHERE ($1::BIGINT IS NULL OR learner_id = $1)
              AND ($2::BIGINT IS NULL OR assessment_id = $2)
            ORDER BY created_at ASC, id ASC
            "#,
            ATTEMPT_COLUMNS
        );
        sqlx::query_as::<_, AttemptRow>(&sql)
            .bind(filter.learner_id)
            .bind(filter.assessment_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list attempts: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?
            .into_iter()
            .map(Attempt::try_from)
            .collect()
    }

    async fn insert_attempt(&self, new: NewAttempt) -> Result<InsertOutcome, AppError> {
        let answers = (!new.answers.is_empty()).then(|| Json(new.answers));
        let sql = format!(
            r#"
            INSERT INTO attempts
                (learner_id, assessment_id, kind, attempt_number, answers,
                 essay_text, correct_count, duration_seconds, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (learner_id, assessment_id, attempt_number) DO NOTHING
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        );

        let row = sqlx::query_as::<_, AttemptRow>(&sql)
            .bind(new.learner_id)
            .bind(new.assessment_id)
            .bind(new.kind.as_str())
            .bind(new.attempt_number)
            .bind(answers)
            .bind(new.essay_text)
            .bind(new.correct_count)
            .bind(new.duration_seconds)
            .bind(new.created_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert attempt: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;

        match row {
            Some(row) => Ok(InsertOutcome::Inserted(row.try_into()?)),
            None => Ok(InsertOutcome::SlotTaken),
        }
    }

    async fn delete_attempt(&self, id: i64) -> Result<bool, AppError> {
        // corrections cascade
        let result = sqlx::query("DELETE FROM attempts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn corrections(&self, attempt_ids: &[i64]) -> Result<Vec<Correction>, AppError> {
        let sql = format!(
            "SELECT {} FROM corrections WHERE attempt_id = ANY($1)",
            CORRECTION_COLUMNS
        );
        sqlx::query_as::<_, CorrectionRow>(&sql)
            .bind(attempt_ids)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Correction::try_from)
            .collect()
    }

    async fn insert_correction(&self, new: NewCorrection) -> Result<Option<Correction>, AppError> {
        let sql = format!(
            r#"
            INSERT INTO corrections
                (attempt_id, mentor_id, competency_scores, comments, achievements, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (attempt_id) DO NOTHING
            RETURNING {}
            "#,
            CORRECTION_COLUMNS
        );

        let row = sqlx::query_as::<_, CorrectionRow>(&sql)
            .bind(new.attempt_id)
            .bind(new.mentor_id)
            .bind(new.competency_scores.values().to_vec())
            .bind(new.comments)
            .bind(new.achievements.into_iter().collect::<Vec<_>>())
            .bind(new.at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.code().as_deref() == Some("23503") => {
                    AppError::NotFound(format!("Attempt {} not found", new.attempt_id))
                }
                e => {
                    tracing::error!("Failed to insert correction: {:?}", e);
                    AppError::InternalServerError(e.to_string())
                }
            })?;

        row.map(Correction::try_from).transpose()
    }

    async fn replace_correction(&self, new: NewCorrection) -> Result<Option<Correction>, AppError> {
        let sql = format!(
            r#"
            UPDATE corrections
            SET mentor_id = $2, competency_scores = $3, comments = $4,
                achievements = $5, updated_at = $6
            WHERE attempt_id = $1
            RETURNING {}
            "#,
            CORRECTION_COLUMNS
        );

        sqlx::query_as::<_, CorrectionRow>(&sql)
            .bind(new.attempt_id)
            .bind(new.mentor_id)
            .bind(new.competency_scores.values().to_vec())
            .bind(new.comments)
            .bind(new.achievements.into_iter().collect::<Vec<_>>())
            .bind(new.at)
            .fetch_optional(&self.pool)
            .await?
            .map(Correction::try_from)
            .transpose()
    }

    async fn goal(&self, id: i64) -> Result<Option<Goal>, AppError> {
        sqlx::query_as::<_, GoalRow>(
            r#"
            SELECT id, target, goal_type, classroom_ids, opening_date, final_date
            FROM goals
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Goal::try_from)
        .transpose()
    }

    async fn learner_classrooms(&self, learner_id: i64) -> Result<Vec<i64>, AppError> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT classroom_id FROM classroom_members WHERE learner_id = $1 ORDER BY classroom_id",
        )
        .bind(learner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn mentor_classrooms(&self, mentor_id: i64) -> Result<Vec<i64>, AppError> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT classroom_id FROM classroom_mentors WHERE mentor_id = $1 ORDER BY classroom_id",
        )
        .bind(mentor_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn xp_rows(&self, classroom_ids: &[i64]) -> Result<Vec<XpRow>, AppError> {
        // Members without XP still show up, with zero points.
        let records = sqlx::query_as::<_, XpRecord>(
            r#"
            SELECT
                m.learner_id,
                m.classroom_id,
                COALESCE(x.xp, 0) AS xp,
                x.first_event_at
            FROM classroom_members m
            LEFT JOIN learner_xp x
                ON x.learner_id = m.learner_id AND x.classroom_id = m.classroom_id
            WHERE m.classroom_id = ANY($1)
            "#,
        )
        .bind(classroom_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch XP rows: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(records
            .into_iter()
            .map(|r| XpRow {
                learner_id: r.learner_id,
                classroom_id: r.classroom_id,
                xp: r.xp,
                first_event_at: r.first_event_at,
            })
            .collect())
    }
}
