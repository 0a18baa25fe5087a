// src/store/mod.rs

pub mod memory;
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        assessment::Assessment,
        attempt::{Attempt, AttemptFilter, AttemptSlots, InsertOutcome, NewAttempt},
        correction::{Correction, NewCorrection},
        goal::Goal,
        ranking::XpRow,
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Persistence seam of the engine. Every call is a store round-trip.
///
/// Writes are conditional: `insert_attempt` must refuse a second row with the
/// same `(learner_id, assessment_id, attempt_number)`, and `insert_correction`
/// a second correction for the same attempt. Nothing else needs locking.
#[async_trait]
pub trait Store: Send + Sync {
    async fn assessment(&self, id: i64) -> Result<Option<Assessment>, AppError>;

    async fn assessments(&self, ids: &[i64]) -> Result<Vec<Assessment>, AppError>;

    /// Correct answer per question id. Unknown ids are simply absent.
    async fn answer_key(&self, question_ids: &[i64]) -> Result<HashMap<i64, String>, AppError>;

    async fn attempt_slots(&self, learner_id: i64, assessment_id: i64)
    -> Result<AttemptSlots, AppError>;

    async fn attempt(&self, id: i64) -> Result<Option<Attempt>, AppError>;

    /// Ordered by `created_at` ascending, then id.
    async fn list_attempts(&self, filter: AttemptFilter) -> Result<Vec<Attempt>, AppError>;

    async fn insert_attempt(&self, new: NewAttempt) -> Result<InsertOutcome, AppError>;

    /// Removes an attempt and its correction. Returns false if it did not exist.
    async fn delete_attempt(&self, id: i64) -> Result<bool, AppError>;

    async fn corrections(&self, attempt_ids: &[i64]) -> Result<Vec<Correction>, AppError>;

    /// `None` when the attempt already has a correction.
    async fn insert_correction(&self, new: NewCorrection) -> Result<Option<Correction>, AppError>;

    /// `None` when there is no correction to replace.
    async fn replace_correction(&self, new: NewCorrection) -> Result<Option<Correction>, AppError>;

    async fn goal(&self, id: i64) -> Result<Option<Goal>, AppError>;

    async fn learner_classrooms(&self, learner_id: i64) -> Result<Vec<i64>, AppError>;

    async fn mentor_classrooms(&self, mentor_id: i64) -> Result<Vec<i64>, AppError>;

    async fn xp_rows(&self, classroom_ids: &[i64]) -> Result<Vec<XpRow>, AppError>;
}
