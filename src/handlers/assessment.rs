// src/handlers/assessment.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    engine::Ledger,
    error::AppError,
    models::attempt::{AttemptFilter, AttemptPayload, SubmitAttemptRequest},
    utils::{html::clean_html, jwt::Claims},
};

/// Availability of an assessment for the current learner.
///
/// Returns the temporal state, attempts used/allowed and whether a new
/// attempt may start (with the refusal reason if not).
pub async fn get_status(
    State(ledger): State<Ledger>,
    Extension(claims): Extension<Claims>,
    Path(assessment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let learner_id = claims.user_id()?;
    let status = ledger
        .assessment_status(learner_id, assessment_id, Utc::now())
        .await?;

    Ok(Json(status))
}

/// Submits a new attempt.
///
/// * Mock exams are graded against the answer key on write.
/// * Essay text is sanitized and checked against the minimum word count.
/// * The attempt gate is re-checked here; a refusal returns 403 with its reason.
pub async fn submit_attempt(
    State(ledger): State<Ledger>,
    Extension(claims): Extension<Claims>,
    Path(assessment_id): Path<i64>,
    Json(req): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let learner_id = claims.user_id()?;

    let mut submission = req.into_submission();
    if let AttemptPayload::Essay { text } = &mut submission.payload {
        *text = clean_html(text);
    }

    let attempt = ledger
        .record_attempt(learner_id, assessment_id, submission, Utc::now())
        .await?;

    Ok((StatusCode::CREATED, Json(attempt)))
}

/// Lists every attempt made on an assessment.
/// Admins, or mentors of one of the assessment's classrooms.
pub async fn list_assessment_attempts(
    State(ledger): State<Ledger>,
    Extension(claims): Extension<Claims>,
    Path(assessment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    ledger
        .ensure_staff_access(claims.user_id()?, claims.is_admin(), assessment_id)
        .await?;

    let attempts = ledger
        .list_attempts(AttemptFilter::assessment(assessment_id))
        .await?;

    Ok(Json(attempts))
}
