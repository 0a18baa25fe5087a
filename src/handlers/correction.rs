// src/handlers/correction.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    engine::{Ledger, scorer::CompetencyScores},
    error::AppError,
    models::correction::{CorrectionRequest, CorrectionResponse, NewCorrection},
    utils::{html::clean_all, jwt::Claims},
};

fn build_correction(
    attempt_id: i64,
    claims: &Claims,
    req: CorrectionRequest,
) -> Result<NewCorrection, AppError> {
    req.validate()?;
    let competency_scores = CompetencyScores::try_from(req.competency_scores)?;

    Ok(NewCorrection {
        attempt_id,
        mentor_id: claims.user_id()?,
        competency_scores,
        comments: clean_all(&req.comments),
        achievements: req.achievements.into_iter().collect(),
        at: Utc::now(),
    })
}

/// The caller must be an admin or mentor a classroom of the attempt's assessment.
async fn ensure_grader(ledger: &Ledger, claims: &Claims, attempt_id: i64) -> Result<(), AppError> {
    let attempt = ledger.attempt(attempt_id).await?;
    ledger
        .ensure_staff_access(claims.user_id()?, claims.is_admin(), attempt.assessment_id)
        .await
}

/// Attaches the correction of an essay attempt.
/// Admins, or mentors of the assessment's classrooms.
/// A second correction returns 409; use PUT to replace.
pub async fn attach_correction(
    State(ledger): State<Ledger>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
    Json(req): Json<CorrectionRequest>,
) -> Result<impl IntoResponse, AppError> {
    ensure_grader(&ledger, &claims, attempt_id).await?;
    let new = build_correction(attempt_id, &claims, req)?;
    let correction = ledger.attach_correction(new).await?;

    Ok((StatusCode::CREATED, Json(CorrectionResponse::from(correction))))
}

/// Replaces every field of an existing correction.
/// Same access rule as attaching.
pub async fn update_correction(
    State(ledger): State<Ledger>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
    Json(req): Json<CorrectionRequest>,
) -> Result<impl IntoResponse, AppError> {
    ensure_grader(&ledger, &claims, attempt_id).await?;
    let new = build_correction(attempt_id, &claims, req)?;
    let correction = ledger.update_correction(new).await?;

    Ok(Json(CorrectionResponse::from(correction)))
}

/// Reads the correction of an attempt. Visible to its author and to staff of its classrooms.
pub async fn get_correction(
    State(ledger): State<Ledger>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = ledger.attempt(attempt_id).await?;
    if attempt.learner_id != claims.user_id()? {
        if !claims.is_staff() {
            return Err(AppError::Forbidden(
                "You can only view your own corrections".to_string(),
            ));
        }
        ledger
            .ensure_staff_access(claims.user_id()?, claims.is_admin(), attempt.assessment_id)
            .await?;
    }

    let correction = ledger
        .correction(attempt_id)
        .await?
        .ok_or(AppError::NotFound("Attempt is not corrected yet".to_string()))?;

    Ok(Json(CorrectionResponse::from(correction)))
}
