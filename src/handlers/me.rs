// src/handlers/me.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    engine::Ledger,
    error::AppError,
    models::{
        attempt::{AttemptFilter, AttemptListParams},
        stats::ProgressRequest,
    },
    utils::jwt::Claims,
};

/// List the current learner's attempts, oldest first.
/// Optionally narrowed to one assessment.
pub async fn list_my_attempts(
    State(ledger): State<Ledger>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<AttemptListParams>,
) -> Result<impl IntoResponse, AppError> {
    let learner_id = claims.user_id()?;
    let filter = match params.assessment_id {
        Some(assessment_id) => AttemptFilter::learner_assessment(learner_id, assessment_id),
        None => AttemptFilter::learner(learner_id),
    };

    Ok(Json(ledger.list_attempts(filter).await?))
}

/// Completion count, average score and average duration of the current learner.
pub async fn get_my_stats(
    State(ledger): State<Ledger>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let learner_id = claims.user_id()?;
    Ok(Json(ledger.learner_stats(learner_id).await?))
}

/// Percentage of the posted assessment set the learner has attempted.
pub async fn get_my_progress(
    State(ledger): State<Ledger>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let learner_id = claims.user_id()?;
    let progress = ledger.progress(learner_id, &req.assessment_set()).await?;

    Ok(Json(progress))
}

pub async fn get_goal_progress(
    State(ledger): State<Ledger>,
    Extension(claims): Extension<Claims>,
    Path(goal_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let learner_id = claims.user_id()?;
    let progress = ledger.goal_progress(learner_id, goal_id, Utc::now()).await?;

    Ok(Json(progress))
}
