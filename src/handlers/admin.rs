// src/handlers/admin.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{engine::Ledger, error::AppError};

/// Deletes an attempt and its correction, freeing the learner's slot.
/// Admin only.
pub async fn delete_attempt(
    State(ledger): State<Ledger>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    ledger.delete_attempt(attempt_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
