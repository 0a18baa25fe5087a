// src/handlers/ranking.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    engine::{Ledger, ranking::RankingScope},
    error::AppError,
    models::ranking::RankingParams,
    utils::jwt::Claims,
};

const DEFAULT_PAGE_SIZE: u32 = 20;

/// Classroom leaderboard.
///
/// With `classroom_id`, ranks that classroom (students must belong to it).
/// Without it, ranks across every classroom the caller belongs to.
/// The caller's own position is returned even when it is off the page.
pub async fn get_ranking(
    State(ledger): State<Ledger>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<RankingParams>,
) -> Result<impl IntoResponse, AppError> {
    params.validate()?;
    let learner_id = claims.user_id()?;

    let scope = match params.classroom_id {
        Some(classroom_id) => {
            if !claims.is_staff() {
                let classrooms = ledger.learner_classrooms(learner_id).await?;
                if !classrooms.contains(&classroom_id) {
                    return Err(AppError::Forbidden(
                        "You are not a member of this classroom".to_string(),
                    ));
                }
            }
            RankingScope::Classroom(classroom_id)
        }
        None => RankingScope::LearnerClassrooms(learner_id),
    };

    let page = ledger
        .ranking(
            scope,
            params.page.unwrap_or(1),
            params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            learner_id,
        )
        .await?;

    Ok(Json(page))
}
