// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, assessment, correction, me, ranking},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, mentor_middleware},
};

/// Assembles the main application router.
///
/// * Learner routes live directly under `/api`, mentor routes under
///   `/api/mentor`, admin routes under `/api/admin`.
/// * Every route requires a valid token; role checks stack on top.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let learner_routes = Router::new()
        .route("/api/assessments/{id}/status", get(assessment::get_status))
        .route("/api/assessments/{id}/attempts", post(assessment::submit_attempt))
        .route("/api/attempts/{id}/correction", get(correction::get_correction))
        .route("/api/me/attempts", get(me::list_my_attempts))
        .route("/api/me/stats", get(me::get_my_stats))
        .route("/api/me/progress", post(me::get_my_progress))
        .route("/api/me/goals/{id}", get(me::get_goal_progress))
        .route("/api/ranking", get(ranking::get_ranking))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let mentor_routes = Router::new()
        .route(
            "/assessments/{id}/attempts",
            get(assessment::list_assessment_attempts),
        )
        .route(
            "/attempts/{id}/correction",
            post(correction::attach_correction).put(correction::update_correction),
        )
        // Auth first, then role check
        .layer(middleware::from_fn(mentor_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route("/attempts/{id}", delete(admin::delete_attempt))
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(learner_routes)
        .nest("/api/mentor", mentor_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
