//! services/api/src/web/learner.rs
//!
//! Learner dashboard endpoints.

use axum::{extract::State, Extension, Json};
use learning_core::dashboard::{Dashboard, LearningProgress};
use learning_core::Principal;
use std::sync::Arc;

use crate::web::error::{ErrorBody, HttpResult};
use crate::web::state::AppState;

/// GET /learner/dashboard - Summary statistics and course cards
#[utoipa::path(
    get,
    path = "/learner/dashboard",
    responses(
        (status = 200, description = "Dashboard of the calling learner", body = Dashboard),
        (status = 403, description = "Caller is not a learner", body = ErrorBody)
    ),
    tag = "learner"
)]
pub async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> HttpResult<Json<Dashboard>> {
    Ok(Json(state.accounts.learner_dashboard(&principal).await?))
}

/// GET /learner/progress - Per-course progress and trend
#[utoipa::path(
    get,
    path = "/learner/progress",
    responses(
        (status = 200, description = "Learning progress", body = LearningProgress),
        (status = 403, description = "Caller is not a learner", body = ErrorBody)
    ),
    tag = "learner"
)]
pub async fn progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> HttpResult<Json<LearningProgress>> {
    Ok(Json(state.accounts.learner_progress(&principal).await?))
}
