//! services/api/src/web/admin.rs
//!
//! Account management for admins.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use learning_core::Principal;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::error::{ErrorBody, HttpResult};
use crate::web::state::AppState;
use crate::web::views::AccountView;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AccountStatusRequest {
    pub active: bool,
}

/// POST /admin/users/{id}/promote - Turn a learner into an admin
#[utoipa::path(
    post,
    path = "/admin/users/{id}/promote",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Account is now an admin", body = AccountView),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    ),
    tag = "admin"
)]
pub async fn promote_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<Uuid>,
) -> HttpResult<Json<AccountView>> {
    let user = state.accounts.promote_to_admin(&principal, user_id).await?;
    Ok(Json(user.into()))
}

/// PUT /admin/users/{id}/active - Enable or disable an account
#[utoipa::path(
    put,
    path = "/admin/users/{id}/active",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = AccountStatusRequest,
    responses(
        (status = 200, description = "Account status changed", body = AccountView),
        (status = 400, description = "Admins cannot disable themselves", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    ),
    tag = "admin"
)]
pub async fn account_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<AccountStatusRequest>,
) -> HttpResult<Json<AccountView>> {
    let user = state
        .accounts
        .set_account_active(&principal, user_id, req.active)
        .await?;
    Ok(Json(user.into()))
}
