//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for registration, login, logout and the caller's
//! profile.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use learning_core::{AuthSession, DomainError, Principal, Role};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::Config;
use crate::web::error::{ErrorBody, HttpResult};
use crate::web::middleware::{session_id, SESSION_COOKIE};
use crate::web::state::AppState;
use crate::web::views::AccountView;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ProfileUpdateRequest {
    pub email: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl From<Principal> for AuthResponse {
    fn from(p: Principal) -> Self {
        Self {
            user_id: p.user_id,
            email: p.email,
            role: p.role,
        }
    }
}

//=========================================================================================
// Cookie helpers
//=========================================================================================

fn session_cookie(config: &Config, value: &str, max_age: i64) -> String {
    let secure = if config.cookie_secure { "; Secure" } else { "" };
    format!("{SESSION_COOKIE}={value}; HttpOnly{secure}; SameSite=Lax; Path=/; Max-Age={max_age}")
}

fn login_cookie(config: &Config, session: &AuthSession) -> String {
    session_cookie(config, &session.id, config.session_ttl().num_seconds())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register/learner - Create a learner account and log it in
#[utoipa::path(
    post,
    path = "/auth/register/learner",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Learner registered", body = AuthResponse),
        (status = 400, description = "Invalid email or weak password", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn register_learner_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> HttpResult<impl IntoResponse> {
    let user = state
        .accounts
        .register_learner(&req.email, &req.password, &req.password_confirmation)
        .await?;
    let principal = user.principal();
    let session = state
        .accounts
        .open_session(&principal, state.config.session_ttl())
        .await?;

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, login_cookie(&state.config, &session))],
        Json(AuthResponse::from(principal)),
    ))
}

/// POST /auth/register/admin - Provision an admin account
///
/// Requires an admin session, except while no admin exists yet.
#[utoipa::path(
    post,
    path = "/auth/register/admin",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Admin registered", body = AuthResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn register_admin_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> HttpResult<impl IntoResponse> {
    let caller = match session_id(&headers) {
        Some(id) => state.accounts.resolve_session(id).await.ok(),
        None => None,
    };
    let user = state
        .accounts
        .register_admin(
            caller.as_ref(),
            &req.email,
            &req.password,
            &req.password_confirmation,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(AuthResponse::from(user.principal()))))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials or disabled account", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> HttpResult<impl IntoResponse> {
    let principal = state.accounts.authenticate(&req.email, &req.password).await?;
    let session = state
        .accounts
        .open_session(&principal, state.config.session_ttl())
        .await?;
    info!(user_id = %principal.user_id, "User logged in");

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, login_cookie(&state.config, &session))],
        Json(AuthResponse::from(principal)),
    ))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> HttpResult<impl IntoResponse> {
    let auth_session_id = session_id(&headers).ok_or(DomainError::InvalidCredentials)?;
    state.accounts.close_session(auth_session_id).await?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie(&state.config, "", 0))],
    ))
}

/// GET /auth/profile - The logged-in account
#[utoipa::path(
    get,
    path = "/auth/profile",
    responses(
        (status = 200, description = "Current account", body = AccountView),
        (status = 401, description = "Not logged in", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> HttpResult<Json<AccountView>> {
    let user = state.accounts.profile(&principal).await?;
    Ok(Json(user.into()))
}

/// PUT /auth/profile - Change the logged-in account's email
#[utoipa::path(
    put,
    path = "/auth/profile",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Account updated", body = AccountView),
        (status = 400, description = "Invalid email", body = ErrorBody),
        (status = 401, description = "Not logged in", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<ProfileUpdateRequest>,
) -> HttpResult<Json<AccountView>> {
    let user = state.accounts.update_profile(&principal, &req.email).await?;
    Ok(Json(user.into()))
}
