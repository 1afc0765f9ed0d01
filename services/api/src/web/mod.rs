pub mod admin;
pub mod auth;
pub mod courses;
pub mod error;
pub mod learner;
pub mod middleware;
pub mod projects;
pub mod rest;
pub mod state;
pub mod views;

use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use middleware::require_auth;
use rest::ApiDoc;
use state::AppState;

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);
    match origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            warn!(origin, "Ignoring unparsable CORS origin");
            layer
        }
    }
}

/// Builds the complete application: public auth routes, session-protected
/// API routes and the Swagger UI.
pub fn router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(rest::health_handler))
        .route("/auth/register/learner", post(auth::register_learner_handler))
        .route("/auth/register/admin", post(auth::register_admin_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route(
            "/auth/profile",
            get(auth::profile_handler).put(auth::update_profile_handler),
        )
        .route(
            "/courses",
            get(courses::list_courses_handler).post(courses::create_course_handler),
        )
        .route("/courses/mine", get(courses::my_courses_handler))
        .route(
            "/courses/{id}",
            get(courses::course_details_handler)
                .put(courses::update_course_handler)
                .delete(courses::delete_course_handler),
        )
        .route("/courses/{id}/delete-impact", get(courses::course_impact_handler))
        .route("/courses/{id}/recount", post(courses::recount_handler))
        .route("/courses/{id}/join", post(courses::join_course_handler))
        .route("/courses/{id}/leave", post(courses::leave_course_handler))
        .route("/courses/{id}/enrollment", get(courses::enrollment_status_handler))
        .route(
            "/projects",
            get(projects::list_projects_handler).post(projects::create_project_handler),
        )
        .route(
            "/projects/{id}",
            get(projects::project_details_handler)
                .put(projects::update_project_handler)
                .delete(projects::delete_project_handler),
        )
        .route("/projects/{id}/delete-impact", get(projects::project_impact_handler))
        .route("/projects/{id}/start", post(projects::start_project_handler))
        .route("/learner/dashboard", get(learner::dashboard_handler))
        .route("/learner/progress", get(learner::progress_handler))
        .route("/admin/users/{id}/promote", post(admin::promote_handler))
        .route("/admin/users/{id}/active", put(admin::account_status_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors_layer(&state.config.cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Merge the API router with the Swagger UI router for a complete application.
    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
