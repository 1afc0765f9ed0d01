//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification, plus the liveness
//! probe.

use axum::Json;
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::web::{admin, auth, courses, error, learner, projects, views};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::register_learner_handler,
        auth::register_admin_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::profile_handler,
        auth::update_profile_handler,
        courses::list_courses_handler,
        courses::create_course_handler,
        courses::my_courses_handler,
        courses::course_details_handler,
        courses::update_course_handler,
        courses::delete_course_handler,
        courses::course_impact_handler,
        courses::recount_handler,
        courses::join_course_handler,
        courses::leave_course_handler,
        courses::enrollment_status_handler,
        projects::list_projects_handler,
        projects::create_project_handler,
        projects::project_details_handler,
        projects::update_project_handler,
        projects::delete_project_handler,
        projects::project_impact_handler,
        projects::start_project_handler,
        learner::dashboard_handler,
        learner::progress_handler,
        admin::promote_handler,
        admin::account_status_handler,
    ),
    components(
        schemas(
            HealthResponse,
            error::ErrorBody,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::ProfileUpdateRequest,
            auth::AuthResponse,
            admin::AccountStatusRequest,
            views::AccountView,
            views::CourseView,
            views::ProjectView,
            views::CourseDetailsView,
            views::CourseImpactView,
            views::ProjectImpactView,
            views::ProjectStartView,
            views::EnrollmentView,
            learning_core::NewCourse,
            learning_core::CourseChanges,
            learning_core::NewProject,
            learning_core::ProjectChanges,
            learning_core::RecountOutcome,
            learning_core::EnrollmentSummary,
            learning_core::dashboard::Dashboard,
            learning_core::dashboard::LearningProgress,
            learning_core::dashboard::Achievement,
        )
    ),
    tags(
        (name = "auth", description = "Registration, login and sessions."),
        (name = "courses", description = "The course catalog."),
        (name = "projects", description = "Projects inside courses."),
        (name = "enrollment", description = "Joining and leaving courses."),
        (name = "learner", description = "Learner dashboard."),
        (name = "admin", description = "Account management."),
        (name = "system", description = "Service health.")
    )
)]
pub struct ApiDoc;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health - Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "system"
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
