//! services/api/src/web/projects.rs
//!
//! Project catalog endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use learning_core::{NewProject, Principal, ProjectChanges, RecountOutcome};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::web::error::{ErrorBody, HttpResult};
use crate::web::state::AppState;
use crate::web::views::{ProjectImpactView, ProjectStartView, ProjectView};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProjectQuery {
    /// Only list projects of this course.
    pub course_id: Option<Uuid>,
}

/// GET /projects - Projects in course order
#[utoipa::path(
    get,
    path = "/projects",
    params(ProjectQuery),
    responses(
        (status = 200, description = "Visible projects", body = [ProjectView]),
        (status = 401, description = "Not logged in", body = ErrorBody)
    ),
    tag = "projects"
)]
pub async fn list_projects_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ProjectQuery>,
) -> HttpResult<Json<Vec<ProjectView>>> {
    let projects = state
        .projects
        .list_projects(&principal, query.course_id)
        .await?;
    Ok(Json(projects.into_iter().map(ProjectView::from).collect()))
}

/// POST /projects - Create a project inside a course
#[utoipa::path(
    post,
    path = "/projects",
    request_body = NewProject,
    responses(
        (status = 201, description = "Project created", body = ProjectView),
        (status = 400, description = "Invalid fields", body = ErrorBody),
        (status = 404, description = "No such active course", body = ErrorBody),
        (status = 409, description = "Title already used in this course", body = ErrorBody)
    ),
    tag = "projects"
)]
pub async fn create_project_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(input): Json<NewProject>,
) -> HttpResult<impl IntoResponse> {
    let project = state.projects.create_project(&principal, &input).await?;
    Ok((StatusCode::CREATED, Json(ProjectView::from(project))))
}

/// GET /projects/{id} - A single project
#[utoipa::path(
    get,
    path = "/projects/{id}",
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project", body = ProjectView),
        (status = 403, description = "Private course", body = ErrorBody),
        (status = 404, description = "No such project", body = ErrorBody)
    ),
    tag = "projects"
)]
pub async fn project_details_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<Uuid>,
) -> HttpResult<Json<ProjectView>> {
    let project = state.projects.project_details(&principal, project_id).await?;
    Ok(Json(project.into()))
}

/// PUT /projects/{id} - Partially update a project
#[utoipa::path(
    put,
    path = "/projects/{id}",
    params(("id" = Uuid, Path, description = "Project id")),
    request_body = ProjectChanges,
    responses(
        (status = 200, description = "Project updated", body = ProjectView),
        (status = 404, description = "No such project", body = ErrorBody),
        (status = 409, description = "Title already used in this course", body = ErrorBody)
    ),
    tag = "projects"
)]
pub async fn update_project_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<Uuid>,
    Json(changes): Json<ProjectChanges>,
) -> HttpResult<Json<ProjectView>> {
    let project = state
        .projects
        .update_project(&principal, project_id, &changes)
        .await?;
    Ok(Json(project.into()))
}

/// DELETE /projects/{id} - Delete a project and recount its course
#[utoipa::path(
    delete,
    path = "/projects/{id}",
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project deleted", body = RecountOutcome),
        (status = 404, description = "No such project", body = ErrorBody)
    ),
    tag = "projects"
)]
pub async fn delete_project_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<Uuid>,
) -> HttpResult<Json<RecountOutcome>> {
    let outcome = state.projects.delete_project(&principal, project_id).await?;
    Ok(Json(outcome))
}

/// GET /projects/{id}/delete-impact - What deleting the project would affect
#[utoipa::path(
    get,
    path = "/projects/{id}/delete-impact",
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Deletion preview", body = ProjectImpactView),
        (status = 404, description = "No such project", body = ErrorBody)
    ),
    tag = "projects"
)]
pub async fn project_impact_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<Uuid>,
) -> HttpResult<Json<ProjectImpactView>> {
    let impact = state
        .projects
        .project_deletion_impact(&principal, project_id)
        .await?;
    Ok(Json(impact.into()))
}

/// POST /projects/{id}/start - Begin a project of an enrolled course
#[utoipa::path(
    post,
    path = "/projects/{id}/start",
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project started", body = ProjectStartView),
        (status = 400, description = "Not enrolled in the course", body = ErrorBody),
        (status = 403, description = "Caller is not a learner", body = ErrorBody)
    ),
    tag = "projects"
)]
pub async fn start_project_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<Uuid>,
) -> HttpResult<Json<ProjectStartView>> {
    let start = state.projects.start_project(&principal, project_id).await?;
    Ok(Json(start.into()))
}
