//! services/api/src/web/courses.rs
//!
//! Course catalog and enrollment endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use learning_core::{CourseChanges, NewCourse, Principal, RecountOutcome};
use std::sync::Arc;
use uuid::Uuid;

use crate::web::error::{ErrorBody, HttpResult};
use crate::web::state::AppState;
use crate::web::views::{CourseDetailsView, CourseImpactView, CourseView, EnrollmentView};

/// GET /courses - Active courses, newest first
#[utoipa::path(
    get,
    path = "/courses",
    responses(
        (status = 200, description = "Visible active courses", body = [CourseView]),
        (status = 401, description = "Not logged in", body = ErrorBody)
    ),
    tag = "courses"
)]
pub async fn list_courses_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> HttpResult<Json<Vec<CourseView>>> {
    let courses = state.courses.list_courses(&principal).await?;
    Ok(Json(courses.into_iter().map(CourseView::from).collect()))
}

/// POST /courses - Create a course
#[utoipa::path(
    post,
    path = "/courses",
    request_body = NewCourse,
    responses(
        (status = 201, description = "Course created", body = CourseView),
        (status = 400, description = "Invalid fields", body = ErrorBody),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
        (status = 409, description = "An active course already uses this title", body = ErrorBody)
    ),
    tag = "courses"
)]
pub async fn create_course_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(input): Json<NewCourse>,
) -> HttpResult<impl IntoResponse> {
    let course = state.courses.create_course(&principal, &input).await?;
    Ok((StatusCode::CREATED, Json(CourseView::from(course))))
}

/// GET /courses/mine - Active courses the learner is enrolled in
#[utoipa::path(
    get,
    path = "/courses/mine",
    responses(
        (status = 200, description = "Enrolled courses", body = [CourseView]),
        (status = 403, description = "Caller is not a learner", body = ErrorBody)
    ),
    tag = "courses"
)]
pub async fn my_courses_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> HttpResult<Json<Vec<CourseView>>> {
    let courses = state.enrollment.my_courses(&principal).await?;
    Ok(Json(courses.into_iter().map(CourseView::from).collect()))
}

/// GET /courses/{id} - Course with its projects and enrollment state
#[utoipa::path(
    get,
    path = "/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course details", body = CourseDetailsView),
        (status = 403, description = "Private course", body = ErrorBody),
        (status = 404, description = "No such active course", body = ErrorBody)
    ),
    tag = "courses"
)]
pub async fn course_details_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(course_id): Path<Uuid>,
) -> HttpResult<Json<CourseDetailsView>> {
    let details = state.courses.course_details(&principal, course_id).await?;
    Ok(Json(details.into()))
}

/// PUT /courses/{id} - Partially update a course
#[utoipa::path(
    put,
    path = "/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    request_body = CourseChanges,
    responses(
        (status = 200, description = "Course updated", body = CourseView),
        (status = 404, description = "No such course", body = ErrorBody),
        (status = 409, description = "An active course already uses this title", body = ErrorBody)
    ),
    tag = "courses"
)]
pub async fn update_course_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(course_id): Path<Uuid>,
    Json(changes): Json<CourseChanges>,
) -> HttpResult<Json<CourseView>> {
    let course = state
        .courses
        .update_course(&principal, course_id, &changes)
        .await?;
    Ok(Json(course.into()))
}

/// DELETE /courses/{id} - Soft-delete a course
#[utoipa::path(
    delete,
    path = "/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course deactivated", body = CourseView),
        (status = 404, description = "No such course", body = ErrorBody)
    ),
    tag = "courses"
)]
pub async fn delete_course_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(course_id): Path<Uuid>,
) -> HttpResult<Json<CourseView>> {
    let course = state.courses.soft_delete_course(&principal, course_id).await?;
    Ok(Json(course.into()))
}

/// GET /courses/{id}/delete-impact - What a soft delete would affect
#[utoipa::path(
    get,
    path = "/courses/{id}/delete-impact",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Deletion preview", body = CourseImpactView),
        (status = 404, description = "No such course", body = ErrorBody)
    ),
    tag = "courses"
)]
pub async fn course_impact_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(course_id): Path<Uuid>,
) -> HttpResult<Json<CourseImpactView>> {
    let impact = state
        .courses
        .course_deletion_impact(&principal, course_id)
        .await?;
    Ok(Json(impact.into()))
}

/// POST /courses/{id}/recount - Recompute the cached project count
#[utoipa::path(
    post,
    path = "/courses/{id}/recount",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Recount result", body = RecountOutcome),
        (status = 404, description = "No such course", body = ErrorBody)
    ),
    tag = "courses"
)]
pub async fn recount_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(course_id): Path<Uuid>,
) -> HttpResult<Json<RecountOutcome>> {
    let outcome = state
        .courses
        .recompute_projects_count(&principal, course_id)
        .await?;
    Ok(Json(outcome))
}

/// POST /courses/{id}/join - Enroll the calling learner
#[utoipa::path(
    post,
    path = "/courses/{id}/join",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 201, description = "Enrolled", body = EnrollmentView),
        (status = 403, description = "Caller is not a learner", body = ErrorBody),
        (status = 409, description = "Already enrolled", body = ErrorBody),
        (status = 422, description = "Course is not active", body = ErrorBody)
    ),
    tag = "enrollment"
)]
pub async fn join_course_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(course_id): Path<Uuid>,
) -> HttpResult<impl IntoResponse> {
    let course = state.enrollment.join_course(&principal, course_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(EnrollmentView {
            course_id: course.id,
            course_title: course.title,
            enrolled: true,
        }),
    ))
}

/// POST /courses/{id}/leave - Unenroll the calling learner
#[utoipa::path(
    post,
    path = "/courses/{id}/leave",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Unenrolled", body = EnrollmentView),
        (status = 400, description = "Not enrolled", body = ErrorBody)
    ),
    tag = "enrollment"
)]
pub async fn leave_course_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(course_id): Path<Uuid>,
) -> HttpResult<Json<EnrollmentView>> {
    let course = state.enrollment.leave_course(&principal, course_id).await?;
    Ok(Json(EnrollmentView {
        course_id: course.id,
        course_title: course.title,
        enrolled: false,
    }))
}

/// GET /courses/{id}/enrollment - Whether the caller is enrolled
#[utoipa::path(
    get,
    path = "/courses/{id}/enrollment",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Enrollment state", body = EnrollmentView),
        (status = 404, description = "No such course", body = ErrorBody)
    ),
    tag = "enrollment"
)]
pub async fn enrollment_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(course_id): Path<Uuid>,
) -> HttpResult<Json<EnrollmentView>> {
    let details = state.courses.course_details(&principal, course_id).await?;
    let enrolled = state.enrollment.is_enrolled(&principal, course_id).await?;
    Ok(Json(EnrollmentView {
        course_id,
        course_title: details.course.title,
        enrolled,
    }))
}
