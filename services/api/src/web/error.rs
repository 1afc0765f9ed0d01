//! services/api/src/web/error.rs
//!
//! Renders domain failures as HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use learning_core::DomainError;
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

/// Body of every failed request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub success: bool,
    pub kind: String,
    pub message: String,
}

/// A request-time failure. Wraps the domain error so handlers can use `?`.
#[derive(Debug)]
pub struct HttpError(pub DomainError);

impl From<DomainError> for HttpError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

pub type HttpResult<T> = Result<T, HttpError>;

pub fn status_for(err: &DomainError) -> StatusCode {
    match err {
        DomainError::NotAuthorized(_) => StatusCode::FORBIDDEN,
        DomainError::CourseNotFound(_)
        | DomainError::ProjectNotFound(_)
        | DomainError::UserNotFound(_) => StatusCode::NOT_FOUND,
        DomainError::DuplicateEmail(_)
        | DomainError::DuplicateActiveTitle(_)
        | DomainError::DuplicateTitleInCourse(_)
        | DomainError::AlreadyEnrolled(_) => StatusCode::CONFLICT,
        DomainError::ValidationFailed { .. }
        | DomainError::WeakPassword(_)
        | DomainError::NotEnrolled(_) => StatusCode::BAD_REQUEST,
        DomainError::InvalidCredentials | DomainError::AccountDisabled => {
            StatusCode::UNAUTHORIZED
        }
        DomainError::CourseUnavailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let message = match &self.0 {
            DomainError::Storage(detail) => {
                error!("Storage failure: {}", detail);
                "An internal error occurred".to_string()
            }
            other => {
                warn!(kind = other.kind(), "Rejected request: {}", other);
                other.to_string()
            }
        };

        let body = ErrorBody {
            success: false,
            kind: self.0.kind().to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use uuid::Uuid;

    #[rstest]
    #[case(DomainError::not_authorized("admins only"), StatusCode::FORBIDDEN)]
    #[case(DomainError::CourseNotFound(Uuid::nil()), StatusCode::NOT_FOUND)]
    #[case(DomainError::DuplicateActiveTitle("Intro-Web".into()), StatusCode::CONFLICT)]
    #[case(DomainError::AlreadyEnrolled("Intro-Web".into()), StatusCode::CONFLICT)]
    #[case(DomainError::NotEnrolled("Intro-Web".into()), StatusCode::BAD_REQUEST)]
    #[case(DomainError::validation("title", "too short"), StatusCode::BAD_REQUEST)]
    #[case(DomainError::AccountDisabled, StatusCode::UNAUTHORIZED)]
    #[case(DomainError::CourseUnavailable("Intro-Web".into()), StatusCode::UNPROCESSABLE_ENTITY)]
    #[case(DomainError::Storage("pool timed out".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn statuses(#[case] err: DomainError, #[case] expected: StatusCode) {
        assert_eq!(status_for(&err), expected);
        assert_eq!(HttpError(err).into_response().status(), expected);
    }
}
