//! crates/learning_core/src/error.rs
//!
//! The failure taxonomy surfaced by every domain operation. Adapters map these
//! to transport-specific envelopes; the core never produces raw storage errors.

use crate::ports::PortError;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// Role or permission mismatch.
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Course {0} not found")]
    CourseNotFound(Uuid),

    #[error("Project {0} not found")]
    ProjectNotFound(Uuid),

    #[error("User {0} not found")]
    UserNotFound(String),

    #[error("An account with email {0} already exists")]
    DuplicateEmail(String),

    #[error("Password does not meet the policy: {0}")]
    WeakPassword(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is disabled")]
    AccountDisabled,

    /// Another active course already uses this title (case-insensitive).
    #[error("An active course titled '{0}' already exists")]
    DuplicateActiveTitle(String),

    /// Another active project of the same course already uses this title.
    #[error("A project titled '{0}' already exists in this course")]
    DuplicateTitleInCourse(String),

    #[error("Already enrolled in '{0}'")]
    AlreadyEnrolled(String),

    #[error("Not enrolled in '{0}'")]
    NotEnrolled(String),

    #[error("Invalid {field}: {message}")]
    ValidationFailed {
        field: &'static str,
        message: String,
    },

    #[error("Course '{0}' is not active")]
    CourseUnavailable(String),

    /// An unexpected failure of the persistence layer.
    #[error("Storage failure: {0}")]
    Storage(String),
}

/// A convenience type alias for `Result<T, DomainError>`.
pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            field,
            message: message.into(),
        }
    }

    pub fn not_authorized(message: impl Into<String>) -> Self {
        Self::NotAuthorized(message.into())
    }

    /// Stable machine-readable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotAuthorized(_) => "not_authorized",
            Self::CourseNotFound(_) => "course_not_found",
            Self::ProjectNotFound(_) => "project_not_found",
            Self::UserNotFound(_) => "user_not_found",
            Self::DuplicateEmail(_) => "duplicate_email",
            Self::WeakPassword(_) => "weak_password",
            Self::InvalidCredentials => "invalid_credentials",
            Self::AccountDisabled => "account_disabled",
            Self::DuplicateActiveTitle(_) => "duplicate_active_title",
            Self::DuplicateTitleInCourse(_) => "duplicate_title_in_course",
            Self::AlreadyEnrolled(_) => "already_enrolled",
            Self::NotEnrolled(_) => "not_enrolled",
            Self::ValidationFailed { .. } => "validation_failed",
            Self::CourseUnavailable(_) => "course_unavailable",
            Self::Storage(_) => "storage",
        }
    }
}

/// Port failures that reach this conversion were not expected by the caller.
/// Operations that anticipate `NotFound` or `UniqueViolation` match on the
/// `PortError` before falling back to `?`.
impl From<PortError> for DomainError {
    fn from(err: PortError) -> Self {
        Self::Storage(err.to_string())
    }
}
