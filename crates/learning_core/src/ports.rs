//! crates/learning_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the database and of the password hashing scheme.
//!
//! Every method that mutates more than one row is a single unit of work: the
//! implementation must apply all of it or none of it.

use crate::domain::{
    Course, CourseChanges, NewCourse, NewProject, Project, ProjectChanges, ProjectFilter,
    RecountOutcome, Role, User, UserCredentials,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// The uniqueness rules a store enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// One account per email.
    UserEmail,
    /// One active course per case-insensitive title.
    ActiveCourseTitle,
    /// One active project per case-insensitive title within a course.
    ActiveProjectTitle,
    /// One enrollment row per (learner, course).
    Enrollment,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Constraint::UserEmail => "users_email_key",
            Constraint::ActiveCourseTitle => "courses_active_title_key",
            Constraint::ActiveProjectTitle => "projects_active_title_key",
            Constraint::Enrollment => "enrollments_pkey",
        };
        f.write_str(name)
    }
}

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(Constraint),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Accounts ---
    async fn create_user(&self, email: &str, hashed_password: &str, role: Role)
        -> PortResult<User>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn count_admins(&self) -> PortResult<i64>;

    /// Fails with `UniqueViolation(UserEmail)` when another account holds `email`.
    async fn update_user_email(&self, user_id: Uuid, email: &str) -> PortResult<User>;

    /// Appends `title` to a learner's list. Returns `false` when the title was
    /// already present or the account is not a learner.
    async fn add_enrolled_title(&self, user_id: Uuid, title: &str) -> PortResult<bool>;

    /// Returns `false` when the title was absent or the account is not a learner.
    async fn remove_enrolled_title(&self, user_id: Uuid, title: &str) -> PortResult<bool>;

    /// Turns a learner into an admin: drops their enrollment rows and clears
    /// the title list.
    async fn promote_to_admin(&self, user_id: Uuid) -> PortResult<User>;

    /// Deactivation drops the account's enrollment rows, empties its title
    /// list and revokes its login sessions.
    async fn set_user_active(&self, user_id: Uuid, active: bool) -> PortResult<User>;

    // --- Auth Sessions ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the owning user of an unexpired session.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Courses ---
    async fn insert_course(&self, instructor_id: Uuid, course: &NewCourse) -> PortResult<Course>;

    /// Fetches a course whether or not it is active.
    async fn get_course(&self, course_id: Uuid) -> PortResult<Course>;

    /// Active courses, newest first.
    async fn list_courses(&self, public_only: bool) -> PortResult<Vec<Course>>;

    async fn active_course_title_exists(
        &self,
        title: &str,
        excluding: Option<Uuid>,
    ) -> PortResult<bool>;

    /// Applies the changes; a new title is rewritten in every enrolled
    /// learner's title list in the same unit of work. A learner also enrolled
    /// in another course under the old title keeps it and gains the new one.
    async fn update_course(&self, course_id: Uuid, changes: &CourseChanges) -> PortResult<Course>;

    async fn deactivate_course(&self, course_id: Uuid) -> PortResult<Course>;

    /// Counts the active projects of the course and stores the result (with a
    /// fresh `updated_at`) only if it differs from the cached value.
    async fn recompute_projects_count(&self, course_id: Uuid) -> PortResult<RecountOutcome>;

    // --- Projects ---
    /// Inserts the project, assigning the next order in the course when none
    /// is given, and recounts the parent course.
    async fn insert_project(&self, project: &NewProject) -> PortResult<Project>;

    async fn get_project(&self, project_id: Uuid) -> PortResult<Project>;

    /// Active projects ordered by course then order.
    async fn list_projects(&self, filter: ProjectFilter) -> PortResult<Vec<Project>>;

    async fn active_project_title_exists(
        &self,
        course_id: Uuid,
        title: &str,
        excluding: Option<Uuid>,
    ) -> PortResult<bool>;

    async fn update_project(
        &self,
        project_id: Uuid,
        changes: &ProjectChanges,
    ) -> PortResult<Project>;

    /// Removes the project row and recounts the parent course.
    async fn delete_project(&self, project_id: Uuid) -> PortResult<RecountOutcome>;

    // --- Enrollment ---
    /// Inserts the enrollment row and appends the course title to the
    /// learner's list.
    async fn enroll_learner(&self, user_id: Uuid, course_id: Uuid) -> PortResult<()>;

    /// Mirror of `enroll_learner`. The title stays in the list while another
    /// of the learner's enrollments points at a course with the same title.
    /// Returns `false` when no row existed.
    async fn unenroll_learner(&self, user_id: Uuid, course_id: Uuid) -> PortResult<bool>;

    async fn is_enrolled(&self, user_id: Uuid, course_id: Uuid) -> PortResult<bool>;

    async fn enrolled_learner_emails(&self, course_id: Uuid) -> PortResult<Vec<String>>;

    /// Active courses the learner is enrolled in, newest first.
    async fn courses_for_learner(&self, user_id: Uuid) -> PortResult<Vec<Course>>;
}

/// Password hashing is delegated to an adapter so the core stays free of any
/// particular scheme.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> PortResult<String>;

    fn verify(&self, password: &str, hashed: &str) -> PortResult<bool>;
}
