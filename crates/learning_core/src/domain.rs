//! crates/learning_core/src/domain.rs
//!
//! Defines the pure, core data structures for the learning platform.
//! These structs are independent of any database or transport format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Enumerations shared by several records
//=========================================================================================

/// Error returned when a stored or submitted string names no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Generates `as_str`, `Display` and `FromStr` for a string-backed enum.
macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Whether an account learns or administers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Learner,
    Admin,
}

string_enum!(Role, "role", { Learner => "learner", Admin => "admin" });

/// Difficulty tier shared by courses and projects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

string_enum!(Level, "level", {
    Beginner => "beginner",
    Intermediate => "intermediate",
    Advanced => "advanced",
    Expert => "expert",
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Web,
    Mobile,
    Data,
    Ai,
    Design,
    Business,
    Language,
    #[default]
    Other,
}

string_enum!(Category, "category", {
    Web => "web",
    Mobile => "mobile",
    Data => "data",
    Ai => "ai",
    Design => "design",
    Business => "business",
    Language => "language",
    Other => "other",
});

/// Main programming language of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProgrammingLanguage {
    Python,
    Javascript,
    Java,
    Csharp,
    Cpp,
    Php,
    Ruby,
    Go,
    Swift,
    Kotlin,
    Typescript,
    Dart,
    Rust,
    Other,
}

string_enum!(ProgrammingLanguage, "language", {
    Python => "python",
    Javascript => "javascript",
    Java => "java",
    Csharp => "csharp",
    Cpp => "cpp",
    Php => "php",
    Ruby => "ruby",
    Go => "go",
    Swift => "swift",
    Kotlin => "kotlin",
    Typescript => "typescript",
    Dart => "dart",
    Rust => "rust",
    Other => "other",
});

//=========================================================================================
// Accounts
//=========================================================================================

/// A registered account.
///
/// `enrolled_titles` is `Some` for learners and `None` for admins.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub enrolled_titles: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_learner(&self) -> bool {
        self.role == Role::Learner
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// The enrollment summary, undefined for admins.
    pub fn enrollment_summary(&self) -> Option<EnrollmentSummary> {
        if !self.is_learner() {
            return None;
        }
        let titles = self.enrolled_titles.clone().unwrap_or_default();
        Some(EnrollmentSummary {
            count: titles.len(),
            titles,
        })
    }

    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.user_id,
            email: self.email.clone(),
            role: self.role,
        }
    }
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
    pub role: Role,
    pub is_active: bool,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_learner(&self) -> bool {
        self.role == Role::Learner
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct EnrollmentSummary {
    pub count: usize,
    pub titles: Vec<String>,
}

//=========================================================================================
// Courses
//=========================================================================================

/// An admin-authored learning track.
///
/// `projects_count` is a cache of the number of active projects and is only
/// ever written by the recount routine of the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub level: Level,
    pub category: Category,
    pub estimated_duration: i32,
    pub instructor_id: Uuid,
    pub is_public: bool,
    pub is_active: bool,
    pub projects_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a course.
#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub level: Level,
    #[serde(default)]
    pub category: Category,
    pub estimated_duration: i32,
    #[serde(default)]
    pub is_public: bool,
}

/// Partial update of a course. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
pub struct CourseChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub level: Option<Level>,
    pub category: Option<Category>,
    pub estimated_duration: Option<i32>,
    pub is_public: Option<bool>,
}

/// Result of an authoritative recount of a course's active projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct RecountOutcome {
    pub course_id: Uuid,
    pub projects_count: i32,
    pub changed: bool,
}

#[derive(Debug, Clone)]
pub struct CourseDetails {
    pub course: Course,
    pub enrolled_count: usize,
    /// Only populated for admins.
    pub enrolled_emails: Option<Vec<String>>,
    pub is_enrolled: bool,
    pub can_join: bool,
    pub projects: Vec<Project>,
}

#[derive(Debug, Clone)]
pub struct CourseDeletionImpact {
    pub course: Course,
    pub active_projects: i32,
    pub enrolled_learners: usize,
}

//=========================================================================================
// Projects
//=========================================================================================

/// A unit of practical work inside a course.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub objectives: String,
    pub resources: String,
    pub estimated_time: i32,
    pub level: Level,
    pub language: ProgrammingLanguage,
    pub order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
pub struct NewProject {
    pub course_id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub requirements: String,
    #[serde(default)]
    pub objectives: String,
    #[serde(default)]
    pub resources: String,
    pub estimated_time: i32,
    pub level: Level,
    pub language: ProgrammingLanguage,
    /// Position inside the course; the next free slot when absent.
    pub order: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
pub struct ProjectChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub objectives: Option<String>,
    pub resources: Option<String>,
    pub estimated_time: Option<i32>,
    pub level: Option<Level>,
    pub language: Option<ProgrammingLanguage>,
    pub order: Option<i32>,
}

/// Which projects a listing returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectFilter {
    pub course_id: Option<Uuid>,
    /// Restrict to projects whose course is both active and public.
    pub public_courses_only: bool,
}

#[derive(Debug, Clone)]
pub struct ProjectDeletionImpact {
    pub project: Project,
    pub course_title: String,
    pub remaining_projects: i32,
}

#[derive(Debug, Clone)]
pub struct ProjectStart {
    pub project: Project,
    pub course_title: String,
    pub next_steps: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("learner", Role::Learner)]
    #[case("admin", Role::Admin)]
    fn role_parses_from_storage(#[case] raw: &str, #[case] expected: Role) {
        assert_eq!(raw.parse::<Role>().unwrap(), expected);
        assert_eq!(expected.as_str(), raw);
    }

    #[test]
    fn unknown_language_is_rejected() {
        let err = "cobol".parse::<ProgrammingLanguage>().unwrap_err();
        assert_eq!(err.kind, "language");
        assert_eq!(err.value, "cobol");
    }

    #[test]
    fn admins_have_no_enrollment_summary() {
        let admin = User {
            user_id: Uuid::new_v4(),
            email: "root@example.com".to_string(),
            role: Role::Admin,
            is_active: true,
            enrolled_titles: None,
            created_at: Utc::now(),
        };
        assert!(admin.enrollment_summary().is_none());

        let learner = User {
            role: Role::Learner,
            enrolled_titles: Some(vec!["Intro-Web".to_string()]),
            ..admin
        };
        let summary = learner.enrollment_summary().unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.titles, vec!["Intro-Web".to_string()]);
    }
}
