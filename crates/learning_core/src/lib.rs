pub mod accounts;
pub mod courses;
pub mod dashboard;
pub mod domain;
pub mod enrollment;
pub mod error;
pub mod policy;
pub mod ports;
pub mod projects;
pub mod validation;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use accounts::AccountDirectory;
pub use courses::CourseCatalog;
pub use domain::{
    AuthSession, Category, Course, CourseChanges, CourseDeletionImpact, CourseDetails,
    EnrollmentSummary, Level, NewCourse, NewProject, Principal, ProgrammingLanguage, Project,
    ProjectChanges, ProjectDeletionImpact, ProjectFilter, ProjectStart, RecountOutcome, Role,
    User, UserCredentials,
};
pub use enrollment::EnrollmentWorkflow;
pub use error::{DomainError, DomainResult};
pub use ports::{Constraint, DatabaseService, PasswordHasher, PortError, PortResult};
pub use projects::ProjectCatalog;
