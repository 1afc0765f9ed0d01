//! services/api/src/web/views.rs
//!
//! JSON shapes of the domain records. The core records stay free of any
//! wire format; these mirror them field for field.

use chrono::{DateTime, Utc};
use learning_core::{
    Category, Course, CourseDeletionImpact, CourseDetails, EnrollmentSummary, Level,
    ProgrammingLanguage, Project, ProjectDeletionImpact, ProjectStart, Role, User,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct AccountView {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    /// Absent for admins.
    pub enrollment: Option<EnrollmentSummary>,
}

impl From<User> for AccountView {
    fn from(user: User) -> Self {
        Self {
            enrollment: user.enrollment_summary(),
            user_id: user.user_id,
            email: user.email,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CourseView {
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

impl From<Course> for CourseView {
    fn from(c: Course) -> Self {
        Self {
            id: c.id,
            title: c.title,
            description: c.description,
            level: c.level,
            category: c.category,
            estimated_duration: c.estimated_duration,
            instructor_id: c.instructor_id,
            is_public: c.is_public,
            is_active: c.is_active,
            projects_count: c.projects_count,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectView {
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

impl From<Project> for ProjectView {
    fn from(p: Project) -> Self {
        Self {
            id: p.id,
            course_id: p.course_id,
            title: p.title,
            description: p.description,
            requirements: p.requirements,
            objectives: p.objectives,
            resources: p.resources,
            estimated_time: p.estimated_time,
            level: p.level,
            language: p.language,
            order: p.order,
            is_active: p.is_active,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CourseDetailsView {
    pub course: CourseView,
    pub enrolled_count: usize,
    /// Only present for admins.
    pub enrolled_emails: Option<Vec<String>>,
    pub is_enrolled: bool,
    pub can_join: bool,
    pub projects: Vec<ProjectView>,
}

impl From<CourseDetails> for CourseDetailsView {
    fn from(d: CourseDetails) -> Self {
        Self {
            course: d.course.into(),
            enrolled_count: d.enrolled_count,
            enrolled_emails: d.enrolled_emails,
            is_enrolled: d.is_enrolled,
            can_join: d.can_join,
            projects: d.projects.into_iter().map(ProjectView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CourseImpactView {
    pub course: CourseView,
    pub active_projects: i32,
    pub enrolled_learners: usize,
}

impl From<CourseDeletionImpact> for CourseImpactView {
    fn from(i: CourseDeletionImpact) -> Self {
        Self {
            course: i.course.into(),
            active_projects: i.active_projects,
            enrolled_learners: i.enrolled_learners,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectImpactView {
    pub project: ProjectView,
    pub course_title: String,
    pub remaining_projects: i32,
}

impl From<ProjectDeletionImpact> for ProjectImpactView {
    fn from(i: ProjectDeletionImpact) -> Self {
        Self {
            project: i.project.into(),
            course_title: i.course_title,
            remaining_projects: i.remaining_projects,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectStartView {
    pub project: ProjectView,
    pub course_title: String,
    pub next_steps: Vec<String>,
}

impl From<ProjectStart> for ProjectStartView {
    fn from(s: ProjectStart) -> Self {
        Self {
            project: s.project.into(),
            course_title: s.course_title,
            next_steps: s.next_steps,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EnrollmentView {
    pub course_id: Uuid,
    pub course_title: String,
    pub enrolled: bool,
}
