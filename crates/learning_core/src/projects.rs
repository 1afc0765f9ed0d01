//! crates/learning_core/src/projects.rs
//!
//! The Project Catalog. Every create and delete recounts the parent course in
//! the same unit of work, so `projects_count` never drifts through this path.

use crate::courses::fetch_course;
use crate::domain::{
    Course, NewProject, Principal, Project, ProjectChanges, ProjectDeletionImpact, ProjectFilter,
    ProjectStart, RecountOutcome,
};
use crate::error::{DomainError, DomainResult};
use crate::policy::{authorize, Action, Resource};
use crate::ports::{Constraint, DatabaseService, PortError};
use crate::validation;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const NEXT_STEPS: [&str; 4] = [
    "Read the requirements and objectives",
    "Prepare your development environment",
    "Work through the implementation step by step",
    "Ask for help if you get stuck",
];

fn title_conflict(err: PortError, title: &str) -> DomainError {
    match err {
        PortError::UniqueViolation(Constraint::ActiveProjectTitle) => {
            DomainError::DuplicateTitleInCourse(title.to_string())
        }
        other => other.into(),
    }
}

#[derive(Clone)]
pub struct ProjectCatalog {
    db: Arc<dyn DatabaseService>,
}

impl ProjectCatalog {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    async fn fetch(&self, project_id: Uuid) -> DomainResult<Project> {
        match self.db.get_project(project_id).await {
            Ok(project) => Ok(project),
            Err(PortError::NotFound(_)) => Err(DomainError::ProjectNotFound(project_id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Loads a project with its parent course, hiding projects whose course
    /// has been soft-deleted from everyone but admins.
    async fn fetch_visible(
        &self,
        principal: &Principal,
        project_id: Uuid,
    ) -> DomainResult<(Project, Course)> {
        let project = self.fetch(project_id).await?;
        let course = fetch_course(self.db.as_ref(), project.course_id).await?;
        if !course.is_active && !principal.is_admin() {
            return Err(DomainError::ProjectNotFound(project_id));
        }
        Ok((project, course))
    }

    /// Creates a project at the requested position, or after the last one
    /// when no order is given.
    pub async fn create_project(
        &self,
        admin: &Principal,
        input: &NewProject,
    ) -> DomainResult<Project> {
        authorize(admin, Action::CreateProject, Resource::None)?;
        let course = fetch_course(self.db.as_ref(), input.course_id).await?;
        if !course.is_active {
            return Err(DomainError::CourseNotFound(course.id));
        }
        let input = validation::new_project(input)?;

        if self
            .db
            .active_project_title_exists(course.id, &input.title, None)
            .await?
        {
            return Err(DomainError::DuplicateTitleInCourse(input.title));
        }

        let project = match self.db.insert_project(&input).await {
            Ok(project) => project,
            Err(PortError::NotFound(_)) => return Err(DomainError::CourseNotFound(course.id)),
            Err(e) => return Err(title_conflict(e, &input.title)),
        };
        info!(
            project_id = %project.id,
            course_id = %course.id,
            order = project.order,
            "Created project"
        );
        Ok(project)
    }

    pub async fn update_project(
        &self,
        admin: &Principal,
        project_id: Uuid,
        changes: &ProjectChanges,
    ) -> DomainResult<Project> {
        authorize(admin, Action::UpdateProject, Resource::None)?;
        let current = self.fetch(project_id).await?;
        let changes = validation::project_changes(changes)?;

        if let Some(title) = &changes.title {
            if self
                .db
                .active_project_title_exists(current.course_id, title, Some(project_id))
                .await?
            {
                return Err(DomainError::DuplicateTitleInCourse(title.clone()));
            }
        }

        let title = changes.title.clone().unwrap_or_default();
        match self.db.update_project(project_id, &changes).await {
            Ok(project) => Ok(project),
            Err(PortError::NotFound(_)) => Err(DomainError::ProjectNotFound(project_id)),
            Err(e) => Err(title_conflict(e, &title)),
        }
    }

    /// Hard-deletes the project and returns the parent's fresh count.
    pub async fn delete_project(
        &self,
        admin: &Principal,
        project_id: Uuid,
    ) -> DomainResult<RecountOutcome> {
        authorize(admin, Action::DeleteProject, Resource::None)?;
        let outcome = match self.db.delete_project(project_id).await {
            Ok(outcome) => outcome,
            Err(PortError::NotFound(_)) => return Err(DomainError::ProjectNotFound(project_id)),
            Err(e) => return Err(e.into()),
        };
        info!(
            project_id = %project_id,
            course_id = %outcome.course_id,
            projects_count = outcome.projects_count,
            "Deleted project"
        );
        Ok(outcome)
    }

    /// Active projects ordered by course, then position. Learners only see
    /// projects of public, active courses.
    pub async fn list_projects(
        &self,
        principal: &Principal,
        course_id: Option<Uuid>,
    ) -> DomainResult<Vec<Project>> {
        let filter = ProjectFilter {
            course_id,
            public_courses_only: !principal.is_admin(),
        };
        Ok(self.db.list_projects(filter).await?)
    }

    pub async fn project_details(
        &self,
        principal: &Principal,
        project_id: Uuid,
    ) -> DomainResult<Project> {
        let (project, course) = self.fetch_visible(principal, project_id).await?;
        authorize(principal, Action::ViewProject, Resource::Course(&course))?;
        Ok(project)
    }

    pub async fn project_deletion_impact(
        &self,
        admin: &Principal,
        project_id: Uuid,
    ) -> DomainResult<ProjectDeletionImpact> {
        authorize(admin, Action::DeleteProject, Resource::None)?;
        let (project, course) = self.fetch_visible(admin, project_id).await?;
        let siblings = self
            .db
            .list_projects(ProjectFilter {
                course_id: Some(course.id),
                public_courses_only: false,
            })
            .await?;
        let remaining = siblings.iter().filter(|p| p.id != project.id).count() as i32;
        Ok(ProjectDeletionImpact {
            project,
            course_title: course.title,
            remaining_projects: remaining,
        })
    }

    /// Nothing is persisted; the learner only has to be enrolled in the
    /// parent course.
    pub async fn start_project(
        &self,
        learner: &Principal,
        project_id: Uuid,
    ) -> DomainResult<ProjectStart> {
        authorize(learner, Action::StartProject, Resource::None)?;
        let (project, course) = self.fetch_visible(learner, project_id).await?;
        if !self.db.is_enrolled(learner.user_id, course.id).await? {
            return Err(DomainError::NotEnrolled(course.title));
        }
        info!(project_id = %project_id, user_id = %learner.user_id, "Learner started project");
        Ok(ProjectStart {
            project,
            course_title: course.title,
            next_steps: NEXT_STEPS.iter().map(|s| s.to_string()).collect(),
        })
    }
}
