//! crates/learning_core/src/courses.rs
//!
//! The Course Catalog. Title uniqueness among active courses is checked up
//! front for a friendly error, but the store's constraint is what actually
//! decides; a violation raised there is translated to the same failure.

use crate::domain::{
    Course, CourseChanges, CourseDeletionImpact, CourseDetails, NewCourse, Principal,
    ProjectFilter, RecountOutcome,
};
use crate::error::{DomainError, DomainResult};
use crate::policy::{authorize, Action, Resource};
use crate::ports::{Constraint, DatabaseService, PortError};
use crate::validation;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Loads a course by id, active or not.
pub(crate) async fn fetch_course(
    db: &dyn DatabaseService,
    course_id: Uuid,
) -> DomainResult<Course> {
    match db.get_course(course_id).await {
        Ok(course) => Ok(course),
        Err(PortError::NotFound(_)) => Err(DomainError::CourseNotFound(course_id)),
        Err(e) => Err(e.into()),
    }
}

fn duplicate_title(err: PortError, title: &str) -> DomainError {
    match err {
        PortError::UniqueViolation(Constraint::ActiveCourseTitle) => {
            DomainError::DuplicateActiveTitle(title.to_string())
        }
        other => other.into(),
    }
}

#[derive(Clone)]
pub struct CourseCatalog {
    db: Arc<dyn DatabaseService>,
}

impl CourseCatalog {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    pub async fn create_course(
        &self,
        admin: &Principal,
        input: &NewCourse,
    ) -> DomainResult<Course> {
        authorize(admin, Action::CreateCourse, Resource::None)?;
        let input = validation::new_course(input)?;

        if self.db.active_course_title_exists(&input.title, None).await? {
            return Err(DomainError::DuplicateActiveTitle(input.title));
        }
        let course = self
            .db
            .insert_course(admin.user_id, &input)
            .await
            .map_err(|e| duplicate_title(e, &input.title))?;

        info!(course_id = %course.id, title = %course.title, "Created course");
        Ok(course)
    }

    pub async fn update_course(
        &self,
        admin: &Principal,
        course_id: Uuid,
        changes: &CourseChanges,
    ) -> DomainResult<Course> {
        let current = fetch_course(self.db.as_ref(), course_id).await?;
        authorize(admin, Action::UpdateCourse, Resource::Course(&current))?;
        let changes = validation::course_changes(changes)?;

        if let Some(title) = &changes.title {
            if current.is_active
                && self
                    .db
                    .active_course_title_exists(title, Some(course_id))
                    .await?
            {
                return Err(DomainError::DuplicateActiveTitle(title.clone()));
            }
        }

        let title = changes.title.clone().unwrap_or_default();
        match self.db.update_course(course_id, &changes).await {
            Ok(course) => Ok(course),
            Err(PortError::NotFound(_)) => Err(DomainError::CourseNotFound(course_id)),
            Err(e) => Err(duplicate_title(e, &title)),
        }
    }

    /// Marks the course inactive. Projects and enrollment rows stay in place.
    pub async fn soft_delete_course(
        &self,
        admin: &Principal,
        course_id: Uuid,
    ) -> DomainResult<Course> {
        let current = fetch_course(self.db.as_ref(), course_id).await?;
        authorize(admin, Action::DeleteCourse, Resource::Course(&current))?;
        if !current.is_active {
            return Ok(current);
        }
        let course = self.db.deactivate_course(course_id).await?;
        info!(course_id = %course_id, "Soft-deleted course");
        Ok(course)
    }

    pub async fn recompute_projects_count(
        &self,
        admin: &Principal,
        course_id: Uuid,
    ) -> DomainResult<RecountOutcome> {
        authorize(admin, Action::RecountCourse, Resource::None)?;
        self.recount(course_id).await
    }

    async fn recount(&self, course_id: Uuid) -> DomainResult<RecountOutcome> {
        match self.db.recompute_projects_count(course_id).await {
            Ok(outcome) => {
                if outcome.changed {
                    info!(
                        course_id = %course_id,
                        projects_count = outcome.projects_count,
                        "Corrected cached project count"
                    );
                } else {
                    debug!(course_id = %course_id, "Cached project count already accurate");
                }
                Ok(outcome)
            }
            Err(PortError::NotFound(_)) => Err(DomainError::CourseNotFound(course_id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Active courses, newest first. Learners only see public ones.
    pub async fn list_courses(&self, principal: &Principal) -> DomainResult<Vec<Course>> {
        Ok(self.db.list_courses(!principal.is_admin()).await?)
    }

    /// Full view of an active course. The cached project count is recomputed
    /// before it is returned.
    pub async fn course_details(
        &self,
        principal: &Principal,
        course_id: Uuid,
    ) -> DomainResult<CourseDetails> {
        let mut course = fetch_course(self.db.as_ref(), course_id).await?;
        if !course.is_active {
            return Err(DomainError::CourseNotFound(course_id));
        }
        authorize(principal, Action::ViewCourse, Resource::Course(&course))?;

        if self.recount(course_id).await?.changed {
            course = fetch_course(self.db.as_ref(), course_id).await?;
        }

        let emails = self.db.enrolled_learner_emails(course_id).await?;
        let is_enrolled = principal.is_learner()
            && self.db.is_enrolled(principal.user_id, course_id).await?;
        let projects = self
            .db
            .list_projects(ProjectFilter {
                course_id: Some(course_id),
                public_courses_only: false,
            })
            .await?;

        Ok(CourseDetails {
            enrolled_count: emails.len(),
            enrolled_emails: principal.is_admin().then_some(emails),
            is_enrolled,
            can_join: principal.is_learner() && !is_enrolled,
            projects,
            course,
        })
    }

    pub async fn course_deletion_impact(
        &self,
        admin: &Principal,
        course_id: Uuid,
    ) -> DomainResult<CourseDeletionImpact> {
        let course = fetch_course(self.db.as_ref(), course_id).await?;
        authorize(admin, Action::DeleteCourse, Resource::Course(&course))?;
        let outcome = self.recount(course_id).await?;
        let enrolled = self.db.enrolled_learner_emails(course_id).await?;
        Ok(CourseDeletionImpact {
            course,
            active_projects: outcome.projects_count,
            enrolled_learners: enrolled.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Level, Role};
    use crate::memory::fixtures::{course, project, Harness};
    use crate::ports::MockDatabaseService;
    use chrono::Utc;

    fn admin_principal() -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            email: "root@example.com".to_string(),
            role: Role::Admin,
        }
    }

    #[tokio::test]
    async fn new_courses_start_with_no_projects() {
        let h = Harness::new();
        let admin = h.admin("root@example.com").await;
        let intro = h.courses.create_course(&admin, &course("  Intro-Web ")).await.unwrap();
        assert_eq!(intro.title, "Intro-Web");
        assert_eq!(intro.projects_count, 0);
        assert_eq!(intro.instructor_id, admin.user_id);
        assert!(intro.is_active);
    }

    #[tokio::test]
    async fn learners_cannot_create_courses() {
        let h = Harness::new();
        let learner = h.learner("sam@example.com").await;
        let err = h.courses.create_course(&learner, &course("Intro-Web")).await.unwrap_err();
        assert!(matches!(err, DomainError::NotAuthorized(_)));
    }

    #[tokio::test]
    async fn invalid_fields_are_rejected() {
        let h = Harness::new();
        let admin = h.admin("root@example.com").await;
        let mut input = course("Intro-Web");
        input.estimated_duration = 0;
        let err = h.courses.create_course(&admin, &input).await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed { field: "estimated_duration", .. }));
    }

    #[tokio::test]
    async fn titles_are_unique_among_active_courses_ignoring_case() {
        let h = Harness::new();
        let admin = h.admin("root@example.com").await;
        let first = h.courses.create_course(&admin, &course("Intro-Web")).await.unwrap();

        let err = h.courses.create_course(&admin, &course("intro-web")).await.unwrap_err();
        assert!(matches!(err, DomainError::DuplicateActiveTitle(_)));

        h.courses.soft_delete_course(&admin, first.id).await.unwrap();
        let second = h.courses.create_course(&admin, &course("intro-web")).await.unwrap();
        assert_ne!(second.id, first.id);
    }

    #[tokio::test]
    async fn insert_race_is_translated() {
        let mut db = MockDatabaseService::new();
        db.expect_active_course_title_exists()
            .times(1)
            .returning(|_, _| Ok(false));
        db.expect_insert_course()
            .times(1)
            .returning(|_, _| Err(PortError::UniqueViolation(Constraint::ActiveCourseTitle)));
        let catalog = CourseCatalog::new(Arc::new(db));

        let err = catalog
            .create_course(&admin_principal(), &course("Intro-Web"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::DuplicateActiveTitle(title) if title == "Intro-Web"));
    }

    #[tokio::test]
    async fn update_race_is_translated() {
        let admin = admin_principal();
        let course_id = Uuid::new_v4();
        let existing = Course {
            id: course_id,
            title: "Intro-Web".to_string(),
            description: "Hands-on track covering the fundamentals".to_string(),
            level: Level::Beginner,
            category: Default::default(),
            estimated_duration: 40,
            instructor_id: admin.user_id,
            is_public: true,
            is_active: true,
            projects_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let mut db = MockDatabaseService::new();
        db.expect_get_course()
            .returning(move |_| Ok(existing.clone()));
        db.expect_active_course_title_exists()
            .returning(|_, _| Ok(false));
        db.expect_update_course()
            .times(1)
            .returning(|_, _| Err(PortError::UniqueViolation(Constraint::ActiveCourseTitle)));
        let catalog = CourseCatalog::new(Arc::new(db));

        let changes = CourseChanges {
            title: Some("Data Basics".to_string()),
            ..CourseChanges::default()
        };
        let err = catalog.update_course(&admin, course_id, &changes).await.unwrap_err();
        assert!(matches!(err, DomainError::DuplicateActiveTitle(title) if title == "Data Basics"));
    }

    #[tokio::test]
    async fn update_excludes_the_course_itself() {
        let h = Harness::new();
        let admin = h.admin("root@example.com").await;
        let other_admin = h.admin("ops@example.com").await;
        let intro = h.courses.create_course(&admin, &course("Intro-Web")).await.unwrap();
        h.courses.create_course(&admin, &course("Data Basics")).await.unwrap();

        let recased = CourseChanges {
            title: Some("INTRO-WEB".to_string()),
            ..CourseChanges::default()
        };
        let updated = h.courses.update_course(&other_admin, intro.id, &recased).await.unwrap();
        assert_eq!(updated.title, "INTRO-WEB");

        let clash = CourseChanges {
            title: Some("data basics".to_string()),
            ..CourseChanges::default()
        };
        let err = h.courses.update_course(&admin, intro.id, &clash).await.unwrap_err();
        assert!(matches!(err, DomainError::DuplicateActiveTitle(_)));
    }

    #[tokio::test]
    async fn rename_rewrites_enrolled_titles() {
        let h = Harness::new();
        let admin = h.admin("root@example.com").await;
        let learner = h.learner("sam@example.com").await;
        let intro = h.courses.create_course(&admin, &course("Intro-Web")).await.unwrap();
        h.enrollment.join_course(&learner, intro.id).await.unwrap();

        let rename = CourseChanges {
            title: Some("Web Foundations".to_string()),
            ..CourseChanges::default()
        };
        h.courses.update_course(&admin, intro.id, &rename).await.unwrap();

        let summary = h.accounts.enrollment_summary(learner.user_id).await.unwrap().unwrap();
        assert_eq!(summary.titles, vec!["Web Foundations".to_string()]);
    }

    #[tokio::test]
    async fn soft_delete_keeps_course_addressable() {
        let h = Harness::new();
        let admin = h.admin("root@example.com").await;
        let intro = h.courses.create_course(&admin, &course("Intro-Web")).await.unwrap();
        h.projects.create_project(&admin, &project(intro.id, "Build a form")).await.unwrap();

        let deleted = h.courses.soft_delete_course(&admin, intro.id).await.unwrap();
        assert!(!deleted.is_active);

        let stored = h.db.get_course(intro.id).await.unwrap();
        assert!(!stored.is_active);
        assert_eq!(stored.projects_count, 1);
        assert!(h.courses.list_courses(&admin).await.unwrap().is_empty());

        let err = h.courses.course_details(&admin, intro.id).await.unwrap_err();
        assert!(matches!(err, DomainError::CourseNotFound(id) if id == intro.id));
    }

    #[tokio::test]
    async fn recount_is_admin_only_and_reports_no_change_when_in_sync() {
        let h = Harness::new();
        let admin = h.admin("root@example.com").await;
        let learner = h.learner("sam@example.com").await;
        let intro = h.courses.create_course(&admin, &course("Intro-Web")).await.unwrap();
        h.projects.create_project(&admin, &project(intro.id, "Build a form")).await.unwrap();

        let outcome = h.courses.recompute_projects_count(&admin, intro.id).await.unwrap();
        assert_eq!(outcome.projects_count, 1);
        assert!(!outcome.changed);

        let err = h.courses.recompute_projects_count(&learner, intro.id).await.unwrap_err();
        assert_eq!(err.kind(), "not_authorized");

        let err = h
            .courses
            .recompute_projects_count(&admin, Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "course_not_found");
    }

    #[tokio::test]
    async fn recount_corrects_a_drifted_cache() {
        let h = Harness::new();
        let admin = h.admin("root@example.com").await;
        let intro = h.courses.create_course(&admin, &course("Intro-Web")).await.unwrap();
        h.projects.create_project(&admin, &project(intro.id, "Build a form")).await.unwrap();
        h.projects.create_project(&admin, &project(intro.id, "Style a page")).await.unwrap();

        h.db.set_cached_projects_count(intro.id, 7).await;
        let before = h.db.get_course(intro.id).await.unwrap();
        assert_eq!(before.projects_count, 7);
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;

        let outcome = h.courses.recompute_projects_count(&admin, intro.id).await.unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.projects_count, 2);

        let after = h.db.get_course(intro.id).await.unwrap();
        assert_eq!(after.projects_count, 2);
        assert!(after.updated_at > before.updated_at);

        let again = h.courses.recompute_projects_count(&admin, intro.id).await.unwrap();
        assert!(!again.changed);
    }

    #[tokio::test]
    async fn learners_only_see_public_courses() {
        let h = Harness::new();
        let admin = h.admin("root@example.com").await;
        let learner = h.learner("sam@example.com").await;
        h.courses.create_course(&admin, &course("Intro-Web")).await.unwrap();
        let mut hidden = course("Draft Course");
        hidden.is_public = false;
        let draft = h.courses.create_course(&admin, &hidden).await.unwrap();

        let titles: Vec<String> = h
            .courses
            .list_courses(&learner)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["Intro-Web".to_string()]);
        assert_eq!(h.courses.list_courses(&admin).await.unwrap().len(), 2);

        let err = h.courses.course_details(&learner, draft.id).await.unwrap_err();
        assert_eq!(err.kind(), "not_authorized");
    }

    #[tokio::test]
    async fn details_differ_for_learners_and_admins() {
        let h = Harness::new();
        let admin = h.admin("root@example.com").await;
        let learner = h.learner("sam@example.com").await;
        let intro = h.courses.create_course(&admin, &course("Intro-Web")).await.unwrap();
        h.projects.create_project(&admin, &project(intro.id, "Build a form")).await.unwrap();

        let before = h.courses.course_details(&learner, intro.id).await.unwrap();
        assert!(before.can_join);
        assert!(!before.is_enrolled);
        assert!(before.enrolled_emails.is_none());
        assert_eq!(before.projects.len(), 1);
        assert_eq!(before.course.projects_count, 1);

        h.enrollment.join_course(&learner, intro.id).await.unwrap();
        let after = h.courses.course_details(&learner, intro.id).await.unwrap();
        assert!(after.is_enrolled);
        assert!(!after.can_join);

        let admin_view = h.courses.course_details(&admin, intro.id).await.unwrap();
        assert_eq!(admin_view.enrolled_count, 1);
        assert_eq!(admin_view.enrolled_emails, Some(vec!["sam@example.com".to_string()]));
        assert!(!admin_view.can_join);
    }

    #[tokio::test]
    async fn deletion_impact_counts_projects_and_learners() {
        let h = Harness::new();
        let admin = h.admin("root@example.com").await;
        let learner = h.learner("sam@example.com").await;
        let intro = h.courses.create_course(&admin, &course("Intro-Web")).await.unwrap();
        h.projects.create_project(&admin, &project(intro.id, "Build a form")).await.unwrap();
        h.projects.create_project(&admin, &project(intro.id, "Style the form")).await.unwrap();
        h.enrollment.join_course(&learner, intro.id).await.unwrap();

        let impact = h.courses.course_deletion_impact(&admin, intro.id).await.unwrap();
        assert_eq!(impact.active_projects, 2);
        assert_eq!(impact.enrolled_learners, 1);
    }
}
