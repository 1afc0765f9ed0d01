//! crates/learning_core/src/enrollment.rs
//!
//! Joining and leaving courses. Each operation touches both the enrollment
//! relation and the learner's title list, and the store applies the pair as
//! one unit of work.

use crate::courses::fetch_course;
use crate::domain::{Course, Principal};
use crate::error::{DomainError, DomainResult};
use crate::policy::{authorize, Action, Resource};
use crate::ports::{Constraint, DatabaseService, PortError};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct EnrollmentWorkflow {
    db: Arc<dyn DatabaseService>,
}

impl EnrollmentWorkflow {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    pub async fn join_course(&self, learner: &Principal, course_id: Uuid) -> DomainResult<Course> {
        authorize(learner, Action::JoinCourse, Resource::None)?;
        let course = fetch_course(self.db.as_ref(), course_id).await?;
        if !course.is_active {
            return Err(DomainError::CourseUnavailable(course.title));
        }
        if self.db.is_enrolled(learner.user_id, course_id).await? {
            return Err(DomainError::AlreadyEnrolled(course.title));
        }

        match self.db.enroll_learner(learner.user_id, course_id).await {
            Ok(()) => {}
            Err(PortError::UniqueViolation(Constraint::Enrollment)) => {
                return Err(DomainError::AlreadyEnrolled(course.title))
            }
            Err(PortError::NotFound(_)) => return Err(DomainError::CourseNotFound(course_id)),
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %learner.user_id, course_id = %course_id, "Learner joined course");
        Ok(course)
    }

    /// Works on inactive courses too, so learners can tidy up after a
    /// course is withdrawn.
    pub async fn leave_course(&self, learner: &Principal, course_id: Uuid) -> DomainResult<Course> {
        authorize(learner, Action::LeaveCourse, Resource::None)?;
        let course = fetch_course(self.db.as_ref(), course_id).await?;
        if !self.db.unenroll_learner(learner.user_id, course_id).await? {
            return Err(DomainError::NotEnrolled(course.title));
        }
        info!(user_id = %learner.user_id, course_id = %course_id, "Learner left course");
        Ok(course)
    }

    pub async fn is_enrolled(&self, principal: &Principal, course_id: Uuid) -> DomainResult<bool> {
        if !principal.is_learner() {
            return Ok(false);
        }
        Ok(self.db.is_enrolled(principal.user_id, course_id).await?)
    }

    pub async fn my_courses(&self, learner: &Principal) -> DomainResult<Vec<Course>> {
        authorize(learner, Action::ViewOwnEnrollments, Resource::None)?;
        Ok(self.db.courses_for_learner(learner.user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CourseChanges, Role};
    use crate::memory::fixtures::{course, project, Harness};
    use crate::ports::MockDatabaseService;
    use chrono::Utc;

    async fn titles_of(h: &Harness, learner: &Principal) -> Vec<String> {
        h.accounts
            .enrollment_summary(learner.user_id)
            .await
            .unwrap()
            .unwrap()
            .titles
    }

    #[tokio::test]
    async fn intro_web_walkthrough() {
        let h = Harness::new();
        let admin = h.admin("a@example.com").await;
        let learner = h.learner("l@example.com").await;

        let intro = h.courses.create_course(&admin, &course("Intro-Web")).await.unwrap();
        assert_eq!(intro.estimated_duration, 40);
        assert_eq!(intro.projects_count, 0);

        let form = h
            .projects
            .create_project(&admin, &project(intro.id, "Build a form"))
            .await
            .unwrap();
        assert_eq!(form.estimated_time, 5);
        assert_eq!(h.db.get_course(intro.id).await.unwrap().projects_count, 1);

        h.enrollment.join_course(&learner, intro.id).await.unwrap();
        assert!(h.enrollment.is_enrolled(&learner, intro.id).await.unwrap());
        assert_eq!(titles_of(&h, &learner).await, vec!["Intro-Web".to_string()]);

        h.projects.delete_project(&admin, form.id).await.unwrap();
        assert_eq!(h.db.get_course(intro.id).await.unwrap().projects_count, 0);
    }

    #[tokio::test]
    async fn joining_twice_is_rejected_without_side_effects() {
        let h = Harness::new();
        let admin = h.admin("a@example.com").await;
        let learner = h.learner("l@example.com").await;
        let intro = h.courses.create_course(&admin, &course("Intro-Web")).await.unwrap();

        h.enrollment.join_course(&learner, intro.id).await.unwrap();
        let err = h.enrollment.join_course(&learner, intro.id).await.unwrap_err();
        assert!(matches!(err, DomainError::AlreadyEnrolled(title) if title == "Intro-Web"));

        assert_eq!(h.db.enrollment_rows(intro.id).await, 1);
        let titles = titles_of(&h, &learner).await;
        assert_eq!(titles.iter().filter(|t| *t == "Intro-Web").count(), 1);
    }

    #[tokio::test]
    async fn join_checks_role_and_course_state() {
        let h = Harness::new();
        let admin = h.admin("a@example.com").await;
        let learner = h.learner("l@example.com").await;
        let intro = h.courses.create_course(&admin, &course("Intro-Web")).await.unwrap();

        let err = h.enrollment.join_course(&admin, intro.id).await.unwrap_err();
        assert!(matches!(err, DomainError::NotAuthorized(_)));

        let err = h.enrollment.join_course(&learner, Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.kind(), "course_not_found");

        h.courses.soft_delete_course(&admin, intro.id).await.unwrap();
        let err = h.enrollment.join_course(&learner, intro.id).await.unwrap_err();
        assert!(matches!(err, DomainError::CourseUnavailable(_)));
        assert_eq!(h.db.enrollment_rows(intro.id).await, 0);
    }

    #[tokio::test]
    async fn failed_title_write_rolls_back_the_relation() {
        let h = Harness::new();
        let admin = h.admin("a@example.com").await;
        let learner = h.learner("l@example.com").await;
        let intro = h.courses.create_course(&admin, &course("Intro-Web")).await.unwrap();

        h.db.fail_title_writes(true).await;
        let err = h.enrollment.join_course(&learner, intro.id).await.unwrap_err();
        assert_eq!(err.kind(), "storage");
        h.db.fail_title_writes(false).await;

        assert!(!h.enrollment.is_enrolled(&learner, intro.id).await.unwrap());
        assert_eq!(h.db.enrollment_rows(intro.id).await, 0);
        assert!(titles_of(&h, &learner).await.is_empty());

        h.enrollment.join_course(&learner, intro.id).await.unwrap();
        h.db.fail_title_writes(true).await;
        assert!(h.enrollment.leave_course(&learner, intro.id).await.is_err());
        h.db.fail_title_writes(false).await;
        assert!(h.enrollment.is_enrolled(&learner, intro.id).await.unwrap());
        assert_eq!(titles_of(&h, &learner).await, vec!["Intro-Web".to_string()]);
    }

    #[tokio::test]
    async fn enrollment_race_surfaces_as_already_enrolled() {
        let learner = Principal {
            user_id: Uuid::new_v4(),
            email: "l@example.com".to_string(),
            role: Role::Learner,
        };
        let course_id = Uuid::new_v4();
        let now = Utc::now();
        let intro = Course {
            id: course_id,
            title: "Intro-Web".to_string(),
            description: "Hands-on track covering the fundamentals".to_string(),
            level: Default::default(),
            category: Default::default(),
            estimated_duration: 40,
            instructor_id: Uuid::new_v4(),
            is_public: true,
            is_active: true,
            projects_count: 0,
            created_at: now,
            updated_at: now,
        };

        let mut db = MockDatabaseService::new();
        db.expect_get_course().returning(move |_| Ok(intro.clone()));
        db.expect_is_enrolled().returning(|_, _| Ok(false));
        db.expect_enroll_learner()
            .times(1)
            .returning(|_, _| Err(PortError::UniqueViolation(Constraint::Enrollment)));
        let workflow = EnrollmentWorkflow::new(Arc::new(db));

        let err = workflow.join_course(&learner, course_id).await.unwrap_err();
        assert!(matches!(err, DomainError::AlreadyEnrolled(_)));
    }

    #[tokio::test]
    async fn leave_mirrors_join() {
        let h = Harness::new();
        let admin = h.admin("a@example.com").await;
        let learner = h.learner("l@example.com").await;
        let intro = h.courses.create_course(&admin, &course("Intro-Web")).await.unwrap();
        let data = h.courses.create_course(&admin, &course("Data Basics")).await.unwrap();

        let err = h.enrollment.leave_course(&learner, intro.id).await.unwrap_err();
        assert!(matches!(err, DomainError::NotEnrolled(_)));

        h.enrollment.join_course(&learner, intro.id).await.unwrap();
        h.enrollment.join_course(&learner, data.id).await.unwrap();
        h.enrollment.leave_course(&learner, intro.id).await.unwrap();

        assert!(!h.enrollment.is_enrolled(&learner, intro.id).await.unwrap());
        assert_eq!(titles_of(&h, &learner).await, vec!["Data Basics".to_string()]);

        h.courses.soft_delete_course(&admin, data.id).await.unwrap();
        h.enrollment.leave_course(&learner, data.id).await.unwrap();
        assert!(titles_of(&h, &learner).await.is_empty());
    }

    #[tokio::test]
    async fn leaving_a_retired_course_keeps_the_title_of_its_successor() {
        let h = Harness::new();
        let admin = h.admin("a@example.com").await;
        let learner = h.learner("l@example.com").await;
        let old = h.courses.create_course(&admin, &course("Intro-Web")).await.unwrap();
        h.enrollment.join_course(&learner, old.id).await.unwrap();
        h.courses.soft_delete_course(&admin, old.id).await.unwrap();

        let new = h.courses.create_course(&admin, &course("Intro-Web")).await.unwrap();
        h.enrollment.join_course(&learner, new.id).await.unwrap();
        assert_eq!(titles_of(&h, &learner).await, vec!["Intro-Web".to_string()]);

        h.enrollment.leave_course(&learner, old.id).await.unwrap();
        assert!(h.enrollment.is_enrolled(&learner, new.id).await.unwrap());
        assert_eq!(titles_of(&h, &learner).await, vec!["Intro-Web".to_string()]);

        h.enrollment.leave_course(&learner, new.id).await.unwrap();
        assert!(titles_of(&h, &learner).await.is_empty());
    }

    #[tokio::test]
    async fn renaming_one_of_two_same_titled_courses_keeps_both_titles() {
        let h = Harness::new();
        let admin = h.admin("a@example.com").await;
        let learner = h.learner("l@example.com").await;
        let old = h.courses.create_course(&admin, &course("Intro-Web")).await.unwrap();
        h.enrollment.join_course(&learner, old.id).await.unwrap();
        h.courses.soft_delete_course(&admin, old.id).await.unwrap();
        let new = h.courses.create_course(&admin, &course("Intro-Web")).await.unwrap();
        h.enrollment.join_course(&learner, new.id).await.unwrap();

        let changes = CourseChanges {
            title: Some("Web Foundations".to_string()),
            ..Default::default()
        };
        h.courses.update_course(&admin, new.id, &changes).await.unwrap();
        assert_eq!(
            titles_of(&h, &learner).await,
            vec!["Intro-Web".to_string(), "Web Foundations".to_string()]
        );

        h.enrollment.leave_course(&learner, old.id).await.unwrap();
        assert_eq!(titles_of(&h, &learner).await, vec!["Web Foundations".to_string()]);
    }

    #[tokio::test]
    async fn my_courses_lists_active_enrollments() {
        let h = Harness::new();
        let admin = h.admin("a@example.com").await;
        let learner = h.learner("l@example.com").await;
        let intro = h.courses.create_course(&admin, &course("Intro-Web")).await.unwrap();
        let data = h.courses.create_course(&admin, &course("Data Basics")).await.unwrap();
        h.courses.create_course(&admin, &course("Not Joined")).await.unwrap();
        h.enrollment.join_course(&learner, intro.id).await.unwrap();
        h.enrollment.join_course(&learner, data.id).await.unwrap();
        h.courses.soft_delete_course(&admin, data.id).await.unwrap();

        let mine = h.enrollment.my_courses(&learner).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, intro.id);

        assert!(h.enrollment.my_courses(&admin).await.is_err());
        assert!(!h.enrollment.is_enrolled(&admin, intro.id).await.unwrap());
    }
}
