//! An in-process `DatabaseService` with the same constraints and unit-of-work
//! guarantees as the Postgres adapter. Used by tests in this crate and, via
//! the `test-support` feature, by the HTTP tests of the api service.

use crate::domain::{
    Course, CourseChanges, NewCourse, NewProject, Project, ProjectChanges, ProjectFilter,
    RecountOutcome, Role, User, UserCredentials,
};
use crate::ports::{Constraint, DatabaseService, PasswordHasher, PortError, PortResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    hashed_password: String,
}

#[derive(Debug, Clone, Default)]
struct Store {
    // Vecs keep insertion order, which stands in for `created_at` ordering.
    users: Vec<StoredUser>,
    courses: Vec<Course>,
    projects: Vec<Project>,
    enrollments: HashSet<(Uuid, Uuid)>,
    sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    fail_title_writes: bool,
}

fn same_title(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

impl Store {
    fn user_mut(&mut self, user_id: Uuid) -> PortResult<&mut StoredUser> {
        self.users
            .iter_mut()
            .find(|u| u.user.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {user_id} not found")))
    }

    fn course(&self, course_id: Uuid) -> PortResult<&Course> {
        self.courses
            .iter()
            .find(|c| c.id == course_id)
            .ok_or_else(|| PortError::NotFound(format!("Course {course_id} not found")))
    }

    fn course_mut(&mut self, course_id: Uuid) -> PortResult<&mut Course> {
        self.courses
            .iter_mut()
            .find(|c| c.id == course_id)
            .ok_or_else(|| PortError::NotFound(format!("Course {course_id} not found")))
    }

    fn project_mut(&mut self, project_id: Uuid) -> PortResult<&mut Project> {
        self.projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .ok_or_else(|| PortError::NotFound(format!("Project {project_id} not found")))
    }

    fn check_course_title(&self, title: &str, excluding: Option<Uuid>) -> PortResult<()> {
        let taken = self
            .courses
            .iter()
            .any(|c| c.is_active && Some(c.id) != excluding && same_title(&c.title, title));
        if taken {
            return Err(PortError::UniqueViolation(Constraint::ActiveCourseTitle));
        }
        Ok(())
    }

    fn check_project_title(
        &self,
        course_id: Uuid,
        title: &str,
        excluding: Option<Uuid>,
    ) -> PortResult<()> {
        let taken = self.projects.iter().any(|p| {
            p.is_active
                && p.course_id == course_id
                && Some(p.id) != excluding
                && same_title(&p.title, title)
        });
        if taken {
            return Err(PortError::UniqueViolation(Constraint::ActiveProjectTitle));
        }
        Ok(())
    }

    /// Rewrites a learner's title list. Non-learners are left untouched and
    /// report `false`.
    fn edit_titles(
        &mut self,
        user_id: Uuid,
        edit: impl FnOnce(&mut Vec<String>) -> bool,
    ) -> PortResult<bool> {
        let fail = self.fail_title_writes;
        let stored = self.user_mut(user_id)?;
        let Some(titles) = stored.user.enrolled_titles.as_mut() else {
            return Ok(false);
        };
        if fail {
            return Err(PortError::Unexpected("title list write failed".to_string()));
        }
        Ok(edit(titles))
    }

    fn recount(&mut self, course_id: Uuid) -> PortResult<RecountOutcome> {
        let active = self
            .projects
            .iter()
            .filter(|p| p.course_id == course_id && p.is_active)
            .count() as i32;
        let course = self.course_mut(course_id)?;
        let changed = course.projects_count != active;
        if changed {
            course.projects_count = active;
            course.updated_at = Utc::now();
        }
        Ok(RecountOutcome {
            course_id,
            projects_count: active,
            changed,
        })
    }

    /// Whether the learner keeps another enrollment whose course carries `title`.
    fn enrolled_elsewhere_under(&self, user_id: Uuid, title: &str, except: Uuid) -> bool {
        self.enrollments.iter().any(|(user, course_id)| {
            *user == user_id
                && *course_id != except
                && self
                    .course(*course_id)
                    .map(|c| c.title == title)
                    .unwrap_or(false)
        })
    }

    fn drop_enrollments_of(&mut self, user_id: Uuid) {
        self.enrollments.retain(|(user, _)| *user != user_id);
    }
}

/// Thread-safe, transactional in-memory store.
#[derive(Default)]
pub struct InMemoryDatabase {
    store: Mutex<Store>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write to a learner's title list fail, so tests
    /// can observe that the surrounding unit of work is rolled back.
    pub async fn fail_title_writes(&self, fail: bool) {
        self.store.lock().await.fail_title_writes = fail;
    }

    /// Overwrites a course's cached project count without touching `updated_at`,
    /// so tests can simulate drift.
    pub async fn set_cached_projects_count(&self, course_id: Uuid, count: i32) {
        let mut store = self.store.lock().await;
        if let Some(course) = store.courses.iter_mut().find(|c| c.id == course_id) {
            course.projects_count = count;
        }
    }

    /// Number of enrollment rows for a course, regardless of title lists.
    pub async fn enrollment_rows(&self, course_id: Uuid) -> usize {
        let store = self.store.lock().await;
        store.enrollments.iter().filter(|(_, c)| *c == course_id).count()
    }

    /// Runs `work` against a scratch copy and publishes it only on success.
    async fn transaction<T>(
        &self,
        work: impl FnOnce(&mut Store) -> PortResult<T>,
    ) -> PortResult<T> {
        let mut guard = self.store.lock().await;
        let mut scratch = guard.clone();
        let value = work(&mut scratch)?;
        *guard = scratch;
        Ok(value)
    }

    async fn read<T>(&self, query: impl FnOnce(&Store) -> PortResult<T>) -> PortResult<T> {
        let guard = self.store.lock().await;
        query(&guard)
    }
}

#[async_trait]
impl DatabaseService for InMemoryDatabase {
    async fn create_user(
        &self,
        email: &str,
        hashed_password: &str,
        role: Role,
    ) -> PortResult<User> {
        self.transaction(|store| {
            if store.users.iter().any(|u| u.user.email == email) {
                return Err(PortError::UniqueViolation(Constraint::UserEmail));
            }
            let user = User {
                user_id: Uuid::new_v4(),
                email: email.to_string(),
                role,
                is_active: true,
                enrolled_titles: (role == Role::Learner).then(Vec::new),
                created_at: Utc::now(),
            };
            store.users.push(StoredUser {
                user: user.clone(),
                hashed_password: hashed_password.to_string(),
            });
            Ok(user)
        })
        .await
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.read(|store| {
            store
                .users
                .iter()
                .find(|u| u.user.user_id == user_id)
                .map(|u| u.user.clone())
                .ok_or_else(|| PortError::NotFound(format!("User {user_id} not found")))
        })
        .await
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.read(|store| {
            store
                .users
                .iter()
                .find(|u| u.user.email == email)
                .map(|u| UserCredentials {
                    user_id: u.user.user_id,
                    email: u.user.email.clone(),
                    hashed_password: u.hashed_password.clone(),
                    role: u.user.role,
                    is_active: u.user.is_active,
                })
                .ok_or_else(|| PortError::NotFound(format!("User {email} not found")))
        })
        .await
    }

    async fn count_admins(&self) -> PortResult<i64> {
        self.read(|store| {
            Ok(store.users.iter().filter(|u| u.user.role == Role::Admin).count() as i64)
        })
        .await
    }

    async fn update_user_email(&self, user_id: Uuid, email: &str) -> PortResult<User> {
        self.transaction(|store| {
            let taken = store
                .users
                .iter()
                .any(|u| u.user.email == email && u.user.user_id != user_id);
            if taken {
                return Err(PortError::UniqueViolation(Constraint::UserEmail));
            }
            let stored = store.user_mut(user_id)?;
            stored.user.email = email.to_string();
            Ok(stored.user.clone())
        })
        .await
    }

    async fn add_enrolled_title(&self, user_id: Uuid, title: &str) -> PortResult<bool> {
        self.transaction(|store| {
            store.edit_titles(user_id, |titles| {
                if titles.iter().any(|t| t == title) {
                    return false;
                }
                titles.push(title.to_string());
                true
            })
        })
        .await
    }

    async fn remove_enrolled_title(&self, user_id: Uuid, title: &str) -> PortResult<bool> {
        self.transaction(|store| {
            store.edit_titles(user_id, |titles| {
                let before = titles.len();
                titles.retain(|t| t != title);
                titles.len() != before
            })
        })
        .await
    }

    async fn promote_to_admin(&self, user_id: Uuid) -> PortResult<User> {
        self.transaction(|store| {
            store.drop_enrollments_of(user_id);
            let stored = store.user_mut(user_id)?;
            stored.user.role = Role::Admin;
            stored.user.enrolled_titles = None;
            Ok(stored.user.clone())
        })
        .await
    }

    async fn set_user_active(&self, user_id: Uuid, active: bool) -> PortResult<User> {
        self.transaction(|store| {
            if !active {
                store.drop_enrollments_of(user_id);
                store.sessions.retain(|_, (owner, _)| *owner != user_id);
            }
            let stored = store.user_mut(user_id)?;
            stored.user.is_active = active;
            if stored.user.role == Role::Learner && !active {
                stored.user.enrolled_titles = Some(Vec::new());
            }
            Ok(stored.user.clone())
        })
        .await
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.transaction(|store| {
            store
                .sessions
                .insert(session_id.to_string(), (user_id, expires_at));
            Ok(())
        })
        .await
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        self.read(|store| match store.sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::NotFound("Auth session not found".to_string())),
        })
        .await
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.transaction(|store| {
            store.sessions.remove(session_id);
            Ok(())
        })
        .await
    }

    async fn insert_course(&self, instructor_id: Uuid, course: &NewCourse) -> PortResult<Course> {
        self.transaction(|store| {
            store.check_course_title(&course.title, None)?;
            let now = Utc::now();
            let record = Course {
                id: Uuid::new_v4(),
                title: course.title.clone(),
                description: course.description.clone(),
                level: course.level,
                category: course.category,
                estimated_duration: course.estimated_duration,
                instructor_id,
                is_public: course.is_public,
                is_active: true,
                projects_count: 0,
                created_at: now,
                updated_at: now,
            };
            store.courses.push(record.clone());
            Ok(record)
        })
        .await
    }

    async fn get_course(&self, course_id: Uuid) -> PortResult<Course> {
        self.read(|store| store.course(course_id).cloned()).await
    }

    async fn list_courses(&self, public_only: bool) -> PortResult<Vec<Course>> {
        self.read(|store| {
            Ok(store
                .courses
                .iter()
                .rev()
                .filter(|c| c.is_active && (c.is_public || !public_only))
                .cloned()
                .collect())
        })
        .await
    }

    async fn active_course_title_exists(
        &self,
        title: &str,
        excluding: Option<Uuid>,
    ) -> PortResult<bool> {
        self.read(|store| Ok(store.check_course_title(title, excluding).is_err()))
            .await
    }

    async fn update_course(&self, course_id: Uuid, changes: &CourseChanges) -> PortResult<Course> {
        self.transaction(|store| {
            let current = store.course(course_id)?.clone();
            let renamed = changes
                .title
                .as_ref()
                .filter(|title| **title != current.title)
                .cloned();

            if let Some(title) = &renamed {
                if current.is_active {
                    store.check_course_title(title, Some(course_id))?;
                }
                let learners: Vec<Uuid> = store
                    .enrollments
                    .iter()
                    .filter(|(_, c)| *c == course_id)
                    .map(|(u, _)| *u)
                    .collect();
                for learner in learners {
                    let keep_old =
                        store.enrolled_elsewhere_under(learner, &current.title, course_id);
                    store.edit_titles(learner, |titles| {
                        let has_new = titles.contains(title);
                        if keep_old {
                            if !has_new {
                                titles.push(title.clone());
                            }
                        } else if has_new {
                            titles.retain(|t| *t != current.title);
                        } else {
                            for t in titles.iter_mut().filter(|t| **t == current.title) {
                                *t = title.clone();
                            }
                        }
                        true
                    })?;
                }
            }

            let course = store.course_mut(course_id)?;
            if let Some(title) = renamed {
                course.title = title;
            }
            if let Some(description) = &changes.description {
                course.description = description.clone();
            }
            if let Some(level) = changes.level {
                course.level = level;
            }
            if let Some(category) = changes.category {
                course.category = category;
            }
            if let Some(hours) = changes.estimated_duration {
                course.estimated_duration = hours;
            }
            if let Some(is_public) = changes.is_public {
                course.is_public = is_public;
            }
            course.updated_at = Utc::now();
            Ok(course.clone())
        })
        .await
    }

    async fn deactivate_course(&self, course_id: Uuid) -> PortResult<Course> {
        self.transaction(|store| {
            let course = store.course_mut(course_id)?;
            course.is_active = false;
            course.updated_at = Utc::now();
            Ok(course.clone())
        })
        .await
    }

    async fn recompute_projects_count(&self, course_id: Uuid) -> PortResult<RecountOutcome> {
        self.transaction(|store| store.recount(course_id)).await
    }

    async fn insert_project(&self, project: &NewProject) -> PortResult<Project> {
        self.transaction(|store| {
            store.course(project.course_id)?;
            store.check_project_title(project.course_id, &project.title, None)?;
            let order = match project.order {
                Some(order) => order,
                None => {
                    store
                        .projects
                        .iter()
                        .filter(|p| p.course_id == project.course_id)
                        .map(|p| p.order)
                        .max()
                        .unwrap_or(0)
                        + 1
                }
            };
            let now = Utc::now();
            let record = Project {
                id: Uuid::new_v4(),
                course_id: project.course_id,
                title: project.title.clone(),
                description: project.description.clone(),
                requirements: project.requirements.clone(),
                objectives: project.objectives.clone(),
                resources: project.resources.clone(),
                estimated_time: project.estimated_time,
                level: project.level,
                language: project.language,
                order,
                is_active: true,
                created_at: now,
                updated_at: now,
            };
            store.projects.push(record.clone());
            store.recount(project.course_id)?;
            Ok(record)
        })
        .await
    }

    async fn get_project(&self, project_id: Uuid) -> PortResult<Project> {
        self.read(|store| {
            store
                .projects
                .iter()
                .find(|p| p.id == project_id)
                .cloned()
                .ok_or_else(|| PortError::NotFound(format!("Project {project_id} not found")))
        })
        .await
    }

    async fn list_projects(&self, filter: ProjectFilter) -> PortResult<Vec<Project>> {
        self.read(|store| {
            let visible = |course_id: Uuid| {
                !filter.public_courses_only
                    || store
                        .course(course_id)
                        .map(|c| c.is_active && c.is_public)
                        .unwrap_or(false)
            };
            let mut projects: Vec<Project> = store
                .projects
                .iter()
                .filter(|p| p.is_active)
                .filter(|p| filter.course_id.map_or(true, |id| p.course_id == id))
                .filter(|p| visible(p.course_id))
                .cloned()
                .collect();
            projects.sort_by_key(|p| (p.course_id, p.order));
            Ok(projects)
        })
        .await
    }

    async fn active_project_title_exists(
        &self,
        course_id: Uuid,
        title: &str,
        excluding: Option<Uuid>,
    ) -> PortResult<bool> {
        self.read(|store| {
            Ok(store
                .check_project_title(course_id, title, excluding)
                .is_err())
        })
        .await
    }

    async fn update_project(
        &self,
        project_id: Uuid,
        changes: &ProjectChanges,
    ) -> PortResult<Project> {
        self.transaction(|store| {
            let course_id = store.project_mut(project_id)?.course_id;
            if let Some(title) = &changes.title {
                store.check_project_title(course_id, title, Some(project_id))?;
            }
            let project = store.project_mut(project_id)?;
            if let Some(title) = &changes.title {
                project.title = title.clone();
            }
            if let Some(description) = &changes.description {
                project.description = description.clone();
            }
            if let Some(requirements) = &changes.requirements {
                project.requirements = requirements.clone();
            }
            if let Some(objectives) = &changes.objectives {
                project.objectives = objectives.clone();
            }
            if let Some(resources) = &changes.resources {
                project.resources = resources.clone();
            }
            if let Some(hours) = changes.estimated_time {
                project.estimated_time = hours;
            }
            if let Some(level) = changes.level {
                project.level = level;
            }
            if let Some(language) = changes.language {
                project.language = language;
            }
            if let Some(order) = changes.order {
                project.order = order;
            }
            project.updated_at = Utc::now();
            Ok(project.clone())
        })
        .await
    }

    async fn delete_project(&self, project_id: Uuid) -> PortResult<RecountOutcome> {
        self.transaction(|store| {
            let course_id = store.project_mut(project_id)?.course_id;
            store.projects.retain(|p| p.id != project_id);
            store.recount(course_id)
        })
        .await
    }

    async fn enroll_learner(&self, user_id: Uuid, course_id: Uuid) -> PortResult<()> {
        self.transaction(|store| {
            let title = store.course(course_id)?.title.clone();
            if !store.enrollments.insert((user_id, course_id)) {
                return Err(PortError::UniqueViolation(Constraint::Enrollment));
            }
            store.edit_titles(user_id, |titles| {
                if titles.contains(&title) {
                    return false;
                }
                titles.push(title);
                true
            })?;
            Ok(())
        })
        .await
    }

    async fn unenroll_learner(&self, user_id: Uuid, course_id: Uuid) -> PortResult<bool> {
        self.transaction(|store| {
            let title = store.course(course_id)?.title.clone();
            if !store.enrollments.remove(&(user_id, course_id)) {
                return Ok(false);
            }
            if store.enrolled_elsewhere_under(user_id, &title, course_id) {
                return Ok(true);
            }
            store.edit_titles(user_id, |titles| {
                titles.retain(|t| *t != title);
                true
            })?;
            Ok(true)
        })
        .await
    }

    async fn is_enrolled(&self, user_id: Uuid, course_id: Uuid) -> PortResult<bool> {
        self.read(|store| Ok(store.enrollments.contains(&(user_id, course_id))))
            .await
    }

    async fn enrolled_learner_emails(&self, course_id: Uuid) -> PortResult<Vec<String>> {
        self.read(|store| {
            let mut emails: Vec<String> = store
                .users
                .iter()
                .filter(|u| store.enrollments.contains(&(u.user.user_id, course_id)))
                .map(|u| u.user.email.clone())
                .collect();
            emails.sort();
            Ok(emails)
        })
        .await
    }

    async fn courses_for_learner(&self, user_id: Uuid) -> PortResult<Vec<Course>> {
        self.read(|store| {
            Ok(store
                .courses
                .iter()
                .rev()
                .filter(|c| c.is_active && store.enrollments.contains(&(user_id, c.id)))
                .cloned()
                .collect())
        })
        .await
    }
}

/// Stores passwords behind a fixed prefix instead of hashing them.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextHasher;

impl PasswordHasher for PlainTextHasher {
    fn hash(&self, password: &str) -> PortResult<String> {
        Ok(format!("plain${password}"))
    }

    fn verify(&self, password: &str, hashed: &str) -> PortResult<bool> {
        Ok(hashed.strip_prefix("plain$") == Some(password))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::{InMemoryDatabase, PlainTextHasher};
    use crate::domain::{
        Category, Level, NewCourse, NewProject, Principal, ProgrammingLanguage, Role,
    };
    use crate::ports::{DatabaseService, PasswordHasher};
    use crate::{AccountDirectory, CourseCatalog, EnrollmentWorkflow, ProjectCatalog};
    use std::sync::Arc;
    use uuid::Uuid;

    pub const PASSWORD: &str = "correct horse battery";

    /// Every service wired to one shared in-memory store.
    pub struct Harness {
        pub db: Arc<InMemoryDatabase>,
        pub accounts: AccountDirectory,
        pub courses: CourseCatalog,
        pub projects: ProjectCatalog,
        pub enrollment: EnrollmentWorkflow,
    }

    impl Harness {
        pub fn new() -> Self {
            let db = Arc::new(InMemoryDatabase::new());
            Self {
                accounts: AccountDirectory::new(db.clone(), Arc::new(PlainTextHasher)),
                courses: CourseCatalog::new(db.clone()),
                projects: ProjectCatalog::new(db.clone()),
                enrollment: EnrollmentWorkflow::new(db.clone()),
                db,
            }
        }

        /// Provisions an admin straight through the store, bypassing the
        /// bootstrap rule of `register_admin`.
        pub async fn admin(&self, email: &str) -> Principal {
            let hashed = PlainTextHasher.hash(PASSWORD).unwrap();
            self.db
                .create_user(email, &hashed, Role::Admin)
                .await
                .unwrap()
                .principal()
        }

        pub async fn learner(&self, email: &str) -> Principal {
            self.accounts
                .register_learner(email, PASSWORD, PASSWORD)
                .await
                .unwrap()
                .principal()
        }
    }

    pub fn course(title: &str) -> NewCourse {
        NewCourse {
            title: title.to_string(),
            description: "Hands-on track covering the fundamentals".to_string(),
            level: Level::Beginner,
            category: Category::Web,
            estimated_duration: 40,
            is_public: true,
        }
    }

    pub fn project(course_id: Uuid, title: &str) -> NewProject {
        NewProject {
            course_id,
            title: title.to_string(),
            description: "Build it end to end and ship it".to_string(),
            requirements: String::new(),
            objectives: String::new(),
            resources: String::new(),
            estimated_time: 5,
            level: Level::Beginner,
            language: ProgrammingLanguage::Javascript,
            order: None,
        }
    }
}
