//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `learning_core` crate. It handles all
//! interactions with the PostgreSQL database using `sqlx`.
//!
//! Multi-row operations run inside one transaction; the parent course row is
//! locked before its project count is recomputed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use learning_core::{
    Constraint, Course, CourseChanges, DatabaseService, NewCourse, NewProject, PortError,
    PortResult, Project, ProjectChanges, ProjectFilter, RecountOutcome, Role, User,
    UserCredentials,
};
use sqlx::{FromRow, PgConnection, PgPool};
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

// Column lists are macros so they can be spliced into `concat!`.
macro_rules! user_columns {
    () => {
        "user_id, email, role, is_active, enrolled_titles, created_at"
    };
}

macro_rules! course_columns {
    () => {
        "id, title, description, level, category, estimated_duration, instructor_id, \
         is_public, is_active, projects_count, created_at, updated_at"
    };
}

macro_rules! project_columns {
    () => {
        "id, course_id, title, description, requirements, objectives, resources, \
         estimated_time, level, language, \"order\", is_active, created_at, updated_at"
    };
}

// True when user `u` has an enrollment other than course `$1` whose course
// is titled `$2`.
macro_rules! enrolled_elsewhere {
    () => {
        "EXISTS (SELECT 1 FROM enrollments e JOIN courses c ON c.id = e.course_id \
         WHERE e.user_id = u.user_id AND e.course_id <> $1 AND c.title = $2)"
    };
}

const UNIQUE_VIOLATION: &str = "23505";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn user_exists(&self, user_id: Uuid) -> PortResult<()> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE user_id = $1)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(map_db_err)?;
        if !exists {
            return Err(PortError::NotFound(format!("User {user_id} not found")));
        }
        Ok(())
    }
}

//=========================================================================================
// Error mapping
//=========================================================================================

fn constraint_named(name: &str) -> Option<Constraint> {
    match name {
        "users_email_key" => Some(Constraint::UserEmail),
        "courses_active_title_key" => Some(Constraint::ActiveCourseTitle),
        "projects_active_title_key" => Some(Constraint::ActiveProjectTitle),
        "enrollments_pkey" => Some(Constraint::Enrollment),
        _ => None,
    }
}

/// Turns driver errors into port errors, keeping the name of any violated
/// uniqueness rule.
fn map_db_err(e: sqlx::Error) -> PortError {
    match &e {
        sqlx::Error::RowNotFound => PortError::NotFound(e.to_string()),
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            match db_err.constraint().and_then(constraint_named) {
                Some(constraint) => PortError::UniqueViolation(constraint),
                None => PortError::Unexpected(e.to_string()),
            }
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

fn parse_column<T>(raw: &str) -> PortResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>()
        .map_err(|e| PortError::Unexpected(format!("Corrupt row: {e}")))
}

fn missing(kind: &str, id: Uuid) -> PortError {
    PortError::NotFound(format!("{kind} {id} not found"))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
    role: String,
    is_active: bool,
    enrolled_titles: Option<Vec<String>>,
    created_at: DateTime<Utc>,
}

impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        Ok(User {
            user_id: self.user_id,
            email: self.email,
            role: parse_column(&self.role)?,
            is_active: self.is_active,
            enrolled_titles: self.enrolled_titles,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
    role: String,
    is_active: bool,
}

impl CredentialsRecord {
    fn to_domain(self) -> PortResult<UserCredentials> {
        Ok(UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
            role: parse_column(&self.role)?,
            is_active: self.is_active,
        })
    }
}

#[derive(FromRow)]
struct CourseRecord {
    id: Uuid,
    title: String,
    description: String,
    level: String,
    category: String,
    estimated_duration: i32,
    instructor_id: Uuid,
    is_public: bool,
    is_active: bool,
    projects_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CourseRecord {
    fn to_domain(self) -> PortResult<Course> {
        Ok(Course {
            id: self.id,
            title: self.title,
            description: self.description,
            level: parse_column(&self.level)?,
            category: parse_column(&self.category)?,
            estimated_duration: self.estimated_duration,
            instructor_id: self.instructor_id,
            is_public: self.is_public,
            is_active: self.is_active,
            projects_count: self.projects_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ProjectRecord {
    id: Uuid,
    course_id: Uuid,
    title: String,
    description: String,
    requirements: String,
    objectives: String,
    resources: String,
    estimated_time: i32,
    level: String,
    language: String,
    order: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProjectRecord {
    fn to_domain(self) -> PortResult<Project> {
        Ok(Project {
            id: self.id,
            course_id: self.course_id,
            title: self.title,
            description: self.description,
            requirements: self.requirements,
            objectives: self.objectives,
            resources: self.resources,
            estimated_time: self.estimated_time,
            level: parse_column(&self.level)?,
            language: parse_column(&self.language)?,
            order: self.order,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn courses_to_domain(records: Vec<CourseRecord>) -> PortResult<Vec<Course>> {
    records.into_iter().map(CourseRecord::to_domain).collect()
}

//=========================================================================================
// Statements shared by several transactions
//=========================================================================================

/// Locks the course row, counts its active projects and writes the count
/// back only when it changed.
async fn recount_in(conn: &mut PgConnection, course_id: Uuid) -> PortResult<RecountOutcome> {
    let cached: Option<i32> =
        sqlx::query_scalar("SELECT projects_count FROM courses WHERE id = $1 FOR UPDATE")
            .bind(course_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_db_err)?;
    let cached = cached.ok_or_else(|| missing("Course", course_id))?;

    let active: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE course_id = $1 AND is_active")
            .bind(course_id)
            .fetch_one(&mut *conn)
            .await
            .map_err(map_db_err)?;
    let active = i32::try_from(active)
        .map_err(|_| PortError::Unexpected(format!("Project count overflow for {course_id}")))?;

    let changed = cached != active;
    if changed {
        sqlx::query("UPDATE courses SET projects_count = $2, updated_at = NOW() WHERE id = $1")
            .bind(course_id)
            .bind(active)
            .execute(&mut *conn)
            .await
            .map_err(map_db_err)?;
    }

    Ok(RecountOutcome {
        course_id,
        projects_count: active,
        changed,
    })
}

async fn course_title_in(conn: &mut PgConnection, course_id: Uuid) -> PortResult<String> {
    let title: Option<String> = sqlx::query_scalar("SELECT title FROM courses WHERE id = $1")
        .bind(course_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_db_err)?;
    title.ok_or_else(|| missing("Course", course_id))
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    // --- Accounts ---

    async fn create_user(
        &self,
        email: &str,
        hashed_password: &str,
        role: Role,
    ) -> PortResult<User> {
        let titles: Option<Vec<String>> = (role == Role::Learner).then(Vec::new);
        let record = sqlx::query_as::<_, UserRecord>(concat!(
            "INSERT INTO users (user_id, email, hashed_password, role, enrolled_titles) \
             VALUES ($1, $2, $3, $4, $5) RETURNING ",
            user_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .bind(role.as_str())
        .bind(titles)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;
        record.to_domain()
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        record.ok_or_else(|| missing("User", user_id))?.to_domain()
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password, role, is_active FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        record
            .ok_or_else(|| PortError::NotFound(format!("User {email} not found")))?
            .to_domain()
    }

    async fn count_admins(&self) -> PortResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_err)
    }

    async fn update_user_email(&self, user_id: Uuid, email: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(concat!(
            "UPDATE users SET email = $2 WHERE user_id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(user_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        record.ok_or_else(|| missing("User", user_id))?.to_domain()
    }

    async fn add_enrolled_title(&self, user_id: Uuid, title: &str) -> PortResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET enrolled_titles = array_append(enrolled_titles, $2) \
             WHERE user_id = $1 AND enrolled_titles IS NOT NULL \
             AND NOT ($2 = ANY(enrolled_titles))",
        )
        .bind(user_id)
        .bind(title)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        if result.rows_affected() == 0 {
            self.user_exists(user_id).await?;
            return Ok(false);
        }
        Ok(true)
    }

    async fn remove_enrolled_title(&self, user_id: Uuid, title: &str) -> PortResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET enrolled_titles = array_remove(enrolled_titles, $2) \
             WHERE user_id = $1 AND $2 = ANY(enrolled_titles)",
        )
        .bind(user_id)
        .bind(title)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        if result.rows_affected() == 0 {
            self.user_exists(user_id).await?;
            return Ok(false);
        }
        Ok(true)
    }

    async fn promote_to_admin(&self, user_id: Uuid) -> PortResult<User> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;
        sqlx::query("DELETE FROM enrollments WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;
        let record = sqlx::query_as::<_, UserRecord>(concat!(
            "UPDATE users SET role = 'admin', enrolled_titles = NULL WHERE user_id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_err)?;
        let user = record.ok_or_else(|| missing("User", user_id))?.to_domain()?;
        tx.commit().await.map_err(map_db_err)?;
        Ok(user)
    }

    async fn set_user_active(&self, user_id: Uuid, active: bool) -> PortResult<User> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;
        if !active {
            sqlx::query("DELETE FROM enrollments WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(map_db_err)?;
            sqlx::query("DELETE FROM auth_sessions WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(map_db_err)?;
        }
        let record = sqlx::query_as::<_, UserRecord>(concat!(
            "UPDATE users SET is_active = $2, enrolled_titles = CASE \
             WHEN role = 'learner' AND NOT $2 THEN '{}'::TEXT[] ELSE enrolled_titles END \
             WHERE user_id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(user_id)
        .bind(active)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_err)?;
        let user = record.ok_or_else(|| missing("User", user_id))?.to_domain()?;
        tx.commit().await.map_err(map_db_err)?;
        Ok(user)
    }

    // --- Auth Sessions ---

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        user_id.ok_or_else(|| PortError::NotFound("Auth session not found".to_string()))
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    // --- Courses ---

    async fn insert_course(&self, instructor_id: Uuid, course: &NewCourse) -> PortResult<Course> {
        let record = sqlx::query_as::<_, CourseRecord>(concat!(
            "INSERT INTO courses \
             (id, title, description, level, category, estimated_duration, \
             instructor_id, is_public) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING ",
            course_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(&course.title)
        .bind(&course.description)
        .bind(course.level.as_str())
        .bind(course.category.as_str())
        .bind(course.estimated_duration)
        .bind(instructor_id)
        .bind(course.is_public)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;
        record.to_domain()
    }

    async fn get_course(&self, course_id: Uuid) -> PortResult<Course> {
        let record = sqlx::query_as::<_, CourseRecord>(concat!(
            "SELECT ",
            course_columns!(),
            " FROM courses WHERE id = $1"
        ))
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        record.ok_or_else(|| missing("Course", course_id))?.to_domain()
    }

    async fn list_courses(&self, public_only: bool) -> PortResult<Vec<Course>> {
        let records = sqlx::query_as::<_, CourseRecord>(concat!(
            "SELECT ",
            course_columns!(),
            " FROM courses WHERE is_active AND (is_public OR NOT $1) ORDER BY created_at DESC"
        ))
        .bind(public_only)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        courses_to_domain(records)
    }

    async fn active_course_title_exists(
        &self,
        title: &str,
        excluding: Option<Uuid>,
    ) -> PortResult<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM courses WHERE is_active AND LOWER(title) = LOWER($1) \
             AND ($2::UUID IS NULL OR id <> $2))",
        )
        .bind(title)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)
    }

    async fn update_course(&self, course_id: Uuid, changes: &CourseChanges) -> PortResult<Course> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;
        let current: Option<String> =
            sqlx::query_scalar("SELECT title FROM courses WHERE id = $1 FOR UPDATE")
                .bind(course_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_db_err)?;
        let current = current.ok_or_else(|| missing("Course", course_id))?;

        if let Some(title) = changes.title.as_ref().filter(|t| **t != current) {
            // Learners who still hold the old title through another course
            // keep it and gain the new one.
            sqlx::query(concat!(
                "UPDATE users u SET enrolled_titles = array_append(u.enrolled_titles, $3) \
                 WHERE u.enrolled_titles IS NOT NULL \
                 AND u.user_id IN (SELECT user_id FROM enrollments WHERE course_id = $1) \
                 AND NOT ($3 = ANY(u.enrolled_titles)) AND ",
                enrolled_elsewhere!()
            ))
            .bind(course_id)
            .bind(&current)
            .bind(title)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;
            sqlx::query(concat!(
                "UPDATE users u SET enrolled_titles = CASE \
                 WHEN $3 = ANY(u.enrolled_titles) THEN array_remove(u.enrolled_titles, $2) \
                 ELSE array_replace(u.enrolled_titles, $2, $3) END \
                 WHERE u.enrolled_titles IS NOT NULL \
                 AND u.user_id IN (SELECT user_id FROM enrollments WHERE course_id = $1) \
                 AND NOT ",
                enrolled_elsewhere!()
            ))
            .bind(course_id)
            .bind(&current)
            .bind(title)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;
        }

        let record = sqlx::query_as::<_, CourseRecord>(concat!(
            "UPDATE courses SET \
             title = COALESCE($2, title), \
             description = COALESCE($3, description), \
             level = COALESCE($4, level), \
             category = COALESCE($5, category), \
             estimated_duration = COALESCE($6, estimated_duration), \
             is_public = COALESCE($7, is_public), \
             updated_at = NOW() \
             WHERE id = $1 RETURNING ",
            course_columns!()
        ))
        .bind(course_id)
        .bind(changes.title.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.level.map(|l| l.as_str()))
        .bind(changes.category.map(|c| c.as_str()))
        .bind(changes.estimated_duration)
        .bind(changes.is_public)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_err)?;
        let course = record.to_domain()?;
        tx.commit().await.map_err(map_db_err)?;
        Ok(course)
    }

    async fn deactivate_course(&self, course_id: Uuid) -> PortResult<Course> {
        let record = sqlx::query_as::<_, CourseRecord>(concat!(
            "UPDATE courses SET is_active = FALSE, updated_at = NOW() WHERE id = $1 RETURNING ",
            course_columns!()
        ))
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        record.ok_or_else(|| missing("Course", course_id))?.to_domain()
    }

    async fn recompute_projects_count(&self, course_id: Uuid) -> PortResult<RecountOutcome> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;
        let outcome = recount_in(&mut *tx, course_id).await?;
        tx.commit().await.map_err(map_db_err)?;
        Ok(outcome)
    }

    // --- Projects ---

    async fn insert_project(&self, project: &NewProject) -> PortResult<Project> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM courses WHERE id = $1 FOR UPDATE")
                .bind(project.course_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_db_err)?;
        locked.ok_or_else(|| missing("Course", project.course_id))?;

        let order = match project.order {
            Some(order) => order,
            None => sqlx::query_scalar(
                "SELECT COALESCE(MAX(\"order\"), 0) + 1 FROM projects WHERE course_id = $1",
            )
            .bind(project.course_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_err)?,
        };

        let record = sqlx::query_as::<_, ProjectRecord>(concat!(
            "INSERT INTO projects \
             (id, course_id, title, description, requirements, objectives, resources, \
             estimated_time, level, language, \"order\") \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING ",
            project_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(project.course_id)
        .bind(&project.title)
        .bind(&project.description)
        .bind(&project.requirements)
        .bind(&project.objectives)
        .bind(&project.resources)
        .bind(project.estimated_time)
        .bind(project.level.as_str())
        .bind(project.language.as_str())
        .bind(order)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_err)?;
        let created = record.to_domain()?;

        recount_in(&mut *tx, project.course_id).await?;
        tx.commit().await.map_err(map_db_err)?;
        Ok(created)
    }

    async fn get_project(&self, project_id: Uuid) -> PortResult<Project> {
        let record = sqlx::query_as::<_, ProjectRecord>(concat!(
            "SELECT ",
            project_columns!(),
            " FROM projects WHERE id = $1"
        ))
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        record.ok_or_else(|| missing("Project", project_id))?.to_domain()
    }

    async fn list_projects(&self, filter: ProjectFilter) -> PortResult<Vec<Project>> {
        let records = sqlx::query_as::<_, ProjectRecord>(concat!(
            "SELECT ",
            project_columns!(),
            " FROM projects WHERE is_active \
             AND ($1::UUID IS NULL OR course_id = $1) \
             AND (NOT $2 OR course_id IN (SELECT id FROM courses WHERE is_active AND is_public)) \
             ORDER BY course_id, \"order\""
        ))
        .bind(filter.course_id)
        .bind(filter.public_courses_only)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        records.into_iter().map(ProjectRecord::to_domain).collect()
    }

    async fn active_project_title_exists(
        &self,
        course_id: Uuid,
        title: &str,
        excluding: Option<Uuid>,
    ) -> PortResult<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM projects WHERE is_active AND course_id = $1 \
             AND LOWER(title) = LOWER($2) AND ($3::UUID IS NULL OR id <> $3))",
        )
        .bind(course_id)
        .bind(title)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)
    }

    async fn update_project(
        &self,
        project_id: Uuid,
        changes: &ProjectChanges,
    ) -> PortResult<Project> {
        let record = sqlx::query_as::<_, ProjectRecord>(concat!(
            "UPDATE projects SET \
             title = COALESCE($2, title), \
             description = COALESCE($3, description), \
             requirements = COALESCE($4, requirements), \
             objectives = COALESCE($5, objectives), \
             resources = COALESCE($6, resources), \
             estimated_time = COALESCE($7, estimated_time), \
             level = COALESCE($8, level), \
             language = COALESCE($9, language), \
             \"order\" = COALESCE($10, \"order\"), \
             updated_at = NOW() \
             WHERE id = $1 RETURNING ",
            project_columns!()
        ))
        .bind(project_id)
        .bind(changes.title.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.requirements.as_deref())
        .bind(changes.objectives.as_deref())
        .bind(changes.resources.as_deref())
        .bind(changes.estimated_time)
        .bind(changes.level.map(|l| l.as_str()))
        .bind(changes.language.map(|l| l.as_str()))
        .bind(changes.order)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        record.ok_or_else(|| missing("Project", project_id))?.to_domain()
    }

    async fn delete_project(&self, project_id: Uuid) -> PortResult<RecountOutcome> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;
        let course_id: Option<Uuid> =
            sqlx::query_scalar("DELETE FROM projects WHERE id = $1 RETURNING course_id")
                .bind(project_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_db_err)?;
        let course_id = course_id.ok_or_else(|| missing("Project", project_id))?;
        let outcome = recount_in(&mut *tx, course_id).await?;
        tx.commit().await.map_err(map_db_err)?;
        Ok(outcome)
    }

    // --- Enrollment ---

    async fn enroll_learner(&self, user_id: Uuid, course_id: Uuid) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;
        let title = course_title_in(&mut *tx, course_id).await?;
        sqlx::query("INSERT INTO enrollments (user_id, course_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(course_id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;
        sqlx::query(
            "UPDATE users SET enrolled_titles = array_append(enrolled_titles, $2) \
             WHERE user_id = $1 AND enrolled_titles IS NOT NULL \
             AND NOT ($2 = ANY(enrolled_titles))",
        )
        .bind(user_id)
        .bind(&title)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;
        tx.commit().await.map_err(map_db_err)
    }

    async fn unenroll_learner(&self, user_id: Uuid, course_id: Uuid) -> PortResult<bool> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;
        let title = course_title_in(&mut *tx, course_id).await?;
        let removed = sqlx::query("DELETE FROM enrollments WHERE user_id = $1 AND course_id = $2")
            .bind(user_id)
            .bind(course_id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;
        if removed.rows_affected() == 0 {
            return Ok(false);
        }
        sqlx::query(concat!(
            "UPDATE users u SET enrolled_titles = array_remove(u.enrolled_titles, $2) \
             WHERE u.user_id = $3 AND u.enrolled_titles IS NOT NULL AND NOT ",
            enrolled_elsewhere!()
        ))
        .bind(course_id)
        .bind(&title)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;
        tx.commit().await.map_err(map_db_err)?;
        Ok(true)
    }

    async fn is_enrolled(&self, user_id: Uuid, course_id: Uuid) -> PortResult<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM enrollments WHERE user_id = $1 AND course_id = $2)",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)
    }

    async fn enrolled_learner_emails(&self, course_id: Uuid) -> PortResult<Vec<String>> {
        sqlx::query_scalar(
            "SELECT u.email FROM users u JOIN enrollments e ON e.user_id = u.user_id \
             WHERE e.course_id = $1 ORDER BY u.email",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)
    }

    async fn courses_for_learner(&self, user_id: Uuid) -> PortResult<Vec<Course>> {
        let records = sqlx::query_as::<_, CourseRecord>(concat!(
            "SELECT ",
            course_columns!(),
            " FROM courses WHERE is_active \
             AND id IN (SELECT course_id FROM enrollments WHERE user_id = $1) \
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        courses_to_domain(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("users_email_key", Some(Constraint::UserEmail))]
    #[case("courses_active_title_key", Some(Constraint::ActiveCourseTitle))]
    #[case("projects_active_title_key", Some(Constraint::ActiveProjectTitle))]
    #[case("enrollments_pkey", Some(Constraint::Enrollment))]
    #[case("auth_sessions_pkey", None)]
    fn index_names_map_to_constraints(#[case] name: &str, #[case] expected: Option<Constraint>) {
        assert_eq!(constraint_named(name), expected);
    }

    #[test]
    fn constraint_names_round_trip_through_display() {
        for constraint in [
            Constraint::UserEmail,
            Constraint::ActiveCourseTitle,
            Constraint::ActiveProjectTitle,
            Constraint::Enrollment,
        ] {
            assert_eq!(constraint_named(&constraint.to_string()), Some(constraint));
        }
    }

    #[test]
    fn missing_rows_become_not_found() {
        assert!(matches!(
            map_db_err(sqlx::Error::RowNotFound),
            PortError::NotFound(_)
        ));
    }

    #[test]
    fn corrupt_enum_columns_are_unexpected() {
        let err = parse_column::<Role>("superuser").unwrap_err();
        assert!(matches!(err, PortError::Unexpected(msg) if msg.contains("superuser")));
    }
}
