//! Field-level checks applied before any mutation reaches a store.

use crate::domain::{CourseChanges, NewCourse, NewProject, ProjectChanges};
use crate::error::{DomainError, DomainResult};
use regex::Regex;
use std::sync::OnceLock;

pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MIN_CHARS: usize = 20;
pub const COURSE_DURATION_MAX_HOURS: i32 = 1000;
pub const PROJECT_TIME_MAX_HOURS: i32 = 500;
pub const PASSWORD_MIN_CHARS: usize = 8;
// Shorter local parts match too many passwords by accident.
const LOCAL_PART_MIN_CHARS: usize = 3;

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$";

fn email_regex() -> Option<&'static Regex> {
    static EMAIL_RE: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL_RE.get_or_init(|| Regex::new(EMAIL_PATTERN).ok()).as_ref()
}

/// Trims the address and lower-cases its domain part.
pub fn normalize_email(raw: &str) -> DomainResult<String> {
    let email = raw.trim();
    let valid = email_regex().is_some_and(|re| re.is_match(email));
    if !valid {
        return Err(DomainError::validation("email", "not a valid email address"));
    }
    match email.rsplit_once('@') {
        Some((local, domain)) => Ok(format!("{local}@{}", domain.to_lowercase())),
        None => Err(DomainError::validation("email", "not a valid email address")),
    }
}

pub fn check_password(password: &str, confirmation: &str, email: &str) -> DomainResult<()> {
    if password != confirmation {
        return Err(DomainError::validation("password", "passwords do not match"));
    }
    if password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(DomainError::WeakPassword(format!(
            "must be at least {PASSWORD_MIN_CHARS} characters"
        )));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(DomainError::WeakPassword("must not be entirely numeric".to_string()));
    }
    let local_part = email.split('@').next().unwrap_or_default().to_lowercase();
    if local_part.len() >= LOCAL_PART_MIN_CHARS && password.to_lowercase().contains(&local_part) {
        return Err(DomainError::WeakPassword("too similar to the email address".to_string()));
    }
    Ok(())
}

pub fn title(raw: &str) -> DomainResult<String> {
    let value = raw.trim();
    let chars = value.chars().count();
    if chars == 0 {
        return Err(DomainError::validation("title", "title is required"));
    }
    if chars < TITLE_MIN_CHARS {
        return Err(DomainError::validation(
            "title",
            format!("must be at least {TITLE_MIN_CHARS} characters"),
        ));
    }
    if chars > TITLE_MAX_CHARS {
        return Err(DomainError::validation(
            "title",
            format!("must be at most {TITLE_MAX_CHARS} characters"),
        ));
    }
    Ok(value.to_string())
}

pub fn description(raw: &str) -> DomainResult<String> {
    let value = raw.trim();
    if value.chars().count() < DESCRIPTION_MIN_CHARS {
        return Err(DomainError::validation(
            "description",
            format!("must be at least {DESCRIPTION_MIN_CHARS} characters"),
        ));
    }
    Ok(value.to_string())
}

fn hours(field: &'static str, value: i32, max: i32) -> DomainResult<i32> {
    if value <= 0 {
        return Err(DomainError::validation(field, "must be greater than zero"));
    }
    if value > max {
        return Err(DomainError::validation(
            field,
            format!("must not exceed {max} hours"),
        ));
    }
    Ok(value)
}

pub fn course_duration(value: i32) -> DomainResult<i32> {
    hours("estimated_duration", value, COURSE_DURATION_MAX_HOURS)
}

pub fn project_time(value: i32) -> DomainResult<i32> {
    hours("estimated_time", value, PROJECT_TIME_MAX_HOURS)
}

pub fn project_order(value: i32) -> DomainResult<i32> {
    if value < 1 {
        return Err(DomainError::validation("order", "must be 1 or greater"));
    }
    Ok(value)
}

/// Returns a normalised copy of the course fields.
pub fn new_course(input: &NewCourse) -> DomainResult<NewCourse> {
    Ok(NewCourse {
        title: title(&input.title)?,
        description: description(&input.description)?,
        estimated_duration: course_duration(input.estimated_duration)?,
        ..input.clone()
    })
}

pub fn course_changes(input: &CourseChanges) -> DomainResult<CourseChanges> {
    Ok(CourseChanges {
        title: input.title.as_deref().map(title).transpose()?,
        description: input.description.as_deref().map(description).transpose()?,
        estimated_duration: input.estimated_duration.map(course_duration).transpose()?,
        ..input.clone()
    })
}

pub fn new_project(input: &NewProject) -> DomainResult<NewProject> {
    Ok(NewProject {
        title: title(&input.title)?,
        description: description(&input.description)?,
        requirements: input.requirements.trim().to_string(),
        objectives: input.objectives.trim().to_string(),
        resources: input.resources.trim().to_string(),
        estimated_time: project_time(input.estimated_time)?,
        order: input.order.map(project_order).transpose()?,
        ..input.clone()
    })
}

pub fn project_changes(input: &ProjectChanges) -> DomainResult<ProjectChanges> {
    Ok(ProjectChanges {
        title: input.title.as_deref().map(title).transpose()?,
        description: input.description.as_deref().map(description).transpose()?,
        requirements: input.requirements.as_deref().map(|s| s.trim().to_string()),
        objectives: input.objectives.as_deref().map(|s| s.trim().to_string()),
        resources: input.resources.as_deref().map(|s| s.trim().to_string()),
        estimated_time: input.estimated_time.map(project_time).transpose()?,
        order: input.order.map(project_order).transpose()?,
        ..input.clone()
    })
}
