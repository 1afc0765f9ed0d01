//! The single authorization policy every domain operation goes through.

use crate::domain::{Course, Principal};
use crate::error::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ViewCourse,
    CreateCourse,
    UpdateCourse,
    DeleteCourse,
    RecountCourse,
    ViewEnrolledLearners,
    ViewProject,
    CreateProject,
    UpdateProject,
    DeleteProject,
    StartProject,
    JoinCourse,
    LeaveCourse,
    ViewOwnEnrollments,
    ViewDashboard,
    ManageAccounts,
}

/// The record an action targets, when the decision depends on it.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    None,
    Course(&'a Course),
}

/// Decides whether `principal` may perform `action` on `resource`.
///
/// Any admin may manage any course or project, not only the instructor who
/// created it. Learners see public courses only.
pub fn authorize(
    principal: &Principal,
    action: Action,
    resource: Resource<'_>,
) -> DomainResult<()> {
    use Action::*;

    let allowed = match action {
        CreateCourse | UpdateCourse | DeleteCourse | RecountCourse | ViewEnrolledLearners
        | CreateProject | UpdateProject | DeleteProject | ManageAccounts => principal.is_admin(),
        JoinCourse | LeaveCourse | ViewOwnEnrollments | StartProject | ViewDashboard => {
            principal.is_learner()
        }
        ViewCourse | ViewProject => match resource {
            _ if principal.is_admin() => true,
            Resource::Course(course) => course.is_public,
            Resource::None => true,
        },
    };

    if allowed {
        Ok(())
    } else {
        Err(DomainError::not_authorized(denial_message(action)))
    }
}

fn denial_message(action: Action) -> &'static str {
    use Action::*;

    match action {
        CreateCourse => "only admins can create courses",
        UpdateCourse => "only admins can edit courses",
        DeleteCourse => "only admins can delete courses",
        RecountCourse => "only admins can recount courses",
        ViewEnrolledLearners => "only admins can list enrolled learners",
        CreateProject => "only admins can create projects",
        UpdateProject => "only admins can edit projects",
        DeleteProject => "only admins can delete projects",
        ManageAccounts => "only admins can manage accounts",
        JoinCourse => "only learners can join courses",
        LeaveCourse => "only learners can leave courses",
        StartProject => "only learners can start projects",
        ViewOwnEnrollments => "only learners have enrolled courses",
        ViewDashboard => "the dashboard is for learners only",
        ViewCourse | ViewProject => "this course is not public",
    }
}
