//! crates/learning_core/src/accounts.rs
//!
//! The Account Directory: registration, login sessions, admin provisioning and
//! the learner's enrolled-title list.

use crate::dashboard::{self, Dashboard, LearningProgress};
use crate::domain::{AuthSession, EnrollmentSummary, Principal, Role, User};
use crate::error::{DomainError, DomainResult};
use crate::policy::{authorize, Action, Resource};
use crate::ports::{Constraint, DatabaseService, PasswordHasher, PortError};
use crate::validation;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct AccountDirectory {
    db: Arc<dyn DatabaseService>,
    hasher: Arc<dyn PasswordHasher>,
}

impl AccountDirectory {
    pub fn new(db: Arc<dyn DatabaseService>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { db, hasher }
    }

    async fn load_user(&self, user_id: Uuid) -> DomainResult<User> {
        match self.db.get_user_by_id(user_id).await {
            Ok(user) => Ok(user),
            Err(PortError::NotFound(_)) => Err(DomainError::UserNotFound(user_id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        confirmation: &str,
        role: Role,
    ) -> DomainResult<User> {
        let email = validation::normalize_email(email)?;
        validation::check_password(password, confirmation, &email)?;

        match self.db.get_user_by_email(&email).await {
            Ok(_) => return Err(DomainError::DuplicateEmail(email)),
            Err(PortError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let hashed = self.hasher.hash(password)?;
        let user = match self.db.create_user(&email, &hashed, role).await {
            Ok(user) => user,
            Err(PortError::UniqueViolation(Constraint::UserEmail)) => {
                return Err(DomainError::DuplicateEmail(email))
            }
            Err(e) => return Err(e.into()),
        };

        info!(user_id = %user.user_id, role = %role, "Registered account");
        Ok(user)
    }

    pub async fn register_learner(
        &self,
        email: &str,
        password: &str,
        confirmation: &str,
    ) -> DomainResult<User> {
        self.register(email, password, confirmation, Role::Learner).await
    }

    /// Admin provisioning. Open to anyone while no admin exists; afterwards
    /// only an admin may create another.
    pub async fn register_admin(
        &self,
        caller: Option<&Principal>,
        email: &str,
        password: &str,
        confirmation: &str,
    ) -> DomainResult<User> {
        let permitted = match caller {
            Some(principal) => authorize(principal, Action::ManageAccounts, Resource::None),
            None => Err(DomainError::not_authorized("only admins can manage accounts")),
        };
        if let Err(denied) = permitted {
            if self.db.count_admins().await? > 0 {
                return Err(denied);
            }
            info!("No admin exists yet; bootstrapping the first one");
        }
        self.register(email, password, confirmation, Role::Admin).await
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> DomainResult<Principal> {
        let email =
            validation::normalize_email(email).map_err(|_| DomainError::InvalidCredentials)?;
        let creds = match self.db.get_user_by_email(&email).await {
            Ok(creds) => creds,
            Err(PortError::NotFound(_)) => return Err(DomainError::InvalidCredentials),
            Err(e) => return Err(e.into()),
        };

        if !self.hasher.verify(password, &creds.hashed_password)? {
            warn!(user_id = %creds.user_id, "Rejected login with a wrong password");
            return Err(DomainError::InvalidCredentials);
        }
        if !creds.is_active {
            return Err(DomainError::AccountDisabled);
        }

        Ok(Principal {
            user_id: creds.user_id,
            email: creds.email,
            role: creds.role,
        })
    }

    pub async fn open_session(
        &self,
        principal: &Principal,
        ttl: Duration,
    ) -> DomainResult<AuthSession> {
        let session = AuthSession {
            id: Uuid::new_v4().to_string(),
            user_id: principal.user_id,
            expires_at: Utc::now() + ttl,
        };
        self.db
            .create_auth_session(&session.id, session.user_id, session.expires_at)
            .await?;
        Ok(session)
    }

    /// Maps a session id back to its principal. Unknown or expired sessions
    /// are reported as `InvalidCredentials`.
    pub async fn resolve_session(&self, session_id: &str) -> DomainResult<Principal> {
        let user_id = match self.db.validate_auth_session(session_id).await {
            Ok(user_id) => user_id,
            Err(PortError::NotFound(_)) => return Err(DomainError::InvalidCredentials),
            Err(e) => return Err(e.into()),
        };
        let user = self.load_user(user_id).await?;
        if !user.is_active {
            return Err(DomainError::AccountDisabled);
        }
        Ok(user.principal())
    }

    pub async fn close_session(&self, session_id: &str) -> DomainResult<()> {
        self.db.delete_auth_session(session_id).await?;
        Ok(())
    }

    pub async fn profile(&self, principal: &Principal) -> DomainResult<User> {
        self.load_user(principal.user_id).await
    }

    /// Changes the caller's email. The new address must not belong to another
    /// account; keeping one's own address is a no-op.
    pub async fn update_profile(&self, principal: &Principal, email: &str) -> DomainResult<User> {
        let email = validation::normalize_email(email)?;
        let current = self.load_user(principal.user_id).await?;
        if current.email == email {
            return Ok(current);
        }

        match self.db.get_user_by_email(&email).await {
            Ok(other) if other.user_id != principal.user_id => {
                return Err(DomainError::DuplicateEmail(email))
            }
            Ok(_) | Err(PortError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let user = match self.db.update_user_email(principal.user_id, &email).await {
            Ok(user) => user,
            Err(PortError::UniqueViolation(Constraint::UserEmail)) => {
                return Err(DomainError::DuplicateEmail(email))
            }
            Err(PortError::NotFound(_)) => {
                return Err(DomainError::UserNotFound(principal.user_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        info!(user_id = %user.user_id, "Updated account email");
        Ok(user)
    }

    /// Adds `title` to a learner's list. Already present is not an error.
    pub async fn add_enrollment(&self, user_id: Uuid, title: &str) -> DomainResult<bool> {
        let user = self.load_user(user_id).await?;
        if !user.is_learner() {
            return Err(DomainError::not_authorized("only learners carry enrollments"));
        }
        Ok(self.db.add_enrolled_title(user_id, title).await?)
    }

    /// Removes `title` from a learner's list. Already absent is not an error.
    pub async fn remove_enrollment(&self, user_id: Uuid, title: &str) -> DomainResult<bool> {
        let user = self.load_user(user_id).await?;
        if !user.is_learner() {
            return Err(DomainError::not_authorized("only learners carry enrollments"));
        }
        Ok(self.db.remove_enrolled_title(user_id, title).await?)
    }

    /// `None` for admins.
    pub async fn enrollment_summary(
        &self,
        user_id: Uuid,
    ) -> DomainResult<Option<EnrollmentSummary>> {
        Ok(self.load_user(user_id).await?.enrollment_summary())
    }

    pub async fn promote_to_admin(&self, admin: &Principal, user_id: Uuid) -> DomainResult<User> {
        authorize(admin, Action::ManageAccounts, Resource::None)?;
        let user = self.load_user(user_id).await?;
        if user.is_admin() {
            return Ok(user);
        }
        let promoted = self.db.promote_to_admin(user_id).await?;
        info!(user_id = %user_id, by = %admin.user_id, "Promoted learner to admin");
        Ok(promoted)
    }

    pub async fn set_account_active(
        &self,
        admin: &Principal,
        user_id: Uuid,
        active: bool,
    ) -> DomainResult<User> {
        authorize(admin, Action::ManageAccounts, Resource::None)?;
        if !active && admin.user_id == user_id {
            return Err(DomainError::validation(
                "user_id",
                "admins cannot deactivate their own account",
            ));
        }
        self.load_user(user_id).await?;
        let user = self.db.set_user_active(user_id, active).await?;
        info!(user_id = %user_id, active, "Changed account status");
        Ok(user)
    }

    async fn learner_titles(&self, principal: &Principal) -> DomainResult<Vec<String>> {
        authorize(principal, Action::ViewDashboard, Resource::None)?;
        let user = self.load_user(principal.user_id).await?;
        Ok(user.enrolled_titles.unwrap_or_default())
    }

    pub async fn learner_dashboard(&self, principal: &Principal) -> DomainResult<Dashboard> {
        let titles = self.learner_titles(principal).await?;
        Ok(dashboard::dashboard(&titles))
    }

    pub async fn learner_progress(&self, principal: &Principal) -> DomainResult<LearningProgress> {
        let titles = self.learner_titles(principal).await?;
        Ok(dashboard::progress(&titles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::fixtures::{course, Harness, PASSWORD};
    use crate::memory::PlainTextHasher;
    use crate::ports::MockDatabaseService;
    use rstest::rstest;

    #[tokio::test]
    async fn learners_start_with_an_empty_title_list() {
        let h = Harness::new();
        let user = h
            .accounts
            .register_learner("Amira@Example.com", PASSWORD, PASSWORD)
            .await
            .unwrap();
        assert_eq!(user.email, "Amira@example.com");
        assert_eq!(user.enrolled_titles, Some(vec![]));

        let summary = h.accounts.enrollment_summary(user.user_id).await.unwrap().unwrap();
        assert_eq!(summary.count, 0);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let h = Harness::new();
        h.learner("sam@example.com").await;
        let err = h
            .accounts
            .register_learner("sam@EXAMPLE.com", PASSWORD, PASSWORD)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::DuplicateEmail(email) if email == "sam@example.com"));
    }

    #[tokio::test]
    async fn weak_password_is_rejected_before_storage() {
        let h = Harness::new();
        let err = h
            .accounts
            .register_learner("sam@example.com", "12345678", "12345678")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "weak_password");
        assert!(h.db.get_user_by_email("sam@example.com").await.is_err());
    }

    #[tokio::test]
    async fn email_race_surfaces_as_duplicate() {
        let mut db = MockDatabaseService::new();
        db.expect_get_user_by_email()
            .times(1)
            .returning(|email| Err(PortError::NotFound(email.to_string())));
        db.expect_create_user()
            .times(1)
            .returning(|_, _, _| Err(PortError::UniqueViolation(Constraint::UserEmail)));
        let accounts = AccountDirectory::new(Arc::new(db), Arc::new(PlainTextHasher));

        let err = accounts
            .register_learner("late@example.com", PASSWORD, PASSWORD)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::DuplicateEmail(_)));
    }

    #[rstest]
    #[case("ghost@example.com", PASSWORD)]
    #[case("sam@example.com", "not the password")]
    #[case("not-an-email", PASSWORD)]
    #[tokio::test]
    async fn bad_logins_are_invalid_credentials(#[case] email: &str, #[case] password: &str) {
        let h = Harness::new();
        h.learner("sam@example.com").await;
        let err = h.accounts.authenticate(email, password).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidCredentials));
    }

    #[tokio::test]
    async fn sessions_resolve_to_their_principal_until_closed() {
        let h = Harness::new();
        let learner = h.learner("sam@example.com").await;
        let principal = h.accounts.authenticate("sam@example.com", PASSWORD).await.unwrap();
        assert_eq!(principal, learner);

        let session = h.accounts.open_session(&principal, Duration::days(30)).await.unwrap();
        let resolved = h.accounts.resolve_session(&session.id).await.unwrap();
        assert_eq!(resolved, learner);

        h.accounts.close_session(&session.id).await.unwrap();
        let err = h.accounts.resolve_session(&session.id).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidCredentials));
    }

    #[tokio::test]
    async fn expired_sessions_are_rejected() {
        let h = Harness::new();
        let learner = h.learner("sam@example.com").await;
        let session = h.accounts.open_session(&learner, Duration::seconds(-1)).await.unwrap();
        assert!(h.accounts.resolve_session(&session.id).await.is_err());
    }

    #[tokio::test]
    async fn profile_email_can_change_but_not_to_a_taken_one() {
        let h = Harness::new();
        let sam = h.learner("sam@example.com").await;
        h.learner("amira@example.com").await;

        let same = h.accounts.update_profile(&sam, "sam@EXAMPLE.com").await.unwrap();
        assert_eq!(same.email, "sam@example.com");

        let err = h
            .accounts
            .update_profile(&sam, "amira@Example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::DuplicateEmail(email) if email == "amira@example.com"));

        let err = h.accounts.update_profile(&sam, "not-an-email").await.unwrap_err();
        assert_eq!(err.kind(), "validation_failed");

        let moved = h.accounts.update_profile(&sam, " samuel@Example.com ").await.unwrap();
        assert_eq!(moved.email, "samuel@example.com");
        assert!(h.accounts.authenticate("samuel@example.com", PASSWORD).await.is_ok());
        assert!(h.accounts.authenticate("sam@example.com", PASSWORD).await.is_err());
    }

    #[tokio::test]
    async fn profile_email_race_surfaces_as_duplicate() {
        let sam = Principal {
            user_id: Uuid::new_v4(),
            email: "sam@example.com".to_string(),
            role: Role::Learner,
        };
        let stored = User {
            user_id: sam.user_id,
            email: sam.email.clone(),
            role: Role::Learner,
            is_active: true,
            enrolled_titles: Some(vec![]),
            created_at: Utc::now(),
        };
        let mut db = MockDatabaseService::new();
        db.expect_get_user_by_id()
            .times(1)
            .returning(move |_| Ok(stored.clone()));
        db.expect_get_user_by_email()
            .times(1)
            .returning(|email| Err(PortError::NotFound(email.to_string())));
        db.expect_update_user_email()
            .times(1)
            .returning(|_, _| Err(PortError::UniqueViolation(Constraint::UserEmail)));
        let accounts = AccountDirectory::new(Arc::new(db), Arc::new(PlainTextHasher));

        let err = accounts
            .update_profile(&sam, "late@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn enrollment_titles_are_idempotent() {
        let h = Harness::new();
        let learner = h.learner("sam@example.com").await;

        assert!(h.accounts.add_enrollment(learner.user_id, "Intro-Web").await.unwrap());
        assert!(!h.accounts.add_enrollment(learner.user_id, "Intro-Web").await.unwrap());
        let summary = h.accounts.enrollment_summary(learner.user_id).await.unwrap().unwrap();
        assert_eq!(summary.titles, vec!["Intro-Web".to_string()]);

        assert!(h.accounts.remove_enrollment(learner.user_id, "Intro-Web").await.unwrap());
        assert!(!h.accounts.remove_enrollment(learner.user_id, "Intro-Web").await.unwrap());
    }

    #[tokio::test]
    async fn admins_carry_no_enrollments() {
        let h = Harness::new();
        let admin = h.admin("root@example.com").await;
        assert!(h.accounts.enrollment_summary(admin.user_id).await.unwrap().is_none());
        let err = h.accounts.add_enrollment(admin.user_id, "Intro-Web").await.unwrap_err();
        assert_eq!(err.kind(), "not_authorized");
    }

    #[tokio::test]
    async fn first_admin_bootstraps_then_admins_are_invite_only() {
        let h = Harness::new();
        let first = h
            .accounts
            .register_admin(None, "root@example.com", PASSWORD, PASSWORD)
            .await
            .unwrap();
        assert!(first.is_admin());
        assert!(first.enrolled_titles.is_none());

        let err = h
            .accounts
            .register_admin(None, "second@example.com", PASSWORD, PASSWORD)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_authorized");

        let learner = h.learner("sam@example.com").await;
        let err = h
            .accounts
            .register_admin(Some(&learner), "third@example.com", PASSWORD, PASSWORD)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_authorized");

        let second = h
            .accounts
            .register_admin(Some(&first.principal()), "second@example.com", PASSWORD, PASSWORD)
            .await
            .unwrap();
        assert!(second.is_admin());
    }

    #[tokio::test]
    async fn promotion_drops_enrollments() {
        let h = Harness::new();
        let admin = h.admin("root@example.com").await;
        let learner = h.learner("sam@example.com").await;
        let intro = h.courses.create_course(&admin, &course("Intro-Web")).await.unwrap();
        h.enrollment.join_course(&learner, intro.id).await.unwrap();

        let promoted = h.accounts.promote_to_admin(&admin, learner.user_id).await.unwrap();
        assert_eq!(promoted.role, Role::Admin);
        assert!(promoted.enrolled_titles.is_none());
        assert!(!h.db.is_enrolled(learner.user_id, intro.id).await.unwrap());

        let err = h.accounts.promote_to_admin(&learner, admin.user_id).await.unwrap_err();
        assert_eq!(err.kind(), "not_authorized");
    }

    #[tokio::test]
    async fn deactivation_clears_enrollments_and_blocks_login() {
        let h = Harness::new();
        let admin = h.admin("root@example.com").await;
        let learner = h.learner("sam@example.com").await;
        let intro = h.courses.create_course(&admin, &course("Intro-Web")).await.unwrap();
        h.enrollment.join_course(&learner, intro.id).await.unwrap();
        let session = h.accounts.open_session(&learner, Duration::days(1)).await.unwrap();

        let user = h.accounts.set_account_active(&admin, learner.user_id, false).await.unwrap();
        assert!(!user.is_active);
        assert_eq!(user.enrolled_titles, Some(vec![]));
        assert_eq!(h.db.enrollment_rows(intro.id).await, 0);
        assert!(h.accounts.resolve_session(&session.id).await.is_err());

        let err = h.accounts.authenticate("sam@example.com", PASSWORD).await.unwrap_err();
        assert!(matches!(err, DomainError::AccountDisabled));

        h.accounts.set_account_active(&admin, learner.user_id, true).await.unwrap();
        assert!(h.accounts.authenticate("sam@example.com", PASSWORD).await.is_ok());
    }

    #[tokio::test]
    async fn admins_cannot_deactivate_themselves() {
        let h = Harness::new();
        let admin = h.admin("root@example.com").await;
        let err = h
            .accounts
            .set_account_active(&admin, admin.user_id, false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation_failed");
    }

    #[tokio::test]
    async fn dashboard_reflects_enrolled_titles() {
        let h = Harness::new();
        let admin = h.admin("root@example.com").await;
        let learner = h.learner("sam@example.com").await;
        for title in ["Intro-Web", "Data Basics"] {
            let c = h.courses.create_course(&admin, &course(title)).await.unwrap();
            h.enrollment.join_course(&learner, c.id).await.unwrap();
        }

        let board = h.accounts.learner_dashboard(&learner).await.unwrap();
        assert_eq!(board.stats.total_enrolled, 2);
        assert_eq!(board.stats.completed, 1);
        assert_eq!(board.courses[0].title, "Intro-Web");

        let progress = h.accounts.learner_progress(&learner).await.unwrap();
        assert_eq!(progress.overall_progress, 20);
        assert_eq!(progress.achievements.len(), 1);

        let err = h.accounts.learner_dashboard(&admin).await.unwrap_err();
        assert_eq!(err.kind(), "not_authorized");
    }
}
