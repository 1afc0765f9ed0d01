//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use learning_core::{
    AccountDirectory, CourseCatalog, DatabaseService, EnrollmentWorkflow, PasswordHasher,
    ProjectCatalog,
};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub accounts: AccountDirectory,
    pub courses: CourseCatalog,
    pub projects: ProjectCatalog,
    pub enrollment: EnrollmentWorkflow,
}

impl AppState {
    /// Wires every domain service to the same store.
    pub fn new(
        db: Arc<dyn DatabaseService>,
        hasher: Arc<dyn PasswordHasher>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            accounts: AccountDirectory::new(db.clone(), hasher),
            courses: CourseCatalog::new(db.clone()),
            projects: ProjectCatalog::new(db.clone()),
            enrollment: EnrollmentWorkflow::new(db),
            config,
        }
    }
}
