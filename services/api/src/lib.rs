//! services/api/src/lib.rs
//!
//! The driving and driven adapters of the learning platform: the Postgres
//! store, the Argon2 hasher and the axum HTTP surface.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
