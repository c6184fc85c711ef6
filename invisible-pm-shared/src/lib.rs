//! # Invisible PM Shared Library
//!
//! This crate contains shared types, persistence, and business logic used by
//! the Invisible PM API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their SQL operations
//! - `auth`: Authentication, session context, and role-based permissions
//! - `budget`: Budget/cost aggregation over snapshotted time entries
//! - `calendar`: Microsoft Graph calendar integration
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod budget;
pub mod calendar;
pub mod db;
pub mod models;

/// Current version of the Invisible PM shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
