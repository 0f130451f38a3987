//! # Cosmic DevSpace Shared Library
//!
//! Shared types and business logic used by the Cosmic DevSpace API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their CRUD operations
//! - `auth`: JWT tokens, password hashing, and authorization helpers
//! - `db`: Connection pool and migration runner
//! - `spam`: Heuristic spam scoring for guestbook submissions

pub mod auth;
pub mod db;
pub mod models;
pub mod spam;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
