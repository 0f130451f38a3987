//! # Cosmic DevSpace API Server
//!
//! REST API for the Cosmic DevSpace portfolio site: project gallery,
//! guestbook with moderation, contact form, user accounts with role-based
//! access control, lightweight analytics, and an SSE live feed. Also serves
//! the static frontend with SPA fallback.

pub mod app;
pub mod config;
pub mod error;
pub mod live;
pub mod middleware;
pub mod routes;
