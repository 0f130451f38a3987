/// HTTP middleware
///
/// - `auth`: Bearer token parsing and account loading
/// - `rate_limit`: per-IP token bucket over the whole API surface
/// - `security`: response security headers

pub mod auth;
pub mod rate_limit;
pub mod security;
