/// Authentication and authorization
///
/// - `jwt`: access/refresh token creation and validation (HS256)
/// - `password`: Argon2id hashing and password strength rules
/// - `middleware`: the `AuthContext` injected into request extensions
/// - `authorization`: role checks used by route handlers

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
