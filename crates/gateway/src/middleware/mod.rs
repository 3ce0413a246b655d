//! Middleware for authentication.

mod auth;

pub use auth::{auth_middleware, issue_token, require_admin, verify_token, Claims, CurrentUser};
