//! Authentication
//!
//! JWT access tokens, argon2 password hashing, cache-backed rotating
//! refresh tokens, and the axum middleware enforcing them.

mod jwt;
mod middleware;
pub mod password;
mod refresh;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use middleware::{require_auth, require_role};
pub use refresh::{RefreshTokenRecord, RefreshTokenStore};
