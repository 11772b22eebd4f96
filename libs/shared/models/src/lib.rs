pub mod auth;
pub mod error;

pub use auth::{AuthUser, JwtClaims, JwtHeader, UserRole};
pub use error::AppError;
