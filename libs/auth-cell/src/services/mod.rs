// libs/auth-cell/src/services/mod.rs
pub mod auth;
pub mod password;

pub use auth::AuthService;
pub use password::PasswordService;
