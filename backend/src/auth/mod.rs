//! Authentication module
//!
//! Provides JWT-based authentication with argon2 password hashing.

mod jwt;
mod middleware;
mod password;

pub use jwt::{Claims, JwtService, TokenError, TokenKind, TokenLifetimes, TokenSubject};
pub use middleware::{authenticate, extract_token, require_auth, AuthUser};
pub use password::PasswordService;
