/// Authentication module
///
/// Token signing/verification, password hashing, and the session lifecycle
/// (login, refresh-token rotation, logout).

mod claims;
mod jwt;
mod password;
mod session;

pub use claims::{Claims, TokenClass};
pub use jwt::{TokenCodec, TokenError};
pub use password::{hash_password, hash_password_blocking, verify_password_blocking};
pub use session::{SessionManager, TokenPair};
