/// JWT Claims structure
///
/// Payload shared by access and refresh tokens. The two classes differ only
/// in signing secret and lifetime.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::auth::jwt::TokenError;

/// Token class; selects the signing secret and lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Access,
    Refresh,
}

impl fmt::Display for TokenClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenClass::Access => write!(f, "access"),
            TokenClass::Refresh => write!(f, "refresh"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (account ID as UUID string)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Unique token ID; keeps tokens minted in the same second distinct
    pub jti: String,
}

impl Claims {
    pub fn new(subject_id: Uuid, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: subject_id.to_string(),
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Extract the subject identifier
    pub fn subject_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::Malformed)
    }
}
