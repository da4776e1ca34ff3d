/// JWT Token Generation and Validation
///
/// `TokenCodec` signs and verifies both token classes. Each class has its own
/// HS256 secret and lifetime, so a token can only verify as the class it was
/// issued for. Verification has no side effects and needs no locking.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::fmt;
use uuid::Uuid;

use crate::auth::claims::{Claims, TokenClass};
use crate::configuration::JwtSettings;

/// Why a token failed to verify
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Not a parseable token or payload
    Malformed,
    /// Signature does not match (tampered, other class, foreign issuer)
    InvalidSignature,
    /// Past its `exp`
    Expired,
    /// Signing failed while issuing
    Encoding(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Malformed => write!(f, "token is malformed"),
            TokenError::InvalidSignature => write!(f, "token signature is invalid"),
            TokenError::Expired => write!(f, "token has expired"),
            TokenError::Encoding(msg) => write!(f, "token encoding failed: {}", msg),
        }
    }
}

impl std::error::Error for TokenError {}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidIssuer => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        }
    }
}

#[derive(Clone)]
struct ClassKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry_seconds: i64,
}

impl ClassKeys {
    fn new(secret: &str, expiry_seconds: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        }
    }
}

#[derive(Clone)]
pub struct TokenCodec {
    access: ClassKeys,
    refresh: ClassKeys,
    issuer: String,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(config: &JwtSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // `exp` is exact: valid while now <= exp
        validation.leeway = 0;
        validation.set_issuer(&[&config.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        Self {
            access: ClassKeys::new(&config.access_token_secret, config.access_token_expiry),
            refresh: ClassKeys::new(&config.refresh_token_secret, config.refresh_token_expiry),
            issuer: config.issuer.clone(),
            validation,
        }
    }

    fn keys(&self, class: TokenClass) -> &ClassKeys {
        match class {
            TokenClass::Access => &self.access,
            TokenClass::Refresh => &self.refresh,
        }
    }

    /// Lifetime of a freshly issued token of this class, in seconds
    pub fn expiry_seconds(&self, class: TokenClass) -> i64 {
        self.keys(class).expiry_seconds
    }

    /// Issue a signed token for `subject_id`
    pub fn issue(&self, subject_id: Uuid, class: TokenClass) -> Result<String, TokenError> {
        let keys = self.keys(class);
        let claims = Claims::new(subject_id, keys.expiry_seconds, self.issuer.clone());

        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify signature, issuer and expiry and return the full claims
    pub fn decode(&self, token: &str, class: TokenClass) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.keys(class).decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let err = TokenError::from(e);
                tracing::debug!(token_class = %class, error = %err, "JWT validation failed");
                err
            })
    }

    /// Verify a token and return its subject identifier
    pub fn verify(&self, token: &str, class: TokenClass) -> Result<Uuid, TokenError> {
        self.decode(token, class)?.subject_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_config() -> JwtSettings {
        JwtSettings {
            access_token_secret: "test-access-secret-at-least-32-characters".to_string(),
            access_token_expiry: 3600,
            refresh_token_secret: "test-refresh-secret-at-least-32-characters".to_string(),
            refresh_token_expiry: 604800,
            issuer: "test".to_string(),
        }
    }

    #[test]
    fn test_issue_and_verify_both_classes() {
        let codec = TokenCodec::new(&get_test_config());
        let subject_id = Uuid::new_v4();

        for class in [TokenClass::Access, TokenClass::Refresh] {
            let token = codec.issue(subject_id, class).expect("Failed to issue token");
            let verified = codec.verify(&token, class).expect("Failed to verify token");
            assert_eq!(verified, subject_id);
        }
    }

    #[test]
    fn test_class_lifetimes() {
        let codec = TokenCodec::new(&get_test_config());
        let token = codec.issue(Uuid::new_v4(), TokenClass::Refresh).unwrap();
        let claims = codec.decode(&token, TokenClass::Refresh).unwrap();

        assert_eq!(claims.exp - claims.iat, 604800);
        assert_eq!(codec.expiry_seconds(TokenClass::Access), 3600);
    }

    #[test]
    fn test_expired_token_both_classes() {
        let mut config = get_test_config();
        config.access_token_expiry = -10;
        config.refresh_token_expiry = -10;
        let codec = TokenCodec::new(&config);

        for class in [TokenClass::Access, TokenClass::Refresh] {
            let token = codec.issue(Uuid::new_v4(), class).unwrap();
            assert_eq!(codec.verify(&token, class), Err(TokenError::Expired));
        }
    }

    #[test]
    fn test_access_token_does_not_verify_as_refresh() {
        let codec = TokenCodec::new(&get_test_config());
        let subject_id = Uuid::new_v4();

        let access = codec.issue(subject_id, TokenClass::Access).unwrap();
        let refresh = codec.issue(subject_id, TokenClass::Refresh).unwrap();

        assert_eq!(
            codec.verify(&access, TokenClass::Refresh),
            Err(TokenError::InvalidSignature)
        );
        assert_eq!(
            codec.verify(&refresh, TokenClass::Access),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_foreign_secret_is_invalid_signature() {
        let codec = TokenCodec::new(&get_test_config());
        let mut other_config = get_test_config();
        other_config.refresh_token_secret = "some-other-deployment-secret-value".to_string();
        let other = TokenCodec::new(&other_config);

        let token = other.issue(Uuid::new_v4(), TokenClass::Refresh).unwrap();
        assert_eq!(
            codec.verify(&token, TokenClass::Refresh),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_tampered_token() {
        let codec = TokenCodec::new(&get_test_config());
        let token = codec.issue(Uuid::new_v4(), TokenClass::Access).unwrap();

        let tampered = format!("{}X", token);
        assert!(codec.verify(&tampered, TokenClass::Access).is_err());
    }

    #[test]
    fn test_malformed_token() {
        let codec = TokenCodec::new(&get_test_config());

        assert_eq!(
            codec.verify("invalid.token.here", TokenClass::Access),
            Err(TokenError::Malformed)
        );
        assert_eq!(
            codec.verify("not-a-jwt", TokenClass::Refresh),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn test_wrong_issuer() {
        let codec = TokenCodec::new(&get_test_config());
        let mut config = get_test_config();
        config.issuer = "wrong-issuer".to_string();
        let other = TokenCodec::new(&config);

        let token = codec.issue(Uuid::new_v4(), TokenClass::Access).unwrap();
        assert_eq!(
            other.verify(&token, TokenClass::Access),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_tokens_for_same_subject_differ() {
        let codec = TokenCodec::new(&get_test_config());
        let subject_id = Uuid::new_v4();

        let first = codec.issue(subject_id, TokenClass::Refresh).unwrap();
        let second = codec.issue(subject_id, TokenClass::Refresh).unwrap();
        assert_ne!(first, second);
    }
}
