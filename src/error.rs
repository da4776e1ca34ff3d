/// Application Error Handling
///
/// One error type per concern, a unified `AppError` that handlers return,
/// and the mapping from errors to HTTP responses with structured logging.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Validation errors for request input
#[derive(Debug, Clone)]
pub enum ValidationError {
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
    MissingIdentifier,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is required", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::MissingIdentifier => write!(f, "user_name or email is required"),
        }
    }
}

impl StdError for ValidationError {}

/// Account store errors
#[derive(Debug, Clone)]
pub enum StoreError {
    UniqueConstraintViolation(String),
    QueryExecution(String),
    ConnectionPool(String),
    Unexpected(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::UniqueConstraintViolation(msg) => write!(f, "Duplicate entry: {}", msg),
            StoreError::QueryExecution(msg) => write!(f, "Query error: {}", msg),
            StoreError::ConnectionPool(msg) => write!(f, "Store connection error: {}", msg),
            StoreError::Unexpected(msg) => write!(f, "Store error: {}", msg),
        }
    }
}

impl StdError for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                StoreError::UniqueConstraintViolation(
                    "user name or email already exists".to_string(),
                )
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::ConnectionPool(err.to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) => {
                StoreError::QueryExecution(err.to_string())
            }
            _ => StoreError::Unexpected(err.to_string()),
        }
    }
}

/// Media-hosting service errors
#[derive(Debug, Clone)]
pub enum MediaError {
    EmptyFile(String),
    UploadFailed(String),
    InvalidResponse(String),
    ServiceUnavailable(String),
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::EmptyFile(what) => write!(f, "{} file is missing", what),
            MediaError::UploadFailed(msg) => write!(f, "Upload failed: {}", msg),
            MediaError::InvalidResponse(msg) => write!(f, "Invalid media response: {}", msg),
            MediaError::ServiceUnavailable(msg) => {
                write!(f, "Media service unavailable: {}", msg)
            }
        }
    }
}

impl StdError for MediaError {}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    MissingRequired(String),
    InvalidValue(String),
    ParseError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(msg) => write!(f, "Missing required config: {}", msg),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Config parse error: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

/// Session and credential errors
///
/// Every failure of the session lifecycle maps onto one of these. A refresh
/// that fails for any reason is `Unauthorized` and the client must log in again.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// No account matches the identifier
    NotFound,
    /// Account exists but the password check failed
    InvalidCredentials,
    /// Missing, malformed, expired, forged or superseded token
    Unauthorized(String),
    /// The account store call itself failed
    Upstream(StoreError),
    /// Token signing failed
    TokenIssue(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::NotFound => write!(f, "User does not exist"),
            AuthError::InvalidCredentials => write!(f, "Invalid user credentials"),
            AuthError::Unauthorized(reason) => write!(f, "Unauthorized: {}", reason),
            AuthError::Upstream(e) => write!(f, "{}", e),
            AuthError::TokenIssue(msg) => write!(f, "Token generation failed: {}", msg),
        }
    }
}

impl StdError for AuthError {}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::Upstream(err)
    }
}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

/// Central error type returned by request handlers
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Store(StoreError),
    Media(MediaError),
    Auth(AuthError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Store(e) => write!(f, "{}", e),
            AppError::Media(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        AppError::Media(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

fn store_status(e: &StoreError) -> (StatusCode, &'static str, String) {
    match e {
        StoreError::UniqueConstraintViolation(_) => (
            StatusCode::CONFLICT,
            "DUPLICATE_ENTRY",
            "Username or email already exists".to_string(),
        ),
        StoreError::ConnectionPool(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "Account store temporarily unavailable".to_string(),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "STORE_ERROR",
            "Something went wrong".to_string(),
        ),
    }
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = match self {
            AppError::Validation(e) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }

            AppError::Store(e) => store_status(e),

            AppError::Media(e) => match e {
                MediaError::EmptyFile(_) => {
                    (StatusCode::BAD_REQUEST, "FILE_MISSING", e.to_string())
                }
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "MEDIA_UPLOAD_ERROR",
                    "Error while uploading the file".to_string(),
                ),
            },

            AppError::Auth(e) => match e {
                AuthError::NotFound => {
                    (StatusCode::NOT_FOUND, "USER_NOT_FOUND", e.to_string())
                }
                AuthError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS", e.to_string())
                }
                AuthError::Unauthorized(_) => (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED",
                    "Invalid or expired token".to_string(),
                ),
                AuthError::Upstream(_) | AuthError::TokenIssue(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SESSION_ERROR",
                    "Something went wrong while generating access and refresh tokens"
                        .to_string(),
                ),
            },

            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        };

        let error_response = ErrorResponse::new(
            request_id.to_string(),
            message,
            code.to_string(),
            status.as_u16(),
        );

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Store(StoreError::UniqueConstraintViolation(_)) => {
                tracing::warn!(request_id = request_id, error = %self, "Duplicate entry attempt");
            }
            AppError::Store(e) => {
                tracing::error!(request_id = request_id, error = %e, "Account store error");
            }
            AppError::Media(e) => {
                tracing::error!(request_id = request_id, error = %e, "Media service error");
            }
            AppError::Auth(AuthError::Upstream(e)) => {
                tracing::error!(request_id = request_id, error = %e, "Account store error during session operation");
            }
            AppError::Auth(AuthError::TokenIssue(msg)) => {
                tracing::error!(request_id = request_id, error = %msg, "Token issuance error");
            }
            AppError::Auth(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Authentication error");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Store(e) => store_status(e).0,
            AppError::Media(MediaError::EmptyFile(_)) => StatusCode::BAD_REQUEST,
            AppError::Media(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Auth(e) => match e {
                AuthError::NotFound => StatusCode::NOT_FOUND,
                AuthError::InvalidCredentials | AuthError::Unauthorized(_) => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::Upstream(_) | AuthError::TokenIssue(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Request-scoped context for structured logs
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub user_id: Option<String>,
    pub operation: String,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            operation: operation.into(),
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn log_error(&self, error: &AppError) {
        let user_id = self.user_id.as_deref().unwrap_or("-");
        match error {
            AppError::Validation(_) | AppError::Auth(AuthError::NotFound)
            | AppError::Auth(AuthError::InvalidCredentials)
            | AppError::Auth(AuthError::Unauthorized(_)) => {
                tracing::warn!(
                    request_id = %self.request_id,
                    operation = %self.operation,
                    user_id = %user_id,
                    error = %error,
                    "Request rejected"
                );
            }
            _ => {
                tracing::error!(
                    request_id = %self.request_id,
                    operation = %self.operation,
                    user_id = %user_id,
                    error = %error,
                    "Request failed"
                );
            }
        }
    }
}
