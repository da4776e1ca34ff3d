/// Session Routes
///
/// Registration, login, token refresh and logout. Tokens travel as two
/// `HttpOnly; Secure` cookies and are also returned in the JSON body for
/// clients that do not keep cookies.

use actix_web::cookie::{time::Duration, Cookie};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{
    hash_password_blocking, Claims, SessionManager, TokenClass, TokenCodec, TokenPair,
};
use crate::configuration::ApplicationSettings;
use crate::error::{AppError, ErrorContext, MediaError, StoreError, ValidationError};
use crate::media_client::{InlineFile, MediaClient};
use crate::store::{AccountLookup, AccountStore, NewAccount, PublicAccount};
use crate::validators::{is_valid_email, is_valid_full_name, is_valid_user_name, required};

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Account registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub user_name: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// Required image, as a base64 `data:` URL or bare base64
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
}

/// Login request; either identifier may be given
#[derive(Deserialize)]
pub struct LoginRequest {
    pub user_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Body fallback for clients that cannot send the refresh cookie
#[derive(Deserialize)]
pub struct RefreshRequest {
    #[serde(alias = "refreshToken")]
    pub refresh_token: Option<String>,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub user: PublicAccount,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Cookie that lives exactly as long as the token it carries
fn token_cookie(name: &'static str, value: String, max_age_seconds: i64) -> Cookie<'static> {
    Cookie::build(name, value)
        .http_only(true)
        .secure(true)
        .path("/")
        .max_age(Duration::seconds(max_age_seconds.max(0)))
        .finish()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = token_cookie(name, String::new(), 0);
    cookie.make_removal();
    cookie
}

/// 200 response carrying both tokens as cookies and `body` as JSON
fn with_token_cookies<T: Serialize>(
    codec: &TokenCodec,
    tokens: &TokenPair,
    body: &T,
) -> HttpResponse {
    HttpResponse::Ok()
        .cookie(token_cookie(
            ACCESS_TOKEN_COOKIE,
            tokens.access_token.clone(),
            codec.expiry_seconds(TokenClass::Access),
        ))
        .cookie(token_cookie(
            REFRESH_TOKEN_COOKIE,
            tokens.refresh_token.clone(),
            codec.expiry_seconds(TokenClass::Refresh),
        ))
        .json(body)
}

/// POST /api/v1/users/register
///
/// The avatar is uploaded to the media service before the account is
/// created; the cover image is optional.
///
/// # Errors
/// - 400: missing field, invalid user name / email, or no avatar
/// - 409: user name or email already taken
pub async fn register(
    form: web::Json<RegisterRequest>,
    store: web::Data<dyn AccountStore>,
    media: web::Data<MediaClient>,
    settings: web::Data<ApplicationSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");

    let user_name = is_valid_user_name(&required("user_name", form.user_name.as_deref())?)?;
    let full_name = is_valid_full_name(&required("full_name", form.full_name.as_deref())?)?;
    let email = is_valid_email(&required("email", form.email.as_deref())?)?;
    let password = required("password", form.password.as_deref())?;

    let lookup = AccountLookup::new(Some(user_name.as_str()), Some(email.as_str()));
    let existing = store.find_by_identifier(&lookup).await?;
    if existing.is_some() {
        let err = AppError::from(StoreError::UniqueConstraintViolation(
            "user name or email already exists".to_string(),
        ));
        context.log_error(&err);
        return Err(err);
    }

    let avatar = InlineFile::parse("avatar", form.avatar.as_deref())?
        .ok_or_else(|| MediaError::EmptyFile("Avatar".to_string()))?;
    let cover_image = InlineFile::parse("cover_image", form.cover_image.as_deref())?;

    let password_hash = hash_password_blocking(password, settings.password_hash_cost).await?;

    let avatar = media.upload(avatar.bytes, &avatar.content_type).await?;
    let cover_image = match cover_image {
        Some(file) => media.upload(file.bytes, &file.content_type).await?,
        None => String::new(),
    };

    let account = store
        .create(NewAccount {
            user_name,
            email,
            full_name,
            avatar,
            cover_image,
            password_hash,
        })
        .await
        .map_err(|e| {
            let err = AppError::from(e);
            context.log_error(&err);
            err
        })?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %account.id,
        "User registered successfully"
    );

    Ok(HttpResponse::Created().json(account.public_view()))
}

/// POST /api/v1/users/login
///
/// # Errors
/// - 400: neither user name nor email given, or password missing
/// - 404: no such account
/// - 401: wrong password
pub async fn login(
    form: web::Json<LoginRequest>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let lookup = AccountLookup::new(form.user_name.as_deref(), form.email.as_deref());
    if lookup.is_empty() {
        return Err(ValidationError::MissingIdentifier.into());
    }
    let password = required("password", form.password.as_deref())?;

    let (account, tokens) = sessions.login(&lookup, &password).await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %account.id,
        "User logged in successfully"
    );

    let body = LoginResponse {
        user: account.public_view(),
        access_token: tokens.access_token.clone(),
        refresh_token: tokens.refresh_token.clone(),
    };
    Ok(with_token_cookies(sessions.codec(), &tokens, &body))
}

/// POST /api/v1/users/refresh-token
///
/// The `refreshToken` cookie wins; the JSON body is only consulted when no
/// cookie is present.
///
/// # Errors
/// - 401: missing, invalid, expired or superseded refresh token
pub async fn refresh(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    let presented = req
        .cookie(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| body.and_then(|b| b.into_inner().refresh_token));

    let tokens = sessions.refresh(presented.as_deref()).await?;

    tracing::info!(request_id = %context.request_id, "Access token refreshed");

    let body = TokenResponse {
        access_token: tokens.access_token.clone(),
        refresh_token: tokens.refresh_token.clone(),
    };
    Ok(with_token_cookies(sessions.codec(), &tokens, &body))
}

/// POST /api/v1/users/logout (protected)
pub async fn logout(
    claims: web::ReqData<Claims>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.subject_id().map_err(|e| AppError::Internal(e.to_string()))?;

    sessions.logout(user_id).await?;

    Ok(HttpResponse::Ok()
        .cookie(removal_cookie(ACCESS_TOKEN_COOKIE))
        .cookie(removal_cookie(REFRESH_TOKEN_COOKIE))
        .json(MessageResponse {
            message: "User logged out successfully".to_string(),
        }))
}
