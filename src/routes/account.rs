/// Account Routes
///
/// Profile reads and mutations for the authenticated account. All routes here
/// sit behind `JwtMiddleware`, which provides the `Claims`.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{hash_password_blocking, Claims};
use crate::configuration::ApplicationSettings;
use crate::error::{AppError, AuthError, ErrorContext, MediaError};
use crate::media_client::MediaClient;
use crate::routes::auth::MessageResponse;
use crate::store::{Account, AccountStore};
use crate::validators::{is_valid_email, is_valid_full_name, required};

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateAccountRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

fn subject(claims: &Claims) -> Result<Uuid, AppError> {
    claims
        .subject_id()
        .map_err(|e| AppError::Auth(AuthError::Unauthorized(e.to_string())))
}

/// The account vanished between token issue and now
fn gone(account: Option<Account>) -> Result<Account, AppError> {
    account.ok_or(AppError::Auth(AuthError::NotFound))
}

/// GET /api/v1/users/current-user
pub async fn current_user(
    claims: web::ReqData<Claims>,
    store: web::Data<dyn AccountStore>,
) -> Result<HttpResponse, AppError> {
    let account = gone(store.find_by_id(subject(&claims)?).await?)?;
    Ok(HttpResponse::Ok().json(account.public_view()))
}

/// POST /api/v1/users/change-password
///
/// The open session is left untouched.
pub async fn change_password(
    claims: web::ReqData<Claims>,
    form: web::Json<ChangePasswordRequest>,
    store: web::Data<dyn AccountStore>,
    settings: web::Data<ApplicationSettings>,
) -> Result<HttpResponse, AppError> {
    let user_id = subject(&claims)?;
    let context = ErrorContext::new("change_password").with_user_id(user_id.to_string());

    let old_password = required("old_password", form.old_password.as_deref())?;
    let new_password = required("new_password", form.new_password.as_deref())?;

    let account = gone(store.find_by_id(user_id).await?)?;
    if !account.is_password_correct(&old_password).await {
        let err = AppError::Auth(AuthError::InvalidCredentials);
        context.log_error(&err);
        return Err(err);
    }

    let password_hash = hash_password_blocking(new_password, settings.password_hash_cost).await?;
    gone(store.set_password_hash(user_id, &password_hash).await?)?;

    tracing::info!(request_id = %context.request_id, user_id = %user_id, "Password changed");

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Password updated successfully".to_string(),
    }))
}

/// PATCH /api/v1/users/update-account
pub async fn update_account(
    claims: web::ReqData<Claims>,
    form: web::Json<UpdateAccountRequest>,
    store: web::Data<dyn AccountStore>,
) -> Result<HttpResponse, AppError> {
    let user_id = subject(&claims)?;

    let full_name = is_valid_full_name(&required("full_name", form.full_name.as_deref())?)?;
    let email = is_valid_email(&required("email", form.email.as_deref())?)?;

    let account = gone(store.update_details(user_id, &full_name, &email).await?)?;

    tracing::info!(user_id = %user_id, "Account details updated");
    Ok(HttpResponse::Ok().json(account.public_view()))
}

#[derive(Clone, Copy)]
enum ImageSlot {
    Avatar,
    CoverImage,
}

impl ImageSlot {
    fn label(self) -> &'static str {
        match self {
            ImageSlot::Avatar => "Avatar",
            ImageSlot::CoverImage => "Cover image",
        }
    }
}

async fn replace_image(
    slot: ImageSlot,
    req: HttpRequest,
    body: web::Bytes,
    claims: web::ReqData<Claims>,
    store: web::Data<dyn AccountStore>,
    media: web::Data<MediaClient>,
) -> Result<HttpResponse, AppError> {
    let user_id = subject(&claims)?;

    if body.is_empty() {
        return Err(MediaError::EmptyFile(slot.label().to_string()).into());
    }

    let content_type = req
        .headers()
        .get(actix_web::http::header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let url = media.upload(body.to_vec(), &content_type).await?;

    let account = match slot {
        ImageSlot::Avatar => store.set_avatar(user_id, &url).await?,
        ImageSlot::CoverImage => store.set_cover_image(user_id, &url).await?,
    };
    let account = gone(account)?;

    tracing::info!(user_id = %user_id, slot = slot.label(), "Profile image updated");
    Ok(HttpResponse::Ok().json(account.public_view()))
}

/// PATCH /api/v1/users/avatar — raw image bytes in the request body
pub async fn update_avatar(
    req: HttpRequest,
    body: web::Bytes,
    claims: web::ReqData<Claims>,
    store: web::Data<dyn AccountStore>,
    media: web::Data<MediaClient>,
) -> Result<HttpResponse, AppError> {
    replace_image(ImageSlot::Avatar, req, body, claims, store, media).await
}

/// PATCH /api/v1/users/cover-image — raw image bytes in the request body
pub async fn update_cover_image(
    req: HttpRequest,
    body: web::Bytes,
    claims: web::ReqData<Claims>,
    store: web::Data<dyn AccountStore>,
    media: web::Data<MediaClient>,
) -> Result<HttpResponse, AppError> {
    replace_image(ImageSlot::CoverImage, req, body, claims, store, media).await
}
