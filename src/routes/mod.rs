mod account;
mod auth;
mod health_check;

pub use account::{change_password, current_user, update_account, update_avatar, update_cover_image};
pub use auth::{login, logout, refresh, register, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
pub use health_check::health_check;
