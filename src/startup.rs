use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{SessionManager, TokenCodec};
use crate::configuration::{ApplicationSettings, JwtSettings};
use crate::media_client::MediaClient;
use crate::middleware::{JwtMiddleware, RequestLogger};
use crate::routes::{
    change_password, current_user, health_check, login, logout, refresh, register,
    update_account, update_avatar, update_cover_image,
};
use crate::store::AccountStore;

// Upper bound for avatar / cover image uploads
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn run(
    listener: TcpListener,
    store: Arc<dyn AccountStore>,
    media_client: MediaClient,
    application: ApplicationSettings,
    jwt_config: JwtSettings,
) -> Result<Server, std::io::Error> {
    let codec = TokenCodec::new(&jwt_config);
    let sessions = web::Data::new(SessionManager::new(store.clone(), codec.clone()));
    let store = web::Data::from(store);
    let media_client = web::Data::new(media_client);
    let application = web::Data::new(application);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)

            // Shared state
            .app_data(store.clone())
            .app_data(sessions.clone())
            .app_data(media_client.clone())
            .app_data(application.clone())
            .app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))

            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api/v1/users")
                    // Public routes
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/refresh-token", web::post().to(refresh))

                    // Protected routes (require a valid access token)
                    .service(
                        web::scope("")
                            .wrap(JwtMiddleware::new(codec.clone()))
                            .route("/logout", web::post().to(logout))
                            .route("/current-user", web::get().to(current_user))
                            .route("/change-password", web::post().to(change_password))
                            .route("/update-account", web::patch().to(update_account))
                            .route("/avatar", web::patch().to(update_avatar))
                            .route("/cover-image", web::patch().to(update_cover_image)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
