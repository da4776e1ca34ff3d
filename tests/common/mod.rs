#![allow(dead_code)]

use actix_web::{web, App, HttpResponse, HttpServer};
use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;
use uuid::Uuid;

use userhub::configuration::{ApplicationSettings, JwtSettings};
use userhub::media_client::MediaClient;
use userhub::startup::run;
use userhub::store::{Account, AccountStore, InMemoryAccountStore};

pub const PASSWORD: &str = "SecurePass123";
/// PNG signature as a data URL
pub const AVATAR: &str = "data:image/png;base64,iVBORw0KGgo=";

pub struct TestApp {
    pub address: String,
    pub store: Arc<InMemoryAccountStore>,
    pub client: reqwest::Client,
}

pub fn jwt_settings() -> JwtSettings {
    JwtSettings {
        access_token_secret: "integration-access-secret-0123456789".to_string(),
        access_token_expiry: 900,
        refresh_token_secret: "integration-refresh-secret-0123456789".to_string(),
        refresh_token_expiry: 604800,
        issuer: "userhub-test".to_string(),
    }
}

async fn fake_upload(body: web::Bytes) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "url": format!("https://media.test/{}-{}.png", Uuid::new_v4(), body.len())
    }))
}

/// Stand-in for the media-hosting service
fn spawn_media_host() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let server = HttpServer::new(|| App::new().route("/upload", web::post().to(fake_upload)))
        .listen(listener)
        .expect("Failed to bind media host")
        .run();
    let _ = tokio::spawn(server);

    format!("http://127.0.0.1:{}", port)
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(jwt_settings()).await
}

pub async fn spawn_app_with(jwt: JwtSettings) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let store = Arc::new(InMemoryAccountStore::new());
    let media_client = MediaClient::new(spawn_media_host(), String::new(), reqwest::Client::new());
    let application = ApplicationSettings {
        host: "127.0.0.1".to_string(),
        port,
        password_hash_cost: 4,
    };

    let server = run(listener, store.clone(), media_client, application, jwt)
        .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        store,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1/users{}", self.address, path)
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(&self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn register(&self, user_name: &str, email: &str) -> Value {
        let response = self
            .post_json("/register", &registration(user_name, email))
            .await;
        assert_eq!(201, response.status().as_u16());
        response.json().await.expect("Failed to parse response")
    }

    pub async fn login(&self, user_name: &str, password: &str) -> reqwest::Response {
        self.post_json("/login", &json!({ "user_name": user_name, "password": password }))
            .await
    }

    /// Register `user_name` and log in; returns the login body
    pub async fn signed_in(&self, user_name: &str) -> Value {
        self.register(user_name, &format!("{}@example.com", user_name)).await;
        let response = self.login(user_name, PASSWORD).await;
        assert_eq!(200, response.status().as_u16());
        response.json().await.expect("Failed to parse response")
    }

    pub async fn refresh_with_cookie(&self, refresh_token: &str) -> reqwest::Response {
        self.client
            .post(&self.url("/refresh-token"))
            .header("Cookie", format!("refreshToken={}", refresh_token))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn account(&self, id: &str) -> Account {
        let id = Uuid::parse_str(id).expect("Invalid account id");
        self.store
            .find_by_id(id)
            .await
            .expect("Store lookup failed")
            .expect("Account not found")
    }
}

/// Complete registration body with an avatar and no cover image
pub fn registration(user_name: &str, email: &str) -> Value {
    json!({
        "user_name": user_name,
        "full_name": "Test User",
        "email": email,
        "password": PASSWORD,
        "avatar": AVATAR
    })
}

/// Raw `Set-Cookie` header for `name`, if the response sets it
pub fn set_cookie_header(response: &reqwest::Response, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|h| h.to_str().ok())
        .find(|h| h.starts_with(&prefix))
        .map(str::to_string)
}

/// Value of cookie `name` set by the response
pub fn cookie_value(response: &reqwest::Response, name: &str) -> Option<String> {
    set_cookie_header(response, name).map(|header| {
        header
            .split(';')
            .next()
            .unwrap_or_default()
            .splitn(2, '=')
            .nth(1)
            .unwrap_or_default()
            .to_string()
    })
}

pub fn str_field(body: &Value, field: &str) -> String {
    body[field]
        .as_str()
        .unwrap_or_else(|| panic!("missing field {}", field))
        .to_string()
}
