mod common;

use common::{spawn_app, str_field, TestApp, PASSWORD};
use serde_json::{json, Value};

async fn patch_json(app: &TestApp, path: &str, token: &str, body: &Value) -> reqwest::Response {
    app.client
        .patch(&app.url(path))
        .bearer_auth(token)
        .json(body)
        .send()
        .await
        .expect("Failed to execute request.")
}

async fn upload(app: &TestApp, path: &str, token: &str, bytes: Vec<u8>) -> reqwest::Response {
    app.client
        .patch(&app.url(path))
        .bearer_auth(token)
        .header("Content-Type", "image/png")
        .body(bytes)
        .send()
        .await
        .expect("Failed to execute request.")
}

#[tokio::test]
async fn current_user_returns_profile() {
    let app = spawn_app().await;
    let login = app.signed_in("carol").await;

    let response = app
        .client
        .get(&app.url("/current-user"))
        .bearer_auth(str_field(&login, "access_token"))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user_name"], "carol");
    assert_eq!(body["email"], "carol@example.com");
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn current_user_requires_access_token() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(&app.url("/current-user"))
        .bearer_auth("garbage")
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn update_account_changes_details() {
    let app = spawn_app().await;
    let login = app.signed_in("carol").await;
    let token = str_field(&login, "access_token");

    let response = patch_json(
        &app,
        "/update-account",
        &token,
        &json!({"full_name": "Carol Danvers", "email": "carol@example.org"}),
    )
    .await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["full_name"], "Carol Danvers");
    assert_eq!(body["email"], "carol@example.org");

    let account = app.account(&str_field(&login["user"], "id")).await;
    assert_eq!(account.email, "carol@example.org");
}

#[tokio::test]
async fn update_account_rejects_invalid_or_taken_email() {
    let app = spawn_app().await;
    app.register("dave", "dave@example.com").await;
    let login = app.signed_in("carol").await;
    let token = str_field(&login, "access_token");

    let invalid = patch_json(
        &app,
        "/update-account",
        &token,
        &json!({"full_name": "Carol", "email": "not-an-email"}),
    )
    .await;
    assert_eq!(400, invalid.status().as_u16());

    let taken = patch_json(
        &app,
        "/update-account",
        &token,
        &json!({"full_name": "Carol", "email": "dave@example.com"}),
    )
    .await;
    assert_eq!(409, taken.status().as_u16());
}

#[tokio::test]
async fn change_password_requires_correct_old_password() {
    let app = spawn_app().await;
    let login = app.signed_in("carol").await;
    let token = str_field(&login, "access_token");

    let wrong = app
        .client
        .post(&app.url("/change-password"))
        .bearer_auth(&token)
        .json(&json!({"old_password": "NotMyPass1", "new_password": "BrandNew123"}))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, wrong.status().as_u16());
    assert_eq!(200, app.login("carol", PASSWORD).await.status().as_u16());
}

#[tokio::test]
async fn change_password_replaces_login_password() {
    let app = spawn_app().await;
    let login = app.signed_in("carol").await;

    let response = app
        .client
        .post(&app.url("/change-password"))
        .bearer_auth(str_field(&login, "access_token"))
        .json(&json!({"old_password": PASSWORD, "new_password": "BrandNew123"}))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Password updated successfully");

    assert_eq!(401, app.login("carol", PASSWORD).await.status().as_u16());
    assert_eq!(200, app.login("carol", "BrandNew123").await.status().as_u16());
}

#[tokio::test]
async fn avatar_upload_stores_hosted_url() {
    let app = spawn_app().await;
    let login = app.signed_in("carol").await;

    let response = upload(&app, "/avatar", &str_field(&login, "access_token"), vec![0x89, 0x50, 0x4e, 0x47]).await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let avatar = str_field(&body, "avatar");
    assert!(avatar.starts_with("https://media.test/"), "unexpected url {}", avatar);

    let account = app.account(&str_field(&login["user"], "id")).await;
    assert_eq!(account.avatar, avatar);
    assert!(account.cover_image.is_empty());
}

#[tokio::test]
async fn cover_image_upload_stores_hosted_url() {
    let app = spawn_app().await;
    let login = app.signed_in("carol").await;

    let response = upload(&app, "/cover-image", &str_field(&login, "access_token"), vec![1; 64]).await;

    assert_eq!(200, response.status().as_u16());
    let account = app.account(&str_field(&login["user"], "id")).await;
    assert!(account.cover_image.starts_with("https://media.test/"));
}

#[tokio::test]
async fn image_upload_rejects_empty_body() {
    let app = spawn_app().await;
    let login = app.signed_in("carol").await;
    let token = str_field(&login, "access_token");

    for path in ["/avatar", "/cover-image"] {
        let response = upload(&app, path, &token, Vec::new()).await;
        assert_eq!(400, response.status().as_u16(), "{} accepted an empty body", path);
    }
}
