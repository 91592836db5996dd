//! Integration tests for registration, login and token verification

mod common;

use axum::http::StatusCode;
use serde_json::json;
use taskboard_backend::auth::{JwtService, TokenKind, TokenSubject};
use uuid::Uuid;

fn decode_claims(token: &str) -> serde_json::Value {
    let jwt = JwtService::new("test-secret-key-for-testing-only-32chars", 60, 60);
    serde_json::to_value(jwt.verify(token).unwrap()).unwrap()
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_register_issues_token_for_submitted_identity() {
    let app = common::TestApp::new().await;
    let suffix = &Uuid::new_v4().simple().to_string()[..8];
    let username = format!("alice_{}", suffix);

    let (status, response) = app
        .post(
            "/api/auth/register",
            json!({
                "username": username,
                "email": format!("Alice.{}@Example.com", suffix),
                "password": "secret123",
                "name": "Alice",
            }),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    let claims = decode_claims(response["token"].as_str().unwrap());
    assert_eq!(claims["username"], username.as_str());
    assert_eq!(claims["name"], "Alice");
    assert_eq!(claims["kind"], "registration");

    let user = &response["user"];
    assert_eq!(user["email"], format!("alice.{}@example.com", suffix));
    assert!(user["profileImage"].as_str().unwrap().contains("ui-avatars.com"));
    assert!(user.get("password").is_none());
    assert!(user.get("password_hash").is_none());
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_register_duplicate_email_writes_nothing() {
    let app = common::TestApp::new().await;
    let (_, user) = app.register_user("Alice").await;
    let email = user["email"].as_str().unwrap().to_string();

    let (status, response) = app
        .post(
            "/api/auth/register",
            json!({
                "username": format!("other_{}", &Uuid::new_v4().simple().to_string()[..8]),
                "email": email,
                "password": "secret123",
                "name": "Another",
            }),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["message"], "User already exists");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_register_duplicate_username() {
    let app = common::TestApp::new().await;
    let (_, user) = app.register_user("Alice").await;

    let (status, response) = app
        .post(
            "/api/auth/register",
            json!({
                "username": user["username"],
                "email": format!("{}@example.com", Uuid::new_v4().simple()),
                "password": "secret123",
                "name": "Alice",
            }),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["code"], "DUPLICATE_IDENTITY");
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_login_returns_public_projection() {
    let app = common::TestApp::new().await;
    let (_, user) = app.register_user("Alice").await;

    let (status, response) = app
        .post(
            "/api/auth/login",
            json!({"email": user["email"], "password": "secret123"}),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["user"], user);
    assert_eq!(decode_claims(response["token"].as_str().unwrap())["kind"], "login");
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_login_failures_are_indistinguishable() {
    let app = common::TestApp::new().await;
    let (_, user) = app.register_user("Alice").await;

    let (wrong_status, wrong_password) = app
        .post(
            "/api/auth/login",
            json!({"email": user["email"], "password": "not-the-password"}),
            None,
        )
        .await;
    let (unknown_status, unknown_email) = app
        .post(
            "/api/auth/login",
            json!({"email": "nobody@example.com", "password": "secret123"}),
            None,
        )
        .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_email);
    assert_eq!(wrong_password["message"], "Invalid credentials");
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_verify_round_trip_and_idempotence() {
    let app = common::TestApp::new().await;
    let (token, user) = app.register_user("Alice").await;

    let (status, first) = app.get("/api/auth/verify", Some(&token)).await;
    let (_, second) = app.get("/api/auth/verify", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["user"], user);
    assert_eq!(first, second);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_verify_accepts_bare_token() {
    let app = common::TestApp::new().await;
    let (token, user) = app.register_user("Alice").await;

    let (status, response) = app.get_with_authorization("/api/auth/verify", &token).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["user"]["_id"], user["_id"]);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_deleted_subject_is_rejected() {
    let app = common::TestApp::new().await;
    let (token, user) = app.register_user("Alice").await;
    let id = Uuid::parse_str(user["_id"].as_str().unwrap()).unwrap();

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&app.pool)
        .await
        .unwrap();

    let (status, response) = app.get("/api/auth/verify", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(response["code"], "UNKNOWN_SUBJECT");
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_expired_token_is_rejected() {
    let app = common::TestApp::new().await;
    let (_, user) = app.register_user("Alice").await;

    let expired = JwtService::new("test-secret-key-for-testing-only-32chars", -120, -120)
        .issue(
            TokenKind::Login,
            TokenSubject {
                id: Uuid::parse_str(user["_id"].as_str().unwrap()).unwrap(),
                username: user["username"].as_str().unwrap(),
                name: "Alice",
            },
        )
        .unwrap();

    let (status, response) = app.get("/api/auth/verify", Some(&expired)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(response["code"], "INVALID_TOKEN");
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_login_updates_last_login() {
    let app = common::TestApp::new().await;
    let (_, user) = app.register_user("Alice").await;
    let id = Uuid::parse_str(user["_id"].as_str().unwrap()).unwrap();

    let before: chrono::DateTime<chrono::Utc> =
        sqlx::query_scalar("SELECT last_login FROM users WHERE id = $1")
            .bind(id)
            .fetch_one(&app.pool)
            .await
            .unwrap();

    app.post(
        "/api/auth/login",
        json!({"email": user["email"], "password": "secret123"}),
        None,
    )
    .await;

    // The update runs in the background
    let mut after = before;
    for _ in 0..20 {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        after = sqlx::query_scalar("SELECT last_login FROM users WHERE id = $1")
            .bind(id)
            .fetch_one(&app.pool)
            .await
            .unwrap();
        if after > before {
            break;
        }
    }
    assert!(after > before);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_get_user_by_id() {
    let app = common::TestApp::new().await;
    let (token, _) = app.register_user("Alice").await;
    let (_, other) = app.register_user("Bob Builder").await;

    let path = format!("/api/auth/user/{}", other["_id"].as_str().unwrap());
    let (status, response) = app.get(&path, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, other);

    let path = format!("/api/auth/user/{}", Uuid::new_v4());
    let (status, _) = app.get(&path, Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
