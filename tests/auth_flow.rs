//! End-to-end tests for the auth surface, driving the real router.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use propmart::auth::token::TokenService;
use propmart::config::{AppConfig, RateLimitConfig, SecurityConfig};
use propmart::{app, state::AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn spawn_app() -> Router {
    app::build_app(AppState::fake())
}

fn test_config() -> AppConfig {
    AppConfig {
        environment: "test".into(),
        security: SecurityConfig {
            jwt_secret: "test-secret".into(),
            session_ttl_days: 7,
            hash_memory_kib: 8,
            hash_iterations: 1,
        },
        rate_limit: RateLimitConfig {
            window_secs: 900,
            max_general: 100,
            max_auth: 5,
        },
        expose_verification_code: true,
        protect_stats: false,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("request");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, client: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", client)
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn post_with_token(uri: &str, client: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-forwarded-for", client);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

fn get_with_token(uri: &str, client: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .header("x-forwarded-for", client);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

fn register_body(email: &str) -> Value {
    json!({
        "fullName": "Somchai",
        "phone": "0812345678",
        "email": email,
        "password": "longenough1",
        "userType": "ผู้ซื้อ/เช่า",
    })
}

async fn register(app: &Router, client: &str, email: &str) -> (StatusCode, Value) {
    send(app, post_json("/register", client, &register_body(email))).await
}

async fn login(app: &Router, client: &str, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        post_json(
            "/login",
            client,
            &json!({ "email": email, "password": password }),
        ),
    )
    .await
}

#[tokio::test]
async fn register_login_me_logout_journey() {
    let app = spawn_app();

    let (status, body) = register(&app, "10.0.0.1", "a@b.com").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["user"]["verified"], json!(false));
    assert_eq!(body["user"]["email"], json!("a@b.com"));
    // Registration response hides the phone number.
    assert!(body["user"].get("phone").is_none());
    // Development convenience: the verification code is echoed back.
    assert!(body["verificationCode"].is_string());

    let (status, body) = login(&app, "10.0.0.1", "a@b.com", "longenough1").await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().expect("token").to_string();
    assert!(!token.is_empty());

    let (status, body) = send(&app, get_with_token("/me", "10.0.0.1", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], json!("a@b.com"));
    assert_eq!(body["user"]["phone"], json!("0812345678"));

    let (status, _) = send(&app, post_with_token("/logout", "10.0.0.1", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);

    // The token still decodes, but its session is gone.
    let (status, _) = send(&app, get_with_token("/me", "10.0.0.1", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_email_is_case_insensitive() {
    let app = spawn_app();

    let (status, _) = register(&app, "10.0.0.1", "somchai@example.com").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = register(&app, "10.0.0.2", "Somchai@Example.COM").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn validation_failures_are_aggregated_and_mutate_nothing() {
    let app = spawn_app();

    let (status, body) = send(
        &app,
        post_json(
            "/register",
            "10.0.0.1",
            &json!({
                "fullName": " ",
                "phone": "12345",
                "email": "not-an-email",
                "password": "short",
                "userType": "admin",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["errors"].as_array().expect("errors").len(), 5);

    let (_, stats) = send(&app, get_with_token("/stats", "10.0.0.1", None)).await;
    assert_eq!(stats["stats"]["totalUsers"], json!(0));
}

#[tokio::test]
async fn unknown_email_and_wrong_password_get_the_same_response() {
    let app = spawn_app();
    register(&app, "10.0.0.1", "a@b.com").await;

    let (status_a, body_a) = login(&app, "10.0.0.2", "nobody@b.com", "longenough1").await;
    let (status_b, body_b) = login(&app, "10.0.0.3", "a@b.com", "wrong-password").await;

    assert_eq!(status_a, StatusCode::UNAUTHORIZED);
    assert_eq!(status_b, StatusCode::UNAUTHORIZED);
    assert_eq!(body_a, body_b);
}

#[tokio::test]
async fn sixth_auth_attempt_in_the_window_is_throttled() {
    let app = spawn_app();
    // Register from a different client so the login client starts fresh.
    register(&app, "10.0.0.1", "a@b.com").await;

    for _ in 0..5 {
        let (status, _) = login(&app, "10.9.9.9", "a@b.com", "wrong-password").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // Correct credentials, but the auth window is spent.
    let response = app
        .clone()
        .oneshot(post_json(
            "/login",
            "10.9.9.9",
            &json!({ "email": "a@b.com", "password": "longenough1" }),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));

    // The rejected attempt opened no session.
    let (_, stats) = send(&app, get_with_token("/stats", "10.0.0.1", None)).await;
    assert_eq!(stats["stats"]["activeSessions"], json!(0));
}

#[tokio::test]
async fn logout_is_fail_open() {
    let app = spawn_app();
    register(&app, "10.0.0.1", "a@b.com").await;
    let (_, body) = login(&app, "10.0.0.1", "a@b.com", "longenough1").await;
    let token = body["token"].as_str().expect("token").to_string();

    // No token, unknown token, valid token: all succeed.
    for request in [
        post_with_token("/logout", "10.0.0.1", None),
        post_with_token("/logout", "10.0.0.1", Some("never-issued")),
        post_with_token("/logout", "10.0.0.1", Some(&token)),
    ] {
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
    }

    // Only the valid-token logout had an effect.
    let (status, _) = send(&app, get_with_token("/me", "10.0.0.1", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bad_tokens_are_rejected_uniformly() {
    let app = spawn_app();

    let (status, _) = send(&app, get_with_token("/me", "10.0.0.1", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, get_with_token("/me", "10.0.0.1", Some("garbage"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Structurally valid token signed with the wrong secret.
    let forged = TokenService::new("some-other-secret")
        .issue(uuid::Uuid::new_v4())
        .expect("issue");
    let (status, _) = send(&app, get_with_token("/me", "10.0.0.1", Some(&forged))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Correctly signed token that never went through login has no session.
    let orphan = TokenService::new("test-secret")
        .issue(uuid::Uuid::new_v4())
        .expect("issue");
    let (status, _) = send(&app, get_with_token("/me", "10.0.0.1", Some(&orphan))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn stats_tracks_users_and_sessions() {
    let app = spawn_app();

    let (_, stats) = send(&app, get_with_token("/stats", "10.0.0.1", None)).await;
    assert_eq!(stats["stats"]["totalUsers"], json!(0));
    assert_eq!(stats["stats"]["activeSessions"], json!(0));

    register(&app, "10.0.0.1", "a@b.com").await;
    register(&app, "10.0.0.1", "c@d.com").await;
    login(&app, "10.0.0.1", "a@b.com", "longenough1").await;

    let (status, stats) = send(&app, get_with_token("/stats", "10.0.0.1", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["stats"]["totalUsers"], json!(2));
    assert_eq!(stats["stats"]["verifiedUsers"], json!(0));
    assert_eq!(stats["stats"]["activeSessions"], json!(1));
    assert_eq!(stats["stats"]["usersByType"]["ผู้ซื้อ/เช่า"], json!(2));
}

#[tokio::test]
async fn verification_code_is_hidden_when_configured_off() {
    let mut config = test_config();
    config.environment = "production".into();
    config.expose_verification_code = false;
    let app = app::build_app(AppState::new(config));

    let (status, body) = register(&app, "10.0.0.1", "a@b.com").await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body.get("verificationCode").is_none());
}

#[tokio::test]
async fn stats_can_be_gated_behind_auth() {
    let mut config = test_config();
    config.protect_stats = true;
    let app = app::build_app(AppState::new(config));

    let (status, _) = send(&app, get_with_token("/stats", "10.0.0.1", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    register(&app, "10.0.0.1", "a@b.com").await;
    let (_, body) = login(&app, "10.0.0.1", "a@b.com", "longenough1").await;
    let token = body["token"].as_str().expect("token").to_string();

    let (status, stats) = send(&app, get_with_token("/stats", "10.0.0.1", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["stats"]["totalUsers"], json!(1));
}

#[tokio::test]
async fn health_is_open() {
    let app = spawn_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}
