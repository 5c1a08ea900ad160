//! Integration tests for the logbook HTTP surface.
//!
//! Sessions travel as the `set-cookie` value returned by signup/login.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use logbook::api::AppState;
use logbook::config::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

/// Temp database file, removed when the test finishes.
struct TestDb(PathBuf);

impl Drop for TestDb {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

async fn spawn_app() -> (Router, Arc<AppState>, TestDb) {
    let db_path =
        std::env::temp_dir().join(format!("logbook-api-test-{}.db", uuid::Uuid::new_v4()));
    let db = TestDb(db_path.clone());

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.server.secure_cookies = false;
    config.security.argon2_memory_cost_kib = 64;
    config.security.argon2_time_cost = 1;

    let state = logbook::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");

    (logbook::api::router(state.clone()), state, db)
}

fn session_cookie(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .expect("response did not set a session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

async fn json_body(response: Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn post_json(
    app: &Router,
    uri: &str,
    cookie: Option<&str>,
    body: &serde_json::Value,
) -> Response {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::HOST, "logbook.test")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }

    app.clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }

    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn signup(app: &Router, username: &str) -> Response {
    post_json(
        app,
        "/api/auth/signup",
        None,
        &serde_json::json!({
            "username": username,
            "password": "pw123!",
            "password_confirm": "pw123!",
            "security_question": "First car?",
            "security_answer": "Beetle",
        }),
    )
    .await
}

#[tokio::test]
async fn test_health() {
    let (app, _, _db) = spawn_app().await;

    let response = get(&app, "/api/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert!(body["success"].as_bool().unwrap_or(false));
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_anonymous_identity() {
    let (app, _, _db) = spawn_app().await;

    let response = get(&app, "/api/auth/me", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["data"]["is_anonymous"], true);
    assert_eq!(body["data"]["is_authenticated"], false);
    assert_eq!(body["data"]["username"], "");
}

#[tokio::test]
async fn test_logbook_requires_login() {
    let (app, _, _db) = spawn_app().await;

    let response = get(&app, "/api/logbook", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_json(
        &app,
        "/api/logbook",
        None,
        &serde_json::json!({ "start": "09:00", "end": "17:00" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signup_add_and_list_entries() {
    let (app, _, _db) = spawn_app().await;

    let response = signup(&app, "alice").await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response);

    let body = json_body(get(&app, "/api/auth/me", Some(&cookie)).await).await;
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["is_authenticated"], true);
    assert_eq!(body["data"]["is_active"], true);

    for (start, end) in [("08:00", "12:00"), ("13:00", "17:30")] {
        let response = post_json(
            &app,
            "/api/logbook",
            Some(&cookie),
            &serde_json::json!({ "start": start, "end": end, "car": "car1", "notes": "" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = get(&app, "/api/logbook?page=1", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;

    assert_eq!(body["data"]["page"], 1);
    assert_eq!(body["data"]["total_pages"], 1);
    assert_eq!(body["data"]["timezone"], "UTC");

    let entries = body["data"]["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e["car"] == "car1"));
    assert!(entries.iter().all(|e| e["notes"].is_null()));

    let body = json_body(get(&app, "/api/logbook/all", Some(&cookie)).await).await;
    assert_eq!(body["data"]["entries"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_entries_are_private_to_their_owner() {
    let (app, _, _db) = spawn_app().await;

    let alice = session_cookie(&signup(&app, "alice").await);
    let bob = session_cookie(&signup(&app, "bobby").await);

    let response = post_json(
        &app,
        "/api/logbook",
        Some(&alice),
        &serde_json::json!({ "start": "09:00", "end": "10:00" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(get(&app, "/api/logbook/all", Some(&bob)).await).await;
    assert!(body["data"]["entries"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_entry_fields_are_rejected() {
    let (app, _, _db) = spawn_app().await;
    let cookie = session_cookie(&signup(&app, "alice").await);

    let response = post_json(
        &app,
        "/api/logbook",
        Some(&cookie),
        &serde_json::json!({ "start": "09:00", "end": "  " }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(&app, "/api/logbook?page=0", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_huge_page_is_a_bad_request() {
    let (app, _, _db) = spawn_app().await;
    let cookie = session_cookie(&signup(&app, "alice").await);

    let max = u64::MAX.to_string();
    for page in ["1000000000000000000", max.as_str()] {
        let response = get(&app, &format!("/api/logbook?page={page}"), Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = get(&app, "/api/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_duplicate_signup_conflicts() {
    let (app, _, _db) = spawn_app().await;

    assert_eq!(signup(&app, "alice").await.status(), StatusCode::OK);
    assert_eq!(signup(&app, "alice").await.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_signup_validation() {
    let (app, _, _db) = spawn_app().await;

    let response = post_json(
        &app,
        "/api/auth/signup",
        None,
        &serde_json::json!({
            "username": "abc",
            "password": "pw123!",
            "password_confirm": "pw123!",
            "security_question": "Q",
            "security_answer": "A",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        &app,
        "/api/auth/signup",
        None,
        &serde_json::json!({
            "username": "alice",
            "password": "pw123!",
            "password_confirm": "pw123?",
            "security_question": "Q",
            "security_answer": "A",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_flow() {
    let (app, _, _db) = spawn_app().await;
    signup(&app, "alice").await;

    let response = post_json(
        &app,
        "/api/auth/login",
        None,
        &serde_json::json!({ "username": "alice", "password": "wrong!" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_json(
        &app,
        "/api/auth/login",
        None,
        &serde_json::json!({ "username": "nobody", "password": "pw123!" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_json(
        &app,
        "/api/auth/login",
        None,
        &serde_json::json!({ "username": "alice", "password": "pw123!", "next": "/logbook?page=2" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response);

    let body = json_body(response).await;
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["redirect"], "/logbook?page=2");

    let response = get(&app, "/api/logbook", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json(&app, "/api/auth/logout", Some(&cookie), &serde_json::json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&app, "/api/logbook", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_rejects_foreign_redirect() {
    let (app, _, _db) = spawn_app().await;
    signup(&app, "alice").await;

    let response = post_json(
        &app,
        "/api/auth/login",
        None,
        &serde_json::json!({
            "username": "alice",
            "password": "pw123!",
            "next": "https://evil.example/steal",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_deactivated_user() {
    let (app, state, _db) = spawn_app().await;
    let cookie = session_cookie(&signup(&app, "alice").await);

    state.store().set_user_active("alice", false).await.unwrap();

    let response = get(&app, "/api/logbook", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json(
        &app,
        "/api/auth/login",
        None,
        &serde_json::json!({ "username": "alice", "password": "pw123!" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_session_timezone_changes_rendering() {
    let (app, _, _db) = spawn_app().await;
    let cookie = session_cookie(&signup(&app, "alice").await);

    post_json(
        &app,
        "/api/logbook",
        Some(&cookie),
        &serde_json::json!({ "start": "09:00", "end": "10:00" }),
    )
    .await;

    let response = post_json(
        &app,
        "/api/session/timezone",
        Some(&cookie),
        &serde_json::json!({ "timezone": "Mars/Olympus" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        &app,
        "/api/session/timezone",
        Some(&cookie),
        &serde_json::json!({ "timezone": "Asia/Tokyo" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(get(&app, "/api/logbook", Some(&cookie)).await).await;
    assert_eq!(body["data"]["timezone"], "Asia/Tokyo");

    let datetime = body["data"]["entries"][0]["datetime"].as_str().unwrap();
    assert!(datetime.ends_with("+09:00"), "got {datetime}");
}

#[tokio::test]
async fn test_security_question_lookup() {
    let (app, _, _db) = spawn_app().await;
    signup(&app, "alice").await;

    let response = get(&app, "/api/auth/security-question?username=alice", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["question"], "First car?");
}
