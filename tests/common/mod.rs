// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use quizroom::config::Config;
use quizroom::db::{Database, FirestoreDb, MemoryDb};
use quizroom::models::{GoogleProfile, Role, User, UserUpdate};
use quizroom::routes::create_router;
use quizroom::services::TokenPair;
use quizroom::AppState;
use serde_json::Value;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app backed by the in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    create_test_app_with(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> (Router, Arc<AppState>) {
    let state = Arc::new(
        AppState::new(config, Database::Memory(MemoryDb::new()))
            .expect("Failed to build app state"),
    );
    (create_router(state.clone()), state)
}

/// The in-memory store behind a test app.
#[allow(dead_code)]
pub fn memory_db(state: &AppState) -> &MemoryDb {
    match &state.db {
        Database::Memory(db) => db,
        Database::Firestore(_) => panic!("test app should use the memory backend"),
    }
}

/// Create (or refresh) a user as a Google login would, optionally with a role.
#[allow(dead_code)]
pub async fn seed_user(state: &AppState, email: &str, role: Option<Role>) -> User {
    let profile = GoogleProfile {
        email: email.to_string(),
        name: "Test User".to_string(),
        picture: Some("https://example.com/pic.jpg".to_string()),
    };
    let user = state.db.upsert_login_user(&profile).await.unwrap();
    match role {
        Some(role) => state
            .db
            .update_user(
                email,
                &UserUpdate {
                    role: Some(role),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap(),
        None => user,
    }
}

/// Seed a user and issue a token pair, recording the refresh token like a login.
#[allow(dead_code)]
pub async fn login(state: &AppState, email: &str, role: Option<Role>) -> TokenPair {
    let user = seed_user(state, email, role).await;
    let pair = state.tokens.issue_pair(&user).unwrap();
    state
        .db
        .set_refresh_token(email, Some(&pair.refresh_token))
        .await
        .unwrap();
    pair
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// `Location` header of a redirect.
#[allow(dead_code)]
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(axum::http::header::LOCATION)
        .expect("missing Location header")
        .to_str()
        .unwrap()
        .to_string()
}

/// Serve `app` on an ephemeral local port and return its base URL.
#[allow(dead_code)]
pub async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

// ─── Stub Google Provider ────────────────────────────────────

/// Canned behavior for the fake token and userinfo endpoints.
#[derive(Clone)]
pub struct StubGoogle {
    pub token_status: StatusCode,
    pub userinfo_status: StatusCode,
    pub email: String,
    pub name: String,
}

impl Default for StubGoogle {
    fn default() -> Self {
        Self {
            token_status: StatusCode::OK,
            userinfo_status: StatusCode::OK,
            email: "ada@example.com".to_string(),
            name: "Ada Lovelace".to_string(),
        }
    }
}

async fn stub_token(State(stub): State<Arc<StubGoogle>>) -> Response {
    if !stub.token_status.is_success() {
        return (
            stub.token_status,
            Json(serde_json::json!({ "error": "invalid_grant" })),
        )
            .into_response();
    }
    Json(serde_json::json!({
        "access_token": "google-access-token",
        "expires_in": 3599,
        "token_type": "Bearer",
        "scope": "profile email",
    }))
    .into_response()
}

async fn stub_userinfo(State(stub): State<Arc<StubGoogle>>) -> Response {
    if !stub.userinfo_status.is_success() {
        return (stub.userinfo_status, "upstream failure").into_response();
    }
    Json(serde_json::json!({
        "id": "1234567890",
        "email": stub.email,
        "verified_email": true,
        "name": stub.name,
        "picture": "https://example.com/ada.jpg",
    }))
    .into_response()
}

/// Start a fake Google and return a config pointing at it.
#[allow(dead_code)]
pub async fn config_with_stub_google(stub: StubGoogle) -> Config {
    let app = Router::new()
        .route("/token", post(stub_token))
        .route("/userinfo", get(stub_userinfo))
        .with_state(Arc::new(stub));
    let base = spawn_server(app).await;

    let mut config = Config::test_default();
    config.google_token_url = format!("{}/token", base);
    config.google_userinfo_url = format!("{}/userinfo", base);
    config
}
