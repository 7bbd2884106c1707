#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::Value;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`

use ninebyfour_api::auth::{AppState, AppStateInner, create_token};
use ninebyfour_api::build_router;
use ninebyfour_db::Database;
use ninebyfour_types::models::Role;

pub const SECRET: &str = "test-secret";

/// A router over a fresh database file. Keep the value alive for the whole
/// test: dropping it deletes the temp directory.
pub struct TestApp {
    _dir: TempDir,
    pub state: AppState,
    pub router: Router,
}

pub struct TestUser {
    pub id: i64,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::open(&dir.path().join("api.db")).expect("open db");
        let state: AppState = Arc::new(AppStateInner {
            db,
            jwt_secret: SECRET.into(),
            token_ttl: chrono::Duration::hours(1),
        });
        let router = build_router(state.clone());
        Self {
            _dir: dir,
            state,
            router,
        }
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Inserts a user directly (no password hashing) and mints a token.
    pub fn user(&self, name: &str) -> TestUser {
        self.user_with_role(name, Role::User)
    }

    pub fn admin(&self, name: &str) -> TestUser {
        self.user_with_role(name, Role::Admin)
    }

    fn user_with_role(&self, name: &str, role: Role) -> TestUser {
        let id = self
            .db()
            .create_user(name, "unused", &format!("{name}@example.com"), role)
            .expect("create user");
        let token = create_token(SECRET, chrono::Duration::hours(1), id, name, role)
            .expect("token");
        TestUser { id, token }
    }

    pub fn befriend(&self, a: &TestUser, b: &TestUser) {
        self.db().follow(a.id, b.id).expect("follow");
        self.db().follow(b.id, a.id).expect("follow back");
    }

    /// Sends one request through the router and returns status + JSON body
    /// (`Value::Null` when the body is empty or not JSON).
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Should read body");
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.send("GET", uri, Some(&user.token), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(&user.token), Some(body)).await
    }
}
