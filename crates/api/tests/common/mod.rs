//! Shared helpers for API integration tests.
//!
//! Builds the application router through the same [`build_app_router`] used
//! by the production binary, so tests exercise the full middleware stack.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

use sgb_api::auth::jwt::{generate_access_token, JwtConfig};
use sgb_api::config::ServerConfig;
use sgb_api::router::build_app_router;
use sgb_api::state::AppState;
use sgb_db::models::user::CreateUser;
use sgb_db::repositories::UserRepo;

/// JWT secret shared by the test config and the token helper.
const TEST_JWT_SECRET: &str = "integration-test-secret-long-enough-for-hmac";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expiry_mins: 60,
        },
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

/// Issue a valid access token for the given user and active role.
pub fn token_for(user_id: i64, role: &str) -> String {
    let config = test_config();
    generate_access_token(user_id, role, &config.jwt).expect("token generation should succeed")
}

/// Seed a user holding the given roles. The password hash is a fixed valid
/// Argon2id hash of `"integration-pass"`.
pub async fn seed_user(pool: &PgPool, document: &str, name: &str, roles: &[&str]) -> i64 {
    let user = UserRepo::create(
        pool,
        &CreateUser {
            document: document.to_string(),
            first_name: name.to_string(),
            last_name: "Test".to_string(),
            email: format!("{document}@example.com"),
            password_hash: sgb_api::auth::password::hash_password("integration-pass")
                .expect("hashing should succeed"),
        },
    )
    .await
    .expect("user creation should succeed");
    for role in roles {
        UserRepo::grant_role(pool, user.id, role)
            .await
            .expect("role grant should succeed");
    }
    user.id
}

/// Send a GET request with an optional bearer token.
pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Send a POST request with a JSON body and an optional bearer token.
pub async fn post(app: &Router, uri: &str, token: Option<&str>, body: Value) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    app.clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = http_body_util::BodyExt::collect(response.into_body())
        .await
        .unwrap()
        .to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
