#![allow(dead_code)]

use std::collections::HashMap;

use adunni_storefront::{
    app_state::AppState,
    config::{self, AppConfig},
    db, routes,
};
use axum::{
    Router,
    body::{self, Body},
    http::{Request, Response, header},
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration-test-secret";

pub fn test_config(database_url: &str) -> AppConfig {
    let vars: HashMap<&str, String> = HashMap::from([
        ("DATABASE_URL", database_url.to_string()),
        ("JWT_SECRET", JWT_SECRET.to_string()),
    ]);
    config::from_lookup(|name| vars.get(name).cloned()).expect("test config")
}

/// App over a pool that never connects, for paths that fail before touching
/// the database.
pub fn offline_app() -> (Router, AppState) {
    let config = test_config("postgres://nobody@127.0.0.1:1/none");
    let pool = db::create_lazy_pool(&config.database.url);
    let state = AppState::with_pool(config, pool);
    (routes::app(state.clone()), state)
}

pub fn admin_token(state: &AppState) -> String {
    state
        .tokens
        .issue(Uuid::new_v4(), "admin")
        .expect("token")
}

pub fn json_request(method: &str, uri: &str, body: &Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).expect("request")
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("infallible router")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}
