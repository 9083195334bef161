#![allow(dead_code)]

use std::collections::HashMap;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Duration;
use serde_json::Value;
use tower::ServiceExt;

use task_organizer_api::auth::{TokenCodec, TokenIdentity};
use task_organizer_api::config::AppConfig;
use task_organizer_api::{app, AppState};

pub const SECRET: &str = "integration-secret-integration-secret";

/// Configuration whose database lives on a port nothing listens on.
pub fn config() -> AppConfig {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("JWT_SECRET", SECRET),
        ("DB_SERVER", "127.0.0.1"),
        ("DB_PORT", "1"),
        ("DB_NAME", "tasks_test"),
        ("DB_USER", "tester"),
        ("DB_CONNECT_TIMEOUT_SECS", "1"),
        ("DB_STATEMENT_TIMEOUT_SECS", "1"),
        ("API_ENABLE_REQUEST_LOGGING", "false"),
    ]);
    AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
        .expect("test configuration is valid")
}

pub fn router() -> Router {
    app(AppState::new(config()).expect("state builds from valid config"))
}

pub fn token_for(id: &str, ttl: Duration) -> String {
    let identity = TokenIdentity {
        id: id.to_string(),
        email: "ada@example.com".to_string(),
        firstname: "Ada".to_string(),
        lastname: "Lovelace".to_string(),
    };
    let codec = TokenCodec::new(SECRET).expect("codec builds");
    codec.issue(&identity, ttl).expect("token issues")
}

/// Send one request through the router and decode the JSON body.
pub async fn send(
    router: Router,
    method: Method,
    uri: &str,
    authorization: Option<&str>,
    body: Option<&str>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))?,
        None => builder.body(Body::empty())?,
    };

    let response = router.oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    Ok((status, value))
}
