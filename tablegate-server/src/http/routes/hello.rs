//! Hello endpoint - echoes the request line with a timestamp

use std::sync::Arc;

use axum::extract::OriginalUri;
use axum::http::Method;
use axum::{routing::any, Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::http::server::AppState;

#[derive(Serialize)]
pub struct HelloResponse {
    pub message: &'static str,
    pub timestamp: String,
    pub path: String,
    pub method: String,
}

/// ANY /hello
async fn hello(method: Method, OriginalUri(uri): OriginalUri) -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Hello from tablegate!",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        path: uri.path().to_owned(),
        method: method.to_string(),
    })
}

/// Hello routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/hello", any(hello))
}
