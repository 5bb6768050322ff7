//! Raw SQL endpoints

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::Row;
use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, QueryParams};
use crate::http::server::AppState;
use crate::models::{require_select, ValidationError};

#[derive(Deserialize)]
pub struct SqlParams {
    pub sql: Option<String>,
}

#[derive(Deserialize)]
pub struct QueryRequest {
    pub sql: Option<String>,
    #[serde(default)]
    pub params: Vec<Value>,
}

#[derive(Serialize)]
pub struct QueryResponse {
    pub sql: String,
    pub results: Vec<Row>,
    pub count: usize,
}

fn required_sql(sql: Option<String>) -> Result<String, ValidationError> {
    sql.filter(|s| !s.trim().is_empty())
        .ok_or(ValidationError::Empty { field: "sql" })
}

/// GET /query?sql= - SELECT only
async fn select_query(
    State(state): State<Arc<AppState>>,
    QueryParams(params): QueryParams<SqlParams>,
) -> Result<Json<QueryResponse>, ApiError> {
    let sql = required_sql(params.sql)?;
    require_select(&sql)?;

    let results = state.db.query(&sql, &[]).await?;
    Ok(Json(QueryResponse {
        count: results.len(),
        sql,
        results,
    }))
}

/// POST /query - parameterized, checked against the server's SQL policy
async fn run_query(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let sql = required_sql(req.sql)?;
    state.sql_policy.check(&sql)?;

    let results = state.db.query(&sql, &req.params).await?;
    tracing::debug!(rows = results.len(), "raw query executed");

    Ok(Json(QueryResponse {
        count: results.len(),
        sql,
        results,
    }))
}

/// Query routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/query", get(select_query).post(run_query))
}

#[cfg(test)]
mod tests {
    use crate::db::testing::{rows, ScriptedExecutor};
    use crate::http::routes::testing::{app, app_with_policy, send};
    use crate::models::SqlPolicy;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    fn answering() -> std::sync::Arc<ScriptedExecutor> {
        ScriptedExecutor::new(|_, _| Ok(rows(json!([{ "id": 1 }, { "id": 2 }]))))
    }

    #[tokio::test]
    async fn get_runs_select() {
        let exec = answering();

        let (status, body) = send(
            app(exec.clone()),
            Method::GET,
            "/query?sql=SELECT%20id%20FROM%20users",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sql"], "SELECT id FROM users");
        assert_eq!(body["count"], 2);
        assert_eq!(body["results"], json!([{ "id": 1 }, { "id": 2 }]));
        assert_eq!(exec.statements(), vec!["SELECT id FROM users"]);
    }

    #[tokio::test]
    async fn get_without_sql_is_400() {
        let exec = answering();

        let (status, body) = send(app(exec.clone()), Method::GET, "/query", None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "sql is required");
        assert!(exec.calls().is_empty());
    }

    #[tokio::test]
    async fn get_rejects_non_select() {
        let exec = answering();

        let (status, _) = send(
            app(exec.clone()),
            Method::GET,
            "/query?sql=DELETE%20FROM%20users",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(exec.calls().is_empty());
    }

    #[tokio::test]
    async fn post_binds_params() {
        let exec = answering();

        let (status, body) = send(
            app(exec.clone()),
            Method::POST,
            "/query",
            Some(json!({ "sql": "SELECT * FROM users WHERE id = $1", "params": [1] })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(
            exec.calls(),
            vec![("SELECT * FROM users WHERE id = $1".to_string(), vec![json!(1)])]
        );
    }

    #[tokio::test]
    async fn post_without_sql_is_400() {
        let (status, body) = send(
            app(answering()),
            Method::POST,
            "/query",
            Some(json!({ "params": [] })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn unrestricted_post_accepts_writes() {
        let exec = ScriptedExecutor::new(|_, _| Ok(Vec::new()));

        let (status, body) = send(
            app(exec),
            Method::POST,
            "/query",
            Some(json!({ "sql": "UPDATE users SET name = $1", "params": ["x"] })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn select_only_policy_rejects_writes() {
        let exec = answering();

        let (status, body) = send(
            app_with_policy(exec.clone(), SqlPolicy::SelectOnly),
            Method::POST,
            "/query",
            Some(json!({ "sql": "DROP TABLE users" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
        assert!(exec.calls().is_empty());
    }

    #[tokio::test]
    async fn driver_error_is_500() {
        let (status, body) = send(
            app(ScriptedExecutor::failing("relation \"nope\" does not exist")),
            Method::POST,
            "/query",
            Some(json!({ "sql": "SELECT * FROM nope" })),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["message"],
            "Database query failed: relation \"nope\" does not exist"
        );
    }
}
