//! Table endpoints - listing, schema, paged rows, and row CRUD by id

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::{DbError, Row};
use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, KnownTable, QueryParams};
use crate::http::server::AppState;
use crate::models::{ColumnInfo, PageInfo, PageParams, RowWindow, ValidationError};

/// Insert/update request
#[derive(Deserialize)]
pub struct RowRequest {
    pub data: Option<Row>,
}

impl RowRequest {
    fn into_fields(self) -> Result<Row, ValidationError> {
        self.data
            .filter(|data| !data.is_empty())
            .ok_or(ValidationError::Empty { field: "data" })
    }
}

#[derive(Serialize)]
pub struct TablesResponse {
    pub tables: Vec<String>,
}

#[derive(Serialize)]
pub struct SchemaResponse {
    pub table: String,
    pub schema: Vec<ColumnInfo>,
}

#[derive(Serialize)]
pub struct TableDataResponse {
    pub table: String,
    pub data: Vec<Row>,
    pub pagination: PageInfo,
}

#[derive(Serialize)]
pub struct InsertedResponse {
    pub table: String,
    pub inserted: Row,
}

#[derive(Serialize)]
pub struct UpdatedResponse {
    pub table: String,
    pub updated: Row,
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub table: String,
    pub deleted: bool,
    pub message: String,
}

/// Filter on the `id` column.
fn by_id(id: String) -> Row {
    let mut filter = Row::new();
    filter.insert("id".into(), Value::String(id));
    filter
}

/// GET /tables
async fn list_tables(State(state): State<Arc<AppState>>) -> Result<Json<TablesResponse>, ApiError> {
    let tables = state.db.list_tables().await?;
    Ok(Json(TablesResponse { tables }))
}

/// GET /tables/{name}/schema
async fn table_schema(KnownTable(table): KnownTable) -> Json<SchemaResponse> {
    Json(SchemaResponse {
        table: table.name().to_owned(),
        schema: table.into_columns(),
    })
}

/// GET /tables/{name}/data?limit&offset&orderBy&orderDir
async fn table_data(
    State(state): State<Arc<AppState>>,
    KnownTable(table): KnownTable,
    QueryParams(params): QueryParams<PageParams>,
) -> Result<Json<TableDataResponse>, ApiError> {
    let window = RowWindow::try_from(params)?;
    let page = state.db.select_page(&table, &window).await?;

    Ok(Json(TableDataResponse {
        table: table.name().to_owned(),
        data: page.rows,
        pagination: page.info,
    }))
}

/// POST /tables/{name}
async fn insert_row(
    State(state): State<Arc<AppState>>,
    KnownTable(table): KnownTable,
    JsonBody(req): JsonBody<RowRequest>,
) -> Result<(StatusCode, Json<InsertedResponse>), ApiError> {
    let fields = req.into_fields()?;
    let inserted = state.db.insert(&table, &fields).await?;

    Ok((
        StatusCode::CREATED,
        Json(InsertedResponse {
            table: table.name().to_owned(),
            inserted,
        }),
    ))
}

/// PUT /tables/{name}/{id}
async fn update_row(
    State(state): State<Arc<AppState>>,
    KnownTable(table): KnownTable,
    Path((_, id)): Path<(String, String)>,
    JsonBody(req): JsonBody<RowRequest>,
) -> Result<Json<UpdatedResponse>, ApiError> {
    let fields = req.into_fields()?;
    let updated = state
        .db
        .update(&table, &fields, &by_id(id.clone()))
        .await?
        .ok_or(ApiError::NotFound { resource: "row", id })?;

    Ok(Json(UpdatedResponse {
        table: table.name().to_owned(),
        updated,
    }))
}

/// DELETE /tables/{name}/{id}
async fn delete_row(
    State(state): State<Arc<AppState>>,
    KnownTable(table): KnownTable,
    Path((_, id)): Path<(String, String)>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let deleted = state.db.delete(&table, &by_id(id.clone())).await?;
    if !deleted {
        return Err(DbError::query(format!("could not delete row '{}' from '{}'", id, table.name())).into());
    }

    Ok(Json(DeletedResponse {
        table: table.name().to_owned(),
        deleted,
        message: format!("Row '{}' deleted from '{}'", id, table.name()),
    }))
}

/// Table routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tables", get(list_tables))
        .route("/tables/{name}", post(insert_row))
        .route("/tables/{name}/schema", get(table_schema))
        .route("/tables/{name}/data", get(table_data))
        .route("/tables/{name}/{id}", put(update_row).delete(delete_row))
}
