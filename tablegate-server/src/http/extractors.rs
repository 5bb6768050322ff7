//! Custom Axum extractors

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts, Path};
use axum::http::request::Parts;

use super::error::ApiError;
use super::server::AppState;
use crate::db::TableRef;
use crate::models::ValidationError;

/// JSON body whose rejections render as [`ApiError`] JSON.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Query string whose rejections render as [`ApiError`] JSON.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

/// The `{name}` path segment, checked against the live table list.
///
/// Rejects with 404 before any statement touches the table.
pub struct KnownTable(pub TableRef);

impl FromRequestParts<Arc<AppState>> for KnownTable {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Path(params): Path<HashMap<String, String>> =
            Path::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::Validation(ValidationError::Empty { field: "table name" }))?;

        let name = params
            .get("name")
            .filter(|name| !name.is_empty())
            .ok_or(ApiError::Validation(ValidationError::Empty { field: "table name" }))?;

        let table = state.db.table(name).await?;
        Ok(Self(table))
    }
}
