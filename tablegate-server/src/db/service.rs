//! Database service - generic CRUD, introspection, health
//!
//! Constructed once by the entry point and shared through `AppState`.
//! Table and column names reach SQL text only through [`TableRef`], which is
//! resolved here against the live catalog.

use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;

use super::error::DbError;
use super::executor::{Executor, Row};
use super::statement::{self, Statement, TableRef};
use super::transaction::Session;
use crate::models::{ColumnInfo, HealthReport, PageInfo, RowWindow};

const LIST_TABLES_SQL: &str = "\
SELECT table_name::text AS table_name
FROM information_schema.tables
WHERE table_schema = 'public'
ORDER BY table_name";

const TABLE_SCHEMA_SQL: &str = "\
SELECT
    column_name::text AS column_name,
    data_type::text AS data_type,
    udt_name::text AS udt_name,
    is_nullable::text AS is_nullable,
    column_default::text AS column_default,
    character_maximum_length::int4 AS character_maximum_length
FROM information_schema.columns
WHERE table_schema = 'public' AND table_name = $1
ORDER BY ordinal_position";

/// One page of table rows
#[derive(Debug, Clone)]
pub struct RowPage {
    pub rows: Vec<Row>,
    pub info: PageInfo,
}

/// Generic database operations over a pooled executor, plus an optional
/// dedicated executor for transactions.
pub struct DatabaseService {
    pooled: Box<dyn Executor>,
    pub(super) unpooled: Option<Mutex<Session>>,
}

impl DatabaseService {
    pub fn new<E: Executor + 'static>(pooled: E) -> Self {
        Self {
            pooled: Box::new(pooled),
            unpooled: None,
        }
    }

    /// Attach the dedicated connection used by [`Self::run_in_transaction`].
    pub fn with_unpooled<E: Executor + 'static>(mut self, unpooled: E) -> Self {
        self.unpooled = Some(Mutex::new(Session::new(Box::new(unpooled))));
        self
    }

    pub fn has_unpooled(&self) -> bool {
        self.unpooled.is_some()
    }

    /// Execute a statement and return every row.
    pub async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DbError> {
        tracing::debug!(sql, params = params.len(), "executing query");
        self.pooled.execute(sql, params).await
    }

    /// Execute a statement and return the first row, if any.
    pub async fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, DbError> {
        Ok(self.query(sql, params).await?.into_iter().next())
    }

    async fn run(&self, stmt: &Statement) -> Result<Vec<Row>, DbError> {
        self.query(&stmt.text, &stmt.params).await
    }

    /// User tables in the public schema, alphabetically.
    pub async fn list_tables(&self) -> Result<Vec<String>, DbError> {
        let rows = self.query(LIST_TABLES_SQL, &[]).await?;
        Ok(rows
            .into_iter()
            .filter_map(|mut row| match row.remove("table_name") {
                Some(Value::String(name)) => Some(name),
                _ => None,
            })
            .collect())
    }

    /// Column metadata in ordinal order. Unknown tables yield an empty list.
    pub async fn get_table_schema(&self, table: &str) -> Result<Vec<ColumnInfo>, DbError> {
        let rows = self
            .query(TABLE_SCHEMA_SQL, &[Value::from(table)])
            .await?;
        rows.iter().map(ColumnInfo::from_row).collect()
    }

    /// Check `name` against the table allowlist and load its columns.
    pub async fn table(&self, name: &str) -> Result<TableRef, DbError> {
        let tables = self.list_tables().await?;
        if !tables.iter().any(|t| t == name) {
            return Err(DbError::NotFound {
                resource: "table",
                id: name.to_owned(),
            });
        }

        let columns = self.get_table_schema(name).await?;
        Ok(TableRef::new(name, columns))
    }

    /// Insert one row and return it as stored.
    pub async fn insert(&self, table: &TableRef, fields: &Row) -> Result<Row, DbError> {
        let stmt = statement::insert(table, fields)?;
        let row = self
            .run(&stmt)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DbError::query("INSERT returned no rows"))?;

        tracing::info!(table = table.name(), "row inserted");
        Ok(row)
    }

    /// Update matching rows and return the first, or `None` when nothing matched.
    pub async fn update(
        &self,
        table: &TableRef,
        fields: &Row,
        filter: &Row,
    ) -> Result<Option<Row>, DbError> {
        let stmt = statement::update(table, fields, filter)?;
        let mut rows = self.run(&stmt).await?;

        tracing::info!(table = table.name(), matched = rows.len(), "rows updated");
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    /// Delete matching rows.
    ///
    /// `Ok(true)` means the statement ran, not that a row was removed; a
    /// filter matching nothing still reports success. Execution failures are
    /// logged and reported as `Ok(false)`. Invalid input is still an `Err`.
    pub async fn delete(&self, table: &TableRef, filter: &Row) -> Result<bool, DbError> {
        let stmt = statement::delete(table, filter)?;

        match self.run(&stmt).await {
            Ok(_) => {
                tracing::info!(table = table.name(), "delete executed");
                Ok(true)
            }
            Err(e) => {
                tracing::error!(table = table.name(), error = %e, "delete operation failed");
                Ok(false)
            }
        }
    }

    /// A window of rows plus the table's total row count.
    pub async fn select_page(&self, table: &TableRef, window: &RowWindow) -> Result<RowPage, DbError> {
        let stmt = statement::select_page(table, window)?;
        let rows = self.run(&stmt).await?;

        let total = self
            .run(&statement::count(table))
            .await?
            .first()
            .and_then(|row| row.get("total"))
            .and_then(Value::as_i64)
            .unwrap_or(0);

        let info = PageInfo::new(window, rows.len(), total);
        Ok(RowPage { rows, info })
    }

    /// Connectivity probe. Never fails; the outcome is in the report.
    pub async fn health_check(&self) -> HealthReport {
        match self.probe().await {
            Ok((timestamp, tables)) => HealthReport::healthy(timestamp, tables),
            Err(e) => {
                tracing::warn!(error = %e, "health check failed");
                HealthReport::error(Utc::now())
            }
        }
    }

    async fn probe(&self) -> Result<(String, Vec<String>), DbError> {
        let now = self
            .query_one("SELECT NOW() AS now", &[])
            .await?
            .and_then(|mut row| match row.remove("now") {
                Some(Value::String(ts)) => Some(ts),
                _ => None,
            })
            .ok_or_else(|| DbError::query("SELECT NOW() returned no timestamp"))?;

        let tables = self.list_tables().await?;
        Ok((now, tables))
    }
}
