//! SQL execution primitive
//!
//! [`Executor`] is the single seam between the service and the driver.
//! Parameters go in and rows come out as plain JSON values so request bodies
//! can flow straight through to the database and back.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::types::{PgInterval, PgMoney};
use sqlx::postgres::{PgArguments, PgHasArrayType, PgRow, PgTypeInfo, PgTypeKind};
use sqlx::query::Query;
use sqlx::types::Decimal;
use sqlx::{Column, Connection, PgConnection, PgPool, Postgres, Row as _, TypeInfo};
use tokio::sync::Mutex;

use super::error::DbError;

/// A result row: column name to scalar, JSON, or null, in column order.
pub type Row = Map<String, Value>;

/// Runs one statement with `$1..$n` placeholders bound to `params`.
///
/// Implementations must map every driver failure to [`DbError::Query`].
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DbError>;
}

#[async_trait]
impl<T: Executor + ?Sized> Executor for Arc<T> {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DbError> {
        (**self).execute(sql, params).await
    }
}

#[async_trait]
impl Executor for PgPool {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DbError> {
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(self)
            .await
            .map_err(log_failure)?;

        decode_rows(&rows)
    }
}

/// A single, non-pooled connection.
///
/// Statements are serialized through an internal lock; transaction-level
/// exclusion is the service's job.
pub struct DedicatedConnection {
    conn: Mutex<PgConnection>,
}

impl DedicatedConnection {
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        let conn = PgConnection::connect(database_url).await?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl Executor for DedicatedConnection {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DbError> {
        let mut conn = self.conn.lock().await;
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&mut *conn)
            .await
            .map_err(log_failure)?;

        decode_rows(&rows)
    }
}

fn log_failure(e: sqlx::Error) -> DbError {
    tracing::error!(error = %e, "database query error");
    DbError::from(e)
}

/// Bind JSON parameters by their JSON type.
///
/// null binds as a NULL text value, integers as int8, other numbers as
/// float8, strings as text, and arrays/objects as jsonb.
fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [Value],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<&str>),
            Value::Bool(b) => query.bind(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => query.bind(i),
                None => query.bind(n.as_f64()),
            },
            Value::String(s) => query.bind(s.as_str()),
            other => query.bind(sqlx::types::Json(other)),
        };
    }
    query
}

fn decode_rows(rows: &[PgRow]) -> Result<Vec<Row>, DbError> {
    rows.iter()
        .map(|row| decode_row(row).map_err(DbError::from))
        .collect()
}

fn decode_row(row: &PgRow) -> Result<Row, sqlx::Error> {
    let mut out = Map::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_cell(row, idx, column.type_info())?;
        out.insert(column.name().to_owned(), value);
    }
    Ok(out)
}

/// Decode a nullable array column into a JSON array.
fn array<T>(row: &PgRow, idx: usize, to_json: fn(T) -> Value) -> Result<Option<Value>, sqlx::Error>
where
    T: for<'a> sqlx::Decode<'a, Postgres> + sqlx::Type<Postgres> + PgHasArrayType,
{
    Ok(row
        .try_get::<Option<Vec<Option<T>>>, _>(idx)?
        .map(|items| {
            Value::Array(
                items
                    .into_iter()
                    .map(|item| item.map_or(Value::Null, to_json))
                    .collect(),
            )
        }))
}

fn decode_cell(row: &PgRow, idx: usize, type_info: &PgTypeInfo) -> Result<Value, sqlx::Error> {
    let value = match type_info.name() {
        "BOOL" => row.try_get::<Option<bool>, _>(idx)?.map(Value::from),
        "INT2" => row.try_get::<Option<i16>, _>(idx)?.map(Value::from),
        "INT4" => row.try_get::<Option<i32>, _>(idx)?.map(Value::from),
        "INT8" => row.try_get::<Option<i64>, _>(idx)?.map(Value::from),
        "FLOAT4" => row.try_get::<Option<f32>, _>(idx)?.map(Value::from),
        "FLOAT8" => row.try_get::<Option<f64>, _>(idx)?.map(Value::from),
        // exact digits, as a string
        "NUMERIC" => row
            .try_get::<Option<Decimal>, _>(idx)?
            .map(|v| Value::from(v.to_string())),
        "MONEY" => row
            .try_get::<Option<PgMoney>, _>(idx)?
            .map(|v| Value::from(v.to_decimal(2).to_string())),
        "OID" => row
            .try_get::<Option<sqlx::postgres::types::Oid>, _>(idx)?
            .map(|v| Value::from(v.0)),
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" | "UNKNOWN" => {
            row.try_get::<Option<String>, _>(idx)?.map(Value::from)
        }
        "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(idx)?,
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(idx)?
            .map(|v| Value::from(v.to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx)?
            .map(|v| Value::from(v.to_rfc3339())),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(idx)?
            .map(|v| Value::from(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(idx)?
            .map(|v| Value::from(v.to_string())),
        "TIME" => row
            .try_get::<Option<chrono::NaiveTime>, _>(idx)?
            .map(|v| Value::from(v.to_string())),
        "INTERVAL" => row
            .try_get::<Option<PgInterval>, _>(idx)?
            .map(|v| Value::from(interval_text(&v))),
        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(idx)?
            .map(|v| Value::from(bytea_text(&v))),
        "BOOL[]" => array::<bool>(row, idx, Value::from)?,
        "INT2[]" => array::<i16>(row, idx, Value::from)?,
        "INT4[]" => array::<i32>(row, idx, Value::from)?,
        "INT8[]" => array::<i64>(row, idx, Value::from)?,
        "FLOAT4[]" => array::<f32>(row, idx, Value::from)?,
        "FLOAT8[]" => array::<f64>(row, idx, Value::from)?,
        "NUMERIC[]" => array::<Decimal>(row, idx, |v| Value::from(v.to_string()))?,
        "TEXT[]" | "VARCHAR[]" | "CHAR[]" | "BPCHAR[]" | "NAME[]" => {
            array::<String>(row, idx, Value::from)?
        }
        "JSONB[]" => array::<Value>(row, idx, |v| v)?,
        "UUID[]" => array::<uuid::Uuid>(row, idx, |v| Value::from(v.to_string()))?,
        other => match type_info.kind() {
            // enum labels travel as text on the wire
            PgTypeKind::Enum(_) => row
                .try_get_unchecked::<Option<String>, _>(idx)?
                .map(Value::from),
            PgTypeKind::Array(element) if matches!(element.kind(), PgTypeKind::Enum(_)) => row
                .try_get_unchecked::<Option<Vec<Option<String>>>, _>(idx)?
                .map(|labels| {
                    labels
                        .into_iter()
                        .map(|label| label.map_or(Value::Null, Value::from))
                        .collect()
                }),
            _ => {
                tracing::warn!(column_type = other, column = idx, "no decoder for column type");
                None
            }
        },
    };
    Ok(value.unwrap_or(Value::Null))
}

/// ISO 8601 duration, e.g. `P14M3DT7200.5S`.
fn interval_text(interval: &PgInterval) -> String {
    let sign = if interval.microseconds < 0 { "-" } else { "" };
    let micros = interval.microseconds.unsigned_abs();
    let (secs, frac) = (micros / 1_000_000, micros % 1_000_000);

    let seconds = if frac == 0 {
        format!("{}{}", sign, secs)
    } else {
        let frac = format!("{:06}", frac);
        format!("{}{}.{}", sign, secs, frac.trim_end_matches('0'))
    };
    format!("P{}M{}DT{}S", interval.months, interval.days, seconds)
}

/// Postgres hex output format: `\x` followed by two digits per byte.
fn bytea_text(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for byte in bytes {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}
