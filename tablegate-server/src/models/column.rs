//! Column metadata from `information_schema.columns`

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::{DbError, Row};

/// One column of a table, in physical (ordinal) order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub column_name: String,
    pub data_type: String,
    /// Underlying type name (`int4`, `varchar`, `_text`, enum names).
    /// Used to cast bound parameters to the column's type; not part of the
    /// schema response.
    #[serde(skip_serializing)]
    pub udt_name: Option<String>,
    pub nullable: bool,
    pub default_expr: Option<String>,
    pub max_length: Option<i64>,
}

impl ColumnInfo {
    /// Build from a catalog row produced by the schema query.
    pub fn from_row(row: &Row) -> Result<Self, DbError> {
        let text = |key: &str| row.get(key).and_then(Value::as_str).map(str::to_owned);

        let column_name = text("column_name").ok_or_else(|| DbError::Query {
            message: "catalog row is missing column_name".into(),
        })?;

        Ok(Self {
            column_name,
            data_type: text("data_type").unwrap_or_default(),
            udt_name: text("udt_name").filter(|udt| !udt.is_empty()),
            nullable: text("is_nullable").is_some_and(|v| v.eq_ignore_ascii_case("YES")),
            default_expr: text("column_default"),
            max_length: row.get("character_maximum_length").and_then(Value::as_i64),
        })
    }
}
