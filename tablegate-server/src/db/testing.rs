//! Scripted executor and catalog fixtures for unit tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::error::DbError;
use super::executor::{Executor, Row};
use super::statement::TableRef;
use crate::models::ColumnInfo;

type Responder = Box<dyn Fn(&str, &[Value]) -> Result<Vec<Row>, DbError> + Send + Sync>;

/// Records every statement and answers from a closure.
pub(crate) struct ScriptedExecutor {
    calls: Mutex<Vec<(String, Vec<Value>)>>,
    respond: Responder,
}

impl ScriptedExecutor {
    pub(crate) fn new<F>(respond: F) -> Arc<Self>
    where
        F: Fn(&str, &[Value]) -> Result<Vec<Row>, DbError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        })
    }

    /// Every statement fails with the given driver message.
    pub(crate) fn failing(message: &'static str) -> Arc<Self> {
        Self::new(move |_, _| Err(DbError::query(message)))
    }

    pub(crate) fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn statements(&self) -> Vec<String> {
        self.calls().into_iter().map(|(sql, _)| sql).collect()
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DbError> {
        self.calls
            .lock()
            .unwrap()
            .push((sql.to_owned(), params.to_vec()));
        (self.respond)(sql, params)
    }
}

/// Rows from a JSON array of objects.
pub(crate) fn rows(value: Value) -> Vec<Row> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_object().cloned())
                .collect()
        })
        .unwrap_or_default()
}

fn users_catalog() -> Value {
    json!([
        {
            "column_name": "id",
            "data_type": "integer",
            "udt_name": "int4",
            "is_nullable": "NO",
            "column_default": "nextval('users_id_seq'::regclass)",
            "character_maximum_length": null
        },
        {
            "column_name": "name",
            "data_type": "character varying",
            "udt_name": "varchar",
            "is_nullable": "YES",
            "column_default": null,
            "character_maximum_length": 255
        }
    ])
}

fn posts_catalog() -> Value {
    json!([
        {
            "column_name": "id",
            "data_type": "integer",
            "udt_name": "int4",
            "is_nullable": "NO",
            "column_default": null,
            "character_maximum_length": null
        },
        {
            "column_name": "title",
            "data_type": "text",
            "udt_name": "text",
            "is_nullable": "NO",
            "column_default": null,
            "character_maximum_length": null
        }
    ])
}

/// `users(id int4 not null, name varchar(255))`
pub(crate) fn users_table() -> TableRef {
    let columns = rows(users_catalog())
        .iter()
        .map(|row| ColumnInfo::from_row(row).unwrap())
        .collect();
    TableRef::new("users", columns)
}

/// `profiles(id int4, tags text[], active bool, score numeric)`
pub(crate) fn profiles_table() -> TableRef {
    let column = |name: &str, data_type: &str, udt: &str| ColumnInfo {
        column_name: name.into(),
        data_type: data_type.into(),
        udt_name: Some(udt.into()),
        nullable: true,
        default_expr: None,
        max_length: None,
    };
    TableRef::new(
        "profiles",
        vec![
            column("id", "integer", "int4"),
            column("tags", "ARRAY", "_text"),
            column("active", "boolean", "bool"),
            column("score", "numeric", "numeric"),
        ],
    )
}

/// Answer catalog queries for `posts` and `users`; delegate the rest.
pub(crate) fn with_catalog<F>(
    fallback: F,
) -> impl Fn(&str, &[Value]) -> Result<Vec<Row>, DbError> + Send + Sync + 'static
where
    F: Fn(&str, &[Value]) -> Result<Vec<Row>, DbError> + Send + Sync + 'static,
{
    move |sql, params| {
        if sql.contains("information_schema.tables") {
            return Ok(rows(json!([{ "table_name": "posts" }, { "table_name": "users" }])));
        }
        if sql.contains("information_schema.columns") {
            return Ok(match params.first().and_then(Value::as_str) {
                Some("users") => rows(users_catalog()),
                Some("posts") => rows(posts_catalog()),
                _ => Vec::new(),
            });
        }
        fallback(sql, params)
    }
}
