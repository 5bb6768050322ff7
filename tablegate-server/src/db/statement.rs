//! Statement builders for generic CRUD
//!
//! Identifiers cannot be bound as placeholders, so they are rendered into
//! the SQL text. Every identifier rendered here comes from a [`TableRef`],
//! which only the service constructs from the introspected catalog, and is
//! double-quoted on the way out. Values always travel as parameters.

use serde_json::Value;

use super::executor::Row;
use crate::models::{ColumnInfo, RowWindow, ValidationError};

/// SQL text plus its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub params: Vec<Value>,
}

impl Statement {
    fn new(text: String, params: Vec<Value>) -> Self {
        let stmt = Self { text, params };
        debug_assert_eq!(stmt.placeholder_count(), stmt.params.len());
        stmt
    }

    /// Highest `$n` placeholder referenced by the text.
    fn placeholder_count(&self) -> usize {
        let mut max = 0;
        let bytes = self.text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'$' {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }
                if let Ok(n) = self.text[start..end].parse::<usize>() {
                    max = max.max(n);
                }
                i = end;
            } else {
                i += 1;
            }
        }
        max
    }
}

/// A table that exists in the catalog, with its columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    name: String,
    columns: Vec<ColumnInfo>,
}

impl TableRef {
    pub(crate) fn new(name: impl Into<String>, columns: Vec<ColumnInfo>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<ColumnInfo> {
        self.columns
    }

    fn column(&self, name: &str) -> Result<&ColumnInfo, ValidationError> {
        self.columns
            .iter()
            .find(|c| c.column_name == name)
            .ok_or_else(|| ValidationError::UnknownColumn {
                table: self.name.clone(),
                column: name.to_owned(),
            })
    }

    fn quoted(&self) -> String {
        quote_ident(&self.name)
    }
}

/// Quote an identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// `$n`, cast to the column's type so text input reaches typed columns.
///
/// A JSON array bound for an array column (udt `_<elem>`) travels as jsonb
/// and is unpacked element by element before the cast.
fn placeholder(index: usize, column: &ColumnInfo, value: &Value) -> String {
    match (column.udt_name.as_deref(), value) {
        (Some(udt), Value::Array(_)) if udt.starts_with('_') => format!(
            "ARRAY(SELECT jsonb_array_elements_text(${}))::{}",
            index,
            quote_ident(udt)
        ),
        (Some(udt), _) => format!("${}::{}", index, quote_ident(udt)),
        (None, _) => format!("${}", index),
    }
}

/// Numbers and booleans bound for a typed column travel as text, so the
/// column cast parses them (`1` into bool, `12.50` into numeric).
fn column_param(column: &ColumnInfo, value: &Value) -> Value {
    if column.udt_name.is_none() {
        return value.clone();
    }
    match value {
        Value::Number(n) => Value::String(n.to_string()),
        Value::Bool(b) => Value::String(b.to_string()),
        other => other.clone(),
    }
}

/// `"col" = $n` terms numbered from `first`, validated against the table.
fn equality_terms(
    table: &TableRef,
    values: &Row,
    first: usize,
    params: &mut Vec<Value>,
) -> Result<Vec<String>, ValidationError> {
    values
        .iter()
        .enumerate()
        .map(|(offset, (key, value))| {
            let column = table.column(key)?;
            params.push(column_param(column, value));
            Ok(format!(
                "{} = {}",
                quote_ident(key),
                placeholder(first + offset, column, value)
            ))
        })
        .collect()
}

/// `INSERT INTO "t" ("a", "b") VALUES ($1, $2) RETURNING *`
pub fn insert(table: &TableRef, fields: &Row) -> Result<Statement, ValidationError> {
    if fields.is_empty() {
        return Err(ValidationError::Empty { field: "data" });
    }

    let mut columns = Vec::with_capacity(fields.len());
    let mut placeholders = Vec::with_capacity(fields.len());
    let mut params = Vec::with_capacity(fields.len());

    for (index, (key, value)) in fields.iter().enumerate() {
        let column = table.column(key)?;
        columns.push(quote_ident(key));
        placeholders.push(placeholder(index + 1, column, value));
        params.push(column_param(column, value));
    }

    Ok(Statement::new(
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            table.quoted(),
            columns.join(", "),
            placeholders.join(", ")
        ),
        params,
    ))
}

/// `UPDATE "t" SET ... WHERE ... RETURNING *`
///
/// SET parameters occupy `$1..=$len(fields)`; WHERE parameters follow.
pub fn update(table: &TableRef, fields: &Row, filter: &Row) -> Result<Statement, ValidationError> {
    if fields.is_empty() {
        return Err(ValidationError::Empty { field: "data" });
    }
    if filter.is_empty() {
        return Err(ValidationError::Empty { field: "where" });
    }

    let mut params = Vec::with_capacity(fields.len() + filter.len());
    let set = equality_terms(table, fields, 1, &mut params)?;
    let conditions = equality_terms(table, filter, fields.len() + 1, &mut params)?;

    Ok(Statement::new(
        format!(
            "UPDATE {} SET {} WHERE {} RETURNING *",
            table.quoted(),
            set.join(", "),
            conditions.join(" AND ")
        ),
        params,
    ))
}

/// `DELETE FROM "t" WHERE ...`
pub fn delete(table: &TableRef, filter: &Row) -> Result<Statement, ValidationError> {
    if filter.is_empty() {
        return Err(ValidationError::Empty { field: "where" });
    }

    let mut params = Vec::with_capacity(filter.len());
    let conditions = equality_terms(table, filter, 1, &mut params)?;

    Ok(Statement::new(
        format!(
            "DELETE FROM {} WHERE {}",
            table.quoted(),
            conditions.join(" AND ")
        ),
        params,
    ))
}

/// `SELECT * FROM "t" [ORDER BY "c" dir] LIMIT $1 OFFSET $2`
pub fn select_page(table: &TableRef, window: &RowWindow) -> Result<Statement, ValidationError> {
    let order = match &window.order_by {
        Some((column, direction)) => {
            table.column(column)?;
            format!(" ORDER BY {} {}", quote_ident(column), direction.as_sql())
        }
        None => String::new(),
    };

    Ok(Statement::new(
        format!(
            "SELECT * FROM {}{} LIMIT $1 OFFSET $2",
            table.quoted(),
            order
        ),
        vec![Value::from(window.limit), Value::from(window.offset)],
    ))
}

/// `SELECT COUNT(*) AS total FROM "t"`
pub fn count(table: &TableRef) -> Statement {
    Statement::new(
        format!("SELECT COUNT(*) AS total FROM {}", table.quoted()),
        Vec::new(),
    )
}
