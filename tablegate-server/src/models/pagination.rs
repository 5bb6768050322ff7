//! Limit/offset paging for table data

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Maximum rows per page
const MAX_LIMIT: u32 = 1000;

/// Default rows per page
const DEFAULT_LIMIT: u32 = 50;

/// Sort direction for `ORDER BY`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(ValidationError::InvalidVariant {
                field: "orderDir",
                value: value.to_owned(),
            }),
        }
    }
}

/// A window over a table's rows.
///
/// The order column is unchecked here; the statement builder validates it
/// against the table's schema before it is rendered into SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowWindow {
    pub limit: u32,
    pub offset: u64,
    pub order_by: Option<(String, SortDirection)>,
}

impl RowWindow {
    /// Create a window with the limit clamped to 1..=1000.
    pub fn new(limit: u32, offset: u64) -> Self {
        Self {
            limit: limit.clamp(1, MAX_LIMIT),
            offset,
            order_by: None,
        }
    }

    pub fn ordered_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by = Some((column.into(), direction));
        self
    }
}

impl Default for RowWindow {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT, 0)
    }
}

/// Query parameters for `GET /tables/{name}/data`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub limit: Option<u32>,
    pub offset: Option<u64>,
    pub order_by: Option<String>,
    pub order_dir: Option<String>,
}

impl TryFrom<PageParams> for RowWindow {
    type Error = ValidationError;

    fn try_from(params: PageParams) -> Result<Self, Self::Error> {
        let window = Self::new(
            params.limit.unwrap_or(DEFAULT_LIMIT),
            params.offset.unwrap_or(0),
        );

        let direction = match params.order_dir.as_deref() {
            Some(dir) => SortDirection::parse(dir)?,
            None => SortDirection::default(),
        };

        Ok(match params.order_by {
            Some(column) if !column.is_empty() => window.ordered_by(column, direction),
            _ => window,
        })
    }
}

/// Paging metadata returned alongside a page of rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub limit: u32,
    pub offset: u64,
    pub total: i64,
    pub has_more: bool,
}

impl PageInfo {
    pub fn new(window: &RowWindow, returned: usize, total: i64) -> Self {
        let seen = window.offset.saturating_add(returned as u64);
        Self {
            limit: window.limit,
            offset: window.offset,
            total,
            has_more: (seen as i64) < total,
        }
    }
}
