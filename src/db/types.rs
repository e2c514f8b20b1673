//! Row types returned by the database capability.
//!
//! The workflow never looks at individual cells. It stores the rows as a
//! tuple-list string (`[('Alice', 7), ('Bob', None)]`), which is also what
//! the summarizer quotes to the model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Rows produced by one statement.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Row>,
    /// Rows kept after the row cap.
    pub row_count: usize,
    /// True if the server returned more rows than were kept.
    #[serde(default)]
    pub was_truncated: bool,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl QueryResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        Self {
            row_count: rows.len(),
            columns,
            rows,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renders the rows as a list of tuples.
    ///
    /// One-element tuples keep their trailing comma and an empty result is
    /// `[]`, which the summarizer reads as "no data".
    pub fn to_result_text(&self) -> String {
        let tuples: Vec<String> = self.rows.iter().map(|row| tuple_text(row)).collect();
        format!("[{}]", tuples.join(", "))
    }
}

fn tuple_text(row: &[Value]) -> String {
    let cells: Vec<String> = row.iter().map(|v| v.literal()).collect();
    match cells.as_slice() {
        [single] => format!("({single},)"),
        _ => format!("({})", cells.join(", ")),
    }
}

/// Name and server type of a result column.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

pub type Row = Vec<Value>;

/// A single cell.
///
/// Dates, times, uuids and json arrive as `Text` in their canonical string
/// form. `NUMERIC` keeps its exact digits in `Numeric`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Exact decimal, rendered unquoted.
    Numeric(String),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Literal form used in result text: quoted text, `None`, `True`/`False`.
    pub fn literal(&self) -> String {
        match self {
            Self::Null => "None".to_string(),
            Self::Bool(true) => "True".to_string(),
            Self::Bool(false) => "False".to_string(),
            Self::Text(s) => format!("'{}'", s.replace('\'', "\\'")),
            other => other.to_string(),
        }
    }
}

/// Plain rendering, used for sample rows in the schema description.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Numeric(s) | Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
