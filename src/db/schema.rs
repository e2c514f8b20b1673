//! Database schema types.
//!
//! Holds the introspected description of the tables exposed to the model
//! and renders it as the grounding text used in generation prompts.

use serde::{Deserialize, Serialize};

use super::types::Row;

/// Represents the schema of the database, as seen by the model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    /// All tables in the schema.
    pub tables: Vec<Table>,
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no tables were found.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Formats the schema for inclusion in an LLM system prompt.
    ///
    /// Each table is rendered as a `CREATE TABLE` statement followed by a
    /// comment block with a few sample rows. An empty schema renders as an
    /// empty string, which the workflow treats as "no schema".
    pub fn format_for_llm(&self) -> String {
        self.tables
            .iter()
            .map(Table::format_for_llm)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Represents a database table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Columns in the table.
    pub columns: Vec<Column>,

    /// Column names that form the primary key.
    pub primary_key: Vec<String>,

    /// A handful of rows to show the model what the data looks like.
    #[serde(default)]
    pub sample_rows: Vec<Row>,
}

impl Table {
    /// Creates a new table with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Adds a column.
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    fn format_for_llm(&self) -> String {
        let mut definitions: Vec<String> = self
            .columns
            .iter()
            .map(|column| {
                let mut line = format!("\t{} {}", column.name, column.data_type.to_uppercase());
                if !column.is_nullable {
                    line.push_str(" NOT NULL");
                }
                if let Some(default) = &column.default {
                    line.push_str(&format!(" DEFAULT {default}"));
                }
                line
            })
            .collect();

        if !self.primary_key.is_empty() {
            definitions.push(format!("\tPRIMARY KEY ({})", self.primary_key.join(", ")));
        }

        let mut text = format!("CREATE TABLE {} (\n{}\n)", self.name, definitions.join(",\n"));

        if !self.sample_rows.is_empty() {
            let header = self
                .columns
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join("\t");
            let rows = self
                .sample_rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>()
                        .join("\t")
                })
                .collect::<Vec<_>>()
                .join("\n");
            text.push_str(&format!(
                "\n\n/*\n{} rows from {} table:\n{}\n{}\n*/",
                self.sample_rows.len(),
                self.name,
                header,
                rows
            ));
        }

        text
    }
}

/// Represents a column in a table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Data type (e.g., "integer", "character varying").
    pub data_type: String,

    /// Whether the column allows NULL values.
    pub is_nullable: bool,

    /// Default value expression, if any.
    pub default: Option<String>,
}

impl Column {
    /// Creates a new column with the given name and data type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            default: None,
        }
    }

    /// Sets whether the column is nullable.
    pub fn nullable(self, nullable: bool) -> Self {
        Self {
            is_nullable: nullable,
            ..self
        }
    }

    /// Sets the default value.
    pub fn with_default(self, default: impl Into<String>) -> Self {
        Self {
            default: Some(default.into()),
            ..self
        }
    }
}
