use crate::models::error::{LogSinkError, Result};
use crate::models::field_path::FieldPath;
use serde::Deserialize;
use serde_json::{Map, Value};

/// A destination column and the record field that feeds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaColumn {
    pub column: String,
    pub path: FieldPath,
}

/// Column name to field path mapping, kept in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Schema {
    columns: Vec<SchemaColumn>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column, replacing the path of an existing column with the same name.
    pub fn with_column(mut self, column: impl Into<String>, path: &str) -> Result<Self> {
        let column = column.into();
        let path = FieldPath::parse(path)?;
        match self.columns.iter_mut().find(|c| c.column == column) {
            Some(existing) => existing.path = path,
            None => self.columns.push(SchemaColumn { column, path }),
        }
        Ok(self)
    }

    pub fn columns(&self) -> &[SchemaColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl TryFrom<Map<String, Value>> for Schema {
    type Error = LogSinkError;

    fn try_from(map: Map<String, Value>) -> Result<Self> {
        map.into_iter().try_fold(Schema::new(), |schema, (column, path)| match path {
            Value::String(path) => schema.with_column(column, &path),
            other => Err(LogSinkError::InvalidFieldPath {
                path: other.to_string(),
                reason: format!("schema entry for column '{}' must be a string", column),
            }),
        })
    }
}
