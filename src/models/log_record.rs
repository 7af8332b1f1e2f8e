use crate::models::error::{LogSinkError, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// One decoded log record. Key order follows the serialized input.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    fields: Value,
}

impl LogRecord {
    /// Decodes one chunk, which must be the UTF-8 JSON text of a single object.
    pub fn decode(chunk: &[u8]) -> Result<Self> {
        let fields: Value = serde_json::from_slice(chunk)?;
        Self::from_value(fields)
    }

    pub fn from_value(fields: Value) -> Result<Self> {
        if !fields.is_object() {
            return Err(LogSinkError::NotAnObject);
        }
        Ok(LogRecord { fields })
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn as_value(&self) -> &Value {
        &self.fields
    }

    pub fn to_json(&self) -> String {
        self.fields.to_string()
    }
}

/// Completion value of a single write.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WriteOutcome {
    pub rows_affected: usize,
    /// Rows handed back by the database; empty unless `returning` is enabled.
    pub rows: Vec<Map<String, Value>>,
}
