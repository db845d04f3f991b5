use serde_json::json;
use thiserror::Error;

pub type SchoolResult<T> = Result<T, SchoolError>;

#[derive(Debug, Error)]
pub enum SchoolError {
    /// A form field could not be coerced into its typed value.
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("storage error: {0}")]
    Storage(String),

    /// Update/delete target does not exist. The store itself reports this as a
    /// zero-row statement; the caller decides whether that is an error.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("io error: {0}")]
    Io(String),
}

impl SchoolError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        SchoolError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: i64) -> Self {
        SchoolError::NotFound { entity, id }
    }

    /// Stable error code reported to the front end.
    pub fn code(&self) -> &'static str {
        match self {
            SchoolError::Validation { .. } => "bad_params",
            SchoolError::Storage(_) => "db_query_failed",
            SchoolError::NotFound { .. } => "not_found",
            SchoolError::Io(_) => "io_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            SchoolError::Validation { field, .. } => Some(json!({ "field": field })),
            SchoolError::NotFound { entity, id } => Some(json!({ "entity": entity, "id": id })),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for SchoolError {
    fn from(e: rusqlite::Error) -> Self {
        SchoolError::Storage(e.to_string())
    }
}

impl From<std::io::Error> for SchoolError {
    fn from(e: std::io::Error) -> Self {
        SchoolError::Io(e.to_string())
    }
}

impl From<csv::Error> for SchoolError {
    fn from(e: csv::Error) -> Self {
        SchoolError::Io(e.to_string())
    }
}
