use thiserror::Error;

/// Errors raised when a field value cannot be stored in an entity field.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// Errors that can occur during repository operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{entity_type} not found: {filter}")]
    NotFound {
        entity_type: &'static str,
        filter: String,
    },
    #[error("{entity_type}: more than one row matched {filter}")]
    MultipleRows {
        entity_type: &'static str,
        filter: String,
    },
    #[error("{entity_type} has no field named {field}")]
    UnknownField {
        entity_type: &'static str,
        field: String,
    },
    #[error("Invalid value for {field}: {source}")]
    InvalidField { field: String, source: FieldError },
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
