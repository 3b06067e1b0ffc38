//! Unified error types for the customer metrics pipeline.
//!
//! Error codes:
//! - SCHEMA_001: A required column is absent from an input table
//! - VALID_001-002: Validation errors (record or request payload)
//! - CONFIG_001: Invalid window configuration
//!
//! Per-record validation failures are never raised through this type by the
//! pipeline stages. They are counted in [`crate::table::ValidationStats`] and
//! the record is dropped.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Schema error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// SCHEMA_001: Required column missing from input table
    MissingColumn,
}

impl SchemaErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingColumn => "SCHEMA_001",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        422
    }
}

/// Validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorCode {
    /// VALID_001: Record failed field validation
    InvalidRecord,
    /// VALID_002: Request payload is not a valid table document
    InvalidPayload,
}

impl ValidationErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRecord => "VALID_001",
            Self::InvalidPayload => "VALID_002",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        400
    }
}

/// Configuration error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorCode {
    /// CONFIG_001: Window lengths are inconsistent
    InvalidWindow,
}

impl ConfigErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidWindow => "CONFIG_001",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        400
    }
}

/// Unified error type for the pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Structural problem with an input table. Fatal, no partial result.
    #[error("[{code}] {message}")]
    Schema {
        code: &'static str,
        message: String,
        http_status: u16,
        table: String,
        column: String,
    },

    /// Validation error with code.
    #[error("[{code}] {message}")]
    ValidationWithCode {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    /// Configuration error with code.
    #[error("[{code}] {message}")]
    Config {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid field {field}: {message}")]
    InvalidField { field: String, message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a missing-column schema error.
    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        let table = table.into();
        let column = column.into();
        let code = SchemaErrorCode::MissingColumn;
        Self::Schema {
            code: code.code(),
            message: format!("table '{}' is missing required column '{}'", table, column),
            http_status: code.http_status(),
            table,
            column,
        }
    }

    /// Create a validation error with code.
    pub fn validation_code(code: ValidationErrorCode, msg: impl Into<String>) -> Self {
        Self::ValidationWithCode {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    /// Create a configuration error.
    pub fn config(code: ConfigErrorCode, msg: impl Into<String>) -> Self {
        Self::Config {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error is a fatal schema error.
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Schema { http_status, .. } => *http_status,
            Self::ValidationWithCode { http_status, .. } => *http_status,
            Self::Config { http_status, .. } => *http_status,
            Self::Validation(_) => 400,
            Self::InvalidField { .. } => 400,
            Self::Serialization(_) => 400,
            Self::Internal(_) => 500,
        }
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Schema { code, .. } => Some(code),
            Self::ValidationWithCode { code, .. } => Some(code),
            Self::Config { code, .. } => Some(code),
            _ => None,
        }
    }
}
