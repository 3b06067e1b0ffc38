//! Standardized API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use pipeline_core::{
    CustomerSummary, DedupReport, MetricsRow, RawSalesEvent, TableStats, ValidationStats,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use telemetry::{ComponentHealthReport, HealthStatus};

/// Success envelope shared by all pipeline endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Number of output rows in `data`
    pub count: usize,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(message: impl Into<String>, count: usize, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            timestamp: Utc::now(),
            count,
            data,
        }
    }
}

/// Payload of `POST /v1/deduplicate`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DedupData {
    pub records: Vec<RawSalesEvent>,
    pub report: DedupReport,
    pub validation: ValidationStats,
}

/// Payload of `POST /v1/customer-metrics`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MetricsData {
    pub as_of: DateTime<Utc>,
    pub customers: usize,
    pub rows: Vec<MetricsRow>,
    pub validation: TableStats,
}

/// Payload of `POST /v1/customer-summaries`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryData {
    pub as_of: DateTime<Utc>,
    pub customers: Vec<CustomerSummary>,
    pub validation: TableStats,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_secs: u64,
    pub components: Vec<ComponentHealthReport>,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error_type: String,
    pub error_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<Value>,
}

impl ErrorResponse {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_type: error_type.into(),
            error_message: message.into(),
            error_code: None,
            error_details: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.error_details = Some(details);
        self
    }
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, response: ErrorResponse) -> Self {
        Self { status, response }
    }

    pub fn payload_rejected(status: StatusCode, msg: impl Into<String>) -> Self {
        Self::new(status, ErrorResponse::new("PayloadError", msg))
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorResponse::new("NotFound", msg))
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new("InternalError", msg),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<pipeline_core::Error> for ApiError {
    fn from(err: pipeline_core::Error) -> Self {
        use pipeline_core::Error;

        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let error_type = match &err {
            Error::Schema { .. } => "SchemaError",
            Error::ValidationWithCode { .. } | Error::Validation(_) | Error::InvalidField { .. } => {
                "ValidationError"
            }
            Error::Config { .. } => "ConfigError",
            Error::Serialization(_) => "SerializationError",
            Error::Internal(_) => "InternalError",
        };
        let details = match &err {
            Error::Schema { table, column, .. } => Some(json!({ "table": table, "column": column })),
            Error::InvalidField { field, .. } => Some(json!({ "field": field })),
            _ => None,
        };

        let message = match &err {
            Error::Schema { message, .. }
            | Error::ValidationWithCode { message, .. }
            | Error::Config { message, .. } => message.clone(),
            other => other.to_string(),
        };

        let mut response = ErrorResponse::new(error_type, message);
        if let Some(code) = err.error_code() {
            response = response.with_code(code);
        }
        if let Some(details) = details {
            response = response.with_details(details);
        }

        ApiError::new(status, response)
    }
}
