//! Request extractors.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use pipeline_core::error::{Error, ValidationErrorCode};
use serde::de::DeserializeOwned;
use serde_json::error::Category;
use tracing::warn;

use crate::response::ApiError;

/// JSON request body that rejects with the pipeline's error envelope.
///
/// Malformed JSON is `VALID_002`. Well-formed JSON of the wrong shape is
/// `VALID_001`.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state).await.map_err(|rejection| {
            warn!(error = %rejection, "Failed to read request body");
            ApiError::payload_rejected(rejection.status(), rejection.body_text())
        })?;

        if body.is_empty() {
            return Err(Error::validation("request body is empty").into());
        }

        serde_json::from_slice(&body).map(JsonBody).map_err(|e| {
            warn!(error = %e, payload_size = body.len(), "Failed to parse request body");
            let code = match e.classify() {
                Category::Data => ValidationErrorCode::InvalidRecord,
                Category::Io | Category::Syntax | Category::Eof => {
                    ValidationErrorCode::InvalidPayload
                }
            };
            Error::validation_code(code, e.to_string()).into()
        })
    }
}
