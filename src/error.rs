// Errors surfaced by the transform endpoint and their HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Image and prompt are required")]
    MissingInput,

    #[error("{0}")]
    MalformedBody(String),

    #[error("{0}")]
    Decode(#[from] base64::DecodeError),

    #[error("{0}")]
    Provider(#[from] ProviderError),
}

/// JSON body of every failed response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl TransformError {
    pub fn status(&self) -> StatusCode {
        match self {
            TransformError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            TransformError::MissingInput | TransformError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            TransformError::Decode(_) | TransformError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Server-side failures are prefixed and carry the
    /// underlying error text.
    pub fn message(&self) -> String {
        if self.status().is_server_error() {
            format!("Model execution failed: {}", self)
        } else {
            self.to_string()
        }
    }
}

impl IntoResponse for TransformError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "transform failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "rejected request");
        }
        (status, Json(ErrorBody { error: self.message() })).into_response()
    }
}
