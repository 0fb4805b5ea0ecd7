//! Error types for kf-api

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Read endpoint errors, each mapped to an HTTP status
#[derive(Error, Debug)]
pub enum ApiError {
    /// The name is not a table in the store
    #[error("Table '{0}' not found")]
    NotFound(String),

    /// Anything else went wrong while reading
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::NotFound(_) => log::debug!("{}", self),
            ApiError::Internal(_) => log::error!("Read endpoint failure: {}", self),
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}
