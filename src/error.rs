//! Request-level errors for the HTTP API.
//!
//! Vendor failures never surface here: they become rejected entries in the
//! response body. These errors cover requests that cannot be dispatched at all.

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::catalog::MAX_PANELS;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("No file provided")]
    MissingFile,

    #[error("No models provided")]
    MissingModels,

    #[error("Invalid models field: {0}")]
    InvalidModels(#[from] serde_json::Error),

    #[error("At least one model must be selected")]
    NoModelsSelected,

    #[error("Too many models selected: {0} (max {})", MAX_PANELS)]
    TooManyModels(usize),

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    /// The body could not be read as multipart at all.
    #[error("{}", .0.body_text())]
    MultipartRejection(#[from] MultipartRejection),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Multipart(e) => e.status(),
            Self::MultipartRejection(e) => e.status(),
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::warn!("Rejecting OCR request ({}): {}", status, self);
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
