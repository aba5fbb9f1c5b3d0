//! Error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::dataset::DatasetError;
use crate::inference::PredictError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Request errors
    #[error("{0}")]
    MissingInput(String),

    #[error("{0}")]
    InvalidInput(String),

    // Pipeline errors
    #[error(transparent)]
    Upload(#[from] DatasetError),

    #[error(transparent)]
    Prediction(#[from] PredictError),

    // Generic errors
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingInput(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            // Prediction failures are reported to the caller as bad requests
            AppError::Prediction(_) => StatusCode::BAD_REQUEST,
            AppError::Upload(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        match &self {
            AppError::MissingInput(_) | AppError::InvalidInput(_) => {
                tracing::warn!("Rejected request: {}", message);
            }
            AppError::Prediction(_) => {
                tracing::error!("Error during prediction: {}", message);
            }
            AppError::Upload(_) => {
                tracing::error!("Upload failed: {}", message);
            }
            AppError::Internal(_) => {
                tracing::error!("Internal error: {}", message);
            }
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
