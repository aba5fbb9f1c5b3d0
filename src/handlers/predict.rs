//! Prediction handler

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::inference::Predictor;
use crate::models::{Coordinates, PredictRequest, PredictResponse};
use crate::{AppError, AppResult, AppState};

/// Predict the air-quality category at a location and time
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> AppResult<Json<PredictResponse>> {
    let Json(req) = payload.map_err(|e| AppError::InvalidInput(e.body_text()))?;

    let date_input = req.date_input.ok_or_else(|| missing("date_input"))?;
    let x_wgs84 = req.x_wgs84.ok_or_else(|| missing("x_wgs84"))?;
    let y_wgs84 = req.y_wgs84.ok_or_else(|| missing("y_wgs84"))?;

    let predictor = Predictor {
        store: &state.store,
        engine: Arc::clone(&state.engine),
        labels: &state.labels,
        model_key: &state.config.model_key,
    };

    let prediction = predictor.predict(&date_input, x_wgs84, y_wgs84).await?;

    Ok(Json(PredictResponse {
        date: date_input,
        coordinates: Coordinates { x_wgs84, y_wgs84 },
        category: prediction.category,
    }))
}

fn missing(field: &str) -> AppError {
    AppError::MissingInput(format!("Missing required field: {}", field))
}
