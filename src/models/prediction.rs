//! Prediction request/response model

use serde::{Deserialize, Serialize};

/// Body of `POST /predict`. Fields are optional so that absence is reported
/// as a client error rather than a body rejection.
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub date_input: Option<String>,
    pub x_wgs84: Option<f64>,
    pub y_wgs84: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub x_wgs84: f64,
    pub y_wgs84: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    /// The `date_input` string as received
    pub date: String,
    pub coordinates: Coordinates,
    pub category: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
