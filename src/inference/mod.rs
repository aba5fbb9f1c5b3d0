//! Inference Module - air-quality category prediction
//!
//! Request flow: timestamp → feature row → model artifact from the store →
//! deserialized classifier → class index → category label.

pub mod engine;
pub mod features;
pub mod labels;

use std::sync::Arc;

use serde::Serialize;

use crate::store::{self, SharedStore};

pub use engine::{InferenceEngine, InferenceError, LoadedModel, OnnxEngine};
pub use features::{parse_timestamp, FeatureRow, TimestampError};
pub use labels::{LabelError, LabelMap};

#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error(transparent)]
    Timestamp(#[from] TimestampError),

    #[error("Failed to fetch model artifact: {0}")]
    Artifact(#[from] object_store::Error),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Label(#[from] LabelError),

    #[error("Model returned no prediction")]
    Empty,

    #[error("Inference worker failed: {0}")]
    Worker(String),
}

/// Everything the pipeline needs besides the request itself
pub struct Predictor<'a> {
    pub store: &'a SharedStore,
    pub engine: Arc<dyn InferenceEngine>,
    pub labels: &'a LabelMap,
    pub model_key: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub features: FeatureRow,
    pub class: i64,
    pub category: String,
}

impl Predictor<'_> {
    /// Predict the category for one location at one point in time.
    ///
    /// The artifact is fetched and deserialized on every call.
    pub async fn predict(
        &self,
        date_input: &str,
        x_wgs84: f64,
        y_wgs84: f64,
    ) -> Result<Prediction, PredictError> {
        let timestamp = parse_timestamp(date_input)?;
        let row = FeatureRow::from_timestamp(timestamp, x_wgs84, y_wgs84);

        let artifact = store::read_bytes(self.store, self.model_key).await?;
        tracing::debug!(
            "Fetched model artifact {} ({} bytes) for {:?}",
            self.model_key,
            artifact.len(),
            row
        );

        let engine = Arc::clone(&self.engine);
        let classes = tokio::task::spawn_blocking(move || {
            let mut model = engine.load(&artifact)?;
            model.predict(&[row])
        })
        .await
        .map_err(|e| PredictError::Worker(e.to_string()))??;

        tracing::info!("Prediction result: {:?}", classes);

        let class = classes.first().copied().ok_or(PredictError::Empty)?;
        let category = self.labels.label(class)?.to_string();

        Ok(Prediction {
            features: row,
            class,
            category,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{StubEngine, STUB_ARTIFACT};
    use super::*;
    use bytes::Bytes;
    use object_store::memory::InMemory;
    use tokio_test::{assert_err, assert_ok};

    const MODEL_KEY: &str = "models/air_quality.onnx";

    async fn store_with_model(artifact: &'static [u8]) -> SharedStore {
        let store: SharedStore = Arc::new(InMemory::new());
        store::write_bytes(
            &store,
            MODEL_KEY,
            Bytes::from_static(artifact),
            store::WriteMode::Overwrite,
            None,
        )
        .await
        .unwrap();
        store
    }

    #[tokio::test]
    async fn test_predicts_label_for_derived_row() {
        let store = store_with_model(STUB_ARTIFACT).await;
        let engine = StubEngine::new(2);
        let labels = LabelMap::default();
        let predictor = Predictor {
            store: &store,
            engine: Arc::new(engine.clone()),
            labels: &labels,
            model_key: MODEL_KEY,
        };

        let prediction = assert_ok!(predictor.predict("2024-03-14T08:00:00", 1.4, 43.6).await);
        assert_eq!(prediction.class, 2);
        assert_eq!(prediction.category, "Unhealthy for Sensitive Groups");

        let seen = engine.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].to_array(), [2024.0, 3.0, 14.0, 8.0, 3.0, 1.4, 43.6]);
    }

    #[tokio::test]
    async fn test_bad_date_fails_before_fetching_model() {
        // No artifact stored: a timestamp error proves the store was never hit
        let store: SharedStore = Arc::new(InMemory::new());
        let labels = LabelMap::default();
        let predictor = Predictor {
            store: &store,
            engine: Arc::new(StubEngine::new(0)),
            labels: &labels,
            model_key: MODEL_KEY,
        };

        let err = assert_err!(predictor.predict("14/03/2024", 1.4, 43.6).await);
        assert!(matches!(err, PredictError::Timestamp(_)));
    }

    #[tokio::test]
    async fn test_missing_and_corrupt_artifacts() {
        let labels = LabelMap::default();

        let empty: SharedStore = Arc::new(InMemory::new());
        let predictor = Predictor {
            store: &empty,
            engine: Arc::new(StubEngine::new(0)),
            labels: &labels,
            model_key: MODEL_KEY,
        };
        let err = assert_err!(predictor.predict("2024-03-14", 1.4, 43.6).await);
        assert!(matches!(err, PredictError::Artifact(_)));

        let corrupt = store_with_model(b"\x80\x04pickle").await;
        let predictor = Predictor {
            store: &corrupt,
            engine: Arc::new(StubEngine::new(0)),
            labels: &labels,
            model_key: MODEL_KEY,
        };
        let err = assert_err!(predictor.predict("2024-03-14", 1.4, 43.6).await);
        assert!(matches!(err, PredictError::Inference(InferenceError::Load(_))));
    }

    #[tokio::test]
    async fn test_class_outside_label_map_is_an_error() {
        let store = store_with_model(STUB_ARTIFACT).await;
        let labels = LabelMap::default();
        let predictor = Predictor {
            store: &store,
            engine: Arc::new(StubEngine::new(6)),
            labels: &labels,
            model_key: MODEL_KEY,
        };

        let err = assert_err!(predictor.predict("2024-03-14T08:00:00", 1.4, 43.6).await);
        assert!(matches!(err, PredictError::Label(LabelError::UnknownClass { class: 6, .. })));
    }
}
