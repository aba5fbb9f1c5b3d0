//! Inference Engine - ONNX Runtime Integration
//!
//! The trained classifier is stored as an ONNX graph. Loading and running it
//! sits behind [`InferenceEngine`] so the request pipeline does not depend on
//! the runtime.

use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;

use super::features::{FeatureRow, FEATURE_COUNT, FEATURE_NAMES};

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Failed to load model: {0}")]
    Load(String),

    #[error("Invalid model input: {0}")]
    Input(String),

    #[error("Inference failed: {0}")]
    Run(String),

    #[error("Model has no output named {0:?}")]
    MissingOutput(String),

    #[error("Model returned {got} predictions for {expected} rows")]
    OutputShape { expected: usize, got: usize },
}

// ============================================================================
// INFERENCE ENGINE TRAIT
// ============================================================================

/// Turns a serialized artifact into a runnable model
pub trait InferenceEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn load(&self, artifact: &[u8]) -> Result<Box<dyn LoadedModel>, InferenceError>;
}

/// A deserialized classifier
pub trait LoadedModel: Send {
    /// One class index per input row
    fn predict(&mut self, rows: &[FeatureRow]) -> Result<Vec<i64>, InferenceError>;
}

// ============================================================================
// ONNX IMPLEMENTATION
// ============================================================================

/// Classifier exported to ONNX: input 0 is `float32 [N, 7]`, the class ids
/// come out of an `int64` output, `label` for converted scikit-learn models.
pub struct OnnxEngine {
    label_output: String,
}

impl OnnxEngine {
    pub fn new(label_output: impl Into<String>) -> Self {
        Self {
            label_output: label_output.into(),
        }
    }
}

impl InferenceEngine for OnnxEngine {
    fn name(&self) -> &'static str {
        "onnx"
    }

    fn load(&self, artifact: &[u8]) -> Result<Box<dyn LoadedModel>, InferenceError> {
        tracing::debug!("Loading ONNX model from memory ({} bytes)", artifact.len());

        let session = Session::builder()
            .map_err(|e| InferenceError::Load(format!("Session builder error: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| InferenceError::Load(format!("Optimization error: {}", e)))?
            .commit_from_memory(artifact)
            .map_err(|e| InferenceError::Load(e.to_string()))?;

        // Fall back to the first output for graphs exported without names
        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name == self.label_output)
            .or_else(|| session.outputs.first())
            .map(|o| o.name.clone())
            .ok_or_else(|| InferenceError::MissingOutput(self.label_output.clone()))?;

        tracing::debug!("Model inputs {:?}, class output {:?}", FEATURE_NAMES, output_name);

        Ok(Box::new(OnnxModel { session, output_name }))
    }
}

struct OnnxModel {
    session: Session,
    output_name: String,
}

impl LoadedModel for OnnxModel {
    fn predict(&mut self, rows: &[FeatureRow]) -> Result<Vec<i64>, InferenceError> {
        let mut input_data = Vec::with_capacity(rows.len() * FEATURE_COUNT);
        for row in rows {
            input_data.extend_from_slice(&row.to_array());
        }

        let input_array = Array2::<f32>::from_shape_vec((rows.len(), FEATURE_COUNT), input_data)
            .map_err(|e| InferenceError::Input(e.to_string()))?;

        let input_tensor = Value::from_array(input_array)
            .map_err(|e| InferenceError::Input(e.to_string()))?;

        let outputs = self
            .session
            .run(ort::inputs![input_tensor])
            .map_err(|e| InferenceError::Run(e.to_string()))?;

        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| InferenceError::MissingOutput(self.output_name.clone()))?;

        let (_, classes) = output
            .try_extract_tensor::<i64>()
            .map_err(|e| InferenceError::Run(e.to_string()))?;

        if classes.len() != rows.len() {
            return Err(InferenceError::OutputShape {
                expected: rows.len(),
                got: classes.len(),
            });
        }

        Ok(classes.to_vec())
    }
}
