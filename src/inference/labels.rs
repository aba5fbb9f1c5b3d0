//! Class index to air-quality category mapping
//!
//! The classifier predicts the ordinal produced by the label encoder at
//! training time. The default table below matches the encoding of the current
//! model; a JSON file can replace it when a retrained model uses another one.

use std::collections::HashSet;
use std::path::Path;

/// Default categories, indexed by predicted class
pub const DEFAULT_LABELS: [&str; 6] = [
    "Good",
    "Moderate",
    "Unhealthy for Sensitive Groups",
    "Unhealthy",
    "Very Unhealthy",
    "Hazardous",
];

#[derive(Debug, thiserror::Error)]
pub enum LabelError {
    #[error("Unknown class {class}: label map covers 0..{len}")]
    UnknownClass { class: i64, len: usize },

    #[error("Label map is empty")]
    Empty,

    #[error("Duplicate label in label map: {0}")]
    Duplicate(String),

    #[error("Failed to read label map: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid label map: {0}")]
    Json(#[from] serde_json::Error),
}

/// Bijection between class indices `0..len` and category names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    labels: Vec<String>,
}

impl Default for LabelMap {
    fn default() -> Self {
        Self {
            labels: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl LabelMap {
    pub fn new(labels: Vec<String>) -> Result<Self, LabelError> {
        if labels.is_empty() {
            return Err(LabelError::Empty);
        }

        let mut seen = HashSet::new();
        for label in &labels {
            if !seen.insert(label.as_str()) {
                return Err(LabelError::Duplicate(label.clone()));
            }
        }

        Ok(Self { labels })
    }

    /// Parse a JSON array of labels, e.g. `["Good", "Moderate", ...]`
    pub fn from_json(raw: &str) -> Result<Self, LabelError> {
        let labels: Vec<String> = serde_json::from_str(raw)?;
        Self::new(labels)
    }

    pub fn from_file(path: &Path) -> Result<Self, LabelError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Category for a predicted class. Classes outside the table are an error.
    pub fn label(&self, class: i64) -> Result<&str, LabelError> {
        usize::try_from(class)
            .ok()
            .and_then(|idx| self.labels.get(idx))
            .map(String::as_str)
            .ok_or(LabelError::UnknownClass {
                class,
                len: self.labels.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_table() {
        let map = LabelMap::default();
        assert_eq!(map.len(), 6);
        assert_eq!(map.label(0).unwrap(), "Good");
        assert_eq!(map.label(1).unwrap(), "Moderate");
        assert_eq!(map.label(2).unwrap(), "Unhealthy for Sensitive Groups");
        assert_eq!(map.label(3).unwrap(), "Unhealthy");
        assert_eq!(map.label(4).unwrap(), "Very Unhealthy");
        assert_eq!(map.label(5).unwrap(), "Hazardous");
    }

    #[test]
    fn test_out_of_range_fails() {
        let map = LabelMap::default();
        for class in [6, 7, 100, -1, i64::MIN, i64::MAX] {
            let err = map.label(class).unwrap_err();
            assert!(matches!(err, LabelError::UnknownClass { class: c, len: 6 } if c == class));
        }
    }

    #[test]
    fn test_json_override() {
        let map = LabelMap::from_json(r#"["Low", "High"]"#).unwrap();
        assert_eq!(map.label(1).unwrap(), "High");
        assert!(map.label(2).is_err());
    }

    #[test]
    fn test_rejects_non_bijective_tables() {
        assert!(matches!(LabelMap::from_json("[]"), Err(LabelError::Empty)));
        assert!(matches!(
            LabelMap::from_json(r#"["Good", "Good"]"#),
            Err(LabelError::Duplicate(label)) if label == "Good"
        ));
        assert!(matches!(LabelMap::from_json(r#"{"0": "Good"}"#), Err(LabelError::Json(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"["Good","Moderate","Unhealthy"]"#).unwrap();

        let map = LabelMap::from_file(file.path()).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.label(2).unwrap(), "Unhealthy");
    }
}
