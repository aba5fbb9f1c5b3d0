//! Measurement model

use crate::dataset::CsvTable;
use crate::inference::{parse_timestamp, FeatureRow, TimestampError};

pub const DATE_COLUMN: &str = "date_ech";
pub const LABEL_COLUMN: &str = "lib_qual";
pub const X_COLUMN: &str = "x_wgs84";
pub const Y_COLUMN: &str = "y_wgs84";

/// Columns the training job reads from the dataset
pub const MEASUREMENT_COLUMNS: [&str; 4] = [DATE_COLUMN, LABEL_COLUMN, X_COLUMN, Y_COLUMN];

/// One dataset row as seen by training
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub date_ech: String,
    pub lib_qual: String,
    pub x_wgs84: f64,
    pub y_wgs84: f64,
}

impl Measurement {
    /// Feature row the training job derives from this measurement
    pub fn features(&self) -> Result<FeatureRow, TimestampError> {
        let timestamp = parse_timestamp(&self.date_ech)?;
        Ok(FeatureRow::from_timestamp(timestamp, self.x_wgs84, self.y_wgs84))
    }
}

/// Data quality summary of an upload, for logging only
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MeasurementReport {
    pub missing_columns: Vec<&'static str>,
    /// Rows whose timestamp or coordinates cannot be turned into features
    pub unusable_rows: usize,
}

impl MeasurementReport {
    pub fn is_clean(&self) -> bool {
        self.missing_columns.is_empty() && self.unusable_rows == 0
    }
}

/// Check an uploaded table against the measurement schema
pub fn inspect(table: &CsvTable) -> MeasurementReport {
    let positions =
        MEASUREMENT_COLUMNS.map(|name| table.headers().iter().position(|h| h == name));

    let missing_columns: Vec<&'static str> = MEASUREMENT_COLUMNS
        .iter()
        .zip(&positions)
        .filter(|(_, position)| position.is_none())
        .map(|(name, _)| *name)
        .collect();

    let [Some(date), Some(label), Some(x), Some(y)] = positions else {
        return MeasurementReport {
            missing_columns,
            unusable_rows: 0,
        };
    };

    let unusable_rows = table
        .rows()
        .iter()
        .filter(|row| {
            let measurement = match (row[x].trim().parse::<f64>(), row[y].trim().parse::<f64>()) {
                (Ok(x_wgs84), Ok(y_wgs84)) => Measurement {
                    date_ech: row[date].clone(),
                    lib_qual: row[label].clone(),
                    x_wgs84,
                    y_wgs84,
                },
                _ => return true,
            };
            measurement.features().is_err()
        })
        .count();

    MeasurementReport {
        missing_columns,
        unusable_rows,
    }
}
