//! In-memory CSV table used for dataset concatenation

use std::collections::{HashMap, HashSet};

use super::DatasetError;

/// Header plus rows, every row as wide as the header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Table with no columns, standing in for a dataset that does not exist yet
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse CSV text whose first line is the header.
    ///
    /// Short rows are padded with empty cells; rows wider than the header are
    /// rejected.
    pub fn parse(text: &str) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(DatasetError::NoColumns);
        }

        let mut seen = HashSet::new();
        for header in &headers {
            if !seen.insert(header.as_str()) {
                return Err(DatasetError::DuplicateColumn(header.clone()));
            }
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.len() > headers.len() {
                let line = record.position().map(|p| p.line()).unwrap_or_default();
                return Err(DatasetError::RaggedRow {
                    line,
                    expected: headers.len(),
                    found: record.len(),
                });
            }

            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Rows of `self` followed by rows of `other`.
    ///
    /// Columns are matched by name. The result keeps `self`'s columns in order
    /// and adds columns only `other` has after them; cells a side lacks stay
    /// empty.
    pub fn concat(mut self, other: &CsvTable) -> CsvTable {
        let mut index: HashMap<String, usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), i))
            .collect();

        for header in &other.headers {
            if !index.contains_key(header) {
                index.insert(header.clone(), self.headers.len());
                self.headers.push(header.clone());
            }
        }

        let width = self.headers.len();
        for row in &mut self.rows {
            row.resize(width, String::new());
        }

        let positions: Vec<usize> = other.headers.iter().map(|h| index[h]).collect();
        for source in &other.rows {
            let mut row = vec![String::new(); width];
            for (cell, &pos) in source.iter().zip(&positions) {
                row[pos] = cell.clone();
            }
            self.rows.push(row);
        }

        self
    }

    /// Serialize with a single header line
    pub fn to_csv(&self) -> Result<Vec<u8>, DatasetError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| DatasetError::Csv(csv::Error::from(e.into_error())))
    }
}
