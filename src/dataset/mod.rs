//! Dataset Module - CSV ingestion into the object store
//!
//! Uploaded measurements are merged into full-file CSV datasets by
//! read-modify-write: the stored file is fetched, the new rows are appended,
//! and the result replaces the stored file.

pub mod append;
pub mod table;

pub use append::append_table;
pub use table::CsvTable;

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("'utf-8' codec can't decode upload: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("No columns to parse from file")]
    NoColumns,

    #[error("Duplicate column in header: {0}")]
    DuplicateColumn(String),

    #[error("Error tokenizing data. Expected {expected} fields in line {line}, saw {found}")]
    RaggedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Dataset {key} was modified concurrently, upload not applied")]
    Conflict { key: String },

    #[error(transparent)]
    Store(#[from] object_store::Error),
}

/// Decode and parse an uploaded CSV file
pub fn parse_upload(content: &[u8]) -> Result<CsvTable, DatasetError> {
    let text = std::str::from_utf8(content)?;
    CsvTable::parse(text)
}
