//! Read-modify-write append of CSV rows to a stored dataset

use bytes::Bytes;
use object_store::UpdateVersion;
use serde::Serialize;

use super::{CsvTable, DatasetError};
use crate::store::{self, SharedStore, WriteMode};

/// What one append did to one dataset key
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AppendOutcome {
    pub key: String,
    /// The key did not exist and was created
    pub created: bool,
    pub existing_rows: usize,
    pub appended_rows: usize,
}

/// Append `new_rows` to the CSV dataset stored at `key`.
///
/// A missing key starts from an empty table. The merged table overwrites the
/// key; with [`WriteMode::Conditional`] the overwrite is rejected if the key
/// changed since it was read.
pub async fn append_table(
    store: &SharedStore,
    bucket: &str,
    key: &str,
    new_rows: &CsvTable,
    mode: WriteMode,
) -> Result<AppendOutcome, DatasetError> {
    let snapshot = read_snapshot(store, bucket, key).await?;

    let created = snapshot.version.is_none();
    let existing_rows = snapshot.table.row_count();
    let merged = snapshot.table.concat(new_rows);

    write_back(store, key, &merged, mode, snapshot.version.as_ref()).await?;

    tracing::info!("File {} updated successfully in bucket {}.", key, bucket);

    Ok(AppendOutcome {
        key: key.to_string(),
        created,
        existing_rows,
        appended_rows: new_rows.row_count(),
    })
}

/// Stored dataset as read, with the version a conditional write-back checks
struct Snapshot {
    table: CsvTable,
    /// `None` when the key did not exist
    version: Option<UpdateVersion>,
}

async fn read_snapshot(
    store: &SharedStore,
    bucket: &str,
    key: &str,
) -> Result<Snapshot, DatasetError> {
    match store::read_versioned(store, key).await? {
        Some(versioned) => {
            let text = std::str::from_utf8(&versioned.bytes)?;
            Ok(Snapshot {
                table: CsvTable::parse(text)?,
                version: Some(versioned.version),
            })
        }
        None => {
            tracing::info!(
                "File {} not found in bucket {}. Creating a new file.",
                key,
                bucket
            );
            Ok(Snapshot {
                table: CsvTable::empty(),
                version: None,
            })
        }
    }
}

async fn write_back(
    store: &SharedStore,
    key: &str,
    table: &CsvTable,
    mode: WriteMode,
    observed: Option<&UpdateVersion>,
) -> Result<(), DatasetError> {
    let content = Bytes::from(table.to_csv()?);

    match store::write_bytes(store, key, content, mode, observed).await {
        Ok(()) => Ok(()),
        Err(object_store::Error::Precondition { .. } | object_store::Error::AlreadyExists { .. }) => {
            Err(DatasetError::Conflict { key: key.to_string() })
        }
        Err(e) => Err(e.into()),
    }
}
