pub mod bigquery;
pub mod loader;
pub mod repo;
pub mod schema;

use std::fmt;
use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::database::schema::FieldSchema;
use crate::records::ScoredImageRecord;

/// Fully qualified `project.dataset.table` name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

/// Persisted form of a scored image. Field names are the table's column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub image_id: String,
    pub image_url: String,
    pub previously_rejected: i64,
    pub vai_adult_score: String,
    pub vai_medical_score: String,
    pub vai_violence_score: String,
    pub vai_racy_score: String,
    pub vai_spoof_score: String,
    pub should_be_rejected: i64,
}

impl From<&ScoredImageRecord> for TableRow {
    fn from(record: &ScoredImageRecord) -> Self {
        Self {
            image_id: record.image_id.clone(),
            image_url: record.image_url.clone(),
            previously_rejected: record.previously_rejected.into(),
            vai_adult_score: record.adult.to_string(),
            vai_medical_score: record.medical.to_string(),
            vai_violence_score: record.violence.to_string(),
            vai_racy_score: record.racy.to_string(),
            vai_spoof_score: record.spoof.to_string(),
            should_be_rejected: record.should_be_rejected.into(),
        }
    }
}

/// Error reported by the table service for a single row of a bulk insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub index: usize,
    pub message: String,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.index, self.message)
    }
}

/// Structured-table service the scores end up in.
pub trait TableService {
    /// Creates the dataset `table` lives in. Fails if it already exists.
    fn create_dataset(&self, table: &TableRef) -> Result<()>;

    /// Creates `table` with `schema`. Fails if it already exists.
    fn create_table(&self, table: &TableRef, schema: &[FieldSchema]) -> Result<()>;

    /// Inserts all rows in one request. An empty result means every row was accepted.
    fn insert_rows(&self, table: &TableRef, rows: &[TableRow]) -> Result<Vec<RowError>>;
}
