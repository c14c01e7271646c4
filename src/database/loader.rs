use std::path::Path;
use anyhow::{Result, Context};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::database::{RowError, TableRef, TableRow, TableService};
use crate::records;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("bulk insert into {table} reported {} row error(s)", .errors.len())]
    RowsRejected { table: String, errors: Vec<RowError> },
}

/// Reads the whole scores file and inserts it into `table` in one request.
pub fn load(scores_file: &Path, tables: &dyn TableService, table: &TableRef) -> Result<usize> {
    let rows: Vec<TableRow> = records::read_records(scores_file)?;
    if rows.is_empty() {
        warn!("No rows in {:?}, nothing to load", scores_file);
        return Ok(0);
    }

    let errors = tables
        .insert_rows(table, &rows)
        .with_context(|| format!("Failed to insert rows into {}", table))?;
    if !errors.is_empty() {
        for row_error in &errors {
            error!("Insert into {} failed at {}", table, row_error);
        }
        return Err(LoadError::RowsRejected { table: table.to_string(), errors }.into());
    }

    info!("Loaded {} rows into table {}", rows.len(), table);
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use crate::database::schema::FieldSchema;
    use crate::ml::likelihood::{Likelihood, SafeSearchScores};
    use crate::records::{ImageRecord, RecordWriter, ScoredImageRecord};

    #[derive(Default)]
    struct RecordingTable {
        inserted: RefCell<Vec<TableRow>>,
        reject_index: Option<usize>,
    }

    impl TableService for RecordingTable {
        fn create_dataset(&self, _table: &TableRef) -> Result<()> {
            Ok(())
        }

        fn create_table(&self, _table: &TableRef, _schema: &[FieldSchema]) -> Result<()> {
            Ok(())
        }

        fn insert_rows(&self, _table: &TableRef, rows: &[TableRow]) -> Result<Vec<RowError>> {
            if let Some(index) = self.reject_index {
                return Ok(vec![RowError { index, message: "invalid: bad row".to_string() }]);
            }
            self.inserted.borrow_mut().extend_from_slice(rows);
            Ok(Vec::new())
        }
    }

    fn table() -> TableRef {
        TableRef {
            project: "demo".to_string(),
            dataset: "images".to_string(),
            table: "images".to_string(),
        }
    }

    fn scored(id: &str, adult: Likelihood) -> ScoredImageRecord {
        let scores = SafeSearchScores { adult, ..SafeSearchScores::default() };
        ScoredImageRecord::new(ImageRecord::new(id, format!("gs://bucket/{}", id)), &scores)
    }

    #[test]
    fn test_round_trip_preserves_fields() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scores.csv");
        let written = vec![scored("a.png", Likelihood::VeryLikely), scored("b.png", Likelihood::Possible)];

        let expected: Vec<TableRow> = written.iter().map(TableRow::from).collect();

        let mut writer = RecordWriter::append(&path)?;
        for row in &expected {
            writer.write(row)?;
        }
        drop(writer);
        assert_eq!(
            std::fs::read_to_string(&path)?,
            "a.png,gs://bucket/a.png,0,5,0,0,0,0,1\nb.png,gs://bucket/b.png,0,3,0,0,0,0,0\n"
        );

        let tables = RecordingTable::default();
        assert_eq!(load(&path, &tables, &table())?, 2);
        assert_eq!(*tables.inserted.borrow(), expected);
        assert_eq!(expected[0].vai_adult_score, "5");
        assert_eq!(expected[0].should_be_rejected, 1);
        assert_eq!(expected[1].should_be_rejected, 0);
        Ok(())
    }

    #[test]
    fn test_row_errors_are_fatal() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scores.csv");
        let mut writer = RecordWriter::append(&path)?;
        writer.write(&TableRow::from(&scored("a.png", Likelihood::Unlikely)))?;
        drop(writer);

        let tables = RecordingTable { reject_index: Some(0), ..RecordingTable::default() };
        let err = load(&path, &tables, &table()).unwrap_err();

        assert!(matches!(err.downcast_ref::<LoadError>(), Some(LoadError::RowsRejected { errors, .. }) if errors.len() == 1));
        Ok(())
    }

    #[test]
    fn test_empty_file_skips_insert() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scores.csv");
        std::fs::write(&path, "")?;

        let tables = RecordingTable::default();
        assert_eq!(load(&path, &tables, &table())?, 0);
        assert!(tables.inserted.borrow().is_empty());
        Ok(())
    }
}
