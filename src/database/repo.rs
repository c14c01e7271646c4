use std::path::Path;
use rusqlite::{Connection, OptionalExtension, params};
use anyhow::{Result, Context, bail};
use tracing::debug;

use crate::database::schema::{self, FieldSchema, DATASETS_SCHEMA};
use crate::database::{RowError, TableRef, TableRow, TableService};

/// Local SQLite stand-in for the structured-table service.
///
/// A dataset is a row in `datasets`; a table is named `<dataset>_<table>`.
pub struct SqliteTable {
    conn: Connection,
}

impl SqliteTable {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open database")?;
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().context("Failed to open database")?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(DATASETS_SCHEMA).context("Failed to initialize schema")?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn count_rows(&self, table: &TableRef) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", schema::quote_ident(&table_name(table)));
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }
}

fn table_name(table: &TableRef) -> String {
    format!("{}_{}", table.dataset, table.table)
}

impl TableService for SqliteTable {
    fn create_dataset(&self, table: &TableRef) -> Result<()> {
        self.conn
            .execute("INSERT INTO datasets (name) VALUES (?1)", params![table.dataset])
            .with_context(|| format!("Failed to create dataset {}", table.dataset))?;
        Ok(())
    }

    fn create_table(&self, table: &TableRef, schema: &[FieldSchema]) -> Result<()> {
        let dataset: Option<String> = self
            .conn
            .query_row("SELECT name FROM datasets WHERE name = ?1", params![table.dataset], |row| row.get(0))
            .optional()?;
        if dataset.is_none() {
            bail!("Dataset {} does not exist", table.dataset);
        }

        self.conn
            .execute_batch(&schema::create_table_sql(&table_name(table), schema))
            .with_context(|| format!("Failed to create table {}", table))?;
        Ok(())
    }

    fn insert_rows(&self, table: &TableRef, rows: &[TableRow]) -> Result<Vec<RowError>> {
        // All or nothing, like a bulk insert that reports row errors.
        let tx = self.conn.unchecked_transaction().context("Failed to begin transaction")?;
        let mut errors = Vec::new();

        {
            let mut stmt = tx
                .prepare(&schema::insert_sql(&table_name(table), &schema::IMAGES_SCHEMA))
                .with_context(|| format!("Failed to prepare insert into {}", table))?;

            for (index, row) in rows.iter().enumerate() {
                let result = stmt.execute(params![
                    row.image_id,
                    row.image_url,
                    row.previously_rejected,
                    row.vai_adult_score,
                    row.vai_medical_score,
                    row.vai_violence_score,
                    row.vai_racy_score,
                    row.vai_spoof_score,
                    row.should_be_rejected
                ]);
                if let Err(e) = result {
                    errors.push(RowError { index, message: e.to_string() });
                }
            }
        }

        if errors.is_empty() {
            tx.commit().context("Failed to commit transaction")?;
        } else {
            debug!("Rolling back insert into {} after {} row error(s)", table, errors.len());
            tx.rollback().context("Failed to roll back transaction")?;
        }
        Ok(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::IMAGES_SCHEMA;

    fn images_table() -> TableRef {
        TableRef {
            project: "local".to_string(),
            dataset: "images".to_string(),
            table: "images".to_string(),
        }
    }

    fn row(id: &str) -> TableRow {
        TableRow {
            image_id: id.to_string(),
            image_url: format!("gs://bucket/{}", id),
            previously_rejected: 0,
            vai_adult_score: "1".to_string(),
            vai_medical_score: "1".to_string(),
            vai_violence_score: "2".to_string(),
            vai_racy_score: "3".to_string(),
            vai_spoof_score: "1".to_string(),
            should_be_rejected: 0,
        }
    }

    #[test]
    fn test_provisioning_is_not_idempotent() -> Result<()> {
        let db = SqliteTable::in_memory()?;
        let table = images_table();

        db.create_dataset(&table)?;
        assert!(db.create_dataset(&table).is_err());

        db.create_table(&table, &IMAGES_SCHEMA)?;
        assert!(db.create_table(&table, &IMAGES_SCHEMA).is_err());
        Ok(())
    }

    #[test]
    fn test_table_requires_dataset() -> Result<()> {
        let db = SqliteTable::in_memory()?;
        assert!(db.create_table(&images_table(), &IMAGES_SCHEMA).is_err());
        Ok(())
    }

    #[test]
    fn test_bulk_insert_makes_rows_visible() -> Result<()> {
        let db = SqliteTable::in_memory()?;
        let table = images_table();
        db.create_dataset(&table)?;
        db.create_table(&table, &IMAGES_SCHEMA)?;

        let rows: Vec<TableRow> = (0..5).map(|i| row(&format!("{}.png", i))).collect();
        let errors = db.insert_rows(&table, &rows)?;

        assert!(errors.is_empty());
        assert_eq!(db.count_rows(&table)?, 5);
        Ok(())
    }

    #[test]
    fn test_missing_table_fails_the_insert() -> Result<()> {
        let db = SqliteTable::in_memory()?;
        assert!(db.insert_rows(&images_table(), &[row("a.png")]).is_err());
        Ok(())
    }
}
