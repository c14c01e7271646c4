use std::fs::{File, OpenOptions};
use std::path::Path;
use anyhow::{Result, Context};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::ml::likelihood::{self, SafeSearchScores};

/// Row of the intermediate file written by the ingest stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub image_id: String,
    pub image_url: String,
    pub previously_rejected: u8,
}

impl ImageRecord {
    pub fn new(image_id: &str, image_url: String) -> Self {
        Self {
            image_id: image_id.to_string(),
            image_url,
            // Nothing in the pipeline knows about earlier rejections yet.
            previously_rejected: 0,
        }
    }
}

/// An image with its safe-search ordinals and the derived rejection flag.
///
/// Written to the enriched file in its table form, see `TableRow`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredImageRecord {
    pub image_id: String,
    pub image_url: String,
    pub previously_rejected: u8,
    pub adult: u8,
    pub medical: u8,
    pub violence: u8,
    pub racy: u8,
    pub spoof: u8,
    pub should_be_rejected: u8,
}

impl ScoredImageRecord {
    pub fn new(record: ImageRecord, scores: &SafeSearchScores) -> Self {
        let [adult, medical, violence, racy, spoof] = scores.ordinals();
        let should_be_rejected = likelihood::should_be_rejected(&[adult, medical, violence, racy, spoof]);
        Self {
            image_id: record.image_id,
            image_url: record.image_url,
            previously_rejected: record.previously_rejected,
            adult,
            medical,
            violence,
            racy,
            spoof,
            should_be_rejected: u8::from(should_be_rejected),
        }
    }
}

/// Headerless CSV writer that appends to an existing record file.
pub struct RecordWriter {
    writer: csv::Writer<File>,
}

impl RecordWriter {
    pub fn append(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open record file {:?}", path))?;
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        Ok(Self { writer })
    }

    pub fn write<T: Serialize>(&mut self, record: &T) -> Result<()> {
        self.writer.serialize(record).context("Failed to serialize record")?;
        // Flushed per row so a crash keeps everything written so far.
        self.writer.flush().context("Failed to flush record file")?;
        Ok(())
    }
}

/// Reads every row of a headerless record file, mapping fields by position.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to open record file {:?}", path))?;

    let mut records = Vec::new();
    for (line, row) in reader.deserialize().enumerate() {
        let record: T = row.with_context(|| format!("Malformed row {} in {:?}", line + 1, path))?;
        records.push(record);
    }
    Ok(records)
}
