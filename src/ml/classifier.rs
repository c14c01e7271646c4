use std::path::Path;
use anyhow::{Result, Context};
use tracing::{debug, info};

use crate::database::TableRow;
use crate::ml::vision::ModerationService;
use crate::records::{self, ImageRecord, RecordWriter, ScoredImageRecord};
use crate::utils::progress;

pub struct ClassifySummary {
    pub classified: usize,
    pub rejected: usize,
}

/// Scores every image listed in `images_file` and appends the results to `scores_file`.
pub fn classify(
    images_file: &Path,
    scores_file: &Path,
    moderation: &dyn ModerationService,
) -> Result<ClassifySummary> {
    let images: Vec<ImageRecord> = records::read_records(images_file)?;
    let mut writer = RecordWriter::append(scores_file)?;
    let bar = progress::stage_bar(images.len(), "classify")?;

    let mut summary = ClassifySummary { classified: 0, rejected: 0 };
    for record in images {
        let scores = moderation
            .safe_search(&record.image_url)
            .with_context(|| format!("Failed to classify {}", record.image_id))?;
        let scored = ScoredImageRecord::new(record, &scores);
        debug!("{} scored {:?}, reject={}", scored.image_id, scores.ordinals(), scored.should_be_rejected);

        writer.write(&TableRow::from(&scored))?;
        summary.classified += 1;
        summary.rejected += usize::from(scored.should_be_rejected);
        bar.inc(1);
    }
    bar.finish_and_clear();

    info!("Classified {} images, {} flagged for rejection", summary.classified, summary.rejected);
    Ok(summary)
}
