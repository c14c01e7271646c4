use std::path::Path;
use url::Url;
use anyhow::{Result, Context, bail};
use tracing::{debug, info};

use crate::ingest::fetch::WebFetcher;
use crate::media::mimetype;
use crate::records::{ImageRecord, RecordWriter};
use crate::storage::ObjectStore;
use crate::utils::progress;

/// Object name for an image: the last `/`-separated segment of its URL.
///
/// Applying it to the stored URI gives back the same name.
pub fn image_id(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// Only absolute `https` URLs are downloaded.
pub fn is_secure(url: &str) -> bool {
    Url::parse(url).map(|parsed| parsed.scheme() == "https").unwrap_or(false)
}

/// Downloads every secure candidate into `bucket` and appends one row per image
/// to `images_file`. Returns how many images were stored.
pub fn ingest(
    candidates: &[String],
    fetcher: &dyn WebFetcher,
    store: &dyn ObjectStore,
    bucket: &str,
    images_file: &Path,
) -> Result<usize> {
    let mut writer = RecordWriter::append(images_file)?;
    let bar = progress::stage_bar(candidates.len(), "ingest")?;

    let mut stored = 0;
    for url in candidates {
        bar.inc(1);
        if !is_secure(url) {
            debug!("Skipping insecure or relative source {}", url);
            continue;
        }

        let id = image_id(url);
        if id.is_empty() {
            bail!("Cannot derive an image id from {}", url);
        }

        let data = fetcher.fetch_bytes(url)?;
        let content_type = mimetype::detect_mimetype(&data);
        let uri = store
            .write_object(bucket, id, content_type, data)
            .with_context(|| format!("Failed to upload {} to bucket {}", id, bucket))?;

        writer.write(&ImageRecord::new(id, uri))?;
        stored += 1;
    }
    bar.finish_and_clear();

    info!("Stored {} images to bucket {}", stored, bucket);
    Ok(stored)
}
