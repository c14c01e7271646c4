pub mod gcs;
pub mod local;

use anyhow::Result;

/// Object storage the ingest stage writes images into.
pub trait ObjectStore {
    /// Creates `bucket`. Fails if it already exists.
    fn create_bucket(&self, bucket: &str) -> Result<()>;

    /// Stores `data` as object `name` and returns the URI it can be read back from.
    fn write_object(&self, bucket: &str, name: &str, content_type: &str, data: Vec<u8>) -> Result<String>;
}
