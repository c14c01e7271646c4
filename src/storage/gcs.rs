use bytes::Bytes;
use google_cloud_storage::client::{Storage, StorageControl};
use google_cloud_storage::model::Bucket;
use tokio::runtime::{Builder, Runtime};
use anyhow::{Result, Context};
use tracing::debug;

use crate::storage::ObjectStore;

/// Google Cloud Storage through the `google-cloud-storage` clients.
///
/// The clients are async; calls are driven to completion on a private
/// current-thread runtime so every stage stays blocking.
/// Credentials come from Application Default Credentials.
pub struct GcsClient {
    runtime: Runtime,
    storage: Storage,
    control: StorageControl,
    project: String,
}

impl GcsClient {
    pub fn new(project: &str) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start storage runtime")?;
        let storage = runtime
            .block_on(Storage::builder().build())
            .context("Failed to create GCS client")?;
        let control = runtime
            .block_on(StorageControl::builder().build())
            .context("Failed to create GCS control client")?;

        Ok(Self {
            runtime,
            storage,
            control,
            project: project.to_string(),
        })
    }
}

/// Resource name the storage API expects for `bucket`.
pub fn bucket_path(bucket: &str) -> String {
    format!("projects/_/buckets/{}", bucket)
}

pub fn object_uri(bucket: &str, name: &str) -> String {
    format!("gs://{}/{}", bucket, name)
}

impl ObjectStore for GcsClient {
    fn create_bucket(&self, bucket: &str) -> Result<()> {
        let request = self
            .control
            .create_bucket()
            .set_parent("projects/_")
            .set_bucket_id(bucket)
            .set_bucket(Bucket::new().set_project(format!("projects/{}", self.project)));
        self.runtime.block_on(request.send())?;
        Ok(())
    }

    fn write_object(&self, bucket: &str, name: &str, content_type: &str, data: Vec<u8>) -> Result<String> {
        debug!("Uploading {} ({} bytes, {}) to {}", name, data.len(), content_type, bucket);
        let upload = self
            .storage
            .write_object(bucket_path(bucket), name, Bytes::from(data))
            .set_content_type(content_type);
        self.runtime.block_on(upload.send_buffered())?;
        Ok(object_uri(bucket, name))
    }
}
