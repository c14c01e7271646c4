use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, Context, bail};

use crate::storage::ObjectStore;

/// Buckets as directories under `root`, objects as files inside them.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: &Path) -> Result<Self> {
        fs::create_dir_all(root).with_context(|| format!("Failed to create storage root {:?}", root))?;
        let root = fs::canonicalize(root).with_context(|| format!("Failed to resolve storage root {:?}", root))?;
        Ok(Self { root })
    }

    fn object_path(&self, bucket: &str, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            bail!("Invalid object name {:?}", name);
        }
        Ok(self.root.join(bucket).join(name))
    }
}

impl ObjectStore for LocalStore {
    fn create_bucket(&self, bucket: &str) -> Result<()> {
        let path = self.root.join(bucket);
        fs::create_dir(&path).with_context(|| format!("Failed to create bucket directory {:?}", path))?;
        Ok(())
    }

    fn write_object(&self, bucket: &str, name: &str, _content_type: &str, data: Vec<u8>) -> Result<String> {
        let path = self.object_path(bucket, name)?;
        fs::write(&path, data).with_context(|| format!("Failed to write object {:?}", path))?;
        Ok(format!("file://{}", path.display()))
    }
}
