//! Stage wiring: provision → scrape → ingest → classify → load.
//!
//! Each stage runs to completion before the next one starts. Stages hand
//! their output over through the two record files.

use std::path::PathBuf;
use anyhow::{Result, Context};
use tracing::info;

use crate::database::schema::IMAGES_SCHEMA;
use crate::database::{loader, TableRef, TableService};
use crate::ingest::fetch::WebFetcher;
use crate::ingest::{ingester, scraper};
use crate::ml::classifier;
use crate::ml::vision::ModerationService;
use crate::storage::ObjectStore;

/// Service clients, built once by the caller and shared by every stage.
pub struct Services<'a> {
    pub web: &'a dyn WebFetcher,
    pub storage: &'a dyn ObjectStore,
    pub tables: &'a dyn TableService,
    pub moderation: &'a dyn ModerationService,
}

pub struct Settings {
    pub query_url: String,
    pub bucket: String,
    pub table: TableRef,
    pub images_file: PathBuf,
    pub scores_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub found: usize,
    pub stored: usize,
    pub classified: usize,
    pub rejected: usize,
    pub loaded: usize,
}

/// Creates the bucket, dataset and table. Fails if any of them already exists.
pub fn provision(services: &Services, settings: &Settings) -> Result<()> {
    services
        .storage
        .create_bucket(&settings.bucket)
        .with_context(|| format!("Failed to create bucket {}", settings.bucket))?;
    info!("Bucket {} created", settings.bucket);

    let table = &settings.table;
    services
        .tables
        .create_dataset(table)
        .with_context(|| format!("Failed to create dataset {}.{}", table.project, table.dataset))?;
    info!("Created dataset {}.{}", table.project, table.dataset);

    services
        .tables
        .create_table(table, &IMAGES_SCHEMA)
        .with_context(|| format!("Failed to create table {}", table))?;
    info!("Created table {}", table);
    Ok(())
}

pub fn run(services: &Services, settings: &Settings) -> Result<RunSummary> {
    provision(services, settings)?;

    let candidates = scraper::scrape(services.web, &settings.query_url)?;
    let stored = ingester::ingest(
        &candidates,
        services.web,
        services.storage,
        &settings.bucket,
        &settings.images_file,
    )?;
    let classified = classifier::classify(&settings.images_file, &settings.scores_file, services.moderation)?;
    let loaded = loader::load(&settings.scores_file, services.tables, &settings.table)?;

    Ok(RunSummary {
        found: candidates.len(),
        stored,
        classified: classified.classified,
        rejected: classified.rejected,
        loaded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::fs;
    use anyhow::anyhow;
    use crate::database::repo::SqliteTable;
    use crate::ml::likelihood::{Likelihood, SafeSearchScores};
    use crate::records::{self, ImageRecord};
    use crate::storage::local::LocalStore;

    const RESULTS_PAGE: &str = r#"<html><body>
        <img src="http://x/a.png">
        <img src="https://y/b.png">
        <img src="https://z/c.png">
    </body></html>"#;

    struct FakeWeb {
        pages: HashMap<String, String>,
        requested: RefCell<Vec<String>>,
    }

    impl FakeWeb {
        fn with_page(url: &str, html: &str) -> Self {
            let mut pages = HashMap::new();
            pages.insert(url.to_string(), html.to_string());
            Self { pages, requested: RefCell::new(Vec::new()) }
        }
    }

    impl WebFetcher for FakeWeb {
        fn fetch_text(&self, url: &str) -> Result<String> {
            self.pages.get(url).cloned().ok_or_else(|| anyhow!("404 {}", url))
        }

        fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
            self.requested.borrow_mut().push(url.to_string());
            Ok(vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
        }
    }

    /// Scores images by object name, whatever store they live in.
    struct FakeModeration(HashMap<&'static str, SafeSearchScores>);

    impl ModerationService for FakeModeration {
        fn safe_search(&self, image_uri: &str) -> Result<SafeSearchScores> {
            let id = ingester::image_id(image_uri);
            Ok(self.0.get(id).copied().unwrap_or_default())
        }
    }

    fn moderation() -> FakeModeration {
        let mut scores = HashMap::new();
        scores.insert("b.png", SafeSearchScores {
            adult: Likelihood::Unlikely,
            medical: Likelihood::Likely,
            violence: Likelihood::VeryUnlikely,
            racy: Likelihood::Unknown,
            spoof: Likelihood::Unknown,
        });
        scores.insert("c.png", SafeSearchScores {
            adult: Likelihood::VeryUnlikely,
            medical: Likelihood::VeryUnlikely,
            violence: Likelihood::VeryUnlikely,
            racy: Likelihood::VeryUnlikely,
            spoof: Likelihood::VeryUnlikely,
        });
        FakeModeration(scores)
    }

    fn settings(dir: &std::path::Path) -> Settings {
        Settings {
            query_url: "https://search.example/?q=fox".to_string(),
            bucket: "eximapiamtmlbckt01".to_string(),
            table: TableRef {
                project: "local".to_string(),
                dataset: "images".to_string(),
                table: "images".to_string(),
            },
            images_file: dir.join("images.csv"),
            scores_file: dir.join("scores.csv"),
        }
    }

    #[test]
    fn test_end_to_end_drops_insecure_image() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let settings = settings(dir.path());
        let web = FakeWeb::with_page(&settings.query_url, RESULTS_PAGE);
        let store = LocalStore::new(&dir.path().join("storage"))?;
        let tables = SqliteTable::in_memory()?;
        let moderation = moderation();
        let services = Services { web: &web, storage: &store, tables: &tables, moderation: &moderation };

        let summary = run(&services, &settings)?;

        assert_eq!(summary, RunSummary { found: 3, stored: 2, classified: 2, rejected: 1, loaded: 2 });
        assert_eq!(*web.requested.borrow(), vec!["https://y/b.png", "https://z/c.png"]);

        let mut objects: Vec<String> = fs::read_dir(dir.path().join("storage").join(&settings.bucket))?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().to_string()))
            .collect::<std::io::Result<_>>()?;
        objects.sort();
        assert_eq!(objects, vec!["b.png", "c.png"]);

        let images: Vec<ImageRecord> = records::read_records(&settings.images_file)?;
        let ids: Vec<&str> = images.iter().map(|r| r.image_id.as_str()).collect();
        assert_eq!(ids, vec!["b.png", "c.png"]);
        for record in &images {
            assert_eq!(ingester::image_id(&record.image_url), record.image_id);
        }

        assert_eq!(tables.count_rows(&settings.table)?, 2);
        Ok(())
    }

    #[test]
    fn test_second_provision_fails() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let settings = settings(dir.path());
        let web = FakeWeb::with_page(&settings.query_url, RESULTS_PAGE);
        let store = LocalStore::new(&dir.path().join("storage"))?;
        let tables = SqliteTable::in_memory()?;
        let moderation = moderation();
        let services = Services { web: &web, storage: &store, tables: &tables, moderation: &moderation };

        provision(&services, &settings)?;
        assert!(provision(&services, &settings).is_err());
        Ok(())
    }

    #[test]
    fn test_unreachable_results_page_stops_before_ingest() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let settings = settings(dir.path());
        let web = FakeWeb::with_page("https://elsewhere.example/", RESULTS_PAGE);
        let store = LocalStore::new(&dir.path().join("storage"))?;
        let tables = SqliteTable::in_memory()?;
        let moderation = moderation();
        let services = Services { web: &web, storage: &store, tables: &tables, moderation: &moderation };

        assert!(run(&services, &settings).is_err());
        assert!(web.requested.borrow().is_empty());
        assert!(!settings.images_file.exists());
        Ok(())
    }
}
