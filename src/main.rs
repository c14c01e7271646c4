mod database;
mod ingest;
mod media;
mod ml;
mod pipeline;
mod records;
mod storage;
mod utils;

use std::path::PathBuf;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::database::bigquery::BigQueryClient;
use crate::database::repo::SqliteTable;
use crate::database::{TableRef, TableService};
use crate::ingest::fetch::HttpFetcher;
use crate::ingest::scraper;
use crate::ml::vision::VisionClient;
use crate::pipeline::{Services, Settings};
use crate::storage::gcs::GcsClient;
use crate::storage::local::LocalStore;
use crate::storage::ObjectStore;
use crate::utils::config;
use crate::utils::google::{self, GoogleAuth};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StorageBackend {
    Gcs,
    Local,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TableBackend {
    Bigquery,
    Sqlite,
}

/// Scrape image-search results, store the images and record their safe-search scores.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Term to run the image search for
    #[arg(short, long, required_unless_present = "query_url")]
    search_term: Option<String>,

    /// Results page to scrape instead of the image search
    #[arg(short, long, conflicts_with = "search_term")]
    query_url: Option<String>,

    #[arg(short, long, default_value = "eximapiamtmlbckt01")]
    bucket: String,

    #[arg(long, default_value = "images")]
    dataset: String,

    #[arg(long, default_value = "images")]
    table: String,

    #[arg(long, default_value = "images.csv")]
    images_file: PathBuf,

    #[arg(long, default_value = "scores.csv")]
    scores_file: PathBuf,

    #[arg(long, value_enum, default_value_t = StorageBackend::Gcs)]
    storage: StorageBackend,

    /// Directory holding buckets when --storage=local
    #[arg(long, default_value = "storage")]
    storage_root: PathBuf,

    #[arg(long, value_enum, default_value_t = TableBackend::Bigquery)]
    table_backend: TableBackend,

    /// Database file when --table-backend=sqlite
    #[arg(long, default_value = "images.db")]
    sqlite_path: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    info!("Image moderation pipeline starting...");
    let query_url = match (args.query_url, args.search_term) {
        (Some(url), _) => url,
        (None, Some(term)) => scraper::search_url(&term)?.to_string(),
        (None, None) => anyhow::bail!("Either --search-term or --query-url is required"),
    };
    info!("Results page: {}", query_url);

    let credentials = config::get_credentials()?;
    let auth = GoogleAuth::new(&credentials);
    let http = google::http_client()?;

    let web = HttpFetcher::new(http.clone());
    let storage: Box<dyn ObjectStore> = match args.storage {
        StorageBackend::Gcs => Box::new(GcsClient::new(auth.project())?),
        StorageBackend::Local => Box::new(LocalStore::new(&args.storage_root)?),
    };
    let tables: Box<dyn TableService> = match args.table_backend {
        TableBackend::Bigquery => Box::new(BigQueryClient::new(http.clone(), auth.clone())),
        TableBackend::Sqlite => Box::new(SqliteTable::open(&args.sqlite_path)?),
    };
    let moderation = VisionClient::new(http, auth.clone());

    let services = Services {
        web: &web,
        storage: storage.as_ref(),
        tables: tables.as_ref(),
        moderation: &moderation,
    };
    let settings = Settings {
        query_url,
        bucket: args.bucket,
        table: TableRef {
            project: auth.project().to_string(),
            dataset: args.dataset,
            table: args.table,
        },
        images_file: args.images_file,
        scores_file: args.scores_file,
    };

    let summary = pipeline::run(&services, &settings)?;
    info!(
        "Pipeline completed: {} found, {} stored, {} classified, {} flagged, {} loaded",
        summary.found, summary.stored, summary.classified, summary.rejected, summary.loaded
    );
    Ok(())
}
