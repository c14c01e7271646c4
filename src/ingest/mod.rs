pub mod fetch;
pub mod ingester;
pub mod scraper;
