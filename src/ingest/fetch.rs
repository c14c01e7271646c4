use reqwest::blocking::Client;
use anyhow::{Result, Context};

/// Plain HTTP GETs against the open web.
pub trait WebFetcher {
    fn fetch_text(&self, url: &str) -> Result<String>;
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

impl WebFetcher for HttpFetcher {
    fn fetch_text(&self, url: &str) -> Result<String> {
        self.http
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .with_context(|| format!("Failed to fetch {}", url))
    }

    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self
            .http
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.bytes())
            .with_context(|| format!("Failed to download {}", url))?;
        Ok(bytes.to_vec())
    }
}
