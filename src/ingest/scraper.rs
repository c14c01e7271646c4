use html_escape::decode_html_entities;
use lol_html::{element, rewrite_str, RewriteStrSettings};
use url::Url;
use anyhow::{Result, Context};
use tracing::info;

use crate::ingest::fetch::WebFetcher;

const IMAGE_SEARCH: &str = "https://www.google.com/search";

/// Image-search results page for `term`.
pub fn search_url(term: &str) -> Result<Url> {
    Url::parse_with_params(IMAGE_SEARCH, &[("q", term), ("tbm", "isch")])
        .context("Failed to build search URL")
}

/// Fetches the results page once and returns every `<img src>` on it, unfiltered.
pub fn scrape(fetcher: &dyn WebFetcher, url: &str) -> Result<Vec<String>> {
    let html = fetcher.fetch_text(url)?;
    let sources = extract_image_sources(&html)?;
    info!("Found {} images on {}", sources.len(), url);
    Ok(sources)
}

pub fn extract_image_sources(html: &str) -> Result<Vec<String>> {
    let mut sources = Vec::new();
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("img[src]", |el| {
                if let Some(src) = el.get_attribute("src") {
                    sources.push(decode_entities(&src));
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .context("Failed to parse results page")?;
    Ok(sources)
}

// Attribute values come back raw from the rewriter.
fn decode_entities(value: &str) -> String {
    decode_html_entities(value).into_owned()
}
