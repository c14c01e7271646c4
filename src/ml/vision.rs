use std::fs;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use anyhow::{Result, Context, anyhow};

use crate::ml::likelihood::SafeSearchScores;
use crate::utils::google::{ApiError, GoogleAuth, Status};

const SERVICE: &str = "Cloud Vision";
const ANNOTATE_API: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Image-moderation service scoring one stored image per call.
pub trait ModerationService {
    fn safe_search(&self, image_uri: &str) -> Result<SafeSearchScores>;
}

/// Cloud Vision `SAFE_SEARCH_DETECTION`.
pub struct VisionClient {
    http: Client,
    auth: GoogleAuth,
}

impl VisionClient {
    pub fn new(http: Client, auth: GoogleAuth) -> Self {
        Self { http, auth }
    }
}

/// `Image` message for a stored object.
///
/// Vision cannot read `file://` URIs, so local objects are sent inline.
pub fn image_source(image_uri: &str) -> Result<Value> {
    match image_uri.strip_prefix("file://") {
        Some(path) => {
            let bytes = fs::read(path).with_context(|| format!("Failed to read local image {}", path))?;
            Ok(json!({ "content": STANDARD.encode(bytes) }))
        }
        None => Ok(json!({ "source": { "imageUri": image_uri } })),
    }
}

pub fn annotate_request(image: Value) -> Value {
    json!({
        "requests": [{
            "image": image,
            "features": [{ "type": "SAFE_SEARCH_DETECTION" }],
        }]
    })
}

#[derive(Deserialize)]
struct BatchAnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    safe_search_annotation: Option<SafeSearchScores>,
    error: Option<Status>,
}

pub fn parse_annotation(body: &str) -> Result<SafeSearchScores> {
    let batch: BatchAnnotateResponse =
        serde_json::from_str(body).context("Failed to parse annotate response")?;
    let response = batch
        .responses
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("Annotate response contained no results"))?;

    if let Some(status) = response.error {
        return Err(ApiError::Item { service: SERVICE, code: status.code, message: status.message }.into());
    }
    response
        .safe_search_annotation
        .ok_or_else(|| anyhow!("Annotate response has no safe-search annotation"))
}

impl ModerationService for VisionClient {
    fn safe_search(&self, image_uri: &str) -> Result<SafeSearchScores> {
        let request = self.http.post(ANNOTATE_API).json(&annotate_request(image_source(image_uri)?));
        let body = self.auth.send(SERVICE, request)?.text().context("Failed to read annotate response")?;
        parse_annotation(&body).with_context(|| format!("Safe-search detection failed for {}", image_uri))
    }
}
