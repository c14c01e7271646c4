//! Shared plumbing for the Google REST APIs (BigQuery, Vision).

use std::time::Duration;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use anyhow::{Result, Context};
use thiserror::Error;

use crate::utils::config::Credentials;

const USER_AGENT: &str = concat!("image-moderation-pipeline/", env!("CARGO_PKG_VERSION"));

/// No per-request deadline: a slow download or API call is waited out.
const REQUEST_TIMEOUT: Option<Duration> = None;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{service} request failed with HTTP {status}: {message}")]
    Status {
        service: &'static str,
        status: u16,
        message: String,
    },
    #[error("{service} reported error {code}: {message}")]
    Item {
        service: &'static str,
        code: i64,
        message: String,
    },
}

/// Bearer credentials plus the project every resource is created in.
#[derive(Clone)]
pub struct GoogleAuth {
    project: String,
    access_token: String,
}

impl GoogleAuth {
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            project: credentials.project.clone(),
            access_token: credentials.access_token.clone(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Sends an authorized request and turns non-2xx replies into [`ApiError::Status`].
    pub fn send(&self, service: &'static str, request: RequestBuilder) -> Result<Response> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .with_context(|| format!("Failed to reach {}", service))?;
        check_status(service, response)
    }
}

pub fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

fn check_status(service: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(ApiError::Status {
        service,
        status: status.as_u16(),
        message: error_message(&body),
    }
    .into())
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Status,
}

/// `google.rpc.Status` as rendered in JSON bodies.
#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Pulls `error.message` out of a Google error body, falling back to the raw text.
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_waits_without_deadline() -> Result<()> {
        assert!(REQUEST_TIMEOUT.is_none());
        http_client()?;
        Ok(())
    }

    #[test]
    fn test_error_message_from_envelope() {
        let body = r#"{"error":{"code":409,"message":"Your previous request to create the named bucket succeeded and you already own it.","status":"ALREADY_EXISTS"}}"#;
        assert!(error_message(body).starts_with("Your previous request"));
    }

    #[test]
    fn test_error_message_falls_back_to_body() {
        assert_eq!(error_message("  Bad Gateway\n"), "Bad Gateway");
    }
}
