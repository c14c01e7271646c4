use std::collections::HashMap;
use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use anyhow::{Result, Context, anyhow};
use tracing::info;

pub const PROJECT_KEY: &str = "GOOGLE_CLOUD_PROJECT";
pub const TOKEN_KEY: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

pub struct Credentials {
    pub project: String,
    pub access_token: String,
}

/// Main entry point to get the cloud credentials.
/// Checks .env first, then falls back to the process environment per key.
pub fn get_credentials() -> Result<Credentials> {
    let env_path = Path::new(".env");

    let file_values = if env_path.exists() {
        info!("Loading credentials from .env");
        load_from_env(env_path)?
    } else {
        HashMap::new()
    };

    Ok(Credentials {
        project: resolve(PROJECT_KEY, &file_values)?,
        access_token: resolve(TOKEN_KEY, &file_values)?,
    })
}

fn resolve(key: &str, file_values: &HashMap<String, String>) -> Result<String> {
    file_values
        .get(key)
        .cloned()
        .or_else(|| env::var(key).ok())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow!("{} is not set in .env or the environment", key))
}

fn load_from_env(path: &Path) -> Result<HashMap<String, String>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let reader = BufReader::new(file);

    let mut values = HashMap::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"');
            values.insert(key.trim().to_string(), value.to_string());
        }
    }
    Ok(values)
}
