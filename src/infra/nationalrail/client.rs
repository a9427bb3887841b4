use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use tracing::{debug, info};

use terminal_reach::fetch::auth::ApiKey;
use terminal_reach::fetch::{BasicClient, fetch_bytes};

const BASE_URL: &str = "https://opendata.nationalrail.co.uk";
const TIMETABLE_PATH: &str = "/api/staticfeeds/3.0/timetable";

/// Portal login.
///
/// Stored as a JSON file on disk:
/// ```json
/// { "username": "me@example.com", "password": "..." }
/// ```
#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read credentials {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("invalid credentials {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Reads `NRDP_USERNAME` and `NRDP_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        let username = std::env::var("NRDP_USERNAME").context("NRDP_USERNAME must be set")?;
        let password = std::env::var("NRDP_PASSWORD").context("NRDP_PASSWORD must be set")?;
        Ok(Self { username, password })
    }

    /// The credentials file when given, otherwise the environment.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::from_env(),
        }
    }
}

pub struct NationalRailClient {
    base_url: String,
    timeout: Duration,
}

impl NationalRailClient {
    pub fn new() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            timeout: Duration::from_secs(300),
        }
    }

    /// Exchanges the portal login for a session token.
    #[tracing::instrument(skip_all, fields(username = %credentials.username))]
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<String> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let response = client
            .post(format!("{}/authenticate", self.base_url))
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send authentication request: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Authentication failed with status {}: {}", status, body);
        }

        let token = response.text().await?.trim().to_string();
        if token.is_empty() {
            bail!("Authentication returned an empty token");
        }
        info!("Token retrieved");
        Ok(token)
    }

    /// Downloads the static timetable archive to `output`, creating parent
    /// directories. Returns the number of bytes written.
    #[tracing::instrument(skip(self, token), fields(output = %output.display()))]
    pub async fn download_timetable(&self, token: &str, output: &Path) -> Result<usize> {
        let client = ApiKey::auth_token(BasicClient::new(self.timeout)?, token)?;
        let url = format!("{}{}", self.base_url, TIMETABLE_PATH);
        let bytes = fetch_bytes(&client, &url).await?;

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(output, &bytes)
            .await
            .with_context(|| format!("failed to write {}", output.display()))?;

        debug!(bytes = bytes.len(), "Timetable written");
        info!(output = %output.display(), "Timetable downloaded");
        Ok(bytes.len())
    }
}
