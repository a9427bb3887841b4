//! HTTP plumbing for the timetable download.
//!
//! [`HttpClient`] is the seam every request goes through; [`auth::ApiKey`]
//! wraps a client to add the portal's token header.

mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Result, bail};
use bytes::Bytes;
use tracing::debug;

/// GETs `url` and returns the body.
///
/// # Errors
///
/// Fails on transport errors and on any non-success status, reporting the
/// status and response body.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Bytes> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("GET {url} failed with status {status}: {body}");
    }

    let bytes = resp.bytes().await?;
    debug!(url, bytes = bytes.len(), "Fetched");
    Ok(bytes)
}
