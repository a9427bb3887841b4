use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use terminal_reach::geocode::{Coordinates, Geocoder};

const SEARCH_URL: &str = "https://nominatim.openstreetmap.org/search";

/// One search hit. Nominatim returns coordinates as strings.
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

fn first_match(places: &[Place]) -> Result<Option<Coordinates>> {
    let Some(place) = places.first() else {
        return Ok(None);
    };
    Ok(Some(Coordinates {
        lat: place.lat.parse()?,
        lon: place.lon.parse()?,
    }))
}

pub struct NominatimClient {
    client: reqwest::Client,
}

impl NominatimClient {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn locate(&self, query: &str) -> Result<Option<Coordinates>> {
        let response = self
            .client
            .get(SEARCH_URL)
            .query(&[("format", "json"), ("limit", "1"), ("q", query)])
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send geocoding request: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Geocoding returned status {}: {}", status, body);
        }

        let places: Vec<Place> = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse geocoding response: {}", e))?;

        let found = first_match(&places)?;
        debug!(query, found = found.is_some(), "Geocoded");
        Ok(found)
    }
}
