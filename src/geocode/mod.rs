//! Stop and terminal geocoding.
//!
//! [`Geocoder`] is the lookup seam; [`RateLimited`] spaces and retries calls
//! to a provider; [`GeocodeCache`] persists results between runs and
//! [`ManualOverrides`] pins coordinates that lookups get wrong.

mod cache;
mod limiter;
mod overrides;

pub use cache::GeocodeCache;
pub use limiter::RateLimited;
pub use overrides::ManualOverrides;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::estimator::ExpectedTime;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Resolves a free-text place query to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Returns `Ok(None)` when the provider has no match.
    async fn locate(&self, query: &str) -> Result<Option<Coordinates>>;
}

/// An expected-time row with the stop's coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodedExpectedTime {
    pub terminal: String,
    pub stop: String,
    pub expected_minutes: f64,
    pub samples: usize,
    pub lat: f64,
    pub lon: f64,
}

/// A terminal with its coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodedTerminal {
    pub terminal: String,
    pub lat: f64,
    pub lon: f64,
}

/// Resolves every name in `names`.
///
/// Overrides win; otherwise cached results are reused and only names missing
/// from the cache are looked up with `query(name)`. A failed lookup is logged
/// and cached as "no match". Names without coordinates are left out of the
/// result.
pub async fn resolve_names<'a, G, I, Q>(
    names: I,
    query: Q,
    geocoder: &G,
    cache: &mut GeocodeCache,
    overrides: &ManualOverrides,
) -> BTreeMap<String, Coordinates>
where
    G: Geocoder + ?Sized,
    I: IntoIterator<Item = &'a str>,
    Q: Fn(&str) -> String,
{
    let mut resolved = BTreeMap::new();
    let mut looked_up = 0usize;

    for name in names {
        if resolved.contains_key(name) {
            continue;
        }

        if let Some(pinned) = overrides.get(name) {
            debug!(name, "Using manual geocode");
            resolved.insert(name.to_string(), pinned);
            continue;
        }

        let found = match cache.get(name) {
            Some(cached) => cached,
            None => {
                looked_up += 1;
                let found = match geocoder.locate(&query(name)).await {
                    Ok(found) => found,
                    Err(e) => {
                        warn!(name, error = %e, "Failed to geocode");
                        None
                    }
                };
                cache.insert(name, found);
                found
            }
        };

        if let Some(coordinates) = found {
            resolved.insert(name.to_string(), coordinates);
        }
    }

    info!(resolved = resolved.len(), looked_up, "Names geocoded");
    resolved
}

/// Attaches coordinates to expected-time rows, dropping rows whose stop could
/// not be located.
pub fn attach_coordinates(
    rows: &[ExpectedTime],
    coordinates: &BTreeMap<String, Coordinates>,
) -> Vec<GeocodedExpectedTime> {
    rows.iter()
        .filter_map(|row| {
            let at = coordinates.get(&row.stop)?;
            Some(GeocodedExpectedTime {
                terminal: row.terminal.clone(),
                stop: row.stop.clone(),
                expected_minutes: row.expected_minutes,
                samples: row.samples,
                lat: at.lat,
                lon: at.lon,
            })
        })
        .collect()
}

/// Query used for stops: `"<STOP>, <country>, UK"`.
pub fn stop_query(country: &str) -> impl Fn(&str) -> String + '_ {
    move |stop| format!("{}, {country}, UK", stop.to_uppercase())
}

/// Query used for terminals: `"<terminal>, <city>, UK"`.
pub fn terminal_query(city: &str) -> impl Fn(&str) -> String + '_ {
    move |terminal| format!("{terminal}, {city}, UK")
}
