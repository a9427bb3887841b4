use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::Coordinates;
use crate::output::{read_records, write_records};

#[derive(Debug, Serialize, Deserialize)]
struct CacheRow {
    stop: String,
    lat: Option<f64>,
    lon: Option<f64>,
}

/// Previously looked-up names. A `None` entry is a lookup that found nothing
/// and is not retried.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeocodeCache {
    entries: BTreeMap<String, Option<Coordinates>>,
}

impl GeocodeCache {
    /// Loads a cache table, or starts empty when `path` does not exist yet.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "No geocode cache yet, starting empty");
            return Ok(Self::default());
        }

        let rows: Vec<CacheRow> = read_records(path)?;
        let entries = rows
            .into_iter()
            .map(|row| {
                let found = match (row.lat, row.lon) {
                    (Some(lat), Some(lon)) => Some(Coordinates { lat, lon }),
                    _ => None,
                };
                (row.stop, found)
            })
            .collect::<BTreeMap<_, _>>();
        debug!(path = %path.display(), entries = entries.len(), "Geocode cache loaded");
        Ok(Self { entries })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let rows: Vec<CacheRow> = self
            .entries
            .iter()
            .map(|(stop, found)| CacheRow {
                stop: stop.clone(),
                lat: found.map(|c| c.lat),
                lon: found.map(|c| c.lon),
            })
            .collect();
        write_records(path, &rows, false)?;
        Ok(())
    }

    /// `None` when `name` was never looked up; `Some(None)` when it was and
    /// nothing was found.
    pub fn get(&self, name: &str) -> Option<Option<Coordinates>> {
        self.entries.get(name).copied()
    }

    pub fn insert(&mut self, name: &str, found: Option<Coordinates>) {
        self.entries.insert(name.to_string(), found);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    #[test]
    fn test_cache_survives_save_and_load() {
        let path = env::temp_dir().join("terminal_reach_test_geocode_cache.csv");
        let _ = fs::remove_file(&path);

        assert!(GeocodeCache::load(&path).unwrap().is_empty());

        let mut cache = GeocodeCache::default();
        cache.insert("SURBITON", Some(Coordinates { lat: 51.39, lon: -0.30 }));
        cache.insert("ATLANTIS", None);
        cache.save(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("ATLANTIS,,"));

        let loaded = GeocodeCache::load(&path).unwrap();
        assert_eq!(loaded, cache);
        assert_eq!(loaded.get("ATLANTIS"), Some(None));
        assert_eq!(loaded.get("WOKING"), None);

        fs::remove_file(&path).unwrap();
    }
}
