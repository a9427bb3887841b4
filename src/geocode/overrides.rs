use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use super::Coordinates;

/// Coordinates pinned by hand, keyed by upper-cased name.
///
/// On disk this is a JSON object of `"NAME": [lat, lon]` pairs.
#[derive(Debug, Clone, Default)]
pub struct ManualOverrides {
    entries: HashMap<String, Coordinates>,
}

impl ManualOverrides {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read geocode overrides {}", path.display()))?;
        let overrides = Self::from_json(&content)
            .with_context(|| format!("invalid geocode overrides {}", path.display()))?;
        debug!(path = %path.display(), entries = overrides.entries.len(), "Geocode overrides loaded");
        Ok(overrides)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let raw: HashMap<String, (f64, f64)> = serde_json::from_str(content)?;
        Ok(Self::from_entries(
            raw.into_iter()
                .map(|(name, (lat, lon))| (name, Coordinates { lat, lon })),
        ))
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, Coordinates)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(name, at)| (name.trim().to_uppercase(), at))
                .collect(),
        }
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<Coordinates> {
        self.entries.get(&name.trim().to_uppercase()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_is_case_insensitive() {
        let overrides = ManualOverrides::from_json(r#"{"Clapham Junction": [51.4642, -0.1704]}"#).unwrap();
        let at = overrides.get("CLAPHAM JUNCTION").unwrap();
        assert_eq!(at.lat, 51.4642);
        assert_eq!(at.lon, -0.1704);
        assert!(overrides.get("WOKING").is_none());
    }

    #[test]
    fn test_from_json_rejects_bad_pairs() {
        assert!(ManualOverrides::from_json(r#"{"WOKING": [51.3]}"#).is_err());
    }

    #[test]
    fn test_shipped_overrides_load() {
        let overrides = ManualOverrides::load(Path::new(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/config/geocode_overrides.json"
        )))
        .unwrap();
        assert!(!overrides.entries.is_empty());
    }
}
