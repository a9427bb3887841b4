//! Terminal definitions: which station codes make up each terminal.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tracing::warn;

/// Maps terminal names to their equivalent tiploc codes.
///
/// Stored as a plain JSON object on disk:
/// ```json
/// {
///   "LONDON BRIDGE": ["LNDNBDC", "LNDNBDE", "LNDNBDG"],
///   "LONDON EUSTON": ["EUSTON"]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalConfig {
    entries: BTreeMap<String, Vec<String>>,
}

impl TerminalConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read terminal config {path}"))?;
        Self::from_json(&content).with_context(|| format!("invalid terminal config {path}"))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(content)?;
        Ok(Self::from_entries(raw))
    }

    /// Builds a config, trimming codes and dropping terminals without any.
    pub fn from_entries<I, C>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, C)>,
        C: IntoIterator<Item = String>,
    {
        let mut config = Self::default();
        for (name, codes) in entries {
            let codes: Vec<String> = codes
                .into_iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
            if codes.is_empty() {
                warn!(terminal = %name, "Terminal has no codes, ignoring");
                continue;
            }
            config.entries.insert(name, codes);
        }
        config
    }

    /// Returns the codes for `terminal`, if it is configured.
    pub fn codes(&self, terminal: &str) -> Option<&[String]> {
        self.entries.get(terminal).map(Vec::as_slice)
    }

    /// Iterates over all `(terminal, codes)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Every configured code across all terminals, deduplicated.
    pub fn all_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.entries.values().flatten().cloned().collect();
        codes.sort();
        codes.dedup();
        codes
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

    #[test]
    fn test_from_json() {
        let config = TerminalConfig::from_json(
            r#"{"LONDON BRIDGE": ["LNDNBDC", " LNDNBDE", "LNDNBDG"], "LONDON EUSTON": ["EUSTON"], "NOWHERE": []}"#,
        )
        .unwrap();

        assert_eq!(config.len(), 2);
        assert_eq!(
            config.codes("LONDON BRIDGE").unwrap(),
            ["LNDNBDC", "LNDNBDE", "LNDNBDG"]
        );
        assert!(config.codes("NOWHERE").is_none());
        assert_eq!(
            config.names().collect::<Vec<_>>(),
            vec!["LONDON BRIDGE", "LONDON EUSTON"]
        );
    }

    #[test]
    fn test_all_codes_deduplicates() {
        let config = TerminalConfig::from_entries([
            ("A".to_string(), vec!["X".to_string(), "Y".to_string()]),
            ("B".to_string(), vec!["Y".to_string()]),
        ]);
        assert_eq!(config.all_codes(), vec!["X", "Y"]);
    }

    #[test]
    fn test_from_json_rejects_wrong_shape() {
        assert!(TerminalConfig::from_json(r#"["EUSTON"]"#).is_err());
    }

    #[test]
    fn test_shipped_london_config_loads() {
        let config = TerminalConfig::load(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/config/terminals.json"
        ))
        .unwrap();
        assert_eq!(config.len(), 13);
        assert_eq!(config.codes("LONDON WATERLOO").unwrap().len(), 4);
    }
}
