use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters for one ingestion pass over a feed file.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct IngestStats {
    pub finished_at: Option<DateTime<Utc>>,
    pub source: Option<String>,

    // lines
    pub lines: usize,
    pub blank_lines: usize,
    pub malformed_lines: usize,
    pub other_records: usize,

    // schedules
    pub schedules_seen: usize,
    pub schedules_not_create: usize,
    pub schedules_discarded: usize,
    pub trains_inserted: usize,
    pub trains_existing: usize,
    pub locations_inserted: usize,
    pub locations_existing: usize,

    // stations
    pub tiplocs_seen: usize,
    pub tiplocs_discarded: usize,
    pub tiplocs_inserted: usize,
    pub tiplocs_existing: usize,
    pub tiplocs_repeated: usize,
}

impl IngestStats {
    pub fn for_source(source: &str) -> Self {
        IngestStats {
            source: Some(source.to_string()),
            ..Default::default()
        }
    }

    /// Trains accepted by this pass, whether newly written or already stored.
    pub fn trains_loaded(&self) -> usize {
        self.trains_inserted + self.trains_existing
    }

    /// Share of non-blank lines that failed to decode, as a percentage.
    pub fn malformed_pct(&self) -> f64 {
        Self::pct(self.malformed_lines, self.lines - self.blank_lines)
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }
}
