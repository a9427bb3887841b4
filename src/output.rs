//! Output formatting and persistence for pipeline tables.
//!
//! Tables are written as CSV with a header row, optionally gzip-compressed.
//! Readers accept either form, keyed on a `.gz` extension.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::WriterBuilder;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::stats::IngestStats;

/// Logs ingestion statistics as pretty-printed JSON.
pub fn print_json(stats: &IngestStats) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(stats)?);
    Ok(())
}

/// The path a table is actually written to: `.gz` is appended when
/// compressing.
pub fn output_path(path: &Path, gzip: bool) -> PathBuf {
    if gzip && path.extension().and_then(|e| e.to_str()) != Some("gz") {
        let mut name = path.as_os_str().to_owned();
        name.push(".gz");
        PathBuf::from(name)
    } else {
        path.to_path_buf()
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}

/// Writes `records` as a CSV table, replacing any existing file, and returns
/// the path written.
///
/// Parent directories are created as needed.
pub fn write_records<T: Serialize>(path: &Path, records: &[T], gzip: bool) -> Result<PathBuf> {
    let path = output_path(path, gzip);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(&path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    if gzip {
        serialize_into(GzEncoder::new(file, Compression::default()), records)?.finish()?;
    } else {
        serialize_into(file, records)?;
    }

    debug!(path = %path.display(), rows = records.len(), gzip, "CSV table written");
    Ok(path)
}

fn serialize_into<W: Write, T: Serialize>(sink: W, records: &[T]) -> Result<W> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(sink);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(writer.into_inner().map_err(|e| e.into_error())?)
}

/// Reads a CSV table written by [`write_records`].
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let source: Box<dyn Read> = if is_gzip(path) {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut reader = csv::Reader::from_reader(source);
    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let record: T = result.with_context(|| format!("bad row in {}", path.display()))?;
        rows.push(record);
    }

    debug!(path = %path.display(), rows = rows.len(), "CSV table read");
    Ok(rows)
}
