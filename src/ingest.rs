//! Loads a timetable feed file into the store.
//!
//! Schedule and station records are handled in one pass. Writes are committed
//! in batches; because every insert is insert-if-absent, an interrupted run
//! is resumed by running it again over the same file.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::parser::{FeedRecord, parse_line};
use crate::stats::IngestStats;
use crate::store::{self, Store};

/// Records written per transaction.
pub const BATCH_SIZE: usize = 10_000;

/// Ingests the feed file at `path`.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub async fn ingest_file(store: &Store, path: impl AsRef<Path>) -> Result<IngestStats> {
    let path = path.as_ref();
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open feed file {}", path.display()))?;

    let stats = IngestStats::for_source(&path.display().to_string());
    ingest_reader(store, BufReader::new(file), stats).await
}

/// Ingests newline-delimited feed records from `reader`.
pub async fn ingest_reader<R>(store: &Store, mut reader: R, mut stats: IngestStats) -> Result<IngestStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut seen_tiplocs: HashSet<String> = HashSet::new();
    let mut line = Vec::new();
    let mut pending = 0usize;
    let mut tx = store.begin().await?;

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        stats.lines += 1;

        if line.iter().all(u8::is_ascii_whitespace) {
            stats.blank_lines += 1;
            continue;
        }

        let record = match parse_line(&line) {
            Ok(record) => record,
            Err(e) => {
                stats.malformed_lines += 1;
                debug!(line = stats.lines, error = %e, "Skipping malformed line");
                continue;
            }
        };

        match record {
            FeedRecord::Schedule(schedule) => {
                stats.schedules_seen += 1;
                let parsed = match schedule.normalize() {
                    Ok(Some(parsed)) => parsed,
                    Ok(None) => {
                        stats.schedules_not_create += 1;
                        continue;
                    }
                    Err(e) => {
                        stats.schedules_discarded += 1;
                        debug!(line = stats.lines, reason = %e, "Discarding schedule");
                        continue;
                    }
                };

                let write = store::insert_schedule(&mut tx, &parsed).await?;
                if write.train_inserted {
                    stats.trains_inserted += 1;
                } else {
                    stats.trains_existing += 1;
                }
                stats.locations_inserted += write.locations_inserted;
                stats.locations_existing += write.locations_existing;
            }
            FeedRecord::Tiploc(record) => {
                stats.tiplocs_seen += 1;
                let tiploc = match record.normalize() {
                    Ok(tiploc) => tiploc,
                    Err(e) => {
                        stats.tiplocs_discarded += 1;
                        debug!(line = stats.lines, reason = %e, "Discarding station record");
                        continue;
                    }
                };

                if !seen_tiplocs.insert(tiploc.tiploc_code.clone()) {
                    stats.tiplocs_repeated += 1;
                    continue;
                }

                if store::insert_tiploc(&mut tx, &tiploc).await? {
                    stats.tiplocs_inserted += 1;
                } else {
                    stats.tiplocs_existing += 1;
                }
            }
            FeedRecord::Other => {
                stats.other_records += 1;
                continue;
            }
        }

        pending += 1;
        if pending >= BATCH_SIZE {
            tx.commit().await?;
            debug!(lines = stats.lines, "Batch committed");
            tx = store.begin().await?;
            pending = 0;
        }
    }

    tx.commit().await?;

    if stats.malformed_lines > 0 {
        warn!(
            malformed = stats.malformed_lines,
            pct = stats.malformed_pct(),
            "Feed contained malformed lines"
        );
    }
    info!(
        trains = stats.trains_loaded(),
        locations = stats.locations_inserted + stats.locations_existing,
        tiplocs = stats.tiplocs_inserted + stats.tiplocs_existing,
        "Feed ingested"
    );

    Ok(stats.finish())
}
