use chrono::Weekday;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::TerminalConfig;
use crate::connectivity::{ConnectivityRow, running_on};
use crate::estimator::aggregate::summarize;
use crate::estimator::sweep::{candidates, sweep};
use crate::estimator::types::{ExpectedTime, Sample};
use crate::estimator::window::TimeWindow;

/// Per-minute samples and their per-stop summary.
#[derive(Debug, Default)]
pub struct Estimate {
    pub samples: Vec<Sample>,
    pub expected: Vec<ExpectedTime>,
}

/// Estimates expected travel times from every configured terminal.
///
/// Terminals are independent and processed in parallel; their samples are
/// concatenated in terminal name order.
pub fn estimate(rows: &[ConnectivityRow], terminals: &TerminalConfig, window: &TimeWindow) -> Estimate {
    let terminals: Vec<(&str, &[String])> = terminals.iter().collect();

    let samples: Vec<Sample> = terminals
        .par_iter()
        .map(|(terminal, codes)| {
            let candidates = candidates(rows, codes);
            let samples = sweep(terminal, candidates, window);
            debug!(terminal, samples = samples.len(), "Terminal swept");
            samples
        })
        .flatten()
        .collect();

    let expected = summarize(&samples);
    info!(
        window = %window,
        samples = samples.len(),
        pairs = expected.len(),
        "Expected travel times estimated"
    );

    Estimate { samples, expected }
}

/// Restricts `rows` to trains running on `day`, then estimates.
#[tracing::instrument(skip(rows, terminals, window), fields(window = %window))]
pub fn estimate_for_day(
    rows: &[ConnectivityRow],
    day: Weekday,
    terminals: &TerminalConfig,
    window: &TimeWindow,
) -> Estimate {
    let running = running_on(rows, day);
    debug!(rows = rows.len(), running = running.len(), "Filtered to day");
    estimate(&running, terminals, window)
}
