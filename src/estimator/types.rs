//! Data types used by the estimation pipeline.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// A downstream stop reachable by a train after it leaves a terminal.
///
/// Times are minutes since midnight of the window's day; `arrival` is
/// unwrapped past midnight so that it is never before `departure`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub train_id: String,
    pub stop: String,
    pub departure: i64,
    pub arrival: i64,
    pub departure_time: NaiveTime,
    pub arrival_time: NaiveTime,
}

/// The earliest arrival at `stop` for a traveller reaching `terminal` at
/// `minute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub terminal: String,
    pub stop: String,
    pub minute: NaiveTime,
    pub elapsed_minutes: i64,
    pub train_id: String,
    pub terminal_departure: NaiveTime,
    pub arrival: NaiveTime,
}

/// Mean best-case journey time from a terminal to a stop over a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedTime {
    pub terminal: String,
    pub stop: String,
    pub expected_minutes: f64,
    pub samples: usize,
}
