//! Terminal connectivity: every stop of every train that serves a terminal,
//! enriched with parsed clock times, calendar flags and elapsed time from the
//! train's origin.
//!
//! Enrichment is a pure mapping over the [`StopVisit`] rows read from the
//! store; the only state shared between rows is the per-train origin time,
//! resolved up front.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::{StopVisit, Store};

/// Activity code of a train's originating location.
pub const ORIGIN_ACTIVITY: &str = "LO";

pub const MINUTES_PER_DAY: i64 = 1440;

/// One stop of a terminal-serving train, fully materialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityRow {
    pub train_id: String,
    pub seq: i64,
    pub tiploc_code: String,
    pub activity_code: Option<String>,
    pub public_arrival: Option<String>,
    pub public_departure: Option<String>,
    pub platform: Option<String>,
    pub stp_indicator: String,
    pub runs_on: Option<String>,
    pub origin_tiploc: String,
    pub destination_tiploc: String,
    pub origin_name: Option<String>,
    pub destination_name: Option<String>,
    pub stop_name: Option<String>,

    pub runs_mon: bool,
    pub runs_tue: bool,
    pub runs_wed: bool,
    pub runs_thu: bool,
    pub runs_fri: bool,
    pub runs_sat: bool,
    pub runs_sun: bool,

    pub arr_time: Option<NaiveTime>,
    pub dep_time: Option<NaiveTime>,
    pub origin_time: Option<NaiveTime>,
    pub elapsed_from_origin: Option<i64>,
}

impl ConnectivityRow {
    /// Calendar flags, Monday first.
    pub fn runs(&self) -> [bool; 7] {
        [
            self.runs_mon,
            self.runs_tue,
            self.runs_wed,
            self.runs_thu,
            self.runs_fri,
            self.runs_sat,
            self.runs_sun,
        ]
    }

    pub fn runs_on_day(&self, day: Weekday) -> bool {
        self.runs()[day.num_days_from_monday() as usize]
    }
}

/// Decodes a `1111100`-style day mask, Monday first. Missing positions are
/// `false`.
pub fn decode_runs_on(mask: Option<&str>) -> [bool; 7] {
    let mut days = [false; 7];
    if let Some(mask) = mask {
        for (day, flag) in days.iter_mut().zip(mask.chars()) {
            *day = flag == '1';
        }
    }
    days
}

/// Parses a 24-hour `HHMM` clock string. Non-digit characters are ignored;
/// anything that does not leave exactly four digits is `None`.
pub fn parse_clock(raw: Option<&str>) -> Option<NaiveTime> {
    let digits: String = raw?.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 4 {
        return None;
    }
    NaiveTime::parse_from_str(&digits, "%H%M").ok()
}

/// Minutes from `origin` to `at`, wrapping past midnight.
pub fn elapsed_minutes(origin: NaiveTime, at: NaiveTime) -> i64 {
    let elapsed = (at - origin).num_minutes();
    if elapsed < 0 {
        elapsed + MINUTES_PER_DAY
    } else {
        elapsed
    }
}

/// Resolves each train's origin departure time: the departure at its `LO`
/// location, else the departure at its lowest `seq`.
pub fn origin_times(visits: &[StopVisit]) -> HashMap<&str, Option<NaiveTime>> {
    let mut flagged: HashMap<&str, NaiveTime> = HashMap::new();
    let mut first: HashMap<&str, (i64, Option<NaiveTime>)> = HashMap::new();

    for visit in visits {
        let departure = parse_clock(visit.public_departure.as_deref());

        if visit.activity_code.as_deref() == Some(ORIGIN_ACTIVITY) {
            if let Some(departure) = departure {
                flagged.entry(&visit.train_id).or_insert(departure);
            }
        }

        first
            .entry(&visit.train_id)
            .and_modify(|(seq, time)| {
                if visit.seq < *seq {
                    *seq = visit.seq;
                    *time = departure;
                }
            })
            .or_insert((visit.seq, departure));
    }

    first
        .into_iter()
        .map(|(train_id, (_, fallback))| {
            let origin = flagged.get(train_id).copied().or(fallback);
            (train_id, origin)
        })
        .collect()
}

/// Derives one connectivity row from a stored visit and its train's origin
/// time.
pub fn derive_row(visit: &StopVisit, origin_time: Option<NaiveTime>) -> ConnectivityRow {
    let [mon, tue, wed, thu, fri, sat, sun] = decode_runs_on(visit.runs_on.as_deref());
    let arr_time = parse_clock(visit.public_arrival.as_deref());
    let dep_time = parse_clock(visit.public_departure.as_deref());

    let elapsed_from_origin = match (origin_time, arr_time.or(dep_time)) {
        (Some(origin), Some(at)) => Some(elapsed_minutes(origin, at)),
        _ => None,
    };

    ConnectivityRow {
        train_id: visit.train_id.clone(),
        seq: visit.seq,
        tiploc_code: visit.tiploc_code.clone(),
        activity_code: visit.activity_code.clone(),
        public_arrival: visit.public_arrival.clone(),
        public_departure: visit.public_departure.clone(),
        platform: visit.platform.clone(),
        stp_indicator: visit.stp_indicator.clone(),
        runs_on: visit.runs_on.clone(),
        origin_tiploc: visit.origin_tiploc.clone(),
        destination_tiploc: visit.destination_tiploc.clone(),
        origin_name: visit.origin_name.clone(),
        destination_name: visit.destination_name.clone(),
        stop_name: visit.stop_name.clone(),
        runs_mon: mon,
        runs_tue: tue,
        runs_wed: wed,
        runs_thu: thu,
        runs_fri: fri,
        runs_sat: sat,
        runs_sun: sun,
        arr_time,
        dep_time,
        origin_time,
        elapsed_from_origin,
    }
}

/// Enriches every visit, preserving order.
pub fn enrich(visits: &[StopVisit]) -> Vec<ConnectivityRow> {
    let origins = origin_times(visits);
    visits
        .iter()
        .map(|visit| {
            let origin = origins.get(visit.train_id.as_str()).copied().flatten();
            derive_row(visit, origin)
        })
        .collect()
}

/// Queries the store for every train calling at any of `codes` and returns
/// their enriched stops.
#[tracing::instrument(skip(store))]
pub async fn terminal_connectivity(store: &Store, codes: &[String]) -> Result<Vec<ConnectivityRow>> {
    let visits = store.stop_visits(codes).await?;
    let rows = enrich(&visits);

    let unresolved = rows.iter().filter(|r| r.elapsed_from_origin.is_none()).count();
    info!(rows = rows.len(), unresolved, "Connectivity table built");
    Ok(rows)
}

/// Keeps the rows of trains that run on `day`.
pub fn running_on(rows: &[ConnectivityRow], day: Weekday) -> Vec<ConnectivityRow> {
    rows.iter().filter(|r| r.runs_on_day(day)).cloned().collect()
}
