//! Line-level decoder for the JSON timetable feed.
//!
//! Every line of the feed is an independent JSON object whose single key
//! names the record kind. Lines are decoded once into a [`FeedRecord`] and the
//! schedule and station variants are normalized into store entities here.

use serde::Deserialize;
use thiserror::Error;

use crate::model::{Tiploc, Train, TrainLocation};

/// Placeholder name for a station record carrying no description.
pub const UNKNOWN_STATION: &str = "Unknown";

const CREATE: &str = "Create";

/// Reasons a schedule record is discarded in full.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("schedule record has no {0}")]
    MissingField(&'static str),

    #[error("schedule record has an empty location list")]
    NoLocations,

    #[error("schedule record has no origin or destination code")]
    MissingEndpoint,

    #[error("station record has no tiploc code")]
    MissingTiplocCode,
}

/// A decoded feed line.
#[derive(Debug)]
pub enum FeedRecord {
    Schedule(ScheduleRecord),
    Tiploc(TiplocRecord),
    Other,
}

#[derive(Deserialize)]
struct RawLine {
    #[serde(rename = "JsonScheduleV1")]
    schedule: Option<ScheduleRecord>,
    #[serde(rename = "TiplocV1")]
    tiploc: Option<TiplocRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleRecord {
    pub transaction_type: Option<String>,
    #[serde(rename = "CIF_train_uid")]
    pub train_uid: Option<String>,
    #[serde(rename = "CIF_stp_indicator")]
    pub stp_indicator: Option<String>,
    pub schedule_days_runs: Option<String>,
    pub schedule_start_date: Option<String>,
    pub schedule_end_date: Option<String>,
    pub train_service_code: Option<String>,
    pub schedule_segment: Option<ScheduleSegment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleSegment {
    #[serde(rename = "CIF_train_service_code")]
    pub train_service_code: Option<String>,
    #[serde(default)]
    pub schedule_location: Vec<ScheduleLocation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleLocation {
    pub tiploc_code: Option<String>,
    pub location_type: Option<String>,
    pub public_arrival: Option<String>,
    pub public_departure: Option<String>,
    pub platform: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TiplocRecord {
    pub tiploc_code: Option<String>,
    pub tps_description: Option<String>,
    pub description: Option<String>,
}

/// A schedule record ready to be written: one train and its public stops.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSchedule {
    pub train: Train,
    pub locations: Vec<TrainLocation>,
}

/// Decodes one feed line.
///
/// # Errors
///
/// Returns an error if the line is not a well-formed JSON object.
pub fn parse_line(line: &[u8]) -> Result<FeedRecord, serde_json::Error> {
    let raw: RawLine = serde_json::from_slice(line)?;
    Ok(match (raw.schedule, raw.tiploc) {
        (Some(schedule), _) => FeedRecord::Schedule(schedule),
        (None, Some(tiploc)) => FeedRecord::Tiploc(tiploc),
        (None, None) => FeedRecord::Other,
    })
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ScheduleRecord {
    pub fn is_create(&self) -> bool {
        self.transaction_type.as_deref() == Some(CREATE)
    }

    /// Normalizes a "Create" schedule into a train and its public stops.
    ///
    /// Returns `Ok(None)` for any other transaction type.
    pub fn normalize(&self) -> Result<Option<ParsedSchedule>, RecordError> {
        if !self.is_create() {
            return Ok(None);
        }

        let train_uid = present(&self.train_uid).ok_or(RecordError::MissingField("train uid"))?;
        let stp_indicator =
            present(&self.stp_indicator).ok_or(RecordError::MissingField("stp indicator"))?;
        let start_date =
            present(&self.schedule_start_date).ok_or(RecordError::MissingField("start date"))?;

        let segment = self.schedule_segment.as_ref();
        let source = segment.map(|s| s.schedule_location.as_slice()).unwrap_or(&[]);
        let (first, last) = match (source.first(), source.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(RecordError::NoLocations),
        };

        let origin = present(&first.tiploc_code).ok_or(RecordError::MissingEndpoint)?;
        let destination = present(&last.tiploc_code).ok_or(RecordError::MissingEndpoint)?;

        let train_id = Train::compose_id(train_uid, stp_indicator, start_date);
        let service_code = segment
            .and_then(|s| present(&s.train_service_code))
            .or_else(|| present(&self.train_service_code))
            .map(str::to_string);

        let locations = source
            .iter()
            .filter_map(|loc| {
                let code = present(&loc.tiploc_code)?;
                let arrival = present(&loc.public_arrival);
                let departure = present(&loc.public_departure);
                if arrival.is_none() && departure.is_none() {
                    return None;
                }
                Some((code, arrival, departure, loc))
            })
            .enumerate()
            .map(|(seq, (code, arrival, departure, loc))| TrainLocation {
                train_id: train_id.clone(),
                seq: seq as i64,
                tiploc_code: code.to_string(),
                public_arrival: arrival.map(str::to_string),
                public_departure: departure.map(str::to_string),
                platform: present(&loc.platform).map(str::to_string),
                activity_code: present(&loc.location_type).map(str::to_string),
            })
            .collect();

        let train = Train {
            train_id,
            train_uid: train_uid.to_string(),
            stp_indicator: stp_indicator.to_string(),
            service_code,
            runs_on: present(&self.schedule_days_runs).map(str::to_string),
            start_date: start_date.to_string(),
            end_date: present(&self.schedule_end_date).map(str::to_string),
            origin_tiploc: origin.to_string(),
            destination_tiploc: destination.to_string(),
        };

        Ok(Some(ParsedSchedule { train, locations }))
    }
}

impl TiplocRecord {
    /// Builds the reference entry, preferring the TPS description.
    pub fn normalize(&self) -> Result<Tiploc, RecordError> {
        let code = present(&self.tiploc_code).ok_or(RecordError::MissingTiplocCode)?;
        let name = present(&self.tps_description)
            .or_else(|| present(&self.description))
            .unwrap_or(UNKNOWN_STATION);

        Ok(Tiploc {
            tiploc_code: code.to_string(),
            station_name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule_line(transaction: &str, locations: &str) -> String {
        format!(
            r#"{{"JsonScheduleV1":{{"CIF_bank_holiday_running":null,"CIF_stp_indicator":"P","CIF_train_uid":"W12345","schedule_days_runs":"1111100","schedule_end_date":"2025-12-12","schedule_segment":{{"signalling_id":"2A01","CIF_train_service_code":"24675005","schedule_location":[{locations}]}},"schedule_start_date":"2025-05-18","train_status":"P","transaction_type":"{transaction}"}}}}"#
        )
    }

    const LOCATIONS: &str = r#"{"location_type":"LO","tiploc_code":"WATRLMN","departure":"1700","public_departure":"1700","platform":"5"},
        {"location_type":"LI","tiploc_code":"VAUXHLM","pass":"1703H","public_arrival":null,"public_departure":null},
        {"location_type":"LI","tiploc_code":"CLPHMJM","arrival":"1707","public_arrival":"1707","public_departure":"1708"},
        {"location_type":"LT","tiploc_code":"SURBITN ","arrival":"1722","public_arrival":"1722"}"#;

    fn schedule(transaction: &str, locations: &str) -> ScheduleRecord {
        match parse_line(schedule_line(transaction, locations).as_bytes()).unwrap() {
            FeedRecord::Schedule(s) => s,
            other => panic!("expected schedule, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_line_discriminates_kinds() {
        let tiploc = br#"{"TiplocV1":{"transaction_type":"Create","tiploc_code":"WATRLMN","tps_description":"LONDON WATERLOO"}}"#;
        assert!(matches!(parse_line(tiploc).unwrap(), FeedRecord::Tiploc(_)));

        let header = br#"{"JsonTimetableV1":{"classification":"public","timestamp":1747000000}}"#;
        assert!(matches!(parse_line(header).unwrap(), FeedRecord::Other));

        assert!(matches!(
            parse_line(&schedule_line("Create", LOCATIONS).into_bytes()).unwrap(),
            FeedRecord::Schedule(_)
        ));
    }

    #[test]
    fn test_parse_line_rejects_malformed() {
        assert!(parse_line(b"{\"JsonScheduleV1\": {").is_err());
        assert!(parse_line(b"not json").is_err());
        assert!(parse_line(b"42").is_err());
    }

    #[test]
    fn test_normalize_builds_train_and_public_stops() {
        let parsed = schedule("Create", LOCATIONS).normalize().unwrap().unwrap();

        assert_eq!(parsed.train.train_id, "W12345_P_2025-05-18");
        assert_eq!(parsed.train.origin_tiploc, "WATRLMN");
        assert_eq!(parsed.train.destination_tiploc, "SURBITN");
        assert_eq!(parsed.train.service_code.as_deref(), Some("24675005"));
        assert_eq!(parsed.train.runs_on.as_deref(), Some("1111100"));

        // the passing point carries no public time and is dropped
        let codes: Vec<_> = parsed.locations.iter().map(|l| l.tiploc_code.as_str()).collect();
        assert_eq!(codes, vec!["WATRLMN", "CLPHMJM", "SURBITN"]);
        let seqs: Vec<_> = parsed.locations.iter().map(|l| l.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(parsed.locations[0].activity_code.as_deref(), Some("LO"));
        assert_eq!(parsed.locations[0].platform.as_deref(), Some("5"));
        assert_eq!(parsed.locations[2].public_departure, None);
    }

    #[test]
    fn test_normalize_ignores_non_create() {
        assert_eq!(schedule("Delete", LOCATIONS).normalize(), Ok(None));
    }

    #[test]
    fn test_normalize_discards_incomplete_records() {
        let mut record = schedule("Create", LOCATIONS);
        record.train_uid = Some(" ".to_string());
        assert_eq!(
            record.normalize(),
            Err(RecordError::MissingField("train uid"))
        );

        assert_eq!(schedule("Create", "").normalize(), Err(RecordError::NoLocations));

        let no_origin = r#"{"location_type":"LO","public_departure":"1700"},{"location_type":"LT","tiploc_code":"SURBITN","public_arrival":"1722"}"#;
        assert_eq!(
            schedule("Create", no_origin).normalize(),
            Err(RecordError::MissingEndpoint)
        );
    }

    #[test]
    fn test_tiploc_name_fallbacks() {
        let mut record = TiplocRecord {
            tiploc_code: Some("CHRX".to_string()),
            tps_description: Some("LONDON CHARING CROSS ".to_string()),
            description: Some("CHARING X".to_string()),
        };
        assert_eq!(record.normalize().unwrap().station_name, "LONDON CHARING CROSS");

        record.tps_description = None;
        assert_eq!(record.normalize().unwrap().station_name, "CHARING X");

        record.description = Some(String::new());
        assert_eq!(record.normalize().unwrap().station_name, UNKNOWN_STATION);

        record.tiploc_code = None;
        assert_eq!(record.normalize(), Err(RecordError::MissingTiplocCode));
    }
}
