//! Normalized timetable entities as they are persisted in the store.

use serde::{Deserialize, Serialize};

/// A timing point reference entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tiploc {
    pub tiploc_code: String,
    pub station_name: String,
}

/// One created schedule variant of a train.
///
/// `train_id` is `<uid>_<stp_indicator>_<start_date>`, see [`Train::compose_id`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Train {
    pub train_id: String,
    pub train_uid: String,
    pub stp_indicator: String,
    pub service_code: Option<String>,
    pub runs_on: Option<String>,
    pub start_date: String,
    pub end_date: Option<String>,
    pub origin_tiploc: String,
    pub destination_tiploc: String,
}

impl Train {
    pub fn compose_id(train_uid: &str, stp_indicator: &str, start_date: &str) -> String {
        format!("{train_uid}_{stp_indicator}_{start_date}")
    }
}

/// A public stop of a train. `seq` is contiguous from 0 within a train.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrainLocation {
    pub train_id: String,
    pub seq: i64,
    pub tiploc_code: String,
    pub public_arrival: Option<String>,
    pub public_departure: Option<String>,
    pub platform: Option<String>,
    pub activity_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_id() {
        assert_eq!(
            Train::compose_id("C12345", "P", "2025-05-18"),
            "C12345_P_2025-05-18"
        );
    }
}
