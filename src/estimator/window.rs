use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::{Duration, NaiveTime};

use super::utility::minute_of_day;

/// A half-open window `[start, end)` of clock time within one day, sampled
/// at 1-minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if end < start {
            bail!("window end {end} is before its start {start}");
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn start_minute(&self) -> i64 {
        minute_of_day(self.start)
    }

    pub fn end_minute(&self) -> i64 {
        minute_of_day(self.end)
    }

    /// Number of minute points in the window.
    pub fn len(&self) -> usize {
        (self.end_minute() - self.start_minute()).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The minute points of the window, as minutes since midnight.
    pub fn minutes(&self) -> std::ops::Range<i64> {
        self.start_minute()..self.end_minute()
    }

    /// Clock time of a minute point.
    pub fn clock(minute: i64) -> NaiveTime {
        NaiveTime::default() + Duration::minutes(minute)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

/// Parses `HH:MM-HH:MM`.
impl FromStr for TimeWindow {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((start, end)) = s.split_once('-') else {
            bail!("expected a window like 17:00-19:00, got '{s}'");
        };
        let start = NaiveTime::parse_from_str(start.trim(), "%H:%M")?;
        let end = NaiveTime::parse_from_str(end.trim(), "%H:%M")?;
        Self::new(start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_window() {
        let window: TimeWindow = "17:00-19:00".parse().unwrap();
        assert_eq!(window.len(), 120);
        assert_eq!(window.minutes().next(), Some(1020));
        assert_eq!(window.minutes().last(), Some(1139));
        assert_eq!(window.to_string(), "17:00-19:00");
    }

    #[test]
    fn test_empty_and_inverted_windows() {
        let empty: TimeWindow = "08:00-08:00".parse().unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.minutes().count(), 0);

        assert!("19:00-17:00".parse::<TimeWindow>().is_err());
        assert!("1700".parse::<TimeWindow>().is_err());
        assert!("17:00-25:00".parse::<TimeWindow>().is_err());
    }

    #[test]
    fn test_clock() {
        assert_eq!(TimeWindow::clock(1030), NaiveTime::from_hms_opt(17, 10, 0).unwrap());
        assert_eq!(TimeWindow::clock(1450), NaiveTime::from_hms_opt(0, 10, 0).unwrap());
    }
}
