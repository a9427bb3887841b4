use chrono::{NaiveTime, Timelike};

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Rounds to `decimals` places, half away from zero.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Minutes since midnight.
pub fn minute_of_day(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight() / 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[20.0, 22.0, 24.0]), 22.0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(22.04, 1), 22.0);
        assert_eq!(round_to(22.06, 1), 22.1);
        assert_eq!(round_to(33.333_333, 1), 33.3);
    }

    #[test]
    fn test_minute_of_day() {
        assert_eq!(minute_of_day(NaiveTime::from_hms_opt(0, 0, 0).unwrap()), 0);
        assert_eq!(minute_of_day(NaiveTime::from_hms_opt(17, 10, 30).unwrap()), 1030);
    }
}
