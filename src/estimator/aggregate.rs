use std::collections::BTreeMap;

use crate::estimator::types::{ExpectedTime, Sample};
use crate::estimator::utility::{mean, round_to};

/// Decimal places kept in `expected_minutes`.
const PRECISION: i32 = 1;

/// Groups samples by `(terminal, stop)` into mean elapsed minutes and sample
/// counts, ordered by terminal then stop.
pub fn summarize(samples: &[Sample]) -> Vec<ExpectedTime> {
    let mut series: BTreeMap<(&str, &str), Vec<f64>> = BTreeMap::new();

    for sample in samples {
        series
            .entry((sample.terminal.as_str(), sample.stop.as_str()))
            .or_default()
            .push(sample.elapsed_minutes as f64);
    }

    series
        .into_iter()
        .map(|((terminal, stop), values)| ExpectedTime {
            terminal: terminal.to_string(),
            stop: stop.to_string(),
            expected_minutes: round_to(mean(&values), PRECISION),
            samples: values.len(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn sample(terminal: &str, stop: &str, elapsed: i64) -> Sample {
        let time = NaiveTime::from_hms_opt(17, 0, 0).unwrap();
        Sample {
            terminal: terminal.to_string(),
            stop: stop.to_string(),
            minute: time,
            elapsed_minutes: elapsed,
            train_id: "W12345_P_2025-05-18".to_string(),
            terminal_departure: time,
            arrival: time,
        }
    }

    #[test]
    fn test_summarize_means_and_counts() {
        let samples = vec![
            sample("LONDON WATERLOO", "SURBITON", 20),
            sample("LONDON WATERLOO", "SURBITON", 22),
            sample("LONDON WATERLOO", "SURBITON", 24),
            sample("LONDON EUSTON", "WATFORD JUNCTION", 17),
        ];
        let expected = summarize(&samples);

        assert_eq!(
            expected,
            vec![
                ExpectedTime {
                    terminal: "LONDON EUSTON".to_string(),
                    stop: "WATFORD JUNCTION".to_string(),
                    expected_minutes: 17.0,
                    samples: 1,
                },
                ExpectedTime {
                    terminal: "LONDON WATERLOO".to_string(),
                    stop: "SURBITON".to_string(),
                    expected_minutes: 22.0,
                    samples: 3,
                },
            ]
        );
    }

    #[test]
    fn test_summarize_rounds_to_one_decimal() {
        let samples = vec![sample("T", "S", 10), sample("T", "S", 10), sample("T", "S", 11)];
        assert_eq!(summarize(&samples)[0].expected_minutes, 10.3);
    }

    #[test]
    fn test_summarize_empty() {
        assert!(summarize(&[]).is_empty());
    }
}
