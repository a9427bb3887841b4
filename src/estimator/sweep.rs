use std::collections::{BTreeMap, HashMap};

use crate::connectivity::{ConnectivityRow, MINUTES_PER_DAY};
use crate::estimator::types::{Candidate, Sample};
use crate::estimator::utility::minute_of_day;
use crate::estimator::window::TimeWindow;

/// Builds the candidate journeys out of a terminal.
///
/// Every row where a train departs from one of `codes` opens a journey; the
/// same train's later stops with a known arrival, a resolved elapsed time and
/// a station name are its candidates.
pub fn candidates(rows: &[ConnectivityRow], codes: &[String]) -> Vec<Candidate> {
    let mut trains: HashMap<&str, Vec<&ConnectivityRow>> = HashMap::new();
    for row in rows {
        trains.entry(row.train_id.as_str()).or_default().push(row);
    }

    let mut out = Vec::new();
    for stops in trains.values() {
        let departures = stops.iter().filter_map(|row| {
            let departure = row.dep_time?;
            codes.contains(&row.tiploc_code).then_some((row.seq, departure))
        });

        for (terminal_seq, departure_time) in departures {
            let departure = minute_of_day(departure_time);

            for row in stops.iter().filter(|row| row.seq > terminal_seq) {
                let (Some(arrival_time), Some(_), Some(stop)) =
                    (row.arr_time, row.elapsed_from_origin, row.stop_name.as_ref())
                else {
                    continue;
                };

                let travel = (minute_of_day(arrival_time) - departure).rem_euclid(MINUTES_PER_DAY);
                out.push(Candidate {
                    train_id: row.train_id.clone(),
                    stop: stop.clone(),
                    departure,
                    arrival: departure + travel,
                    departure_time,
                    arrival_time,
                });
            }
        }
    }

    out
}

/// Scans `window` minute by minute and records, for each stop, the earliest
/// arrival among candidates that leave the terminal strictly after the
/// minute.
///
/// Minutes are visited from the end of the window backwards, so the eligible
/// set only grows and each candidate is merged into the frontier once.
pub fn sweep(terminal: &str, mut candidates: Vec<Candidate>, window: &TimeWindow) -> Vec<Sample> {
    candidates.sort_by(|a, b| {
        b.departure
            .cmp(&a.departure)
            .then_with(|| a.arrival.cmp(&b.arrival))
            .then_with(|| a.train_id.cmp(&b.train_id))
    });

    let mut frontier: BTreeMap<&str, &Candidate> = BTreeMap::new();
    let mut next = 0;
    let mut minutes: Vec<Vec<Sample>> = Vec::with_capacity(window.len());

    for t in window.minutes().rev() {
        while let Some(candidate) = candidates.get(next) {
            if candidate.departure <= t {
                break;
            }
            frontier
                .entry(candidate.stop.as_str())
                .and_modify(|best| {
                    if candidate.arrival < best.arrival {
                        *best = candidate;
                    }
                })
                .or_insert(candidate);
            next += 1;
        }

        let minute = TimeWindow::clock(t);
        minutes.push(
            frontier
                .values()
                .map(|best| Sample {
                    terminal: terminal.to_string(),
                    stop: best.stop.clone(),
                    minute,
                    elapsed_minutes: best.arrival - t,
                    train_id: best.train_id.clone(),
                    terminal_departure: best.departure_time,
                    arrival: best.arrival_time,
                })
                .collect(),
        );
    }

    minutes.into_iter().rev().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn candidate(train_id: &str, stop: &str, dep: (u32, u32), arr: (u32, u32)) -> Candidate {
        let departure_time = hm(dep.0, dep.1);
        let arrival_time = hm(arr.0, arr.1);
        let departure = minute_of_day(departure_time);
        let arrival = departure + (minute_of_day(arrival_time) - departure).rem_euclid(1440);
        Candidate {
            train_id: train_id.to_string(),
            stop: stop.to_string(),
            departure,
            arrival,
            departure_time,
            arrival_time,
        }
    }

    fn window(from: &str) -> TimeWindow {
        from.parse().unwrap()
    }

    #[test]
    fn test_earliest_arrival_wins() {
        let candidates = vec![
            candidate("A", "SURBITON", (17, 20), (17, 50)),
            candidate("B", "SURBITON", (17, 25), (17, 45)),
        ];
        let samples = sweep("LONDON WATERLOO", candidates, &window("17:10-17:11"));

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].elapsed_minutes, 35);
        assert_eq!(samples[0].arrival, hm(17, 45));
        assert_eq!(samples[0].train_id, "B");
    }

    #[test]
    fn test_departure_at_minute_is_not_eligible() {
        let candidates = vec![candidate("A", "SURBITON", (17, 10), (17, 30))];
        let samples = sweep("LONDON WATERLOO", candidates, &window("17:08-17:12"));

        let minutes: Vec<_> = samples.iter().map(|s| s.minute).collect();
        assert_eq!(minutes, vec![hm(17, 8), hm(17, 9)]);
        assert_eq!(samples[0].elapsed_minutes, 22);
        assert_eq!(samples[1].elapsed_minutes, 21);
    }

    #[test]
    fn test_frontier_matches_full_rescan() {
        let candidates = vec![
            candidate("A", "SURBITON", (17, 5), (17, 27)),
            candidate("B", "SURBITON", (17, 15), (17, 30)),
            candidate("C", "WOKING", (17, 15), (17, 48)),
            candidate("D", "SURBITON", (17, 40), (17, 58)),
            candidate("E", "WOKING", (17, 35), (17, 59)),
        ];
        let w = window("17:00-17:45");
        let samples = sweep("LONDON WATERLOO", candidates.clone(), &w);

        let mut expected = Vec::new();
        for t in w.minutes() {
            let mut best: BTreeMap<&str, i64> = BTreeMap::new();
            for c in candidates.iter().filter(|c| c.departure > t) {
                let arrival = best.entry(&c.stop).or_insert(c.arrival);
                *arrival = (*arrival).min(c.arrival);
            }
            for (stop, arrival) in best {
                expected.push((t, stop.to_string(), arrival - t));
            }
        }

        let actual: Vec<_> = samples
            .iter()
            .map(|s| (minute_of_day(s.minute), s.stop.clone(), s.elapsed_minutes))
            .collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_arrival_after_midnight() {
        let candidates = vec![candidate("A", "BRIGHTON", (23, 50), (0, 40))];
        let samples = sweep("LONDON VICTORIA", candidates, &window("23:30-23:31"));
        assert_eq!(samples[0].elapsed_minutes, 70);
    }

    #[test]
    fn test_no_candidates_no_samples() {
        assert!(sweep("LONDON WATERLOO", Vec::new(), &window("17:00-19:00")).is_empty());

        let late = vec![candidate("A", "SURBITON", (6, 0), (6, 20))];
        assert!(sweep("LONDON WATERLOO", late, &window("17:00-19:00")).is_empty());
    }
}
