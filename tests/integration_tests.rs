use chrono::Weekday;
use terminal_reach::config::TerminalConfig;
use terminal_reach::connectivity::terminal_connectivity;
use terminal_reach::estimator::{ExpectedTime, TimeWindow, estimate_for_day};
use terminal_reach::ingest::ingest_file;
use terminal_reach::store::Store;

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/timetable_sample.json");

fn london() -> TerminalConfig {
    TerminalConfig::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config/terminals.json"))
        .expect("Failed to load terminal config")
}

fn expected(terminal: &str, stop: &str, expected_minutes: f64) -> ExpectedTime {
    ExpectedTime {
        terminal: terminal.to_string(),
        stop: stop.to_string(),
        expected_minutes,
        samples: 3,
    }
}

#[tokio::test]
async fn test_ingest_counts_every_line_kind() {
    let store = Store::open("sqlite::memory:").await.unwrap();
    let stats = ingest_file(&store, FIXTURE).await.expect("Failed to ingest feed");

    assert_eq!(stats.lines, 16);
    assert_eq!(stats.blank_lines, 1);
    assert_eq!(stats.malformed_lines, 1);
    assert_eq!(stats.other_records, 2);
    assert_eq!(stats.schedules_seen, 5);
    assert_eq!(stats.schedules_not_create, 1);
    assert_eq!(stats.trains_inserted, 4);
    assert_eq!(stats.locations_inserted, 10);
    assert_eq!(stats.tiplocs_inserted, 6);
    assert_eq!(stats.tiplocs_repeated, 1);

    let tiplocs = store.tiplocs().await.unwrap();
    let woking = tiplocs.iter().find(|t| t.tiploc_code == "WOKING").unwrap();
    assert_eq!(woking.station_name, "WOKING");
    let surbiton = tiplocs.iter().find(|t| t.tiploc_code == "SURBITN").unwrap();
    assert_eq!(surbiton.station_name, "SURBITON");

    let trains = store.trains().await.unwrap();
    let euston = trains.iter().find(|t| t.train_uid == "E20001").unwrap();
    assert_eq!(euston.train_id, "E20001_P_2025-05-18");
    assert_eq!(euston.service_code.as_deref(), Some("22215003"));
}

#[tokio::test]
async fn test_passing_points_are_not_stored() {
    let store = Store::open("sqlite::memory:").await.unwrap();
    ingest_file(&store, FIXTURE).await.unwrap();

    let slow: Vec<_> = store
        .train_locations()
        .await
        .unwrap()
        .into_iter()
        .filter(|l| l.train_id == "W10002_P_2025-05-18")
        .collect();

    let codes: Vec<_> = slow.iter().map(|l| l.tiploc_code.as_str()).collect();
    assert_eq!(codes, vec!["WATRLMN", "CLPHMJC", "SURBITN", "WOKING"]);
    let seqs: Vec<_> = slow.iter().map(|l| l.seq).collect();
    assert_eq!(seqs, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn test_reingesting_changes_nothing() {
    let store = Store::open("sqlite::memory:").await.unwrap();
    ingest_file(&store, FIXTURE).await.unwrap();

    let trains = store.trains().await.unwrap();
    let locations = store.train_locations().await.unwrap();
    let tiplocs = store.tiplocs().await.unwrap();

    let again = ingest_file(&store, FIXTURE).await.unwrap();
    assert_eq!(again.trains_inserted, 0);
    assert_eq!(again.trains_existing, 4);
    assert_eq!(again.locations_inserted, 0);
    assert_eq!(again.tiplocs_existing, 6);

    assert_eq!(store.trains().await.unwrap(), trains);
    assert_eq!(store.train_locations().await.unwrap(), locations);
    assert_eq!(store.tiplocs().await.unwrap(), tiplocs);
    assert_eq!(store.counts().await.unwrap(), (6, 4, 10));
}

#[tokio::test]
async fn test_full_pipeline() {
    let store = Store::open("sqlite::memory:").await.unwrap();
    ingest_file(&store, FIXTURE).await.unwrap();

    let terminals = london();
    let rows = terminal_connectivity(&store, &terminals.all_codes())
        .await
        .expect("Failed to build connectivity table");
    assert_eq!(rows.len(), 10);

    let window: TimeWindow = "17:10-17:13".parse().unwrap();
    let tuesday = estimate_for_day(&rows, Weekday::Tue, &terminals, &window);

    assert_eq!(
        tuesday.expected,
        vec![
            expected("LONDON EUSTON", "WATFORD JUNCTION", 37.0),
            expected("LONDON WATERLOO", "CLAPHAM JUNCTION", 11.0),
            expected("LONDON WATERLOO", "SURBITON", 29.0),
            expected("LONDON WATERLOO", "WOKING", 34.0),
        ]
    );
    assert_eq!(tuesday.samples.len(), 12);

    // only the weekend train serves Saturday
    let saturday = estimate_for_day(&rows, Weekday::Sat, &terminals, &window);
    assert_eq!(
        saturday.expected,
        vec![expected("LONDON WATERLOO", "SURBITON", 22.0)]
    );
}

#[tokio::test]
async fn test_empty_feed() {
    let path = std::env::temp_dir().join("terminal_reach_empty_feed.json");
    std::fs::write(&path, b"").unwrap();

    let store = Store::open("sqlite::memory:").await.unwrap();
    let stats = ingest_file(&store, &path).await.unwrap();
    assert_eq!(stats.lines, 0);
    assert_eq!(stats.trains_loaded(), 0);
    assert_eq!(store.counts().await.unwrap(), (0, 0, 0));

    let rows = terminal_connectivity(&store, &london().all_codes()).await.unwrap();
    assert!(rows.is_empty());

    std::fs::remove_file(&path).unwrap();
}
