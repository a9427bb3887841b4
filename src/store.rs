//! SQLite persistence for tiplocs, trains and train locations.
//!
//! The store is append-only: every write is `INSERT OR IGNORE`, so a row that
//! already exists is never overwritten and re-running ingestion is safe.

use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::model::{Tiploc, Train, TrainLocation};
use crate::parser::ParsedSchedule;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS tiplocs (
        tiploc_code TEXT PRIMARY KEY,
        station_name TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS trains (
        train_id TEXT PRIMARY KEY,
        train_uid TEXT NOT NULL,
        stp_indicator TEXT NOT NULL,
        service_code TEXT,
        runs_on TEXT,
        start_date TEXT NOT NULL,
        end_date TEXT,
        origin_tiploc TEXT NOT NULL,
        destination_tiploc TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS train_locations (
        train_id TEXT NOT NULL,
        seq INTEGER NOT NULL,
        tiploc_code TEXT NOT NULL,
        public_arrival TEXT,
        public_departure TEXT,
        platform TEXT,
        activity_code TEXT,
        PRIMARY KEY (train_id, seq)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_train_locations_tiploc ON train_locations (tiploc_code)",
];

/// A stored location joined with its train and the station names involved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StopVisit {
    pub train_id: String,
    pub seq: i64,
    pub tiploc_code: String,
    pub public_arrival: Option<String>,
    pub public_departure: Option<String>,
    pub platform: Option<String>,
    pub activity_code: Option<String>,
    pub stp_indicator: String,
    pub runs_on: Option<String>,
    pub origin_tiploc: String,
    pub destination_tiploc: String,
    pub origin_name: Option<String>,
    pub destination_name: Option<String>,
    pub stop_name: Option<String>,
}

/// Outcome of writing one schedule.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleWrite {
    pub train_inserted: bool,
    pub locations_inserted: usize,
    pub locations_existing: usize,
}

pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Opens (creating if needed) the database at `url`, e.g.
    /// `sqlite://db/timetable.db` or `sqlite::memory:`.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid database url '{url}'"))?
            .create_if_missing(true);

        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // A single connection: there is one writer, and an in-memory
        // database only lives as long as its connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open database '{url}'"))?;

        debug!(url, "Database opened");
        Ok(Self { pool })
    }

    /// Opens the database and makes sure the schema exists.
    pub async fn open(url: &str) -> Result<Self> {
        let store = Self::connect(url).await?;
        store.create_schema().await?;
        Ok(store)
    }

    pub async fn create_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Schema ready");
        Ok(())
    }

    /// The underlying pool, for ad-hoc joins across the three tables.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    /// All locations, with train and station details, of every train that
    /// calls at any of `codes`.
    #[tracing::instrument(skip(self), fields(codes = codes.len()))]
    pub async fn stop_visits(&self, codes: &[String]) -> Result<Vec<StopVisit>> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; codes.len()].join(",");
        let sql = format!(
            r#"
            SELECT
                tl.train_id,
                tl.seq,
                tl.tiploc_code,
                tl.public_arrival,
                tl.public_departure,
                tl.platform,
                tl.activity_code,
                t.stp_indicator,
                t.runs_on,
                t.origin_tiploc,
                t.destination_tiploc,
                origin_station.station_name AS origin_name,
                dest_station.station_name AS destination_name,
                stop_station.station_name AS stop_name
            FROM train_locations tl
            JOIN trains t ON t.train_id = tl.train_id
            LEFT JOIN tiplocs origin_station ON origin_station.tiploc_code = t.origin_tiploc
            LEFT JOIN tiplocs dest_station ON dest_station.tiploc_code = t.destination_tiploc
            LEFT JOIN tiplocs stop_station ON stop_station.tiploc_code = tl.tiploc_code
            WHERE EXISTS (
                SELECT 1
                FROM train_locations tl2
                WHERE tl2.train_id = tl.train_id AND tl2.tiploc_code IN ({placeholders})
            )
            ORDER BY tl.train_id, tl.seq
            "#
        );

        let mut query = sqlx::query_as::<_, StopVisit>(&sql);
        for code in codes {
            query = query.bind(code);
        }
        let visits = query.fetch_all(&self.pool).await?;

        debug!(rows = visits.len(), "Stop visits fetched");
        Ok(visits)
    }

    pub async fn tiplocs(&self) -> Result<Vec<Tiploc>> {
        Ok(
            sqlx::query_as::<_, Tiploc>(
                "SELECT tiploc_code, station_name FROM tiplocs ORDER BY tiploc_code",
            )
            .fetch_all(&self.pool)
            .await?,
        )
    }

    pub async fn trains(&self) -> Result<Vec<Train>> {
        Ok(sqlx::query_as::<_, Train>(
            r#"
            SELECT train_id, train_uid, stp_indicator, service_code, runs_on,
                   start_date, end_date, origin_tiploc, destination_tiploc
            FROM trains
            ORDER BY train_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn train_locations(&self) -> Result<Vec<TrainLocation>> {
        Ok(sqlx::query_as::<_, TrainLocation>(
            r#"
            SELECT train_id, seq, tiploc_code, public_arrival, public_departure,
                   platform, activity_code
            FROM train_locations
            ORDER BY train_id, seq
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    /// Row counts of `(tiplocs, trains, train_locations)`.
    pub async fn counts(&self) -> Result<(i64, i64, i64)> {
        let count = |table: &'static str| {
            let sql = format!("SELECT COUNT(*) FROM {table}");
            let pool = self.pool.clone();
            async move { sqlx::query_scalar::<_, i64>(&sql).fetch_one(&pool).await }
        };

        Ok((
            count("tiplocs").await?,
            count("trains").await?,
            count("train_locations").await?,
        ))
    }
}

/// Inserts a tiploc unless its code is already stored. Returns whether a row
/// was written.
pub async fn insert_tiploc(conn: &mut SqliteConnection, tiploc: &Tiploc) -> Result<bool> {
    let result =
        sqlx::query("INSERT OR IGNORE INTO tiplocs (tiploc_code, station_name) VALUES (?, ?)")
            .bind(&tiploc.tiploc_code)
            .bind(&tiploc.station_name)
            .execute(&mut *conn)
            .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn insert_train(conn: &mut SqliteConnection, train: &Train) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO trains (
            train_id, train_uid, stp_indicator, service_code,
            runs_on, start_date, end_date, origin_tiploc, destination_tiploc
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&train.train_id)
    .bind(&train.train_uid)
    .bind(&train.stp_indicator)
    .bind(&train.service_code)
    .bind(&train.runs_on)
    .bind(&train.start_date)
    .bind(&train.end_date)
    .bind(&train.origin_tiploc)
    .bind(&train.destination_tiploc)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn insert_train_location(
    conn: &mut SqliteConnection,
    location: &TrainLocation,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO train_locations (
            train_id, seq, tiploc_code, public_arrival, public_departure, platform, activity_code
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&location.train_id)
    .bind(location.seq)
    .bind(&location.tiploc_code)
    .bind(&location.public_arrival)
    .bind(&location.public_departure)
    .bind(&location.platform)
    .bind(&location.activity_code)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Writes a train and all of its locations.
pub async fn insert_schedule(
    conn: &mut SqliteConnection,
    schedule: &ParsedSchedule,
) -> Result<ScheduleWrite> {
    let mut write = ScheduleWrite {
        train_inserted: insert_train(conn, &schedule.train).await?,
        ..Default::default()
    };

    for location in &schedule.locations {
        if insert_train_location(conn, location).await? {
            write.locations_inserted += 1;
        } else {
            write.locations_existing += 1;
        }
    }

    Ok(write)
}
