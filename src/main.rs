//! CLI entry point for terminal_reach.
//!
//! Provides subcommands for each stage of the pipeline: fetching and
//! ingesting the timetable feed, building the terminal connectivity table,
//! estimating expected travel times, and geocoding the results.

mod infra;

use crate::infra::nationalrail::{Credentials, NationalRailClient};
use crate::infra::nominatim::NominatimClient;
use anyhow::{Result, bail};
use chrono::Weekday;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use terminal_reach::{
    config::TerminalConfig,
    connectivity::{ConnectivityRow, terminal_connectivity},
    estimator::{ExpectedTime, TimeWindow, estimate_for_day},
    geocode::{
        GeocodeCache, GeocodedTerminal, ManualOverrides, RateLimited, attach_coordinates,
        resolve_names, stop_query, terminal_query,
    },
    ingest::ingest_file,
    output::{print_json, read_records, write_records},
    store::Store,
};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEFAULT_DATABASE_URL: &str = "sqlite://db/timetable.db";

#[derive(Parser)]
#[command(name = "terminal_reach")]
#[command(about = "Expected train travel times from city terminals", long_about = None)]
struct Cli {
    /// Database URL (defaults to $DATABASE_URL, then sqlite://db/timetable.db)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema if it does not exist
    InitDb,
    /// Authenticate with the National Rail portal and download the timetable
    Fetch {
        /// Credentials JSON file (defaults to NRDP_USERNAME / NRDP_PASSWORD)
        #[arg(long)]
        credentials: Option<PathBuf>,

        /// Where to write the downloaded archive
        #[arg(short, long, default_value = "data/timetable.zip")]
        output: PathBuf,
    },
    /// Load a newline-delimited JSON timetable feed into the database
    Ingest {
        /// Path to the feed file
        #[arg(value_name = "FILE")]
        feed: PathBuf,
    },
    /// Export every stop of every train serving the configured terminals
    Connectivity {
        /// Terminal definitions
        #[arg(short, long, default_value = "config/terminals.json")]
        terminals: PathBuf,

        /// Only this terminal
        #[arg(long)]
        terminal: Option<String>,

        /// CSV file to write
        #[arg(short, long, default_value = "output/terminal_connectivity.csv")]
        output: PathBuf,

        /// Gzip the output
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Estimate expected travel times from each terminal to downstream stops
    ExpectedTimes {
        #[command(flatten)]
        estimate: EstimateArgs,

        /// Read the connectivity table from this CSV instead of the database
        #[arg(long)]
        connectivity: Option<PathBuf>,

        /// CSV file for expected times
        #[arg(short, long, default_value = "output/expected_times_to_stops.csv")]
        output: PathBuf,

        /// CSV file for the per-minute samples
        #[arg(long, default_value = "output/expected_time_samples.csv")]
        samples_output: PathBuf,

        /// Gzip the outputs
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Ingest a feed and estimate expected travel times in one go
    Run {
        /// Path to the feed file
        #[arg(value_name = "FILE")]
        feed: PathBuf,

        #[command(flatten)]
        estimate: EstimateArgs,

        /// Directory for the output tables
        #[arg(short = 'd', long, default_value = "output")]
        output_dir: PathBuf,

        /// Gzip the outputs
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Attach coordinates to the expected-times table
    GeocodeStops {
        /// Expected-times CSV to geocode
        #[arg(short, long, default_value = "output/expected_times_to_stops.csv")]
        input: PathBuf,

        /// CSV file to write
        #[arg(short, long, default_value = "output/expected_times_geocoded.csv")]
        output: PathBuf,

        /// Country appended to stop queries
        #[arg(long, default_value = "England")]
        country: String,

        #[command(flatten)]
        geocode: GeocodeArgs,
    },
    /// Geocode the configured terminals
    GeocodeTerminals {
        /// Terminal definitions
        #[arg(short, long, default_value = "config/terminals.json")]
        terminals: PathBuf,

        /// CSV file to write
        #[arg(short, long, default_value = "output/terminals_geocoded.csv")]
        output: PathBuf,

        /// City appended to terminal queries
        #[arg(long, default_value = "London")]
        city: String,

        #[command(flatten)]
        geocode: GeocodeArgs,
    },
}

#[derive(clap::Args)]
struct EstimateArgs {
    /// Terminal definitions
    #[arg(short, long, default_value = "config/terminals.json")]
    terminals: PathBuf,

    /// Day of week the trains must run on
    #[arg(long, default_value = "tuesday")]
    day: Weekday,

    /// Arrival window at the terminal, HH:MM-HH:MM, end exclusive
    #[arg(short, long, default_value = "17:00-19:00")]
    window: TimeWindow,
}

#[derive(clap::Args)]
struct GeocodeArgs {
    /// Geocode cache CSV, reused and updated between runs
    #[arg(long, default_value = "output/geocode_cache.csv")]
    cache: PathBuf,

    /// Manual coordinates JSON
    #[arg(long, default_value = "config/geocode_overrides.json")]
    overrides: PathBuf,

    /// User agent sent to Nominatim
    #[arg(long, default_value = "terminal_reach")]
    user_agent: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/terminal_reach.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("terminal_reach.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let database_url = cli
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

    match cli.command {
        Commands::InitDb => {
            Store::open(&database_url).await?;
            info!(database_url, "Schema ready");
        }
        Commands::Fetch {
            credentials,
            output,
        } => {
            let credentials = Credentials::resolve(credentials.as_deref())?;
            let client = NationalRailClient::new();
            let token = client.authenticate(&credentials).await?;
            client.download_timetable(&token, &output).await?;
        }
        Commands::Ingest { feed } => {
            let store = Store::open(&database_url).await?;
            let stats = ingest_file(&store, &feed).await?.finish();
            print_json(&stats)?;
        }
        Commands::Connectivity {
            terminals,
            terminal,
            output,
            gzip,
        } => {
            let terminals = load_terminals(&terminals)?;
            let codes = match terminal {
                Some(name) => match terminals.codes(&name) {
                    Some(codes) => codes.to_vec(),
                    None => bail!("terminal '{name}' is not configured"),
                },
                None => terminals.all_codes(),
            };

            let store = Store::open(&database_url).await?;
            let rows = terminal_connectivity(&store, &codes).await?;
            let written = write_records(&output, &rows, gzip)?;
            info!(rows = rows.len(), path = %written.display(), "Connectivity table saved");
        }
        Commands::ExpectedTimes {
            estimate,
            connectivity,
            output,
            samples_output,
            gzip,
        } => {
            let terminals = load_terminals(&estimate.terminals)?;
            let rows: Vec<ConnectivityRow> = match connectivity {
                Some(path) => read_records(&path)?,
                None => {
                    let store = Store::open(&database_url).await?;
                    terminal_connectivity(&store, &terminals.all_codes()).await?
                }
            };
            expected_times(&rows, &terminals, &estimate, &output, &samples_output, gzip)?;
        }
        Commands::Run {
            feed,
            estimate,
            output_dir,
            gzip,
        } => {
            let terminals = load_terminals(&estimate.terminals)?;
            let store = Store::open(&database_url).await?;

            let stats = ingest_file(&store, &feed).await?.finish();
            print_json(&stats)?;

            let rows = terminal_connectivity(&store, &terminals.all_codes()).await?;
            write_records(&output_dir.join("terminal_connectivity.csv"), &rows, gzip)?;

            expected_times(
                &rows,
                &terminals,
                &estimate,
                &output_dir.join("expected_times_to_stops.csv"),
                &output_dir.join("expected_time_samples.csv"),
                gzip,
            )?;
        }
        Commands::GeocodeStops {
            input,
            output,
            country,
            geocode,
        } => {
            let expected: Vec<ExpectedTime> = read_records(&input)?;
            let geocoder = RateLimited::new(NominatimClient::new(&geocode.user_agent)?);
            let overrides = ManualOverrides::load(&geocode.overrides)?;
            let mut cache = GeocodeCache::load(&geocode.cache)?;

            let stops = expected.iter().map(|row| row.stop.as_str());
            let located =
                resolve_names(stops, stop_query(&country), &geocoder, &mut cache, &overrides).await;
            cache.save(&geocode.cache)?;

            let geocoded = attach_coordinates(&expected, &located);
            let dropped = expected.len() - geocoded.len();
            if dropped > 0 {
                warn!(dropped, "Rows without coordinates dropped");
            }
            let written = write_records(&output, &geocoded, false)?;
            info!(rows = geocoded.len(), path = %written.display(), "Geocoded expected times saved");
        }
        Commands::GeocodeTerminals {
            terminals,
            output,
            city,
            geocode,
        } => {
            let terminals = load_terminals(&terminals)?;
            let geocoder = RateLimited::new(NominatimClient::new(&geocode.user_agent)?);
            let overrides = ManualOverrides::load(&geocode.overrides)?;
            let mut cache = GeocodeCache::load(&geocode.cache)?;

            let located = resolve_names(
                terminals.names(),
                terminal_query(&city),
                &geocoder,
                &mut cache,
                &overrides,
            )
            .await;
            cache.save(&geocode.cache)?;

            let geocoded: Vec<GeocodedTerminal> = located
                .into_iter()
                .map(|(terminal, at)| GeocodedTerminal {
                    terminal,
                    lat: at.lat,
                    lon: at.lon,
                })
                .collect();
            let written = write_records(&output, &geocoded, false)?;
            info!(rows = geocoded.len(), path = %written.display(), "Geocoded terminals saved");
        }
    }

    Ok(())
}

fn load_terminals(path: &Path) -> Result<TerminalConfig> {
    let terminals = TerminalConfig::load(&path.to_string_lossy())?;
    if terminals.is_empty() {
        bail!("no terminals configured in {}", path.display());
    }
    info!(terminals = terminals.len(), "Terminal definitions loaded");
    Ok(terminals)
}

/// Estimates for the requested day and window and writes both tables.
#[tracing::instrument(skip_all, fields(day = %args.day, window = %args.window))]
fn expected_times(
    rows: &[ConnectivityRow],
    terminals: &TerminalConfig,
    args: &EstimateArgs,
    output: &Path,
    samples_output: &Path,
    gzip: bool,
) -> Result<()> {
    let estimate = estimate_for_day(rows, args.day, terminals, &args.window);
    if estimate.expected.is_empty() {
        warn!("No trains leave the terminals during the window");
    }

    let samples = write_records(samples_output, &estimate.samples, gzip)?;
    let expected = write_records(output, &estimate.expected, gzip)?;
    info!(
        pairs = estimate.expected.len(),
        samples = estimate.samples.len(),
        output = %expected.display(),
        samples_output = %samples.display(),
        "Expected times saved"
    );
    Ok(())
}
