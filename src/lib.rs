pub mod config;
pub mod connectivity;
pub mod estimator;
pub mod fetch;
pub mod geocode;
pub mod ingest;
pub mod model;
pub mod output;
pub mod parser;
pub mod stats;
pub mod store;
