//! National Rail open-data portal: token authentication and the static
//! timetable download.

pub mod client;

pub use client::{Credentials, NationalRailClient};
