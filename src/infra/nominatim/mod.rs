//! OpenStreetMap Nominatim geocoding.

pub mod client;

pub use client::NominatimClient;
