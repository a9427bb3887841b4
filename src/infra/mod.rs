pub mod nationalrail;
pub mod nominatim;
