//! Expected travel time estimation.
//!
//! For each terminal, every minute of a time window is treated as a moment a
//! traveller might arrive at the terminal. The earliest arrival at each
//! downstream stop reachable by a single train leaving after that minute is
//! recorded as a sample, and samples are averaged per terminal and stop.

pub mod aggregate;
pub mod estimate;
pub mod sweep;
pub mod types;
pub mod utility;
pub mod window;

pub use estimate::{Estimate, estimate, estimate_for_day};
pub use types::{ExpectedTime, Sample};
pub use window::TimeWindow;
