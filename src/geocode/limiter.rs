use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::warn;

use super::{Coordinates, Geocoder};

/// Spaces calls to a geocoding provider and retries failed ones.
pub struct RateLimited<G> {
    inner: G,
    min_delay: Duration,
    max_retries: u32,
    error_wait: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl<G: Geocoder> RateLimited<G> {
    /// One call per second, three retries five seconds apart.
    pub fn new(inner: G) -> Self {
        Self::with_delays(inner, Duration::from_secs(1), 3, Duration::from_secs(5))
    }

    pub fn with_delays(inner: G, min_delay: Duration, max_retries: u32, error_wait: Duration) -> Self {
        Self {
            inner,
            min_delay,
            max_retries,
            error_wait,
            last_call: Mutex::new(None),
        }
    }

    async fn wait_turn(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let ready = previous + self.min_delay;
            if ready > Instant::now() {
                sleep(ready - Instant::now()).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

#[async_trait]
impl<G: Geocoder> Geocoder for RateLimited<G> {
    async fn locate(&self, query: &str) -> Result<Option<Coordinates>> {
        let mut attempt = 0;
        loop {
            self.wait_turn().await;
            match self.inner.locate(query).await {
                Ok(found) => return Ok(found),
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(query, attempt, error = %e, "Geocoding failed, retrying");
                    sleep(self.error_wait).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
