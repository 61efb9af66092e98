//! Client-side pacing of GitHub API calls.
//!
//! GitHub enforces secondary rate limits on bursts of content-creating requests. Rather than
//! sleeping ad hoc between calls, a [`RateLimitPolicy`] is given to the client when it is built,
//! and the client spaces out its own requests accordingly.

use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// How quickly the client is allowed to issue requests.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RateLimitPolicy {
    /// Send requests as fast as they complete
    #[default]
    Unlimited,

    /// Send at most this many requests per second
    MaxCallsPerSec(f64),
}

/// The longest interval enforced between two requests, however low the rate.
pub const MAX_INTERVAL: Duration = Duration::from_secs(3600);

impl RateLimitPolicy {
    /// The minimum time between the starts of two consecutive requests.
    ///
    /// Rates slower than one call per [`MAX_INTERVAL`] are clamped to it.
    pub fn min_interval(&self) -> Option<Duration> {
        match *self {
            RateLimitPolicy::Unlimited => None,
            RateLimitPolicy::MaxCallsPerSec(n) if n.is_finite() && n > 0.0 => Some(
                Duration::try_from_secs_f64(1.0 / n)
                    .map_or(MAX_INTERVAL, |d| d.min(MAX_INTERVAL)),
            ),
            RateLimitPolicy::MaxCallsPerSec(_) => None,
        }
    }
}

/// Enforces a [`RateLimitPolicy`] for one client.
#[derive(Debug)]
pub(super) struct Pacer {
    interval: Option<Duration>,
    last_call: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Pacer {
            interval: policy.min_interval(),
            last_call: Mutex::new(None),
        }
    }

    /// Wait until the next request may be sent, and record that it is being sent now.
    pub async fn wait_turn(&self) {
        let Some(interval) = self.interval else {
            return;
        };

        let ready_at = {
            let last = self.last_call.lock().unwrap_or_else(|e| e.into_inner());
            last.map(|t| t + interval)
        };
        if let Some(ready_at) = ready_at {
            let now = Instant::now();
            if ready_at > now {
                trace!("Pacing GitHub request for {:?}", ready_at - now);
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *self.last_call.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
    }
}
