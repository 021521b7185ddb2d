// Rate limiting for reddit OAuth API calls with exponential backoff.
//
// Reddit allows roughly 100 requests per minute per OAuth client and reports
// what's left in `X-Ratelimit-Remaining` / `X-Ratelimit-Reset` headers. The
// limiter keeps a sliding window of its own request timestamps and also
// honours the server's view: once the server says the quota is spent, every
// request waits until the advertised reset.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use tokio::time::Instant;
use tracing::{info, warn};

/// Reddit's documented OAuth quota.
pub const REQUESTS_PER_WINDOW: u32 = 100;
pub const WINDOW_SECS: u64 = 60;

/// A sliding-window rate limiter shared by every call a client makes.
pub struct RateLimiter {
    /// Timestamps of recent requests within the current window.
    requests: Mutex<VecDeque<Instant>>,
    max_requests: u32,
    window: Duration,
    /// Set when the server reports the quota exhausted.
    blocked_until: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests_per_window: u32, window_seconds: u64) -> Self {
        Self {
            requests: Mutex::new(VecDeque::new()),
            max_requests: max_requests_per_window,
            window: Duration::from_secs(window_seconds),
            blocked_until: Mutex::new(None),
        }
    }

    /// Wait until a request is allowed, then record it.
    pub async fn acquire(&self) {
        // Server-reported exhaustion first. Never hold a guard across await.
        let server_wait = {
            let mut blocked = self.blocked_until.lock().unwrap();
            match *blocked {
                Some(until) if until > Instant::now() => Some(until - Instant::now()),
                Some(_) => {
                    *blocked = None;
                    None
                }
                None => None,
            }
        };
        if let Some(wait) = server_wait {
            info!(
                delay_ms = wait.as_millis() as u64,
                "Reddit quota spent, waiting for reset"
            );
            tokio::time::sleep(wait).await;
        }

        loop {
            let action = {
                let now = Instant::now();
                let mut requests = self.requests.lock().unwrap();

                while let Some(&oldest) = requests.front() {
                    if now.duration_since(oldest) >= self.window {
                        requests.pop_front();
                    } else {
                        break;
                    }
                }

                if (requests.len() as u32) < self.max_requests {
                    requests.push_back(now);
                    None
                } else {
                    requests
                        .front()
                        .map(|&oldest| (oldest + self.window).duration_since(now))
                }
            };

            match action {
                None => return,
                Some(wait) => {
                    info!(
                        delay_ms = wait.as_millis() as u64,
                        "Rate limit: waiting {}ms before next request",
                        wait.as_millis()
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Feed back the quota headers from a response.
    ///
    /// `remaining` and `reset_secs` are the raw header values; anything
    /// unparseable is ignored.
    pub fn observe_headers(&self, remaining: Option<&str>, reset_secs: Option<&str>) {
        let remaining = remaining.and_then(|r| r.trim().parse::<f64>().ok());
        let reset = reset_secs.and_then(|r| r.trim().parse::<u64>().ok());

        if let (Some(remaining), Some(reset)) = (remaining, reset) {
            if remaining < 1.0 {
                let mut blocked = self.blocked_until.lock().unwrap();
                *blocked = Some(Instant::now() + Duration::from_secs(reset));
            }
        }
    }

    #[cfg(test)]
    fn recorded(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

/// Maximum number of retry attempts on rate-limit (429) errors.
const MAX_RETRIES: u32 = 5;

/// Base delay for exponential backoff (doubles each retry).
const BASE_BACKOFF: Duration = Duration::from_secs(2);

/// Maximum backoff delay to cap exponential growth.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Whether an error came from an HTTP 429 response.
fn is_rate_limit_error(err: &anyhow::Error) -> bool {
    let text = format!("{:?}", err).to_lowercase();
    text.contains("429") || text.contains("too many requests")
}

/// Retry an async operation with exponential backoff on rate-limit errors.
///
/// Any other error is returned straight away. `acquire()` runs before each
/// attempt so retries still count against the window.
pub async fn with_retry<F, Fut, T>(rate_limiter: &RateLimiter, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0u32;

    loop {
        rate_limiter.acquire().await;

        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_rate_limit_error(&err) || attempt >= MAX_RETRIES {
                    return Err(err);
                }

                attempt += 1;
                let backoff = BASE_BACKOFF
                    .saturating_mul(1u32 << attempt)
                    .min(MAX_BACKOFF);

                warn!(
                    attempt = attempt,
                    max_retries = MAX_RETRIES,
                    backoff_secs = backoff.as_secs_f64(),
                    "Rate limited (429), retrying in {:.1}s (attempt {}/{})",
                    backoff.as_secs_f64(),
                    attempt,
                    MAX_RETRIES,
                );

                tokio::time::sleep(backoff).await;
            }
        }
    }
}
