use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Clone, Debug, Default)]
pub struct Limits {
    /// `None` or zero disables pacing
    pub requests_per_sec: Option<u32>,
}

impl Limits {
    pub fn per_second(requests: u32) -> Self {
        Self { requests_per_sec: Some(requests) }
    }
}

#[derive(Clone, Debug)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    limits: Limits,
    // token bucket modeled by current tokens and the time of last refill
    tokens: Mutex<(f64, Instant)>,
}

impl RateLimiter {
    pub fn new(limits: Limits) -> Self {
        let capacity = limits.requests_per_sec.unwrap_or(0) as f64;
        Self {
            inner: Arc::new(Inner {
                limits,
                tokens: Mutex::new((capacity, Instant::now())),
            }),
        }
    }

    /// Wait until one request may be sent.
    pub async fn acquire(&self) {
        match self.inner.limits.requests_per_sec {
            Some(rps) if rps > 0 => self.consume_token(rps as f64).await,
            _ => {}
        }
    }

    async fn consume_token(&self, capacity: f64) {
        // Refill continuously at `capacity` tokens per second, burst up to `capacity`
        loop {
            let mut guard = self.inner.tokens.lock().await;
            let (ref mut tokens, ref mut last) = *guard;
            let now = Instant::now();
            let elapsed = now.duration_since(*last).as_secs_f64();
            *tokens = (*tokens + elapsed * capacity).min(capacity);
            *last = now;
            if *tokens >= 1.0 {
                *tokens -= 1.0;
                break;
            }
            let secs = (1.0 - *tokens) / capacity;
            drop(guard);
            debug!(wait_secs = secs, "rate limit reached, waiting");
            tokio::time::sleep(Duration::from_secs_f64(secs.max(0.001))).await;
        }
    }
}
