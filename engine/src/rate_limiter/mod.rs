//! Rate limiting module
//!
//! Bounds how often the engine calls a shared external service. Each
//! `RateLimiter` keeps the timestamps of the calls it granted and enforces a
//! sliding 60-second window:
//!
//! - **web_search**: general web search used by the tool agent (default 5/min)
//! - **premium_search**: domain-filtered search (default 10/min)
//! - **translation**: translation and language detection (default 20/min)
//!
//! Limiters never share state. `acquire` never fails; at worst it delays the
//! caller until the oldest call in the window expires.
//!
//! # Concurrency
//!
//! The prune, check, wait and record steps run inside one per-limiter
//! critical section guarded by a FIFO-fair `tokio::sync::Mutex`, so
//! concurrent callers are granted in arrival order and the window can never
//! hold more than `calls_per_minute` grants.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::config::RateLimitConfig;

/// Length of the sliding window
pub const WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window limiter for one external service
#[derive(Debug)]
pub struct RateLimiter {
    service: String,
    calls_per_minute: usize,
    call_times: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// A limit of 0 would block forever, so it is clamped to 1.
    pub fn new(service: impl Into<String>, calls_per_minute: usize) -> Self {
        Self {
            service: service.into(),
            calls_per_minute: calls_per_minute.max(1),
            call_times: Mutex::new(VecDeque::new()),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn calls_per_minute(&self) -> usize {
        self.calls_per_minute
    }

    /// Wait until a call is allowed, then record it
    pub async fn acquire(&self) {
        let mut call_times = self.call_times.lock().await;

        let now = Instant::now();
        prune(&mut call_times, now);

        if call_times.len() >= self.calls_per_minute {
            if let Some(&oldest) = call_times.front() {
                let wait = WINDOW.saturating_sub(now.saturating_duration_since(oldest));
                if !wait.is_zero() {
                    info!(
                        "Rate limit reached for {} ({}/{}), waiting {:.1}s",
                        self.service,
                        call_times.len(),
                        self.calls_per_minute,
                        wait.as_secs_f64()
                    );
                    sleep(wait).await;
                }
            }
            prune(&mut call_times, Instant::now());
        }

        call_times.push_back(Instant::now());
        debug!(
            "Granted {} call ({}/{} in window)",
            self.service,
            call_times.len(),
            self.calls_per_minute
        );
    }

    /// Number of granted calls still inside the window
    pub async fn in_window(&self) -> usize {
        let mut call_times = self.call_times.lock().await;
        prune(&mut call_times, Instant::now());
        call_times.len()
    }
}

/// Drop timestamps that have left the window
fn prune(call_times: &mut VecDeque<Instant>, now: Instant) {
    while let Some(&oldest) = call_times.front() {
        if now.saturating_duration_since(oldest) >= WINDOW {
            call_times.pop_front();
        } else {
            break;
        }
    }
}

/// The independent limiters the engine shares across requests
#[derive(Debug, Clone)]
pub struct RateLimiters {
    pub web_search: Arc<RateLimiter>,
    pub premium_search: Arc<RateLimiter>,
    pub translation: Arc<RateLimiter>,
}

impl RateLimiters {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            web_search: Arc::new(RateLimiter::new("web_search", config.web_search)),
            premium_search: Arc::new(RateLimiter::new("premium_search", config.premium_search)),
            translation: Arc::new(RateLimiter::new("translation", config.translation)),
        }
    }
}
