//! In-memory per-tenant rate limiting.
//!
//! Fixed-window counters. Window index and request count live in one atomic
//! word, so a window rollover and an increment always commit together and
//! the hot path never takes a write lock for an existing key. Idle keys are
//! evicted by a periodic sweep rather than per-request scans.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

struct Window {
    /// High 32 bits: window index. Low 32 bits: request count.
    state: AtomicU64,
    last_seen_ms: AtomicU64,
}

fn pack(index: u32, count: u32) -> u64 {
    (u64::from(index) << 32) | u64::from(count)
}

/// Fixed-window rate limiter keyed by an opaque string (organization id).
pub struct RateLimiter {
    max_requests: u64,
    window_ms: u64,
    windows: RwLock<HashMap<String, Arc<Window>>>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

impl RateLimiter {
    pub fn new(max_requests: u64, window: Duration) -> Self {
        Self {
            max_requests,
            window_ms: window.as_millis().max(1) as u64,
            windows: RwLock::new(HashMap::new()),
        }
    }

    /// Record one request for `key`; `false` means over the limit.
    pub fn check(&self, key: &str) -> bool {
        let now = now_ms();
        let index = (now / self.window_ms) as u32;
        let window = self.window_for(key, index);
        window.last_seen_ms.store(now, Ordering::Relaxed);

        loop {
            let state = window.state.load(Ordering::Acquire);
            let (current, count) = ((state >> 32) as u32, state as u32);

            let next = if current == index {
                if u64::from(count) >= self.max_requests {
                    warn!(key, count, limit = self.max_requests, "rate limit exceeded");
                    return false;
                }
                pack(index, count + 1)
            } else {
                // New window: the winning writer carries its own request as
                // the first count, losers retry against the fresh state.
                pack(index, 1)
            };

            if window
                .state
                .compare_exchange(state, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }
    }

    fn window_for(&self, key: &str, index: u32) -> Arc<Window> {
        if let Some(window) = self.windows.read().expect("rate limiter poisoned").get(key) {
            return window.clone();
        }

        let mut windows = self.windows.write().expect("rate limiter poisoned");
        windows
            .entry(key.to_string())
            .or_insert_with(|| {
                Arc::new(Window {
                    state: AtomicU64::new(pack(index, 0)),
                    last_seen_ms: AtomicU64::new(now_ms()),
                })
            })
            .clone()
    }

    /// Evict keys idle for more than two windows.
    pub fn sweep(&self) {
        let cutoff = now_ms().saturating_sub(self.window_ms * 2);
        let mut windows = self.windows.write().expect("rate limiter poisoned");
        let before = windows.len();
        windows.retain(|_, w| w.last_seen_ms.load(Ordering::Relaxed) >= cutoff);
        let evicted = before - windows.len();
        if evicted > 0 {
            debug!(evicted, "swept idle rate-limit windows");
        }
    }

    /// Spawn the periodic sweeper task.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                limiter.sweep();
            }
        })
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.read().expect("rate limiter poisoned").len()
    }
}
