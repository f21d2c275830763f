//! Sliding-window request counters.
//!
//! Each key keeps the count of the current fixed window and the one before
//! it. The effective count weights the previous window by how much of it
//! still overlaps the sliding window, which smooths the burst a plain fixed
//! window allows at its boundary.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const PRUNE_EVERY: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

#[derive(Debug)]
struct WindowState {
    current_start: Instant,
    current: u32,
    previous: u32,
}

#[derive(Debug)]
pub struct SlidingWindowLimiter {
    window: Duration,
    max: u32,
    windows: DashMap<String, WindowState>,
    checks: AtomicU64,
}

impl SlidingWindowLimiter {
    pub fn new(window: Duration, max: u32) -> Self {
        Self {
            window: window.max(Duration::from_millis(1)),
            max,
            windows: DashMap::new(),
            checks: AtomicU64::new(0),
        }
    }

    pub fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    /// Counts one request for `key` at `now`. Rejected requests are not counted.
    pub fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        if self.checks.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.prune(now);
        }

        let mut state = self.windows.entry(key.to_string()).or_insert_with(|| WindowState {
            current_start: now,
            current: 0,
            previous: 0,
        });

        let elapsed = now.saturating_duration_since(state.current_start);
        if elapsed >= self.window * 2 {
            state.previous = 0;
            state.current = 0;
            state.current_start = now;
        } else if elapsed >= self.window {
            state.previous = state.current;
            state.current = 0;
            state.current_start += self.window;
        }

        let into_current = now.saturating_duration_since(state.current_start);
        let overlap = 1.0 - (into_current.as_secs_f64() / self.window.as_secs_f64()).min(1.0);
        let estimated = f64::from(state.previous) * overlap + f64::from(state.current);

        if estimated + 1.0 > f64::from(self.max) {
            let retry_after = if state.current >= self.max {
                (state.current_start + self.window).saturating_duration_since(now)
            } else {
                // Time until the previous window's weight drops enough for one more request.
                let excess = estimated + 1.0 - f64::from(self.max);
                let per_request = self.window.as_secs_f64() / f64::from(state.previous.max(1));
                Duration::from_secs_f64(excess * per_request)
            };
            return RateDecision::Limited { retry_after: retry_after.max(Duration::from_secs(1)) };
        }

        state.current += 1;
        let remaining = (f64::from(self.max) - estimated - 1.0).max(0.0) as u32;
        RateDecision::Allowed { remaining }
    }

    /// Drops windows idle for two full periods.
    pub fn prune_idle(&self) {
        self.prune(Instant::now());
    }

    fn prune(&self, now: Instant) {
        let horizon = self.window * 2;
        self.windows.retain(|_, state| now.saturating_duration_since(state.current_start) < horizon);
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}
