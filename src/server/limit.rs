use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// How many tracked clients trigger a prune of expired windows.
const PRUNE_THRESHOLD: usize = 1024;

/// Fixed-window request counter keyed by client IP.
///
/// Each client gets `max_requests` per `window`; the count resets when a new
/// window starts. Stale windows are pruned opportunistically once the map
/// grows past a threshold, so idle clients do not accumulate forever.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    clients: Mutex<HashMap<IpAddr, Window>>,
}

struct Window {
    started: Instant,
    count: u32,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Records one request for `ip` and reports whether it is allowed.
    pub fn check(&self, ip: IpAddr) -> bool {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> bool {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if clients.len() > PRUNE_THRESHOLD {
            let window = self.window;
            clients.retain(|_, w| now.duration_since(w.started) < window);
        }
        let window = clients.entry(ip).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(window.started) >= self.window {
            window.started = now;
            window.count = 0;
        }
        window.count += 1;
        window.count <= self.max_requests
    }
}

impl Default for RateLimiter {
    /// The service default: 100 requests per 15-minute window.
    fn default() -> Self {
        Self::new(100, Duration::from_secs(15 * 60))
    }
}
