use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ExplorerError, Result};
use crate::metrics::RATE_LIMITED_TOTAL;

/// Sliding-window request limiter keyed by client identity.
///
/// Timestamps for an identity are kept in arrival order and pruned lazily on
/// each check. The whole log sits behind one lock that is held only for a
/// single check-and-record, never across I/O.
pub struct RateLimiter {
    quota: usize,
    window: Duration,
    log: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
}

impl RateLimiter {
    pub fn new(quota: usize, window: Duration) -> Self {
        Self {
            quota,
            window,
            log: Mutex::new(HashMap::new()),
        }
    }

    pub fn quota(&self) -> usize {
        self.quota
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn check(&self, identity: &str) -> Result<()> {
        self.check_at(identity, Utc::now())
    }

    /// Prune, compare, record. Rejected checks are not recorded.
    pub fn check_at(&self, identity: &str, now: DateTime<Utc>) -> Result<()> {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(stamps) = log.get_mut(identity) {
            // oldest first, so pruning stops at the first live entry
            while let Some(oldest) = stamps.front() {
                if self.is_live(*oldest, now) {
                    break;
                }
                stamps.pop_front();
            }
        }

        let used = log.get(identity).map_or(0, VecDeque::len);
        if used >= self.quota {
            RATE_LIMITED_TOTAL.inc();
            warn!(identity, used, quota = self.quota, "rate limit exceeded");
            return Err(ExplorerError::rate_limited());
        }

        log.entry(identity.to_string()).or_default().push_back(now);
        debug!(identity, used = used + 1, quota = self.quota, "request allowed");
        Ok(())
    }

    // Raw number of stored timestamps for an identity (no pruning)
    pub fn recorded(&self, identity: &str) -> usize {
        let log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.get(identity).map_or(0, VecDeque::len)
    }

    fn is_live(&self, stamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        // a stamp from the future (clock stepped back) still counts
        (now - stamp)
            .to_std()
            .map_or(true, |age| age < self.window)
    }
}
