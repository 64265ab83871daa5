//! Usage counters for pools

use std::sync::atomic::{AtomicUsize, Ordering};

/// Point-in-time snapshot of a pool's usage counters.
///
/// # Examples
///
/// ```
/// use tarn::{Pool, PoolConfig};
///
/// let pool = Pool::from_fn(PoolConfig::new(), || 42).unwrap();
/// pool.checkout(|_| ()).unwrap();
///
/// let stats = pool.stats();
/// assert_eq!(stats.checkouts, 1);
/// assert_eq!(stats.constructed, 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Successful resource acquisitions (re-entrant checkouts not counted).
    pub checkouts: usize,
    /// Checkouts that failed with a timeout.
    pub timeouts: usize,
    /// Resources successfully constructed by the factory.
    pub constructed: usize,
    /// Factory invocations that failed.
    pub construction_failures: usize,
    /// Resources detached at checkin (predicate, override, or shrink).
    pub detached: usize,
}

/// Internal counter set, updated with relaxed atomics outside the pool lock.
#[derive(Default)]
pub(crate) struct StatsTracker {
    pub checkouts: AtomicUsize,
    pub timeouts: AtomicUsize,
    pub constructed: AtomicUsize,
    pub construction_failures: AtomicUsize,
    pub detached: AtomicUsize,
}

impl StatsTracker {
    pub fn record_checkout(&self) {
        self.checkouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_constructed(&self) {
        self.constructed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_construction_failure(&self) {
        self.construction_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_detached(&self) {
        self.detached.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PoolStats {
        PoolStats {
            checkouts: self.checkouts.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            constructed: self.constructed.load(Ordering::Relaxed),
            construction_failures: self.construction_failures.load(Ordering::Relaxed),
            detached: self.detached.load(Ordering::Relaxed),
        }
    }
}
