//! Fixed-bucket histogram for latency tracking

use std::sync::atomic::{AtomicU64, Ordering};

/// Default bucket upper bounds, in milliseconds
pub const DEFAULT_BUCKETS_MS: &[u64] = &[10, 50, 100, 500, 1_000, 5_000, 15_000, 30_000, 60_000];

/// Histogram over integer observations
///
/// Values above the last bound land in an extra overflow bucket.
pub struct Histogram {
    bounds: Vec<u64>,
    // one slot per bound plus the overflow slot
    counts: Vec<AtomicU64>,
    sum: AtomicU64,
    count: AtomicU64,
    max: AtomicU64,
}

impl Histogram {
    /// Create histogram with the default millisecond buckets
    pub fn new() -> Self {
        Self::with_bounds(DEFAULT_BUCKETS_MS.to_vec())
    }

    /// Create histogram with custom, ascending bucket bounds
    pub fn with_bounds(mut bounds: Vec<u64>) -> Self {
        bounds.sort_unstable();
        bounds.dedup();
        let counts = (0..=bounds.len()).map(|_| AtomicU64::new(0)).collect();
        Histogram {
            bounds,
            counts,
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
            max: AtomicU64::new(0),
        }
    }

    /// Record a value
    pub fn observe(&self, value: u64) {
        self.sum.fetch_add(value, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.max.fetch_max(value, Ordering::Relaxed);

        let slot = self.bounds.partition_point(|bound| *bound < value);
        self.counts[slot].fetch_add(1, Ordering::Relaxed);
    }

    /// Mean of all observations, 0 when empty
    pub fn mean(&self) -> f64 {
        let count = self.count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        self.sum.load(Ordering::Relaxed) as f64 / count as f64
    }

    /// Largest observation
    pub fn max(&self) -> u64 {
        self.max.load(Ordering::Relaxed)
    }

    /// Get total count
    pub fn total_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// `(upper bound, count)` per bucket; the overflow bucket has no bound
    pub fn buckets(&self) -> Vec<(Option<u64>, u64)> {
        self.bounds
            .iter()
            .map(|b| Some(*b))
            .chain(std::iter::once(None))
            .zip(self.counts.iter().map(|c| c.load(Ordering::Relaxed)))
            .collect()
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_placement() {
        let h = Histogram::with_bounds(vec![10, 100]);
        h.observe(0);
        h.observe(10);
        h.observe(11);
        h.observe(5_000);

        assert_eq!(
            h.buckets(),
            vec![(Some(10), 2), (Some(100), 1), (None, 1)]
        );
        assert_eq!(h.total_count(), 4);
        assert_eq!(h.max(), 5_000);
    }

    #[test]
    fn test_mean() {
        let h = Histogram::new();
        assert_eq!(h.mean(), 0.0);
        h.observe(100);
        h.observe(300);
        assert_eq!(h.mean(), 200.0);
    }
}
