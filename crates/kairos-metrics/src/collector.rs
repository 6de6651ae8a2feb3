//! Metrics registry

use crate::Histogram;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Thread-safe registry of named metrics, created on first use
///
/// Share it as `Arc<Metrics>` between the scheduler, intake and HTTP layers.
#[derive(Default)]
pub struct Metrics {
    histograms: RwLock<HashMap<String, Arc<Histogram>>>,
    counters: RwLock<HashMap<String, Arc<AtomicU64>>>,
    gauges: RwLock<HashMap<String, Arc<AtomicI64>>>,
}

impl Metrics {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn slot<T, F>(map: &RwLock<HashMap<String, Arc<T>>>, name: &str, init: F) -> Arc<T>
    where
        F: FnOnce() -> T,
    {
        if let Some(existing) = map.read().get(name) {
            return Arc::clone(existing);
        }
        let mut map = map.write();
        Arc::clone(
            map.entry(name.to_string())
                .or_insert_with(|| Arc::new(init())),
        )
    }

    /// Record a histogram observation
    pub fn histogram(&self, name: &str, value: u64) {
        Self::slot(&self.histograms, name, Histogram::new).observe(value);
    }

    /// Record a duration in milliseconds
    pub fn record_duration(&self, name: &str, elapsed: Duration) {
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.histogram(name, ms);
    }

    /// Increment a counter
    pub fn counter(&self, name: &str, delta: u64) {
        Self::slot(&self.counters, name, || AtomicU64::new(0)).fetch_add(delta, Ordering::Relaxed);
    }

    /// Increment a counter by one
    pub fn incr(&self, name: &str) {
        self.counter(name, 1);
    }

    /// Set a gauge value
    pub fn gauge(&self, name: &str, value: i64) {
        Self::slot(&self.gauges, name, || AtomicI64::new(0)).store(value, Ordering::Relaxed);
    }

    /// Get counter value
    pub fn get_counter(&self, name: &str) -> Option<u64> {
        self.counters
            .read()
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
    }

    /// Get gauge value
    pub fn get_gauge(&self, name: &str) -> Option<i64> {
        self.gauges
            .read()
            .get(name)
            .map(|g| g.load(Ordering::Relaxed))
    }

    /// Get a histogram by name
    pub fn get_histogram(&self, name: &str) -> Option<Arc<Histogram>> {
        self.histograms.read().get(name).cloned()
    }

    pub(crate) fn all_counters(&self) -> Vec<(String, u64)> {
        self.counters
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
            .collect()
    }

    pub(crate) fn all_gauges(&self) -> Vec<(String, i64)> {
        self.gauges
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
            .collect()
    }

    pub(crate) fn all_histograms(&self) -> Vec<(String, Arc<Histogram>)> {
        self.histograms
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect()
    }
}
