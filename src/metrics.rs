//! Minimal metrics hook so the embedding process can wire this service's
//! counters into its own reporter without this crate depending on a
//! specific metrics backend.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

pub trait ServiceMetrics: Send + Sync {
    fn fetch_attempted(&self) {}
    fn fetch_succeeded(&self) {}
    fn fetch_failed(&self) {}
    fn retry_scheduled(&self) {}
    fn topic_retired(&self) {}
    fn in_flight_gauge(&self, _count: i64) {}
}

/// Default no-op implementation, used when the embedder does not supply one.
#[derive(Debug, Default)]
pub struct NoopMetrics;

impl ServiceMetrics for NoopMetrics {}

/// In-process counters, handy for tests and for embedders that just want
/// simple atomics without standing up a full metrics pipeline.
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    pub fetch_attempted: AtomicU64,
    pub fetch_succeeded: AtomicU64,
    pub fetch_failed: AtomicU64,
    pub retry_scheduled: AtomicU64,
    pub topic_retired: AtomicU64,
    pub in_flight: AtomicI64,
}

impl ServiceMetrics for AtomicMetrics {
    fn fetch_attempted(&self) {
        self.fetch_attempted.fetch_add(1, Ordering::Relaxed);
    }

    fn fetch_succeeded(&self) {
        self.fetch_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    fn fetch_failed(&self) {
        self.fetch_failed.fetch_add(1, Ordering::Relaxed);
    }

    fn retry_scheduled(&self) {
        self.retry_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    fn topic_retired(&self) {
        self.topic_retired.fetch_add(1, Ordering::Relaxed);
    }

    fn in_flight_gauge(&self, count: i64) {
        self.in_flight.store(count, Ordering::Relaxed);
    }
}
