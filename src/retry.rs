//! Retry Scheduler (C5): on transient fetch failure, re-enqueue the topic
//! after a fixed delay.
//!
//! No exponential backoff: a fixed `T_retry` is adequate because the
//! per-attempt timeout (10s default) is large relative to `T_retry`
//! (100ms), and every attempt is a full HTTP round trip against a freshly
//! (randomly) chosen replica, so a retry storm against one bad replica is
//! not a concern the way it would be for a persistent connection.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::metrics::ServiceMetrics;
use crate::queue::CandidateQueueHandle;
use crate::registry::InFlightRegistry;
use crate::topic::Topic;

#[derive(Clone)]
pub struct RetryScheduler {
    queue: CandidateQueueHandle,
    registry: Arc<InFlightRegistry>,
    metrics: Arc<dyn ServiceMetrics>,
    delay: Duration,
}

impl RetryScheduler {
    pub fn new(
        queue: CandidateQueueHandle,
        registry: Arc<InFlightRegistry>,
        metrics: Arc<dyn ServiceMetrics>,
        delay: Duration,
    ) -> Self {
        Self {
            queue,
            registry,
            metrics,
            delay,
        }
    }

    /// Schedules `topic` to be re-enqueued after `self.delay`. Spawned onto
    /// whichever runtime the caller is on; does not block the caller.
    pub fn schedule(&self, topic: Topic) {
        let queue = self.queue.clone();
        let registry = Arc::clone(&self.registry);
        let metrics = Arc::clone(&self.metrics);
        let delay = self.delay;

        metrics.retry_scheduled();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            // If the topic was retired while we were sleeping, the
            // in-flight registry entry is gone and must stay gone: do not
            // resurrect a retired topic by re-enqueuing it.
            if registry.contains(&topic) {
                debug!(%topic, "skipping retry re-enqueue: topic already has an in-flight handle");
                return;
            }

            debug!(%topic, "re-enqueuing topic after retry delay");
            queue.enqueue(topic);
        });
    }
}
