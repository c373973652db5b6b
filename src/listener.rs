//! Change Listener (C6): consumes store-change events and emits "need
//! dictionary for topic T" / "retire topic T" decisions.
//!
//! Event handlers may run on arbitrary threads (delivered by the metadata
//! repository's own callback threads) and must be safe under concurrent
//! delivery and safe to interleave with the consumer loop; every method
//! here only touches the thread-safe registry and queue handle.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::collaborators::{CompressorRegistry, StoreChangeEvent, StoreChangeListener};
use crate::metrics::ServiceMetrics;
use crate::model::Store;
use crate::queue::CandidateQueueHandle;
use crate::registry::InFlightRegistry;
use crate::topic::Topic;

pub struct ChangeListener {
    queue: CandidateQueueHandle,
    registry: Arc<InFlightRegistry>,
    compressor_registry: Arc<dyn CompressorRegistry>,
    metrics: Arc<dyn ServiceMetrics>,
}

impl ChangeListener {
    pub fn new(
        queue: CandidateQueueHandle,
        registry: Arc<InFlightRegistry>,
        compressor_registry: Arc<dyn CompressorRegistry>,
        metrics: Arc<dyn ServiceMetrics>,
    ) -> Self {
        Self {
            queue,
            registry,
            compressor_registry,
            metrics,
        }
    }

    fn handle_created(&self, store: &Store) {
        // A brand new store: every currently eligible version is an ADD,
        // there is nothing to drop yet.
        for topic in store.eligible_topics() {
            if !self.registry.contains(&topic) {
                info!(%topic, "enqueuing newly created dictionary-eligible version");
                self.queue.enqueue(topic);
            }
        }
    }

    fn handle_changed(&self, store: &Store) {
        let eligible: HashSet<Topic> = store.eligible_topics().into_iter().collect();

        // ADD set: eligible and not already tracked.
        for topic in &eligible {
            if !self.registry.contains(topic) {
                info!(%topic, "enqueuing newly eligible version");
                self.queue.enqueue(topic.clone());
            }
        }

        // DROP-by-status set: still dictionary-compressed but no longer
        // online, so no longer eligible even though the version still
        // exists in the store.
        for version in &store.versions {
            if version.uses_dictionary_compression() && !version.is_dictionary_eligible() {
                let topic = store.topic_for(version.number);
                if self.registry.contains(&topic) || self.compressor_registry.has(&topic) {
                    info!(%topic, "retiring version that left ONLINE status");
                    self.retire(&topic);
                }
            }
        }

        // DROP-by-retirement set: topics currently tracked for this store
        // whose version number no longer appears in the store's version
        // list at all.
        let known_versions: HashSet<u32> = store.versions.iter().map(|v| v.number).collect();
        for topic in self.tracked_topics_for_store(&store.name) {
            if !known_versions.contains(&topic.version_number()) {
                info!(%topic, "retiring version no longer present in store");
                self.retire(&topic);
            }
        }
    }

    fn handle_deleted(&self, store: &Store) {
        for topic in store.all_topics() {
            info!(%topic, "retiring version of deleted store");
            self.retire(&topic);
        }
        // Also retire anything this service still tracks for the store
        // that wasn't in the snapshot attached to the deletion event.
        for topic in self.tracked_topics_for_store(&store.name) {
            self.retire(&topic);
        }
    }

    fn retire(&self, topic: &Topic) {
        self.registry.retire(topic);
        self.compressor_registry.remove(topic);
        self.metrics.topic_retired();
        self.metrics.in_flight_gauge(self.registry.len() as i64);
    }

    fn tracked_topics_for_store(&self, store_name: &str) -> Vec<Topic> {
        // The registry only exposes topics it currently tracks; this walks
        // its keys rather than requiring a separate per-store index, which
        // keeps the registry a single flat map as spec.md §3 describes it.
        self.registry.topics_for_store(store_name)
    }
}

#[async_trait]
impl StoreChangeListener for ChangeListener {
    async fn on_store_event(&self, event: StoreChangeEvent) {
        match event {
            StoreChangeEvent::Created(store) => self.handle_created(&store),
            StoreChangeEvent::Changed(store) => self.handle_changed(&store),
            StoreChangeEvent::Deleted(store) => self.handle_deleted(&store),
        }
    }
}
