//! Replica Picker (C2): enumerate ready replicas across all partitions of a
//! topic and pick one uniformly at random.

use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::warn;

use crate::collaborators::{Instance, InstanceDirectory};
use crate::topic::Topic;

/// Selects a replica for a topic. Non-goal: picking the "best" replica —
/// uniform random choice is sufficient (spec.md §1 Non-goals).
pub struct ReplicaPicker {
    instance_directory: Arc<dyn InstanceDirectory>,
}

impl ReplicaPicker {
    pub fn new(instance_directory: Arc<dyn InstanceDirectory>) -> Self {
        Self { instance_directory }
    }

    /// Returns `None` if the instance directory has no ready replica for
    /// this topic, or if consulting it failed — both are folded into a
    /// single "no replica" outcome: the caller (the fetcher) must not
    /// distinguish an instance-directory error from a genuine absence of
    /// replicas, so callers downstream see a uniform `NoReplica` failure
    /// rather than a hard error distinct from an HTTP failure.
    pub async fn pick(&self, topic: &Topic) -> Option<Instance> {
        let num_partitions = match self.instance_directory.number_of_partitions(topic).await {
            Ok(n) => n,
            Err(err) => {
                warn!(%topic, error = %err, "instance directory failed to report partition count");
                return None;
            }
        };

        let mut candidates = Vec::new();
        for partition in 0..num_partitions {
            match self
                .instance_directory
                .ready_to_serve_instances(topic, partition)
                .await
            {
                Ok(instances) => candidates.extend(instances),
                Err(err) => {
                    warn!(%topic, partition, error = %err, "instance directory failed to list ready instances");
                }
            }
        }

        candidates.choose(&mut rand::thread_rng()).cloned()
    }
}
