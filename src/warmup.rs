//! Warm-up Driver (C7): fetch every dictionary-eligible version once, in
//! parallel, before the service starts accepting steady-state traffic.
//!
//! Warm-up is one-shot and fail-fast: unlike steady-state fetches, a
//! warm-up failure is never retried. It is bounded by a single deadline
//! shared across every parallel fetch rather than a deadline applied to
//! each fetch individually, so a handful of slow replicas can't each get
//! their own full budget and add up to far longer than the configured
//! timeout.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{error, info};

use crate::collaborators::{CompressorRegistry, MetadataRepository};
use crate::error::ServiceError;
use crate::fetch::Fetcher;
use crate::metrics::ServiceMetrics;
use crate::model::{CompressionStrategy, Store};
use crate::registry::InFlightRegistry;
use crate::topic::Topic;

/// Runs warm-up against every dictionary-eligible version across `stores`
/// that isn't already installed. Returns `Ok(())` only if every such
/// version was installed before `deadline` elapsed.
pub async fn warm_up(
    stores: &[Store],
    fetcher: &Fetcher,
    registry: &InFlightRegistry,
    compressor_registry: &dyn CompressorRegistry,
    metadata_repository: &dyn MetadataRepository,
    metrics: &dyn ServiceMetrics,
    deadline: Duration,
) -> Result<(), ServiceError> {
    let topics: Vec<Topic> = stores
        .iter()
        .flat_map(|store| store.eligible_topics())
        .filter(|topic| !compressor_registry.has(topic))
        .collect();

    let attempted = topics.len();
    info!(attempted, "starting warm-up");

    if attempted == 0 {
        return Ok(());
    }

    let fetches = topics.into_iter().map(|topic| {
        let (handle, started) = registry.try_begin(&topic);
        async move {
            if !started {
                // Someone else is already fetching this topic (e.g. a
                // listener-driven ADD raced warm-up); don't duplicate it.
                return true;
            }

            metrics.fetch_attempted();
            match fetcher.fetch(&topic).await {
                Ok(bytes) => {
                    metrics.fetch_succeeded();
                    let still_eligible = metadata_repository
                        .store(topic.store_name())
                        .await
                        .and_then(|store| store.version(topic.version_number()).cloned())
                        .is_some_and(|version| version.is_dictionary_eligible());

                    if still_eligible && registry.complete_if_current(&topic, &handle) {
                        compressor_registry.install(CompressionStrategy::Dict, &topic, bytes);
                    } else if !still_eligible {
                        if let Some(current) = registry.get(&topic) {
                            if Arc::ptr_eq(&current, &handle) {
                                registry.retire(&topic);
                            }
                        }
                    }
                    true
                }
                Err(err) => {
                    metrics.fetch_failed();
                    registry.fail_and_remove_if_current(&topic, &handle);
                    error!(%topic, error = %err, "warm-up fetch failed");
                    false
                }
            }
        }
    });

    let results = match tokio::time::timeout(deadline, join_all(fetches)).await {
        Ok(results) => results,
        Err(_) => {
            metrics.in_flight_gauge(registry.len() as i64);
            return Err(ServiceError::WarmUpFailed {
                attempted,
                failed: attempted,
                deadline_ms: deadline.as_millis() as u64,
            });
        }
    };
    metrics.in_flight_gauge(registry.len() as i64);

    let failed = results.iter().filter(|ok| !**ok).count();
    if failed > 0 {
        return Err(ServiceError::WarmUpFailed {
            attempted,
            failed,
            deadline_ms: deadline.as_millis() as u64,
        });
    }

    info!(attempted, "warm-up complete");
    Ok(())
}
