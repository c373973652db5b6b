//! Lifecycle (C8): wires the fetcher, replica picker, in-flight registry,
//! candidate queue, retry scheduler and change listener into a single
//! service with `start`/`stop`.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::collaborators::{CompressorRegistry, InstanceDirectory, MetadataRepository, StoreChangeListener};
use crate::config::{DictionaryRetrievalConfig, RETRY_DELAY};
use crate::error::ServiceError;
use crate::fetch::Fetcher;
use crate::listener::ChangeListener;
use crate::metrics::ServiceMetrics;
use crate::model::CompressionStrategy;
use crate::queue::CandidateQueue;
use crate::registry::InFlightRegistry;
use crate::replica::ReplicaPicker;
use crate::retry::RetryScheduler;
use crate::topic::Topic;
use crate::warmup::warm_up;

struct RunningState {
    queue: CandidateQueue,
    // Kept alive for the service's running lifetime; the metadata
    // repository only stores what it needs to deliver events and makes no
    // promise about how long it keeps its own reference.
    _listener: Arc<ChangeListener>,
}

pub struct DictionaryRetrievalService {
    config: DictionaryRetrievalConfig,
    fetcher: Arc<Fetcher>,
    registry: Arc<InFlightRegistry>,
    compressor_registry: Arc<dyn CompressorRegistry>,
    metadata_repository: Arc<dyn MetadataRepository>,
    metrics: Arc<dyn ServiceMetrics>,
    runtime: tokio::runtime::Handle,
    running: Mutex<Option<RunningState>>,
}

impl DictionaryRetrievalService {
    pub fn new(
        config: DictionaryRetrievalConfig,
        instance_directory: Arc<dyn InstanceDirectory>,
        compressor_registry: Arc<dyn CompressorRegistry>,
        metadata_repository: Arc<dyn MetadataRepository>,
        metrics: Arc<dyn ServiceMetrics>,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        let fetcher = Arc::new(Fetcher::new(
            ReplicaPicker::new(instance_directory),
            config.ssl_enabled,
            config.fetch_timeout,
        ));

        Self {
            config,
            fetcher,
            registry: Arc::new(InFlightRegistry::new()),
            compressor_registry,
            metadata_repository,
            metrics,
            runtime,
            running: Mutex::new(None),
        }
    }

    /// Refreshes the metadata snapshot, warms up every dictionary-eligible
    /// version, then starts accepting steady-state change events. Returns
    /// an error (and leaves the service not running) if warm-up fails.
    pub async fn start(&self) -> Result<(), ServiceError> {
        if self.running.lock().is_some() {
            return Err(ServiceError::AlreadyStarted);
        }

        self.metadata_repository
            .refresh()
            .await
            .map_err(|err| ServiceError::MetadataUnavailable(err.to_string()))?;

        let stores = self.metadata_repository.all_stores().await;

        warm_up(
            &stores,
            &self.fetcher,
            &self.registry,
            self.compressor_registry.as_ref(),
            self.metadata_repository.as_ref(),
            self.metrics.as_ref(),
            self.config.fetch_timeout,
        )
        .await?;

        let retry_scheduler_slot: Arc<OnceLock<RetryScheduler>> = Arc::new(OnceLock::new());

        let on_topic = {
            let fetcher = Arc::clone(&self.fetcher);
            let registry = Arc::clone(&self.registry);
            let compressor_registry = Arc::clone(&self.compressor_registry);
            let metadata_repository = Arc::clone(&self.metadata_repository);
            let metrics = Arc::clone(&self.metrics);
            let retry_scheduler_slot = Arc::clone(&retry_scheduler_slot);

            move |topic: Topic| {
                let fetcher = Arc::clone(&fetcher);
                let registry = Arc::clone(&registry);
                let compressor_registry = Arc::clone(&compressor_registry);
                let metadata_repository = Arc::clone(&metadata_repository);
                let metrics = Arc::clone(&metrics);
                let retry_scheduler = retry_scheduler_slot.get().cloned();

                tokio::spawn(handle_candidate(
                    topic,
                    fetcher,
                    registry,
                    compressor_registry,
                    metadata_repository,
                    metrics,
                    retry_scheduler,
                ));
            }
        };

        let queue = CandidateQueue::start(self.runtime.clone(), on_topic);

        let retry_scheduler = RetryScheduler::new(
            queue.handle(),
            Arc::clone(&self.registry),
            Arc::clone(&self.metrics),
            RETRY_DELAY,
        );
        // Only this call site ever sets the slot; a second `start()` is
        // rejected above before reaching here.
        let _ = retry_scheduler_slot.set(retry_scheduler);

        let listener = Arc::new(ChangeListener::new(
            queue.handle(),
            Arc::clone(&self.registry),
            Arc::clone(&self.compressor_registry),
            Arc::clone(&self.metrics),
        ));
        self.metadata_repository
            .register_listener(Arc::clone(&listener) as Arc<dyn StoreChangeListener>);

        *self.running.lock() = Some(RunningState {
            queue,
            _listener: listener,
        });

        info!("dictionary retrieval service started");
        Ok(())
    }

    /// Best-effort shutdown: retires every tracked topic, signals the
    /// consumer thread to exit and joins it. Does not wait for in-flight
    /// HTTP requests beyond what dropping the client triggers. Returns
    /// [`ServiceError::NotRunning`] if the service was not running.
    pub fn stop(&self) -> Result<(), ServiceError> {
        let Some(state) = self.running.lock().take() else {
            return Err(ServiceError::NotRunning);
        };

        self.registry.retire_all();
        self.metrics.in_flight_gauge(self.registry.len() as i64);
        state.queue.stop();
        info!("dictionary retrieval service stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    pub fn registry(&self) -> &Arc<InFlightRegistry> {
        &self.registry
    }
}

/// Steady-state per-topic handling: re-validates eligibility against the
/// current metadata snapshot (a topic may have been queued before a
/// status drop landed), starts the fetch if nothing else owns it, and on
/// failure hands the topic to the retry scheduler.
async fn handle_candidate(
    topic: Topic,
    fetcher: Arc<Fetcher>,
    registry: Arc<InFlightRegistry>,
    compressor_registry: Arc<dyn CompressorRegistry>,
    metadata_repository: Arc<dyn MetadataRepository>,
    metrics: Arc<dyn ServiceMetrics>,
    retry_scheduler: Option<RetryScheduler>,
) {
    if compressor_registry.has(&topic) {
        return;
    }

    let Some(store) = metadata_repository.store(topic.store_name()).await else {
        debug!(%topic, "skipping dequeued topic: store no longer resolvable");
        return;
    };
    let Some(version) = store.version(topic.version_number()) else {
        debug!(%topic, "skipping dequeued topic: version no longer resolvable");
        return;
    };
    if !version.is_dictionary_eligible() {
        debug!(%topic, "skipping dequeued topic: no longer dictionary-eligible");
        return;
    }

    let (handle, started) = registry.try_begin(&topic);
    if !started {
        return;
    }
    metrics.in_flight_gauge(registry.len() as i64);

    metrics.fetch_attempted();
    match fetcher.fetch(&topic).await {
        Ok(bytes) => {
            metrics.fetch_succeeded();

            // Re-validate against the metadata repository's current
            // snapshot before installing: the snapshot can have moved past
            // ONLINE in the gap between this fetch starting and completing,
            // ahead of the corresponding change event reaching the queue.
            let still_eligible = metadata_repository
                .store(topic.store_name())
                .await
                .and_then(|store| store.version(topic.version_number()).cloned())
                .is_some_and(|version| version.is_dictionary_eligible());

            if still_eligible && registry.complete_if_current(&topic, &handle) {
                compressor_registry.install(CompressionStrategy::Dict, &topic, bytes);
            } else if !still_eligible {
                debug!(%topic, "discarding fetch result: no longer dictionary-eligible at install time");
                if let Some(current) = registry.get(&topic) {
                    if Arc::ptr_eq(&current, &handle) {
                        registry.retire(&topic);
                        metrics.topic_retired();
                    }
                }
            }
            metrics.in_flight_gauge(registry.len() as i64);
        }
        Err(err) => {
            metrics.fetch_failed();
            warn!(%topic, error = %err, "fetch failed");
            if registry.fail_and_remove_if_current(&topic, &handle) {
                metrics.in_flight_gauge(registry.len() as i64);
                if let Some(scheduler) = retry_scheduler {
                    scheduler.schedule(topic);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{CollaboratorError, Instance, StoreChangeEvent};
    use crate::model::{Store, Version, VersionStatus};
    use crate::testutil::InMemoryCompressorRegistry;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct SingleReplicaDirectory(String, u16);

    #[async_trait]
    impl InstanceDirectory for SingleReplicaDirectory {
        async fn number_of_partitions(&self, _topic: &Topic) -> Result<u32, CollaboratorError> {
            Ok(1)
        }

        async fn ready_to_serve_instances(
            &self,
            _topic: &Topic,
            _partition: u32,
        ) -> Result<Vec<Instance>, CollaboratorError> {
            Ok(vec![Instance::new(self.0.clone(), self.1)])
        }
    }

    #[derive(Default)]
    struct FakeMetadataRepository {
        stores: StdMutex<Vec<Store>>,
        listener: StdMutex<Option<Arc<dyn StoreChangeListener>>>,
    }

    impl FakeMetadataRepository {
        fn with_stores(stores: Vec<Store>) -> Self {
            Self {
                stores: StdMutex::new(stores),
                listener: StdMutex::new(None),
            }
        }

        async fn push_change(&self, store: Store) {
            {
                let mut stores = self.stores.lock().unwrap();
                if let Some(existing) = stores.iter_mut().find(|s| s.name == store.name) {
                    *existing = store.clone();
                } else {
                    stores.push(store.clone());
                }
            }
            let listener = self.listener.lock().unwrap().clone();
            if let Some(listener) = listener {
                listener.on_store_event(StoreChangeEvent::Changed(store)).await;
            }
        }
    }

    #[async_trait]
    impl MetadataRepository for FakeMetadataRepository {
        async fn refresh(&self) -> Result<(), CollaboratorError> {
            Ok(())
        }

        async fn all_stores(&self) -> Vec<Store> {
            self.stores.lock().unwrap().clone()
        }

        async fn store(&self, name: &str) -> Option<Store> {
            self.stores.lock().unwrap().iter().find(|s| s.name == name).cloned()
        }

        fn register_listener(&self, listener: Arc<dyn StoreChangeListener>) {
            *self.listener.lock().unwrap() = Some(listener);
        }
    }

    fn directory_for(server: &MockServer) -> Arc<dyn InstanceDirectory> {
        let url = server.uri();
        let without_scheme = url.trim_start_matches("http://");
        let (host, port) = without_scheme.split_once(':').unwrap();
        Arc::new(SingleReplicaDirectory(host.to_string(), port.parse().unwrap()))
    }

    #[tokio::test]
    async fn start_warms_up_then_becomes_running() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/dictionary/.*"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![9]))
            .mount(&server)
            .await;

        let metadata = Arc::new(FakeMetadataRepository::with_stores(vec![Store::new(
            "s",
            vec![Version::new(1, CompressionStrategy::Dict, VersionStatus::Online)],
        )]));
        let compressor = Arc::new(InMemoryCompressorRegistry::default());

        let service = DictionaryRetrievalService::new(
            DictionaryRetrievalConfig::default(),
            directory_for(&server),
            Arc::clone(&compressor) as Arc<dyn CompressorRegistry>,
            Arc::clone(&metadata) as Arc<dyn MetadataRepository>,
            Arc::new(crate::metrics::NoopMetrics),
            tokio::runtime::Handle::current(),
        );

        service.start().await.unwrap();
        assert!(service.is_running());
        assert!(compressor.has(&Topic::new("s", 1)));

        service.stop().unwrap();
        assert!(!service.is_running());
    }

    #[tokio::test]
    async fn start_fails_when_warm_up_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/dictionary/.*"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let metadata = Arc::new(FakeMetadataRepository::with_stores(vec![Store::new(
            "s",
            vec![Version::new(1, CompressionStrategy::Dict, VersionStatus::Online)],
        )]));

        let service = DictionaryRetrievalService::new(
            DictionaryRetrievalConfig::default(),
            directory_for(&server),
            Arc::new(InMemoryCompressorRegistry::default()) as Arc<dyn CompressorRegistry>,
            Arc::clone(&metadata) as Arc<dyn MetadataRepository>,
            Arc::new(crate::metrics::NoopMetrics),
            tokio::runtime::Handle::current(),
        );

        let err = service.start().await.unwrap_err();
        assert!(matches!(err, ServiceError::WarmUpFailed { .. }));
        assert!(!service.is_running());
    }

    #[tokio::test]
    async fn starting_twice_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/dictionary/.*"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1]))
            .mount(&server)
            .await;

        let metadata = Arc::new(FakeMetadataRepository::with_stores(vec![]));
        let service = DictionaryRetrievalService::new(
            DictionaryRetrievalConfig::default(),
            directory_for(&server),
            Arc::new(InMemoryCompressorRegistry::default()) as Arc<dyn CompressorRegistry>,
            Arc::clone(&metadata) as Arc<dyn MetadataRepository>,
            Arc::new(crate::metrics::NoopMetrics),
            tokio::runtime::Handle::current(),
        );

        service.start().await.unwrap();
        let err = service.start().await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyStarted));
        service.stop().unwrap();
    }

    #[tokio::test]
    async fn stop_without_start_reports_not_running() {
        let server = MockServer::start().await;
        let metadata = Arc::new(FakeMetadataRepository::with_stores(vec![]));
        let service = DictionaryRetrievalService::new(
            DictionaryRetrievalConfig::default(),
            directory_for(&server),
            Arc::new(InMemoryCompressorRegistry::default()) as Arc<dyn CompressorRegistry>,
            metadata as Arc<dyn MetadataRepository>,
            Arc::new(crate::metrics::NoopMetrics),
            tokio::runtime::Handle::current(),
        );

        let err = service.stop().unwrap_err();
        assert!(matches!(err, ServiceError::NotRunning));
    }

    #[tokio::test]
    async fn status_drop_after_start_retires_the_topic() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/dictionary/.*"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1]))
            .mount(&server)
            .await;

        let metadata = Arc::new(FakeMetadataRepository::with_stores(vec![Store::new(
            "s",
            vec![Version::new(1, CompressionStrategy::Dict, VersionStatus::Online)],
        )]));
        let compressor = Arc::new(InMemoryCompressorRegistry::default());

        let service = DictionaryRetrievalService::new(
            DictionaryRetrievalConfig::default(),
            directory_for(&server),
            Arc::clone(&compressor) as Arc<dyn CompressorRegistry>,
            Arc::clone(&metadata) as Arc<dyn MetadataRepository>,
            Arc::new(crate::metrics::NoopMetrics),
            tokio::runtime::Handle::current(),
        );

        service.start().await.unwrap();
        assert!(compressor.has(&Topic::new("s", 1)));

        metadata
            .push_change(Store::new(
                "s",
                vec![Version::new(1, CompressionStrategy::Dict, VersionStatus::Offline)],
            ))
            .await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!compressor.has(&Topic::new("s", 1)));
        assert!(!service.registry().contains(&Topic::new("s", 1)));

        service.stop().unwrap();
    }
}
