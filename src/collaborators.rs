//! Traits for the three external collaborators this service depends on.
//!
//! These are the seams named in spec.md §6: the compressor registry, the
//! metadata repository and the instance directory all live outside this
//! crate in the embedding process. The service only ever calls them
//! through these traits, which keeps the service testable against
//! in-memory fakes instead of the real platform components.

use std::sync::Arc;

use async_trait::async_trait;

use crate::model::{CompressionStrategy, Store};
use crate::topic::Topic;

/// Boxed error type for collaborator traits implemented outside this crate.
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Stores decoded dictionaries and serves them to the query path.
///
/// The service treats this as write-through and assumes it is internally
/// thread-safe; `install` must be idempotent for the same topic.
pub trait CompressorRegistry: Send + Sync {
    fn has(&self, topic: &Topic) -> bool;
    fn install(&self, strategy: CompressionStrategy, topic: &Topic, dictionary: bytes::Bytes);
    fn remove(&self, topic: &Topic);
}

/// A single instance (storage node) ready to serve a partition.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Instance {
    pub host: String,
    pub port: u16,
}

impl Instance {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn base_url(&self, ssl_enabled: bool) -> String {
        let scheme = if ssl_enabled { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

/// Maps a version's partitions to ready-to-serve replica addresses.
#[async_trait]
pub trait InstanceDirectory: Send + Sync {
    async fn number_of_partitions(&self, topic: &Topic) -> Result<u32, CollaboratorError>;
    async fn ready_to_serve_instances(&self, topic: &Topic, partition: u32) -> Result<Vec<Instance>, CollaboratorError>;
}

/// Delivered to a [`StoreChangeListener`] registered with the metadata
/// repository.
#[derive(Debug, Clone)]
pub enum StoreChangeEvent {
    Created(Store),
    Changed(Store),
    Deleted(Store),
}

/// Consumes store-change events from the metadata repository.
#[async_trait]
pub trait StoreChangeListener: Send + Sync {
    async fn on_store_event(&self, event: StoreChangeEvent);
}

/// Publishes store/version change notifications and enumerates stores.
#[async_trait]
pub trait MetadataRepository: Send + Sync {
    /// Synchronous resync of the cached snapshot.
    async fn refresh(&self) -> Result<(), CollaboratorError>;

    async fn all_stores(&self) -> Vec<Store>;

    async fn store(&self, name: &str) -> Option<Store>;

    /// Subscribes `listener` to every subsequent store-change event. The
    /// repository is expected to deliver events in store-creation order per
    /// store, but makes no ordering guarantee across different stores.
    fn register_listener(&self, listener: Arc<dyn StoreChangeListener>);
}
