//! Compression dictionary retrieval.
//!
//! Fetches per-version compression dictionaries over HTTP from ready
//! replicas, keeps them warm as store metadata changes, and hands
//! decoded bytes off to a caller-supplied compressor registry. See
//! [`DictionaryRetrievalService`] for the entry point.

pub mod collaborators;
pub mod config;
pub mod error;
pub mod fetch;
pub mod listener;
pub mod metrics;
pub mod model;
pub mod queue;
pub mod registry;
pub mod replica;
pub mod retry;
pub mod service;
pub mod topic;
pub mod warmup;

#[cfg(test)]
pub(crate) mod testutil;

pub use collaborators::{
    CollaboratorError, CompressorRegistry, Instance, InstanceDirectory, MetadataRepository,
    StoreChangeEvent, StoreChangeListener,
};
pub use config::DictionaryRetrievalConfig;
pub use error::{FetchError, ServiceError};
pub use metrics::{NoopMetrics, ServiceMetrics};
pub use model::{CompressionStrategy, Store, Version, VersionStatus};
pub use service::DictionaryRetrievalService;
pub use topic::{Topic, TopicParseError};
