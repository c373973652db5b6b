//! Store/version metadata as published by the metadata repository collaborator.

use crate::topic::Topic;

/// Compression strategy declared for a version.
///
/// Only [`CompressionStrategy::Dict`] carries a dictionary that this service
/// needs to fetch; the other variants exist because the upstream metadata
/// repository reports the full set of strategies the platform supports, and
/// the eligibility predicate must be a real match against all of them, not a
/// single boolean flag.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CompressionStrategy {
    NoOp,
    Gzip,
    Dict,
}

/// Lifecycle status of a version, as reported by the metadata repository.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum VersionStatus {
    Started,
    Online,
    Offline,
    Killed,
    ErrorOnline,
    PartitionsEmpty,
}

/// One version of a store.
#[derive(Debug, Clone)]
pub struct Version {
    pub number: u32,
    pub compression_strategy: CompressionStrategy,
    pub status: VersionStatus,
}

impl Version {
    pub fn new(number: u32, compression_strategy: CompressionStrategy, status: VersionStatus) -> Self {
        Self {
            number,
            compression_strategy,
            status,
        }
    }

    /// A version is dictionary-eligible iff it uses dictionary-based
    /// compression and is currently online.
    pub fn is_dictionary_eligible(&self) -> bool {
        self.compression_strategy == CompressionStrategy::Dict && self.status == VersionStatus::Online
    }

    /// True for any version that was ever dictionary-compressed, regardless
    /// of current status. Used to detect ONLINE -> non-ONLINE drops.
    pub fn uses_dictionary_compression(&self) -> bool {
        self.compression_strategy == CompressionStrategy::Dict
    }
}

/// A store and all versions the metadata repository currently knows about.
#[derive(Debug, Clone)]
pub struct Store {
    pub name: String,
    pub versions: Vec<Version>,
}

impl Store {
    pub fn new(name: impl Into<String>, versions: Vec<Version>) -> Self {
        Self {
            name: name.into(),
            versions,
        }
    }

    pub fn version(&self, number: u32) -> Option<&Version> {
        self.versions.iter().find(|v| v.number == number)
    }

    pub fn topic_for(&self, number: u32) -> Topic {
        Topic::new(self.name.clone(), number)
    }

    /// All topics in this store that are currently dictionary-eligible.
    pub fn eligible_topics(&self) -> Vec<Topic> {
        self.versions
            .iter()
            .filter(|v| v.is_dictionary_eligible())
            .map(|v| self.topic_for(v.number))
            .collect()
    }

    /// All topics this store has ever declared, regardless of eligibility.
    pub fn all_topics(&self) -> Vec<Topic> {
        self.versions.iter().map(|v| self.topic_for(v.number)).collect()
    }
}
