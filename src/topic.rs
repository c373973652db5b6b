//! Canonical identifier for a dataset version: `"<storeName>_v<versionNumber>"`.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum TopicParseError {
    #[error("topic '{0}' is missing the '_v<number>' suffix")]
    MissingVersionSuffix(String),

    #[error("topic '{0}' has a non-numeric version suffix")]
    InvalidVersionNumber(String),

    #[error("topic '{0}' has an empty store name")]
    EmptyStoreName(String),
}

/// A parsed `<storeName>_v<versionNumber>` identifier.
///
/// This is the primary key used throughout the service: the in-flight
/// registry, the candidate queue and the compressor registry are all keyed
/// by the canonical string form of this type.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Topic {
    store_name: String,
    version_number: u32,
}

impl Topic {
    pub fn new(store_name: impl Into<String>, version_number: u32) -> Self {
        Self {
            store_name: store_name.into(),
            version_number,
        }
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    pub fn version_number(&self) -> u32 {
        self.version_number
    }

    pub fn as_string(&self) -> String {
        self.to_string()
    }
}

impl Display for Topic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_v{}", self.store_name, self.version_number)
    }
}

impl FromStr for Topic {
    type Err = TopicParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let idx = s
            .rfind("_v")
            .ok_or_else(|| TopicParseError::MissingVersionSuffix(s.to_owned()))?;

        let (store_name, suffix) = s.split_at(idx);
        let version_str = &suffix[2..];

        if store_name.is_empty() {
            return Err(TopicParseError::EmptyStoreName(s.to_owned()));
        }

        let version_number = version_str
            .parse()
            .map_err(|_| TopicParseError::InvalidVersionNumber(s.to_owned()))?;

        Ok(Self {
            store_name: store_name.to_owned(),
            version_number,
        })
    }
}

impl TryFrom<&str> for Topic {
    type Error = TopicParseError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl TryFrom<String> for Topic {
    type Error = TopicParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
