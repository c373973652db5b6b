//! Typed configuration for the retrieval service.
//!
//! The platform this was distilled from configures components through a
//! generic string-keyed property bag; [`DictionaryRetrievalConfig::from_properties`]
//! mirrors that without pulling in a config-file crate, since nothing here
//! needs file discovery, layering or hot-reload.

use std::collections::HashMap;
use std::time::Duration;

/// `dictionary.retrieval.time.ms` — per-fetch deadline and, separately, the
/// single *total* deadline the warm-up driver applies across all of its
/// parallel fetches.
const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;

/// `router.dictionary.processing.threads` — default size hint for the
/// completion/timer work if the embedder asks this crate to size a pool.
/// The service itself only spawns tasks onto the caller's runtime; this
/// value is exposed for embedders that want to size their own executor.
const DEFAULT_PROCESSING_THREADS: usize = 4;

/// Fixed retry delay. Not configurable: a fixed `T_retry` is adequate
/// because each retry is a full HTTP round trip against a freshly chosen
/// replica, and the per-attempt timeout is two orders of magnitude larger.
pub const RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct DictionaryRetrievalConfig {
    /// Per-request fetch deadline, and the shared total deadline for warm-up.
    pub fetch_timeout: Duration,

    /// Size hint for the embedder's completion/timer executor.
    pub processing_threads: usize,

    /// Selects `https://` vs `http://` when building replica URLs.
    pub ssl_enabled: bool,
}

impl Default for DictionaryRetrievalConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
            processing_threads: DEFAULT_PROCESSING_THREADS,
            ssl_enabled: false,
        }
    }
}

impl DictionaryRetrievalConfig {
    pub fn builder() -> DictionaryRetrievalConfigBuilder {
        DictionaryRetrievalConfigBuilder::default()
    }

    /// Parse recognized keys out of a generic property map, falling back to
    /// defaults for anything missing or unparsable.
    pub fn from_properties(props: &HashMap<String, String>) -> Self {
        let mut config = Self::default();

        if let Some(ms) = props
            .get("dictionary.retrieval.time.ms")
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.fetch_timeout = Duration::from_millis(ms);
        }

        if let Some(threads) = props
            .get("router.dictionary.processing.threads")
            .and_then(|v| v.parse::<usize>().ok())
        {
            config.processing_threads = threads;
        }

        if let Some(enabled) = props.get("ssl.enabled").and_then(|v| v.parse::<bool>().ok()) {
            config.ssl_enabled = enabled;
        }

        config
    }
}

#[derive(Debug, Default)]
pub struct DictionaryRetrievalConfigBuilder {
    fetch_timeout: Option<Duration>,
    processing_threads: Option<usize>,
    ssl_enabled: Option<bool>,
}

impl DictionaryRetrievalConfigBuilder {
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    pub fn processing_threads(mut self, threads: usize) -> Self {
        self.processing_threads = Some(threads);
        self
    }

    pub fn ssl_enabled(mut self, enabled: bool) -> Self {
        self.ssl_enabled = Some(enabled);
        self
    }

    pub fn build(self) -> DictionaryRetrievalConfig {
        let defaults = DictionaryRetrievalConfig::default();
        DictionaryRetrievalConfig {
            fetch_timeout: self.fetch_timeout.unwrap_or(defaults.fetch_timeout),
            processing_threads: self.processing_threads.unwrap_or(defaults.processing_threads),
            ssl_enabled: self.ssl_enabled.unwrap_or(defaults.ssl_enabled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = DictionaryRetrievalConfig::default();
        assert_eq!(config.fetch_timeout, Duration::from_millis(10_000));
        assert_eq!(config.processing_threads, 4);
        assert!(!config.ssl_enabled);
    }

    #[test]
    fn parses_recognized_properties() {
        let mut props = HashMap::new();
        props.insert("dictionary.retrieval.time.ms".to_string(), "5000".to_string());
        props.insert("router.dictionary.processing.threads".to_string(), "16".to_string());
        props.insert("ssl.enabled".to_string(), "true".to_string());

        let config = DictionaryRetrievalConfig::from_properties(&props);
        assert_eq!(config.fetch_timeout, Duration::from_millis(5000));
        assert_eq!(config.processing_threads, 16);
        assert!(config.ssl_enabled);
    }

    #[test]
    fn unparsable_values_fall_back_to_defaults() {
        let mut props = HashMap::new();
        props.insert("dictionary.retrieval.time.ms".to_string(), "not-a-number".to_string());

        let config = DictionaryRetrievalConfig::from_properties(&props);
        assert_eq!(config.fetch_timeout, Duration::from_millis(10_000));
    }

    #[test]
    fn builder_overrides_individual_fields() {
        let config = DictionaryRetrievalConfig::builder()
            .ssl_enabled(true)
            .build();
        assert!(config.ssl_enabled);
        assert_eq!(config.processing_threads, 4);
    }
}
